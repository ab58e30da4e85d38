// Copyright 2026 the Friction Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! A small CSS selector parser for the headless document.
//!
//! Supported: type selectors, `*`, `#id`, `.class`, `[attr]`,
//! `[attr=value]` (bare or quoted value), the descendant and `>`
//! combinators, and comma-separated lists. Anything else is rejected with a
//! [`SelectorError`], which is how tests exercise selector error isolation.

use alloc::string::String;
use alloc::vec::Vec;

use crate::error::SelectorError;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub(crate) struct Compound {
    pub(crate) tag: Option<String>,
    pub(crate) id: Option<String>,
    pub(crate) classes: Vec<String>,
    pub(crate) attrs: Vec<(String, Option<String>)>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Combinator {
    Descendant,
    Child,
}

/// One complex selector: `compounds[i]` and `compounds[i + 1]` are joined by
/// `combinators[i]`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct Complex {
    pub(crate) compounds: Vec<Compound>,
    pub(crate) combinators: Vec<Combinator>,
}

/// Parses a selector list.
pub(crate) fn parse(selector: &str) -> Result<Vec<Complex>, SelectorError> {
    let err = || SelectorError::new(selector);
    let mut list = Vec::new();
    for part in split_top_level(selector) {
        let part = part.trim();
        if part.is_empty() {
            return Err(err());
        }
        list.push(parse_complex(part).ok_or_else(err)?);
    }
    Ok(list)
}

/// Splits on commas outside of `[...]`.
fn split_top_level(s: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0_u32;
    let mut start = 0;
    for (i, c) in s.char_indices() {
        match c {
            '[' => depth += 1,
            ']' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                parts.push(&s[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(&s[start..]);
    parts
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '-' || c == '_'
}

struct Cursor<'a> {
    chars: &'a [char],
    pos: usize,
}

impl Cursor<'_> {
    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += 1;
        Some(c)
    }

    fn skip_ws(&mut self) -> bool {
        let start = self.pos;
        while self.peek().is_some_and(char::is_whitespace) {
            self.pos += 1;
        }
        self.pos != start
    }

    fn ident(&mut self) -> Option<String> {
        let start = self.pos;
        while self.peek().is_some_and(is_ident_char) {
            self.pos += 1;
        }
        (self.pos != start).then(|| self.chars[start..self.pos].iter().collect())
    }
}

fn parse_complex(s: &str) -> Option<Complex> {
    let chars: Vec<char> = s.chars().collect();
    let mut cur = Cursor {
        chars: &chars,
        pos: 0,
    };
    let mut compounds = Vec::new();
    let mut combinators = Vec::new();
    let mut pending: Option<Combinator> = None;

    loop {
        cur.skip_ws();
        let Some(c) = cur.peek() else { break };
        if c == '>' {
            if compounds.is_empty() || pending.is_some() {
                return None;
            }
            pending = Some(Combinator::Child);
            cur.bump();
            continue;
        }
        if !compounds.is_empty() {
            combinators.push(pending.take().unwrap_or(Combinator::Descendant));
        }
        compounds.push(parse_compound(&mut cur)?);
    }

    if pending.is_some() || compounds.is_empty() {
        return None;
    }
    Some(Complex {
        compounds,
        combinators,
    })
}

fn parse_compound(cur: &mut Cursor<'_>) -> Option<Compound> {
    let mut compound = Compound::default();
    let mut any = false;

    if cur.peek() == Some('*') {
        cur.bump();
        any = true;
    } else if cur.peek().is_some_and(is_ident_char) {
        compound.tag = Some(cur.ident()?.to_ascii_lowercase());
        any = true;
    }

    loop {
        match cur.peek() {
            Some('#') => {
                cur.bump();
                compound.id = Some(cur.ident()?);
            }
            Some('.') => {
                cur.bump();
                compound.classes.push(cur.ident()?);
            }
            Some('[') => {
                cur.bump();
                compound.attrs.push(parse_attr(cur)?);
            }
            Some(c) if c.is_whitespace() || c == '>' => break,
            None => break,
            Some(_) => return None,
        }
        any = true;
    }

    any.then_some(compound)
}

fn parse_attr(cur: &mut Cursor<'_>) -> Option<(String, Option<String>)> {
    cur.skip_ws();
    let name = cur.ident()?.to_ascii_lowercase();
    cur.skip_ws();
    match cur.bump()? {
        ']' => Some((name, None)),
        '=' => {
            cur.skip_ws();
            let value = match cur.peek()? {
                q @ ('"' | '\'') => {
                    cur.bump();
                    let mut v = String::new();
                    loop {
                        let c = cur.bump()?;
                        if c == q {
                            break;
                        }
                        v.push(c);
                    }
                    v
                }
                _ => cur.ident()?,
            };
            cur.skip_ws();
            (cur.bump()? == ']').then_some((name, Some(value)))
        }
        _ => None,
    }
}
