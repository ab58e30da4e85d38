// Copyright 2026 the Friction Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tokenization and seeded bounded-offset permutation.

use alloc::string::String;
use alloc::vec::Vec;

/// Splits `text` into alternating runs of whitespace and non-whitespace.
///
/// Concatenating the tokens yields `text` exactly.
#[must_use]
pub fn tokenize(text: &str) -> Vec<&str> {
    let mut tokens = Vec::new();
    let mut start = 0;
    let mut in_space = None;
    for (i, c) in text.char_indices() {
        let space = c.is_whitespace();
        match in_space {
            Some(prev) if prev != space => {
                tokens.push(&text[start..i]);
                start = i;
            }
            _ => {}
        }
        in_space = Some(space);
    }
    if start < text.len() {
        tokens.push(&text[start..]);
    }
    tokens
}

/// Whether a token is a word (not a whitespace run).
#[must_use]
pub fn is_word(token: &str) -> bool {
    !token.starts_with(char::is_whitespace)
}

/// 32-bit FNV-1a over a sequence of byte slices.
#[must_use]
pub fn fnv1a(parts: &[&[u8]]) -> u32 {
    const OFFSET: u32 = 0x811c_9dc5;
    const PRIME: u32 = 0x0100_0193;
    let mut hash = OFFSET;
    for part in parts {
        for &b in *part {
            hash ^= u32::from(b);
            hash = hash.wrapping_mul(PRIME);
        }
    }
    hash
}

/// Numerical Recipes 32-bit linear congruential generator.
#[derive(Clone, Debug)]
pub struct Lcg32 {
    state: u32,
}

impl Lcg32 {
    /// Seeds the generator.
    #[must_use]
    pub const fn new(seed: u32) -> Self {
        Self { state: seed }
    }

    /// Next raw output.
    pub fn next_u32(&mut self) -> u32 {
        self.state = self
            .state
            .wrapping_mul(1_664_525)
            .wrapping_add(1_013_904_223);
        self.state
    }

    /// Uniform in `[0, 1)`.
    pub fn next_f64(&mut self) -> f64 {
        f64::from(self.next_u32()) / 4_294_967_296.0
    }

    /// Uniform in `0..n`; `n` must be non-zero.
    pub fn below(&mut self, n: usize) -> usize {
        #[expect(
            clippy::cast_possible_truncation,
            reason = "n is a small swap radius and the product is in [0, n)"
        )]
        let i = (self.next_f64() * n as f64) as usize;
        i.min(n - 1)
    }
}

/// Swap parameters derived from a strength in `0.0..=1.0`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SwapPlan {
    /// Maximum distance between swapped words.
    pub radius: usize,
    /// Chance that each position initiates a swap.
    pub probability: f64,
    /// Number of passes over the word list.
    pub passes: u32,
}

impl SwapPlan {
    /// Radius `1 + round(3·s)`, probability `0.2 + 0.6·s`, and a second pass
    /// from `s >= 0.75`.
    #[must_use]
    pub fn for_strength(strength: f64) -> Self {
        let s = strength.clamp(0.0, 1.0);
        #[expect(
            clippy::cast_possible_truncation,
            reason = "3·s + 0.5 is in [0.5, 3.5]"
        )]
        let radius = 1 + (3.0 * s + 0.5) as usize;
        Self {
            radius,
            probability: 0.2 + 0.6 * s,
            passes: if s >= 0.75 { 2 } else { 1 },
        }
    }
}

/// Rearranges the words of `tokens` with bounded-offset swaps, leaving every
/// whitespace run in place.
///
/// The result always contains the same token multiset as the input.
#[must_use]
pub fn permute(tokens: &[&str], plan: SwapPlan, rng: &mut Lcg32) -> String {
    let slots: Vec<usize> = (0..tokens.len()).filter(|&i| is_word(tokens[i])).collect();
    let mut words: Vec<&str> = slots.iter().map(|&i| tokens[i]).collect();
    let n = words.len();

    for _ in 0..plan.passes {
        for i in 0..n {
            if rng.next_f64() >= plan.probability {
                continue;
            }
            let j = i + 1 + rng.below(plan.radius);
            if j < n {
                words.swap(i, j);
            }
        }
    }

    let mut out = String::with_capacity(tokens.iter().map(|t| t.len()).sum());
    let mut next_word = words.into_iter();
    for token in tokens {
        if is_word(token) {
            if let Some(w) = next_word.next() {
                out.push_str(w);
            }
        } else {
            out.push_str(token);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use alloc::vec;

    use super::*;

    fn sorted_words(s: &str) -> Vec<&str> {
        let mut w: Vec<&str> = tokenize(s).into_iter().filter(|t| is_word(t)).collect();
        w.sort_unstable();
        w
    }

    #[test]
    fn tokenize_preserves_whitespace_runs() {
        let text = "  one two\n\tthree  ";
        let tokens = tokenize(text);
        assert_eq!(tokens, vec!["  ", "one", " ", "two", "\n\t", "three", "  "]);
        assert_eq!(tokens.concat(), text);
        assert!(tokenize("").is_empty());
    }

    #[test]
    fn fnv_matches_reference_vectors() {
        assert_eq!(fnv1a(&[b""]), 0x811c_9dc5);
        assert_eq!(fnv1a(&[b"a"]), 0xe40c_292c);
        assert_eq!(fnv1a(&[b"foo", b"bar"]), fnv1a(&[b"foobar"]));
    }

    #[test]
    fn lcg_is_deterministic() {
        let mut a = Lcg32::new(42);
        let mut b = Lcg32::new(42);
        for _ in 0..16 {
            assert_eq!(a.next_u32(), b.next_u32());
        }
        let mut c = Lcg32::new(0);
        assert_eq!(c.next_u32(), 1_013_904_223);
        for _ in 0..100 {
            assert!(c.below(3) < 3);
        }
    }

    #[test]
    fn plan_follows_strength() {
        assert_eq!(
            SwapPlan::for_strength(0.0),
            SwapPlan {
                radius: 1,
                probability: 0.2,
                passes: 1
            }
        );
        let full = SwapPlan::for_strength(1.0);
        assert_eq!(full.radius, 4);
        assert_eq!(full.passes, 2);
        assert_eq!(SwapPlan::for_strength(0.5).radius, 3);
        assert_eq!(SwapPlan::for_strength(0.74).passes, 1);
    }

    #[test]
    fn permutation_keeps_token_multiset_and_layout() {
        let text = "the quick brown fox  jumps over\nthe lazy dog again and again";
        for seed in 0..50 {
            let mut rng = Lcg32::new(seed);
            let out = permute(&tokenize(text), SwapPlan::for_strength(1.0), &mut rng);
            assert_eq!(out.len(), text.len());
            assert_eq!(sorted_words(&out), sorted_words(text));
            let ws = |s: &str| -> Vec<String> {
                tokenize(s)
                    .into_iter()
                    .filter(|t| !is_word(t))
                    .map(String::from)
                    .collect()
            };
            assert_eq!(ws(&out), ws(text));
        }
    }

    #[test]
    fn strong_permutation_usually_changes_order() {
        let text = "alpha beta gamma delta epsilon zeta eta theta iota kappa";
        let changed = (0..20)
            .filter(|&seed| {
                let mut rng = Lcg32::new(seed);
                permute(&tokenize(text), SwapPlan::for_strength(1.0), &mut rng) != text
            })
            .count();
        assert!(changed >= 15, "only {changed}/20 permutations changed the text");
    }
}
