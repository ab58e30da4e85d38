// Copyright 2026 the Friction Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! An in-memory document for tests and harnesses.
//!
//! [`HeadlessDom`] implements [`DomView`] over an arena of nodes (a document,
//! elements, text nodes, and open shadow roots) and applies
//! [`EffectSet`]s the way the web backend would. Besides DOM writes it keeps
//! the scheduling state effects describe: armed timers, installed listener
//! groups, observer flags, flush requests, the indicator view, and a log of
//! media commands. Tests drive managers against it and then assert on that
//! state.
//!
//! Page-side edits made through the builder methods
//! ([`append_element`](HeadlessDom::append_element),
//! [`set_text`](HeadlessDom::set_text), ...) are recorded as
//! [`MutationRecord`]s and can be drained with
//! [`take_records`](HeadlessDom::take_records). Effects applied through
//! [`apply`](HeadlessDom::apply) are not recorded.
//!
//! Hit testing is configured explicitly: [`set_hit`](HeadlessDom::set_hit)
//! maps a rectangle to the element stack
//! [`elements_from_point`](DomView::elements_from_point) returns there.

mod selector;

use alloc::borrow::ToOwned as _;
use alloc::collections::{BTreeMap, BTreeSet};
use alloc::string::{String, ToString as _};
use alloc::vec;
use alloc::vec::Vec;

use kurbo::{Point, Rect};

use crate::dom::DomView;
use crate::effect::{Effect, EffectSet, IndicatorView, ListenerGroup, TimerId};
use crate::error::SelectorError;
use crate::mutation::{MutationRecord, ObserveFlags};
use crate::node::{NodeId, NodeKind};
use crate::time::Duration;

use selector::{Combinator, Complex, Compound};

#[derive(Clone, Debug)]
enum Data {
    Document,
    Element {
        tag: String,
        attrs: Vec<(String, String)>,
        styles: Vec<(String, String)>,
        shadow: Option<NodeId>,
    },
    Text(String),
    ShadowRoot {
        host: NodeId,
    },
}

#[derive(Clone, Debug)]
struct Node {
    data: Data,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

/// Arena-backed document implementing [`DomView`].
#[derive(Clone, Debug)]
pub struct HeadlessDom {
    nodes: Vec<Node>,
    root: NodeId,
    hits: Vec<(Rect, Vec<NodeId>)>,
    records: Vec<MutationRecord>,

    stylesheet: Option<&'static str>,
    timers: BTreeMap<TimerId, Duration>,
    listeners: BTreeSet<ListenerGroup>,
    observer: Option<ObserveFlags>,
    flush_requested: bool,
    indicator: Option<IndicatorView>,
    media_log: Vec<Effect>,
}

impl Default for HeadlessDom {
    fn default() -> Self {
        Self::new()
    }
}

impl HeadlessDom {
    /// Creates a document with an `html` root element.
    #[must_use]
    pub fn new() -> Self {
        let document = NodeId::new(0, 0);
        let root = NodeId::new(1, 0);
        Self {
            nodes: vec![
                Node {
                    data: Data::Document,
                    parent: None,
                    children: vec![root],
                },
                Node {
                    data: Data::Element {
                        tag: "html".to_string(),
                        attrs: Vec::new(),
                        styles: Vec::new(),
                        shadow: None,
                    },
                    parent: Some(document),
                    children: Vec::new(),
                },
            ],
            root,
            hits: Vec::new(),
            records: Vec::new(),
            stylesheet: None,
            timers: BTreeMap::new(),
            listeners: BTreeSet::new(),
            observer: None,
            flush_requested: false,
            indicator: None,
            media_log: Vec::new(),
        }
    }

    /// The `html` element.
    #[must_use]
    pub fn root_element(&self) -> NodeId {
        self.root
    }

    fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.index() as usize)
    }

    fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id.index() as usize)
    }

    fn alloc(&mut self, data: Data, parent: Option<NodeId>) -> NodeId {
        #[expect(
            clippy::cast_possible_truncation,
            reason = "headless documents stay far below u32::MAX nodes"
        )]
        let id = NodeId::new(self.nodes.len() as u32, 0);
        self.nodes.push(Node {
            data,
            parent,
            children: Vec::new(),
        });
        id
    }

    fn push_child(&mut self, parent: NodeId, child: NodeId, kind: NodeKind) {
        if let Some(p) = self.node_mut(parent) {
            p.children.push(child);
        }
        self.records.push(MutationRecord::ChildList {
            target: parent,
            added: vec![(child, kind)],
        });
    }

    /// Appends a new element with the given tag under `parent` (an element or
    /// shadow root).
    pub fn append_element(&mut self, parent: NodeId, tag: &str) -> NodeId {
        let id = self.alloc(
            Data::Element {
                tag: tag.to_ascii_lowercase(),
                attrs: Vec::new(),
                styles: Vec::new(),
                shadow: None,
            },
            Some(parent),
        );
        self.push_child(parent, id, NodeKind::Element);
        id
    }

    /// Appends a text node under `parent`.
    pub fn append_text(&mut self, parent: NodeId, text: &str) -> NodeId {
        let id = self.alloc(Data::Text(text.to_string()), Some(parent));
        self.push_child(parent, id, NodeKind::Text);
        id
    }

    /// Attaches an open shadow root to `host` and returns it.
    ///
    /// Attaching twice returns the existing root.
    pub fn attach_shadow(&mut self, host: NodeId) -> NodeId {
        if let Some(Node {
            data: Data::Element {
                shadow: Some(existing),
                ..
            },
            ..
        }) = self.node(host)
        {
            return *existing;
        }
        let shadow = self.alloc(Data::ShadowRoot { host }, None);
        if let Some(Node {
            data: Data::Element { shadow: slot, .. },
            ..
        }) = self.node_mut(host)
        {
            *slot = Some(shadow);
        }
        shadow
    }

    /// Sets an attribute as the page would, recording the change.
    pub fn set_attr(&mut self, node: NodeId, name: &str, value: &str) {
        if self.write_attr(node, name, value) {
            self.records
                .push(MutationRecord::Attributes { target: node });
        }
    }

    /// Rewrites a text node as the page would, recording the change.
    pub fn set_text(&mut self, node: NodeId, text: &str) {
        if self.write_text(node, text) {
            self.records
                .push(MutationRecord::CharacterData { target: node });
        }
    }

    /// Detaches `node` from its parent.
    pub fn remove(&mut self, node: NodeId) {
        let Some(parent) = self.node(node).and_then(|n| n.parent) else {
            return;
        };
        if let Some(p) = self.node_mut(parent) {
            p.children.retain(|&c| c != node);
        }
        if let Some(n) = self.node_mut(node) {
            n.parent = None;
        }
    }

    /// Makes `elements_from_point` return `stack` (topmost first) for any
    /// point inside `rect`. Later calls take precedence.
    pub fn set_hit(&mut self, rect: Rect, stack: Vec<NodeId>) {
        self.hits.insert(0, (rect, stack));
    }

    /// Drains the mutation records produced by page-side edits.
    pub fn take_records(&mut self) -> Vec<MutationRecord> {
        core::mem::take(&mut self.records)
    }

    /// An inline style property of `node`.
    #[must_use]
    pub fn style(&self, node: NodeId, property: &str) -> Option<&str> {
        match &self.node(node)?.data {
            Data::Element { styles, .. } => styles
                .iter()
                .find(|(k, _)| k == property)
                .map(|(_, v)| v.as_str()),
            _ => None,
        }
    }

    /// The installed engine stylesheet.
    #[must_use]
    pub fn stylesheet(&self) -> Option<&'static str> {
        self.stylesheet
    }

    /// The delay a timer was last armed with, if it is pending.
    #[must_use]
    pub fn timer(&self, timer: TimerId) -> Option<Duration> {
        self.timers.get(&timer).copied()
    }

    /// Pending timers, in `TimerId` order.
    pub fn timers(&self) -> impl Iterator<Item = TimerId> + '_ {
        self.timers.keys().copied()
    }

    /// Whether a listener group is installed.
    #[must_use]
    pub fn is_listening(&self, group: ListenerGroup) -> bool {
        self.listeners.contains(&group)
    }

    /// Flags the observer is connected with, or `None` when disconnected.
    #[must_use]
    pub fn observer(&self) -> Option<ObserveFlags> {
        self.observer
    }

    /// Returns and clears the pending flush request.
    pub fn take_flush_request(&mut self) -> bool {
        core::mem::take(&mut self.flush_requested)
    }

    /// The indicator as last rendered.
    #[must_use]
    pub fn indicator(&self) -> Option<&IndicatorView> {
        self.indicator.as_ref()
    }

    /// Media commands (`SetCurrentTime`, `SetPlaybackRate`) in order.
    #[must_use]
    pub fn media_log(&self) -> &[Effect] {
        &self.media_log
    }

    /// Applies every effect in order and returns the number of DOM writes.
    pub fn apply(&mut self, effects: &EffectSet) -> usize {
        let mut writes = 0;
        for effect in effects {
            if effect.is_dom_write() {
                writes += 1;
            }
            match effect {
                Effect::SetAttribute { node, name, value } => {
                    self.write_attr(*node, name, value);
                }
                Effect::RemoveAttribute { node, name } => self.remove_attr(*node, name),
                Effect::SetText { node, value } => {
                    self.write_text(*node, value);
                }
                Effect::SetStyle {
                    node,
                    property,
                    value,
                } => self.write_style(*node, property, Some(value)),
                Effect::RemoveStyle { node, property } => self.write_style(*node, property, None),
                Effect::InstallStylesheet { css } => self.stylesheet = Some(*css),
                Effect::RemoveStylesheet => self.stylesheet = None,
                Effect::SetCurrentTime { .. } | Effect::SetPlaybackRate { .. } => {
                    self.media_log.push(effect.clone());
                }
                Effect::StartTimer { timer, delay } => {
                    self.timers.insert(*timer, *delay);
                }
                Effect::CancelTimer { timer } => {
                    self.timers.remove(timer);
                }
                Effect::Listen(group) => {
                    self.listeners.insert(*group);
                }
                Effect::Unlisten(group) => {
                    self.listeners.remove(group);
                }
                Effect::Observe(flags) => self.observer = Some(*flags),
                Effect::Disconnect => self.observer = None,
                Effect::RequestFlush => self.flush_requested = true,
                Effect::ShowIndicator(view) => self.indicator = Some(view.clone()),
                Effect::HideIndicator => self.indicator = None,
            }
        }
        writes
    }

    fn write_attr(&mut self, node: NodeId, name: &str, value: &str) -> bool {
        let Some(Node {
            data: Data::Element { attrs, .. },
            ..
        }) = self.node_mut(node)
        else {
            return false;
        };
        match attrs.iter_mut().find(|(k, _)| k == name) {
            Some((_, v)) => value.clone_into(v),
            None => attrs.push((name.to_string(), value.to_string())),
        }
        true
    }

    fn remove_attr(&mut self, node: NodeId, name: &str) {
        if let Some(Node {
            data: Data::Element { attrs, .. },
            ..
        }) = self.node_mut(node)
        {
            attrs.retain(|(k, _)| k != name);
        }
    }

    fn write_text(&mut self, node: NodeId, text: &str) -> bool {
        match self.node_mut(node) {
            Some(Node {
                data: Data::Text(t),
                ..
            }) => {
                text.clone_into(t);
                true
            }
            _ => false,
        }
    }

    fn write_style(&mut self, node: NodeId, property: &str, value: Option<&String>) {
        let Some(Node {
            data: Data::Element { styles, .. },
            ..
        }) = self.node_mut(node)
        else {
            return;
        };
        styles.retain(|(k, _)| k != property);
        if let Some(v) = value {
            styles.push((property.to_string(), v.clone()));
        }
    }

    fn is_element(&self, node: NodeId) -> bool {
        matches!(
            self.node(node),
            Some(Node {
                data: Data::Element { .. },
                ..
            })
        )
    }

    /// Pre-order walk of the light tree below `scope`, optionally descending
    /// into shadow roots.
    fn descendants(&self, scope: NodeId, pierce: bool, out: &mut Vec<NodeId>) {
        let Some(node) = self.node(scope) else { return };
        if pierce
            && let Data::Element {
                shadow: Some(shadow),
                ..
            } = &node.data
        {
            self.descendants_including(*shadow, pierce, out);
        }
        for &child in &node.children {
            self.descendants_including(child, pierce, out);
        }
    }

    fn descendants_including(&self, node: NodeId, pierce: bool, out: &mut Vec<NodeId>) {
        if !matches!(
            self.node(node),
            Some(Node {
                data: Data::ShadowRoot { .. },
                ..
            })
        ) {
            out.push(node);
        }
        self.descendants(node, pierce, out);
    }

    fn compound_matches(&self, element: NodeId, compound: &Compound) -> bool {
        let Some(Node {
            data: Data::Element { tag, attrs, .. },
            ..
        }) = self.node(element)
        else {
            return false;
        };
        let attr = |name: &str| attrs.iter().find(|(k, _)| k == name).map(|(_, v)| v);

        if compound.tag.as_ref().is_some_and(|t| t != tag) {
            return false;
        }
        if let Some(id) = &compound.id
            && attr("id") != Some(id)
        {
            return false;
        }
        if !compound.classes.is_empty() {
            let classes = attr("class").map(String::as_str).unwrap_or_default();
            if !compound
                .classes
                .iter()
                .all(|c| classes.split_whitespace().any(|have| have == c))
            {
                return false;
            }
        }
        compound.attrs.iter().all(|(name, want)| match attr(name) {
            None => false,
            Some(have) => want.as_ref().is_none_or(|w| w == have),
        })
    }

    fn complex_matches(&self, element: NodeId, complex: &Complex, idx: usize) -> bool {
        if !self.compound_matches(element, &complex.compounds[idx]) {
            return false;
        }
        if idx == 0 {
            return true;
        }
        match complex.combinators[idx - 1] {
            Combinator::Child => self
                .parent_element(element)
                .is_some_and(|p| self.complex_matches(p, complex, idx - 1)),
            Combinator::Descendant => {
                let mut cursor = self.parent_element(element);
                while let Some(p) = cursor {
                    if self.complex_matches(p, complex, idx - 1) {
                        return true;
                    }
                    cursor = self.parent_element(p);
                }
                false
            }
        }
    }

    fn matches_list(&self, element: NodeId, list: &[Complex]) -> bool {
        list.iter()
            .any(|c| self.complex_matches(element, c, c.compounds.len() - 1))
    }
}

impl DomView for HeadlessDom {
    fn root(&self) -> Option<NodeId> {
        Some(self.root)
    }

    fn kind(&self, node: NodeId) -> NodeKind {
        match self.node(node).map(|n| &n.data) {
            Some(Data::Element { .. }) => NodeKind::Element,
            Some(Data::Text(_)) => NodeKind::Text,
            _ => NodeKind::Other,
        }
    }

    fn is_connected(&self, node: NodeId) -> bool {
        let mut cursor = Some(node);
        while let Some(id) = cursor {
            let Some(n) = self.node(id) else { return false };
            cursor = match &n.data {
                Data::Document => return true,
                Data::ShadowRoot { host } => Some(*host),
                _ => n.parent,
            };
        }
        false
    }

    fn parent_element(&self, node: NodeId) -> Option<NodeId> {
        let parent = self.node(node)?.parent?;
        self.is_element(parent).then_some(parent)
    }

    fn shadow_host(&self, node: NodeId) -> Option<NodeId> {
        let parent = self.node(node)?.parent?;
        match self.node(parent)?.data {
            Data::ShadowRoot { host } => Some(host),
            _ => None,
        }
    }

    fn matches(&self, element: NodeId, selector: &str) -> Result<bool, SelectorError> {
        let list = selector::parse(selector)?;
        Ok(self.matches_list(element, &list))
    }

    fn query_all(&self, scope: NodeId, selector: &str) -> Result<Vec<NodeId>, SelectorError> {
        let list = selector::parse(selector)?;
        let mut all = Vec::new();
        self.descendants(scope, false, &mut all);
        Ok(all
            .into_iter()
            .filter(|&n| self.matches_list(n, &list))
            .collect())
    }

    fn attribute(&self, element: NodeId, name: &str) -> Option<String> {
        match &self.node(element)?.data {
            Data::Element { attrs, .. } => attrs
                .iter()
                .find(|(k, _)| k == name)
                .map(|(_, v)| v.clone()),
            _ => None,
        }
    }

    fn marked(&self, name: &str) -> Vec<NodeId> {
        let mut all = vec![self.root];
        self.descendants(self.root, true, &mut all);
        all.into_iter()
            .filter(|&n| self.attribute(n, name).is_some())
            .collect()
    }

    fn text(&self, node: NodeId) -> Option<String> {
        match &self.node(node)?.data {
            Data::Text(t) => Some(t.clone()),
            _ => None,
        }
    }

    fn text_nodes(&self, scope: NodeId) -> Vec<NodeId> {
        let mut all = vec![scope];
        self.descendants(scope, false, &mut all);
        all.into_iter()
            .filter(|&n| self.kind(n) == NodeKind::Text)
            .collect()
    }

    fn is_content_editable(&self, element: NodeId) -> bool {
        let mut cursor = Some(element);
        while let Some(el) = cursor {
            match self.attribute(el, "contenteditable").as_deref() {
                Some("" | "true" | "plaintext-only") => return true,
                Some("false") => return false,
                _ => {}
            }
            cursor = self.parent_element(el);
        }
        false
    }

    fn elements_from_point(&self, point: Point) -> Vec<NodeId> {
        self.hits
            .iter()
            .find(|(rect, _)| rect.contains(point))
            .map(|(_, stack)| stack.clone())
            .unwrap_or_default()
    }
}
