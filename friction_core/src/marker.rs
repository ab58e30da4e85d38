// Copyright 2026 the Friction Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Selector-driven attribute tagging.
//!
//! A [`TargetMarker`] keeps one attribute on every element matching a list of
//! selectors: current matches when applied, and new matches as they are
//! inserted (it subscribes to the shared multiplexer for
//! [`ObserveFlags::CHILD_TREE`]). Stylesheets then key off the attribute
//! instead of re-running the selectors.

use alloc::collections::BTreeSet;
use alloc::string::{String, ToString as _};
use alloc::vec::Vec;

use crate::dom::DomView;
use crate::effect::{Effect, EffectSet};
use crate::error::{FrictionError, SelectorError};
use crate::mutation::{MutationBatch, MutationMultiplexer, ObserveFlags, SubscriptionId};
use crate::node::{NodeId, NodeKind};
use crate::trace::{Component, ManagerAction, Tracer};

/// Tags matches of a selector list with one attribute.
#[derive(Debug)]
pub struct TargetMarker<K> {
    key: K,
    attribute: &'static str,
    value: &'static str,
    selectors: Option<Vec<String>>,
    subscription: Option<SubscriptionId>,
    tagged: BTreeSet<NodeId>,
}

impl<K: Copy> TargetMarker<K> {
    /// Creates a removed marker that will write `attribute="value"`.
    ///
    /// `key` identifies the marker to the multiplexer.
    #[must_use]
    pub fn new(key: K, attribute: &'static str, value: &'static str) -> Self {
        Self {
            key,
            attribute,
            value,
            selectors: None,
            subscription: None,
            tagged: BTreeSet::new(),
        }
    }

    /// The attribute this marker writes.
    #[must_use]
    pub fn attribute(&self) -> &'static str {
        self.attribute
    }

    /// Whether the marker is applied.
    #[must_use]
    pub fn is_applied(&self) -> bool {
        self.selectors.is_some()
    }

    /// Elements currently carrying the attribute because of this marker.
    pub fn tagged(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.tagged.iter().copied()
    }

    /// Tags every current match and starts watching for insertions.
    ///
    /// Re-applying the same selectors does nothing. Different selectors
    /// un-tag elements that no longer match and tag new matches.
    pub fn apply(
        &mut self,
        selectors: &[String],
        dom: &(impl DomView + ?Sized),
        mux: &mut MutationMultiplexer<K>,
        tracer: &mut Tracer<'_>,
    ) -> EffectSet {
        if self.selectors.as_deref() == Some(selectors) {
            return EffectSet::new();
        }
        let action = if self.is_applied() {
            ManagerAction::Updated
        } else {
            ManagerAction::Applied
        };

        let mut matches = BTreeSet::new();
        let mut ordered = Vec::new();
        if let Some(root) = dom.root() {
            for selector in selectors {
                self.collect(dom, root, selector, &mut matches, &mut ordered, tracer);
            }
        }

        let mut effects = EffectSet::new();
        for &node in &self.tagged {
            if !matches.contains(&node) && dom.is_connected(node) {
                effects.push(Effect::RemoveAttribute {
                    node,
                    name: self.attribute,
                });
            }
        }
        for &node in &ordered {
            if !self.tagged.contains(&node) {
                effects.push(self.tag(node));
            }
        }
        self.tagged = matches;
        self.selectors = Some(selectors.to_vec());

        if self.subscription.is_none() {
            let (id, e) = mux.subscribe(self.key, ObserveFlags::CHILD_TREE, tracer);
            self.subscription = Some(id);
            effects.append(e);
        }
        tracer.manager(Component::Marker, action);
        effects
    }

    /// Tags matching elements among a batch's added nodes and their
    /// descendants.
    pub fn on_batch(
        &mut self,
        batch: &MutationBatch,
        dom: &(impl DomView + ?Sized),
        tracer: &mut Tracer<'_>,
    ) -> Result<EffectSet, FrictionError> {
        let mut effects = EffectSet::new();
        let Some(selectors) = self.selectors.take() else {
            return Ok(effects);
        };
        self.tagged.retain(|&n| dom.is_connected(n));

        let mut found = BTreeSet::new();
        let mut ordered = Vec::new();
        for &node in &batch.added_nodes {
            if dom.kind(node) != NodeKind::Element || !dom.is_connected(node) {
                continue;
            }
            for selector in &selectors {
                self.collect(dom, node, selector, &mut found, &mut ordered, tracer);
            }
        }
        for node in ordered {
            if self.tagged.insert(node) {
                effects.push(self.tag(node));
            }
        }
        self.selectors = Some(selectors);
        Ok(effects)
    }

    /// Un-tags every still-connected element and stops watching.
    pub fn remove(
        &mut self,
        dom: &(impl DomView + ?Sized),
        mux: &mut MutationMultiplexer<K>,
        tracer: &mut Tracer<'_>,
    ) -> EffectSet {
        let mut effects = EffectSet::new();
        if self.selectors.take().is_none() {
            return effects;
        }
        for node in core::mem::take(&mut self.tagged) {
            if dom.is_connected(node) {
                effects.push(Effect::RemoveAttribute {
                    node,
                    name: self.attribute,
                });
            }
        }
        if let Some(id) = self.subscription.take() {
            effects.append(mux.unsubscribe(id, tracer));
        }
        tracer.manager(Component::Marker, ManagerAction::Removed);
        effects
    }

    fn tag(&self, node: NodeId) -> Effect {
        Effect::SetAttribute {
            node,
            name: self.attribute,
            value: self.value.to_string(),
        }
    }

    /// Adds the matches of `selector` at or below `scope` to `found`,
    /// tracing and skipping a selector the document rejects.
    fn collect(
        &self,
        dom: &(impl DomView + ?Sized),
        scope: NodeId,
        selector: &str,
        found: &mut BTreeSet<NodeId>,
        ordered: &mut Vec<NodeId>,
        tracer: &mut Tracer<'_>,
    ) {
        match matches_within(dom, scope, selector) {
            Ok(hits) => {
                for node in hits {
                    if found.insert(node) {
                        ordered.push(node);
                    }
                }
            }
            Err(err) => tracer.fault(Component::Marker, &FrictionError::from(err)),
        }
    }
}

fn matches_within(
    dom: &(impl DomView + ?Sized),
    scope: NodeId,
    selector: &str,
) -> Result<Vec<NodeId>, SelectorError> {
    let mut hits = Vec::new();
    if dom.matches(scope, selector)? {
        hits.push(scope);
    }
    hits.extend(dom.query_all(scope, selector)?);
    Ok(hits)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::headless::HeadlessDom;

    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    struct Key;

    const ATTR: &str = "data-test-mark";

    fn sel(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| (*s).to_string()).collect()
    }

    fn setup() -> (HeadlessDom, NodeId, NodeId, NodeId) {
        let mut dom = HeadlessDom::new();
        let root = dom.root_element();
        let img = dom.append_element(root, "img");
        let video = dom.append_element(root, "video");
        let p = dom.append_element(root, "p");
        let _ = dom.take_records();
        (dom, img, video, p)
    }

    #[test]
    fn apply_tags_matches_and_second_apply_is_a_no_op() {
        let (mut dom, img, video, p) = setup();
        let mut tracer = Tracer::none();
        let mut mux = MutationMultiplexer::new();
        let mut marker = TargetMarker::new(Key, ATTR, "");

        let first = marker.apply(&sel(&["img", "video"]), &dom, &mut mux, &mut tracer);
        assert_eq!(dom.apply(&first), 2);
        assert_eq!(dom.attribute(img, ATTR).as_deref(), Some(""));
        assert!(dom.attribute(video, ATTR).is_some());
        assert!(dom.attribute(p, ATTR).is_none());
        assert_eq!(dom.observer(), Some(ObserveFlags::CHILD_TREE));

        let second = marker.apply(&sel(&["img", "video"]), &dom, &mut mux, &mut tracer);
        assert_eq!(dom.apply(&second), 0);
    }

    #[test]
    fn reapply_with_different_selectors_diffs() {
        let (mut dom, img, video, p) = setup();
        let mut tracer = Tracer::none();
        let mut mux = MutationMultiplexer::new();
        let mut marker = TargetMarker::new(Key, ATTR, "");

        let e = marker.apply(&sel(&["img", "video"]), &dom, &mut mux, &mut tracer);
        dom.apply(&e);
        let e = marker.apply(&sel(&["video", "p"]), &dom, &mut mux, &mut tracer);
        assert_eq!(dom.apply(&e), 2, "one removal and one addition");
        assert!(dom.attribute(img, ATTR).is_none());
        assert!(dom.attribute(video, ATTR).is_some());
        assert!(dom.attribute(p, ATTR).is_some());
    }

    #[test]
    fn invalid_selector_skips_only_itself() {
        let (mut dom, img, _, _) = setup();
        let mut tracer = Tracer::none();
        let mut mux = MutationMultiplexer::new();
        let mut marker = TargetMarker::new(Key, ATTR, "");

        let e = marker.apply(&sel(&["img:has(", "img"]), &dom, &mut mux, &mut tracer);
        dom.apply(&e);
        assert!(dom.attribute(img, ATTR).is_some());
    }

    #[test]
    fn inserted_matches_are_tagged_with_descendants() {
        let (mut dom, _, _, _) = setup();
        let root = dom.root_element();
        let mut tracer = Tracer::none();
        let mut mux = MutationMultiplexer::new();
        let mut marker = TargetMarker::new(Key, ATTR, "");
        let e = marker.apply(&sel(&["img"]), &dom, &mut mux, &mut tracer);
        dom.apply(&e);

        let card = dom.append_element(root, "div");
        let thumb = dom.append_element(card, "img");
        let direct = dom.append_element(root, "img");
        for record in dom.take_records() {
            let _ = mux.record(record);
        }

        let mut effects = EffectSet::new();
        effects.append(mux.flush(&mut tracer, |_, batch, tracer| {
            marker.on_batch(batch, &dom, tracer)
        }));
        // `thumb` appears both as an added node and as a descendant of `card`.
        assert_eq!(dom.apply(&effects), 2);
        assert!(dom.attribute(thumb, ATTR).is_some());
        assert!(dom.attribute(direct, ATTR).is_some());
    }

    #[test]
    fn remove_untags_connected_and_unsubscribes() {
        let (mut dom, img, video, _) = setup();
        let mut tracer = Tracer::none();
        let mut mux = MutationMultiplexer::new();
        let mut marker = TargetMarker::new(Key, ATTR, "");
        let e = marker.apply(&sel(&["img", "video"]), &dom, &mut mux, &mut tracer);
        dom.apply(&e);

        dom.remove(video);
        let e = marker.remove(&dom, &mut mux, &mut tracer);
        assert_eq!(dom.apply(&e), 1, "detached nodes are left alone");
        assert!(dom.attribute(img, ATTR).is_none());
        assert_eq!(dom.observer(), None);
        assert_eq!(mux.subscriber_count(), 0);
        assert!(marker.remove(&dom, &mut mux, &mut tracer).is_empty());
        assert_eq!(marker.tagged().count(), 0);
    }
}
