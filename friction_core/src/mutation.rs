// Copyright 2026 the Friction Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The shared mutation-observation multiplexer.
//!
//! Every manager that reacts to DOM changes rides on one
//! [`MutationMultiplexer`] instead of installing its own observer. Managers
//! [`subscribe`](MutationMultiplexer::subscribe) with the [`ObserveFlags`]
//! they need; the multiplexer keeps the logical OR of all live subscriptions
//! and asks the backend to reconnect its single observer only when that
//! merged value changes.
//!
//! # Batching
//!
//! Raw [`MutationRecord`]s are buffered as they arrive. The first record of
//! a batch emits [`Effect::RequestFlush`]; on the next animation frame the
//! backend calls [`flush`](MutationMultiplexer::flush), which collapses the
//! buffer into one [`MutationBatch`] (three deduplicated node lists, arrival
//! order preserved) and hands the same payload to every subscriber.
//! Subscribers filter for what they care about.
//!
//! A subscriber registered after a batch began never receives that batch;
//! it has already seen the current document state through its own initial
//! scan.

use alloc::collections::BTreeSet;
use alloc::vec::Vec;

use crate::effect::{Effect, EffectSet};
use crate::error::FrictionError;
use crate::node::{NodeId, NodeKind};
use crate::trace::{BatchEvent, Component, ObserverEvent, Tracer};

/// Observation options, mirroring `MutationObserverInit`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct ObserveFlags {
    /// Observe child insertions and removals.
    pub child_list: bool,
    /// Extend observation to the whole subtree.
    pub subtree: bool,
    /// Observe text content changes.
    pub character_data: bool,
    /// Observe attribute changes.
    pub attributes: bool,
}

impl ObserveFlags {
    /// Nothing observed.
    pub const NONE: Self = Self {
        child_list: false,
        subtree: false,
        character_data: false,
        attributes: false,
    };

    /// Insertions anywhere in the document.
    pub const CHILD_TREE: Self = Self {
        child_list: true,
        subtree: true,
        character_data: false,
        attributes: false,
    };

    /// Insertions and text edits anywhere in the document.
    pub const TEXT_TREE: Self = Self {
        child_list: true,
        subtree: true,
        character_data: true,
        attributes: false,
    };

    /// Returns the logical OR of two flag sets.
    #[must_use]
    pub const fn union(self, other: Self) -> Self {
        Self {
            child_list: self.child_list || other.child_list,
            subtree: self.subtree || other.subtree,
            character_data: self.character_data || other.character_data,
            attributes: self.attributes || other.attributes,
        }
    }

    /// Forces `subtree` when character data or attributes are requested;
    /// either is useless on the root alone.
    #[must_use]
    pub const fn normalized(self) -> Self {
        Self {
            subtree: self.subtree || self.character_data || self.attributes,
            ..self
        }
    }

    /// Returns `true` if nothing is observed.
    #[must_use]
    pub const fn is_empty(self) -> bool {
        !(self.child_list || self.subtree || self.character_data || self.attributes)
    }
}

/// One raw observation, as reported by the backend's observer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MutationRecord {
    /// Children were added under `target`.
    ChildList {
        /// The parent that changed.
        target: NodeId,
        /// Added nodes with their kinds.
        added: Vec<(NodeId, NodeKind)>,
    },
    /// The character data of `target` changed.
    CharacterData {
        /// The text node.
        target: NodeId,
    },
    /// An attribute on `target` changed.
    Attributes {
        /// The element.
        target: NodeId,
    },
}

/// The normalized payload delivered to every subscriber.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MutationBatch {
    /// Batch sequence number, starting at 1.
    pub seq: u64,
    /// Every distinct added node (elements and text).
    pub added_nodes: Vec<NodeId>,
    /// Distinct added text nodes and text nodes whose data changed.
    pub text_nodes: Vec<NodeId>,
    /// Distinct elements whose attributes changed.
    pub attribute_targets: Vec<NodeId>,
}

/// Handle returned by [`MutationMultiplexer::subscribe`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

#[derive(Clone, Debug)]
struct Subscription<K> {
    id: SubscriptionId,
    key: K,
    flags: ObserveFlags,
    /// Logical clock value at registration.
    since: u64,
}

/// Owns the logical single observer and its subscriber registry.
///
/// `K` identifies subscribers to the delivery callback passed to
/// [`flush`](Self::flush); the controller uses a small enum.
#[derive(Debug)]
pub struct MutationMultiplexer<K> {
    subscriptions: Vec<Subscription<K>>,
    /// Flags the observer is (or was last asked to be) connected with.
    merged: ObserveFlags,
    attached: bool,
    pending: Vec<MutationRecord>,
    /// Logical clock value when the pending batch began.
    batch_started: Option<u64>,
    clock: u64,
    next_id: u64,
    batches: u64,
    flush_requested: bool,
}

impl<K> Default for MutationMultiplexer<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K> MutationMultiplexer<K> {
    /// Creates a multiplexer with no subscribers and a disconnected observer.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            subscriptions: Vec::new(),
            merged: ObserveFlags::NONE,
            attached: false,
            pending: Vec::new(),
            batch_started: None,
            clock: 0,
            next_id: 0,
            batches: 0,
            flush_requested: false,
        }
    }

    /// The merged flags the observer is connected with.
    #[must_use]
    pub fn merged_flags(&self) -> ObserveFlags {
        self.merged
    }

    /// Whether the observer is believed to be attached.
    #[must_use]
    pub fn is_attached(&self) -> bool {
        self.attached
    }

    /// Number of live subscriptions.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.subscriptions.len()
    }

    /// Whether records are buffered awaiting a flush.
    #[must_use]
    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Registers interest in `flags` on behalf of `key`.
    ///
    /// Returns the subscription handle and any observer reconnect effect.
    pub fn subscribe(
        &mut self,
        key: K,
        flags: ObserveFlags,
        tracer: &mut Tracer<'_>,
    ) -> (SubscriptionId, EffectSet) {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        let since = self.tick();
        self.subscriptions.push(Subscription {
            id,
            key,
            flags: flags.normalized(),
            since,
        });
        (id, self.recompute(tracer))
    }

    /// Drops a subscription. Unknown handles are ignored.
    pub fn unsubscribe(&mut self, id: SubscriptionId, tracer: &mut Tracer<'_>) -> EffectSet {
        let before = self.subscriptions.len();
        self.subscriptions.retain(|s| s.id != id);
        if self.subscriptions.len() == before {
            return EffectSet::new();
        }
        if self.subscriptions.is_empty() {
            self.pending.clear();
            self.batch_started = None;
        }
        self.recompute(tracer)
    }

    /// Buffers one raw record.
    ///
    /// The first record of a batch requests a flush.
    pub fn record(&mut self, record: MutationRecord) -> EffectSet {
        if self.subscriptions.is_empty() {
            return EffectSet::new();
        }
        if self.batch_started.is_none() {
            self.batch_started = Some(self.tick());
        }
        self.pending.push(record);
        self.request_flush()
    }

    /// Asks for a flush on the next frame, unless one is already pending.
    pub fn request_flush(&mut self) -> EffectSet {
        if self.flush_requested {
            EffectSet::new()
        } else {
            self.flush_requested = true;
            EffectSet::from(Effect::RequestFlush)
        }
    }

    /// Reports that the backend's `observe()` call threw.
    ///
    /// The engine keeps running without insertion tracking; the next change
    /// to the subscriber set retries the attach.
    pub fn observer_failed(&mut self, error: &FrictionError, tracer: &mut Tracer<'_>) {
        self.attached = false;
        tracer.fault(Component::Multiplexer, error);
    }

    fn tick(&mut self) -> u64 {
        self.clock += 1;
        self.clock
    }

    fn recompute(&mut self, tracer: &mut Tracer<'_>) -> EffectSet {
        let merged = self
            .subscriptions
            .iter()
            .fold(ObserveFlags::NONE, |acc, s| acc.union(s.flags));

        let mut effects = EffectSet::new();
        if merged.is_empty() {
            if self.attached || !self.merged.is_empty() {
                effects.push(Effect::Disconnect);
                tracer.observer(&ObserverEvent {
                    flags: merged,
                    connected: false,
                });
            }
            self.attached = false;
        } else if merged != self.merged || !self.attached {
            effects.push(Effect::Observe(merged));
            self.attached = true;
            tracer.observer(&ObserverEvent {
                flags: merged,
                connected: true,
            });
        }
        self.merged = merged;
        effects
    }
}

impl<K: Copy> MutationMultiplexer<K> {
    /// Collapses buffered records into one batch and delivers it.
    ///
    /// `deliver` runs once per eligible subscriber, in registration order.
    /// An error from one subscriber is traced and delivery continues.
    /// `tracer` is lent to each delivery in turn.
    pub fn flush(
        &mut self,
        tracer: &mut Tracer<'_>,
        mut deliver: impl FnMut(
            K,
            &MutationBatch,
            &mut Tracer<'_>,
        ) -> Result<EffectSet, FrictionError>,
    ) -> EffectSet {
        self.flush_requested = false;
        let Some(started) = self.batch_started.take() else {
            return EffectSet::new();
        };
        let records = core::mem::take(&mut self.pending);
        self.batches += 1;
        let batch = collapse(self.batches, &records);

        let recipients: Vec<K> = self
            .subscriptions
            .iter()
            .filter(|s| s.since < started)
            .map(|s| s.key)
            .collect();

        let mut effects = EffectSet::new();
        for &key in &recipients {
            match deliver(key, &batch, &mut *tracer) {
                Ok(e) => effects.append(e),
                Err(err) => tracer.fault(Component::Multiplexer, &err),
            }
        }

        tracer.batch(&BatchEvent {
            seq: batch.seq,
            records: records.len(),
            added: batch.added_nodes.len(),
            text: batch.text_nodes.len(),
            attributes: batch.attribute_targets.len(),
            delivered: recipients.len(),
        });
        effects
    }
}

fn collapse(seq: u64, records: &[MutationRecord]) -> MutationBatch {
    let mut batch = MutationBatch {
        seq,
        ..MutationBatch::default()
    };
    let mut seen_added = BTreeSet::new();
    let mut seen_text = BTreeSet::new();
    let mut seen_attr = BTreeSet::new();

    for record in records {
        match record {
            MutationRecord::ChildList { added, .. } => {
                for &(node, kind) in added {
                    if seen_added.insert(node) {
                        batch.added_nodes.push(node);
                    }
                    if kind == NodeKind::Text && seen_text.insert(node) {
                        batch.text_nodes.push(node);
                    }
                }
            }
            MutationRecord::CharacterData { target } => {
                if seen_text.insert(*target) {
                    batch.text_nodes.push(*target);
                }
            }
            MutationRecord::Attributes { target } => {
                if seen_attr.insert(*target) {
                    batch.attribute_targets.push(*target);
                }
            }
        }
    }
    batch
}

#[cfg(test)]
mod tests {
    use alloc::string::ToString as _;
    use alloc::vec;

    use super::*;

    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    enum Sub {
        A,
        B,
    }

    fn n(i: u32) -> NodeId {
        NodeId::new(i, 0)
    }

    fn added(target: u32, nodes: &[(u32, NodeKind)]) -> MutationRecord {
        MutationRecord::ChildList {
            target: n(target),
            added: nodes.iter().map(|&(i, k)| (n(i), k)).collect(),
        }
    }

    #[test]
    fn flags_merge_and_force_subtree() {
        let f = ObserveFlags {
            attributes: true,
            ..ObserveFlags::NONE
        };
        assert!(f.normalized().subtree);
        assert_eq!(
            ObserveFlags::CHILD_TREE.union(ObserveFlags::TEXT_TREE),
            ObserveFlags::TEXT_TREE
        );
        assert!(ObserveFlags::NONE.is_empty());
    }

    #[test]
    fn reconnects_only_when_merged_flags_change() {
        let mut tracer = Tracer::none();
        let mut mux = MutationMultiplexer::new();

        let (a, e1) = mux.subscribe(Sub::A, ObserveFlags::CHILD_TREE, &mut tracer);
        assert_eq!(e1.into_vec(), vec![Effect::Observe(ObserveFlags::CHILD_TREE)]);

        // Same flags again: no churn.
        let (b, e2) = mux.subscribe(Sub::B, ObserveFlags::CHILD_TREE, &mut tracer);
        assert!(e2.is_empty(), "identical merged flags must not reconnect");

        // Widening reconnects.
        let (c, e3) = mux.subscribe(Sub::B, ObserveFlags::TEXT_TREE, &mut tracer);
        assert_eq!(e3.into_vec(), vec![Effect::Observe(ObserveFlags::TEXT_TREE)]);

        // Narrowing back reconnects.
        let e4 = mux.unsubscribe(c, &mut tracer);
        assert_eq!(e4.into_vec(), vec![Effect::Observe(ObserveFlags::CHILD_TREE)]);

        assert!(mux.unsubscribe(a, &mut tracer).is_empty());
        assert_eq!(
            mux.unsubscribe(b, &mut tracer).into_vec(),
            vec![Effect::Disconnect]
        );
        assert!(!mux.is_attached());
    }

    #[test]
    fn batch_is_deduplicated_in_arrival_order() {
        let mut tracer = Tracer::none();
        let mut mux = MutationMultiplexer::new();
        let _ = mux.subscribe(Sub::A, ObserveFlags::TEXT_TREE, &mut tracer);

        let first = mux.record(added(0, &[(5, NodeKind::Element), (6, NodeKind::Text)]));
        assert_eq!(first.into_vec(), vec![Effect::RequestFlush]);
        assert!(mux.record(MutationRecord::CharacterData { target: n(6) }).is_empty());
        let _ = mux.record(MutationRecord::CharacterData { target: n(7) });
        let _ = mux.record(added(0, &[(5, NodeKind::Element)]));
        let _ = mux.record(MutationRecord::Attributes { target: n(5) });

        let mut seen = Vec::new();
        let _ = mux.flush(&mut tracer, |key, batch, _| {
            seen.push((key, batch.clone()));
            Ok(EffectSet::new())
        });
        assert_eq!(seen.len(), 1);
        let batch = &seen[0].1;
        assert_eq!(batch.added_nodes, vec![n(5), n(6)]);
        assert_eq!(batch.text_nodes, vec![n(6), n(7)]);
        assert_eq!(batch.attribute_targets, vec![n(5)]);
        assert!(!mux.has_pending());
    }

    #[test]
    fn every_subscriber_gets_the_same_payload() {
        let mut tracer = Tracer::none();
        let mut mux = MutationMultiplexer::new();
        let _ = mux.subscribe(Sub::A, ObserveFlags::CHILD_TREE, &mut tracer);
        let _ = mux.subscribe(Sub::B, ObserveFlags::TEXT_TREE, &mut tracer);
        let _ = mux.record(added(0, &[(1, NodeKind::Element)]));

        let mut seqs = Vec::new();
        let _ = mux.flush(&mut tracer, |key, batch, _| {
            seqs.push((key, batch.seq, batch.added_nodes.clone()));
            Ok(EffectSet::new())
        });
        assert_eq!(
            seqs,
            vec![(Sub::A, 1, vec![n(1)]), (Sub::B, 1, vec![n(1)])]
        );
    }

    #[test]
    fn late_subscriber_skips_batch_in_progress() {
        let mut tracer = Tracer::none();
        let mut mux = MutationMultiplexer::new();
        let _ = mux.subscribe(Sub::A, ObserveFlags::CHILD_TREE, &mut tracer);
        let _ = mux.record(added(0, &[(1, NodeKind::Element)]));
        let _ = mux.subscribe(Sub::B, ObserveFlags::CHILD_TREE, &mut tracer);
        let _ = mux.record(added(0, &[(2, NodeKind::Element)]));

        let mut keys = Vec::new();
        let _ = mux.flush(&mut tracer, |key, _, _| {
            keys.push(key);
            Ok(EffectSet::new())
        });
        assert_eq!(keys, vec![Sub::A]);

        // The next batch reaches both.
        let _ = mux.record(added(0, &[(3, NodeKind::Element)]));
        keys.clear();
        let _ = mux.flush(&mut tracer, |key, _, _| {
            keys.push(key);
            Ok(EffectSet::new())
        });
        assert_eq!(keys, vec![Sub::A, Sub::B]);
    }

    #[test]
    fn failing_subscriber_does_not_block_others() {
        let mut tracer = Tracer::none();
        let mut mux = MutationMultiplexer::new();
        let _ = mux.subscribe(Sub::A, ObserveFlags::CHILD_TREE, &mut tracer);
        let _ = mux.subscribe(Sub::B, ObserveFlags::CHILD_TREE, &mut tracer);
        let _ = mux.record(added(0, &[(1, NodeKind::Element)]));

        let effects = mux.flush(&mut tracer, |key, _, _| match key {
            Sub::A => Err(FrictionError::Detached(n(1))),
            Sub::B => Ok(EffectSet::from(Effect::RequestFlush)),
        });
        assert_eq!(effects.into_vec(), vec![Effect::RequestFlush]);
    }

    #[test]
    fn observer_failure_retries_on_next_change() {
        let mut tracer = Tracer::none();
        let mut mux = MutationMultiplexer::new();
        let _ = mux.subscribe(Sub::A, ObserveFlags::CHILD_TREE, &mut tracer);
        mux.observer_failed(
            &FrictionError::ObserverAttach {
                reason: "restricted root".to_string(),
            },
            &mut tracer,
        );
        assert!(!mux.is_attached());

        // Same merged flags, but the observer is detached: reattach.
        let (_, effects) = mux.subscribe(Sub::B, ObserveFlags::CHILD_TREE, &mut tracer);
        assert_eq!(
            effects.into_vec(),
            vec![Effect::Observe(ObserveFlags::CHILD_TREE)]
        );
    }

    #[test]
    fn records_without_subscribers_are_dropped() {
        let mut mux: MutationMultiplexer<Sub> = MutationMultiplexer::new();
        assert!(mux.record(added(0, &[(1, NodeKind::Element)])).is_empty());
        assert!(!mux.has_pending());
    }
}
