// Copyright 2026 the Friction Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Reversible word-order permutation of live text nodes.
//!
//! [`TextShuffler`] keeps one [`ShuffleRecord`] (original and shuffled text)
//! per qualifying text node and writes the shuffled rendering in place. The
//! permutation is seeded from the text itself, so the same text at the same
//! strength always renders the same way, and it only moves whole words:
//! whitespace runs stay where they were.
//!
//! Work is bounded per frame. The initial scan and each mutation batch queue
//! text nodes; at most [`ShuffleConfig::per_flush_cap`] are processed per
//! [`drain`](TextShuffler::drain), and a flush is requested while the queue
//! is non-empty.
//!
//! A node is skipped when:
//!
//! - its trimmed length or word count falls outside the configured ranges;
//! - its parent element is editable;
//! - its parent element is inside a match of an excluded selector;
//! - it already holds a live record showing the shuffled text;
//! - the probability gate (seeded like the permutation) rejects it.
//!
//! When the page rewrites a shuffled node, the stale record is dropped and the
//! node is evaluated again as new.

mod permute;

pub use permute::{Lcg32, SwapPlan, fnv1a, is_word, permute, tokenize};

use alloc::collections::{BTreeMap, BTreeSet, VecDeque};
use alloc::string::{String, ToString as _};
use alloc::vec::Vec;

use crate::dom::{DomView, closest_composed};
use crate::effect::{Effect, EffectSet};
use crate::error::FrictionError;
use crate::mutation::{MutationBatch, MutationMultiplexer, ObserveFlags, SubscriptionId};
use crate::node::{NodeId, NodeKind};
use crate::trace::{Component, ManagerAction, Tracer};

/// Selectors whose contents are never shuffled, on every site.
pub const ALWAYS_EXCLUDED: [&str; 6] = ["script", "style", "noscript", "textarea", "code", "pre"];

/// Tuning for the permutation engine.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ShuffleConfig {
    /// Strengths below this disable the engine.
    pub min_strength: f64,
    /// Minimum trimmed length, in characters.
    pub min_chars: usize,
    /// Maximum trimmed length, in characters.
    pub max_chars: usize,
    /// Minimum word count.
    pub min_words: usize,
    /// Maximum word count.
    pub max_words: usize,
    /// Gate probability at strength 0.
    pub gate_base: f64,
    /// Gate probability added per unit of strength.
    pub gate_per_strength: f64,
    /// Text nodes processed per drain.
    pub per_flush_cap: usize,
    /// Mixed into every permutation seed.
    pub seed: u32,
}

impl ShuffleConfig {
    /// Default tuning.
    #[must_use]
    pub const fn standard() -> Self {
        Self {
            min_strength: 0.05,
            min_chars: 8,
            max_chars: 2000,
            min_words: 4,
            max_words: 220,
            gate_base: 0.35,
            gate_per_strength: 0.65,
            per_flush_cap: 200,
            seed: 0x5eed_f00d,
        }
    }
}

impl Default for ShuffleConfig {
    fn default() -> Self {
        Self::standard()
    }
}

/// What the controller asks of the engine.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ShuffleSettings {
    /// Whether the filter is on.
    pub enabled: bool,
    /// Strength in `0.0..=1.0`.
    pub strength: f64,
}

/// Saved original and shuffled text for one node.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ShuffleRecord {
    /// Text before the engine touched the node.
    pub original: String,
    /// Text the engine wrote.
    pub shuffled: String,
}

/// The text permutation engine.
#[derive(Debug)]
pub struct TextShuffler<K> {
    key: K,
    config: ShuffleConfig,
    strength: Option<f64>,
    excluded: Vec<String>,
    subscription: Option<SubscriptionId>,
    records: BTreeMap<NodeId, ShuffleRecord>,
    pending: VecDeque<NodeId>,
    queued: BTreeSet<NodeId>,
}

impl<K: Copy> TextShuffler<K> {
    /// Creates a disabled engine.
    #[must_use]
    pub fn new(key: K, config: ShuffleConfig) -> Self {
        Self {
            key,
            config,
            strength: None,
            excluded: Vec::new(),
            subscription: None,
            records: BTreeMap::new(),
            pending: VecDeque::new(),
            queued: BTreeSet::new(),
        }
    }

    /// The active strength, or `None` when disabled.
    #[must_use]
    pub fn strength(&self) -> Option<f64> {
        self.strength
    }

    /// The live record for `node`.
    #[must_use]
    pub fn record(&self, node: NodeId) -> Option<&ShuffleRecord> {
        self.records.get(&node)
    }

    /// Number of live records.
    #[must_use]
    pub fn record_count(&self) -> usize {
        self.records.len()
    }

    /// Number of queued text nodes.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    /// Enables, re-tunes, or disables the engine.
    ///
    /// `excluded_closest` is the site's exclusion list; the fixed
    /// [`ALWAYS_EXCLUDED`] selectors are added to it.
    pub fn update(
        &mut self,
        settings: ShuffleSettings,
        excluded_closest: &[String],
        dom: &(impl DomView + ?Sized),
        mux: &mut MutationMultiplexer<K>,
        tracer: &mut Tracer<'_>,
    ) -> EffectSet {
        let target = (settings.enabled && settings.strength >= self.config.min_strength)
            .then(|| settings.strength.min(1.0));
        let excluded: Vec<String> = excluded_closest
            .iter()
            .cloned()
            .chain(ALWAYS_EXCLUDED.iter().map(|s| (*s).to_string()))
            .collect();

        if target == self.strength && (target.is_none() || excluded == self.excluded) {
            return EffectSet::new();
        }

        let was_active = self.strength.is_some();
        let (mut effects, restored) = self.restore_all(dom);

        let Some(strength) = target else {
            if let Some(id) = self.subscription.take() {
                effects.append(mux.unsubscribe(id, tracer));
            }
            self.strength = None;
            tracer.manager(Component::TextShuffle, ManagerAction::Removed);
            return effects;
        };

        self.strength = Some(strength);
        self.excluded = excluded;
        if self.subscription.is_none() {
            let (id, e) = mux.subscribe(self.key, ObserveFlags::TEXT_TREE, tracer);
            self.subscription = Some(id);
            effects.append(e);
        }
        if let Some(root) = dom.root() {
            for node in dom.text_nodes(root) {
                self.enqueue(node);
            }
        }
        effects.append(self.process(dom, &restored, mux, tracer));
        tracer.manager(
            Component::TextShuffle,
            if was_active {
                ManagerAction::Updated
            } else {
                ManagerAction::Applied
            },
        );
        effects
    }

    /// Queues the batch's new and changed text nodes.
    ///
    /// Nothing is written here; the controller calls [`drain`](Self::drain)
    /// after every flush.
    pub fn on_batch(
        &mut self,
        batch: &MutationBatch,
        dom: &(impl DomView + ?Sized),
    ) -> Result<EffectSet, FrictionError> {
        if self.strength.is_none() {
            return Ok(EffectSet::new());
        }
        for &node in &batch.added_nodes {
            if dom.kind(node) == NodeKind::Element {
                for text in dom.text_nodes(node) {
                    self.enqueue(text);
                }
            }
        }
        for &node in &batch.text_nodes {
            self.enqueue(node);
        }
        Ok(EffectSet::new())
    }

    /// Processes up to the per-flush cap of queued nodes.
    pub fn drain(
        &mut self,
        dom: &(impl DomView + ?Sized),
        mux: &mut MutationMultiplexer<K>,
        tracer: &mut Tracer<'_>,
    ) -> EffectSet {
        if self.strength.is_none() {
            return EffectSet::new();
        }
        self.process(dom, &BTreeMap::new(), mux, tracer)
    }

    /// Restores every record and unsubscribes.
    pub fn remove(
        &mut self,
        dom: &(impl DomView + ?Sized),
        mux: &mut MutationMultiplexer<K>,
        tracer: &mut Tracer<'_>,
    ) -> EffectSet {
        self.update(ShuffleSettings::default(), &[], dom, mux, tracer)
    }

    fn enqueue(&mut self, node: NodeId) {
        if self.queued.insert(node) {
            self.pending.push_back(node);
        }
    }

    /// Writes originals back where the node still shows the shuffled text.
    ///
    /// Returns the effects and the originals of every record, so a rescan in
    /// the same transition sees the restored text.
    fn restore_all(
        &mut self,
        dom: &(impl DomView + ?Sized),
    ) -> (EffectSet, BTreeMap<NodeId, String>) {
        let mut effects = EffectSet::new();
        let mut restored = BTreeMap::new();
        for (node, record) in core::mem::take(&mut self.records) {
            if !dom.is_connected(node) {
                continue;
            }
            if dom.text(node).as_deref() == Some(record.shuffled.as_str()) {
                if record.shuffled != record.original {
                    effects.push(Effect::SetText {
                        node,
                        value: record.original.clone(),
                    });
                }
                restored.insert(node, record.original);
            }
        }
        self.pending.clear();
        self.queued.clear();
        (effects, restored)
    }

    fn process(
        &mut self,
        dom: &(impl DomView + ?Sized),
        restored: &BTreeMap<NodeId, String>,
        mux: &mut MutationMultiplexer<K>,
        tracer: &mut Tracer<'_>,
    ) -> EffectSet {
        let mut effects = EffectSet::new();
        let Some(strength) = self.strength else {
            return effects;
        };
        for _ in 0..self.config.per_flush_cap {
            let Some(node) = self.pending.pop_front() else {
                break;
            };
            self.queued.remove(&node);
            let current = restored.get(&node).cloned().or_else(|| dom.text(node));
            if let Some(text) = current
                && let Some(effect) = self.visit(node, text, strength, dom, tracer)
            {
                effects.push(effect);
            }
        }
        if !self.pending.is_empty() {
            effects.append(mux.request_flush());
        }
        effects
    }

    fn visit(
        &mut self,
        node: NodeId,
        text: String,
        strength: f64,
        dom: &(impl DomView + ?Sized),
        tracer: &mut Tracer<'_>,
    ) -> Option<Effect> {
        if !dom.is_connected(node) {
            self.records.remove(&node);
            return None;
        }
        if let Some(record) = self.records.get(&node) {
            if record.shuffled == text {
                return None;
            }
            // The page rewrote the node; evaluate it afresh.
            self.records.remove(&node);
        }

        let chars = text.trim().chars().count();
        if chars < self.config.min_chars || chars > self.config.max_chars {
            return None;
        }
        let tokens = tokenize(&text);
        let words = tokens.iter().filter(|t| is_word(t)).count();
        if words < self.config.min_words || words > self.config.max_words {
            return None;
        }

        let element = dom.parent_element(node)?;
        if dom.is_content_editable(element) || self.is_excluded(element, dom, tracer) {
            return None;
        }

        let mut rng = Lcg32::new(self.seed_for(strength, &text));
        let gate = (self.config.gate_base + self.config.gate_per_strength * strength).min(1.0);
        if rng.next_f64() >= gate {
            return None;
        }

        let shuffled = permute(&tokens, SwapPlan::for_strength(strength), &mut rng);
        #[cfg(feature = "trace-rich")]
        tracer.shuffle(&crate::trace::ShuffleEvent {
            node,
            words: u32::try_from(words).unwrap_or(u32::MAX),
            changed: shuffled != text,
        });
        let effect = (shuffled != text).then(|| Effect::SetText {
            node,
            value: shuffled.clone(),
        });
        self.records.insert(
            node,
            ShuffleRecord {
                original: text,
                shuffled,
            },
        );
        effect
    }

    fn is_excluded(
        &self,
        element: NodeId,
        dom: &(impl DomView + ?Sized),
        tracer: &mut Tracer<'_>,
    ) -> bool {
        self.excluded.iter().any(|selector| {
            match closest_composed(dom, element, selector) {
                Ok(found) => found.is_some(),
                Err(err) => {
                    tracer.fault(Component::TextShuffle, &FrictionError::from(err));
                    false
                }
            }
        })
    }

    fn seed_for(&self, strength: f64, text: &str) -> u32 {
        #[expect(
            clippy::cast_possible_truncation,
            clippy::cast_sign_loss,
            reason = "strength is clamped to [0, 1]"
        )]
        let bucket = (strength * 100.0 + 0.5) as u32;
        fnv1a(&[
            &self.config.seed.to_le_bytes(),
            &bucket.to_le_bytes(),
            text.as_bytes(),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::headless::HeadlessDom;
    use crate::mutation::MutationRecord;

    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    struct Key;

    const PARAGRAPH: &str = "Every scroll through the feed reveals another \
        headline designed to keep you reading just a little longer tonight";

    fn on(strength: f64) -> ShuffleSettings {
        ShuffleSettings {
            enabled: true,
            strength,
        }
    }

    fn sorted_words(s: &str) -> Vec<&str> {
        let mut w: Vec<&str> = s.split_whitespace().collect();
        w.sort_unstable();
        w
    }

    /// A gate of 1.0 so every qualifying node is shuffled.
    fn config() -> ShuffleConfig {
        ShuffleConfig {
            gate_base: 1.0,
            ..ShuffleConfig::standard()
        }
    }

    #[test]
    fn apply_then_remove_restores_exact_original() {
        let mut dom = HeadlessDom::new();
        let root = dom.root_element();
        let p = dom.append_element(root, "p");
        let t = dom.append_text(p, PARAGRAPH);
        let mut mux = MutationMultiplexer::new();
        let mut tracer = Tracer::none();
        let mut engine = TextShuffler::new(Key, config());

        let e = engine.update(on(1.0), &[], &dom, &mut mux, &mut tracer);
        dom.apply(&e);
        let shuffled = dom.text(t).unwrap();
        assert_ne!(shuffled, PARAGRAPH);
        assert_eq!(shuffled.len(), PARAGRAPH.len());
        assert_eq!(sorted_words(&shuffled), sorted_words(PARAGRAPH));

        let e = engine.remove(&dom, &mut mux, &mut tracer);
        dom.apply(&e);
        assert_eq!(dom.text(t).as_deref(), Some(PARAGRAPH));
        assert_eq!(engine.record_count(), 0);
        assert_eq!(dom.observer(), None);
    }

    #[test]
    fn same_strength_is_a_no_op_and_different_strength_rescans() {
        let mut dom = HeadlessDom::new();
        let root = dom.root_element();
        let p = dom.append_element(root, "p");
        let t = dom.append_text(p, PARAGRAPH);
        let mut mux = MutationMultiplexer::new();
        let mut tracer = Tracer::none();
        let mut engine = TextShuffler::new(Key, config());

        let e = engine.update(on(0.5), &[], &dom, &mut mux, &mut tracer);
        dom.apply(&e);
        let again = engine.update(on(0.5), &[], &dom, &mut mux, &mut tracer);
        assert_eq!(dom.apply(&again), 0);

        let e = engine.update(on(1.0), &[], &dom, &mut mux, &mut tracer);
        dom.apply(&e);
        let record = engine.record(t).unwrap();
        assert_eq!(record.original, PARAGRAPH, "rescan starts from the original");
        assert_eq!(dom.text(t).as_deref(), Some(record.shuffled.as_str()));
    }

    #[test]
    fn permutation_is_deterministic_per_text() {
        let mut dom = HeadlessDom::new();
        let root = dom.root_element();
        let a = dom.append_element(root, "p");
        let ta = dom.append_text(a, PARAGRAPH);
        let b = dom.append_element(root, "p");
        let tb = dom.append_text(b, PARAGRAPH);
        let mut mux = MutationMultiplexer::new();
        let mut engine = TextShuffler::new(Key, config());
        let e = engine.update(on(0.8), &[], &dom, &mut mux, &mut Tracer::none());
        dom.apply(&e);
        assert_eq!(dom.text(ta), dom.text(tb));
    }

    #[test]
    fn rejects_short_long_editable_and_excluded_text() {
        let mut dom = HeadlessDom::new();
        let root = dom.root_element();
        let short = dom.append_element(root, "p");
        let t_short = dom.append_text(short, "too few words");
        let editor = dom.append_element(root, "div");
        dom.set_attr(editor, "contenteditable", "true");
        let t_edit = dom.append_text(editor, PARAGRAPH);
        let code = dom.append_element(root, "pre");
        let t_code = dom.append_text(code, PARAGRAPH);
        let nav = dom.append_element(root, "nav");
        let span = dom.append_element(nav, "span");
        let t_nav = dom.append_text(span, PARAGRAPH);

        let mut mux = MutationMultiplexer::new();
        let mut engine = TextShuffler::new(Key, config());
        let excluded = ["nav".to_string(), "::broken(".to_string()];
        let e = engine.update(on(1.0), &excluded, &dom, &mut mux, &mut Tracer::none());
        assert_eq!(dom.apply(&e), 0);
        for t in [t_short, t_edit, t_code, t_nav] {
            assert!(engine.record(t).is_none());
        }
    }

    #[test]
    fn inserted_text_is_shuffled_on_drain_and_own_writes_are_ignored() {
        let mut dom = HeadlessDom::new();
        let root = dom.root_element();
        let mut mux = MutationMultiplexer::new();
        let mut tracer = Tracer::none();
        let mut engine = TextShuffler::new(Key, config());
        let e = engine.update(on(1.0), &[], &dom, &mut mux, &mut tracer);
        dom.apply(&e);
        let _ = dom.take_records();

        let card = dom.append_element(root, "div");
        let t = dom.append_text(card, PARAGRAPH);
        for record in dom.take_records() {
            let _ = mux.record(record);
        }
        let _ = mux.flush(&mut tracer, |_, batch, _| engine.on_batch(batch, &dom));
        let e = engine.drain(&dom, &mut mux, &mut tracer);
        assert_eq!(dom.apply(&e), 1);
        let shuffled = dom.text(t).unwrap();

        // Our own write comes back as a character-data record.
        let _ = mux.record(MutationRecord::CharacterData { target: t });
        let _ = mux.flush(&mut tracer, |_, batch, _| engine.on_batch(batch, &dom));
        let e = engine.drain(&dom, &mut mux, &mut tracer);
        assert_eq!(dom.apply(&e), 0);
        assert_eq!(dom.text(t).as_deref(), Some(shuffled.as_str()));
    }

    #[test]
    fn page_rewrite_drops_stale_record() {
        let mut dom = HeadlessDom::new();
        let root = dom.root_element();
        let p = dom.append_element(root, "p");
        let t = dom.append_text(p, PARAGRAPH);
        let mut mux = MutationMultiplexer::new();
        let mut tracer = Tracer::none();
        let mut engine = TextShuffler::new(Key, config());
        let e = engine.update(on(1.0), &[], &dom, &mut mux, &mut tracer);
        dom.apply(&e);
        let _ = dom.take_records();

        let fresh = "A completely different sentence now lives inside this paragraph node";
        dom.set_text(t, fresh);
        for record in dom.take_records() {
            let _ = mux.record(record);
        }
        let _ = mux.flush(&mut tracer, |_, batch, _| engine.on_batch(batch, &dom));
        let e = engine.drain(&dom, &mut mux, &mut tracer);
        dom.apply(&e);
        assert_eq!(engine.record(t).unwrap().original, fresh);

        let e = engine.remove(&dom, &mut mux, &mut tracer);
        dom.apply(&e);
        assert_eq!(dom.text(t).as_deref(), Some(fresh));
    }

    #[test]
    fn work_is_capped_per_drain() {
        let mut dom = HeadlessDom::new();
        let root = dom.root_element();
        let mut texts = Vec::new();
        for _ in 0..5 {
            let p = dom.append_element(root, "p");
            texts.push(dom.append_text(p, PARAGRAPH));
        }
        let mut mux = MutationMultiplexer::new();
        let mut tracer = Tracer::none();
        let mut engine = TextShuffler::new(
            Key,
            ShuffleConfig {
                per_flush_cap: 2,
                ..config()
            },
        );
        let e = engine.update(on(1.0), &[], &dom, &mut mux, &mut tracer);
        assert!(e.any(|e| *e == Effect::RequestFlush));
        assert_eq!(dom.apply(&e), 2);
        assert_eq!(engine.pending(), 3);

        let _ = mux.flush(&mut tracer, |_, _, _| Ok(EffectSet::new()));
        let e = engine.drain(&dom, &mut mux, &mut tracer);
        assert_eq!(dom.apply(&e), 2);
        let _ = mux.flush(&mut tracer, |_, _, _| Ok(EffectSet::new()));
        let e = engine.drain(&dom, &mut mux, &mut tracer);
        assert_eq!(dom.apply(&e), 1);
        assert!(!e.any(|e| *e == Effect::RequestFlush));
        assert_eq!(engine.record_count(), 5);
    }

    #[test]
    fn below_floor_is_disabled() {
        let dom = HeadlessDom::new();
        let mut mux = MutationMultiplexer::new();
        let mut engine = TextShuffler::new(Key, config());
        let e = engine.update(on(0.01), &[], &dom, &mut mux, &mut Tracer::none());
        assert!(e.is_empty());
        assert_eq!(engine.strength(), None);
    }
}
