// Copyright 2026 the Friction Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Per-media credit state and its generational arena.

use alloc::collections::BTreeMap;
use alloc::vec::Vec;

use crate::node::NodeId;
use crate::time::HostTime;

/// Identity of the source loaded into a media element.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SourceFingerprint(pub u64);

/// Fingerprints a source URL (`currentSrc`) with 64-bit FNV-1a.
#[must_use]
pub fn fingerprint(src: &str) -> SourceFingerprint {
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for &b in src.as_bytes() {
        hash ^= u64::from(b);
        hash = hash.wrapping_mul(0x0000_0100_0000_01b3);
    }
    SourceFingerprint(hash)
}

/// The credit ledger of one media element.
///
/// Positions are media time in seconds.
#[derive(Clone, Debug, PartialEq)]
pub struct MediaCreditState {
    /// Credits available, in `0..=max`.
    pub available_credits: u8,
    /// Watch time accrued toward the next credit.
    pub accumulated_seconds: f64,
    /// Last position reached by normal playback or an allowed seek.
    pub last_stable_time: f64,
    /// Position at the previous charging step.
    pub last_charge_time: f64,
    /// No credit may be spent before this instant.
    pub cooldown_until: HostTime,
    /// The source the ledger belongs to.
    pub source: SourceFingerprint,
    /// A blocked jump is being undone.
    pub reverting: bool,
    /// Where the revert snaps back to.
    pub revert_target: f64,
}

impl MediaCreditState {
    /// A full ledger for `source` starting at `position`.
    #[must_use]
    pub fn new(max_credits: u8, source: SourceFingerprint, position: f64) -> Self {
        Self {
            available_credits: max_credits,
            accumulated_seconds: 0.0,
            last_stable_time: position,
            last_charge_time: position,
            cooldown_until: HostTime::ZERO,
            source,
            reverting: false,
            revert_target: position,
        }
    }

    /// Moves both baselines to `position`.
    pub fn rebase(&mut self, position: f64) {
        self.last_stable_time = position;
        self.last_charge_time = position;
    }
}

/// A handle into [`MediaTable`].
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct MediaHandle {
    idx: u32,
    generation: u32,
}

#[derive(Clone, Debug)]
struct Slot {
    generation: u32,
    entry: Option<(NodeId, MediaCreditState)>,
}

/// Credit state for every media element seen, keyed by element identity.
///
/// Slots are recycled through a free list; a generation counter makes stale
/// [`MediaHandle`]s miss instead of aliasing a newer element.
#[derive(Clone, Debug, Default)]
pub struct MediaTable {
    slots: Vec<Slot>,
    free: Vec<u32>,
    index: BTreeMap<NodeId, MediaHandle>,
}

impl MediaTable {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of tracked elements.
    #[must_use]
    pub fn len(&self) -> usize {
        self.index.len()
    }

    /// Returns `true` if nothing is tracked.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// The handle for `media`, if tracked.
    #[must_use]
    pub fn handle(&self, media: NodeId) -> Option<MediaHandle> {
        self.index.get(&media).copied()
    }

    /// Inserts state for `media`, replacing any previous state.
    pub fn insert(&mut self, media: NodeId, state: MediaCreditState) -> MediaHandle {
        if let Some(handle) = self.handle(media)
            && let Some(slot) = self.slot_mut(handle)
        {
            slot.entry = Some((media, state));
            return handle;
        }
        let handle = if let Some(idx) = self.free.pop() {
            let slot = &mut self.slots[idx as usize];
            slot.generation += 1;
            slot.entry = Some((media, state));
            MediaHandle {
                idx,
                generation: slot.generation,
            }
        } else {
            #[expect(
                clippy::cast_possible_truncation,
                reason = "a page never holds u32::MAX media elements"
            )]
            let idx = self.slots.len() as u32;
            self.slots.push(Slot {
                generation: 0,
                entry: Some((media, state)),
            });
            MediaHandle { idx, generation: 0 }
        };
        self.index.insert(media, handle);
        handle
    }

    /// State for `media`.
    #[must_use]
    pub fn get(&self, media: NodeId) -> Option<&MediaCreditState> {
        let handle = self.handle(media)?;
        let slot = self.slots.get(handle.idx as usize)?;
        if slot.generation != handle.generation {
            return None;
        }
        slot.entry.as_ref().map(|(_, s)| s)
    }

    /// Mutable state for `media`.
    pub fn get_mut(&mut self, media: NodeId) -> Option<&mut MediaCreditState> {
        let handle = self.handle(media)?;
        self.slot_mut(handle)?.entry.as_mut().map(|(_, s)| s)
    }

    /// State behind a handle; `None` once the handle is stale.
    #[must_use]
    pub fn resolve(&self, handle: MediaHandle) -> Option<(NodeId, &MediaCreditState)> {
        let slot = self.slots.get(handle.idx as usize)?;
        if slot.generation != handle.generation {
            return None;
        }
        slot.entry.as_ref().map(|(n, s)| (*n, s))
    }

    /// Forgets `media`, freeing its slot.
    pub fn release(&mut self, media: NodeId) -> Option<MediaCreditState> {
        let handle = self.index.remove(&media)?;
        let slot = self.slot_mut(handle)?;
        let (_, state) = slot.entry.take()?;
        self.free.push(handle.idx);
        Some(state)
    }

    /// Iterates tracked elements and their state.
    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &MediaCreditState)> + '_ {
        self.slots
            .iter()
            .filter_map(|slot| slot.entry.as_ref().map(|(n, s)| (*n, s)))
    }

    /// Iterates mutable state.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (NodeId, &mut MediaCreditState)> + '_ {
        self.slots
            .iter_mut()
            .filter_map(|slot| slot.entry.as_mut().map(|(n, s)| (*n, s)))
    }

    /// Forgets everything. Outstanding handles become stale.
    pub fn clear(&mut self) {
        let nodes: Vec<NodeId> = self.index.keys().copied().collect();
        for node in nodes {
            self.release(node);
        }
    }

    fn slot_mut(&mut self, handle: MediaHandle) -> Option<&mut Slot> {
        let slot = self.slots.get_mut(handle.idx as usize)?;
        (slot.generation == handle.generation).then_some(slot)
    }
}
