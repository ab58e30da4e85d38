// Copyright 2026 the Friction Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Seek-credit guard.
//!
//! [`SeekGuard`] rations forward seeking in media elements. Each element has a
//! ledger ([`MediaCreditState`]) of skip credits that refill with watch time.
//!
//! ```text
//!   idle ──timeupdate──► charging ──seeking──► granted ──► idle
//!                                     │
//!                                     └──────► blocked ──settle──► idle
//!                                              (reverting)
//! ```
//!
//! A forward jump only costs a credit when it is larger than
//! [`SeekConfig::min_forward_jump`] and a real input gesture happened within
//! [`SeekConfig::gesture_window`]; everything else (backward seeks, small
//! nudges, programmatic jumps such as chapter autoplay) rebases the ledger for
//! free. A paid jump that finds no credit, or an active cooldown, is reverted:
//! `reverting` is set in the same transition that emits the snap-back, and
//! until [`TimerId::RevertSettle`] fires every further seek that drifts past
//! [`SeekConfig::revert_tolerance`] is snapped back again.
//!
//! Only the active element (last played, pointer-entered, or made fullscreen)
//! is rendered by the indicator.

mod indicator;
mod ledger;

pub use indicator::{IndicatorEvent, IndicatorState};
pub use ledger::{
    MediaCreditState, MediaHandle, MediaTable, SourceFingerprint, fingerprint,
};

use alloc::vec::Vec;

use crate::dom::DomView;
use crate::effect::{Effect, EffectSet, IndicatorMode, IndicatorView, ListenerGroup, TimerId};
use crate::node::NodeId;
use crate::time::{Duration, HostTime};
use crate::trace::{
    Component, CreditCause, CreditEvent, ManagerAction, SeekDecision, SeekDecisionEvent, Tracer,
};

/// Tuning for the seek-credit guard.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SeekConfig {
    /// Credit capacity when the policy does not set one.
    pub max_credits: u8,
    /// Watch time that earns one credit, in seconds.
    pub seconds_per_skip: f64,
    /// Minimum time between two paid jumps.
    pub cooldown: Duration,
    /// Forward jumps up to this many seconds are free.
    pub min_forward_jump: f64,
    /// How recent a real input gesture must be for a jump to count as the
    /// user's.
    pub gesture_window: Duration,
    /// Larger playback steps do not charge (they are jumps, not watching).
    pub max_charge_delta: f64,
    /// Seeks during a revert within this many seconds of the target stand.
    pub revert_tolerance: f64,
    /// How long a revert holds.
    pub settle: Duration,
    /// Speed mode returns to gauge mode after this long.
    pub indicator_return: Duration,
    /// Rates offered in speed mode.
    pub speed_choices: [f64; 4],
}

impl SeekConfig {
    /// Three credits, one per three minutes watched, ten-second cooldown.
    #[must_use]
    pub const fn standard() -> Self {
        Self {
            max_credits: 3,
            seconds_per_skip: 180.0,
            cooldown: Duration::from_secs(10),
            min_forward_jump: 3.0,
            gesture_window: Duration::from_millis(1500),
            max_charge_delta: 2.0,
            revert_tolerance: 0.5,
            settle: Duration::from_millis(400),
            indicator_return: Duration::from_millis(4000),
            speed_choices: [1.25, 1.5, 1.75, 2.0],
        }
    }
}

impl Default for SeekConfig {
    fn default() -> Self {
        Self::standard()
    }
}

/// Playback state read from a media element when an event fires.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MediaSnapshot {
    /// `currentTime`, seconds.
    pub current_time: f64,
    /// `duration`, seconds; may be `NaN` or infinite for live streams.
    pub duration: f64,
    /// `paused`.
    pub paused: bool,
    /// `seeking`.
    pub seeking: bool,
    /// Fingerprint of `currentSrc`.
    pub source: SourceFingerprint,
}

/// Which media event fired.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MediaEventKind {
    /// `timeupdate`.
    TimeUpdate,
    /// `seeking`.
    Seeking,
    /// `loadedmetadata`.
    LoadedMetadata,
    /// `play`.
    Play,
    /// `pointerenter` on the element.
    PointerEnter,
    /// The element (or an ancestor) entered fullscreen.
    FullscreenEnter,
}

/// A media event with the element's state at that moment.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MediaEvent {
    /// The media element.
    pub media: NodeId,
    /// What happened.
    pub kind: MediaEventKind,
    /// Element state.
    pub snapshot: MediaSnapshot,
    /// Event time.
    pub now: HostTime,
}

/// The seek-credit guard.
#[derive(Debug)]
pub struct SeekGuard {
    config: SeekConfig,
    max_credits: u8,
    enabled: bool,
    table: MediaTable,
    active: Option<NodeId>,
    last_gesture: Option<HostTime>,
    indicator: IndicatorState,
    indicator_shown: bool,
}

impl SeekGuard {
    /// Creates a disabled guard.
    #[must_use]
    pub fn new(config: SeekConfig) -> Self {
        Self {
            config,
            max_credits: config.max_credits,
            enabled: false,
            table: MediaTable::new(),
            active: None,
            last_gesture: None,
            indicator: IndicatorState::default(),
            indicator_shown: false,
        }
    }

    /// Whether the guard is enabled.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Effective credit capacity.
    #[must_use]
    pub fn max_credits(&self) -> u8 {
        self.max_credits
    }

    /// The ledger of `media`.
    #[must_use]
    pub fn state(&self, media: NodeId) -> Option<&MediaCreditState> {
        self.table.get(media)
    }

    /// The active media element.
    #[must_use]
    pub fn active(&self) -> Option<NodeId> {
        self.active
    }

    /// The indicator's mode state.
    #[must_use]
    pub fn indicator(&self) -> &IndicatorState {
        &self.indicator
    }

    /// Enables, re-tunes, or disables the guard.
    ///
    /// `max_credits` of `None` uses the configured capacity. Disabling
    /// abandons every ledger.
    pub fn update(
        &mut self,
        enabled: bool,
        max_credits: Option<u8>,
        now: HostTime,
        tracer: &mut Tracer<'_>,
    ) -> EffectSet {
        let mut effects = EffectSet::new();
        let max = max_credits.unwrap_or(self.config.max_credits);
        match (self.enabled, enabled) {
            (false, true) => {
                self.enabled = true;
                self.max_credits = max;
                effects.push(Effect::Listen(ListenerGroup::MediaEvents));
                effects.push(Effect::Listen(ListenerGroup::InputGestures));
                tracer.manager(Component::SeekGuard, ManagerAction::Applied);
            }
            (true, true) if max != self.max_credits => {
                self.max_credits = max;
                for (_, state) in self.table.iter_mut() {
                    state.available_credits = state.available_credits.min(max);
                    if state.available_credits >= max {
                        state.accumulated_seconds = 0.0;
                    }
                }
                effects.append(self.render(now));
                tracer.manager(Component::SeekGuard, ManagerAction::Updated);
            }
            (true, false) => {
                self.enabled = false;
                for (media, state) in self.table.iter() {
                    if state.reverting {
                        effects.push(Effect::CancelTimer {
                            timer: TimerId::RevertSettle(media),
                        });
                    }
                }
                self.table.clear();
                self.active = None;
                self.last_gesture = None;
                self.indicator.reset();
                effects.push(Effect::CancelTimer {
                    timer: TimerId::IndicatorReturn,
                });
                if core::mem::take(&mut self.indicator_shown) {
                    effects.push(Effect::HideIndicator);
                }
                effects.push(Effect::Unlisten(ListenerGroup::MediaEvents));
                effects.push(Effect::Unlisten(ListenerGroup::InputGestures));
                tracer.manager(Component::SeekGuard, ManagerAction::Removed);
            }
            _ => {}
        }
        effects
    }

    /// Records a real input gesture: a press or release of a pointer, touch,
    /// or key.
    ///
    /// Releases count because dragging a seek bar commits the seek when the
    /// pointer comes up, which can be well after the press.
    pub fn on_gesture(&mut self, now: HostTime) {
        if self.enabled {
            self.last_gesture = Some(now);
        }
    }

    fn gesture_recent(&self, now: HostTime) -> bool {
        self.last_gesture
            .is_some_and(|g| now.saturating_duration_since(g) <= self.config.gesture_window)
    }

    /// Drops the ledgers of media elements that left the document.
    ///
    /// A pending revert for a dropped element is cancelled. When the active
    /// element goes, the indicator is hidden until another element becomes
    /// active.
    pub fn forget_detached(
        &mut self,
        dom: &(impl DomView + ?Sized),
        tracer: &mut Tracer<'_>,
    ) -> EffectSet {
        let mut effects = EffectSet::new();
        if !self.enabled {
            return effects;
        }
        let gone: Vec<NodeId> = self
            .table
            .iter()
            .map(|(media, _)| media)
            .filter(|&media| !dom.is_connected(media))
            .collect();
        if gone.is_empty() {
            return effects;
        }
        for media in gone {
            if self.table.release(media).is_some_and(|s| s.reverting) {
                effects.push(Effect::CancelTimer {
                    timer: TimerId::RevertSettle(media),
                });
            }
            if self.active == Some(media) {
                self.active = None;
                self.indicator.reset();
                effects.push(Effect::CancelTimer {
                    timer: TimerId::IndicatorReturn,
                });
                if core::mem::take(&mut self.indicator_shown) {
                    effects.push(Effect::HideIndicator);
                }
            }
        }
        tracer.manager(Component::SeekGuard, ManagerAction::Updated);
        effects
    }

    /// Handles one media event.
    pub fn on_media(&mut self, event: MediaEvent, tracer: &mut Tracer<'_>) -> EffectSet {
        if !self.enabled {
            return EffectSet::new();
        }
        let MediaEvent {
            media,
            kind,
            snapshot,
            now,
        } = event;

        let mut effects = self.track(media, &snapshot, tracer);
        if self.active.is_none() {
            self.active = Some(media);
        }
        match kind {
            MediaEventKind::TimeUpdate => effects.append(self.charge(media, &snapshot, tracer)),
            MediaEventKind::Seeking => {
                effects.append(self.classify(media, &snapshot, now, tracer));
            }
            MediaEventKind::LoadedMetadata => {}
            MediaEventKind::Play | MediaEventKind::PointerEnter | MediaEventKind::FullscreenEnter => {
                self.active = Some(media);
            }
        }
        if self.active == Some(media) {
            effects.append(self.render(now));
        }
        effects
    }

    /// Handles input from the indicator widget.
    pub fn on_indicator(&mut self, event: IndicatorEvent, now: HostTime) -> EffectSet {
        if !self.enabled {
            return EffectSet::new();
        }
        let ret = self.config.indicator_return;
        let mut effects = match event {
            IndicatorEvent::HoverStart => self.indicator.set_hovered(true, ret),
            IndicatorEvent::HoverEnd => self.indicator.set_hovered(false, ret),
            IndicatorEvent::RateChosen(rate) => {
                let mut e = EffectSet::new();
                if let Some(media) = self.active {
                    e.push(Effect::SetPlaybackRate { media, rate });
                }
                e.append(self.indicator.rate_chosen());
                e
            }
        };
        effects.append(self.render(now));
        effects
    }

    /// Handles [`TimerId::RevertSettle`] and [`TimerId::IndicatorReturn`].
    pub fn on_timer(&mut self, timer: TimerId, now: HostTime) -> EffectSet {
        if !self.enabled {
            return EffectSet::new();
        }
        match timer {
            TimerId::RevertSettle(media) => {
                let Some(state) = self.table.get_mut(media) else {
                    return EffectSet::new();
                };
                if !state.reverting {
                    return EffectSet::new();
                }
                state.reverting = false;
                let target = state.revert_target;
                state.rebase(target);
                if self.active == Some(media) {
                    self.render(now)
                } else {
                    EffectSet::new()
                }
            }
            TimerId::IndicatorReturn => {
                if self.indicator.on_return_timer() {
                    self.render(now)
                } else {
                    EffectSet::new()
                }
            }
            TimerId::RevealClear | TimerId::RevealSweep => EffectSet::new(),
        }
    }

    /// Creates the ledger on first sight and resets it when the source
    /// changes.
    fn track(
        &mut self,
        media: NodeId,
        snapshot: &MediaSnapshot,
        tracer: &mut Tracer<'_>,
    ) -> EffectSet {
        let mut effects = EffectSet::new();
        let max = self.max_credits;
        match self.table.get_mut(media) {
            None => {
                self.table.insert(
                    media,
                    MediaCreditState::new(max, snapshot.source, snapshot.current_time),
                );
            }
            Some(state) if state.source != snapshot.source => {
                if state.reverting {
                    effects.push(Effect::CancelTimer {
                        timer: TimerId::RevertSettle(media),
                    });
                }
                *state = MediaCreditState::new(max, snapshot.source, snapshot.current_time);
                tracer.credit(&CreditEvent {
                    media,
                    credits: max,
                    cause: CreditCause::SourceReset,
                });
            }
            Some(_) => {}
        }
        effects
    }

    fn charge(
        &mut self,
        media: NodeId,
        snapshot: &MediaSnapshot,
        tracer: &mut Tracer<'_>,
    ) -> EffectSet {
        let max = self.max_credits;
        let sps = self.config.seconds_per_skip;
        let max_delta = self.config.max_charge_delta;
        let Some(state) = self.table.get_mut(media) else {
            return EffectSet::new();
        };
        let t = snapshot.current_time;
        if snapshot.paused || snapshot.seeking {
            if !state.reverting {
                state.rebase(t);
            }
            return EffectSet::new();
        }
        if state.reverting {
            return EffectSet::new();
        }

        let delta = t - state.last_charge_time;
        state.rebase(t);
        if !(delta > 0.0 && delta <= max_delta) {
            return EffectSet::new();
        }
        if state.available_credits >= max {
            state.accumulated_seconds = 0.0;
            return EffectSet::new();
        }

        state.accumulated_seconds += delta;
        let mut gained = false;
        while state.accumulated_seconds >= sps && state.available_credits < max {
            state.available_credits += 1;
            state.accumulated_seconds -= sps;
            gained = true;
            tracer.credit(&CreditEvent {
                media,
                credits: state.available_credits,
                cause: CreditCause::Replenished,
            });
        }
        if state.available_credits >= max {
            state.accumulated_seconds = 0.0;
        }
        if gained && self.active == Some(media) {
            self.indicator.credit_gained(self.config.indicator_return)
        } else {
            EffectSet::new()
        }
    }

    fn classify(
        &mut self,
        media: NodeId,
        snapshot: &MediaSnapshot,
        now: HostTime,
        tracer: &mut Tracer<'_>,
    ) -> EffectSet {
        let gesture = self.gesture_recent(now);
        let config = self.config;
        let Some(state) = self.table.get_mut(media) else {
            return EffectSet::new();
        };
        let to = snapshot.current_time;
        let mut effects = EffectSet::new();

        if state.reverting {
            let target = state.revert_target;
            let decision = if (to - target).abs() > config.revert_tolerance {
                effects.push(Effect::SetCurrentTime {
                    media,
                    seconds: target,
                });
                SeekDecision::Resnapped
            } else {
                SeekDecision::Held
            };
            let credits = state.available_credits;
            tracer.seek_decision(&SeekDecisionEvent {
                media,
                from: target,
                to,
                decision,
                credits,
            });
            if to - target > config.min_forward_jump && credits == 0 && gesture {
                effects.append(self.indicator.show_speed(true, config.indicator_return));
            }
            return effects;
        }

        let from = state.last_stable_time;
        let eligible = to - from > config.min_forward_jump && gesture;
        let decision = if !eligible {
            state.rebase(to);
            SeekDecision::Free
        } else if now >= state.cooldown_until && state.available_credits > 0 {
            state.available_credits -= 1;
            state.cooldown_until = now.saturating_add(config.cooldown);
            state.rebase(to);
            tracer.credit(&CreditEvent {
                media,
                credits: state.available_credits,
                cause: CreditCause::Spent,
            });
            SeekDecision::Granted
        } else {
            let upper = if snapshot.duration.is_finite() {
                snapshot.duration.max(0.0)
            } else {
                f64::MAX
            };
            let target = from.clamp(0.0, upper);
            state.reverting = true;
            state.revert_target = target;
            effects.push(Effect::SetCurrentTime {
                media,
                seconds: target,
            });
            effects.push(Effect::StartTimer {
                timer: TimerId::RevertSettle(media),
                delay: config.settle,
            });
            SeekDecision::Blocked
        };
        tracer.seek_decision(&SeekDecisionEvent {
            media,
            from,
            to,
            decision,
            credits: state.available_credits,
        });
        if decision == SeekDecision::Blocked {
            effects.append(self.indicator.show_speed(false, config.indicator_return));
        }
        effects
    }

    fn render(&mut self, now: HostTime) -> EffectSet {
        let Some(media) = self.active else {
            return EffectSet::new();
        };
        let Some(state) = self.table.get(media) else {
            return EffectSet::new();
        };
        let max = self.max_credits;
        let charge_fraction = if state.available_credits >= max || self.config.seconds_per_skip <= 0.0
        {
            1.0
        } else {
            (state.accumulated_seconds / self.config.seconds_per_skip).clamp(0.0, 1.0)
        };
        let view = IndicatorView {
            media,
            mode: self.indicator.mode(),
            credits: state.available_credits,
            max_credits: max,
            charge_fraction,
            cooldown_remaining: state.cooldown_until.saturating_duration_since(now),
            speed_choices: match self.indicator.mode() {
                IndicatorMode::Speed => self.config.speed_choices.to_vec(),
                IndicatorMode::Gauge => Vec::new(),
            },
        };
        self.indicator_shown = true;
        EffectSet::from(Effect::ShowIndicator(view))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shuffle::Lcg32;

    const VIDEO: NodeId = NodeId::new(7, 0);
    const SRC: SourceFingerprint = SourceFingerprint(1);

    fn snap(t: f64) -> MediaSnapshot {
        MediaSnapshot {
            current_time: t,
            duration: 3600.0,
            paused: false,
            seeking: false,
            source: SRC,
        }
    }

    fn ev(kind: MediaEventKind, snapshot: MediaSnapshot, now_ms: u64) -> MediaEvent {
        ev_on(VIDEO, kind, snapshot, now_ms)
    }

    fn ev_on(
        media: NodeId,
        kind: MediaEventKind,
        snapshot: MediaSnapshot,
        now_ms: u64,
    ) -> MediaEvent {
        MediaEvent {
            media,
            kind,
            snapshot,
            now: HostTime(now_ms),
        }
    }

    fn shown_media(e: &EffectSet) -> Option<NodeId> {
        e.iter().find_map(|e| match e {
            Effect::ShowIndicator(view) => Some(view.media),
            _ => None,
        })
    }

    /// A playing guard with no credits, parked at 100 s.
    fn broke_at_100() -> SeekGuard {
        let mut g = guard();
        let _ = g.on_media(ev(MediaEventKind::Play, snap(0.0), 0), &mut Tracer::none());
        let state = g.table.get_mut(VIDEO).unwrap();
        state.available_credits = 0;
        state.rebase(100.0);
        g
    }

    fn guard() -> SeekGuard {
        let mut g = SeekGuard::new(SeekConfig::standard());
        let e = g.update(true, None, HostTime(0), &mut Tracer::none());
        assert!(e.any(|e| *e == Effect::Listen(ListenerGroup::MediaEvents)));
        g
    }

    /// Plays from `from` to `to` in 0.5 s steps, starting at `now_ms`.
    fn play(g: &mut SeekGuard, from: f64, to: f64, now_ms: u64) -> u64 {
        let mut t = from;
        let mut now = now_ms;
        while t < to {
            t += 0.5;
            now += 500;
            let _ = g.on_media(ev(MediaEventKind::TimeUpdate, snap(t), now), &mut Tracer::none());
        }
        now
    }

    fn seek(g: &mut SeekGuard, to: f64, now_ms: u64) -> EffectSet {
        let s = MediaSnapshot {
            seeking: true,
            ..snap(to)
        };
        g.on_media(ev(MediaEventKind::Seeking, s, now_ms), &mut Tracer::none())
    }

    fn credits(g: &SeekGuard) -> u8 {
        g.state(VIDEO).map_or(0, |s| s.available_credits)
    }

    #[test]
    fn blocked_skip_is_reverted() {
        let mut g = guard();
        let _ = g.on_media(ev(MediaEventKind::Play, snap(0.0), 0), &mut Tracer::none());
        {
            let state = g.table.get_mut(VIDEO).unwrap();
            state.available_credits = 0;
            state.rebase(100.0);
        }
        g.on_gesture(HostTime(50_000));
        let e = seek(&mut g, 130.0, 50_100);

        let snapped = e.iter().find_map(|e| match e {
            Effect::SetCurrentTime { seconds, .. } => Some(*seconds),
            _ => None,
        });
        assert!(snapped.is_some_and(|s| (s - 100.0).abs() < 1e-9));
        assert!(e.any(|e| *e
            == Effect::StartTimer {
                timer: TimerId::RevertSettle(VIDEO),
                delay: Duration::from_millis(400),
            }));
        let state = g.state(VIDEO).unwrap();
        assert!(state.reverting);
        assert_eq!(state.available_credits, 0);
        assert_eq!(g.indicator().mode(), IndicatorMode::Speed);

        // A second drag during the settle window is snapped back too.
        g.on_gesture(HostTime(50_200));
        let e = seek(&mut g, 200.0, 50_250);
        assert!(e.any(|e| matches!(e, Effect::SetCurrentTime { seconds, .. } if *seconds == 100.0)));
        assert!(g.indicator().is_forced(), "zero credits and a real drag force speed mode");

        // Within tolerance stands.
        let e = seek(&mut g, 100.2, 50_300);
        assert!(!e.any(|e| matches!(e, Effect::SetCurrentTime { .. })));

        let _ = g.on_timer(TimerId::RevertSettle(VIDEO), HostTime(50_700));
        let state = g.state(VIDEO).unwrap();
        assert!(!state.reverting);
        assert_eq!(state.last_stable_time, 100.0);
    }

    #[test]
    fn passive_jump_is_free() {
        let mut g = guard();
        let now = play(&mut g, 0.0, 100.0, 0);
        let before = credits(&g);
        // No gesture at all: an autoplay chapter jump.
        let e = seek(&mut g, 400.0, now + 10);
        assert!(!e.any(|e| matches!(e, Effect::SetCurrentTime { .. })));
        assert_eq!(credits(&g), before);
        assert_eq!(g.state(VIDEO).unwrap().last_stable_time, 400.0);

        // A stale gesture does not count either.
        g.on_gesture(HostTime(now + 20));
        let e = seek(&mut g, 800.0, now + 20 + 5_000);
        assert!(!e.any(|e| matches!(e, Effect::SetCurrentTime { .. })));
        assert_eq!(credits(&g), before);
    }

    #[test]
    fn user_skip_spends_a_credit_and_starts_cooldown() {
        let mut g = guard();
        let _ = g.on_media(ev(MediaEventKind::Play, snap(0.0), 0), &mut Tracer::none());
        g.on_gesture(HostTime(1_000));
        let e = seek(&mut g, 60.0, 1_100);
        assert!(!e.any(|e| matches!(e, Effect::SetCurrentTime { .. })));
        assert_eq!(credits(&g), 2);

        // Second skip inside the cooldown is blocked despite credits.
        g.on_gesture(HostTime(2_000));
        let e = seek(&mut g, 120.0, 2_100);
        assert!(e.any(|e| matches!(e, Effect::SetCurrentTime { seconds, .. } if *seconds == 60.0)));
        assert_eq!(credits(&g), 2);
    }

    #[test]
    fn backward_and_small_seeks_are_free() {
        let mut g = guard();
        let now = play(&mut g, 0.0, 50.0, 0);
        g.on_gesture(HostTime(now));
        let _ = seek(&mut g, 10.0, now + 1);
        let _ = seek(&mut g, 12.5, now + 2);
        assert_eq!(credits(&g), 3);
    }

    #[test]
    fn replenishes_one_credit_per_threshold_keeping_remainder() {
        let mut g = guard();
        let _ = g.on_media(ev(MediaEventKind::Play, snap(0.0), 0), &mut Tracer::none());
        g.on_gesture(HostTime(100));
        let _ = seek(&mut g, 10.0, 200);
        assert_eq!(credits(&g), 2);

        let now = play(&mut g, 10.0, 190.0, 1_000);
        assert_eq!(credits(&g), 3);
        assert_eq!(g.state(VIDEO).unwrap().accumulated_seconds, 0.0, "clamped at max");

        // Spend one, then watch 181 s: one credit back, 1 s carried over.
        g.on_gesture(HostTime(now + 20_000));
        let _ = seek(&mut g, 300.0, now + 20_001);
        assert_eq!(credits(&g), 2);
        let _ = g.on_media(ev(MediaEventKind::Play, snap(300.0), now + 20_002), &mut Tracer::none());
        let _ = g.update(true, Some(4), HostTime(now + 20_003), &mut Tracer::none());
        let _ = play(&mut g, 300.0, 481.0, now + 30_000);
        assert_eq!(credits(&g), 3);
        let acc = g.state(VIDEO).unwrap().accumulated_seconds;
        assert!((acc - 1.0).abs() < 1e-9, "remainder kept, got {acc}");
    }

    #[test]
    fn large_steps_and_paused_time_do_not_charge() {
        let mut g = guard();
        let _ = g.on_media(ev(MediaEventKind::Play, snap(0.0), 0), &mut Tracer::none());
        g.table.get_mut(VIDEO).unwrap().available_credits = 0;
        let _ = g.on_media(ev(MediaEventKind::TimeUpdate, snap(5.0), 10), &mut Tracer::none());
        let paused = MediaSnapshot {
            paused: true,
            ..snap(6.0)
        };
        let _ = g.on_media(ev(MediaEventKind::TimeUpdate, paused, 20), &mut Tracer::none());
        assert_eq!(g.state(VIDEO).unwrap().accumulated_seconds, 0.0);
    }

    #[test]
    fn source_change_resets_ledger() {
        let mut g = guard();
        let _ = g.on_media(ev(MediaEventKind::Play, snap(0.0), 0), &mut Tracer::none());
        {
            let state = g.table.get_mut(VIDEO).unwrap();
            state.available_credits = 0;
            state.accumulated_seconds = 42.0;
            state.cooldown_until = HostTime(99_000);
        }
        let next = MediaSnapshot {
            source: SourceFingerprint(2),
            ..snap(0.0)
        };
        let _ = g.on_media(ev(MediaEventKind::LoadedMetadata, next, 1_000), &mut Tracer::none());
        let state = g.state(VIDEO).unwrap();
        assert_eq!(state.available_credits, 3);
        assert_eq!(state.accumulated_seconds, 0.0);
        assert_eq!(state.cooldown_until, HostTime::ZERO);
        assert!(!state.reverting);
    }

    #[test]
    fn credits_stay_in_bounds_under_random_events() {
        let mut g = guard();
        let mut rng = Lcg32::new(0xdead_beef);
        let mut t = 0.0_f64;
        let mut now = 0_u64;
        for _ in 0..20_000 {
            now += 1 + u64::from(rng.next_u32() % 2_000);
            let roll = rng.next_u32() % 100;
            let effects = match roll {
                0..=69 => {
                    t += rng.next_f64() * 2.5;
                    g.on_media(ev(MediaEventKind::TimeUpdate, snap(t), now), &mut Tracer::none())
                }
                70..=79 => {
                    g.on_gesture(HostTime(now));
                    EffectSet::new()
                }
                80..=91 => {
                    t = (t + (rng.next_f64() - 0.3) * 400.0).max(0.0);
                    seek(&mut g, t, now)
                }
                92..=95 => {
                    let mut e = g.on_timer(TimerId::RevertSettle(VIDEO), HostTime(now));
                    e.append(g.on_timer(TimerId::IndicatorReturn, HostTime(now)));
                    e
                }
                96..=97 => {
                    let s = MediaSnapshot {
                        source: SourceFingerprint(u64::from(rng.next_u32() % 3)),
                        ..snap(t)
                    };
                    g.on_media(ev(MediaEventKind::LoadedMetadata, s, now), &mut Tracer::none())
                }
                _ => g.on_indicator(IndicatorEvent::RateChosen(1.5), HostTime(now)),
            };
            if let Some(state) = g.state(VIDEO) {
                assert!(state.available_credits <= g.max_credits());
                assert!(state.accumulated_seconds >= 0.0);
                assert!(state.accumulated_seconds < 180.0);
            }
            for effect in &effects {
                if let Effect::ShowIndicator(view) = effect {
                    assert!(view.credits <= view.max_credits);
                    assert!((0.0..=1.0).contains(&view.charge_fraction));
                }
            }
        }
    }

    #[test]
    fn disable_abandons_ledgers_and_cancels_timers() {
        let mut g = guard();
        let _ = g.on_media(ev(MediaEventKind::Play, snap(0.0), 0), &mut Tracer::none());
        g.table.get_mut(VIDEO).unwrap().available_credits = 0;
        g.on_gesture(HostTime(10));
        let _ = seek(&mut g, 100.0, 20);
        let e = g.update(false, None, HostTime(30), &mut Tracer::none());
        assert!(e.any(|e| *e
            == Effect::CancelTimer {
                timer: TimerId::RevertSettle(VIDEO)
            }));
        assert!(e.any(|e| *e == Effect::HideIndicator));
        assert!(g.state(VIDEO).is_none());
        assert!(g.on_media(ev(MediaEventKind::Play, snap(0.0), 40), &mut Tracer::none()).is_empty());
    }

    #[test]
    fn indicator_renders_active_media_only() {
        let mut g = guard();
        let other = NodeId::new(8, 0);
        let _ = g.on_media(ev(MediaEventKind::Play, snap(0.0), 0), &mut Tracer::none());
        let e = g.on_media(
            MediaEvent {
                media: other,
                kind: MediaEventKind::TimeUpdate,
                snapshot: snap(1.0),
                now: HostTime(10),
            },
            &mut Tracer::none(),
        );
        assert!(!e.any(|e| matches!(e, Effect::ShowIndicator(_))));

        let e = g.on_indicator(IndicatorEvent::RateChosen(2.0), HostTime(20));
        assert!(e.any(|e| *e
            == Effect::SetPlaybackRate {
                media: VIDEO,
                rate: 2.0
            }));
    }

    #[test]
    fn press_alone_goes_stale_during_a_long_drag() {
        let mut g = broke_at_100();
        g.on_gesture(HostTime(10_000));
        let e = seek(&mut g, 600.0, 12_000);
        assert!(!e.any(|e| matches!(e, Effect::SetCurrentTime { .. })));
        assert!(!g.state(VIDEO).unwrap().reverting);
    }

    #[test]
    fn release_at_the_end_of_a_drag_counts_as_a_gesture() {
        let mut g = broke_at_100();
        g.on_gesture(HostTime(10_000));
        g.on_gesture(HostTime(11_900));
        let e = seek(&mut g, 600.0, 12_000);
        assert!(e.any(|e| matches!(e, Effect::SetCurrentTime { seconds, .. } if *seconds == 100.0)));
        assert!(g.state(VIDEO).unwrap().reverting);
    }

    #[test]
    fn pointer_enter_and_fullscreen_move_the_indicator() {
        let mut g = guard();
        let other = NodeId::new(8, 0);
        let e = g.on_media(ev(MediaEventKind::Play, snap(0.0), 0), &mut Tracer::none());
        assert_eq!(shown_media(&e), Some(VIDEO));

        let e = g.on_media(
            ev_on(other, MediaEventKind::PointerEnter, snap(5.0), 10),
            &mut Tracer::none(),
        );
        assert_eq!(g.active(), Some(other));
        assert_eq!(shown_media(&e), Some(other));

        // Events on the inactive element leave the indicator alone.
        let e = g.on_media(ev(MediaEventKind::TimeUpdate, snap(0.5), 20), &mut Tracer::none());
        assert_eq!(shown_media(&e), None);

        let e = g.on_media(ev(MediaEventKind::FullscreenEnter, snap(0.5), 30), &mut Tracer::none());
        assert_eq!(g.active(), Some(VIDEO));
        assert_eq!(shown_media(&e), Some(VIDEO));

        let e = g.on_indicator(IndicatorEvent::RateChosen(1.5), HostTime(40));
        assert!(e.any(|e| *e
            == Effect::SetPlaybackRate {
                media: VIDEO,
                rate: 1.5
            }));
    }

    #[test]
    fn detached_media_ledgers_are_dropped() {
        use crate::headless::HeadlessDom;

        let mut dom = HeadlessDom::new();
        let root = dom.root_element();
        let first = dom.append_element(root, "video");
        let second = dom.append_element(root, "video");

        let mut g = guard();
        let _ = g.on_media(ev_on(first, MediaEventKind::Play, snap(0.0), 0), &mut Tracer::none());
        let _ = g.on_media(ev_on(second, MediaEventKind::TimeUpdate, snap(0.0), 10), &mut Tracer::none());
        g.table.get_mut(first).unwrap().available_credits = 0;
        g.on_gesture(HostTime(20));
        let _ = g.on_media(
            ev_on(
                first,
                MediaEventKind::Seeking,
                MediaSnapshot {
                    seeking: true,
                    ..snap(300.0)
                },
                30,
            ),
            &mut Tracer::none(),
        );
        assert!(g.state(first).unwrap().reverting);

        let e = g.forget_detached(&dom, &mut Tracer::none());
        assert!(e.is_empty(), "nothing left the page yet");

        dom.remove(first);
        let e = g.forget_detached(&dom, &mut Tracer::none());
        assert!(e.any(|e| *e
            == Effect::CancelTimer {
                timer: TimerId::RevertSettle(first)
            }));
        assert!(e.any(|e| *e == Effect::HideIndicator));
        assert!(g.state(first).is_none());
        assert!(g.state(second).is_some());
        assert_eq!(g.active(), None);
        assert_eq!(g.table.len(), 1);

        // The next event on a live element makes it active again.
        let e = g.on_media(ev_on(second, MediaEventKind::TimeUpdate, snap(0.5), 40), &mut Tracer::none());
        assert_eq!(g.active(), Some(second));
        assert_eq!(shown_media(&e), Some(second));
    }
}
