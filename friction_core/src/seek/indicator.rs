// Copyright 2026 the Friction Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Display-mode state machine of the floating seek indicator.

use crate::effect::{Effect, EffectSet, IndicatorMode, TimerId};
use crate::time::Duration;

/// Input from the indicator widget.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum IndicatorEvent {
    /// The pointer entered the widget.
    HoverStart,
    /// The pointer left the widget.
    HoverEnd,
    /// A playback rate was picked in speed mode.
    RateChosen(f64),
}

/// Mode, hover, and force tracking.
///
/// Speed mode returns to gauge mode after a timeout unless it is forced or the
/// widget is hovered. A forced speed mode lasts until a rate is chosen or a
/// credit is earned.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct IndicatorState {
    mode: IndicatorMode,
    forced: bool,
    hovered: bool,
}

impl IndicatorState {
    /// Current mode.
    #[must_use]
    pub fn mode(&self) -> IndicatorMode {
        self.mode
    }

    /// Whether speed mode is forced.
    #[must_use]
    pub fn is_forced(&self) -> bool {
        self.forced
    }

    /// Enters speed mode; arms the return timer unless forced or hovered.
    pub fn show_speed(&mut self, force: bool, return_after: Duration) -> EffectSet {
        self.mode = IndicatorMode::Speed;
        self.forced |= force;
        self.arm_return(return_after)
    }

    /// Tracks hover; leaving re-arms the return timer.
    pub fn set_hovered(&mut self, hovered: bool, return_after: Duration) -> EffectSet {
        self.hovered = hovered;
        if hovered {
            EffectSet::new()
        } else {
            self.arm_return(return_after)
        }
    }

    /// The return timer fired. Returns `true` if the mode changed.
    pub fn on_return_timer(&mut self) -> bool {
        if self.mode == IndicatorMode::Speed && !self.forced && !self.hovered {
            self.mode = IndicatorMode::Gauge;
            true
        } else {
            false
        }
    }

    /// A rate was chosen: clear the force and return to gauge mode.
    pub fn rate_chosen(&mut self) -> EffectSet {
        self.forced = false;
        self.mode = IndicatorMode::Gauge;
        EffectSet::from(Effect::CancelTimer {
            timer: TimerId::IndicatorReturn,
        })
    }

    /// A credit was earned: the force no longer applies.
    pub fn credit_gained(&mut self, return_after: Duration) -> EffectSet {
        if core::mem::take(&mut self.forced) {
            self.arm_return(return_after)
        } else {
            EffectSet::new()
        }
    }

    /// Back to the initial state.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    fn arm_return(&self, return_after: Duration) -> EffectSet {
        if self.mode == IndicatorMode::Speed && !self.forced && !self.hovered {
            EffectSet::from(Effect::StartTimer {
                timer: TimerId::IndicatorReturn,
                delay: return_after,
            })
        } else {
            EffectSet::new()
        }
    }
}
