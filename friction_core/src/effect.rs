// Copyright 2026 the Friction Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Effect descriptions returned by manager transitions.
//!
//! Managers never write to the page. Each transition returns an
//! [`EffectSet`]: an ordered list of [`Effect`]s that a backend applies
//! verbatim. Order matters: a backend must apply effects front to back, so
//! that, for example, a mark is cleared before the next one is set.
//!
//! Effects fall into four groups:
//!
//! - **DOM writes**: attributes, text, inline styles, the engine stylesheet.
//!   These are the writes [`EffectSet::dom_writes`] counts, and the ones the
//!   idempotence guarantees are stated against.
//! - **Media control**: seeking and playback rate on a media element.
//! - **Scheduling**: timers, listener groups, observer flags, and frame
//!   flush requests.
//! - **Indicator**: the floating seek-credit widget.

use alloc::string::String;
use alloc::vec::Vec;

use crate::mutation::ObserveFlags;
use crate::node::NodeId;
use crate::time::Duration;

/// Identifies a pending timer so it can be re-armed or cancelled.
///
/// Arming a timer that is already pending replaces it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TimerId {
    /// Deferred clear of the reveal mark after the pointer left.
    RevealClear,
    /// Periodic sweep of stray reveal marks.
    RevealSweep,
    /// End of the revert settle window for one media element.
    RevertSettle(NodeId),
    /// Auto-return of the indicator to gauge mode.
    IndicatorReturn,
}

/// A set of native listeners installed and removed together.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ListenerGroup {
    /// Capturing `pointerover` / `pointerout` / `pointercancel` on the
    /// document.
    HoverPointer,
    /// Window `blur`, `scroll`, `resize`, and document `visibilitychange`.
    HoverWindow,
    /// Capturing `timeupdate`, `seeking`, `loadedmetadata`, `play`, and
    /// `pointerenter` on the document, plus `fullscreenchange`.
    MediaEvents,
    /// Capturing `pointerdown`, `mousedown`, `touchstart`, and `keydown`,
    /// used to tell deliberate seeks from programmatic ones.
    InputGestures,
}

/// Display mode of the seek-credit indicator.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum IndicatorMode {
    /// Remaining credits, charge progress, and cooldown.
    #[default]
    Gauge,
    /// Quick-pick playback-rate actions.
    Speed,
}

/// Everything the indicator widget needs to render one frame.
#[derive(Clone, Debug, PartialEq)]
pub struct IndicatorView {
    /// The media element the indicator describes.
    pub media: NodeId,
    /// Current display mode.
    pub mode: IndicatorMode,
    /// Credits available now.
    pub credits: u8,
    /// Credit capacity.
    pub max_credits: u8,
    /// Progress toward the next credit, `0.0..=1.0` (`1.0` when full).
    pub charge_fraction: f64,
    /// Time left before another credit may be spent.
    pub cooldown_remaining: Duration,
    /// Playback rates offered in speed mode.
    pub speed_choices: Vec<f64>,
}

/// One intended side effect.
#[derive(Clone, Debug, PartialEq)]
pub enum Effect {
    /// Set an attribute on an element.
    SetAttribute {
        /// Target element.
        node: NodeId,
        /// Attribute name (one of [`crate::attr`]).
        name: &'static str,
        /// Attribute value.
        value: String,
    },
    /// Remove an attribute from an element.
    RemoveAttribute {
        /// Target element.
        node: NodeId,
        /// Attribute name.
        name: &'static str,
    },
    /// Replace the character data of a text node.
    SetText {
        /// Target text node.
        node: NodeId,
        /// New character data.
        value: String,
    },
    /// Set an inline style property (usually a custom property).
    SetStyle {
        /// Target element.
        node: NodeId,
        /// Property name.
        property: &'static str,
        /// Property value.
        value: String,
    },
    /// Remove an inline style property.
    RemoveStyle {
        /// Target element.
        node: NodeId,
        /// Property name.
        property: &'static str,
    },
    /// Install the engine stylesheet (replacing any previous one).
    InstallStylesheet {
        /// Stylesheet text.
        css: &'static str,
    },
    /// Remove the engine stylesheet.
    RemoveStylesheet,
    /// Seek a media element.
    SetCurrentTime {
        /// Target media element.
        media: NodeId,
        /// Target position in seconds.
        seconds: f64,
    },
    /// Change a media element's playback rate.
    SetPlaybackRate {
        /// Target media element.
        media: NodeId,
        /// New rate.
        rate: f64,
    },
    /// Arm (or re-arm) a timer.
    StartTimer {
        /// Which timer.
        timer: TimerId,
        /// Delay before it fires.
        delay: Duration,
    },
    /// Cancel a timer if pending.
    CancelTimer {
        /// Which timer.
        timer: TimerId,
    },
    /// Install a listener group.
    Listen(ListenerGroup),
    /// Remove a listener group.
    Unlisten(ListenerGroup),
    /// (Re)connect the shared mutation observer with these flags.
    Observe(ObserveFlags),
    /// Disconnect the shared mutation observer.
    Disconnect,
    /// Request a flush on the next animation frame.
    RequestFlush,
    /// Render the indicator.
    ShowIndicator(IndicatorView),
    /// Hide the indicator.
    HideIndicator,
}

impl Effect {
    /// Whether this effect writes to the document tree or its styles.
    #[must_use]
    pub fn is_dom_write(&self) -> bool {
        matches!(
            self,
            Self::SetAttribute { .. }
                | Self::RemoveAttribute { .. }
                | Self::SetText { .. }
                | Self::SetStyle { .. }
                | Self::RemoveStyle { .. }
                | Self::InstallStylesheet { .. }
                | Self::RemoveStylesheet
        )
    }
}

/// An ordered list of [`Effect`]s.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct EffectSet {
    effects: Vec<Effect>,
}

impl EffectSet {
    /// Creates an empty set.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            effects: Vec::new(),
        }
    }

    /// Appends one effect.
    pub fn push(&mut self, effect: Effect) {
        self.effects.push(effect);
    }

    /// Appends every effect of `other`, preserving order.
    pub fn append(&mut self, mut other: Self) {
        self.effects.append(&mut other.effects);
    }

    /// Returns `true` if there is nothing to apply.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.effects.is_empty()
    }

    /// Number of effects.
    #[must_use]
    pub fn len(&self) -> usize {
        self.effects.len()
    }

    /// Iterates effects in application order.
    pub fn iter(&self) -> core::slice::Iter<'_, Effect> {
        self.effects.iter()
    }

    /// Number of effects that write to the document.
    #[must_use]
    pub fn dom_writes(&self) -> usize {
        self.effects.iter().filter(|e| e.is_dom_write()).count()
    }

    /// Returns `true` if any effect satisfies `pred`.
    pub fn any(&self, pred: impl FnMut(&Effect) -> bool) -> bool {
        self.effects.iter().any(pred)
    }

    /// Consumes the set and returns the effects.
    #[must_use]
    pub fn into_vec(self) -> Vec<Effect> {
        self.effects
    }
}

impl From<Effect> for EffectSet {
    fn from(effect: Effect) -> Self {
        let mut set = Self::new();
        set.push(effect);
        set
    }
}

impl Extend<Effect> for EffectSet {
    fn extend<T: IntoIterator<Item = Effect>>(&mut self, iter: T) {
        self.effects.extend(iter);
    }
}

impl IntoIterator for EffectSet {
    type Item = Effect;
    type IntoIter = alloc::vec::IntoIter<Effect>;

    fn into_iter(self) -> Self::IntoIter {
        self.effects.into_iter()
    }
}

impl<'a> IntoIterator for &'a EffectSet {
    type Item = &'a Effect;
    type IntoIter = core::slice::Iter<'a, Effect>;

    fn into_iter(self) -> Self::IntoIter {
        self.effects.iter()
    }
}
