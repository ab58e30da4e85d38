// Copyright 2026 the Friction Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Policy snapshots.
//!
//! A [`Policy`] is supplied wholesale by the host (the persisted settings plus
//! the schedule evaluator's verdict) and never mutated by the engine. With the
//! `serde` feature it deserializes from the camel-cased object the settings
//! store produces:
//!
//! ```json
//! { "isBlocked": true,
//!   "filters": { "grayscale": { "isActive": true, "value": 0.8 } } }
//! ```

use alloc::collections::BTreeMap;

/// A friction the policy can switch on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub enum FilterKey {
    /// Desaturation; value is the strength in `0.0..=1.0`.
    Grayscale,
    /// Blur; value is the radius in CSS pixels.
    Blur,
    /// Word-order permutation; value is the strength in `0.0..=1.0`.
    TextShuffle,
    /// Hover declutter; value unused.
    HoverReveal,
    /// Seek credits; value is the credit capacity, `<= 0` for the default.
    SkipGuard,
}

impl FilterKey {
    /// Every key, in dispatch order.
    pub const ALL: [Self; 5] = [
        Self::Grayscale,
        Self::Blur,
        Self::TextShuffle,
        Self::HoverReveal,
        Self::SkipGuard,
    ];
}

/// One filter's switch and strength.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase", default))]
pub struct FilterSetting {
    /// Whether the user enabled this filter.
    pub is_active: bool,
    /// Filter-specific strength.
    pub value: f64,
}

impl FilterSetting {
    /// An active setting with the given value.
    #[must_use]
    pub const fn active(value: f64) -> Self {
        Self {
            is_active: true,
            value,
        }
    }
}

/// A complete policy snapshot.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase", default))]
pub struct Policy {
    /// Whether the current time window blocks this site.
    pub is_blocked: bool,
    /// Per-filter settings; absent keys are inactive.
    pub filters: BTreeMap<FilterKey, FilterSetting>,
}

impl Policy {
    /// A blocking policy with no filters.
    #[must_use]
    pub fn blocked() -> Self {
        Self {
            is_blocked: true,
            filters: BTreeMap::new(),
        }
    }

    /// Builder-style helper that sets one filter active.
    #[must_use]
    pub fn with(mut self, key: FilterKey, value: f64) -> Self {
        self.filters.insert(key, FilterSetting::active(value));
        self
    }

    /// The setting for `key`, if present.
    #[must_use]
    pub fn setting(&self, key: FilterKey) -> Option<FilterSetting> {
        self.filters.get(&key).copied()
    }

    /// Whether `key` should be enforced now.
    #[must_use]
    pub fn enabled(&self, key: FilterKey) -> bool {
        self.is_blocked && self.setting(key).is_some_and(|s| s.is_active)
    }

    /// The value of `key` when enforced, otherwise `None`.
    #[must_use]
    pub fn value(&self, key: FilterKey) -> Option<f64> {
        self.enabled(key)
            .then(|| self.setting(key).map_or(0.0, |s| s.value))
    }
}
