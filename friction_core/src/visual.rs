// Copyright 2026 the Friction Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Grayscale and blur friction.
//!
//! The engine stylesheet keys off marker attributes and reads its strengths
//! from two custom properties on the document root, so a strength change is a
//! single style write.

use alloc::format;
use alloc::string::String;

use crate::attr;
use crate::dom::DomView;
use crate::effect::{Effect, EffectSet};
use crate::error::FrictionError;
use crate::marker::TargetMarker;
use crate::mutation::{MutationBatch, MutationMultiplexer};
use crate::node::NodeId;
use crate::selectors::SelectorBundle;
use crate::trace::{Component, ManagerAction, Tracer};

/// Custom property holding the grayscale amount, `0..=1`.
pub const GRAYSCALE_PROPERTY: &str = "--friction-grayscale";
/// Custom property holding the blur radius.
pub const BLUR_PROPERTY: &str = "--friction-blur";

/// The engine stylesheet.
pub const STYLESHEET: &str = "\
html[data-friction-visual] [data-friction-visual-target]:not([data-friction-exempt]):not([data-friction-reveal]) {
  filter: grayscale(var(--friction-grayscale, 0)) blur(var(--friction-blur, 0px));
  transition: filter 200ms ease;
}
html[data-friction-visual] [data-friction-text-target]:not([data-friction-exempt]):not([data-friction-reveal]) {
  filter: grayscale(var(--friction-grayscale, 0));
}
html[data-friction-visual] [data-friction-interactive]:not([data-friction-exempt]) {
  filter: grayscale(var(--friction-grayscale, 0));
}
html[data-friction-visual] [data-friction-reveal] {
  filter: none !important;
}
";

/// Strengths to enforce. `None` leaves that effect off.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct VisualSettings {
    /// Grayscale amount, clamped to `0..=1`.
    pub grayscale: Option<f64>,
    /// Blur radius in CSS pixels, clamped to `>= 0`.
    pub blur: Option<f64>,
}

impl VisualSettings {
    /// Whether anything is enforced.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.grayscale.is_some() || self.blur.is_some()
    }

    fn grayscale_value(&self) -> Option<String> {
        self.grayscale.map(|v| format!("{}", v.clamp(0.0, 1.0)))
    }

    fn blur_value(&self) -> Option<String> {
        self.blur.map(|v| format!("{}px", v.max(0.0)))
    }
}

const TARGETS: usize = 0;
const TEXT_TARGETS: usize = 1;
const INTERACTIVE: usize = 2;
const EXEMPT: usize = 3;

/// Visual friction manager.
#[derive(Debug)]
pub struct VisualFriction<K> {
    markers: [TargetMarker<K>; 4],
    keys: [K; 4],
    applied: Option<VisualSettings>,
    root: Option<NodeId>,
}

impl<K: Copy + PartialEq> VisualFriction<K> {
    /// Creates a removed manager.
    ///
    /// `keys` name the four markers to the multiplexer, in the order
    /// visual targets, text targets, interactive targets, exempt.
    #[must_use]
    pub fn new(keys: [K; 4]) -> Self {
        Self {
            markers: [
                TargetMarker::new(keys[TARGETS], attr::VISUAL_TARGET, ""),
                TargetMarker::new(keys[TEXT_TARGETS], attr::TEXT_TARGET, ""),
                TargetMarker::new(keys[INTERACTIVE], attr::INTERACTIVE, ""),
                TargetMarker::new(keys[EXEMPT], attr::EXEMPT, ""),
            ],
            keys,
            applied: None,
            root: None,
        }
    }

    /// Whether the manager is applied.
    #[must_use]
    pub fn is_applied(&self) -> bool {
        self.applied.is_some()
    }

    /// Whether `key` names one of this manager's markers.
    #[must_use]
    pub fn owns(&self, key: K) -> bool {
        self.keys.contains(&key)
    }

    /// Applies, re-tunes, or removes visual friction.
    pub fn update(
        &mut self,
        settings: VisualSettings,
        bundle: &SelectorBundle,
        dom: &(impl DomView + ?Sized),
        mux: &mut MutationMultiplexer<K>,
        tracer: &mut Tracer<'_>,
    ) -> EffectSet {
        if !settings.is_active() {
            return self.remove(dom, mux, tracer);
        }
        let mut effects = EffectSet::new();
        let previous = self.applied.replace(settings);
        if previous.is_none() {
            effects.push(Effect::InstallStylesheet { css: STYLESHEET });
            self.root = dom.root();
            if let Some(root) = self.root {
                effects.push(Effect::SetAttribute {
                    node: root,
                    name: attr::VISUAL_ROOT,
                    value: String::new(),
                });
            }
        }
        if let Some(root) = self.root {
            let before = previous.unwrap_or_default();
            style_diff(
                &mut effects,
                root,
                GRAYSCALE_PROPERTY,
                before.grayscale_value(),
                settings.grayscale_value(),
            );
            style_diff(
                &mut effects,
                root,
                BLUR_PROPERTY,
                before.blur_value(),
                settings.blur_value(),
            );
        }
        self.apply_markers(bundle, dom, mux, tracer, &mut effects);

        let action = if previous.is_some() {
            ManagerAction::Updated
        } else {
            ManagerAction::Applied
        };
        if previous.is_none() || !effects.is_empty() {
            tracer.manager(Component::Visual, action);
        }
        effects
    }

    /// Routes a batch to the marker registered under `key`.
    pub fn on_batch(
        &mut self,
        key: K,
        batch: &MutationBatch,
        dom: &(impl DomView + ?Sized),
        tracer: &mut Tracer<'_>,
    ) -> Result<EffectSet, FrictionError> {
        match self.keys.iter().position(|k| *k == key) {
            Some(i) => self.markers[i].on_batch(batch, dom, tracer),
            None => Ok(EffectSet::new()),
        }
    }

    /// Removes every mark, the root flag, both properties, and the
    /// stylesheet.
    pub fn remove(
        &mut self,
        dom: &(impl DomView + ?Sized),
        mux: &mut MutationMultiplexer<K>,
        tracer: &mut Tracer<'_>,
    ) -> EffectSet {
        let mut effects = EffectSet::new();
        if self.applied.take().is_none() {
            return effects;
        }
        for marker in &mut self.markers {
            effects.append(marker.remove(dom, mux, tracer));
        }
        if let Some(root) = self.root.take()
            && dom.is_connected(root)
        {
            effects.push(Effect::RemoveAttribute {
                node: root,
                name: attr::VISUAL_ROOT,
            });
            effects.push(Effect::RemoveStyle {
                node: root,
                property: GRAYSCALE_PROPERTY,
            });
            effects.push(Effect::RemoveStyle {
                node: root,
                property: BLUR_PROPERTY,
            });
        }
        effects.push(Effect::RemoveStylesheet);
        tracer.manager(Component::Visual, ManagerAction::Removed);
        effects
    }

    fn apply_markers(
        &mut self,
        bundle: &SelectorBundle,
        dom: &(impl DomView + ?Sized),
        mux: &mut MutationMultiplexer<K>,
        tracer: &mut Tracer<'_>,
        effects: &mut EffectSet,
    ) {
        let lists = [
            &bundle.visual_targets,
            &bundle.text_visual_targets,
            &bundle.interactive_targets,
            &bundle.overlay_exempt,
        ];
        for (marker, selectors) in self.markers.iter_mut().zip(lists) {
            effects.append(marker.apply(selectors, dom, mux, tracer));
        }
    }
}

fn style_diff(
    effects: &mut EffectSet,
    node: NodeId,
    property: &'static str,
    before: Option<String>,
    after: Option<String>,
) {
    if before == after {
        return;
    }
    match after {
        Some(value) => effects.push(Effect::SetStyle {
            node,
            property,
            value,
        }),
        None => effects.push(Effect::RemoveStyle { node, property }),
    }
}
