// Copyright 2026 the Friction Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Pointer-driven reveal scope resolution.
//!
//! While visual friction is on, the element under the pointer is revealed:
//! [`RevealResolver`] tracks the pointer, resolves the deepest relevant
//! element beneath it and keeps [`attr::REVEAL`] on exactly that element.
//!
//! Resolution walks the element stack at the pointer, topmost first. Each
//! candidate's composed ancestor chain (crossing shadow roots through their
//! hosts) is tried against the site's scope selectors; only if no candidate
//! resolves that way are the generic media-stack selectors tried.
//!
//! Pointer-out does not clear immediately. Overlapping elements produce
//! out/over pairs in either order, so the resolver re-resolves at the last
//! known coordinates first and only schedules a deferred clear
//! ([`TimerId::RevealClear`]) when nothing resolves there. Re-entry cancels
//! it. A periodic sweep ([`TimerId::RevealSweep`]) removes stray marks and
//! forgets a scope that left the document.

use alloc::string::{String, ToString as _};
use alloc::vec::Vec;

use kurbo::Point;

use crate::attr;
use crate::dom::{DomView, composed_parent};
use crate::effect::{Effect, EffectSet, ListenerGroup, TimerId};
use crate::error::FrictionError;
use crate::node::NodeId;
use crate::time::{Duration, HostTime};
use crate::trace::{Component, ManagerAction, ScopeCause, ScopeEvent, Tracer};

/// Timing for the reveal resolver.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RevealConfig {
    /// Delay before a pointer-out with nothing under the cursor clears.
    pub clear_delay: Duration,
    /// Interval of the stray-mark sweep.
    pub sweep_interval: Duration,
    /// Marks at least this old on other elements are stray.
    pub stale_after: Duration,
}

impl RevealConfig {
    /// Default timing.
    #[must_use]
    pub const fn standard() -> Self {
        Self {
            clear_delay: Duration::from_millis(150),
            sweep_interval: Duration::from_millis(2000),
            stale_after: Duration::from_millis(300),
        }
    }
}

impl Default for RevealConfig {
    fn default() -> Self {
        Self::standard()
    }
}

/// A pointer event from the capturing document listeners.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum PointerEvent {
    /// `pointerover` at a client position.
    Over {
        /// Client coordinates.
        point: Point,
        /// Event time.
        now: HostTime,
    },
    /// `pointerout` at a client position.
    Out {
        /// Client coordinates.
        point: Point,
        /// Event time.
        now: HostTime,
    },
    /// `pointercancel`.
    Cancel {
        /// Event time.
        now: HostTime,
    },
}

/// A window-level event that affects what is under the pointer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WindowEvent {
    /// The window lost focus.
    Blur,
    /// The page was hidden.
    Hidden,
    /// The page scrolled.
    Scroll,
    /// The viewport resized.
    Resize,
}

/// Resolves and marks the single reveal scope.
#[derive(Debug)]
pub struct RevealResolver {
    config: RevealConfig,
    enabled: bool,
    scope_selectors: Vec<String>,
    media_selectors: Vec<String>,
    current: Option<NodeId>,
    last_point: Option<Point>,
    clear_pending: bool,
}

impl RevealResolver {
    /// Creates a disabled resolver.
    #[must_use]
    pub fn new(config: RevealConfig) -> Self {
        Self {
            config,
            enabled: false,
            scope_selectors: Vec::new(),
            media_selectors: Vec::new(),
            current: None,
            last_point: None,
            clear_pending: false,
        }
    }

    /// Whether the resolver is enabled.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// The element currently carrying the reveal mark.
    #[must_use]
    pub fn current(&self) -> Option<NodeId> {
        self.current
    }

    /// Enables or disables the resolver.
    ///
    /// Disabling is synchronous: the returned effects remove every mark,
    /// cancel both timers and detach the listeners.
    pub fn update(
        &mut self,
        enabled: bool,
        scope_selectors: &[String],
        media_selectors: &[String],
        dom: &(impl DomView + ?Sized),
        tracer: &mut Tracer<'_>,
    ) -> EffectSet {
        let mut effects = EffectSet::new();
        match (self.enabled, enabled) {
            (false, true) => {
                self.enabled = true;
                self.scope_selectors = scope_selectors.to_vec();
                self.media_selectors = media_selectors.to_vec();
                effects.push(Effect::Listen(ListenerGroup::HoverPointer));
                effects.push(Effect::Listen(ListenerGroup::HoverWindow));
                effects.push(self.arm_sweep());
                tracer.manager(Component::Reveal, ManagerAction::Applied);
            }
            (true, true) => {
                if self.scope_selectors != scope_selectors
                    || self.media_selectors != media_selectors
                {
                    self.scope_selectors = scope_selectors.to_vec();
                    self.media_selectors = media_selectors.to_vec();
                    tracer.manager(Component::Reveal, ManagerAction::Updated);
                }
            }
            (true, false) => {
                self.enabled = false;
                for node in dom.marked(attr::REVEAL) {
                    effects.push(Effect::RemoveAttribute {
                        node,
                        name: attr::REVEAL,
                    });
                }
                if let Some(previous) = self.current.take() {
                    tracer.scope(&ScopeEvent {
                        previous: Some(previous),
                        current: None,
                        cause: ScopeCause::Disabled,
                    });
                }
                self.last_point = None;
                self.clear_pending = false;
                effects.push(Effect::CancelTimer {
                    timer: TimerId::RevealClear,
                });
                effects.push(Effect::CancelTimer {
                    timer: TimerId::RevealSweep,
                });
                effects.push(Effect::Unlisten(ListenerGroup::HoverPointer));
                effects.push(Effect::Unlisten(ListenerGroup::HoverWindow));
                tracer.manager(Component::Reveal, ManagerAction::Removed);
            }
            (false, false) => {}
        }
        effects
    }

    /// Handles a pointer event.
    pub fn on_pointer(
        &mut self,
        event: PointerEvent,
        dom: &(impl DomView + ?Sized),
        tracer: &mut Tracer<'_>,
    ) -> EffectSet {
        if !self.enabled {
            return EffectSet::new();
        }
        match event {
            PointerEvent::Over { point, now } => {
                self.last_point = Some(point);
                let mut effects = self.cancel_clear();
                match self.resolve(point, dom, tracer) {
                    Some(scope) => {
                        effects.append(self.set_scope(
                            Some(scope),
                            now,
                            ScopeCause::PointerOver,
                            dom,
                            tracer,
                        ));
                    }
                    None => effects.append(self.schedule_clear()),
                }
                effects
            }
            PointerEvent::Out { point, now } => {
                self.last_point = Some(point);
                match self.resolve(point, dom, tracer) {
                    Some(scope) => {
                        let mut effects = self.cancel_clear();
                        effects.append(self.set_scope(
                            Some(scope),
                            now,
                            ScopeCause::PointerOut,
                            dom,
                            tracer,
                        ));
                        effects
                    }
                    None => self.schedule_clear(),
                }
            }
            PointerEvent::Cancel { now } => self.clear_now(now, dom, tracer),
        }
    }

    /// Handles a window event.
    pub fn on_window(
        &mut self,
        event: WindowEvent,
        now: HostTime,
        dom: &(impl DomView + ?Sized),
        tracer: &mut Tracer<'_>,
    ) -> EffectSet {
        if !self.enabled {
            return EffectSet::new();
        }
        match event {
            WindowEvent::Blur | WindowEvent::Hidden => self.clear_now(now, dom, tracer),
            WindowEvent::Scroll | WindowEvent::Resize => {
                let Some(point) = self.last_point else {
                    return EffectSet::new();
                };
                let scope = self.resolve(point, dom, tracer);
                let mut effects = self.cancel_clear();
                effects.append(self.set_scope(scope, now, ScopeCause::Reposition, dom, tracer));
                effects
            }
        }
    }

    /// Handles [`TimerId::RevealClear`] or [`TimerId::RevealSweep`].
    pub fn on_timer(
        &mut self,
        timer: TimerId,
        now: HostTime,
        dom: &(impl DomView + ?Sized),
        tracer: &mut Tracer<'_>,
    ) -> EffectSet {
        if !self.enabled {
            return EffectSet::new();
        }
        match timer {
            TimerId::RevealClear => {
                if !self.clear_pending {
                    return EffectSet::new();
                }
                self.clear_pending = false;
                self.set_scope(None, now, ScopeCause::Cleared, dom, tracer)
            }
            TimerId::RevealSweep => {
                let mut effects = EffectSet::new();
                if let Some(current) = self.current
                    && !dom.is_connected(current)
                {
                    self.current = None;
                    tracer.scope(&ScopeEvent {
                        previous: Some(current),
                        current: None,
                        cause: ScopeCause::Sweep,
                    });
                }
                for node in dom.marked(attr::REVEAL) {
                    if Some(node) != self.current {
                        effects.push(Effect::RemoveAttribute {
                            node,
                            name: attr::REVEAL,
                        });
                    }
                }
                effects.push(self.arm_sweep());
                effects
            }
            TimerId::RevertSettle(_) | TimerId::IndicatorReturn => EffectSet::new(),
        }
    }

    fn arm_sweep(&self) -> Effect {
        Effect::StartTimer {
            timer: TimerId::RevealSweep,
            delay: self.config.sweep_interval,
        }
    }

    fn schedule_clear(&mut self) -> EffectSet {
        if self.current.is_none() {
            return EffectSet::new();
        }
        self.clear_pending = true;
        EffectSet::from(Effect::StartTimer {
            timer: TimerId::RevealClear,
            delay: self.config.clear_delay,
        })
    }

    fn cancel_clear(&mut self) -> EffectSet {
        if core::mem::take(&mut self.clear_pending) {
            EffectSet::from(Effect::CancelTimer {
                timer: TimerId::RevealClear,
            })
        } else {
            EffectSet::new()
        }
    }

    fn clear_now(
        &mut self,
        now: HostTime,
        dom: &(impl DomView + ?Sized),
        tracer: &mut Tracer<'_>,
    ) -> EffectSet {
        let mut effects = self.cancel_clear();
        effects.append(self.set_scope(None, now, ScopeCause::Cleared, dom, tracer));
        effects
    }

    /// Moves the mark to `scope`, sweeping stale marks on other elements.
    fn set_scope(
        &mut self,
        scope: Option<NodeId>,
        now: HostTime,
        cause: ScopeCause,
        dom: &(impl DomView + ?Sized),
        tracer: &mut Tracer<'_>,
    ) -> EffectSet {
        let mut effects = EffectSet::new();
        let previous = self.current;
        if previous == scope {
            return effects;
        }
        if let Some(prev) = previous
            && dom.is_connected(prev)
        {
            effects.push(Effect::RemoveAttribute {
                node: prev,
                name: attr::REVEAL,
            });
        }
        for node in dom.marked(attr::REVEAL) {
            if Some(node) == previous || Some(node) == scope {
                continue;
            }
            let stale = dom
                .attribute(node, attr::REVEAL)
                .and_then(|v| v.parse::<u64>().ok())
                .is_none_or(|at| {
                    now.saturating_duration_since(HostTime(at)) >= self.config.stale_after
                });
            if stale {
                effects.push(Effect::RemoveAttribute {
                    node,
                    name: attr::REVEAL,
                });
            }
        }
        if let Some(node) = scope {
            effects.push(Effect::SetAttribute {
                node,
                name: attr::REVEAL,
                value: now.millis().to_string(),
            });
        }
        self.current = scope;
        tracer.scope(&ScopeEvent {
            previous,
            current: scope,
            cause,
        });
        effects
    }

    /// Site scope first across the whole stack, then the media stack.
    fn resolve(
        &self,
        point: Point,
        dom: &(impl DomView + ?Sized),
        tracer: &mut Tracer<'_>,
    ) -> Option<NodeId> {
        let stack = dom.elements_from_point(point);
        [&self.scope_selectors, &self.media_selectors]
            .into_iter()
            .filter(|list| !list.is_empty())
            .find_map(|list| {
                stack
                    .iter()
                    .find_map(|&el| closest_any(dom, el, list, tracer))
            })
    }
}

/// The nearest composed ancestor-or-self of `element` matching any of
/// `selectors`. Rejected selectors are traced and skipped.
fn closest_any(
    dom: &(impl DomView + ?Sized),
    element: NodeId,
    selectors: &[String],
    tracer: &mut Tracer<'_>,
) -> Option<NodeId> {
    let mut cursor = Some(element);
    let mut broken: Vec<&str> = Vec::new();
    while let Some(el) = cursor {
        for selector in selectors {
            if broken.contains(&selector.as_str()) {
                continue;
            }
            match dom.matches(el, selector) {
                Ok(true) => return Some(el),
                Ok(false) => {}
                Err(err) => {
                    tracer.fault(Component::Reveal, &FrictionError::from(err));
                    broken.push(selector);
                }
            }
        }
        cursor = composed_parent(dom, el);
    }
    None
}

#[cfg(test)]
mod tests {
    use alloc::vec;

    use kurbo::Rect;

    use super::*;
    use crate::headless::HeadlessDom;

    fn sel(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| (*s).to_string()).collect()
    }

    fn t(ms: u64) -> HostTime {
        HostTime(ms)
    }

    const A: Point = Point::new(10.0, 10.0);
    const B: Point = Point::new(110.0, 10.0);
    const GAP: Point = Point::new(500.0, 500.0);

    /// Two cards side by side; card B's thumbnail lives in a shadow root.
    struct Page {
        dom: HeadlessDom,
        card_a: NodeId,
        card_b: NodeId,
        video: NodeId,
    }

    fn page() -> Page {
        let mut dom = HeadlessDom::new();
        let root = dom.root_element();
        let card_a = dom.append_element(root, "div");
        dom.set_attr(card_a, "class", "card");
        let img_a = dom.append_element(card_a, "img");
        let card_b = dom.append_element(root, "div");
        dom.set_attr(card_b, "class", "card");
        let host = dom.append_element(card_b, "x-thumb");
        let shadow = dom.attach_shadow(host);
        let img_b = dom.append_element(shadow, "img");
        let video = dom.append_element(root, "video");
        dom.set_hit(Rect::new(0.0, 0.0, 100.0, 100.0), vec![img_a, card_a, root]);
        dom.set_hit(Rect::new(100.0, 0.0, 200.0, 100.0), vec![img_b, root]);
        dom.set_hit(Rect::new(0.0, 200.0, 100.0, 300.0), vec![video, root]);
        Page {
            dom,
            card_a,
            card_b,
            video,
        }
    }

    fn enabled(p: &mut Page) -> RevealResolver {
        let mut r = RevealResolver::new(RevealConfig::standard());
        let e = r.update(
            true,
            &sel(&[".card"]),
            &sel(&["video"]),
            &p.dom,
            &mut Tracer::none(),
        );
        p.dom.apply(&e);
        r
    }

    fn over(r: &mut RevealResolver, p: &mut Page, point: Point, now: u64) {
        let event = PointerEvent::Over { point, now: t(now) };
        let e = r.on_pointer(event, &p.dom, &mut Tracer::none());
        p.dom.apply(&e);
    }

    fn out(r: &mut RevealResolver, p: &mut Page, point: Point, now: u64) {
        let event = PointerEvent::Out { point, now: t(now) };
        let e = r.on_pointer(event, &p.dom, &mut Tracer::none());
        p.dom.apply(&e);
    }

    #[test]
    fn enabling_installs_listeners_and_sweep() {
        let mut p = page();
        let _r = enabled(&mut p);
        assert!(p.dom.is_listening(ListenerGroup::HoverPointer));
        assert!(p.dom.is_listening(ListenerGroup::HoverWindow));
        assert_eq!(p.dom.timer(TimerId::RevealSweep), Some(Duration::from_millis(2000)));
    }

    #[test]
    fn resolution_crosses_shadow_boundary() {
        let mut p = page();
        let mut r = enabled(&mut p);
        over(&mut r, &mut p, B, 1000);
        assert_eq!(r.current(), Some(p.card_b));
        assert_eq!(p.dom.attribute(p.card_b, attr::REVEAL).as_deref(), Some("1000"));
    }

    #[test]
    fn media_stack_is_the_fallback() {
        let mut p = page();
        let mut r = enabled(&mut p);
        over(&mut r, &mut p, Point::new(50.0, 250.0), 1000);
        assert_eq!(r.current(), Some(p.video));
    }

    #[test]
    fn single_scope_under_overlapping_events() {
        let mut p = page();
        let mut r = enabled(&mut p);
        over(&mut r, &mut p, A, 1000);
        // Entering B is reported before leaving A.
        over(&mut r, &mut p, B, 1010);
        out(&mut r, &mut p, B, 1011);
        assert_eq!(r.current(), Some(p.card_b));
        assert_eq!(p.dom.marked(attr::REVEAL), vec![p.card_b]);
        assert_eq!(p.dom.timer(TimerId::RevealClear), None);
    }

    #[test]
    fn pointer_out_into_a_gap_defers_clear_and_reentry_cancels() {
        let mut p = page();
        let mut r = enabled(&mut p);
        over(&mut r, &mut p, A, 1000);
        out(&mut r, &mut p, GAP, 1100);
        assert_eq!(r.current(), Some(p.card_a), "still marked during the grace period");
        assert!(p.dom.timer(TimerId::RevealClear).is_some());

        over(&mut r, &mut p, A, 1120);
        assert_eq!(p.dom.timer(TimerId::RevealClear), None);

        out(&mut r, &mut p, GAP, 1200);
        let e = r.on_timer(TimerId::RevealClear, t(1350), &p.dom, &mut Tracer::none());
        p.dom.apply(&e);
        assert_eq!(r.current(), None);
        assert!(p.dom.marked(attr::REVEAL).is_empty());
    }

    #[test]
    fn blur_clears_immediately() {
        let mut p = page();
        let mut r = enabled(&mut p);
        over(&mut r, &mut p, A, 1000);
        let e = r.on_window(WindowEvent::Blur, t(1001), &p.dom, &mut Tracer::none());
        p.dom.apply(&e);
        assert_eq!(r.current(), None);
        assert!(p.dom.attribute(p.card_a, attr::REVEAL).is_none());
    }

    #[test]
    fn sweep_removes_strays_and_detached_scope() {
        let mut p = page();
        let mut r = enabled(&mut p);
        over(&mut r, &mut p, A, 1000);
        p.dom.set_attr(p.card_b, attr::REVEAL, "5");
        let e = r.on_timer(TimerId::RevealSweep, t(3000), &p.dom, &mut Tracer::none());
        p.dom.apply(&e);
        assert_eq!(p.dom.marked(attr::REVEAL), vec![p.card_a]);
        assert!(p.dom.timer(TimerId::RevealSweep).is_some(), "sweep re-arms");

        p.dom.remove(p.card_a);
        let e = r.on_timer(TimerId::RevealSweep, t(5000), &p.dom, &mut Tracer::none());
        p.dom.apply(&e);
        assert_eq!(r.current(), None);
    }

    #[test]
    fn disabling_is_synchronous() {
        let mut p = page();
        let mut r = enabled(&mut p);
        over(&mut r, &mut p, A, 1000);
        out(&mut r, &mut p, GAP, 1100);
        let e = r.update(false, &[], &[], &p.dom, &mut Tracer::none());
        p.dom.apply(&e);
        assert!(p.dom.marked(attr::REVEAL).is_empty());
        assert_eq!(p.dom.timers().count(), 0);
        assert!(!p.dom.is_listening(ListenerGroup::HoverPointer));
        assert!(!p.dom.is_listening(ListenerGroup::HoverWindow));

        // Events after disabling do nothing.
        let event = PointerEvent::Over {
            point: A,
            now: t(1200),
        };
        let e = r.on_pointer(event, &p.dom, &mut Tracer::none());
        assert!(e.is_empty());
    }

    #[test]
    fn broken_scope_selector_falls_through() {
        let mut p = page();
        let mut r = RevealResolver::new(RevealConfig::standard());
        let e = r.update(
            true,
            &sel(&["div:has(", ".card"]),
            &[],
            &p.dom,
            &mut Tracer::none(),
        );
        p.dom.apply(&e);
        over(&mut r, &mut p, A, 1000);
        assert_eq!(r.current(), Some(p.card_a));
    }

    #[test]
    fn scroll_re_resolves_under_a_still_pointer() {
        let mut p = page();
        let mut r = enabled(&mut p);
        over(&mut r, &mut p, A, 1000);
        assert_eq!(r.current(), Some(p.card_a));

        // The page scrolls card B under the pointer.
        let root = p.dom.root_element();
        p.dom.set_hit(Rect::new(0.0, 0.0, 100.0, 100.0), vec![p.card_b, root]);
        let e = r.on_window(WindowEvent::Scroll, t(1500), &p.dom, &mut Tracer::none());
        p.dom.apply(&e);
        assert_eq!(r.current(), Some(p.card_b));
        assert_eq!(p.dom.marked(attr::REVEAL), vec![p.card_b]);
        assert_eq!(p.dom.attribute(p.card_b, attr::REVEAL).as_deref(), Some("1500"));
    }

    #[test]
    fn resize_onto_bare_page_clears_the_scope() {
        let mut p = page();
        let mut r = enabled(&mut p);
        over(&mut r, &mut p, A, 1000);

        let root = p.dom.root_element();
        p.dom.set_hit(Rect::new(0.0, 0.0, 100.0, 100.0), vec![root]);
        let e = r.on_window(WindowEvent::Resize, t(1500), &p.dom, &mut Tracer::none());
        p.dom.apply(&e);
        assert_eq!(r.current(), None);
        assert!(p.dom.marked(attr::REVEAL).is_empty());
    }

    #[test]
    fn scroll_without_a_pointer_does_nothing() {
        let mut p = page();
        let mut r = enabled(&mut p);
        let e = r.on_window(WindowEvent::Scroll, t(1000), &p.dom, &mut Tracer::none());
        assert!(e.is_empty());
        assert_eq!(r.current(), None);
    }
}
