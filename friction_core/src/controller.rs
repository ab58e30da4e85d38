// Copyright 2026 the Friction Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Policy-driven orchestration of every manager.
//!
//! The [`Controller`] owns one instance of each manager and the shared
//! [`MutationMultiplexer`]. [`Controller::update`] turns a [`Policy`] snapshot
//! into idempotent apply and remove calls; [`Controller::handle`] routes
//! backend events to the manager that owns them. The controller keeps no DOM
//! state of its own: everything it knows about the page is read through the
//! [`DomView`] passed to each call.

use alloc::string::String;
use alloc::vec::Vec;

use crate::dom::DomView;
use crate::effect::{EffectSet, TimerId};
use crate::error::FrictionError;
use crate::mutation::{MutationMultiplexer, MutationRecord};
use crate::policy::{FilterKey, Policy};
use crate::reveal::{PointerEvent, RevealConfig, RevealResolver, WindowEvent};
use crate::seek::{IndicatorEvent, MediaEvent, SeekConfig, SeekGuard};
use crate::selectors::SelectorBundle;
use crate::shuffle::{ShuffleConfig, ShuffleSettings, TextShuffler};
use crate::time::HostTime;
use crate::trace::{Component, Tracer};
use crate::visual::{VisualFriction, VisualSettings};

/// Identifies a multiplexer subscriber.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Subscriber {
    /// Visual target marker.
    VisualTargets,
    /// Text visual target marker.
    TextTargets,
    /// Interactive target marker.
    Interactive,
    /// Overlay-exempt marker.
    Exempt,
    /// The text shuffler.
    Shuffle,
}

/// Configuration of every manager.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EngineConfig {
    /// Text shuffling.
    pub shuffle: ShuffleConfig,
    /// Hover reveal.
    pub reveal: RevealConfig,
    /// Seek credits.
    pub seek: SeekConfig,
}

impl EngineConfig {
    /// The standard preset of each manager.
    #[must_use]
    pub const fn standard() -> Self {
        Self {
            shuffle: ShuffleConfig::standard(),
            reveal: RevealConfig::standard(),
            seek: SeekConfig::standard(),
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::standard()
    }
}

/// An input from the backend.
#[derive(Clone, Debug, PartialEq)]
pub enum EngineEvent {
    /// Pointer movement relevant to hover reveal.
    Pointer(PointerEvent),
    /// Window-level visibility or geometry change.
    Window {
        /// What happened.
        event: WindowEvent,
        /// Event time.
        now: HostTime,
    },
    /// A media element event.
    Media(MediaEvent),
    /// A real input gesture (pointer down, touch start, key down).
    Gesture {
        /// Event time.
        now: HostTime,
    },
    /// Input from the seek indicator widget.
    Indicator {
        /// What happened.
        event: IndicatorEvent,
        /// Event time.
        now: HostTime,
    },
    /// A timer armed by an earlier effect fired.
    Timer {
        /// Which timer.
        id: TimerId,
        /// Fire time.
        now: HostTime,
    },
    /// Raw records from the shared observer.
    Mutations(Vec<MutationRecord>),
    /// The animation frame requested by [`Effect::RequestFlush`] arrived.
    ///
    /// [`Effect::RequestFlush`]: crate::effect::Effect::RequestFlush
    Flush,
    /// The shared observer could not be attached.
    ObserverFailed {
        /// Host-provided description.
        reason: String,
    },
}

/// Drives every manager from policy snapshots and backend events.
#[derive(Debug)]
pub struct Controller {
    bundle: SelectorBundle,
    mux: MutationMultiplexer<Subscriber>,
    visual: VisualFriction<Subscriber>,
    shuffler: TextShuffler<Subscriber>,
    reveal: RevealResolver,
    seek: SeekGuard,
}

impl Controller {
    /// Creates a controller with every manager removed.
    ///
    /// `bundle` is the selector bundle for the current site.
    #[must_use]
    pub fn new(config: EngineConfig, bundle: SelectorBundle) -> Self {
        Self {
            bundle,
            mux: MutationMultiplexer::new(),
            visual: VisualFriction::new([
                Subscriber::VisualTargets,
                Subscriber::TextTargets,
                Subscriber::Interactive,
                Subscriber::Exempt,
            ]),
            shuffler: TextShuffler::new(Subscriber::Shuffle, config.shuffle),
            reveal: RevealResolver::new(config.reveal),
            seek: SeekGuard::new(config.seek),
        }
    }

    /// The site's selector bundle.
    #[must_use]
    pub fn bundle(&self) -> &SelectorBundle {
        &self.bundle
    }

    /// The shared multiplexer.
    #[must_use]
    pub fn multiplexer(&self) -> &MutationMultiplexer<Subscriber> {
        &self.mux
    }

    /// The text shuffler.
    #[must_use]
    pub fn shuffler(&self) -> &TextShuffler<Subscriber> {
        &self.shuffler
    }

    /// The hover reveal resolver.
    #[must_use]
    pub fn reveal(&self) -> &RevealResolver {
        &self.reveal
    }

    /// The seek-credit guard.
    #[must_use]
    pub fn seek(&self) -> &SeekGuard {
        &self.seek
    }

    /// Brings every manager in line with `policy`.
    ///
    /// A filter is enforced when the policy is blocked and the filter is
    /// active. Calling this twice with the same policy emits no DOM writes
    /// the second time.
    pub fn update(
        &mut self,
        policy: &Policy,
        now: HostTime,
        dom: &(impl DomView + ?Sized),
        tracer: &mut Tracer<'_>,
    ) -> EffectSet {
        let mut effects = EffectSet::new();

        let visual = VisualSettings {
            grayscale: policy.value(FilterKey::Grayscale),
            blur: policy.value(FilterKey::Blur),
        };
        effects.append(
            self.visual
                .update(visual, &self.bundle, dom, &mut self.mux, tracer),
        );

        let shuffle = ShuffleSettings {
            enabled: policy.enabled(FilterKey::TextShuffle),
            strength: policy.value(FilterKey::TextShuffle).unwrap_or(0.0),
        };
        effects.append(self.shuffler.update(
            shuffle,
            &self.bundle.text_shuffle_excluded_closest,
            dom,
            &mut self.mux,
            tracer,
        ));

        effects.append(self.reveal.update(
            policy.enabled(FilterKey::HoverReveal),
            &self.bundle.hover_reveal_scope,
            &self.bundle.media_stack,
            dom,
            tracer,
        ));

        effects.append(self.seek.update(
            policy.enabled(FilterKey::SkipGuard),
            policy.value(FilterKey::SkipGuard).and_then(credit_capacity),
            now,
            tracer,
        ));
        effects
    }

    /// Removes every active manager.
    pub fn stop(
        &mut self,
        now: HostTime,
        dom: &(impl DomView + ?Sized),
        tracer: &mut Tracer<'_>,
    ) -> EffectSet {
        self.update(&Policy::default(), now, dom, tracer)
    }

    /// Routes one backend event.
    pub fn handle(
        &mut self,
        event: EngineEvent,
        dom: &(impl DomView + ?Sized),
        tracer: &mut Tracer<'_>,
    ) -> EffectSet {
        match event {
            EngineEvent::Pointer(event) => self.reveal.on_pointer(event, dom, tracer),
            EngineEvent::Window { event, now } => self.reveal.on_window(event, now, dom, tracer),
            EngineEvent::Media(event) => {
                let mut effects = self.seek.forget_detached(dom, tracer);
                effects.append(self.seek.on_media(event, tracer));
                effects
            }
            EngineEvent::Gesture { now } => {
                self.seek.on_gesture(now);
                EffectSet::new()
            }
            EngineEvent::Indicator { event, now } => self.seek.on_indicator(event, now),
            EngineEvent::Timer { id, now } => match id {
                TimerId::RevealClear | TimerId::RevealSweep => {
                    self.reveal.on_timer(id, now, dom, tracer)
                }
                TimerId::RevertSettle(_) | TimerId::IndicatorReturn => self.seek.on_timer(id, now),
            },
            EngineEvent::Mutations(records) => {
                let mut effects = EffectSet::new();
                for record in records {
                    effects.append(self.mux.record(record));
                }
                effects
            }
            EngineEvent::Flush => self.flush(dom, tracer),
            EngineEvent::ObserverFailed { reason } => {
                let error = FrictionError::ObserverAttach { reason };
                self.mux.observer_failed(&error, tracer);
                tracer.fault(Component::Controller, &error);
                EffectSet::new()
            }
        }
    }

    fn flush(&mut self, dom: &(impl DomView + ?Sized), tracer: &mut Tracer<'_>) -> EffectSet {
        let Self {
            mux,
            visual,
            shuffler,
            seek,
            ..
        } = self;
        let mut effects = mux.flush(tracer, |key, batch, tracer| match key {
            Subscriber::Shuffle => shuffler.on_batch(batch, dom),
            key => visual.on_batch(key, batch, dom, tracer),
        });
        effects.append(shuffler.drain(dom, mux, tracer));
        effects.append(seek.forget_detached(dom, tracer));
        effects
    }
}

/// Converts a policy value to a credit capacity; `<= 0` means the default.
fn credit_capacity(value: f64) -> Option<u8> {
    if value.is_nan() || value <= 0.0 {
        return None;
    }
    #[expect(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        reason = "clamped to 1..=255"
    )]
    let credits = (value.min(255.0) + 0.5) as u8;
    Some(credits.max(1))
}

#[cfg(test)]
mod tests {
    use alloc::string::ToString as _;
    use alloc::vec;

    use kurbo::{Point, Rect};

    use super::*;
    use crate::attr;
    use crate::effect::{Effect, ListenerGroup};
    use crate::headless::HeadlessDom;
    use crate::node::NodeId;
    use crate::seek::{MediaEventKind, MediaSnapshot, SourceFingerprint};

    const PROSE: &str = "the quick brown fox jumps over the lazy dog near the river bank today";

    fn bundle() -> SelectorBundle {
        SelectorBundle {
            visual_targets: vec!["img".to_string()],
            hover_reveal_scope: vec![".card".to_string()],
            media_stack: vec!["video".to_string()],
            ..SelectorBundle::default()
        }
    }

    fn full_policy() -> Policy {
        Policy::blocked()
            .with(FilterKey::Grayscale, 1.0)
            .with(FilterKey::Blur, 3.0)
            .with(FilterKey::TextShuffle, 1.0)
            .with(FilterKey::HoverReveal, 1.0)
            .with(FilterKey::SkipGuard, 0.0)
    }

    struct Page {
        dom: HeadlessDom,
        img: NodeId,
        card: NodeId,
        text: NodeId,
    }

    fn page() -> Page {
        let mut dom = HeadlessDom::new();
        let root = dom.root_element();
        let card = dom.append_element(root, "div");
        dom.set_attr(card, "class", "card");
        let img = dom.append_element(card, "img");
        let p = dom.append_element(root, "p");
        let text = dom.append_text(p, PROSE);
        let _ = dom.take_records();
        Page {
            dom,
            img,
            card,
            text,
        }
    }

    #[test]
    fn update_applies_every_filter_and_is_idempotent() {
        let mut page = page();
        let mut ctl = Controller::new(EngineConfig::standard(), bundle());
        let mut tracer = Tracer::none();

        let e = ctl.update(&full_policy(), HostTime(0), &page.dom, &mut tracer);
        page.dom.apply(&e);
        assert!(page.dom.stylesheet().is_some());
        assert!(page.dom.attribute(page.img, attr::VISUAL_TARGET).is_some());
        assert!(ctl.shuffler().record(page.text).is_some());
        assert!(page.dom.is_listening(ListenerGroup::HoverPointer));
        assert!(page.dom.is_listening(ListenerGroup::MediaEvents));
        assert_eq!(ctl.seek().max_credits(), 3, "non-positive value uses the default");

        let e = ctl.update(&full_policy(), HostTime(10), &page.dom, &mut tracer);
        assert_eq!(page.dom.apply(&e), 0);
    }

    #[test]
    fn stop_restores_the_page() {
        let mut page = page();
        let mut ctl = Controller::new(EngineConfig::standard(), bundle());
        let mut tracer = Tracer::none();
        let e = ctl.update(&full_policy(), HostTime(0), &page.dom, &mut tracer);
        page.dom.apply(&e);

        let e = ctl.stop(HostTime(5), &page.dom, &mut tracer);
        page.dom.apply(&e);
        assert!(page.dom.stylesheet().is_none());
        assert!(page.dom.marked(attr::VISUAL_TARGET).is_empty());
        assert_eq!(page.dom.text(page.text).as_deref(), Some(PROSE));
        assert!(!page.dom.is_listening(ListenerGroup::HoverPointer));
        assert!(!page.dom.is_listening(ListenerGroup::MediaEvents));
        assert_eq!(page.dom.timers().count(), 0);
        assert!(page.dom.observer().is_none());
    }

    #[test]
    fn unblocked_policy_removes_unconditionally() {
        let mut page = page();
        let mut ctl = Controller::new(EngineConfig::standard(), bundle());
        let mut tracer = Tracer::none();
        let e = ctl.update(&full_policy(), HostTime(0), &page.dom, &mut tracer);
        page.dom.apply(&e);

        let mut unblocked = full_policy();
        unblocked.is_blocked = false;
        let e = ctl.update(&unblocked, HostTime(5), &page.dom, &mut tracer);
        page.dom.apply(&e);
        assert!(page.dom.stylesheet().is_none());
        assert!(!ctl.reveal().is_enabled());
        assert!(!ctl.seek().is_enabled());
        assert_eq!(ctl.multiplexer().subscriber_count(), 0);
    }

    #[test]
    fn flush_routes_inserted_nodes_to_markers_and_shuffler() {
        let mut page = page();
        let root = page.dom.root_element();
        let mut ctl = Controller::new(EngineConfig::standard(), bundle());
        let mut tracer = Tracer::none();
        let e = ctl.update(&full_policy(), HostTime(0), &page.dom, &mut tracer);
        page.dom.apply(&e);

        let late_img = page.dom.append_element(root, "img");
        let p = page.dom.append_element(root, "p");
        let late_text = page.dom.append_text(p, PROSE);
        let records = page.dom.take_records();
        let e = ctl.handle(EngineEvent::Mutations(records), &page.dom, &mut tracer);
        assert!(e.any(|e| *e == Effect::RequestFlush));
        page.dom.apply(&e);
        assert!(page.dom.take_flush_request());

        let e = ctl.handle(EngineEvent::Flush, &page.dom, &mut tracer);
        page.dom.apply(&e);
        assert!(page.dom.attribute(late_img, attr::VISUAL_TARGET).is_some());
        assert!(ctl.shuffler().record(late_text).is_some());
    }

    #[test]
    fn timers_and_media_reach_their_managers() {
        let mut page = page();
        let mut ctl = Controller::new(EngineConfig::standard(), bundle());
        let mut tracer = Tracer::none();
        let e = ctl.update(&full_policy(), HostTime(0), &page.dom, &mut tracer);
        page.dom.apply(&e);

        page.dom.set_hit(
            Rect::new(0.0, 0.0, 100.0, 100.0),
            vec![page.img, page.card, page.dom.root_element()],
        );
        let e = ctl.handle(
            EngineEvent::Pointer(PointerEvent::Over {
                point: Point::new(10.0, 10.0),
                now: HostTime(100),
            }),
            &page.dom,
            &mut tracer,
        );
        page.dom.apply(&e);
        assert_eq!(ctl.reveal().current(), Some(page.card));
        assert!(page.dom.attribute(page.card, attr::REVEAL).is_some());

        let video = page.dom.append_element(page.card, "video");
        let snapshot = MediaSnapshot {
            current_time: 0.0,
            duration: 60.0,
            paused: false,
            seeking: false,
            source: SourceFingerprint(9),
        };
        let e = ctl.handle(
            EngineEvent::Media(MediaEvent {
                media: video,
                kind: MediaEventKind::Play,
                snapshot,
                now: HostTime(200),
            }),
            &page.dom,
            &mut tracer,
        );
        assert!(e.any(|e| matches!(e, Effect::ShowIndicator(view) if view.media == video)));
        assert_eq!(ctl.seek().active(), Some(video));

        let e = ctl.handle(
            EngineEvent::Timer {
                id: TimerId::IndicatorReturn,
                now: HostTime(300),
            },
            &page.dom,
            &mut tracer,
        );
        assert!(e.is_empty(), "gauge mode already");
    }

    #[test]
    fn removed_media_is_forgotten_on_flush() {
        let mut page = page();
        let mut ctl = Controller::new(EngineConfig::standard(), bundle());
        let mut tracer = Tracer::none();
        let e = ctl.update(&full_policy(), HostTime(0), &page.dom, &mut tracer);
        page.dom.apply(&e);

        let video = page.dom.append_element(page.card, "video");
        let snapshot = MediaSnapshot {
            current_time: 0.0,
            duration: 60.0,
            paused: false,
            seeking: false,
            source: SourceFingerprint(9),
        };
        let e = ctl.handle(
            EngineEvent::Media(MediaEvent {
                media: video,
                kind: MediaEventKind::Play,
                snapshot,
                now: HostTime(100),
            }),
            &page.dom,
            &mut tracer,
        );
        page.dom.apply(&e);
        assert!(page.dom.indicator().is_some());
        let _ = page.dom.take_records();

        page.dom.remove(video);
        let records = page.dom.take_records();
        let e = ctl.handle(EngineEvent::Mutations(records), &page.dom, &mut tracer);
        page.dom.apply(&e);
        let e = ctl.handle(EngineEvent::Flush, &page.dom, &mut tracer);
        assert!(e.any(|e| *e == Effect::HideIndicator));
        page.dom.apply(&e);
        assert!(page.dom.indicator().is_none());
        assert!(ctl.seek().state(video).is_none());
        assert_eq!(ctl.seek().active(), None);
    }

    #[test]
    fn credit_capacity_rounds_and_defaults() {
        assert_eq!(credit_capacity(0.0), None);
        assert_eq!(credit_capacity(-2.0), None);
        assert_eq!(credit_capacity(f64::NAN), None);
        assert_eq!(credit_capacity(2.4), Some(2));
        assert_eq!(credit_capacity(0.2), Some(1));
        assert_eq!(credit_capacity(1e9), Some(255));
    }
}
