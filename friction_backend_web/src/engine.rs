// Copyright 2026 the Friction Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The page-side engine and its JavaScript surface.

use alloc::collections::VecDeque;
use alloc::rc::Rc;
use alloc::string::String;
use alloc::vec::Vec;
use core::cell::{Cell, RefCell};

use friction_core::controller::{Controller, EngineConfig, EngineEvent};
use friction_core::effect::{ListenerGroup, TimerId};
use friction_core::policy::Policy;
use friction_core::reveal::{PointerEvent, WindowEvent};
use friction_core::seek::{
    IndicatorEvent, MediaEvent, MediaEventKind, MediaSnapshot, fingerprint,
};
use friction_core::selectors::{SelectorProvider as _, StaticSelectorProvider};
use friction_core::time::HostTime;
use friction_core::trace::Tracer;
use kurbo::Point;
use wasm_bindgen::JsCast as _;
use wasm_bindgen::prelude::*;
use web_sys::{Element, Event, HtmlMediaElement, MouseEvent, Window};

use crate::applier;
use crate::console::ConsoleSink;
use crate::indicator::IndicatorWidget;
use crate::listeners::Listeners;
use crate::observer::{self, Observer};
use crate::raf::FrameFlush;
use crate::timers::Timers;
use crate::view::WebDom;

/// Registry size below which detached handles are never swept.
const SWEEP_FLOOR: usize = 4096;

/// Everything that calls back into the engine.
pub(crate) struct Host {
    pub(crate) timers: Timers,
    pub(crate) listeners: Listeners,
    pub(crate) observer: Observer,
    pub(crate) frame: FrameFlush,
    pub(crate) indicator: IndicatorWidget,
}

impl core::fmt::Debug for Host {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Host")
            .field("timers", &self.timers)
            .field("listeners", &self.listeners)
            .field("observer", &self.observer)
            .field("frame", &self.frame)
            .field("indicator", &self.indicator)
            .finish()
    }
}

#[derive(Debug)]
enum Command {
    Update(Policy),
    Stop,
    Event(EngineEvent),
}

struct Engine {
    window: Window,
    dom: WebDom,
    controller: RefCell<Controller>,
    sink: RefCell<ConsoleSink>,
    host: RefCell<Option<Host>>,
    queue: RefCell<VecDeque<Command>>,
    draining: Cell<bool>,
    sweep_at: Cell<usize>,
}

impl Engine {
    /// Queues `command` and, unless a drain is already running further up
    /// the stack, runs the queue to empty.
    fn submit(&self, command: Command) {
        self.queue.borrow_mut().push_back(command);
        if self.draining.replace(true) {
            return;
        }
        loop {
            let next = self.queue.borrow_mut().pop_front();
            let Some(command) = next else {
                break;
            };
            self.run(command);
        }
        self.draining.set(false);
    }

    fn run(&self, command: Command) {
        let now = crate::now();
        let is_flush = matches!(command, Command::Event(EngineEvent::Flush));
        let mut follow_up = Vec::new();
        {
            let mut sink = self.sink.borrow_mut();
            let mut tracer = Tracer::new(&mut *sink);
            // The controller borrow ends before any effect reaches the page.
            let effects = {
                let mut controller = self.controller.borrow_mut();
                match command {
                    Command::Update(policy) => {
                        controller.update(&policy, now, &self.dom, &mut tracer)
                    }
                    Command::Stop => controller.stop(now, &self.dom, &mut tracer),
                    Command::Event(event) => controller.handle(event, &self.dom, &mut tracer),
                }
            };
            if let Some(host) = self.host.borrow_mut().as_mut() {
                for effect in effects {
                    applier::apply(effect, &self.dom, host, &mut tracer, &mut follow_up);
                }
            }
        }
        self.queue
            .borrow_mut()
            .extend(follow_up.into_iter().map(Command::Event));
        if is_flush {
            self.maybe_sweep();
        }
    }

    fn maybe_sweep(&self) {
        if self.dom.registered() < self.sweep_at.get() {
            return;
        }
        self.dom.sweep();
        self.sweep_at
            .set(SWEEP_FLOOR.max(self.dom.registered().saturating_mul(2)));
    }

    /// Translates a native event from an installed listener group.
    fn on_native(&self, group: ListenerGroup, event: &Event) {
        let now = crate::now();
        let kind = event.type_();
        let translated = match group {
            ListenerGroup::HoverPointer => {
                pointer_event(&kind, event, now).map(EngineEvent::Pointer)
            }
            ListenerGroup::HoverWindow => window_event(&kind, || self.dom.document().hidden())
                .map(|event| EngineEvent::Window { event, now }),
            ListenerGroup::MediaEvents => {
                self.media_event(&kind, event, now).map(EngineEvent::Media)
            }
            ListenerGroup::InputGestures => {
                event.is_trusted().then_some(EngineEvent::Gesture { now })
            }
        };
        if let Some(event) = translated {
            self.submit(Command::Event(event));
        }
    }

    fn media_event(&self, kind: &str, event: &Event, now: HostTime) -> Option<MediaEvent> {
        let (kind, element) = if kind == "fullscreenchange" {
            (MediaEventKind::FullscreenEnter, self.fullscreen_media()?)
        } else {
            let element = event.target()?.dyn_into::<HtmlMediaElement>().ok()?;
            (media_kind(kind)?, element)
        };
        Some(MediaEvent {
            media: self.dom.id_of(&element),
            kind,
            snapshot: MediaSnapshot {
                current_time: element.current_time(),
                duration: element.duration(),
                paused: element.paused(),
                seeking: element.seeking(),
                source: fingerprint(&element.current_src()),
            },
            now,
        })
    }

    /// The media element that just went fullscreen, directly or inside a
    /// fullscreen player container.
    fn fullscreen_media(&self) -> Option<HtmlMediaElement> {
        let element: Element = self.dom.document().fullscreen_element()?;
        if let Some(media) = element.dyn_ref::<HtmlMediaElement>() {
            return Some(media.clone());
        }
        element
            .query_selector("video")
            .ok()
            .flatten()?
            .dyn_into::<HtmlMediaElement>()
            .ok()
    }

    /// Tears down everything installed on the page.
    fn shutdown(&self) {
        self.submit(Command::Stop);
        if let Some(mut host) = self.host.borrow_mut().take() {
            host.frame.cancel();
            host.timers.clear();
            host.listeners.clear();
            host.observer.disconnect();
            host.indicator.unmount();
        }
    }
}

fn pointer_event(kind: &str, event: &Event, now: HostTime) -> Option<PointerEvent> {
    let point = || {
        event
            .dyn_ref::<MouseEvent>()
            .map(|m| Point::new(f64::from(m.client_x()), f64::from(m.client_y())))
    };
    match kind {
        "pointerover" => Some(PointerEvent::Over {
            point: point()?,
            now,
        }),
        "pointerout" => Some(PointerEvent::Out {
            point: point()?,
            now,
        }),
        "pointercancel" => Some(PointerEvent::Cancel { now }),
        _ => None,
    }
}

fn window_event(kind: &str, hidden: impl FnOnce() -> bool) -> Option<WindowEvent> {
    match kind {
        "blur" => Some(WindowEvent::Blur),
        "scroll" => Some(WindowEvent::Scroll),
        "resize" => Some(WindowEvent::Resize),
        "visibilitychange" => hidden().then_some(WindowEvent::Hidden),
        _ => None,
    }
}

fn media_kind(kind: &str) -> Option<MediaEventKind> {
    match kind {
        "timeupdate" => Some(MediaEventKind::TimeUpdate),
        "seeking" => Some(MediaEventKind::Seeking),
        "loadedmetadata" => Some(MediaEventKind::LoadedMetadata),
        "play" => Some(MediaEventKind::Play),
        "pointerenter" => Some(MediaEventKind::PointerEnter),
        _ => None,
    }
}

/// Wraps `f` so it runs against the engine for as long as the engine lives.
fn forward<A: 'static>(
    engine: &Rc<Engine>,
    f: impl Fn(&Engine, A) + 'static,
) -> impl Fn(A) + 'static {
    let weak = Rc::downgrade(engine);
    move |arg| {
        if let Some(engine) = weak.upgrade() {
            f(&engine, arg);
        }
    }
}

fn install(engine: &Rc<Engine>) -> Result<Host, JsValue> {
    let document = engine.dom.document().clone();

    let timers = Timers::new(
        engine.window.clone(),
        forward(engine, |e, id: TimerId| {
            e.submit(Command::Event(EngineEvent::Timer {
                id,
                now: crate::now(),
            }));
        }),
    );

    let native = forward(engine, |e, (group, event): (ListenerGroup, Event)| {
        e.on_native(group, &event);
    });
    let listeners = Listeners::new(
        engine.window.clone(),
        document.clone(),
        move |group, event| native((group, event)),
    );

    let observer = Observer::new(
        document.clone(),
        forward(engine, |e, records: js_sys::Array| {
            let records = observer::convert(&records, &e.dom);
            if !records.is_empty() {
                e.submit(Command::Event(EngineEvent::Mutations(records)));
            }
        }),
    )?;

    let frame = FrameFlush::new(forward(engine, |e, _: HostTime| {
        e.submit(Command::Event(EngineEvent::Flush));
    }));

    let indicator = IndicatorWidget::new(
        document,
        forward(engine, |e, event: IndicatorEvent| {
            e.submit(Command::Event(EngineEvent::Indicator {
                event,
                now: crate::now(),
            }));
        }),
    );

    Ok(Host {
        timers,
        listeners,
        observer,
        frame,
        indicator,
    })
}

/// The friction engine for one page.
///
/// Create one per document, then push policy snapshots with
/// [`update`](Self::update). Dropping (or `free()` from JavaScript) stops
/// every manager and restores the page.
#[wasm_bindgen]
pub struct FrictionEngine {
    engine: Rc<Engine>,
}

impl core::fmt::Debug for FrictionEngine {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("FrictionEngine")
            .field("dom", &self.engine.dom)
            .field("host", &self.engine.host)
            .finish_non_exhaustive()
    }
}

#[wasm_bindgen]
impl FrictionEngine {
    /// Creates an engine for the current document.
    ///
    /// `hostname` picks the site's selector overrides and defaults to
    /// `location.hostname`. `config` is an optional engine configuration
    /// object; missing means the standard preset.
    #[wasm_bindgen(constructor)]
    pub fn new(hostname: Option<String>, config: JsValue) -> Result<FrictionEngine, JsValue> {
        let window = web_sys::window().ok_or_else(|| JsValue::from_str("no window"))?;
        let document = window
            .document()
            .ok_or_else(|| JsValue::from_str("no document"))?;
        let hostname = match hostname {
            Some(hostname) => hostname,
            None => window.location().hostname()?,
        };
        let config = if config.is_undefined() || config.is_null() {
            EngineConfig::standard()
        } else {
            serde_wasm_bindgen::from_value(config)?
        };
        let bundle = StaticSelectorProvider::standard().bundle(&hostname);

        let engine = Rc::new(Engine {
            window,
            dom: WebDom::new(document),
            controller: RefCell::new(Controller::new(config, bundle)),
            sink: RefCell::new(ConsoleSink::new(false)),
            host: RefCell::new(None),
            queue: RefCell::new(VecDeque::new()),
            draining: Cell::new(false),
            sweep_at: Cell::new(SWEEP_FLOOR),
        });
        let host = install(&engine)?;
        *engine.host.borrow_mut() = Some(host);
        Ok(Self { engine })
    }

    /// Applies a policy snapshot (`{ isBlocked, filters }`).
    pub fn update(&self, policy: JsValue) -> Result<(), JsValue> {
        let policy: Policy = serde_wasm_bindgen::from_value(policy)?;
        self.engine.submit(Command::Update(policy));
        Ok(())
    }

    /// Removes every active manager and restores the page.
    ///
    /// The engine stays usable; the next [`update`](Self::update) re-applies.
    pub fn stop(&self) {
        self.engine.submit(Command::Stop);
        // A stop issued from inside a drain leaves the widget to the queued
        // `HideIndicator`.
        if let Ok(mut host) = self.engine.host.try_borrow_mut()
            && let Some(host) = host.as_mut()
        {
            host.indicator.unmount();
        }
    }

    /// Logs every trace event, not only faults, to the console.
    #[wasm_bindgen(js_name = setVerbose)]
    pub fn set_verbose(&self, verbose: bool) {
        if let Ok(mut sink) = self.engine.sink.try_borrow_mut() {
            sink.set_verbose(verbose);
        }
    }

    /// How many nodes currently hold a handle.
    #[wasm_bindgen(js_name = registeredNodes)]
    pub fn registered_nodes(&self) -> usize {
        self.engine.dom.registered()
    }
}

impl Drop for FrictionEngine {
    fn drop(&mut self) {
        self.engine.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn media_event_names_map_to_kinds() {
        assert_eq!(media_kind("seeking"), Some(MediaEventKind::Seeking));
        assert_eq!(media_kind("timeupdate"), Some(MediaEventKind::TimeUpdate));
        assert_eq!(media_kind("pointerenter"), Some(MediaEventKind::PointerEnter));
        assert_eq!(media_kind("pause"), None);
    }

    #[test]
    fn visibility_change_only_counts_when_hidden() {
        assert_eq!(window_event("visibilitychange", || true), Some(WindowEvent::Hidden));
        assert_eq!(window_event("visibilitychange", || false), None);
        assert_eq!(window_event("scroll", || unreachable!()), Some(WindowEvent::Scroll));
        assert_eq!(window_event("focus", || false), None);
    }
}
