// Copyright 2026 the Friction Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Native event listener groups.

use alloc::boxed::Box;
use alloc::collections::BTreeMap;
use alloc::rc::Rc;
use alloc::vec::Vec;

use friction_core::effect::ListenerGroup;
use wasm_bindgen::JsCast as _;
use wasm_bindgen::JsValue;
use wasm_bindgen::closure::Closure;
use web_sys::{AddEventListenerOptions, Document, Event, EventTarget, Window};

#[derive(Clone, Copy, Debug)]
enum On {
    Window,
    Document,
}

/// `(target, event type, capture)` for every listener of a group.
///
/// Gestures include releases: dragging a seek bar commits on pointer up,
/// which can be long after the press.
///
/// Media events do not bubble; capturing on the document sees them for every
/// media element, including ones inserted later.
fn plan(group: ListenerGroup) -> &'static [(On, &'static str, bool)] {
    match group {
        ListenerGroup::HoverPointer => &[
            (On::Document, "pointerover", true),
            (On::Document, "pointerout", true),
            (On::Document, "pointercancel", true),
        ],
        ListenerGroup::HoverWindow => &[
            (On::Window, "blur", false),
            (On::Window, "resize", false),
            (On::Window, "scroll", true),
            (On::Document, "visibilitychange", false),
        ],
        ListenerGroup::MediaEvents => &[
            (On::Document, "timeupdate", true),
            (On::Document, "seeking", true),
            (On::Document, "loadedmetadata", true),
            (On::Document, "play", true),
            (On::Document, "pointerenter", true),
            (On::Document, "fullscreenchange", false),
        ],
        ListenerGroup::InputGestures => &[
            (On::Window, "pointerdown", true),
            (On::Window, "pointerup", true),
            (On::Window, "mouseup", true),
            (On::Window, "touchstart", true),
            (On::Window, "touchend", true),
            (On::Window, "keydown", true),
        ],
    }
}

struct Registration {
    target: EventTarget,
    kind: &'static str,
    capture: bool,
    closure: Closure<dyn FnMut(Event)>,
}

/// Installed listener groups.
///
/// Every listener is passive; the engine never cancels page events.
pub(crate) struct Listeners {
    window: Window,
    document: Document,
    on_event: Rc<dyn Fn(ListenerGroup, Event)>,
    installed: BTreeMap<ListenerGroup, Vec<Registration>>,
}

impl core::fmt::Debug for Listeners {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Listeners")
            .field("installed", &self.installed.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

impl Listeners {
    pub(crate) fn new(
        window: Window,
        document: Document,
        on_event: impl Fn(ListenerGroup, Event) + 'static,
    ) -> Self {
        Self {
            window,
            document,
            on_event: Rc::new(on_event),
            installed: BTreeMap::new(),
        }
    }

    /// Installs `group` unless it is installed.
    pub(crate) fn listen(&mut self, group: ListenerGroup) -> Result<(), JsValue> {
        if self.installed.contains_key(&group) {
            return Ok(());
        }
        let mut registrations = Vec::new();
        for &(on, kind, capture) in plan(group) {
            let target: EventTarget = match on {
                On::Window => self.window.clone().unchecked_into(),
                On::Document => self.document.clone().unchecked_into(),
            };
            let on_event = Rc::clone(&self.on_event);
            let closure = Closure::wrap(
                Box::new(move |event: Event| on_event(group, event)) as Box<dyn FnMut(Event)>
            );
            let options = AddEventListenerOptions::new();
            options.set_capture(capture);
            options.set_passive(true);
            let result = target.add_event_listener_with_callback_and_add_event_listener_options(
                kind,
                closure.as_ref().unchecked_ref(),
                &options,
            );
            registrations.push(Registration {
                target,
                kind,
                capture,
                closure,
            });
            if let Err(err) = result {
                remove_all(registrations);
                return Err(err);
            }
        }
        self.installed.insert(group, registrations);
        Ok(())
    }

    /// Removes `group` if installed.
    pub(crate) fn unlisten(&mut self, group: ListenerGroup) {
        if let Some(registrations) = self.installed.remove(&group) {
            remove_all(registrations);
        }
    }

    /// Removes every group.
    pub(crate) fn clear(&mut self) {
        while let Some((_, registrations)) = self.installed.pop_first() {
            remove_all(registrations);
        }
    }
}

fn remove_all(registrations: Vec<Registration>) {
    for r in registrations {
        let _ = r.target.remove_event_listener_with_callback_and_bool(
            r.kind,
            r.closure.as_ref().unchecked_ref(),
            r.capture,
        );
    }
}
