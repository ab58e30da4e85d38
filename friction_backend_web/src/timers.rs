// Copyright 2026 the Friction Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! `setTimeout`-backed engine timers.

use alloc::boxed::Box;
use alloc::collections::BTreeMap;
use alloc::rc::Rc;

use friction_core::effect::TimerId;
use friction_core::time::Duration;
use wasm_bindgen::JsValue;
use wasm_bindgen::closure::Closure;
use wasm_bindgen::JsCast as _;
use web_sys::Window;

struct Armed {
    handle: i32,
    // Kept alive until the timer fires or is replaced.
    _closure: Closure<dyn FnMut()>,
}

/// One pending `setTimeout` per [`TimerId`].
///
/// Arming a pending timer replaces it.
pub(crate) struct Timers {
    window: Window,
    on_fire: Rc<dyn Fn(TimerId)>,
    armed: BTreeMap<TimerId, Armed>,
}

impl core::fmt::Debug for Timers {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Timers")
            .field("armed", &self.armed.keys().collect::<alloc::vec::Vec<_>>())
            .finish_non_exhaustive()
    }
}

impl Timers {
    pub(crate) fn new(window: Window, on_fire: impl Fn(TimerId) + 'static) -> Self {
        Self {
            window,
            on_fire: Rc::new(on_fire),
            armed: BTreeMap::new(),
        }
    }

    /// Arms `timer` to fire after `delay`.
    pub(crate) fn start(&mut self, timer: TimerId, delay: Duration) -> Result<(), JsValue> {
        self.cancel(timer);
        let on_fire = Rc::clone(&self.on_fire);
        let closure = Closure::wrap(Box::new(move || on_fire(timer)) as Box<dyn FnMut()>);
        let ms = i32::try_from(delay.millis()).unwrap_or(i32::MAX);
        let handle = self
            .window
            .set_timeout_with_callback_and_timeout_and_arguments_0(
                closure.as_ref().unchecked_ref(),
                ms,
            )?;
        self.armed.insert(
            timer,
            Armed {
                handle,
                _closure: closure,
            },
        );
        Ok(())
    }

    /// Cancels `timer` if pending.
    pub(crate) fn cancel(&mut self, timer: TimerId) {
        if let Some(armed) = self.armed.remove(&timer) {
            self.window.clear_timeout_with_handle(armed.handle);
        }
    }

    /// Cancels everything.
    pub(crate) fn clear(&mut self) {
        while let Some((_, armed)) = self.armed.pop_first() {
            self.window.clear_timeout_with_handle(armed.handle);
        }
    }
}
