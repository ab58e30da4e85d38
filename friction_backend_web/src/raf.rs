// Copyright 2026 the Friction Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! `requestAnimationFrame` flush scheduling.
//!
//! [`FrameFlush`] turns `RequestFlush` effects into at most one pending
//! animation-frame callback. Each callback receives a
//! [`DOMHighResTimeStamp`][mdn] which is converted to a
//! [`HostTime`](friction_core::time::HostTime).
//!
//! [mdn]: https://developer.mozilla.org/en-US/docs/Web/API/DOMHighResTimeStamp

use alloc::boxed::Box;
use alloc::rc::Rc;
use core::cell::{Cell, RefCell};

use friction_core::time::HostTime;
use wasm_bindgen::closure::Closure;
use wasm_bindgen::prelude::*;

// Direct global bindings instead of `web_sys::Window` methods: no Window
// lookup (and no unwrap) on every frame.
#[wasm_bindgen]
extern "C" {
    #[wasm_bindgen(js_namespace = performance, js_name = "now")]
    pub(crate) fn performance_now() -> f64;

    #[wasm_bindgen(js_name = "requestAnimationFrame")]
    fn request_animation_frame(callback: &JsValue) -> i32;

    #[wasm_bindgen(js_name = "cancelAnimationFrame")]
    fn cancel_animation_frame(id: i32);
}

type RafClosure = Closure<dyn FnMut(f64)>;

/// Coalesces flush requests into one animation-frame callback.
pub(crate) struct FrameFlush {
    inner: Rc<FlushInner>,
}

struct FlushInner {
    /// The JS closure handed to `requestAnimationFrame`; created once.
    closure: RefCell<Option<RafClosure>>,
    /// Called with the frame time when the frame arrives.
    callback: RefCell<Box<dyn FnMut(HostTime)>>,
    /// Whether a frame is requested and has not fired.
    pending: Cell<bool>,
    raf_id: Cell<i32>,
    frames: Cell<u64>,
}

impl FrameFlush {
    /// Creates an idle scheduler; `callback` runs once per granted frame.
    pub(crate) fn new(callback: impl FnMut(HostTime) + 'static) -> Self {
        let inner = Rc::new(FlushInner {
            closure: RefCell::new(None),
            callback: RefCell::new(Box::new(callback)),
            pending: Cell::new(false),
            raf_id: Cell::new(0),
            frames: Cell::new(0),
        });
        let weak = Rc::downgrade(&inner);
        let closure = Closure::wrap(Box::new(move |timestamp_ms: f64| {
            let Some(inner) = weak.upgrade() else {
                return;
            };
            if !inner.pending.replace(false) {
                return;
            }
            inner.frames.set(inner.frames.get() + 1);
            // The callback may request another frame; `pending` is already
            // clear, so that request is honored.
            inner.callback.borrow_mut()(HostTime::from_dom_timestamp(timestamp_ms));
        }) as Box<dyn FnMut(f64)>);
        *inner.closure.borrow_mut() = Some(closure);
        Self { inner }
    }

    /// Requests a frame unless one is already pending.
    pub(crate) fn request(&self) {
        if self.inner.pending.replace(true) {
            return;
        }
        if let Some(ref closure) = *self.inner.closure.borrow() {
            let id = request_animation_frame(closure.as_ref().unchecked_ref());
            self.inner.raf_id.set(id);
        }
    }

    /// Cancels the pending frame, if any.
    pub(crate) fn cancel(&self) {
        if self.inner.pending.replace(false) {
            cancel_animation_frame(self.inner.raf_id.get());
        }
    }
}

impl Drop for FrameFlush {
    fn drop(&mut self) {
        self.cancel();
        // Drop the JS closure so it doesn't leak.
        self.inner.closure.borrow_mut().take();
    }
}

impl core::fmt::Debug for FrameFlush {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("FrameFlush")
            .field("pending", &self.inner.pending.get())
            .field("frames", &self.inner.frames.get())
            .finish_non_exhaustive()
    }
}
