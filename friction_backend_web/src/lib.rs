// Copyright 2026 the Friction Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Browser backend for friction.
//!
//! This crate runs [`friction_core`] against the live document:
//!
//! - [`FrictionEngine`]: the `wasm-bindgen` entry point. It owns the
//!   controller, applies its effects, and feeds it native events.
//! - [`ConsoleSink`]: a trace sink writing to the browser console.
//!
//! Internally the page is reached through a node registry that hands out
//! generational [`NodeId`](friction_core::node::NodeId)s, one shared
//! `MutationObserver`, `setTimeout` timers, and a `requestAnimationFrame`
//! flush. The seek indicator is rendered in a closed shadow root.

#![no_std]

extern crate alloc;

mod applier;
mod console;
mod engine;
mod indicator;
mod listeners;
mod observer;
mod raf;
mod registry;
mod timers;
mod view;

pub use console::ConsoleSink;
pub use engine::FrictionEngine;

use friction_core::time::HostTime;

/// Returns the current host time from `performance.now()`.
#[must_use]
pub fn now() -> HostTime {
    HostTime::from_dom_timestamp(raf::performance_now())
}
