// Copyright 2026 the Friction Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Trace sink writing to the browser console.

use alloc::format;
use alloc::string::String;

use friction_core::trace::{
    BatchEvent, CreditEvent, FaultEvent, ManagerEvent, ObserverEvent, ScopeEvent,
    SeekDecisionEvent, TraceSink,
};
use wasm_bindgen::JsValue;
use web_sys::console;

/// A [`TraceSink`] that logs to `console`.
///
/// Faults always go to `console.warn`. Other events are logged with
/// `console.debug` only when verbose.
#[derive(Clone, Copy, Debug, Default)]
pub struct ConsoleSink {
    verbose: bool,
}

impl ConsoleSink {
    /// Creates a sink; `verbose` enables non-fault events.
    #[must_use]
    pub fn new(verbose: bool) -> Self {
        Self { verbose }
    }

    /// Whether non-fault events are logged.
    #[must_use]
    pub fn is_verbose(&self) -> bool {
        self.verbose
    }

    /// Enables or disables non-fault events.
    pub fn set_verbose(&mut self, verbose: bool) {
        self.verbose = verbose;
    }

    fn debug(&self, line: impl FnOnce() -> String) {
        if self.verbose {
            console::debug_1(&JsValue::from_str(&line()));
        }
    }
}

impl TraceSink for ConsoleSink {
    fn on_manager(&mut self, e: &ManagerEvent) {
        self.debug(|| format!("[friction] {} {:?}", e.component.as_str(), e.action));
    }

    fn on_observer(&mut self, e: &ObserverEvent) {
        self.debug(|| format!("[friction] observer connected={} {:?}", e.connected, e.flags));
    }

    fn on_batch(&mut self, e: &BatchEvent) {
        self.debug(|| {
            format!(
                "[friction] batch #{} records={} added={} text={} delivered={}",
                e.seq, e.records, e.added, e.text, e.delivered
            )
        });
    }

    fn on_fault(&mut self, e: &FaultEvent<'_>) {
        console::warn_1(&JsValue::from_str(&format!(
            "[friction] {}: {}",
            e.component.as_str(),
            e.error
        )));
    }

    fn on_scope(&mut self, e: &ScopeEvent) {
        self.debug(|| {
            format!(
                "[friction] reveal {:?} -> {:?} ({:?})",
                e.previous, e.current, e.cause
            )
        });
    }

    fn on_seek_decision(&mut self, e: &SeekDecisionEvent) {
        self.debug(|| {
            format!(
                "[friction] seek {:?} {:.1}s -> {:.1}s {:?} credits={}",
                e.media, e.from, e.to, e.decision, e.credits
            )
        });
    }

    fn on_credit(&mut self, e: &CreditEvent) {
        self.debug(|| {
            format!(
                "[friction] credits {:?} = {} ({:?})",
                e.media, e.credits, e.cause
            )
        });
    }
}
