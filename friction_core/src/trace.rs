// Copyright 2026 the Friction Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tracing and diagnostics for the enforcement engine.
//!
//! This module provides a [`TraceSink`] trait with per-event methods that the
//! managers call as they make decisions. All method bodies default to no-ops,
//! so implementing only the events you care about is fine.
//!
//! [`Tracer`] wraps an optional `&mut dyn TraceSink`. When the `trace` feature
//! is **off**, every `Tracer` method compiles to nothing (zero overhead). When
//! **on**, each method performs a single `Option` branch before dispatching.
//!
//! Faults (selector errors, detached nodes, observer attach failures) are
//! reported here instead of being raised: nothing in the engine may throw
//! into the host page.
//!
//! # Crate features
//!
//! - `trace`: enables the `Tracer` method bodies (one branch per call).
//! - `trace-rich` (implies `trace`): gates [`ShuffleEvent`] and the
//!   corresponding `TraceSink` method.

use crate::error::FrictionError;
use crate::mutation::ObserveFlags;
use crate::node::NodeId;

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// Which part of the engine emitted an event.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Component {
    /// The shared mutation multiplexer.
    Multiplexer,
    /// A selector-driven target marker.
    Marker,
    /// The text permutation engine.
    TextShuffle,
    /// The hover declutter resolver.
    Reveal,
    /// The seek-credit guard.
    SeekGuard,
    /// Grayscale/blur friction.
    Visual,
    /// The policy controller.
    Controller,
}

impl Component {
    /// Short lowercase label for log lines.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Multiplexer => "mux",
            Self::Marker => "marker",
            Self::TextShuffle => "shuffle",
            Self::Reveal => "reveal",
            Self::SeekGuard => "seek",
            Self::Visual => "visual",
            Self::Controller => "controller",
        }
    }
}

/// What happened to a manager.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ManagerAction {
    /// Applied from a removed state.
    Applied,
    /// Re-applied with a different configuration.
    Updated,
    /// Removed; the page is restored.
    Removed,
}

/// Why the reveal scope changed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ScopeCause {
    /// The pointer entered a new scope.
    PointerOver,
    /// The pointer left and re-resolution found a different scope.
    PointerOut,
    /// The pointer moved under a stationary cursor (scroll, resize).
    Reposition,
    /// A deferred or immediate clear fired.
    Cleared,
    /// The periodic sweep found the scope detached.
    Sweep,
    /// The resolver was disabled.
    Disabled,
}

/// How a seek was classified.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SeekDecision {
    /// Backward, small, or not user-initiated; baseline rebased for free.
    Free,
    /// A credit was spent.
    Granted,
    /// No credit or cooldown active; the jump is being reverted.
    Blocked,
    /// A seek during the revert window drifted and was snapped back.
    Resnapped,
    /// A seek during the revert window stayed within tolerance.
    Held,
}

/// Why a credit balance changed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CreditCause {
    /// Watch time earned a credit.
    Replenished,
    /// A new source was loaded into the element.
    SourceReset,
    /// A credit paid for a forward jump.
    Spent,
}

// ---------------------------------------------------------------------------
// Event structs
// ---------------------------------------------------------------------------

/// Emitted when a manager is applied, updated, or removed.
#[derive(Clone, Copy, Debug)]
pub struct ManagerEvent {
    /// Which manager.
    pub component: Component,
    /// What happened.
    pub action: ManagerAction,
}

/// Emitted when the shared observer is reconnected or disconnected.
#[derive(Clone, Copy, Debug)]
pub struct ObserverEvent {
    /// The merged flags now in effect.
    pub flags: ObserveFlags,
    /// `false` when the observer was disconnected.
    pub connected: bool,
}

/// Emitted once per flushed mutation batch.
#[derive(Clone, Copy, Debug)]
pub struct BatchEvent {
    /// Batch sequence number.
    pub seq: u64,
    /// Raw records collapsed into the batch.
    pub records: usize,
    /// Distinct added nodes.
    pub added: usize,
    /// Distinct text nodes.
    pub text: usize,
    /// Distinct attribute targets.
    pub attributes: usize,
    /// Subscribers the batch was delivered to.
    pub delivered: usize,
}

/// Emitted for every non-fatal failure.
#[derive(Clone, Copy, Debug)]
pub struct FaultEvent<'a> {
    /// Where it happened.
    pub component: Component,
    /// What went wrong.
    pub error: &'a FrictionError,
}

/// Emitted when the reveal scope changes.
#[derive(Clone, Copy, Debug)]
pub struct ScopeEvent {
    /// Scope before the change.
    pub previous: Option<NodeId>,
    /// Scope after the change.
    pub current: Option<NodeId>,
    /// Why.
    pub cause: ScopeCause,
}

/// Emitted for every classified seek.
#[derive(Clone, Copy, Debug)]
pub struct SeekDecisionEvent {
    /// The media element.
    pub media: NodeId,
    /// Baseline position, seconds.
    pub from: f64,
    /// Requested position, seconds.
    pub to: f64,
    /// Classification.
    pub decision: SeekDecision,
    /// Credits after the decision.
    pub credits: u8,
}

/// Emitted when a credit balance changes.
#[derive(Clone, Copy, Debug)]
pub struct CreditEvent {
    /// The media element.
    pub media: NodeId,
    /// Credits after the change.
    pub credits: u8,
    /// Why.
    pub cause: CreditCause,
}

/// A per-node shuffle record.
#[cfg(feature = "trace-rich")]
#[derive(Clone, Copy, Debug)]
pub struct ShuffleEvent {
    /// The text node.
    pub node: NodeId,
    /// Word tokens in the node.
    pub words: u32,
    /// Whether the permutation differs from the original.
    pub changed: bool,
}

// ---------------------------------------------------------------------------
// TraceSink trait
// ---------------------------------------------------------------------------

/// Receives trace events from the engine.
///
/// All methods have default no-op implementations, so you only need to
/// override the events you care about.
pub trait TraceSink {
    /// Called when a manager is applied, updated, or removed.
    fn on_manager(&mut self, e: &ManagerEvent) {
        _ = e;
    }

    /// Called when the shared observer changes state.
    fn on_observer(&mut self, e: &ObserverEvent) {
        _ = e;
    }

    /// Called once per flushed batch.
    fn on_batch(&mut self, e: &BatchEvent) {
        _ = e;
    }

    /// Called for every non-fatal failure.
    fn on_fault(&mut self, e: &FaultEvent<'_>) {
        _ = e;
    }

    /// Called when the reveal scope changes.
    fn on_scope(&mut self, e: &ScopeEvent) {
        _ = e;
    }

    /// Called for every classified seek.
    fn on_seek_decision(&mut self, e: &SeekDecisionEvent) {
        _ = e;
    }

    /// Called when a credit balance changes.
    fn on_credit(&mut self, e: &CreditEvent) {
        _ = e;
    }

    /// Called for every new shuffle record (requires `trace-rich` feature).
    #[cfg(feature = "trace-rich")]
    fn on_shuffle(&mut self, e: &ShuffleEvent) {
        _ = e;
    }
}

// ---------------------------------------------------------------------------
// NoopSink
// ---------------------------------------------------------------------------

/// A [`TraceSink`] that discards all events.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopSink;

impl TraceSink for NoopSink {}

// ---------------------------------------------------------------------------
// Tracer wrapper
// ---------------------------------------------------------------------------

/// Thin wrapper around an optional [`TraceSink`].
///
/// When the `trace` feature is **off**, every method compiles to nothing. When
/// **on**, each method checks the inner `Option` (one branch) before
/// dispatching to the sink.
pub struct Tracer<'a> {
    #[cfg(feature = "trace")]
    sink: Option<&'a mut dyn TraceSink>,
    #[cfg(not(feature = "trace"))]
    _marker: core::marker::PhantomData<&'a mut dyn TraceSink>,
}

impl core::fmt::Debug for Tracer<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Tracer").finish_non_exhaustive()
    }
}

impl<'a> Tracer<'a> {
    /// Creates a tracer that dispatches to the given sink.
    #[inline]
    #[must_use]
    pub fn new(sink: &'a mut dyn TraceSink) -> Self {
        #[cfg(feature = "trace")]
        {
            Self { sink: Some(sink) }
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = sink;
            Self {
                _marker: core::marker::PhantomData,
            }
        }
    }

    /// Creates a tracer that discards all events.
    #[inline]
    #[must_use]
    pub fn none() -> Self {
        #[cfg(feature = "trace")]
        {
            Self { sink: None }
        }
        #[cfg(not(feature = "trace"))]
        {
            Self {
                _marker: core::marker::PhantomData,
            }
        }
    }

    /// Emits a [`ManagerEvent`].
    #[inline]
    pub fn manager(&mut self, component: Component, action: ManagerAction) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_manager(&ManagerEvent { component, action });
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = (component, action);
        }
    }

    /// Emits an [`ObserverEvent`].
    #[inline]
    pub fn observer(&mut self, e: &ObserverEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_observer(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`BatchEvent`].
    #[inline]
    pub fn batch(&mut self, e: &BatchEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_batch(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`FaultEvent`].
    #[inline]
    pub fn fault(&mut self, component: Component, error: &FrictionError) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_fault(&FaultEvent { component, error });
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = (component, error);
        }
    }

    /// Emits a [`ScopeEvent`].
    #[inline]
    pub fn scope(&mut self, e: &ScopeEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_scope(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`SeekDecisionEvent`].
    #[inline]
    pub fn seek_decision(&mut self, e: &SeekDecisionEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_seek_decision(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`CreditEvent`].
    #[inline]
    pub fn credit(&mut self, e: &CreditEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_credit(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`ShuffleEvent`] (requires `trace-rich` feature).
    #[cfg(feature = "trace-rich")]
    #[inline]
    pub fn shuffle(&mut self, e: &ShuffleEvent) {
        if let Some(s) = &mut self.sink {
            s.on_shuffle(e);
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
