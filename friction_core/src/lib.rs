// Copyright 2026 the Friction Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Reactive enforcement engine for page-level friction.
//!
//! `friction_core` holds the algorithms that impose visual, textual, temporal,
//! and interaction resistance on a page the engine does not own. It is
//! `no_std` compatible (with `alloc`) and never touches a live DOM: every
//! manager reads the page through the [`DomView`](dom::DomView) trait and
//! answers with an [`EffectSet`](effect::EffectSet) describing the writes a
//! backend should perform.
//!
//! # Architecture
//!
//! ```text
//!   Policy ──► Controller::update() ──► manager apply()/remove()
//!                                              │
//!   Backend events ──► Controller::handle() ───┤
//!     (pointer, media, timers, records)        ▼
//!                                          EffectSet ──► Backend applier
//!                                              │
//!   MutationRecord ──► MutationMultiplexer ────┘ (one batch per frame)
//! ```
//!
//! **[`mutation`]**: The single shared observer registry. Managers subscribe
//! with the flags they want; the merged flags drive one observer.
//!
//! **[`marker`]**: Selector-driven attribute tagging of current and newly
//! inserted matches.
//!
//! **[`shuffle`]**: Seeded, reversible word-order permutation of live text
//! nodes.
//!
//! **[`reveal`]**: Pointer-driven reveal scope resolution across shadow
//! boundaries, with at most one marked element.
//!
//! **[`seek`]**: Per-media seek-credit ledger with jump classification,
//! cooldowns, revert-on-violation, and the floating indicator model.
//!
//! **[`visual`]**: Grayscale/blur friction through CSS variables and target
//! markers.
//!
//! **[`controller`]**: Turns a [`Policy`](policy::Policy) snapshot into
//! idempotent apply/remove calls and routes events to managers.
//!
//! **[`headless`]**: An in-memory [`DomView`](dom::DomView) with an effect
//! applier, for tests and harnesses.
//!
//! **[`trace`]**: [`TraceSink`](trace::TraceSink) trait and event types,
//! with a zero-overhead [`Tracer`](trace::Tracer) wrapper.
//!
//! # Crate features
//!
//! - `std` (disabled by default): Enables `std` support in dependencies.
//! - `serde` (disabled by default): Derives `serde` traits for policy,
//!   selector, and configuration types.
//! - `trace` (disabled by default): Enables `Tracer` method bodies (one branch
//!   per call site).
//! - `trace-rich` (disabled by default, implies `trace`): Gates per-node
//!   shuffle events.

#![no_std]
#![cfg_attr(docsrs, feature(doc_auto_cfg))]

extern crate alloc;

pub mod controller;
pub mod dom;
pub mod effect;
pub mod error;
pub mod headless;
pub mod marker;
pub mod mutation;
pub mod node;
pub mod policy;
pub mod reveal;
pub mod seek;
pub mod selectors;
pub mod shuffle;
pub mod time;
pub mod trace;
pub mod visual;

/// Attribute names written by the engine.
///
/// Every attribute the engine sets is one of these constants, so a backend
/// (or a stylesheet) can rely on the full set.
pub mod attr {
    /// Root flag set while visual friction is active.
    pub const VISUAL_ROOT: &str = "data-friction-visual";
    /// Elements matched by the site's visual target selectors.
    pub const VISUAL_TARGET: &str = "data-friction-visual-target";
    /// Elements matched by the site's text visual target selectors.
    pub const TEXT_TARGET: &str = "data-friction-text-target";
    /// Elements matched by the site's interactive target selectors.
    pub const INTERACTIVE: &str = "data-friction-interactive";
    /// Elements exempt from overlay effects.
    pub const EXEMPT: &str = "data-friction-exempt";
    /// The single element currently revealed under the pointer.
    pub const REVEAL: &str = "data-friction-reveal";
}
