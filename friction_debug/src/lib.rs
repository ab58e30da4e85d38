// Copyright 2026 the Friction Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Recording and pretty-printing for friction diagnostics.
//!
//! This crate provides [`TraceSink`](friction_core::trace::TraceSink)
//! implementations for development and post-mortem analysis:
//!
//! - [`pretty::PrettyPrintSink`]: human-readable one-line-per-event output.
//! - [`recorder::RecorderSink`]: keeps owned copies of every event and
//!   exports them as JSON lines.

pub mod pretty;
pub mod recorder;

use friction_core::node::NodeId;

/// Compact `index:generation` label for a node handle.
pub(crate) fn node_label(id: NodeId) -> String {
    format!("{}:{}", id.index(), id.generation())
}
