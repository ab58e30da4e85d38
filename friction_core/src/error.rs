// Copyright 2026 the Friction Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Error types.
//!
//! Nothing in the engine is fatal. Errors are returned so callers can skip
//! the failing candidate and report the fault to a
//! [`Tracer`](crate::trace::Tracer); they never reach page scripts.

use alloc::string::String;

use crate::node::NodeId;

/// A CSS selector the page's engine rejected (or the headless matcher could
/// not parse).
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("invalid selector `{selector}`")]
pub struct SelectorError {
    /// The offending selector text.
    pub selector: String,
}

impl SelectorError {
    /// Creates an error for the given selector text.
    #[must_use]
    pub fn new(selector: &str) -> Self {
        Self {
            selector: selector.into(),
        }
    }
}

/// Every failure the engine can observe.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum FrictionError {
    /// A selector could not be matched; that candidate is skipped.
    #[error(transparent)]
    Selector(#[from] SelectorError),
    /// The node was removed from the document before the engine touched it.
    #[error("node {0:?} is no longer connected")]
    Detached(NodeId),
    /// The shared observer could not attach; newly inserted nodes go
    /// untagged until the next reconnect.
    #[error("mutation observer could not attach: {reason}")]
    ObserverAttach {
        /// Host-provided description.
        reason: String,
    },
    /// A host call (a DOM write, timer, or listener registration) threw.
    #[error("host call failed: {reason}")]
    Host {
        /// Host-provided description.
        reason: String,
    },
}

#[cfg(test)]
mod tests {
    use alloc::string::ToString as _;

    use super::*;

    #[test]
    fn selector_error_is_transparent() {
        let err: FrictionError = SelectorError::new("div[").into();
        assert_eq!(err.to_string(), "invalid selector `div[`");
    }

    #[test]
    fn detached_names_the_node() {
        let err = FrictionError::Detached(NodeId::new(3, 1));
        assert_eq!(err.to_string(), "node NodeId(3@gen1) is no longer connected");
    }
}
