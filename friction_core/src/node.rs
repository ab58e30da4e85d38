// Copyright 2026 the Friction Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Node identity.

use core::fmt;

/// A handle to a node owned by a [`DomView`](crate::dom::DomView)
/// implementation.
///
/// Contains both a slot index and a generation counter so that a handle to a
/// node the backend has since released can be told apart from the node that
/// reuses its slot.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId {
    idx: u32,
    generation: u32,
}

impl NodeId {
    /// Creates a handle from a slot index and generation.
    ///
    /// Only [`DomView`](crate::dom::DomView) implementations mint handles;
    /// the engine treats them as opaque keys.
    #[inline]
    #[must_use]
    pub const fn new(idx: u32, generation: u32) -> Self {
        Self { idx, generation }
    }

    /// Returns the raw slot index.
    #[inline]
    #[must_use]
    pub const fn index(self) -> u32 {
        self.idx
    }

    /// Returns the generation counter.
    #[inline]
    #[must_use]
    pub const fn generation(self) -> u32 {
        self.generation
    }
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeId({}@gen{})", self.idx, self.generation)
    }
}

/// The coarse kind of a node, as far as the engine cares.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum NodeKind {
    /// An element.
    Element,
    /// A text node.
    Text,
    /// Anything else (comments, documents, fragments).
    Other,
}
