// Copyright 2026 the Friction Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Live node registry.
//!
//! Maps `web_sys::Node` objects to [`NodeId`] handles and back. Slots are
//! recycled through a free list; each reuse bumps the slot generation so a
//! handle to a released node never resolves to its successor. The reverse
//! lookup lives in a JS `WeakMap` keyed by the node object, so the registry
//! does not keep page nodes alive through the map.

use alloc::vec::Vec;

use friction_core::node::NodeId;
use js_sys::{Object, WeakMap};
use wasm_bindgen::JsValue;
use web_sys::Node;

struct Slot {
    generation: u32,
    node: Option<Node>,
}

/// Slot arena of live nodes.
pub(crate) struct NodeRegistry {
    slots: Vec<Slot>,
    free: Vec<u32>,
    index: WeakMap,
    live: usize,
}

impl core::fmt::Debug for NodeRegistry {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("NodeRegistry")
            .field("slots", &self.slots.len())
            .field("free", &self.free.len())
            .field("live", &self.live)
            .finish_non_exhaustive()
    }
}

impl NodeRegistry {
    pub(crate) fn new() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            index: WeakMap::new(),
            live: 0,
        }
    }

    /// Number of registered nodes.
    pub(crate) fn len(&self) -> usize {
        self.live
    }

    /// The handle of `node`, registering it on first sight.
    pub(crate) fn id_of(&mut self, node: &Node) -> NodeId {
        if let Some(id) = self.lookup(node) {
            return id;
        }
        let (idx, generation) = if let Some(idx) = self.free.pop() {
            let slot = &mut self.slots[idx as usize];
            slot.generation = slot.generation.wrapping_add(1);
            slot.node = Some(node.clone());
            (idx, slot.generation)
        } else {
            #[expect(
                clippy::cast_possible_truncation,
                reason = "a page never holds u32::MAX registered nodes"
            )]
            let idx = self.slots.len() as u32;
            self.slots.push(Slot {
                generation: 0,
                node: Some(node.clone()),
            });
            (idx, 0)
        };
        self.index.set(key(node), &JsValue::from(idx));
        self.live += 1;
        NodeId::new(idx, generation)
    }

    /// The handle of `node` if it is registered.
    pub(crate) fn lookup(&self, node: &Node) -> Option<NodeId> {
        let idx = self.index.get(key(node)).as_f64()?;
        #[expect(
            clippy::cast_possible_truncation,
            clippy::cast_sign_loss,
            reason = "the map only stores slot indices written by `id_of`"
        )]
        let idx = idx as u32;
        let slot = self.slots.get(idx as usize)?;
        slot.node.as_ref()?;
        Some(NodeId::new(idx, slot.generation))
    }

    /// The node behind `id`; `None` once the handle is stale.
    pub(crate) fn node(&self, id: NodeId) -> Option<&Node> {
        let slot = self.slots.get(id.index() as usize)?;
        if slot.generation != id.generation() {
            return None;
        }
        slot.node.as_ref()
    }

    /// Releases every slot whose node left the document.
    ///
    /// Returns the number of released slots.
    pub(crate) fn sweep(&mut self) -> usize {
        let mut released = 0;
        for (idx, slot) in self.slots.iter_mut().enumerate() {
            let Some(node) = slot.node.as_ref() else {
                continue;
            };
            if node.is_connected() {
                continue;
            }
            self.index.delete(key(node));
            slot.node = None;
            #[expect(
                clippy::cast_possible_truncation,
                reason = "slot indices were minted as u32"
            )]
            let idx = idx as u32;
            self.free.push(idx);
            released += 1;
        }
        self.live -= released;
        released
    }
}

fn key(node: &Node) -> &Object {
    node.as_ref()
}
