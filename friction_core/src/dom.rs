// Copyright 2026 the Friction Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Read-only access to the page, and the backend contract.
//!
//! Friction splits page access into two halves:
//!
//! - **Reads** go through [`DomView`]. Managers query the document (selector
//!   matches, text content, element stacks under the pointer) through this
//!   trait and never hold live nodes, only [`NodeId`] handles.
//!
//! - **Writes** are never performed by the core. Every manager transition
//!   returns an [`EffectSet`](crate::effect::EffectSet) which a backend
//!   applies to the real document.
//!
//! # Crate boundaries
//!
//! `friction_core` owns the data model, the managers, and this contract.
//! `friction_backend_web` implements [`DomView`] over `web-sys` and applies
//! effect sets; [`HeadlessDom`](crate::headless::HeadlessDom) implements it
//! in memory for tests.
//!
//! # Shadow DOM
//!
//! Ancestor walks that must cross shadow boundaries use [`composed_parent`]:
//! the parent element when there is one, otherwise the host of the shadow
//! root that contains the node.

use alloc::string::String;
use alloc::vec::Vec;

use kurbo::Point;

use crate::error::SelectorError;
use crate::node::{NodeId, NodeKind};

/// Read-only queries the engine needs from a document.
pub trait DomView {
    /// The document element, if the document has one.
    fn root(&self) -> Option<NodeId>;

    /// The kind of `node`.
    fn kind(&self, node: NodeId) -> NodeKind;

    /// Whether `node` is still attached to the document (through any number
    /// of shadow roots).
    fn is_connected(&self, node: NodeId) -> bool;

    /// The parent element of `node`, or `None` at a document or shadow root.
    fn parent_element(&self, node: NodeId) -> Option<NodeId>;

    /// The host element when `node`'s parent is a shadow root.
    fn shadow_host(&self, node: NodeId) -> Option<NodeId>;

    /// Whether `element` matches `selector`.
    fn matches(&self, element: NodeId, selector: &str) -> Result<bool, SelectorError>;

    /// All descendant elements of `scope` matching `selector`, in document
    /// order. `scope` itself is not included.
    fn query_all(&self, scope: NodeId, selector: &str) -> Result<Vec<NodeId>, SelectorError>;

    /// The value of attribute `name` on `element`.
    fn attribute(&self, element: NodeId, name: &str) -> Option<String>;

    /// Every connected element carrying attribute `name`, including those
    /// inside shadow roots.
    fn marked(&self, name: &str) -> Vec<NodeId>;

    /// The character data of a text node.
    fn text(&self, node: NodeId) -> Option<String>;

    /// Every text node at or below `scope`, in document order.
    fn text_nodes(&self, scope: NodeId) -> Vec<NodeId>;

    /// Whether `element` is editable by the user.
    fn is_content_editable(&self, element: NodeId) -> bool;

    /// The element stack under `point`, topmost first, descending into open
    /// shadow roots.
    fn elements_from_point(&self, point: Point) -> Vec<NodeId>;
}

/// Returns the parent of `node` in the composed (shadow-including) tree.
#[must_use]
pub fn composed_parent(dom: &(impl DomView + ?Sized), node: NodeId) -> Option<NodeId> {
    dom.parent_element(node).or_else(|| dom.shadow_host(node))
}

/// Returns `node` if it is an element, otherwise its parent element.
#[must_use]
pub fn nearest_element(dom: &(impl DomView + ?Sized), node: NodeId) -> Option<NodeId> {
    match dom.kind(node) {
        NodeKind::Element => Some(node),
        _ => dom.parent_element(node),
    }
}

/// Walks from `element` up the composed tree and returns the first element
/// matching `selector`.
pub fn closest_composed(
    dom: &(impl DomView + ?Sized),
    element: NodeId,
    selector: &str,
) -> Result<Option<NodeId>, SelectorError> {
    let mut cursor = Some(element);
    while let Some(el) = cursor {
        if dom.matches(el, selector)? {
            return Ok(Some(el));
        }
        cursor = composed_parent(dom, el);
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::headless::HeadlessDom;

    #[test]
    fn composed_parent_crosses_shadow_root() {
        let mut dom = HeadlessDom::new();
        let root = dom.root_element();
        let host = dom.append_element(root, "x-card");
        let shadow = dom.attach_shadow(host);
        let inner = dom.append_element(shadow, "img");

        assert_eq!(dom.parent_element(inner), None);
        assert_eq!(composed_parent(&dom, inner), Some(host));
        assert_eq!(composed_parent(&dom, host), Some(root));
    }

    #[test]
    fn closest_composed_finds_host_match() {
        let mut dom = HeadlessDom::new();
        let root = dom.root_element();
        let host = dom.append_element(root, "x-card");
        dom.set_attr(host, "class", "tile");
        let shadow = dom.attach_shadow(host);
        let inner = dom.append_element(shadow, "span");

        assert_eq!(closest_composed(&dom, inner, ".tile"), Ok(Some(host)));
        assert_eq!(closest_composed(&dom, inner, ".missing"), Ok(None));
        assert!(closest_composed(&dom, inner, "[").is_err());
    }

    #[test]
    fn nearest_element_of_text_is_parent() {
        let mut dom = HeadlessDom::new();
        let root = dom.root_element();
        let p = dom.append_element(root, "p");
        let text = dom.append_text(p, "hello");
        assert_eq!(nearest_element(&dom, text), Some(p));
        assert_eq!(nearest_element(&dom, p), Some(p));
    }
}
