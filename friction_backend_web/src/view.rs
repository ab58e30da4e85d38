// Copyright 2026 the Friction Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! [`DomView`] over the live document.

use alloc::format;
use alloc::string::String;
use alloc::vec::Vec;
use core::cell::RefCell;

use friction_core::dom::DomView;
use friction_core::error::SelectorError;
use friction_core::node::{NodeId, NodeKind};
use js_sys::Array;
use kurbo::Point;
use wasm_bindgen::JsCast as _;
use web_sys::{
    CharacterData, Document, DocumentFragment, Element, HtmlElement, Node, NodeList, ShadowRoot,
};

use crate::registry::NodeRegistry;

/// `NodeFilter.SHOW_TEXT`.
const SHOW_TEXT: u32 = 0x4;

/// How many nested open shadow roots `elements_from_point` descends into.
const MAX_SHADOW_DEPTH: usize = 8;

/// Open shadow hosts the engine has reached, oldest first.
///
/// Marks are only ever written inside shadow roots reached through a
/// host seen here, so [`DomView::marked`] searches these roots instead of
/// scanning every element of the page for a shadow root.
#[derive(Debug, Default)]
struct ShadowHosts {
    hosts: Vec<NodeId>,
}

impl ShadowHosts {
    /// Remembered hosts; the oldest is forgotten past this.
    const CAPACITY: usize = 256;

    fn remember(&mut self, host: NodeId) {
        if self.hosts.contains(&host) {
            return;
        }
        if self.hosts.len() == Self::CAPACITY {
            self.hosts.remove(0);
        }
        self.hosts.push(host);
    }

    fn forget(&mut self, gone: &[NodeId]) {
        self.hosts.retain(|h| !gone.contains(h));
    }

    fn snapshot(&self) -> Vec<NodeId> {
        self.hosts.clone()
    }

    fn len(&self) -> usize {
        self.hosts.len()
    }
}

/// The live document seen through [`NodeId`] handles.
///
/// Queries register every node they return, so the registry sits behind a
/// `RefCell`; no borrow outlives a single call.
pub(crate) struct WebDom {
    document: Document,
    registry: RefCell<NodeRegistry>,
    shadow_hosts: RefCell<ShadowHosts>,
}

impl core::fmt::Debug for WebDom {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("WebDom")
            .field("registry", &self.registry)
            .field("shadow_hosts", &self.shadow_hosts.borrow().len())
            .finish_non_exhaustive()
    }
}

impl WebDom {
    pub(crate) fn new(document: Document) -> Self {
        Self {
            document,
            registry: RefCell::new(NodeRegistry::new()),
            shadow_hosts: RefCell::new(ShadowHosts::default()),
        }
    }

    pub(crate) fn document(&self) -> &Document {
        &self.document
    }

    /// Registers `node` and returns its handle.
    pub(crate) fn id_of(&self, node: &Node) -> NodeId {
        self.registry.borrow_mut().id_of(node)
    }

    /// The live node behind `id`.
    pub(crate) fn node(&self, id: NodeId) -> Option<Node> {
        self.registry.borrow().node(id).cloned()
    }

    /// The live element behind `id`.
    pub(crate) fn element(&self, id: NodeId) -> Option<Element> {
        self.node(id).and_then(|n| n.dyn_into::<Element>().ok())
    }

    pub(crate) fn registered(&self) -> usize {
        self.registry.borrow().len()
    }

    /// Releases handles of detached nodes.
    pub(crate) fn sweep(&self) -> usize {
        self.registry.borrow_mut().sweep()
    }

    fn collect(&self, list: &NodeList, out: &mut Vec<NodeId>) {
        for i in 0..list.length() {
            if let Some(node) = list.get(i) {
                out.push(self.id_of(&node));
            }
        }
    }

    fn collect_array(&self, array: &Array, out: &mut Vec<NodeId>) {
        for value in array.iter() {
            if let Ok(node) = value.dyn_into::<Node>() {
                let id = self.id_of(&node);
                if !out.contains(&id) {
                    out.push(id);
                }
            }
        }
    }

    /// Registers `host` and remembers it as a shadow host.
    fn remember_host(&self, host: &Element) -> NodeId {
        let id = self.id_of(host);
        self.shadow_hosts.borrow_mut().remember(id);
        id
    }
}

fn query(scope: &Node, selector: &str) -> Result<NodeList, SelectorError> {
    let result = if let Some(el) = scope.dyn_ref::<Element>() {
        el.query_selector_all(selector)
    } else if let Some(frag) = scope.dyn_ref::<DocumentFragment>() {
        frag.query_selector_all(selector)
    } else if let Some(doc) = scope.dyn_ref::<Document>() {
        doc.query_selector_all(selector)
    } else {
        return Err(SelectorError::new(selector));
    };
    result.map_err(|_| SelectorError::new(selector))
}

impl DomView for WebDom {
    fn root(&self) -> Option<NodeId> {
        let root = self.document.document_element()?;
        Some(self.id_of(&root))
    }

    fn kind(&self, node: NodeId) -> NodeKind {
        match self.node(node).map(|n| n.node_type()) {
            Some(Node::ELEMENT_NODE) => NodeKind::Element,
            Some(Node::TEXT_NODE) => NodeKind::Text,
            _ => NodeKind::Other,
        }
    }

    fn is_connected(&self, node: NodeId) -> bool {
        self.node(node).is_some_and(|n| n.is_connected())
    }

    fn parent_element(&self, node: NodeId) -> Option<NodeId> {
        let parent = self.node(node)?.parent_element()?;
        Some(self.id_of(&parent))
    }

    fn shadow_host(&self, node: NodeId) -> Option<NodeId> {
        let parent = self.node(node)?.parent_node()?;
        let host = parent.dyn_ref::<ShadowRoot>()?.host();
        Some(self.remember_host(&host))
    }

    fn matches(&self, element: NodeId, selector: &str) -> Result<bool, SelectorError> {
        match self.element(element) {
            Some(el) => el
                .matches(selector)
                .map_err(|_| SelectorError::new(selector)),
            None => Ok(false),
        }
    }

    fn query_all(&self, scope: NodeId, selector: &str) -> Result<Vec<NodeId>, SelectorError> {
        let Some(scope) = self.node(scope) else {
            return Ok(Vec::new());
        };
        let list = query(&scope, selector)?;
        let mut out = Vec::new();
        self.collect(&list, &mut out);
        Ok(out)
    }

    fn attribute(&self, element: NodeId, name: &str) -> Option<String> {
        self.element(element)?.get_attribute(name)
    }

    fn marked(&self, name: &str) -> Vec<NodeId> {
        let selector = format!("[{name}]");
        let mut out = Vec::new();
        if let Ok(list) = query(&self.document, &selector) {
            self.collect(&list, &mut out);
        }
        let hosts = self.shadow_hosts.borrow().snapshot();
        let mut gone = Vec::new();
        for host in hosts {
            let shadow = self
                .element(host)
                .filter(|el| el.is_connected())
                .and_then(|el| el.shadow_root());
            match shadow {
                Some(shadow) => {
                    if let Ok(list) = query(&shadow, &selector) {
                        self.collect(&list, &mut out);
                    }
                }
                None => gone.push(host),
            }
        }
        if !gone.is_empty() {
            self.shadow_hosts.borrow_mut().forget(&gone);
        }
        out
    }

    fn text(&self, node: NodeId) -> Option<String> {
        Some(self.node(node)?.dyn_ref::<CharacterData>()?.data())
    }

    fn text_nodes(&self, scope: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let Some(scope) = self.node(scope) else {
            return out;
        };
        if scope.node_type() == Node::TEXT_NODE {
            out.push(self.id_of(&scope));
            return out;
        }
        let Ok(walker) = self
            .document
            .create_tree_walker_with_what_to_show(&scope, SHOW_TEXT)
        else {
            return out;
        };
        while let Ok(Some(node)) = walker.next_node() {
            out.push(self.id_of(&node));
        }
        out
    }

    fn is_content_editable(&self, element: NodeId) -> bool {
        self.element(element)
            .and_then(|e| e.dyn_into::<HtmlElement>().ok())
            .is_some_and(|e| e.is_content_editable())
    }

    fn elements_from_point(&self, point: Point) -> Vec<NodeId> {
        #[expect(
            clippy::cast_possible_truncation,
            reason = "client coordinates fit in f32"
        )]
        let (x, y) = (point.x as f32, point.y as f32);
        let mut out = Vec::new();
        let top = self.document.elements_from_point(x, y);
        self.collect_array(&top, &mut out);

        // Shadow trees report only their host; descend into open roots.
        let mut host = top.get(0).dyn_into::<Element>().ok();
        for _ in 0..MAX_SHADOW_DEPTH {
            let Some(outer) = host.as_ref() else {
                break;
            };
            let Some(shadow) = outer.shadow_root() else {
                break;
            };
            self.remember_host(outer);
            let inner = shadow.elements_from_point(x, y);
            let mut nested = Vec::new();
            self.collect_array(&inner, &mut nested);
            nested.retain(|id| !out.contains(id));
            if nested.is_empty() {
                break;
            }
            nested.append(&mut out);
            out = nested;
            host = inner.get(0).dyn_into::<Element>().ok();
        }
        out
    }
}
