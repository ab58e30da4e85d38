// Copyright 2026 the Friction Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The page's single `MutationObserver`.

use alloc::boxed::Box;
use alloc::vec::Vec;

use friction_core::dom::DomView as _;
use friction_core::mutation::{MutationRecord, ObserveFlags};
use js_sys::Array;
use wasm_bindgen::JsCast as _;
use wasm_bindgen::JsValue;
use wasm_bindgen::closure::Closure;
use web_sys::{Document, MutationObserver, MutationObserverInit};

use crate::view::WebDom;

type RecordsClosure = Closure<dyn FnMut(Array, MutationObserver)>;

/// Owns the observer and reconnects it with new flags on demand.
pub(crate) struct Observer {
    document: Document,
    observer: MutationObserver,
    _closure: RecordsClosure,
    flags: Option<ObserveFlags>,
}

impl core::fmt::Debug for Observer {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Observer")
            .field("flags", &self.flags)
            .finish_non_exhaustive()
    }
}

impl Observer {
    /// Creates a disconnected observer delivering raw records to `on_records`.
    pub(crate) fn new(
        document: Document,
        on_records: impl FnMut(Array) + 'static,
    ) -> Result<Self, JsValue> {
        let mut on_records = on_records;
        let closure = Closure::wrap(Box::new(move |records: Array, _: MutationObserver| {
            on_records(records);
        }) as Box<dyn FnMut(Array, MutationObserver)>);
        let observer = MutationObserver::new(closure.as_ref().unchecked_ref())?;
        Ok(Self {
            document,
            observer,
            _closure: closure,
            flags: None,
        })
    }

    /// (Re)connects on the whole document with `flags`.
    pub(crate) fn observe(&mut self, flags: ObserveFlags) -> Result<(), JsValue> {
        self.observer.disconnect();
        self.flags = None;
        let init = MutationObserverInit::new();
        init.set_child_list(flags.child_list);
        init.set_subtree(flags.subtree);
        init.set_character_data(flags.character_data);
        init.set_attributes(flags.attributes);
        self.observer.observe_with_options(&self.document, &init)?;
        self.flags = Some(flags);
        Ok(())
    }

    /// Disconnects, dropping undelivered records.
    pub(crate) fn disconnect(&mut self) {
        self.observer.disconnect();
        self.flags = None;
    }
}

/// Converts raw observer records into engine records.
pub(crate) fn convert(records: &Array, dom: &WebDom) -> Vec<MutationRecord> {
    let mut out = Vec::new();
    for value in records.iter() {
        let Ok(record) = value.dyn_into::<web_sys::MutationRecord>() else {
            continue;
        };
        let Some(target) = record.target() else {
            continue;
        };
        let target = dom.id_of(&target);
        match record.type_().as_str() {
            "childList" => {
                let list = record.added_nodes();
                let mut added = Vec::new();
                for i in 0..list.length() {
                    if let Some(node) = list.get(i) {
                        let id = dom.id_of(&node);
                        added.push((id, dom.kind(id)));
                    }
                }
                if !added.is_empty() {
                    out.push(MutationRecord::ChildList { target, added });
                }
            }
            "characterData" => out.push(MutationRecord::CharacterData { target }),
            "attributes" => out.push(MutationRecord::Attributes { target }),
            _ => {}
        }
    }
    out
}
