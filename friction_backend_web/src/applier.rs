// Copyright 2026 the Friction Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Carries out [`Effect`]s against the live page.

use alloc::string::String;

use friction_core::controller::EngineEvent;
use friction_core::effect::Effect;
use friction_core::error::FrictionError;
use friction_core::node::NodeId;
use friction_core::trace::{Component, Tracer};
use wasm_bindgen::JsCast as _;
use wasm_bindgen::JsValue;
use web_sys::{CharacterData, HtmlElement, HtmlMediaElement};

use crate::engine::Host;
use crate::view::WebDom;

/// `id` of the injected `<style>` element.
pub(crate) const STYLESHEET_ID: &str = "friction-stylesheet";

/// Best-effort text for a thrown value.
pub(crate) fn describe(err: &JsValue) -> String {
    if let Some(e) = err.dyn_ref::<js_sys::Error>() {
        return e.message().into();
    }
    err.as_string().unwrap_or_else(|| String::from("unknown error"))
}

/// Applies one effect.
///
/// Writes to nodes that are gone are skipped. Anything the host throws is
/// traced and otherwise ignored. Follow-up events (an observer that would not
/// attach) are pushed to `follow_up`.
pub(crate) fn apply(
    effect: Effect,
    dom: &WebDom,
    host: &mut Host,
    tracer: &mut Tracer<'_>,
    follow_up: &mut impl Extend<EngineEvent>,
) {
    let result = match effect {
        Effect::SetAttribute { node, name, value } => with_element(dom, node, |el| {
            el.set_attribute(name, &value)
        }),
        Effect::RemoveAttribute { node, name } => {
            with_element(dom, node, |el| el.remove_attribute(name))
        }
        Effect::SetText { node, value } => {
            if let Some(text) = live(dom, node).and_then(|n| n.dyn_into::<CharacterData>().ok()) {
                text.set_data(&value);
            }
            Ok(())
        }
        Effect::SetStyle {
            node,
            property,
            value,
        } => with_html(dom, node, |el| el.style().set_property(property, &value)),
        Effect::RemoveStyle { node, property } => {
            with_html(dom, node, |el| el.style().remove_property(property).map(drop))
        }
        Effect::InstallStylesheet { css } => install_stylesheet(dom, css),
        Effect::RemoveStylesheet => {
            if let Some(style) = dom.document().get_element_by_id(STYLESHEET_ID) {
                style.remove();
            }
            Ok(())
        }
        Effect::SetCurrentTime { media, seconds } => {
            if let Some(el) = media_element(dom, media) {
                el.set_current_time(seconds);
            }
            Ok(())
        }
        Effect::SetPlaybackRate { media, rate } => {
            if let Some(el) = media_element(dom, media) {
                el.set_playback_rate(rate);
            }
            Ok(())
        }
        Effect::StartTimer { timer, delay } => host.timers.start(timer, delay),
        Effect::CancelTimer { timer } => {
            host.timers.cancel(timer);
            Ok(())
        }
        Effect::Listen(group) => host.listeners.listen(group),
        Effect::Unlisten(group) => {
            host.listeners.unlisten(group);
            Ok(())
        }
        Effect::Observe(flags) => {
            if let Err(err) = host.observer.observe(flags) {
                follow_up.extend(core::iter::once(EngineEvent::ObserverFailed {
                    reason: describe(&err),
                }));
            }
            Ok(())
        }
        Effect::Disconnect => {
            host.observer.disconnect();
            Ok(())
        }
        Effect::RequestFlush => {
            host.frame.request();
            Ok(())
        }
        Effect::ShowIndicator(view) => match live(dom, view.media)
            .and_then(|n| n.dyn_into::<web_sys::Element>().ok())
        {
            Some(anchor) => host.indicator.show(&view, &anchor),
            None => host.indicator.hide(),
        },
        Effect::HideIndicator => host.indicator.hide(),
    };
    if let Err(err) = result {
        tracer.fault(
            Component::Controller,
            &FrictionError::Host {
                reason: describe(&err),
            },
        );
    }
}

/// The node behind `id` if it is still in the document.
fn live(dom: &WebDom, id: NodeId) -> Option<web_sys::Node> {
    dom.node(id).filter(web_sys::Node::is_connected)
}

fn with_element(
    dom: &WebDom,
    id: NodeId,
    write: impl FnOnce(&web_sys::Element) -> Result<(), JsValue>,
) -> Result<(), JsValue> {
    match live(dom, id).and_then(|n| n.dyn_into::<web_sys::Element>().ok()) {
        Some(el) => write(&el),
        None => Ok(()),
    }
}

fn with_html(
    dom: &WebDom,
    id: NodeId,
    write: impl FnOnce(&HtmlElement) -> Result<(), JsValue>,
) -> Result<(), JsValue> {
    match live(dom, id).and_then(|n| n.dyn_into::<HtmlElement>().ok()) {
        Some(el) => write(&el),
        None => Ok(()),
    }
}

fn media_element(dom: &WebDom, id: NodeId) -> Option<HtmlMediaElement> {
    live(dom, id).and_then(|n| n.dyn_into::<HtmlMediaElement>().ok())
}

fn install_stylesheet(dom: &WebDom, css: &str) -> Result<(), JsValue> {
    let document = dom.document();
    let style = match document.get_element_by_id(STYLESHEET_ID) {
        Some(style) => style,
        None => {
            let style = document.create_element("style")?;
            style.set_id(STYLESHEET_ID);
            let parent: web_sys::Node = match document.head() {
                Some(head) => head.into(),
                None => document
                    .document_element()
                    .ok_or_else(|| JsValue::from_str("document has no root element"))?
                    .into(),
            };
            parent.append_child(&style)?;
            style
        }
    };
    if style.text_content().as_deref() != Some(css) {
        style.set_text_content(Some(css));
    }
    Ok(())
}
