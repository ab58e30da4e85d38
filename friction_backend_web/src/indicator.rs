// Copyright 2026 the Friction Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Floating seek-credit indicator.
//!
//! The widget lives in a closed shadow root on a fixed-position host, so the
//! page's styles do not reach it and its own mutations stay invisible to the
//! document observer. It is positioned over the top-right corner of the
//! active media element.

use alloc::boxed::Box;
use alloc::format;
use alloc::rc::Rc;
use alloc::string::String;
use alloc::vec::Vec;
use core::fmt::Write as _;

use friction_core::effect::{IndicatorMode, IndicatorView};
use friction_core::seek::IndicatorEvent;
use friction_core::time::Duration;
use wasm_bindgen::JsCast as _;
use wasm_bindgen::JsValue;
use wasm_bindgen::closure::Closure;
use web_sys::{
    Document, Element, Event, HtmlElement, ShadowRoot, ShadowRootInit, ShadowRootMode,
};

/// Attribute on the widget host.
pub(crate) const HOST_ATTRIBUTE: &str = "data-friction-indicator";

const STYLE: &str = "\
:host { all: initial; position: fixed; z-index: 2147483647; transform: translateX(-100%); \
font: 12px/1.4 system-ui, sans-serif; }
.panel { background: rgba(20, 20, 20, 0.85); color: #f5f5f5; border-radius: 8px; \
padding: 6px 10px; display: flex; gap: 8px; align-items: center; }
.dots { letter-spacing: 2px; }
.bar { width: 48px; height: 4px; background: #555; border-radius: 2px; overflow: hidden; }
.fill { height: 100%; background: #8bc34a; }
button { all: unset; cursor: pointer; padding: 2px 6px; border-radius: 4px; background: #333; }
button:hover { background: #555; }
";

/// Credit dots: filled for available credits, hollow for the rest.
pub(crate) fn dots(credits: u8, max: u8) -> String {
    let filled = credits.min(max);
    let mut out = String::new();
    for i in 0..max {
        out.push(if i < filled { '\u{25cf}' } else { '\u{25cb}' });
    }
    out
}

/// Whole percent of a `0..=1` fraction.
pub(crate) fn percent(fraction: f64) -> u32 {
    let clamped = if fraction.is_finite() {
        fraction.clamp(0.0, 1.0)
    } else {
        0.0
    };
    #[expect(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        reason = "clamped to 0..=100"
    )]
    let pct = (clamped * 100.0 + 0.5) as u32;
    pct.min(100)
}

/// Remaining cooldown rounded up to whole seconds; `None` when elapsed.
pub(crate) fn cooldown_label(remaining: Duration) -> Option<String> {
    let ms = remaining.millis();
    (ms > 0).then(|| format!("{}s", ms.div_ceil(1000)))
}

/// The widget markup for `view`.
pub(crate) fn render(view: &IndicatorView) -> String {
    let mut html = format!("<style>{STYLE}</style><div class=\"panel\">");
    match view.mode {
        IndicatorMode::Gauge => {
            let _ = write!(
                html,
                "<span class=\"dots\">{}</span>\
                 <div class=\"bar\"><div class=\"fill\" style=\"width: {}%\"></div></div>",
                dots(view.credits, view.max_credits),
                percent(view.charge_fraction),
            );
            if let Some(label) = cooldown_label(view.cooldown_remaining) {
                let _ = write!(html, "<span class=\"cooldown\">{label}</span>");
            }
        }
        IndicatorMode::Speed => {
            for rate in &view.speed_choices {
                let _ = write!(html, "<button data-rate=\"{rate}\">{rate}\u{d7}</button>");
            }
        }
    }
    html.push_str("</div>");
    html
}

struct Mounted {
    host: HtmlElement,
    shadow: ShadowRoot,
    // (target, type, closure); kept alive while mounted.
    listeners: Vec<(web_sys::EventTarget, &'static str, Closure<dyn FnMut(Event)>)>,
}

/// The floating widget.
pub(crate) struct IndicatorWidget {
    document: Document,
    on_input: Rc<dyn Fn(IndicatorEvent)>,
    mounted: Option<Mounted>,
    last_html: String,
}

impl core::fmt::Debug for IndicatorWidget {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("IndicatorWidget")
            .field("mounted", &self.mounted.is_some())
            .finish_non_exhaustive()
    }
}

impl IndicatorWidget {
    pub(crate) fn new(document: Document, on_input: impl Fn(IndicatorEvent) + 'static) -> Self {
        Self {
            document,
            on_input: Rc::new(on_input),
            mounted: None,
            last_html: String::new(),
        }
    }

    /// Renders `view` anchored to `anchor`.
    pub(crate) fn show(&mut self, view: &IndicatorView, anchor: &Element) -> Result<(), JsValue> {
        if self.mounted.is_none() {
            self.mounted = Some(self.mount()?);
            self.last_html.clear();
        }
        let Some(mounted) = self.mounted.as_ref() else {
            return Ok(());
        };
        let rect = anchor.get_bounding_client_rect();
        let style = mounted.host.style();
        style.set_property("top", &format!("{}px", rect.top() + 8.0))?;
        style.set_property("left", &format!("{}px", rect.right() - 8.0))?;
        style.remove_property("display")?;

        let html = render(view);
        if html != self.last_html {
            mounted.shadow.set_inner_html(&html);
            self.last_html = html;
        }
        Ok(())
    }

    /// Hides the widget; it stays mounted for the next show.
    pub(crate) fn hide(&mut self) -> Result<(), JsValue> {
        if let Some(mounted) = self.mounted.as_ref() {
            mounted.host.style().set_property("display", "none")?;
        }
        Ok(())
    }

    /// Removes the widget from the page.
    pub(crate) fn unmount(&mut self) {
        if let Some(mounted) = self.mounted.take() {
            for (target, kind, closure) in &mounted.listeners {
                let _ = target
                    .remove_event_listener_with_callback(kind, closure.as_ref().unchecked_ref());
            }
            mounted.host.remove();
        }
        self.last_html.clear();
    }

    fn mount(&self) -> Result<Mounted, JsValue> {
        let host: HtmlElement = self.document.create_element("div")?.unchecked_into();
        host.set_attribute(HOST_ATTRIBUTE, "")?;
        let shadow = host.attach_shadow(&ShadowRootInit::new(ShadowRootMode::Closed))?;

        let mut listeners = Vec::new();
        let hover = |event: IndicatorEvent| {
            let on_input = Rc::clone(&self.on_input);
            Closure::wrap(Box::new(move |_: Event| on_input(event)) as Box<dyn FnMut(Event)>)
        };
        let host_target: web_sys::EventTarget = host.clone().unchecked_into();
        listeners.push((host_target.clone(), "pointerenter", hover(IndicatorEvent::HoverStart)));
        listeners.push((host_target, "pointerleave", hover(IndicatorEvent::HoverEnd)));

        let on_input = Rc::clone(&self.on_input);
        let click = Closure::wrap(Box::new(move |event: Event| {
            let rate = event
                .target()
                .and_then(|t| t.dyn_into::<Element>().ok())
                .and_then(|el| el.closest("[data-rate]").ok().flatten())
                .and_then(|el| el.get_attribute("data-rate"))
                .and_then(|raw| raw.parse::<f64>().ok());
            if let Some(rate) = rate {
                on_input(IndicatorEvent::RateChosen(rate));
            }
        }) as Box<dyn FnMut(Event)>);
        listeners.push((shadow.clone().unchecked_into(), "click", click));

        for (target, kind, closure) in &listeners {
            target.add_event_listener_with_callback(kind, closure.as_ref().unchecked_ref())?;
        }
        let parent = self
            .document
            .document_element()
            .ok_or_else(|| JsValue::from_str("document has no root element"))?;
        parent.append_child(&host)?;
        Ok(Mounted {
            host,
            shadow,
            listeners,
        })
    }
}
