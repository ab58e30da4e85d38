// Copyright 2026 the Friction Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Per-site selector configuration.
//!
//! The engine never hardcodes which page elements are media, feeds, or
//! controls. A [`SelectorProvider`] maps a hostname to a [`SelectorBundle`];
//! [`StaticSelectorProvider`] is a table of per-host overrides on top of a
//! default bundle, falling back field by field.

use alloc::string::{String, ToString as _};
use alloc::vec::Vec;

/// CSS selectors the managers consume for one site.
///
/// Each field is a list; every entry is matched on its own so one selector the
/// page's engine rejects never disables its siblings.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase", default))]
pub struct SelectorBundle {
    /// Media and thumbnails that receive grayscale/blur.
    pub visual_targets: Vec<String>,
    /// Text blocks that receive the text variant of visual friction.
    pub text_visual_targets: Vec<String>,
    /// Controls styled as interactive under visual friction.
    pub interactive_targets: Vec<String>,
    /// Overlays that must never be filtered.
    pub overlay_exempt: Vec<String>,
    /// Site-declared reveal scopes, preferred over [`media_stack`](Self::media_stack).
    pub hover_reveal_scope: Vec<String>,
    /// Text inside a match of any of these is never shuffled.
    pub text_shuffle_excluded_closest: Vec<String>,
    /// Generic media containers used when no site scope resolves.
    pub media_stack: Vec<String>,
}

/// A partial bundle; `None` fields fall back to the default bundle.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase", default))]
pub struct SelectorOverride {
    /// Replaces [`SelectorBundle::visual_targets`].
    pub visual_targets: Option<Vec<String>>,
    /// Replaces [`SelectorBundle::text_visual_targets`].
    pub text_visual_targets: Option<Vec<String>>,
    /// Replaces [`SelectorBundle::interactive_targets`].
    pub interactive_targets: Option<Vec<String>>,
    /// Replaces [`SelectorBundle::overlay_exempt`].
    pub overlay_exempt: Option<Vec<String>>,
    /// Replaces [`SelectorBundle::hover_reveal_scope`].
    pub hover_reveal_scope: Option<Vec<String>>,
    /// Replaces [`SelectorBundle::text_shuffle_excluded_closest`].
    pub text_shuffle_excluded_closest: Option<Vec<String>>,
    /// Replaces [`SelectorBundle::media_stack`].
    pub media_stack: Option<Vec<String>>,
}

impl SelectorOverride {
    fn resolve(&self, base: &SelectorBundle) -> SelectorBundle {
        let pick = |o: &Option<Vec<String>>, d: &Vec<String>| o.as_ref().unwrap_or(d).clone();
        SelectorBundle {
            visual_targets: pick(&self.visual_targets, &base.visual_targets),
            text_visual_targets: pick(&self.text_visual_targets, &base.text_visual_targets),
            interactive_targets: pick(&self.interactive_targets, &base.interactive_targets),
            overlay_exempt: pick(&self.overlay_exempt, &base.overlay_exempt),
            hover_reveal_scope: pick(&self.hover_reveal_scope, &base.hover_reveal_scope),
            text_shuffle_excluded_closest: pick(
                &self.text_shuffle_excluded_closest,
                &base.text_shuffle_excluded_closest,
            ),
            media_stack: pick(&self.media_stack, &base.media_stack),
        }
    }
}

/// Maps a hostname to the selectors for that site.
pub trait SelectorProvider {
    /// The bundle for `hostname`.
    fn bundle(&self, hostname: &str) -> SelectorBundle;
}

/// A fixed table of host overrides over a default bundle.
#[derive(Clone, Debug, Default)]
pub struct StaticSelectorProvider {
    default: SelectorBundle,
    hosts: Vec<(String, SelectorOverride)>,
}

fn list(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| (*s).to_string()).collect()
}

impl StaticSelectorProvider {
    /// A provider with the given default bundle and no overrides.
    #[must_use]
    pub fn new(default: SelectorBundle) -> Self {
        Self {
            default,
            hosts: Vec::new(),
        }
    }

    /// Generic selectors that work reasonably on any page.
    #[must_use]
    pub fn generic_bundle() -> SelectorBundle {
        SelectorBundle {
            visual_targets: list(&["img", "video", "picture", "canvas"]),
            text_visual_targets: Vec::new(),
            interactive_targets: list(&["a", "button", "[role=button]"]),
            overlay_exempt: list(&["[role=dialog]"]),
            hover_reveal_scope: Vec::new(),
            text_shuffle_excluded_closest: list(&["[aria-hidden=true]", "nav"]),
            media_stack: list(&["video", "picture", "img", "canvas"]),
        }
    }

    /// The generic bundle plus overrides for a few feed-heavy sites.
    #[must_use]
    pub fn standard() -> Self {
        Self::new(Self::generic_bundle())
            .with_host(
                "youtube.com",
                SelectorOverride {
                    visual_targets: Some(list(&["ytd-thumbnail", "video", "#avatar img"])),
                    hover_reveal_scope: Some(list(&[
                        "ytd-rich-item-renderer",
                        "ytd-compact-video-renderer",
                        "ytd-video-renderer",
                    ])),
                    text_visual_targets: Some(list(&["#video-title"])),
                    ..SelectorOverride::default()
                },
            )
            .with_host(
                "instagram.com",
                SelectorOverride {
                    hover_reveal_scope: Some(list(&["article"])),
                    overlay_exempt: Some(list(&["[role=dialog]", "[role=menu]"])),
                    ..SelectorOverride::default()
                },
            )
            .with_host(
                "reddit.com",
                SelectorOverride {
                    hover_reveal_scope: Some(list(&["shreddit-post", "article"])),
                    text_visual_targets: Some(list(&["[slot=title]"])),
                    ..SelectorOverride::default()
                },
            )
    }

    /// Adds an override for `host` and its subdomains.
    #[must_use]
    pub fn with_host(mut self, host: &str, selectors: SelectorOverride) -> Self {
        self.hosts
            .push((normalize_host(host).to_string(), selectors));
        self
    }

    fn lookup(&self, hostname: &str) -> Option<&SelectorOverride> {
        let host = normalize_host(hostname);
        self.hosts
            .iter()
            .filter(|(key, _)| host_matches(&host, key))
            .max_by_key(|(key, _)| key.len())
            .map(|(_, o)| o)
    }
}

impl SelectorProvider for StaticSelectorProvider {
    fn bundle(&self, hostname: &str) -> SelectorBundle {
        match self.lookup(hostname) {
            Some(o) => o.resolve(&self.default),
            None => self.default.clone(),
        }
    }
}

fn normalize_host(host: &str) -> String {
    let host = host.trim().trim_end_matches('.').to_ascii_lowercase();
    match host.strip_prefix("www.") {
        Some(rest) => rest.to_string(),
        None => host,
    }
}

/// `host` is `key` or one of its subdomains.
fn host_matches(host: &str, key: &str) -> bool {
    host == key
        || host
            .strip_suffix(key)
            .is_some_and(|prefix| prefix.ends_with('.'))
}
