use crate::link::LinkRules;
use crate::text::{attr_value, decode_entities, escape_attr};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::debug;

static LINK_TAG_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)<link\b([^>]*)>").expect("valid link tag regex"));

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StylesheetRegistration {
    pub href: String,
    pub dict_id: String,
}

impl StylesheetRegistration {
    /// The head element for this stylesheet, tagged with its dictionary.
    pub fn to_link_tag(&self) -> String {
        format!(
            "<link rel=\"stylesheet\" href=\"{}\" data-dict-id=\"{}\">",
            escape_attr(&self.href),
            escape_attr(&self.dict_id)
        )
    }
}

/// Stylesheet hrefs referenced by `html` that live under the dictionary
/// asset or API namespace, in document order and without duplicates.
pub fn stylesheet_hrefs(html: &str, rules: &LinkRules) -> Vec<String> {
    let mut hrefs: Vec<String> = Vec::new();
    for caps in LINK_TAG_RE.captures_iter(html) {
        let attrs = &caps[1];
        let is_stylesheet = attr_value(attrs, "rel")
            .map(|rel| {
                rel.split_whitespace()
                    .any(|token| token.eq_ignore_ascii_case("stylesheet"))
            })
            .unwrap_or(false);
        if !is_stylesheet {
            continue;
        }
        let Some(href) = attr_value(attrs, "href").map(|raw| decode_entities(raw.trim())) else {
            continue;
        };
        if !rules.is_in_namespace(&href) {
            debug!(%href, "ignoring stylesheet outside dictionary namespace");
            continue;
        }
        if !hrefs.contains(&href) {
            hrefs.push(href);
        }
    }
    hrefs
}

/// Page-lifetime set of injected stylesheets. Entries are never removed.
#[derive(Debug, Default)]
pub struct StyleRegistry {
    rules: LinkRules,
    registrations: Vec<StylesheetRegistration>,
    seen: HashSet<String>,
}

impl StyleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rules(rules: LinkRules) -> Self {
        Self {
            rules,
            ..Self::default()
        }
    }

    pub fn contains(&self, href: &str) -> bool {
        self.seen.contains(href)
    }

    pub fn len(&self) -> usize {
        self.registrations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registrations.is_empty()
    }

    pub fn registrations(&self) -> &[StylesheetRegistration] {
        &self.registrations
    }

    pub fn for_dictionary<'a>(
        &'a self,
        dict_id: &'a str,
    ) -> impl Iterator<Item = &'a StylesheetRegistration> + 'a {
        self.registrations
            .iter()
            .filter(move |registration| registration.dict_id == dict_id)
    }

    /// Records `href` for `dict_id` unless some dictionary already did.
    /// Returns whether a new head element is needed.
    pub fn register(&mut self, href: &str, dict_id: &str) -> bool {
        if !self.seen.insert(href.to_string()) {
            return false;
        }
        self.registrations.push(StylesheetRegistration {
            href: href.to_string(),
            dict_id: dict_id.to_string(),
        });
        true
    }

    /// Registers every namespaced stylesheet referenced by `html` and
    /// returns only the registrations that were new.
    pub fn ensure_dictionary_styles(
        &mut self,
        html: &str,
        dict_id: &str,
    ) -> Vec<StylesheetRegistration> {
        let hrefs = stylesheet_hrefs(html, &self.rules);
        self.register_hrefs(hrefs, dict_id)
    }

    /// Same as [`Self::ensure_dictionary_styles`], but decides the
    /// namespaces with `rules` instead of the registry's own.
    pub fn ensure_styles_with_rules(
        &mut self,
        html: &str,
        dict_id: &str,
        rules: &LinkRules,
    ) -> Vec<StylesheetRegistration> {
        let hrefs = stylesheet_hrefs(html, rules);
        self.register_hrefs(hrefs, dict_id)
    }

    fn register_hrefs(&mut self, hrefs: Vec<String>, dict_id: &str) -> Vec<StylesheetRegistration> {
        let added: Vec<_> = hrefs
            .into_iter()
            .filter(|href| self.register(href, dict_id))
            .map(|href| StylesheetRegistration {
                href,
                dict_id: dict_id.to_string(),
            })
            .collect();
        if !added.is_empty() {
            debug!(dict_id, count = added.len(), "injected dictionary stylesheets");
        }
        added
    }

    /// Head markup for every registered stylesheet.
    pub fn head_markup(&self) -> String {
        self.registrations
            .iter()
            .map(StylesheetRegistration::to_link_tag)
            .collect::<Vec<_>>()
            .join("\n")
    }
}
