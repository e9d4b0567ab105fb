use crate::text::{attr_value, decode_entities, escape_attr, merge_class};
use once_cell::sync::Lazy;
use percent_encoding::percent_decode_str;
use regex::{Captures, Regex};
use serde::Serialize;
use std::fmt;
use std::ops::Deref;
use tracing::trace;

/// Reserved scheme for internal word references.
pub const ENTRY_SCHEME: &str = "entry://";
/// Legacy inline-link marker used by redirect records.
pub const LINK_MARKER: &str = "@@@LINK=";
/// Class added to anchors that navigate to another word.
pub const WORD_LINK_CLASS: &str = "dict-word-link";

const MANGLED_ENTRY: &str = "/entry://";

static PLAIN_WORD_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\p{L}[\p{L}\p{N}\s'\-]*$").expect("valid plain word regex"));
static ANCHOR_OPEN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)<a\b([^>]*)>").expect("valid anchor regex"));

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkClassification {
    InternalWordLink,
    ExternalLink,
    ResourceLink,
    AnchorLink,
}

impl LinkClassification {
    pub fn is_internal(self) -> bool {
        matches!(self, LinkClassification::InternalWordLink)
    }
}

impl fmt::Display for LinkClassification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LinkClassification::InternalWordLink => write!(f, "internal"),
            LinkClassification::ExternalLink => write!(f, "external"),
            LinkClassification::ResourceLink => write!(f, "resource"),
            LinkClassification::AnchorLink => write!(f, "anchor"),
        }
    }
}

/// Namespaces and extensions that mark a link as a resource rather than a word.
#[derive(Debug, Clone)]
pub struct LinkRules {
    pub asset_prefix: String,
    pub api_prefix: String,
    pub media_extensions: Vec<String>,
}

impl Default for LinkRules {
    fn default() -> Self {
        Self {
            asset_prefix: "/dict-assets/".to_string(),
            api_prefix: "/api/".to_string(),
            media_extensions: [
                "css", "js", "png", "jpg", "jpeg", "gif", "svg", "webp", "bmp", "ico", "mp3",
                "wav", "ogg", "m4a", "spx", "aac", "flac", "mp4", "woff", "woff2", "ttf",
            ]
            .iter()
            .map(|ext| ext.to_string())
            .collect(),
        }
    }
}

impl LinkRules {
    /// Classifies an `href`. Rule order is significant: the first match wins.
    pub fn classify(&self, href: &str) -> LinkClassification {
        let href = href.trim();
        let class = if href.starts_with(ENTRY_SCHEME)
            || href.contains(LINK_MARKER)
            || href.contains(MANGLED_ENTRY)
        {
            LinkClassification::InternalWordLink
        } else if has_http_scheme(href) {
            LinkClassification::ExternalLink
        } else if self.is_resource(href) {
            LinkClassification::ResourceLink
        } else if href.starts_with('#') {
            LinkClassification::AnchorLink
        } else if href.contains("://") {
            LinkClassification::ExternalLink
        } else if is_plain_word(href) {
            LinkClassification::InternalWordLink
        } else {
            LinkClassification::ExternalLink
        };
        trace!(href, %class, "classified link");
        class
    }

    /// True when the href lives under the asset/API namespaces or names a
    /// known static file type.
    pub fn is_in_namespace(&self, href: &str) -> bool {
        href.starts_with(&self.asset_prefix) || href.starts_with(&self.api_prefix)
    }

    fn is_resource(&self, href: &str) -> bool {
        if self.is_in_namespace(href) {
            return true;
        }
        let lower = href.to_ascii_lowercase();
        let path = lower.split(['?', '#']).next().unwrap_or_default();
        self.has_media_extension(path) || self.has_media_extension(&lower)
    }

    fn has_media_extension(&self, path: &str) -> bool {
        match path.rsplit_once('.') {
            Some((_, ext)) => self.media_extensions.iter().any(|known| known == ext),
            None => false,
        }
    }

    /// Classifies and, for internal links only, extracts the target word.
    pub fn resolve(&self, href: &str) -> Option<ResolvedWord> {
        if !self.classify(href).is_internal() {
            return None;
        }
        extract_word(href).and_then(ResolvedWord::new)
    }
}

fn has_http_scheme(href: &str) -> bool {
    let lower = href.get(..8).unwrap_or(href).to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

fn is_plain_word(href: &str) -> bool {
    let stripped = href.trim_start_matches('/');
    if stripped.is_empty() {
        return false;
    }
    PLAIN_WORD_RE.is_match(&percent_decode_str(stripped).decode_utf8_lossy())
}

/// Classifies with the default namespaces.
pub fn classify(href: &str) -> LinkClassification {
    LinkRules::default().classify(href)
}

/// Recovers the target word of an internal reference.
///
/// Returns `None` when nothing decodable remains, e.g. `entry://#section`
/// (an in-entry anchor) or an empty relative path. Callers treat `None` as
/// "do nothing".
pub fn extract_word(href: &str) -> Option<String> {
    let href = href.trim();
    let raw = if let Some(rest) = href.strip_prefix(ENTRY_SCHEME) {
        rest
    } else if let Some(idx) = href.rfind(MANGLED_ENTRY) {
        &href[idx + MANGLED_ENTRY.len()..]
    } else if let Some(idx) = href.find(LINK_MARKER) {
        &href[idx + LINK_MARKER.len()..]
    } else {
        href.trim_start_matches('/')
    };
    let without_fragment = raw.split('#').next().unwrap_or_default();
    let decoded = percent_decode_str(without_fragment).decode_utf8_lossy();
    let word = decoded.trim().trim_end_matches('/').trim();
    if word.is_empty() {
        None
    } else {
        Some(word.to_string())
    }
}

/// Resolves with the default namespaces.
pub fn resolve(href: &str) -> Option<ResolvedWord> {
    LinkRules::default().resolve(href)
}

/// Decoded, non-empty target of an internal link.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct ResolvedWord(String);

impl ResolvedWord {
    pub fn new(word: impl Into<String>) -> Option<Self> {
        let word = word.into();
        let trimmed = word.trim();
        if trimmed.is_empty() {
            None
        } else if trimmed.len() == word.len() {
            Some(Self(word))
        } else {
            Some(Self(trimmed.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl Deref for ResolvedWord {
    type Target = str;

    fn deref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ResolvedWord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One anchor found while annotating entry HTML.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LinkRef {
    pub href: String,
    pub classification: LinkClassification,
    pub word: Option<ResolvedWord>,
}

#[derive(Debug, Clone, Default)]
pub struct AnnotatedHtml {
    pub html: String,
    pub links: Vec<LinkRef>,
}

impl AnnotatedHtml {
    pub fn internal_words(&self) -> impl Iterator<Item = &ResolvedWord> {
        self.links.iter().filter_map(|link| link.word.as_ref())
    }
}

/// Tags every internal `<a>` with [`WORD_LINK_CLASS`] and a `data-word`
/// attribute, leaving all other anchors untouched.
pub fn annotate_links(html: &str, rules: &LinkRules) -> AnnotatedHtml {
    let mut links = Vec::new();
    let annotated = ANCHOR_OPEN_RE.replace_all(html, |caps: &Captures<'_>| {
        let attrs = &caps[1];
        let Some(raw_href) = attr_value(attrs, "href") else {
            return caps[0].to_string();
        };
        let href = decode_entities(&raw_href);
        let classification = rules.classify(&href);
        let word = if classification.is_internal() {
            extract_word(&href).and_then(ResolvedWord::new)
        } else {
            None
        };
        let replacement = match &word {
            Some(word) => format!(
                "<a{} data-word=\"{}\">",
                merge_class(attrs, WORD_LINK_CLASS),
                escape_attr(word)
            ),
            None => caps[0].to_string(),
        };
        links.push(LinkRef {
            href,
            classification,
            word,
        });
        replacement
    });
    AnnotatedHtml {
        html: annotated.into_owned(),
        links,
    }
}
