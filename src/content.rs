use crate::link::{AnnotatedHtml, LinkRef, LinkRules, annotate_links};
use crate::text::merge_class;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use std::fmt;

/// Class added to every `<audio>` so the host can hide native controls.
pub const AUDIO_CLASS: &str = "dict-audio";

static LINK_TAG_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)<link\b[^>]*>").expect("valid link tag regex"));
static STYLE_BLOCK_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)<style\b[^>]*>.*?</style\s*>").expect("valid style block regex")
});
static AUDIO_OPEN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)<audio\b([^>]*)>").expect("valid audio regex"));

/// Raw HTML for one dictionary entry, as delivered by the fetch layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryHtml(String);

impl EntryHtml {
    pub fn new(html: impl Into<String>) -> Self {
        Self(html.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for EntryHtml {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Entry HTML with page-breaking elements removed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderableHtml(String);

impl RenderableHtml {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for RenderableHtml {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Removes `<link>` elements and `<style>` blocks and tags `<audio>`
/// elements with [`AUDIO_CLASS`]. Unterminated or malformed tags are left as
/// they are.
pub fn sanitize(html: &str) -> RenderableHtml {
    let without_links = LINK_TAG_RE.replace_all(html, "");
    let without_styles = STYLE_BLOCK_RE.replace_all(&without_links, "");
    let tagged = AUDIO_OPEN_RE.replace_all(&without_styles, |caps: &Captures<'_>| {
        format!("<audio{}>", merge_class(&caps[1], AUDIO_CLASS))
    });
    RenderableHtml(tagged.into_owned())
}

/// Sanitized entry with its internal links annotated.
#[derive(Debug, Clone)]
pub struct RenderedEntry {
    pub html: String,
    pub links: Vec<LinkRef>,
}

impl From<AnnotatedHtml> for RenderedEntry {
    fn from(value: AnnotatedHtml) -> Self {
        Self {
            html: value.html,
            links: value.links,
        }
    }
}

pub fn render_entry(entry: &EntryHtml, rules: &LinkRules) -> RenderedEntry {
    let renderable = sanitize(entry.as_str());
    annotate_links(renderable.as_str(), rules).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn removes_link_elements() {
        let html = r#"<LINK rel="stylesheet" href="/dict-assets/1/a.css"><p>x</p><link href=b.css/>"#;
        assert_eq!(sanitize(html).as_str(), "<p>x</p>");
    }

    #[test]
    fn removes_style_blocks_across_lines() {
        let html = "<style type=\"text/css\">\n.a { color: red }\n</style><b>run</b><STYLE>b{}</STYLE >";
        assert_eq!(sanitize(html).as_str(), "<b>run</b>");
    }

    #[test]
    fn tags_audio_elements() {
        let html = r#"<audio src="a.mp3"></audio><AUDIO class="x" controls>"#;
        assert_eq!(
            sanitize(html).as_str(),
            r#"<audio src="a.mp3" class="dict-audio"></audio><audio class="x dict-audio" controls>"#
        );
    }

    #[test]
    fn malformed_markup_passes_through() {
        let html = "<p>open <style>never closed <link rel=stylesheet";
        assert_eq!(sanitize(html).as_str(), html);
        assert_eq!(sanitize("").as_str(), "");
    }

    #[test]
    fn sanitize_is_deterministic() {
        let html = r#"<style>a{}</style><audio src="a.mp3"><a href="entry://run">run</a>"#;
        assert_eq!(sanitize(html), sanitize(html));
        let once = sanitize(html);
        assert_eq!(sanitize(once.as_str()), once);
    }

    #[test]
    fn render_entry_sanitizes_then_annotates() {
        let entry = EntryHtml::from(
            r#"<link rel="stylesheet" href="/dict-assets/1/a.css"><a href="entry://run">run</a>"#,
        );
        let rendered = render_entry(&entry, &LinkRules::default());
        assert_eq!(
            rendered.html,
            r#"<a href="entry://run" class="dict-word-link" data-word="run">run</a>"#
        );
        assert_eq!(rendered.links.len(), 1);
    }
}
