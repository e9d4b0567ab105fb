use once_cell::sync::Lazy;
use regex::{Captures, Regex};

/// Characters kept by [`brief_definition`] before the ellipsis.
pub const BRIEF_MAX_CHARS: usize = 150;

static SCRIPT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<script\b[^>]*>.*?</script\s*>").expect("valid script regex"));
static STYLE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<style\b[^>]*>.*?</style\s*>").expect("valid style regex"));
static TAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<[^>]*>").expect("valid tag regex"));
static WHITESPACE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s+").expect("valid whitespace regex"));
static NUMERIC_ENTITY_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"&#(?:([0-9]{1,7})|[xX]([0-9a-fA-F]{1,6}));").expect("valid entity regex")
});
static PHONETIC_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[/\[][^\]/]{1,30}[/\]]").expect("valid phonetic regex"));
static AUDIO_SRC_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)src\s*=\s*["']([^"']+\.(?:mp3|wav|ogg|m4a))["']"#)
        .expect("valid audio src regex")
});
static ATTR_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"([A-Za-z_:][-A-Za-z0-9_:.]*)\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'=<>`]+))"#)
        .expect("valid attribute regex")
});

/// Strips tags (dropping script/style bodies), decodes entities and
/// collapses whitespace.
pub fn strip_markup(html: &str) -> String {
    let without_scripts = SCRIPT_RE.replace_all(html, " ");
    let without_styles = STYLE_RE.replace_all(&without_scripts, " ");
    let without_tags = TAG_RE.replace_all(&without_styles, " ");
    collapse_whitespace(&decode_entities(&without_tags))
}

pub fn collapse_whitespace(text: &str) -> String {
    WHITESPACE_RE.replace_all(text.trim(), " ").into_owned()
}

pub fn decode_entities(text: &str) -> String {
    if !text.contains('&') {
        return text.to_string();
    }
    let numeric = NUMERIC_ENTITY_RE.replace_all(text, |caps: &Captures<'_>| {
        let code = match (caps.get(1), caps.get(2)) {
            (Some(dec), _) => dec.as_str().parse::<u32>().ok(),
            (None, Some(hex)) => u32::from_str_radix(hex.as_str(), 16).ok(),
            _ => None,
        };
        code.and_then(char::from_u32)
            .map(String::from)
            .unwrap_or_else(|| caps[0].to_string())
    });
    numeric
        .replace("&nbsp;", "\u{a0}")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

/// Cuts `text` to `max_chars` characters, appending `...` when shortened.
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => {
            let mut brief = text[..cut].trim_end().to_string();
            brief.push_str("...");
            brief
        }
        None => text.to_string(),
    }
}

/// Plain-text summary of a definition, capped at [`BRIEF_MAX_CHARS`].
pub fn brief_definition(definition_html: &str) -> String {
    truncate_chars(&strip_markup(definition_html), BRIEF_MAX_CHARS)
}

/// First `/.../` or `[...]` token of the entry text, if any.
pub fn extract_phonetic(definition_html: &str) -> Option<String> {
    let text = strip_markup(definition_html);
    PHONETIC_RE.find(&text).map(|m| m.as_str().to_string())
}

/// Source URL of the first audio file referenced by the entry.
pub fn extract_audio_url(definition_html: &str) -> Option<String> {
    AUDIO_SRC_RE
        .captures(definition_html)
        .map(|caps| decode_entities(&caps[1]))
}

pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

pub fn escape_attr(text: &str) -> String {
    escape_html(text)
}

/// Raw (entity-encoded) value of attribute `name` inside a tag's attribute text.
pub(crate) fn attr_value(attrs: &str, name: &str) -> Option<String> {
    ATTR_RE
        .captures_iter(attrs)
        .find(|caps| caps[1].eq_ignore_ascii_case(name))
        .and_then(|caps| caps.get(2).or_else(|| caps.get(3)).or_else(|| caps.get(4)))
        .map(|value| value.as_str().to_string())
}

/// Returns `attrs` with `class` added, either to an existing `class`
/// attribute or as a new trailing one.
pub(crate) fn merge_class(attrs: &str, class: &str) -> String {
    let existing = ATTR_RE
        .captures_iter(attrs)
        .find(|caps| caps[1].eq_ignore_ascii_case("class"));
    let Some(caps) = existing else {
        return format!("{} class=\"{}\"", attrs.trim_end(), class);
    };
    let whole = caps.get(0).map(|m| m.range()).unwrap_or_default();
    let current = caps
        .get(2)
        .or_else(|| caps.get(3))
        .or_else(|| caps.get(4))
        .map(|m| m.as_str())
        .unwrap_or_default();
    if current.split_whitespace().any(|token| token == class) {
        return attrs.to_string();
    }
    let merged = if current.trim().is_empty() {
        class.to_string()
    } else {
        format!("{} {}", current.trim(), class)
    };
    format!(
        "{}class=\"{}\"{}",
        &attrs[..whole.start],
        merged.replace('"', "&quot;"),
        &attrs[whole.end..]
    )
}
