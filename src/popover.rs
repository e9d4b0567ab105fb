use crate::api::SearchResponse;
use crate::placement::{PopoverPosition, Side};
use crate::text::{brief_definition, escape_attr, escape_html, extract_phonetic};
use serde::Serialize;
use std::fmt::Write as _;

/// Class on the panel's root element. Hosts use it to tell clicks and
/// pointer moves inside the popover from those outside.
pub const POPOVER_CLASS: &str = "word-preview-popover";

/// Progress of the preview fetch for the word currently shown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PreviewLoad {
    Loading,
    Failed(String),
    Loaded(SearchResponse),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum PreviewPanel {
    Loading,
    Failed {
        message: String,
    },
    NotFound {
        word: String,
    },
    Ready {
        word: String,
        phonetic: Option<String>,
        brief: String,
    },
}

impl PreviewPanel {
    /// Summarises the first result; an empty response is "not found", not
    /// an error.
    pub fn from_load(word: &str, load: &PreviewLoad) -> Self {
        match load {
            PreviewLoad::Loading => PreviewPanel::Loading,
            PreviewLoad::Failed(message) => PreviewPanel::Failed {
                message: message.clone(),
            },
            PreviewLoad::Loaded(response) => match response.first() {
                None => PreviewPanel::NotFound {
                    word: word.to_string(),
                },
                Some(first) => PreviewPanel::Ready {
                    word: word.to_string(),
                    phonetic: extract_phonetic(&first.definition),
                    brief: brief_definition(&first.definition),
                },
            },
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, PreviewPanel::Ready { .. })
    }

    fn body_html(&self) -> String {
        match self {
            PreviewPanel::Loading => {
                "<div class=\"preview-loading\"><span class=\"spinner\"></span>Loading...</div>"
                    .to_string()
            }
            PreviewPanel::Failed { .. } => {
                "<div class=\"preview-error\">Failed to load preview</div>".to_string()
            }
            PreviewPanel::NotFound { word } => format!(
                "<div class=\"preview-empty\">No definition found for \"{}\"</div>",
                escape_html(word)
            ),
            PreviewPanel::Ready {
                word,
                phonetic,
                brief,
            } => {
                let mut out = String::new();
                let _ = write!(
                    out,
                    "<div class=\"preview-head\"><h4>{}</h4>",
                    escape_html(word)
                );
                if let Some(phonetic) = phonetic {
                    let _ = write!(
                        out,
                        "<span class=\"preview-phonetic\">{}</span>",
                        escape_html(phonetic)
                    );
                }
                let _ = write!(
                    out,
                    "</div><p class=\"preview-brief\">{}</p>\
                     <button type=\"button\" class=\"preview-open\" data-word=\"{}\">View full entry &rarr;</button>",
                    escape_html(brief),
                    escape_attr(word)
                );
                out
            }
        }
    }
}

/// A panel together with where it goes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Popover {
    pub position: PopoverPosition,
    pub panel: PreviewPanel,
}

impl Popover {
    pub fn render_html(&self) -> String {
        let side = match self.position.side {
            Side::Above => "above",
            Side::Below => "below",
        };
        format!(
            "<div class=\"{POPOVER_CLASS}\" data-side=\"{side}\" \
             style=\"position:fixed;left:{:.0}px;top:{:.0}px\">{}</div>",
            self.position.left,
            self.position.top,
            self.panel.body_html()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::SearchResult;

    fn loaded(definition: &str) -> PreviewLoad {
        PreviewLoad::Loaded(SearchResponse {
            results: vec![SearchResult {
                dict_id: 1,
                dict_name: "oald".to_string(),
                dict_title: "OALD".to_string(),
                word: "run".to_string(),
                definition: definition.to_string(),
            }],
        })
    }

    #[test]
    fn ready_panel_extracts_phonetic_and_brief() {
        let panel = PreviewPanel::from_load("run", &loaded("<b>run</b> <i>/rʌn/</i> to move fast"));
        assert_eq!(
            panel,
            PreviewPanel::Ready {
                word: "run".to_string(),
                phonetic: Some("/rʌn/".to_string()),
                brief: "run /rʌn/ to move fast".to_string(),
            }
        );
    }

    #[test]
    fn empty_response_is_not_found() {
        let panel = PreviewPanel::from_load("zzz", &PreviewLoad::Loaded(SearchResponse::default()));
        assert_eq!(
            panel,
            PreviewPanel::NotFound {
                word: "zzz".to_string()
            }
        );
    }

    #[test]
    fn failure_and_loading_states() {
        assert_eq!(
            PreviewPanel::from_load("run", &PreviewLoad::Loading),
            PreviewPanel::Loading
        );
        let failed = PreviewPanel::from_load("run", &PreviewLoad::Failed("timeout".to_string()));
        assert!(matches!(failed, PreviewPanel::Failed { .. }));
    }

    #[test]
    fn rendered_markup_is_positioned_and_escaped() {
        let popover = Popover {
            position: PopoverPosition {
                left: 12.4,
                top: 40.0,
                side: Side::Below,
            },
            panel: PreviewPanel::NotFound {
                word: "<x>".to_string(),
            },
        };
        let html = popover.render_html();
        assert!(html.starts_with("<div class=\"word-preview-popover\" data-side=\"below\""));
        assert!(html.contains("left:12px;top:40px"));
        assert!(html.contains("\"&lt;x&gt;\""));
    }
}
