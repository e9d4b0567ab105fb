pub mod api;
pub mod cache;
pub mod content;
pub mod device;
pub mod link;
pub mod navigation;
pub mod placement;
pub mod popover;
pub mod preview;
pub mod styles;
pub mod text;
pub mod view;

#[cfg(feature = "web")]
pub mod web;

pub use api::{FetchError, SearchResponse, SearchResult};
pub use cache::PreviewCache;
pub use content::{EntryHtml, RenderableHtml, RenderedEntry, render_entry, sanitize};
pub use device::{DeviceMode, MediaQuery};
pub use link::{
    LinkClassification, LinkRef, LinkRules, ResolvedWord, annotate_links, classify, extract_word,
    resolve,
};
pub use navigation::{Dispatch, NavigationDispatcher, SearchSession, WordRouter, word_page_path};
pub use placement::{AnchorRect, PanelSize, PopoverPosition, Side, Viewport, place_popover};
pub use popover::{Popover, PreviewLoad, PreviewPanel};
pub use preview::{
    ClickTarget, HoverConfig, HoverController, HoverPhase, HoverState, PointerTarget,
    PreviewSource, PreviewState, Scheduler, TimerId,
};
pub use styles::{StyleRegistry, StylesheetRegistration};
pub use view::EntryView;
