use crate::api::SearchResult;
use crate::content::{EntryHtml, RenderedEntry, render_entry};
use crate::device::DeviceMode;
use crate::link::{LinkRef, ResolvedWord};
use crate::navigation::{Dispatch, NavigationDispatcher, SearchSession, WordRouter};
use crate::preview::{HoverController, PreviewSource, Scheduler};
use crate::styles::{StyleRegistry, StylesheetRegistration};
use crate::text::extract_audio_url;
use tracing::debug;

pub struct EntryView<S, F, Q, R>
where
    S: Scheduler,
    F: PreviewSource,
    Q: SearchSession,
    R: WordRouter,
{
    dict_id: String,
    dict_title: String,
    word: String,
    rendered: RenderedEntry,
    audio_url: Option<String>,
    injected_styles: Vec<StylesheetRegistration>,
    hover: HoverController<S, F>,
    navigation: NavigationDispatcher<Q, R>,
}

impl<S, F, Q, R> EntryView<S, F, Q, R>
where
    S: Scheduler,
    F: PreviewSource,
    Q: SearchSession,
    R: WordRouter,
{
    /// Side-loads the dictionary's stylesheets, then sanitizes and
    /// annotates the entry for injection. The hover controller's rules
    /// decide the namespaces for both.
    pub fn mount(
        result: &SearchResult,
        styles: &mut StyleRegistry,
        hover: HoverController<S, F>,
        navigation: NavigationDispatcher<Q, R>,
    ) -> Self {
        let dict_id = result.dict_id.to_string();
        let injected_styles =
            styles.ensure_styles_with_rules(&result.definition, &dict_id, hover.rules());
        let rendered = render_entry(&EntryHtml::new(result.definition.as_str()), hover.rules());
        debug!(
            dict_id = %dict_id,
            word = %result.word,
            links = rendered.links.len(),
            "mounted entry"
        );
        Self {
            dict_id,
            dict_title: result.dict_title.clone(),
            word: result.word.clone(),
            audio_url: extract_audio_url(&result.definition),
            rendered,
            injected_styles,
            hover,
            navigation,
        }
    }

    pub fn dict_id(&self) -> &str {
        &self.dict_id
    }

    pub fn dict_title(&self) -> &str {
        &self.dict_title
    }

    pub fn word(&self) -> &str {
        &self.word
    }

    pub fn html(&self) -> &str {
        &self.rendered.html
    }

    pub fn links(&self) -> &[LinkRef] {
        &self.rendered.links
    }

    /// Audio source for the playback widget, if the entry has one.
    pub fn audio_url(&self) -> Option<&str> {
        self.audio_url.as_deref()
    }

    /// Stylesheets this mount added to the page head.
    pub fn injected_styles(&self) -> &[StylesheetRegistration] {
        &self.injected_styles
    }

    pub fn hover(&self) -> &HoverController<S, F> {
        &self.hover
    }

    pub fn hover_mut(&mut self) -> &mut HoverController<S, F> {
        &mut self.hover
    }

    pub fn navigation(&self) -> &NavigationDispatcher<Q, R> {
        &self.navigation
    }

    pub fn device_mode(&self) -> DeviceMode {
        self.hover.device_mode()
    }

    pub fn set_device_mode(&mut self, mode: DeviceMode) {
        self.hover.set_device_mode(mode);
    }

    /// Click or tap on a link inside the entry. Non-word links are left to
    /// the browser.
    pub fn link_click(&mut self, href: &str) -> Dispatch {
        let Some(word) = self.hover.rules().resolve(href) else {
            return Dispatch::Ignored;
        };
        self.follow(word)
    }

    /// The popover's "view full entry" action.
    pub fn open_full_entry(&mut self) -> Dispatch {
        let word = self.hover.preview().map(|preview| preview.word.clone());
        match word {
            Some(word) => self.follow(word),
            None => Dispatch::Ignored,
        }
    }

    fn follow(&mut self, word: ResolvedWord) -> Dispatch {
        self.hover.close();
        let mode = self.hover.device_mode();
        self.navigation.dispatch(Some(word), mode)
    }

    pub fn unmount(mut self) {
        self.hover.teardown();
    }
}
