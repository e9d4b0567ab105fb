use dictlink::{
    AnchorRect, ClickTarget, DeviceMode, Dispatch, EntryView, FetchError, HoverController,
    HoverPhase, LinkClassification, LinkRules, NavigationDispatcher, PointerTarget, PreviewCache,
    PreviewPanel, PreviewSource, Scheduler, SearchResponse, SearchResult, SearchSession,
    StyleRegistry, TimerId, Viewport, WordRouter, word_page_path,
};
use std::sync::Arc;
use std::time::Duration;

#[derive(Default)]
struct ManualClock {
    next: u64,
    pending: Vec<(TimerId, Duration)>,
}

impl Scheduler for ManualClock {
    fn schedule(&mut self, delay: Duration) -> TimerId {
        self.next += 1;
        let id = TimerId(self.next);
        self.pending.push((id, delay));
        id
    }

    fn cancel(&mut self, timer: TimerId) {
        self.pending.retain(|(id, _)| *id != timer);
    }
}

#[derive(Default)]
struct Fetches {
    words: Vec<String>,
}

impl PreviewSource for Fetches {
    fn fetch_preview(&mut self, word: &str) {
        self.words.push(word.to_string());
    }
}

#[derive(Default)]
struct Session {
    keyword: Option<String>,
    submitted: Vec<String>,
    scrolled: usize,
}

impl SearchSession for Session {
    fn set_search_keyword(&mut self, word: &str) {
        self.keyword = Some(word.to_string());
    }

    fn submit_search(&mut self, word: &str) {
        self.submitted.push(word.to_string());
    }

    fn scroll_to_top(&mut self) {
        self.scrolled += 1;
    }
}

#[derive(Default)]
struct Router {
    paths: Vec<String>,
}

impl WordRouter for Router {
    fn navigate_to_word_page(&mut self, word: &str) {
        self.paths.push(word_page_path(word));
    }
}

type View = EntryView<ManualClock, Fetches, Session, Router>;

const RUN_ENTRY: &str = r#"<link rel="stylesheet" href="/dict-assets/4/oxford.css">
<div class="entry"><span class="hw">walk</span> <span class="phon">/wɔːk/</span>
<p>to move on foot; compare <a href="entry://run">run</a> and
<a href="/api/v1/resources/2/entry://specialty">specialty</a>.</p>
<a href="https://example.com/walk">source</a></div>"#;

fn result(dict_id: u32, word: &str, definition: &str) -> SearchResult {
    SearchResult {
        dict_id,
        dict_name: format!("dict-{dict_id}"),
        dict_title: format!("Dictionary {dict_id}"),
        word: word.to_string(),
        definition: definition.to_string(),
    }
}

fn mount(styles: &mut StyleRegistry, cache: Arc<PreviewCache>, mode: DeviceMode) -> View {
    let hover = HoverController::new(ManualClock::default(), Fetches::default(), cache, mode);
    let navigation = NavigationDispatcher::new(Session::default(), Router::default());
    EntryView::mount(&result(4, "walk", RUN_ENTRY), styles, hover, navigation)
}

fn fire_next(view: &mut View) -> bool {
    let clock = view.hover_mut().scheduler_mut();
    if clock.pending.is_empty() {
        return false;
    }
    let (id, _) = clock.pending.remove(0);
    view.hover_mut().timer_fired(id)
}

fn anchor() -> AnchorRect {
    AnchorRect::new(120.0, 400.0, 40.0, 18.0)
}

#[test]
fn hover_then_click_runs_instant_search() {
    let mut styles = StyleRegistry::new();
    let cache = Arc::new(PreviewCache::default());
    let mut view = mount(&mut styles, Arc::clone(&cache), DeviceMode::Pointer);

    assert!(view.hover_mut().pointer_enter("entry://run", anchor()));
    assert_eq!(view.hover().phase(), HoverPhase::Pending);
    assert!(fire_next(&mut view));
    assert_eq!(view.hover().phase(), HoverPhase::Shown);
    assert_eq!(view.hover().source().words, vec!["run"]);

    let response = SearchResponse {
        results: vec![result(4, "run", "<span class=\"phon\">/rʌn/</span> to move fast")],
    };
    assert!(view.hover_mut().preview_resolved("run", Ok(response)));
    let popover = view
        .hover()
        .popover(&Viewport::new(1024.0, 768.0))
        .expect("popover is shown");
    match &popover.panel {
        PreviewPanel::Ready { word, phonetic, .. } => {
            assert_eq!(word, "run");
            assert_eq!(phonetic.as_deref(), Some("/rʌn/"));
        }
        other => panic!("unexpected panel {other:?}"),
    }
    assert_eq!(cache.len(), 1);

    let outcome = view.link_click("entry://run");
    assert!(matches!(outcome, Dispatch::InstantSearch(ref word) if word.as_str() == "run"));
    assert_eq!(view.hover().phase(), HoverPhase::Idle);
    let session = view.navigation().session();
    assert_eq!(session.keyword.as_deref(), Some("run"));
    assert_eq!(session.submitted, vec!["run"]);
    assert_eq!(session.scrolled, 1);
}

#[test]
fn touch_tap_pushes_word_page_without_preview() {
    let mut styles = StyleRegistry::new();
    let mut view = mount(&mut styles, Arc::new(PreviewCache::default()), DeviceMode::Touch);

    assert!(!view.hover_mut().pointer_enter("entry://run", anchor()));
    assert!(view.hover().scheduler().pending.is_empty());

    let outcome = view.link_click("entry://run");
    assert!(matches!(outcome, Dispatch::WordPage(_)));
    assert_eq!(view.navigation().router().paths, vec!["/word/run"]);
    assert!(view.navigation().session().submitted.is_empty());
}

#[test]
fn mangled_entry_link_resolves_to_its_word() {
    let mut styles = StyleRegistry::new();
    let mut view = mount(&mut styles, Arc::new(PreviewCache::default()), DeviceMode::Pointer);

    let words: Vec<_> = view
        .links()
        .iter()
        .filter_map(|link| link.word.as_ref().map(|word| word.to_string()))
        .collect();
    assert_eq!(words, vec!["run", "specialty"]);

    let outcome = view.link_click("/api/v1/resources/2/entry://specialty");
    assert!(matches!(outcome, Dispatch::InstantSearch(ref word) if word.as_str() == "specialty"));
    assert_eq!(view.link_click("https://example.com/walk"), Dispatch::Ignored);
}

#[test]
fn stylesheets_are_injected_once_per_page() {
    let mut styles = StyleRegistry::new();
    let cache = Arc::new(PreviewCache::default());
    let first = mount(&mut styles, Arc::clone(&cache), DeviceMode::Pointer);
    let second = mount(&mut styles, cache, DeviceMode::Pointer);

    assert_eq!(first.injected_styles().len(), 1);
    assert!(second.injected_styles().is_empty());
    assert_eq!(styles.len(), 1);
    assert!(!first.html().contains("<link"));
    first.unmount();
    second.unmount();
}

#[test]
fn failed_preview_is_retried_on_next_hover() {
    let mut styles = StyleRegistry::new();
    let mut view = mount(&mut styles, Arc::new(PreviewCache::default()), DeviceMode::Pointer);

    view.hover_mut().pointer_enter("entry://run", anchor());
    fire_next(&mut view);
    view.hover_mut()
        .preview_resolved("run", Err(FetchError::new("timeout")));
    assert!(matches!(
        view.hover().panel(),
        Some(PreviewPanel::Failed { .. })
    ));

    view.hover_mut().pointer_leave(PointerTarget::Elsewhere);
    assert_eq!(view.hover().phase(), HoverPhase::Idle);
    view.hover_mut().pointer_enter("entry://run", anchor());
    fire_next(&mut view);
    assert_eq!(view.hover().source().words, vec!["run", "run"]);
}

#[test]
fn outside_click_waits_for_arm_delay() {
    let mut styles = StyleRegistry::new();
    let mut view = mount(&mut styles, Arc::new(PreviewCache::default()), DeviceMode::Pointer);

    view.hover_mut().pointer_enter("entry://run", anchor());
    fire_next(&mut view);
    assert!(!view.hover_mut().document_click(ClickTarget::Outside));
    assert_eq!(view.hover().phase(), HoverPhase::Shown);

    assert!(fire_next(&mut view));
    assert!(view.hover_mut().document_click(ClickTarget::Outside));
    assert_eq!(view.hover().phase(), HoverPhase::Idle);
}

#[test]
fn view_full_entry_runs_instant_search_for_shown_word() {
    let mut styles = StyleRegistry::new();
    let mut view = mount(&mut styles, Arc::new(PreviewCache::default()), DeviceMode::Pointer);

    assert_eq!(view.open_full_entry(), Dispatch::Ignored);

    view.hover_mut().pointer_enter("entry://run", anchor());
    assert_eq!(view.open_full_entry(), Dispatch::Ignored);
    fire_next(&mut view);
    assert_eq!(view.hover().phase(), HoverPhase::Shown);

    let outcome = view.open_full_entry();
    assert!(matches!(outcome, Dispatch::InstantSearch(ref word) if word.as_str() == "run"));
    assert_eq!(view.hover().phase(), HoverPhase::Idle);
    assert!(view.hover().scheduler().pending.is_empty());
    let session = view.navigation().session();
    assert_eq!(session.keyword.as_deref(), Some("run"));
    assert_eq!(session.submitted, vec!["run"]);
    assert_eq!(session.scrolled, 1);
}

#[test]
fn switching_to_touch_closes_shown_preview() {
    let mut styles = StyleRegistry::new();
    let mut view = mount(&mut styles, Arc::new(PreviewCache::default()), DeviceMode::Pointer);

    view.hover_mut().pointer_enter("entry://run", anchor());
    fire_next(&mut view);
    assert_eq!(view.hover().phase(), HoverPhase::Shown);

    view.set_device_mode(DeviceMode::Touch);
    assert_eq!(view.device_mode(), DeviceMode::Touch);
    assert_eq!(view.hover().phase(), HoverPhase::Idle);
    assert!(view.hover().scheduler().pending.is_empty());

    let outcome = view.link_click("entry://run");
    assert!(matches!(outcome, Dispatch::WordPage(ref word) if word.as_str() == "run"));
    assert_eq!(view.navigation().router().paths, vec!["/word/run"]);
    assert!(view.navigation().session().submitted.is_empty());
}

#[test]
fn custom_namespaces_apply_to_styles_and_links() {
    let rules = LinkRules {
        asset_prefix: "/mdd/".to_string(),
        ..LinkRules::default()
    };
    let mut styles = StyleRegistry::new();
    let hover = HoverController::new(
        ManualClock::default(),
        Fetches::default(),
        Arc::new(PreviewCache::default()),
        DeviceMode::Pointer,
    )
    .with_rules(rules);
    let navigation = NavigationDispatcher::new(Session::default(), Router::default());
    let entry = r#"<link rel="stylesheet" href="/mdd/4/entry.css"><a href="/mdd/4/logo">logo</a>"#;
    let view: View = EntryView::mount(&result(4, "walk", entry), &mut styles, hover, navigation);

    assert_eq!(view.injected_styles().len(), 1);
    assert!(styles.contains("/mdd/4/entry.css"));
    assert_eq!(view.links().len(), 1);
    assert_eq!(view.links()[0].classification, LinkClassification::ResourceLink);
}
