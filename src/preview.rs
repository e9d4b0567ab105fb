use crate::api::{FetchError, SearchResponse};
use crate::cache::PreviewCache;
use crate::device::DeviceMode;
use crate::link::{LinkRules, ResolvedWord};
use crate::placement::{AnchorRect, DEFAULT_PADDING, PanelSize, Viewport, place_popover};
use crate::popover::{Popover, PreviewLoad, PreviewPanel};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, trace, warn};

pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(300);
pub const DEFAULT_DISMISS_ARM_DELAY: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerId(pub u64);

/// One-shot timers owned by the host event loop.
pub trait Scheduler {
    fn schedule(&mut self, delay: Duration) -> TimerId;
    fn cancel(&mut self, timer: TimerId);
}

/// Starts a preview lookup. The result comes back through
/// [`HoverController::preview_resolved`].
pub trait PreviewSource {
    fn fetch_preview(&mut self, word: &str);
}

#[derive(Debug, Clone, Copy)]
pub struct HoverConfig {
    pub debounce: Duration,
    /// Delay before an outside click may dismiss a freshly shown preview.
    pub dismiss_arm_delay: Duration,
    pub panel: PanelSize,
    pub padding: f64,
}

impl Default for HoverConfig {
    fn default() -> Self {
        Self {
            debounce: DEFAULT_DEBOUNCE,
            dismiss_arm_delay: DEFAULT_DISMISS_ARM_DELAY,
            panel: PanelSize::default(),
            padding: DEFAULT_PADDING,
        }
    }
}

/// The word being previewed and where its anchor was.
#[derive(Debug, Clone, PartialEq)]
pub struct PreviewState {
    pub word: ResolvedWord,
    pub rect: AnchorRect,
}

#[derive(Debug, Clone, PartialEq)]
pub enum HoverState {
    Idle,
    Pending {
        preview: PreviewState,
        timer: TimerId,
    },
    Shown {
        preview: PreviewState,
        /// `None` once outside clicks may dismiss the preview.
        arm_timer: Option<TimerId>,
    },
}

enum FiredTimer {
    Debounce,
    DismissArm,
    Stale,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HoverPhase {
    Idle,
    Pending,
    Shown,
}

/// Where the pointer went when it left an element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerTarget {
    Anchor,
    Popover,
    Elsewhere,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClickTarget {
    Popover,
    Outside,
}

pub struct HoverController<S: Scheduler, F: PreviewSource> {
    config: HoverConfig,
    rules: LinkRules,
    mode: DeviceMode,
    scheduler: S,
    source: F,
    cache: Arc<PreviewCache>,
    state: HoverState,
    load: PreviewLoad,
    in_flight: HashSet<String>,
    disposed: bool,
}

impl<S: Scheduler, F: PreviewSource> HoverController<S, F> {
    pub fn new(scheduler: S, source: F, cache: Arc<PreviewCache>, mode: DeviceMode) -> Self {
        Self {
            config: HoverConfig::default(),
            rules: LinkRules::default(),
            mode,
            scheduler,
            source,
            cache,
            state: HoverState::Idle,
            load: PreviewLoad::Loading,
            in_flight: HashSet::new(),
            disposed: false,
        }
    }

    pub fn with_config(mut self, config: HoverConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_rules(mut self, rules: LinkRules) -> Self {
        self.rules = rules;
        self
    }

    pub fn rules(&self) -> &LinkRules {
        &self.rules
    }

    pub fn config(&self) -> &HoverConfig {
        &self.config
    }

    pub fn device_mode(&self) -> DeviceMode {
        self.mode
    }

    pub fn is_enabled(&self) -> bool {
        !self.disposed && self.mode.supports_hover()
    }

    pub fn state(&self) -> &HoverState {
        &self.state
    }

    pub fn phase(&self) -> HoverPhase {
        match self.state {
            HoverState::Idle => HoverPhase::Idle,
            HoverState::Pending { .. } => HoverPhase::Pending,
            HoverState::Shown { .. } => HoverPhase::Shown,
        }
    }

    pub fn scheduler(&self) -> &S {
        &self.scheduler
    }

    pub fn scheduler_mut(&mut self) -> &mut S {
        &mut self.scheduler
    }

    pub fn source(&self) -> &F {
        &self.source
    }

    /// The published preview; only set while `Shown`.
    pub fn preview(&self) -> Option<&PreviewState> {
        match &self.state {
            HoverState::Shown { preview, .. } => Some(preview),
            _ => None,
        }
    }

    /// Pointer entered a link. Starts the debounce when the href is an
    /// internal word reference and hover previews are enabled, replacing
    /// any earlier pending or shown preview.
    pub fn pointer_enter(&mut self, href: &str, rect: AnchorRect) -> bool {
        if !self.is_enabled() {
            return false;
        }
        let Some(word) = self.rules.resolve(href) else {
            return false;
        };
        if self.preview().is_some_and(|shown| shown.word == word) {
            return false;
        }
        self.cancel_timers();
        let timer = self.scheduler.schedule(self.config.debounce);
        debug!(word = %word, "hover pending");
        self.state = HoverState::Pending {
            preview: PreviewState { word, rect },
            timer,
        };
        true
    }

    /// Pointer left the anchor.
    pub fn pointer_leave(&mut self, to: PointerTarget) {
        match self.phase() {
            HoverPhase::Idle => {}
            HoverPhase::Pending => {
                trace!("hover cancelled before debounce");
                self.reset();
            }
            HoverPhase::Shown => {
                if to != PointerTarget::Popover {
                    self.reset();
                }
            }
        }
    }

    /// Pointer left the popover. Returning to the anchor keeps it open.
    pub fn popover_leave(&mut self, to: PointerTarget) {
        if matches!(self.state, HoverState::Shown { .. }) && to != PointerTarget::Anchor {
            self.reset();
        }
    }

    /// Host callback for a timer created by this controller. Returns
    /// whether the state changed; unknown or cancelled timers are ignored.
    pub fn timer_fired(&mut self, id: TimerId) -> bool {
        if self.disposed {
            return false;
        }
        let fired = match &self.state {
            HoverState::Pending { timer, .. } if *timer == id => FiredTimer::Debounce,
            HoverState::Shown {
                arm_timer: Some(timer),
                ..
            } if *timer == id => FiredTimer::DismissArm,
            _ => FiredTimer::Stale,
        };
        match fired {
            FiredTimer::Debounce => {
                let HoverState::Pending { preview, .. } =
                    std::mem::replace(&mut self.state, HoverState::Idle)
                else {
                    return false;
                };
                let arm_timer = self.scheduler.schedule(self.config.dismiss_arm_delay);
                debug!(word = %preview.word, "hover preview shown");
                let word = preview.word.clone();
                self.state = HoverState::Shown {
                    preview,
                    arm_timer: Some(arm_timer),
                };
                self.start_load(&word);
                true
            }
            FiredTimer::DismissArm => {
                if let HoverState::Shown { arm_timer, .. } = &mut self.state {
                    *arm_timer = None;
                }
                true
            }
            FiredTimer::Stale => {
                trace!(timer = id.0, "ignoring stale timer");
                false
            }
        }
    }

    fn start_load(&mut self, word: &ResolvedWord) {
        if let Some(response) = self.cache.get(word, Instant::now()) {
            self.load = PreviewLoad::Loaded(response);
            return;
        }
        self.load = PreviewLoad::Loading;
        if self.in_flight.insert(word.to_string()) {
            self.source.fetch_preview(word);
        }
    }

    /// Document-level click. Outside clicks dismiss a pending preview at
    /// once and a shown one after the arm delay has passed.
    pub fn document_click(&mut self, target: ClickTarget) -> bool {
        if target == ClickTarget::Popover {
            return false;
        }
        let dismiss = match &self.state {
            HoverState::Idle => false,
            HoverState::Pending { .. } => true,
            HoverState::Shown { arm_timer, .. } => arm_timer.is_none(),
        };
        if dismiss {
            debug!("preview dismissed by outside click");
            self.reset();
        }
        dismiss
    }

    /// Closes any pending or shown preview, returning its word.
    pub fn close(&mut self) -> Option<ResolvedWord> {
        let word = match &self.state {
            HoverState::Idle => None,
            HoverState::Pending { preview, .. } | HoverState::Shown { preview, .. } => {
                Some(preview.word.clone())
            }
        };
        self.reset();
        word
    }

    pub fn set_device_mode(&mut self, mode: DeviceMode) {
        self.mode = mode;
        if !mode.supports_hover() {
            self.reset();
        }
    }

    /// Delivers a preview fetch result. Results for a word other than the
    /// one currently shown are discarded; successful responses still go to
    /// the shared cache.
    pub fn preview_resolved(
        &mut self,
        word: &str,
        result: Result<SearchResponse, FetchError>,
    ) -> bool {
        self.in_flight.remove(word);
        if let Ok(response) = &result {
            self.cache.insert(word, response.clone(), Instant::now());
        }
        if self.disposed {
            return false;
        }
        let is_current = self
            .preview()
            .is_some_and(|preview| preview.word.as_str() == word);
        if !is_current {
            trace!(word, "discarding stale preview result");
            return false;
        }
        self.load = match result {
            Ok(response) => PreviewLoad::Loaded(response),
            Err(err) => {
                warn!(word, error = %err, "preview fetch failed");
                PreviewLoad::Failed(err.message().to_string())
            }
        };
        true
    }

    pub fn load(&self) -> Option<&PreviewLoad> {
        self.preview().map(|_| &self.load)
    }

    pub fn panel(&self) -> Option<PreviewPanel> {
        self.preview()
            .map(|preview| PreviewPanel::from_load(&preview.word, &self.load))
    }

    pub fn popover(&self, viewport: &Viewport) -> Option<Popover> {
        let preview = self.preview()?;
        let position = place_popover(
            &preview.rect,
            viewport,
            &self.config.panel,
            self.config.padding,
        );
        Some(Popover {
            position,
            panel: PreviewPanel::from_load(&preview.word, &self.load),
        })
    }

    /// Clears all timers and ignores every later event.
    pub fn teardown(&mut self) {
        if self.disposed {
            return;
        }
        self.reset();
        self.disposed = true;
        debug!("hover controller disposed");
    }

    fn reset(&mut self) {
        self.cancel_timers();
        self.state = HoverState::Idle;
        self.load = PreviewLoad::Loading;
    }

    fn cancel_timers(&mut self) {
        match &self.state {
            HoverState::Pending { timer, .. } => self.scheduler.cancel(*timer),
            HoverState::Shown {
                arm_timer: Some(timer),
                ..
            } => self.scheduler.cancel(*timer),
            _ => {}
        }
    }
}

impl<S: Scheduler, F: PreviewSource> Drop for HoverController<S, F> {
    fn drop(&mut self) {
        self.teardown();
    }
}
