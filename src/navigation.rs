use crate::device::DeviceMode;
use crate::link::ResolvedWord;
use percent_encoding::{NON_ALPHANUMERIC, utf8_percent_encode};
use tracing::debug;

/// Shared search state on the results page.
pub trait SearchSession {
    fn set_search_keyword(&mut self, word: &str);
    fn submit_search(&mut self, word: &str);
    fn scroll_to_top(&mut self);
}

pub trait WordRouter {
    fn navigate_to_word_page(&mut self, word: &str);
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatch {
    /// Pointer devices: the current page re-runs its search for the word.
    InstantSearch(ResolvedWord),
    /// Touch devices: a dedicated page for the word was pushed.
    WordPage(ResolvedWord),
    Ignored,
}

/// Decides how following a word link navigates, per device mode.
pub struct NavigationDispatcher<Q: SearchSession, R: WordRouter> {
    session: Q,
    router: R,
}

impl<Q: SearchSession, R: WordRouter> NavigationDispatcher<Q, R> {
    pub fn new(session: Q, router: R) -> Self {
        Self { session, router }
    }

    pub fn session(&self) -> &Q {
        &self.session
    }

    pub fn router(&self) -> &R {
        &self.router
    }

    /// A missing word is a no-op.
    pub fn dispatch(&mut self, word: Option<ResolvedWord>, mode: DeviceMode) -> Dispatch {
        let Some(word) = word else {
            return Dispatch::Ignored;
        };
        debug!(word = %word, %mode, "dispatching word navigation");
        match mode {
            DeviceMode::Pointer => {
                self.session.set_search_keyword(&word);
                self.session.submit_search(&word);
                self.session.scroll_to_top();
                Dispatch::InstantSearch(word)
            }
            DeviceMode::Touch => {
                self.router.navigate_to_word_page(&word);
                Dispatch::WordPage(word)
            }
        }
    }
}

/// Deep-link path of the per-word page.
pub fn word_page_path(word: &str) -> String {
    format!("/word/{}", utf8_percent_encode(word, NON_ALPHANUMERIC))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Session {
        calls: Vec<String>,
    }

    impl SearchSession for Session {
        fn set_search_keyword(&mut self, word: &str) {
            self.calls.push(format!("keyword:{word}"));
        }

        fn submit_search(&mut self, word: &str) {
            self.calls.push(format!("submit:{word}"));
        }

        fn scroll_to_top(&mut self) {
            self.calls.push("scroll".to_string());
        }
    }

    #[derive(Default)]
    struct Router {
        pages: Vec<String>,
    }

    impl WordRouter for Router {
        fn navigate_to_word_page(&mut self, word: &str) {
            self.pages.push(word_page_path(word));
        }
    }

    fn dispatcher() -> NavigationDispatcher<Session, Router> {
        NavigationDispatcher::new(Session::default(), Router::default())
    }

    #[test]
    fn pointer_runs_instant_search() {
        let mut dispatcher = dispatcher();
        let outcome = dispatcher.dispatch(ResolvedWord::new("run"), DeviceMode::Pointer);
        assert!(matches!(outcome, Dispatch::InstantSearch(ref w) if w.as_str() == "run"));
        assert_eq!(
            dispatcher.session().calls,
            vec!["keyword:run", "submit:run", "scroll"]
        );
        assert!(dispatcher.router().pages.is_empty());
    }

    #[test]
    fn touch_pushes_word_page() {
        let mut dispatcher = dispatcher();
        let outcome = dispatcher.dispatch(ResolvedWord::new("look up"), DeviceMode::Touch);
        assert!(matches!(outcome, Dispatch::WordPage(_)));
        assert_eq!(dispatcher.router().pages, vec!["/word/look%20up"]);
        assert!(dispatcher.session().calls.is_empty());
    }

    #[test]
    fn missing_word_is_ignored() {
        let mut dispatcher = dispatcher();
        assert_eq!(dispatcher.dispatch(None, DeviceMode::Pointer), Dispatch::Ignored);
        assert!(dispatcher.session().calls.is_empty());
    }
}
