//! The transition engine: reload-free navigation between the home and writing
//! pages. A transition is a single async pipeline of awaited stages,
//!
//! 1. exit (fade the current content out, lock scrolling)
//! 2. lanes (writing-bound, desktop only)
//! 3. stylesheet preload (writing-bound)
//! 4. fetch the destination page
//! 5. swap the body, then run the destination's post-swap hooks
//! 6. enter (fade the new content in, unlock scrolling)
//! 7. history update
//!
//! and any stage failure short-circuits to a full browser navigation to the
//! same URL, so the user is never left on a half-transitioned page.
//!
//! The engine never touches the DOM itself. It drives a [`PageHost`], which is
//! implemented over `web-sys` in [`crate::web`] and by a recording fake in the
//! tests below.

use crate::lanes::LaneAnimation;
use crate::navigation::{self, HistoryState, Link, NavigationTarget, PageKind};
use crate::page::{self, FetchedPage};
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;
use url::Url;

/// Tunables for the transition. The defaults match the site's stylesheets.
#[derive(Clone, Debug)]
pub struct TransitionConfig {
    /// How long to wait for a fade's `transitionend` before moving on anyway.
    pub fade_timeout_ms: u32,

    pub lane_duration_ms: f64,

    /// Where the second lane comes to rest, in pixels from the frame's left.
    pub first_gridline_px: f64,

    /// The narrowest viewport that gets the lane animation.
    pub desktop_min_width_px: u32,

    /// The writing page's stylesheet, relative to the site root.
    pub writing_stylesheet: String,

    /// The article document, relative to the writing page.
    pub articles_url: String,
}

impl Default for TransitionConfig {
    fn default() -> Self {
        TransitionConfig {
            fade_timeout_ms: 300,
            lane_duration_ms: 680.0,
            first_gridline_px: 244.0,
            desktop_min_width_px: 769,
            writing_stylesheet: String::from("styles/writing.css"),
            articles_url: String::from("data/articles.json"),
        }
    }
}

impl TransitionConfig {
    /// The media query that decides whether the lanes run.
    pub fn desktop_query(&self) -> String {
        format!("(min-width: {}px)", self.desktop_min_width_px)
    }
}

/// Whether a completed transition pushes a history entry. Transitions started
/// by back/forward already have their entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HistoryMode {
    Push,
    Keep,
}

/// How a call to [`TransitionEngine::navigate`] ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome {
    /// The new page is showing and history is up to date.
    Completed,

    /// Another transition was already running; this one was dropped.
    Busy,

    /// A stage failed and the browser was sent to the URL directly.
    FellBack,
}

/// The state of one in-flight transition. It's created when a navigation
/// starts and dropped when the new page has faded in or the fallback
/// navigation has been issued.
#[derive(Clone, Debug)]
pub struct TransitionSession {
    pub target: PageKind,
    pub url: Url,
    pub history: HistoryMode,

    /// Whether the lane animation runs for this transition.
    pub lanes: bool,

    /// The fetched destination markup, once stage 4 has run.
    pub html: Option<String>,

    /// The lanes' resting center, carried over to the destination layout.
    pub offset: Option<f64>,
}

/// The browser surface the engine drives. Methods are listed roughly in the
/// order the pipeline calls them.
#[allow(async_fn_in_trait)]
pub trait PageHost {
    /// The document's current URL.
    fn location(&self) -> Option<Url>;

    /// The page currently on screen, or `None` when the document has no page
    /// frame (in which case the engine stays out of the way).
    fn current_page(&self) -> Option<PageKind>;

    fn is_desktop(&self) -> bool;

    /// The page frame's rendered width in pixels.
    fn frame_width(&self) -> f64;

    /// Marks the frame as outgoing and locks scrolling.
    fn begin_exit(&self);

    /// Resolves when the opacity transition on the fade target for `content`
    /// ends, or after `timeout_ms`, whichever comes first.
    async fn wait_fade(&self, content: PageKind, timeout_ms: u32);

    /// Resolves on the next animation frame with its timestamp in
    /// milliseconds.
    async fn next_frame(&self) -> f64;

    /// Sets CSS custom properties on the page frame.
    fn set_frame_properties(&self, properties: &[(&str, String)]);

    fn has_stylesheet(&self, href: &str) -> bool;

    /// Inserts a stylesheet link and resolves once it has loaded or failed.
    async fn load_stylesheet(&self, href: &str);

    fn remove_stylesheet(&self, href: &str);

    /// Fetches the raw markup at `url`. Non-success statuses are errors.
    async fn fetch_page(&self, url: &Url) -> Result<String>;

    /// Replaces the live body and title with `page` and re-inserts its
    /// external scripts.
    fn swap_body(&self, page: &FetchedPage) -> Result<()>;

    /// Marks the new frame as incoming and applies the carried offset.
    fn prepare_incoming(&self, offset: Option<f64>);

    /// Starts the incoming fade.
    fn reveal_incoming(&self);

    /// Clears the transition classes and unlocks scrolling.
    fn finish_enter(&self);

    /// Unlocks scrolling after a failed transition, before the fallback
    /// navigation.
    fn restore(&self);

    fn push_history(&self, state: HistoryState, path: &str);

    /// Navigates the browser to `url` the ordinary way.
    fn hard_navigate(&self, url: &Url);
}

/// A callback run right after a swap to the page it's registered for. It
/// receives the destination URL, fragment included.
pub type PageHook = Rc<dyn Fn(&Url)>;

/// Runs page transitions, one at a time, over a [`PageHost`].
pub struct TransitionEngine<H> {
    host: H,
    config: TransitionConfig,
    in_flight: Cell<bool>,
    hooks: RefCell<Vec<(PageKind, PageHook)>>,
}

impl<H: PageHost> TransitionEngine<H> {
    pub fn new(host: H, config: TransitionConfig) -> TransitionEngine<H> {
        TransitionEngine {
            host,
            config,
            in_flight: Cell::new(false),
            hooks: RefCell::new(Vec::new()),
        }
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn config(&self) -> &TransitionConfig {
        &self.config
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight.get()
    }

    /// Registers `hook` to run whenever `page` has just been swapped in.
    pub fn on_page_ready(&self, page: PageKind, hook: impl Fn(&Url) + 'static) {
        self.hooks.borrow_mut().push((page, Rc::new(hook)));
    }

    /// Decides what a click on `link` should do. `Some` means the default
    /// action must be prevented and [`TransitionEngine::navigate`] run with
    /// the returned page and URL; `None` leaves the click to the browser.
    pub fn classify(&self, link: &Link) -> Option<(PageKind, Url)> {
        self.host.current_page()?;
        let location = self.host.location()?;
        let url = navigation::resolve(link, &location)?;
        match navigation::target_for_path(url.path()) {
            NavigationTarget::None => None,
            target => target.page().map(|page| (page, url)),
        }
    }

    /// Handles a history pop: if the restored path belongs to the other page,
    /// transitions to it without pushing a new entry. Returns `None` when
    /// there's nothing to do.
    pub async fn handle_pop(&self) -> Option<Outcome> {
        let current = self.host.current_page()?;
        let location = self.host.location()?;
        let wanted = PageKind::from_path(location.path());
        if wanted == current {
            return None;
        }
        Some(self.navigate(wanted, location, HistoryMode::Keep).await)
    }

    /// Transitions to `target` at `url`. Only one transition runs at a time;
    /// overlapping calls return [`Outcome::Busy`] without side effects.
    pub async fn navigate(&self, target: PageKind, url: Url, history: HistoryMode) -> Outcome {
        if self.in_flight.replace(true) {
            tracing::debug!(%target, %url, "transition already running; ignoring");
            return Outcome::Busy;
        }
        let _guard = InFlight(&self.in_flight);

        let leaving = match self.host.current_page() {
            Some(page) => page,
            None => {
                self.host.hard_navigate(&url);
                return Outcome::FellBack;
            }
        };

        let mut session = TransitionSession {
            target,
            url,
            history,
            lanes: target == PageKind::Writing && self.host.is_desktop(),
            html: None,
            offset: None,
        };
        tracing::debug!(from = %leaving, to = %target, url = %session.url, "starting transition");

        match self.run(leaving, &mut session).await {
            Ok(()) => {
                tracing::debug!(to = %target, "transition complete");
                Outcome::Completed
            }
            Err(err) => {
                tracing::warn!(%err, url = %session.url, "transition failed; navigating directly");
                self.host.restore();
                self.host.hard_navigate(&session.url);
                Outcome::FellBack
            }
        }
    }

    async fn run(&self, leaving: PageKind, session: &mut TransitionSession) -> Result<()> {
        let fade_ms = self.config.fade_timeout_ms;

        self.host.begin_exit();
        self.host.wait_fade(leaving, fade_ms).await;

        if session.lanes {
            session.offset = Some(self.animate_lanes().await);
        }

        if session.target == PageKind::Writing {
            self.preload_stylesheet().await;
        }

        let html = self.host.fetch_page(&session.url).await?;
        let page = FetchedPage::parse(session.html.insert(html), &session.url)?;

        self.host.swap_body(&page)?;
        self.host.prepare_incoming(session.offset);
        if session.target == PageKind::Home {
            self.host.remove_stylesheet(&self.config.writing_stylesheet);
        }
        self.run_hooks(session.target, &session.url);

        // Two frames so the swapped layout is committed before the fade-in
        // transition starts.
        self.host.next_frame().await;
        self.host.next_frame().await;
        self.host.reveal_incoming();
        self.host.wait_fade(session.target, fade_ms).await;
        self.host.finish_enter();

        if session.history == HistoryMode::Push {
            let path = navigation::history_path(session.target, &session.url);
            self.host.push_history(
                HistoryState {
                    page: session.target,
                },
                &path,
            );
        }
        Ok(())
    }

    /// Plays the lanes to their resting place and returns the center offset.
    async fn animate_lanes(&self) -> f64 {
        let lanes = LaneAnimation::new(
            self.host.frame_width(),
            self.config.first_gridline_px,
            self.config.lane_duration_ms,
        );
        let start = self.host.next_frame().await;
        let mut now = start;
        loop {
            let frame = lanes.frame(now - start);
            self.host.set_frame_properties(&frame.custom_properties());
            if frame.is_settled() {
                break;
            }
            now = self.host.next_frame().await;
        }
        self.host.next_frame().await;
        self.host.next_frame().await;
        lanes.center_px()
    }

    async fn preload_stylesheet(&self) {
        let href = &self.config.writing_stylesheet;
        if !self.host.has_stylesheet(href) {
            self.host.load_stylesheet(href).await;
        }
    }

    fn run_hooks(&self, page: PageKind, url: &Url) {
        let hooks: Vec<PageHook> = self
            .hooks
            .borrow()
            .iter()
            .filter(|(p, _)| *p == page)
            .map(|(_, hook)| hook.clone())
            .collect();
        for hook in hooks {
            hook(url);
        }
    }
}

struct InFlight<'a>(&'a Cell<bool>);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.set(false);
    }
}

/// The result of a fallible transition stage.
pub type Result<T> = std::result::Result<T, Error>;

/// Represents a failed transition stage. Every variant leads to the same
/// recovery: a direct browser navigation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Returned when the destination answers with a non-success status.
    Status { url: String, status: u16 },

    /// Returned when the request fails or the body can't be read.
    Network(String),

    /// Returned when the destination markup can't be processed.
    Page(page::Error),

    /// Returned when the live document can't be updated.
    Dom(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Status { url, status } => {
                write!(f, "fetching `{}`: HTTP status {}", url, status)
            }
            Error::Network(err) => write!(f, "network error: {}", err),
            Error::Page(err) => err.fmt(f),
            Error::Dom(err) => write!(f, "updating document: {}", err),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Status { .. } => None,
            Error::Network(_) => None,
            Error::Page(err) => Some(err),
            Error::Dom(_) => None,
        }
    }
}

impl From<page::Error> for Error {
    /// Converts a [`page::Error`] into an [`Error`] so the swap stage can use
    /// the `?` operator.
    fn from(err: page::Error) -> Error {
        Error::Page(err)
    }
}
