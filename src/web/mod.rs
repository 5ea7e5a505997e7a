//! The browser entry point. Wires the [`TransitionEngine`] to the live
//! document and keeps exactly one page module (home alignment or the writing
//! page) active at a time.

pub mod align;
pub mod console;
pub mod host;
pub mod listener;
pub mod writing;

use crate::alignment;
use crate::navigation::{Link, PageKind};
use crate::transition::{HistoryMode, PageHost, TransitionConfig, TransitionEngine};
use align::Alignment;
use host::DomHost;
use listener::EventListener;
use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};
use url::Url;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::spawn_local;
use web_sys::{Element, Event, MouseEvent};
use writing::WritingPage;

thread_local! {
    static APP: RefCell<Option<Rc<App>>> = RefCell::new(None);
}

#[wasm_bindgen(start)]
pub fn start() -> Result<(), JsValue> {
    console_error_panic_hook::set_once();
    console::init();

    let config = TransitionConfig::default();
    let host = DomHost::new(&config)?;
    let app = Rc::new(App {
        engine: TransitionEngine::new(host, config),
        active: RefCell::new(None),
        generation: Cell::new(0),
        listeners: RefCell::new(Vec::new()),
    });

    for page in [PageKind::Home, PageKind::Writing] {
        let weak = Rc::downgrade(&app);
        app.engine.on_page_ready(page, move |url| {
            if let Some(app) = weak.upgrade() {
                app.activate(page, url.clone(), true);
            }
        });
    }

    if app.engine.host().current_page().is_some() {
        app.listen(Rc::downgrade(&app))?;
    } else {
        tracing::debug!("no page frame; transitions disabled");
    }
    app.activate_current();

    APP.with(|slot| *slot.borrow_mut() = Some(app));
    Ok(())
}

enum ActivePage {
    Home(Alignment),
    Writing(WritingPage),
}

struct App {
    engine: TransitionEngine<DomHost>,
    active: RefCell<Option<ActivePage>>,
    /// Bumped on every activation so a slow writing-page mount can tell it
    /// has been superseded.
    generation: Cell<u64>,
    listeners: RefCell<Vec<EventListener>>,
}

impl App {
    fn listen(&self, weak: Weak<App>) -> Result<(), JsValue> {
        let host = self.engine.host();

        let clicks = {
            let weak = weak.clone();
            EventListener::new(host.document(), "click", move |event: Event| {
                if let Some(app) = weak.upgrade() {
                    app.on_click(&event);
                }
            })?
        };
        let pops = EventListener::new(host.window(), "popstate", move |_| {
            if let Some(app) = weak.upgrade() {
                spawn_local(async move {
                    if let Some(outcome) = app.engine.handle_pop().await {
                        tracing::debug!(?outcome, "handled history pop");
                    }
                });
            }
        })?;

        self.listeners.borrow_mut().extend([clicks, pops]);
        Ok(())
    }

    fn on_click(self: Rc<Self>, event: &Event) {
        if event.default_prevented() {
            return;
        }
        if let Some(mouse) = event.dyn_ref::<MouseEvent>() {
            let modified =
                mouse.meta_key() || mouse.ctrl_key() || mouse.shift_key() || mouse.alt_key();
            if modified || mouse.button() != 0 {
                return;
            }
        }
        let anchor = event
            .target()
            .and_then(|t| t.dyn_into::<Element>().ok())
            .and_then(|e| e.closest("a").ok().flatten());
        let anchor = match anchor {
            Some(anchor) => anchor,
            None => return,
        };

        let href = anchor.get_attribute("href");
        let target = anchor.get_attribute("target");
        let link = Link {
            href: href.as_deref(),
            target: target.as_deref(),
            download: anchor.has_attribute("download"),
        };
        if let Some((page, url)) = self.engine.classify(&link) {
            event.prevent_default();
            spawn_local(async move {
                let outcome = self.engine.navigate(page, url, HistoryMode::Push).await;
                tracing::debug!(?outcome, %page, "navigation finished");
            });
        }
    }

    /// Mounts the module for the page in the document now.
    fn activate_current(self: &Rc<Self>) {
        let url = match self.engine.host().location() {
            Some(url) => url,
            None => return,
        };
        let page = PageKind::from_path(url.path());
        self.activate(page, url, false);
    }

    /// Replaces the active page module. `swapped` is set when the document
    /// body has just been replaced and the layout may still be settling.
    fn activate(self: &Rc<Self>, page: PageKind, url: Url, swapped: bool) {
        let generation = self.generation.get().wrapping_add(1);
        self.generation.set(generation);
        // The old module's listeners go before the new ones are added.
        self.active.borrow_mut().take();

        let host = self.engine.host();
        match page {
            PageKind::Home => {
                let alignment = Alignment::mount(host.window(), host.document(), alignment::HOME);
                if swapped {
                    align::realign_soon(alignment::HOME);
                }
                *self.active.borrow_mut() = Some(ActivePage::Home(alignment));
            }
            PageKind::Writing => {
                let app = self.clone();
                spawn_local(async move {
                    let mounted = WritingPage::mount(app.engine.config(), &url).await;
                    if app.generation.get() != generation {
                        tracing::debug!("discarding superseded writing page");
                        return;
                    }
                    match mounted {
                        Some(page) => *app.active.borrow_mut() = Some(ActivePage::Writing(page)),
                        None => tracing::warn!("document has no article list"),
                    }
                });
            }
        }
    }
}
