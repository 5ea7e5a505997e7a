//! [`PageHost`] over `web-sys`: the page frame, its classes and custom
//! properties, scroll locking, fades, animation frames, the writing
//! stylesheet, fetching, body swaps, and history.

use super::listener::EventListener;
use crate::navigation::{HistoryState, PageKind};
use crate::page::{FetchedPage, ScriptRef};
use crate::transition::{Error, PageHost, Result, TransitionConfig};
use futures::channel::oneshot;
use gloo_net::http::Request;
use gloo_timers::future::TimeoutFuture;
use std::cell::RefCell;
use std::rc::Rc;
use url::Url;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{
    Document, Element, Event, EventTarget, HtmlElement, HtmlLinkElement, HtmlScriptElement,
    TransitionEvent, Window,
};

const FRAME: &str = ".page-frame";
const OUTGOING: &str = "page-transition-out";
const INCOMING: &str = "page-transition-in";
const INCOMING_VISIBLE: &str = "page-transition-in-visible";
const WRITING_PAGE: &str = "writing-page";
const CARRIED_OFFSET: &str = "--writing-gridline-2";

/// Resolves on the window's next animation frame with its timestamp. If a
/// frame can't be requested, resolves immediately with the wall clock.
pub async fn next_frame(window: &Window) -> f64 {
    let (tx, rx) = oneshot::channel::<f64>();
    let callback = Closure::once_into_js(move |timestamp: f64| {
        let _ = tx.send(timestamp);
    });
    if let Err(err) = window.request_animation_frame(callback.unchecked_ref()) {
        tracing::debug!(?err, "requestAnimationFrame failed");
        return js_sys::Date::now();
    }
    rx.await.unwrap_or_else(|_| js_sys::Date::now())
}

/// Holds the window and document the engine drives.
pub struct DomHost {
    window: Window,
    document: Document,
    desktop_query: String,
}

impl DomHost {
    pub fn new(config: &TransitionConfig) -> std::result::Result<DomHost, JsValue> {
        let window = web_sys::window().ok_or_else(|| JsValue::from_str("no window"))?;
        let document = window
            .document()
            .ok_or_else(|| JsValue::from_str("no document"))?;
        Ok(DomHost {
            window,
            document,
            desktop_query: config.desktop_query(),
        })
    }

    pub fn window(&self) -> &Window {
        &self.window
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    /// The page frame. Re-queried on every call since a swap replaces it.
    fn frame(&self) -> Option<HtmlElement> {
        self.document
            .query_selector(FRAME)
            .ok()
            .flatten()
            .and_then(|e| e.dyn_into::<HtmlElement>().ok())
    }

    fn set_scroll_locked(&self, locked: bool) {
        let value = if locked { "hidden" } else { "" };
        let root = self
            .document
            .document_element()
            .and_then(|e| e.dyn_into::<HtmlElement>().ok());
        for element in root.into_iter().chain(self.document.body()) {
            if let Err(err) = element.style().set_property("overflow", value) {
                tracing::debug!(?err, "setting overflow");
            }
        }
    }

    fn fade_target(&self, frame: &HtmlElement, content: PageKind) -> Element {
        frame
            .query_selector(content.fade_selector())
            .ok()
            .flatten()
            .unwrap_or_else(|| frame.clone().into())
    }

    fn stylesheet(&self, href: &str) -> Option<Element> {
        let name = href.rsplit('/').next().unwrap_or(href);
        self.document
            .head()?
            .query_selector(&format!("link[href*=\"{}\"]", name))
            .ok()
            .flatten()
    }

    fn create_script(&self, script: &ScriptRef) -> std::result::Result<HtmlScriptElement, JsValue> {
        let element: HtmlScriptElement = self
            .document
            .create_element("script")?
            .dyn_into()
            .map_err(JsValue::from)?;
        element.set_src(&script.src);
        // Inserted scripts are already async unless told otherwise; only the
        // flags the original element carried are set.
        if script.is_async {
            element.set_async(true);
        }
        if script.defer {
            element.set_defer(true);
        }
        Ok(element)
    }

    fn toggle_frame_classes(&self, add: &[&str], remove: &[&str]) {
        if let Some(frame) = self.frame() {
            let classes = frame.class_list();
            for class in add {
                let _ = classes.add_1(class);
            }
            for class in remove {
                let _ = classes.remove_1(class);
            }
        }
    }
}

/// Listens for each of `kinds` on `target`; the receiver resolves the first
/// time an accepted event arrives. When no listener could be registered the
/// sender is dropped and the receiver resolves straight away.
fn first_of(
    target: &EventTarget,
    kinds: &[&'static str],
    accept: impl Fn(&Event) -> bool + 'static,
) -> (Vec<EventListener>, oneshot::Receiver<()>) {
    let (tx, rx) = oneshot::channel::<()>();
    let tx = Rc::new(RefCell::new(Some(tx)));
    let accept = Rc::new(accept);
    let listeners = kinds
        .iter()
        .filter_map(|kind| {
            let tx = tx.clone();
            let accept = accept.clone();
            EventListener::new(target, *kind, move |event: Event| {
                if accept(&event) {
                    if let Some(tx) = tx.borrow_mut().take() {
                        let _ = tx.send(());
                    }
                }
            })
            .map_err(|err| tracing::debug!(?err, kind, "adding listener"))
            .ok()
        })
        .collect();
    (listeners, rx)
}

impl PageHost for DomHost {
    fn location(&self) -> Option<Url> {
        let href = self.window.location().href().ok()?;
        Url::parse(&href).ok()
    }

    fn current_page(&self) -> Option<PageKind> {
        let frame = self.frame()?;
        Some(if frame.class_list().contains(WRITING_PAGE) {
            PageKind::Writing
        } else {
            PageKind::Home
        })
    }

    fn is_desktop(&self) -> bool {
        self.window
            .match_media(&self.desktop_query)
            .ok()
            .flatten()
            .map_or(false, |query| query.matches())
    }

    fn frame_width(&self) -> f64 {
        self.frame()
            .map_or(0.0, |frame| frame.get_bounding_client_rect().width())
    }

    fn begin_exit(&self) {
        self.toggle_frame_classes(&[OUTGOING], &[]);
        self.set_scroll_locked(true);
    }

    async fn wait_fade(&self, content: PageKind, timeout_ms: u32) {
        let timeout = TimeoutFuture::new(timeout_ms);
        let target = match self.frame() {
            Some(frame) => self.fade_target(&frame, content),
            None => return timeout.await,
        };
        let (listeners, ended) = first_of(&target, &["transitionend"], |event| {
            event
                .dyn_ref::<TransitionEvent>()
                .map_or(true, |e| e.property_name() == "opacity")
        });
        if listeners.is_empty() {
            return timeout.await;
        }
        futures::future::select(ended, Box::pin(timeout)).await;
    }

    async fn next_frame(&self) -> f64 {
        next_frame(&self.window).await
    }

    fn set_frame_properties(&self, properties: &[(&str, String)]) {
        if let Some(frame) = self.frame() {
            let style = frame.style();
            for (name, value) in properties {
                if let Err(err) = style.set_property(name, value) {
                    tracing::debug!(?err, name, "setting frame property");
                }
            }
        }
    }

    fn has_stylesheet(&self, href: &str) -> bool {
        self.stylesheet(href).is_some()
    }

    async fn load_stylesheet(&self, href: &str) {
        let head = match self.document.head() {
            Some(head) => head,
            None => return,
        };
        let link: HtmlLinkElement = match self
            .document
            .create_element("link")
            .and_then(|e| e.dyn_into().map_err(JsValue::from))
        {
            Ok(link) => link,
            Err(err) => {
                tracing::warn!(?err, href, "creating stylesheet link");
                return;
            }
        };
        link.set_rel("stylesheet");
        link.set_href(href);

        // A failed load still lets the transition continue; the page is just
        // unstyled rather than stuck.
        let (_listeners, settled) = first_of(&link, &["load", "error"], |_| true);
        if let Err(err) = head.append_child(&link) {
            tracing::warn!(?err, href, "inserting stylesheet link");
            return;
        }
        let _ = settled.await;
    }

    fn remove_stylesheet(&self, href: &str) {
        if let Some(link) = self.stylesheet(href) {
            link.remove();
        }
    }

    async fn fetch_page(&self, url: &Url) -> Result<String> {
        let response = Request::get(url.as_str())
            .send()
            .await
            .map_err(|e| Error::Network(e.to_string()))?;
        if !response.ok() {
            return Err(Error::Status {
                url: url.to_string(),
                status: response.status(),
            });
        }
        response
            .text()
            .await
            .map_err(|e| Error::Network(e.to_string()))
    }

    fn swap_body(&self, page: &FetchedPage) -> Result<()> {
        let body = self
            .document
            .body()
            .ok_or_else(|| Error::Dom(String::from("document has no body")))?;
        body.set_inner_html(&page.body_html);
        if let Some(title) = &page.title {
            self.document.set_title(title);
        }
        for script in &page.scripts {
            let appended = self
                .create_script(script)
                .and_then(|element| body.append_child(&element));
            if let Err(err) = appended {
                tracing::warn!(?err, src = %script.src, "re-inserting script");
            }
        }
        Ok(())
    }

    fn prepare_incoming(&self, offset: Option<f64>) {
        self.toggle_frame_classes(&[INCOMING], &[]);
        if let Some(offset) = offset {
            self.set_frame_properties(&[(CARRIED_OFFSET, format!("{}px", offset))]);
        }
    }

    fn reveal_incoming(&self) {
        self.toggle_frame_classes(&[INCOMING_VISIBLE], &[]);
    }

    fn finish_enter(&self) {
        self.toggle_frame_classes(&[], &[INCOMING, INCOMING_VISIBLE]);
        self.set_scroll_locked(false);
    }

    fn restore(&self) {
        self.set_scroll_locked(false);
    }

    fn push_history(&self, state: HistoryState, path: &str) {
        let pushed = serde_wasm_bindgen::to_value(&state)
            .map_err(JsValue::from)
            .and_then(|state| {
                self.window
                    .history()?
                    .push_state_with_url(&state, "", Some(path))
            });
        if let Err(err) = pushed {
            tracing::warn!(?err, path, "pushing history entry");
        }
    }

    fn hard_navigate(&self, url: &Url) {
        if let Err(err) = self.window.location().set_href(url.as_str()) {
            tracing::error!(?err, %url, "navigating");
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use wasm_bindgen_test::*;

    wasm_bindgen_test_configure!(run_in_browser);

    fn host() -> DomHost {
        DomHost::new(&TransitionConfig::default()).unwrap()
    }

    fn script(src: &str, is_async: bool, defer: bool) -> ScriptRef {
        ScriptRef {
            src: String::from(src),
            is_async,
            defer,
        }
    }

    #[wasm_bindgen_test]
    fn test_swap_body_recreates_scripts_with_their_flags() {
        let host = host();
        let page = FetchedPage {
            title: Some(String::from("Writing")),
            body_html: String::from(r#"<div class="page-frame writing-page"></div>"#),
            scripts: vec![
                script("data:text/javascript,void%200", false, true),
                script("data:text/javascript,void%201", true, false),
            ],
        };
        host.swap_body(&page).unwrap();

        let document = host.document();
        assert_eq!("Writing", document.title());
        assert_eq!(Some(PageKind::Writing), host.current_page());

        let scripts = document.body().unwrap().query_selector_all("script").unwrap();
        assert_eq!(2, scripts.length());
        let first: HtmlScriptElement = scripts.get(0).unwrap().dyn_into().unwrap();
        assert_eq!("data:text/javascript,void%200", first.src());
        assert!(first.has_attribute("defer"));
        assert!(!first.has_attribute("async"));
        let second: HtmlScriptElement = scripts.get(1).unwrap().dyn_into().unwrap();
        assert!(second.has_attribute("async"));
        assert!(!second.has_attribute("defer"));
    }

    #[wasm_bindgen_test]
    async fn test_wait_fade_times_out_without_transition() {
        let host = host();
        host.document()
            .body()
            .unwrap()
            .set_inner_html(r#"<div class="page-frame"><div class="text-columns"></div></div>"#);
        let started = js_sys::Date::now();
        host.wait_fade(PageKind::Home, 300).await;
        // Timers may fire a little early under load.
        assert!(js_sys::Date::now() - started >= 290.0);
    }

    #[wasm_bindgen_test]
    async fn test_load_stylesheet_settles_on_error() {
        let host = host();
        let href = "styles/missing-stylesheet.css";
        assert!(!host.has_stylesheet(href));
        host.load_stylesheet(href).await;
        assert!(host.has_stylesheet(href));
        host.remove_stylesheet(href);
        assert!(!host.has_stylesheet(href));
    }

    #[wasm_bindgen_test]
    fn test_push_history_records_page() {
        let host = host();
        let path = host.window().location().pathname().unwrap();
        host.push_history(
            HistoryState {
                page: PageKind::Writing,
            },
            &path,
        );
        let state = host.window().history().unwrap().state().unwrap();
        let page = js_sys::Reflect::get(&state, &JsValue::from_str("page")).unwrap();
        assert_eq!(Some(String::from("writing")), page.as_string());
    }

    #[wasm_bindgen_test]
    fn test_scroll_lock_round_trip() {
        let host = host();
        host.document()
            .body()
            .unwrap()
            .set_inner_html(r#"<div class="page-frame"></div>"#);
        host.begin_exit();
        let body = host.document().body().unwrap();
        assert_eq!("hidden", body.style().get_property_value("overflow").unwrap());
        assert!(host.frame().unwrap().class_list().contains(OUTGOING));
        host.restore();
        assert_eq!("", body.style().get_property_value("overflow").unwrap());
    }
}
