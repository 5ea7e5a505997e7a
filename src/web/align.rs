//! Keeps a page's text region lined up with its illustration as the layout
//! changes.

use super::host::next_frame;
use super::listener::EventListener;
use crate::alignment::{aligned_top, parse_px, AlignmentRule, Measurements};
use gloo_timers::future::TimeoutFuture;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::{spawn_local, JsFuture};
use web_sys::{
    Document, Element, EventTarget, HtmlElement, HtmlImageElement, HtmlMediaElement, Window,
};

const FRAME: &str = ".page-frame";

fn query(document: &Document, selector: &str) -> Option<Element> {
    document.query_selector(selector).ok().flatten()
}

/// Reads the live layout. `None` when the page lacks any of the pieces.
pub fn measure(
    window: &Window,
    document: &Document,
    rule: &AlignmentRule,
) -> Option<Measurements> {
    let illustration = query(document, rule.illustration)?;
    let frame = query(document, FRAME)?;
    let border = window
        .get_computed_style(&frame)
        .ok()
        .flatten()
        .and_then(|style| style.get_property_value("border-top-width").ok())
        .map_or(0.0, |value| parse_px(&value));
    Some(Measurements {
        frame_top: frame.get_bounding_client_rect().top(),
        frame_border_top: border,
        illustration_top: illustration.get_bounding_client_rect().top(),
    })
}

/// Measures and sets the target's `top`. Returns whether anything was set.
pub fn apply(window: &Window, document: &Document, rule: &AlignmentRule) -> bool {
    let target = query(document, rule.target).and_then(|e| e.dyn_into::<HtmlElement>().ok());
    let target = match target {
        Some(target) => target,
        None => return false,
    };
    let m = match measure(window, document, rule) {
        Some(m) => m,
        None => return false,
    };
    let top = format!("{}px", aligned_top(m, rule));
    if let Err(err) = target.style().set_property("top", &top) {
        tracing::debug!(?err, "setting aligned top");
        return false;
    }
    true
}

/// Aligns now, on the next frame, and again shortly after, for layouts that
/// are still settling (e.g. right after a body swap).
pub fn realign_soon(rule: AlignmentRule) {
    spawn_local(async move {
        let window = match web_sys::window() {
            Some(window) => window,
            None => return,
        };
        let document = match window.document() {
            Some(document) => document,
            None => return,
        };
        apply(&window, &document, &rule);
        next_frame(&window).await;
        apply(&window, &document, &rule);
        TimeoutFuture::new(250).await;
        apply(&window, &document, &rule);
    });
}

/// Alignment for one page, kept current until dropped.
pub struct Alignment {
    _listeners: Vec<EventListener>,
}

impl Alignment {
    pub fn mount(window: &Window, document: &Document, rule: AlignmentRule) -> Alignment {
        apply(window, document, &rule);

        let mut listeners = Vec::new();
        let mut listen = |target: &EventTarget, kind: &'static str| {
            let (w, d) = (window.clone(), document.clone());
            let added = EventListener::new(target, kind, move |_| {
                apply(&w, &d, &rule);
            });
            match added {
                Ok(listener) => listeners.push(listener),
                Err(err) => tracing::debug!(?err, kind, "adding alignment listener"),
            }
        };

        listen(window, "resize");

        match query(document, rule.illustration) {
            Some(media) => {
                if let Some(image) = media.dyn_ref::<HtmlImageElement>() {
                    if !image.complete() {
                        listen(image, "load");
                    }
                } else if let Some(video) = media.dyn_ref::<HtmlMediaElement>() {
                    listen(video, "loadeddata");
                    listeners.extend(hover_playback(video));
                }
            }
            None => tracing::debug!(selector = rule.illustration, "no illustration to align to"),
        }

        Alignment {
            _listeners: listeners,
        }
    }
}

/// Plays `video` while hovered.
fn hover_playback(video: &HtmlMediaElement) -> Vec<EventListener> {
    let play = {
        let v = video.clone();
        EventListener::new(video, "mouseenter", move |_| {
            if let Ok(promise) = v.play() {
                // Autoplay policies may reject; a paused video is fine.
                spawn_local(async move {
                    let _ = JsFuture::from(promise).await;
                });
            }
        })
    };
    let pause = {
        let v = video.clone();
        EventListener::new(video, "mouseleave", move |_| {
            let _ = v.pause();
        })
    };
    [play, pause]
        .into_iter()
        .filter_map(|listener| listener.map_err(|err| tracing::debug!(?err)).ok())
        .collect()
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::alignment::HOME;
    use wasm_bindgen_test::*;
    use web_sys::Event;

    wasm_bindgen_test_configure!(run_in_browser);

    const HOME_MARKUP: &str = r#"
        <div class="page-frame" style="margin-top: 10px; border-top: 3px solid black">
          <div class="illustration" style="padding-top: 40px">
            <img style="display: block; width: 10px; height: 10px">
          </div>
          <div class="text-columns" style="position: relative"></div>
        </div>"#;

    fn page(markup: &str) -> (Window, Document) {
        let window = web_sys::window().unwrap();
        let document = window.document().unwrap();
        document.body().unwrap().set_inner_html(markup);
        (window, document)
    }

    fn target_top(document: &Document) -> String {
        query(document, HOME.target)
            .unwrap()
            .dyn_into::<HtmlElement>()
            .unwrap()
            .style()
            .get_property_value("top")
            .unwrap()
    }

    #[wasm_bindgen_test]
    fn test_apply_lines_target_up_with_illustration() {
        let (window, document) = page(HOME_MARKUP);
        let m = measure(&window, &document, &HOME).unwrap();
        assert_eq!(3.0, m.frame_border_top);
        assert!(apply(&window, &document, &HOME));
        assert_eq!("40px", target_top(&document));
    }

    #[wasm_bindgen_test]
    fn test_apply_is_idempotent() {
        let (window, document) = page(HOME_MARKUP);
        assert!(apply(&window, &document, &HOME));
        let first = target_top(&document);
        assert!(apply(&window, &document, &HOME));
        assert!(apply(&window, &document, &HOME));
        assert_eq!(first, target_top(&document));
    }

    #[wasm_bindgen_test]
    fn test_apply_without_illustration_sets_nothing() {
        let (window, document) = page(r#"<div class="page-frame"><div class="text-columns"></div></div>"#);
        assert!(measure(&window, &document, &HOME).is_none());
        assert!(!apply(&window, &document, &HOME));
        assert_eq!("", target_top(&document));
    }

    #[wasm_bindgen_test]
    fn test_mounted_alignment_follows_resize_until_dropped() {
        let (window, document) = page(HOME_MARKUP);
        let alignment = Alignment::mount(&window, &document, HOME);
        assert_eq!("40px", target_top(&document));

        let target: HtmlElement = query(&document, HOME.target).unwrap().dyn_into().unwrap();
        target.style().remove_property("top").unwrap();
        window.dispatch_event(&Event::new("resize").unwrap()).unwrap();
        assert_eq!("40px", target_top(&document));

        drop(alignment);
        target.style().remove_property("top").unwrap();
        window.dispatch_event(&Event::new("resize").unwrap()).unwrap();
        assert_eq!("", target_top(&document));
    }
}
