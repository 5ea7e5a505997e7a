//! The writing page over the DOM: a [`DomArticleView`] for the
//! [`ArticleRenderer`], and the [`WritingPage`] that owns the page's listeners.

use super::align::Alignment;
use super::listener::EventListener;
use crate::alignment;
use crate::article::{Article, ArticleStore};
use crate::renderer::{ArticleRenderer, ArticleView, FragmentUpdate, LOAD_FAILED};
use crate::transition::TransitionConfig;
use std::rc::Rc;
use url::Url;
use wasm_bindgen::JsCast;
use web_sys::{Document, Element, Event, HtmlElement, HtmlImageElement, Window};

const ENTRY: &str = "article-list-entry";
const ACTIVE: &str = "active";

fn query<T: JsCast>(document: &Document, selector: &str) -> Option<T> {
    document
        .query_selector(selector)
        .ok()
        .flatten()
        .and_then(|e| e.dyn_into::<T>().ok())
}

fn set_displayed(element: &HtmlElement, displayed: bool) {
    let value = if displayed { "block" } else { "none" };
    if let Err(err) = element.style().set_property("display", value) {
        tracing::debug!(?err, "setting display");
    }
}

/// Element references for the writing page, looked up once at mount.
pub struct DomArticleView {
    window: Window,
    document: Document,
    list: Element,
    placeholder: Option<Element>,
    content: Option<Element>,
    date: Option<Element>,
    title: Option<Element>,
    image: Option<HtmlImageElement>,
    image_wrapper: Option<HtmlElement>,
    subhead: Option<HtmlElement>,
    body: Option<Element>,
}

impl DomArticleView {
    /// `None` if the document has no article list to render into.
    pub fn acquire(window: &Window, document: &Document) -> Option<DomArticleView> {
        let list = query::<Element>(document, ".article-list")?;
        let image = query::<HtmlImageElement>(document, ".article-image");
        let image_wrapper = image
            .as_ref()
            .and_then(|image| image.parent_element())
            .and_then(|parent| parent.dyn_into::<HtmlElement>().ok());
        Some(DomArticleView {
            window: window.clone(),
            document: document.clone(),
            placeholder: query(document, ".article-list-placeholder"),
            content: query(document, ".article-content"),
            date: query(document, ".article-date"),
            title: query(document, ".article-title"),
            subhead: query(document, ".article-subhead"),
            body: query(document, ".article-body"),
            list,
            image,
            image_wrapper,
        })
    }

    fn entry(&self, article: &Article) -> Option<Element> {
        let entry = self.document.create_element("a").ok()?;
        entry.set_class_name(ENTRY);
        entry.set_attribute("href", "#").ok()?;
        entry.set_attribute("data-id", &article.id).ok()?;
        for (class, text) in [
            ("article-list-entry-title", article.title.as_str()),
            ("article-list-entry-date", article.date_formatted.as_str()),
        ] {
            let span = self.document.create_element("span").ok()?;
            span.set_class_name(class);
            span.set_text_content(Some(text));
            entry.append_child(&span).ok()?;
        }
        Some(entry)
    }
}

impl ArticleView for DomArticleView {
    fn show_message(&self, message: &str) {
        if let Some(placeholder) = &self.placeholder {
            placeholder.set_text_content(Some(message));
        }
    }

    fn render_entries(&self, articles: &[Article]) {
        if let Some(placeholder) = &self.placeholder {
            placeholder.remove();
        }
        for article in articles {
            let appended = self
                .entry(article)
                .map(|entry| self.list.append_child(&entry).is_ok());
            if appended != Some(true) {
                tracing::warn!(id = %article.id, "failed to add list entry");
            }
        }
    }

    fn set_active(&self, id: &str) {
        let entries = match self.list.query_selector_all(&format!(".{}", ENTRY)) {
            Ok(entries) => entries,
            Err(_) => return,
        };
        for i in 0..entries.length() {
            if let Some(entry) = entries.item(i).and_then(|n| n.dyn_into::<Element>().ok()) {
                let active = entry.get_attribute("data-id").as_deref() == Some(id);
                let _ = entry.class_list().toggle_with_force(ACTIVE, active);
            }
        }
    }

    fn show_article(&self, article: &Article) {
        if let Some(content) = &self.content {
            let _ = content.class_list().remove_1("empty");
        }
        if let Some(date) = &self.date {
            date.set_text_content(Some(article.date_formatted.as_str()));
        }
        if let Some(title) = &self.title {
            title.set_text_content(Some(article.title.as_str()));
        }
        if let Some(image) = &self.image {
            image.set_src(&article.image_url);
            image.set_alt(&article.title);
        }
        if let Some(wrapper) = &self.image_wrapper {
            set_displayed(wrapper, !article.image_url.is_empty());
        }
        if let Some(subhead) = &self.subhead {
            subhead.set_text_content(Some(article.subhead.as_str()));
            set_displayed(subhead, !article.subhead.is_empty());
        }
        if let Some(body) = &self.body {
            body.set_inner_html(&article.content);
        }
    }

    fn set_fragment(&self, id: &str) {
        if let Err(err) = self.window.location().set_hash(id) {
            tracing::debug!(?err, id, "setting fragment");
        }
    }
}

/// A mounted writing page. Dropping it detaches everything it listens to.
pub struct WritingPage {
    renderer: Rc<ArticleRenderer<DomArticleView>>,
    _alignment: Alignment,
    _listeners: Vec<EventListener>,
}

impl WritingPage {
    /// Loads the articles named by `config` (relative to `url`, the page's
    /// address), renders them, and selects the deep-linked article from
    /// `url`'s fragment. `None` if the document isn't a writing page.
    pub async fn mount(config: &TransitionConfig, url: &Url) -> Option<WritingPage> {
        let window = web_sys::window()?;
        let document = window.document()?;
        let view = DomArticleView::acquire(&window, &document)?;

        let articles_url = url
            .join(&config.articles_url)
            .map(String::from)
            .unwrap_or_else(|_| config.articles_url.clone());
        let renderer = match ArticleStore::fetch(&articles_url).await {
            Ok(store) => {
                tracing::debug!(count = store.len(), "loaded articles");
                let renderer = ArticleRenderer::new(view, store);
                renderer.render_list();
                renderer.select_initial(url.fragment());
                renderer
            }
            Err(err) => {
                tracing::error!(%err, url = %articles_url, "failed to load articles");
                view.show_message(LOAD_FAILED);
                ArticleRenderer::new(view, ArticleStore::default())
            }
        };
        let renderer = Rc::new(renderer);

        let mut listeners = Vec::new();
        listeners.extend(list_clicks(&renderer));
        listeners.extend(fragment_changes(&window, &renderer));
        listeners.extend(view_toggles(&document));

        Some(WritingPage {
            _alignment: Alignment::mount(&window, &document, alignment::WRITING),
            _listeners: listeners,
            renderer,
        })
    }

    pub fn selected(&self) -> Option<String> {
        self.renderer.selected()
    }
}

fn list_clicks(renderer: &Rc<ArticleRenderer<DomArticleView>>) -> Option<EventListener> {
    let list = renderer.view().list.clone();
    let renderer = renderer.clone();
    EventListener::new(&list, "click", move |event: Event| {
        let id = event
            .target()
            .and_then(|t| t.dyn_into::<Element>().ok())
            .and_then(|t| t.closest(&format!(".{}", ENTRY)).ok().flatten())
            .and_then(|entry| entry.get_attribute("data-id"));
        if let Some(id) = id {
            event.prevent_default();
            renderer.select(&id, FragmentUpdate::Write);
        }
    })
    .map_err(|err| tracing::warn!(?err, "listening for list clicks"))
    .ok()
}

fn fragment_changes(
    window: &Window,
    renderer: &Rc<ArticleRenderer<DomArticleView>>,
) -> Option<EventListener> {
    let location = window.location();
    let renderer = renderer.clone();
    EventListener::new(window, "hashchange", move |_| {
        if let Ok(hash) = location.hash() {
            renderer.on_fragment_change(hash.trim_start_matches('#'));
        }
    })
    .map_err(|err| tracing::warn!(?err, "listening for fragment changes"))
    .ok()
}

/// The list/grid switch. Only the list view exists, so the grid button is
/// disabled in markup and ignored here.
fn view_toggles(document: &Document) -> Vec<EventListener> {
    let buttons: Vec<Element> = match document.query_selector_all(".toggle-btn") {
        Ok(nodes) => (0..nodes.length())
            .filter_map(|i| nodes.item(i))
            .filter_map(|n| n.dyn_into::<Element>().ok())
            .collect(),
        Err(_) => return Vec::new(),
    };
    let buttons = Rc::new(buttons);
    buttons
        .iter()
        .filter_map(|button| {
            let (clicked, all) = (button.clone(), buttons.clone());
            EventListener::new(button, "click", move |_| {
                if clicked.has_attribute("disabled") {
                    return;
                }
                for b in all.iter() {
                    let _ = b.class_list().remove_1(ACTIVE);
                }
                let _ = clicked.class_list().add_1(ACTIVE);
            })
            .ok()
        })
        .collect()
}
