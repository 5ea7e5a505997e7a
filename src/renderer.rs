//! The writing page's selection logic: rendering the article list, choosing the
//! active article (by click, deep link, or fragment change), and pushing the
//! chosen article into the content pane. All drawing goes through the
//! [`ArticleView`] trait so the state machine here is independent of the DOM.

use crate::article::{Article, ArticleStore};
use std::cell::RefCell;

/// Shown in place of the list when the store is empty.
pub const NO_ARTICLES: &str = "No articles yet.";

/// Shown in place of the list when the article document can't be loaded.
pub const LOAD_FAILED: &str = "Unable to load articles.";

/// The regions of the writing page the renderer draws into.
pub trait ArticleView {
    /// Replaces the list placeholder's text with `message`.
    fn show_message(&self, message: &str);

    /// Removes the placeholder and adds one entry per article, in order.
    fn render_entries(&self, articles: &[Article]);

    /// Marks exactly the entry for `id` as active.
    fn set_active(&self, id: &str);

    /// Fills the content pane from `article`.
    fn show_article(&self, article: &Article);

    /// Writes `id` into the URL fragment.
    fn set_fragment(&self, id: &str);
}

/// Whether a selection should be reflected into the URL fragment.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FragmentUpdate {
    Write,
    Keep,
}

/// Per-page-load state: the loaded articles and the current selection.
#[derive(Debug, Default)]
pub struct ArticleState {
    pub store: ArticleStore,
    pub selected: Option<String>,
}

/// Owns the writing page's [`ArticleState`] and its view.
pub struct ArticleRenderer<V> {
    view: V,
    state: RefCell<ArticleState>,
}

impl<V: ArticleView> ArticleRenderer<V> {
    pub fn new(view: V, store: ArticleStore) -> ArticleRenderer<V> {
        ArticleRenderer {
            view,
            state: RefCell::new(ArticleState {
                store,
                selected: None,
            }),
        }
    }

    pub fn view(&self) -> &V {
        &self.view
    }

    pub fn selected(&self) -> Option<String> {
        self.state.borrow().selected.clone()
    }

    /// Draws the list, or the empty-state message if there's nothing to list.
    pub fn render_list(&self) {
        let state = self.state.borrow();
        if state.store.is_empty() {
            self.view.show_message(NO_ARTICLES);
        } else {
            self.view.render_entries(state.store.articles());
        }
    }

    /// Selects the article with `id`. Unknown ids are ignored and leave the
    /// current selection in place; returns whether anything was selected.
    pub fn select(&self, id: &str, update: FragmentUpdate) -> bool {
        let article = match self.state.borrow().store.get(id) {
            Some(article) => article.clone(),
            None => {
                tracing::debug!(id, "ignoring selection of unknown article");
                return false;
            }
        };
        self.state.borrow_mut().selected = Some(article.id.clone());

        if update == FragmentUpdate::Write {
            self.view.set_fragment(&article.id);
        }
        self.view.set_active(&article.id);
        self.view.show_article(&article);
        true
    }

    /// Picks the article to show when the page first renders: the one named
    /// by `fragment`, or the most recent when there is no fragment. A fragment
    /// naming no known article selects nothing. The URL is left as it is.
    pub fn select_initial(&self, fragment: Option<&str>) -> bool {
        if let Some(id) = fragment.filter(|f| !f.is_empty()) {
            return self.select(id, FragmentUpdate::Keep);
        }
        let first = self.state.borrow().store.first().map(|a| a.id.clone());
        match first {
            Some(id) => self.select(&id, FragmentUpdate::Keep),
            None => false,
        }
    }

    /// Handles a fragment change. Reselecting the current article (e.g. the
    /// echo of our own [`ArticleView::set_fragment`]) is a no-op.
    pub fn on_fragment_change(&self, fragment: &str) -> bool {
        if fragment.is_empty() || self.selected().as_deref() == Some(fragment) {
            return false;
        }
        self.select(fragment, FragmentUpdate::Keep)
    }
}
