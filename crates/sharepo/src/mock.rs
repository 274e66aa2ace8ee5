//! Scripted in-memory DOM for testing page objects without a browser.
//!
//! Elements can be scheduled to appear, become visible, or vanish after a
//! number of lookups of their selector, which lets tests reproduce a page
//! that is still rendering. Clicks can navigate or show/remove elements.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::driver::{DomAccessor, ElementHandle, PageIdentity};
use crate::locator::Selector;
use crate::result::{ShareError, ShareResult};

/// What happens when a mock element is clicked
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClickEffect {
    /// Load a new document
    Navigate(PageIdentity),
    /// Detach elements by id
    Remove(Vec<String>),
    /// Mark elements as displayed
    Show(Vec<String>),
}

/// A scripted element
#[derive(Debug, Clone)]
pub struct MockElement {
    id: String,
    selector: Selector,
    tag_name: String,
    text: String,
    displayed: bool,
    attached_after: usize,
    displayed_after: usize,
    detached_after: Option<usize>,
    on_click: Vec<ClickEffect>,
}

impl MockElement {
    /// Create a displayed element reachable through `selector`
    #[must_use]
    pub fn new(id: impl Into<String>, selector: Selector) -> Self {
        Self {
            id: id.into(),
            selector,
            tag_name: "div".to_string(),
            text: String::new(),
            displayed: true,
            attached_after: 0,
            displayed_after: 0,
            detached_after: None,
            on_click: Vec::new(),
        }
    }

    /// Set the tag name
    #[must_use]
    pub fn with_tag(mut self, tag_name: impl Into<String>) -> Self {
        self.tag_name = tag_name.into();
        self
    }

    /// Set the text content
    #[must_use]
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    /// Attach the element but keep it hidden
    #[must_use]
    pub const fn hidden(mut self) -> Self {
        self.displayed = false;
        self
    }

    /// Only match once the selector has been looked up `lookups` times
    #[must_use]
    pub const fn attached_after(mut self, lookups: usize) -> Self {
        self.attached_after = lookups;
        self
    }

    /// Report hidden until the selector has been looked up `lookups` times
    #[must_use]
    pub const fn displayed_after(mut self, lookups: usize) -> Self {
        self.displayed_after = lookups;
        self
    }

    /// Stop matching once the selector has been looked up `lookups` times
    #[must_use]
    pub const fn detached_after(mut self, lookups: usize) -> Self {
        self.detached_after = Some(lookups);
        self
    }

    /// Add a click effect
    #[must_use]
    pub fn on_click(mut self, effect: ClickEffect) -> Self {
        self.on_click.push(effect);
        self
    }

    fn is_attached(&self, lookups: usize) -> bool {
        lookups >= self.attached_after && self.detached_after.map_or(true, |n| lookups < n)
    }

    fn handle(&self) -> ElementHandle {
        ElementHandle::new(self.id.clone(), self.tag_name.clone())
    }
}

#[derive(Debug, Default)]
struct MockState {
    document: PageIdentity,
    elements: Vec<MockElement>,
    lookups: HashMap<Selector, usize>,
    typed: HashMap<String, String>,
    history: Vec<String>,
    broken: Option<String>,
}

impl MockState {
    fn lookups_of(&self, selector: &Selector) -> usize {
        self.lookups.get(selector).copied().unwrap_or(0)
    }

    fn live(&self, id: &str) -> ShareResult<&MockElement> {
        self.elements
            .iter()
            .find(|e| e.id == id && e.is_attached(self.lookups_of(&e.selector)))
            .ok_or_else(|| ShareError::StaleElement {
                element: id.to_string(),
            })
    }

    fn check_broken(&self) -> ShareResult<()> {
        match &self.broken {
            Some(message) => Err(ShareError::driver(message.clone())),
            None => Ok(()),
        }
    }
}

/// In-memory [`DomAccessor`] with scripted behaviour and call history
#[derive(Debug, Default)]
pub struct MockDom {
    state: Mutex<MockState>,
}

impl MockDom {
    /// Create an empty document
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty document with the given URL and title
    #[must_use]
    pub fn at(url: impl Into<String>, title: impl Into<String>) -> Self {
        let dom = Self::new();
        dom.navigate(PageIdentity::new(url, title));
        dom
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Add an element
    pub fn insert(&self, element: MockElement) {
        self.state().elements.push(element);
    }

    /// Detach an element
    pub fn remove(&self, id: &str) {
        self.state().elements.retain(|e| e.id != id);
    }

    /// Change the displayed flag of an element
    pub fn set_displayed(&self, id: &str, displayed: bool) {
        let mut state = self.state();
        for element in state.elements.iter_mut().filter(|e| e.id == id) {
            element.displayed = displayed;
            element.displayed_after = 0;
        }
    }

    /// Replace the loaded document and drop every element
    pub fn navigate(&self, document: PageIdentity) {
        let mut state = self.state();
        state.history.push(format!("navigate:{}", document.url));
        state.document = document;
        state.elements.clear();
        state.lookups.clear();
    }

    /// Make every subsequent call fail with a driver error
    pub fn break_session(&self, message: impl Into<String>) {
        self.state().broken = Some(message.into());
    }

    /// Number of `find_elements` calls made so far
    #[must_use]
    pub fn lookup_count(&self) -> usize {
        self.state().lookups.values().sum()
    }

    /// Text typed into an element since its last clear
    #[must_use]
    pub fn typed_text(&self, id: &str) -> Option<String> {
        self.state().typed.get(id).cloned()
    }

    /// Recorded calls, e.g. `click:ok-button`
    #[must_use]
    pub fn history(&self) -> Vec<String> {
        self.state().history.clone()
    }

    /// Check if a call with the given prefix was recorded
    #[must_use]
    pub fn was_called(&self, prefix: &str) -> bool {
        self.state().history.iter().any(|c| c.starts_with(prefix))
    }
}

impl DomAccessor for MockDom {
    fn find_elements(&self, selector: &Selector) -> ShareResult<Vec<ElementHandle>> {
        let mut state = self.state();
        state.check_broken()?;
        let lookups = state.lookups_of(selector) + 1;
        let _ = state.lookups.insert(selector.clone(), lookups);
        Ok(state
            .elements
            .iter()
            .filter(|e| &e.selector == selector && e.is_attached(lookups))
            .map(MockElement::handle)
            .collect())
    }

    fn is_displayed(&self, element: &ElementHandle) -> ShareResult<bool> {
        let state = self.state();
        state.check_broken()?;
        let live = state.live(&element.id)?;
        Ok(live.displayed && state.lookups_of(&live.selector) >= live.displayed_after)
    }

    fn click(&self, element: &ElementHandle) -> ShareResult<()> {
        let effects = {
            let mut state = self.state();
            state.check_broken()?;
            let effects = state.live(&element.id)?.on_click.clone();
            state.history.push(format!("click:{}", element.id));
            effects
        };
        for effect in effects {
            match effect {
                ClickEffect::Navigate(document) => self.navigate(document),
                ClickEffect::Remove(ids) => {
                    for id in &ids {
                        self.remove(id);
                    }
                }
                ClickEffect::Show(ids) => {
                    for id in &ids {
                        self.set_displayed(id, true);
                    }
                }
            }
        }
        Ok(())
    }

    fn clear(&self, element: &ElementHandle) -> ShareResult<()> {
        let mut state = self.state();
        state.check_broken()?;
        let _ = state.live(&element.id)?;
        state.history.push(format!("clear:{}", element.id));
        let _ = state.typed.remove(&element.id);
        Ok(())
    }

    fn send_keys(&self, element: &ElementHandle, text: &str) -> ShareResult<()> {
        let mut state = self.state();
        state.check_broken()?;
        let _ = state.live(&element.id)?;
        state.history.push(format!("send_keys:{}", element.id));
        state
            .typed
            .entry(element.id.clone())
            .or_default()
            .push_str(text);
        Ok(())
    }

    fn text(&self, element: &ElementHandle) -> ShareResult<String> {
        let state = self.state();
        state.check_broken()?;
        Ok(state.live(&element.id)?.text.clone())
    }

    fn current_document(&self) -> ShareResult<PageIdentity> {
        let state = self.state();
        state.check_broken()?;
        Ok(state.document.clone())
    }
}
