//! DomAccessor - the browser boundary
//!
//! sharepo never owns a browser session. Everything it knows about the page
//! comes through an injected [`DomAccessor`], so the same page objects run
//! against a WebDriver binding, a CDP binding, or the in-memory
//! [`MockDom`](crate::mock::MockDom).

use serde::{Deserialize, Serialize};

use crate::locator::Selector;
use crate::result::ShareResult;

/// Handle to a DOM element returned by the driver.
///
/// Handles are only meaningful until the next DOM mutation; polling code
/// re-resolves selectors instead of holding on to them.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ElementHandle {
    /// Driver-assigned element id
    pub id: String,
    /// Element tag name
    pub tag_name: String,
}

impl ElementHandle {
    /// Create a new element handle
    #[must_use]
    pub fn new(id: impl Into<String>, tag_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            tag_name: tag_name.into(),
        }
    }
}

/// Identity of the currently loaded document
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageIdentity {
    /// Full URL of the document
    pub url: String,
    /// Document title
    pub title: String,
}

impl PageIdentity {
    /// Create a new page identity
    #[must_use]
    pub fn new(url: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            title: title.into(),
        }
    }

    /// Path component of the URL, without scheme, host, query or fragment
    #[must_use]
    pub fn path(&self) -> &str {
        let rest = self
            .url
            .split_once("://")
            .map_or(self.url.as_str(), |(_, rest)| {
                rest.find('/').map_or("", |i| &rest[i..])
            });
        let end = rest.find(['?', '#']).unwrap_or(rest.len());
        &rest[..end]
    }
}

/// Synchronous DOM accessor injected into every session.
///
/// `find_elements` returns an empty list when nothing matches; drivers that
/// only know how to fail may return
/// [`ShareError::ElementNotFound`](crate::ShareError::ElementNotFound)
/// instead, which pollers treat the same way.
pub trait DomAccessor: Send + Sync {
    /// Resolve every element matching the selector
    fn find_elements(&self, selector: &Selector) -> ShareResult<Vec<ElementHandle>>;

    /// Whether the element is displayed
    fn is_displayed(&self, element: &ElementHandle) -> ShareResult<bool>;

    /// Click the element
    fn click(&self, element: &ElementHandle) -> ShareResult<()>;

    /// Clear an input element
    fn clear(&self, element: &ElementHandle) -> ShareResult<()>;

    /// Type text into the element
    fn send_keys(&self, element: &ElementHandle, text: &str) -> ShareResult<()>;

    /// Visible text of the element
    fn text(&self, element: &ElementHandle) -> ShareResult<String>;

    /// URL and title of the loaded document
    fn current_document(&self) -> ShareResult<PageIdentity>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_path_strips_host_and_query() {
        let page = PageIdentity::new(
            "http://localhost:8080/share/page/site/swsdp/dashboard?x=1#top",
            "Alfresco » Site Dashboard",
        );
        assert_eq!(page.path(), "/share/page/site/swsdp/dashboard");
    }

    #[test]
    fn test_path_without_scheme() {
        let page = PageIdentity::new("/share/page/dologin", "");
        assert_eq!(page.path(), "/share/page/dologin");
    }

    #[test]
    fn test_path_host_only() {
        let page = PageIdentity::new("http://localhost:8080", "");
        assert_eq!(page.path(), "");
    }
}
