//! Page objects, page resolution and the session context
//!
//! Every screen of Share is a [`PageKind`]. After a navigating action the
//! session asks its [`PageResolver`] which kind is now loaded, and callers
//! state which kinds they accept. Page objects themselves hold no state;
//! they declare their render probes and borrow everything else from the
//! [`Session`] passed into each operation.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::ShareConfig;
use crate::driver::{DomAccessor, ElementHandle, PageIdentity};
use crate::locator::{RenderElement, Selector};
use crate::render::{self, RenderTime};
use crate::result::{ShareError, ShareResult};

// =============================================================================
// PAGE KINDS
// =============================================================================

/// Known Share screens and dialogs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PageKind {
    /// Login form
    Login,
    /// Personal dashboard
    UserDashboard,
    /// Site dashboard
    SiteDashboard,
    /// Site document library
    DocumentLibrary,
    /// Document details
    DocumentDetails,
    /// Advanced search form
    AdvancedSearch,
    /// Search results
    SearchResults,
    /// Create topic form of the discussions page
    CreateNewTopic,
    /// Saved search dashlet configuration dialog
    ConfigureSavedSearchDialog,
    /// Anything else
    Unknown,
}

impl PageKind {
    /// Name used in logs and error messages
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Login => "login",
            Self::UserDashboard => "user dashboard",
            Self::SiteDashboard => "site dashboard",
            Self::DocumentLibrary => "document library",
            Self::DocumentDetails => "document details",
            Self::AdvancedSearch => "advanced search",
            Self::SearchResults => "search results",
            Self::CreateNewTopic => "create new topic",
            Self::ConfigureSavedSearchDialog => "configure saved search dialog",
            Self::Unknown => "unknown",
        }
    }

    /// Whether this is one of the dashboards
    #[must_use]
    pub const fn is_dashboard(&self) -> bool {
        matches!(self, Self::UserDashboard | Self::SiteDashboard)
    }
}

impl fmt::Display for PageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// =============================================================================
// URL MATCHING
// =============================================================================

/// URL path matcher for page routes
#[derive(Debug, Clone)]
pub struct UrlMatcher {
    pattern: String,
    segments: Vec<UrlSegment>,
}

#[derive(Debug, Clone)]
enum UrlSegment {
    Literal(String),
    Wildcard,
    Parameter(String),
}

impl UrlMatcher {
    /// Create a matcher from a path pattern
    ///
    /// Patterns support:
    /// - Literal segments: `/page/dologin`
    /// - Wildcards: `/page/site/*/dashboard`
    /// - Named parameters: `/page/user/:user/dashboard`
    #[must_use]
    pub fn new(pattern: &str) -> Self {
        let segments = split(pattern)
            .map(|s| {
                if s == "*" {
                    UrlSegment::Wildcard
                } else if let Some(name) = s.strip_prefix(':') {
                    UrlSegment::Parameter(name.to_string())
                } else {
                    UrlSegment::Literal(s.to_string())
                }
            })
            .collect();

        Self {
            pattern: pattern.to_string(),
            segments,
        }
    }

    /// Check if a path matches; query and fragment are ignored
    #[must_use]
    pub fn matches(&self, path: &str) -> bool {
        let parts: Vec<&str> = split(path).collect();
        parts.len() == self.segments.len()
            && self
                .segments
                .iter()
                .zip(&parts)
                .all(|(segment, part)| match segment {
                    UrlSegment::Literal(lit) => lit == part,
                    UrlSegment::Wildcard | UrlSegment::Parameter(_) => true,
                })
    }

    /// Extract named parameters from a path
    #[must_use]
    pub fn extract_params(&self, path: &str) -> HashMap<String, String> {
        self.segments
            .iter()
            .zip(split(path))
            .filter_map(|(segment, part)| match segment {
                UrlSegment::Parameter(name) => Some((name.clone(), part.to_string())),
                _ => None,
            })
            .collect()
    }

    /// Get the original pattern
    #[must_use]
    pub fn pattern(&self) -> &str {
        &self.pattern
    }
}

fn split(path: &str) -> impl Iterator<Item = &str> {
    let end = path.find(['?', '#']).unwrap_or(path.len());
    path[..end].split('/').filter(|s| !s.is_empty())
}

// =============================================================================
// PAGE RESOLUTION
// =============================================================================

/// Decides which page is currently loaded
pub trait PageResolver: Send + Sync {
    /// Resolve the current page kind
    fn resolve(&self, dom: &dyn DomAccessor) -> ShareResult<PageKind>;
}

/// Default resolver: overlay probes first, then URL routes.
///
/// Overlays cover dialogs that open on top of another page without changing
/// the URL. They are checked with a single poll, never waited for.
#[derive(Debug, Clone, Default)]
pub struct PageFactory {
    overlays: Vec<(RenderElement, PageKind)>,
    routes: Vec<(UrlMatcher, PageKind)>,
}

impl PageFactory {
    /// Create a factory with no routes
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a factory with the standard Share routes and dialogs
    #[must_use]
    pub fn share() -> Self {
        Self::new()
            .with_overlay(
                RenderElement::visible(Selector::css(
                    "div[id$='default-configDialog-configDialog_c'][style*='visibility: visible']>div[id$='_default-configDialog-configDialog']",
                )),
                PageKind::ConfigureSavedSearchDialog,
            )
            .with_route("/share/page/dologin", PageKind::Login)
            .with_route("/share/page", PageKind::Login)
            .with_route("/share/page/user/:user/dashboard", PageKind::UserDashboard)
            .with_route("/share/page/site/:site/dashboard", PageKind::SiteDashboard)
            .with_route("/share/page/site/:site/documentlibrary", PageKind::DocumentLibrary)
            .with_route("/share/page/site/:site/document-details", PageKind::DocumentDetails)
            .with_route("/share/page/document-details", PageKind::DocumentDetails)
            .with_route("/share/page/advsearch", PageKind::AdvancedSearch)
            .with_route("/share/page/site/:site/advsearch", PageKind::AdvancedSearch)
            .with_route("/share/page/search", PageKind::SearchResults)
            .with_route("/share/page/dp/ws/faceted-search", PageKind::SearchResults)
            .with_route(
                "/share/page/site/:site/discussions-createtopic",
                PageKind::CreateNewTopic,
            )
    }

    /// Add a dialog recognised by a probe
    #[must_use]
    pub fn with_overlay(mut self, probe: RenderElement, kind: PageKind) -> Self {
        self.overlays.push((probe, kind));
        self
    }

    /// Add a URL route; earlier routes win
    #[must_use]
    pub fn with_route(mut self, pattern: &str, kind: PageKind) -> Self {
        self.routes.push((UrlMatcher::new(pattern), kind));
        self
    }

    /// Resolve from a document identity alone
    #[must_use]
    pub fn resolve_identity(&self, identity: &PageIdentity) -> PageKind {
        let path = identity.path();
        self.routes
            .iter()
            .find(|(matcher, _)| matcher.matches(path))
            .map_or(PageKind::Unknown, |(_, kind)| *kind)
    }
}

impl PageResolver for PageFactory {
    fn resolve(&self, dom: &dyn DomAccessor) -> ShareResult<PageKind> {
        for (probe, kind) in &self.overlays {
            match probe.check(dom) {
                Ok(true) => return Ok(*kind),
                Ok(false) => {}
                Err(err) if err.is_transient() => {}
                Err(err) => return Err(err),
            }
        }
        Ok(self.resolve_identity(&dom.current_document()?))
    }
}

// =============================================================================
// PAGE OBJECTS
// =============================================================================

/// A page object: one screen or dialog, identified by its render probes.
///
/// # Example
///
/// ```ignore
/// struct CreateNewTopicPage;
///
/// impl PageObject for CreateNewTopicPage {
///     const KIND: PageKind = PageKind::CreateNewTopic;
///
///     fn render_elements(&self) -> Vec<RenderElement> {
///         vec![
///             RenderElement::visible(Selector::css("div[id$='_discussions-createtopic'] h1")),
///             RenderElement::visible(Selector::css("button[id$='default-submit-button']")),
///         ]
///     }
/// }
///
/// let page = CreateNewTopicPage.render(&session)?;
/// ```
pub trait PageObject: Sized {
    /// The page kind this object models
    const KIND: PageKind;

    /// Probes that must all hold before the page is usable
    fn render_elements(&self) -> Vec<RenderElement>;

    /// Render with the session's maximum page load time
    fn render(self, session: &Session<'_>) -> ShareResult<Self> {
        let timer = RenderTime::new(session.config().max_page_load_time());
        self.render_with(session, &timer)
    }

    /// Render with an explicit deadline
    fn render_with(self, session: &Session<'_>, timer: &RenderTime) -> ShareResult<Self> {
        render::element_render(
            session.dom(),
            timer,
            &self.render_elements(),
            session.config().poll_interval(),
        )?;
        debug!(page = %Self::KIND, "page ready");
        Ok(self)
    }
}

// =============================================================================
// SESSION
// =============================================================================

/// Explicit context for every page operation
pub struct Session<'d> {
    dom: &'d dyn DomAccessor,
    config: ShareConfig,
    resolver: Box<dyn PageResolver>,
}

impl fmt::Debug for Session<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl<'d> Session<'d> {
    /// Create a session using the standard Share page factory
    #[must_use]
    pub fn new(dom: &'d dyn DomAccessor, config: ShareConfig) -> Self {
        Self::with_resolver(dom, config, PageFactory::share())
    }

    /// Create a session with a custom resolver
    #[must_use]
    pub fn with_resolver(
        dom: &'d dyn DomAccessor,
        config: ShareConfig,
        resolver: impl PageResolver + 'static,
    ) -> Self {
        Self {
            dom,
            config,
            resolver: Box::new(resolver),
        }
    }

    /// The injected DOM accessor
    #[must_use]
    pub fn dom(&self) -> &'d dyn DomAccessor {
        self.dom
    }

    /// The session configuration
    #[must_use]
    pub const fn config(&self) -> &ShareConfig {
        &self.config
    }

    /// Which page is loaded now
    pub fn current_page(&self) -> ShareResult<PageKind> {
        self.resolver.resolve(self.dom)
    }

    /// Resolve the current page and require it to be one of `expected`
    pub fn expect_page(&self, expected: &[PageKind]) -> ShareResult<PageKind> {
        let kind = self.current_page()?;
        if expected.contains(&kind) {
            return Ok(kind);
        }
        let names: Vec<&str> = expected.iter().map(PageKind::name).collect();
        Err(ShareError::page_operation(format!(
            "expected {} but resolved {kind}",
            names.join(" or ")
        )))
    }

    /// Find a single element that rendering already guaranteed.
    ///
    /// No waiting happens here; a missing element is a page operation
    /// failure, not a transient miss.
    pub fn find(&self, selector: &Selector) -> ShareResult<ElementHandle> {
        let not_found = || ShareError::page_operation(format!("unable to find {selector}"));
        match self.dom.find_elements(selector) {
            Ok(found) => found.into_iter().next().ok_or_else(not_found),
            Err(ShareError::ElementNotFound { .. }) => Err(not_found()),
            Err(err) => Err(err),
        }
    }

    /// Click the element matching `selector`
    pub fn click(&self, selector: &Selector) -> ShareResult<()> {
        let element = self.find(selector)?;
        self.dom.click(&element)
    }

    /// Clear the input matching `selector` and type `text`
    pub fn fill(&self, selector: &Selector, text: &str) -> ShareResult<()> {
        let element = self.find(selector)?;
        self.dom.clear(&element)?;
        self.dom.send_keys(&element, text)
    }

    /// Text of the element matching `selector`
    pub fn text_of(&self, selector: &Selector) -> ShareResult<String> {
        let element = self.find(selector)?;
        self.dom.text(&element)
    }

    /// Whether a single element matching `selector` is displayed right now.
    ///
    /// Missing or stale elements read as "not displayed"; driver failures
    /// propagate.
    pub fn is_element_displayed(&self, selector: &Selector) -> ShareResult<bool> {
        match RenderElement::visible(selector.clone()).check(self.dom) {
            Err(err) if err.is_transient() => Ok(false),
            other => other,
        }
    }

    /// Wait up to the maximum page load time for a displayed element
    pub fn wait_for_visible(&self, selector: &Selector) -> ShareResult<ElementHandle> {
        render::wait_for_visible(
            self.dom,
            selector,
            &RenderTime::new(self.config.max_page_load_time()),
            self.config.poll_interval(),
        )
    }

    /// Wait up to the maximum page load time for an element to disappear
    pub fn wait_until_gone(&self, selector: &Selector) -> ShareResult<()> {
        render::wait_until_gone(
            self.dom,
            selector,
            &RenderTime::new(self.config.max_page_load_time()),
            self.config.poll_interval(),
        )
    }

    /// Whether an element is still displayed after the default wait time
    pub fn is_still_displayed(&self, selector: &Selector) -> ShareResult<bool> {
        render::is_still_displayed(
            self.dom,
            selector,
            self.config.default_wait_time(),
            self.config.poll_interval(),
        )
    }

    /// Click, then resolve the page that follows and require one of
    /// `expected`
    pub fn click_and_resolve_next(
        &self,
        selector: &Selector,
        expected: &[PageKind],
    ) -> ShareResult<PageKind> {
        self.click(selector)?;
        let kind = self.expect_page(expected)?;
        debug!(%selector, page = %kind, "navigated");
        Ok(kind)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::mock::{ClickEffect, MockDom, MockElement};

    const DASHBOARD: &str = "http://localhost:8080/share/page/user/admin/dashboard";

    fn fast_config() -> ShareConfig {
        ShareConfig::new()
            .with_max_page_load_time(300)
            .with_default_wait_time(30)
            .with_poll_interval(2)
    }

    mod url_matcher_tests {
        use super::*;

        #[test]
        fn test_literal_match() {
            let matcher = UrlMatcher::new("/share/page/dologin");
            assert!(matcher.matches("/share/page/dologin"));
            assert!(!matcher.matches("/share/page/dologout"));
            assert!(!matcher.matches("/share/page/dologin/extra"));
        }

        #[test]
        fn test_wildcard_and_parameter() {
            let matcher = UrlMatcher::new("/share/page/site/*/dashboard");
            assert!(matcher.matches("/share/page/site/swsdp/dashboard"));
            assert!(!matcher.matches("/share/page/site/dashboard"));

            let matcher = UrlMatcher::new("/share/page/user/:user/dashboard");
            assert!(matcher.matches("/share/page/user/admin/dashboard"));
        }

        #[test]
        fn test_query_and_fragment_ignored() {
            let matcher = UrlMatcher::new("/share/page/search");
            assert!(matcher.matches("/share/page/search?t=report&s=ALL"));
            assert!(matcher.matches("/share/page/search#results"));
        }

        #[test]
        fn test_extract_params() {
            let matcher = UrlMatcher::new("/share/page/site/:site/document-details");
            let params = matcher.extract_params("/share/page/site/swsdp/document-details?nodeRef=x");
            assert_eq!(params.get("site").map(String::as_str), Some("swsdp"));
            assert_eq!(params.len(), 1);
            assert_eq!(matcher.pattern(), "/share/page/site/:site/document-details");
        }
    }

    mod factory_tests {
        use super::*;

        #[test]
        fn test_routes() {
            let factory = PageFactory::share();
            let cases = [
                ("http://h/share/page/dologin", PageKind::Login),
                ("http://h/share/page/user/admin/dashboard", PageKind::UserDashboard),
                ("http://h/share/page/site/swsdp/dashboard", PageKind::SiteDashboard),
                ("http://h/share/page/site/swsdp/documentlibrary#filter=path", PageKind::DocumentLibrary),
                ("http://h/share/page/advsearch", PageKind::AdvancedSearch),
                ("http://h/share/page/site/swsdp/discussions-createtopic", PageKind::CreateNewTopic),
                ("http://h/share/page/admin-console", PageKind::Unknown),
            ];
            for (url, kind) in cases {
                assert_eq!(factory.resolve_identity(&PageIdentity::new(url, "")), kind, "{url}");
            }
        }

        #[test]
        fn test_first_route_wins() {
            let factory = PageFactory::new()
                .with_route("/a/*", PageKind::SearchResults)
                .with_route("/a/b", PageKind::Login);
            assert_eq!(
                factory.resolve_identity(&PageIdentity::new("/a/b", "")),
                PageKind::SearchResults
            );
        }

        #[test]
        fn test_overlay_takes_precedence() {
            let dialog = Selector::css("div.dialog");
            let dom = MockDom::at(DASHBOARD, "Dashboard");
            let factory = PageFactory::share()
                .with_overlay(RenderElement::visible(dialog.clone()), PageKind::CreateNewTopic);

            assert_eq!(factory.resolve(&dom).unwrap(), PageKind::UserDashboard);
            dom.insert(MockElement::new("dlg", dialog));
            assert_eq!(factory.resolve(&dom).unwrap(), PageKind::CreateNewTopic);
        }

        #[test]
        fn test_resolve_propagates_driver_error() {
            let dom = MockDom::at(DASHBOARD, "Dashboard");
            dom.break_session("lost");
            assert!(matches!(PageFactory::share().resolve(&dom), Err(ShareError::Driver { .. })));
        }
    }

    mod session_tests {
        use super::*;

        #[test]
        fn test_expect_page_mismatch() {
            let dom = MockDom::at(DASHBOARD, "Dashboard");
            let session = Session::new(&dom, fast_config());

            assert_eq!(
                session.expect_page(&[PageKind::UserDashboard]).unwrap(),
                PageKind::UserDashboard
            );
            match session.expect_page(&[PageKind::Login, PageKind::SiteDashboard]) {
                Err(ShareError::PageOperation { message }) => {
                    assert_eq!(message, "expected login or site dashboard but resolved user dashboard");
                }
                other => panic!("expected page operation error, got {other:?}"),
            }
        }

        #[test]
        fn test_find_outside_polling_is_page_operation() {
            let dom = MockDom::at(DASHBOARD, "Dashboard");
            let session = Session::new(&dom, fast_config());
            let err = session.find(&Selector::css("button.missing")).unwrap_err();
            assert!(matches!(err, ShareError::PageOperation { .. }));
            assert!(err.to_string().contains("css=button.missing"));
        }

        #[test]
        fn test_fill_clears_then_types() {
            let dom = MockDom::at(DASHBOARD, "Dashboard");
            let title = Selector::css("input[name='title']");
            dom.insert(MockElement::new("title", title.clone()).with_tag("input"));
            let session = Session::new(&dom, fast_config());

            session.fill(&title, "old").unwrap();
            session.fill(&title, "my title").unwrap();
            assert_eq!(dom.typed_text("title").as_deref(), Some("my title"));
            assert_eq!(
                dom.history(),
                vec![
                    format!("navigate:{DASHBOARD}"),
                    "clear:title".to_string(),
                    "send_keys:title".to_string(),
                    "clear:title".to_string(),
                    "send_keys:title".to_string(),
                ]
            );
        }

        #[test]
        fn test_text_of() {
            let dom = MockDom::at(DASHBOARD, "Dashboard");
            let h1 = Selector::css("h1");
            dom.insert(MockElement::new("h1", h1.clone()).with_text("Create New Topic"));
            let session = Session::new(&dom, fast_config());
            assert_eq!(session.text_of(&h1).unwrap(), "Create New Topic");
        }

        #[test]
        fn test_is_element_displayed() {
            let dom = MockDom::at(DASHBOARD, "Dashboard");
            let balloon = Selector::css("div.balloon");
            let session = Session::new(&dom, fast_config());

            assert!(!session.is_element_displayed(&balloon).unwrap());
            dom.insert(MockElement::new("b", balloon.clone()));
            assert!(session.is_element_displayed(&balloon).unwrap());
        }

        #[test]
        fn test_is_element_displayed_propagates_lost_session() {
            let dom = MockDom::at(DASHBOARD, "Dashboard");
            let balloon = Selector::css("div.balloon");
            dom.insert(MockElement::new("b", balloon.clone()));
            let session = Session::new(&dom, fast_config());

            dom.break_session("session deleted");
            assert!(matches!(
                session.is_element_displayed(&balloon),
                Err(ShareError::Driver { .. })
            ));
        }

        #[test]
        fn test_click_and_resolve_next() {
            let dom = MockDom::at("http://h/share/page/dologin", "Login");
            let submit = Selector::css("button[type='submit']");
            dom.insert(MockElement::new("submit", submit.clone()).on_click(ClickEffect::Navigate(
                PageIdentity::new(DASHBOARD, "Dashboard"),
            )));
            let session = Session::new(&dom, fast_config());

            let next = session
                .click_and_resolve_next(&submit, &[PageKind::UserDashboard])
                .unwrap();
            assert_eq!(next, PageKind::UserDashboard);
        }

        #[test]
        fn test_click_and_resolve_unexpected_page() {
            let dom = MockDom::at("http://h/share/page/dologin", "Login");
            let submit = Selector::css("button[type='submit']");
            dom.insert(MockElement::new("submit", submit.clone()));
            let session = Session::new(&dom, fast_config());

            let err = session
                .click_and_resolve_next(&submit, &[PageKind::UserDashboard])
                .unwrap_err();
            assert!(matches!(err, ShareError::PageOperation { .. }));
        }

        #[test]
        fn test_is_still_displayed_uses_default_wait() {
            let dom = MockDom::at(DASHBOARD, "Dashboard");
            let dialog = Selector::css("div.dialog");
            dom.insert(MockElement::new("dlg", dialog.clone()));
            let session = Session::new(&dom, fast_config());

            assert!(session.is_still_displayed(&dialog).unwrap());
            dom.remove("dlg");
            assert!(!session.is_still_displayed(&dialog).unwrap());
            session.wait_until_gone(&dialog).unwrap();
        }
    }

    mod page_object_tests {
        use super::*;

        struct TopicPage;

        impl PageObject for TopicPage {
            const KIND: PageKind = PageKind::CreateNewTopic;

            fn render_elements(&self) -> Vec<RenderElement> {
                vec![
                    RenderElement::visible(Selector::css("div[id$='_discussions-createtopic'] h1")),
                    RenderElement::visible(Selector::css(
                        "button[id$='_discussions-createtopic_x0023_default-submit-button']",
                    )),
                ]
            }
        }

        #[test]
        fn test_render_returns_self() {
            let dom = MockDom::at("http://h/share/page/site/s/discussions-createtopic", "Topic");
            for probe in TopicPage.render_elements() {
                let id = probe.selector().value().to_string();
                dom.insert(MockElement::new(id, probe.selector().clone()).attached_after(2));
            }
            let session = Session::new(&dom, fast_config());

            let _page: TopicPage = TopicPage.render(&session).unwrap();
            assert_eq!(session.current_page().unwrap(), TopicPage::KIND);
        }

        #[test]
        fn test_render_times_out() {
            let dom = MockDom::at("http://h/share/page/site/s/discussions-createtopic", "Topic");
            let session = Session::new(&dom, fast_config());
            let err = TopicPage.render(&session).err().unwrap();
            assert!(err.is_timeout());
        }

        #[test]
        fn test_render_with_expired_timer() {
            let dom = MockDom::new();
            let session = Session::new(&dom, fast_config());
            let err = TopicPage
                .render_with(&session, &RenderTime::new(std::time::Duration::ZERO))
                .err()
                .unwrap();
            assert!(err.is_timeout());
            assert_eq!(dom.lookup_count(), 0);
        }
    }
}
