//! Sharepo: Page Objects for the Share Web Client
//!
//! Test code drives Share through page objects. Each page object declares
//! the elements that prove it has loaded; navigation hands back the kind of
//! page that is now showing.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                    SHAREPO Architecture                          │
//! ├─────────────────────────────────────────────────────────────────┤
//! │   ┌────────────┐    ┌────────────┐    ┌────────────┐            │
//! │   │ Page       │    │ Render     │    │ DOM        │            │
//! │   │ Object     │───►│ Protocol   │───►│ Accessor   │            │
//! │   │ (Session)  │    │ (polling)  │    │ (driver)   │            │
//! │   └────────────┘    └────────────┘    └────────────┘            │
//! │         │                                                        │
//! │         ▼                                                        │
//! │   ┌────────────┐    ┌────────────┐                               │
//! │   │ Page       │    │ Condition  │                               │
//! │   │ Factory    │    │ Evaluators │                               │
//! │   └────────────┘    └────────────┘                               │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```
//! use sharepo::prelude::*;
//!
//! let dom = MockDom::at("http://localhost:8080/share/page/dologin", "Login");
//! dom.insert(MockElement::new("user", Selector::id("username")));
//! let session = Session::new(&dom, ShareConfig::default().with_max_page_load_time(50));
//!
//! assert_eq!(session.current_page().unwrap(), PageKind::Login);
//! let handle = session.wait_for_visible(&Selector::id("username")).unwrap();
//! assert_eq!(handle.id, "user");
//! ```

#![warn(missing_docs)]

mod config;
#[allow(clippy::missing_errors_doc, clippy::must_use_candidate)]
mod driver;
#[allow(
    clippy::missing_errors_doc,
    clippy::must_use_candidate,
    clippy::missing_const_for_fn,
    clippy::doc_markdown
)]
mod evaluator;
#[allow(
    clippy::missing_errors_doc,
    clippy::must_use_candidate,
    clippy::missing_const_for_fn,
    clippy::unnecessary_wraps
)]
mod locator;
mod page;
mod render;
mod result;
mod retry;

/// Subscriber setup for `tracing` output
pub mod logging;

/// Scripted in-memory DOM
///
/// Drive page objects without a browser.
#[allow(
    clippy::missing_errors_doc,
    clippy::must_use_candidate,
    clippy::missing_const_for_fn,
    clippy::missing_panics_doc
)]
pub mod mock;

pub use config::{ShareConfig, DEFAULT_WAIT_TIME_MS};
pub use driver::{DomAccessor, ElementHandle, PageIdentity};
pub use evaluator::{
    ConditionEvaluator, EvaluatorRegistry, MatchRule, MetadataSource, NodeRef, ASPECTS_FIELD,
    TYPE_FIELD,
};
pub use locator::{ElementState, RenderElement, Selector};
pub use page::{PageFactory, PageKind, PageObject, PageResolver, Session, UrlMatcher};
pub use render::{
    element_render, is_still_displayed, wait_for_visible, wait_until_gone, RenderTime,
    DEFAULT_MAX_PAGE_LOAD_MS, DEFAULT_POLL_INTERVAL_MS,
};
pub use result::{ShareError, ShareResult};
pub use retry::{retry_with_backoff, RetryPolicy};

/// Prelude for convenient imports
pub mod prelude {
    pub use super::config::*;
    pub use super::driver::*;
    pub use super::evaluator::*;
    pub use super::locator::*;
    pub use super::mock::*;
    pub use super::page::*;
    pub use super::render::*;
    pub use super::result::*;
    pub use super::retry::*;
}
