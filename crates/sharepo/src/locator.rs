//! Selectors and render probes.
//!
//! A [`RenderElement`] pairs a [`Selector`] with the [`ElementState`] the
//! page needs before it counts as rendered. Probes are immutable and are
//! re-resolved against the live DOM on every poll.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::driver::DomAccessor;
use crate::result::{ShareError, ShareResult};

/// Selector strategy for locating elements
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "by", content = "value", rename_all = "snake_case")]
pub enum Selector {
    /// CSS selector (e.g., "button[id$='default-ok-button']")
    Css(String),
    /// XPath expression
    XPath(String),
    /// Element id attribute
    Id(String),
    /// Element name attribute
    Name(String),
    /// Anchor with the exact link text
    LinkText(String),
}

impl Selector {
    /// Create a CSS selector
    #[must_use]
    pub fn css(selector: impl Into<String>) -> Self {
        Self::Css(selector.into())
    }

    /// Create an XPath selector
    #[must_use]
    pub fn xpath(expression: impl Into<String>) -> Self {
        Self::XPath(expression.into())
    }

    /// Create an id selector
    #[must_use]
    pub fn id(id: impl Into<String>) -> Self {
        Self::Id(id.into())
    }

    /// Create a name selector
    #[must_use]
    pub fn name(name: impl Into<String>) -> Self {
        Self::Name(name.into())
    }

    /// Create a link text selector
    #[must_use]
    pub fn link_text(text: impl Into<String>) -> Self {
        Self::LinkText(text.into())
    }

    /// Strategy name as used by WebDriver-style locators
    #[must_use]
    pub const fn strategy(&self) -> &'static str {
        match self {
            Self::Css(_) => "css",
            Self::XPath(_) => "xpath",
            Self::Id(_) => "id",
            Self::Name(_) => "name",
            Self::LinkText(_) => "link text",
        }
    }

    /// The raw selector expression
    #[must_use]
    pub fn value(&self) -> &str {
        match self {
            Self::Css(v) | Self::XPath(v) | Self::Id(v) | Self::Name(v) | Self::LinkText(v) => v,
        }
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.strategy(), self.value())
    }
}

/// State an element must be in for a probe to hold
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ElementState {
    /// Attached and displayed
    #[default]
    Visible,
    /// Attached, displayed or not
    Present,
    /// Nothing matching is displayed (no match at all also qualifies)
    Invisible,
}

impl fmt::Display for ElementState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Visible => write!(f, "visible"),
            Self::Present => write!(f, "present"),
            Self::Invisible => write!(f, "invisible"),
        }
    }
}

/// A render probe: "the element matching `selector` is in `state`".
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RenderElement {
    selector: Selector,
    state: ElementState,
}

impl RenderElement {
    /// Create a probe with an explicit state
    #[must_use]
    pub const fn new(selector: Selector, state: ElementState) -> Self {
        Self { selector, state }
    }

    /// Probe requiring a single displayed element
    #[must_use]
    pub const fn visible(selector: Selector) -> Self {
        Self::new(selector, ElementState::Visible)
    }

    /// Probe requiring a single attached element
    #[must_use]
    pub const fn present(selector: Selector) -> Self {
        Self::new(selector, ElementState::Present)
    }

    /// Probe requiring that nothing matching is displayed
    #[must_use]
    pub const fn invisible(selector: Selector) -> Self {
        Self::new(selector, ElementState::Invisible)
    }

    /// The probe's selector
    #[must_use]
    pub const fn selector(&self) -> &Selector {
        &self.selector
    }

    /// The required state
    #[must_use]
    pub const fn state(&self) -> ElementState {
        self.state
    }

    /// Evaluate the probe once against the live DOM.
    ///
    /// Transient lookup failures surface as errors; callers inside a polling
    /// loop treat them as "not yet satisfied".
    pub fn check(&self, dom: &dyn DomAccessor) -> ShareResult<bool> {
        let found = match dom.find_elements(&self.selector) {
            Ok(found) => found,
            Err(ShareError::ElementNotFound { .. }) => Vec::new(),
            Err(err) => return Err(err),
        };

        match self.state {
            ElementState::Present => Ok(found.len() == 1),
            ElementState::Visible => match found.as_slice() {
                [only] => dom.is_displayed(only),
                _ => Ok(false),
            },
            ElementState::Invisible => {
                for element in &found {
                    match dom.is_displayed(element) {
                        Ok(true) => return Ok(false),
                        Ok(false) | Err(ShareError::StaleElement { .. }) => {}
                        Err(err) => return Err(err),
                    }
                }
                Ok(true)
            }
        }
    }
}

impl fmt::Display for RenderElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.selector, self.state)
    }
}
