//! Result and error types for sharepo.

use thiserror::Error;

/// Result type for sharepo operations
pub type ShareResult<T> = Result<T, ShareError>;

/// Errors that can occur while driving Share page objects
#[derive(Debug, Error)]
pub enum ShareError {
    /// A required condition did not hold before the deadline
    #[error("Timed out after {ms}ms waiting for {waited_for}")]
    Timeout {
        /// Deadline length in milliseconds
        ms: u64,
        /// Description of what was waited for
        waited_for: String,
    },

    /// The DOM interaction succeeded but left the UI in an unexpected state
    #[error("Page operation failed: {message}")]
    PageOperation {
        /// Error message
        message: String,
    },

    /// No element matched the selector (transient while polling)
    #[error("No element found for {selector}")]
    ElementNotFound {
        /// Selector that failed to resolve
        selector: String,
    },

    /// An element handle no longer refers to an attached node
    #[error("Element {element} is no longer attached to the document")]
    StaleElement {
        /// Element id
        element: String,
    },

    /// Driver-level failure (session lost, protocol error)
    #[error("Driver error: {message}")]
    Driver {
        /// Error message
        message: String,
    },

    /// Invalid configuration
    #[error("Configuration error: {message}")]
    Config {
        /// Error message
        message: String,
    },

    /// A caller-level retry loop ran out of attempts
    #[error("Gave up after {attempts} attempts")]
    RetriesExhausted {
        /// Number of attempts made
        attempts: usize,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml_ng::Error),
}

impl ShareError {
    /// Create a page operation error
    #[must_use]
    pub fn page_operation(message: impl Into<String>) -> Self {
        Self::PageOperation {
            message: message.into(),
        }
    }

    /// Create a driver error
    #[must_use]
    pub fn driver(message: impl Into<String>) -> Self {
        Self::Driver {
            message: message.into(),
        }
    }

    /// Create a configuration error
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Whether this error is expected while the DOM is still mutating.
    ///
    /// Transient errors are absorbed by polling loops until the deadline.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::ElementNotFound { .. } | Self::StaleElement { .. })
    }

    /// Whether this error is a deadline expiry
    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_display() {
        let err = ShareError::Timeout {
            ms: 250,
            waited_for: "css=div.dialog".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Timed out after 250ms waiting for css=div.dialog"
        );
        assert!(err.is_timeout());
        assert!(!err.is_transient());
    }

    #[test]
    fn test_transient_classification() {
        let not_found = ShareError::ElementNotFound {
            selector: "css=button".into(),
        };
        let stale = ShareError::StaleElement {
            element: "e-1".into(),
        };
        assert!(not_found.is_transient());
        assert!(stale.is_transient());
        assert!(!ShareError::driver("session closed").is_transient());
        assert!(!ShareError::page_operation("wrong page").is_transient());
    }
}
