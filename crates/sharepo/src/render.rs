//! Render protocol
//!
//! A page object is not usable until the elements that define it are in
//! their required state. [`element_render`] polls a set of
//! [`RenderElement`] probes against the live DOM until all of them hold in
//! the same pass or the [`RenderTime`] deadline expires.
//!
//! Polling rules:
//!
//! - the deadline is checked before every poll, so an expired timer never
//!   touches the DOM
//! - every poll re-resolves every probe; handles are never reused
//! - missing or stale elements mean "not yet", only the deadline ends a
//!   wait unsuccessfully
//! - any other driver error ends the wait immediately

use std::cell::RefCell;
use std::time::{Duration, Instant};

use tracing::{debug, trace};

use crate::driver::{DomAccessor, ElementHandle};
use crate::locator::{RenderElement, Selector};
use crate::result::{ShareError, ShareResult};

/// Default maximum page load time (30 seconds)
pub const DEFAULT_MAX_PAGE_LOAD_MS: u64 = 30_000;

/// Default polling interval (100ms)
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 100;

/// Shortest pause between polls
const MIN_POLL_INTERVAL: Duration = Duration::from_millis(1);

// =============================================================================
// RENDER TIME
// =============================================================================

/// Deadline for a single render or wait call.
///
/// Created at the start of the call and dropped afterwards. The deadline is
/// fixed at construction and cannot be extended.
#[derive(Debug, Clone, Copy)]
pub struct RenderTime {
    started: Instant,
    max: Duration,
}

impl RenderTime {
    /// Start a deadline of `max` from now
    #[must_use]
    pub fn new(max: Duration) -> Self {
        Self {
            started: Instant::now(),
            max,
        }
    }

    /// Start a deadline of `ms` milliseconds from now
    #[must_use]
    pub fn from_millis(ms: u64) -> Self {
        Self::new(Duration::from_millis(ms))
    }

    /// The full length of the deadline
    #[must_use]
    pub const fn max_duration(&self) -> Duration {
        self.max
    }

    /// Time since the deadline started
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Time left before expiry, zero once expired
    #[must_use]
    pub fn remaining(&self) -> Duration {
        self.max.saturating_sub(self.elapsed())
    }

    /// Whether the deadline has passed
    #[must_use]
    pub fn has_expired(&self) -> bool {
        self.remaining().is_zero()
    }

    fn timeout(&self, waited_for: impl Into<String>) -> ShareError {
        ShareError::Timeout {
            ms: self.max.as_millis() as u64,
            waited_for: waited_for.into(),
        }
    }
}

// =============================================================================
// POLLING
// =============================================================================

/// Poll `probe` until it yields a value or `timer` expires.
///
/// Transient errors count as "not yet".
fn poll_until<T>(
    timer: &RenderTime,
    poll_interval: Duration,
    waited_for: impl Fn() -> String,
    mut probe: impl FnMut() -> ShareResult<Option<T>>,
) -> ShareResult<T> {
    let poll_interval = poll_interval.max(MIN_POLL_INTERVAL);
    loop {
        if timer.has_expired() {
            let waited_for = waited_for();
            debug!(
                elapsed_ms = timer.elapsed().as_millis() as u64,
                %waited_for,
                "render timed out"
            );
            return Err(timer.timeout(waited_for));
        }

        match probe() {
            Ok(Some(value)) => return Ok(value),
            Ok(None) => {}
            Err(err) if err.is_transient() => trace!(error = %err, "transient miss"),
            Err(err) => return Err(err),
        }

        std::thread::sleep(poll_interval.min(timer.remaining()));
    }
}

fn describe<'a>(probes: impl IntoIterator<Item = &'a RenderElement>) -> String {
    probes
        .into_iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Wait until every probe holds in a single pass.
///
/// An empty probe set is satisfied immediately. On timeout the error names
/// only the probes that failed on the last pass.
///
/// # Errors
///
/// [`ShareError::Timeout`] when the deadline passes first; non-transient
/// driver errors as they occur.
pub fn element_render(
    dom: &dyn DomAccessor,
    timer: &RenderTime,
    probes: &[RenderElement],
    poll_interval: Duration,
) -> ShareResult<()> {
    if probes.is_empty() {
        return Ok(());
    }

    let pending: RefCell<Vec<&RenderElement>> = RefCell::new(probes.iter().collect());
    poll_until(
        timer,
        poll_interval,
        || describe(pending.borrow().iter().copied()),
        || {
            let mut unsatisfied = Vec::new();
            for probe in probes {
                match probe.check(dom) {
                    Ok(true) => {}
                    Ok(false) => unsatisfied.push(probe),
                    Err(err) if err.is_transient() => {
                        trace!(%probe, error = %err, "transient miss");
                        unsatisfied.push(probe);
                    }
                    Err(err) => return Err(err),
                }
            }
            if unsatisfied.is_empty() {
                return Ok(Some(()));
            }
            trace!(pending = unsatisfied.len(), "probes not satisfied");
            *pending.borrow_mut() = unsatisfied;
            Ok(None)
        },
    )?;

    debug!(
        probes = probes.len(),
        elapsed_ms = timer.elapsed().as_millis() as u64,
        "rendered"
    );
    Ok(())
}

/// Wait for a single displayed element and return its handle.
///
/// # Errors
///
/// [`ShareError::Timeout`] when the element is not displayed in time.
pub fn wait_for_visible(
    dom: &dyn DomAccessor,
    selector: &Selector,
    timer: &RenderTime,
    poll_interval: Duration,
) -> ShareResult<ElementHandle> {
    poll_until(
        timer,
        poll_interval,
        || format!("{selector} to be visible"),
        || {
            let found = dom.find_elements(selector)?;
            if let [only] = found.as_slice() {
                if dom.is_displayed(only)? {
                    return Ok(Some(only.clone()));
                }
            }
            Ok(None)
        },
    )
}

/// Wait until nothing matching `selector` is displayed.
///
/// # Errors
///
/// [`ShareError::Timeout`] when the element is still displayed at the
/// deadline.
pub fn wait_until_gone(
    dom: &dyn DomAccessor,
    selector: &Selector,
    timer: &RenderTime,
    poll_interval: Duration,
) -> ShareResult<()> {
    let probe = RenderElement::invisible(selector.clone());
    poll_until(
        timer,
        poll_interval,
        || format!("{selector} to disappear"),
        || Ok(probe.check(dom)?.then_some(())),
    )
}

/// Boolean form of [`wait_until_gone`]: `true` when the element is still
/// displayed after `timeout`, `false` once it has gone.
///
/// This is the only place a timeout is turned into a value.
///
/// # Errors
///
/// Non-transient driver errors.
pub fn is_still_displayed(
    dom: &dyn DomAccessor,
    selector: &Selector,
    timeout: Duration,
    poll_interval: Duration,
) -> ShareResult<bool> {
    match wait_until_gone(dom, selector, &RenderTime::new(timeout), poll_interval) {
        Ok(()) => Ok(false),
        Err(ShareError::Timeout { .. }) => Ok(true),
        Err(err) => Err(err),
    }
}
