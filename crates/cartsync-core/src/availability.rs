//! Availability gate
//!
//! Mirrors the storefront's textual availability flag into a submit-eligibility
//! bit. Subscribers are told whenever the bit flips.

use tokio::sync::watch;

/// Submit eligibility driven by an availability signal
#[derive(Debug)]
pub struct AvailabilityGate {
    tx: watch::Sender<bool>,
}

impl AvailabilityGate {
    /// Gate that starts eligible
    ///
    /// Matches a page with no availability node: submission stays allowed
    /// until a signal says otherwise.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::with_initial(true)
    }

    /// Gate starting open or closed
    #[inline]
    #[must_use]
    pub fn with_initial(eligible: bool) -> Self {
        let (tx, _rx) = watch::channel(eligible);
        Self { tx }
    }

    /// Feed the raw availability text; returns the new eligibility
    pub fn observe(&self, text: &str) -> bool {
        let eligible = parse_availability(text);
        self.tx.send_if_modified(|current| {
            if *current == eligible {
                false
            } else {
                tracing::debug!(eligible, "availability changed");
                *current = eligible;
                true
            }
        });
        eligible
    }

    /// Whether submissions are currently allowed
    #[inline]
    #[must_use]
    pub fn is_eligible(&self) -> bool {
        *self.tx.borrow()
    }

    /// Receive eligibility changes
    #[inline]
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.tx.subscribe()
    }
}

impl Default for AvailabilityGate {
    fn default() -> Self {
        Self::new()
    }
}

/// `"true"` in any case, surrounded by any whitespace, is available
#[inline]
#[must_use]
pub fn parse_availability(text: &str) -> bool {
    text.trim().eq_ignore_ascii_case("true")
}
