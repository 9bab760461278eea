//! Cart widget surface
//!
//! The drawer is rendered by a third-party component this crate does not own.
//! Everything the engine reads from it or writes into it goes through
//! [`CartWidget`], so a browser binding and a test fake look the same.

use crate::error::WidgetError;
use crate::types::{Badge, HostRef, Overlay, VisualLine};

/// Access to the mounted cart widget
pub trait CartWidget: Send + Sync {
    /// Currently mounted host, if ready
    fn host(&self) -> Option<HostRef>;

    /// Whether `host` is still the mounted instance
    fn is_attached(&self, host: HostRef) -> bool {
        self.host() == Some(host)
    }

    /// Rendered line nodes in display order
    fn line_nodes(&self, host: HostRef) -> Result<Vec<VisualLine>, WidgetError>;

    /// Insert an overlay under a line node and set its marker
    fn inject_overlay(&self, host: HostRef, line_id: &str, overlay: &Overlay)
        -> Result<(), WidgetError>;

    /// Raw text of every quantity label
    fn quantity_labels(&self, host: HostRef) -> Result<Vec<String>, WidgetError>;

    /// Update the page's cart badge
    fn set_badge(&self, badge: Badge);

    /// Remount the widget so it reloads cart data
    fn replace_host(&self) -> HostRef;

    /// Open the drawer of a host
    fn open_drawer(&self, host: HostRef) -> Result<(), WidgetError>;
}

/// Sum quantity labels; malformed text counts as zero
#[must_use]
pub fn badge_total<S: AsRef<str>>(labels: &[S]) -> u32 {
    labels
        .iter()
        .map(|label| label.as_ref().trim().parse::<u32>().unwrap_or(0))
        .fold(0u32, u32::saturating_add)
}
