//! Core types for cartsync
//!
//! Defines the data model shared by every component:
//! - Cart and merchandise identifiers
//! - Line drafts and remote line records
//! - Reconciliation triggers
//! - Widget-facing values (host references, overlays, badge)

use serde::{Deserialize, Serialize};
use std::fmt;

/// Remote cart identifier (opaque, server-assigned)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CartId(pub String);

impl CartId {
    /// Wrap a server-assigned id
    #[inline]
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Raw id string
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CartId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Product variant identifier a line is added for
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MerchandiseId(pub String);

impl MerchandiseId {
    /// Wrap a variant id
    #[inline]
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Raw id string
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MerchandiseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Custom line attribute
///
/// Keys are display labels. Duplicates are kept as-is.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct KeyValue {
    /// Display label
    pub key: String,
    /// Value as entered
    pub value: String,
}

impl KeyValue {
    /// Pair `key` with `value`
    #[inline]
    #[must_use]
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// A line about to be sent to the cart service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineItemDraft {
    /// Variant being added
    pub merchandise_id: MerchandiseId,
    /// Always one for submitted lines
    pub quantity: u32,
    /// Custom attributes, in display order
    pub attributes: Vec<KeyValue>,
}

impl LineItemDraft {
    /// Quantity every submitted line carries
    pub const DEFAULT_QUANTITY: u32 = 1;

    /// Create draft for a single unit
    #[inline]
    #[must_use]
    pub fn new(merchandise_id: MerchandiseId, attributes: Vec<KeyValue>) -> Self {
        Self {
            merchandise_id,
            quantity: Self::DEFAULT_QUANTITY,
            attributes,
        }
    }
}

/// Line as reported by the remote cart
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartLineRecord {
    /// Server-qualified line id
    pub remote_id: String,
    /// Attributes in server order
    pub attributes: Vec<KeyValue>,
}

impl CartLineRecord {
    /// Record for `remote_id`
    #[inline]
    #[must_use]
    pub fn new(remote_id: impl Into<String>, attributes: Vec<KeyValue>) -> Self {
        Self {
            remote_id: remote_id.into(),
            attributes,
        }
    }
}

/// Why a reconciliation step was requested
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReconciliationTrigger {
    /// Widget became ready or was remounted
    InitialLoad,
    /// Drawer switched to open
    DrawerOpened,
    /// Widget redrew its content
    RenderSignal,
    /// Rendered content changed; only the badge needs recomputing
    BadgeOnly,
}

impl ReconciliationTrigger {
    /// Whether this trigger needs remote line data
    #[inline]
    #[must_use]
    pub fn fetches_lines(self) -> bool {
        !matches!(self, Self::BadgeOnly)
    }

    /// Whether this trigger waits out the debounce window
    #[inline]
    #[must_use]
    pub fn is_debounced(self) -> bool {
        matches!(self, Self::RenderSignal)
    }
}

/// One mounted instance of the cart widget
///
/// The generation grows every time the host is replaced wholesale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HostRef {
    /// Increases by one per replacement
    pub generation: u64,
}

impl HostRef {
    /// Reference to generation `generation`
    #[inline]
    #[must_use]
    pub fn new(generation: u64) -> Self {
        Self { generation }
    }

    /// Reference for the instance that replaces this one
    #[inline]
    #[must_use]
    pub fn next(self) -> Self {
        Self {
            generation: self.generation + 1,
        }
    }
}

/// A rendered line node
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VisualLine {
    /// Raw identifier from the node (may embed session query params)
    pub line_id: String,
    /// Overlay marker already present
    pub has_overlay: bool,
}

impl VisualLine {
    /// Bare node with no overlay yet
    #[inline]
    #[must_use]
    pub fn new(line_id: impl Into<String>) -> Self {
        Self {
            line_id: line_id.into(),
            has_overlay: false,
        }
    }
}

/// Metadata block injected under a line node
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Overlay {
    /// Key/value rows, reserved keys already removed
    pub entries: Vec<KeyValue>,
}

impl Overlay {
    /// True when nothing is left to show
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Cart count badge state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Badge {
    /// Total quantity across rendered lines
    pub count: u32,
    /// Hidden when the count is zero
    pub visible: bool,
}

impl Badge {
    /// Badge for a quantity total; hidden when empty
    #[inline]
    #[must_use]
    pub fn from_total(count: u32) -> Self {
        Self {
            count,
            visible: count > 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn draft_defaults_to_single_unit() {
        let draft = LineItemDraft::new(MerchandiseId::new("gid://shopify/ProductVariant/1"), vec![]);
        assert_eq!(draft.quantity, 1);
    }

    #[test]
    fn draft_serializes_camel_case() {
        let draft = LineItemDraft::new(
            MerchandiseId::new("v1"),
            vec![KeyValue::new("Promo Code", "SAVE10")],
        );
        let json = serde_json::to_value(&draft).unwrap();
        assert_eq!(json["merchandiseId"], "v1");
        assert_eq!(json["quantity"], 1);
        assert_eq!(json["attributes"][0]["key"], "Promo Code");
    }

    #[test]
    fn trigger_classification() {
        assert!(ReconciliationTrigger::RenderSignal.is_debounced());
        assert!(!ReconciliationTrigger::DrawerOpened.is_debounced());
        assert!(!ReconciliationTrigger::BadgeOnly.fetches_lines());
        assert!(ReconciliationTrigger::InitialLoad.fetches_lines());
    }

    #[test]
    fn badge_visibility_follows_total() {
        assert_eq!(Badge::from_total(0), Badge { count: 0, visible: false });
        assert!(Badge::from_total(3).visible);
    }

    #[test]
    fn host_generation_advances() {
        assert_eq!(HostRef::new(4).next(), HostRef::new(5));
    }
}
