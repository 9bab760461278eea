//! cartsync core
//!
//! The pieces of the cart reconciliation engine that need no network:
//! - Cart session store with compare-and-set updates
//! - Attribute projection from submit-control data
//! - Matching remote line records to rendered line nodes
//! - Availability gating for submissions
//! - The widget trait the engine drives
//!
//! # Example
//!
//! ```rust
//! use cartsync_core::{AttributeProjector, KeyValue};
//! use indexmap::IndexMap;
//!
//! let mut fields = IndexMap::new();
//! fields.insert("promoCode".to_string(), "SAVE10".to_string());
//!
//! let attrs = AttributeProjector::default().project(&fields, None);
//! assert_eq!(attrs, vec![KeyValue::new("Promo Code", "SAVE10")]);
//! ```

pub mod availability;
pub mod config;
pub mod error;
pub mod matcher;
pub mod projector;
pub mod session;
pub mod types;
pub mod widget;

pub use availability::{parse_availability, AvailabilityGate};
pub use config::CartSyncConfig;
pub use error::{CartError, ConfigError, SessionError, WidgetError};
pub use matcher::{find_record, match_lines, overlay_for};
pub use projector::{humanize_key, AttributeProjector, DEFAULT_NOTE_LABEL};
pub use session::{CartSession, FileStorage, MemoryStorage, SessionStorage};
pub use types::{
    Badge, CartId, CartLineRecord, HostRef, KeyValue, LineItemDraft, MerchandiseId, Overlay,
    ReconciliationTrigger, VisualLine,
};
pub use widget::{badge_total, CartWidget};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
