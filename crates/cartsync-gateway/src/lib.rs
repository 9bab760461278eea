//! cartsync gateway
//!
//! Talks to the storefront cart API:
//! - Builds the `cartCreate`, `cartLinesAdd` and line-read documents
//! - Sends them through a pluggable [`GraphQlTransport`]
//! - Folds transport failures and user errors into [`CartError`]
//!
//! # Example
//!
//! ```rust,ignore
//! use cartsync_core::{CartSession, CartSyncConfig};
//! use cartsync_gateway::{CartGateway, HttpTransport, StorefrontGateway};
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = CartSyncConfig::load("cartsync.toml")?;
//! let session = Arc::new(CartSession::in_memory(config.storage_key.clone()));
//! let gateway = StorefrontGateway::new(HttpTransport::from_config(&config)?, session);
//!
//! for line in gateway.fetch_lines().await? {
//!     println!("{}", line.remote_id);
//! }
//! # Ok(())
//! # }
//! ```

pub mod documents;
pub mod gateway;
pub mod transport;
mod wire;

pub use cartsync_core::CartError;
pub use documents::{GraphQlRequest, Operation, LINE_PAGE_SIZE};
pub use gateway::{CartGateway, StorefrontGateway};
pub use transport::{GraphQlTransport, HttpTransport, ACCESS_TOKEN_HEADER};
