//! Remote cart gateway
//!
//! Two operations against the storefront cart:
//! - `create_or_append`: add one line, creating the cart on first use
//! - `fetch_lines`: read the current lines and their attributes
//!
//! Each call is exactly one round trip. Nothing here retries, and nothing
//! here writes the session; the caller persists the returned id.

use crate::documents::{GraphQlRequest, Operation};
use crate::transport::GraphQlTransport;
use crate::wire::{self, CartCreateData, CartLinesAddData, CartQueryData};
use async_trait::async_trait;
use cartsync_core::{CartError, CartId, CartLineRecord, CartSession, LineItemDraft};
use std::sync::Arc;

/// Operations the reconciliation engine needs from the cart service
#[async_trait]
pub trait CartGateway: Send + Sync {
    /// Add `draft` as a new line; returns the cart id it landed in
    async fn create_or_append(&self, draft: &LineItemDraft) -> Result<CartId, CartError>;

    /// Lines of the active cart; empty when there is no cart
    async fn fetch_lines(&self) -> Result<Vec<CartLineRecord>, CartError>;
}

/// Gateway to the storefront GraphQL cart API
#[derive(Debug)]
pub struct StorefrontGateway<T> {
    transport: T,
    session: Arc<CartSession>,
}

impl<T: GraphQlTransport> StorefrontGateway<T> {
    /// Gateway sending through `transport` for `session`
    #[inline]
    #[must_use]
    pub fn new(transport: T, session: Arc<CartSession>) -> Self {
        Self { transport, session }
    }

    /// Session this gateway reads and writes through
    #[inline]
    #[must_use]
    pub fn session(&self) -> &Arc<CartSession> {
        &self.session
    }

    /// Underlying transport
    #[inline]
    #[must_use]
    pub fn transport(&self) -> &T {
        &self.transport
    }

    async fn create(&self, draft: &LineItemDraft) -> Result<CartId, CartError> {
        let request = GraphQlRequest::cart_create(draft);
        let data: CartCreateData = wire::unpack(self.transport.execute(&request).await?)?;
        let payload = data
            .cart_create
            .ok_or_else(|| missing_payload(Operation::CartCreate))?;
        payload.into_cart_id().map(CartId::new)
    }

    async fn append(&self, cart_id: &CartId, draft: &LineItemDraft) -> Result<CartId, CartError> {
        let request = GraphQlRequest::cart_lines_add(cart_id, draft);
        let data: CartLinesAddData = wire::unpack(self.transport.execute(&request).await?)?;
        let payload = data
            .cart_lines_add
            .ok_or_else(|| missing_payload(Operation::CartLinesAdd))?;
        payload.into_cart_id().map(CartId::new)
    }

    /// Read lines of `cart_id`
    ///
    /// # Errors
    /// - `CartError::NotFound` if the service no longer knows the cart
    pub async fn read_cart(&self, cart_id: &CartId) -> Result<Vec<CartLineRecord>, CartError> {
        let request = GraphQlRequest::cart_lines(cart_id);
        let data: CartQueryData = wire::unpack(self.transport.execute(&request).await?)?;
        data.cart
            .map(|cart| cart.into_records())
            .ok_or(CartError::NotFound)
    }
}

#[async_trait]
impl<T: GraphQlTransport> CartGateway for StorefrontGateway<T> {
    async fn create_or_append(&self, draft: &LineItemDraft) -> Result<CartId, CartError> {
        let result = match self.session.current() {
            None => self.create(draft).await,
            Some(cart_id) => self.append(&cart_id, draft).await,
        };

        match &result {
            Ok(cart_id) => tracing::info!(
                cart_id = %cart_id,
                merchandise_id = %draft.merchandise_id,
                attributes = draft.attributes.len(),
                "line added to cart"
            ),
            Err(CartError::Rejected(messages)) => {
                tracing::warn!(?messages, "cart service rejected line")
            }
            Err(e) => tracing::warn!(error = %e, "adding line failed"),
        }
        result
    }

    async fn fetch_lines(&self) -> Result<Vec<CartLineRecord>, CartError> {
        let Some(cart_id) = self.session.current() else {
            tracing::debug!("no cart session; nothing to fetch");
            return Ok(Vec::new());
        };

        match self.read_cart(&cart_id).await {
            Ok(records) => {
                tracing::debug!(cart_id = %cart_id, lines = records.len(), "fetched cart lines");
                Ok(records)
            }
            Err(CartError::NotFound) => {
                tracing::debug!(cart_id = %cart_id, "cart not found; treating as empty");
                Ok(Vec::new())
            }
            Err(e) => Err(e),
        }
    }
}

fn missing_payload(operation: Operation) -> CartError {
    CartError::transport(format!("response missing {} payload", operation.name()))
}
