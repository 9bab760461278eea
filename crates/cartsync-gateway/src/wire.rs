//! Response shapes returned by the storefront cart API

use cartsync_core::{CartError, CartLineRecord, KeyValue};
use serde::Deserialize;
use serde_json::Value;

/// Top-level GraphQL envelope
#[derive(Debug, Deserialize)]
pub(crate) struct Envelope<T> {
    pub(crate) data: Option<T>,
    #[serde(default)]
    pub(crate) errors: Vec<MessageNode>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct MessageNode {
    pub(crate) message: String,
}

/// Decode an envelope and unwrap its data
///
/// Top-level errors win over partial data. A body that is not a GraphQL
/// envelope, or that carries neither data nor errors, is a transport failure.
pub(crate) fn unpack<T>(body: Value) -> Result<T, CartError>
where
    T: for<'de> Deserialize<'de>,
{
    let envelope: Envelope<T> = serde_json::from_value(body)
        .map_err(|e| CartError::transport(format!("malformed response: {e}")))?;

    if !envelope.errors.is_empty() {
        return Err(CartError::Rejected(
            envelope.errors.into_iter().map(|e| e.message).collect(),
        ));
    }

    envelope
        .data
        .ok_or_else(|| CartError::transport("response carried no data"))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CartCreateData {
    pub(crate) cart_create: Option<MutationPayload>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CartLinesAddData {
    pub(crate) cart_lines_add: Option<MutationPayload>,
}

/// Shared payload of cart mutations
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct MutationPayload {
    pub(crate) cart: Option<CartRef>,
    #[serde(default)]
    pub(crate) user_errors: Vec<UserError>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CartRef {
    pub(crate) id: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct UserError {
    #[serde(default)]
    pub(crate) field: Option<Vec<String>>,
    pub(crate) message: String,
}

impl UserError {
    /// `field.path: message`, or just the message when no field is named
    pub(crate) fn describe(&self) -> String {
        match &self.field {
            Some(path) if !path.is_empty() => format!("{}: {}", path.join("."), self.message),
            _ => self.message.clone(),
        }
    }
}

impl MutationPayload {
    /// Cart id on success; user errors become a rejection
    pub(crate) fn into_cart_id(self) -> Result<String, CartError> {
        if !self.user_errors.is_empty() {
            return Err(CartError::Rejected(
                self.user_errors.iter().map(UserError::describe).collect(),
            ));
        }
        self.cart
            .map(|cart| cart.id)
            .filter(|id| !id.is_empty())
            .ok_or_else(|| CartError::transport("mutation returned no cart"))
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct CartQueryData {
    pub(crate) cart: Option<CartLines>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CartLines {
    pub(crate) lines: Connection,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Connection {
    #[serde(default)]
    pub(crate) edges: Vec<Edge>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Edge {
    pub(crate) node: LineNode,
}

#[derive(Debug, Deserialize)]
pub(crate) struct LineNode {
    pub(crate) id: String,
    #[serde(default)]
    pub(crate) attributes: Vec<AttributeNode>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct AttributeNode {
    pub(crate) key: String,
    pub(crate) value: Option<String>,
}

impl CartLines {
    pub(crate) fn into_records(self) -> Vec<CartLineRecord> {
        self.lines
            .edges
            .into_iter()
            .map(|edge| {
                let attributes = edge
                    .node
                    .attributes
                    .into_iter()
                    .map(|a| KeyValue::new(a.key, a.value.unwrap_or_default()))
                    .collect();
                CartLineRecord::new(edge.node.id, attributes)
            })
            .collect()
    }
}
