//! GraphQL documents and request envelopes for the storefront cart API

use cartsync_core::{CartId, LineItemDraft};
use serde::Serialize;
use serde_json::{json, Value};

/// Lines fetched per read; carts with more lines are truncated
pub const LINE_PAGE_SIZE: u32 = 50;

pub(crate) const CART_CREATE: &str = r#"mutation cartCreate($input: CartInput) {
  cartCreate(input: $input) {
    cart { id }
    userErrors { field message }
  }
}"#;

pub(crate) const CART_LINES_ADD: &str = r#"mutation cartLinesAdd($cartId: ID!, $lines: [CartLineInput!]!) {
  cartLinesAdd(cartId: $cartId, lines: $lines) {
    cart { id }
    userErrors { field message }
  }
}"#;

pub(crate) const CART_LINES: &str = r#"query cartLines($cartId: ID!, $first: Int!) {
  cart(id: $cartId) {
    lines(first: $first) {
      edges {
        node {
          id
          attributes { key value }
        }
      }
    }
  }
}"#;

/// Which operation a request performs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    /// Create a cart holding the first line
    CartCreate,
    /// Append lines to an existing cart
    CartLinesAdd,
    /// Read a page of lines with attributes
    CartLines,
}

impl Operation {
    /// GraphQL operation name
    #[inline]
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::CartCreate => "cartCreate",
            Self::CartLinesAdd => "cartLinesAdd",
            Self::CartLines => "cartLines",
        }
    }

    /// Whether the operation changes the cart
    #[inline]
    #[must_use]
    pub fn is_mutation(self) -> bool {
        !matches!(self, Self::CartLines)
    }
}

/// Body of one POST to the GraphQL endpoint
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GraphQlRequest {
    /// Operation this body performs; not serialized
    #[serde(skip)]
    pub operation: Operation,
    /// Operation name sent on the wire
    #[serde(rename = "operationName")]
    pub operation_name: &'static str,
    /// GraphQL document text
    pub query: &'static str,
    /// JSON variables object
    pub variables: Value,
}

impl GraphQlRequest {
    fn new(operation: Operation, query: &'static str, variables: Value) -> Self {
        Self {
            operation,
            operation_name: operation.name(),
            query,
            variables,
        }
    }

    /// Create a cart whose only line is `draft`
    #[must_use]
    pub fn cart_create(draft: &LineItemDraft) -> Self {
        Self::new(
            Operation::CartCreate,
            CART_CREATE,
            json!({ "input": { "lines": [draft] } }),
        )
    }

    /// Append `draft` to an existing cart
    #[must_use]
    pub fn cart_lines_add(cart_id: &CartId, draft: &LineItemDraft) -> Self {
        Self::new(
            Operation::CartLinesAdd,
            CART_LINES_ADD,
            json!({ "cartId": cart_id, "lines": [draft] }),
        )
    }

    /// Read the first page of lines
    #[must_use]
    pub fn cart_lines(cart_id: &CartId) -> Self {
        Self::new(
            Operation::CartLines,
            CART_LINES,
            json!({ "cartId": cart_id, "first": LINE_PAGE_SIZE }),
        )
    }

    /// Cart id variable, when the request targets an existing cart
    #[must_use]
    pub fn cart_id(&self) -> Option<&str> {
        self.variables.get("cartId").and_then(Value::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cartsync_core::{KeyValue, MerchandiseId};

    fn draft() -> LineItemDraft {
        LineItemDraft::new(
            MerchandiseId::new("gid://shopify/ProductVariant/7"),
            vec![KeyValue::new("Monogram", "AB")],
        )
    }

    #[test]
    fn create_wraps_lines_in_input() {
        let req = GraphQlRequest::cart_create(&draft());
        assert_eq!(req.operation, Operation::CartCreate);
        assert!(req.cart_id().is_none());
        let line = &req.variables["input"]["lines"][0];
        assert_eq!(line["merchandiseId"], "gid://shopify/ProductVariant/7");
        assert_eq!(line["quantity"], 1);
        assert_eq!(line["attributes"][0]["value"], "AB");
    }

    #[test]
    fn append_carries_cart_id() {
        let req = GraphQlRequest::cart_lines_add(&CartId::new("gid://shopify/Cart/c1"), &draft());
        assert_eq!(req.cart_id(), Some("gid://shopify/Cart/c1"));
        assert_eq!(req.variables["lines"].as_array().map(Vec::len), Some(1));
        assert!(req.variables.get("input").is_none());
    }

    #[test]
    fn read_requests_one_page() {
        let req = GraphQlRequest::cart_lines(&CartId::new("c1"));
        assert_eq!(req.variables["first"], LINE_PAGE_SIZE);
        assert!(!req.operation.is_mutation());
    }

    #[test]
    fn body_omits_operation_tag() {
        let body = serde_json::to_value(GraphQlRequest::cart_lines(&CartId::new("c1"))).unwrap();
        assert_eq!(body["operationName"], "cartLines");
        assert!(body.get("operation").is_none());
        assert!(body["query"].as_str().unwrap().contains("lines(first: $first)"));
    }
}
