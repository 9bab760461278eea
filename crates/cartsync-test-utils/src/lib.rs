//! Testing utilities for cartsync workspace
//!
//! Shared fakes, canned responses and fixtures.

use async_trait::async_trait;
use cartsync_core::{
    Badge, CartError, CartId, CartLineRecord, CartSession, CartWidget, HostRef, KeyValue,
    LineItemDraft, MerchandiseId, Overlay, VisualLine, WidgetError,
};
use cartsync_gateway::{CartGateway, GraphQlRequest, GraphQlTransport, Operation};
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Storage key used by test sessions
pub const TEST_STORAGE_KEY: &str = "__shopify:cartId";

/// In-memory session with no cart yet
pub fn empty_session() -> Arc<CartSession> {
    Arc::new(CartSession::in_memory(TEST_STORAGE_KEY))
}

/// In-memory session already holding `cart_id`
pub fn session_with(cart_id: &str) -> Arc<CartSession> {
    let session = empty_session();
    session
        .compare_and_set(None, CartId::new(cart_id))
        .expect("fresh session accepts first id");
    session
}

/// One-quantity draft for `variant`
pub fn draft(variant: &str, attributes: &[(&str, &str)]) -> LineItemDraft {
    LineItemDraft::new(
        MerchandiseId::new(variant),
        attributes.iter().map(|(k, v)| KeyValue::new(*k, *v)).collect(),
    )
}

/// Remote line record with the given attributes
pub fn line_record(remote_id: &str, attributes: &[(&str, &str)]) -> CartLineRecord {
    CartLineRecord::new(
        remote_id,
        attributes.iter().map(|(k, v)| KeyValue::new(*k, *v)).collect(),
    )
}

// Canned storefront responses

/// Successful `cartCreate` response body
pub fn cart_created(cart_id: &str) -> Value {
    json!({ "data": { "cartCreate": { "cart": { "id": cart_id }, "userErrors": [] } } })
}

/// Successful `cartLinesAdd` response body
pub fn lines_added(cart_id: &str) -> Value {
    json!({ "data": { "cartLinesAdd": { "cart": { "id": cart_id }, "userErrors": [] } } })
}

/// Mutation response for `root` ("cartCreate" or "cartLinesAdd") with user errors
pub fn user_errors(root: &str, messages: &[&str]) -> Value {
    let errors: Vec<Value> = messages
        .iter()
        .map(|m| json!({ "field": ["lines"], "message": m }))
        .collect();
    json!({ "data": { root: { "cart": null, "userErrors": errors } } })
}

/// Line-read response body with one node per entry
pub fn cart_lines(lines: &[(&str, &[(&str, &str)])]) -> Value {
    let edges: Vec<Value> = lines
        .iter()
        .map(|(id, attrs)| {
            let attributes: Vec<Value> = attrs
                .iter()
                .map(|(k, v)| json!({ "key": k, "value": v }))
                .collect();
            json!({ "node": { "id": id, "attributes": attributes } })
        })
        .collect();
    json!({ "data": { "cart": { "lines": { "edges": edges } } } })
}

/// Line-read response for a cart the server no longer knows
pub fn cart_missing() -> Value {
    json!({ "data": { "cart": null } })
}

/// Transport that replays queued responses and records every request
#[derive(Debug, Default)]
pub struct ScriptedTransport {
    responses: Mutex<VecDeque<Result<Value, CartError>>>,
    requests: Mutex<Vec<GraphQlRequest>>,
}

impl ScriptedTransport {
    /// Transport with nothing scripted
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a JSON body for the next request
    pub fn with_response(self, body: Value) -> Self {
        self.responses.lock().push_back(Ok(body));
        self
    }

    /// Queue a failure for the next request
    pub fn with_failure(self, error: CartError) -> Self {
        self.responses.lock().push_back(Err(error));
        self
    }

    /// Every request sent so far
    pub fn requests(&self) -> Vec<GraphQlRequest> {
        self.requests.lock().clone()
    }

    /// Operations of every request sent so far
    pub fn operations(&self) -> Vec<Operation> {
        self.requests.lock().iter().map(|r| r.operation).collect()
    }

    /// Number of requests sent
    pub fn request_count(&self) -> usize {
        self.requests.lock().len()
    }
}

#[async_trait]
impl GraphQlTransport for ScriptedTransport {
    async fn execute(&self, request: &GraphQlRequest) -> Result<Value, CartError> {
        self.requests.lock().push(request.clone());
        self.responses
            .lock()
            .pop_front()
            .unwrap_or_else(|| Err(CartError::transport("no scripted response")))
    }
}

/// Gateway fake with controllable latency and counters
#[derive(Debug)]
pub struct FakeGateway {
    lines: Mutex<Vec<CartLineRecord>>,
    fetch_failures: Mutex<VecDeque<CartError>>,
    add_results: Mutex<VecDeque<Result<CartId, CartError>>>,
    drafts: Mutex<Vec<LineItemDraft>>,
    fetches: AtomicUsize,
    latency: Duration,
}

impl FakeGateway {
    /// Gateway whose reads return `lines`
    pub fn new(lines: Vec<CartLineRecord>) -> Self {
        Self {
            lines: Mutex::new(lines),
            fetch_failures: Mutex::new(VecDeque::new()),
            add_results: Mutex::new(VecDeque::new()),
            drafts: Mutex::new(Vec::new()),
            fetches: AtomicUsize::new(0),
            latency: Duration::ZERO,
        }
    }

    /// Every fetch sleeps this long before answering
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Make the next read fail with `error`
    pub fn fail_next_fetch(&self, error: CartError) {
        self.fetch_failures.lock().push_back(error);
    }

    /// Queue the outcome of the next add; defaults to a fixed cart id
    pub fn queue_add_result(&self, result: Result<CartId, CartError>) {
        self.add_results.lock().push_back(result);
    }

    /// Replace the lines later reads return
    pub fn set_lines(&self, lines: Vec<CartLineRecord>) {
        *self.lines.lock() = lines;
    }

    /// Number of reads started
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    /// Every draft passed to `create_or_append`
    pub fn drafts(&self) -> Vec<LineItemDraft> {
        self.drafts.lock().clone()
    }
}

#[async_trait]
impl CartGateway for FakeGateway {
    async fn create_or_append(&self, draft: &LineItemDraft) -> Result<CartId, CartError> {
        self.drafts.lock().push(draft.clone());
        self.add_results
            .lock()
            .pop_front()
            .unwrap_or_else(|| Ok(CartId::new("gid://shopify/Cart/test")))
    }

    async fn fetch_lines(&self) -> Result<Vec<CartLineRecord>, CartError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        if let Some(error) = self.fetch_failures.lock().pop_front() {
            return Err(error);
        }
        Ok(self.lines.lock().clone())
    }
}

#[derive(Debug, Clone)]
struct FakeLine {
    line_id: String,
    quantity_label: String,
    overlays: Vec<Overlay>,
}

#[derive(Debug, Default)]
struct WidgetState {
    host: Option<HostRef>,
    last_generation: u64,
    lines: Vec<FakeLine>,
    badge: Option<Badge>,
    badge_updates: usize,
    opened: Vec<HostRef>,
}

/// In-memory stand-in for the third-party cart drawer
#[derive(Debug, Default)]
pub struct FakeWidget {
    state: Mutex<WidgetState>,
}

impl FakeWidget {
    /// Widget that has not mounted yet
    pub fn new() -> Self {
        Self::default()
    }

    /// Widget mounted with the given `(line_id, quantity_label)` rows
    pub fn mounted(lines: &[(&str, &str)]) -> Self {
        let widget = Self::new();
        widget.mount();
        for (line_id, quantity) in lines {
            widget.add_line(line_id, quantity);
        }
        widget
    }

    /// Mount a new host instance
    pub fn mount(&self) -> HostRef {
        let mut state = self.state.lock();
        state.last_generation += 1;
        let host = HostRef::new(state.last_generation);
        state.host = Some(host);
        host
    }

    /// Unmount without replacement
    pub fn detach(&self) {
        self.state.lock().host = None;
    }

    /// Render another line node on the current host
    pub fn add_line(&self, line_id: &str, quantity_label: &str) {
        self.state.lock().lines.push(FakeLine {
            line_id: line_id.to_string(),
            quantity_label: quantity_label.to_string(),
            overlays: Vec::new(),
        });
    }

    /// Overlays injected under `line_id`
    pub fn overlays_for(&self, line_id: &str) -> Vec<Overlay> {
        self.state
            .lock()
            .lines
            .iter()
            .find(|l| l.line_id == line_id)
            .map(|l| l.overlays.clone())
            .unwrap_or_default()
    }

    /// Overlays injected across every line
    pub fn total_overlays(&self) -> usize {
        self.state.lock().lines.iter().map(|l| l.overlays.len()).sum()
    }

    /// Last badge written
    pub fn badge(&self) -> Option<Badge> {
        self.state.lock().badge
    }

    /// Number of badge writes
    pub fn badge_updates(&self) -> usize {
        self.state.lock().badge_updates
    }

    /// Hosts whose drawer was opened, in order
    pub fn opened_hosts(&self) -> Vec<HostRef> {
        self.state.lock().opened.clone()
    }

    fn check(state: &WidgetState, host: HostRef) -> Result<(), WidgetError> {
        if state.host == Some(host) {
            Ok(())
        } else {
            Err(WidgetError::Detached)
        }
    }
}

impl CartWidget for FakeWidget {
    fn host(&self) -> Option<HostRef> {
        self.state.lock().host
    }

    fn line_nodes(&self, host: HostRef) -> Result<Vec<VisualLine>, WidgetError> {
        let state = self.state.lock();
        Self::check(&state, host)?;
        Ok(state
            .lines
            .iter()
            .map(|l| VisualLine {
                line_id: l.line_id.clone(),
                has_overlay: !l.overlays.is_empty(),
            })
            .collect())
    }

    fn inject_overlay(
        &self,
        host: HostRef,
        line_id: &str,
        overlay: &Overlay,
    ) -> Result<(), WidgetError> {
        let mut state = self.state.lock();
        Self::check(&state, host)?;
        let line = state
            .lines
            .iter_mut()
            .find(|l| l.line_id == line_id)
            .ok_or_else(|| WidgetError::NodeMissing(line_id.to_string()))?;
        line.overlays.push(overlay.clone());
        Ok(())
    }

    fn quantity_labels(&self, host: HostRef) -> Result<Vec<String>, WidgetError> {
        let state = self.state.lock();
        Self::check(&state, host)?;
        Ok(state.lines.iter().map(|l| l.quantity_label.clone()).collect())
    }

    fn set_badge(&self, badge: Badge) {
        let mut state = self.state.lock();
        state.badge = Some(badge);
        state.badge_updates += 1;
    }

    fn replace_host(&self) -> HostRef {
        let mut state = self.state.lock();
        state.last_generation += 1;
        let host = HostRef::new(state.last_generation);
        state.host = Some(host);
        // A fresh instance renders without any injected overlays
        for line in &mut state.lines {
            line.overlays.clear();
        }
        host
    }

    fn open_drawer(&self, host: HostRef) -> Result<(), WidgetError> {
        let mut state = self.state.lock();
        Self::check(&state, host)?;
        state.opened.push(host);
        Ok(())
    }
}
