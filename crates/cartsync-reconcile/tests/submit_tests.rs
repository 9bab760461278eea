//! Submission flow tests

use async_trait::async_trait;
use cartsync_core::{
    AvailabilityGate, CartError, CartId, CartLineRecord, CartSession, CartSyncConfig, CartWidget,
    KeyValue, LineItemDraft,
};
use cartsync_gateway::{CartGateway, Operation, StorefrontGateway};
use cartsync_reconcile::{
    event_bus, CartSubmitter, EventStream, LoopEvent, SignalKind, SubmitError, SubmitPhase,
    SubmitRequest, WidgetSignal,
};
use cartsync_test_utils::{
    cart_created, empty_session, lines_added, session_with, FakeGateway, FakeWidget,
    ScriptedTransport,
};
use mockall::mock;
use pretty_assertions::assert_eq;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

const VARIANT: &str = "gid://shopify/ProductVariant/42";
const NEW_CART: &str = "gid://shopify/Cart/new";

mock! {
    pub Gateway {}

    #[async_trait]
    impl CartGateway for Gateway {
        async fn create_or_append(&self, draft: &LineItemDraft) -> Result<CartId, CartError>;
        async fn fetch_lines(&self) -> Result<Vec<CartLineRecord>, CartError>;
    }
}

struct Harness<G> {
    gateway: Arc<G>,
    submitter: CartSubmitter<G, FakeWidget>,
    widget: Arc<FakeWidget>,
    session: Arc<CartSession>,
    gate: Arc<AvailabilityGate>,
    events: EventStream,
}

fn harness<G: CartGateway>(gateway: Arc<G>, session: Arc<CartSession>) -> Harness<G> {
    let widget = Arc::new(FakeWidget::mounted(&[]));
    let gate = Arc::new(AvailabilityGate::new());
    let (handle, events) = event_bus();
    let submitter = CartSubmitter::new(
        Arc::clone(&gateway),
        Arc::clone(&widget),
        Arc::clone(&session),
        Arc::clone(&gate),
        handle,
        &CartSyncConfig::default(),
    );
    Harness {
        gateway,
        submitter,
        widget,
        session,
        gate,
        events,
    }
}

fn monogram_request() -> SubmitRequest {
    SubmitRequest::new(VARIANT)
        .with_field("giftWrap", "Yes")
        .with_note("  AB ")
}

#[tokio::test]
async fn test_first_submit_creates_cart_and_records_session() {
    let session = empty_session();
    let transport = ScriptedTransport::new().with_response(cart_created(NEW_CART));
    let gateway = StorefrontGateway::new(transport, Arc::clone(&session));
    let mut h = harness(Arc::new(gateway), session);

    let cart_id = h.submitter.submit(monogram_request()).await.unwrap();

    assert_eq!(cart_id, CartId::new(NEW_CART));
    assert_eq!(h.session.current(), Some(CartId::new(NEW_CART)));
    assert_eq!(h.submitter.phase(), SubmitPhase::Added);

    // Widget was remounted, the loop heard about it and the new drawer opened
    let host = h.widget.host().unwrap();
    assert_eq!(host.generation, 2);
    assert_eq!(
        h.events.try_next(),
        Some(LoopEvent::Signal(WidgetSignal {
            host,
            kind: SignalKind::Replaced
        }))
    );
    assert_eq!(h.widget.opened_hosts(), vec![host]);
}

#[tokio::test]
async fn test_existing_session_appends() {
    let existing = "gid://shopify/Cart/existing";
    let session = session_with(existing);
    let gateway = StorefrontGateway::new(
        ScriptedTransport::new().with_response(lines_added(existing)),
        Arc::clone(&session),
    );
    let h = harness(Arc::new(gateway), session);

    let cart_id = h.submitter.submit(monogram_request()).await.unwrap();

    assert_eq!(cart_id.as_str(), existing);
    assert_eq!(h.session.current(), Some(CartId::new(existing)));
}

#[tokio::test]
async fn test_append_sends_lines_add_only() {
    let existing = "gid://shopify/Cart/existing";
    let session = session_with(existing);
    let gateway = Arc::new(StorefrontGateway::new(
        ScriptedTransport::new().with_response(lines_added(existing)),
        Arc::clone(&session),
    ));
    let widget = Arc::new(FakeWidget::mounted(&[]));
    let (handle, _events) = event_bus();
    let submitter = CartSubmitter::new(
        Arc::clone(&gateway),
        widget,
        session,
        Arc::new(AvailabilityGate::new()),
        handle,
        &CartSyncConfig::default(),
    );

    submitter.submit(monogram_request()).await.unwrap();

    assert_eq!(gateway.transport().operations(), vec![Operation::CartLinesAdd]);
}

#[tokio::test]
async fn test_projected_attributes_reach_gateway() {
    let mut gateway = MockGateway::new();
    gateway
        .expect_create_or_append()
        .withf(|draft| {
            draft.merchandise_id.as_str() == VARIANT
                && draft.quantity == 1
                && draft.attributes
                    == vec![
                        KeyValue::new("Gift Wrap", "Yes"),
                        KeyValue::new("Monogram", "AB"),
                    ]
        })
        .times(1)
        .returning(|_| Ok(CartId::new(NEW_CART)));
    let h = harness(Arc::new(gateway), empty_session());

    h.submitter.submit(monogram_request()).await.unwrap();
}

#[tokio::test]
async fn test_rejected_submit_keeps_session() {
    let mut gateway = MockGateway::new();
    gateway
        .expect_create_or_append()
        .times(1)
        .returning(|_| Err(CartError::Rejected(vec!["Merchandise is sold out".to_string()])));
    let mut h = harness(Arc::new(gateway), empty_session());

    let err = h.submitter.submit(monogram_request()).await.unwrap_err();

    assert!(matches!(err, SubmitError::Cart(CartError::Rejected(_))));
    assert_eq!(h.session.current(), None);
    assert_eq!(h.submitter.phase(), SubmitPhase::Failed);
    assert_eq!(h.events.try_next(), None);
    assert!(h.widget.opened_hosts().is_empty());
}

#[tokio::test]
async fn test_unavailable_makes_no_call() {
    let mut gateway = MockGateway::new();
    gateway.expect_create_or_append().times(0);
    let h = harness(Arc::new(gateway), empty_session());
    h.gate.observe("false");

    let err = h.submitter.submit(monogram_request()).await.unwrap_err();

    assert!(matches!(err, SubmitError::Unavailable));
    assert_eq!(h.submitter.phase(), SubmitPhase::Unavailable);
}

#[tokio::test]
async fn test_missing_variant_makes_no_call() {
    let mut gateway = MockGateway::new();
    gateway.expect_create_or_append().times(0);
    let h = harness(Arc::new(gateway), empty_session());

    let err = h.submitter.submit(SubmitRequest::default()).await.unwrap_err();
    assert!(matches!(err, SubmitError::MissingVariant));

    let err = h.submitter.submit(SubmitRequest::new("   ")).await.unwrap_err();
    assert!(matches!(err, SubmitError::MissingVariant));
    assert_eq!(h.submitter.phase(), SubmitPhase::Ready);
}

#[tokio::test(start_paused = true)]
async fn test_feedback_resets_to_ready() {
    let mut gateway = MockGateway::new();
    gateway
        .expect_create_or_append()
        .returning(|_| Ok(CartId::new(NEW_CART)));
    let h = harness(Arc::new(gateway), empty_session());

    h.submitter.submit(monogram_request()).await.unwrap();
    assert_eq!(h.submitter.phase(), SubmitPhase::Added);

    tokio::time::sleep(Duration::from_millis(1_900)).await;
    assert_eq!(h.submitter.phase(), SubmitPhase::Added);

    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(h.submitter.phase(), SubmitPhase::Ready);
}

#[tokio::test(start_paused = true)]
async fn test_feedback_resets_to_unavailable_when_gate_closed() {
    let mut gateway = MockGateway::new();
    gateway
        .expect_create_or_append()
        .returning(|_| Err(CartError::transport("timeout")));
    let h = harness(Arc::new(gateway), empty_session());

    h.submitter.submit(monogram_request()).await.unwrap_err();
    h.gate.observe("false");

    tokio::time::sleep(Duration::from_secs(3)).await;
    assert_eq!(h.submitter.phase(), SubmitPhase::Unavailable);
}

#[tokio::test(start_paused = true)]
async fn test_gate_changes_reach_phase() {
    let gateway = MockGateway::new();
    let h = harness(Arc::new(gateway), empty_session());
    let watcher = h.submitter.watch_availability();

    h.gate.observe("false");
    tokio::time::sleep(Duration::from_millis(1)).await;
    assert_eq!(h.submitter.phase(), SubmitPhase::Unavailable);

    h.gate.observe(" TRUE ");
    tokio::time::sleep(Duration::from_millis(1)).await;
    assert_eq!(h.submitter.phase(), SubmitPhase::Ready);
    watcher.abort();
}

/// Gateway that takes a while to add a line
#[derive(Default)]
struct SlowGateway {
    calls: AtomicUsize,
}

#[async_trait]
impl CartGateway for SlowGateway {
    async fn create_or_append(&self, _draft: &LineItemDraft) -> Result<CartId, CartError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(100)).await;
        Ok(CartId::new(NEW_CART))
    }

    async fn fetch_lines(&self) -> Result<Vec<CartLineRecord>, CartError> {
        Ok(Vec::new())
    }
}

#[tokio::test(start_paused = true)]
async fn test_second_submit_while_processing_is_busy() {
    let h = harness(Arc::new(SlowGateway::default()), empty_session());

    let (first, second) = tokio::join!(
        h.submitter.submit(monogram_request()),
        h.submitter.submit(monogram_request()),
    );

    assert!(first.is_ok());
    assert!(matches!(second, Err(SubmitError::Busy)));
    assert_eq!(h.widget.opened_hosts().len(), 1);
    assert_eq!(h.gateway.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn test_gate_flicker_keeps_running_submit_busy() {
    let h = harness(Arc::new(SlowGateway::default()), empty_session());

    let (first, during) = tokio::join!(h.submitter.submit(monogram_request()), async {
        tokio::time::sleep(Duration::from_millis(10)).await;
        h.gate.observe("false");
        let closed = h.submitter.submit(monogram_request()).await;
        let phase = h.submitter.phase();
        h.gate.observe("true");
        let reopened = h.submitter.submit(monogram_request()).await;
        (closed, phase, reopened)
    });

    let (closed, phase, reopened) = during;
    assert!(matches!(closed, Err(SubmitError::Unavailable)));
    assert_eq!(phase, SubmitPhase::Processing);
    assert!(matches!(reopened, Err(SubmitError::Busy)));
    assert!(first.is_ok());
    assert_eq!(h.gateway.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn test_watcher_stops_when_gate_dropped() {
    let h = harness(Arc::new(MockGateway::new()), empty_session());
    let watcher = h.submitter.watch_availability();

    let Harness { submitter, gate, .. } = h;
    drop(submitter);
    drop(gate);

    let finished = tokio::time::timeout(Duration::from_secs(1), watcher).await;
    assert!(finished.is_ok());
}

#[tokio::test]
async fn test_fake_gateway_records_projected_draft() {
    let gateway = FakeGateway::new(Vec::new());
    gateway.queue_add_result(Err(CartError::Rejected(vec!["Quantity limit reached".to_string()])));
    let h = harness(Arc::new(gateway), empty_session());

    let err = h.submitter.submit(monogram_request()).await.unwrap_err();
    assert!(matches!(err, SubmitError::Cart(CartError::Rejected(_))));

    // Failure feedback does not block a retry
    let cart_id = h.submitter.submit(monogram_request()).await;
    assert!(cart_id.is_ok());

    let drafts = h.gateway.drafts();
    assert_eq!(drafts.len(), 2);
    assert_eq!(drafts[0].merchandise_id.as_str(), VARIANT);
    assert_eq!(
        drafts[0].attributes,
        vec![
            KeyValue::new("Gift Wrap", "Yes"),
            KeyValue::new("Monogram", "AB"),
        ]
    );
    assert_eq!(h.session.current(), Some(CartId::new("gid://shopify/Cart/test")));
}
