//! Add-to-cart submission
//!
//! The flow behind the custom buy button:
//! 1. Refuse locally while unavailable or without a variant id
//! 2. Project control data into line attributes
//! 3. Add the line through the gateway (creating the cart if needed)
//! 4. Record the cart id with compare-and-set
//! 5. Remount the cart widget, hand the new host to the loop, open the drawer
//!
//! Progress is published as a [`SubmitPhase`] that falls back to `Ready` (or
//! `Unavailable`) after a short feedback delay.

use crate::bus::{LoopHandle, SignalKind};
use crate::error::SubmitError;
use cartsync_core::{
    AttributeProjector, AvailabilityGate, CartId, CartSession, CartSyncConfig, CartWidget,
    LineItemDraft, MerchandiseId,
};
use cartsync_gateway::CartGateway;
use indexmap::IndexMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// What the submit control reports to the shopper
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitPhase {
    /// Waiting for the shopper
    Ready,
    /// A line is being added
    Processing,
    /// Last submission succeeded
    Added,
    /// Last submission failed
    Failed,
    /// Gate closed; submissions are refused
    Unavailable,
}

/// Data gathered from the page for one submission
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubmitRequest {
    /// Text of the variant id node, if present
    pub variant_id: Option<String>,
    /// Custom data fields attached to the control
    pub fields: IndexMap<String, String>,
    /// Free-text personalization input
    pub note: Option<String>,
}

impl SubmitRequest {
    /// Request for `variant_id` with no fields
    #[must_use]
    pub fn new(variant_id: impl Into<String>) -> Self {
        Self {
            variant_id: Some(variant_id.into()),
            ..Self::default()
        }
    }

    /// Add one custom data field; a repeated key overwrites in place
    #[must_use]
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    /// Attach the personalization text
    #[must_use]
    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }
}

/// Drives submissions against one cart session
pub struct CartSubmitter<G, W: ?Sized> {
    gateway: Arc<G>,
    widget: Arc<W>,
    session: Arc<CartSession>,
    gate: Arc<AvailabilityGate>,
    projector: AttributeProjector,
    loop_handle: LoopHandle,
    phase: Arc<watch::Sender<SubmitPhase>>,
    attempt: Arc<AtomicU64>,
    feedback_reset: Duration,
}

impl<G, W> CartSubmitter<G, W>
where
    G: CartGateway,
    W: CartWidget + ?Sized,
{
    /// Phase starts at `Ready` or `Unavailable` from the gate
    #[must_use]
    pub fn new(
        gateway: Arc<G>,
        widget: Arc<W>,
        session: Arc<CartSession>,
        gate: Arc<AvailabilityGate>,
        loop_handle: LoopHandle,
        config: &CartSyncConfig,
    ) -> Self {
        let initial = if gate.is_eligible() {
            SubmitPhase::Ready
        } else {
            SubmitPhase::Unavailable
        };
        let (phase, _rx) = watch::channel(initial);
        Self {
            gateway,
            widget,
            session,
            gate,
            projector: AttributeProjector::new(config.note_label.clone()),
            loop_handle,
            phase: Arc::new(phase),
            attempt: Arc::new(AtomicU64::new(0)),
            feedback_reset: config.feedback_reset(),
        }
    }

    /// Current phase
    #[inline]
    #[must_use]
    pub fn phase(&self) -> SubmitPhase {
        *self.phase.borrow()
    }

    /// Receiver that sees every phase change
    #[inline]
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<SubmitPhase> {
        self.phase.subscribe()
    }

    /// Add one line for `request`
    ///
    /// # Errors
    /// - `SubmitError::Unavailable` / `MissingVariant` / `Busy` without a request
    /// - `SubmitError::Cart` when the gateway fails; the session is untouched
    /// - `SubmitError::Session` when the session moved while the line was added
    pub async fn submit(&self, request: SubmitRequest) -> Result<CartId, SubmitError> {
        if !self.gate.is_eligible() {
            // A running submission keeps its phase until it settles
            self.phase.send_if_modified(|phase| match phase {
                SubmitPhase::Processing | SubmitPhase::Unavailable => false,
                _ => {
                    *phase = SubmitPhase::Unavailable;
                    true
                }
            });
            return Err(SubmitError::Unavailable);
        }

        let Some(variant) = request
            .variant_id
            .as_deref()
            .map(str::trim)
            .filter(|v| !v.is_empty())
        else {
            tracing::error!("variant id not found; submission skipped");
            return Err(SubmitError::MissingVariant);
        };

        let started = self.phase.send_if_modified(|phase| {
            if *phase == SubmitPhase::Processing {
                false
            } else {
                *phase = SubmitPhase::Processing;
                true
            }
        });
        if !started {
            return Err(SubmitError::Busy);
        }
        let attempt = self.attempt.fetch_add(1, Ordering::SeqCst) + 1;

        let attributes = self.projector.project(&request.fields, request.note.as_deref());
        let draft = LineItemDraft::new(MerchandiseId::new(variant), attributes);

        let result = self.add_line(&draft).await;
        match &result {
            Ok(cart_id) => {
                tracing::info!(cart_id = %cart_id, merchandise_id = %draft.merchandise_id, "submission added");
                self.phase.send_replace(SubmitPhase::Added);
                self.refresh_widget();
            }
            Err(e) => {
                tracing::warn!(error = %e, "submission failed");
                self.phase.send_replace(SubmitPhase::Failed);
            }
        }
        self.schedule_reset(attempt);
        result
    }

    async fn add_line(&self, draft: &LineItemDraft) -> Result<CartId, SubmitError> {
        let expected = self.session.current();
        let cart_id = self.gateway.create_or_append(draft).await?;
        self.session.compare_and_set(expected.as_ref(), cart_id.clone())?;
        Ok(cart_id)
    }

    /// Remount the widget so it loads the new line, then open it
    fn refresh_widget(&self) {
        let host = self.widget.replace_host();
        self.loop_handle.signal(host, SignalKind::Replaced);
        if let Err(e) = self.widget.open_drawer(host) {
            tracing::warn!(error = %e, "could not open cart drawer");
        }
    }

    /// Return to the resting phase unless another submission started since
    fn schedule_reset(&self, attempt: u64) {
        let phase = Arc::clone(&self.phase);
        let latest = Arc::clone(&self.attempt);
        let gate = Arc::clone(&self.gate);
        let delay = self.feedback_reset;

        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if latest.load(Ordering::SeqCst) != attempt {
                return;
            }
            phase.send_if_modified(|current| {
                if matches!(current, SubmitPhase::Added | SubmitPhase::Failed) {
                    *current = resting_phase(&gate);
                    true
                } else {
                    false
                }
            });
        });
    }

    /// Mirror gate changes into the phase while no submission is running
    ///
    /// The task ends once the gate or this submitter is dropped.
    pub fn watch_availability(&self) -> JoinHandle<()> {
        let phase = Arc::downgrade(&self.phase);
        let gate = Arc::downgrade(&self.gate);
        let mut rx = self.gate.subscribe();

        tokio::spawn(async move {
            while rx.changed().await.is_ok() {
                let (Some(phase), Some(gate)) = (phase.upgrade(), gate.upgrade()) else {
                    break;
                };
                phase.send_if_modified(|current| {
                    if matches!(current, SubmitPhase::Ready | SubmitPhase::Unavailable) {
                        let next = resting_phase(&gate);
                        let changed = *current != next;
                        *current = next;
                        changed
                    } else {
                        false
                    }
                });
            }
        })
    }
}

fn resting_phase(gate: &AvailabilityGate) -> SubmitPhase {
    if gate.is_eligible() {
        SubmitPhase::Ready
    } else {
        SubmitPhase::Unavailable
    }
}
