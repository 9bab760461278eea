//! Reconciliation loop
//!
//! A single consumer task that turns widget signals and explicit triggers into
//! reconciliation passes:
//! - `InitialLoad` / `DrawerOpened` fetch immediately
//! - `RenderSignal` waits out a debounce window that restarts on every signal
//! - `BadgeOnly` recomputes the badge without touching the network
//!
//! At most one fetch is in flight. Fetch triggers that arrive meanwhile are
//! served by that fetch; triggers that arrive during the post-fetch cooldown
//! start one more fetch when the loop goes idle.

use crate::bus::{EventStream, LoopEvent, LoopHandle, WidgetSignal};
use crate::effects::{apply_overlays, refresh_badge};
use crate::state_machine::{validate_transition, LoopState};
use cartsync_core::{
    CartError, CartLineRecord, CartSyncConfig, CartWidget, HostRef, ReconciliationTrigger,
};
use cartsync_gateway::CartGateway;
use futures::future::BoxFuture;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;

/// Timing and filtering knobs for the loop
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoopSettings {
    /// Quiet window after the last render signal
    pub debounce: Duration,
    /// Cooldown after each fetch
    pub settle: Duration,
    /// Attribute keys with this prefix are never shown
    pub reserved_prefix: String,
}

impl LoopSettings {
    /// Settings taken from a loaded config
    #[must_use]
    pub fn from_config(config: &CartSyncConfig) -> Self {
        Self {
            debounce: config.debounce(),
            settle: config.settle(),
            reserved_prefix: config.reserved_prefix.clone(),
        }
    }
}

impl Default for LoopSettings {
    fn default() -> Self {
        Self::from_config(&CartSyncConfig::default())
    }
}

/// Counters reported when the loop stops
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoopReport {
    /// Passes whose effects were applied
    pub passes: usize,
    /// Reads started
    pub fetches: usize,
    /// Reads that returned an error
    pub failed_fetches: usize,
    /// Fetches completed after their host was replaced or detached
    pub discarded_stale: usize,
    /// Signals from a host generation that is no longer current
    pub ignored_signals: usize,
    /// Overlays added across all passes
    pub overlays_injected: usize,
    /// Successful badge writes
    pub badge_updates: usize,
    /// Hosts observed, including replacements
    pub attachments: usize,
}

type FetchResult = Result<Vec<CartLineRecord>, CartError>;

struct InFlight {
    host: HostRef,
    fetch: BoxFuture<'static, FetchResult>,
}

/// The reconciliation loop; build with [`ReconcileLoop::new`] and drive with `run`
pub struct ReconcileLoop<G, W: ?Sized> {
    gateway: Arc<G>,
    widget: Arc<W>,
    settings: LoopSettings,
    events: EventStream,
    state: LoopState,
    host: Option<HostRef>,
    pending: bool,
    debounce_deadline: Option<Instant>,
    cooldown_deadline: Option<Instant>,
    in_flight: Option<InFlight>,
    report: LoopReport,
}

impl<G, W> ReconcileLoop<G, W>
where
    G: CartGateway + 'static,
    W: CartWidget + ?Sized + 'static,
{
    /// Loop reading `events`; nothing runs until `run` is awaited
    #[must_use]
    pub fn new(gateway: Arc<G>, widget: Arc<W>, settings: LoopSettings, events: EventStream) -> Self {
        Self {
            gateway,
            widget,
            settings,
            events,
            state: LoopState::Idle,
            host: None,
            pending: false,
            debounce_deadline: None,
            cooldown_deadline: None,
            in_flight: None,
            report: LoopReport::default(),
        }
    }

    /// Spawn the loop on the current runtime
    pub fn spawn(self) -> JoinHandle<LoopReport> {
        tokio::spawn(self.run())
    }

    /// Process events until shutdown or until every handle is dropped
    pub async fn run(mut self) -> LoopReport {
        // A host that mounted before the loop started needs no readiness signal
        if let Some(host) = self.widget.host() {
            self.attach(host);
        }

        loop {
            let debounce = self.debounce_deadline;
            let cooldown = self.cooldown_deadline;

            tokio::select! {
                event = self.events.next() => match event {
                    Some(LoopEvent::Shutdown) | None => break,
                    Some(event) => self.handle_event(event),
                },
                (host, result) = wait_fetch(&mut self.in_flight), if self.in_flight.is_some() => {
                    self.complete_fetch(host, result);
                }
                _ = sleep_until(debounce), if debounce.is_some() => self.debounce_elapsed(),
                _ = sleep_until(cooldown), if cooldown.is_some() => self.cooldown_elapsed(),
            }
        }

        tracing::info!(
            passes = self.report.passes,
            fetches = self.report.fetches,
            failed = self.report.failed_fetches,
            "reconciliation loop stopped"
        );
        self.report
    }

    fn handle_event(&mut self, event: LoopEvent) {
        match event {
            LoopEvent::Trigger(trigger) => self.on_trigger(trigger),
            LoopEvent::Signal(signal) => self.on_signal(signal),
            LoopEvent::Shutdown => {}
        }
    }

    fn on_signal(&mut self, signal: WidgetSignal) {
        if signal.is_lifecycle() {
            if self.host.is_some_and(|current| signal.host < current) {
                self.report.ignored_signals += 1;
                return;
            }
            if self.host != Some(signal.host) {
                self.attach(signal.host);
            }
            return;
        }

        if self.host != Some(signal.host) {
            tracing::debug!(?signal, current = ?self.host, "signal from stale host ignored");
            self.report.ignored_signals += 1;
            return;
        }

        tracing::trace!(?signal, "widget signal");
        if let Some(trigger) = signal.trigger() {
            self.on_trigger(trigger);
        }
    }

    /// Observe a new host instance and load it
    fn attach(&mut self, host: HostRef) {
        tracing::debug!(generation = host.generation, "attached to cart host");
        self.host = Some(host);
        self.report.attachments += 1;
        // Render bursts from the previous instance no longer matter
        self.debounce_deadline = None;
        self.refresh_badge();
        self.on_trigger(ReconciliationTrigger::InitialLoad);
    }

    fn on_trigger(&mut self, trigger: ReconciliationTrigger) {
        match trigger {
            ReconciliationTrigger::BadgeOnly => self.refresh_badge(),
            ReconciliationTrigger::RenderSignal => {
                self.debounce_deadline = Some(Instant::now() + self.settings.debounce);
            }
            ReconciliationTrigger::InitialLoad | ReconciliationTrigger::DrawerOpened => {
                self.request_fetch(trigger);
            }
        }
    }

    fn request_fetch(&mut self, trigger: ReconciliationTrigger) {
        match self.state {
            LoopState::Idle => self.start_fetch(trigger),
            LoopState::FetchInFlight | LoopState::Cooldown => {
                tracing::trace!(?trigger, state = ?self.state, "fetch trigger queued");
                self.pending = true;
            }
        }
    }

    fn start_fetch(&mut self, trigger: ReconciliationTrigger) {
        let Some(host) = self.host else {
            tracing::debug!(?trigger, "no cart host yet; fetch skipped");
            return;
        };
        if !self.transition(LoopState::FetchInFlight) {
            return;
        }

        tracing::debug!(?trigger, generation = host.generation, "fetching cart lines");
        let gateway = Arc::clone(&self.gateway);
        self.in_flight = Some(InFlight {
            host,
            fetch: Box::pin(async move { gateway.fetch_lines().await }),
        });
        self.pending = false;
        self.report.fetches += 1;
    }

    fn complete_fetch(&mut self, host: HostRef, result: FetchResult) {
        self.in_flight = None;

        match result {
            Ok(records) if !self.is_current(host) => {
                tracing::debug!(
                    generation = host.generation,
                    lines = records.len(),
                    "host replaced during fetch; result discarded"
                );
                self.report.discarded_stale += 1;
                // Anything queued still needs data for the new host
                if self.host.is_some() {
                    self.pending = true;
                }
            }
            Ok(records) => {
                self.apply(host, &records);
                self.pending = false;
            }
            Err(e) if !self.is_current(host) => {
                tracing::debug!(
                    generation = host.generation,
                    error = %e,
                    "fetch for replaced host failed; result discarded"
                );
                self.report.failed_fetches += 1;
                self.report.discarded_stale += 1;
                if self.host.is_some() {
                    self.pending = true;
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "cart fetch failed; pass skipped");
                self.report.failed_fetches += 1;
                self.pending = false;
            }
        }

        if self.transition(LoopState::Cooldown) {
            self.cooldown_deadline = Some(Instant::now() + self.settings.settle);
        }
    }

    fn apply(&mut self, host: HostRef, records: &[CartLineRecord]) {
        match apply_overlays(&*self.widget, host, records, &self.settings.reserved_prefix) {
            Ok(outcome) => {
                self.report.overlays_injected += outcome.injected;
                self.report.passes += 1;
                tracing::debug!(
                    lines = records.len(),
                    injected = outcome.injected,
                    marked = outcome.already_marked,
                    unmatched = outcome.unmatched,
                    "reconciliation pass applied"
                );
            }
            Err(e) => {
                tracing::debug!(error = %e, "host went away while applying overlays");
                self.report.discarded_stale += 1;
                return;
            }
        }
        self.refresh_badge();
    }

    fn refresh_badge(&mut self) {
        let Some(host) = self.host else {
            return;
        };
        match refresh_badge(&*self.widget, host) {
            Ok(badge) => {
                self.report.badge_updates += 1;
                tracing::trace!(count = badge.count, "badge updated");
            }
            Err(e) => tracing::debug!(error = %e, "badge refresh skipped"),
        }
    }

    fn debounce_elapsed(&mut self) {
        self.debounce_deadline = None;
        self.request_fetch(ReconciliationTrigger::RenderSignal);
    }

    fn cooldown_elapsed(&mut self) {
        self.cooldown_deadline = None;
        if !self.transition(LoopState::Idle) {
            return;
        }
        if self.pending {
            self.start_fetch(ReconciliationTrigger::InitialLoad);
        }
    }

    fn is_current(&self, host: HostRef) -> bool {
        self.host == Some(host) && self.widget.is_attached(host)
    }

    fn transition(&mut self, to: LoopState) -> bool {
        match validate_transition(self.state, to) {
            Ok(()) => {
                self.state = to;
                true
            }
            Err(e) => {
                debug_assert!(false, "{e}");
                tracing::error!(error = %e, "reconciliation loop refused transition");
                false
            }
        }
    }
}

/// Build a loop and the handle that feeds it
pub fn reconcile_loop<G, W>(
    gateway: Arc<G>,
    widget: Arc<W>,
    settings: LoopSettings,
) -> (ReconcileLoop<G, W>, LoopHandle)
where
    G: CartGateway + 'static,
    W: CartWidget + ?Sized + 'static,
{
    let (handle, events) = crate::bus::event_bus();
    (ReconcileLoop::new(gateway, widget, settings, events), handle)
}

async fn wait_fetch(in_flight: &mut Option<InFlight>) -> (HostRef, FetchResult) {
    match in_flight {
        Some(flight) => {
            let result = (&mut flight.fetch).await;
            (flight.host, result)
        }
        None => std::future::pending().await,
    }
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}
