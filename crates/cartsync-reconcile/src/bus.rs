//! Event bus feeding the reconciliation loop
//!
//! Every source of work (widget lifecycle signals, explicit triggers from the
//! submit flow, shutdown) lands on one unbounded channel with a single
//! consumer. Senders never block.

use cartsync_core::{HostRef, ReconciliationTrigger};
use tokio::sync::mpsc;

/// What the widget reported
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalKind {
    /// Host finished mounting
    Ready,
    /// Host was swapped for a fresh instance
    Replaced,
    /// Drawer open attribute changed
    OpenChanged(bool),
    /// Widget redrew its content
    Rendered,
    /// Rendered subtree changed without a redraw event
    ContentMutated,
}

/// Signal tagged with the host instance that produced it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WidgetSignal {
    /// Host instance the signal came from
    pub host: HostRef,
    /// What happened
    pub kind: SignalKind,
}

impl WidgetSignal {
    /// Trigger this signal maps to, if any
    ///
    /// Lifecycle signals (`Ready`, `Replaced`) re-attach first and then load.
    #[must_use]
    pub fn trigger(&self) -> Option<ReconciliationTrigger> {
        match self.kind {
            SignalKind::Ready | SignalKind::Replaced => Some(ReconciliationTrigger::InitialLoad),
            SignalKind::OpenChanged(true) => Some(ReconciliationTrigger::DrawerOpened),
            SignalKind::OpenChanged(false) => None,
            SignalKind::Rendered => Some(ReconciliationTrigger::RenderSignal),
            SignalKind::ContentMutated => Some(ReconciliationTrigger::BadgeOnly),
        }
    }

    /// `Ready` or `Replaced`
    #[inline]
    #[must_use]
    pub fn is_lifecycle(&self) -> bool {
        matches!(self.kind, SignalKind::Ready | SignalKind::Replaced)
    }
}

/// Messages consumed by the loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopEvent {
    /// Explicit request for a pass
    Trigger(ReconciliationTrigger),
    /// Something happened on a widget host
    Signal(WidgetSignal),
    /// Stop after the current event
    Shutdown,
}

/// Sending side of the bus
#[derive(Debug, Clone)]
pub struct LoopHandle {
    tx: mpsc::UnboundedSender<LoopEvent>,
}

impl LoopHandle {
    /// Queue a trigger; false if the loop has stopped
    pub fn trigger(&self, trigger: ReconciliationTrigger) -> bool {
        self.send(LoopEvent::Trigger(trigger))
    }

    /// Forward a widget signal; false if the loop has stopped
    pub fn signal(&self, host: HostRef, kind: SignalKind) -> bool {
        self.send(LoopEvent::Signal(WidgetSignal { host, kind }))
    }

    /// Ask the loop to stop after the current step
    pub fn shutdown(&self) -> bool {
        self.send(LoopEvent::Shutdown)
    }

    /// True once the loop has stopped
    #[inline]
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    fn send(&self, event: LoopEvent) -> bool {
        match self.tx.send(event) {
            Ok(()) => true,
            Err(_) => {
                tracing::debug!(?event, "reconciliation loop gone; event dropped");
                false
            }
        }
    }
}

/// Receiving side of the bus
#[derive(Debug)]
pub struct EventStream {
    rx: mpsc::UnboundedReceiver<LoopEvent>,
}

impl EventStream {
    /// Next event; `None` once every handle is dropped
    pub async fn next(&mut self) -> Option<LoopEvent> {
        self.rx.recv().await
    }

    /// Next event if one is already queued
    pub fn try_next(&mut self) -> Option<LoopEvent> {
        self.rx.try_recv().ok()
    }
}

/// Create a connected handle and stream
#[must_use]
pub fn event_bus() -> (LoopHandle, EventStream) {
    let (tx, rx) = mpsc::unbounded_channel();
    (LoopHandle { tx }, EventStream { rx })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signals_map_to_triggers() {
        let host = HostRef::new(1);
        let sig = |kind| WidgetSignal { host, kind };
        assert_eq!(
            sig(SignalKind::OpenChanged(true)).trigger(),
            Some(ReconciliationTrigger::DrawerOpened)
        );
        assert_eq!(sig(SignalKind::OpenChanged(false)).trigger(), None);
        assert_eq!(
            sig(SignalKind::Rendered).trigger(),
            Some(ReconciliationTrigger::RenderSignal)
        );
        assert_eq!(
            sig(SignalKind::ContentMutated).trigger(),
            Some(ReconciliationTrigger::BadgeOnly)
        );
        assert!(sig(SignalKind::Replaced).is_lifecycle());
    }

    #[tokio::test]
    async fn events_arrive_in_order() {
        let (handle, mut stream) = event_bus();
        handle.trigger(ReconciliationTrigger::InitialLoad);
        handle.signal(HostRef::new(2), SignalKind::Rendered);
        handle.shutdown();

        assert_eq!(
            stream.next().await,
            Some(LoopEvent::Trigger(ReconciliationTrigger::InitialLoad))
        );
        assert!(matches!(stream.next().await, Some(LoopEvent::Signal(_))));
        assert_eq!(stream.next().await, Some(LoopEvent::Shutdown));
    }

    #[test]
    fn send_after_close_reports_false() {
        let (handle, stream) = event_bus();
        drop(stream);
        assert!(handle.is_closed());
        assert!(!handle.trigger(ReconciliationTrigger::BadgeOnly));
    }
}
