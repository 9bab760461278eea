//! cartsync reconcile
//!
//! Keeps the rendered cart widget in step with the remote cart:
//! - An event bus that collects widget signals and explicit triggers
//! - A single-consumer loop with debounce, one fetch in flight and a cooldown
//! - Overlay injection and badge updates for each pass
//! - The add-to-cart submission flow that feeds new lines into the loop
//!
//! # Example
//!
//! ```rust,ignore
//! use cartsync_reconcile::{reconcile_loop, LoopSettings, SignalKind};
//! use std::sync::Arc;
//!
//! let (engine, handle) = reconcile_loop(gateway, widget, LoopSettings::default());
//! let task = engine.spawn();
//!
//! handle.signal(host, SignalKind::OpenChanged(true));
//! handle.shutdown();
//! let report = task.await?;
//! ```

pub mod bus;
pub mod effects;
pub mod engine;
pub mod error;
pub mod state_machine;
pub mod submit;

pub use bus::{event_bus, EventStream, LoopEvent, LoopHandle, SignalKind, WidgetSignal};
pub use effects::{apply_overlays, refresh_badge, OverlayOutcome};
pub use engine::{reconcile_loop, LoopReport, LoopSettings, ReconcileLoop};
pub use error::SubmitError;
pub use state_machine::{allowed_transitions, validate_transition, LoopState, StateMachineError};
pub use submit::{CartSubmitter, SubmitPhase, SubmitRequest};
