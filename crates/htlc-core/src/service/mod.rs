//! # Service Layer
//!
//! - `resolver`: pure claim / refund decision logic
//! - `coordinator`: `SwapApi` implementation driving both legs
//! - `monitor`: bounded reconciliation loop
//! - `retry`: exponential backoff for transient failures

mod coordinator;
mod monitor;
mod resolver;
mod retry;

pub use coordinator::SwapCoordinator;
pub use monitor::{reconcile_all, MonitorLoop, PassObserver, ReconcileReport};
pub use resolver::{order_hash_from_tag, ResolveContext, Resolver};
pub use retry::{with_backoff, with_backoff_when, RetryPolicy};
