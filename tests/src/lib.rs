//! # HTLC Swap Test Suite
//!
//! Workspace-level tests that drive the coordinator end to end against
//! simulated chains and in-memory stores.
//!
//! ## Structure
//!
//! ```text
//! tests/
//! ├── src/
//! │   ├── fixtures.rs          # Harness, parties, request builders
//! │   └── integration/
//! │       ├── swap_flows.rs    # Happy path, refunds, window drift
//! │       ├── recovery.rs      # Retries, timeouts, store outages
//! │       └── concurrency.rs   # Concurrent legs and history appends
//! └── benches/
//!     └── swap_benchmarks.rs   # Commitment, timelock and initiate cost
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p htlc-tests
//! cargo test -p htlc-tests integration::recovery
//! cargo bench -p htlc-tests
//! ```

pub mod fixtures;
pub mod integration;
