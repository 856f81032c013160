//! # HTLC Core
//!
//! Cross-chain atomic swaps between an EVM chain and the XRP Ledger using
//! Hashed Timelock Contracts.
//!
//! **Architecture:** Hexagonal (DDD + Ports/Adapters)
//!
//! ## Purpose
//!
//! One secret locks funds on both chains. Claiming on one chain reveals the
//! secret for the other; timelocks bound how long either party waits before
//! reclaiming funds.
//!
//! - EVM side: `hashlock = SHA-256(secret)`, seven-stage timelocks packed
//!   into one `uint256` relative to the escrow's `deployedAt`
//! - Ledger side: preimage-SHA-256 crypto-condition / fulfillment pair over
//!   the same secret
//!
//! ## Safety Properties
//!
//! | Property | Enforcement |
//! |----------|-------------|
//! | One secret, two encodings | Condition and hashlock re-checked before every claim |
//! | On-chain timelocks | EVM windows rebuilt from the chain-reported `deployedAt` |
//! | Append-only history | Exactly one entry per transition, failures included |
//! | No double submission | Claims / refunds refused once a leg monitor is settled |
//! | Derived completion | `COMPLETED` only when both monitors report a claim |
//!
//! ## Module Structure
//!
//! ```text
//! htlc-core/
//! ├── domain/          # SwapRecord, EscrowMonitor, errors, config, calls
//! ├── algorithms/      # Timelock codec, commitments, lifecycle derivation
//! ├── ports/           # SwapApi, ChainClient, RecordStore, TimeSource
//! ├── adapters/        # In-memory store, manual clock, simulated chains
//! └── service/         # Resolver, SwapCoordinator, reconciliation loop
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod adapters;
pub mod algorithms;
pub mod domain;
pub mod ports;
pub mod service;

// Re-exports
pub use adapters::{InMemoryRecordStore, ManualClock, SimulatedChain};
pub use algorithms::{
    derive_status, encode_condition, encode_fulfillment, hashlock_of, leg_status_from_history,
    verify_condition, verify_hashlock, LegState, SecretCommitment, Timelocks,
};
pub use domain::{
    ActionError, ActionOutcome, ChainType, CoordinatorConfig, EscrowMonitor, ErrorKind,
    InitiatedSwap, MonitorStatus, PreconditionFailure, Preimage, SwapAction, SwapError,
    SwapEvent, SwapRecord, SwapRequest, SwapStatus, TimelockStage,
};
pub use ports::{ChainClient, RecordStore, SwapApi, SystemTimeSource, TimeSource};
pub use service::{
    reconcile_all, MonitorLoop, PassObserver, ReconcileReport, Resolver, SwapCoordinator,
};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
