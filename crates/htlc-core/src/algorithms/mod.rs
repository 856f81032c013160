//! # Algorithms Module
//!
//! Pure functions: timelock packing, secret commitments, lifecycle
//! derivation.

pub mod commitment;
pub mod lifecycle;
pub mod timelocks;

pub use commitment::{
    decode_condition, decode_fulfillment, encode_condition, encode_fulfillment,
    ensure_consistent, hashlock_of, verify_condition, verify_hashlock, SecretCommitment,
};
pub use lifecycle::{
    derive_status, failed_attempts, is_completed, leg_status_from_history, pending_projection,
    window_countdown, LegState, WindowCountdown,
};
pub use timelocks::{pack, unpack, Timelocks, MAX_OFFSET};
