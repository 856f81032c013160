//! # Domain Errors
//!
//! Error taxonomy for swap coordination. Every public action either succeeds
//! with a transaction hash or fails with one of these kinds.

use super::value_objects::{ChainType, MonitorStatus, TimelockStage};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Hash type (32-byte SHA-256).
pub type Hash = [u8; 32];

/// Transaction hash as reported by the chain.
pub type TxHash = String;

/// Coarse error classification exposed to callers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    /// Malformed or missing input.
    Validation,
    /// Wrong caller or window not open yet.
    Precondition,
    /// RPC or network failure, including timeouts.
    ChainSubmission,
    /// Transaction mined but reverted.
    ChainRevert,
    /// Hashlock and condition disagree.
    EncodingMismatch,
    /// Store unavailable.
    Persistence,
    /// Record does not exist.
    NotFound,
}

/// Which precondition check refused a claim or refund.
#[derive(Clone, Debug, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum PreconditionFailure {
    /// Caller is not the party allowed to act on this leg.
    #[error("wrong caller: expected {expected}, got {actual}")]
    WrongCaller {
        /// Address recorded for the leg.
        expected: String,
        /// Address that asked.
        actual: String,
    },

    /// Window has not opened yet.
    #[error("too early: now={now}, window opens at {opens_at}")]
    TooEarly {
        /// Current time (Unix seconds).
        now: u64,
        /// Window start (Unix seconds).
        opens_at: u64,
    },

    /// Claim attempted without a known secret.
    #[error("secret is not known")]
    MissingSecret,

    /// Lock transaction for the leg was never confirmed.
    #[error("{chain} leg is not locked")]
    LegNotLocked {
        /// Leg.
        chain: ChainType,
    },

    /// Leg monitor already reached a terminal state.
    #[error("{chain} leg already settled ({status})")]
    LegSettled {
        /// Leg.
        chain: ChainType,
        /// Terminal monitor status.
        status: MonitorStatus,
    },

    /// No leg has been claimed, so no secret can have been revealed.
    #[error("secret not revealed: no leg has been claimed")]
    NoClaimObserved,

    /// Leg failed too many times.
    #[error("retry budget exhausted on {chain} leg ({retries}/{max})")]
    RetriesExhausted {
        /// Leg.
        chain: ChainType,
        /// Retries so far.
        retries: u32,
        /// Configured maximum.
        max: u32,
    },
}

/// Timelock codec errors.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum TimelockError {
    /// Stage offset from deployedAt is negative or wider than 32 bits.
    #[error("Timelock offset for {stage} out of range: {offset} (allowed 0..=4294967295)")]
    OffsetOutOfRange {
        /// Offending stage.
        stage: TimelockStage,
        /// Computed offset (timestamp - deployedAt).
        offset: i128,
    },

    /// deployedAt does not fit its 32-bit field.
    #[error("deployedAt {0} does not fit in 32 bits")]
    DeployedAtOutOfRange(u64),
}

/// Crypto-condition encoding errors.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum CommitmentError {
    /// Not valid hex.
    #[error("Invalid hex: {0}")]
    InvalidHex(String),

    /// Wrong byte length.
    #[error("Invalid {what} length: expected {expected} bytes, got {actual}")]
    InvalidLength {
        /// Encoding being decoded.
        what: &'static str,
        /// Expected length.
        expected: usize,
        /// Actual length.
        actual: usize,
    },

    /// DER header or trailer does not match preimage-sha-256.
    #[error("Invalid {0} framing")]
    InvalidFraming(&'static str),
}

/// Swap coordination error.
#[derive(Clone, Debug, Error)]
pub enum SwapError {
    /// Malformed or missing input. Never retried.
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Caller or timing check failed. Retryable later.
    #[error("Precondition failed: {0}")]
    Precondition(#[from] PreconditionFailure),

    /// Submission or RPC failure. Retryable with backoff.
    #[error("Chain submission failed on {chain}: {message}")]
    ChainSubmission {
        /// Chain the call was sent to.
        chain: ChainType,
        /// Transport detail.
        message: String,
    },

    /// Transaction reverted on chain. Not retried automatically.
    #[error("Transaction {tx_hash} reverted on {chain}: {reason}")]
    ChainRevert {
        /// Chain.
        chain: ChainType,
        /// Reverted transaction.
        tx_hash: TxHash,
        /// Revert reason / engine result code.
        reason: String,
    },

    /// Hashlock and ledger condition disagree. Configuration bug.
    #[error("Encoding mismatch: {0}")]
    EncodingMismatch(String),

    /// Store unavailable. Retryable with backoff.
    #[error("Persistence failure: {0}")]
    Persistence(String),

    /// Record missing from the store.
    #[error("Record not found: {0}")]
    NotFound(String),

    /// External call exceeded its deadline.
    #[error("{operation} timed out after {timeout_ms}ms")]
    Timeout {
        /// Operation name.
        operation: String,
        /// Timeout that elapsed.
        timeout_ms: u64,
    },
}

impl SwapError {
    /// Coarse classification.
    pub fn kind(&self) -> ErrorKind {
        match self {
            SwapError::Validation(_) => ErrorKind::Validation,
            SwapError::Precondition(_) => ErrorKind::Precondition,
            SwapError::ChainSubmission { .. } | SwapError::Timeout { .. } => {
                ErrorKind::ChainSubmission
            }
            SwapError::ChainRevert { .. } => ErrorKind::ChainRevert,
            SwapError::EncodingMismatch(_) => ErrorKind::EncodingMismatch,
            SwapError::Persistence(_) => ErrorKind::Persistence,
            SwapError::NotFound(_) => ErrorKind::NotFound,
        }
    }

    /// Whether an automatic retry with backoff is allowed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            SwapError::ChainSubmission { .. } | SwapError::Timeout { .. } | SwapError::Persistence(_)
        )
    }

    /// Whether a submission may be sent again without risking a second
    /// broadcast. A timed-out submit may already be on the wire.
    pub fn is_resubmittable(&self) -> bool {
        matches!(self, SwapError::ChainSubmission { .. })
    }

    /// Whether the failure came from talking to a chain.
    pub fn is_chain_failure(&self) -> bool {
        matches!(
            self,
            SwapError::ChainSubmission { .. } | SwapError::ChainRevert { .. } | SwapError::Timeout { .. }
        )
    }
}

impl From<TimelockError> for SwapError {
    fn from(err: TimelockError) -> Self {
        SwapError::Validation(err.to_string())
    }
}

impl From<CommitmentError> for SwapError {
    fn from(err: CommitmentError) -> Self {
        SwapError::EncodingMismatch(err.to_string())
    }
}

/// Structured failure returned by public actions.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionError {
    /// Classification.
    pub kind: ErrorKind,
    /// Human-readable detail.
    pub message: String,
    /// Whether the caller may retry.
    pub retryable: bool,
}

impl From<&SwapError> for ActionError {
    fn from(err: &SwapError) -> Self {
        Self {
            kind: err.kind(),
            message: err.to_string(),
            retryable: err.is_retryable() || matches!(err, SwapError::Precondition(_)),
        }
    }
}
