//! # Transaction Requests
//!
//! Chain-agnostic description of the escrow calls the coordinator emits.
//! Chain clients turn these into signed transactions; the core never holds
//! connectivity itself.

use super::errors::{Hash, SwapError, TxHash};
use super::preimage::Preimage;
use super::value_objects::ChainType;
use primitive_types::U256;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Seconds between the Unix epoch and the ledger epoch (2000-01-01T00:00:00Z).
pub const RIPPLE_EPOCH_OFFSET: u64 = 946_684_800;

/// Log emitted by the EVM escrow factory for a new destination escrow.
pub const DST_ESCROW_CREATED: &str = "DstEscrowCreated";
/// Ledger metadata entry for a created escrow.
pub const ESCROW_CREATED: &str = "EscrowCreated";

/// Convert a Unix timestamp to ledger time.
pub fn to_ripple_time(unix: u64) -> Result<u32, SwapError> {
    let shifted = unix.checked_sub(RIPPLE_EPOCH_OFFSET).ok_or_else(|| {
        SwapError::Validation(format!("timestamp {unix} predates the ledger epoch"))
    })?;
    u32::try_from(shifted)
        .map_err(|_| SwapError::Validation(format!("timestamp {unix} exceeds ledger time range")))
}

/// Convert ledger time back to Unix seconds.
pub fn from_ripple_time(ripple: u32) -> u64 {
    u64::from(ripple) + RIPPLE_EPOCH_OFFSET
}

/// Parameters the EVM escrow hashes into its address and re-checks on
/// every withdraw / cancel.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvmImmutables {
    /// `bytes32` order tag.
    pub order_hash: Hash,
    /// SHA-256 of the secret.
    pub hashlock: Hash,
    /// Party that funds the escrow and may cancel.
    pub maker: String,
    /// Party that may withdraw with the secret.
    pub taker: String,
    /// Token address (zero address for native).
    pub token: String,
    /// Locked amount.
    pub amount: U256,
    /// Native safety deposit sent with creation.
    pub safety_deposit: U256,
    /// Packed timelocks.
    pub timelocks: U256,
}

/// One escrow call.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ChainCall {
    /// `factory.createDstEscrow(immutables, srcCancellationTimestamp)`.
    EvmCreateDstEscrow {
        /// Factory contract.
        factory: String,
        /// Escrow parameters.
        immutables: EvmImmutables,
        /// Source-side cancellation timestamp.
        src_cancellation_timestamp: u64,
        /// Native value attached (the safety deposit).
        value: U256,
    },
    /// `escrow.withdraw(secret, immutables)`.
    EvmWithdraw {
        /// Escrow contract.
        escrow: String,
        /// Revealed secret.
        secret: Preimage,
        /// Immutables rebuilt with the on-chain deployedAt.
        immutables: EvmImmutables,
    },
    /// `escrow.cancel(immutables)`.
    EvmCancel {
        /// Escrow contract.
        escrow: String,
        /// Immutables rebuilt with the on-chain deployedAt.
        immutables: EvmImmutables,
    },
    /// Ledger `EscrowCreate`.
    LedgerEscrowCreate {
        /// Receiving account.
        destination: String,
        /// Amount in drops.
        amount_drops: u64,
        /// Upper-case hex crypto-condition.
        condition: String,
        /// Ledger time after which finish is allowed.
        finish_after: u32,
        /// Ledger time after which cancel is allowed.
        cancel_after: u32,
    },
    /// Ledger `EscrowFinish`.
    LedgerEscrowFinish {
        /// Account that created the escrow.
        owner: String,
        /// Sequence of the creating transaction.
        offer_sequence: u32,
        /// Upper-case hex crypto-condition.
        condition: String,
        /// Upper-case hex fulfillment.
        fulfillment: String,
    },
    /// Ledger `EscrowCancel`.
    LedgerEscrowCancel {
        /// Account that created the escrow.
        owner: String,
        /// Sequence of the creating transaction.
        offer_sequence: u32,
    },
}

impl ChainCall {
    /// Chain family this call targets.
    pub fn chain(&self) -> ChainType {
        match self {
            ChainCall::EvmCreateDstEscrow { .. }
            | ChainCall::EvmWithdraw { .. }
            | ChainCall::EvmCancel { .. } => ChainType::Evm,
            _ => ChainType::Xrpl,
        }
    }

    /// Short method name for logs.
    pub fn method(&self) -> &'static str {
        match self {
            ChainCall::EvmCreateDstEscrow { .. } => "createDstEscrow",
            ChainCall::EvmWithdraw { .. } => "withdraw",
            ChainCall::EvmCancel { .. } => "cancel",
            ChainCall::LedgerEscrowCreate { .. } => "EscrowCreate",
            ChainCall::LedgerEscrowFinish { .. } => "EscrowFinish",
            ChainCall::LedgerEscrowCancel { .. } => "EscrowCancel",
        }
    }
}

/// A call plus the account that must sign it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionRequest {
    /// Target chain.
    pub chain: ChainType,
    /// Signing account.
    pub from: String,
    /// Call body.
    pub call: ChainCall,
}

impl TransactionRequest {
    /// Build a request; the chain is taken from the call.
    pub fn new(from: impl Into<String>, call: ChainCall) -> Self {
        Self {
            chain: call.chain(),
            from: from.into(),
            call,
        }
    }
}

/// Block selector for timestamp lookups.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum BlockRef {
    /// Specific block / ledger index.
    Number(u64),
    /// Chain head.
    Latest,
}

/// Execution outcome of a mined transaction.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TxStatus {
    /// Executed.
    Success,
    /// Mined but failed.
    Reverted {
        /// Revert reason or engine result.
        reason: String,
    },
}

/// Decoded event / metadata entry from a receipt.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainLog {
    /// Event name.
    pub name: String,
    /// Decoded fields.
    pub fields: BTreeMap<String, String>,
}

impl ChainLog {
    /// New log with no fields.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: BTreeMap::new(),
        }
    }

    /// Add a field.
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    /// Field lookup.
    pub fn field(&self, key: &str) -> Option<&str> {
        self.fields.get(key).map(String::as_str)
    }
}

/// Confirmation report for a submitted transaction.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Confirmation {
    /// Transaction hash.
    pub tx_hash: TxHash,
    /// Execution status.
    pub status: TxStatus,
    /// Including block / ledger index.
    pub block_number: u64,
    /// Including block close time (Unix seconds).
    pub block_timestamp: u64,
    /// Decoded logs.
    pub logs: Vec<ChainLog>,
}

impl Confirmation {
    /// First log with the given name.
    pub fn find_log(&self, name: &str) -> Option<&ChainLog> {
        self.logs.iter().find(|log| log.name == name)
    }
}
