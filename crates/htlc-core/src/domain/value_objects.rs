//! # Domain Value Objects
//!
//! Chain families, lifecycle states and timelock stages shared by the
//! swap record, the escrow monitors and the resolver.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Chain family of one swap leg.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ChainType {
    /// Account-based smart-contract chain holding the escrow factory.
    #[serde(rename = "EVM")]
    Evm,
    /// XRP Ledger with native conditional escrow.
    #[serde(rename = "XRPL")]
    Xrpl,
}

impl ChainType {
    /// Both legs, EVM first.
    pub const ALL: [ChainType; 2] = [ChainType::Evm, ChainType::Xrpl];

    /// The opposite leg.
    pub fn other(&self) -> ChainType {
        match self {
            ChainType::Evm => ChainType::Xrpl,
            ChainType::Xrpl => ChainType::Evm,
        }
    }

    /// Status recorded once this leg's lock transaction is confirmed.
    pub fn locked_status(&self) -> SwapStatus {
        match self {
            ChainType::Evm => SwapStatus::EvmOrderCreated,
            ChainType::Xrpl => SwapStatus::NonEvmEscrowLocked,
        }
    }

    /// Status recorded once this leg is claimed.
    pub fn claimed_status(&self) -> SwapStatus {
        match self {
            ChainType::Evm => SwapStatus::EvmClaimed,
            ChainType::Xrpl => SwapStatus::NonEvmClaimed,
        }
    }

    /// Status recorded once this leg is refunded.
    pub fn refunded_status(&self) -> SwapStatus {
        match self {
            ChainType::Evm => SwapStatus::EvmRefunded,
            ChainType::Xrpl => SwapStatus::NonEvmRefunded,
        }
    }

    /// Compare two addresses on this chain. EVM addresses are hex and
    /// case-insensitive; ledger addresses are base58 and compared exactly.
    pub fn same_address(&self, a: &str, b: &str) -> bool {
        match self {
            ChainType::Evm => a.eq_ignore_ascii_case(b),
            ChainType::Xrpl => a == b,
        }
    }
}

impl fmt::Display for ChainType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChainType::Evm => f.write_str("EVM"),
            ChainType::Xrpl => f.write_str("XRPL"),
        }
    }
}

/// Aggregate swap status, a projection of the latest recorded transition.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SwapStatus {
    /// Record created, nothing locked yet.
    #[default]
    Initiated,
    /// EVM destination escrow created.
    EvmOrderCreated,
    /// Ledger escrow created.
    NonEvmEscrowLocked,
    /// Secret observed and verified against the hashlock.
    SecretRevealed,
    /// EVM leg claimed by its taker.
    EvmClaimed,
    /// Ledger leg claimed by its taker.
    NonEvmClaimed,
    /// Both legs claimed (derived, never asserted directly).
    Completed,
    /// EVM leg refunded to its maker.
    EvmRefunded,
    /// Ledger leg refunded to its maker.
    NonEvmRefunded,
    /// A step failed; details live in the history entry.
    Failed,
}

impl SwapStatus {
    /// Check if transition is valid.
    ///
    /// Legs lock concurrently, so the two lock statuses may arrive in either
    /// order. `Completed` is only reachable from a claimed status.
    pub fn can_transition_to(&self, next: SwapStatus) -> bool {
        use SwapStatus::*;
        match (self, next) {
            (Completed, _) => false,
            (_, Initiated) => false,
            (Initiated | EvmOrderCreated | NonEvmEscrowLocked | Failed, EvmOrderCreated)
            | (Initiated | EvmOrderCreated | NonEvmEscrowLocked | Failed, NonEvmEscrowLocked) => true,
            (_, EvmOrderCreated | NonEvmEscrowLocked) => false,
            (Initiated, SecretRevealed) => false,
            (EvmClaimed | NonEvmClaimed | SecretRevealed, Completed) => true,
            (_, Completed) => false,
            _ => true,
        }
    }

    /// Completed is the only state nothing may leave.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed)
    }

    /// Off-path states: refunds and failures.
    pub fn is_off_path(&self) -> bool {
        matches!(self, Self::EvmRefunded | Self::NonEvmRefunded | Self::Failed)
    }
}

impl fmt::Display for SwapStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SwapStatus::Initiated => "INITIATED",
            SwapStatus::EvmOrderCreated => "EVM_ORDER_CREATED",
            SwapStatus::NonEvmEscrowLocked => "NON_EVM_ESCROW_LOCKED",
            SwapStatus::SecretRevealed => "SECRET_REVEALED",
            SwapStatus::EvmClaimed => "EVM_CLAIMED",
            SwapStatus::NonEvmClaimed => "NON_EVM_CLAIMED",
            SwapStatus::Completed => "COMPLETED",
            SwapStatus::EvmRefunded => "EVM_REFUNDED",
            SwapStatus::NonEvmRefunded => "NON_EVM_REFUNDED",
            SwapStatus::Failed => "FAILED",
        };
        f.write_str(s)
    }
}

/// Per-leg escrow monitor status.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MonitorStatus {
    /// Lock confirmed, awaiting claim or refund.
    #[default]
    Pending,
    /// Claimed by the taker.
    Resolved,
    /// Refunded to the maker.
    Canceled,
    /// Last attempt failed; may be retried.
    Failed,
}

impl MonitorStatus {
    /// Forward-only: a failed leg may be retried into any outcome, a settled
    /// leg never moves again.
    pub fn can_transition_to(&self, next: MonitorStatus) -> bool {
        match (self, next) {
            (Self::Pending, Self::Resolved | Self::Canceled | Self::Failed) => true,
            (Self::Failed, Self::Resolved | Self::Canceled | Self::Failed) => true,
            _ => false,
        }
    }

    /// Check if terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Resolved | Self::Canceled)
    }
}

impl fmt::Display for MonitorStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            MonitorStatus::Pending => "PENDING",
            MonitorStatus::Resolved => "RESOLVED",
            MonitorStatus::Canceled => "CANCELED",
            MonitorStatus::Failed => "FAILED",
        };
        f.write_str(s)
    }
}

/// Settlement action requested on one leg.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SwapAction {
    /// Taker withdraws with the secret.
    Claim,
    /// Maker reclaims after cancellation opens.
    Refund,
}

impl SwapAction {
    /// Monitor status reached when this action confirms.
    pub fn settled_monitor_status(&self) -> MonitorStatus {
        match self {
            SwapAction::Claim => MonitorStatus::Resolved,
            SwapAction::Refund => MonitorStatus::Canceled,
        }
    }
}

impl fmt::Display for SwapAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SwapAction::Claim => f.write_str("claim"),
            SwapAction::Refund => f.write_str("refund"),
        }
    }
}

/// The seven stages of a packed escrow timelock, least significant first.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TimelockStage {
    /// Source-chain private withdrawal.
    SrcWithdrawal = 0,
    /// Source-chain public withdrawal.
    SrcPublicWithdrawal = 1,
    /// Source-chain cancellation.
    SrcCancellation = 2,
    /// Source-chain public cancellation.
    SrcPublicCancellation = 3,
    /// Destination-chain private withdrawal.
    DstWithdrawal = 4,
    /// Destination-chain public withdrawal.
    DstPublicWithdrawal = 5,
    /// Destination-chain cancellation.
    DstCancellation = 6,
}

impl TimelockStage {
    /// All stages in bit order.
    pub const ALL: [TimelockStage; 7] = [
        TimelockStage::SrcWithdrawal,
        TimelockStage::SrcPublicWithdrawal,
        TimelockStage::SrcCancellation,
        TimelockStage::SrcPublicCancellation,
        TimelockStage::DstWithdrawal,
        TimelockStage::DstPublicWithdrawal,
        TimelockStage::DstCancellation,
    ];

    /// Field index inside the packed value.
    pub fn index(&self) -> usize {
        *self as usize
    }
}

impl fmt::Display for TimelockStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}
