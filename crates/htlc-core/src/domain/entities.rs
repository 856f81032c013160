//! # Domain Entities
//!
//! `SwapRecord` is the aggregate root of one swap attempt. `EscrowMonitor`
//! tracks one leg and refers back to its swap by id only, so a monitor
//! failure never touches swap-level state directly.
//!
//! Both carry an append-only history. Top-level status fields are a cached
//! projection of that history; every change to them pushes exactly one
//! entry.

use super::errors::{Hash, SwapError, TxHash};
use super::preimage::Preimage;
use super::value_objects::{ChainType, MonitorStatus, SwapAction, SwapStatus};
use primitive_types::U256;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// One entry in a swap's history.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SwapEvent {
    /// Unix seconds. Never lower than the previous entry.
    pub timestamp: u64,
    /// Status this entry records.
    pub status: SwapStatus,
    /// Related transaction, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tx_hash: Option<TxHash>,
    /// Leg this entry concerns, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chain_type: Option<ChainType>,
    /// Free-form detail.
    #[serde(default)]
    pub details: Value,
    /// Error detail for FAILED entries.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl SwapEvent {
    /// New entry with empty details.
    pub fn new(timestamp: u64, status: SwapStatus) -> Self {
        Self {
            timestamp,
            status,
            tx_hash: None,
            chain_type: None,
            details: Value::Null,
            error_message: None,
        }
    }

    /// FAILED entry carrying an error.
    pub fn failure(timestamp: u64, error: &SwapError) -> Self {
        Self::new(timestamp, SwapStatus::Failed).with_error(error.to_string())
    }

    /// Attach a transaction hash.
    pub fn with_tx(mut self, tx_hash: impl Into<TxHash>) -> Self {
        self.tx_hash = Some(tx_hash.into());
        self
    }

    /// Attach the leg.
    pub fn on_chain(mut self, chain: ChainType) -> Self {
        self.chain_type = Some(chain);
        self
    }

    /// Attach details.
    pub fn with_details(mut self, details: Value) -> Self {
        self.details = details;
        self
    }

    /// Attach an error message.
    pub fn with_error(mut self, message: impl Into<String>) -> Self {
        self.error_message = Some(message.into());
        self
    }
}

/// Absolute windows of one leg.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LegTimelocks {
    /// Claim allowed from here (Unix seconds).
    pub public_withdrawal: u64,
    /// Refund allowed from here (Unix seconds).
    pub cancellation: u64,
}

/// Where a locked leg's funds sit on chain.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum EscrowRef {
    /// EVM escrow clone address.
    Evm {
        /// Escrow contract.
        address: String,
    },
    /// Ledger escrow object.
    Ledger {
        /// Creating account.
        owner: String,
        /// Sequence of the creating transaction.
        sequence: u32,
    },
}

/// Per-leg part of a swap record.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LegRecord {
    /// Chain family.
    pub chain: ChainType,
    /// Funds the escrow; may refund.
    pub maker: String,
    /// Receives the funds; may claim.
    pub taker: String,
    /// Intended windows.
    pub timelocks: LegTimelocks,
    /// Packed timelocks used at creation (EVM only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub packed_timelocks: Option<U256>,
    /// Escrow location once created.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub escrow: Option<EscrowRef>,
    /// Block / ledger index of the creating transaction.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub create_block: Option<u64>,
    /// Lock transaction.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub create_tx: Option<TxHash>,
    /// Claim transaction.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub claim_tx: Option<TxHash>,
    /// Refund transaction.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refund_tx: Option<TxHash>,
}

impl LegRecord {
    /// Unlocked leg.
    pub fn new(
        chain: ChainType,
        maker: impl Into<String>,
        taker: impl Into<String>,
        timelocks: LegTimelocks,
    ) -> Self {
        Self {
            chain,
            maker: maker.into(),
            taker: taker.into(),
            timelocks,
            packed_timelocks: None,
            escrow: None,
            create_block: None,
            create_tx: None,
            claim_tx: None,
            refund_tx: None,
        }
    }

    /// Lock confirmed.
    pub fn is_locked(&self) -> bool {
        self.escrow.is_some() && self.create_block.is_some()
    }

    /// Party allowed to perform `action`.
    pub fn party_for(&self, action: SwapAction) -> &str {
        match action {
            SwapAction::Claim => &self.taker,
            SwapAction::Refund => &self.maker,
        }
    }
}

/// Durable record of one swap attempt.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SwapRecord {
    /// Swap identifier.
    pub id: Uuid,
    /// Latest recorded transition.
    pub status: SwapStatus,
    /// EVM leg.
    pub evm: LegRecord,
    /// Ledger leg.
    pub xrpl: LegRecord,
    /// EVM token address.
    pub token: String,
    /// EVM amount.
    pub evm_amount: U256,
    /// EVM safety deposit.
    pub safety_deposit: U256,
    /// Ledger amount in drops.
    pub xrpl_amount_drops: u64,
    /// EVM chain id.
    pub evm_chain_id: u64,
    /// SHA-256 of the secret.
    pub secret_hash: Hash,
    /// Upper-case hex crypto-condition.
    pub condition: String,
    /// Set only once revealed on chain.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret: Option<Preimage>,
    /// Latest error detail.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    /// Creation time.
    pub created_at: u64,
    /// Last mutation time.
    pub updated_at: u64,
    /// Append-only history.
    pub history: Vec<SwapEvent>,
}

impl SwapRecord {
    /// Leg for `chain`.
    pub fn leg(&self, chain: ChainType) -> &LegRecord {
        match chain {
            ChainType::Evm => &self.evm,
            ChainType::Xrpl => &self.xrpl,
        }
    }

    /// Mutable leg for `chain`.
    pub fn leg_mut(&mut self, chain: ChainType) -> &mut LegRecord {
        match chain {
            ChainType::Evm => &mut self.evm,
            ChainType::Xrpl => &mut self.xrpl,
        }
    }

    /// Append without touching top-level status. Timestamps are clamped so
    /// history never goes backwards.
    pub fn push_event(&mut self, mut event: SwapEvent) {
        if let Some(last) = self.history.last() {
            event.timestamp = event.timestamp.max(last.timestamp);
        }
        self.updated_at = self.updated_at.max(event.timestamp);
        self.history.push(event);
    }

    /// Move to `event.status` and append `event`.
    pub fn record_transition(&mut self, event: SwapEvent) -> Result<(), SwapError> {
        if !self.status.can_transition_to(event.status) {
            return Err(SwapError::Validation(format!(
                "swap {}: invalid transition {} -> {}",
                self.id, self.status, event.status
            )));
        }
        self.status = event.status;
        if let Some(message) = &event.error_message {
            self.error_message = Some(message.clone());
        }
        self.push_event(event);
        Ok(())
    }

    /// Append a FAILED entry, keeping the current status.
    pub fn record_failure(&mut self, event: SwapEvent) {
        debug_assert_eq!(event.status, SwapStatus::Failed);
        if let Some(message) = &event.error_message {
            self.error_message = Some(message.clone());
        }
        self.push_event(event);
    }

    /// Latest history entry.
    pub fn last_event(&self) -> Option<&SwapEvent> {
        self.history.last()
    }
}

/// One entry in a monitor's history.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonitorEvent {
    /// Unix seconds.
    pub timestamp: u64,
    /// Status this entry records.
    pub status: MonitorStatus,
    /// Related transaction.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tx_hash: Option<TxHash>,
    /// Free-form detail.
    #[serde(default)]
    pub details: Value,
    /// Error detail.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl MonitorEvent {
    /// New entry.
    pub fn new(timestamp: u64, status: MonitorStatus) -> Self {
        Self {
            timestamp,
            status,
            tx_hash: None,
            details: Value::Null,
            error_message: None,
        }
    }

    /// Attach a transaction hash.
    pub fn with_tx(mut self, tx_hash: impl Into<TxHash>) -> Self {
        self.tx_hash = Some(tx_hash.into());
        self
    }

    /// Attach details.
    pub fn with_details(mut self, details: Value) -> Self {
        self.details = details;
        self
    }

    /// Attach an error message.
    pub fn with_error(mut self, message: impl Into<String>) -> Self {
        self.error_message = Some(message.into());
        self
    }
}

/// Tracking record for one leg of one swap.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EscrowMonitor {
    /// Owning swap.
    pub swap_id: Uuid,
    /// Leg.
    pub chain_type: ChainType,
    /// Current status.
    pub status: MonitorStatus,
    /// Lock transaction.
    pub tx_hash: TxHash,
    /// SHA-256 of the secret.
    pub secret_hash: Hash,
    /// Cancellation time of the leg (Unix seconds).
    pub timelock: u64,
    /// Times the leg was re-attempted after FAILED.
    pub retry_count: u32,
    /// Whether the last failure may be retried.
    pub retryable: bool,
    /// Last time the monitoring pass looked at this leg.
    pub last_checked_at: u64,
    /// Latest error detail.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    /// Append-only history.
    pub history: Vec<MonitorEvent>,
}

impl EscrowMonitor {
    /// Monitor for a leg whose lock just confirmed.
    pub fn new(
        swap_id: Uuid,
        chain_type: ChainType,
        tx_hash: impl Into<TxHash>,
        secret_hash: Hash,
        timelock: u64,
        now: u64,
    ) -> Self {
        let tx_hash = tx_hash.into();
        Self {
            swap_id,
            chain_type,
            status: MonitorStatus::Pending,
            history: vec![MonitorEvent::new(now, MonitorStatus::Pending).with_tx(tx_hash.clone())],
            tx_hash,
            secret_hash,
            timelock,
            retry_count: 0,
            retryable: false,
            last_checked_at: now,
            error_message: None,
        }
    }

    /// Store key of the monitor for `swap_id`'s `chain` leg.
    pub fn key_for(swap_id: Uuid, chain: ChainType) -> String {
        format!("{swap_id}:{chain}")
    }

    /// Store key of this monitor.
    pub fn key(&self) -> String {
        Self::key_for(self.swap_id, self.chain_type)
    }

    /// Advance the status and append `event`. A move out of FAILED counts
    /// as a retry.
    pub fn advance(&mut self, mut event: MonitorEvent) -> Result<(), SwapError> {
        if !self.status.can_transition_to(event.status) {
            return Err(SwapError::Validation(format!(
                "monitor {}: invalid transition {} -> {}",
                self.key(),
                self.status,
                event.status
            )));
        }
        if self.status == MonitorStatus::Failed {
            self.retry_count += 1;
        }
        if let Some(last) = self.history.last() {
            event.timestamp = event.timestamp.max(last.timestamp);
        }
        self.status = event.status;
        self.retryable = event.status == MonitorStatus::Failed && self.retryable;
        if let Some(message) = &event.error_message {
            self.error_message = Some(message.clone());
        }
        self.last_checked_at = self.last_checked_at.max(event.timestamp);
        self.history.push(event);
        Ok(())
    }

    /// Mark FAILED with a retry flag.
    pub fn mark_failed(&mut self, now: u64, error: &SwapError) -> Result<(), SwapError> {
        let retryable = error.is_retryable();
        self.advance(
            MonitorEvent::new(now, MonitorStatus::Failed)
                .with_error(error.to_string())
                .with_details(serde_json::json!({ "retryable": retryable })),
        )?;
        self.retryable = retryable;
        Ok(())
    }

    /// Record that a monitoring pass looked at this leg.
    pub fn touch(&mut self, now: u64) {
        self.last_checked_at = self.last_checked_at.max(now);
    }

    /// Transaction hash of the most recent entry that carries one.
    pub fn latest_tx(&self) -> Option<&str> {
        self.history.iter().rev().find_map(|e| e.tx_hash.as_deref())
    }
}
