//! # Swap Requests and Outcomes

use super::entities::{LegTimelocks, SwapRecord};
use super::errors::{SwapError, TxHash};
use super::invariants::{invariant_address, invariant_nonzero_amount, invariant_window_order};
use super::preimage::Preimage;
use super::value_objects::{ChainType, SwapAction, SwapStatus};
use primitive_types::U256;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Native token marker on the EVM side.
pub const NATIVE_TOKEN: &str = "0x0000000000000000000000000000000000000000";

/// Everything needed to start a swap.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapRequest {
    /// Funds the EVM escrow.
    pub evm_maker: String,
    /// Receives the EVM escrow.
    pub evm_taker: String,
    /// Funds the ledger escrow.
    pub xrpl_maker: String,
    /// Receives the ledger escrow.
    pub xrpl_taker: String,
    /// EVM token.
    pub token: String,
    /// EVM amount.
    pub evm_amount: U256,
    /// EVM safety deposit.
    pub safety_deposit: U256,
    /// Ledger amount in drops.
    pub xrpl_amount_drops: u64,
    /// EVM chain id.
    pub evm_chain_id: u64,
    /// Explicit EVM windows; defaults come from configuration.
    pub evm_windows: Option<LegTimelocks>,
    /// Explicit ledger windows; defaults come from configuration.
    pub xrpl_windows: Option<LegTimelocks>,
}

impl SwapRequest {
    /// Start a builder.
    pub fn builder() -> SwapRequestBuilder {
        SwapRequestBuilder::default()
    }

    /// Structural checks that need no clock or chain.
    pub fn validate(&self) -> Result<(), SwapError> {
        invariant_address(ChainType::Evm, "evm_maker", &self.evm_maker)?;
        invariant_address(ChainType::Evm, "evm_taker", &self.evm_taker)?;
        invariant_address(ChainType::Evm, "token", &self.token)?;
        invariant_address(ChainType::Xrpl, "xrpl_maker", &self.xrpl_maker)?;
        invariant_address(ChainType::Xrpl, "xrpl_taker", &self.xrpl_taker)?;
        invariant_nonzero_amount("evm_amount", self.evm_amount)?;
        invariant_nonzero_amount("safety_deposit", self.safety_deposit)?;
        invariant_nonzero_amount("xrpl_amount_drops", U256::from(self.xrpl_amount_drops))?;
        if let Some(windows) = &self.evm_windows {
            invariant_window_order(ChainType::Evm, windows)?;
        }
        if let Some(windows) = &self.xrpl_windows {
            invariant_window_order(ChainType::Xrpl, windows)?;
        }
        Ok(())
    }
}

/// Builder for [`SwapRequest`].
#[derive(Clone, Debug)]
pub struct SwapRequestBuilder {
    request: SwapRequest,
}

impl Default for SwapRequestBuilder {
    fn default() -> Self {
        Self {
            request: SwapRequest {
                evm_maker: String::new(),
                evm_taker: String::new(),
                xrpl_maker: String::new(),
                xrpl_taker: String::new(),
                token: NATIVE_TOKEN.to_string(),
                evm_amount: U256::zero(),
                safety_deposit: U256::zero(),
                xrpl_amount_drops: 0,
                evm_chain_id: 1,
                evm_windows: None,
                xrpl_windows: None,
            },
        }
    }
}

impl SwapRequestBuilder {
    /// EVM maker and taker.
    pub fn evm_parties(mut self, maker: impl Into<String>, taker: impl Into<String>) -> Self {
        self.request.evm_maker = maker.into();
        self.request.evm_taker = taker.into();
        self
    }

    /// Ledger maker and taker.
    pub fn xrpl_parties(mut self, maker: impl Into<String>, taker: impl Into<String>) -> Self {
        self.request.xrpl_maker = maker.into();
        self.request.xrpl_taker = taker.into();
        self
    }

    /// EVM token.
    pub fn token(mut self, token: impl Into<String>) -> Self {
        self.request.token = token.into();
        self
    }

    /// EVM amount and safety deposit.
    pub fn evm_amount(mut self, amount: U256, safety_deposit: U256) -> Self {
        self.request.evm_amount = amount;
        self.request.safety_deposit = safety_deposit;
        self
    }

    /// Ledger amount in drops.
    pub fn xrpl_amount_drops(mut self, drops: u64) -> Self {
        self.request.xrpl_amount_drops = drops;
        self
    }

    /// EVM chain id.
    pub fn evm_chain_id(mut self, chain_id: u64) -> Self {
        self.request.evm_chain_id = chain_id;
        self
    }

    /// Explicit EVM windows.
    pub fn evm_windows(mut self, windows: LegTimelocks) -> Self {
        self.request.evm_windows = Some(windows);
        self
    }

    /// Explicit ledger windows.
    pub fn xrpl_windows(mut self, windows: LegTimelocks) -> Self {
        self.request.xrpl_windows = Some(windows);
        self
    }

    /// Finish.
    pub fn build(self) -> SwapRequest {
        self.request
    }
}

/// Result of a successful initiation. The secret is handed to the caller
/// and is not stored.
#[derive(Debug)]
pub struct InitiatedSwap {
    /// Record after both locks confirmed.
    pub record: SwapRecord,
    /// Swap secret.
    pub secret: Preimage,
}

/// Result of a confirmed claim or refund.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionOutcome {
    /// Swap.
    pub swap_id: Uuid,
    /// Leg.
    pub chain: ChainType,
    /// Action.
    pub action: SwapAction,
    /// Confirmed transaction.
    pub tx_hash: TxHash,
    /// Aggregate status after the action.
    pub status: SwapStatus,
}
