//! # Inbound Ports
//!
//! What the swap coordinator offers to its callers.

use crate::domain::{
    ActionOutcome, ChainType, EscrowMonitor, InitiatedSwap, Preimage, SwapError, SwapRecord,
    SwapRequest,
};
use async_trait::async_trait;
use uuid::Uuid;

/// Swap coordination API - inbound port.
#[async_trait]
pub trait SwapApi: Send + Sync {
    /// Generate a commitment and lock both legs concurrently.
    async fn initiate(&self, request: SwapRequest) -> Result<InitiatedSwap, SwapError>;

    /// Claim one leg as its taker.
    async fn claim(
        &self,
        swap_id: Uuid,
        chain: ChainType,
        caller: &str,
        secret: Option<Preimage>,
    ) -> Result<ActionOutcome, SwapError>;

    /// Refund one leg as its maker.
    async fn refund(
        &self,
        swap_id: Uuid,
        chain: ChainType,
        caller: &str,
    ) -> Result<ActionOutcome, SwapError>;

    /// Record a secret observed on either chain.
    async fn reveal_secret(&self, swap_id: Uuid, secret: Preimage) -> Result<SwapRecord, SwapError>;

    /// Fetch a swap.
    async fn get_swap(&self, swap_id: Uuid) -> Result<SwapRecord, SwapError>;

    /// All swaps.
    async fn list_swaps(&self) -> Result<Vec<SwapRecord>, SwapError>;

    /// Monitors that exist for a swap (zero, one or two).
    async fn monitors_for(&self, swap_id: Uuid) -> Result<Vec<EscrowMonitor>, SwapError>;

    /// Read both monitors and bring the swap record in line with them.
    async fn reconcile(&self, swap_id: Uuid) -> Result<SwapRecord, SwapError>;
}
