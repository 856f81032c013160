//! Shared test fixtures.

use htlc_core::domain::{EscrowMonitor, SwapRecord, SwapRequest, RIPPLE_EPOCH_OFFSET};
use htlc_core::{
    ChainType, CoordinatorConfig, InMemoryRecordStore, ManualClock, SimulatedChain,
    SwapCoordinator,
};
use primitive_types::U256;
use std::sync::Arc;

/// Start time of every scenario; well inside the ledger's 32-bit clock.
pub const T0: u64 = RIPPLE_EPOCH_OFFSET + 820_000_000;

/// EVM escrow funder.
pub const EVM_MAKER: &str = "0x70997970C51812dc3A010C7d01b50e0d17dc79C8";
/// EVM escrow recipient.
pub const EVM_TAKER: &str = "0x3C44CdDdB6a900fa2b585dd299e03d12FA4293BC";
/// Ledger escrow funder.
pub const XRPL_MAKER: &str = "rPT1Sjq2YGrBMTttX4GZHjKu9dyfzbpAYe";
/// Ledger escrow recipient.
pub const XRPL_TAKER: &str = "rHb9CJAWyB4rj91VRWn96DkukG4bwdtyTh";

/// Coordinator over simulated chains and in-memory stores.
pub type TestCoordinator = SwapCoordinator<
    SimulatedChain,
    SimulatedChain,
    InMemoryRecordStore<SwapRecord>,
    InMemoryRecordStore<EscrowMonitor>,
>;

/// Everything a scenario needs to poke at.
pub struct Harness {
    /// Shared clock, starts at `T0`.
    pub clock: Arc<ManualClock>,
    /// EVM chain.
    pub evm: Arc<SimulatedChain>,
    /// Ledger chain.
    pub xrpl: Arc<SimulatedChain>,
    /// Swap records.
    pub swaps: Arc<InMemoryRecordStore<SwapRecord>>,
    /// Leg monitors.
    pub monitors: Arc<InMemoryRecordStore<EscrowMonitor>>,
    /// Coordinator under test.
    pub coordinator: Arc<TestCoordinator>,
}

impl Harness {
    /// Harness with test timeouts.
    pub fn new() -> Self {
        Self::with_config(CoordinatorConfig::for_testing())
    }

    /// Harness with an explicit configuration.
    pub fn with_config(config: CoordinatorConfig) -> Self {
        let clock = Arc::new(ManualClock::new(T0));
        let evm = Arc::new(SimulatedChain::new(ChainType::Evm, clock.clone()));
        let xrpl = Arc::new(SimulatedChain::new(ChainType::Xrpl, clock.clone()));
        let swaps = Arc::new(InMemoryRecordStore::new());
        let monitors = Arc::new(InMemoryRecordStore::new());
        let coordinator = Arc::new(
            SwapCoordinator::new(
                evm.clone(),
                xrpl.clone(),
                swaps.clone(),
                monitors.clone(),
                clock.clone(),
                config,
            )
            .expect("test configuration is valid"),
        );
        Self {
            clock,
            evm,
            xrpl,
            swaps,
            monitors,
            coordinator,
        }
    }

    /// Chain client for `chain`.
    pub fn chain(&self, chain: ChainType) -> &SimulatedChain {
        match chain {
            ChainType::Evm => &self.evm,
            ChainType::Xrpl => &self.xrpl,
        }
    }
}

impl Default for Harness {
    fn default() -> Self {
        Self::new()
    }
}

/// Taker of `chain`'s leg.
pub fn taker(chain: ChainType) -> &'static str {
    match chain {
        ChainType::Evm => EVM_TAKER,
        ChainType::Xrpl => XRPL_TAKER,
    }
}

/// Maker of `chain`'s leg.
pub fn maker(chain: ChainType) -> &'static str {
    match chain {
        ChainType::Evm => EVM_MAKER,
        ChainType::Xrpl => XRPL_MAKER,
    }
}

/// A native-token swap with default windows.
pub fn swap_request() -> SwapRequest {
    SwapRequest::builder()
        .evm_parties(EVM_MAKER, EVM_TAKER)
        .xrpl_parties(XRPL_MAKER, XRPL_TAKER)
        .evm_amount(U256::from(1_000_000u64), U256::from(1_000u64))
        .xrpl_amount_drops(5_000_000)
        .build()
}
