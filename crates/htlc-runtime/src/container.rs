//! # Swap Container
//!
//! Builds the coordinator and everything it depends on, in order:
//!
//! 1. Clock
//! 2. Chain clients (EVM, XRPL)
//! 3. Record stores
//! 4. Coordinator

use crate::config::{ConfigError, RuntimeConfig};
use crate::storage::{open_stores, DynMonitorStore, DynSwapStore};
use htlc_core::domain::ChainType;
use htlc_core::ports::{SystemTimeSource, TimeSource};
use htlc_core::{SimulatedChain, SwapCoordinator};
use std::sync::Arc;
use tracing::info;

/// Coordinator type wired by the runtime.
pub type RuntimeCoordinator =
    SwapCoordinator<SimulatedChain, SimulatedChain, DynSwapStore, DynMonitorStore>;

/// Owned instances of every collaborator.
pub struct SwapContainer {
    /// Clock shared by the chains and the coordinator.
    pub clock: Arc<dyn TimeSource>,
    /// EVM client.
    pub evm: Arc<SimulatedChain>,
    /// XRPL client.
    pub xrpl: Arc<SimulatedChain>,
    /// Swap records.
    pub swaps: Arc<DynSwapStore>,
    /// Leg monitors.
    pub monitors: Arc<DynMonitorStore>,
    /// The coordinator.
    pub coordinator: Arc<RuntimeCoordinator>,
    /// Configuration the container was built from.
    pub config: RuntimeConfig,
}

impl SwapContainer {
    /// Build the container with the wall clock.
    pub fn new(config: RuntimeConfig) -> Result<Self, ConfigError> {
        Self::with_clock(config, Arc::new(SystemTimeSource))
    }

    /// Build the container with an explicit clock.
    pub fn with_clock(config: RuntimeConfig, clock: Arc<dyn TimeSource>) -> Result<Self, ConfigError> {
        config.validate()?;

        let evm = Arc::new(SimulatedChain::new(ChainType::Evm, clock.clone()));
        let xrpl = Arc::new(SimulatedChain::new(ChainType::Xrpl, clock.clone()));
        info!("[htlc] Chain clients ready (EVM, XRPL)");

        let stores = open_stores(&config.storage)?;

        let coordinator = Arc::new(SwapCoordinator::new(
            evm.clone(),
            xrpl.clone(),
            stores.swaps.clone(),
            stores.monitors.clone(),
            clock.clone(),
            config.coordinator.clone(),
        )?);
        info!(
            "[htlc] Coordinator ready (order tag '{}', factory {})",
            config.coordinator.order_tag, config.coordinator.evm_factory
        );

        Ok(Self {
            clock,
            evm,
            xrpl,
            swaps: stores.swaps,
            monitors: stores.monitors,
            coordinator,
            config,
        })
    }
}
