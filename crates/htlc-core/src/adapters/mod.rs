//! # Adapters Layer (Hexagonal Architecture)
//!
//! In-process implementations of the outbound ports: record store, clock
//! and a simulated chain for each escrow family.

mod clock;
mod memory_store;
mod simulated_chain;

pub use clock::ManualClock;
pub use memory_store::InMemoryRecordStore;
pub use simulated_chain::SimulatedChain;
