//! End-to-end coordinator scenarios.

pub mod concurrency;
pub mod recovery;
pub mod swap_flows;
