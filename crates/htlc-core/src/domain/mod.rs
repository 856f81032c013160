//! # Domain Module
//!
//! Swap records, escrow monitors, value objects, errors and configuration.

pub mod config;
pub mod entities;
pub mod errors;
pub mod invariants;
pub mod preimage;
pub mod request;
pub mod transactions;
pub mod value_objects;

pub use config::*;
pub use entities::*;
pub use errors::*;
pub use invariants::*;
pub use preimage::{Preimage, PREIMAGE_LEN};
pub use request::*;
pub use transactions::*;
pub use value_objects::*;
