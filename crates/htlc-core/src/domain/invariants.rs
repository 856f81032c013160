//! # Domain Invariants
//!
//! Business rules checked before any chain interaction and again at
//! settlement time.

use super::entities::LegTimelocks;
use super::errors::{PreconditionFailure, SwapError};
use super::value_objects::ChainType;
use primitive_types::U256;

/// Alphabet of ledger base58 addresses.
const LEDGER_ALPHABET: &str = "rpshnaf39wBUDNEGHJKLM4PQRST7VWXYZ2bcdeCg65jkm8oFqi1tuvAxyz";

/// Invariant: address is well-formed for its chain.
///
/// EVM: `0x` + 40 hex digits. Ledger: classic address, `r` + base58.
pub fn invariant_address(chain: ChainType, field: &str, value: &str) -> Result<(), SwapError> {
    let ok = match chain {
        ChainType::Evm => value
            .strip_prefix("0x")
            .map(|h| h.len() == 40 && h.chars().all(|c| c.is_ascii_hexdigit()))
            .unwrap_or(false),
        ChainType::Xrpl => {
            value.starts_with('r')
                && (25..=35).contains(&value.len())
                && value.chars().all(|c| LEDGER_ALPHABET.contains(c))
        }
    };
    if !ok {
        return Err(SwapError::Validation(format!(
            "{field}: '{value}' is not a valid {chain} address"
        )));
    }
    Ok(())
}

/// Invariant: amount is non-zero.
pub fn invariant_nonzero_amount(field: &str, value: U256) -> Result<(), SwapError> {
    if value.is_zero() {
        return Err(SwapError::Validation(format!("{field} must be greater than zero")));
    }
    Ok(())
}

/// Invariant: claim window opens before the refund window.
///
/// Mirrors the ledger rule that `FinishAfter` must be strictly less than
/// `CancelAfter`.
pub fn invariant_window_order(chain: ChainType, windows: &LegTimelocks) -> Result<(), SwapError> {
    if windows.public_withdrawal >= windows.cancellation {
        return Err(SwapError::Validation(format!(
            "{chain} public withdrawal ({}) must be before cancellation ({})",
            windows.public_withdrawal, windows.cancellation
        )));
    }
    Ok(())
}

/// Invariant: every scheduled window lies strictly after `deployed_at`.
///
/// A zero offset unpacks as "stage not set", so scheduled stages must
/// never coincide with the deployment time.
pub fn invariant_after_deployment(
    chain: ChainType,
    windows: &LegTimelocks,
    deployed_at: u64,
) -> Result<(), SwapError> {
    if windows.public_withdrawal <= deployed_at {
        return Err(SwapError::Validation(format!(
            "{chain} public withdrawal ({}) must be after deployment ({deployed_at})",
            windows.public_withdrawal
        )));
    }
    Ok(())
}

/// Invariant: only the recorded party may act.
pub fn invariant_authorized_caller(
    chain: ChainType,
    expected: &str,
    actual: &str,
) -> Result<(), PreconditionFailure> {
    if !chain.same_address(expected, actual) {
        return Err(PreconditionFailure::WrongCaller {
            expected: expected.to_string(),
            actual: actual.to_string(),
        });
    }
    Ok(())
}

/// Invariant: window has opened (`now >= opens_at`).
pub fn invariant_window_open(now: u64, opens_at: u64) -> Result<(), PreconditionFailure> {
    if now < opens_at {
        return Err(PreconditionFailure::TooEarly { now, opens_at });
    }
    Ok(())
}
