//! # Swap Preimage
//!
//! The 32-byte secret behind both hashlocks. Zeroized on drop, redacted in
//! `Debug`, and serialized as upper-case hex (the ledger's fulfillment
//! convention) so stored records stay readable by either chain's tooling.

use super::errors::CommitmentError;
use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Preimage length in bytes.
pub const PREIMAGE_LEN: usize = 32;

/// HTLC secret.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct Preimage {
    inner: [u8; PREIMAGE_LEN],
}

impl Preimage {
    /// Wrap raw bytes.
    pub fn new(bytes: [u8; PREIMAGE_LEN]) -> Self {
        Self { inner: bytes }
    }

    /// Copy from a slice of exactly 32 bytes.
    pub fn from_slice(slice: &[u8]) -> Result<Self, CommitmentError> {
        if slice.len() != PREIMAGE_LEN {
            return Err(CommitmentError::InvalidLength {
                what: "preimage",
                expected: PREIMAGE_LEN,
                actual: slice.len(),
            });
        }
        let mut inner = [0u8; PREIMAGE_LEN];
        inner.copy_from_slice(slice);
        Ok(Self { inner })
    }

    /// Parse hex in either case, with or without a `0x` prefix.
    pub fn from_hex(s: &str) -> Result<Self, CommitmentError> {
        let trimmed = s.strip_prefix("0x").unwrap_or(s);
        let mut bytes =
            hex::decode(trimmed).map_err(|e| CommitmentError::InvalidHex(e.to_string()))?;
        let result = Self::from_slice(&bytes);
        bytes.zeroize();
        result
    }

    /// Borrow the secret bytes.
    pub fn as_bytes(&self) -> &[u8; PREIMAGE_LEN] {
        &self.inner
    }

    /// Upper-case hex, no prefix.
    pub fn to_hex(&self) -> String {
        hex::encode_upper(self.inner)
    }

    /// `0x`-prefixed lower-case hex, as EVM calldata tooling expects.
    pub fn to_evm_hex(&self) -> String {
        format!("0x{}", hex::encode(self.inner))
    }
}

impl std::fmt::Debug for Preimage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Preimage(***)")
    }
}

impl Serialize for Preimage {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Preimage {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Self::from_hex(&s).map_err(serde::de::Error::custom)
    }
}
