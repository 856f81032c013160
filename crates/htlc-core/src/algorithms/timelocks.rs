//! # Timelock Codec
//!
//! Packs the seven-stage escrow schedule into one 256-bit word:
//!
//! ```text
//! bits 224..256  deployedAt
//! bits  32*i..   stage i offset from deployedAt, stage 0 least significant
//! ```
//!
//! The escrow contract overwrites `deployedAt` with its own block
//! timestamp, so any packed value rebuilt for withdraw / cancel must use
//! the on-chain deployment time ([`Timelocks::with_deployed_at`]).
//!
//! Offsets are kept verbatim, so `unpack(pack(d, s))` is exact. The
//! presence view ([`Timelocks::timestamp`]) follows the contract's
//! convention that a zero offset means "not set".

use crate::domain::{TimelockError, TimelockStage};
use primitive_types::U256;
use serde::{Deserialize, Serialize};

/// Largest representable stage offset.
pub const MAX_OFFSET: u64 = u32::MAX as u64;

const DEPLOYED_AT_SHIFT: usize = 224;
const FIELD_BITS: usize = 32;

/// Unpacked timelock word.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Timelocks {
    deployed_at: u32,
    offsets: [u32; 7],
}

impl Timelocks {
    /// Build from absolute stage timestamps. Stages not listed stay zero.
    pub fn from_timestamps(
        deployed_at: u64,
        stages: &[(TimelockStage, u64)],
    ) -> Result<Self, TimelockError> {
        let deployed_at_field =
            u32::try_from(deployed_at).map_err(|_| TimelockError::DeployedAtOutOfRange(deployed_at))?;

        let mut offsets = [0u32; 7];
        for (stage, timestamp) in stages {
            let offset = i128::from(*timestamp) - i128::from(deployed_at);
            if offset < 0 || offset > i128::from(MAX_OFFSET) {
                return Err(TimelockError::OffsetOutOfRange {
                    stage: *stage,
                    offset,
                });
            }
            offsets[stage.index()] = offset as u32;
        }

        Ok(Self {
            deployed_at: deployed_at_field,
            offsets,
        })
    }

    /// Build from raw offsets.
    pub fn from_offsets(deployed_at: u32, offsets: [u32; 7]) -> Self {
        Self { deployed_at, offsets }
    }

    /// Decode a packed word.
    pub fn unpack(packed: U256) -> Self {
        let mask = U256::from(u32::MAX);
        let mut offsets = [0u32; 7];
        for stage in TimelockStage::ALL {
            offsets[stage.index()] = ((packed >> (stage.index() * FIELD_BITS)) & mask).low_u32();
        }
        Self {
            deployed_at: ((packed >> DEPLOYED_AT_SHIFT) & mask).low_u32(),
            offsets,
        }
    }

    /// Encode to the wire word.
    pub fn pack(&self) -> U256 {
        let mut packed = U256::from(self.deployed_at) << DEPLOYED_AT_SHIFT;
        for stage in TimelockStage::ALL {
            packed = packed | (U256::from(self.offsets[stage.index()]) << (stage.index() * FIELD_BITS));
        }
        packed
    }

    /// Same offsets, different deployment time.
    pub fn with_deployed_at(&self, deployed_at: u64) -> Result<Self, TimelockError> {
        let deployed_at =
            u32::try_from(deployed_at).map_err(|_| TimelockError::DeployedAtOutOfRange(deployed_at))?;
        Ok(Self {
            deployed_at,
            offsets: self.offsets,
        })
    }

    /// Deployment time.
    pub fn deployed_at(&self) -> u64 {
        u64::from(self.deployed_at)
    }

    /// Raw offset of `stage`.
    pub fn offset(&self, stage: TimelockStage) -> u32 {
        self.offsets[stage.index()]
    }

    /// Raw offsets in stage order.
    pub fn offsets(&self) -> [u32; 7] {
        self.offsets
    }

    /// Absolute time of `stage`, or `None` if its offset is zero.
    pub fn timestamp(&self, stage: TimelockStage) -> Option<u64> {
        match self.offset(stage) {
            0 => None,
            offset => Some(self.deployed_at() + u64::from(offset)),
        }
    }

    /// All stages reported present, with absolute times.
    pub fn present_stages(&self) -> Vec<(TimelockStage, u64)> {
        TimelockStage::ALL
            .iter()
            .filter_map(|stage| self.timestamp(*stage).map(|ts| (*stage, ts)))
            .collect()
    }

    /// 32-byte big-endian wire form.
    pub fn to_be_bytes(&self) -> [u8; 32] {
        let mut out = [0u8; 32];
        self.pack().to_big_endian(&mut out);
        out
    }

    /// Decode the 32-byte big-endian wire form.
    pub fn from_be_bytes(bytes: &[u8; 32]) -> Self {
        Self::unpack(U256::from_big_endian(bytes))
    }
}

/// Pack absolute stage timestamps relative to `deployed_at`.
pub fn pack(deployed_at: u64, stages: &[(TimelockStage, u64)]) -> Result<U256, TimelockError> {
    Timelocks::from_timestamps(deployed_at, stages).map(|t| t.pack())
}

/// Unpack a wire word.
pub fn unpack(packed: U256) -> Timelocks {
    Timelocks::unpack(packed)
}
