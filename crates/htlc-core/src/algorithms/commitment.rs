//! # Secret Commitment
//!
//! One random secret, two encodings of the same commitment:
//!
//! - EVM hashlock: raw `SHA-256(secret)`.
//! - Ledger preimage-sha-256 crypto-condition:
//!
//! ```text
//! fulfillment = A0 22 80 20 <secret>
//! condition   = A0 25 80 20 <sha256(secret)> 81 01 20
//! ```
//!
//! Both are upper-case hex on the wire.

use crate::domain::{CommitmentError, Hash, Preimage, SwapError, PREIMAGE_LEN};
use rand::RngCore;
use sha2::{Digest, Sha256};
use zeroize::Zeroize;

/// DER header of a preimage-sha-256 fulfillment.
pub const FULFILLMENT_PREFIX: [u8; 4] = [0xA0, 0x22, 0x80, 0x20];
/// DER header of a preimage-sha-256 condition.
pub const CONDITION_PREFIX: [u8; 4] = [0xA0, 0x25, 0x80, 0x20];
/// Cost field (32 bytes) closing the condition.
pub const CONDITION_SUFFIX: [u8; 3] = [0x81, 0x01, 0x20];

const CONDITION_LEN: usize = CONDITION_PREFIX.len() + 32 + CONDITION_SUFFIX.len();
const FULFILLMENT_LEN: usize = FULFILLMENT_PREFIX.len() + PREIMAGE_LEN;

/// A secret with both of its derived commitments.
#[derive(Clone, Debug)]
pub struct SecretCommitment {
    secret: Preimage,
    hashlock: Hash,
    condition: String,
    fulfillment: String,
}

impl SecretCommitment {
    /// Draw a fresh secret from the OS-seeded CSPRNG.
    pub fn generate() -> Self {
        let mut bytes = [0u8; PREIMAGE_LEN];
        rand::thread_rng().fill_bytes(&mut bytes);
        let commitment = Self::from_secret(Preimage::new(bytes));
        bytes.zeroize();
        commitment
    }

    /// Derive both commitments from a known secret.
    pub fn from_secret(secret: Preimage) -> Self {
        let hashlock = hashlock_of(&secret);
        Self {
            condition: encode_condition(&hashlock),
            fulfillment: encode_fulfillment(&secret),
            hashlock,
            secret,
        }
    }

    /// The secret.
    pub fn secret(&self) -> &Preimage {
        &self.secret
    }

    /// EVM hashlock.
    pub fn hashlock(&self) -> Hash {
        self.hashlock
    }

    /// Ledger condition (upper-case hex).
    pub fn condition(&self) -> &str {
        &self.condition
    }

    /// Ledger fulfillment (upper-case hex).
    pub fn fulfillment(&self) -> &str {
        &self.fulfillment
    }

    /// Consume, keeping only the secret.
    pub fn into_secret(self) -> Preimage {
        self.secret
    }
}

/// `SHA-256(secret)`.
pub fn hashlock_of(secret: &Preimage) -> Hash {
    let mut hasher = Sha256::new();
    hasher.update(secret.as_bytes());
    let mut hash = [0u8; 32];
    hash.copy_from_slice(&hasher.finalize());
    hash
}

/// Encode the ledger condition for `digest`.
pub fn encode_condition(digest: &Hash) -> String {
    let mut bytes = Vec::with_capacity(CONDITION_LEN);
    bytes.extend_from_slice(&CONDITION_PREFIX);
    bytes.extend_from_slice(digest);
    bytes.extend_from_slice(&CONDITION_SUFFIX);
    hex::encode_upper(bytes)
}

/// Encode the ledger fulfillment for `secret`.
pub fn encode_fulfillment(secret: &Preimage) -> String {
    let mut bytes = Vec::with_capacity(FULFILLMENT_LEN);
    bytes.extend_from_slice(&FULFILLMENT_PREFIX);
    bytes.extend_from_slice(secret.as_bytes());
    let encoded = hex::encode_upper(&bytes);
    bytes.zeroize();
    encoded
}

/// Extract the digest from a condition.
pub fn decode_condition(condition: &str) -> Result<Hash, CommitmentError> {
    let bytes = hex::decode(condition).map_err(|e| CommitmentError::InvalidHex(e.to_string()))?;
    if bytes.len() != CONDITION_LEN {
        return Err(CommitmentError::InvalidLength {
            what: "condition",
            expected: CONDITION_LEN,
            actual: bytes.len(),
        });
    }
    if bytes[..4] != CONDITION_PREFIX || bytes[36..] != CONDITION_SUFFIX {
        return Err(CommitmentError::InvalidFraming("condition"));
    }
    let mut digest = [0u8; 32];
    digest.copy_from_slice(&bytes[4..36]);
    Ok(digest)
}

/// Extract the secret from a fulfillment.
pub fn decode_fulfillment(fulfillment: &str) -> Result<Preimage, CommitmentError> {
    let mut bytes =
        hex::decode(fulfillment).map_err(|e| CommitmentError::InvalidHex(e.to_string()))?;
    let result = if bytes.len() != FULFILLMENT_LEN {
        Err(CommitmentError::InvalidLength {
            what: "fulfillment",
            expected: FULFILLMENT_LEN,
            actual: bytes.len(),
        })
    } else if bytes[..4] != FULFILLMENT_PREFIX {
        Err(CommitmentError::InvalidFraming("fulfillment"))
    } else {
        Preimage::from_slice(&bytes[4..])
    };
    bytes.zeroize();
    result
}

/// Does `secret` open `hashlock`?
pub fn verify_hashlock(secret: &Preimage, hashlock: &Hash) -> bool {
    hashlock_of(secret) == *hashlock
}

/// Does `secret` fulfil `condition`? Malformed conditions never verify.
pub fn verify_condition(secret: &Preimage, condition: &str) -> bool {
    decode_condition(condition)
        .map(|digest| digest == hashlock_of(secret))
        .unwrap_or(false)
}

/// Check that `secret`, `hashlock` and `condition` all describe the same
/// commitment. A secret that fails the hashlock is a caller error; a
/// hashlock that disagrees with the condition is a configuration error.
pub fn ensure_consistent(secret: &Preimage, hashlock: &Hash, condition: &str) -> Result<(), SwapError> {
    if !verify_hashlock(secret, hashlock) {
        return Err(SwapError::Validation(
            "secret does not match the swap hashlock".into(),
        ));
    }
    let digest = decode_condition(condition)?;
    if digest != *hashlock {
        return Err(SwapError::EncodingMismatch(format!(
            "condition digest {} differs from hashlock {}",
            hex::encode_upper(digest),
            hex::encode_upper(hashlock)
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn secret_one() -> Preimage {
        let mut bytes = [0u8; 32];
        bytes[31] = 1;
        Preimage::new(bytes)
    }

    #[test]
    fn test_known_vector_for_secret_one() {
        let commitment = SecretCommitment::from_secret(secret_one());
        assert_eq!(
            hex::encode_upper(commitment.hashlock()),
            "EC4916DD28FC4C10D78E287CA5D9CC51EE1AE73CBFDE08C6B37324CBFAAC8BC5"
        );
        assert_eq!(
            commitment.condition(),
            "A0258020EC4916DD28FC4C10D78E287CA5D9CC51EE1AE73CBFDE08C6B37324CBFAAC8BC5810120"
        );
        assert_eq!(
            commitment.fulfillment(),
            format!("A0228020{}01", "00".repeat(31))
        );
        assert_eq!(decode_condition(commitment.condition()).unwrap(), commitment.hashlock());
    }

    #[test]
    fn test_generated_secret_verifies_both_encodings() {
        let commitment = SecretCommitment::generate();
        assert!(verify_hashlock(commitment.secret(), &commitment.hashlock()));
        assert!(verify_condition(commitment.secret(), commitment.condition()));
        assert_eq!(
            decode_fulfillment(commitment.fulfillment()).unwrap(),
            *commitment.secret()
        );
    }

    #[test]
    fn test_other_secret_does_not_verify() {
        let a = SecretCommitment::generate();
        let b = SecretCommitment::generate();
        assert!(!verify_hashlock(a.secret(), &b.hashlock()));
        assert!(!verify_condition(a.secret(), b.condition()));
    }

    proptest! {
        #[test]
        fn prop_any_secret_verifies_both_encodings(bytes in any::<[u8; 32]>()) {
            let commitment = SecretCommitment::from_secret(Preimage::new(bytes));
            prop_assert!(verify_hashlock(commitment.secret(), &commitment.hashlock()));
            prop_assert!(verify_condition(commitment.secret(), commitment.condition()));
            prop_assert_eq!(decode_condition(commitment.condition()).unwrap(), commitment.hashlock());
            prop_assert_eq!(decode_fulfillment(commitment.fulfillment()).unwrap(), Preimage::new(bytes));
        }

        #[test]
        fn prop_different_secret_fails_both_encodings(a in any::<[u8; 32]>(), b in any::<[u8; 32]>()) {
            prop_assume!(a != b);
            let target = SecretCommitment::from_secret(Preimage::new(a));
            let other = Preimage::new(b);
            prop_assert!(!verify_hashlock(&other, &target.hashlock()));
            prop_assert!(!verify_condition(&other, target.condition()));
        }
    }

    #[test]
    fn test_generate_draws_fresh_secrets() {
        assert_ne!(SecretCommitment::generate().hashlock(), SecretCommitment::generate().hashlock());
    }

    #[test]
    fn test_malformed_condition_rejected() {
        assert!(matches!(decode_condition("ZZ"), Err(CommitmentError::InvalidHex(_))));
        assert!(matches!(
            decode_condition("A025"),
            Err(CommitmentError::InvalidLength { actual: 2, .. })
        ));
        let wrong_cost = format!("A0258020{}810121", "00".repeat(32));
        assert_eq!(
            decode_condition(&wrong_cost),
            Err(CommitmentError::InvalidFraming("condition"))
        );
        assert!(!verify_condition(&secret_one(), "not hex"));
    }

    #[test]
    fn test_consistency_distinguishes_caller_and_config_errors() {
        let commitment = SecretCommitment::from_secret(secret_one());
        assert!(ensure_consistent(commitment.secret(), &commitment.hashlock(), commitment.condition()).is_ok());

        let other = SecretCommitment::generate();
        let wrong_secret = ensure_consistent(other.secret(), &commitment.hashlock(), commitment.condition());
        assert!(matches!(wrong_secret, Err(SwapError::Validation(_))));

        let mismatched = ensure_consistent(commitment.secret(), &commitment.hashlock(), other.condition());
        assert!(matches!(mismatched, Err(SwapError::EncodingMismatch(_))));
    }
}
