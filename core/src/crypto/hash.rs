//! Domain-separated hashing helpers
//!
//! Every hash in the crate is prefixed by one of the labels below so that
//! outputs from different roles can never be confused with each other.

use curve25519_dalek::{ristretto::RistrettoPoint, scalar::Scalar};
use sha2::{Digest, Sha256, Sha512};
use zeroize::Zeroize;

pub const SHARED_SECRET_DOMAIN: &[u8] = b"shadowpay.shared_secret.v1";
pub const OFFSET_DOMAIN: &[u8] = b"shadowpay.stealth_offset.v1";
pub const BLINDING_DOMAIN: &[u8] = b"shadowpay.commitment_blinding.v1";
pub const AMOUNT_KEY_DOMAIN: &[u8] = b"shadowpay.amount_key.v1";
pub const AMOUNT_NONCE_DOMAIN: &[u8] = b"shadowpay.amount_nonce.v1";
pub const NULLIFIER_KEY_DOMAIN: &[u8] = b"shadowpay.nullifier_key.v2";
pub const NULLIFIER_DOMAIN: &[u8] = b"shadowpay.nullifier_base.v2";
pub const NOTE_LEAF_DOMAIN: &[u8] = b"shadowpay.note_leaf.v1";
pub const PEDERSEN_H_LABEL: &[u8] = b"shadowpay.pedersen.H.v1";

/// SHA-256 over the concatenation of `parts`, prefixed by `domain`
pub fn sha256(domain: &[u8], parts: &[&[u8]]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(domain);
    for part in parts {
        hasher.update(part);
    }
    hasher.finalize().into()
}

/// Hash to a uniformly distributed scalar
///
/// Uses a 512-bit digest reduced mod l so the result carries no
/// measurable bias.
pub fn hash_to_scalar(domain: &[u8], parts: &[&[u8]]) -> Scalar {
    let mut hasher = Sha512::new();
    hasher.update(domain);
    for part in parts {
        hasher.update(part);
    }
    let mut wide = [0u8; 64];
    wide.copy_from_slice(&hasher.finalize());
    let scalar = Scalar::from_bytes_mod_order_wide(&wide);
    wide.zeroize();
    scalar
}

/// Hash to a Ristretto point with no known discrete log relative to G
pub fn hash_to_point(domain: &[u8], parts: &[&[u8]]) -> RistrettoPoint {
    let mut hasher = Sha512::new();
    hasher.update(domain);
    for part in parts {
        hasher.update(part);
    }
    RistrettoPoint::from_hash(hasher)
}

/// Wide reduction of 64 bytes of challenge material
pub fn scalar_from_wide(bytes: &[u8; 64]) -> Scalar {
    Scalar::from_bytes_mod_order_wide(bytes)
}

/// Parse a canonical scalar encoding, rejecting non-reduced values
pub fn canonical_scalar(bytes: &[u8; 32]) -> Option<Scalar> {
    Option::from(Scalar::from_canonical_bytes(*bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_domains_separate_outputs() {
        let a = sha256(OFFSET_DOMAIN, &[b"data"]);
        let b = sha256(BLINDING_DOMAIN, &[b"data"]);
        assert_ne!(a, b);
    }

    #[test]
    fn test_hash_to_scalar_deterministic() {
        let a = hash_to_scalar(OFFSET_DOMAIN, &[b"x", b"y"]);
        let b = hash_to_scalar(OFFSET_DOMAIN, &[b"x", b"y"]);
        assert_eq!(a, b);
        assert_ne!(a, hash_to_scalar(OFFSET_DOMAIN, &[b"y", b"x"]));
    }

    #[test]
    fn test_hash_to_point_separates_inputs() {
        let a = hash_to_point(NULLIFIER_DOMAIN, &[b"note"]);
        assert_eq!(a, hash_to_point(NULLIFIER_DOMAIN, &[b"note"]));
        assert_ne!(a, hash_to_point(NULLIFIER_DOMAIN, &[b"other"]));
        assert_ne!(a, hash_to_point(NOTE_LEAF_DOMAIN, &[b"note"]));
    }

    #[test]
    fn test_canonical_scalar_rejects_unreduced() {
        assert!(canonical_scalar(&[0xff; 32]).is_none());
        assert!(canonical_scalar(&Scalar::from(7u64).to_bytes()).is_some());
    }
}
