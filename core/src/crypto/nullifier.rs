//! Key-image nullifiers for double-spend prevention
//!
//! Each note carries a nullifier key `nk = H(ss)·v`. The payer only learns
//! the public half `K = H(ss)·V` and commits it into the note's leaf next to
//! the one-time address P. Spending publishes
//!
//! `N = nk·Hp(P)`, with `Hp` a hash to the group
//!
//! and a DLEQ proof that `log_G(K) = log_Hp(P)(N)`. Both K and P are fixed by
//! the leaf, so every valid spend of a note reveals the same N regardless of
//! the Merkle root or the leaf position.
//!
//! Uniqueness is enforced by the ledger's nullifier set, not here.

use std::fmt;

use curve25519_dalek::{
    ristretto::{CompressedRistretto, RistrettoPoint},
    scalar::Scalar,
    traits::IsIdentity,
};
use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::crypto::hash::{hash_to_point, NULLIFIER_DOMAIN};
use crate::crypto::keys::PublicKey;
use crate::crypto::stealth::SharedSecret;
use crate::error::Result;

/// Per-note secret scalar from which the nullifier is derived
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop, Serialize, Deserialize)]
pub struct NullifierKey([u8; 32]);

impl NullifierKey {
    /// `nk = H(ss)·v`
    pub fn derive(view_secret: &Scalar, shared: &SharedSecret) -> Self {
        Self::from_scalar(&(shared.nullifier_factor() * view_secret))
    }

    pub fn from_scalar(scalar: &Scalar) -> Self {
        Self(scalar.to_bytes())
    }

    /// Raw bytes, reduced mod l on use
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub(crate) fn to_scalar(&self) -> Scalar {
        Scalar::from_bytes_mod_order(self.0)
    }

    /// `K = nk·G`, the value committed in the note's leaf
    pub fn public(&self) -> PublicKey {
        PublicKey::from_point(&RistrettoPoint::mul_base(&self.to_scalar()))
    }

    pub fn derive_nullifier(&self, address: &PublicKey) -> Nullifier {
        derive_nullifier(self, address)
    }
}

impl fmt::Debug for NullifierKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("NullifierKey(<redacted>)")
    }
}

/// Payer side: `K = H(ss)·V` for a recipient's view public key
pub fn derive_nullifier_public(view_public: &PublicKey, shared: &SharedSecret) -> Result<PublicKey> {
    let view = view_public.to_point()?;
    Ok(PublicKey::from_point(&(shared.nullifier_factor() * view)))
}

/// `Hp(P)`: second DLEQ base, unique per one-time address
pub fn nullifier_base(address: &PublicKey) -> RistrettoPoint {
    hash_to_point(NULLIFIER_DOMAIN, &[address.as_bytes()])
}

/// Published at spend time
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Nullifier(pub [u8; 32]);

impl Nullifier {
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Decoded group element, `None` for garbage or the identity
    pub fn to_point(&self) -> Option<RistrettoPoint> {
        CompressedRistretto(self.0)
            .decompress()
            .filter(|point| !point.is_identity())
    }
}

impl fmt::Debug for Nullifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Nullifier({})", hex::encode(self.0))
    }
}

/// `compress(nk·Hp(P))`
pub fn derive_nullifier(key: &NullifierKey, address: &PublicKey) -> Nullifier {
    Nullifier((key.to_scalar() * nullifier_base(address)).compress().to_bytes())
}
