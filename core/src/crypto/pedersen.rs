//! Pedersen commitments over Ristretto
//!
//! `C = v·G + r·H` where G is the Ristretto basepoint and H is derived by
//! hashing a fixed label to the group, so nobody knows log_G(H).
//!
//! Commitments are additively homomorphic, which is what lets balance and
//! payment proofs check value conservation without opening anything.

use std::fmt;

use curve25519_dalek::{
    constants::RISTRETTO_BASEPOINT_POINT,
    ristretto::{CompressedRistretto, RistrettoPoint},
    scalar::Scalar,
    traits::Identity,
};
use rand::{CryptoRng, RngCore};
use serde::{Deserialize, Serialize};
use sha2::Sha512;
use subtle::ConstantTimeEq;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::crypto::hash::PEDERSEN_H_LABEL;
use crate::crypto::keys::random_scalar;
use crate::error::{CoreError, Result};

/// Generator pair for value commitments
#[derive(Clone, Copy, Debug)]
pub struct PedersenGens {
    /// Value generator
    pub g: RistrettoPoint,
    /// Blinding generator
    pub h: RistrettoPoint,
}

impl Default for PedersenGens {
    fn default() -> Self {
        Self {
            g: RISTRETTO_BASEPOINT_POINT,
            h: RistrettoPoint::hash_from_bytes::<Sha512>(PEDERSEN_H_LABEL),
        }
    }
}

impl PedersenGens {
    pub fn commit_point(&self, value: Scalar, blinding: Scalar) -> RistrettoPoint {
        value * self.g + blinding * self.h
    }

    pub fn commit(&self, value: u64, blinding: &Blinding) -> Commitment {
        Commitment::from_point(&self.commit_point(Scalar::from(value), blinding.to_scalar()))
    }

    /// Recompute and compare in constant time
    pub fn verify(&self, commitment: &Commitment, value: u64, blinding: &Blinding) -> bool {
        let expected = self.commit(value, blinding);
        bool::from(expected.0.ct_eq(&commitment.0))
    }

    /// Commit to a vector of values with one blinding each, returning the
    /// aggregate commitment `Σ v_i·G + (Σ r_i)·H`
    pub fn commit_many(&self, openings: &[(u64, &Blinding)]) -> Commitment {
        let point = openings
            .iter()
            .fold(RistrettoPoint::identity(), |acc, (value, blinding)| {
                acc + self.commit_point(Scalar::from(*value), blinding.to_scalar())
            });
        Commitment::from_point(&point)
    }
}

// ============================================================================
// Blinding Factor
// ============================================================================

/// Commitment randomness, zeroized on drop
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop, Serialize, Deserialize)]
pub struct Blinding([u8; 32]);

impl Blinding {
    pub fn random<R: RngCore + CryptoRng>(rng: &mut R) -> Self {
        Self::from_scalar(&random_scalar(rng))
    }

    pub fn from_scalar(scalar: &Scalar) -> Self {
        Self(scalar.to_bytes())
    }

    pub fn to_scalar(&self) -> Scalar {
        Scalar::from_bytes_mod_order(self.0)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn zero() -> Self {
        Self([0u8; 32])
    }

    /// Sum of blindings mod l
    pub fn sum<'a>(blindings: impl IntoIterator<Item = &'a Blinding>) -> Self {
        let total = blindings
            .into_iter()
            .fold(Scalar::ZERO, |acc, b| acc + b.to_scalar());
        Self::from_scalar(&total)
    }
}

impl fmt::Debug for Blinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Blinding(<redacted>)")
    }
}

// ============================================================================
// Commitment
// ============================================================================

/// Compressed Pedersen commitment (32 bytes)
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Commitment(pub [u8; 32]);

impl Commitment {
    pub fn from_point(point: &RistrettoPoint) -> Self {
        Self(point.compress().to_bytes())
    }

    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        let bytes: [u8; 32] = bytes.try_into().map_err(|_| CoreError::InvalidCommitment)?;
        let commitment = Self(bytes);
        commitment.to_point()?;
        Ok(commitment)
    }

    /// Decompress; the identity is a valid commitment (to zero with zero blinding)
    pub fn to_point(&self) -> Result<RistrettoPoint> {
        CompressedRistretto(self.0)
            .decompress()
            .ok_or(CoreError::InvalidCommitment)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn add(&self, other: &Commitment) -> Result<Commitment> {
        Ok(Self::from_point(&(self.to_point()? + other.to_point()?)))
    }

    pub fn subtract(&self, other: &Commitment) -> Result<Commitment> {
        Ok(Self::from_point(&(self.to_point()? - other.to_point()?)))
    }

    /// Scale both the committed value and the blinding by `factor`
    pub fn scalar_multiply(&self, factor: u64) -> Result<Commitment> {
        Ok(Self::from_point(&(Scalar::from(factor) * self.to_point()?)))
    }

    /// Homomorphic sum of many commitments
    pub fn sum<'a>(commitments: impl IntoIterator<Item = &'a Commitment>) -> Result<Commitment> {
        let mut acc = RistrettoPoint::identity();
        for commitment in commitments {
            acc += commitment.to_point()?;
        }
        Ok(Self::from_point(&acc))
    }
}

impl fmt::Debug for Commitment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Commitment({})", hex::encode(self.0))
    }
}
