//! Schnorr proofs of knowledge of a discrete logarithm
//!
//! [`SchnorrProof`] proves knowledge of `x` with `P = x·base` without
//! revealing `x`. Payment proofs use it over the blinding generator H to show
//! that `Σ inputs - Σ outputs - fee·G` carries no value component, and over
//! G to show ownership of a one-time address.
//!
//! [`DleqProof`] proves that two points share one discrete log over two
//! different bases. It ties a published nullifier to the nullifier key
//! committed in the note's leaf.

use curve25519_dalek::{
    ristretto::{CompressedRistretto, RistrettoPoint},
    scalar::Scalar,
};
use merlin::Transcript;
use rand::{CryptoRng, RngCore};
use serde::{Deserialize, Serialize};

use crate::crypto::hash::{canonical_scalar, scalar_from_wide};
use crate::crypto::keys::random_scalar;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchnorrProof {
    /// Nonce commitment R = k·base
    pub nonce: [u8; 32],
    /// Response s = k + c·x
    pub response: [u8; 32],
}

fn challenge(transcript: &mut Transcript, public: &RistrettoPoint, nonce: &[u8; 32]) -> Scalar {
    transcript.append_message(b"schnorr.P", public.compress().as_bytes());
    transcript.append_message(b"schnorr.R", nonce);
    let mut wide = [0u8; 64];
    transcript.challenge_bytes(b"schnorr.c", &mut wide);
    scalar_from_wide(&wide)
}

impl SchnorrProof {
    /// The transcript must already carry every public value the proof binds to
    pub fn prove<R: RngCore + CryptoRng>(
        transcript: &mut Transcript,
        base: &RistrettoPoint,
        secret: &Scalar,
        rng: &mut R,
    ) -> Self {
        let public = secret * base;
        let k = random_scalar(rng);
        let nonce = (k * base).compress().to_bytes();
        let c = challenge(transcript, &public, &nonce);
        let response = k + c * secret;
        Self { nonce, response: response.to_bytes() }
    }

    pub fn verify(
        &self,
        transcript: &mut Transcript,
        base: &RistrettoPoint,
        public: &RistrettoPoint,
    ) -> bool {
        let Some(nonce) = CompressedRistretto(self.nonce).decompress() else {
            return false;
        };
        let Some(s) = canonical_scalar(&self.response) else {
            return false;
        };
        let c = challenge(transcript, public, &self.nonce);
        s * base == nonce + c * public
    }
}

/// Equality of discrete logs: `A = x·base_a` and `B = x·base_b`
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DleqProof {
    /// k·base_a
    pub nonce_a: [u8; 32],
    /// k·base_b
    pub nonce_b: [u8; 32],
    pub response: [u8; 32],
}

fn dleq_challenge(
    transcript: &mut Transcript,
    public_a: &RistrettoPoint,
    public_b: &RistrettoPoint,
    nonce_a: &[u8; 32],
    nonce_b: &[u8; 32],
) -> Scalar {
    transcript.append_message(b"dleq.A", public_a.compress().as_bytes());
    transcript.append_message(b"dleq.B", public_b.compress().as_bytes());
    transcript.append_message(b"dleq.Ra", nonce_a);
    transcript.append_message(b"dleq.Rb", nonce_b);
    let mut wide = [0u8; 64];
    transcript.challenge_bytes(b"dleq.c", &mut wide);
    scalar_from_wide(&wide)
}

impl DleqProof {
    pub fn prove<R: RngCore + CryptoRng>(
        transcript: &mut Transcript,
        base_a: &RistrettoPoint,
        base_b: &RistrettoPoint,
        secret: &Scalar,
        rng: &mut R,
    ) -> Self {
        let public_a = secret * base_a;
        let public_b = secret * base_b;
        let k = random_scalar(rng);
        let nonce_a = (k * base_a).compress().to_bytes();
        let nonce_b = (k * base_b).compress().to_bytes();
        let c = dleq_challenge(transcript, &public_a, &public_b, &nonce_a, &nonce_b);
        let response = k + c * secret;
        Self { nonce_a, nonce_b, response: response.to_bytes() }
    }

    pub fn verify(
        &self,
        transcript: &mut Transcript,
        base_a: &RistrettoPoint,
        base_b: &RistrettoPoint,
        public_a: &RistrettoPoint,
        public_b: &RistrettoPoint,
    ) -> bool {
        let (Some(nonce_a), Some(nonce_b)) = (
            CompressedRistretto(self.nonce_a).decompress(),
            CompressedRistretto(self.nonce_b).decompress(),
        ) else {
            return false;
        };
        let Some(s) = canonical_scalar(&self.response) else {
            return false;
        };
        let c = dleq_challenge(transcript, public_a, public_b, &self.nonce_a, &self.nonce_b);
        s * base_a == nonce_a + c * public_a && s * base_b == nonce_b + c * public_b
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::pedersen::PedersenGens;
    use rand::rngs::OsRng;

    #[test]
    fn test_schnorr_round_trip() {
        let gens = PedersenGens::default();
        let x = random_scalar(&mut OsRng);
        let public = x * gens.h;

        let proof = SchnorrProof::prove(&mut Transcript::new(b"test"), &gens.h, &x, &mut OsRng);
        assert!(proof.verify(&mut Transcript::new(b"test"), &gens.h, &public));
    }

    #[test]
    fn test_schnorr_binds_transcript_and_key() {
        let gens = PedersenGens::default();
        let x = random_scalar(&mut OsRng);
        let public = x * gens.h;
        let proof = SchnorrProof::prove(&mut Transcript::new(b"test"), &gens.h, &x, &mut OsRng);

        assert!(!proof.verify(&mut Transcript::new(b"other"), &gens.h, &public));
        assert!(!proof.verify(&mut Transcript::new(b"test"), &gens.h, &(public + gens.g)));
        assert!(!proof.verify(&mut Transcript::new(b"test"), &gens.g, &public));
    }

    #[test]
    fn test_dleq_round_trip() {
        let gens = PedersenGens::default();
        let x = random_scalar(&mut OsRng);
        let (a, b) = (x * gens.g, x * gens.h);

        let proof = DleqProof::prove(&mut Transcript::new(b"test"), &gens.g, &gens.h, &x, &mut OsRng);
        assert!(proof.verify(&mut Transcript::new(b"test"), &gens.g, &gens.h, &a, &b));
    }

    #[test]
    fn test_dleq_rejects_unequal_logs() {
        let gens = PedersenGens::default();
        let x = random_scalar(&mut OsRng);
        let y = random_scalar(&mut OsRng);
        let proof = DleqProof::prove(&mut Transcript::new(b"test"), &gens.g, &gens.h, &x, &mut OsRng);

        // Same key over G, different log over H
        assert!(!proof.verify(&mut Transcript::new(b"test"), &gens.g, &gens.h, &(x * gens.g), &(y * gens.h)));
        assert!(!proof.verify(&mut Transcript::new(b"other"), &gens.g, &gens.h, &(x * gens.g), &(x * gens.h)));
    }
}
