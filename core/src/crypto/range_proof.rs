//! Range proofs over Pedersen commitments
//!
//! Bit decomposition: the prover commits to every bit of `v - min`
//! (`B_i = b_i·G + r_i·H`) and proves each `B_i` opens to 0 or 1 with a
//! Cramer-Damgård-Schoenmakers OR proof. The bit blindings are chosen so
//! that `Σ 2^i·B_i` equals `C - min·G` exactly, which binds the bits to the
//! committed value.
//!
//! With `n` bits the lower side only shows `v - min < 2^n`. When the range
//! size is not a power of two a second decomposition proves `max - v < 2^n`
//! against `max·G - C`, giving exact bounds.
//!
//! Fiat-Shamir challenges come from a merlin transcript that binds the
//! bounds, the bit count and the commitment.
//!
//! Encoding (`to_bytes`):
//! `min (8, LE) || max (8, LE) || commitment (32) || n_lower (1) || n_upper (1) || bits`
//! where each bit proof is `B (32) || c0 (32) || c1 (32) || z0 (32) || z1 (32)`.

use curve25519_dalek::{
    ristretto::{CompressedRistretto, RistrettoPoint},
    scalar::Scalar,
    traits::Identity,
};
use merlin::Transcript;
use rand::{rngs::OsRng, CryptoRng, RngCore};
use serde::{Deserialize, Serialize};

use crate::crypto::hash::{canonical_scalar, scalar_from_wide};
use crate::crypto::keys::random_scalar;
use crate::crypto::pedersen::{Blinding, Commitment, PedersenGens};
use crate::error::{CoreError, Result};

const TRANSCRIPT_LABEL: &[u8] = b"shadowpay.range_proof.v1";

/// Encoded size of one bit proof
pub const BIT_PROOF_LEN: usize = 160;

const HEADER_LEN: usize = 8 + 8 + 32 + 1 + 1;

/// Proof that a single commitment opens to 0 or 1
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BitProof {
    pub commitment: [u8; 32],
    pub c0: [u8; 32],
    pub c1: [u8; 32],
    pub z0: [u8; 32],
    pub z1: [u8; 32],
}

/// Attests `min <= v <= max` for the committed `v`
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RangeProof {
    pub commitment: Commitment,
    pub min: u64,
    pub max: u64,
    lower: Vec<BitProof>,
    upper: Vec<BitProof>,
}

/// Number of bits needed to cover `[min, max]`, at least one
pub fn bit_width(min: u64, max: u64) -> u32 {
    let span = max - min;
    (64 - span.leading_zeros()).max(1)
}

/// Whether `[0, 2^n)` overshoots the span, requiring the upper-side proof
fn needs_upper(span: u64, bits: u32) -> bool {
    let cap = if bits >= 64 { u64::MAX } else { (1u64 << bits) - 1 };
    span != cap
}

fn pow2(i: u32) -> Scalar {
    Scalar::from(1u64 << i)
}

fn range_transcript(min: u64, max: u64, bits: u32, commitment: &Commitment) -> Transcript {
    let mut transcript = Transcript::new(TRANSCRIPT_LABEL);
    transcript.append_u64(b"min", min);
    transcript.append_u64(b"max", max);
    transcript.append_u64(b"n", u64::from(bits));
    transcript.append_message(b"C", commitment.as_bytes());
    transcript
}

fn bit_challenge(
    transcript: &mut Transcript,
    index: u32,
    commitment: &[u8; 32],
    nonces: &[RistrettoPoint; 2],
) -> Scalar {
    transcript.append_u64(b"bit", u64::from(index));
    transcript.append_message(b"B", commitment);
    transcript.append_message(b"A0", nonces[0].compress().as_bytes());
    transcript.append_message(b"A1", nonces[1].compress().as_bytes());
    let mut wide = [0u8; 64];
    transcript.challenge_bytes(b"c", &mut wide);
    scalar_from_wide(&wide)
}

// ============================================================================
// Prover
// ============================================================================

fn prove_bit<R: RngCore + CryptoRng>(
    gens: &PedersenGens,
    transcript: &mut Transcript,
    index: u32,
    bit: bool,
    blinding: &Scalar,
    rng: &mut R,
) -> BitProof {
    let b = if bit { Scalar::ONE } else { Scalar::ZERO };
    let point = gens.commit_point(b, *blinding);
    let commitment = point.compress().to_bytes();
    // Statement j: point - j·G = r·H
    let statements = [point, point - gens.g];
    let real = usize::from(bit);
    let fake = 1 - real;

    let mut c = [Scalar::ZERO; 2];
    let mut z = [Scalar::ZERO; 2];
    let mut nonces = [RistrettoPoint::identity(); 2];

    c[fake] = random_scalar(rng);
    z[fake] = random_scalar(rng);
    nonces[fake] = z[fake] * gens.h - c[fake] * statements[fake];

    let k = random_scalar(rng);
    nonces[real] = k * gens.h;

    let challenge = bit_challenge(transcript, index, &commitment, &nonces);
    c[real] = challenge - c[fake];
    z[real] = k + c[real] * blinding;

    BitProof {
        commitment,
        c0: c[0].to_bytes(),
        c1: c[1].to_bytes(),
        z0: z[0].to_bytes(),
        z1: z[1].to_bytes(),
    }
}

/// Decompose `x` into `bits` bit proofs whose weighted sum carries
/// exactly `target_blinding` on H
fn prove_bits<R: RngCore + CryptoRng>(
    gens: &PedersenGens,
    transcript: &mut Transcript,
    x: u64,
    bits: u32,
    target_blinding: Scalar,
    rng: &mut R,
) -> Vec<BitProof> {
    let mut blindings: Vec<Scalar> = (0..bits - 1).map(|_| random_scalar(rng)).collect();
    let partial = blindings
        .iter()
        .zip(0u32..)
        .fold(Scalar::ZERO, |acc, (r, i)| acc + pow2(i) * r);
    blindings.push((target_blinding - partial) * pow2(bits - 1).invert());

    blindings
        .iter()
        .zip(0u32..)
        .map(|(r, i)| prove_bit(gens, transcript, i, (x >> i) & 1 == 1, r, rng))
        .collect()
}

// ============================================================================
// Verifier
// ============================================================================

fn verify_bits(
    gens: &PedersenGens,
    transcript: &mut Transcript,
    proofs: &[BitProof],
    target: RistrettoPoint,
) -> bool {
    let mut weighted = RistrettoPoint::identity();

    for (proof, i) in proofs.iter().zip(0u32..) {
        let Some(point) = CompressedRistretto(proof.commitment).decompress() else {
            return false;
        };
        let scalars = (
            canonical_scalar(&proof.c0),
            canonical_scalar(&proof.c1),
            canonical_scalar(&proof.z0),
            canonical_scalar(&proof.z1),
        );
        let (Some(c0), Some(c1), Some(z0), Some(z1)) = scalars else {
            return false;
        };

        let nonces = [
            z0 * gens.h - c0 * point,
            z1 * gens.h - c1 * (point - gens.g),
        ];
        let challenge = bit_challenge(transcript, i, &proof.commitment, &nonces);
        if c0 + c1 != challenge {
            return false;
        }
        weighted += pow2(i) * point;
    }

    weighted == target
}

impl RangeProof {
    /// Prove `min <= value <= max` for `Commit(value, blinding)`
    pub fn prove(
        gens: &PedersenGens,
        value: u64,
        blinding: &Blinding,
        min: u64,
        max: u64,
    ) -> Result<Self> {
        Self::prove_with(gens, value, blinding, min, max, &mut OsRng)
    }

    pub fn prove_with<R: RngCore + CryptoRng>(
        gens: &PedersenGens,
        value: u64,
        blinding: &Blinding,
        min: u64,
        max: u64,
        rng: &mut R,
    ) -> Result<Self> {
        if min > max {
            return Err(CoreError::InvalidRange { min, max });
        }
        if value < min || value > max {
            return Err(CoreError::RangeViolation { value, min, max });
        }

        let bits = bit_width(min, max);
        let commitment = gens.commit(value, blinding);
        let mut transcript = range_transcript(min, max, bits, &commitment);
        let r = blinding.to_scalar();

        transcript.append_message(b"side", b"lower");
        let lower = prove_bits(gens, &mut transcript, value - min, bits, r, rng);

        let upper = if needs_upper(max - min, bits) {
            transcript.append_message(b"side", b"upper");
            prove_bits(gens, &mut transcript, max - value, bits, -r, rng)
        } else {
            Vec::new()
        };

        Ok(Self { commitment, min, max, lower, upper })
    }

    /// Verify against the caller's expected bounds
    ///
    /// A proof built for any other `[min, max]` is rejected.
    pub fn verify(&self, gens: &PedersenGens, min: u64, max: u64) -> bool {
        if self.min != min || self.max != max || min > max {
            return false;
        }

        let bits = bit_width(min, max);
        let expect_upper = needs_upper(max - min, bits);
        let upper_len = if expect_upper { bits as usize } else { 0 };
        if self.lower.len() != bits as usize || self.upper.len() != upper_len {
            return false;
        }

        let Ok(c) = self.commitment.to_point() else {
            return false;
        };
        let mut transcript = range_transcript(min, max, bits, &self.commitment);

        transcript.append_message(b"side", b"lower");
        let lower_target = c - Scalar::from(min) * gens.g;
        if !verify_bits(gens, &mut transcript, &self.lower, lower_target) {
            return false;
        }

        if expect_upper {
            transcript.append_message(b"side", b"upper");
            let upper_target = Scalar::from(max) * gens.g - c;
            if !verify_bits(gens, &mut transcript, &self.upper, upper_target) {
                return false;
            }
        }

        true
    }

    /// `verify` as a typed error for callers composing larger checks
    pub fn ensure_valid(&self, gens: &PedersenGens, min: u64, max: u64) -> Result<()> {
        if self.verify(gens, min, max) {
            Ok(())
        } else {
            Err(CoreError::ProofVerificationFailed)
        }
    }

    pub fn bit_count(&self) -> usize {
        self.lower.len() + self.upper.len()
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(HEADER_LEN + self.bit_count() * BIT_PROOF_LEN);
        out.extend_from_slice(&self.min.to_le_bytes());
        out.extend_from_slice(&self.max.to_le_bytes());
        out.extend_from_slice(self.commitment.as_bytes());
        // Bit counts never exceed 64
        out.push(self.lower.len() as u8);
        out.push(self.upper.len() as u8);
        for bit in self.lower.iter().chain(&self.upper) {
            out.extend_from_slice(&bit.commitment);
            out.extend_from_slice(&bit.c0);
            out.extend_from_slice(&bit.c1);
            out.extend_from_slice(&bit.z0);
            out.extend_from_slice(&bit.z1);
        }
        out
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < HEADER_LEN {
            return Err(CoreError::MalformedProof("range proof header truncated"));
        }
        let word = |at: usize| -> [u8; 8] {
            let mut w = [0u8; 8];
            w.copy_from_slice(&bytes[at..at + 8]);
            w
        };
        let min = u64::from_le_bytes(word(0));
        let max = u64::from_le_bytes(word(8));
        let commitment = Commitment::from_slice(&bytes[16..48])?;
        let n_lower = bytes[48] as usize;
        let n_upper = bytes[49] as usize;

        let body = &bytes[HEADER_LEN..];
        if n_lower > 64 || n_upper > 64 || body.len() != (n_lower + n_upper) * BIT_PROOF_LEN {
            return Err(CoreError::MalformedProof("range proof body length mismatch"));
        }

        let mut bits = body.chunks_exact(BIT_PROOF_LEN).map(|chunk| {
            let field = |i: usize| -> [u8; 32] {
                let mut f = [0u8; 32];
                f.copy_from_slice(&chunk[i * 32..(i + 1) * 32]);
                f
            };
            BitProof { commitment: field(0), c0: field(1), c1: field(2), z0: field(3), z1: field(4) }
        });
        let lower = bits.by_ref().take(n_lower).collect();
        let upper = bits.collect();

        Ok(Self { commitment, min, max, lower, upper })
    }
}
