//! Balance proofs: "I own notes summing to at least `min_required`"
//!
//! The combined commitment is the homomorphic sum of the note commitments,
//! so a verifier can recompute it from the listed inputs and check the
//! range proof against it. Every input carries a membership proof against
//! one accumulator root and a [`SpendAuthorization`] bound to the balance
//! transcript, so only the holder of the spend key can produce the proof.
//!
//! Inputs reveal their nullifiers. A verifier with access to the ledger's
//! nullifier set should reject proofs listing spent notes.

use merlin::Transcript;
use rand::{rngs::OsRng, CryptoRng, RngCore};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::crypto::keys::KeyTriplet;
use crate::crypto::merkle::{Hash, MerkleHasher, MerkleTree, RootHistory};
use crate::crypto::nullifier::Nullifier;
use crate::crypto::pedersen::{Blinding, Commitment};
use crate::crypto::range_proof::RangeProof;
use crate::error::{CoreError, Result};
use crate::note::{total_amount, PaymentNote};
use crate::proofs::{authorize_inputs, verify_inputs, ProofComposer, SpendAuthorization, SpentInput};

const TRANSCRIPT_LABEL: &[u8] = b"shadowpay.balance.v1";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceProof {
    /// Accumulator root every membership proof was built against
    pub merkle_root: Hash,
    pub inputs: Vec<SpentInput>,
    /// One per input, in the same order
    pub authorizations: Vec<SpendAuthorization>,
    pub total_commitment: Commitment,
    pub range_proof: RangeProof,
    pub min_required: u64,
}

impl BalanceProof {
    pub fn nullifiers(&self) -> Vec<Nullifier> {
        self.inputs.iter().map(|input| input.nullifier).collect()
    }
}

fn balance_transcript(
    merkle_root: &Hash,
    inputs: &[SpentInput],
    total_commitment: &Commitment,
    min_required: u64,
) -> Transcript {
    let mut transcript = Transcript::new(TRANSCRIPT_LABEL);
    transcript.append_message(b"root", merkle_root);
    transcript.append_u64(b"min", min_required);
    transcript.append_u64(b"n_in", inputs.len() as u64);
    for input in inputs {
        input.append_to(&mut transcript);
    }
    transcript.append_message(b"total", total_commitment.as_bytes());
    transcript
}

impl ProofComposer {
    pub fn generate_balance_proof<H: MerkleHasher>(
        &self,
        keys: &KeyTriplet,
        notes: &[PaymentNote],
        min_required: u64,
        tree: &MerkleTree<H>,
    ) -> Result<BalanceProof> {
        self.generate_balance_proof_with(keys, notes, min_required, tree, &mut OsRng)
    }

    /// Prove the notes' total lies in `[min_required, balance_ceiling]`
    ///
    /// Fails with `RangeViolation` when the total is below the threshold,
    /// `MerkleProofFailed` when a note is not in `tree`,
    /// `InvalidCommitment` when a note does not open and `InvalidKey` when
    /// `keys` do not own a note.
    pub fn generate_balance_proof_with<H: MerkleHasher, R: RngCore + CryptoRng>(
        &self,
        keys: &KeyTriplet,
        notes: &[PaymentNote],
        min_required: u64,
        tree: &MerkleTree<H>,
        rng: &mut R,
    ) -> Result<BalanceProof> {
        if min_required > self.balance_ceiling() {
            return Err(CoreError::InvalidRange {
                min: min_required,
                max: self.balance_ceiling(),
            });
        }

        let (inputs, witnesses) = self.open_inputs(keys, notes, tree)?;

        let total = total_amount(notes)?;
        let blinding = Blinding::sum(notes.iter().map(|n| &n.randomness));
        let range_proof = RangeProof::prove_with(
            self.gens(),
            total,
            &blinding,
            min_required,
            self.balance_ceiling(),
            rng,
        )?;

        let merkle_root = tree.root();
        let total_commitment = range_proof.commitment;
        let mut transcript = balance_transcript(&merkle_root, &inputs, &total_commitment, min_required);
        let authorizations = authorize_inputs(&mut transcript, &inputs, &witnesses, rng);

        debug!(notes = notes.len(), min_required, "balance proof generated");
        Ok(BalanceProof {
            merkle_root,
            inputs,
            authorizations,
            total_commitment,
            range_proof,
            min_required,
        })
    }

    /// Check a balance proof against the caller's threshold and the roots
    /// the caller currently accepts
    pub fn verify_balance_proof<H: MerkleHasher>(
        &self,
        proof: &BalanceProof,
        min_required: u64,
        anchors: &RootHistory,
    ) -> bool {
        if proof.min_required != min_required || !anchors.contains(&proof.merkle_root) {
            return false;
        }

        match Commitment::sum(proof.inputs.iter().map(|input| &input.commitment)) {
            Ok(sum) if sum == proof.total_commitment && sum == proof.range_proof.commitment => {}
            _ => return false,
        }

        let mut transcript =
            balance_transcript(&proof.merkle_root, &proof.inputs, &proof.total_commitment, min_required);
        let valid = verify_inputs::<H>(&mut transcript, &proof.merkle_root, &proof.inputs, &proof.authorizations)
            && proof
                .range_proof
                .verify(self.gens(), min_required, self.balance_ceiling());
        info!(valid, min_required, "balance proof verified");
        valid
    }
}
