//! Proof composer
//!
//! Combines commitments, range proofs and Merkle membership into
//! balance proofs and value-conserving payment proofs.
//!
//! Both proof kinds consume notes the same way. Each note is revealed as a
//! [`SpentInput`] (one-time address P, public nullifier key K, commitment,
//! membership path, nullifier) and carries a [`SpendAuthorization`]:
//! - a Schnorr proof of `p` with `P = p·G`, where `p = b + H(ss)` needs the
//!   spend key
//! - a DLEQ proof that the nullifier N and K share one discrete log over
//!   `Hp(P)` and G
//!
//! Both proofs run on the enclosing proof's transcript, so they also sign
//! every other public value of that proof.

pub mod balance;
pub mod payment;

pub use balance::BalanceProof;
pub use payment::{PaymentBundle, PaymentProof, PaymentRecipient};

use std::collections::BTreeSet;

use curve25519_dalek::constants::RISTRETTO_BASEPOINT_POINT;
use merlin::Transcript;
use rand::{CryptoRng, RngCore};
use serde::{Deserialize, Serialize};

use crate::crypto::keys::{KeyTriplet, PublicKey, SecretScalar};
use crate::crypto::merkle::{verify_membership, Hash, MerkleHasher, MerkleProof, MerkleTree};
use crate::crypto::nullifier::{nullifier_base, Nullifier, NullifierKey};
use crate::crypto::pedersen::{Commitment, PedersenGens};
use crate::crypto::schnorr::{DleqProof, SchnorrProof};
use crate::crypto::stealth::{note_leaf, recover_one_time_key};
use crate::error::{CoreError, Result};
use crate::note::PaymentNote;

/// Public data for one consumed note
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpentInput {
    /// One-time address P
    pub address: PublicKey,
    /// Public nullifier key K
    pub nullifier_public: PublicKey,
    pub commitment: Commitment,
    pub membership: MerkleProof,
    pub nullifier: Nullifier,
}

impl SpentInput {
    pub(crate) fn for_note<H: MerkleHasher>(note: &PaymentNote, tree: &MerkleTree<H>) -> Result<Self> {
        Ok(Self {
            address: note.address,
            nullifier_public: note.nullifier_public(),
            commitment: note.commitment,
            membership: tree.prove_membership_of(&note.leaf())?,
            nullifier: note.nullifier(),
        })
    }

    /// Leaf recomputed from the revealed note fields
    pub fn leaf(&self) -> Hash {
        note_leaf(&self.address, &self.nullifier_public, &self.commitment)
    }

    pub(crate) fn append_to(&self, transcript: &mut Transcript) {
        transcript.append_message(b"in.P", self.address.as_bytes());
        transcript.append_message(b"in.K", self.nullifier_public.as_bytes());
        transcript.append_message(b"in.C", self.commitment.as_bytes());
        transcript.append_u64(b"in.pos", self.membership.leaf_index);
        transcript.append_message(b"in.nf", self.nullifier.as_bytes());
    }
}

/// Ownership and nullifier proofs for one [`SpentInput`]
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpendAuthorization {
    /// Knowledge of p with P = p·G
    pub ownership: SchnorrProof,
    /// log_G(K) = log_Hp(P)(N)
    pub nullifier: DleqProof,
}

/// Secrets behind one [`SpentInput`]
pub(crate) struct InputWitness {
    pub(crate) one_time: SecretScalar,
    pub(crate) nullifier_key: NullifierKey,
}

impl ProofComposer {
    /// Reveal `notes` and recover the secrets needed to authorize them
    ///
    /// Fails with `DuplicateNote` if a note repeats, `InvalidCommitment` if
    /// one does not open, `InvalidKey` if `keys` do not own its address and
    /// `MerkleProofFailed` if its leaf is not in `tree`.
    pub(crate) fn open_inputs<H: MerkleHasher>(
        &self,
        keys: &KeyTriplet,
        notes: &[PaymentNote],
        tree: &MerkleTree<H>,
    ) -> Result<(Vec<SpentInput>, Vec<InputWitness>)> {
        let mut seen = BTreeSet::new();
        let mut inputs = Vec::with_capacity(notes.len());
        let mut witnesses = Vec::with_capacity(notes.len());
        for note in notes {
            if !seen.insert(note.leaf()) {
                return Err(CoreError::DuplicateNote);
            }
            if !note.verify_opening(self.gens()) {
                return Err(CoreError::InvalidCommitment);
            }
            let one_time = recover_one_time_key(keys, &note.ephemeral_public, &note.address)?;
            inputs.push(SpentInput::for_note(note, tree)?);
            witnesses.push(InputWitness { one_time, nullifier_key: note.nullifier_key.clone() });
        }
        Ok((inputs, witnesses))
    }
}

/// Prove every input in order on `transcript`
pub(crate) fn authorize_inputs<R: RngCore + CryptoRng>(
    transcript: &mut Transcript,
    inputs: &[SpentInput],
    witnesses: &[InputWitness],
    rng: &mut R,
) -> Vec<SpendAuthorization> {
    let g = RISTRETTO_BASEPOINT_POINT;
    inputs
        .iter()
        .zip(witnesses)
        .map(|(input, witness)| {
            let ownership = SchnorrProof::prove(transcript, &g, &witness.one_time.to_scalar(), rng);
            let nullifier = DleqProof::prove(
                transcript,
                &g,
                &nullifier_base(&input.address),
                &witness.nullifier_key.to_scalar(),
                rng,
            );
            SpendAuthorization { ownership, nullifier }
        })
        .collect()
}

/// Membership, ownership and nullifier checks for every input
///
/// Rejects repeated leaves or nullifiers within one proof. Freshness against
/// earlier proofs is the ledger's job.
pub(crate) fn verify_inputs<H: MerkleHasher>(
    transcript: &mut Transcript,
    merkle_root: &Hash,
    inputs: &[SpentInput],
    authorizations: &[SpendAuthorization],
) -> bool {
    if inputs.len() != authorizations.len() {
        return false;
    }
    let leaves: BTreeSet<_> = inputs.iter().map(SpentInput::leaf).collect();
    let nullifiers: BTreeSet<_> = inputs.iter().map(|i| i.nullifier).collect();
    if leaves.len() != inputs.len() || nullifiers.len() != inputs.len() {
        return false;
    }

    let hasher = H::default();
    let g = RISTRETTO_BASEPOINT_POINT;
    inputs.iter().zip(authorizations).all(|(input, auth)| {
        if input.membership.root != *merkle_root
            || !verify_membership(&hasher, &input.leaf(), &input.membership)
        {
            return false;
        }
        let (Ok(address), Ok(nullifier_public), Some(nullifier)) = (
            input.address.to_point(),
            input.nullifier_public.to_point(),
            input.nullifier.to_point(),
        ) else {
            return false;
        };
        auth.ownership.verify(transcript, &g, &address)
            && auth.nullifier.verify(
                transcript,
                &g,
                &nullifier_base(&input.address),
                &nullifier_public,
                &nullifier,
            )
    })
}

/// Builds and checks composite proofs
///
/// `balance_ceiling` is the practical upper bound used when a balance
/// proof only needs to show `total >= min_required`.
#[derive(Clone, Debug)]
pub struct ProofComposer {
    gens: PedersenGens,
    balance_ceiling: u64,
}

impl ProofComposer {
    pub fn new(gens: PedersenGens, balance_ceiling: u64) -> Self {
        Self { gens, balance_ceiling }
    }

    pub fn gens(&self) -> &PedersenGens {
        &self.gens
    }

    pub fn balance_ceiling(&self) -> u64 {
        self.balance_ceiling
    }
}
