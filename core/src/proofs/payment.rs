//! Payment proofs: spend notes into fresh stealth outputs plus change
//!
//! Value conservation: with inputs `C_in`, outputs `C_out` and public fee
//! `f`, the point `E = Σ C_in - Σ C_out - f·G` must equal `e·H` for the
//! excess blinding `e`. A Schnorr proof of knowledge of `e` over H shows
//! E has no G component, so `Σ in = Σ out + f`. Range proofs on every
//! output keep each output amount inside `[0, u64::MAX]`, ruling out
//! negative outputs that would mint value.
//!
//! Each input reveals its note leaf fields, a membership proof against
//! `merkle_root` and its key-image nullifier, and carries a
//! [`SpendAuthorization`] signed with the one-time key. The ledger rejects
//! nullifiers it has already seen.

use curve25519_dalek::{ristretto::RistrettoPoint, scalar::Scalar, traits::Identity};
use merlin::Transcript;
use rand::{rngs::OsRng, CryptoRng, RngCore};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::crypto::keys::{KeyTriplet, ReceiveAddress};
use crate::crypto::merkle::{Hash, MerkleHasher, MerkleTree, RootHistory};
use crate::crypto::nullifier::Nullifier;
use crate::crypto::pedersen::Blinding;
use crate::crypto::range_proof::RangeProof;
use crate::crypto::schnorr::SchnorrProof;
use crate::crypto::stealth::{create_stealth_payment, PaymentOutput, StealthPayment};
use crate::error::{CoreError, Result};
use crate::note::{total_amount, PaymentNote};
use crate::proofs::{authorize_inputs, verify_inputs, ProofComposer, SpendAuthorization, SpentInput};

const TRANSCRIPT_LABEL: &[u8] = b"shadowpay.payment.v2";

/// One requested output
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentRecipient {
    pub address: ReceiveAddress,
    pub amount: u64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentProof {
    pub merkle_root: Hash,
    pub inputs: Vec<SpentInput>,
    /// One per input, in the same order
    pub authorizations: Vec<SpendAuthorization>,
    pub outputs: Vec<PaymentOutput>,
    /// One per output, in the same order
    pub range_proofs: Vec<RangeProof>,
    pub fee: u64,
    pub conservation: SchnorrProof,
}

impl PaymentProof {
    pub fn nullifiers(&self) -> Vec<Nullifier> {
        self.inputs.iter().map(|input| input.nullifier).collect()
    }

    /// Leaves the ledger appends to the accumulator
    pub fn output_leaves(&self) -> Vec<Hash> {
        self.outputs.iter().map(PaymentOutput::leaf).collect()
    }

    /// `StaleRoot` unless the proof's root is still accepted
    pub fn check_anchor(&self, anchors: &RootHistory) -> Result<()> {
        anchors.ensure_known(&self.merkle_root)
    }
}

/// Sender-side result
///
/// `payments` holds the private openings of every output in proof order;
/// when `change > 0` the last entry is the change output.
#[derive(Debug)]
pub struct PaymentBundle {
    pub proof: PaymentProof,
    pub change: u64,
    pub payments: Vec<StealthPayment>,
}

fn payment_transcript(
    merkle_root: &Hash,
    inputs: &[SpentInput],
    outputs: &[PaymentOutput],
    fee: u64,
) -> Transcript {
    let mut transcript = Transcript::new(TRANSCRIPT_LABEL);
    transcript.append_message(b"root", merkle_root);
    transcript.append_u64(b"fee", fee);
    transcript.append_u64(b"n_in", inputs.len() as u64);
    for input in inputs {
        input.append_to(&mut transcript);
    }
    transcript.append_u64(b"n_out", outputs.len() as u64);
    for output in outputs {
        transcript.append_message(b"out.P", output.stealth.address.as_bytes());
        transcript.append_message(b"out.R", output.stealth.ephemeral_public.as_bytes());
        transcript.append_message(b"out.K", output.stealth.nullifier_public.as_bytes());
        transcript.append_message(b"out.C", output.stealth.commitment.as_bytes());
        transcript.append_message(b"out.enc", &output.encrypted_amount.0);
    }
    transcript
}

/// `Σ C_in - Σ C_out - fee·G`
fn excess_point(
    composer: &ProofComposer,
    inputs: &[SpentInput],
    outputs: &[PaymentOutput],
    fee: u64,
) -> Result<RistrettoPoint> {
    let mut excess = RistrettoPoint::identity();
    for input in inputs {
        excess += input.commitment.to_point()?;
    }
    for output in outputs {
        excess -= output.stealth.commitment.to_point()?;
    }
    Ok(excess - Scalar::from(fee) * composer.gens().g)
}

impl ProofComposer {
    #[allow(clippy::too_many_arguments)]
    pub fn generate_payment_proof<H: MerkleHasher>(
        &self,
        keys: &KeyTriplet,
        inputs: &[PaymentNote],
        outputs: &[PaymentRecipient],
        fee: u64,
        change_to: &ReceiveAddress,
        tree: &MerkleTree<H>,
        expected_root: Option<Hash>,
    ) -> Result<PaymentBundle> {
        self.generate_payment_proof_with(keys, inputs, outputs, fee, change_to, tree, expected_root, &mut OsRng)
    }

    /// Compose a payment spending `inputs` into `outputs` plus change
    ///
    /// `keys` must own every input. Fails with `StaleRoot` if
    /// `expected_root` no longer matches `tree`, `InsufficientFunds` if
    /// inputs cannot cover outputs and fee, `DuplicateNote` if an input
    /// repeats and `InvalidKey` if `keys` cannot derive an input's one-time
    /// key.
    #[allow(clippy::too_many_arguments)]
    pub fn generate_payment_proof_with<H: MerkleHasher, R: RngCore + CryptoRng>(
        &self,
        keys: &KeyTriplet,
        inputs: &[PaymentNote],
        outputs: &[PaymentRecipient],
        fee: u64,
        change_to: &ReceiveAddress,
        tree: &MerkleTree<H>,
        expected_root: Option<Hash>,
        rng: &mut R,
    ) -> Result<PaymentBundle> {
        let merkle_root = tree.root();
        if expected_root.is_some_and(|root| root != merkle_root) {
            return Err(CoreError::StaleRoot);
        }

        let available = total_amount(inputs)?;
        let required = outputs
            .iter()
            .try_fold(fee, |acc, out| acc.checked_add(out.amount))
            .ok_or(CoreError::AmountOverflow)?;
        if inputs.is_empty() || available < required {
            return Err(CoreError::InsufficientFunds { available, required });
        }
        let change = available - required;

        let (spent, witnesses) = self.open_inputs(keys, inputs, tree)?;

        let mut payments = Vec::with_capacity(outputs.len() + 1);
        for recipient in outputs {
            payments.push(create_stealth_payment(self.gens(), &recipient.address, recipient.amount, rng)?);
        }
        if change > 0 {
            payments.push(create_stealth_payment(self.gens(), change_to, change, rng)?);
        }

        let range_proofs = payments
            .iter()
            .map(|p| RangeProof::prove_with(self.gens(), p.amount, &p.blinding, 0, u64::MAX, rng))
            .collect::<Result<Vec<_>>>()?;

        let input_blinding = Blinding::sum(inputs.iter().map(|n| &n.randomness));
        let output_blinding = Blinding::sum(payments.iter().map(|p| &p.blinding));
        let excess = input_blinding.to_scalar() - output_blinding.to_scalar();

        let public_outputs: Vec<PaymentOutput> = payments.iter().map(|p| p.output).collect();
        let mut transcript = payment_transcript(&merkle_root, &spent, &public_outputs, fee);
        let authorizations = authorize_inputs(&mut transcript, &spent, &witnesses, rng);
        let conservation = SchnorrProof::prove(&mut transcript, &self.gens().h, &excess, rng);

        debug!(
            inputs = spent.len(),
            outputs = public_outputs.len(),
            fee,
            "payment proof generated"
        );

        Ok(PaymentBundle {
            proof: PaymentProof {
                merkle_root,
                inputs: spent,
                authorizations,
                outputs: public_outputs,
                range_proofs,
                fee,
                conservation,
            },
            change,
            payments,
        })
    }

    /// Structural and cryptographic checks; nullifier freshness is the
    /// ledger's job
    pub fn verify_payment_proof<H: MerkleHasher>(&self, proof: &PaymentProof, anchors: &RootHistory) -> bool {
        if !anchors.contains(&proof.merkle_root) || proof.inputs.is_empty() {
            return false;
        }

        if proof.outputs.len() != proof.range_proofs.len() {
            return false;
        }
        let ranges_ok = proof.outputs.iter().zip(&proof.range_proofs).all(|(output, range)| {
            range.commitment == output.stealth.commitment && range.verify(self.gens(), 0, u64::MAX)
        });
        if !ranges_ok {
            return false;
        }

        let Ok(excess) = excess_point(self, &proof.inputs, &proof.outputs, proof.fee) else {
            return false;
        };
        let mut transcript = payment_transcript(&proof.merkle_root, &proof.inputs, &proof.outputs, proof.fee);
        let valid = verify_inputs::<H>(&mut transcript, &proof.merkle_root, &proof.inputs, &proof.authorizations)
            && proof.conservation.verify(&mut transcript, &self.gens().h, &excess);
        info!(valid, inputs = proof.inputs.len(), outputs = proof.outputs.len(), "payment proof verified");
        valid
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::keys::{random_scalar, ScanKey, SecretScalar};
    use crate::crypto::merkle::Sha256Hasher;
    use crate::crypto::nullifier::NullifierKey;
    use crate::crypto::pedersen::PedersenGens;
    use crate::crypto::stealth::{compute_stealth_payment, derive_shared_secret, recover_one_time_key};
    use crate::proofs::InputWitness;
    use crate::scanner::{ScanOptions, TransactionCandidate, ViewTagScanner};
    use tokio_util::sync::CancellationToken;

    struct Fixture {
        composer: ProofComposer,
        sender: KeyTriplet,
        candidates: Vec<TransactionCandidate>,
        notes: Vec<PaymentNote>,
        tree: MerkleTree,
        anchors: RootHistory,
    }

    /// Pay `amounts` to a fresh sender, insert into a tree, scan them back
    fn fixture(amounts: &[u64]) -> Fixture {
        let gens = PedersenGens::default();
        let composer = ProofComposer::new(gens, u64::MAX);
        let sender = KeyTriplet::generate();
        let mut tree = MerkleTree::new();

        let candidates: Vec<_> = amounts
            .iter()
            .map(|amount| {
                let payment = compute_stealth_payment(&gens, &sender.receive_address(), *amount).unwrap();
                tree.insert(payment.output.leaf());
                TransactionCandidate::from_output(&payment.output, 0)
            })
            .collect();

        let scan_key = sender.scan_key();
        let notes = scan(&gens, &scan_key, &candidates);
        let mut anchors = RootHistory::default();
        anchors.observe(&tree);

        Fixture { composer, sender, candidates, notes, tree, anchors }
    }

    fn scan(gens: &PedersenGens, key: &ScanKey, candidates: &[TransactionCandidate]) -> Vec<PaymentNote> {
        ViewTagScanner::new(key, gens)
            .scan(candidates, &ScanOptions::default(), &CancellationToken::new())
            .notes
    }

    /// Everything a holder of the note openings can assemble without the
    /// spend key: outputs, range proofs, conservation and the input proofs
    /// signed with whatever secrets `witnesses` carry
    fn assemble(
        f: &Fixture,
        notes: &[PaymentNote],
        inputs: Vec<SpentInput>,
        witnesses: &[InputWitness],
        pay_to: &ReceiveAddress,
    ) -> PaymentProof {
        let gens = f.composer.gens();
        let amount = total_amount(notes).unwrap();
        let payment = compute_stealth_payment(gens, pay_to, amount).unwrap();
        let range = RangeProof::prove(gens, amount, &payment.blinding, 0, u64::MAX).unwrap();
        let outputs = vec![payment.output];

        let merkle_root = f.tree.root();
        let mut transcript = payment_transcript(&merkle_root, &inputs, &outputs, 0);
        let authorizations = authorize_inputs(&mut transcript, &inputs, witnesses, &mut OsRng);
        let excess = Blinding::sum(notes.iter().map(|n| &n.randomness)).to_scalar()
            - payment.blinding.to_scalar();
        let conservation = SchnorrProof::prove(&mut transcript, &gens.h, &excess, &mut OsRng);

        PaymentProof {
            merkle_root,
            inputs,
            authorizations,
            outputs,
            range_proofs: vec![range],
            fee: 0,
            conservation,
        }
    }

    fn inputs_for(f: &Fixture, notes: &[PaymentNote]) -> Vec<SpentInput> {
        notes.iter().map(|n| SpentInput::for_note(n, &f.tree).unwrap()).collect()
    }

    #[test]
    fn test_payment_with_change() {
        let f = fixture(&[700, 500]);
        let recipient = KeyTriplet::generate();
        let outputs = [PaymentRecipient { address: recipient.receive_address(), amount: 900 }];

        let bundle = f
            .composer
            .generate_payment_proof(&f.sender, &f.notes, &outputs, 100, &f.sender.receive_address(), &f.tree, None)
            .unwrap();

        assert_eq!(bundle.change, 200);
        assert_eq!(bundle.proof.outputs.len(), 2);
        assert_eq!(bundle.proof.nullifiers().len(), 2);
        assert_eq!(bundle.proof.authorizations.len(), 2);
        assert!(f.composer.verify_payment_proof::<Sha256Hasher>(&bundle.proof, &f.anchors));
    }

    #[test]
    fn test_exact_spend_has_no_change_output() {
        let f = fixture(&[1_000]);
        let recipient = KeyTriplet::generate();
        let outputs = [PaymentRecipient { address: recipient.receive_address(), amount: 1_000 }];

        let bundle = f
            .composer
            .generate_payment_proof(&f.sender, &f.notes, &outputs, 0, &f.sender.receive_address(), &f.tree, None)
            .unwrap();
        assert_eq!(bundle.change, 0);
        assert_eq!(bundle.proof.outputs.len(), 1);
        assert!(f.composer.verify_payment_proof::<Sha256Hasher>(&bundle.proof, &f.anchors));
    }

    #[test]
    fn test_insufficient_funds() {
        let f = fixture(&[100]);
        let recipient = KeyTriplet::generate();
        let outputs = [PaymentRecipient { address: recipient.receive_address(), amount: 100 }];

        let err = f
            .composer
            .generate_payment_proof(&f.sender, &f.notes, &outputs, 1, &f.sender.receive_address(), &f.tree, None)
            .unwrap_err();
        assert_eq!(err, CoreError::InsufficientFunds { available: 100, required: 101 });
    }

    #[test]
    fn test_stale_expected_root() {
        let f = fixture(&[100]);
        let err = f
            .composer
            .generate_payment_proof(&f.sender, &f.notes, &[], 0, &f.sender.receive_address(), &f.tree, Some([0u8; 32]))
            .unwrap_err();
        assert_eq!(err, CoreError::StaleRoot);
    }

    #[test]
    fn test_inflated_fee_fails_verification() {
        let f = fixture(&[500]);
        let recipient = KeyTriplet::generate();
        let outputs = [PaymentRecipient { address: recipient.receive_address(), amount: 400 }];
        let mut bundle = f
            .composer
            .generate_payment_proof(&f.sender, &f.notes, &outputs, 100, &f.sender.receive_address(), &f.tree, None)
            .unwrap();

        bundle.proof.fee = 50;
        assert!(!f.composer.verify_payment_proof::<Sha256Hasher>(&bundle.proof, &f.anchors));
    }

    #[test]
    fn test_swapped_output_fails_verification() {
        let f = fixture(&[500]);
        let recipient = KeyTriplet::generate();
        let outputs = [PaymentRecipient { address: recipient.receive_address(), amount: 500 }];
        let mut bundle = f
            .composer
            .generate_payment_proof(&f.sender, &f.notes, &outputs, 0, &f.sender.receive_address(), &f.tree, None)
            .unwrap();

        let forged = compute_stealth_payment(f.composer.gens(), &recipient.receive_address(), 500).unwrap();
        bundle.proof.outputs[0] = forged.output;
        assert!(!f.composer.verify_payment_proof::<Sha256Hasher>(&bundle.proof, &f.anchors));
    }

    #[test]
    fn test_unknown_anchor_rejected() {
        let f = fixture(&[500]);
        let bundle = f
            .composer
            .generate_payment_proof(&f.sender, &f.notes, &[], 0, &f.sender.receive_address(), &f.tree, None)
            .unwrap();
        let fresh = RootHistory::default();
        assert!(!f.composer.verify_payment_proof::<Sha256Hasher>(&bundle.proof, &fresh));
        assert_eq!(bundle.proof.check_anchor(&fresh), Err(CoreError::StaleRoot));
        assert!(bundle.proof.check_anchor(&f.anchors).is_ok());
    }

    #[test]
    fn test_nullifiers_are_reproducible() {
        let f = fixture(&[300]);
        let first = f
            .composer
            .generate_payment_proof(&f.sender, &f.notes, &[], 0, &f.sender.receive_address(), &f.tree, None)
            .unwrap();
        let second = f
            .composer
            .generate_payment_proof(&f.sender, &f.notes, &[], 0, &f.sender.receive_address(), &f.tree, None)
            .unwrap();
        assert_eq!(first.proof.nullifiers(), second.proof.nullifiers());
        assert_eq!(first.proof.nullifiers(), vec![f.notes[0].nullifier()]);
    }

    #[test]
    fn test_duplicate_input_rejected() {
        let f = fixture(&[300]);
        let doubled = vec![f.notes[0].clone(), f.notes[0].clone()];
        let err = f
            .composer
            .generate_payment_proof(&f.sender, &doubled, &[], 0, &f.sender.receive_address(), &f.tree, None)
            .unwrap_err();
        assert_eq!(err, CoreError::DuplicateNote);
    }

    #[test]
    fn test_honest_assembly_verifies() {
        let f = fixture(&[400]);
        let note = &f.notes[0];
        let witnesses = [InputWitness {
            one_time: recover_one_time_key(&f.sender, &note.ephemeral_public, &note.address).unwrap(),
            nullifier_key: note.nullifier_key.clone(),
        }];
        let proof = assemble(&f, &f.notes, inputs_for(&f, &f.notes), &witnesses, &f.sender.receive_address());
        assert!(f.composer.verify_payment_proof::<Sha256Hasher>(&proof, &f.anchors));
    }

    #[test]
    fn test_watch_only_key_cannot_spend() {
        let f = fixture(&[400]);
        let watch_only = ScanKey::import(&f.sender.scan_key().export()).unwrap();
        let notes = scan(f.composer.gens(), &watch_only, &f.candidates);
        assert_eq!(notes, f.notes);

        // Scan and view secrets plus a guessed spend key
        let (_, view, scan_secret) = f.sender.export_secrets();
        let guess = random_scalar(&mut OsRng).to_bytes();
        let impostor = KeyTriplet::from_secrets(&guess, &view, &scan_secret).unwrap();
        let err = f
            .composer
            .generate_payment_proof(&impostor, &notes, &[], 0, &impostor.receive_address(), &f.tree, None)
            .unwrap_err();
        assert_eq!(err, CoreError::InvalidKey);

        // The watch-only key knows the offset and the nullifier key, not b
        let note = &notes[0];
        let shared = derive_shared_secret(&watch_only.scan_scalar(), &note.ephemeral_public).unwrap();
        let witnesses = [InputWitness {
            one_time: SecretScalar::from_scalar(&shared.offset()),
            nullifier_key: note.nullifier_key.clone(),
        }];
        let thief = KeyTriplet::generate();
        let proof = assemble(&f, &notes, inputs_for(&f, &notes), &witnesses, &thief.receive_address());
        assert!(!f.composer.verify_payment_proof::<Sha256Hasher>(&proof, &f.anchors));
    }

    #[test]
    fn test_payer_blinding_cannot_spend() {
        let gens = PedersenGens::default();
        let composer = ProofComposer::new(gens, u64::MAX);
        let payer = KeyTriplet::generate();
        let victim = KeyTriplet::generate();
        let payment = compute_stealth_payment(&gens, &victim.receive_address(), 900).unwrap();

        let mut tree = MerkleTree::new();
        tree.insert(payment.output.leaf());
        let mut anchors = RootHistory::default();
        anchors.observe(&tree);

        // The payer's own view of the output: full opening, no nullifier key
        let stealth = payment.output.stealth;
        let known = PaymentNote {
            commitment: stealth.commitment,
            amount: payment.amount,
            randomness: payment.blinding.clone(),
            nullifier_key: NullifierKey::from_scalar(&random_scalar(&mut OsRng)),
            address: stealth.address,
            ephemeral_public: stealth.ephemeral_public,
            received_at: 0,
        };
        assert!(known.verify_opening(&gens));
        let err = composer
            .generate_payment_proof(&payer, &[known.clone()], &[], 0, &payer.receive_address(), &tree, None)
            .unwrap_err();
        assert_eq!(err, CoreError::InvalidKey);

        // Hand-built input with the published leaf fields
        let shared = derive_shared_secret(&payment.ephemeral.private_scalar(), &victim.scan_public).unwrap();
        let input = SpentInput {
            address: stealth.address,
            nullifier_public: stealth.nullifier_public,
            commitment: stealth.commitment,
            membership: tree.prove_membership_of(&stealth.leaf()).unwrap(),
            nullifier: known.nullifier(),
        };
        let witnesses = [InputWitness {
            one_time: SecretScalar::from_scalar(&shared.offset()),
            nullifier_key: known.nullifier_key.clone(),
        }];
        let f = Fixture {
            composer,
            sender: payer,
            candidates: Vec::new(),
            notes: vec![known],
            tree,
            anchors,
        };
        let proof = assemble(&f, &f.notes, vec![input], &witnesses, &f.sender.receive_address());
        assert!(!f.composer.verify_payment_proof::<Sha256Hasher>(&proof, &f.anchors));
    }

    #[test]
    fn test_second_nullifier_for_same_note_rejected() {
        let f = fixture(&[600]);
        let note = &f.notes[0];
        let one_time = || recover_one_time_key(&f.sender, &note.ephemeral_public, &note.address).unwrap();

        let honest = f
            .composer
            .generate_payment_proof(&f.sender, &f.notes, &[], 0, &f.sender.receive_address(), &f.tree, None)
            .unwrap();
        assert!(f.composer.verify_payment_proof::<Sha256Hasher>(&honest.proof, &f.anchors));

        // Re-spend under a made-up nullifier key, keeping the leaf's K
        let rekeyed = NullifierKey::from_bytes([0x43; 32]);
        let mut inputs = inputs_for(&f, &f.notes);
        inputs[0].nullifier = rekeyed.derive_nullifier(&note.address);
        assert_ne!(inputs[0].nullifier, honest.proof.inputs[0].nullifier);
        let witnesses = [InputWitness { one_time: one_time(), nullifier_key: rekeyed.clone() }];
        let proof = assemble(&f, &f.notes, inputs, &witnesses, &f.sender.receive_address());
        assert!(!f.composer.verify_payment_proof::<Sha256Hasher>(&proof, &f.anchors));

        // Swapping K as well moves the leaf out of the tree
        let mut inputs = inputs_for(&f, &f.notes);
        inputs[0].nullifier_public = rekeyed.public();
        inputs[0].nullifier = rekeyed.derive_nullifier(&note.address);
        let witnesses = [InputWitness { one_time: one_time(), nullifier_key: rekeyed }];
        let proof = assemble(&f, &f.notes, inputs, &witnesses, &f.sender.receive_address());
        assert!(!f.composer.verify_payment_proof::<Sha256Hasher>(&proof, &f.anchors));
    }

    #[test]
    fn test_authorization_bound_to_outputs() {
        let f = fixture(&[500]);
        let recipient = KeyTriplet::generate();
        let outputs = [PaymentRecipient { address: recipient.receive_address(), amount: 500 }];
        let bundle = f
            .composer
            .generate_payment_proof(&f.sender, &f.notes, &outputs, 0, &f.sender.receive_address(), &f.tree, None)
            .unwrap();

        // Replaying the input proofs under different outputs fails
        let thief = KeyTriplet::generate();
        let watch_only = f.sender.scan_key();
        let shared = derive_shared_secret(&watch_only.scan_scalar(), &f.notes[0].ephemeral_public).unwrap();
        let witnesses = [InputWitness {
            one_time: SecretScalar::from_scalar(&shared.offset()),
            nullifier_key: f.notes[0].nullifier_key.clone(),
        }];
        let mut stolen = assemble(&f, &f.notes, inputs_for(&f, &f.notes), &witnesses, &thief.receive_address());
        stolen.authorizations = bundle.proof.authorizations.clone();
        assert!(!f.composer.verify_payment_proof::<Sha256Hasher>(&stolen, &f.anchors));
    }
}
