//! View-tag payment scanner
//!
//! Per candidate: one scalar multiplication for the shared secret, then a
//! 1-byte tag comparison. Only tag matches (about 1 in 256 for foreign
//! payments) pay for decryption and the constant-time reconstruction of
//! address, nullifier key and commitment.
//!
//! Candidates are independent, so a batch is split across scoped worker
//! threads bounded by the available cores. Cancellation is cooperative and
//! checked before every candidate.

use std::thread;

use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::crypto::keys::{PublicKey, ReceiveAddress, ScanKey};
use crate::crypto::merkle::Hash;
use crate::crypto::nullifier::NullifierKey;
use crate::crypto::pedersen::{Commitment, PedersenGens};
use crate::crypto::stealth::{
    decrypt_amount, derive_shared_secret, verify_stealth_output, EncryptedAmount, PaymentOutput,
    StealthAddress,
};
use crate::note::PaymentNote;

/// Minimum candidates per worker before another thread is worth spawning
const MIN_CHUNK: usize = 64;

/// One entry of the transaction feed
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionCandidate {
    pub ephemeral_public: PublicKey,
    pub view_tag: u8,
    pub encrypted_amount: EncryptedAmount,
    pub commitment: Commitment,
    /// Declared one-time address
    pub address: PublicKey,
    /// Declared public nullifier key
    pub nullifier_public: PublicKey,
    /// Accumulator root at inclusion time, if the feed reports it
    pub merkle_root: Option<Hash>,
    pub timestamp: i64,
}

impl TransactionCandidate {
    pub fn from_output(output: &PaymentOutput, timestamp: i64) -> Self {
        Self {
            ephemeral_public: output.stealth.ephemeral_public,
            view_tag: output.stealth.view_tag,
            encrypted_amount: output.encrypted_amount,
            commitment: output.stealth.commitment,
            address: output.stealth.address,
            nullifier_public: output.stealth.nullifier_public,
            merkle_root: None,
            timestamp,
        }
    }

    pub fn stealth_address(&self) -> StealthAddress {
        StealthAddress {
            address: self.address,
            view_tag: self.view_tag,
            ephemeral_public: self.ephemeral_public,
            nullifier_public: self.nullifier_public,
            commitment: self.commitment,
        }
    }
}

/// Filters applied around the cryptographic checks
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ScanOptions {
    /// Skip candidates older than this timestamp
    pub since: Option<i64>,
    /// Skip candidates newer than this timestamp
    pub until: Option<i64>,
    /// Drop owned notes below this amount
    pub min_amount: Option<u64>,
    /// Keep at most this many notes, in feed order
    pub limit: Option<usize>,
}

impl ScanOptions {
    fn in_window(&self, timestamp: i64) -> bool {
        self.since.map_or(true, |since| timestamp >= since)
            && self.until.map_or(true, |until| timestamp <= until)
    }
}

/// Result of checking a single candidate
#[derive(Debug)]
pub enum CandidateOutcome {
    /// Ephemeral key did not decode
    Malformed,
    TagMismatch,
    /// Tag matched but the ciphertext, address, nullifier key or commitment did not
    Rejected,
    Owned(Box<PaymentNote>),
}

#[derive(Debug, Default)]
pub struct ScanReport {
    pub notes: Vec<PaymentNote>,
    pub scanned: usize,
    pub skipped: usize,
    pub tag_matches: usize,
    pub rejected: usize,
    pub malformed: usize,
    pub cancelled: bool,
}

/// Number of workers when no cap is configured
pub fn default_workers() -> usize {
    thread::available_parallelism().map(|n| n.get()).unwrap_or(1)
}

pub struct ViewTagScanner<'a> {
    key: &'a ScanKey,
    recipient: ReceiveAddress,
    gens: &'a PedersenGens,
    workers: usize,
}

impl<'a> ViewTagScanner<'a> {
    pub fn new(key: &'a ScanKey, gens: &'a PedersenGens) -> Self {
        Self { key, recipient: key.receive_address(), gens, workers: default_workers() }
    }

    /// Cap the worker count, never below one and never above the core count
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.clamp(1, default_workers());
        self
    }

    /// Two-phase check of one candidate
    pub fn check(&self, candidate: &TransactionCandidate) -> CandidateOutcome {
        let Ok(shared) = derive_shared_secret(&self.key.scan_scalar(), &candidate.ephemeral_public)
        else {
            return CandidateOutcome::Malformed;
        };

        // The tag is public, so a plain comparison leaks nothing
        if shared.view_tag() != candidate.view_tag {
            return CandidateOutcome::TagMismatch;
        }

        // Foreign tag collisions fail here
        let Some(amount) = decrypt_amount(&shared, &candidate.address, &candidate.encrypted_amount)
        else {
            debug!(address = %candidate.address.to_hex(), "tag match failed to decrypt");
            return CandidateOutcome::Rejected;
        };

        let stealth = candidate.stealth_address();
        if !verify_stealth_output(self.gens, &stealth, &shared, &self.recipient, amount) {
            warn!(address = %candidate.address.to_hex(), "decrypted output does not match its derivation");
            return CandidateOutcome::Rejected;
        }

        let nullifier_key = NullifierKey::derive(&self.key.view_scalar(), &shared);
        CandidateOutcome::Owned(Box::new(PaymentNote {
            commitment: candidate.commitment,
            amount,
            randomness: shared.blinding(&candidate.address),
            nullifier_key,
            address: candidate.address,
            ephemeral_public: candidate.ephemeral_public,
            received_at: candidate.timestamp,
        }))
    }

    fn check_chunk(
        &self,
        chunk: &[&TransactionCandidate],
        cancel: &CancellationToken,
    ) -> (Vec<CandidateOutcome>, bool) {
        let mut outcomes = Vec::with_capacity(chunk.len());
        for candidate in chunk {
            if cancel.is_cancelled() {
                return (outcomes, true);
            }
            outcomes.push(self.check(candidate));
        }
        (outcomes, false)
    }

    /// Scan a batch of candidates
    ///
    /// Notes are returned in feed order. A cancelled scan returns the
    /// notes found so far with `cancelled` set.
    #[instrument(skip_all, fields(candidates = candidates.len()))]
    pub fn scan(
        &self,
        candidates: &[TransactionCandidate],
        options: &ScanOptions,
        cancel: &CancellationToken,
    ) -> ScanReport {
        let eligible: Vec<&TransactionCandidate> = candidates
            .iter()
            .filter(|c| options.in_window(c.timestamp))
            .collect();

        let mut report = ScanReport {
            skipped: candidates.len() - eligible.len(),
            ..ScanReport::default()
        };

        let workers = self.workers.min(eligible.len().div_ceil(MIN_CHUNK)).max(1);
        let chunk_size = eligible.len().div_ceil(workers).max(1);
        debug!(workers, chunk_size, "scan started");

        let results: Vec<(Vec<CandidateOutcome>, bool)> = if workers == 1 {
            vec![self.check_chunk(&eligible, cancel)]
        } else {
            thread::scope(|scope| {
                let handles: Vec<_> = eligible
                    .chunks(chunk_size)
                    .map(|chunk| scope.spawn(move || self.check_chunk(chunk, cancel)))
                    .collect();
                handles
                    .into_iter()
                    .map(|handle| {
                        handle.join().unwrap_or_else(|_| {
                            warn!("scan worker panicked");
                            (Vec::new(), true)
                        })
                    })
                    .collect()
            })
        };

        for (outcomes, cancelled) in results {
            report.cancelled |= cancelled;
            for outcome in outcomes {
                report.scanned += 1;
                match outcome {
                    CandidateOutcome::Malformed => report.malformed += 1,
                    CandidateOutcome::TagMismatch => {}
                    CandidateOutcome::Rejected => {
                        report.tag_matches += 1;
                        report.rejected += 1;
                    }
                    CandidateOutcome::Owned(note) => {
                        report.tag_matches += 1;
                        if options.min_amount.map_or(true, |min| note.amount >= min) {
                            report.notes.push(*note);
                        }
                    }
                }
            }
        }

        if let Some(limit) = options.limit {
            report.notes.truncate(limit);
        }

        info!(
            scanned = report.scanned,
            tag_matches = report.tag_matches,
            found = report.notes.len(),
            cancelled = report.cancelled,
            "scan finished"
        );
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::keys::KeyTriplet;
    use crate::crypto::stealth::compute_stealth_payment;

    fn candidates_for(keys: &KeyTriplet, amounts: &[u64], start: i64) -> Vec<TransactionCandidate> {
        let gens = PedersenGens::default();
        amounts
            .iter()
            .zip(start..)
            .map(|(amount, ts)| {
                let payment = compute_stealth_payment(&gens, &keys.receive_address(), *amount).unwrap();
                TransactionCandidate::from_output(&payment.output, ts)
            })
            .collect()
    }

    #[test]
    fn test_finds_own_payment() {
        let gens = PedersenGens::default();
        let keys = KeyTriplet::generate();
        let candidates = candidates_for(&keys, &[1_000_000], 100);

        let scan_key = keys.scan_key();
        let report = ViewTagScanner::new(&scan_key, &gens).scan(
            &candidates,
            &ScanOptions::default(),
            &CancellationToken::new(),
        );

        assert_eq!(report.notes.len(), 1);
        let note = &report.notes[0];
        assert_eq!(note.amount, 1_000_000);
        assert_eq!(note.received_at, 100);
        assert!(note.verify_opening(&gens));
        assert_eq!(note.nullifier_public(), candidates[0].nullifier_public);
        assert_eq!(note.leaf(), candidates[0].stealth_address().leaf());
    }

    #[test]
    fn test_no_false_positives() {
        let gens = PedersenGens::default();
        let alice = KeyTriplet::generate();
        let bob = KeyTriplet::generate();
        let candidates = candidates_for(&alice, &[1; 300], 0);

        let scan_key = bob.scan_key();
        let report = ViewTagScanner::new(&scan_key, &gens).scan(
            &candidates,
            &ScanOptions::default(),
            &CancellationToken::new(),
        );
        assert!(report.notes.is_empty());
        assert_eq!(report.scanned, 300);
        assert_eq!(report.tag_matches, report.rejected);
    }

    #[test]
    fn test_tag_mismatch_short_circuits() {
        let gens = PedersenGens::default();
        let keys = KeyTriplet::generate();
        let mut candidate = candidates_for(&keys, &[5], 0).remove(0);
        candidate.view_tag = candidate.view_tag.wrapping_add(1);

        let scan_key = keys.scan_key();
        let scanner = ViewTagScanner::new(&scan_key, &gens);
        assert!(matches!(scanner.check(&candidate), CandidateOutcome::TagMismatch));
    }

    #[test]
    fn test_forged_commitment_rejected() {
        let gens = PedersenGens::default();
        let keys = KeyTriplet::generate();
        let mut candidates = candidates_for(&keys, &[5, 6], 0);
        candidates[0].commitment = candidates[1].commitment;

        let scan_key = keys.scan_key();
        let scanner = ViewTagScanner::new(&scan_key, &gens);
        assert!(matches!(scanner.check(&candidates[0]), CandidateOutcome::Rejected));
    }

    #[test]
    fn test_forged_nullifier_key_rejected() {
        let gens = PedersenGens::default();
        let keys = KeyTriplet::generate();
        let mut candidate = candidates_for(&keys, &[5], 0).remove(0);
        candidate.nullifier_public = keys.view_public;

        let scan_key = keys.scan_key();
        let scanner = ViewTagScanner::new(&scan_key, &gens);
        assert!(matches!(scanner.check(&candidate), CandidateOutcome::Rejected));
    }

    #[test]
    fn test_malformed_ephemeral_key() {
        let gens = PedersenGens::default();
        let keys = KeyTriplet::generate();
        let mut candidate = candidates_for(&keys, &[5], 0).remove(0);
        candidate.ephemeral_public = PublicKey([0xff; 32]);

        let scan_key = keys.scan_key();
        let scanner = ViewTagScanner::new(&scan_key, &gens);
        assert!(matches!(scanner.check(&candidate), CandidateOutcome::Malformed));
    }

    #[test]
    fn test_parallel_scan_preserves_order() {
        let gens = PedersenGens::default();
        let keys = KeyTriplet::generate();
        let other = KeyTriplet::generate();

        let mut candidates = candidates_for(&other, &[1; 200], 0);
        let mine = candidates_for(&keys, &[10, 20, 30], 1_000);
        candidates.insert(10, mine[0].clone());
        candidates.insert(100, mine[1].clone());
        candidates.push(mine[2].clone());

        let scan_key = keys.scan_key();
        let report = ViewTagScanner::new(&scan_key, &gens).with_workers(4).scan(
            &candidates,
            &ScanOptions::default(),
            &CancellationToken::new(),
        );
        let amounts: Vec<u64> = report.notes.iter().map(|n| n.amount).collect();
        assert_eq!(amounts, vec![10, 20, 30]);
    }

    #[test]
    fn test_options_filter() {
        let gens = PedersenGens::default();
        let keys = KeyTriplet::generate();
        let candidates = candidates_for(&keys, &[5, 50, 500, 5_000], 10);

        let scan_key = keys.scan_key();
        let scanner = ViewTagScanner::new(&scan_key, &gens);
        let options = ScanOptions {
            since: Some(11),
            until: Some(13),
            min_amount: Some(100),
            limit: Some(1),
        };
        let report = scanner.scan(&candidates, &options, &CancellationToken::new());
        assert_eq!(report.skipped, 1);
        assert_eq!(report.scanned, 3);
        let amounts: Vec<u64> = report.notes.iter().map(|n| n.amount).collect();
        assert_eq!(amounts, vec![500]);
    }

    #[test]
    fn test_cancelled_scan() {
        let gens = PedersenGens::default();
        let keys = KeyTriplet::generate();
        let candidates = candidates_for(&keys, &[1, 2, 3], 0);

        let token = CancellationToken::new();
        token.cancel();

        let scan_key = keys.scan_key();
        let report = ViewTagScanner::new(&scan_key, &gens).scan(
            &candidates,
            &ScanOptions::default(),
            &token,
        );
        assert!(report.cancelled);
        assert_eq!(report.scanned, 0);
        assert!(report.notes.is_empty());
    }
}
