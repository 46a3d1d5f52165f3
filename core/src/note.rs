//! Received notes and the recipient-side note store
//!
//! A note moves `Unspent -> Spent` once the ledger accepts its nullifier.
//! `Spent` is terminal. The store is an explicit object owned by the
//! calling application; nothing here is global.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::crypto::keys::PublicKey;
use crate::crypto::merkle::Hash;
use crate::crypto::nullifier::{derive_nullifier, Nullifier, NullifierKey};
use crate::crypto::pedersen::{Blinding, Commitment, PedersenGens};
use crate::crypto::stealth::note_leaf;
use crate::error::{CoreError, Result};

/// Private record of a received, spendable value
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentNote {
    pub commitment: Commitment,
    pub amount: u64,
    pub randomness: Blinding,
    pub nullifier_key: NullifierKey,
    /// One-time address the value was sent to
    pub address: PublicKey,
    pub ephemeral_public: PublicKey,
    /// Unix timestamp of the transaction that carried the note
    pub received_at: i64,
}

impl PaymentNote {
    /// Whether `commitment` opens to `(amount, randomness)`
    pub fn verify_opening(&self, gens: &PedersenGens) -> bool {
        gens.verify(&self.commitment, self.amount, &self.randomness)
    }

    /// Public nullifier key committed in the note's leaf
    pub fn nullifier_public(&self) -> PublicKey {
        self.nullifier_key.public()
    }

    /// Accumulator leaf the ledger inserted for this note
    pub fn leaf(&self) -> Hash {
        note_leaf(&self.address, &self.nullifier_public(), &self.commitment)
    }

    pub fn nullifier(&self) -> Nullifier {
        derive_nullifier(&self.nullifier_key, &self.address)
    }
}

/// Checked sum of note amounts
pub fn total_amount<'a>(notes: impl IntoIterator<Item = &'a PaymentNote>) -> Result<u64> {
    notes
        .into_iter()
        .try_fold(0u64, |acc, note| acc.checked_add(note.amount))
        .ok_or(CoreError::AmountOverflow)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum NoteStatus {
    Unspent,
    Spent { nullifier: Nullifier },
}

#[derive(Clone, Debug)]
struct StoredNote {
    note: PaymentNote,
    status: NoteStatus,
}

/// Notes owned by one identity, keyed by commitment
#[derive(Clone, Debug, Default)]
pub struct NoteStore {
    notes: BTreeMap<Commitment, StoredNote>,
}

impl NoteStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a note; returns false if it was already known
    pub fn insert(&mut self, note: PaymentNote) -> bool {
        if self.notes.contains_key(&note.commitment) {
            return false;
        }
        self.notes.insert(
            note.commitment,
            StoredNote { note, status: NoteStatus::Unspent },
        );
        true
    }

    /// Add scan results, returning how many were new
    pub fn extend(&mut self, notes: impl IntoIterator<Item = PaymentNote>) -> usize {
        let added = notes.into_iter().filter(|note| self.insert(note.clone())).count();
        debug!(added, total = self.notes.len(), "note store updated");
        added
    }

    pub fn get(&self, commitment: &Commitment) -> Option<&PaymentNote> {
        self.notes.get(commitment).map(|stored| &stored.note)
    }

    pub fn status(&self, commitment: &Commitment) -> Option<NoteStatus> {
        self.notes.get(commitment).map(|stored| stored.status)
    }

    pub fn unspent(&self) -> impl Iterator<Item = &PaymentNote> {
        self.notes
            .values()
            .filter(|stored| stored.status == NoteStatus::Unspent)
            .map(|stored| &stored.note)
    }

    pub fn balance(&self) -> Result<u64> {
        total_amount(self.unspent())
    }

    /// Record that the ledger accepted `nullifier` for this note
    pub fn mark_spent(&mut self, commitment: &Commitment, nullifier: Nullifier) -> Result<()> {
        let stored = self.notes.get_mut(commitment).ok_or(CoreError::UnknownNote)?;
        match stored.status {
            NoteStatus::Spent { .. } => Err(CoreError::NoteAlreadySpent),
            NoteStatus::Unspent => {
                stored.status = NoteStatus::Spent { nullifier };
                Ok(())
            }
        }
    }

    pub fn len(&self) -> usize {
        self.notes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }
}
