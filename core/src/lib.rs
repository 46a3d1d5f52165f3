//! ShadowPay core - privacy-preserving payments over Ristretto255
//!
//! A payer derives a one-time stealth address for the recipient, commits
//! to the amount with a Pedersen commitment and encrypts it under an ECDH
//! shared secret. The recipient scans the transaction feed with a 1-byte
//! view tag pre-filter and recovers spendable notes. Spending reveals one
//! key-image nullifier per note, signed with the one-time spend key,
//! together with Merkle membership, range and value-conservation proofs.
//!
//! Layout:
//! - [`crypto`]: keys, stealth addresses, commitments, range proofs,
//!   Merkle accumulator, nullifiers
//! - [`scanner`]: parallel, cancellable view-tag scanning
//! - [`note`]: received notes and the note store
//! - [`proofs`]: balance and payment proof composition
//! - [`orchestrator`]: the [`ShadowPay`] façade
//!
//! The ledger (nullifier set, accumulator updates, transaction feed) is an
//! external collaborator. Logging goes through `tracing`; the embedding
//! application installs the subscriber.

// op_ref warnings are common with curve25519-dalek ergonomics
#![allow(clippy::op_ref)]

pub mod config;
pub mod crypto;
pub mod error;
pub mod note;
pub mod orchestrator;
pub mod proofs;
pub mod scanner;



pub use config::CoreConfig;
pub use crypto::{
    Blake3Hasher, Blinding, Commitment, KeyTriplet, MerkleHasher, MerkleProof, MerkleTree, Nullifier,
    NullifierKey, PaymentOutput, PedersenGens, PublicKey, RangeProof, ReceiveAddress, RootHistory, ScanKey,
    Sha256Hasher, StealthAddress, StealthPayment,
};
pub use error::{CoreError, Result};
pub use note::{NoteStatus, NoteStore, PaymentNote};
pub use orchestrator::{BalanceResult, PaymentIntent, PaymentResult, ShadowPay, WithdrawalResult};
pub use proofs::{
    BalanceProof, PaymentBundle, PaymentProof, PaymentRecipient, ProofComposer, SpendAuthorization, SpentInput,
};
pub use scanner::{ScanOptions, ScanReport, TransactionCandidate, ViewTagScanner};
