//! Error taxonomy for the payment core
//!
//! Construction (`generate_*`, `create_*`) fails fast with a [`CoreError`].
//! Verification (`verify_*`) never errors and returns `false` instead.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, CoreError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    #[error("Invalid key - malformed, identity or not a valid group element")]
    InvalidKey,

    #[error("Invalid commitment - wrong length or does not open to the claimed value")]
    InvalidCommitment,

    #[error("Value {value} outside range [{min}, {max}]")]
    RangeViolation { value: u64, min: u64, max: u64 },

    #[error("Invalid range - min {min} exceeds max {max}")]
    InvalidRange { min: u64, max: u64 },

    #[error("Proof verification failed")]
    ProofVerificationFailed,

    #[error("Malformed proof encoding: {0}")]
    MalformedProof(&'static str),

    #[error("Insufficient funds - available {available}, required {required}")]
    InsufficientFunds { available: u64, required: u64 },

    #[error("Merkle proof failed - leaf not present in the accumulator")]
    MerkleProofFailed,

    #[error("Stale Merkle root - proof built against an outdated snapshot")]
    StaleRoot,

    #[error("Amount overflow while summing notes")]
    AmountOverflow,

    #[error("Note supplied more than once")]
    DuplicateNote,

    #[error("Note already spent")]
    NoteAlreadySpent,

    #[error("Unknown note")]
    UnknownNote,

    #[error("Invalid mnemonic: {0}")]
    InvalidMnemonic(String),

    #[error("Invalid receive address: {0}")]
    InvalidAddress(String),

    #[error("Amount encryption failed")]
    EncryptionFailed,
}
