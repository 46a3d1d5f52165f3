//! Cryptographic building blocks
//!
//! - `keys`: key triplet, scan key, receive address
//! - `stealth`: ECDH, one-time addresses, amount encryption
//! - `pedersen`: value commitments
//! - `range_proof`: bit-decomposition range proofs
//! - `schnorr`: proofs of knowledge for value conservation, ownership and nullifiers
//! - `merkle`: commitment accumulator and root history
//! - `nullifier`: key-image nullifiers bound to the one-time address

pub mod hash;
pub mod keys;
pub mod merkle;
pub mod nullifier;
pub mod pedersen;
pub mod range_proof;
pub mod schnorr;
pub mod stealth;

pub use keys::*;
pub use merkle::{Blake3Hasher, MerkleHasher, MerkleProof, MerkleTree, RootHistory, Sha256Hasher};
pub use nullifier::{derive_nullifier, Nullifier, NullifierKey};
pub use pedersen::{Blinding, Commitment, PedersenGens};
pub use range_proof::RangeProof;
pub use schnorr::{DleqProof, SchnorrProof};
pub use stealth::*;
