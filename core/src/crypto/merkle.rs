//! Append-only Merkle accumulator for note commitments
//!
//! ```text
//!                    Root                 level 2
//!                   /    \
//!                 N01    N23              level 1
//!                /  \   /   \
//!               L0  L1 L2   E             level 0
//!               |   |   |
//!              C0  C1  C2                 (commitments)
//! ```
//!
//! Storage is an arena of per-level buffers: `levels[0]` holds `2^depth`
//! leaf hashes, `levels[depth]` holds the root. Unused slots carry the
//! empty-subtree hash for their level. When the tree is full the next
//! insert doubles every buffer and adds one level; otherwise an insert or
//! update rewrites only the nodes on the leaf's path.
//!
//! Hashing is domain separated: leaves `H(0x00 || leaf)`, nodes
//! `H(0x01 || left || right)`, empty leaf `H(0x02 || label)`.

use std::collections::{HashMap, VecDeque};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::error::{CoreError, Result};

pub type Hash = [u8; 32];

const LEAF_PREFIX: u8 = 0x00;
const NODE_PREFIX: u8 = 0x01;
const EMPTY_PREFIX: u8 = 0x02;
const EMPTY_LABEL: &[u8] = b"shadowpay.merkle.empty.v1";

/// Deepest tree a proof may describe
pub const MAX_DEPTH: usize = 48;

/// Default number of recent roots a verifier accepts
pub const DEFAULT_ROOT_HISTORY: usize = 30;

// ============================================================================
// Hasher Strategy
// ============================================================================

/// Hash function used by the accumulator
///
/// Implementors only provide `digest`; the prefixing scheme is shared.
pub trait MerkleHasher: Default + Clone + Send + Sync + std::fmt::Debug {
    fn digest(&self, prefix: u8, parts: &[&[u8]]) -> Hash;

    fn hash_leaf(&self, leaf: &[u8; 32]) -> Hash {
        self.digest(LEAF_PREFIX, &[leaf])
    }

    fn hash_nodes(&self, left: &Hash, right: &Hash) -> Hash {
        self.digest(NODE_PREFIX, &[left, right])
    }

    fn empty_leaf(&self) -> Hash {
        self.digest(EMPTY_PREFIX, &[EMPTY_LABEL])
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct Sha256Hasher;

impl MerkleHasher for Sha256Hasher {
    fn digest(&self, prefix: u8, parts: &[&[u8]]) -> Hash {
        let mut hasher = Sha256::new();
        hasher.update([prefix]);
        for part in parts {
            hasher.update(part);
        }
        hasher.finalize().into()
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct Blake3Hasher;

impl MerkleHasher for Blake3Hasher {
    fn digest(&self, prefix: u8, parts: &[&[u8]]) -> Hash {
        let mut hasher = blake3::Hasher::new();
        hasher.update(&[prefix]);
        for part in parts {
            hasher.update(part);
        }
        *hasher.finalize().as_bytes()
    }
}

// ============================================================================
// Membership Proof
// ============================================================================

/// Authentication path for one leaf
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MerkleProof {
    pub leaf_index: u64,
    /// Sibling hashes from leaf level to just below the root
    pub siblings: Vec<Hash>,
    /// Per-level side of the running node (true = right child)
    pub indices: Vec<bool>,
    pub root: Hash,
}

impl MerkleProof {
    /// Fold `leaf` through the path and compare with `root`
    pub fn verify<H: MerkleHasher>(&self, leaf: &[u8; 32]) -> bool {
        verify_membership(&H::default(), leaf, self)
    }
}

/// Verify `proof` for `leaf` with an explicit hasher
///
/// The per-level sides must agree with `leaf_index`, so a proof cannot
/// claim a different position than the one it authenticates.
pub fn verify_membership<H: MerkleHasher>(hasher: &H, leaf: &[u8; 32], proof: &MerkleProof) -> bool {
    let depth = proof.siblings.len();
    if depth > MAX_DEPTH || proof.indices.len() != depth {
        return false;
    }
    if proof.leaf_index >> depth != 0 {
        return false;
    }

    let mut current = hasher.hash_leaf(leaf);
    for (level, (sibling, is_right)) in proof.siblings.iter().zip(&proof.indices).enumerate() {
        if *is_right != ((proof.leaf_index >> level) & 1 == 1) {
            return false;
        }
        current = if *is_right {
            hasher.hash_nodes(sibling, &current)
        } else {
            hasher.hash_nodes(&current, sibling)
        };
    }

    current == proof.root
}

// ============================================================================
// Tree
// ============================================================================

/// Merkle accumulator parameterized by its hash strategy
#[derive(Clone, Debug)]
pub struct MerkleTree<H: MerkleHasher = Sha256Hasher> {
    hasher: H,
    /// levels[0] = leaf hashes, levels[depth] = [root]
    levels: Vec<Vec<Hash>>,
    /// zeros[i] = root of an empty subtree of height i
    zeros: Vec<Hash>,
    leaves: Vec<[u8; 32]>,
    positions: HashMap<[u8; 32], u64>,
}

impl<H: MerkleHasher> Default for MerkleTree<H> {
    fn default() -> Self {
        Self::new()
    }
}

impl<H: MerkleHasher> MerkleTree<H> {
    pub fn new() -> Self {
        Self::with_hasher(H::default())
    }

    pub fn with_hasher(hasher: H) -> Self {
        let empty = hasher.empty_leaf();
        Self {
            hasher,
            levels: vec![vec![empty]],
            zeros: vec![empty],
            leaves: Vec::new(),
            positions: HashMap::new(),
        }
    }

    pub fn hasher(&self) -> &H {
        &self.hasher
    }

    pub fn root(&self) -> Hash {
        self.levels[self.depth()][0]
    }

    pub fn depth(&self) -> usize {
        self.levels.len() - 1
    }

    pub fn len(&self) -> usize {
        self.leaves.len()
    }

    pub fn is_empty(&self) -> bool {
        self.leaves.is_empty()
    }

    fn capacity(&self) -> usize {
        self.levels[0].len()
    }

    pub fn leaf(&self, index: u64) -> Option<&[u8; 32]> {
        self.leaves.get(usize::try_from(index).ok()?)
    }

    pub fn position_of(&self, leaf: &[u8; 32]) -> Option<u64> {
        self.positions.get(leaf).copied()
    }

    pub fn contains(&self, leaf: &[u8; 32]) -> bool {
        self.positions.contains_key(leaf)
    }

    /// Append a leaf and return its index
    pub fn insert(&mut self, leaf: [u8; 32]) -> u64 {
        if self.leaves.len() == self.capacity() && !self.leaves.is_empty() {
            self.grow();
        }

        let index = self.leaves.len();
        self.leaves.push(leaf);
        // Keep the first position for duplicate leaves
        self.positions.entry(leaf).or_insert(index as u64);
        self.update_path(index);
        index as u64
    }

    /// Replace the leaf at `index`, rewriting only its path
    pub fn update(&mut self, index: u64, leaf: [u8; 32]) -> Result<()> {
        let slot = usize::try_from(index)
            .ok()
            .filter(|i| *i < self.leaves.len())
            .ok_or(CoreError::MerkleProofFailed)?;

        let previous = std::mem::replace(&mut self.leaves[slot], leaf);
        if self.positions.get(&previous) == Some(&index) {
            self.positions.remove(&previous);
        }
        self.positions.entry(leaf).or_insert(index);
        self.update_path(slot);
        Ok(())
    }

    /// Double every level buffer and add a new root level
    fn grow(&mut self) {
        let depth = self.depth();
        let top_zero = self.zeros[depth];
        self.zeros.push(self.hasher.hash_nodes(&top_zero, &top_zero));

        for (height, level) in self.levels.iter_mut().enumerate() {
            let width = level.len();
            level.resize(width * 2, self.zeros[height]);
        }
        let old_root = self.levels[depth][0];
        self.levels.push(vec![self.hasher.hash_nodes(&old_root, &top_zero)]);
        debug!(depth = depth + 1, "merkle tree grown");
    }

    fn update_path(&mut self, index: usize) {
        self.levels[0][index] = self.hasher.hash_leaf(&self.leaves[index]);

        let mut node = index;
        for height in 0..self.depth() {
            let parent = node / 2;
            let left = self.levels[height][parent * 2];
            let right = self.levels[height][parent * 2 + 1];
            self.levels[height + 1][parent] = self.hasher.hash_nodes(&left, &right);
            node = parent;
        }
    }

    /// Collect the authentication path for `index`
    pub fn prove_membership(&self, index: u64) -> Result<MerkleProof> {
        let slot = usize::try_from(index)
            .ok()
            .filter(|i| *i < self.leaves.len())
            .ok_or(CoreError::MerkleProofFailed)?;

        let depth = self.depth();
        let mut siblings = Vec::with_capacity(depth);
        let mut indices = Vec::with_capacity(depth);
        let mut node = slot;

        for height in 0..depth {
            let is_right = node & 1 == 1;
            siblings.push(self.levels[height][node ^ 1]);
            indices.push(is_right);
            node /= 2;
        }

        Ok(MerkleProof {
            leaf_index: index,
            siblings,
            indices,
            root: self.root(),
        })
    }

    /// Path for a leaf located by value
    pub fn prove_membership_of(&self, leaf: &[u8; 32]) -> Result<MerkleProof> {
        let index = self.position_of(leaf).ok_or(CoreError::MerkleProofFailed)?;
        self.prove_membership(index)
    }

    pub fn verify_membership(&self, leaf: &[u8; 32], proof: &MerkleProof) -> bool {
        verify_membership(&self.hasher, leaf, proof)
    }
}

// ============================================================================
// Root History
// ============================================================================

/// Bounded window of recently accepted roots
///
/// Lets a proof built against a slightly older snapshot still verify while
/// anything older is reported as stale.
#[derive(Clone, Debug)]
pub struct RootHistory {
    /// Most recent first
    roots: VecDeque<Hash>,
    max_size: usize,
}

impl RootHistory {
    pub fn new(max_size: usize) -> Self {
        Self {
            roots: VecDeque::with_capacity(max_size),
            max_size: max_size.max(1),
        }
    }

    pub fn push(&mut self, root: Hash) {
        if self.roots.front() == Some(&root) {
            return;
        }
        self.roots.push_front(root);
        self.roots.truncate(self.max_size);
    }

    /// Record the tree's current root
    pub fn observe<H: MerkleHasher>(&mut self, tree: &MerkleTree<H>) {
        self.push(tree.root());
    }

    pub fn contains(&self, root: &Hash) -> bool {
        self.roots.contains(root)
    }

    pub fn current(&self) -> Option<Hash> {
        self.roots.front().copied()
    }

    pub fn ensure_known(&self, root: &Hash) -> Result<()> {
        if self.contains(root) {
            Ok(())
        } else {
            Err(CoreError::StaleRoot)
        }
    }

    pub fn len(&self) -> usize {
        self.roots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }
}

impl Default for RootHistory {
    fn default() -> Self {
        Self::new(DEFAULT_ROOT_HISTORY)
    }
}
