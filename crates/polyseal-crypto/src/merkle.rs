//! # Whitelist Merkle Tree
//!
//! A perfect binary hash tree over a canonical, sorted, deduplicated address
//! set, padded with the hasher's padding leaf to the next power of two.
//!
//! ## Invariants
//!
//! - Leaf order is the sort order of canonical addresses, so any permutation
//!   of the same set yields the same root.
//! - Tree shape depends only on the set size.
//! - Trees are immutable; a changed whitelist means a new tree.

use serde::{Deserialize, Serialize};

use polyseal_core::Address;

use crate::error::CryptoError;
use crate::hasher::{Hash32, MerkleHasher, Sha256MerkleHasher};

/// Deepest supported tree (2^32 leaves).
const MAX_DEPTH: u32 = 32;

// ---------------------------------------------------------------------------
// Proof types
// ---------------------------------------------------------------------------

/// Which side of the running hash a sibling sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Left,
    Right,
}

/// One step of an inclusion path, leaf to root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathStep {
    pub side: Side,
    pub hash: Hash32,
}

/// Membership proof for one address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InclusionProof {
    /// Position of the address in canonical sort order.
    pub leaf_index: u64,
    pub leaf_hash: Hash32,
    pub path: Vec<PathStep>,
}

impl InclusionProof {
    /// Sibling hashes only, leaf to root. Sides are implied by `leaf_index`.
    pub fn siblings(&self) -> Vec<Hash32> {
        self.path.iter().map(|s| s.hash).collect()
    }
}

// ---------------------------------------------------------------------------
// Tree
// ---------------------------------------------------------------------------

/// A built whitelist tree.
#[derive(Debug, Clone)]
pub struct MerkleTree {
    hasher_id: &'static str,
    addresses: Vec<Address>,
    /// `levels[0]` are the padded leaves; the last level holds the root.
    levels: Vec<Vec<Hash32>>,
}

impl MerkleTree {
    pub fn root(&self) -> Hash32 {
        self.levels
            .last()
            .and_then(|l| l.first())
            .copied()
            .unwrap_or(Hash32::ZERO)
    }

    /// Number of levels above the leaves.
    pub fn depth(&self) -> u32 {
        (self.levels.len().saturating_sub(1)) as u32
    }

    /// Number of real (non-padding) leaves.
    pub fn leaf_count(&self) -> usize {
        self.addresses.len()
    }

    pub fn padded_leaf_count(&self) -> usize {
        self.levels.first().map_or(0, Vec::len)
    }

    /// Canonical addresses in leaf order.
    pub fn addresses(&self) -> &[Address] {
        &self.addresses
    }

    pub fn hasher_id(&self) -> &'static str {
        self.hasher_id
    }

    /// Leaf index of `address`, if present.
    pub fn index_of(&self, address: &Address) -> Option<usize> {
        self.addresses.binary_search(address).ok()
    }

    /// Build the sibling path for `address`.
    pub fn prove_inclusion(&self, address: &Address) -> Result<InclusionProof, CryptoError> {
        let leaf_index = self
            .index_of(address)
            .ok_or_else(|| CryptoError::NotFound(address.clone()))?;

        let mut path = Vec::with_capacity(self.depth() as usize);
        let mut pos = leaf_index;
        for level in &self.levels[..self.levels.len() - 1] {
            let sibling = pos ^ 1;
            let side = if sibling < pos { Side::Left } else { Side::Right };
            path.push(PathStep {
                side,
                hash: level[sibling],
            });
            pos /= 2;
        }

        Ok(InclusionProof {
            leaf_index: leaf_index as u64,
            leaf_hash: self.levels[0][leaf_index],
            path,
        })
    }
}

/// Recompute the root from `address` and `proof` and compare with `root`.
///
/// Returns `false` for any inconsistency (wrong leaf hash, side disagreeing
/// with the leaf index, wrong root) rather than an error.
pub fn verify_inclusion<H: MerkleHasher + ?Sized>(
    hasher: &H,
    root: &Hash32,
    address: &Address,
    proof: &InclusionProof,
) -> bool {
    let leaf = hasher.hash_leaf(address);
    if leaf != proof.leaf_hash {
        return false;
    }
    if proof.path.len() as u32 > MAX_DEPTH {
        return false;
    }
    let mut cur = leaf;
    let mut pos = proof.leaf_index;
    for step in &proof.path {
        let expected_side = if pos & 1 == 1 { Side::Left } else { Side::Right };
        if step.side != expected_side {
            return false;
        }
        cur = match step.side {
            Side::Left => hasher.hash_node(&step.hash, &cur),
            Side::Right => hasher.hash_node(&cur, &step.hash),
        };
        pos >>= 1;
    }
    pos == 0 && cur == *root
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// Builds [`MerkleTree`]s with a fixed hasher.
#[derive(Debug, Clone, Default)]
pub struct WhitelistTreeBuilder<H = Sha256MerkleHasher> {
    hasher: H,
}

impl<H: MerkleHasher> WhitelistTreeBuilder<H> {
    pub fn new(hasher: H) -> Self {
        Self { hasher }
    }

    pub fn hasher(&self) -> &H {
        &self.hasher
    }

    /// Build a tree over `addresses`. Duplicates are collapsed and order is
    /// irrelevant.
    pub fn build<'a, I>(&self, addresses: I) -> Result<MerkleTree, CryptoError>
    where
        I: IntoIterator<Item = &'a Address>,
    {
        let mut sorted: Vec<Address> = addresses.into_iter().cloned().collect();
        sorted.sort();
        sorted.dedup();

        if sorted.is_empty() {
            return Err(CryptoError::EmptyLeafSet);
        }
        let padded = sorted
            .len()
            .checked_next_power_of_two()
            .filter(|n| n.trailing_zeros() <= MAX_DEPTH)
            .ok_or(CryptoError::TooManyLeaves(sorted.len()))?;

        let mut leaves: Vec<Hash32> = sorted.iter().map(|a| self.hasher.hash_leaf(a)).collect();
        leaves.resize(padded, self.hasher.padding_leaf());

        let mut levels = vec![leaves];
        while let Some(level) = levels.last().filter(|l| l.len() > 1) {
            let next = level
                .chunks_exact(2)
                .map(|pair| self.hasher.hash_node(&pair[0], &pair[1]))
                .collect();
            levels.push(next);
        }

        Ok(MerkleTree {
            hasher_id: self.hasher.id(),
            addresses: sorted,
            levels,
        })
    }

    /// Verify a proof with this builder's hasher.
    pub fn verify(&self, root: &Hash32, address: &Address, proof: &InclusionProof) -> bool {
        verify_inclusion(&self.hasher, root, address, proof)
    }
}
