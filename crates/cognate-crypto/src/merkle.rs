use cognate_types::ContentHash;
use serde::{Deserialize, Serialize};

use crate::hasher::ContentHasher;

/// Side of a sibling in a Merkle proof path.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Side {
    Left,
    Right,
}

/// Binary Merkle tree over entry content hashes.
///
/// Used to commit to a whole range of entries with a single root that can be
/// published out of band, and to prove that one entry belongs to that range.
#[derive(Clone, Debug)]
pub struct MerkleTree {
    root: ContentHash,
    /// Level 0 holds the leaves; the last level holds the root.
    levels: Vec<Vec<ContentHash>>,
}

impl MerkleTree {
    /// Build a tree from leaf hashes.
    ///
    /// An empty list produces the genesis root. A single leaf is its own root.
    pub fn from_leaves(leaves: Vec<ContentHash>) -> Self {
        if leaves.is_empty() {
            return Self {
                root: ContentHash::GENESIS,
                levels: vec![],
            };
        }

        let mut levels = vec![leaves];
        while let Some(current) = levels.last().filter(|level| level.len() > 1) {
            let next: Vec<ContentHash> = current
                .chunks(2)
                .map(|pair| match pair {
                    [left, right] => hash_pair(left, right),
                    // Odd node: hash with itself
                    [single] => hash_pair(single, single),
                    _ => unreachable!("chunks(2) yields one or two items"),
                })
                .collect();
            levels.push(next);
        }

        let root = levels
            .last()
            .and_then(|level| level.first())
            .copied()
            .unwrap_or(ContentHash::GENESIS);
        Self { root, levels }
    }

    pub fn root(&self) -> ContentHash {
        self.root
    }

    pub fn leaf_count(&self) -> usize {
        self.levels.first().map_or(0, Vec::len)
    }

    /// Generate an inclusion proof for the leaf at `index`.
    pub fn proof(&self, index: usize) -> Option<MerkleProof> {
        let leaf = *self.levels.first()?.get(index)?;

        let mut path = Vec::new();
        let mut idx = index;
        for level in &self.levels[..self.levels.len() - 1] {
            let sibling_idx = if idx % 2 == 0 { idx + 1 } else { idx - 1 };
            // Odd level: the last node is paired with itself
            let sibling = level.get(sibling_idx).copied().unwrap_or(level[idx]);
            let side = if idx % 2 == 0 { Side::Right } else { Side::Left };
            path.push((sibling, side));
            idx /= 2;
        }

        Some(MerkleProof {
            leaf,
            path,
            root: self.root,
        })
    }
}

/// Merkle inclusion proof.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MerkleProof {
    pub leaf: ContentHash,
    /// (sibling, side) pairs from leaf to root.
    pub path: Vec<(ContentHash, Side)>,
    pub root: ContentHash,
}

impl MerkleProof {
    /// Recompute the root from the leaf and path.
    pub fn verify(&self) -> bool {
        let mut current = self.leaf;
        for (sibling, side) in &self.path {
            current = match side {
                Side::Left => hash_pair(sibling, &current),
                Side::Right => hash_pair(&current, sibling),
            };
        }
        current == self.root
    }
}

fn hash_pair(left: &ContentHash, right: &ContentHash) -> ContentHash {
    let mut data = [0u8; 64];
    data[..32].copy_from_slice(left.as_bytes());
    data[32..].copy_from_slice(right.as_bytes());
    ContentHasher::MERKLE.hash(&data)
}
