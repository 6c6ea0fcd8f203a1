//! Hashing helpers shared by blocks, contract classes and membership proofs.

use alloy_primitives::{keccak256, Keccak256, B256};

/// Hashes the concatenation of the provided field elements.
pub fn hash_fields(fields: &[B256]) -> B256 {
    let mut hasher = Keccak256::new();
    for field in fields {
        hasher.update(field);
    }
    hasher.finalize()
}

/// Hashes raw bytes.
pub fn hash_bytes(bytes: &[u8]) -> B256 {
    keccak256(bytes)
}

/// Computes the root of a binary merkle tree from a leaf, its index and its sibling path.
pub fn compute_root_from_sibling_path(leaf: B256, index: u64, sibling_path: &[B256]) -> B256 {
    let mut node = leaf;
    let mut index = index;
    for sibling in sibling_path {
        node = if index & 1 == 0 {
            hash_fields(&[node, *sibling])
        } else {
            hash_fields(&[*sibling, node])
        };
        index >>= 1;
    }
    node
}

/// A fixed height binary merkle tree. Empty leaves are [`B256::ZERO`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MerkleTree {
    /// Tree layers, from the leaves up to the root.
    layers: Vec<Vec<B256>>,
}

impl MerkleTree {
    /// Builds a tree of the given height over the leaves. Leaves beyond the capacity of the tree
    /// are ignored.
    pub fn new(leaves: &[B256], height: usize) -> Self {
        let capacity = 1usize << height;
        let mut layer = vec![B256::ZERO; capacity];
        for (slot, leaf) in layer.iter_mut().zip(leaves) {
            *slot = *leaf;
        }

        let mut layers = Vec::with_capacity(height + 1);
        layers.push(layer);
        for _ in 0..height {
            let next: Vec<B256> = layers
                .last()
                .map(|prev| prev.chunks(2).map(hash_fields).collect())
                .unwrap_or_default();
            layers.push(next);
        }

        Self { layers }
    }

    /// Returns the root of the tree.
    pub fn root(&self) -> B256 {
        self.layers.last().and_then(|layer| layer.first()).copied().unwrap_or_default()
    }

    /// Returns the sibling path of the leaf at `index`, from the leaf layer up.
    pub fn sibling_path(&self, index: usize) -> Vec<B256> {
        let mut index = index;
        let mut path = Vec::with_capacity(self.layers.len().saturating_sub(1));
        for layer in &self.layers[..self.layers.len().saturating_sub(1)] {
            path.push(layer.get(index ^ 1).copied().unwrap_or_default());
            index >>= 1;
        }
        path
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sibling_path_should_rebuild_root() {
        let leaves = (1..=5u8).map(B256::repeat_byte).collect::<Vec<_>>();
        let tree = MerkleTree::new(&leaves, 3);

        for (i, leaf) in leaves.iter().enumerate() {
            let path = tree.sibling_path(i);
            assert_eq!(path.len(), 3);
            assert_eq!(compute_root_from_sibling_path(*leaf, i as u64, &path), tree.root());
        }
    }

    #[test]
    fn test_wrong_index_should_not_rebuild_root() {
        let leaves = (1..=4u8).map(B256::repeat_byte).collect::<Vec<_>>();
        let tree = MerkleTree::new(&leaves, 2);
        let path = tree.sibling_path(1);

        assert_ne!(compute_root_from_sibling_path(leaves[1], 0, &path), tree.root());
    }
}
