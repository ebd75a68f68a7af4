use std::collections::HashMap;
use types::{Hash256, Slot};

#[derive(Debug, Clone, PartialEq)]
pub enum BlockTreeError {
    UnknownParent { block_root: Hash256, parent_root: Hash256 },
    UnknownBlock(Hash256),
}

#[derive(Debug, Clone, PartialEq)]
struct Node {
    slot: Slot,
    parent: Option<Hash256>,
    children: Vec<Hash256>,
}

/// The tree of hot blocks, rooted at the latest finalized block.
///
/// Blocks live in an arena keyed by root; parent and child references are root keys, never
/// pointers, so pruning can delete entries without leaving anything dangling.
#[derive(Debug, Clone, PartialEq)]
pub struct BlockTree {
    root: Hash256,
    nodes: HashMap<Hash256, Node>,
}

impl BlockTree {
    pub fn new(root: Hash256, root_slot: Slot) -> Self {
        let mut nodes = HashMap::new();
        nodes.insert(
            root,
            Node {
                slot: root_slot,
                parent: None,
                children: vec![],
            },
        );
        Self { root, nodes }
    }

    pub fn root(&self) -> Hash256 {
        self.root
    }

    pub fn contains(&self, root: &Hash256) -> bool {
        self.nodes.contains_key(root)
    }

    pub fn slot(&self, root: &Hash256) -> Option<Slot> {
        self.nodes.get(root).map(|n| n.slot)
    }

    pub fn parent(&self, root: &Hash256) -> Option<Hash256> {
        self.nodes.get(root).and_then(|n| n.parent)
    }

    pub fn children(&self, root: &Hash256) -> &[Hash256] {
        self.nodes
            .get(root)
            .map(|n| n.children.as_slice())
            .unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Add a block whose parent is already present. Re-adding a known block is a no-op.
    pub fn add_block(
        &mut self,
        block_root: Hash256,
        parent_root: Hash256,
        slot: Slot,
    ) -> Result<(), BlockTreeError> {
        if self.nodes.contains_key(&block_root) {
            return Ok(());
        }

        let parent = self
            .nodes
            .get_mut(&parent_root)
            .ok_or(BlockTreeError::UnknownParent {
                block_root,
                parent_root,
            })?;
        parent.children.push(block_root);

        self.nodes.insert(
            block_root,
            Node {
                slot,
                parent: Some(parent_root),
                children: vec![],
            },
        );

        Ok(())
    }

    /// Walks up the parent links. A block is considered its own ancestor.
    pub fn is_ancestor_of(&self, ancestor: &Hash256, descendant: &Hash256) -> bool {
        let mut current = *descendant;
        loop {
            if current == *ancestor {
                return true;
            }
            match self.parent(&current) {
                Some(parent) => current = parent,
                None => return false,
            }
        }
    }

    /// The most recent ancestor of `root` (inclusive) with a slot no greater than `slot`.
    pub fn ancestor_at_slot(&self, root: &Hash256, slot: Slot) -> Option<Hash256> {
        let mut current = *root;
        loop {
            let node = self.nodes.get(&current)?;
            if node.slot <= slot {
                return Some(current);
            }
            current = node.parent?;
        }
    }

    /// The chain of roots from `root` (inclusive) back to the tree root (inclusive).
    pub fn chain_to_root(&self, root: &Hash256) -> Vec<Hash256> {
        let mut chain = vec![];
        let mut current = Some(*root);
        while let Some(root) = current {
            if !self.nodes.contains_key(&root) {
                break;
            }
            chain.push(root);
            current = self.parent(&root);
        }
        chain
    }

    /// Re-root the tree at `new_root`, removing every node outside its subtree.
    ///
    /// Returns the removed roots (ancestors of `new_root` included).
    pub fn prune_to(&mut self, new_root: Hash256) -> Result<Vec<Hash256>, BlockTreeError> {
        if !self.nodes.contains_key(&new_root) {
            return Err(BlockTreeError::UnknownBlock(new_root));
        }

        if new_root == self.root {
            return Ok(vec![]);
        }

        // Collect the retained subtree.
        let mut retained = HashMap::new();
        let mut stack = vec![new_root];
        while let Some(root) = stack.pop() {
            let node = self
                .nodes
                .get(&root)
                .ok_or(BlockTreeError::UnknownBlock(root))?;
            stack.extend(node.children.iter().copied());
            retained.insert(root, node.clone());
        }

        if let Some(node) = retained.get_mut(&new_root) {
            node.parent = None;
        }

        let removed = self
            .nodes
            .keys()
            .filter(|root| !retained.contains_key(root))
            .copied()
            .collect();

        self.nodes = retained;
        self.root = new_root;

        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn root(i: u8) -> Hash256 {
        Hash256::repeat_byte(i)
    }

    /// genesis(0) <- a(1) <- b(2) <- c(3)
    ///                  \
    ///                   d(2)
    fn forked_tree() -> BlockTree {
        let mut tree = BlockTree::new(root(0), Slot::new(0));
        tree.add_block(root(1), root(0), Slot::new(1)).unwrap();
        tree.add_block(root(2), root(1), Slot::new(2)).unwrap();
        tree.add_block(root(3), root(2), Slot::new(3)).unwrap();
        tree.add_block(root(4), root(1), Slot::new(2)).unwrap();
        tree
    }

    #[test]
    fn rejects_unknown_parent() {
        let mut tree = BlockTree::new(root(0), Slot::new(0));
        assert_eq!(
            tree.add_block(root(2), root(9), Slot::new(1)),
            Err(BlockTreeError::UnknownParent {
                block_root: root(2),
                parent_root: root(9),
            })
        );
    }

    #[test]
    fn ancestry() {
        let tree = forked_tree();

        assert!(tree.is_ancestor_of(&root(0), &root(3)));
        assert!(tree.is_ancestor_of(&root(1), &root(4)));
        assert!(tree.is_ancestor_of(&root(3), &root(3)));
        assert!(!tree.is_ancestor_of(&root(2), &root(4)));
        assert!(!tree.is_ancestor_of(&root(3), &root(2)));
    }

    #[test]
    fn ancestor_at_slot_walks_past_empty_slots() {
        let tree = forked_tree();

        assert_eq!(tree.ancestor_at_slot(&root(3), Slot::new(3)), Some(root(3)));
        assert_eq!(tree.ancestor_at_slot(&root(3), Slot::new(2)), Some(root(2)));
        // No block at slot 5 on the branch; resolves to the latest prior block.
        assert_eq!(tree.ancestor_at_slot(&root(4), Slot::new(5)), Some(root(4)));
        assert_eq!(tree.ancestor_at_slot(&root(4), Slot::new(1)), Some(root(1)));
    }

    #[test]
    fn prune_to_re_roots_and_reports_removed() {
        let mut tree = forked_tree();

        let mut removed = tree.prune_to(root(2)).unwrap();
        removed.sort();

        let mut expected = vec![root(0), root(1), root(4)];
        expected.sort();

        assert_eq!(removed, expected);
        assert_eq!(tree.root(), root(2));
        assert!(tree.contains(&root(3)));
        assert!(!tree.contains(&root(4)));
        assert_eq!(tree.parent(&root(2)), None);
    }

    #[test]
    fn prune_to_current_root_is_noop() {
        let mut tree = forked_tree();
        assert_eq!(tree.prune_to(root(0)).unwrap(), vec![]);
        assert_eq!(tree.len(), 5);
    }
}
