//! Latest-Message-Driven Greedy Heaviest-Observed Subtree head selection.

use std::collections::HashMap;
use store::BlockTree;
use types::{BeaconState, EthSpec, Hash256, VoteTracker};

/// Walk the tree from the justified block, at each step descending into the child whose subtree
/// carries the greatest attesting balance, until a leaf is reached.
///
/// Votes whose block is unknown to the tree carry no weight. Ties are broken by the greater
/// block root (compared as big-endian 256-bit integers), which is stable across nodes.
pub fn find_head<E: EthSpec>(
    tree: &BlockTree,
    votes: &HashMap<u64, VoteTracker>,
    justified_state: &BeaconState<E>,
    justified_root: Hash256,
) -> Option<Hash256> {
    if !tree.contains(&justified_root) {
        return None;
    }

    let weights = subtree_weights(tree, votes, justified_state, justified_root);

    let mut head = justified_root;
    loop {
        let children = tree.children(&head);
        match children
            .iter()
            .max_by_key(|root| (weights.get(*root).copied().unwrap_or(0), **root))
        {
            Some(best_child) => head = *best_child,
            None => return Some(head),
        }
    }
}

/// Attesting balance of each block in the justified subtree, inclusive of its descendants.
fn subtree_weights<E: EthSpec>(
    tree: &BlockTree,
    votes: &HashMap<u64, VoteTracker>,
    justified_state: &BeaconState<E>,
    justified_root: Hash256,
) -> HashMap<Hash256, u64> {
    let balance_epoch = justified_state.current_epoch();
    let mut weights: HashMap<Hash256, u64> = HashMap::new();

    for (validator_index, vote) in votes {
        if !tree.contains(&vote.root) {
            continue;
        }
        let balance = justified_state
            .validators
            .get(*validator_index as usize)
            .filter(|v| v.is_active_at(balance_epoch) && !v.slashed)
            .map(|v| v.effective_balance)
            .unwrap_or(0);
        *weights.entry(vote.root).or_insert(0) += balance;
    }

    // Breadth-first order guarantees children appear after their parents, so a reverse pass
    // accumulates every subtree before its root is read.
    let mut order = vec![justified_root];
    let mut i = 0;
    while i < order.len() {
        order.extend(tree.children(&order[i]).iter().copied());
        i += 1;
    }

    for root in order.iter().rev() {
        let weight = weights.get(root).copied().unwrap_or(0);
        if *root != justified_root {
            if let Some(parent) = tree.parent(root) {
                *weights.entry(parent).or_insert(0) += weight;
            }
        }
    }

    weights
}
