//! Dependency reachability: which nodes are (transitively) computed from a seed set.

use std::collections::{HashMap, HashSet};

use crate::ir::NodeId;

/// Returns the seeds together with every node whose value depends on one of them.
pub fn dominated_nodes<I>(users: &HashMap<NodeId, Vec<NodeId>>, seeds: I) -> HashSet<NodeId>
where
    I: IntoIterator<Item = NodeId>,
{
    dominated_nodes_filtered(users, seeds, |_| false)
}

/// Like [`dominated_nodes`], but users matching `skip` are neither included
/// nor traversed through.
pub fn dominated_nodes_filtered<I, F>(users: &HashMap<NodeId, Vec<NodeId>>, seeds: I, skip: F) -> HashSet<NodeId>
where
    I: IntoIterator<Item = NodeId>,
    F: Fn(NodeId) -> bool,
{
    let mut queue: Vec<NodeId> = seeds.into_iter().collect();
    let mut dominated: HashSet<NodeId> = queue.iter().copied().collect();

    while let Some(node) = queue.pop() {
        let Some(consumers) = users.get(&node) else {
            continue;
        };
        for &user in consumers {
            if skip(user) {
                continue;
            }
            if dominated.insert(user) {
                queue.push(user);
            }
        }
    }

    dominated
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{Block, LoopBodyBuilder};

    #[test]
    fn test_dominated_chain() {
        let mut b = LoopBodyBuilder::new();
        let idx = b.get_index(Block::Root, "index0");
        let x = b.load(Block::Root, "buf0", idx);
        let c = b.constant(Block::Root, 2);
        let y = b.op(Block::Root, "mul", &[x, c]);
        let z = b.op(Block::Root, "add", &[y, c]);
        let w = b.op(Block::Root, "neg", &[c]);
        let body = b.build();

        let dominated = dominated_nodes(&body.users(), [x]);
        assert_eq!(dominated, [x, y, z].into_iter().collect());
        assert!(!dominated.contains(&idx));
        assert!(!dominated.contains(&w));
    }

    #[test]
    fn test_empty_seeds() {
        let users = HashMap::new();
        assert!(dominated_nodes(&users, std::iter::empty()).is_empty());
    }

    #[test]
    fn test_diamond_visits_once() {
        let mut b = LoopBodyBuilder::new();
        let s = b.constant(Block::Root, 0);
        let l = b.op(Block::Root, "neg", &[s]);
        let r = b.op(Block::Root, "abs", &[s]);
        let j = b.op(Block::Root, "add", &[l, r]);
        let dominated = dominated_nodes(&b.build().users(), [s]);
        assert_eq!(dominated.len(), 4);
        assert!(dominated.contains(&j));
    }

    #[test]
    fn test_skip_filter_stops_propagation() {
        let mut b = LoopBodyBuilder::new();
        let s = b.constant(Block::Root, 0);
        let m = b.op(Block::Root, "neg", &[s]);
        let t = b.op(Block::Root, "abs", &[m]);
        let dominated = dominated_nodes_filtered(&b.build().users(), [s], |n| n == m);
        assert_eq!(dominated, [s].into_iter().collect());
        assert!(!dominated.contains(&t));
    }
}
