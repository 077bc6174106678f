//! Topological ordering with a commit-time tie-break.
//!
//! Children always come before their parents. Among commits whose children
//! have all been emitted, the newest goes first; equal times fall back to
//! discovery order, so unrelated commits keep a stable relative order
//! across builds.

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};

use loom_git::GitOid;

/// A commit as seen by the sorter.
#[derive(Clone, Debug)]
pub struct Node {
    pub id: GitOid,
    pub parents: Vec<GitOid>,
    pub time: i64,
}

/// Order `nodes` (given in discovery order) newest-first, children before
/// parents.
///
/// Parents outside `nodes` are ignored. Duplicate ids keep their first
/// occurrence.
#[must_use]
pub fn date_order(nodes: &[Node]) -> Vec<GitOid> {
    let mut index: HashMap<GitOid, usize> = HashMap::with_capacity(nodes.len());
    for (i, node) in nodes.iter().enumerate() {
        index.entry(node.id).or_insert(i);
    }

    // Number of not-yet-emitted children per node.
    let mut pending_children = vec![0usize; nodes.len()];
    for (i, node) in nodes.iter().enumerate() {
        if index[&node.id] != i {
            continue;
        }
        let mut parents = node.parents.clone();
        parents.dedup();
        for parent in &parents {
            if let Some(&p) = index.get(parent) {
                pending_children[p] += 1;
            }
        }
    }

    let mut ready: BinaryHeap<(i64, Reverse<usize>)> = nodes
        .iter()
        .enumerate()
        .filter(|(i, n)| index[&n.id] == *i && pending_children[*i] == 0)
        .map(|(i, n)| (n.time, Reverse(i)))
        .collect();

    let mut out = Vec::with_capacity(index.len());
    while let Some((_, Reverse(i))) = ready.pop() {
        let node = &nodes[i];
        out.push(node.id);
        let mut parents = node.parents.clone();
        parents.dedup();
        for parent in &parents {
            if let Some(&p) = index.get(parent) {
                pending_children[p] -= 1;
                if pending_children[p] == 0 {
                    ready.push((nodes[p].time, Reverse(p)));
                }
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use proptest::prelude::*;

    use super::*;

    fn oid(n: u8) -> GitOid {
        GitOid::from_bytes([n; 20])
    }

    fn node(id: u8, parents: &[u8], time: i64) -> Node {
        Node {
            id: oid(id),
            parents: parents.iter().map(|p| oid(*p)).collect(),
            time,
        }
    }

    #[test]
    fn child_before_parent_even_with_older_timestamp() {
        // clock skew: child (2) claims to be older than its parent (1)
        let order = date_order(&[node(2, &[1], 10), node(1, &[], 20)]);
        assert_eq!(order, [oid(2), oid(1)]);
    }

    #[test]
    fn interleaves_branches_by_date() {
        // base(1) <- a1(2, t=10) <- a2(4, t=30)
        //         <- b1(3, t=20)
        let nodes = [
            node(4, &[2], 30),
            node(3, &[1], 20),
            node(2, &[1], 10),
            node(1, &[], 0),
        ];
        assert_eq!(date_order(&nodes), [oid(4), oid(3), oid(2), oid(1)]);
    }

    #[test]
    fn equal_times_keep_discovery_order() {
        let nodes = [node(7, &[], 5), node(3, &[], 5), node(9, &[], 5)];
        assert_eq!(date_order(&nodes), [oid(7), oid(3), oid(9)]);
    }

    #[test]
    fn ignores_parents_outside_the_set() {
        let nodes = [node(2, &[1], 5)];
        assert_eq!(date_order(&nodes), [oid(2)]);
    }

    fn arb_nodes() -> impl Strategy<Value = Vec<Node>> {
        (1usize..30).prop_flat_map(|n| {
            (0..n)
                .map(|i| {
                    let parents = if i + 1 < n {
                        proptest::collection::vec(i + 1..n, 0..=2).boxed()
                    } else {
                        Just(Vec::new()).boxed()
                    };
                    (parents, 0i64..50).prop_map(move |(ps, time)| Node {
                        id: GitOid::from_bytes([u8::try_from(i).unwrap(); 20]),
                        parents: ps
                            .into_iter()
                            .map(|p| GitOid::from_bytes([u8::try_from(p).unwrap(); 20]))
                            .collect(),
                        time,
                    })
                })
                .collect::<Vec<_>>()
        })
    }

    proptest! {
        #[test]
        fn is_a_topological_permutation(nodes in arb_nodes()) {
            let order = date_order(&nodes);
            prop_assert_eq!(order.len(), nodes.len());
            let unique: HashSet<_> = order.iter().collect();
            prop_assert_eq!(unique.len(), nodes.len());

            let pos: HashMap<GitOid, usize> =
                order.iter().enumerate().map(|(i, id)| (*id, i)).collect();
            for n in &nodes {
                for p in &n.parents {
                    prop_assert!(pos[&n.id] < pos[p]);
                }
            }
        }

        #[test]
        fn is_deterministic(nodes in arb_nodes()) {
            prop_assert_eq!(date_order(&nodes), date_order(&nodes));
        }
    }
}
