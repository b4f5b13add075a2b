//! Materialization of flat review rows into a nested reply forest.
//!
//! The gateway stores reviews as a flat, parent-referencing table and
//! returns one product's batch ordered ascending by `created_at`. Rendering
//! wants a forest: root reviews with nested replies, chronological at every
//! level. [`build_forest`] is the pure transformation between the two - no
//! I/O, no input mutation, safe to re-run on every fetch.
//!
//! The flat representation is reconstructed with an arena and two linear
//! index passes: a lookup table keyed by review ID stands in for
//! pointer-based linking, so no ownership cycles can arise. Children are
//! collected per parent in encounter order, which preserves chronology
//! because the input is already time-ordered.

use std::collections::HashMap;

use maison_core::ReviewId;

use crate::gateway::types::ReviewRecord;

use super::ReviewNode;

/// What to do with a reply whose parent is absent from the fetch batch
/// (e.g., the parent was filtered out by moderation status).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OrphanPolicy {
    /// Omit the reply from the forest. A reply shown next to unrelated
    /// top-level reviews would be out of context, so this is the default.
    #[default]
    Drop,
    /// Surface the reply as a root at its chronological position.
    PromoteToRoot,
}

impl std::fmt::Display for OrphanPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Drop => write!(f, "drop"),
            Self::PromoteToRoot => write!(f, "promote"),
        }
    }
}

impl std::str::FromStr for OrphanPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "drop" => Ok(Self::Drop),
            "promote" => Ok(Self::PromoteToRoot),
            _ => Err(format!("invalid orphan policy: {s} (expected drop|promote)")),
        }
    }
}

/// Build a reply forest from a flat batch ordered ascending by `created_at`.
///
/// Both passes preserve encounter order, so siblings stay chronological at
/// every level. Depth is unbounded. Records unreachable from any root (a
/// parent-reference cycle, which a well-formed batch never contains) are not
/// emitted.
#[must_use]
pub fn build_forest(records: Vec<ReviewRecord>, policy: OrphanPolicy) -> Vec<ReviewNode> {
    // Pass 1: arena keyed by id, children start empty.
    let order: Vec<ReviewId> = records.iter().map(|r| r.id).collect();
    let mut arena: HashMap<ReviewId, ReviewNode> = records
        .into_iter()
        .map(|record| (record.id, ReviewNode::from(record)))
        .collect();

    // Pass 2: classify each record in input order - root, child edge, or
    // orphan. Self-references count as orphans, never as edges.
    let mut roots: Vec<ReviewId> = Vec::new();
    let mut children: HashMap<ReviewId, Vec<ReviewId>> = HashMap::new();
    for id in &order {
        let parent_id = arena.get(id).and_then(|node| node.parent_id);
        match parent_id {
            None => roots.push(*id),
            Some(parent) if parent != *id && arena.contains_key(&parent) => {
                children.entry(parent).or_default().push(*id);
            }
            Some(_) => match policy {
                OrphanPolicy::Drop => {}
                OrphanPolicy::PromoteToRoot => roots.push(*id),
            },
        }
    }

    roots
        .into_iter()
        .filter_map(|id| take_subtree(id, &mut arena, &children))
        .collect()
}

/// Move a node out of the arena with its whole subtree attached.
fn take_subtree(
    id: ReviewId,
    arena: &mut HashMap<ReviewId, ReviewNode>,
    children: &HashMap<ReviewId, Vec<ReviewId>>,
) -> Option<ReviewNode> {
    let mut node = arena.remove(&id)?;
    if let Some(child_ids) = children.get(&id) {
        node.children = child_ids
            .iter()
            .filter_map(|child| take_subtree(*child, arena, children))
            .collect();
    }
    Some(node)
}

#[cfg(test)]
mod tests {
    use chrono::DateTime;
    use uuid::Uuid;

    use maison_core::{ProductId, ReviewStatus, UserId};

    use super::*;

    fn record(id: i64, parent: Option<i64>) -> ReviewRecord {
        ReviewRecord {
            id: ReviewId::new(id),
            product_id: ProductId::new(1),
            author_id: UserId::new(Uuid::nil()),
            rating: parent.is_none().then_some(5),
            comment: format!("comment {id}"),
            status: ReviewStatus::Approved,
            parent_id: parent.map(ReviewId::new),
            created_at: DateTime::from_timestamp(1_700_000_000 + id, 0).expect("timestamp"),
        }
    }

    fn ids(forest: &[ReviewNode]) -> Vec<i64> {
        forest.iter().map(|n| n.id.as_i64()).collect()
    }

    #[test]
    fn test_nested_forest_preserves_order() {
        let forest = build_forest(
            vec![
                record(1, None),
                record(2, Some(1)),
                record(3, None),
                record(4, Some(2)),
            ],
            OrphanPolicy::Drop,
        );

        assert_eq!(ids(&forest), vec![1, 3]);
        let first = forest.first().expect("root 1");
        assert_eq!(ids(&first.children), vec![2]);
        let reply = first.children.first().expect("child 2");
        assert_eq!(ids(&reply.children), vec![4]);
        let third = forest.get(1).expect("root 3");
        assert!(third.children.is_empty());
    }

    #[test]
    fn test_siblings_stay_chronological() {
        let forest = build_forest(
            vec![
                record(1, None),
                record(2, Some(1)),
                record(3, Some(1)),
                record(4, Some(1)),
            ],
            OrphanPolicy::Drop,
        );

        let root = forest.first().expect("root");
        assert_eq!(ids(&root.children), vec![2, 3, 4]);
    }

    #[test]
    fn test_orphan_dropped() {
        let forest = build_forest(
            vec![record(1, None), record(5, Some(999))],
            OrphanPolicy::Drop,
        );

        assert_eq!(ids(&forest), vec![1]);
        // Node 5 appears nowhere in the forest
        assert!(forest.iter().all(|n| n.children.is_empty()));
    }

    #[test]
    fn test_orphan_promoted_in_chronological_position() {
        let forest = build_forest(
            vec![record(1, None), record(5, Some(999)), record(6, None)],
            OrphanPolicy::PromoteToRoot,
        );

        assert_eq!(ids(&forest), vec![1, 5, 6]);
    }

    #[test]
    fn test_self_reference_follows_orphan_policy() {
        let dropped = build_forest(vec![record(7, Some(7))], OrphanPolicy::Drop);
        assert!(dropped.is_empty());

        let promoted = build_forest(vec![record(7, Some(7))], OrphanPolicy::PromoteToRoot);
        assert_eq!(ids(&promoted), vec![7]);
        assert!(promoted.first().expect("node").children.is_empty());
    }

    #[test]
    fn test_cycle_pair_not_emitted() {
        let forest = build_forest(
            vec![record(1, None), record(2, Some(3)), record(3, Some(2))],
            OrphanPolicy::Drop,
        );

        assert_eq!(ids(&forest), vec![1]);
    }

    #[test]
    fn test_empty_input() {
        assert!(build_forest(Vec::new(), OrphanPolicy::Drop).is_empty());
    }

    #[test]
    fn test_orphan_policy_parse() {
        assert_eq!("drop".parse::<OrphanPolicy>(), Ok(OrphanPolicy::Drop));
        assert_eq!(
            "promote".parse::<OrphanPolicy>(),
            Ok(OrphanPolicy::PromoteToRoot)
        );
        assert!("keep".parse::<OrphanPolicy>().is_err());
    }
}
