//! Redaction rules: the per-node decision.
//!
//! Rules look at one node's tags and nothing else. They do not traverse
//! structures or hold mutable state, so a single rule can be shared across
//! concurrent redactions.

use crate::tags::TagSet;

/// What to do with a node once its tags have been inspected.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Decision {
    /// Retain the node and its whole subtree without inspecting children.
    Keep,
    /// Retain the node and apply the rule to each of its children.
    Descend,
    /// Drop the node and everything below it. Children are never visited.
    Prune,
}

impl Decision {
    /// Returns `true` for [`Decision::Prune`].
    pub fn is_prune(self) -> bool {
        matches!(self, Self::Prune)
    }
}

/// Decides the fate of a single node from its tags.
///
/// Implementations must be total: every tag slice, including an empty one,
/// yields a decision.
pub trait RedactionRule {
    /// Returns the decision for a node carrying `node_tags`.
    fn decide(&self, node_tags: &[&str]) -> Decision;
}

impl<R: RedactionRule + ?Sized> RedactionRule for &R {
    fn decide(&self, node_tags: &[&str]) -> Decision {
        (**self).decide(node_tags)
    }
}

/// The set-intersection rule.
///
/// A node is descended into when it shares at least one tag with the
/// requester, and pruned otherwise. An empty tag set on either side is an
/// empty intersection and therefore prunes, including when both are empty.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TagIntersection {
    requester: TagSet,
}

impl TagIntersection {
    #[must_use]
    pub fn new(requester: TagSet) -> Self {
        Self { requester }
    }

    /// The requester's tag set.
    pub fn requester(&self) -> &TagSet {
        &self.requester
    }
}

impl From<TagSet> for TagIntersection {
    fn from(requester: TagSet) -> Self {
        Self::new(requester)
    }
}

impl RedactionRule for TagIntersection {
    fn decide(&self, node_tags: &[&str]) -> Decision {
        if self.requester.intersection_size(node_tags.iter().copied()) > 0 {
            Decision::Descend
        } else {
            Decision::Prune
        }
    }
}

/// A bare tag set applies the intersection rule directly.
impl RedactionRule for TagSet {
    fn decide(&self, node_tags: &[&str]) -> Decision {
        if self.intersects(node_tags.iter().copied()) {
            Decision::Descend
        } else {
            Decision::Prune
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Decision, RedactionRule, TagIntersection};
    use crate::tags::TagSet;

    fn rule(tags: &[&str]) -> TagIntersection {
        TagIntersection::new(tags.iter().copied().collect())
    }

    #[test]
    fn one_shared_tag_is_enough_to_descend() {
        assert_eq!(rule(&["HR", "IT", "MAN"]).decide(&["IT"]), Decision::Descend);
        assert_eq!(rule(&["IT"]).decide(&["HR", "IT"]), Decision::Descend);
    }

    #[test]
    fn disjoint_tags_prune() {
        assert_eq!(rule(&["FIN"]).decide(&["HR", "IT"]), Decision::Prune);
    }

    #[test]
    fn empty_on_either_side_prunes() {
        assert_eq!(rule(&["HR"]).decide(&[]), Decision::Prune);
        assert_eq!(rule(&[]).decide(&["HR"]), Decision::Prune);
        assert_eq!(rule(&[]).decide(&[]), Decision::Prune);
    }

    #[test]
    fn tag_set_and_intersection_rule_agree() {
        let tags: TagSet = ["HR", "MAN"].into_iter().collect();
        let wrapped = TagIntersection::from(tags.clone());
        let nodes: [&[&str]; 4] = [&["HR"], &["IT"], &[], &["MAN", "IT"]];
        for node in nodes {
            assert_eq!(tags.decide(node), wrapped.decide(node));
        }
    }

    #[test]
    fn rules_work_through_references() {
        let rule = rule(&["HR"]);
        let by_ref: &dyn RedactionRule = &rule;
        assert_eq!(by_ref.decide(&["HR"]), Decision::Descend);
        assert_eq!((&rule).decide(&["IT"]), Decision::Prune);
    }
}
