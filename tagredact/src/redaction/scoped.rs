//! Typed documents: redaction over Rust structs instead of raw BSON.
//!
//! - [`TagScoped`]: a node type. It exposes its own tags and knows how to
//!   prune its children. `#[derive(TagScoped)]` writes this impl.
//! - [`ChildSlot`]: a container that can *lose* children (`Vec`, `Option`,
//!   maps). Fields marked `#[redact]` must be child slots, because a pruned
//!   child has to be removed from somewhere.
//! - [`TagSource`]: anything a node can keep its tags in.
//!
//! ## Field Handling
//!
//! | Annotation | Generated Code | Behavior |
//! |------------|----------------|----------|
//! | None | Pass through | Field unchanged |
//! | `#[redact(tags)]` | `TagSource::tag_refs` | The node's own tags |
//! | `#[redact]` | `ChildSlot::retain_scoped` | Each child judged on its own tags |
//!
//! `bson::Document` is a node too, so typed and untyped trees mix freely.

use std::{
    collections::{BTreeMap, BTreeSet, HashMap, HashSet, VecDeque},
    hash::{BuildHasher, Hash},
};

use bson::Document;

use super::{
    engine,
    rule::{Decision, RedactionRule},
};
use crate::tags::TagSet;

// =============================================================================
// TagSource - where a node keeps its tags
// =============================================================================

/// Storage for a node's access tags.
///
/// `None` and empty collections read as "no tags".
pub trait TagSource {
    /// Borrows the tags as string slices.
    fn tag_refs(&self) -> Vec<&str>;
}

impl TagSource for Vec<String> {
    fn tag_refs(&self) -> Vec<&str> {
        self.iter().map(String::as_str).collect()
    }
}

impl TagSource for Vec<&str> {
    fn tag_refs(&self) -> Vec<&str> {
        self.clone()
    }
}

impl TagSource for BTreeSet<String> {
    fn tag_refs(&self) -> Vec<&str> {
        self.iter().map(String::as_str).collect()
    }
}

impl<S: BuildHasher> TagSource for HashSet<String, S> {
    fn tag_refs(&self) -> Vec<&str> {
        self.iter().map(String::as_str).collect()
    }
}

impl TagSource for TagSet {
    fn tag_refs(&self) -> Vec<&str> {
        self.iter().collect()
    }
}

impl<T: TagSource> TagSource for Option<T> {
    fn tag_refs(&self) -> Vec<&str> {
        self.as_ref().map(TagSource::tag_refs).unwrap_or_default()
    }
}

// =============================================================================
// TagScoped - node types
// =============================================================================

/// A node in a tagged tree.
///
/// Implemented by types deriving `TagScoped`, by `bson::Document`, and by
/// `Box<T>` for any node `T`.
#[diagnostic::on_unimplemented(
    message = "`{Self}` is not a tagged node",
    label = "this type has no tags to check",
    note = "use `#[derive(TagScoped)]` and mark its tag field with `#[redact(tags)]`"
)]
pub trait TagScoped: Sized {
    /// This node's own tags. Never includes tags of children.
    fn node_tags(&self) -> Vec<&str>;

    /// Prunes children without judging `self`.
    #[must_use]
    fn descend_with<R: RedactionRule + ?Sized>(self, rule: &R) -> Self;

    /// Judges `self`, then its children. `None` means the node was pruned.
    #[must_use]
    fn scope_with<R: RedactionRule + ?Sized>(self, rule: &R) -> Option<Self> {
        let decision = rule.decide(&self.node_tags());
        match decision {
            Decision::Prune => None,
            Decision::Keep => Some(self),
            Decision::Descend => Some(self.descend_with(rule)),
        }
    }
}

impl TagScoped for Document {
    fn node_tags(&self) -> Vec<&str> {
        engine::node_tags(self)
    }

    fn descend_with<R: RedactionRule + ?Sized>(self, rule: &R) -> Self {
        engine::descend(&self, rule)
    }
}

impl<T: TagScoped> TagScoped for Box<T> {
    fn node_tags(&self) -> Vec<&str> {
        (**self).node_tags()
    }

    fn descend_with<R: RedactionRule + ?Sized>(self, rule: &R) -> Self {
        Box::new((*self).descend_with(rule))
    }
}

// =============================================================================
// Redactable - user-facing entry point
// =============================================================================

/// Convenience entry point for any node type.
pub trait Redactable: TagScoped {
    /// Redacts for a requester holding `requester`; `None` when pruned.
    #[must_use]
    fn redact(self, requester: &TagSet) -> Option<Self> {
        self.scope_with(requester)
    }
}

impl<T> Redactable for T where T: TagScoped {}

// =============================================================================
// ChildSlot - containers that can drop pruned children
// =============================================================================

/// A field that holds child nodes and can drop the pruned ones.
///
/// Surviving children keep their relative order.
#[diagnostic::on_unimplemented(
    message = "`{Self}` cannot drop pruned children",
    label = "a pruned child needs a container it can be removed from",
    note = "wrap the child in `Option<_>` or `Vec<_>` and make the child derive `TagScoped`"
)]
pub trait ChildSlot: Sized {
    /// Applies `rule` to every child, removing the pruned ones.
    #[must_use]
    fn retain_scoped<R: RedactionRule + ?Sized>(self, rule: &R) -> Self;
}

impl<T: TagScoped> ChildSlot for Option<T> {
    fn retain_scoped<R: RedactionRule + ?Sized>(self, rule: &R) -> Self {
        self.and_then(|child| child.scope_with(rule))
    }
}

impl<T: TagScoped> ChildSlot for Vec<T> {
    fn retain_scoped<R: RedactionRule + ?Sized>(self, rule: &R) -> Self {
        self.into_iter()
            .filter_map(|child| child.scope_with(rule))
            .collect()
    }
}

impl<T: TagScoped> ChildSlot for VecDeque<T> {
    fn retain_scoped<R: RedactionRule + ?Sized>(self, rule: &R) -> Self {
        self.into_iter()
            .filter_map(|child| child.scope_with(rule))
            .collect()
    }
}

impl<K: Ord, T: TagScoped> ChildSlot for BTreeMap<K, T> {
    fn retain_scoped<R: RedactionRule + ?Sized>(self, rule: &R) -> Self {
        self.into_iter()
            .filter_map(|(key, child)| child.scope_with(rule).map(|child| (key, child)))
            .collect()
    }
}

impl<K, T, S> ChildSlot for HashMap<K, T, S>
where
    K: Hash + Eq,
    T: TagScoped,
    S: BuildHasher + Clone,
{
    fn retain_scoped<R: RedactionRule + ?Sized>(self, rule: &R) -> Self {
        let hasher = self.hasher().clone();
        let mut result = HashMap::with_hasher(hasher);
        result.extend(
            self.into_iter()
                .filter_map(|(key, child)| child.scope_with(rule).map(|child| (key, child))),
        );
        result
    }
}

#[cfg(test)]
mod tests {
    use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};

    use bson::doc;

    use super::{ChildSlot, Redactable, TagSource};
    use crate::{tags::TagSet, TagScoped};

    fn tags(values: &[&str]) -> TagSet {
        values.iter().copied().collect()
    }

    #[derive(Clone, Debug, PartialEq, TagScoped)]
    struct Leaf {
        label: &'static str,
        #[redact(tags)]
        tags: Vec<String>,
    }

    fn leaf(label: &'static str, values: &[&str]) -> Leaf {
        Leaf {
            label,
            tags: values.iter().map(ToString::to_string).collect(),
        }
    }

    #[test]
    fn option_tag_source_reads_none_as_empty() {
        let none: Option<Vec<String>> = None;
        assert!(none.tag_refs().is_empty());

        let set: Option<BTreeSet<String>> = Some(["HR".to_string()].into_iter().collect());
        assert_eq!(set.tag_refs(), vec!["HR"]);
    }

    #[test]
    fn vec_slot_drops_pruned_children_in_order() {
        let children = vec![leaf("a", &["HR"]), leaf("b", &["FIN"]), leaf("c", &["HR"])];
        let kept = children.retain_scoped(&tags(&["HR"]));
        let labels: Vec<_> = kept.iter().map(|child| child.label).collect();
        assert_eq!(labels, vec!["a", "c"]);
    }

    #[test]
    fn option_slot_becomes_none_when_pruned() {
        assert_eq!(Some(leaf("a", &["FIN"])).retain_scoped(&tags(&["HR"])), None);
        assert!(Some(leaf("a", &["HR"])).retain_scoped(&tags(&["HR"])).is_some());
        assert_eq!(None::<Leaf>.retain_scoped(&tags(&["HR"])), None);
    }

    #[test]
    fn deque_and_map_slots_prune() {
        let deque: VecDeque<_> = [leaf("a", &["X"]), leaf("b", &["Y"])].into_iter().collect();
        assert_eq!(deque.retain_scoped(&tags(&["Y"])).len(), 1);

        let mut tree = BTreeMap::new();
        tree.insert(1, leaf("a", &["X"]));
        tree.insert(2, leaf("b", &["Y"]));
        let tree = tree.retain_scoped(&tags(&["X"]));
        assert!(tree.contains_key(&1));
        assert!(!tree.contains_key(&2));

        let mut hashed = HashMap::new();
        hashed.insert("a", leaf("a", &["X"]));
        hashed.insert("b", leaf("b", &[]));
        let hashed = hashed.retain_scoped(&tags(&["X"]));
        assert_eq!(hashed.len(), 1);
        assert!(hashed.contains_key("a"));
    }

    #[test]
    fn boxed_nodes_delegate() {
        let boxed = Box::new(leaf("a", &["HR"]));
        assert_eq!(boxed.node_tags(), vec!["HR"]);
        assert!(boxed.redact(&tags(&["HR"])).is_some());
    }

    #[test]
    fn documents_are_nodes() {
        let source = doc! { "tags": ["IT"], "contact": [{ "tags": ["MAN"] }] };
        let redacted = source.redact(&tags(&["IT"])).unwrap();
        assert_eq!(redacted, doc! { "tags": ["IT"], "contact": [] });
    }

    #[test]
    fn typed_parent_with_document_children() {
        #[derive(Debug, TagScoped)]
        struct Envelope {
            #[redact(tags)]
            tags: Vec<String>,
            #[redact]
            attachments: Vec<bson::Document>,
        }

        let envelope = Envelope {
            tags: vec!["IT".into()],
            attachments: vec![doc! { "tags": ["IT"] }, doc! { "tags": ["HR"] }],
        };
        let redacted = envelope.redact(&tags(&["IT"])).unwrap();
        assert_eq!(redacted.attachments, vec![doc! { "tags": ["IT"] }]);
    }
}
