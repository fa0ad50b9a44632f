//! Tag-based redaction over BSON document trees.
//!
//! A node is any document: the top-level record, an embedded document, or a
//! document inside an array. Each node is judged on its own `tags` field; tags
//! are never inherited from a parent. A pruned node takes its whole subtree
//! with it and its children are never inspected.
//!
//! The engine only borrows its input and builds a fresh tree, so the same
//! source document can be redacted for several requesters at once.

use bson::{Bson, Document};
use futures::{future, Stream, TryStreamExt};

use super::rule::{Decision, RedactionRule};
use crate::tags::TagSet;

/// Field holding a node's access tags.
pub const TAGS_FIELD: &str = "tags";

/// Reads the access tags of a single node.
///
/// A missing or non-array `tags` value reads as no tags, and non-string
/// elements are skipped, so every document has a well-defined tag set.
pub fn node_tags(doc: &Document) -> Vec<&str> {
    match doc.get(TAGS_FIELD) {
        Some(Bson::Array(items)) => items.iter().filter_map(Bson::as_str).collect(),
        _ => Vec::new(),
    }
}

/// Returns the rule's decision for `doc` without looking at its children.
pub fn decide<R>(doc: &Document, rule: &R) -> Decision
where
    R: RedactionRule + ?Sized,
{
    rule.decide(&node_tags(doc))
}

/// Redacts `doc` for a requester holding `requester`.
///
/// Returns `None` when the top-level document itself is pruned.
pub fn redact(doc: &Document, requester: &TagSet) -> Option<Document> {
    redact_with(doc, requester)
}

/// Redacts `doc` using an arbitrary rule.
pub fn redact_with<R>(doc: &Document, rule: &R) -> Option<Document>
where
    R: RedactionRule + ?Sized,
{
    match decide(doc, rule) {
        Decision::Prune => None,
        Decision::Keep => Some(doc.clone()),
        Decision::Descend => Some(descend(doc, rule)),
    }
}

pub(crate) fn descend<R>(doc: &Document, rule: &R) -> Document
where
    R: RedactionRule + ?Sized,
{
    let mut retained = Document::new();
    for (key, value) in doc {
        if let Some(value) = redact_value(value, rule) {
            retained.insert(key.clone(), value);
        }
    }
    retained
}

// Arrays are not nodes: they survive even when every element is pruned.
fn redact_value<R>(value: &Bson, rule: &R) -> Option<Bson>
where
    R: RedactionRule + ?Sized,
{
    match value {
        Bson::Document(child) => redact_with(child, rule).map(Bson::Document),
        Bson::Array(items) => Some(Bson::Array(
            items
                .iter()
                .filter_map(|item| redact_value(item, rule))
                .collect(),
        )),
        scalar => Some(scalar.clone()),
    }
}

/// Redacts a sequence of top-level documents, dropping the pruned ones.
pub fn redact_all<'a, I, R>(docs: I, rule: &'a R) -> impl Iterator<Item = Document> + 'a
where
    I: IntoIterator<Item = &'a Document>,
    I::IntoIter: 'a,
    R: RedactionRule + ?Sized,
{
    docs.into_iter().filter_map(move |doc| redact_with(doc, rule))
}

/// Redacts a fallible stream of top-level documents.
///
/// Pruned documents are skipped rather than reported; errors from the
/// underlying stream pass through unchanged.
pub fn redact_stream<S, R, E>(stream: S, rule: R) -> impl Stream<Item = Result<Document, E>>
where
    S: Stream<Item = Result<Document, E>>,
    R: RedactionRule,
{
    stream.try_filter_map(move |doc| future::ready(Ok(redact_with(&doc, &rule))))
}
