//! In-process document store.
//!
//! Supports the subset of the query language the session uses:
//! - `find` with top-level equality filters, where an array field matches
//!   when any element equals the filter value
//! - `aggregate` with `$match` and the `$redact` stage built by
//!   [`redact_stage`](crate::redact_stage)
//!
//! Anything else is rejected with [`Error::Query`] rather than silently
//! ignored.

use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use bson::{oid::ObjectId, Bson, Document};
use futures::{stream, StreamExt};
use parking_lot::Mutex;

use super::{DocumentStore, DocumentStream, Namespace};
use crate::{
    error::{Error, Result},
    redaction::{parse_redact_stage, redact_with, TagIntersection},
};

const ID_FIELD: &str = "_id";

/// A document store held in memory. Clones share the same data.
#[derive(Clone, Debug)]
pub struct MemoryStore {
    collections: Arc<Mutex<HashMap<Namespace, Vec<Document>>>>,
    reachable: bool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            collections: Arc::default(),
            reachable: true,
        }
    }

    /// A store whose every operation fails as if the server were down.
    pub fn unreachable() -> Self {
        Self {
            reachable: false,
            ..Self::new()
        }
    }

    /// Returns a copy of everything stored in `namespace`, in insertion order.
    pub fn snapshot(&self, namespace: &Namespace) -> Vec<Document> {
        self.collections
            .lock()
            .get(namespace)
            .cloned()
            .unwrap_or_default()
    }

    fn check_reachable(&self) -> Result<()> {
        if self.reachable {
            Ok(())
        } else {
            Err(Error::Connectivity {
                endpoint: self.endpoint(),
                reason: "connection refused".into(),
            })
        }
    }

    fn matching(&self, namespace: &Namespace, filter: &Document) -> Result<Vec<Document>> {
        let collections = self.collections.lock();
        let Some(documents) = collections.get(namespace) else {
            return Ok(Vec::new());
        };
        let mut matched = Vec::new();
        for document in documents {
            if matches_filter(document, filter)? {
                matched.push(document.clone());
            }
        }
        Ok(matched)
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

fn matches_filter(document: &Document, filter: &Document) -> Result<bool> {
    for (key, expected) in filter {
        if key.starts_with('$') {
            return Err(Error::Query(format!("unsupported query operator `{key}`")));
        }
        if let Bson::Document(inner) = expected {
            if let Some(operator) = inner.keys().find(|k| k.starts_with('$')) {
                return Err(Error::Query(format!(
                    "unsupported query operator `{operator}` on `{key}`"
                )));
            }
        }
        let matched = match document.get(key) {
            Some(Bson::Array(items)) if !matches!(expected, Bson::Array(_)) => {
                items.contains(expected)
            }
            Some(actual) => actual == expected,
            None => matches!(expected, Bson::Null),
        };
        if !matched {
            return Ok(false);
        }
    }
    Ok(true)
}

fn run_stage(documents: Vec<Document>, stage: &Document) -> Result<Vec<Document>> {
    if let Ok(filter) = stage.get_document("$match") {
        let mut kept = Vec::with_capacity(documents.len());
        for document in documents {
            if matches_filter(&document, filter)? {
                kept.push(document);
            }
        }
        return Ok(kept);
    }
    if let Some(requester) = parse_redact_stage(stage) {
        let rule = TagIntersection::new(requester);
        return Ok(documents
            .iter()
            .filter_map(|document| redact_with(document, &rule))
            .collect());
    }
    let name = stage.keys().next().map_or("<empty>", String::as_str);
    Err(Error::Query(format!("unsupported pipeline stage `{name}`")))
}

fn into_stream(documents: Vec<Document>) -> DocumentStream {
    stream::iter(documents.into_iter().map(Ok)).boxed()
}

#[async_trait]
impl DocumentStore for MemoryStore {
    fn endpoint(&self) -> String {
        "memory".to_string()
    }

    async fn ping(&self) -> Result<()> {
        self.check_reachable()
    }

    async fn count(&self, namespace: &Namespace) -> Result<u64> {
        self.check_reachable()?;
        let collections = self.collections.lock();
        Ok(collections.get(namespace).map_or(0, |docs| docs.len() as u64))
    }

    async fn insert_many(&self, namespace: &Namespace, documents: Vec<Document>) -> Result<usize> {
        self.check_reachable()?;
        let inserted = documents.len();
        let mut collections = self.collections.lock();
        let collection = collections.entry(namespace.clone()).or_default();
        for document in documents {
            if document.contains_key(ID_FIELD) {
                collection.push(document);
            } else {
                let mut stored = Document::new();
                stored.insert(ID_FIELD, ObjectId::new());
                for (key, value) in document {
                    stored.insert(key, value);
                }
                collection.push(stored);
            }
        }
        Ok(inserted)
    }

    async fn delete_all(&self, namespace: &Namespace) -> Result<u64> {
        self.check_reachable()?;
        let removed = self
            .collections
            .lock()
            .remove(namespace)
            .map_or(0, |docs| docs.len() as u64);
        Ok(removed)
    }

    async fn find(&self, namespace: &Namespace, filter: Document) -> Result<DocumentStream> {
        self.check_reachable()?;
        self.matching(namespace, &filter).map(into_stream)
    }

    async fn aggregate(
        &self,
        namespace: &Namespace,
        pipeline: Vec<Document>,
    ) -> Result<DocumentStream> {
        self.check_reachable()?;
        let mut documents = self.snapshot(namespace);
        for stage in &pipeline {
            documents = run_stage(documents, stage)?;
        }
        Ok(into_stream(documents))
    }
}

#[cfg(test)]
mod tests {
    use bson::doc;
    use futures::TryStreamExt;

    use super::*;
    use crate::{redaction::redaction_pipeline, tags::TagSet};

    fn people() -> Namespace {
        Namespace::default()
    }

    async fn seeded() -> MemoryStore {
        let store = MemoryStore::new();
        store
            .insert_many(
                &people(),
                vec![
                    doc! { "name": "Pritam", "tags": ["HR", "IT"] },
                    doc! { "name": "Russell", "tags": ["IT"] },
                ],
            )
            .await
            .unwrap();
        store
    }

    #[tokio::test]
    async fn insert_assigns_ids_and_counts() {
        let store = seeded().await;
        assert_eq!(store.count(&people()).await.unwrap(), 2);
        let stored = store.snapshot(&people());
        assert!(stored[0].get_object_id("_id").is_ok());
        assert_eq!(stored[0].keys().next().map(String::as_str), Some("_id"));
    }

    #[tokio::test]
    async fn namespaces_are_isolated() {
        let store = seeded().await;
        assert_eq!(store.count(&Namespace::new("test", "other")).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn find_matches_array_elements() {
        let store = seeded().await;
        let found: Vec<_> = store
            .find(&people(), doc! { "tags": "HR" })
            .await
            .unwrap()
            .try_collect()
            .await
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].get_str("name").unwrap(), "Pritam");
    }

    #[tokio::test]
    async fn find_rejects_operators() {
        let store = seeded().await;
        let err = store
            .find(&people(), doc! { "tags": { "$in": ["HR"] } })
            .await
            .err()
            .unwrap();
        assert!(matches!(err, Error::Query(_)));
    }

    #[tokio::test]
    async fn aggregate_runs_match_and_redact() {
        let store = seeded().await;
        let requester: TagSet = ["HR"].into_iter().collect();
        let found: Vec<_> = store
            .aggregate(&people(), redaction_pipeline(doc! {}, &requester))
            .await
            .unwrap()
            .try_collect()
            .await
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].get_str("name").unwrap(), "Pritam");
    }

    #[tokio::test]
    async fn dollar_prefixed_tags_match_literally() {
        let store = MemoryStore::new();
        store
            .insert_many(
                &people(),
                vec![doc! { "name": "Ops", "tags": ["$ops"] }, doc! { "name": "Ana", "tags": ["ops"] }],
            )
            .await
            .unwrap();
        let requester: TagSet = ["$ops"].into_iter().collect();
        let found: Vec<_> = store
            .aggregate(&people(), redaction_pipeline(doc! {}, &requester))
            .await
            .unwrap()
            .try_collect()
            .await
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].get_str("name").unwrap(), "Ops");
    }

    #[tokio::test]
    async fn aggregate_rejects_unknown_stages() {
        let store = seeded().await;
        let err = store
            .aggregate(&people(), vec![doc! { "$group": { "_id": null } }])
            .await
            .err()
            .unwrap();
        assert!(err.to_string().contains("$group"));
    }

    #[tokio::test]
    async fn delete_all_empties_collection() {
        let store = seeded().await;
        assert_eq!(store.delete_all(&people()).await.unwrap(), 2);
        assert_eq!(store.count(&people()).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn unreachable_store_fails_everything() {
        let store = MemoryStore::unreachable();
        assert!(matches!(
            store.ping().await,
            Err(Error::Connectivity { .. })
        ));
        assert!(store.count(&people()).await.is_err());
    }
}
