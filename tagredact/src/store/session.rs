//! A store handle bound to one namespace.

use std::{fmt, sync::Arc};

use bson::Document;
use futures::StreamExt;
use slog::{info, warn, Logger};

use super::{DocumentStore, DocumentStream, Namespace};
use crate::{
    error::Result,
    redaction::{redact_stream, redaction_pipeline, TagIntersection},
    tags::TagSet,
};

/// What [`Session::seed_if_empty`] did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SeedOutcome {
    /// The collection was empty; this many records were inserted.
    Seeded(usize),
    /// The collection already held this many records; nothing was inserted.
    AlreadyPopulated(u64),
}

/// A live store handle bound to a single database/collection pair.
///
/// Sessions are created by [`SecureConnector`](crate::SecureConnector) after a
/// successful liveness check, or directly over a store the caller trusts.
pub struct Session {
    store: Arc<dyn DocumentStore>,
    namespace: Namespace,
    log: Logger,
}

impl Session {
    pub fn new(store: Arc<dyn DocumentStore>, namespace: Namespace, log: Logger) -> Self {
        let log = log.new(slog::o!("namespace" => namespace.to_string()));
        Self {
            store,
            namespace,
            log,
        }
    }

    pub fn namespace(&self) -> &Namespace {
        &self.namespace
    }

    pub fn store(&self) -> &dyn DocumentStore {
        self.store.as_ref()
    }

    /// Counts documents, propagating store errors.
    pub async fn try_count(&self) -> Result<u64> {
        self.store.count(&self.namespace).await
    }

    /// Counts documents, reporting zero when the store cannot answer.
    ///
    /// Only suitable for bootstrap decisions such as [`Self::seed_if_empty`].
    pub async fn count(&self) -> u64 {
        match self.try_count().await {
            Ok(count) => count,
            Err(err) => {
                warn!(self.log, "count failed, treating collection as empty"; "error" => %err);
                0
            }
        }
    }

    pub async fn insert(&self, documents: Vec<Document>) -> Result<usize> {
        self.store.insert_many(&self.namespace, documents).await
    }

    /// Inserts `records` only when the collection is empty.
    ///
    /// The count and the insert are separate operations: two callers racing on
    /// an empty collection can both seed it.
    pub async fn seed_if_empty(&self, records: Vec<Document>) -> Result<SeedOutcome> {
        let existing = self.count().await;
        if existing > 0 {
            return Ok(SeedOutcome::AlreadyPopulated(existing));
        }
        info!(self.log, "populating sample data"; "records" => records.len());
        let inserted = self.insert(records).await?;
        Ok(SeedOutcome::Seeded(inserted))
    }

    /// Deletes every document in the namespace. Irreversible.
    pub async fn reset(&self) -> Result<u64> {
        let deleted = self.store.delete_all(&self.namespace).await?;
        info!(self.log, "collection reset"; "deleted" => deleted);
        Ok(deleted)
    }

    /// Streams documents matching `filter`, unredacted.
    pub async fn query(&self, filter: Document) -> Result<DocumentStream> {
        self.store.find(&self.namespace, filter).await
    }

    /// Streams documents matching `filter`, redacted in this process.
    pub async fn query_redacted(&self, filter: Document, requester: &TagSet) -> Result<DocumentStream> {
        info!(self.log, "querying"; "mode" => "client-side", "requester" => requester);
        let rule = TagIntersection::new(requester.clone());
        let documents = self.query(filter).await?;
        Ok(redact_stream(documents, rule).boxed())
    }

    /// Streams documents matching `filter`, redacted by the store itself.
    pub async fn query_server_redacted(
        &self,
        filter: Document,
        requester: &TagSet,
    ) -> Result<DocumentStream> {
        info!(self.log, "querying"; "mode" => "server-side", "requester" => requester);
        self.store
            .aggregate(&self.namespace, redaction_pipeline(filter, requester))
            .await
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("endpoint", &self.store.endpoint())
            .field("namespace", &self.namespace)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use bson::doc;
    use futures::TryStreamExt;
    use slog::{o, Discard};

    use super::*;
    use crate::store::MemoryStore;

    fn session(store: MemoryStore) -> Session {
        Session::new(Arc::new(store), Namespace::default(), Logger::root(Discard, o!()))
    }

    fn records() -> Vec<Document> {
        vec![
            doc! { "name": "A", "tags": ["HR"] },
            doc! { "name": "B", "tags": ["FIN"] },
        ]
    }

    #[tokio::test]
    async fn seeds_once() {
        let session = session(MemoryStore::new());
        assert_eq!(session.seed_if_empty(records()).await.unwrap(), SeedOutcome::Seeded(2));
        assert_eq!(
            session.seed_if_empty(records()).await.unwrap(),
            SeedOutcome::AlreadyPopulated(2)
        );
        assert_eq!(session.try_count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn count_failure_reads_as_empty() {
        let session = session(MemoryStore::unreachable());
        assert_eq!(session.count().await, 0);
        assert!(session.try_count().await.is_err());
        assert!(session.seed_if_empty(records()).await.is_err());
    }

    #[tokio::test]
    async fn reset_then_reseed() {
        let session = session(MemoryStore::new());
        session.seed_if_empty(records()).await.unwrap();
        assert_eq!(session.reset().await.unwrap(), 2);
        assert_eq!(session.count().await, 0);
        assert_eq!(session.seed_if_empty(records()).await.unwrap(), SeedOutcome::Seeded(2));
    }

    #[tokio::test]
    async fn redacted_query_drops_pruned_documents() {
        let session = session(MemoryStore::new());
        session.insert(records()).await.unwrap();
        let requester: TagSet = ["HR"].into_iter().collect();

        let client: Vec<_> = session
            .query_redacted(doc! {}, &requester)
            .await
            .unwrap()
            .try_collect()
            .await
            .unwrap();
        let server: Vec<_> = session
            .query_server_redacted(doc! {}, &requester)
            .await
            .unwrap()
            .try_collect()
            .await
            .unwrap();

        assert_eq!(client.len(), 1);
        assert_eq!(client, server);
    }
}
