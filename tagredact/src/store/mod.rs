//! Document store access.
//!
//! [`DocumentStore`] is the seam between the session and a concrete back-end:
//! [`MongoStore`] talks to a real server through the `mongodb` driver, and
//! [`MemoryStore`] keeps documents in process for tests and offline runs.
//!
//! Query results are returned as a [`DocumentStream`]. The stream owns the
//! server-side cursor; dropping it (on completion, early return, or error)
//! releases the cursor.

use std::fmt;

use async_trait::async_trait;
use bson::Document;
use futures::stream::BoxStream;

use crate::error::Result;

mod memory;
mod mongo;
mod session;

pub use memory::MemoryStore;
pub use mongo::MongoStore;
pub use session::{SeedOutcome, Session};

/// Default database name.
pub const DEFAULT_DATABASE: &str = "test";
/// Default collection name.
pub const DEFAULT_COLLECTION: &str = "people";

/// A lazily evaluated sequence of documents returned by a query.
pub type DocumentStream = BoxStream<'static, Result<Document>>;

/// A database/collection pair.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Namespace {
    pub database: String,
    pub collection: String,
}

impl Namespace {
    pub fn new(database: impl Into<String>, collection: impl Into<String>) -> Self {
        Self {
            database: database.into(),
            collection: collection.into(),
        }
    }
}

impl Default for Namespace {
    fn default() -> Self {
        Self::new(DEFAULT_DATABASE, DEFAULT_COLLECTION)
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.database, self.collection)
    }
}

/// Operations the session needs from a document store.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Human-readable location, used in logs and connectivity errors.
    fn endpoint(&self) -> String;

    /// Round-trips a no-op command to prove the store is reachable.
    async fn ping(&self) -> Result<()>;

    async fn count(&self, namespace: &Namespace) -> Result<u64>;

    /// Inserts `documents` in order and returns how many were written.
    async fn insert_many(&self, namespace: &Namespace, documents: Vec<Document>) -> Result<usize>;

    /// Deletes every document in the namespace and returns how many went.
    async fn delete_all(&self, namespace: &Namespace) -> Result<u64>;

    async fn find(&self, namespace: &Namespace, filter: Document) -> Result<DocumentStream>;

    async fn aggregate(
        &self,
        namespace: &Namespace,
        pipeline: Vec<Document>,
    ) -> Result<DocumentStream>;
}
