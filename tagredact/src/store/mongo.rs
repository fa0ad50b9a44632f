//! `mongodb` driver back-end.
//!
//! The driver reads TLS material from files. Root bundles are handed over by
//! path. A client identity whose key lives in its own file is rewritten into a
//! private certificate+key bundle, owned by the store and deleted with it.

use std::{
    io::Write,
    path::{Path, PathBuf},
    time::Duration,
};

use async_trait::async_trait;
use bson::{doc, Document};
use futures::{StreamExt, TryStreamExt};
use mongodb::{
    options::{ClientOptions, Tls, TlsOptions},
    Client, Collection,
};
use slog::{debug, Logger};
use tempfile::NamedTempFile;

use super::{DocumentStore, DocumentStream, Namespace};
use crate::{
    connector::Endpoint,
    error::{Error, Result},
    tls::{ClientIdentity, TlsSettings},
};

const APP_NAME: &str = "tagredact";

/// A store reached through the `mongodb` driver.
pub struct MongoStore {
    client: Client,
    endpoint: Endpoint,
    tls: Option<TlsOptions>,
    // Deleted on drop; must outlive the client.
    identity_bundle: Option<NamedTempFile>,
}

impl MongoStore {
    /// Builds a client for `endpoint`.
    ///
    /// No connection is opened here: the driver dials lazily, so reachability
    /// is only known after [`DocumentStore::ping`].
    pub async fn open(
        endpoint: &Endpoint,
        tls: Option<&TlsSettings>,
        timeout: Duration,
        log: &Logger,
    ) -> Result<Self> {
        let connectivity = |reason: String| Error::Connectivity {
            endpoint: endpoint.to_string(),
            reason,
        };

        let mut options = ClientOptions::parse(endpoint.uri())
            .await
            .map_err(|e| connectivity(e.to_string()))?;
        options.app_name = Some(APP_NAME.to_string());
        options.connect_timeout = Some(timeout);
        options.server_selection_timeout = Some(timeout);

        let mut identity_bundle = None;
        let tls = match tls {
            Some(settings) => {
                let (driver_tls, bundle) = driver_tls_options(settings)?;
                debug!(log, "driver TLS options";
                    "ca_file" => driver_tls.ca_file_path.is_some(),
                    "client_identity" => driver_tls.cert_key_file_path.is_some());
                identity_bundle = bundle;
                Some(driver_tls)
            }
            None => None,
        };
        options.tls = tls.clone().map(Tls::Enabled);

        let client = Client::with_options(options).map_err(|e| connectivity(e.to_string()))?;
        Ok(Self {
            client,
            endpoint: endpoint.clone(),
            tls,
            identity_bundle,
        })
    }

    /// TLS options handed to the driver, `None` for a plain connection.
    pub fn tls_options(&self) -> Option<&TlsOptions> {
        self.tls.as_ref()
    }

    /// Path of the staged certificate+key bundle, if one was written.
    pub fn identity_bundle(&self) -> Option<&Path> {
        self.identity_bundle.as_ref().map(NamedTempFile::path)
    }

    fn collection(&self, namespace: &Namespace) -> Collection<Document> {
        self.client
            .database(&namespace.database)
            .collection::<Document>(&namespace.collection)
    }
}

/// Translates loaded settings into driver options.
///
/// The driver re-reads both files itself; the returned temp file backs
/// `cert_key_file_path` when the key was supplied separately.
fn driver_tls_options(settings: &TlsSettings) -> Result<(TlsOptions, Option<NamedTempFile>)> {
    let mut bundle = None;
    let cert_key_file = match settings.identity() {
        Some(identity) if identity.is_combined() => Some(identity.cert_path().to_path_buf()),
        Some(identity) => {
            let staged = write_identity_bundle(identity)?;
            let path = staged.path().to_path_buf();
            bundle = Some(staged);
            Some(path)
        }
        None => None,
    };
    let ca_file: Option<PathBuf> = settings.trust().map(|trust| trust.path().to_path_buf());
    let options = TlsOptions::builder()
        .ca_file_path(ca_file)
        .cert_key_file_path(cert_key_file)
        .build();
    Ok((options, bundle))
}

fn write_identity_bundle(identity: &ClientIdentity) -> Result<NamedTempFile> {
    let failed = |e: std::io::Error| Error::IdentityLoad {
        path: identity.cert_path().to_path_buf(),
        reason: format!("failed to stage certificate bundle: {e}"),
    };
    let mut file = tempfile::Builder::new()
        .prefix("tagredact-identity-")
        .suffix(".pem")
        .tempfile()
        .map_err(failed)?;
    file.write_all(&identity.pem_bundle()).map_err(failed)?;
    file.flush().map_err(failed)?;
    Ok(file)
}

fn query_error(err: mongodb::error::Error) -> Error {
    Error::Query(err.to_string())
}

#[async_trait]
impl DocumentStore for MongoStore {
    fn endpoint(&self) -> String {
        self.endpoint.to_string()
    }

    async fn ping(&self) -> Result<()> {
        self.client
            .database("admin")
            .run_command(doc! { "ping": 1 }, None)
            .await
            .map(drop)
            .map_err(|e| Error::Connectivity {
                endpoint: self.endpoint.to_string(),
                reason: e.to_string(),
            })
    }

    async fn count(&self, namespace: &Namespace) -> Result<u64> {
        self.collection(namespace)
            .count_documents(doc! {}, None)
            .await
            .map_err(query_error)
    }

    async fn insert_many(&self, namespace: &Namespace, documents: Vec<Document>) -> Result<usize> {
        if documents.is_empty() {
            return Ok(0);
        }
        let result = self
            .collection(namespace)
            .insert_many(documents, None)
            .await
            .map_err(query_error)?;
        Ok(result.inserted_ids.len())
    }

    async fn delete_all(&self, namespace: &Namespace) -> Result<u64> {
        let result = self
            .collection(namespace)
            .delete_many(doc! {}, None)
            .await
            .map_err(query_error)?;
        Ok(result.deleted_count)
    }

    async fn find(&self, namespace: &Namespace, filter: Document) -> Result<DocumentStream> {
        let cursor = self
            .collection(namespace)
            .find(filter, None)
            .await
            .map_err(query_error)?;
        Ok(cursor.map_err(query_error).boxed())
    }

    async fn aggregate(
        &self,
        namespace: &Namespace,
        pipeline: Vec<Document>,
    ) -> Result<DocumentStream> {
        let cursor = self
            .collection(namespace)
            .aggregate(pipeline, None)
            .await
            .map_err(query_error)?;
        Ok(cursor.map_err(query_error).boxed())
    }
}
