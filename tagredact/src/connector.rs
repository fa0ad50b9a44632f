//! Secure connector: TLS material in, verified [`Session`] out.
//!
//! A session is only handed out after the store answered a ping within the
//! connect timeout. Certificate problems surface from [`SecureConnector::prepare`]
//! before any socket is opened.

use std::{fmt, sync::Arc, time::Duration};

use slog::{info, o, Logger};

use crate::{
    error::{Error, Result},
    store::{DocumentStore, MongoStore, Namespace, Session},
    tls::{TlsPaths, TlsSettings},
};

/// Well-known store port.
pub const DEFAULT_PORT: u16 = 27017;
pub const DEFAULT_HOST: &str = "localhost";
/// Bound on dialing plus the liveness check.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(8);

/// Host and port of a store.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Endpoint {
    pub host: String,
    pub port: u16,
}

impl Endpoint {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// Connection string understood by the driver.
    pub fn uri(&self) -> String {
        format!("mongodb://{self}")
    }
}

impl Default for Endpoint {
    fn default() -> Self {
        Self::new(DEFAULT_HOST, DEFAULT_PORT)
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.host.contains(':') {
            write!(f, "[{}]:{}", self.host, self.port)
        } else {
            write!(f, "{}:{}", self.host, self.port)
        }
    }
}

/// Opens sessions to one endpoint with fixed TLS settings.
pub struct SecureConnector {
    endpoint: Endpoint,
    tls: Option<TlsSettings>,
    timeout: Duration,
    log: Logger,
}

impl SecureConnector {
    /// `tls: None` dials in plain text.
    pub fn new(endpoint: Endpoint, tls: Option<TlsSettings>, log: &Logger) -> Self {
        let log = log.new(o!("endpoint" => endpoint.to_string()));
        Self {
            endpoint,
            tls,
            timeout: DEFAULT_CONNECT_TIMEOUT,
            log,
        }
    }

    /// Loads the TLS material named by `paths` and builds a connector.
    ///
    /// Any load failure is returned as-is; no connection is attempted.
    pub fn prepare(endpoint: Endpoint, paths: &TlsPaths, log: &Logger) -> Result<Self> {
        let tls = TlsSettings::load(paths, log)?;
        Ok(Self::new(endpoint, tls, log))
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn tls(&self) -> Option<&TlsSettings> {
        self.tls.as_ref()
    }

    /// Dials the endpoint through the `mongodb` driver and verifies it.
    pub async fn connect(&self, namespace: Namespace) -> Result<Session> {
        info!(self.log, "connecting";
            "tls" => self.tls.is_some(),
            "mutual" => self.tls.as_ref().is_some_and(TlsSettings::is_mutual),
            "timeout_ms" => u64::try_from(self.timeout.as_millis()).unwrap_or(u64::MAX));
        let store = MongoStore::open(&self.endpoint, self.tls.as_ref(), self.timeout, &self.log).await?;
        self.establish(Arc::new(store), namespace).await
    }

    /// Pings `store` within the timeout and wraps it in a session.
    pub async fn establish(
        &self,
        store: Arc<dyn DocumentStore>,
        namespace: Namespace,
    ) -> Result<Session> {
        match tokio::time::timeout(self.timeout, store.ping()).await {
            Ok(Ok(())) => {}
            Ok(Err(Error::Connectivity { reason, .. })) => {
                return Err(self.unreachable(reason));
            }
            Ok(Err(other)) => return Err(self.unreachable(other.to_string())),
            Err(_) => {
                return Err(self.unreachable(format!(
                    "liveness check timed out after {:?}",
                    self.timeout
                )));
            }
        }
        info!(self.log, "store reachable"; "namespace" => namespace.to_string());
        Ok(Session::new(store, namespace, self.log.clone()))
    }

    fn unreachable(&self, reason: String) -> Error {
        slog::error!(self.log, "liveness check failed"; "reason" => &reason);
        Error::Connectivity {
            endpoint: self.endpoint.to_string(),
            reason,
        }
    }
}

impl fmt::Debug for SecureConnector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecureConnector")
            .field("endpoint", &self.endpoint)
            .field("tls", &self.tls)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}
