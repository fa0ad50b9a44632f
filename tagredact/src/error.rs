//! Error taxonomy for loading TLS material, reaching the store, and reading
//! documents back.
//!
//! The redaction engine itself never fails, so nothing here describes a
//! redaction error.

use std::{io, path::PathBuf};

/// Errors surfaced by the loader, connector, and store session.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The root CA bundle could not be read from disk.
    #[error("failed to load root certificate `{}`: {source}", path.display())]
    CertificateLoad {
        /// Path that was being read.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: io::Error,
    },

    /// The root CA bundle was read but holds no usable certificate.
    #[error("failed to parse root certificate `{}`: {reason}", path.display())]
    CertificateParse {
        /// Path (or label) of the bundle.
        path: PathBuf,
        /// What went wrong.
        reason: String,
    },

    /// The client certificate/key pair could not be read, parsed, or paired.
    #[error("failed to load client certificate `{}`: {reason}", path.display())]
    IdentityLoad {
        /// Path of the certificate or key that failed.
        path: PathBuf,
        /// What went wrong.
        reason: String,
    },

    /// The store could not be reached or failed its liveness check.
    #[error("cannot reach store at {endpoint}: {reason}")]
    Connectivity {
        /// Endpoint that was dialed.
        endpoint: String,
        /// What went wrong.
        reason: String,
    },

    /// A store operation failed after the session was established.
    #[error("query failed: {0}")]
    Query(String),

    /// A record returned by the store does not have the expected shape.
    #[error("malformed record: {0}")]
    Decode(String),

    /// The supplied configuration is inconsistent.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// Results could not be written to the sink.
    #[error("failed to write results: {0}")]
    Output(#[source] io::Error),
}

impl Error {
    /// Returns `true` for errors about certificate material or the secure
    /// channel itself.
    pub fn is_security_relevant(&self) -> bool {
        matches!(
            self,
            Self::CertificateLoad { .. }
                | Self::CertificateParse { .. }
                | Self::IdentityLoad { .. }
                | Self::Connectivity { .. }
        )
    }
}

impl From<bson::ser::Error> for Error {
    fn from(err: bson::ser::Error) -> Self {
        Self::Decode(err.to_string())
    }
}

impl From<bson::de::Error> for Error {
    fn from(err: bson::de::Error) -> Self {
        Self::Decode(err.to_string())
    }
}

/// Result alias used throughout the crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn certificate_errors_are_security_relevant() {
        let err = Error::CertificateParse {
            path: PathBuf::from("ca.pem"),
            reason: "no certificates found".into(),
        };
        assert!(err.is_security_relevant());
        assert!(!Error::Decode("bad".into()).is_security_relevant());
        assert!(!Error::Query("cursor killed".into()).is_security_relevant());
    }

    #[test]
    fn messages_name_the_path() {
        let err = Error::CertificateLoad {
            path: PathBuf::from("/etc/ca.pem"),
            source: io::Error::new(io::ErrorKind::NotFound, "missing"),
        };
        assert_eq!(
            err.to_string(),
            "failed to load root certificate `/etc/ca.pem`: missing"
        );
    }
}
