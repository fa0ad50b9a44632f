//! TLS material loading.
//!
//! Two independent loaders:
//! - [`load_root_cas`]: the CA bundle used to verify the store's certificate.
//! - [`load_client_identity`]: the certificate/key pair presented for mutual TLS.
//!
//! Each returns `Ok(None)` when no path was supplied, and an error for anything
//! supplied but unusable. Callers must treat every error as fatal: dropping a
//! broken bundle and carrying on would silently downgrade an intended mutual-TLS
//! deployment.

use std::{
    fmt, fs,
    path::{Path, PathBuf},
};

use rustls::{
    pki_types::{pem::PemObject, CertificateDer, PrivateKeyDer},
    sign::CertifiedKey,
    RootCertStore,
};
use slog::{info, Logger};
use zeroize::Zeroizing;

use crate::error::{Error, Result};

/// A parsed root CA bundle.
///
/// Parsing here only validates the file up front. The transport is configured
/// from [`TrustStore::path`] and the driver reads the bundle again with its own
/// TLS stack, so a file replaced between loading and connecting is not caught.
pub struct TrustStore {
    path: PathBuf,
    roots: RootCertStore,
}

impl TrustStore {
    /// Parses PEM-encoded CA certificates.
    ///
    /// Fails when the data holds no certificate the verifier accepts. Blocks
    /// that parse but are rejected are skipped as long as one survives.
    pub fn from_pem(path: impl Into<PathBuf>, pem: &[u8]) -> Result<Self> {
        let path = path.into();
        let parse_error = |reason: String| Error::CertificateParse {
            path: path.clone(),
            reason,
        };

        let certificates = CertificateDer::pem_slice_iter(pem)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| parse_error(format!("invalid PEM: {e}")))?;
        if certificates.is_empty() {
            return Err(parse_error("no certificates found".into()));
        }

        let mut roots = RootCertStore::empty();
        let (added, rejected) = roots.add_parsable_certificates(certificates);
        if added == 0 {
            return Err(parse_error(format!(
                "no valid certificate found ({rejected} rejected)"
            )));
        }

        Ok(Self { path, roots })
    }

    /// Where the bundle was read from.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of accepted root certificates.
    pub fn len(&self) -> usize {
        self.roots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }
}

impl fmt::Debug for TrustStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TrustStore")
            .field("path", &self.path)
            .field("roots", &self.roots.len())
            .finish()
    }
}

/// A client certificate chain with its matching private key.
pub struct ClientIdentity {
    cert_path: PathBuf,
    key_path: PathBuf,
    cert_pem: Vec<u8>,
    key_pem: Zeroizing<Vec<u8>>,
    chain_len: usize,
}

impl ClientIdentity {
    /// Parses a PEM certificate chain and PEM private key and checks that the
    /// key belongs to the leaf certificate.
    pub fn from_pem(
        cert_path: impl Into<PathBuf>,
        cert_pem: Vec<u8>,
        key_path: impl Into<PathBuf>,
        key_pem: Zeroizing<Vec<u8>>,
    ) -> Result<Self> {
        let cert_path = cert_path.into();
        let key_path = key_path.into();

        let chain = CertificateDer::pem_slice_iter(&cert_pem)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| identity_error(&cert_path, format!("invalid certificate PEM: {e}")))?;
        if chain.is_empty() {
            return Err(identity_error(&cert_path, "no certificates found".into()));
        }
        let chain_len = chain.len();

        let key = PrivateKeyDer::from_pem_slice(&key_pem)
            .map_err(|e| identity_error(&key_path, format!("failed to parse private key: {e}")))?;

        let provider = rustls::crypto::ring::default_provider();
        CertifiedKey::from_der(chain, key, &provider)
            .map_err(|e| identity_error(&key_path, format!("certificate and key do not pair: {e}")))?;

        Ok(Self {
            cert_path,
            key_path,
            cert_pem,
            key_pem,
            chain_len,
        })
    }

    pub fn cert_path(&self) -> &Path {
        &self.cert_path
    }

    pub fn key_path(&self) -> &Path {
        &self.key_path
    }

    /// Number of certificates in the presented chain.
    pub fn chain_len(&self) -> usize {
        self.chain_len
    }

    /// Returns `true` when certificate and key were read from the same file.
    pub fn is_combined(&self) -> bool {
        self.cert_path == self.key_path
    }

    /// Certificate chain followed by the private key, as one PEM document.
    pub fn pem_bundle(&self) -> Zeroizing<Vec<u8>> {
        let mut bundle = Zeroizing::new(Vec::with_capacity(
            self.cert_pem.len() + self.key_pem.len() + 1,
        ));
        bundle.extend_from_slice(&self.cert_pem);
        if !self.cert_pem.ends_with(b"\n") {
            bundle.push(b'\n');
        }
        bundle.extend_from_slice(&self.key_pem);
        bundle
    }
}

impl fmt::Debug for ClientIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientIdentity")
            .field("cert_path", &self.cert_path)
            .field("key_path", &self.key_path)
            .field("chain_len", &self.chain_len)
            .field("key", &"[REDACTED]")
            .finish()
    }
}

fn identity_error(path: &Path, reason: String) -> Error {
    Error::IdentityLoad {
        path: path.to_path_buf(),
        reason,
    }
}

fn supplied(path: Option<&Path>) -> Option<&Path> {
    path.filter(|path| !path.as_os_str().is_empty())
}

/// Loads the root CA bundle at `path`, if one was supplied.
///
/// `None` (or an empty path) means the platform's default trust applies.
pub fn load_root_cas(path: Option<&Path>, log: &Logger) -> Result<Option<TrustStore>> {
    let Some(path) = supplied(path) else {
        return Ok(None);
    };
    info!(log, "loading root certificate"; "path" => %path.display());
    let pem = fs::read(path).map_err(|source| Error::CertificateLoad {
        path: path.to_path_buf(),
        source,
    })?;
    let store = TrustStore::from_pem(path, &pem)?;
    info!(log, "root certificate loaded"; "roots" => store.len());
    Ok(Some(store))
}

/// Loads the client certificate and key, if a certificate path was supplied.
///
/// `None` means the connection authenticates the server only.
pub fn load_client_identity(
    cert_path: Option<&Path>,
    key_path: Option<&Path>,
    log: &Logger,
) -> Result<Option<ClientIdentity>> {
    let Some(cert_path) = supplied(cert_path) else {
        return Ok(None);
    };
    let key_path = supplied(key_path)
        .ok_or_else(|| identity_error(cert_path, "no private key path supplied".into()))?;
    info!(log, "loading certificate for mTLS"; "cert" => %cert_path.display(), "key" => %key_path.display());

    let cert_pem = fs::read(cert_path)
        .map_err(|e| identity_error(cert_path, format!("failed to read certificate: {e}")))?;
    let key_pem = fs::read(key_path)
        .map(Zeroizing::new)
        .map_err(|e| identity_error(key_path, format!("failed to read private key: {e}")))?;

    ClientIdentity::from_pem(cert_path, cert_pem, key_path, key_pem).map(Some)
}

/// Certificate paths as supplied by the operator.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TlsPaths {
    pub root_ca: Option<PathBuf>,
    pub client_cert: Option<PathBuf>,
    pub client_key: Option<PathBuf>,
    /// Use TLS with default trust even when no path is given.
    pub force: bool,
}

impl TlsPaths {
    /// Returns `true` when the connection should be encrypted.
    pub fn enabled(&self) -> bool {
        self.force
            || supplied(self.root_ca.as_deref()).is_some()
            || supplied(self.client_cert.as_deref()).is_some()
    }
}

/// Validated TLS material for one connection.
#[derive(Debug, Default)]
pub struct TlsSettings {
    trust: Option<TrustStore>,
    identity: Option<ClientIdentity>,
}

impl TlsSettings {
    pub fn new(trust: Option<TrustStore>, identity: Option<ClientIdentity>) -> Self {
        Self { trust, identity }
    }

    /// Loads everything `paths` names. Returns `Ok(None)` for a plain connection.
    pub fn load(paths: &TlsPaths, log: &Logger) -> Result<Option<Self>> {
        if !paths.enabled() {
            return Ok(None);
        }
        let trust = load_root_cas(paths.root_ca.as_deref(), log)?;
        let identity =
            load_client_identity(paths.client_cert.as_deref(), paths.client_key.as_deref(), log)?;
        let settings = Self::new(trust, identity);
        info!(log, "TLS configured";
            "custom_roots" => settings.trust.is_some(),
            "mutual" => settings.is_mutual());
        Ok(Some(settings))
    }

    pub fn trust(&self) -> Option<&TrustStore> {
        self.trust.as_ref()
    }

    pub fn identity(&self) -> Option<&ClientIdentity> {
        self.identity.as_ref()
    }

    /// Returns `true` when a client certificate will be presented.
    pub fn is_mutual(&self) -> bool {
        self.identity.is_some()
    }
}
