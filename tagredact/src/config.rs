//! Command-line configuration.
//!
//! [`Cli`] is what the user typed; [`Config`] is the validated, immutable form
//! handed to the connector and session.

use std::{path::PathBuf, time::Duration};

use clap::Parser;

use crate::{
    connector::{Endpoint, DEFAULT_HOST, DEFAULT_PORT},
    error::{Error, Result},
    logging::LogLevel,
    store::{Namespace, DEFAULT_COLLECTION, DEFAULT_DATABASE},
    tags::TagSet,
    tls::TlsPaths,
};

/// Default requester tags.
pub const DEFAULT_TAGS: &str = "HR,IT,MAN";

/// Query a document store over (mutual) TLS and print tag-redacted results.
#[derive(Clone, Debug, Parser)]
#[command(name = "tagredact", version, about)]
pub struct Cli {
    /// Store port.
    #[arg(short = 'p', long, default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Store host.
    #[arg(long, default_value = DEFAULT_HOST)]
    pub host: String,

    /// Root CA bundle (PEM) used to verify the store. Enables TLS.
    #[arg(long, value_name = "PATH")]
    pub root: Option<PathBuf>,

    /// Client certificate (PEM) for mutual TLS. Requires --key.
    #[arg(long, value_name = "PATH")]
    pub cert: Option<PathBuf>,

    /// Client private key (PEM) for mutual TLS. Requires --cert.
    #[arg(long, value_name = "PATH")]
    pub key: Option<PathBuf>,

    /// Delete all existing data before running.
    #[arg(short = 'r', long)]
    pub reset: bool,

    /// Use TLS with the platform trust store even without --root.
    #[arg(long)]
    pub tls: bool,

    /// Comma-separated tags the requester holds.
    #[arg(long, default_value = DEFAULT_TAGS, value_name = "TAG,...")]
    pub tags: TagSet,

    /// Connect and liveness-check timeout.
    #[arg(long, default_value_t = 8, value_name = "SECONDS")]
    pub timeout: u64,

    #[arg(long, default_value = DEFAULT_DATABASE)]
    pub database: String,

    #[arg(long, default_value = DEFAULT_COLLECTION)]
    pub collection: String,

    /// Let the store prune documents with a $redact stage.
    #[arg(long)]
    pub server_side: bool,

    /// Use an in-process store instead of dialing one.
    #[arg(long, conflicts_with_all = ["root", "cert", "key", "tls"])]
    pub in_memory: bool,

    #[arg(long, value_enum, default_value_t = LogLevel::Info)]
    pub log_level: LogLevel,
}

/// Validated runtime configuration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Config {
    pub endpoint: Endpoint,
    pub tls: TlsPaths,
    pub timeout: Duration,
    pub namespace: Namespace,
    pub requester: TagSet,
    pub reset: bool,
    pub server_side: bool,
    pub in_memory: bool,
    pub log_level: LogLevel,
}

impl Config {
    /// Parses and validates `args` (first item is the program name).
    pub fn from_args<I, T>(args: I) -> Result<Self>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        let cli = Cli::try_parse_from(args).map_err(|e| Error::Config(e.to_string()))?;
        Self::try_from(cli)
    }
}

impl TryFrom<Cli> for Config {
    type Error = Error;

    fn try_from(cli: Cli) -> Result<Self> {
        match (&cli.cert, &cli.key) {
            (Some(_), None) => return Err(Error::Config("--cert requires --key".into())),
            (None, Some(_)) => return Err(Error::Config("--key requires --cert".into())),
            _ => {}
        }
        if cli.timeout == 0 {
            return Err(Error::Config("--timeout must be at least one second".into()));
        }
        if cli.host.trim().is_empty() {
            return Err(Error::Config("--host must not be empty".into()));
        }

        Ok(Self {
            endpoint: Endpoint::new(cli.host, cli.port),
            tls: TlsPaths {
                root_ca: cli.root,
                client_cert: cli.cert,
                client_key: cli.key,
                force: cli.tls,
            },
            timeout: Duration::from_secs(cli.timeout),
            namespace: Namespace::new(cli.database, cli.collection),
            requester: cli.tags,
            reset: cli.reset,
            server_side: cli.server_side,
            in_memory: cli.in_memory,
            log_level: cli.log_level,
        })
    }
}
