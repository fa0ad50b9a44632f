//! Root logger construction for the binary.
//!
//! Library code never creates loggers; it receives one from the caller.

use std::error::Error as StdError;

use clap::ValueEnum;
use slog::{crit, error, o, Drain, Level, Logger};

use crate::error::Error;

/// Minimum severity written to the terminal.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Error => Self::Error,
            LogLevel::Warn => Self::Warning,
            LogLevel::Info => Self::Info,
            LogLevel::Debug => Self::Debug,
            LogLevel::Trace => Self::Trace,
        }
    }
}

/// Builds an asynchronous terminal logger writing to stderr.
///
/// Records are flushed when the last clone of the returned logger is dropped.
pub fn terminal(level: LogLevel) -> Logger {
    let decorator = slog_term::TermDecorator::new().stderr().build();
    let drain = slog_term::FullFormat::new(decorator).build().fuse();
    let drain = slog_async::Async::new(drain).build().fuse();
    let drain = drain.filter_level(level.into()).fuse();
    Logger::root(drain, o!("app" => env!("CARGO_PKG_NAME")))
}

/// Logs the error that ended a run.
///
/// Failures about certificate material or the secure channel are logged at
/// critical level; returns `true` when that was the case.
pub fn report_failure(log: &Logger, err: &(dyn StdError + 'static)) -> bool {
    let security = std::iter::successors(Some(err), |&e| e.source())
        .filter_map(|e| e.downcast_ref::<Error>())
        .any(Error::is_security_relevant);
    let message = error_chain(err);
    if security {
        crit!(log, "secure channel unavailable"; "error" => message);
    } else {
        error!(log, "fatal"; "error" => message);
    }
    security
}

fn error_chain(err: &(dyn StdError + 'static)) -> String {
    std::iter::successors(Some(err), |&e| e.source())
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(": ")
}

#[cfg(test)]
mod tests {
    use std::{io, path::PathBuf};

    use slog::Discard;

    use super::*;

    fn discard() -> Logger {
        Logger::root(Discard, o!())
    }

    #[derive(Debug, thiserror::Error)]
    #[error("failed to load TLS material")]
    struct Wrapped(#[source] Error);

    #[test]
    fn levels_map_to_slog() {
        assert_eq!(Level::from(LogLevel::Warn), Level::Warning);
        assert_eq!(Level::from(LogLevel::default()), Level::Info);
    }

    #[test]
    fn certificate_failures_are_reported_as_security() {
        let err = Wrapped(Error::CertificateParse {
            path: PathBuf::from("ca.pem"),
            reason: "no certificates found".into(),
        });
        assert!(report_failure(&discard(), &err));
        assert_eq!(
            error_chain(&err),
            "failed to load TLS material: failed to parse root certificate `ca.pem`: no certificates found"
        );
    }

    #[test]
    fn other_failures_are_plain_errors() {
        assert!(!report_failure(&discard(), &Error::Query("cursor killed".into())));
        let io = io::Error::new(io::ErrorKind::BrokenPipe, "closed");
        assert!(!report_failure(&discard(), &io));
    }
}
