use std::{io, process::ExitCode, sync::Arc};

use anyhow::Context;
use bson::doc;
use clap::Parser;
use slog::{debug, Logger};
use tagredact::{
    config::{Cli, Config},
    logging, seed, sink,
    store::MemoryStore,
    SecureConnector, SeedOutcome, Session,
};

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let log = logging::terminal(cli.log_level);
    let code = match run(cli, &log).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            logging::report_failure(&log, err.as_ref());
            ExitCode::FAILURE
        }
    };
    // Flushes the async drain.
    drop(log);
    code
}

async fn run(cli: Cli, log: &Logger) -> anyhow::Result<()> {
    let config = Config::try_from(cli).context("invalid arguments")?;
    let session = open_session(&config, log).await?;

    if config.reset {
        session.reset().await.context("failed to reset collection")?;
    }

    let records = seed::sample_documents().context("failed to encode sample records")?;
    if let SeedOutcome::AlreadyPopulated(existing) = session
        .seed_if_empty(records)
        .await
        .context("failed to seed collection")?
    {
        debug!(log, "collection already populated"; "records" => existing);
    }

    let documents = if config.server_side {
        session
            .query_server_redacted(doc! {}, &config.requester)
            .await
    } else {
        session.query_redacted(doc! {}, &config.requester).await
    }
    .context("query failed")?;

    let mut stdout = io::stdout().lock();
    sink::write_results(documents, &mut stdout).await?;
    Ok(())
}

async fn open_session(config: &Config, log: &Logger) -> anyhow::Result<Session> {
    let connector = SecureConnector::prepare(config.endpoint.clone(), &config.tls, log)
        .context("failed to load TLS material")?
        .with_timeout(config.timeout);

    if config.in_memory {
        return connector
            .establish(Arc::new(MemoryStore::new()), config.namespace.clone())
            .await
            .context("in-memory store unavailable");
    }
    connector
        .connect(config.namespace.clone())
        .await
        .with_context(|| format!("failed to connect to {}", config.endpoint))
}
