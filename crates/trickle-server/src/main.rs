//! Entry point for the Trickle record streamer.
//!
//! Loads configuration, reads the three corpora into memory, and serves
//! the query API and channel sockets until `Ctrl-C`.
//!
//! ```text
//! corpus files --> CorpusStore --> emitters --> topic channels --> sockets
//! ```

use std::sync::Arc;

use tracing::info;
use tracing_subscriber::EnvFilter;
use trickle_corpus::{CorpusStore, Topic};
use trickle_server::config::{LogFormat, LoggingConfig};
use trickle_server::{AppState, TrickleConfig, start_server};

/// Application entry point.
///
/// # Errors
///
/// Returns an error if the configuration is invalid, a corpus file cannot
/// be loaded, or the server fails to bind.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = TrickleConfig::load()?;
    init_logging(&config.logging);

    info!("trickle starting");
    info!(
        host = config.server.host,
        port = config.server.port,
        data_dir = %config.data.dir.display(),
        start_policy = ?config.stream.start_policy,
        "configuration loaded"
    );

    let corpora = CorpusStore::load(&config.data.dir, &config.data.files())?;
    for topic in Topic::ALL {
        info!(%topic, records = corpora.get(topic).len(), "corpus ready");
    }

    let state = Arc::new(AppState::from_config(corpora, &config.stream)?);
    start_server(&config.server, state).await?;

    info!("trickle stopped");
    Ok(())
}

/// Install the global tracing subscriber. `RUST_LOG` wins over the
/// configured level.
fn init_logging(logging: &LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));

    match logging.format {
        LogFormat::Text => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .init(),
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_target(true)
            .init(),
    }
}
