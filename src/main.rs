//! Article Rater: binary entrypoint.
//! Loads config and preferences, fits the calibration models, then runs the
//! interactive rating loop on stdin/stdout.

use anyhow::Result;
use tokio::io::{stdin, stdout, BufReader};
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use article_rater::cli::Console;
use article_rater::config::AppConfig;
use article_rater::session::RatingSession;

/// RUST_LOG wins; otherwise info for this crate, warn for dependencies.
/// RATER_LOG_JSON=1 switches to JSON lines.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("article_rater=info,warn"));

    let json = std::env::var("RATER_LOG_JSON")
        .ok()
        .is_some_and(|v| v == "1");

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(fmt::layer().compact().with_writer(std::io::stderr))
            .init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env if present; no-op otherwise.
    let _ = dotenvy::dotenv();
    init_tracing();

    let cfg = AppConfig::load_default().inspect_err(|e| error!(error = ?e, "invalid configuration"))?;
    let mut session = RatingSession::from_config(&cfg)?;

    let mut console = Console::new(BufReader::new(stdin()), stdout());
    console.run(&mut session).await?;

    info!("bye");
    Ok(())
}
