use anyhow::Context;
use commit_summarizer::metrics::METRICS;
use commit_summarizer::{Config, SummaryOrchestrator};
use std::io::Read;
use std::sync::Arc;
use tracing::{debug, info};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const DEFAULT_CONFIG_PATH: &str = "commit-summarizer.toml";

fn init_tracing(config: &Config) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    // Logs go to stderr; stdout carries only the commit message
    if config.logging.json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
            .init();
    }
}

/// Reads `git diff --staged` output on stdin and prints a commit message.
///
/// Usage: `git diff --staged | commit-summarizer [ISSUE_ID]`
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config_path = std::env::var("COMMIT_SUMMARIZER_CONFIG")
        .unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
    let config = Config::load(&config_path).context("Failed to load configuration")?;
    init_tracing(&config);

    let issue_id = std::env::args()
        .nth(1)
        .or_else(|| std::env::var("OCO_ISSUE_ID").ok())
        .unwrap_or_default();

    let mut diff = String::new();
    std::io::stdin()
        .read_to_string(&mut diff)
        .context("Failed to read diff from stdin")?;

    let config = Arc::new(config);
    info!(
        "Drafting commit message with {} ({})",
        config.generation.model,
        config.generation.provider.as_str()
    );

    let orchestrator = SummaryOrchestrator::with_openai(config)?;
    let result = orchestrator.summarize(&diff, &issue_id).await;
    debug!("Run metrics:\n{}", METRICS.export_prometheus());
    let message = result?;

    println!("{}", message);
    Ok(())
}
