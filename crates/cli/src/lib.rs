use anyhow::{Context as AnyhowContext, Result};
use chunkscout_discoverer::{
    discover_chunks, discover_chunks_from_url, ChunkPath, DiscoveryConfig,
};
use clap::Parser;
use serde::Serialize;
use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::AsyncReadExt;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

/// Brute-force width used when neither a flag nor a config file sets one
const DEFAULT_BRUTEFORCE_LIMIT: u32 = 3000;

#[derive(Parser)]
#[command(name = "chunkscout")]
#[command(about = "Discover lazily-loaded chunks referenced by bundled JavaScript", long_about = None)]
#[command(version)]
struct Cli {
    /// Entry scripts: file paths, http(s) URLs, or "-" for stdin
    #[arg(required = true)]
    inputs: Vec<String>,

    /// Integers tried when a chunk function's input cannot be inferred
    #[arg(long)]
    bruteforce_limit: Option<u32>,

    /// TOML discovery config; flags override its values
    #[arg(long)]
    config: Option<PathBuf>,

    /// Per-evaluation sandbox timeout in milliseconds
    #[arg(long)]
    timeout_ms: Option<u64>,

    /// Inputs processed at once
    #[arg(long, default_value_t = 5)]
    concurrency: usize,

    /// Print one JSON object per input
    #[arg(long)]
    json: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Quiet mode: log only warnings/errors
    #[arg(short, long)]
    quiet: bool,
}

/// Chunks found for one input
#[derive(Debug, Serialize)]
struct InputReport {
    input: String,
    chunks: BTreeSet<ChunkPath>,
}

enum Input {
    Url(String),
    File(PathBuf),
    Text(String),
}

impl Input {
    /// Classify a raw argument; stdin is read eagerly so it is consumed once
    async fn resolve(raw: &str, stdin_consumed: &mut bool) -> Result<Self> {
        if raw == "-" {
            let mut text = String::new();
            if !*stdin_consumed {
                tokio::io::stdin()
                    .read_to_string(&mut text)
                    .await
                    .context("Failed to read entry script from stdin")?;
                *stdin_consumed = true;
            }
            return Ok(Self::Text(text));
        }
        if raw.starts_with("http://") || raw.starts_with("https://") {
            return Ok(Self::Url(raw.to_string()));
        }
        Ok(Self::File(PathBuf::from(raw)))
    }

    async fn discover(
        self,
        client: &reqwest::Client,
        config: &DiscoveryConfig,
    ) -> Result<BTreeSet<ChunkPath>> {
        match self {
            Self::Url(url) => Ok(discover_chunks_from_url(client, &url, config).await),
            Self::File(path) => {
                let text = tokio::fs::read_to_string(&path)
                    .await
                    .with_context(|| format!("Failed to read {}", path.display()))?;
                discover_text(text, config).await
            }
            Self::Text(text) => discover_text(text, config).await,
        }
    }
}

async fn discover_text(text: String, config: &DiscoveryConfig) -> Result<BTreeSet<ChunkPath>> {
    let config = config.clone();
    tokio::task::spawn_blocking(move || discover_chunks(&text, &config))
        .await
        .context("Discovery task failed")
}

pub async fn main_entry() -> Result<()> {
    let mut cli = Cli::parse();

    // Keep stdout clean for JSON consumers
    if cli.json {
        cli.quiet = true;
    }

    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if cli.quiet {
        builder.filter_level(log::LevelFilter::Warn);
    } else if cli.verbose {
        builder.filter_level(log::LevelFilter::Debug);
    }
    builder.target(env_logger::Target::Stderr).init();

    let config = resolve_config(&cli)?;
    log::debug!(
        "Discovering chunks in {} inputs (bruteforce limit {})",
        cli.inputs.len(),
        config.bruteforce_limit
    );

    let reports = discover_all(&cli.inputs, &config, cli.concurrency.max(1)).await?;
    for report in &reports {
        if cli.json {
            println!("{}", serde_json::to_string(report)?);
        } else {
            for chunk in &report.chunks {
                println!("{chunk}");
            }
        }
    }

    Ok(())
}

fn resolve_config(cli: &Cli) -> Result<DiscoveryConfig> {
    let mut config = match &cli.config {
        Some(path) => DiscoveryConfig::load(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => DiscoveryConfig::new(DEFAULT_BRUTEFORCE_LIMIT),
    };

    if let Some(limit) = cli.bruteforce_limit {
        config.bruteforce_limit = limit;
    }
    if let Some(timeout_ms) = cli.timeout_ms {
        config.sandbox.timeout_ms = timeout_ms;
    }

    config
        .validate()
        .map_err(anyhow::Error::msg)
        .context("Invalid discovery configuration")?;
    Ok(config)
}

/// Discover every input independently, at most `concurrency` at a time,
/// returning reports in input order
async fn discover_all(
    inputs: &[String],
    config: &DiscoveryConfig,
    concurrency: usize,
) -> Result<Vec<InputReport>> {
    let client = reqwest::Client::builder()
        .build()
        .context("Failed to build HTTP client")?;
    let limiter = Arc::new(Semaphore::new(concurrency));
    let mut tasks = JoinSet::new();
    let mut stdin_consumed = false;

    for (index, raw) in inputs.iter().enumerate() {
        let input = Input::resolve(raw, &mut stdin_consumed).await?;
        let limiter = Arc::clone(&limiter);
        let client = client.clone();
        let config = config.clone();
        let name = raw.clone();
        tasks.spawn(async move {
            let _permit = limiter
                .acquire_owned()
                .await
                .context("Concurrency limiter closed")?;
            let chunks = input.discover(&client, &config).await?;
            log::info!("{name}: {} chunks", chunks.len());
            Ok::<_, anyhow::Error>((index, InputReport { input: name, chunks }))
        });
    }

    let mut reports: Vec<Option<InputReport>> = inputs.iter().map(|_| None).collect();
    while let Some(joined) = tasks.join_next().await {
        let (index, report) = joined.context("Discovery task failed")??;
        reports[index] = Some(report);
    }
    Ok(reports.into_iter().flatten().collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_input_classification() {
        let mut consumed = true;
        assert!(matches!(
            Input::resolve("https://example.com/main.js", &mut consumed).await.unwrap(),
            Input::Url(_)
        ));
        assert!(matches!(
            Input::resolve("dist/main.js", &mut consumed).await.unwrap(),
            Input::File(_)
        ));
        assert!(matches!(
            Input::resolve("-", &mut consumed).await.unwrap(),
            Input::Text(text) if text.is_empty()
        ));
    }

    #[test]
    fn test_flags_override_defaults() {
        let cli = Cli::parse_from([
            "chunkscout",
            "--bruteforce-limit",
            "7",
            "--timeout-ms",
            "150",
            "main.js",
        ]);
        let config = resolve_config(&cli).unwrap();
        assert_eq!(config.bruteforce_limit, 7);
        assert_eq!(config.sandbox.timeout_ms, 150);
    }

    #[test]
    fn test_default_bruteforce_limit() {
        let cli = Cli::parse_from(["chunkscout", "main.js"]);
        assert_eq!(resolve_config(&cli).unwrap().bruteforce_limit, DEFAULT_BRUTEFORCE_LIMIT);
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let cli = Cli::parse_from(["chunkscout", "--timeout-ms", "0", "main.js"]);
        assert!(resolve_config(&cli).is_err());
    }
}
