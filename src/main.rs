mod error;
mod extract;
mod fetcher;
mod llm;
mod pipeline;
mod report;
mod server;
mod settings;
mod structurer;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::{info, warn};

use fetcher::HttpFetcher;
use llm::ChatClient;
use pipeline::Pipeline;
use report::ReportSource;
use settings::Settings;

#[derive(Parser)]
#[command(name = "traffic_pulse", about = "Live city traffic updates, distilled by an LLM")]
struct Cli {
    /// TOML config file (default: ./traffic_pulse.toml if present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve GET /api/traffic-updates (default)
    Serve,
    /// Run the pipeline once and print the report as JSON
    Once {
        /// Write the report to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let cli = Cli::parse();
    let settings = Settings::load(cli.config.as_deref())?;
    info!(?settings, "Configuration loaded");
    if settings.llm.api_key.is_none() {
        warn!("No LLM API key configured (TRAFFIC_LLM__API_KEY); every request will get fallback data");
    }

    let pipeline = Arc::new(build_pipeline(&settings)?);

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => server::serve(settings.server.addr, pipeline).await,
        Commands::Once { output } => {
            let t0 = Instant::now();
            let outcome = pipeline.run().await;
            let json = serde_json::to_string_pretty(&outcome.report)?;

            match output {
                Some(path) => {
                    std::fs::write(&path, json)
                        .with_context(|| format!("Failed to write {}", path.display()))?;
                    eprintln!("Wrote {}", path.display());
                }
                None => println!("{}", json),
            }

            let label = match outcome.source {
                ReportSource::Live => "live data",
                ReportSource::Fallback => "fallback data (pipeline failed, see log)",
            };
            eprintln!("Source: {} in {:.1}s", label, t0.elapsed().as_secs_f64());
            Ok(())
        }
    }
}

fn build_pipeline(settings: &Settings) -> anyhow::Result<Pipeline> {
    let http = reqwest::Client::builder()
        .user_agent(&settings.fetch.user_agent)
        .build()
        .context("Failed to build HTTP client")?;

    let source = HttpFetcher::new(http.clone(), &settings.fetch.url, settings.fetch.timeout());
    let llm = ChatClient::new(
        http,
        &settings.llm.base_url,
        &settings.llm.model,
        settings.llm.api_key.clone(),
        settings.llm.timeout(),
    );

    Ok(Pipeline::new(
        Arc::new(source),
        Arc::new(llm),
        settings.extract.max_chars,
    ))
}
