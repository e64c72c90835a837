//! Command-line entrypoint of the ParkWatch pipeline.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use parkwatch_models::VideoId;
use parkwatch_worker::{Orchestrator, PipelineConfig};

#[derive(Parser, Debug)]
#[command(name = "parkwatch-worker", about = "Incremental park activity analytics")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Analyze one video and upsert its partitions
    Process { video: String },
    /// Feed a processed video's predictions back as pseudo labels and retrain
    Retrain { video: String },
    /// Train the model from the labeled corpus
    Train,
    /// Rebuild motion aggregates and feature rows of every video
    Rebuild,
    /// Print the summary of a processed video
    Summary { video: String },
    /// List videos in the feature store
    List,
}

#[tokio::main]
async fn main() {
    // Load environment variables
    dotenvy::dotenv().ok();
    init_tracing();

    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        error!("{:#}", e);
        std::process::exit(1);
    }
}

fn init_tracing() {
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let mut env_filter = EnvFilter::from_default_env();
    if let Ok(directive) = "parkwatch=info".parse() {
        env_filter = env_filter.add_directive(directive);
    }

    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_ansi(true)
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_file(false)
                    .with_line_number(false),
            )
            .with(env_filter)
            .init();
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = PipelineConfig::from_env().context("Failed to load pipeline config")?;
    info!(
        data_dir = %config.data_dir.display(),
        classifier = ?config.classifier,
        "Starting parkwatch-worker"
    );
    let orchestrator = Orchestrator::new(config)?;

    match cli.command {
        Command::Process { video } => {
            let outcome = orchestrator.process_new_video(&parse_video(&video)?).await?;
            print_json(&outcome)
        }
        Command::Retrain { video } => {
            let outcome = orchestrator
                .retrain_from_feedback(&parse_video(&video)?)
                .await?;
            print_json(&outcome)
        }
        Command::Train => print_json(&orchestrator.train_model().await?),
        Command::Rebuild => print_json(&orchestrator.rebuild_feature_store().await?),
        Command::Summary { video } => {
            print_json(&orchestrator.video_summary(&parse_video(&video)?).await?)
        }
        Command::List => print_json(&orchestrator.list_videos().await?),
    }
}

fn parse_video(raw: &str) -> Result<VideoId> {
    VideoId::new(raw).with_context(|| format!("Invalid video id '{}'", raw))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
