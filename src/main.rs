use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::Colorize;
use tracing::info;

use flashpoint::config::{ClassifierBackend, Config, DetectorBackend};
use flashpoint::db::PostStore;
use flashpoint::detection::traits::ObjectDetector;
use flashpoint::output::ReportSink;
use flashpoint::toxicity::traits::TextClassifier;

/// Flashpoint: find posts pairing hate speech with weapon imagery.
///
/// Collects weapon-keyword posts from Reddit, then screens each post's
/// title for hate speech and its images for weapons. Posts with both are
/// flagged.
#[derive(Parser)]
#[command(name = "flashpoint", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database
    Init,

    /// Download the ONNX detector and toxicity models
    DownloadModel,

    /// Search Reddit for weapon-related posts and store them
    Ingest {
        /// Max posts to fetch (default: 100)
        #[arg(long, default_value = "100")]
        limit: u32,

        /// Subreddit to search (default: all)
        #[arg(long, default_value = "all")]
        subreddit: String,

        /// Keep posts from any day, not just today (UTC)
        #[arg(long)]
        all_dates: bool,
    },

    /// Screen stored posts for hate speech paired with weapon imagery
    Screen {
        /// Number of posts to analyze in parallel (default: 5)
        #[arg(long, default_value = "5")]
        concurrency: usize,

        /// Also append results to this file as newline-delimited JSON
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Show system status (post counts, last ingest, model presence)
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if missing)
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("flashpoint=info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Init => {
            info!("Initializing Flashpoint database...");
            let config = Config::load()?;
            let store = flashpoint::db::initialize_sqlite(&config.db_path)?;
            let table_count = store.table_count().await?;
            println!("Database initialized at: {}", config.db_path);
            println!("Tables created: {table_count}");
            println!("\nNext steps:");
            println!("  flashpoint download-model");
            println!("  flashpoint ingest");
            println!("  flashpoint screen");
        }

        Commands::DownloadModel => {
            let config = Config::load()?;
            let model_dir = &config.model_dir;

            println!("Downloading ONNX models...");
            println!("  Destination: {}", model_dir.display());

            flashpoint::download::download_models(model_dir).await?;

            println!("\n{}", "Models downloaded successfully.".bold());
            println!("You can now run `flashpoint screen`.");
        }

        Commands::Ingest {
            limit,
            subreddit,
            all_dates,
        } => {
            let config = Config::load()?;
            let store = flashpoint::db::initialize_sqlite(&config.db_path)?;
            let client = flashpoint::ingest::reddit::RedditClient::new(
                &config.reddit_api_url,
                &config.reddit_user_agent,
            )?;

            let options = flashpoint::ingest::IngestOptions {
                subreddit,
                limit,
                all_dates,
            };

            println!(
                "Searching r/{} for: {}",
                options.subreddit,
                flashpoint::ingest::build_search_query(&flashpoint::ingest::SEARCH_KEYWORDS)
            );

            let stats = flashpoint::ingest::run(&client, store.as_ref(), &options).await?;

            println!("\n{}", "Ingest complete.".bold());
            println!("  Posts fetched: {}", stats.fetched);
            println!("  Posts kept: {}", stats.kept);
            println!("  New posts stored: {}", stats.stored);
            println!("  Posts with media: {}", stats.with_media);
        }

        Commands::Screen {
            concurrency,
            output,
        } => {
            let config = Config::load()?;
            config.require_detector()?;
            config.require_classifier()?;
            let store = flashpoint::db::open_sqlite(&config.db_path)?;

            // Capabilities are built once and shared by every worker
            let detector = create_detector(&config)?;
            let classifier = create_classifier(&config)?;
            let fetcher = Arc::new(flashpoint::media::fetcher::HttpMediaFetcher::new(
                &config.reddit_user_agent,
                config.fetch_timeout,
            )?);

            let analyzer = flashpoint::pipeline::analyzer::PostAnalyzer::new(
                fetcher,
                flashpoint::detection::weapons::WeaponFilter::new(
                    detector,
                    config.weapon_min_confidence,
                    config.inference_timeout,
                ),
                flashpoint::toxicity::hate::HateSpeechFilter::new(
                    classifier,
                    config.hate_min_confidence,
                    config.inference_timeout,
                ),
                config.fetch_timeout,
            );

            println!("Screening stored posts ({concurrency} concurrent)...");

            let report = flashpoint::pipeline::screener::BatchScreener::new(&analyzer, concurrency)
                .with_progress(true)
                .run(store.as_ref())
                .await?;

            let mut sinks: Vec<Box<dyn ReportSink>> =
                vec![Box::new(flashpoint::output::terminal::TerminalSink)];
            if let Some(path) = output {
                sinks.push(Box::new(flashpoint::output::ndjson::NdjsonSink::new(path)));
            }
            for sink in &mut sinks {
                sink.emit(&report)?;
            }
        }

        Commands::Status => {
            let config = Config::load()?;
            if !std::path::Path::new(&config.db_path).exists() {
                println!("Database: not initialized");
                println!("\nRun `flashpoint init` to set up the database.");
                return Ok(());
            }
            let store = flashpoint::db::open_sqlite(&config.db_path)?;
            flashpoint::status::show(&store, &config).await?;
        }
    }

    Ok(())
}

/// Create the object detector for the configured backend.
fn create_detector(config: &Config) -> Result<Arc<dyn ObjectDetector>> {
    match config.detector_backend {
        DetectorBackend::Onnx => {
            info!("Using local YOLO object detector");
            let detector = flashpoint::detection::yolo::YoloDetector::load(&config.model_dir)?;
            Ok(Arc::new(detector))
        }
        DetectorBackend::Http => {
            let url = config
                .detector_url
                .as_deref()
                .ok_or_else(|| anyhow::anyhow!("FLASHPOINT_DETECTOR_URL not set"))?;
            info!(url = url, "Using remote object detector");
            Ok(Arc::new(flashpoint::detection::http::HttpDetector::new(url)?))
        }
    }
}

/// Create the text classifier for the configured backend.
fn create_classifier(config: &Config) -> Result<Arc<dyn TextClassifier>> {
    match config.classifier_backend {
        ClassifierBackend::Onnx => {
            info!("Using local ONNX toxicity classifier");
            let classifier =
                flashpoint::toxicity::onnx::OnnxTextClassifier::load(&config.model_dir)?;
            Ok(Arc::new(classifier))
        }
        ClassifierBackend::Http => {
            let url = config
                .classifier_url
                .clone()
                .ok_or_else(|| anyhow::anyhow!("FLASHPOINT_CLASSIFIER_URL not set"))?;
            info!(url = %url, "Using remote toxicity classifier");
            Ok(Arc::new(flashpoint::toxicity::http::HttpClassifier::new(
                url,
                config.classifier_token.clone(),
            )?))
        }
    }
}
