//! Review ABSA binary entrypoint.
//! `serve` boots the Axum HTTP API; `analyze` and `batch` run the pipeline
//! from the command line. Scorers are built before any review is read, so a
//! missing model stops the process up front.

use anyhow::Context;
use clap::{Parser, Subcommand};
use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use review_absa::api::{self, AppState};
use review_absa::batch;
use review_absa::config::AppConfig;
use review_absa::lang::Language;
use review_absa::lexicon::{Lexicon, LexiconHandle};
use review_absa::metrics::Metrics;
use review_absa::normalize::Normalizer;
use review_absa::pipeline::Analyzer;
use review_absa::report::BatchReport;
use review_absa::scorer::shared_registry;
use review_absa::stem::IndonesianStemmer;

#[derive(Parser)]
#[command(name = "review-absa", version, about = "Aspect-based sentiment for app reviews")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP API.
    Serve {
        /// Listen address, overrides the config file.
        #[arg(long)]
        bind: Option<String>,
    },
    /// Analyse one review and print the result as JSON.
    Analyze {
        text: String,
        /// Force the language instead of detecting it (id | en).
        #[arg(long)]
        lang: Option<Language>,
        /// Include segments, cleaned text and per-segment scores.
        #[arg(long)]
        trace: bool,
    },
    /// Analyse a CSV of reviews and write the result table.
    Batch {
        input: PathBuf,
        /// Output CSV path; defaults to result_<unix>.csv in the current directory.
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

/// Structured logs on stderr. `RUST_LOG` wins over the default filter;
/// `ABSA_LOG_JSON=1` switches to JSON lines.
fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("absa=info,warn"));

    let json = std::env::var("ABSA_LOG_JSON")
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

fn main() -> anyhow::Result<()> {
    // Load .env in local/dev; no-op when absent.
    let _ = dotenvy::dotenv();
    init_tracing();

    let cli = Cli::parse();
    let cfg = AppConfig::load_default().context("loading configuration")?;
    let lexicon = Lexicon::load_default().context("loading aspect lexicon")?;

    let registry = shared_registry(&cfg.models.id, &cfg.models.en)
        .context("sentiment models are unavailable")?;
    let analyzer = Analyzer::new(registry.clone())
        .with_normalizer(Normalizer::new(
            Box::new(IndonesianStemmer::new()),
            cfg.pipeline.stem_token_limit,
        ))
        .with_stemming(cfg.pipeline.use_stemming);

    match cli.command {
        Command::Serve { bind } => {
            let bind = bind.unwrap_or_else(|| cfg.server.bind.clone());
            let state = AppState {
                analyzer: Arc::new(analyzer),
                lexicon: LexiconHandle::new(lexicon),
                failure_policy: cfg.pipeline.failure_policy,
                top_triggers: cfg.pipeline.top_triggers,
            };
            tokio::runtime::Builder::new_multi_thread()
                .enable_all()
                .build()
                .context("building tokio runtime")?
                .block_on(serve(state, bind))
        }
        Command::Analyze { text, lang, trace } => {
            let (result, t) = analyzer.analyze_traced(&lexicon, &text, lang)?;
            let out = if trace {
                serde_json::json!({ "result": result, "trace": t })
            } else {
                serde_json::to_value(&result)?
            };
            println!("{}", serde_json::to_string_pretty(&out)?);
            Ok(())
        }
        Command::Batch { input, out } => {
            let table = batch::read_reviews_from_path(&input)?;
            info!(target: "absa", column = %table.text_column, rows = table.texts.len(), "input loaded");
            let outcome = batch::run_batch(
                &analyzer,
                &lexicon,
                &table.texts,
                cfg.pipeline.failure_policy,
            )?;

            let out = out.unwrap_or_else(|| {
                PathBuf::from(batch::export_file_name(chrono::Utc::now()))
            });
            let file =
                File::create(&out).with_context(|| format!("creating {}", out.display()))?;
            batch::write_csv(BufWriter::new(file), &outcome.rows)?;
            info!(target: "absa", path = %out.display(), "results written");

            let report = BatchReport::from_outcome(&outcome, cfg.pipeline.top_triggers);
            println!("{}", serde_json::to_string_pretty(&report)?);
            Ok(())
        }
    }
}

async fn serve(state: AppState, bind: String) -> anyhow::Result<()> {
    let metrics = Metrics::init()?;
    let router = api::create_router(state).merge(metrics.router());

    let listener = tokio::net::TcpListener::bind(&bind)
        .await
        .with_context(|| format!("binding {bind}"))?;
    info!(target: "absa", %bind, "listening");
    axum::serve(listener, router).await.context("http server")?;
    Ok(())
}
