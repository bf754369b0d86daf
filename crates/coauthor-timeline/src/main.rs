//! Coauthor Timeline - Entry Point
//!
//! Harvests target researchers from OpenAlex and derives their classified
//! coauthor timelines into JSON-lines files under a data directory.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use coauthor_timeline::{
    OpenAlexClient, TimelineEngine,
    career::CareerResolver,
    config::Config,
    corpus::Corpus,
    engine::Target,
    features,
    formatters::{render_batch, render_harvest},
    harvest::Harvester,
    models::ResponseFormat,
    pipeline::{self, Pipeline},
    sources::AuthorStore,
    store::{AuthorTable, JsonlRelationshipStore},
};

const PUBLICATIONS_FILE: &str = "publications.jsonl";
const RELATIONSHIPS_FILE: &str = "relationships.jsonl";
const AUTHORS_FILE: &str = "authors.jsonl";

#[derive(Parser, Debug)]
#[command(name = "coauthor-timeline")]
#[command(about = "Derive classified coauthor timelines from OpenAlex")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Targets processed concurrently
    #[arg(long, global = true, env = "COAUTHOR_CONCURRENCY")]
    concurrency: Option<usize>,

    /// Seed for reproducible representative dates
    #[arg(long, global = true, env = "COAUTHOR_SEED")]
    seed: Option<u64>,

    /// Report format
    #[arg(long, global = true, default_value = "markdown")]
    report: ReportFormat,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, default_value = "info", env = "RUST_LOG")]
    log_level: String,

    /// Output logs as JSON
    #[arg(long, global = true)]
    json_logs: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Harvest targets from OpenAlex, then derive their timelines
    Run {
        /// JSON-lines file of {"id", "name", "firstPubYear"?}
        #[arg(long)]
        targets: PathBuf,
        /// Directory holding the corpus and stores
        #[arg(long, default_value = "data")]
        data_dir: PathBuf,
    },
    /// Derive timelines from the stored corpus only
    Derive {
        /// JSON-lines file of {"id", "name", "firstPubYear"?}
        #[arg(long)]
        targets: PathBuf,
        /// Directory holding the corpus and stores
        #[arg(long, default_value = "data")]
        data_dir: PathBuf,
    },
    /// Rewrite an author's first publication year and career ages
    CorrectAge {
        /// Directory holding the stores
        #[arg(long, default_value = "data")]
        data_dir: PathBuf,
        /// Author ID
        #[arg(long)]
        author_id: String,
        /// Verified first publication year
        #[arg(long)]
        first_year: i32,
    },
    /// Join relationships with career ages and write features
    Features {
        /// Directory holding the stores
        #[arg(long, default_value = "data")]
        data_dir: PathBuf,
        /// Output JSON-lines file
        #[arg(long)]
        output: PathBuf,
    },
}

#[derive(Debug, Clone, Copy, Default, clap::ValueEnum)]
enum ReportFormat {
    /// Human-readable Markdown
    #[default]
    Markdown,
    /// Machine-readable JSON
    Json,
}

impl From<ReportFormat> for ResponseFormat {
    fn from(format: ReportFormat) -> Self {
        match format {
            ReportFormat::Markdown => Self::Markdown,
            ReportFormat::Json => Self::Json,
        }
    }
}

fn init_tracing(log_level: &str, json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    let subscriber = tracing_subscriber::registry().with(filter);

    if json {
        subscriber.with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr)).init();
    } else {
        subscriber.with(tracing_subscriber::fmt::layer().compact().with_writer(std::io::stderr)).init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    init_tracing(&cli.log_level, cli.json_logs);

    let mut config = Config::from_env()?;
    if let Some(concurrency) = cli.concurrency {
        config.concurrency = concurrency;
    }
    if cli.seed.is_some() {
        config.seed = cli.seed;
    }
    let format = ResponseFormat::from(cli.report);

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        concurrency = config.concurrency,
        seeded = config.seed.is_some(),
        "Starting coauthor timeline"
    );

    match cli.command {
        Command::Run { targets, data_dir } => run(&config, &targets, &data_dir, true, format).await,
        Command::Derive { targets, data_dir } => run(&config, &targets, &data_dir, false, format).await,
        Command::CorrectAge { data_dir, author_id, first_year } => {
            let authors = AuthorTable::open(data_dir.join(AUTHORS_FILE)).await?;
            let remaining = authors.correct_first_year(&author_id, first_year).await?;
            authors.save().await?;
            println!("{author_id}: first year set to {first_year}, {remaining} rows remain");
            Ok(())
        }
        Command::Features { data_dir, output } => {
            let relationships = JsonlRelationshipStore::open(data_dir.join(RELATIONSHIPS_FILE)).await?;
            let authors = AuthorTable::open(data_dir.join(AUTHORS_FILE)).await?;
            let rows = features::relationship_features(
                &relationships.records().await,
                &authors.rows().await,
                config.min_valid_first_year,
            );
            features::write_features(&output, &rows)
                .await
                .with_context(|| format!("writing {}", output.display()))?;
            tracing::info!(rows = rows.len(), output = %output.display(), "Wrote features");
            Ok(())
        }
    }
}

async fn run(
    config: &Config,
    targets_path: &Path,
    data_dir: &Path,
    harvest: bool,
    format: ResponseFormat,
) -> anyhow::Result<()> {
    tokio::fs::create_dir_all(data_dir)
        .await
        .with_context(|| format!("creating {}", data_dir.display()))?;

    let entries = pipeline::load_targets(targets_path)
        .await
        .with_context(|| format!("reading targets from {}", targets_path.display()))?;
    let targets: Vec<Target> = entries.iter().map(pipeline::TargetEntry::target).collect();

    let corpus_path = data_dir.join(PUBLICATIONS_FILE);
    let mut corpus = Corpus::load(&corpus_path).await?;
    let authors = Arc::new(AuthorTable::open(data_dir.join(AUTHORS_FILE)).await?);
    let relationships = Arc::new(JsonlRelationshipStore::open(data_dir.join(RELATIONSHIPS_FILE)).await?);

    let mut careers =
        CareerResolver::new(Arc::new(corpus.clone()), config).with_overrides(pipeline::overrides(&entries));
    careers.seed(authors.known_spans().await?).await;

    if harvest {
        let client = OpenAlexClient::new(config)?;
        careers = careers.with_upstream(Arc::new(client.clone()));
        let harvester = Harvester::new(client, config)?;

        let summary = pipeline::harvest_targets(&harvester, &careers, &mut corpus, &targets, config).await;
        println!("{}", render_harvest(&summary, format));
        corpus.save(&corpus_path).await?;
    }

    let corpus = Arc::new(corpus);
    let index = Arc::new(corpus.index());
    // Harvested dates are already shuffled.
    let engine = TimelineEngine::new(index.clone(), index);
    let pipeline = Pipeline::new(
        corpus.clone(),
        engine,
        careers.with_fallback(corpus),
        relationships,
        authors.clone(),
        config,
    );

    let summary = pipeline.run_batch(&targets).await;
    authors.save().await?;
    println!("{}", render_batch(&summary, format));
    Ok(())
}
