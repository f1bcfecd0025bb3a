use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::{Args, Parser, Subcommand};
use iso_scraper::apis::Registry;
use iso_scraper::config::Config;
use iso_scraper::infra::document_source::FileSource;
use iso_scraper::logging;
use iso_scraper::pipeline::session::Query;
use iso_scraper::types::{DataType, QueryOptions};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "iso_scraper")]
#[command(about = "Parse and normalize ISO grid data documents")]
#[command(version)]
struct Cli {
    /// TOML config with logging settings and per-source label overrides
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse a fetched document and print one JSON record per line
    Parse {
        #[command(flatten)]
        query: QueryArgs,
        /// Document file, or a directory holding documents under their file names
        #[arg(long)]
        input: PathBuf,
    },
    /// List registered sources and the documents they publish
    Sources,
    /// Show which document a query needs
    Request {
        #[command(flatten)]
        query: QueryArgs,
    },
}

#[derive(Args)]
struct QueryArgs {
    /// Source id, e.g. ERCOT or MISO
    #[arg(long)]
    source: String,
    /// load, gen, trade or frequency
    #[arg(long)]
    data: DataType,
    /// Most recent snapshot
    #[arg(long, conflicts_with_all = ["start_at", "end_at"])]
    latest: bool,
    /// Range start (RFC 3339)
    #[arg(long, requires = "end_at")]
    start_at: Option<DateTime<Utc>>,
    /// Range end (RFC 3339)
    #[arg(long, requires = "start_at")]
    end_at: Option<DateTime<Utc>>,
}

impl QueryArgs {
    fn options(&self) -> QueryOptions {
        QueryOptions {
            data: self.data,
            latest: self.latest,
            start_at: self.start_at,
            end_at: self.end_at,
        }
    }
}

fn run_parse(registry: &Registry, query: &QueryArgs, input: &Path) -> Result<()> {
    let span = tracing::info_span!("parse", source = %query.source, data = %query.data);
    let _enter = span.enter();

    let adapter = registry.get(&query.source)?;
    let planned = Query::new(adapter, &query.options())?;
    let fetched = if input.is_dir() {
        planned.fetch(&FileSource::new(input))?
    } else {
        let bytes = fs::read(input).with_context(|| format!("reading {}", input.display()))?;
        planned.with_document(bytes)
    };

    let records = match fetched.parse() {
        Ok(records) => records,
        Err(e) if e.is_empty_result() => {
            warn!(error = %e, "no data available");
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    };

    let stdout = io::stdout();
    let mut out = stdout.lock();
    for record in &records {
        writeln!(out, "{}", serde_json::to_string(record)?)?;
    }
    info!(records = records.len(), "done");
    Ok(())
}

fn run_sources(registry: &Registry) -> Result<()> {
    for id in registry.list_sources() {
        let adapter = registry.get(id)?;
        let profile = adapter.profile();
        println!("{} ({}, {})", id, profile.ba_name, profile.tz.name());
        for doc in adapter.documents() {
            let data: Vec<&str> = doc.data_types().iter().map(DataType::as_str).collect();
            println!(
                "  {:<26} {:<6} {:<34} {}",
                doc.id,
                doc.retrieval.as_str(),
                doc.file_name,
                if data.is_empty() { "-".to_string() } else { data.join(",") }
            );
        }
    }
    Ok(())
}

fn run_request(registry: &Registry, query: &QueryArgs) -> Result<()> {
    let adapter = registry.get(&query.source)?;
    let planned = Query::new(adapter, &query.options())?;
    let request = planned.request();
    println!("{}", request);
    println!("file: {}", request.file_name);
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = Config::load(cli.config.as_deref()).context("loading configuration")?;
    logging::init_logging(&config.logging);
    let registry = Registry::from_config(&config);

    match &cli.command {
        Commands::Parse { query, input } => run_parse(&registry, query, input),
        Commands::Sources => run_sources(&registry),
        Commands::Request { query } => run_request(&registry, query),
    }
}
