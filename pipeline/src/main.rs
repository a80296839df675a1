//! Job search CLI
//!
//! Fetches listings from the provider, prints them as a table and saves
//! them to data/jobs.json (and optionally a CSV file).

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use pipeline::{
    export_csv, export_json, import_json, matching, telemetry, within_dates, Aggregator, Column,
    Credentials, Direction, FetcherConfig, JobRecord, JobSource, SearchQuery, MAX_MAX_RESULTS,
};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "jobs", version, about = "Search job listings and save them")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Fetch the first page of listings, print and save them
    Search(SearchArgs),
    /// Print only the total number of matching listings
    Count(CountArgs),
    /// Print listings from a previously saved JSON file
    Show(ShowArgs),
}

#[derive(Args)]
struct CredentialArgs {
    #[arg(long, env = "ADZUNA_APP_ID", hide_env_values = true)]
    app_id: Option<String>,

    #[arg(long, env = "ADZUNA_API_KEY", hide_env_values = true)]
    api_key: Option<String>,
}

#[derive(Args)]
struct QueryArgs {
    /// What to search for [default: python]
    #[arg(long, short)]
    term: Option<String>,

    /// Where to search [default: UK]
    #[arg(long, short)]
    location: Option<String>,
}

#[derive(Args)]
struct ViewArgs {
    /// Sort by column (date, title, company, location, type, salary, url); repeat for tie-breakers
    #[arg(long = "sort", value_name = "COLUMN")]
    sort: Vec<Column>,

    /// Sort descending instead of ascending
    #[arg(long)]
    desc: bool,

    /// Only show listings posted on or after this date (YYYY-MM-DD)
    #[arg(long)]
    from: Option<NaiveDate>,

    /// Only show listings posted on or before this date (YYYY-MM-DD)
    #[arg(long)]
    to: Option<NaiveDate>,

    /// Only show listings whose COLUMN contains TEXT, e.g. `title=senior`
    #[arg(long, value_name = "COLUMN=TEXT", value_parser = parse_filter)]
    filter: Option<(Column, String)>,
}

#[derive(Args)]
struct SearchArgs {
    #[command(flatten)]
    credentials: CredentialArgs,

    #[command(flatten)]
    query: QueryArgs,

    /// Keep at most this many listings (1-500)
    #[arg(long, short = 'n', allow_negative_numbers = true)]
    max_results: Option<i64>,

    #[command(flatten)]
    view: ViewArgs,

    /// Where to save the JSON export
    #[arg(long, default_value = "data/jobs.json")]
    out: PathBuf,

    /// Also save a CSV export here
    #[arg(long)]
    csv: Option<PathBuf>,
}

#[derive(Args)]
struct CountArgs {
    #[command(flatten)]
    credentials: CredentialArgs,

    #[command(flatten)]
    query: QueryArgs,
}

#[derive(Args)]
struct ShowArgs {
    /// JSON file written by `jobs search`
    path: PathBuf,

    #[command(flatten)]
    view: ViewArgs,
}

fn parse_filter(raw: &str) -> Result<(Column, String), String> {
    let (column, text) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected COLUMN=TEXT, got {raw:?}"))?;
    let column = column.parse::<Column>().map_err(|e| e.to_string())?;
    Ok((column, text.to_string()))
}

impl CredentialArgs {
    fn resolve(self) -> Result<Credentials> {
        Credentials::resolve(self.app_id, self.api_key)
            .context("API credentials not found; pass --app-id/--api-key or set them in the environment")
    }
}

impl ViewArgs {
    /// Sorts the aggregate in place and returns the filtered rows to print.
    fn apply(&self, aggregator: &mut Aggregator) -> Vec<JobRecord> {
        if !self.sort.is_empty() {
            let direction = if self.desc {
                Direction::Descending
            } else {
                Direction::Ascending
            };
            let keys: Vec<_> = self.sort.iter().map(|&column| (column, direction)).collect();
            aggregator.sort_by_keys(&keys);
        }

        let rows = within_dates(aggregator.current(), self.from, self.to);
        match &self.filter {
            Some((column, text)) => matching(&rows, *column, text),
            None => rows,
        }
    }
}

fn main() -> Result<()> {
    telemetry::init();

    match Cli::parse().command {
        Command::Search(args) => search(args),
        Command::Count(args) => count(args),
        Command::Show(args) => show(args),
    }
}

fn search(args: SearchArgs) -> Result<()> {
    let credentials = args.credentials.resolve()?;
    let config = FetcherConfig::from_env()?;
    let query = SearchQuery::build(
        args.query.term.as_deref(),
        args.query.location.as_deref(),
        args.max_results,
    );

    println!(
        "🔍 Fetching jobs for '{}' in {} (max {})...\n",
        query.term(),
        query.location(),
        query.max_results()
    );

    let source = JobSource::new(&config).context("Failed to set up the provider client")?;
    let records = source
        .search(&credentials, &query)
        .context("Failed to fetch jobs")?;

    if records.is_empty() {
        println!("📭 No jobs found for this search");
        return Ok(());
    }

    let fetched = records.len();
    let mut aggregator = Aggregator::new();
    aggregator.replace(records, query.max_results());
    println!("✅ Fetched {} jobs, keeping {}\n", fetched, aggregator.len());

    let rows = args.view.apply(&mut aggregator);
    print_table(&rows);

    ensure_parent_dir(&args.out)?;
    export_json(aggregator.current(), &args.out)
        .with_context(|| format!("Failed to write {}", args.out.display()))?;
    println!("\n💾 Saved {} jobs to {:?}", aggregator.len(), args.out);

    if let Some(csv_path) = &args.csv {
        ensure_parent_dir(csv_path)?;
        export_csv(aggregator.current(), csv_path)
            .with_context(|| format!("Failed to write {}", csv_path.display()))?;
        println!("💾 Saved CSV to {:?}", csv_path);
    }

    Ok(())
}

fn count(args: CountArgs) -> Result<()> {
    let credentials = args.credentials.resolve()?;
    let config = FetcherConfig::from_env()?;
    let query = SearchQuery::build(args.query.term.as_deref(), args.query.location.as_deref(), None);

    let source = JobSource::new(&config).context("Failed to set up the provider client")?;
    let total = source
        .count(&credentials, &query)
        .context("Failed to fetch the job count")?;

    println!("📊 Total jobs for '{}' in {}: {}", query.term(), query.location(), total);
    Ok(())
}

fn show(args: ShowArgs) -> Result<()> {
    let records = import_json(&args.path)
        .with_context(|| format!("Failed to load {}", args.path.display()))?;
    let mut aggregator = Aggregator::new();
    let total = aggregator.replace(records, MAX_MAX_RESULTS).len();

    let rows = args.view.apply(&mut aggregator);
    print_table(&rows);
    println!("\n📊 Showing {} of {} jobs", rows.len(), total);
    Ok(())
}

fn ensure_parent_dir(path: &Path) -> Result<()> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        if !dir.exists() {
            fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create directory {}", dir.display()))?;
            println!("📁 Created {:?}", dir);
        }
    }
    Ok(())
}

fn print_table(rows: &[JobRecord]) {
    for (idx, job) in rows.iter().enumerate() {
        println!(
            "{:>3}. {} | {} at {} | {} | {} | {}",
            idx + 1,
            job.posted_date,
            job.title,
            job.company,
            job.location,
            job.contract_type,
            job.salary_display
        );
        if let Some(link) = job.link() {
            println!("     🔗 {}", link);
        }
    }
}
