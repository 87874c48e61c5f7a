use std::process::ExitCode;
use std::time::Duration;

use camino::Utf8PathBuf;
use clap::{ArgAction, Args, Parser, Subcommand};
use crossterm::style::Stylize;
use miette::IntoDiagnostic;
use tracing::warn;
use tracing_subscriber::EnvFilter;

use stac_harvester::catalog::CatalogWalker;
use stac_harvester::config::{DEFAULT_CONCURRENCY, DEFAULT_TIMEOUT_SECS, HarvestConfig};
use stac_harvester::convert::{convert_ndjson_to_parquet, normalize_output_path};
use stac_harvester::domain::CatalogRef;
use stac_harvester::error::HarvestError;
use stac_harvester::fetch::HttpRecordFetcher;
use stac_harvester::harvest::{Harvester, RunSummary};
use stac_harvester::output::{JsonOutput, OutputMode};
use stac_harvester::progress::{NoopProgress, ProgressBarObserver, ProgressObserver};
use stac_harvester::verify::{CountStatus, CountVerifier, VerifyReport};

#[derive(Parser)]
#[command(name = "stac-harvest")]
#[command(about = "Harvest static STAC catalogs into ndjson, check item counts, convert to Parquet")]
#[command(version)]
struct Cli {
    /// Print results as JSON on stdout
    #[arg(long, global = true)]
    json: bool,

    /// Log more (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "List child links of a STAC catalog")]
    ListCatalogChildrenUris(ListArgs),
    #[command(about = "Scrape a static STAC catalog to ndjson")]
    ScrapeCatalogToNdjson(ScrapeArgs),
    #[command(about = "Compare item counts in an ndjson file against its parent catalog")]
    CheckItemCounts(CheckArgs),
    #[command(about = "Convert ndjson files of STAC items to Parquet")]
    ParseStacNdjsonToParquet(ParquetArgs),
}

#[derive(Args)]
struct ListArgs {
    catalog_uri: String,
}

#[derive(Args)]
struct ScrapeArgs {
    catalog_uri: String,

    #[arg(short, long, default_value = "data")]
    directory: Utf8PathBuf,

    /// Suppress the progress bar
    #[arg(short, long)]
    quiet: bool,

    /// Maximum number of item requests in flight
    #[arg(short, long, default_value_t = DEFAULT_CONCURRENCY)]
    concurrency: usize,

    /// Per-request timeout in seconds
    #[arg(long, default_value_t = DEFAULT_TIMEOUT_SECS)]
    timeout: u64,
}

#[derive(Args)]
struct CheckArgs {
    file: Utf8PathBuf,
}

#[derive(Args)]
struct ParquetArgs {
    #[arg(required = true, num_args = 1..)]
    input: Vec<Utf8PathBuf>,

    output: Utf8PathBuf,
}

fn main() -> ExitCode {
    if let Err(report) = run() {
        eprintln!("{report:?}");
        if let Some(err) = report.downcast_ref::<HarvestError>() {
            return ExitCode::from(map_exit_code(err));
        }
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn map_exit_code(error: &HarvestError) -> u8 {
    match error {
        HarvestError::InvalidUri(_)
        | HarvestError::InvalidConfig(_)
        | HarvestError::Resolution(_)
        | HarvestError::EmptyFile(_) => 2,
        HarvestError::Transport { .. } | HarvestError::HttpStatus { .. } => 3,
        _ => 1,
    }
}

fn run() -> miette::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let output_mode = if cli.json {
        OutputMode::Json
    } else {
        OutputMode::Human
    };

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .into_diagnostic()?;
    runtime.block_on(run_command(cli.command, output_mode))
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(format!(
            "warn,stac_harvester={level},stac_harvest={level}"
        )))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

async fn run_command(command: Commands, output_mode: OutputMode) -> miette::Result<()> {
    match command {
        Commands::ListCatalogChildrenUris(args) => run_list(args, output_mode).await,
        Commands::ScrapeCatalogToNdjson(args) => run_scrape(args, output_mode).await,
        Commands::CheckItemCounts(args) => run_check(args, output_mode).await,
        Commands::ParseStacNdjsonToParquet(args) => run_parquet(args, output_mode).await,
    }
}

async fn run_list(args: ListArgs, output_mode: OutputMode) -> miette::Result<()> {
    let catalog: CatalogRef = args.catalog_uri.parse()?;
    let fetcher = HttpRecordFetcher::new(&HarvestConfig::default())?;
    let resolved = CatalogWalker::new(&fetcher).resolve(&catalog).await?;

    match output_mode {
        OutputMode::Json => JsonOutput::print_children(&resolved).into_diagnostic()?,
        OutputMode::Human => {
            for child in &resolved.child_links {
                println!("{child}");
            }
        }
    }
    Ok(())
}

async fn run_scrape(args: ScrapeArgs, output_mode: OutputMode) -> miette::Result<()> {
    let config = HarvestConfig::default()
        .with_concurrency(args.concurrency)?
        .with_timeout(Duration::from_secs(args.timeout))?;
    let catalog: CatalogRef = args.catalog_uri.parse()?;
    let fetcher = HttpRecordFetcher::new(&config)?;
    let harvester = Harvester::new(fetcher, config);

    let observer: Box<dyn ProgressObserver> =
        if args.quiet || matches!(output_mode, OutputMode::Json) {
            Box::new(NoopProgress)
        } else {
            Box::new(ProgressBarObserver::new())
        };

    let summary = harvester
        .harvest(&catalog, &args.directory, observer.as_ref())
        .await?;

    match output_mode {
        OutputMode::Json => JsonOutput::print_summary(&summary).into_diagnostic()?,
        OutputMode::Human => print_run_summary(&summary),
    }
    Ok(())
}

async fn run_check(args: CheckArgs, output_mode: OutputMode) -> miette::Result<()> {
    let fetcher = HttpRecordFetcher::new(&HarvestConfig::default())?;
    let report = CountVerifier::new(&fetcher).verify(&args.file).await?;

    match output_mode {
        OutputMode::Json => JsonOutput::print_verify(&report).into_diagnostic()?,
        OutputMode::Human => println!("{}", format_verify_report(&report)),
    }
    Ok(())
}

async fn run_parquet(args: ParquetArgs, output_mode: OutputMode) -> miette::Result<()> {
    let (output, renamed) = normalize_output_path(&args.output);
    if renamed {
        warn!(requested = %args.output, output = %output, "output renamed to .parquet");
        eprintln!("{}", format!("WARNING: Renaming output to {output}").yellow());
    }

    let inputs = args.input;
    let report = tokio::task::spawn_blocking(move || convert_ndjson_to_parquet(&inputs, &output))
        .await
        .into_diagnostic()??;

    match output_mode {
        OutputMode::Json => JsonOutput::print_convert(&report).into_diagnostic()?,
        OutputMode::Human => println!("Wrote {} rows to {}", report.rows, report.output),
    }
    Ok(())
}

fn print_run_summary(summary: &RunSummary) {
    if summary.total == 0 {
        println!(
            "{}",
            format!("Catalog {} has no item links, nothing written", summary.title).yellow()
        );
        return;
    }

    println!(
        "{} {}/{} items from {} into {}",
        "Harvested".green(),
        summary.succeeded,
        summary.total,
        summary.title,
        summary.output_path
    );
    if summary.failed > 0 {
        println!("{}", format!("{} items failed", summary.failed).yellow());
        for failure in &summary.failures {
            println!("  {} {}", failure.link, failure.reason.as_str().red());
        }
    }
}

fn format_verify_report(report: &VerifyReport) -> String {
    let status = match report.status {
        CountStatus::Ok => "OK".green().to_string(),
        CountStatus::Mismatch => "MISMATCH".red().to_string(),
    };
    [
        report.file.to_string(),
        report.catalog.clone(),
        status,
        report.item_count.to_string(),
        report.line_count.to_string(),
    ]
    .join(" | ")
}
