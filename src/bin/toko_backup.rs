use std::process::ExitCode;

use camino::Utf8PathBuf;
use clap::{Args, Parser, Subcommand};
use miette::IntoDiagnostic;
use tracing_subscriber::EnvFilter;

use toko_backup::app::{Backup, BackupOptions};
use toko_backup::codes::load_code_list;
use toko_backup::config::{ConfigLoader, ConfigOverrides, ResolvedConfig};
use toko_backup::credentials::{EnvOrFile, TokenFile};
use toko_backup::delay::ThreadDelay;
use toko_backup::domain::Coordinate;
use toko_backup::error::BackupError;
use toko_backup::locator::{Locator, NearestHttpClient};
use toko_backup::output::{ConsoleOutput, JsonOutput};
use toko_backup::store::Snapshot;

#[derive(Parser)]
#[command(name = "toko-backup")]
#[command(about = "Resumable backup of store records from the nearest-stores endpoint")]
#[command(version, author)]
struct Cli {
    #[arg(long, global = true)]
    config: Option<String>,

    #[arg(long, global = true)]
    input: Option<Utf8PathBuf>,

    #[arg(long, global = true)]
    snapshot: Option<Utf8PathBuf>,

    #[arg(long, global = true)]
    token_file: Option<Utf8PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Back up every store code in the input list (default)")]
    Run,
    #[command(about = "Look up a single store code and print its details")]
    Lookup(LookupArgs),
    #[command(about = "List stores near a coordinate")]
    Nearby(NearbyArgs),
}

#[derive(Args)]
struct LookupArgs {
    code: String,

    #[arg(long, allow_negative_numbers = true)]
    lat: Option<f64>,

    #[arg(long, allow_negative_numbers = true)]
    lng: Option<f64>,

    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct NearbyArgs {
    #[arg(allow_negative_numbers = true)]
    latitude: f64,

    #[arg(allow_negative_numbers = true)]
    longitude: f64,

    #[arg(long)]
    json: bool,
}

fn main() -> ExitCode {
    if let Err(report) = run() {
        eprintln!("{report:?}");
        if let Some(err) = report.downcast_ref::<BackupError>() {
            return ExitCode::from(map_exit_code(err));
        }
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn map_exit_code(error: &BackupError) -> u8 {
    match error {
        BackupError::MissingConfig(_)
        | BackupError::ConfigRead(_)
        | BackupError::ConfigParse(_)
        | BackupError::InvalidConfig(_) => 2,
        _ => 1,
    }
}

fn run() -> miette::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let overrides = ConfigOverrides {
        input: cli.input,
        snapshot: cli.snapshot,
        token_file: cli.token_file,
    };
    let config = ConfigLoader::resolve(cli.config.as_deref(), overrides)?;

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => run_backup(&config),
        Commands::Lookup(args) => run_lookup(args, &config),
        Commands::Nearby(args) => run_nearby(args, &config),
    }
}

fn build_locator(
    config: &ResolvedConfig,
) -> miette::Result<Locator<NearestHttpClient, EnvOrFile, ThreadDelay>> {
    let client = NearestHttpClient::with_endpoint(&config.endpoint, config.timeout)?;
    let credentials = EnvOrFile::new(TokenFile::new(config.token_file.clone()));
    Ok(Locator::new(client, credentials, ThreadDelay).with_policy(config.retry))
}

fn run_backup(config: &ResolvedConfig) -> miette::Result<()> {
    let codes = load_code_list(&config.input)?;
    let locator = build_locator(config)?;
    let options = BackupOptions {
        smoke_test_code: config.smoke_test_code.clone(),
        coordinate: config.coordinate,
        pacing: config.pacing.clone(),
    };
    let backup = Backup::new(
        locator,
        Snapshot::new(config.snapshot.clone()),
        ThreadDelay,
        options,
    );
    backup.run(&codes, &ConsoleOutput)?;
    Ok(())
}

fn run_lookup(args: LookupArgs, config: &ResolvedConfig) -> miette::Result<()> {
    let locator = build_locator(config)?;
    let coordinate = Coordinate::new(
        args.lat.unwrap_or(config.coordinate.latitude),
        args.lng.unwrap_or(config.coordinate.longitude),
    );
    let outcome = locator.fetch_store(&args.code, Some(coordinate));
    if args.json {
        JsonOutput::print_lookup(&outcome).into_diagnostic()?;
    } else {
        ConsoleOutput::print_lookup(&outcome);
    }
    Ok(())
}

fn run_nearby(args: NearbyArgs, config: &ResolvedConfig) -> miette::Result<()> {
    let locator = build_locator(config)?;
    let entries = locator.search_nearby(Coordinate::new(args.latitude, args.longitude));
    if args.json {
        JsonOutput::print_nearby(&entries).into_diagnostic()?;
    } else {
        ConsoleOutput::print_nearby(&entries);
    }
    Ok(())
}
