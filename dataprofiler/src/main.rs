//! Command-line data profiler.
//!
//! Profiles a delimited file or a database table column by column and
//! appends the results to a SQLite profiling log. Database access uses
//! credentials stored beforehand as Argon2id hashes; the password is
//! prompted for at run time and verified before any connection is made.
//!
//! # Security Guarantees
//! - Only password hashes are written to the credential database
//! - Passwords are read without echo and never logged
//! - Connection strings never appear in output or errors

use clap::{Args, Parser, Subcommand};
use dataprofiler_core::{
    BackendKind, CredentialStore, DriverRegistry, FileOptions, ProfileLog, Profiler,
    ProfilerError, Result, SourceType, SqliteStore,
    config::CredentialSettings,
    logging::{LogFormat, init_logging_with_format},
};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;
use zeroize::Zeroizing;

#[derive(Debug, Parser)]
#[command(name = "dataprofiler")]
#[command(about = "Column-level profiling for CSV files and database tables")]
#[command(version)]
#[command(long_about = "
Data Profiler - column type inference and descriptive statistics

Each column of the source is classified as number, string, datetime or
unknown and summarised with min/max style statistics. Results are printed as
JSON and appended to the profiling log.

SUPPORTED DATABASES:
- PostgreSQL
- IBM DB2 and Oracle (connection descriptors only; no native driver in this build)

EXAMPLES:
  dataprofiler file sales.csv
  dataprofiler file export.tsv --delimiter '\\t' --parse-dates
  dataprofiler store-credentials
  dataprofiler database postgres --table public.orders
  dataprofiler log --run 3f2a...
")]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Profile a delimited file with a header row
    File(FileArgs),
    /// Profile a database table using stored credentials
    Database(DatabaseArgs),
    /// Store credentials from DB_* environment variables (or .env)
    StoreCredentials,
    /// Print logged profiling records as JSON
    Log(LogArgs),
}

impl Command {
    fn source_type(&self) -> Option<SourceType> {
        match self {
            Self::File(_) => Some(SourceType::File),
            Self::Database(_) => Some(SourceType::Database),
            Self::StoreCredentials | Self::Log(_) => None,
        }
    }
}

#[derive(Debug, Args)]
pub struct FileArgs {
    /// Path to the file to profile
    pub path: PathBuf,

    /// Field delimiter
    #[arg(long, default_value = ",", value_parser = parse_delimiter)]
    pub delimiter: char,

    /// Interpret date-like text as timestamps
    #[arg(long)]
    pub parse_dates: bool,
}

#[derive(Debug, Args)]
pub struct DatabaseArgs {
    /// Backend kind: db2, oracle or postgres
    pub kind: String,

    /// Table to profile, optionally schema-qualified
    #[arg(long)]
    pub table: String,
}

#[derive(Debug, Args)]
pub struct LogArgs {
    /// Only show records from this run
    #[arg(long)]
    pub run: Option<Uuid>,
}

#[derive(Debug, Args)]
pub struct GlobalArgs {
    /// Increase verbosity
    #[arg(
        short,
        long,
        global = true,
        action = clap::ArgAction::Count,
        help = "Increase verbosity (-v, -vv)"
    )]
    pub verbose: u8,

    /// Suppress output
    #[arg(short, long, global = true, help = "Suppress all output except errors")]
    pub quiet: bool,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    pub log_json: bool,

    /// Credential database path
    #[arg(
        long,
        global = true,
        env = "DATAPROFILER_CREDENTIALS_DB",
        default_value = "database_credentials.db"
    )]
    pub credentials_db: PathBuf,

    /// Profiling log database path
    #[arg(
        long,
        global = true,
        env = "DATAPROFILER_PROFILE_DB",
        default_value = "data_profiling.db"
    )]
    pub profile_db: PathBuf,
}

/// Accepts a single character, with `\t` as an escape for tab.
fn parse_delimiter(value: &str) -> std::result::Result<char, String> {
    if value == "\\t" {
        return Ok('\t');
    }
    let mut chars = value.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Ok(c),
        _ => Err(format!("expected a single character, got '{}'", value)),
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    load_dotenv();

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            return if e.use_stderr() {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            };
        }
    };

    let format = if cli.global.log_json {
        LogFormat::Json
    } else {
        LogFormat::Text
    };
    if let Err(e) = init_logging_with_format(cli.global.verbose, cli.global.quiet, format) {
        eprintln!("Warning: {}", e);
    }

    match run(&cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            let mut cause = std::error::Error::source(&e);
            while let Some(inner) = cause {
                debug!("Caused by: {}", inner);
                cause = inner.source();
            }
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn load_dotenv() {
    match dotenvy::dotenv() {
        Ok(path) => debug!("Loaded environment from {}", path.display()),
        Err(e) if e.not_found() => {}
        Err(e) => eprintln!("Warning: failed to load .env: {}", e),
    }
}

async fn run(cli: &Cli) -> Result<()> {
    if let Some(source_type) = cli.command.source_type() {
        info!("Profiling {} source", source_type);
    }

    match &cli.command {
        Command::File(args) => profile_file(args, &cli.global).await,
        Command::Database(args) => profile_database(args, &cli.global).await,
        Command::StoreCredentials => store_credentials(&cli.global).await,
        Command::Log(args) => show_log(args, &cli.global).await,
    }
}

async fn profile_file(args: &FileArgs, global: &GlobalArgs) -> Result<()> {
    let options = FileOptions::default()
        .with_delimiter(args.delimiter)?
        .with_parse_dates(args.parse_dates);

    let log = SqliteStore::open(&global.profile_db).await?;
    let profiler = Profiler::new(Arc::new(log.clone()));

    let result = profiler.profile_file(&args.path, &options).await;
    log.close().await;

    print_json(&result?)
}

async fn profile_database(args: &DatabaseArgs, global: &GlobalArgs) -> Result<()> {
    let kind: BackendKind = args.kind.parse()?;

    let credential_db = SqliteStore::open(&global.credentials_db).await?;
    let credentials = CredentialStore::new(Arc::new(credential_db.clone()));

    // An unknown kind must not leave a fresh profiling log behind
    if let Err(e) = credentials.lookup(kind).await {
        credential_db.close().await;
        return Err(e);
    }

    let profile_db = match SqliteStore::open(&global.profile_db).await {
        Ok(store) => store,
        Err(e) => {
            credential_db.close().await;
            return Err(e);
        }
    };
    let profiler = Profiler::new(Arc::new(profile_db.clone()));

    let prompt = || prompt_password(kind);
    let result = profiler
        .profile_database(
            &credentials,
            kind,
            &args.table,
            &prompt,
            &DriverRegistry::with_defaults(),
        )
        .await;

    credential_db.close().await;
    profile_db.close().await;

    print_json(&result?)
}

async fn store_credentials(global: &GlobalArgs) -> Result<()> {
    let settings = CredentialSettings::from_env()?;

    let credential_db = SqliteStore::open(&global.credentials_db).await?;
    let credentials = CredentialStore::new(Arc::new(credential_db.clone()));
    let result = credentials.store(&settings.spec, &settings.password).await;
    credential_db.close().await;
    result?;

    println!("Stored credentials for {}", settings.spec);
    Ok(())
}

async fn show_log(args: &LogArgs, global: &GlobalArgs) -> Result<()> {
    if !global.profile_db.exists() {
        warn!(
            "Profiling log {} does not exist yet",
            global.profile_db.display()
        );
    }

    let log = SqliteStore::open(&global.profile_db).await?;
    let records = match args.run {
        Some(run_id) => log.records_for_run(run_id).await,
        None => log.records().await,
    };
    log.close().await;

    print_json(&records?)
}

fn prompt_password(kind: BackendKind) -> Result<Zeroizing<String>> {
    rpassword::prompt_password(format!("Enter password for {}: ", kind))
        .map(Zeroizing::new)
        .map_err(|e| ProfilerError::configuration(format!("Failed to read password: {}", e)))
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).map_err(|e| ProfilerError::Serialization {
        context: "profiling output".to_string(),
        source: e,
    })?;
    println!("{}", json);
    Ok(())
}
