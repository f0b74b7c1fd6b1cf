use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use family_records::config::LOG_ENV;
use family_records::{create_database, Credentials, ReportEngine, ReportKind, Settings, Store};

#[derive(Parser)]
#[command(
    name = "family-records",
    version,
    about = "Load family records into SQLite and print account reports"
)]
struct Cli {
    /// SQLite database file
    #[arg(long, global = true)]
    database: Option<PathBuf>,

    /// Directory scanned by create-database
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Log debug output to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct Login {
    /// Email or telephone number
    #[arg(long)]
    login: String,

    /// Password to account
    #[arg(long)]
    password: String,
}

impl From<Login> for Credentials {
    fn from(login: Login) -> Self {
        Credentials::new(login.login, login.password)
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Create database from data folder
    #[command(alias = "create_database")]
    CreateDatabase,

    /// Print the total number of valid accounts
    PrintAllAccounts(Login),

    /// Print information about the account with the longest existence
    PrintOldestAccount(Login),

    /// Print children grouped by age
    GroupByAge(Login),

    /// Print information about your own children
    PrintChildren(Login),

    /// Print users with children of the same age as at least one own child
    FindSimilarChildrenByAge(Login),
}

fn main() {
    let cli = Cli::parse();

    if let Err(error) = init_tracing(cli.verbose) {
        eprintln!("family-records: {error:#}");
        std::process::exit(1);
    }

    if let Err(error) = run(cli) {
        tracing::debug!(error = ?error, "command failed");
        eprintln!("family-records: {error:#}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let settings = Settings::with_overrides(cli.data_dir, cli.database);

    let (kind, login) = match cli.command {
        Commands::CreateDatabase => {
            let summary = create_database(&settings).with_context(|| {
                format!("failed to ingest {}", settings.data_dir.display())
            })?;
            println!(
                "Created database {}: {} accounts, {} children",
                settings.database_path.display(),
                summary.accounts,
                summary.children
            );
            return Ok(());
        }
        Commands::PrintAllAccounts(login) => (ReportKind::CountAccounts, login),
        Commands::PrintOldestAccount(login) => (ReportKind::OldestAccount, login),
        Commands::GroupByAge(login) => (ReportKind::GroupChildrenByAge, login),
        Commands::PrintChildren(login) => (ReportKind::ListOwnChildren, login),
        Commands::FindSimilarChildrenByAge(login) => (ReportKind::FindSimilarChildrenByAge, login),
    };

    let store = Store::new(&settings.database_path);
    let outcome = ReportEngine::new(&store).run(kind, &login.into())?;
    println!("{outcome}");

    Ok(())
}

fn init_tracing(verbose: bool) -> Result<()> {
    let level = if verbose { "debug" } else { "warn" };

    let filter = tracing_subscriber::EnvFilter::try_from_env(LOG_ENV)
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|error| anyhow::anyhow!("failed to initialize tracing subscriber: {error}"))?;

    Ok(())
}
