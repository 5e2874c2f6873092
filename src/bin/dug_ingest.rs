use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use miette::IntoDiagnostic;
use tracing_subscriber::EnvFilter;

use dug_data_ingest::app::{App, RunOptions};
use dug_data_ingest::config::{ConfigLoader, LakeFsSettings};
use dug_data_ingest::domain::{BranchName, SourceName};
use dug_data_ingest::error::IngestError;
use dug_data_ingest::fetch::SubprocessFetcher;
use dug_data_ingest::lakefs::LakeFsHttpClient;
use dug_data_ingest::output::{JsonOutput, TracingSink};
use dug_data_ingest::staging::Workspace;
use dug_data_ingest::sync::RcloneSyncClient;

#[derive(Parser)]
#[command(name = "dug-ingest")]
#[command(about = "Download biomedical study metadata and sync it into a LakeFS repository")]
#[command(version, author)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Run the ingest pipeline for one source")]
    Run(RunArgs),
    #[command(about = "List configured sources")]
    Sources(SourcesArgs),
}

#[derive(Args)]
struct RunArgs {
    /// Source to ingest (heal, bdc, or one defined in the config file)
    source: String,

    /// Staging root override (defaults to /data)
    root: Option<String>,

    #[arg(long)]
    config: Option<String>,

    /// Target branch override (defaults to LAKEFS_BRANCH or main)
    #[arg(long)]
    branch: Option<String>,

    /// Reuse staged content instead of running the fetch commands
    #[arg(long)]
    skip_fetch: bool,

    /// Plan the run without fetching, syncing or committing
    #[arg(long)]
    dry_run: bool,
}

#[derive(Args)]
struct SourcesArgs {
    #[arg(long)]
    config: Option<String>,
}

fn main() -> ExitCode {
    if let Err(report) = run() {
        eprintln!("{report:?}");
        if let Some(ingest) = report.downcast_ref::<IngestError>() {
            return ExitCode::from(map_exit_code(ingest));
        }
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn map_exit_code(error: &IngestError) -> u8 {
    match error {
        IngestError::InvalidSourceName(_)
        | IngestError::InvalidRepositoryName(_)
        | IngestError::InvalidBranchName(_)
        | IngestError::InvalidLocalPath(_)
        | IngestError::UnknownSource(_)
        | IngestError::MissingEnv(_)
        | IngestError::ConfigRead(_)
        | IngestError::ConfigParse(_) => 2,
        IngestError::Fetch(_)
        | IngestError::MissingTool(_)
        | IngestError::Sync(_)
        | IngestError::LakeFsHttp(_)
        | IngestError::LakeFsStatus { .. } => 3,
        IngestError::Filesystem(_) => 1,
    }
}

fn run() -> miette::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Run(args) => run_ingest(args),
        Commands::Sources(args) => run_sources(args),
    }
}

fn run_ingest(args: RunArgs) -> miette::Result<()> {
    let source = args.source.parse::<SourceName>().into_diagnostic()?;
    let config = ConfigLoader::resolve(args.config.as_deref()).into_diagnostic()?;
    let spec = config.source(&source).into_diagnostic()?;

    let mut settings = LakeFsSettings::from_env().into_diagnostic()?;
    if let Some(branch) = args.branch {
        settings.branch = branch.parse::<BranchName>().into_diagnostic()?;
    }

    let workspace = Workspace::new(args.root.as_deref());
    let lakefs = LakeFsHttpClient::new(&settings.host, &settings.username, &settings.password)
        .into_diagnostic()?;
    let app = App::new(
        workspace,
        SubprocessFetcher::new(),
        RcloneSyncClient::new(),
        lakefs,
    );

    let options = RunOptions {
        skip_fetch: args.skip_fetch,
        dry_run: args.dry_run,
    };
    let result = app
        .run(spec, &settings, options, &TracingSink)
        .into_diagnostic()?;
    JsonOutput::print_run(&result).into_diagnostic()?;
    Ok(())
}

fn run_sources(args: SourcesArgs) -> miette::Result<()> {
    let config = ConfigLoader::resolve(args.config.as_deref()).into_diagnostic()?;
    let workspace = Workspace::new(None);
    let app = App::new(
        workspace,
        SubprocessFetcher::new(),
        RcloneSyncClient::new(),
        NopLakeFs,
    );
    let result = app.sources(&config);
    JsonOutput::print_sources(&result).into_diagnostic()?;
    Ok(())
}

struct NopLakeFs;

impl dug_data_ingest::lakefs::LakeFsClient for NopLakeFs {
    fn commit(
        &self,
        _repo: &dug_data_ingest::domain::RepositoryName,
        _branch: &dug_data_ingest::domain::BranchName,
        _message: &str,
    ) -> Result<(), IngestError> {
        Err(IngestError::LakeFsHttp(
            "LakeFS client not configured".to_string(),
        ))
    }
}
