//! `tfx-cron`: scheduled refresh of translation package archives.
//!
//! Meant to be run from a scheduler every few minutes. Each invocation
//! rebuilds at most one archive, so a catalog of any size is refreshed a
//! little at a time.

mod builder;
mod error;

use crate::builder::CommandBuilder;
use crate::error::{ErrorKind, Result};
use clap::{Parser, Subcommand};
use exn::ResultExt;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tfx_catalog::{Database, ProjectIds, Repository};
use tfx_config::Settings;
use tfx_packages::{
    BuildOptions, CREATE_PACKAGES_CONTEXT, CacheConfig, CacheDays, Job, JobOutcome, SystemClock,
    normalize_project_ids,
};
use tfx_storage::BackendHandle;
use tfx_storage::backend::LocalBackend;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "tfx-cron")]
#[command(about = "Refresh translation package archives", version)]
struct Cli {
    /// Configuration file (TOML, YAML or JSON; default: platform config dir)
    #[arg(long, short = 'c', global = true)]
    config: Option<PathBuf>,

    /// Only consider this project (repeatable; replaces `projects_ids` from the configuration)
    #[arg(long = "project", short = 'p', global = true)]
    projects: Vec<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Handle a scheduler trigger; anything but the packages context is ignored
    Trigger {
        /// Scheduler context name
        context: String,
    },

    /// Rebuild the next archive that is due
    Run,

    /// Show where every candidate stands, without changing anything
    Status,
}

fn main() -> ExitCode {
    // Before anything spawns a thread, while the local offset can still be read.
    let clock = SystemClock::new();
    init_tracing();
    let cli = Cli::parse();
    match run(cli, clock) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            let kind: &ErrorKind = &e;
            tracing::error!(error = %kind, "Refresh failed");
            eprintln!("{e:?}");
            ExitCode::FAILURE
        },
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,sqlx=warn"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).with_target(true).with_writer(std::io::stderr).try_init();
}

fn run(cli: Cli, clock: SystemClock) -> Result<()> {
    if let Commands::Trigger { context } = &cli.command
        && context != CREATE_PACKAGES_CONTEXT
    {
        // Not ours: don't so much as open the catalog.
        tracing::debug!(context = %context, "Ignoring trigger for another context");
        return Ok(());
    }
    let settings = Settings::load(cli.config.as_deref()).or_raise(|| ErrorKind::Config)?;
    let runtime = tokio::runtime::Builder::new_current_thread().enable_all().build().or_raise(|| ErrorKind::Runtime)?;
    runtime.block_on(execute(cli, settings, clock))
}

async fn execute(cli: Cli, settings: Settings, clock: SystemClock) -> Result<()> {
    let database = settings.database_path().or_raise(|| ErrorKind::Config)?;
    let db = Database::connect(&database).await.or_raise(|| ErrorKind::Catalog)?;
    let job = job(&settings, &cli.projects, Arc::new(Repository::from(&db)))?.with_clock(clock);

    let result = match &cli.command {
        Commands::Trigger { context } => job.on_cron_create(context).await.map(report),
        Commands::Run => job.on_cron_create(CREATE_PACKAGES_CONTEXT).await.map(report),
        Commands::Status => job.status().await.map(|inspections| {
            for inspection in inspections {
                let record = inspection.record;
                let due = if inspection.state.needs_rebuild() { "*" } else { " " };
                println!("{due} {:>6}  {:<8}  {}", record.project_id, record.language, inspection.state);
            }
        }),
    };
    db.close().await;
    result.or_raise(|| ErrorKind::Job)
}

/// Assemble the job from settings. Command-line project IDs win over the
/// configured ones.
fn job(settings: &Settings, projects: &[String], catalog: Arc<Repository>) -> Result<Job> {
    let archives_dir = settings.archives_dir().or_raise(|| ErrorKind::Config)?;
    let errors_dir = settings.errors_dir().or_raise(|| ErrorKind::Config)?;
    let archives: BackendHandle =
        Arc::new(LocalBackend::new("archives", &archives_dir).or_raise(|| ErrorKind::Storage)?);
    let errors: BackendHandle = Arc::new(LocalBackend::new("errors", &errors_dir).or_raise(|| ErrorKind::Storage)?);

    let options = build_options(settings, archives_dir.clone());
    let cache = CacheConfig::new(options.cache_days, archives, errors);
    let builder = Arc::new(CommandBuilder::new(&settings.builder.program, settings.builder.args.clone()));

    let job = Job::new(catalog, builder, cache, options).with_projects(project_filter(settings, projects));
    Ok(if settings.lock { job.with_lock(archives_dir) } else { job })
}

fn build_options(settings: &Settings, archives_folder: PathBuf) -> BuildOptions {
    BuildOptions {
        username: settings.username.clone(),
        password: settings.password.clone(),
        url: settings.api_url.clone(),
        cache_days: CacheDays::new(settings.cache_days),
        tmp_path: settings.tmp_path.clone(),
        archives_folder,
        include_lang_name: settings.include_lang_name,
    }
}

fn project_filter(settings: &Settings, projects: &[String]) -> ProjectIds {
    if projects.is_empty() {
        normalize_project_ids(&settings.projects_ids)
    } else {
        normalize_project_ids(projects)
    }
}

fn report(outcome: JobOutcome) {
    match outcome {
        JobOutcome::Ignored => (),
        JobOutcome::Locked => println!("another run is in progress"),
        JobOutcome::NothingToDo => println!("all archives are up to date"),
        JobOutcome::Built { record, archive } => {
            println!("built {} ({} {})", archive.display(), record.project_id, record.language)
        },
        JobOutcome::Quarantined { record, reason } => {
            println!("quarantined {} {}: {reason}", record.project_id, record.language)
        },
    }
}
