//! Veille CLI
//!
//! One invocation performs one pass and exits. Scheduling (cron, systemd
//! timer) is external and must not start overlapping runs.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use veille::{
    error::Result,
    models::Config,
    pipeline::{self, RunOptions, RunReport},
    services::{
        ApiSearch, DisabledNotifier, EmailNotifier, MailCredentials, Notifier, PageSource,
        ProjectSource,
    },
    storage::SeenStore,
    utils::http,
};

/// Veille - keyword watch on environmental-administration sources
#[derive(Parser, Debug)]
#[command(
    name = "veille",
    version,
    about = "Emails new keyword matches from environmental-administration sources"
)]
struct Cli {
    /// Directory holding config.toml and the previous-results files
    #[arg(short, long, default_value = "storage")]
    storage_dir: PathBuf,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Fetch and compare only; send nothing, write nothing
    #[arg(long, global = true)]
    dry_run: bool,

    /// Exit non-zero when a source could not be fetched at all
    #[arg(long, global = true)]
    strict: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Watch the configured HTML page
    Page,

    /// Watch the projets-environnement record search API
    Projects,

    /// Run both pipelines, page first
    All,

    /// Validate configuration and mail credentials
    Validate,

    /// Show previous-results files
    Info,
}

/// Initialize logging based on verbosity flag.
fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .target(env_logger::Target::Stdout)
        .init();
}

/// Main entry point for the CLI application.
#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config_path = cli.storage_dir.join("config.toml");
    let config = Config::load_or_default(&config_path);
    log::debug!("Loaded configuration from {}", config_path.display());

    let outcome = match cli.command {
        Command::Validate => return validate(&config),
        Command::Info => {
            info(&config, &cli.storage_dir).await;
            return ExitCode::SUCCESS;
        }
        Command::Page | Command::Projects | Command::All => watch(&cli, &config).await,
    };

    match outcome {
        Ok(true) if cli.strict => ExitCode::FAILURE,
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("Run aborted: {}", e);
            if cli.strict {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            }
        }
    }
}

/// Run the selected pipelines. Returns whether any of them failed outright.
async fn watch(cli: &Cli, config: &Config) -> Result<bool> {
    config.validate()?;

    let client = http::create_client(&config.http)?;
    let notifier = build_notifier(config, cli.dry_run);
    let run_page = matches!(cli.command, Command::Page | Command::All);
    let run_projects = matches!(cli.command, Command::Projects | Command::All);

    let mut failed = false;

    if run_page {
        failed |= settle(
            &config.page.name,
            watch_page(config, &client, &cli.storage_dir, notifier.as_ref(), cli.dry_run).await,
        );
    }
    if run_projects {
        failed |= settle(
            &config.projects.name,
            watch_projects(config, &client, &cli.storage_dir, notifier.as_ref(), cli.dry_run)
                .await,
        );
    }

    log::info!("Done!");
    Ok(failed)
}

/// Validate credentials once; without them only the notification step fails.
fn build_notifier(config: &Config, dry_run: bool) -> Box<dyn Notifier> {
    match MailCredentials::from_env().and_then(|c| EmailNotifier::new(&config.mail, c)) {
        Ok(notifier) => Box::new(notifier),
        Err(e) => {
            if !dry_run {
                log::warn!("Email notifications disabled: {}", e);
            }
            Box::new(DisabledNotifier::new(e))
        }
    }
}

async fn watch_page(
    config: &Config,
    client: &reqwest::Client,
    storage_dir: &Path,
    notifier: &dyn Notifier,
    dry_run: bool,
) -> Result<RunReport> {
    let source = PageSource::new(client.clone(), &config.page, config.active_keywords())?;
    let store = SeenStore::new(storage_dir, &config.page.state_file);
    let options = RunOptions {
        name: config.page.name.clone(),
        headline: config.page.headline.clone(),
        retention: config.page.retention,
        dry_run,
    };

    Ok(pipeline::run_pipeline(&source, &store, notifier, &options).await)
}

async fn watch_projects(
    config: &Config,
    client: &reqwest::Client,
    storage_dir: &Path,
    notifier: &dyn Notifier,
    dry_run: bool,
) -> Result<RunReport> {
    let search = ApiSearch::new(client.clone(), &config.projects)?;
    let source = ProjectSource::new(
        search,
        config.active_keywords(),
        config.projects.detail_url_template.as_str(),
    );
    let store = SeenStore::new(storage_dir, &config.projects.state_file);
    let options = RunOptions {
        name: config.projects.name.clone(),
        headline: config.projects.headline.clone(),
        retention: config.projects.retention,
        dry_run,
    };

    Ok(pipeline::run_pipeline(&source, &store, notifier, &options).await)
}

/// Log a pipeline's outcome. Returns true if its source failed outright.
fn settle(name: &str, outcome: Result<RunReport>) -> bool {
    match outcome {
        Ok(report) => {
            log::info!(
                "{}: {} found, {} new, notification {:?}, saved: {}",
                name,
                report.found,
                report.new_findings.len(),
                report.notification,
                report.persisted
            );
            for (keyword, error) in &report.keyword_failures {
                log::warn!("{}: keyword '{}' failed: {}", name, keyword, error);
            }
            report.source_failed()
        }
        Err(e) => {
            log::error!("{}: could not start: {}", name, e);
            true
        }
    }
}

fn validate(config: &Config) -> ExitCode {
    log::info!("Validating configuration...");

    if let Err(e) = config.validate() {
        log::error!("Config validation failed: {}", e);
        return ExitCode::FAILURE;
    }
    log::info!("✓ Config OK ({} keywords)", config.active_keywords().len());

    match MailCredentials::from_env() {
        Ok(creds) => log::info!("✓ Mail credentials OK ({} → {})", creds.sender, creds.recipient),
        Err(e) => {
            log::error!("Mail credentials invalid: {}", e);
            return ExitCode::FAILURE;
        }
    }

    log::info!("All validations passed!");
    ExitCode::SUCCESS
}

async fn info(config: &Config, storage_dir: &Path) {
    log::info!("Storage directory: {}", storage_dir.display());

    for (name, file) in [
        (&config.page.name, &config.page.state_file),
        (&config.projects.name, &config.projects.state_file),
    ] {
        let store = SeenStore::new(storage_dir, file);
        match store.try_load().await {
            Ok(Some(seen)) => log::info!(
                "{}: {} known results in {}",
                name,
                seen.len(),
                store.path().display()
            ),
            Ok(None) => log::info!("{}: no previous results yet", name),
            Err(e) => log::warn!("{}: unreadable {}: {}", name, store.path().display(), e),
        }
    }
}
