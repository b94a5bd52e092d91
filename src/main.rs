use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand, ValueEnum};
use github_hook_manager::config::{
    ConfigPersistence, HookConfigStore, MemoryPersistence, TomlFilePersistence,
};
use github_hook_manager::github::{GitHubPushTrigger, GitHubRepository};
use github_hook_manager::identity::{Ed25519Identity, InstanceIdentity};
use github_hook_manager::reregister::FailurePolicy;
use github_hook_manager::runtime::{
    ConfiguredJob, JobDefinition, JobsFile, PushTrigger, ServerInstance,
};
use github_hook_manager::validator::{HookUrlValidator, ValidationResult};
use github_hook_manager::{rest_api, HookManager, ManagerSettings};
use reqwest::Url;
use tracing::{info, warn, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the webhook endpoint and admin API
    Run(RunArgs),
    /// Probe a hook URL and report whether it reaches this instance
    CheckUrl(CheckUrlArgs),
    /// Print this instance's identity fingerprint
    Fingerprint(IdentityArgs),
    /// Show version information
    Version,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Parser, Debug)]
struct IdentityArgs {
    /// PKCS#8 PEM file holding the instance identity key, created if missing
    #[arg(long, env = "HOOK_MANAGER_IDENTITY_KEY", default_value = "identity.pem")]
    identity_key: PathBuf,
}

#[derive(Parser, Debug)]
struct RunArgs {
    /// Address to listen on
    #[arg(long, env = "HOOK_MANAGER_LISTEN", default_value = "0.0.0.0:8080")]
    listen: SocketAddr,

    /// Public root URL of this server; the default hook URL is derived from it
    #[arg(long, env = "HOOK_MANAGER_ROOT_URL")]
    root_url: Option<Url>,

    /// TOML file holding the hook configuration; kept in memory when unset
    #[arg(long, env = "HOOK_MANAGER_CONFIG_FILE")]
    config_file: Option<PathBuf>,

    #[command(flatten)]
    identity: IdentityArgs,

    /// TOML file listing the jobs to manage hooks for
    #[arg(long, env = "HOOK_MANAGER_JOBS_FILE")]
    jobs_file: Option<PathBuf>,

    /// Hook URL probe timeout
    #[arg(long, env = "HOOK_MANAGER_PROBE_TIMEOUT_SECS", default_value_t = 10)]
    probe_timeout_secs: u64,

    /// What a re-registration pass does when a job fails: abort or continue
    #[arg(long, env = "HOOK_MANAGER_FAILURE_POLICY", default_value = "abort")]
    failure_policy: FailurePolicy,

    /// Allow administrators to override the derived hook URL
    #[arg(
        long,
        env = "HOOK_MANAGER_ALLOW_HOOK_URL_OVERRIDE",
        default_value_t = true,
        action = clap::ArgAction::Set
    )]
    allow_hook_url_override: bool,

    #[arg(long, env = "HOOK_MANAGER_LOG_FORMAT", value_enum, default_value = "text")]
    log_format: LogFormat,
}

#[derive(Parser, Debug)]
struct CheckUrlArgs {
    /// Candidate hook URL
    url: String,

    #[command(flatten)]
    identity: IdentityArgs,

    #[arg(long, default_value_t = 10)]
    probe_timeout_secs: u64,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    match args.command {
        Commands::Version => {
            println!("GitHub Hook Manager v{}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        Commands::Fingerprint(identity_args) => {
            let identity = load_identity(&identity_args.identity_key)?;
            println!("{}", identity.fingerprint());
            Ok(())
        }
        Commands::CheckUrl(check_args) => {
            init_tracing(LogFormat::Text);
            run_check_url(check_args).await
        }
        Commands::Run(run_args) => {
            init_tracing(run_args.log_format);
            run_manager(run_args).await
        }
    }
}

fn init_tracing(format: LogFormat) {
    let env_filter = EnvFilter::builder()
        .with_default_directive(Level::INFO.into())
        .from_env_lossy();

    let registry = tracing_subscriber::registry().with(env_filter);
    match format {
        LogFormat::Text => registry.with(fmt::layer().with_target(true)).init(),
        LogFormat::Json => registry.with(fmt::layer().json().with_target(true)).init(),
    }
}

fn load_identity(path: &Path) -> anyhow::Result<Ed25519Identity> {
    Ed25519Identity::load_or_generate(path)
        .with_context(|| format!("failed to load instance identity from {}", path.display()))
}

async fn run_check_url(args: CheckUrlArgs) -> anyhow::Result<()> {
    let identity = Arc::new(load_identity(&args.identity.identity_key)?);
    let validator =
        HookUrlValidator::new(identity, Duration::from_secs(args.probe_timeout_secs))?;

    match validator.validate(&args.url).await {
        ValidationResult::Ok => {
            println!("OK: {} reaches this instance", args.url);
            Ok(())
        }
        ValidationResult::Warning(message) => {
            println!("WARNING: {}", message);
            Ok(())
        }
        ValidationResult::Error(message) => bail!(message),
    }
}

fn build_job(
    definition: JobDefinition,
    store: &Arc<HookConfigStore>,
    root_url: Option<&Url>,
) -> anyhow::Result<ConfiguredJob> {
    let trigger = if definition.push_trigger {
        let repositories = definition
            .repositories
            .iter()
            .map(|r| r.parse::<GitHubRepository>())
            .collect::<Result<Vec<_>, _>>()
            .with_context(|| format!("invalid repository in job {}", definition.name))?;
        let trigger: Arc<dyn PushTrigger> = Arc::new(GitHubPushTrigger::new(
            definition.name.clone(),
            repositories,
            Arc::clone(store),
            root_url.cloned(),
        )?);
        Some(trigger)
    } else {
        None
    };
    Ok(ConfiguredJob::new(definition.name, definition.disabled, trigger))
}

async fn run_manager(args: RunArgs) -> anyhow::Result<()> {
    info!("Starting GitHub Hook Manager v{}", env!("CARGO_PKG_VERSION"));

    let identity = load_identity(&args.identity.identity_key)?;
    info!("Instance identity digest {}", identity.short_digest());

    let persistence: Box<dyn ConfigPersistence> = match &args.config_file {
        Some(path) => Box::new(TomlFilePersistence::new(path)),
        None => {
            warn!("No --config-file given, hook configuration will not survive a restart");
            Box::new(MemoryPersistence::new())
        }
    };
    let store = Arc::new(
        HookConfigStore::load(persistence).context("failed to load hook configuration")?,
    );

    if args.root_url.is_none() {
        warn!("No --root-url given, automatic hook management needs a hook URL override");
    }
    let instance = Arc::new(ServerInstance::new(args.root_url.clone()));
    if let Some(path) = &args.jobs_file {
        let jobs = JobsFile::load(path)
            .with_context(|| format!("failed to load jobs from {}", path.display()))?;
        for definition in jobs.jobs {
            let job = build_job(definition, &store, args.root_url.as_ref())?;
            instance.register_job(Arc::new(job));
        }
    }
    instance.start();

    let settings = ManagerSettings {
        probe_timeout: Duration::from_secs(args.probe_timeout_secs),
        failure_policy: args.failure_policy,
        allow_hook_url_override: args.allow_hook_url_override,
        ..Default::default()
    };
    let manager = Arc::new(HookManager::new(
        store,
        Arc::new(identity),
        instance.clone(),
        settings,
    )?);

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for shutdown signal: {}", e);
        }
        info!("Shutdown signal received");
    };
    let result = rest_api::run_server(manager, args.listen, shutdown).await;

    instance.shutdown();
    info!("GitHub Hook Manager stopped");
    result.context("REST API server failed")
}
