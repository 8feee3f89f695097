use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{anyhow, Context as _};
use clap::{Args, Parser, Subcommand};
use issue_mirror::github::{GithubIssues, DEFAULT_API_URL};
use issue_mirror::projects::{GithubProjects, DEFAULT_GRAPHQL_URL};
use issue_mirror::sync::{ProjectSync, SyncOutcome, Synchronizer};
use issue_mirror::transport::IssueTransport;
use issue_mirror_core::config::{
    parse_bool_input, parse_multiline_input, MirrorConfig, ProjectConfig, RepoRef,
};
use issue_mirror_core::event::Event;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "issue-mirror",
    version,
    about = "Mirror issues from one GitHub repository into another"
)]
struct Cli {
    #[arg(long, global = true, env = "MIRROR_LOG", value_name = "LEVEL")]
    log_level: Option<String>,

    #[arg(long, global = true, env = "MIRROR_LOG_DIR", value_name = "DIR")]
    log_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    #[command(about = "Handle the event that triggered the current workflow run.")]
    Run(RunArgs),
    #[command(about = "Print the state (open/closed) of a source issue.")]
    State {
        number: u64,
        #[command(flatten)]
        github: GithubArgs,
    },
    Version,
}

#[derive(Args, Debug)]
struct GithubArgs {
    /// Source repository as owner/name.
    #[arg(long, env = "GITHUB_REPOSITORY", value_name = "OWNER/NAME")]
    source: Option<String>,

    #[arg(long, env = "INPUT_GITHUB_TOKEN", hide_env_values = true)]
    token: Option<String>,

    #[arg(long, env = "GITHUB_API_URL", default_value = DEFAULT_API_URL)]
    api_url: String,

    #[arg(long, env = "GITHUB_GRAPHQL_URL", default_value = DEFAULT_GRAPHQL_URL)]
    graphql_url: String,
}

impl GithubArgs {
    fn token(&self) -> anyhow::Result<String> {
        self.token
            .clone()
            .or_else(|| env::var("GITHUB_TOKEN").ok())
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| anyhow!("missing github token (INPUT_GITHUB_TOKEN or GITHUB_TOKEN)"))
    }
}

#[derive(Args, Debug)]
struct RunArgs {
    #[command(flatten)]
    github: GithubArgs,

    #[arg(long, env = "MIRROR_CONFIG", value_name = "PATH")]
    config: Option<PathBuf>,

    #[arg(long, env = "GITHUB_EVENT_NAME")]
    event_name: String,

    #[arg(long, env = "GITHUB_EVENT_PATH", value_name = "PATH")]
    event_path: Option<PathBuf>,

    #[arg(long, env = "INPUT_DESTINATION_TOKEN", hide_env_values = true)]
    destination_token: Option<String>,

    #[arg(long, env = "INPUT_DESTINATION_ORG")]
    destination_org: Option<String>,

    #[arg(long, env = "INPUT_DESTINATION_REPO")]
    destination_repo: Option<String>,

    /// Required labels, one per line.
    #[arg(long, env = "INPUT_LABELS")]
    labels: Option<String>,

    #[arg(long, env = "INPUT_SYNC_LABELS_DISABLED", value_name = "BOOL")]
    sync_labels_disabled: Option<String>,

    #[arg(long, env = "INPUT_PROJECT_ORG")]
    project_org: Option<String>,

    #[arg(long, env = "INPUT_PROJECT_NUMBER")]
    project_number: Option<u64>,

    #[arg(long, env = "INPUT_PROJECT_FIELD")]
    project_field: Option<String>,

    #[arg(long, env = "INPUT_PROJECT_VALUE")]
    project_value: Option<String>,

    #[arg(long, env = "INPUT_PROJECT_CREATE_IN_ORG", value_name = "BOOL")]
    project_create_in_org: Option<String>,
}

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            report_failure(&err);
            ExitCode::FAILURE
        }
    }
}

async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.log_dir.as_deref(), cli.log_level.as_deref())?;

    tracing::debug!(version = env!("CARGO_PKG_VERSION"), "issue-mirror starting");

    dispatch(cli.command).await
}

/// Marks the workflow run failed and logs every cause in the chain.
fn report_failure(err: &anyhow::Error) {
    println!("::error::{}", escape_command_data(&err.to_string()));
    eprintln!("{err:#}");
    for (depth, cause) in err.chain().enumerate().skip(1) {
        tracing::debug!(depth, "error has a nested error");
        tracing::error!(depth, cause = %cause, "caused by");
    }
}

/// Percent-encodes `%`, CR and LF so the message stays a single workflow
/// command line.
fn escape_command_data(message: &str) -> String {
    message
        .replace('%', "%25")
        .replace('\r', "%0D")
        .replace('\n', "%0A")
}

fn init_logging(log_dir: Option<&Path>, log_level: Option<&str>) -> anyhow::Result<()> {
    let level = log_level
        .map(str::to_owned)
        .or_else(|| env::var("RUST_LOG").ok())
        .or_else(|| {
            (env::var("RUNNER_DEBUG").ok().as_deref() == Some("1")).then(|| "debug".to_owned())
        })
        .unwrap_or_else(|| "info".to_owned());

    let filter = EnvFilter::try_new(level).context("parse log level")?;

    let file_layer = log_dir
        .filter(|dir| fs::create_dir_all(dir).is_ok())
        .and_then(|dir| {
            tracing_appender::rolling::RollingFileAppender::builder()
                .rotation(tracing_appender::rolling::Rotation::NEVER)
                .filename_prefix("issue-mirror")
                .filename_suffix("log")
                .build(dir)
                .ok()
        })
        .map(|file_appender| {
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(file_appender)
        });

    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_ansi(false)
        .with_writer(io::stderr);

    tracing_subscriber::registry()
        .with(filter)
        .with(file_layer)
        .with(stderr_layer)
        .init();

    Ok(())
}

async fn dispatch(command: Command) -> anyhow::Result<()> {
    match command {
        Command::Run(args) => run_sync(args).await,
        Command::State { number, github } => issue_state(number, github).await,
        Command::Version => {
            println!("issue-mirror {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

async fn issue_state(number: u64, github: GithubArgs) -> anyhow::Result<()> {
    let source = github
        .source
        .as_deref()
        .ok_or_else(|| anyhow!("missing source repository (GITHUB_REPOSITORY)"))?;
    let repo = RepoRef::parse(source)?;
    let issues = GithubIssues::new(repo, github.token()?, &github.api_url)?;

    let state = issues.get_issue_state(number).await?;
    println!("{}", state.as_str());
    Ok(())
}

fn build_config(args: &RunArgs) -> anyhow::Result<MirrorConfig> {
    let mut cfg = match &args.config {
        Some(path) => MirrorConfig::load(path)?,
        None => {
            let source = args
                .github
                .source
                .clone()
                .ok_or_else(|| anyhow!("missing source repository (GITHUB_REPOSITORY)"))?;
            MirrorConfig::new(source, String::new())
        }
    };

    if let Some(source) = &args.github.source {
        cfg.source = source.clone();
    }
    if let Some(org) = &args.destination_org {
        cfg.destination.org = org.clone();
    }
    if let Some(repo) = &args.destination_repo {
        cfg.destination.repo = Some(repo.clone());
    }
    if let Some(labels) = &args.labels {
        cfg.labels = parse_multiline_input(labels);
    }
    if args.sync_labels_disabled.is_some() {
        cfg.sync_labels = !parse_bool_input(args.sync_labels_disabled.as_deref());
    }

    if let Some(number) = args.project_number {
        let project = cfg.project.get_or_insert_with(|| ProjectConfig {
            org: String::new(),
            number,
            field: None,
            value: None,
            create_in_org: false,
        });
        project.number = number;
    }
    if let Some(project) = cfg.project.as_mut() {
        if let Some(org) = &args.project_org {
            project.org = org.clone();
        }
        if project.org.trim().is_empty() {
            project.org = cfg.destination.org.clone();
        }
        if let Some(field) = &args.project_field {
            project.field = Some(field.clone());
        }
        if let Some(value) = &args.project_value {
            project.value = Some(value.clone());
        }
        if args.project_create_in_org.is_some() {
            project.create_in_org = parse_bool_input(args.project_create_in_org.as_deref());
        }
    }

    for key in cfg.unknown_keys() {
        tracing::warn!(%key, "ignoring unknown config key");
    }

    cfg.validate()?;
    Ok(cfg)
}

async fn load_event(args: &RunArgs, labels: Vec<String>) -> anyhow::Result<Event> {
    let payload = match &args.event_path {
        Some(path) => tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("read event payload: {}", path.display()))?,
        None => "{}".to_owned(),
    };

    Event::from_json(args.event_name.clone(), &payload, labels).context("parse event payload")
}

async fn run_sync(args: RunArgs) -> anyhow::Result<()> {
    let cfg = build_config(&args)?;
    let token = args.github.token()?;
    let destination_token = args
        .destination_token
        .clone()
        .filter(|t| !t.trim().is_empty());

    let source_repo = cfg.source_repo()?;
    let destination_repo = cfg.destination_repo()?;
    tracing::debug!(
        source = %source_repo.slug(),
        destination = %destination_repo.slug(),
        labels = ?cfg.labels,
        "configuration loaded"
    );

    let source = GithubIssues::new(source_repo, token.clone(), &args.github.api_url)?;
    let target = GithubIssues::new(
        destination_repo.clone(),
        destination_token.clone().unwrap_or_else(|| token.clone()),
        &args.github.api_url,
    )?;

    let project = match &cfg.project {
        Some(project) => {
            let transport = GithubProjects::new(token, args.github.graphql_url.clone())?
                .with_destination_token(destination_token);
            Some(
                ProjectSync::new(Arc::new(transport), project.org.clone(), project.number)
                    .with_field(project.field_request())
                    .create_in(project.create_in_org.then(|| destination_repo.clone())),
            )
        }
        None => None,
    };

    let synchronizer =
        Synchronizer::with_options(Arc::new(source), Arc::new(target), cfg.sync_labels, project);

    let event = load_event(&args, cfg.labels.clone()).await?;
    let outcome = synchronizer.synchronize(&event).await?;

    match outcome {
        SyncOutcome::NothingToSync => {}
        SyncOutcome::Skipped(reason) => tracing::debug!(%reason, "nothing mirrored"),
        SyncOutcome::Mirrored(created) => {
            let numbers: Vec<u64> = created.iter().map(|i| i.number).collect();
            tracing::info!(count = created.len(), created = ?numbers, "issues mirrored");
        }
    }

    tracing::info!("Operation finished successfully!");
    Ok(())
}
