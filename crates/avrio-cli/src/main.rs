//! CLI interface for avrio - list and trigger scheduled jobs from the terminal.

use std::env;
use std::fs::OpenOptions;
use std::io::{self, IsTerminal};
use std::path::PathBuf;

use anyhow::{Context as _, Result, anyhow};
use avrio_core::paths::write_default_config;
use avrio_core::{
    AppConfig, AppPaths, AuthParams, Authenticator, JobType, Session, generate_example_config,
    generate_schema,
};
use clap::{Args, CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::Shell;
use env_logger::fmt::WriteStyle;
use log::{LevelFilter, debug};

const APP_NAME: &str = "avrio";
const REPO_URL: &str = "https://github.com/avrio/avrio-scheduler";

fn main() -> anyhow::Result<()> {
    try_main()
}

fn try_main() -> Result<()> {
    let cli = Cli::parse();

    let ctx = RuntimeContext::new(cli.common.clone(), cli.credentials.clone())?;
    ctx.init_logging()?;
    debug!("resolved paths: {}", ctx.paths);

    let rt = tokio::runtime::Runtime::new()?;

    match cli.command {
        Command::Whoami => rt.block_on(handle_whoami(&ctx)),
        Command::Jobs { subcommand } => rt.block_on(handle_jobs(&ctx, subcommand)),
        Command::Init(cmd) => handle_init(&ctx, cmd),
        Command::Config { command } => handle_config(&ctx, command),
        Command::Completions { shell } => {
            handle_completions(shell);
            Ok(())
        }
    }
}

#[derive(Debug, Parser)]
#[command(
    name = "avrio",
    author,
    version,
    about = "List and trigger Avrio scheduled jobs",
    propagate_version = true
)]
struct Cli {
    #[command(flatten)]
    common: CommonOpts,
    #[command(flatten)]
    credentials: CredentialOpts,
    #[command(subcommand)]
    command: Command,
}

/// Common CLI options shared across all subcommands.
#[derive(Debug, Clone, Args)]
pub struct CommonOpts {
    /// Override the config file path.
    #[arg(long, value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,
    /// Reduce output to only errors.
    #[arg(short, long, action = clap::ArgAction::SetTrue, global = true)]
    pub quiet: bool,
    /// Increase logging verbosity (stackable).
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,
    /// Enable debug logging.
    #[arg(long, global = true)]
    pub debug: bool,
    /// Enable trace logging.
    #[arg(long, global = true)]
    pub trace: bool,
    /// Output machine-readable JSON.
    #[arg(long, global = true)]
    pub json: bool,
    /// Disable ANSI colors in output.
    #[arg(long = "no-color", global = true, conflicts_with = "color")]
    pub no_color: bool,
    /// Control color output.
    #[arg(long, value_enum, default_value_t = ColorOption::Auto, global = true)]
    pub color: ColorOption,
    /// Do not change anything on disk.
    #[arg(long = "dry-run", global = true)]
    pub dry_run: bool,
    /// Assume "yes" for interactive prompts.
    #[arg(short = 'y', long = "yes", global = true)]
    pub assume_yes: bool,
}

/// Credentials, each overriding the matching config value.
#[derive(Clone, Args)]
pub struct CredentialOpts {
    /// Scheduler service base URL.
    #[arg(long, env = "AVRIO_HOST", global = true)]
    pub host: Option<String>,
    /// Authentication method: password or `access_token`.
    #[arg(long, env = "AVRIO_AUTH_METHOD", global = true)]
    pub method: Option<String>,
    /// Login email for password authentication.
    #[arg(long, env = "AVRIO_USERNAME", global = true)]
    pub username: Option<String>,
    /// Password for password authentication.
    #[arg(long, env = "AVRIO_PASSWORD", hide_env_values = true, global = true)]
    pub password: Option<String>,
    /// Pre-issued access token.
    #[arg(long = "access-token", env = "AVRIO_ACCESS_TOKEN", hide_env_values = true, global = true)]
    pub access_token: Option<String>,
}

impl std::fmt::Debug for CredentialOpts {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialOpts")
            .field("host", &self.host)
            .field("method", &self.method)
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}

/// Color output mode.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ColorOption {
    /// Detect terminal capabilities automatically.
    Auto,
    /// Always emit ANSI color codes.
    Always,
    /// Never emit ANSI color codes.
    Never,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Authenticate and show the resolved identity.
    Whoami,
    /// List or trigger scheduled jobs.
    Jobs {
        #[command(subcommand)]
        subcommand: JobsSubcommand,
    },
    /// Create the config directory and default config file.
    Init(InitCommand),
    /// Inspect and manage configuration.
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
    /// Generate shell completions.
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Debug, Clone, Subcommand)]
enum JobsSubcommand {
    /// List scheduled jobs of one type.
    List {
        /// Job type: python_notebook, sql_notebook or data_quality.
        job_type: JobType,
    },
    /// Trigger a scheduled job.
    Trigger {
        /// Job name.
        name: String,
        /// Job id (sent as a number when numeric).
        id: String,
        /// Job type: python_notebook, sql_notebook, data_quality, or any
        /// other topic, sent upper-cased.
        job_type: String,
    },
}

#[derive(Debug, Clone, Copy, Args)]
struct InitCommand {
    /// Recreate configuration even if it already exists.
    #[arg(long = "force")]
    force: bool,
}

#[derive(Debug, Clone, Copy, Subcommand)]
enum ConfigCommand {
    /// Output the effective configuration.
    Show,
    /// Print the resolved config file path.
    Path,
    /// Print the JSON schema.
    Schema,
    /// Print an example configuration file.
    Example,
    /// Regenerate the default configuration file.
    Reset,
}

// ─── Runtime ─────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
struct RuntimeContext {
    common: CommonOpts,
    credentials: CredentialOpts,
    paths: AppPaths,
    config: AppConfig,
}

impl RuntimeContext {
    fn new(common: CommonOpts, credentials: CredentialOpts) -> Result<Self> {
        let paths = AppPaths::discover(common.config.as_deref())?;
        let config = AppConfig::load(&paths, common.dry_run)?;
        Ok(Self {
            common,
            credentials,
            paths,
            config,
        })
    }

    fn init_logging(&self) -> Result<()> {
        if self.common.quiet {
            log::set_max_level(LevelFilter::Off);
            return Ok(());
        }
        let mut builder =
            env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"));
        builder.filter_level(self.effective_log_level());

        let force_color = matches!(self.common.color, ColorOption::Always)
            || env::var_os("FORCE_COLOR").is_some();
        let disable_color = self.common.no_color
            || matches!(self.common.color, ColorOption::Never)
            || env::var_os("NO_COLOR").is_some()
            || (!force_color && !io::stderr().is_terminal());

        if disable_color {
            builder.write_style(WriteStyle::Never);
        } else if force_color {
            builder.write_style(WriteStyle::Always);
        } else {
            builder.write_style(WriteStyle::Auto);
        }

        if let Some(ref file) = self.config.logging.file {
            let target = OpenOptions::new()
                .create(true)
                .append(true)
                .open(file)
                .with_context(|| format!("opening log file {file}"))?;
            builder.write_style(WriteStyle::Never);
            builder.target(env_logger::Target::Pipe(Box::new(target)));
        }

        builder.try_init().or_else(|err| {
            if self.common.verbose > 0 {
                eprintln!("logger already initialized: {err}");
            }
            Ok(())
        })
    }

    fn effective_log_level(&self) -> LevelFilter {
        if self.common.trace {
            LevelFilter::Trace
        } else if self.common.debug {
            LevelFilter::Debug
        } else {
            match self.common.verbose {
                0 => self.config.logging.level.into(),
                1 => LevelFilter::Info,
                2 => LevelFilter::Debug,
                _ => LevelFilter::Trace,
            }
        }
    }

    /// Config defaults overlaid with command-line credentials.
    fn auth_params(&self) -> AuthParams {
        let base = self.config.auth_params();
        let creds = self.credentials.clone();
        AuthParams {
            host: creds.host.or(base.host),
            method: creds.method.or(base.method),
            username: creds.username.or(base.username),
            password: creds.password,
            access_token: creds.access_token,
        }
    }

    async fn authenticate(&self) -> Result<Session> {
        let authenticator = Authenticator::from_config(&self.config)?;
        let session = authenticator.authenticate(&self.auth_params()).await?;
        if session.user_state().user_id().is_none() {
            log::warn!("user id could not be resolved; job requests will be sent without one");
        }
        Ok(session)
    }
}

// ─── Handlers ────────────────────────────────────────────────────────

async fn handle_whoami(ctx: &RuntimeContext) -> Result<()> {
    let session = ctx.authenticate().await?;
    let state = session.user_state().snapshot();

    if ctx.common.json {
        let identity = serde_json::json!({
            "host": session.host(),
            "username": state.username,
            "email": state.email,
            "userId": state.user_id,
        });
        println!(
            "{}",
            serde_json::to_string_pretty(&identity).context("serializing identity to JSON")?
        );
    } else {
        println!("Host:    {}", session.host());
        println!("Email:   {}", state.email.as_deref().unwrap_or("-"));
        if let Some(username) = state.username {
            println!("User:    {username}");
        }
        match state.user_id {
            Some(id) => println!("User ID: {id}"),
            None => println!("User ID: (unresolved)"),
        }
    }
    Ok(())
}

async fn handle_jobs(ctx: &RuntimeContext, cmd: JobsSubcommand) -> Result<()> {
    let session = ctx.authenticate().await?;
    let scheduler = session.scheduler();

    match cmd {
        JobsSubcommand::List { job_type } => {
            let jobs = scheduler
                .list_all(job_type.name())
                .await
                .ok_or_else(|| anyhow!("listing {job_type} jobs failed (see log for details)"))?;

            if ctx.common.json {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&jobs).context("serializing jobs to JSON")?
                );
            } else if jobs.is_empty() {
                println!("No {job_type} jobs scheduled.");
            } else {
                for job in &jobs {
                    println!("{}", summarize_job(job));
                }
            }
            Ok(())
        }
        JobsSubcommand::Trigger { name, id, job_type } => {
            let response = scheduler
                .trigger_scheduler(&name, parse_job_id(&id), &job_type)
                .await
                .ok_or_else(|| anyhow!("triggering job '{name}' failed (see log for details)"))?;

            println!(
                "{}",
                serde_json::to_string_pretty(&response).context("serializing response to JSON")?
            );
            Ok(())
        }
    }
}

fn handle_init(ctx: &RuntimeContext, cmd: InitCommand) -> Result<()> {
    if ctx.paths.config_file.exists() && !(cmd.force || ctx.common.assume_yes) {
        return Err(anyhow!(
            "config already exists at {} (use --force to overwrite)",
            ctx.paths.config_file.display()
        ));
    }
    if ctx.common.dry_run {
        log::info!(
            "dry-run: would write default config to {}",
            ctx.paths.config_file.display()
        );
        return Ok(());
    }
    write_default_config(&ctx.paths.config_file)
}

fn handle_config(ctx: &RuntimeContext, command: ConfigCommand) -> Result<()> {
    match command {
        ConfigCommand::Show => {
            if ctx.common.json {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&ctx.config)
                        .context("serializing config to JSON")?
                );
            } else {
                println!("{:#?}", ctx.config);
            }
            Ok(())
        }
        ConfigCommand::Path => {
            println!("{}", ctx.paths.config_file.display());
            Ok(())
        }
        ConfigCommand::Schema => {
            println!("{}", generate_schema(APP_NAME, REPO_URL)?);
            Ok(())
        }
        ConfigCommand::Example => {
            print!("{}", generate_example_config(APP_NAME, REPO_URL)?);
            Ok(())
        }
        ConfigCommand::Reset => {
            if ctx.common.dry_run {
                log::info!(
                    "dry-run: would reset config at {}",
                    ctx.paths.config_file.display()
                );
                return Ok(());
            }
            write_default_config(&ctx.paths.config_file)
        }
    }
}

fn handle_completions(shell: Shell) {
    let mut cmd = Cli::command();
    clap_complete::generate(shell, &mut cmd, APP_NAME, &mut io::stdout());
}

// ─── Formatting helpers ──────────────────────────────────────────────

/// Job ids are numeric on the server; anything else is sent as text.
fn parse_job_id(id: &str) -> serde_json::Value {
    id.trim()
        .parse::<i64>()
        .map_or_else(|_| serde_json::Value::from(id), serde_json::Value::from)
}

fn summarize_job(job: &serde_json::Value) -> String {
    let field = |keys: &[&str]| {
        keys.iter()
            .find_map(|k| match &job[*k] {
                serde_json::Value::String(s) => Some(s.clone()),
                serde_json::Value::Number(n) => Some(n.to_string()),
                _ => None,
            })
            .unwrap_or_else(|| "-".to_string())
    };

    format!(
        "{:<10} {:<40} {}",
        field(&["jobId", "id"]),
        field(&["jobName", "name"]),
        field(&["status", "scheduledFrequency"])
    )
}
