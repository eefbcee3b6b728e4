//! Configuration layer: typed settings with layered precedence (file → env → CLI).

use std::{path::PathBuf, str::FromStr, time::Duration};

use clap::{Args, Parser, Subcommand, ValueHint, builder::BoolishValueParser};
use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;
use tracing::level_filters::LevelFilter;
use url::Url;

const DEFAULT_CONFIG_BASENAME: &str = "config/default";
const LOCAL_CONFIG_BASENAME: &str = "claplog";
const DEFAULT_POLL_INTERVAL_MS: u64 = 2_000;
const DEFAULT_SEARCH_DEBOUNCE_MS: u64 = 300;
const DEFAULT_STAGGER_STEP_MS: u64 = 100;
const DEFAULT_DEMO_EMAIL: &str = "demo@claplog.local";
const DEFAULT_DEMO_PASSWORD: &str = "claplog";

/// Command-line arguments for the claplog binary.
#[derive(Debug, Parser)]
#[command(name = "claplog", version, about = "Blog reader and post manager")]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(
        long = "config-file",
        env = "CLAPLOG_CONFIG_FILE",
        value_name = "PATH",
        value_hint = ValueHint::FilePath,
        global = true
    )]
    pub config_file: Option<PathBuf>,

    #[command(flatten)]
    pub overrides: Overrides,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Print the post list, optionally filtered.
    List(ListArgs),
    /// Filter the post list interactively from stdin.
    Browse,
    /// Open one post and print its detail view.
    Show(ShowArgs),
    /// Applaud a post once and print the confirmed count.
    Applaud(ApplaudArgs),
    /// Authenticated post management.
    Admin(AdminArgs),
}

#[derive(Debug, Args, Clone, Default)]
pub struct ListArgs {
    /// Only show posts carrying this tag.
    #[arg(long, value_name = "TAG")]
    pub tag: Option<String>,

    /// Case-insensitive search over title and excerpt.
    #[arg(long, value_name = "TEXT")]
    pub search: Option<String>,

    /// Render HTML instead of plain text.
    #[arg(long, action = clap::ArgAction::SetTrue)]
    pub html: bool,
}

#[derive(Debug, Args, Clone)]
pub struct ShowArgs {
    #[arg(value_name = "ID")]
    pub id: String,

    /// Keep the view open and print every live clap count until interrupted.
    #[arg(long, action = clap::ArgAction::SetTrue)]
    pub watch: bool,

    /// Render HTML instead of plain text.
    #[arg(long, action = clap::ArgAction::SetTrue)]
    pub html: bool,
}

#[derive(Debug, Args, Clone)]
pub struct ApplaudArgs {
    #[arg(value_name = "ID")]
    pub id: String,

    /// How long to wait for the store to confirm the new count.
    #[arg(long = "wait-seconds", value_name = "SECONDS", default_value_t = 10)]
    pub wait_seconds: u64,
}

#[derive(Debug, Args, Clone)]
pub struct AdminArgs {
    #[command(flatten)]
    pub credentials: CredentialArgs,

    #[command(subcommand)]
    pub command: AdminCommand,
}

#[derive(Debug, Args, Clone, Default)]
pub struct CredentialArgs {
    #[arg(long, env = "CLAPLOG_ADMIN_EMAIL", value_name = "EMAIL")]
    pub email: Option<String>,

    #[arg(
        long,
        env = "CLAPLOG_ADMIN_PASSWORD",
        value_name = "PASSWORD",
        hide_env_values = true
    )]
    pub password: Option<String>,

    /// Start a federated sign-in and print the URL to visit.
    #[arg(long, value_name = "PROVIDER", conflicts_with = "redirect_fragment")]
    pub provider: Option<String>,

    /// Finish a federated sign-in from the fragment of the redirect URL.
    #[arg(long = "redirect-fragment", value_name = "FRAGMENT")]
    pub redirect_fragment: Option<String>,
}

#[derive(Debug, Subcommand, Clone)]
pub enum AdminCommand {
    /// List every post with its clap count.
    Posts {
        /// Render HTML instead of plain text.
        #[arg(long, action = clap::ArgAction::SetTrue)]
        html: bool,
    },
    /// Publish a new post.
    Create(PostFieldArgs),
    /// Update an existing post; omitted fields keep their current value.
    Update {
        #[arg(value_name = "ID")]
        id: String,

        #[command(flatten)]
        fields: PostFieldArgs,
    },
    /// Delete a post after confirmation.
    Delete {
        #[arg(value_name = "ID")]
        id: String,

        /// Skip the confirmation prompt.
        #[arg(long, short = 'y', action = clap::ArgAction::SetTrue)]
        yes: bool,
    },
}

#[derive(Debug, Args, Clone, Default)]
pub struct PostFieldArgs {
    #[arg(long, value_name = "TEXT")]
    pub title: Option<String>,

    #[arg(long, value_name = "TEXT")]
    pub content: Option<String>,

    /// Comma-separated tag list.
    #[arg(long, value_name = "TAGS")]
    pub tags: Option<String>,

    #[arg(long, value_name = "URL")]
    pub image: Option<String>,
}

#[derive(Debug, Args, Default, Clone)]
pub struct Overrides {
    /// Override the backend base URL; without one the in-memory demo store is used.
    #[arg(long = "backend-url", value_name = "URL", global = true)]
    pub backend_url: Option<String>,

    /// Override the backend anonymous API key.
    #[arg(long = "anon-key", value_name = "KEY", global = true)]
    pub anon_key: Option<String>,

    /// Override the change-subscription poll interval.
    #[arg(long = "backend-poll-interval-ms", value_name = "MILLIS", global = true)]
    pub poll_interval_ms: Option<u64>,

    /// Name of the server function used for atomic clap increments.
    #[arg(long = "backend-increment-rpc", value_name = "NAME", global = true)]
    pub increment_rpc: Option<String>,

    /// Override the base log level (trace|debug|info|warn|error).
    #[arg(long = "log-level", value_name = "LEVEL", global = true)]
    pub log_level: Option<String>,

    /// Toggle JSON logging.
    #[arg(
        long = "log-json",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new(),
        global = true
    )]
    pub log_json: Option<bool>,
}

/// Fully-resolved settings after precedence resolution and validation.
#[derive(Debug, Clone)]
pub struct Settings {
    pub backend: BackendSettings,
    pub logging: LoggingSettings,
    pub ui: UiSettings,
    pub demo: DemoSettings,
}

#[derive(Debug, Clone)]
pub struct BackendSettings {
    /// `None` selects the in-memory demo store.
    pub url: Option<Url>,
    pub anon_key: String,
    pub poll_interval: Duration,
    pub increment_rpc: Option<String>,
}

#[derive(Debug, Clone)]
pub struct LoggingSettings {
    pub level: LevelFilter,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy)]
pub enum LogFormat {
    Json,
    Compact,
}

#[derive(Debug, Clone)]
pub struct UiSettings {
    pub search_debounce: Duration,
    pub stagger_step: Duration,
}

/// Account accepted by the in-memory auth client.
#[derive(Debug, Clone)]
pub struct DemoSettings {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to build configuration: {0}")]
    Build(#[from] config::ConfigError),
    #[error("invalid configuration for `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },
}

impl LoadError {
    fn invalid(key: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            reason: reason.into(),
        }
    }
}

/// Load settings using the configured precedence (file → environment → CLI).
pub fn load(cli: &CliArgs) -> Result<Settings, LoadError> {
    let mut builder = Config::builder()
        .add_source(File::with_name(DEFAULT_CONFIG_BASENAME).required(false))
        .add_source(File::with_name(LOCAL_CONFIG_BASENAME).required(false));

    if let Some(path) = cli.config_file.as_ref() {
        builder = builder.add_source(File::from(path.as_path()).required(true));
    }

    builder = builder.add_source(Environment::with_prefix("CLAPLOG").separator("__"));

    let mut raw: RawSettings = builder.build()?.try_deserialize()?;
    raw.apply_overrides(&cli.overrides);
    Settings::from_raw(raw)
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSettings {
    backend: RawBackendSettings,
    logging: RawLoggingSettings,
    ui: RawUiSettings,
    demo: RawDemoSettings,
}

impl RawSettings {
    fn apply_overrides(&mut self, overrides: &Overrides) {
        if let Some(url) = overrides.backend_url.as_ref() {
            self.backend.url = Some(url.clone());
        }
        if let Some(key) = overrides.anon_key.as_ref() {
            self.backend.anon_key = Some(key.clone());
        }
        if let Some(millis) = overrides.poll_interval_ms {
            self.backend.poll_interval_ms = Some(millis);
        }
        if let Some(function) = overrides.increment_rpc.as_ref() {
            self.backend.increment_rpc = Some(function.clone());
        }
        if let Some(level) = overrides.log_level.as_ref() {
            self.logging.level = Some(level.clone());
        }
        if let Some(json) = overrides.log_json {
            self.logging.json = Some(json);
        }
    }
}

impl Settings {
    fn from_raw(raw: RawSettings) -> Result<Self, LoadError> {
        let RawSettings {
            backend,
            logging,
            ui,
            demo,
        } = raw;

        Ok(Self {
            backend: build_backend_settings(backend)?,
            logging: build_logging_settings(logging)?,
            ui: build_ui_settings(ui),
            demo: build_demo_settings(demo),
        })
    }
}

fn build_backend_settings(backend: RawBackendSettings) -> Result<BackendSettings, LoadError> {
    let url = match non_blank(backend.url) {
        Some(value) => Some(
            Url::parse(&value)
                .map_err(|err| LoadError::invalid("backend.url", format!("invalid URL: {err}")))?,
        ),
        None => None,
    };
    let anon_key = non_blank(backend.anon_key).unwrap_or_default();
    if url.is_some() && anon_key.is_empty() {
        return Err(LoadError::invalid(
            "backend.anon_key",
            "required when backend.url is set",
        ));
    }

    let poll_ms = backend
        .poll_interval_ms
        .unwrap_or(DEFAULT_POLL_INTERVAL_MS);
    if poll_ms == 0 {
        return Err(LoadError::invalid(
            "backend.poll_interval_ms",
            "must be greater than zero",
        ));
    }

    Ok(BackendSettings {
        url,
        anon_key,
        poll_interval: Duration::from_millis(poll_ms),
        increment_rpc: non_blank(backend.increment_rpc),
    })
}

fn build_logging_settings(logging: RawLoggingSettings) -> Result<LoggingSettings, LoadError> {
    let level = match logging.level {
        Some(level) => LevelFilter::from_str(level.as_str()).map_err(|err| {
            LoadError::invalid("logging.level", format!("failed to parse: {err}"))
        })?,
        None => LevelFilter::WARN,
    };

    let format = if logging.json.unwrap_or(false) {
        LogFormat::Json
    } else {
        LogFormat::Compact
    };

    Ok(LoggingSettings { level, format })
}

fn build_ui_settings(ui: RawUiSettings) -> UiSettings {
    UiSettings {
        search_debounce: Duration::from_millis(
            ui.search_debounce_ms.unwrap_or(DEFAULT_SEARCH_DEBOUNCE_MS),
        ),
        stagger_step: Duration::from_millis(ui.stagger_step_ms.unwrap_or(DEFAULT_STAGGER_STEP_MS)),
    }
}

fn build_demo_settings(demo: RawDemoSettings) -> DemoSettings {
    DemoSettings {
        email: non_blank(demo.email).unwrap_or_else(|| DEFAULT_DEMO_EMAIL.to_string()),
        password: demo
            .password
            .unwrap_or_else(|| DEFAULT_DEMO_PASSWORD.to_string()),
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.and_then(|value| {
        let trimmed = value.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    })
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawBackendSettings {
    url: Option<String>,
    anon_key: Option<String>,
    poll_interval_ms: Option<u64>,
    increment_rpc: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawLoggingSettings {
    level: Option<String>,
    json: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawUiSettings {
    search_debounce_ms: Option<u64>,
    stagger_step_ms: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawDemoSettings {
    email: Option<String>,
    password: Option<String>,
}

/// Resolve configuration using the supplied CLI arguments, returning both for downstream use.
pub fn load_with_cli() -> Result<(CliArgs, Settings), LoadError> {
    let args = CliArgs::parse();
    let settings = load(&args)?;
    Ok((args, settings))
}
