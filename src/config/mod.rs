//! Configuration layer: typed settings with layered precedence (file → env → CLI).

mod cli;

use std::{
    collections::BTreeSet,
    net::SocketAddr,
    num::{NonZeroU32, NonZeroUsize},
    str::FromStr,
    sync::Arc,
    time::Duration,
};

use clap::Parser;
use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;
use tracing::level_filters::LevelFilter;
use url::Url;

use crate::domain::{paths::SitePath, secrets::RevalidationSecret};

pub use cli::{CliArgs, Command, ServeArgs, ServeOverrides};

const DEFAULT_CONFIG_BASENAME: &str = "config/default";
const LOCAL_CONFIG_BASENAME: &str = "clubhouse";
const ENV_PREFIX: &str = "CLUBHOUSE";
const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 3000;
const DEFAULT_GRACEFUL_SHUTDOWN_SECS: u64 = 30;
const DEFAULT_DB_MAX_CONNECTIONS: u32 = 8;
const DEFAULT_REVALIDATION_PATHS: &[&str] = &["/", "/events", "/news", "/projects", "/members"];
const DEFAULT_POLL_PAGE_PREFIX: &str = "/polls";
const DEFAULT_CACHE_RESPONSE_LIMIT: usize = 256;
const DEFAULT_CACHE_BODY_LIMIT_BYTES: usize = 2 * 1024 * 1024;
const DEFAULT_ORIGIN_TIMEOUT_SECS: u64 = 10;

/// Fully-resolved deployment settings after precedence resolution and validation.
#[derive(Debug, Clone)]
pub struct Settings {
    pub server: ServerSettings,
    pub logging: LoggingSettings,
    pub database: DatabaseSettings,
    pub revalidation: Arc<RevalidationSettings>,
    pub polls: PollSettings,
    pub cache: CacheSettings,
    pub origin: OriginSettings,
}

#[derive(Debug, Clone)]
pub struct ServerSettings {
    pub addr: SocketAddr,
    pub graceful_shutdown: Duration,
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
pub struct DatabaseSettings {
    pub url: Option<String>,
    pub max_connections: NonZeroU32,
}

/// Webhook secret and the paths revalidated when no slug is given.
///
/// Built once at startup and shared read-only with the gateway.
#[derive(Debug, Clone)]
pub struct RevalidationSettings {
    pub secret: RevalidationSecret,
    pub default_paths: BTreeSet<SitePath>,
}

#[derive(Debug, Clone)]
pub struct PollSettings {
    pub page_prefix: SitePath,
}

#[derive(Debug, Clone)]
pub struct CacheSettings {
    pub enabled: bool,
    pub response_limit: NonZeroUsize,
    pub body_limit_bytes: NonZeroUsize,
}

#[derive(Debug, Clone)]
pub struct OriginSettings {
    pub url: Option<Url>,
    pub timeout: Duration,
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

    builder = builder.add_source(
        Environment::with_prefix(ENV_PREFIX)
            .separator("__")
            .list_separator(",")
            .with_list_parse_key("revalidation.default_paths")
            .try_parsing(true),
    );

    let mut raw: RawSettings = builder.build()?.try_deserialize()?;

    match cli.command.as_ref() {
        Some(Command::Serve(args)) => raw.apply_serve_overrides(&args.overrides),
        None => raw.apply_serve_overrides(&ServeOverrides::default()),
    }

    Settings::from_raw(raw)
}

/// Resolve configuration using the supplied CLI arguments, returning both for downstream use.
pub fn load_with_cli() -> Result<(CliArgs, Settings), LoadError> {
    let args = CliArgs::parse();
    let settings = load(&args)?;
    Ok((args, settings))
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSettings {
    server: RawServerSettings,
    logging: RawLoggingSettings,
    database: RawDatabaseSettings,
    revalidation: RawRevalidationSettings,
    polls: RawPollSettings,
    cache: RawCacheSettings,
    origin: RawOriginSettings,
}

impl RawSettings {
    fn apply_serve_overrides(&mut self, overrides: &ServeOverrides) {
        if let Some(host) = overrides.server_host.as_ref() {
            self.server.host = Some(host.clone());
        }
        if let Some(port) = overrides.server_port {
            self.server.port = Some(port);
        }
        if let Some(level) = overrides.log_level.as_ref() {
            self.logging.level = Some(level.clone());
        }
        if let Some(json) = overrides.log_json {
            self.logging.json = Some(json);
        }
        if let Some(url) = overrides.database_url.as_ref() {
            self.database.url = Some(url.clone());
        }
        if let Some(url) = overrides.origin_url.as_ref() {
            self.origin.url = Some(url.clone());
        }
    }
}

impl Settings {
    fn from_raw(raw: RawSettings) -> Result<Self, LoadError> {
        let RawSettings {
            server,
            logging,
            database,
            revalidation,
            polls,
            cache,
            origin,
        } = raw;

        Ok(Self {
            server: build_server_settings(server)?,
            logging: build_logging_settings(logging)?,
            database: build_database_settings(database)?,
            revalidation: Arc::new(build_revalidation_settings(revalidation)?),
            polls: build_poll_settings(polls)?,
            cache: build_cache_settings(cache)?,
            origin: build_origin_settings(origin)?,
        })
    }
}

fn build_server_settings(server: RawServerSettings) -> Result<ServerSettings, LoadError> {
    let host = server.host.unwrap_or_else(|| DEFAULT_HOST.to_string());
    let port = server.port.unwrap_or(DEFAULT_PORT);
    if port == 0 {
        return Err(LoadError::invalid(
            "server.port",
            "port must be greater than zero",
        ));
    }

    let addr = parse_socket_addr(&host, port)
        .map_err(|reason| LoadError::invalid("server.addr", reason))?;

    let graceful_secs = server
        .graceful_shutdown_seconds
        .unwrap_or(DEFAULT_GRACEFUL_SHUTDOWN_SECS);
    if graceful_secs == 0 {
        return Err(LoadError::invalid(
            "server.graceful_shutdown_seconds",
            "must be greater than zero",
        ));
    }

    Ok(ServerSettings {
        addr,
        graceful_shutdown: Duration::from_secs(graceful_secs),
    })
}

fn build_logging_settings(logging: RawLoggingSettings) -> Result<LoggingSettings, LoadError> {
    let level = match logging.level {
        Some(level) => LevelFilter::from_str(level.as_str()).map_err(|err| {
            LoadError::invalid("logging.level", format!("failed to parse: {err}"))
        })?,
        None => LevelFilter::INFO,
    };

    let format = if logging.json.unwrap_or(false) {
        LogFormat::Json
    } else {
        LogFormat::Compact
    };

    Ok(LoggingSettings { level, format })
}

fn build_database_settings(database: RawDatabaseSettings) -> Result<DatabaseSettings, LoadError> {
    let url = database.url.and_then(|value| {
        let trimmed = value.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    });

    let max_connections = database
        .max_connections
        .unwrap_or(DEFAULT_DB_MAX_CONNECTIONS);
    let max_connections = NonZeroU32::new(max_connections).ok_or_else(|| {
        LoadError::invalid("database.max_connections", "must be greater than zero")
    })?;

    Ok(DatabaseSettings {
        url,
        max_connections,
    })
}

fn build_revalidation_settings(
    revalidation: RawRevalidationSettings,
) -> Result<RevalidationSettings, LoadError> {
    let secret = revalidation
        .secret
        .and_then(RevalidationSecret::new)
        .ok_or_else(|| LoadError::invalid("revalidation.secret", "a shared secret is required"))?;

    let raw_paths = revalidation.default_paths.unwrap_or_else(|| {
        DEFAULT_REVALIDATION_PATHS
            .iter()
            .map(|path| path.to_string())
            .collect()
    });

    let default_paths = raw_paths
        .iter()
        .map(|path| SitePath::parse(path))
        .collect::<Result<BTreeSet<_>, _>>()
        .map_err(|err| LoadError::invalid("revalidation.default_paths", err.to_string()))?;
    if default_paths.is_empty() {
        return Err(LoadError::invalid(
            "revalidation.default_paths",
            "at least one path is required",
        ));
    }

    Ok(RevalidationSettings {
        secret,
        default_paths,
    })
}

fn build_poll_settings(polls: RawPollSettings) -> Result<PollSettings, LoadError> {
    let raw = polls
        .page_prefix
        .unwrap_or_else(|| DEFAULT_POLL_PAGE_PREFIX.to_string());
    let page_prefix = SitePath::parse(&raw)
        .map_err(|err| LoadError::invalid("polls.page_prefix", err.to_string()))?;

    Ok(PollSettings { page_prefix })
}

fn build_cache_settings(cache: RawCacheSettings) -> Result<CacheSettings, LoadError> {
    let response_limit = cache
        .response_limit
        .unwrap_or(DEFAULT_CACHE_RESPONSE_LIMIT);
    let response_limit = NonZeroUsize::new(response_limit)
        .ok_or_else(|| LoadError::invalid("cache.response_limit", "must be greater than zero"))?;

    let body_limit = cache
        .body_limit_bytes
        .unwrap_or(DEFAULT_CACHE_BODY_LIMIT_BYTES);
    let body_limit_bytes = NonZeroUsize::new(body_limit).ok_or_else(|| {
        LoadError::invalid("cache.body_limit_bytes", "must be greater than zero")
    })?;

    Ok(CacheSettings {
        enabled: cache.enabled.unwrap_or(true),
        response_limit,
        body_limit_bytes,
    })
}

fn build_origin_settings(origin: RawOriginSettings) -> Result<OriginSettings, LoadError> {
    let url = origin
        .url
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(|value| {
            let parsed = Url::parse(value)
                .map_err(|err| LoadError::invalid("origin.url", format!("invalid URL: {err}")))?;
            if !matches!(parsed.scheme(), "http" | "https") {
                return Err(LoadError::invalid(
                    "origin.url",
                    "only http and https origins are supported",
                ));
            }
            Ok(parsed)
        })
        .transpose()?;

    let timeout_secs = origin.timeout_seconds.unwrap_or(DEFAULT_ORIGIN_TIMEOUT_SECS);
    if timeout_secs == 0 {
        return Err(LoadError::invalid(
            "origin.timeout_seconds",
            "must be greater than zero",
        ));
    }

    Ok(OriginSettings {
        url,
        timeout: Duration::from_secs(timeout_secs),
    })
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawServerSettings {
    host: Option<String>,
    port: Option<u16>,
    graceful_shutdown_seconds: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawLoggingSettings {
    level: Option<String>,
    json: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawDatabaseSettings {
    url: Option<String>,
    max_connections: Option<u32>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawRevalidationSettings {
    secret: Option<String>,
    default_paths: Option<Vec<String>>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawPollSettings {
    page_prefix: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawCacheSettings {
    enabled: Option<bool>,
    response_limit: Option<usize>,
    body_limit_bytes: Option<usize>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawOriginSettings {
    url: Option<String>,
    timeout_seconds: Option<u64>,
}

fn parse_socket_addr(host: &str, port: u16) -> Result<SocketAddr, String> {
    let candidate = format!("{host}:{port}");
    candidate
        .parse()
        .map_err(|err| format!("invalid address `{candidate}`: {err}"))
}

#[cfg(test)]
mod tests;
