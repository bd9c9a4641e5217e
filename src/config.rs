use clap::Parser;
use reqwest::Url;
use std::num::ParseIntError;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::ConfigError;

pub const DEFAULT_API_URL: &str = "https://v0-project1-r9.vercel.app";
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 5000;
pub const DEFAULT_LOG_LIMIT: usize = 50;
pub const DEFAULT_LOG_DIR: &str = "logs";
pub const DEFAULT_LOG_LEVEL: &str = "info";

fn parse_duration(s: &str) -> Result<Duration, ParseIntError> {
    let millis: u64 = s.parse()?;
    Ok(Duration::from_millis(millis))
}

#[derive(Clone, Debug, Parser)]
#[command(version, about = "Live view of tracked devices and their hardware events", long_about = None)]
pub struct Cli {
    /// Base URL of the device monitoring service
    #[arg(env = "FLEETWATCH_API_URL", long = "api-url", value_name = "url")]
    pub api_url: Option<String>,

    /// Refresh period in milliseconds
    #[arg(
        env = "FLEETWATCH_POLL_INTERVAL_MS",
        long = "poll-interval-ms",
        value_name = "ms",
        value_parser = parse_duration
    )]
    pub poll_interval: Option<Duration>,

    /// Number of recent log entries requested per refresh
    #[arg(env = "FLEETWATCH_LOG_LIMIT", long = "log-limit", value_name = "n")]
    pub log_limit: Option<usize>,

    /// Per-request timeout in milliseconds, defaults to twice the poll interval
    #[arg(
        env = "FLEETWATCH_REQUEST_TIMEOUT_MS",
        long = "request-timeout-ms",
        value_name = "ms",
        value_parser = parse_duration
    )]
    pub request_timeout: Option<Duration>,

    /// Directory for rotated log files
    #[arg(env = "FLEETWATCH_LOG_DIR", long = "log-dir", value_name = "dir")]
    pub log_dir: Option<PathBuf>,

    /// Log filter, eg. "debug" or "fleetwatch=trace"
    #[arg(env = "FLEETWATCH_LOG_LEVEL", long = "log-level", value_name = "spec")]
    pub log_level: Option<String>,

    /// Device id to select once it shows up in the roster
    #[arg(long = "select", value_name = "device_id")]
    pub select: Option<String>,
}

/// Settings for one dashboard session
#[derive(Clone, Debug)]
pub struct Config {
    pub base_url: String,
    pub poll_interval: Duration,
    pub log_limit: usize,
    pub request_timeout: Duration,
    pub log_dir: PathBuf,
    pub log_level: String,
    pub select: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        let poll_interval = Duration::from_millis(DEFAULT_POLL_INTERVAL_MS);
        Self {
            base_url: DEFAULT_API_URL.to_string(),
            poll_interval,
            log_limit: DEFAULT_LOG_LIMIT,
            request_timeout: poll_interval * 2,
            log_dir: PathBuf::from(DEFAULT_LOG_DIR),
            log_level: DEFAULT_LOG_LEVEL.to_string(),
            select: None,
        }
    }
}

impl Config {
    /// Merge command line/environment values over the defaults
    pub fn from_cli(cli: Cli) -> Result<Self, ConfigError> {
        let defaults = Config::default();
        let poll_interval = cli.poll_interval.unwrap_or(defaults.poll_interval);

        let config = Config {
            base_url: normalize_base_url(cli.api_url.as_deref().unwrap_or(DEFAULT_API_URL))?,
            poll_interval,
            log_limit: cli.log_limit.unwrap_or(defaults.log_limit),
            request_timeout: cli.request_timeout.unwrap_or(poll_interval * 2),
            log_dir: cli.log_dir.unwrap_or(defaults.log_dir),
            log_level: cli.log_level.unwrap_or(defaults.log_level),
            select: cli.select.filter(|id| !id.trim().is_empty()),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.poll_interval.is_zero() {
            return Err(ConfigError::Zero("poll interval"));
        }
        if self.request_timeout.is_zero() {
            return Err(ConfigError::Zero("request timeout"));
        }
        if self.log_limit == 0 {
            return Err(ConfigError::Zero("log limit"));
        }
        Ok(())
    }
}

/// Checks the scheme and strips trailing slashes so paths can be appended.
pub fn normalize_base_url(raw: &str) -> Result<String, ConfigError> {
    let trimmed = raw.trim().trim_end_matches('/');
    let url = Url::parse(trimmed)
        .map_err(|e| ConfigError::BaseUrl(raw.to_string(), e.to_string()))?;

    match url.scheme() {
        "http" | "https" => Ok(trimmed.to_string()),
        other => Err(ConfigError::BaseUrl(
            raw.to_string(),
            format!("unsupported scheme {other}"),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        let mut argv = vec!["fleetwatch"];
        argv.extend_from_slice(args);
        Cli::try_parse_from(argv).unwrap()
    }

    #[test]
    fn flags_override_defaults() {
        let config = Config::from_cli(parse(&[
            "--api-url",
            "http://localhost:3000/",
            "--poll-interval-ms",
            "1000",
            "--log-limit",
            "10",
        ]))
        .unwrap();

        assert_eq!(config.base_url, "http://localhost:3000");
        assert_eq!(config.poll_interval, Duration::from_millis(1000));
        assert_eq!(config.log_limit, 10);
        assert_eq!(config.request_timeout, Duration::from_millis(2000));
    }

    #[test]
    fn explicit_timeout_is_kept() {
        let config = Config::from_cli(parse(&["--request-timeout-ms", "750"])).unwrap();
        assert_eq!(config.request_timeout, Duration::from_millis(750));
    }

    #[test]
    fn default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.base_url, DEFAULT_API_URL);
        assert_eq!(config.log_limit, 50);
        assert_eq!(config.poll_interval, Duration::from_millis(5000));
        assert_eq!(config.request_timeout, Duration::from_millis(10000));
    }

    #[test]
    fn zero_interval_is_rejected() {
        let config = Config {
            poll_interval: Duration::ZERO,
            ..Config::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::Zero(_))));
    }

    #[test]
    fn zero_limit_is_rejected() {
        let config = Config {
            log_limit: 0,
            ..Config::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::Zero("log limit"))));
    }

    #[test]
    fn base_url_must_be_http() {
        assert!(normalize_base_url("ftp://example.com").is_err());
        assert!(normalize_base_url("not a url").is_err());
        assert_eq!(
            normalize_base_url(" https://example.com// ").unwrap(),
            "https://example.com"
        );
    }
}
