//! Application configuration management.
//!
//! Provides typed configuration loaded from environment variables with validation.

use std::path::PathBuf;
use std::time::Duration;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Address the HTTP server binds to
    pub host: String,

    /// Server port to bind to
    pub port: u16,

    /// Target chat platform settings
    pub platform: PlatformConfig,

    /// Browser driver sidecar settings
    pub driver: DriverConfig,

    /// Remote credentials service settings
    pub credentials: CredentialsConfig,

    /// Static session values used when the credentials service has nothing
    pub fallback_session: FallbackSessionConfig,

    /// Path of the persisted storage-state snapshot
    pub session_file: PathBuf,

    /// Task execution settings
    pub worker: WorkerConfig,

    /// Task listing limits
    pub listing: ListingConfig,

    /// Archive download settings
    pub download: DownloadConfig,

    /// Logging settings
    pub observability: ObservabilityConfig,
}

/// Target platform and the browser settings forwarded to the driver.
#[derive(Debug, Clone)]
pub struct PlatformConfig {
    /// Platform identifier accepted in requests
    pub name: String,

    /// Base URL of the web front-end
    pub base_url: String,

    /// Run the browser without a window
    pub headless: bool,

    /// Keep a persistent browser profile between runs
    pub persistent_profile: bool,

    /// Global browser operation timeout
    pub browser_timeout: Duration,

    /// Page load timeout
    pub page_timeout: Duration,
}

/// Browser driver sidecar configuration.
#[derive(Debug, Clone)]
pub struct DriverConfig {
    /// Base URL of the sidecar
    pub url: String,

    /// Upper bound for a single driver HTTP exchange
    pub request_timeout: Duration,
}

/// Remote credentials service configuration.
#[derive(Debug, Clone)]
pub struct CredentialsConfig {
    /// Base URL, `None` disables the service
    pub url: Option<String>,

    /// API key sent with every request, `None` disables the service
    pub token: Option<String>,

    /// Request timeout
    pub timeout: Duration,

    /// User whose credential is looked up
    pub user_identifier: String,

    /// Consecutive failures before the service is skipped
    pub failure_threshold: u32,

    /// How long the service is skipped after tripping
    pub recovery_timeout: Duration,
}

/// Statically configured session values.
#[derive(Debug, Clone, Default)]
pub struct FallbackSessionConfig {
    /// JSON object of cookie name to value
    pub cookies: Option<String>,

    /// Session token cookie
    pub session_token: Option<String>,

    /// Auth token cookie
    pub auth_token: Option<String>,

    /// JSON object of localStorage key to value
    pub local_storage: Option<String>,
}

/// Worker and registry configuration.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Maximum number of tasks running at once
    pub max_concurrent_tasks: usize,

    /// Capacity of the background work queue
    pub queue_capacity: usize,

    /// Interval between retention sweeps
    pub sweep_interval: Duration,

    /// Age after which finished tasks are evicted
    pub task_max_age: Duration,
}

/// Task listing configuration.
#[derive(Debug, Clone)]
pub struct ListingConfig {
    /// Default number of tasks returned
    pub default_limit: usize,

    /// Maximum number of tasks returned
    pub max_limit: usize,
}

/// Archive download configuration.
#[derive(Debug, Clone)]
pub struct DownloadConfig {
    /// Largest archive accepted, in bytes
    pub max_bytes: u64,

    /// Download timeout
    pub timeout: Duration,

    /// Skip internal-host checks on archive URLs
    /// In debug builds, this defaults to true
    pub skip_url_checks: bool,

    /// Hostnames never fetched
    pub blocked_hostnames: Vec<String>,

    /// Hostname suffixes never fetched
    pub blocked_hostname_suffixes: Vec<String>,
}

/// Logging configuration.
#[derive(Debug, Clone)]
pub struct ObservabilityConfig {
    /// Default log filter when `RUST_LOG` is not set
    pub log_level: String,
}

impl Default for PlatformConfig {
    fn default() -> Self {
        Self {
            name: "manus".to_string(),
            base_url: "https://www.manus.im".to_string(),
            headless: true,
            persistent_profile: false,
            browser_timeout: Duration::from_millis(30_000),
            page_timeout: Duration::from_millis(15_000),
        }
    }
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            url: "http://127.0.0.1:9222".to_string(),
            request_timeout: Duration::from_secs(330),
        }
    }
}

impl Default for CredentialsConfig {
    fn default() -> Self {
        Self {
            url: None,
            token: None,
            timeout: Duration::from_secs(30),
            user_identifier: "default".to_string(),
            failure_threshold: 3,
            recovery_timeout: Duration::from_secs(60),
        }
    }
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            max_concurrent_tasks: 5,
            queue_capacity: 100,
            sweep_interval: Duration::from_secs(600),
            task_max_age: Duration::from_secs(60 * 60 * 24), // 24 hours
        }
    }
}

impl Default for ListingConfig {
    fn default() -> Self {
        Self {
            default_limit: 50,
            max_limit: 500,
        }
    }
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            max_bytes: 1024 * 1024 * 1024,
            timeout: Duration::from_secs(120),
            skip_url_checks: cfg!(debug_assertions),
            blocked_hostnames: vec![
                "localhost".to_string(),
                "127.0.0.1".to_string(),
                "::1".to_string(),
                "0.0.0.0".to_string(),
            ],
            blocked_hostname_suffixes: vec![
                ".local".to_string(),
                ".internal".to_string(),
                ".localhost".to_string(),
            ],
        }
    }
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            platform: PlatformConfig::default(),
            driver: DriverConfig::default(),
            credentials: CredentialsConfig::default(),
            fallback_session: FallbackSessionConfig::default(),
            session_file: PathBuf::from("session_state.json"),
            worker: WorkerConfig::default(),
            listing: ListingConfig::default(),
            download: DownloadConfig::default(),
            observability: ObservabilityConfig::default(),
        }
    }
}

/// Configuration loading error.
#[derive(Debug)]
pub struct ConfigError {
    pub field: String,
    pub message: String,
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Configuration error for '{}': {}",
            self.field, self.message
        )
    }
}

impl std::error::Error for ConfigError {}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Every variable is optional:
    /// - `API_HOST` / `API_PORT`: bind address (default: 0.0.0.0:8000)
    /// - `PLATFORM_NAME`: accepted platform (default: manus)
    /// - `MANUS_BASE_URL`: platform front-end (default: https://www.manus.im)
    /// - `HEADLESS`, `USE_PERSISTENT_CONTEXT`: browser toggles (default: 1, 0)
    /// - `BROWSER_TIMEOUT_MS`, `PAGE_TIMEOUT_MS`: browser timeouts (default: 30000, 15000)
    /// - `DRIVER_URL`: browser driver sidecar (default: http://127.0.0.1:9222)
    /// - `DRIVER_REQUEST_TIMEOUT_SECS`: sidecar exchange timeout (default: 330)
    /// - `CREDENTIALS_API_URL`, `CREDENTIALS_API_TOKEN`: credentials service
    /// - `CREDENTIALS_API_TIMEOUT_SECS`: credentials request timeout (default: 30)
    /// - `CREDENTIALS_USER`: user identifier looked up (default: default)
    /// - `MANUS_COOKIES`, `MANUS_SESSION_TOKEN`, `MANUS_AUTH_TOKEN`, `MANUS_LOCAL_STORAGE`
    /// - `SESSION_FILE`: storage-state snapshot (default: session_state.json)
    /// - `MAX_CONCURRENT_TASKS`: concurrency cap (default: 5)
    /// - `TASK_QUEUE_CAPACITY`: background queue size (default: 100)
    /// - `SWEEP_INTERVAL_SECS`, `TASK_MAX_AGE_SECS`: retention (default: 600, 86400)
    /// - `TASKS_DEFAULT_LIMIT`, `TASKS_MAX_LIMIT`: listing limits (default: 50, 500)
    /// - `DOWNLOAD_MAX_BYTES`, `DOWNLOAD_TIMEOUT_SECS`: archive download (default: 1GiB, 120)
    /// - `SKIP_URL_CHECKS`: skip internal-host checks (default: 1 in debug, 0 in release)
    /// - `LOG_LEVEL`: default log filter (default: info)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build configuration from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Config::default();
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let platform = PlatformConfig {
            name: var("PLATFORM_NAME").unwrap_or(defaults.platform.name),
            base_url: var("MANUS_BASE_URL").unwrap_or(defaults.platform.base_url),
            headless: parse_flag(&var, "HEADLESS", defaults.platform.headless)?,
            persistent_profile: parse_flag(
                &var,
                "USE_PERSISTENT_CONTEXT",
                defaults.platform.persistent_profile,
            )?,
            browser_timeout: Duration::from_millis(parse_or(&var, "BROWSER_TIMEOUT_MS", 30_000)?),
            page_timeout: Duration::from_millis(parse_or(&var, "PAGE_TIMEOUT_MS", 15_000)?),
        };

        let driver = DriverConfig {
            url: var("DRIVER_URL").unwrap_or(defaults.driver.url),
            request_timeout: Duration::from_secs(parse_or(
                &var,
                "DRIVER_REQUEST_TIMEOUT_SECS",
                330,
            )?),
        };

        let credentials = CredentialsConfig {
            url: var("CREDENTIALS_API_URL"),
            token: var("CREDENTIALS_API_TOKEN"),
            timeout: Duration::from_secs(parse_or(&var, "CREDENTIALS_API_TIMEOUT_SECS", 30)?),
            user_identifier: var("CREDENTIALS_USER")
                .unwrap_or(defaults.credentials.user_identifier),
            ..defaults.credentials
        };

        let fallback_session = FallbackSessionConfig {
            cookies: var("MANUS_COOKIES"),
            session_token: var("MANUS_SESSION_TOKEN"),
            auth_token: var("MANUS_AUTH_TOKEN"),
            local_storage: var("MANUS_LOCAL_STORAGE"),
        };

        let worker = WorkerConfig {
            max_concurrent_tasks: parse_or(&var, "MAX_CONCURRENT_TASKS", 5)?,
            queue_capacity: parse_or(&var, "TASK_QUEUE_CAPACITY", 100)?,
            sweep_interval: Duration::from_secs(parse_or(&var, "SWEEP_INTERVAL_SECS", 600)?),
            task_max_age: Duration::from_secs(parse_or(&var, "TASK_MAX_AGE_SECS", 86_400)?),
        };

        let listing = ListingConfig {
            default_limit: parse_or(&var, "TASKS_DEFAULT_LIMIT", 50)?,
            max_limit: parse_or(&var, "TASKS_MAX_LIMIT", 500)?,
        };

        let download = DownloadConfig {
            max_bytes: parse_or(&var, "DOWNLOAD_MAX_BYTES", defaults.download.max_bytes)?,
            timeout: Duration::from_secs(parse_or(&var, "DOWNLOAD_TIMEOUT_SECS", 120)?),
            skip_url_checks: parse_flag(&var, "SKIP_URL_CHECKS", cfg!(debug_assertions))?,
            ..defaults.download
        };

        let config = Self {
            host: var("API_HOST").unwrap_or(defaults.host),
            port: parse_or(&var, "API_PORT", 8000)?,
            platform,
            driver,
            credentials,
            fallback_session,
            session_file: var("SESSION_FILE")
                .map(PathBuf::from)
                .unwrap_or(defaults.session_file),
            worker,
            listing,
            download,
            observability: ObservabilityConfig {
                log_level: var("LOG_LEVEL")
                    .map(|l| l.to_lowercase())
                    .unwrap_or(defaults.observability.log_level),
            },
        };

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.platform.name.trim().is_empty() {
            return Err(ConfigError {
                field: "PLATFORM_NAME".to_string(),
                message: "Cannot be empty".to_string(),
            });
        }

        for (field, value) in [
            ("MANUS_BASE_URL", &self.platform.base_url),
            ("DRIVER_URL", &self.driver.url),
        ] {
            if !value.starts_with("http://") && !value.starts_with("https://") {
                return Err(ConfigError {
                    field: field.to_string(),
                    message: "Must start with http:// or https://".to_string(),
                });
            }
        }

        if self.worker.max_concurrent_tasks == 0 {
            return Err(ConfigError {
                field: "MAX_CONCURRENT_TASKS".to_string(),
                message: "Must be greater than 0".to_string(),
            });
        }

        if self.worker.queue_capacity == 0 {
            return Err(ConfigError {
                field: "TASK_QUEUE_CAPACITY".to_string(),
                message: "Must be greater than 0".to_string(),
            });
        }

        if self.listing.max_limit == 0 {
            return Err(ConfigError {
                field: "TASKS_MAX_LIMIT".to_string(),
                message: "Must be greater than 0".to_string(),
            });
        }

        if self.listing.default_limit > self.listing.max_limit {
            return Err(ConfigError {
                field: "TASKS_DEFAULT_LIMIT".to_string(),
                message: "Cannot be greater than TASKS_MAX_LIMIT".to_string(),
            });
        }

        Ok(())
    }

    /// Whether the remote credentials service has both a URL and a token.
    pub fn credentials_enabled(&self) -> bool {
        self.credentials.url.is_some() && self.credentials.token.is_some()
    }
}

/// Parse a variable or return a default value.
fn parse_or<T, F>(var: &F, name: &str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    F: Fn(&str) -> Option<String>,
{
    match var(name) {
        Some(val) => val.trim().parse().map_err(|_| ConfigError {
            field: name.to_string(),
            message: format!("Invalid value '{}', expected a valid number", val),
        }),
        None => Ok(default),
    }
}

/// Parse a boolean flag: accepts 1/0, true/false, yes/no.
fn parse_flag<F>(var: &F, name: &str, default: bool) -> Result<bool, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match var(name) {
        Some(val) => match val.trim().to_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => Err(ConfigError {
                field: name.to_string(),
                message: format!("Invalid value '{}', expected a boolean", val),
            }),
        },
        None => Ok(default),
    }
}
