use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use crate::workflows::homework::{FieldMode, HomeworkSettings};

/// Distinguishes runtime behavior for different stages of the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

/// Top-level configuration for the application.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub recruitee: RecruiteeConfig,
    pub gitlab: GitlabConfig,
    pub homework: HomeworkSettings,
    pub poll: PollConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let recruitee = RecruiteeConfig {
            base_url: env::var("RECRUITEE_BASE_URL")
                .unwrap_or_else(|_| "https://api.recruitee.com".to_string()),
            company_id: required("RECRUITEE_COMPANY_ID")?,
            token: required("RECRUITEE_TOKEN")?,
        };

        let gitlab = GitlabConfig {
            base_url: env::var("GITLAB_BASE_URL")
                .unwrap_or_else(|_| "https://gitlab.com".to_string()),
            token: required("GITLAB_TOKEN")?,
            template_namespace: env::var("GITLAB_TEMPLATE_NAMESPACE")
                .unwrap_or_else(|_| "homework-templates".to_string()),
            target_namespace: env::var("GITLAB_TARGET_NAMESPACE")
                .unwrap_or_else(|_| "homework".to_string()),
            webhook_secret: optional("GITLAB_WEBHOOK_SECRET"),
        };

        let field_mode = match optional("HOMEWORK_FIELD_MODE") {
            Some(raw) => FieldMode::parse(&raw).ok_or(ConfigError::InvalidFieldMode(raw))?,
            None => FieldMode::default(),
        };
        let delete_fork_after_send = match optional("HOMEWORK_DELETE_FORK") {
            Some(raw) => parse_bool(&raw).ok_or(ConfigError::InvalidBool {
                name: "HOMEWORK_DELETE_FORK",
                value: raw,
            })?,
            None => false,
        };

        let homework = HomeworkSettings {
            required_tag: optional("HOMEWORK_REQUIRED_TAG"),
            offer_tag: optional("HOMEWORK_OFFER_TAG"),
            delete_fork_after_send,
            field_mode,
            template_namespace: gitlab.template_namespace.clone(),
            target_namespace: gitlab.target_namespace.clone(),
            ..HomeworkSettings::default()
        };

        let interval_secs = env::var("POLL_INTERVAL_SECS")
            .unwrap_or_else(|_| "300".to_string())
            .parse::<u64>()
            .map_err(|_| ConfigError::InvalidPollInterval)?;

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            recruitee,
            gitlab,
            homework,
            poll: PollConfig { interval_secs },
        })
    }
}

fn required(name: &'static str) -> Result<String, ConfigError> {
    optional(name).ok_or(ConfigError::Missing(name))
}

fn optional(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Settings controlling the HTTP server binding.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        if self.host.eq_ignore_ascii_case("localhost") {
            return Ok(SocketAddr::new(IpAddr::from([127, 0, 0, 1]), self.port));
        }

        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|source| ConfigError::InvalidHost { source })?;

        Ok(SocketAddr::new(ip, self.port))
    }
}

/// Tracing controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

/// Credentials and location of the Recruitee company account.
#[derive(Clone)]
pub struct RecruiteeConfig {
    pub base_url: String,
    pub company_id: String,
    pub token: String,
}

impl fmt::Debug for RecruiteeConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecruiteeConfig")
            .field("base_url", &self.base_url)
            .field("company_id", &self.company_id)
            .finish_non_exhaustive()
    }
}

/// GitLab instance, namespaces and webhook verification secret.
#[derive(Clone)]
pub struct GitlabConfig {
    pub base_url: String,
    pub token: String,
    pub template_namespace: String,
    pub target_namespace: String,
    pub webhook_secret: Option<String>,
}

impl fmt::Debug for GitlabConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GitlabConfig")
            .field("base_url", &self.base_url)
            .field("template_namespace", &self.template_namespace)
            .field("target_namespace", &self.target_namespace)
            .field("webhook_secret", &self.webhook_secret.is_some())
            .finish_non_exhaustive()
    }
}

/// Period of the batch poll trigger. Zero disables polling.
#[derive(Debug, Clone, Copy)]
pub struct PollConfig {
    pub interval_secs: u64,
}

impl PollConfig {
    pub fn interval(&self) -> Option<Duration> {
        (self.interval_secs > 0).then(|| Duration::from_secs(self.interval_secs))
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    Missing(&'static str),
    InvalidFieldMode(String),
    InvalidBool { name: &'static str, value: String },
    InvalidPollInterval,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::Missing(name) => write!(f, "{name} must be set"),
            ConfigError::InvalidFieldMode(value) => write!(
                f,
                "HOMEWORK_FIELD_MODE must be 'strict' or 'lenient', got '{value}'"
            ),
            ConfigError::InvalidBool { name, value } => {
                write!(f, "{name} must be a boolean, got '{value}'")
            }
            ConfigError::InvalidPollInterval => {
                write!(f, "POLL_INTERVAL_SECS must be a whole number of seconds")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            _ => None,
        }
    }
}
