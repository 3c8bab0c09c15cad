use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use crate::workflows::evidence::domain::RentalKind;

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
    pub evidence: EvidenceConfig,
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
        let log_format = match env::var("APP_LOG_FORMAT") {
            Ok(raw) => LogFormat::parse(&raw).ok_or(ConfigError::InvalidLogFormat(raw))?,
            Err(_) => LogFormat::Compact,
        };

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig {
                log_level,
                log_format,
            },
            evidence: EvidenceConfig::from_env()?,
        })
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

/// Output shape of the tracing subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Compact,
    Json,
}

impl LogFormat {
    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" | "text" => Some(Self::Compact),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

/// Tracing and metrics controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
    pub log_format: LogFormat,
}

pub const DEFAULT_MAX_IMAGE_BYTES: usize = 10 * 1024 * 1024;
pub const DEFAULT_GEOLOCATION_TIMEOUT: Duration = Duration::from_secs(5);
pub const DEFAULT_MAX_CUSTOM_AREAS: usize = 20;
pub const DEFAULT_BLOB_BASE_URL: &str = "memory://evidence";

/// Limits and policies applied by the evidence workflow.
#[derive(Debug, Clone, PartialEq)]
pub struct EvidenceConfig {
    /// Upper bound for a single photo or signature payload.
    pub max_image_bytes: usize,
    pub geolocation_timeout: Duration,
    pub max_custom_areas: usize,
    /// Rental kinds whose checklists block phase completion.
    pub mandatory_checklists: Vec<RentalKind>,
    pub blob_base_url: String,
}

impl Default for EvidenceConfig {
    fn default() -> Self {
        Self {
            max_image_bytes: DEFAULT_MAX_IMAGE_BYTES,
            geolocation_timeout: DEFAULT_GEOLOCATION_TIMEOUT,
            max_custom_areas: DEFAULT_MAX_CUSTOM_AREAS,
            mandatory_checklists: Vec::new(),
            blob_base_url: DEFAULT_BLOB_BASE_URL.to_string(),
        }
    }
}

impl EvidenceConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let max_image_bytes = match env::var("EVIDENCE_MAX_IMAGE_BYTES") {
            Ok(raw) => raw
                .trim()
                .parse::<usize>()
                .ok()
                .filter(|value| *value > 0)
                .ok_or(ConfigError::InvalidNumber {
                    key: "EVIDENCE_MAX_IMAGE_BYTES",
                    value: raw,
                })?,
            Err(_) => defaults.max_image_bytes,
        };

        let geolocation_timeout = match env::var("EVIDENCE_GEOLOCATION_TIMEOUT_SECS") {
            Ok(raw) => raw
                .trim()
                .parse::<u64>()
                .map(Duration::from_secs)
                .map_err(|_| ConfigError::InvalidNumber {
                    key: "EVIDENCE_GEOLOCATION_TIMEOUT_SECS",
                    value: raw,
                })?,
            Err(_) => defaults.geolocation_timeout,
        };

        let max_custom_areas = match env::var("EVIDENCE_MAX_CUSTOM_AREAS") {
            Ok(raw) => raw
                .trim()
                .parse::<usize>()
                .map_err(|_| ConfigError::InvalidNumber {
                    key: "EVIDENCE_MAX_CUSTOM_AREAS",
                    value: raw,
                })?,
            Err(_) => defaults.max_custom_areas,
        };

        let mandatory_checklists = match env::var("EVIDENCE_MANDATORY_CHECKLISTS") {
            Ok(raw) => parse_kinds(&raw)?,
            Err(_) => defaults.mandatory_checklists,
        };

        let blob_base_url = env::var("EVIDENCE_BLOB_BASE_URL")
            .map(|raw| raw.trim().trim_end_matches('/').to_string())
            .unwrap_or(defaults.blob_base_url);

        Ok(Self {
            max_image_bytes,
            geolocation_timeout,
            max_custom_areas,
            mandatory_checklists,
            blob_base_url,
        })
    }
}

fn parse_kinds(raw: &str) -> Result<Vec<RentalKind>, ConfigError> {
    let mut kinds = Vec::new();
    for part in raw.split(',').map(str::trim).filter(|part| !part.is_empty()) {
        let kind =
            RentalKind::parse(part).ok_or_else(|| ConfigError::UnknownRentalKind(part.to_string()))?;
        if !kinds.contains(&kind) {
            kinds.push(kind);
        }
    }
    Ok(kinds)
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidLogFormat(String),
    InvalidNumber { key: &'static str, value: String },
    UnknownRentalKind(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidLogFormat(value) => {
                write!(f, "APP_LOG_FORMAT must be 'compact' or 'json', got '{value}'")
            }
            ConfigError::InvalidNumber { key, value } => {
                write!(f, "{key} must be a positive integer, got '{value}'")
            }
            ConfigError::UnknownRentalKind(value) => write!(
                f,
                "EVIDENCE_MANDATORY_CHECKLISTS entries must be vehicle, dwelling or goods, got '{value}'"
            ),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            ConfigError::InvalidPort
            | ConfigError::InvalidLogFormat(_)
            | ConfigError::InvalidNumber { .. }
            | ConfigError::UnknownRentalKind(_) => None,
        }
    }
}
