use std::env;
use std::net::{IpAddr, SocketAddr};

/// Deployment stage the service runs in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

/// Which narrator explains freshly calculated confidence scores.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExplainerKind {
    Rules,
    Disabled,
}

impl ExplainerKind {
    fn parse(value: &str) -> Result<Self, ConfigError> {
        match value.trim().to_ascii_lowercase().as_str() {
            "rules" | "rule" => Ok(Self::Rules),
            "none" | "off" | "disabled" => Ok(Self::Disabled),
            other => Err(ConfigError::InvalidExplainer(other.to_string())),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub confidence: ConfidenceConfig,
}

impl AppConfig {
    /// Reads `.env` (when present) and then the `APP_*` variables, falling back to defaults.
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::parse(&var_or("APP_ENV", "development"));
        let host = var_or("APP_HOST", "127.0.0.1");
        let port = var_or("APP_PORT", "3000")
            .trim()
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;
        let log_level = var_or("APP_LOG_LEVEL", "info");

        let explainer = ExplainerKind::parse(&var_or("APP_RCS_EXPLAINER", "rules"))?;
        let raw_score = var_or("APP_SECURITY_OPS_SCORE", "100");
        let security_ops_score = raw_score
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|score| (0.0..=100.0).contains(score))
            .ok_or(ConfigError::InvalidSecurityOpsScore(raw_score))?;

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            confidence: ConfidenceConfig {
                explainer,
                security_ops_score,
            },
        })
    }
}

fn var_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

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

        let ip: IpAddr = self.host.parse()?;
        Ok(SocketAddr::new(ip, self.port))
    }
}

#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

/// Knobs for the confidence engine's in-process collaborators.
#[derive(Debug, Clone)]
pub struct ConfidenceConfig {
    pub explainer: ExplainerKind,
    /// Fixed security & ops pillar value reported by the built-in scorer.
    pub security_ops_score: f64,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("APP_PORT must be a valid u16")]
    InvalidPort,
    #[error("APP_HOST must parse to an IPv4 or IPv6 address")]
    InvalidHost(#[from] std::net::AddrParseError),
    #[error("APP_RCS_EXPLAINER must be `rules` or `none`, got `{0}`")]
    InvalidExplainer(String),
    #[error("APP_SECURITY_OPS_SCORE must be a number between 0 and 100, got `{0}`")]
    InvalidSecurityOpsScore(String),
}
