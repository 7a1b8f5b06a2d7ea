use clap::{Args, Parser, ValueEnum};
use ipnetwork::IpNetwork;
use uuid::Uuid;

#[derive(Clone, Debug, Parser)]
#[command(version, about, long_about = None)]
pub struct Config {
    #[command(flatten)]
    pub server: ServerConfig,

    #[command(flatten)]
    pub auth: AuthConfig,

    #[command(flatten)]
    pub login: LoginConfig,

    #[command(flatten)]
    pub rate_limit: RateLimitConfig,

    #[command(flatten)]
    pub telemetry: TelemetryConfig,
}

#[derive(Clone, Debug, Args)]
pub struct ServerConfig {
    /// Host to listen on
    #[arg(long, env = "FAKEPROVIDER_HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Port to listen on
    #[arg(long, env = "FAKEPROVIDER_PORT", default_value_t = 8080)]
    pub port: u16,

    /// Comma-separated list of CIDRs to trust for X-Forwarded-For IP extraction
    #[arg(
        long,
        env = "FAKEPROVIDER_TRUSTED_PROXIES",
        default_value = "10.0.0.0/8,172.16.0.0/12,192.168.0.0/16,127.0.0.1/32",
        value_delimiter = ','
    )]
    pub trusted_proxies: Vec<IpNetwork>,

    /// Seconds to wait for background workers after the listener stops
    #[arg(long, env = "FAKEPROVIDER_SHUTDOWN_TIMEOUT_SECS", default_value_t = 5)]
    pub shutdown_timeout_secs: u64,
}

#[derive(Clone, Debug, Args)]
pub struct AuthConfig {
    /// Secret key for session token signing
    #[arg(long, env = "FAKEPROVIDER_SESSION_SECRET")]
    pub session_secret: String,

    /// Session token lifetime in seconds
    #[arg(long, env = "FAKEPROVIDER_SESSION_MAX_AGE_SECS", default_value_t = 259_200)]
    pub session_max_age_secs: u64,
}

/// The single account allowed to log in. Credentials are compared as-is.
#[derive(Clone, Debug, Args)]
pub struct LoginConfig {
    /// Login username (also the session email)
    #[arg(long = "login-username", env = "FAKEPROVIDER_USERNAME")]
    pub username: String,

    /// Login password
    #[arg(long = "login-password", env = "FAKEPROVIDER_PASSWORD")]
    pub password: String,

    /// User id bound to the account; a random one is generated when omitted
    #[arg(long = "login-user-id", env = "FAKEPROVIDER_USER_ID")]
    pub user_id: Option<Uuid>,
}

#[derive(Clone, Debug, Args)]
pub struct RateLimitConfig {
    /// Requests per second allowed for standard endpoints
    #[arg(long, env = "FAKEPROVIDER_RATE_LIMIT_PER_SECOND", default_value_t = 10)]
    pub per_second: u32,

    /// Burst allowance for standard endpoints
    #[arg(long, env = "FAKEPROVIDER_RATE_LIMIT_BURST", default_value_t = 20)]
    pub burst: u32,

    /// Stricter rate limit for the login endpoint
    #[arg(long, env = "FAKEPROVIDER_LOGIN_RATE_LIMIT_PER_SECOND", default_value_t = 1)]
    pub login_per_second: u32,

    /// Burst allowance for the login endpoint
    #[arg(long, env = "FAKEPROVIDER_LOGIN_RATE_LIMIT_BURST", default_value_t = 5)]
    pub login_burst: u32,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Clone, Debug, Args)]
pub struct TelemetryConfig {
    /// Log output format
    #[arg(long, env = "FAKEPROVIDER_LOG_FORMAT", value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,

    /// OTLP collector endpoint; traces and metrics are exported only when set
    #[arg(long, env = "FAKEPROVIDER_OTLP_ENDPOINT")]
    pub otlp_endpoint: Option<String>,
}

impl Config {
    #[must_use]
    pub fn load() -> Self {
        Self::parse()
    }
}
