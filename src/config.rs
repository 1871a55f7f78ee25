use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use tracing_subscriber::EnvFilter;
use validator::Validate;

const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_ENV: &str = "development";
const DEFAULT_PORT: u16 = 8080;
const DEFAULT_CURRENCY: &str = "NGN";
const CONFIG_DIR: &str = "config";

/// Application configuration with validation.
///
/// Values are layered from `config/default`, `config/{environment}` and
/// `APP__*` environment variables, the latter taking precedence.
#[derive(Clone, Debug, Deserialize, Validate)]
pub struct AppConfig {
    /// Database connection URL
    pub database_url: String,

    /// JWT signing secret (minimum 32 characters)
    #[validate(length(min = 32))]
    pub jwt_secret: String,

    /// JWT expiration time in seconds
    #[serde(default = "default_jwt_expiration")]
    pub jwt_expiration_secs: u64,

    /// Server host address
    #[serde(default = "default_host")]
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Application environment (development | production | test)
    #[serde(default = "default_environment")]
    pub environment: String,

    /// Logging level
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Log in JSON format (structured logging)
    #[serde(default)]
    pub log_json: bool,

    /// Whether to run database migrations on startup
    #[serde(default)]
    pub auto_migrate: bool,

    /// CORS: comma-separated list of allowed origins
    #[serde(default)]
    pub cors_allowed_origins: Option<String>,

    /// DB pool: max connections
    #[serde(default = "default_db_max_connections")]
    pub db_max_connections: u32,

    /// DB pool: min connections
    #[serde(default = "default_db_min_connections")]
    pub db_min_connections: u32,

    /// DB pool: connect timeout in seconds
    #[serde(default = "default_db_timeout")]
    pub db_connect_timeout_secs: u64,

    /// DB pool: acquire timeout in seconds
    #[serde(default = "default_db_timeout")]
    pub db_acquire_timeout_secs: u64,

    /// Currency used for payment initialization
    #[serde(default = "default_currency")]
    pub currency: String,

    /// Storefront URL the payment gateway redirects back to
    #[serde(default = "default_frontend_url")]
    pub frontend_url: String,

    /// Base URL of the hosted-payment gateway API
    #[serde(default = "default_gateway_base_url")]
    pub gateway_base_url: String,

    /// Secret key for the hosted-payment gateway
    #[serde(default)]
    pub gateway_secret_key: String,

    /// Timeout for outbound gateway calls in seconds
    #[serde(default = "default_gateway_timeout")]
    pub gateway_timeout_secs: u64,

    /// SMTP relay host for verification mail (mailer disabled when unset)
    #[serde(default)]
    pub smtp_host: Option<String>,

    /// SMTP username
    #[serde(default)]
    pub smtp_username: Option<String>,

    /// SMTP password
    #[serde(default)]
    pub smtp_password: Option<String>,

    /// From address for outbound mail
    #[serde(default = "default_mail_from")]
    pub mail_from: String,
}

fn default_jwt_expiration() -> u64 {
    7200
}
fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    DEFAULT_PORT
}
fn default_environment() -> String {
    DEFAULT_ENV.to_string()
}
fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}
fn default_db_max_connections() -> u32 {
    10
}
fn default_db_min_connections() -> u32 {
    1
}
fn default_db_timeout() -> u64 {
    30
}
fn default_currency() -> String {
    DEFAULT_CURRENCY.to_string()
}
fn default_frontend_url() -> String {
    "http://localhost:5173".to_string()
}
fn default_gateway_base_url() -> String {
    "https://api.flutterwave.com/v3".to_string()
}
fn default_gateway_timeout() -> u64 {
    15
}
fn default_mail_from() -> String {
    "Grandeur <no-reply@grandeur.shop>".to_string()
}

impl AppConfig {
    /// Construct a configuration programmatically (used by the test harness;
    /// production startup goes through [`load_config`]).
    pub fn new(
        database_url: String,
        jwt_secret: String,
        host: String,
        port: u16,
        environment: String,
    ) -> Self {
        Self {
            database_url,
            jwt_secret,
            jwt_expiration_secs: default_jwt_expiration(),
            host,
            port,
            environment,
            log_level: default_log_level(),
            log_json: false,
            auto_migrate: false,
            cors_allowed_origins: None,
            db_max_connections: default_db_max_connections(),
            db_min_connections: default_db_min_connections(),
            db_connect_timeout_secs: default_db_timeout(),
            db_acquire_timeout_secs: default_db_timeout(),
            currency: default_currency(),
            frontend_url: default_frontend_url(),
            gateway_base_url: default_gateway_base_url(),
            gateway_secret_key: String::new(),
            gateway_timeout_secs: default_gateway_timeout(),
            smtp_host: None,
            smtp_username: None,
            smtp_password: None,
            mail_from: default_mail_from(),
        }
    }

    pub fn is_development(&self) -> bool {
        self.environment == "development" || self.environment == "test"
    }

    pub fn log_level(&self) -> &str {
        &self.log_level
    }
}

/// Load configuration from files and environment.
pub fn load_config() -> Result<AppConfig, ConfigError> {
    let environment = std::env::var("APP_ENV").unwrap_or_else(|_| DEFAULT_ENV.to_string());

    let cfg: AppConfig = Config::builder()
        .add_source(File::with_name(&format!("{}/default", CONFIG_DIR)).required(false))
        .add_source(File::with_name(&format!("{}/{}", CONFIG_DIR, environment)).required(false))
        .add_source(Environment::with_prefix("APP").separator("__"))
        .build()?
        .try_deserialize()?;

    cfg.validate()
        .map_err(|e| ConfigError::Message(format!("invalid configuration: {}", e)))?;

    Ok(cfg)
}

/// Initialize the global tracing subscriber.
pub fn init_tracing(log_level: &str, json: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("grandeur_api={0},tower_http={0}", log_level)));

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}
