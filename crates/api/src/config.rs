use domain::models::medication::MAX_EXPIRATION_DAYS;
use serde::Deserialize;
use std::collections::BTreeSet;
use std::fmt;
use std::net::SocketAddr;
use std::str::FromStr;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub logging: LoggingConfig,
    #[serde(default)]
    pub security: SecurityConfig,
    /// Shared-secret token settings
    pub jwt: JwtAuthConfig,
    /// Base URLs of sibling services
    #[serde(default)]
    pub services: ServicesConfig,
    #[serde(default)]
    pub scheduling: SchedulingConfig,
    #[serde(default)]
    pub inventory: InventoryConfig,
    #[serde(default)]
    pub medical: MedicalConfig,
    /// Email provider configuration
    #[serde(default)]
    pub email: EmailConfig,
    /// SMS provider configuration
    #[serde(default)]
    pub sms: SmsConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    #[serde(default = "default_max_body_size")]
    pub max_body_size: usize,

    /// Services mounted by this process.
    #[serde(default = "default_services")]
    pub services: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    #[serde(default = "default_min_connections")]
    pub min_connections: u32,

    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_secs: u64,
}

impl From<&DatabaseConfig> for persistence::db::DatabaseConfig {
    fn from(config: &DatabaseConfig) -> Self {
        Self {
            url: config.url.clone(),
            max_connections: config.max_connections,
            min_connections: config.min_connections,
            connect_timeout_secs: config.connect_timeout_secs,
            idle_timeout_secs: config.idle_timeout_secs,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default = "default_log_format")]
    pub format: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SecurityConfig {
    #[serde(default)]
    pub cors_origins: Vec<String>,

    /// Requests per minute per caller; 0 disables the limiter.
    #[serde(default = "default_rate_limit")]
    pub rate_limit_per_minute: u32,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            cors_origins: Vec::new(),
            rate_limit_per_minute: default_rate_limit(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct JwtAuthConfig {
    /// HS256 secret shared by every service.
    pub secret: String,

    #[serde(default = "default_token_expiry")]
    pub token_expiry_secs: i64,

    #[serde(default = "default_jwt_leeway")]
    pub leeway_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServicesConfig {
    #[serde(default = "default_identity_url")]
    pub identity_url: String,

    #[serde(default = "default_scheduling_url")]
    pub scheduling_url: String,

    #[serde(default = "default_medical_url")]
    pub medical_url: String,

    #[serde(default = "default_inventory_url")]
    pub inventory_url: String,

    #[serde(default = "default_notification_url")]
    pub notification_url: String,

    /// Timeout for calls to sibling services.
    #[serde(default = "default_service_timeout")]
    pub request_timeout_secs: u64,
}

impl Default for ServicesConfig {
    fn default() -> Self {
        Self {
            identity_url: default_identity_url(),
            scheduling_url: default_scheduling_url(),
            medical_url: default_medical_url(),
            inventory_url: default_inventory_url(),
            notification_url: default_notification_url(),
            request_timeout_secs: default_service_timeout(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SchedulingConfig {
    /// Accept a booking that starts exactly at `end_time`.
    #[serde(default)]
    pub allow_booking_at_closing_time: bool,

    /// Front desk addresses told about every new booking.
    #[serde(default = "default_receptionist_emails")]
    pub receptionist_emails: Vec<String>,
}

impl Default for SchedulingConfig {
    fn default() -> Self {
        Self {
            allow_booking_at_closing_time: false,
            receptionist_emails: default_receptionist_emails(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct InventoryConfig {
    #[serde(default = "default_expiration_alert_days")]
    pub expiration_alert_days: i64,

    #[serde(default = "default_true")]
    pub auto_alerts_enabled: bool,

    /// UTC hour at which the daily expiration check runs.
    #[serde(default = "default_alert_hour")]
    pub alert_hour_utc: u32,

    /// Recipients of stock alerts. Falls back to the receptionist list when empty.
    #[serde(default)]
    pub alert_recipients: Vec<String>,
}

impl Default for InventoryConfig {
    fn default() -> Self {
        Self {
            expiration_alert_days: default_expiration_alert_days(),
            auto_alerts_enabled: true,
            alert_hour_utc: default_alert_hour(),
            alert_recipients: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MedicalConfig {
    /// Reduce inventory stock when a prescription names a medication and quantity.
    #[serde(default)]
    pub decrement_stock_on_prescription: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EmailConfig {
    #[serde(default)]
    pub enabled: bool,

    /// `console` or `sendgrid`
    #[serde(default = "default_console_provider")]
    pub provider: String,

    #[serde(default)]
    pub sendgrid_api_key: String,

    #[serde(default = "default_sender_email")]
    pub sender_email: String,

    #[serde(default = "default_sender_name")]
    pub sender_name: String,
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            provider: default_console_provider(),
            sendgrid_api_key: String::new(),
            sender_email: default_sender_email(),
            sender_name: default_sender_name(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SmsConfig {
    #[serde(default)]
    pub enabled: bool,

    /// `console` or `twilio`
    #[serde(default = "default_console_provider")]
    pub provider: String,

    #[serde(default)]
    pub twilio_account_sid: String,

    #[serde(default)]
    pub twilio_auth_token: String,

    #[serde(default)]
    pub from_number: String,
}

impl Default for SmsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            provider: default_console_provider(),
            twilio_account_sid: String::new(),
            twilio_auth_token: String::new(),
            from_number: String::new(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    8080
}
fn default_request_timeout() -> u64 {
    30
}
fn default_max_body_size() -> usize {
    1_048_576
}
fn default_services() -> Vec<String> {
    ServiceKind::ALL.iter().map(|s| s.as_str().to_string()).collect()
}
fn default_max_connections() -> u32 {
    20
}
fn default_min_connections() -> u32 {
    5
}
fn default_connect_timeout() -> u64 {
    10
}
fn default_idle_timeout() -> u64 {
    600
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_log_format() -> String {
    "json".to_string()
}
fn default_rate_limit() -> u32 {
    100
}
fn default_token_expiry() -> i64 {
    86400
}
fn default_jwt_leeway() -> u64 {
    30
}
fn default_identity_url() -> String {
    "http://localhost:8080".to_string()
}
fn default_scheduling_url() -> String {
    "http://localhost:8080".to_string()
}
fn default_medical_url() -> String {
    "http://localhost:8080".to_string()
}
fn default_inventory_url() -> String {
    "http://localhost:8080".to_string()
}
fn default_notification_url() -> String {
    "http://localhost:8080".to_string()
}
fn default_service_timeout() -> u64 {
    5
}
fn default_receptionist_emails() -> Vec<String> {
    vec!["recepcion@veterinariaclinic.com".to_string()]
}
fn default_expiration_alert_days() -> i64 {
    7
}
fn default_true() -> bool {
    true
}
fn default_alert_hour() -> u32 {
    9
}
fn default_console_provider() -> String {
    "console".to_string()
}
fn default_sender_email() -> String {
    "noreply@veterinariaclinic.com".to_string()
}
fn default_sender_name() -> String {
    "Vet Clinic".to_string()
}

/// One of the five HTTP services a process can mount.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ServiceKind {
    Identity,
    Scheduling,
    Medical,
    Inventory,
    Notification,
}

impl ServiceKind {
    pub const ALL: [ServiceKind; 5] = [
        ServiceKind::Identity,
        ServiceKind::Scheduling,
        ServiceKind::Medical,
        ServiceKind::Inventory,
        ServiceKind::Notification,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceKind::Identity => "identity",
            ServiceKind::Scheduling => "scheduling",
            ServiceKind::Medical => "medical",
            ServiceKind::Inventory => "inventory",
            ServiceKind::Notification => "notification",
        }
    }
}

impl FromStr for ServiceKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "identity" | "auth" => Ok(ServiceKind::Identity),
            "scheduling" | "appointments" => Ok(ServiceKind::Scheduling),
            "medical" | "medical_records" => Ok(ServiceKind::Medical),
            "inventory" => Ok(ServiceKind::Inventory),
            "notification" | "notifications" => Ok(ServiceKind::Notification),
            other => Err(format!("Unknown service: {}", other)),
        }
    }
}

impl fmt::Display for ServiceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The services enabled in this process.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ServiceSet(BTreeSet<ServiceKind>);

impl ServiceSet {
    pub fn all() -> Self {
        Self(ServiceKind::ALL.into_iter().collect())
    }

    pub fn parse<S: AsRef<str>>(names: &[S]) -> Result<Self, String> {
        names
            .iter()
            .map(|n| n.as_ref().parse::<ServiceKind>())
            .collect::<Result<BTreeSet<_>, _>>()
            .map(Self)
    }

    pub fn contains(&self, kind: ServiceKind) -> bool {
        self.0.contains(&kind)
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.0.iter().map(ServiceKind::as_str).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Configuration validation error
#[derive(Debug, thiserror::Error)]
pub enum ConfigValidationError {
    #[error("Missing required configuration: {0}")]
    MissingRequired(String),

    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),
}

impl Config {
    /// Load configuration from files and environment variables.
    ///
    /// Loading order (later sources override earlier):
    /// 1. config/default.toml - base configuration with defaults
    /// 2. config/local.toml - local overrides (optional, not in git)
    /// 3. Environment variables with VET__ prefix
    pub fn load() -> Result<Self, config::ConfigError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default"))
            .add_source(config::File::with_name("config/local").required(false))
            .add_source(
                config::Environment::with_prefix("VET")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("server.services")
                    .with_list_parse_key("security.cors_origins")
                    .with_list_parse_key("scheduling.receptionist_emails")
                    .with_list_parse_key("inventory.alert_recipients")
                    .try_parsing(true),
            )
            .build()?;

        let cfg: Self = config.try_deserialize()?;
        cfg.validate()
            .map_err(|e| config::ConfigError::Message(e.to_string()))?;
        Ok(cfg)
    }

    /// Load configuration for testing with custom overrides.
    ///
    /// Builds the config from embedded defaults so tests do not depend on
    /// the working directory.
    #[cfg(test)]
    pub fn load_for_test(overrides: &[(&str, &str)]) -> Result<Self, config::ConfigError> {
        let defaults = r#"
            [server]
            host = "0.0.0.0"
            port = 8080
            request_timeout_secs = 30
            max_body_size = 1048576

            [database]
            url = ""
            max_connections = 20
            min_connections = 5
            connect_timeout_secs = 10
            idle_timeout_secs = 600

            [logging]
            level = "info"
            format = "json"

            [security]
            cors_origins = []
            rate_limit_per_minute = 100

            [jwt]
            secret = "test-secret-key-that-is-at-least-32-bytes"
            token_expiry_secs = 86400
            leeway_secs = 30

            [email]
            enabled = false
            provider = "console"
        "#;

        let mut builder = config::Config::builder()
            .add_source(config::File::from_str(defaults, config::FileFormat::Toml));

        for (key, value) in overrides {
            builder = builder.set_override(*key, *value)?;
        }

        let cfg: Self = builder.build()?.try_deserialize()?;
        // Skip validation in tests to allow partial configs
        Ok(cfg)
    }

    /// Validate configuration values.
    fn validate(&self) -> Result<(), ConfigValidationError> {
        if self.database.url.is_empty() {
            return Err(ConfigValidationError::MissingRequired(
                "VET__DATABASE__URL environment variable must be set".to_string(),
            ));
        }

        if self.server.port == 0 {
            return Err(ConfigValidationError::InvalidValue(
                "Server port cannot be 0".to_string(),
            ));
        }

        if self.database.min_connections > self.database.max_connections {
            return Err(ConfigValidationError::InvalidValue(
                "min_connections cannot exceed max_connections".to_string(),
            ));
        }

        if self.jwt.secret.len() < shared::jwt::MIN_SECRET_LENGTH {
            return Err(ConfigValidationError::InvalidValue(format!(
                "jwt.secret must be at least {} bytes (VET__JWT__SECRET)",
                shared::jwt::MIN_SECRET_LENGTH
            )));
        }

        let services = self.service_set()?;
        if services.is_empty() {
            return Err(ConfigValidationError::InvalidValue(
                "server.services must name at least one service".to_string(),
            ));
        }

        if self.inventory.alert_hour_utc > 23 {
            return Err(ConfigValidationError::InvalidValue(
                "inventory.alert_hour_utc must be between 0 and 23".to_string(),
            ));
        }

        if !(0..=MAX_EXPIRATION_DAYS).contains(&self.inventory.expiration_alert_days) {
            return Err(ConfigValidationError::InvalidValue(format!(
                "inventory.expiration_alert_days must be between 0 and {}",
                MAX_EXPIRATION_DAYS
            )));
        }

        Ok(())
    }

    /// Parses `server.services`.
    pub fn service_set(&self) -> Result<ServiceSet, ConfigValidationError> {
        ServiceSet::parse(&self.server.services).map_err(ConfigValidationError::InvalidValue)
    }

    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigValidationError> {
        format!("{}:{}", self.server.host, self.server.port)
            .parse()
            .map_err(|e| ConfigValidationError::InvalidValue(format!("Invalid socket address: {}", e)))
    }

    /// Recipients of stock alerts.
    pub fn stock_alert_recipients(&self) -> Vec<String> {
        if self.inventory.alert_recipients.is_empty() {
            self.scheduling.receptionist_emails.clone()
        } else {
            self.inventory.alert_recipients.clone()
        }
    }
}
