use serde::Deserialize;
use std::net::SocketAddr;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub logging: LoggingConfig,
    pub security: SecurityConfig,
    /// Session token verification
    pub jwt: JwtAuthConfig,
    /// Outbound notification e-mail
    #[serde(default)]
    pub email: EmailConfig,
    /// Calendar, mail and file-storage provider
    #[serde(default)]
    pub google: GoogleConfig,
    #[serde(default)]
    pub notifications: NotificationsConfig,
    #[serde(default)]
    pub subsidies: SubsidiesConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
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

impl DatabaseConfig {
    pub fn to_pool_config(&self) -> persistence::db::DatabaseConfig {
        persistence::db::DatabaseConfig {
            url: self.url.clone(),
            max_connections: self.max_connections,
            min_connections: self.min_connections,
            connect_timeout_secs: self.connect_timeout_secs,
            idle_timeout_secs: self.idle_timeout_secs,
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

    /// Adds Strict-Transport-Security to responses (only behind TLS)
    #[serde(default)]
    pub hsts_enabled: bool,
}

// Default value functions
fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    8080
}
fn default_request_timeout() -> u64 {
    30
}
fn default_max_connections() -> u32 {
    10
}
fn default_min_connections() -> u32 {
    1
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

#[derive(Debug, Clone, Deserialize)]
pub struct JwtAuthConfig {
    /// HS256 secret shared with the session issuer
    pub secret: String,

    /// Lifetime of tokens minted by tooling (default: 3600 = 1 hour)
    #[serde(default = "default_access_token_expiry")]
    pub access_token_expiry_secs: i64,

    /// Leeway in seconds for clock skew tolerance (default: 30)
    #[serde(default = "default_jwt_leeway")]
    pub leeway_secs: u64,
}

fn default_access_token_expiry() -> i64 {
    3600
}

fn default_jwt_leeway() -> u64 {
    30
}

/// Email service configuration for notification delivery.
#[derive(Debug, Clone, Deserialize)]
pub struct EmailConfig {
    /// Whether email sending is enabled
    #[serde(default)]
    pub enabled: bool,

    /// Email provider: sendgrid or console (for development)
    #[serde(default = "default_email_provider")]
    pub provider: String,

    #[serde(default)]
    pub sendgrid_api_key: String,

    /// SendGrid API base URL, overridable for tests
    #[serde(default = "default_sendgrid_base_url")]
    pub sendgrid_base_url: String,

    /// Sender email address (From header)
    #[serde(default = "default_sender_email")]
    pub sender_email: String,

    /// Sender name (From header)
    #[serde(default = "default_sender_name")]
    pub sender_name: String,
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            provider: default_email_provider(),
            sendgrid_api_key: String::new(),
            sendgrid_base_url: default_sendgrid_base_url(),
            sender_email: default_sender_email(),
            sender_name: default_sender_name(),
        }
    }
}

fn default_email_provider() -> String {
    "console".to_string()
}

fn default_sendgrid_base_url() -> String {
    "https://api.sendgrid.com".to_string()
}

fn default_sender_email() -> String {
    "noreply@sharoushi.example.jp".to_string()
}

fn default_sender_name() -> String {
    "社労士事務所".to_string()
}

/// Google Calendar, Gmail and Drive access.
#[derive(Debug, Clone, Deserialize)]
pub struct GoogleConfig {
    #[serde(default = "default_calendar_base_url")]
    pub calendar_base_url: String,

    #[serde(default = "default_gmail_base_url")]
    pub gmail_base_url: String,

    #[serde(default = "default_drive_base_url")]
    pub drive_base_url: String,

    /// Upload endpoint for file content
    #[serde(default = "default_drive_upload_url")]
    pub drive_upload_url: String,

    #[serde(default = "default_calendar_id")]
    pub calendar_id: String,

    /// IANA name of the office time zone
    #[serde(default = "default_time_zone")]
    pub time_zone: String,

    /// Days ahead scanned by a full calendar sync
    #[serde(default = "default_sync_window_days")]
    pub sync_window_days: i64,

    /// Folder holding all client folders; drive root when empty
    #[serde(default)]
    pub drive_root_folder_id: String,

    /// How far back client mail is searched
    #[serde(default = "default_mail_lookback_days")]
    pub mail_lookback_days: u32,

    #[serde(default = "default_google_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for GoogleConfig {
    fn default() -> Self {
        Self {
            calendar_base_url: default_calendar_base_url(),
            gmail_base_url: default_gmail_base_url(),
            drive_base_url: default_drive_base_url(),
            drive_upload_url: default_drive_upload_url(),
            calendar_id: default_calendar_id(),
            time_zone: default_time_zone(),
            sync_window_days: default_sync_window_days(),
            drive_root_folder_id: String::new(),
            mail_lookback_days: default_mail_lookback_days(),
            timeout_ms: default_google_timeout_ms(),
        }
    }
}

impl GoogleConfig {
    /// The office time zone. Validated at load time.
    pub fn tz(&self) -> chrono_tz::Tz {
        self.time_zone.parse().unwrap_or(chrono_tz::Asia::Tokyo)
    }
}

fn default_calendar_base_url() -> String {
    "https://www.googleapis.com/calendar/v3".to_string()
}
fn default_gmail_base_url() -> String {
    "https://gmail.googleapis.com/gmail/v1".to_string()
}
fn default_drive_base_url() -> String {
    "https://www.googleapis.com/drive/v3".to_string()
}
fn default_drive_upload_url() -> String {
    "https://www.googleapis.com/upload/drive/v3".to_string()
}
fn default_calendar_id() -> String {
    "primary".to_string()
}
fn default_time_zone() -> String {
    "Asia/Tokyo".to_string()
}
fn default_sync_window_days() -> i64 {
    30
}
fn default_mail_lookback_days() -> u32 {
    7
}
fn default_google_timeout_ms() -> u64 {
    15000
}

#[derive(Debug, Clone, Deserialize)]
pub struct NotificationsConfig {
    /// Reminder lead time for users without saved settings
    #[serde(default = "default_reminder_days")]
    pub default_reminder_days_before: i64,

    /// Scheduled notifications handled per trigger call
    #[serde(default = "default_scheduled_batch_size")]
    pub scheduled_batch_size: i64,
}

impl Default for NotificationsConfig {
    fn default() -> Self {
        Self {
            default_reminder_days_before: default_reminder_days(),
            scheduled_batch_size: default_scheduled_batch_size(),
        }
    }
}

fn default_reminder_days() -> i64 {
    1
}
fn default_scheduled_batch_size() -> i64 {
    100
}

#[derive(Debug, Clone, Deserialize)]
pub struct SubsidiesConfig {
    /// Reject irregular status moves instead of only logging them
    #[serde(default)]
    pub strict_status_transitions: bool,

    #[serde(default = "default_alert_window_days")]
    pub default_alert_window_days: i64,
}

impl Default for SubsidiesConfig {
    fn default() -> Self {
        Self {
            strict_status_transitions: false,
            default_alert_window_days: default_alert_window_days(),
        }
    }
}

fn default_alert_window_days() -> i64 {
    30
}

/// Configuration validation error
#[derive(Debug, thiserror::Error)]
pub enum ConfigValidationError {
    #[error("Missing required configuration: {0}")]
    MissingRequired(String),

    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),
}

const TEST_DEFAULTS: &str = r#"
    [server]
    host = "127.0.0.1"
    port = 8080
    request_timeout_secs = 30

    [database]
    url = "sqlite::memory:"
    max_connections = 1
    min_connections = 1

    [logging]
    level = "info"
    format = "pretty"

    [security]
    cors_origins = []

    [jwt]
    secret = "test-secret-key-for-session-tokens"
    access_token_expiry_secs = 3600
    leeway_secs = 30

    [email]
    enabled = false
    provider = "console"
    sender_email = "test@example.com"
    sender_name = "Test"

    [google]
    calendar_id = "primary"
    time_zone = "Asia/Tokyo"
    sync_window_days = 30
"#;

impl Config {
    /// Load configuration from files and environment variables.
    ///
    /// Loading order (later sources override earlier):
    /// 1. config/default.toml - base configuration with defaults
    /// 2. config/local.toml - local overrides (optional, not in git)
    /// 3. Environment variables with SHR__ prefix
    pub fn load() -> Result<Self, config::ConfigError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default"))
            .add_source(config::File::with_name("config/local").required(false))
            .add_source(
                config::Environment::with_prefix("SHR")
                    .prefix_separator("__")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("security.cors_origins")
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
    /// Defaults are embedded so tests do not depend on config files.
    pub fn load_for_test(overrides: &[(&str, &str)]) -> Result<Self, config::ConfigError> {
        let mut builder = config::Config::builder()
            .add_source(config::File::from_str(TEST_DEFAULTS, config::FileFormat::Toml));

        for (key, value) in overrides {
            builder = builder.set_override(*key, *value)?;
        }

        builder.build()?.try_deserialize()
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        if self.database.url.is_empty() {
            return Err(ConfigValidationError::MissingRequired(
                "SHR__DATABASE__URL environment variable must be set".to_string(),
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

        if self.jwt.secret.is_empty() {
            return Err(ConfigValidationError::MissingRequired(
                "SHR__JWT__SECRET environment variable must be set".to_string(),
            ));
        }

        if self.google.time_zone.parse::<chrono_tz::Tz>().is_err() {
            return Err(ConfigValidationError::InvalidValue(format!(
                "Unknown time zone: {}",
                self.google.time_zone
            )));
        }

        if self.google.sync_window_days <= 0 {
            return Err(ConfigValidationError::InvalidValue(
                "sync_window_days must be positive".to_string(),
            ));
        }

        Ok(())
    }

    pub fn socket_addr(&self) -> Result<SocketAddr, std::net::AddrParseError> {
        format!("{}:{}", self.server.host, self.server.port).parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_load_with_defaults() {
        let config = Config::load_for_test(&[]).expect("Failed to load config");

        assert_eq!(config.server.port, 8080);
        assert_eq!(config.google.calendar_id, "primary");
        assert_eq!(config.google.tz(), chrono_tz::Asia::Tokyo);
        assert_eq!(config.google.sync_window_days, 30);
        assert!(!config.subsidies.strict_status_transitions);
        assert_eq!(config.notifications.default_reminder_days_before, 1);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_overrides() {
        let config = Config::load_for_test(&[
            ("server.port", "9000"),
            ("logging.level", "debug"),
            ("subsidies.strict_status_transitions", "true"),
        ])
        .expect("Failed to load config");

        assert_eq!(config.server.port, 9000);
        assert_eq!(config.logging.level, "debug");
        assert!(config.subsidies.strict_status_transitions);
    }

    #[test]
    fn test_validate_rejects_port_zero() {
        let config = Config::load_for_test(&[("server.port", "0")]).unwrap();
        assert!(matches!(
            config.validate(),
            Err(ConfigValidationError::InvalidValue(_))
        ));
    }

    #[test]
    fn test_validate_rejects_empty_secret() {
        let config = Config::load_for_test(&[("jwt.secret", "")]).unwrap();
        assert!(matches!(
            config.validate(),
            Err(ConfigValidationError::MissingRequired(_))
        ));
    }

    #[test]
    fn test_validate_rejects_pool_bounds() {
        let config = Config::load_for_test(&[
            ("database.min_connections", "5"),
            ("database.max_connections", "2"),
        ])
        .unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_unknown_time_zone() {
        let config = Config::load_for_test(&[("google.time_zone", "Mars/Olympus")]).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_socket_addr() {
        let config = Config::load_for_test(&[]).unwrap();
        assert_eq!(config.socket_addr().unwrap().port(), 8080);
    }
}
