//! Configuration management

use clap::Parser;
use config::{Config as ConfigBuilder, ConfigError as BuilderError, Environment, File};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid server configuration: {0}")]
    InvalidServer(String),

    #[error("Invalid database configuration: {0}")]
    InvalidDatabase(String),

    #[error("Invalid logging configuration: {0}")]
    InvalidLogging(String),

    #[error("Invalid security configuration: {0}")]
    InvalidSecurity(String),

    #[error("Invalid bootstrap configuration: {0}")]
    InvalidBootstrap(String),

    #[error("Failed to load configuration: {0}")]
    LoadError(String),

    #[error("Configuration file not found: {0}")]
    FileNotFound(String),
}

impl From<BuilderError> for ConfigError {
    fn from(err: BuilderError) -> Self {
        ConfigError::LoadError(err.to_string())
    }
}

impl From<ConfigError> for crate::core::error::AppError {
    fn from(err: ConfigError) -> Self {
        crate::core::error::AppError::ConfigError(err.to_string())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub logging: LoggingConfig,
    pub security: SecurityConfig,
    #[serde(default)]
    pub bootstrap: BootstrapConfig,
}

impl Config {
    /// Load configuration with precedence: CLI args > Environment variables > Config file > Defaults
    pub fn load() -> Result<Self, ConfigError> {
        let cli_args = CliArgs::parse();
        Self::load_with(&cli_args)
    }

    /// Load configuration from already parsed command-line arguments
    pub fn load_with(cli_args: &CliArgs) -> Result<Self, ConfigError> {
        let mut builder = with_defaults(ConfigBuilder::builder())?;

        if let Some(config_path) = &cli_args.config {
            if !config_path.exists() {
                return Err(ConfigError::FileNotFound(config_path.display().to_string()));
            }
            builder = builder.add_source(File::from(config_path.as_path()));
        }

        // BOOKCLUB_SERVER__PORT=8080, BOOKCLUB_SECURITY__ALLOWED_ORIGINS=a,b
        builder = builder.add_source(
            Environment::with_prefix("BOOKCLUB")
                .separator("__")
                .list_separator(",")
                .with_list_parse_key("security.allowed_origins")
                .try_parsing(true),
        );

        // Hosting platforms hand the listen port over as a bare PORT variable
        if let Some(port) = std::env::var("PORT").ok().and_then(|p| p.parse::<u16>().ok()) {
            builder = builder.set_override("server.port", port)?;
        }

        if let Some(host) = &cli_args.host {
            builder = builder.set_override("server.host", host.clone())?;
        }
        if let Some(port) = cli_args.port {
            builder = builder.set_override("server.port", port)?;
        }
        if let Some(db_path) = &cli_args.database {
            builder = builder.set_override("database.path", db_path.display().to_string())?;
        }
        if let Some(log_level) = &cli_args.log_level {
            builder = builder.set_override("logging.level", log_level.clone())?;
        }

        let config: Config = builder.build()?.try_deserialize()?;
        config.validate()?;

        Ok(config)
    }

    /// Load configuration from a specific file path, on top of the defaults
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.display().to_string()));
        }

        let config: Config = with_defaults(ConfigBuilder::builder())?
            .add_source(File::from(path))
            .build()?
            .try_deserialize()?;

        config.validate()?;
        Ok(config)
    }

    /// Defaults only; handy for tests and for printing a sample config
    pub fn defaults() -> Result<Self, ConfigError> {
        let config: Config = with_defaults(ConfigBuilder::builder())?
            .build()?
            .try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Validate all configuration parameters
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.server.validate()?;
        self.database.validate()?;
        self.logging.validate()?;
        self.security.validate()?;
        self.bootstrap.validate()?;
        Ok(())
    }
}

fn with_defaults(
    builder: config::ConfigBuilder<config::builder::DefaultState>,
) -> Result<config::ConfigBuilder<config::builder::DefaultState>, ConfigError> {
    Ok(builder
        .set_default("server.host", "0.0.0.0")?
        .set_default("server.port", 5000)?
        .set_default("server.request_timeout", 10)?
        .set_default("database.path", "./data/bookclub.db")?
        .set_default("database.connection_pool_size", 10)?
        .set_default("database.busy_timeout", 5000)?
        .set_default("logging.level", "info")?
        .set_default("logging.format", "json")?
        .set_default("logging.output", "stdout")?
        .set_default("logging.max_file_size", 10485760)? // 10 MB
        .set_default("logging.max_backups", 5)?
        .set_default("security.allowed_origins", vec!["*"])?
        .set_default("security.token_ttl_hours", 24)?
        .set_default("security.bcrypt_cost", 12)?)
}

/// Command-line arguments for configuration override
#[derive(Debug, Default, Parser)]
#[command(name = "book-club")]
#[command(about = "Book Club Backend Server", long_about = None)]
pub struct CliArgs {
    /// Path to configuration file (TOML format)
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Server host address
    #[arg(long, value_name = "HOST")]
    pub host: Option<String>,

    /// Server port
    #[arg(short, long, value_name = "PORT")]
    pub port: Option<u16>,

    /// Database file path
    #[arg(short, long, value_name = "PATH")]
    pub database: Option<PathBuf>,

    /// Log level (debug, info, warn, error)
    #[arg(short, long, value_name = "LEVEL")]
    pub log_level: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub request_timeout: u64, // seconds
}

impl ServerConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.host.is_empty() {
            return Err(ConfigError::InvalidServer("host cannot be empty".to_string()));
        }

        if self.port == 0 {
            return Err(ConfigError::InvalidServer("port must be greater than 0".to_string()));
        }

        if self.request_timeout == 0 {
            return Err(ConfigError::InvalidServer(
                "request_timeout must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub path: PathBuf,
    pub connection_pool_size: u32,
    pub busy_timeout: u64, // milliseconds
}

impl DatabaseConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.path.as_os_str().is_empty() {
            return Err(ConfigError::InvalidDatabase("path cannot be empty".to_string()));
        }

        if self.connection_pool_size == 0 {
            return Err(ConfigError::InvalidDatabase(
                "connection_pool_size must be greater than 0".to_string(),
            ));
        }

        if self.busy_timeout == 0 {
            return Err(ConfigError::InvalidDatabase(
                "busy_timeout must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Json,
    Text,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogOutput {
    Stdout,
    File,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
    pub output: LogOutput,
    pub log_file: Option<PathBuf>,
    pub max_file_size: usize, // bytes
    pub max_backups: usize,
}

impl LoggingConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.level.to_lowercase().as_str()) {
            return Err(ConfigError::InvalidLogging(format!(
                "level must be one of: {:?}",
                valid_levels
            )));
        }

        if self.output == LogOutput::File && self.log_file.is_none() {
            return Err(ConfigError::InvalidLogging(
                "log_file must be specified when output is 'file'".to_string(),
            ));
        }

        if self.max_file_size == 0 {
            return Err(ConfigError::InvalidLogging(
                "max_file_size must be greater than 0".to_string(),
            ));
        }

        if self.max_backups == 0 {
            return Err(ConfigError::InvalidLogging(
                "max_backups must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SecurityConfig {
    pub allowed_origins: Vec<String>,
    pub token_ttl_hours: i64,
    pub bcrypt_cost: u32,
}

impl SecurityConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.allowed_origins.is_empty() {
            return Err(ConfigError::InvalidSecurity(
                "allowed_origins cannot be empty".to_string(),
            ));
        }

        if self.token_ttl_hours <= 0 {
            return Err(ConfigError::InvalidSecurity(
                "token_ttl_hours must be greater than 0".to_string(),
            ));
        }

        // bcrypt only accepts costs in 4..=31
        if !(4..=31).contains(&self.bcrypt_cost) {
            return Err(ConfigError::InvalidSecurity(
                "bcrypt_cost must be between 4 and 31".to_string(),
            ));
        }

        Ok(())
    }

    pub fn token_ttl(&self) -> chrono::Duration {
        chrono::Duration::hours(self.token_ttl_hours)
    }
}

/// Optional administrator account created on first start
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BootstrapConfig {
    pub admin_username: Option<String>,
    pub admin_email: Option<String>,
    pub admin_password: Option<String>,
}

impl BootstrapConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let provided = [
            self.admin_username.is_some(),
            self.admin_email.is_some(),
            self.admin_password.is_some(),
        ];
        if provided.iter().any(|p| *p) && !provided.iter().all(|p| *p) {
            return Err(ConfigError::InvalidBootstrap(
                "admin_username, admin_email and admin_password must be set together".to_string(),
            ));
        }
        Ok(())
    }

    /// Returns (username, email, password) when a bootstrap admin is configured
    pub fn admin(&self) -> Option<(&str, &str, &str)> {
        match (&self.admin_username, &self.admin_email, &self.admin_password) {
            (Some(u), Some(e), Some(p)) => Some((u.as_str(), e.as_str(), p.as_str())),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::sync::Mutex;

    // Tests that read or write process environment variables hold this lock
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    fn config_file(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        write!(file, "{}", contents).unwrap();
        file
    }

    #[test]
    fn test_defaults_are_valid() {
        let config = Config::defaults().unwrap();
        assert_eq!(config.server.port, 5000);
        assert_eq!(config.security.token_ttl_hours, 24);
        assert_eq!(config.security.allowed_origins, vec!["*".to_string()]);
        assert_eq!(config.logging.format, LogFormat::Json);
        assert!(config.bootstrap.admin().is_none());
    }

    #[test]
    fn test_from_file_overrides_defaults() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
[server]
port = 8081

[security]
allowed_origins = ["http://localhost:3000"]
bcrypt_cost = 10

[bootstrap]
admin_username = "root"
admin_email = "root@example.com"
admin_password = "secret"
"#
        )
        .unwrap();

        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.server.port, 8081);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.security.bcrypt_cost, 10);
        assert_eq!(
            config.bootstrap.admin(),
            Some(("root", "root@example.com", "secret"))
        );
    }

    #[test]
    fn test_missing_file() {
        let result = Config::from_file(Path::new("/definitely/not/here.toml"));
        assert!(matches!(result, Err(ConfigError::FileNotFound(_))));
    }

    #[test]
    fn test_security_validation() {
        let mut security = Config::defaults().unwrap().security;
        security.bcrypt_cost = 2;
        assert!(security.validate().is_err());

        security.bcrypt_cost = 4;
        security.token_ttl_hours = 0;
        assert!(security.validate().is_err());

        security.token_ttl_hours = 1;
        security.allowed_origins.clear();
        assert!(security.validate().is_err());
    }

    #[test]
    fn test_file_logging_requires_path() {
        let mut logging = Config::defaults().unwrap().logging;
        logging.output = LogOutput::File;
        assert!(logging.validate().is_err());

        logging.log_file = Some(PathBuf::from("./logs/bookclub.log"));
        assert!(logging.validate().is_ok());
    }

    #[test]
    fn test_partial_bootstrap_rejected() {
        let bootstrap = BootstrapConfig {
            admin_username: Some("root".into()),
            admin_email: None,
            admin_password: None,
        };
        assert!(bootstrap.validate().is_err());
    }

    #[test]
    fn test_cli_overrides_file() {
        let _env = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        let file = config_file(
            r#"
[server]
host = "127.0.0.1"
port = 8081

[database]
path = "/var/lib/bookclub/file.db"

[logging]
level = "warn"
"#,
        );

        let from_file = Config::load_with(&CliArgs {
            config: Some(file.path().to_path_buf()),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(from_file.server.host, "127.0.0.1");
        assert_eq!(from_file.server.port, 8081);
        assert_eq!(from_file.logging.level, "warn");
        assert_eq!(from_file.server.request_timeout, 10);

        let config = Config::load_with(&CliArgs {
            config: Some(file.path().to_path_buf()),
            host: Some("10.0.0.7".to_string()),
            port: Some(9090),
            database: Some(PathBuf::from("/tmp/cli.db")),
            log_level: Some("debug".to_string()),
        })
        .unwrap();
        assert_eq!(config.server.host, "10.0.0.7");
        assert_eq!(config.server.port, 9090);
        assert_eq!(config.database.path, PathBuf::from("/tmp/cli.db"));
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_environment_layers() {
        let _env = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        let file = config_file("[server]\nport = 8081\nrequest_timeout = 30\n");
        let cli = CliArgs {
            config: Some(file.path().to_path_buf()),
            ..Default::default()
        };

        std::env::set_var("BOOKCLUB_SERVER__REQUEST_TIMEOUT", "45");
        std::env::set_var("BOOKCLUB_SERVER__PORT", "7000");
        std::env::set_var(
            "BOOKCLUB_SECURITY__ALLOWED_ORIGINS",
            "https://a.example.com,https://b.example.com",
        );
        let env_over_file = Config::load_with(&cli);

        std::env::set_var("PORT", "7100");
        let port_over_env = Config::load_with(&cli);

        let cli_over_port = Config::load_with(&CliArgs {
            config: Some(file.path().to_path_buf()),
            port: Some(7200),
            ..Default::default()
        });

        for key in [
            "BOOKCLUB_SERVER__REQUEST_TIMEOUT",
            "BOOKCLUB_SERVER__PORT",
            "BOOKCLUB_SECURITY__ALLOWED_ORIGINS",
            "PORT",
        ] {
            std::env::remove_var(key);
        }

        let config = env_over_file.unwrap();
        assert_eq!(config.server.request_timeout, 45);
        assert_eq!(config.server.port, 7000);
        assert_eq!(
            config.security.allowed_origins,
            vec![
                "https://a.example.com".to_string(),
                "https://b.example.com".to_string()
            ]
        );
        assert_eq!(port_over_env.unwrap().server.port, 7100);
        assert_eq!(cli_over_port.unwrap().server.port, 7200);
    }

    #[test]
    fn test_load_with_missing_file() {
        let _env = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        let result = Config::load_with(&CliArgs {
            config: Some(PathBuf::from("/definitely/not/here.toml")),
            ..Default::default()
        });
        assert!(matches!(result, Err(ConfigError::FileNotFound(_))));
    }
}
