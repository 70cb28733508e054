// src/config.rs - Configuration management
use anyhow::{Context, Result};
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::Path;

/// Ten years; longer session lifetimes overflow timestamp arithmetic.
pub const MAX_SESSION_TTL_HOURS: i64 = 24 * 365 * 10;

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub security: SecurityConfig,
    pub logging: LoggingConfig,
    pub notebook: NotebookConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub workers: Option<usize>,
    pub keep_alive: u64,
    pub client_timeout: u64,
    pub client_shutdown: u64,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub connect_timeout: u64,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct AuthConfig {
    pub session_ttl_hours: i64,
    pub allow_self_registration: bool,
    pub demo_accounts: bool,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct SecurityConfig {
    pub allowed_origins: Vec<String>,
    pub max_request_size: usize,
    pub require_https: bool,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct NotebookConfig {
    /// Write the two demonstration experiments into an empty notebook.
    pub seed_samples: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            workers: None,
            keep_alive: 30,
            client_timeout: 30,
            client_shutdown: 5,
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite:flowlab.db".to_string(),
            max_connections: 10,
            min_connections: 1,
            connect_timeout: 30,
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            session_ttl_hours: 24,
            allow_self_registration: false,
            demo_accounts: true,
        }
    }
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            allowed_origins: vec![
                "http://localhost:3000".to_string(),
                "http://127.0.0.1:3000".to_string(),
                "http://localhost:8080".to_string(),
                "http://127.0.0.1:8080".to_string(),
            ],
            max_request_size: 1024 * 1024,
            require_https: false,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl Default for NotebookConfig {
    fn default() -> Self {
        Self { seed_samples: true }
    }
}

pub fn load_config() -> Result<Config> {
    load_env_file()?;

    let config = match env::var("CONFIG_FILE") {
        Ok(config_file) => load_config_file(Path::new(&config_file))?,
        Err(_) => Config::default(),
    };

    let config = apply_overrides(config, |key| env::var(key).ok())?;

    config.validate()
        .context("Configuration validation failed")?;

    Ok(config)
}

pub fn load_config_file(path: &Path) -> Result<Config> {
    let config_str = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    toml::from_str(&config_str)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Environment overrides, read through `lookup` so tests need not touch
/// the process environment.
pub fn apply_overrides<F>(mut config: Config, lookup: F) -> Result<Config>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(host) = lookup("BIND_ADDRESS") {
        config.server.host = host;
    }
    if let Some(port) = lookup("FLOWLAB_PORT") {
        config.server.port = parse_var("FLOWLAB_PORT", &port)?;
    }
    if let Some(workers) = lookup("FLOWLAB_WORKERS") {
        config.server.workers = Some(parse_var("FLOWLAB_WORKERS", &workers)?);
    }
    if let Some(url) = lookup("DATABASE_URL") {
        config.database.url = url;
    }
    if let Some(max_conn) = lookup("DATABASE_MAX_CONNECTIONS") {
        config.database.max_connections = parse_var("DATABASE_MAX_CONNECTIONS", &max_conn)?;
    }
    if let Some(origins) = lookup("ALLOWED_ORIGINS") {
        config.security.allowed_origins = origins
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
    }
    if let Some(ttl) = lookup("SESSION_TTL_HOURS") {
        config.auth.session_ttl_hours = parse_var("SESSION_TTL_HOURS", &ttl)?;
    }
    if let Some(flag) = lookup("ALLOW_SELF_REGISTRATION") {
        config.auth.allow_self_registration = parse_flag("ALLOW_SELF_REGISTRATION", &flag)?;
    }
    if let Some(flag) = lookup("SEED_SAMPLE_ENTRIES") {
        config.notebook.seed_samples = parse_flag("SEED_SAMPLE_ENTRIES", &flag)?;
    }
    if let Some(level) = lookup("RUST_LOG") {
        config.logging.level = level;
    }

    Ok(config)
}

fn parse_var<T>(key: &str, value: &str) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    value.trim()
        .parse::<T>()
        .with_context(|| format!("Invalid value for {}: '{}'", key, value))
}

fn parse_flag(key: &str, value: &str) -> Result<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(anyhow::anyhow!("Invalid value for {}: '{}'", key, value)),
    }
}

impl Config {
    pub fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            return Err(anyhow::anyhow!("server.port must be non-zero"));
        }

        if self.server.workers == Some(0) {
            return Err(anyhow::anyhow!("server.workers must be at least 1 when set"));
        }

        if self.database.url.trim().is_empty() {
            return Err(anyhow::anyhow!("database.url must not be empty"));
        }

        if self.database.max_connections < self.database.min_connections {
            return Err(anyhow::anyhow!(
                "max_connections ({}) must be >= min_connections ({})",
                self.database.max_connections,
                self.database.min_connections
            ));
        }

        if self.auth.session_ttl_hours <= 0 || self.auth.session_ttl_hours > MAX_SESSION_TTL_HOURS {
            return Err(anyhow::anyhow!(
                "session_ttl_hours must be between 1 and {} (current: {})",
                MAX_SESSION_TTL_HOURS,
                self.auth.session_ttl_hours
            ));
        }

        Ok(())
    }

    pub fn is_production(&self) -> bool {
        env::var("FLOWLAB_ENV").map(|v| v == "production").unwrap_or(false)
    }

    pub fn print_startup_info(&self) {
        log::info!("🧪 Flow lab notebook starting up...");
        log::info!("🌐 Server: {}:{}", self.server.host, self.server.port);
        log::info!("💾 Database: {}", self.database.url);
        log::info!("🔒 Sessions: {}h expiration", self.auth.session_ttl_hours);
        log::info!("📊 Logging: {} level", self.logging.level);

        if self.auth.demo_accounts {
            log::warn!("👥 Demo accounts are enabled");
        }

        if !self.is_production() {
            log::warn!("🚧 Running in development mode");
        }

        if self.security.require_https {
            log::info!("🔒 HTTPS enforcement enabled");
        } else if self.is_production() {
            log::warn!("⚠️  HTTPS not required in production mode");
        }
    }
}

pub fn load_env_file() -> Result<()> {
    if let Ok(env_file) = env::var("ENV_FILE") {
        dotenvy::from_filename(&env_file)
            .with_context(|| format!("Failed to load environment file: {}", env_file))?;
    } else if Path::new(".env").exists() {
        dotenvy::dotenv().context("Failed to load .env file")?;
    }
    Ok(())
}
