// Jaskier Shared Pattern — config
//! The immutable config record loaded once at startup: local YAML file or
//! a `-c <url>` remote fetch, then merged with environment overrides
//! (env > URL config > local file).

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub app: AppConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub monitoring: MonitoringConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub services: HashMap<String, bool>,
    #[serde(default)]
    pub redis: RedisConfig,
    #[serde(default)]
    pub kafka: KafkaConfig,
    #[serde(default)]
    pub postgres: PostgresConfig,
    #[serde(default)]
    pub mongo: MongoConfig,
    #[serde(default)]
    pub grafana: GrafanaConfig,
    #[serde(default)]
    pub cron: CronConfig,
    #[serde(default)]
    pub encryption: EncryptionConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_app_name")]
    pub name: String,
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(default = "default_env")]
    pub env: String,
    #[serde(default)]
    pub debug: bool,
    #[serde(default = "default_banner_path")]
    pub banner_path: String,
    #[serde(default)]
    pub startup_delay_ms: u64,
    #[serde(default)]
    pub enable_tui: bool,
    #[serde(default)]
    pub quiet_startup: bool,
}

fn default_app_name() -> String {
    "infraplane".to_string()
}
fn default_version() -> String {
    "1.0.0".to_string()
}
fn default_env() -> String {
    "development".to_string()
}
fn default_banner_path() -> String {
    "banner.txt".to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            name: default_app_name(),
            version: default_version(),
            env: default_env(),
            debug: false,
            banner_path: default_banner_path(),
            startup_delay_ms: 0,
            enable_tui: false,
            quiet_startup: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_server_port")]
    pub port: u16,
}

fn default_server_port() -> u16 {
    8080
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { port: default_server_port() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitoringConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_monitoring_port")]
    pub port: u16,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub obfuscate_api: bool,
    #[serde(default = "default_upload_dir")]
    pub upload_dir: String,
    #[serde(default = "default_max_photo_size_mb")]
    pub max_photo_size_mb: u64,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub subtitle: String,
    #[serde(default)]
    pub minio: MinioConfig,
    #[serde(default)]
    pub external: Vec<ExternalServiceConfig>,
}

fn default_monitoring_port() -> u16 {
    9090
}
fn default_upload_dir() -> String {
    "uploads".to_string()
}
fn default_max_photo_size_mb() -> u64 {
    5
}

impl Default for MonitoringConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            port: default_monitoring_port(),
            password: String::new(),
            obfuscate_api: false,
            upload_dir: default_upload_dir(),
            max_photo_size_mb: default_max_photo_size_mb(),
            title: "Infraplane".to_string(),
            subtitle: "Control Plane".to_string(),
            minio: MinioConfig::default(),
            external: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExternalServiceConfig {
    pub name: String,
    pub url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AuthConfig {
    #[serde(default)]
    pub auth_type: String,
    #[serde(default)]
    pub secret: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password_hash: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct RedisConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_redis_url")]
    pub url: String,
}

fn default_redis_url() -> String {
    "redis://127.0.0.1:6379".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct KafkaConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_kafka_brokers")]
    pub brokers: String,
}

fn default_kafka_brokers() -> String {
    "127.0.0.1:9092".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostgresConnSpec {
    pub name: String,
    pub url: String,
    #[serde(default = "default_true")]
    pub enabled: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PostgresConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub connections: Vec<PostgresConnSpec>,
}

impl PostgresConfig {
    /// A `Single` block collapses to one `"default"` entry; a `Multi`
    /// block (`connections` non-empty) is used as-is, each entry's own
    /// `enabled` flag respected.
    pub fn connections(&self) -> Vec<PostgresConnSpec> {
        if !self.connections.is_empty() {
            return self.connections.iter().filter(|c| c.enabled).cloned().collect();
        }
        if self.enabled {
            vec![PostgresConnSpec {
                name: "default".to_string(),
                url: self.url.clone(),
                enabled: true,
            }]
        } else {
            Vec::new()
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoConnSpec {
    pub name: String,
    pub uri: String,
    #[serde(default = "default_mongo_db")]
    pub database: String,
    #[serde(default = "default_true")]
    pub enabled: bool,
}

fn default_mongo_db() -> String {
    "infraplane".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct MongoConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub uri: String,
    #[serde(default)]
    pub connections: Vec<MongoConnSpec>,
}

impl MongoConfig {
    pub fn connections(&self) -> Vec<MongoConnSpec> {
        if !self.connections.is_empty() {
            return self.connections.iter().filter(|c| c.enabled).cloned().collect();
        }
        if self.enabled {
            vec![MongoConnSpec {
                name: "default".to_string(),
                uri: self.uri.clone(),
                database: default_mongo_db(),
                enabled: true,
            }]
        } else {
            Vec::new()
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct MinioConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub endpoint: String,
    #[serde(default)]
    pub access_key: String,
    #[serde(default)]
    pub secret_key: String,
    #[serde(default = "default_bucket")]
    pub bucket: String,
}

fn default_bucket() -> String {
    "infraplane".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct GrafanaConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub api_key: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CronJobSpec {
    pub name: String,
    pub schedule: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CronConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub jobs: Vec<CronJobSpec>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct EncryptionConfig {
    #[serde(default)]
    pub key: String,
}

fn default_true() -> bool {
    true
}

/// Errors encountered while loading config. Any of these at process start
/// is the one fatal-exit path before the HTTP listener binds.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    ReadFile { path: String, source: std::io::Error },
    #[error("failed to fetch remote config from {url}: {source}")]
    Fetch { url: String, source: reqwest::Error },
    #[error("failed to parse config YAML: {0}")]
    Parse(#[from] serde_yaml_ng::Error),
    #[error("failed to parse env override for {key}: {source}")]
    EnvOverride { key: String, source: String },
}

impl Config {
    /// Loads the local `path` (default `./config.yaml`), then applies
    /// environment-variable overrides. Used when no `-c <url>` flag is
    /// given.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
            path: path.display().to_string(),
            source: e,
        })?;
        let mut cfg: Config = serde_yaml_ng::from_str(&raw)?;
        cfg.apply_env_overrides();
        Ok(cfg)
    }

    /// Loads config YAML fetched from `url` (the `-c <url>` CLI flag),
    /// then applies environment overrides on top — env always wins per
    /// the precedence order env > URL config > local file.
    pub async fn load_from_url(url: &str) -> Result<Self, ConfigError> {
        let body = reqwest::get(url)
            .await
            .map_err(|e| ConfigError::Fetch { url: url.to_string(), source: e })?
            .text()
            .await
            .map_err(|e| ConfigError::Fetch { url: url.to_string(), source: e })?;
        let mut cfg: Config = serde_yaml_ng::from_str(&body)?;
        cfg.apply_env_overrides();
        Ok(cfg)
    }

    /// Overrides matching env vars on top of whatever was loaded. Only a
    /// handful of high-value keys are wired up — the full config tree
    /// would need a generic env-to-field mapper the spec doesn't call for.
    fn apply_env_overrides(&mut self) {
        if let Ok(port) = std::env::var("SERVER_PORT") {
            if let Ok(p) = port.parse() {
                self.server.port = p;
            }
        }
        if let Ok(port) = std::env::var("MONITORING_PORT") {
            if let Ok(p) = port.parse() {
                self.monitoring.port = p;
            }
        }
        if let Ok(v) = std::env::var("REDIS_ENABLED") {
            self.redis.enabled = parse_bool(&v, self.redis.enabled);
        }
        if let Ok(v) = std::env::var("REDIS_URL") {
            self.redis.url = v;
        }
        if let Ok(v) = std::env::var("KAFKA_ENABLED") {
            self.kafka.enabled = parse_bool(&v, self.kafka.enabled);
        }
        if let Ok(v) = std::env::var("POSTGRES_ENABLED") {
            self.postgres.enabled = parse_bool(&v, self.postgres.enabled);
        }
        if let Ok(v) = std::env::var("POSTGRES_URL") {
            self.postgres.url = v;
        }
        if let Ok(v) = std::env::var("MONGO_ENABLED") {
            self.mongo.enabled = parse_bool(&v, self.mongo.enabled);
        }
        if let Ok(v) = std::env::var("MONGO_URI") {
            self.mongo.uri = v;
        }
        if let Ok(v) = std::env::var("AUTH_SECRET") {
            self.auth.secret = v;
        }
        if let Ok(v) = std::env::var("OBFUSCATE_API") {
            self.monitoring.obfuscate_api = parse_bool(&v, self.monitoring.obfuscate_api);
        }
    }
}

fn parse_bool(s: &str, default: bool) -> bool {
    match s.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => true,
        "0" | "false" | "no" | "off" => false,
        _ => default,
    }
}
