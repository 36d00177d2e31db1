use std::{
    io,
    net::{AddrParseError, SocketAddr},
};

use clap::{Parser, ValueEnum};
use serde::Deserialize;
use thiserror::Error;

use crate::auth::CARD_OWNER_ROLE;

#[derive(Parser, Debug)]
#[command(name = "cashcard", about = "Cash card service - owner-scoped card balances over HTTP")]
pub struct CliArgs {
    /// Path to config file
    #[arg(short, long, default_value = "cashcard.toml")]
    pub config: String,

    /// Port to listen on (overrides config file)
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Log level (overrides config file)
    #[arg(short, long)]
    pub log_level: Option<String>,

    /// Storage backend (overrides config file)
    #[arg(long, value_enum)]
    pub storage: Option<StorageKind>,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub auth: AuthConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default)]
    pub json: bool,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum StorageKind {
    #[default]
    Memory,
    Sqlite,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    #[serde(default)]
    pub backend: StorageKind,

    /// SQLite database file, or `:memory:`.
    #[serde(default = "default_db_path")]
    pub path: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AuthConfig {
    /// When false, every request runs as `dev_principal` with the card-owner role.
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_dev_principal")]
    pub dev_principal: String,

    #[serde(default = "default_principals")]
    pub principals: Vec<PrincipalEntry>,
}

/// A known caller. Authenticates with a password (HTTP Basic), an API key,
/// or either when both are set. Passwords are only ever held as bcrypt hashes.
#[derive(Debug, Deserialize, Clone)]
pub struct PrincipalEntry {
    pub name: String,
    #[serde(default)]
    pub password_hash: Option<String>,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub roles: Vec<String>,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_db_path() -> String {
    "cashcards.db".to_string()
}

fn default_true() -> bool {
    true
}

fn default_dev_principal() -> String {
    "anonymous".to_string()
}

// bcrypt (cost 10) of the reference passwords `abc123` and `qrs456`.
const SARAH_PASSWORD_HASH: &str = "$2b$10$i2o5mwN2Ki2DhDmKNH1./e0ZkhgKhATKhNIM./yOGw/.6CviMhr/q";
const HANK_PASSWORD_HASH: &str = "$2b$10$ra1Rfc8xMVHEIGfZXZL/5eKNY2s31HjrgxbPMNB3E4ju5r3QpwZ36";

fn default_principals() -> Vec<PrincipalEntry> {
    vec![
        PrincipalEntry {
            name: "sarah1".to_string(),
            password_hash: Some(SARAH_PASSWORD_HASH.to_string()),
            api_key: None,
            roles: vec![CARD_OWNER_ROLE.to_string()],
        },
        PrincipalEntry {
            name: "hank-owns-no-cards".to_string(),
            password_hash: Some(HANK_PASSWORD_HASH.to_string()),
            api_key: None,
            roles: vec!["NON-OWNER".to_string()],
        },
    ]
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            level: default_log_level(),
            json: false,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        StorageConfig {
            backend: StorageKind::default(),
            path: default_db_path(),
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        AuthConfig {
            enabled: true,
            dev_principal: default_dev_principal(),
            principals: default_principals(),
        }
    }
}

impl AuthConfig {
    /// Every card is bound to the caller's name, so no principal, including
    /// the dev principal, may have a blank one.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.dev_principal.trim().is_empty() {
            return Err(ConfigError::Invalid("auth.dev_principal must not be empty".to_string()));
        }
        for entry in &self.principals {
            if entry.name.trim().is_empty() {
                return Err(ConfigError::Invalid(
                    "auth.principals entries need a non-empty name".to_string(),
                ));
            }
            if entry.password_hash.is_none() && entry.api_key.is_none() {
                return Err(ConfigError::Invalid(format!(
                    "principal {} has neither password_hash nor api_key",
                    entry.name
                )));
            }
        }
        Ok(())
    }
}

impl Config {
    pub fn from_toml(contents: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(contents)?;
        config.auth.validate()?;
        Ok(config)
    }

    /// Reads the config file named on the command line, then applies CLI
    /// overrides. A missing file means defaults; an unreadable or invalid
    /// one is an error.
    pub fn load(cli: &CliArgs) -> Result<Self, ConfigError> {
        let mut config = match std::fs::read_to_string(&cli.config) {
            Ok(contents) => Self::from_toml(&contents)?,
            Err(e) if e.kind() == io::ErrorKind::NotFound => Config::default(),
            Err(source) => {
                return Err(ConfigError::Read {
                    path: cli.config.clone(),
                    source,
                })
            }
        };

        // CLI overrides
        if let Some(port) = cli.port {
            config.server.port = port;
        }
        if let Some(ref level) = cli.log_level {
            config.logging.level = level.clone();
        }
        if let Some(storage) = cli.storage {
            config.storage.backend = storage;
        }

        Ok(config)
    }

    pub fn listen_addr(&self) -> Result<SocketAddr, AddrParseError> {
        format!("{}:{}", self.server.host, self.server.port).parse()
    }
}
