// This file is part of the product Berth.
// SPDX-FileCopyrightText: 2025-2026 Zivatar Limited
// SPDX-License-Identifier: AGPL-3.0-or-later
// The code and documentation in this repository is licensed under the GNU Affero General Public License v3.0 or later (AGPL-3.0-or-later). See LICENSE.

use serde::{Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

#[derive(Debug)]
pub enum ConfigError {
    LoadError(String),
    ValidationError(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::LoadError(msg) => write!(f, "Configuration load error: {}", msg),
            ConfigError::ValidationError(msg) => {
                write!(f, "Configuration validation error: {}", msg)
            }
        }
    }
}

impl std::error::Error for ConfigError {}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_workers")]
    pub workers: usize,
    #[serde(default = "default_bind_retries")]
    pub bind_retries: u32,
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
    #[serde(default = "default_reclaim_retries")]
    pub reclaim_retries: u32,
    #[serde(default = "default_reclaim_delay_ms")]
    pub reclaim_delay_ms: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            workers: default_workers(),
            bind_retries: default_bind_retries(),
            retry_delay_ms: default_retry_delay_ms(),
            reclaim_retries: default_reclaim_retries(),
            reclaim_delay_ms: default_reclaim_delay_ms(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8443
}

fn default_workers() -> usize {
    4
}

fn default_bind_retries() -> u32 {
    3
}

fn default_retry_delay_ms() -> u64 {
    1000
}

fn default_reclaim_retries() -> u32 {
    3
}

fn default_reclaim_delay_ms() -> u64 {
    500
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct TlsConfig {
    #[serde(default = "default_tls_directory")]
    pub directory: String,
    #[serde(default = "default_key_file")]
    pub key_file: String,
    #[serde(default = "default_cert_file")]
    pub cert_file: String,
    #[serde(default = "default_validity_days")]
    pub validity_days: i64,
    #[serde(default = "default_renewal_threshold_days")]
    pub renewal_threshold_days: i64,
    #[serde(default = "default_common_name")]
    pub common_name: String,
    #[serde(default = "default_organization")]
    pub organization: String,
    #[serde(default = "default_country")]
    pub country: String,
    #[serde(default = "default_subject_alt_names")]
    pub subject_alt_names: Vec<String>,
    #[serde(default)]
    pub serial_number: Option<u64>,
}

impl Default for TlsConfig {
    fn default() -> Self {
        Self {
            directory: default_tls_directory(),
            key_file: default_key_file(),
            cert_file: default_cert_file(),
            validity_days: default_validity_days(),
            renewal_threshold_days: default_renewal_threshold_days(),
            common_name: default_common_name(),
            organization: default_organization(),
            country: default_country(),
            subject_alt_names: default_subject_alt_names(),
            serial_number: None,
        }
    }
}

fn default_tls_directory() -> String {
    "Certificate".to_string()
}

fn default_key_file() -> String {
    "server.key".to_string()
}

fn default_cert_file() -> String {
    "server.crt".to_string()
}

fn default_validity_days() -> i64 {
    365
}

fn default_renewal_threshold_days() -> i64 {
    30
}

fn default_common_name() -> String {
    "localhost".to_string()
}

fn default_organization() -> String {
    "Berth".to_string()
}

fn default_country() -> String {
    "GB".to_string()
}

fn default_subject_alt_names() -> Vec<String> {
    vec!["localhost".to_string(), "127.0.0.1".to_string()]
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub tls: TlsConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone)]
pub struct ValidatedConfig {
    pub server: ServerConfig,
    pub tls: TlsSettings,
    pub logging: LoggingConfig,
}

/// TLS settings with the certificate directory resolved against the runtime root.
#[derive(Debug, Clone)]
pub struct TlsSettings {
    pub directory: PathBuf,
    pub key_file: String,
    pub cert_file: String,
    pub validity_days: i64,
    pub renewal_threshold_days: i64,
    pub common_name: String,
    pub organization: String,
    pub country: String,
    pub subject_alt_names: Vec<String>,
    pub serial_number: Option<u64>,
}

impl TlsSettings {
    pub fn key_path(&self) -> PathBuf {
        self.directory.join(&self.key_file)
    }

    pub fn cert_path(&self) -> PathBuf {
        self.directory.join(&self.cert_file)
    }
}

impl Config {
    pub fn load(root: &Path) -> Result<Self, ConfigError> {
        let config_path = root.join("config.yaml");
        let config_content = fs::read_to_string(&config_path).map_err(|e| {
            ConfigError::LoadError(format!(
                "Failed to read config file '{}': {}",
                config_path.display(),
                e
            ))
        })?;
        let config: Config = serde_yaml::from_str(&config_content).map_err(|e| {
            ConfigError::LoadError(format!(
                "Failed to parse config file '{}': {}",
                config_path.display(),
                e
            ))
        })?;
        Ok(config)
    }

    /// Loads and validates configuration at startup. If validation fails, the application should not start.
    pub fn load_and_validate(root: &Path) -> Result<ValidatedConfig, ConfigError> {
        let config = Self::load(root)?;
        config.validate(root)
    }

    pub fn validate(self, root: &Path) -> Result<ValidatedConfig, ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::ValidationError(
                "server.port must be non-zero; an ephemeral port cannot be reclaimed".to_string(),
            ));
        }

        if self.server.workers == 0 {
            return Err(ConfigError::ValidationError(
                "server.workers must be at least 1".to_string(),
            ));
        }

        if self.server.bind_retries == 0 {
            return Err(ConfigError::ValidationError(
                "server.bind_retries must be at least 1".to_string(),
            ));
        }

        if self.server.reclaim_retries == 0 {
            return Err(ConfigError::ValidationError(
                "server.reclaim_retries must be at least 1".to_string(),
            ));
        }

        if self.tls.validity_days < 1 {
            return Err(ConfigError::ValidationError(format!(
                "tls.validity_days must be at least 1, got: {}",
                self.tls.validity_days
            )));
        }

        if self.tls.renewal_threshold_days < 0
            || self.tls.renewal_threshold_days >= self.tls.validity_days
        {
            return Err(ConfigError::ValidationError(format!(
                "tls.renewal_threshold_days must be non-negative and smaller than \
                 tls.validity_days ({}), got: {}",
                self.tls.validity_days, self.tls.renewal_threshold_days
            )));
        }

        if self.tls.common_name.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "tls.common_name must not be empty".to_string(),
            ));
        }

        if self.tls.country.len() != 2 || !self.tls.country.chars().all(|c| c.is_ascii_alphabetic())
        {
            return Err(ConfigError::ValidationError(format!(
                "tls.country must be a two-letter code, got: '{}'",
                self.tls.country
            )));
        }

        if self.tls.subject_alt_names.is_empty() {
            return Err(ConfigError::ValidationError(
                "tls.subject_alt_names requires at least one entry".to_string(),
            ));
        }

        if self
            .tls
            .subject_alt_names
            .iter()
            .any(|name| name.trim().is_empty())
        {
            return Err(ConfigError::ValidationError(
                "tls.subject_alt_names entries must not be empty".to_string(),
            ));
        }

        let directory = {
            let raw = PathBuf::from(&self.tls.directory);
            if raw.is_absolute() {
                raw
            } else {
                root.join(raw)
            }
        };

        Ok(ValidatedConfig {
            server: self.server,
            tls: TlsSettings {
                directory,
                key_file: self.tls.key_file,
                cert_file: self.tls.cert_file,
                validity_days: self.tls.validity_days,
                renewal_threshold_days: self.tls.renewal_threshold_days,
                common_name: self.tls.common_name,
                organization: self.tls.organization,
                country: self.tls.country,
                subject_alt_names: self.tls.subject_alt_names,
                serial_number: self.tls.serial_number,
            },
            logging: self.logging,
        })
    }
}

/// Writes a commented default config.yaml on first run. Returns true when the file was created.
pub fn ensure_config(root: &Path) -> Result<bool, ConfigError> {
    let root_path = normalize_root(root)?;
    let config_path = root_path.join("config.yaml");

    if config_path.exists() {
        return Ok(false);
    }

    let mut file = match OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(&config_path)
    {
        Ok(file) => file,
        Err(err) if err.kind() == io::ErrorKind::AlreadyExists => return Ok(false),
        Err(err) => {
            return Err(ConfigError::LoadError(format!(
                "Failed to create config file '{}': {}",
                config_path.display(),
                err
            )));
        }
    };

    file.write_all(DEFAULT_CONFIG_YAML.as_bytes())
        .and_then(|()| file.sync_all())
        .map_err(|err| {
            ConfigError::LoadError(format!(
                "Failed to write config file '{}': {}",
                config_path.display(),
                err
            ))
        })?;

    eprintln!("[bootstrap] created config.yaml with self-signed TLS defaults");
    Ok(true)
}

fn normalize_root(root: &Path) -> Result<PathBuf, ConfigError> {
    let root_path = if root.as_os_str().is_empty() {
        PathBuf::from(".")
    } else {
        root.to_path_buf()
    };

    if root_path.exists() {
        if !root_path.is_dir() {
            return Err(ConfigError::ValidationError(format!(
                "Runtime root is not a directory: {}",
                root_path.display()
            )));
        }
        return Ok(root_path);
    }

    fs::create_dir_all(&root_path).map_err(|err| {
        ConfigError::LoadError(format!(
            "Failed to create runtime root '{}': {}",
            root_path.display(),
            err
        ))
    })?;
    eprintln!(
        "[bootstrap] created runtime root directory {}",
        root_path.display()
    );
    Ok(root_path)
}

const DEFAULT_CONFIG_YAML: &str = "\
# Berth runtime configuration.

server:
  host: \"0.0.0.0\"
  port: 8443
  workers: 4
  # Bind attempts before giving up when the port stays occupied.
  bind_retries: 3
  retry_delay_ms: 1000
  # Port reclamation sweeps per clearing pass.
  reclaim_retries: 3
  reclaim_delay_ms: 500

tls:
  directory: \"Certificate\"
  key_file: \"server.key\"
  cert_file: \"server.crt\"
  validity_days: 365
  renewal_threshold_days: 30
  common_name: \"localhost\"
  organization: \"Berth\"
  country: \"GB\"
  subject_alt_names:
    - \"localhost\"
    - \"127.0.0.1\"
  # serial_number: 1   # pin the certificate serial; omitted means random per issuance

logging:
  level: \"info\"
";
