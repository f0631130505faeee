// This file is part of the product Berth.
// SPDX-FileCopyrightText: 2025-2026 Zivatar Limited
// SPDX-License-Identifier: AGPL-3.0-or-later
// The code and documentation in this repository is licensed under the GNU Affero General Public License v3.0 or later (AGPL-3.0-or-later). See LICENSE.

#![allow(dead_code)]

use crate::config::{Config, LoggingConfig, ServerConfig, TlsSettings, ValidatedConfig};
use std::fs;
use std::path::{Path, PathBuf};
use uuid::Uuid;

#[derive(Debug)]
pub struct TestFixtureRoot {
    path: PathBuf,
}

impl TestFixtureRoot {
    pub fn new_fixed(name: &str) -> std::io::Result<Self> {
        let root = fixtures_root().join(name);
        if root.exists() {
            fs::remove_dir_all(&root)?;
        }
        fs::create_dir_all(&root)?;
        Ok(Self { path: root })
    }

    pub fn new_unique(prefix: &str) -> std::io::Result<Self> {
        let name = format!("{}-{}", prefix, Uuid::new_v4());
        Self::new_fixed(&name)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn cert_dir(&self) -> PathBuf {
        self.path.join("Certificate")
    }
}

impl Drop for TestFixtureRoot {
    fn drop(&mut self) {
        let _ = fs::remove_dir_all(&self.path);
    }
}

fn fixtures_root() -> PathBuf {
    let manifest_dir = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    let repo_root = manifest_dir.parent().unwrap_or(&manifest_dir);
    repo_root.join("target").join("test-fixtures")
}

pub fn test_tls_settings(root: &Path) -> TlsSettings {
    TlsSettings {
        directory: root.join("Certificate"),
        key_file: "server.key".to_string(),
        cert_file: "server.crt".to_string(),
        validity_days: 365,
        renewal_threshold_days: 30,
        common_name: "localhost".to_string(),
        organization: "Berth".to_string(),
        country: "GB".to_string(),
        subject_alt_names: vec!["localhost".to_string()],
        serial_number: None,
    }
}

/// Validated config with short reclamation and retry delays so bounded-retry
/// tests finish quickly.
pub fn test_config(root: &Path, port: u16) -> ValidatedConfig {
    ValidatedConfig {
        server: ServerConfig {
            host: "127.0.0.1".to_string(),
            port,
            workers: 1,
            bind_retries: 3,
            retry_delay_ms: 5,
            reclaim_retries: 2,
            reclaim_delay_ms: 1,
        },
        tls: test_tls_settings(root),
        logging: LoggingConfig {
            level: "info".to_string(),
        },
    }
}

/// Keeps the raw config type exercised from the fixture side as well.
pub fn parse_test_config(yaml: &str, root: &Path) -> ValidatedConfig {
    let config: Config = serde_yaml::from_str(yaml).expect("test config yaml");
    config.validate(root).expect("test config validation")
}
