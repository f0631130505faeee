// This file is part of the product Berth.
// SPDX-FileCopyrightText: 2025-2026 Zivatar Limited
// SPDX-License-Identifier: AGPL-3.0-or-later
// The code and documentation in this repository is licensed under the GNU Affero General Public License v3.0 or later (AGPL-3.0-or-later). See LICENSE.

use super::{CertError, CertificateMaterial, issuer, store, validator};
use crate::config::TlsSettings;
use log::{info, warn};
use time::OffsetDateTime;

pub struct CertificateLifecycle {
    settings: TlsSettings,
}

impl CertificateLifecycle {
    pub fn new(settings: TlsSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &TlsSettings {
        &self.settings
    }

    /// Returns usable material: the stored pair unchanged while it stays
    /// outside the renewal threshold, otherwise a freshly issued and
    /// persisted replacement.
    pub fn acquire(&self) -> Result<CertificateMaterial, CertError> {
        let now = OffsetDateTime::now_utc();

        match store::load(&self.settings) {
            Ok(Some(material)) => {
                if !validator::renewal_needed(
                    &material.certificate_pem,
                    now,
                    self.settings.renewal_threshold_days,
                ) {
                    let days = (material.not_after - now).whole_days();
                    info!(
                        "TLS certificate {} valid for {} more day(s); reusing it",
                        self.settings.cert_path().display(),
                        days
                    );
                    return Ok(material);
                }

                if material.not_after <= now {
                    info!(
                        "TLS certificate {} expired on {}; renewing",
                        self.settings.cert_path().display(),
                        material.not_after
                    );
                } else {
                    let days = (material.not_after - now).whole_days();
                    info!(
                        "TLS certificate {} has {} day(s) left, inside the {}-day renewal \
                         threshold; renewing",
                        self.settings.cert_path().display(),
                        days,
                        self.settings.renewal_threshold_days
                    );
                }
            }
            Ok(None) => {
                info!(
                    "No TLS certificate found in {}; issuing a self-signed pair",
                    self.settings.directory.display()
                );
            }
            Err(err) => {
                warn!("Stored TLS certificate is unusable ({}); replacing it", err);
            }
        }

        let material = issuer::issue(&self.settings)?;
        store::persist(&self.settings, &material)?;
        info!(
            "Issued self-signed certificate for '{}', valid until {}",
            self.settings.common_name, material.not_after
        );
        Ok(material)
    }
}
