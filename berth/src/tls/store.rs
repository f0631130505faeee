// This file is part of the product Berth.
// SPDX-FileCopyrightText: 2025-2026 Zivatar Limited
// SPDX-License-Identifier: AGPL-3.0-or-later
// The code and documentation in this repository is licensed under the GNU Affero General Public License v3.0 or later (AGPL-3.0-or-later). See LICENSE.

use super::{CertError, CertificateMaterial};
use crate::config::TlsSettings;
use std::fs;

/// Returns the stored pair, or None when either file is missing. A half-written
/// pair is treated as absent material, never repaired in place.
pub fn load(settings: &TlsSettings) -> Result<Option<CertificateMaterial>, CertError> {
    let key_path = settings.key_path();
    let cert_path = settings.cert_path();

    if !key_path.exists() || !cert_path.exists() {
        return Ok(None);
    }

    let private_key_pem = fs::read_to_string(&key_path).map_err(CertError::Read)?;
    let certificate_pem = fs::read_to_string(&cert_path).map_err(CertError::Read)?;

    CertificateMaterial::from_pems(private_key_pem, certificate_pem).map(Some)
}

pub fn persist(settings: &TlsSettings, material: &CertificateMaterial) -> Result<(), CertError> {
    fs::create_dir_all(&settings.directory).map_err(CertError::Persist)?;
    fs::write(settings.key_path(), &material.private_key_pem).map_err(CertError::Persist)?;
    fs::write(settings.cert_path(), &material.certificate_pem).map_err(CertError::Persist)?;
    Ok(())
}
