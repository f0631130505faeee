// This file is part of the product Berth.
// SPDX-FileCopyrightText: 2025-2026 Zivatar Limited
// SPDX-License-Identifier: AGPL-3.0-or-later
// The code and documentation in this repository is licensed under the GNU Affero General Public License v3.0 or later (AGPL-3.0-or-later). See LICENSE.

use rustls::pki_types::pem::PemObject;
use rustls::pki_types::{CertificateDer, PrivateKeyDer};
use std::io;
use time::OffsetDateTime;

pub mod issuer;
pub mod lifecycle;
pub mod store;
pub mod validator;

pub use lifecycle::CertificateLifecycle;

#[derive(Debug)]
pub enum CertError {
    Read(io::Error),
    Parse(String),
    Issuance(String),
    Persist(io::Error),
}

impl std::fmt::Display for CertError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CertError::Read(err) => write!(f, "Certificate read error: {}", err),
            CertError::Parse(msg) => write!(f, "Certificate parse error: {}", msg),
            CertError::Issuance(msg) => write!(f, "Certificate issuance error: {}", msg),
            CertError::Persist(err) => write!(f, "Certificate persist error: {}", err),
        }
    }
}

impl std::error::Error for CertError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CertError::Read(err) | CertError::Persist(err) => Some(err),
            _ => None,
        }
    }
}

/// A key/certificate pair in PEM form together with its validity window.
/// Replaced as a whole on renewal, never mutated in place.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertificateMaterial {
    pub private_key_pem: String,
    pub certificate_pem: String,
    pub not_before: OffsetDateTime,
    pub not_after: OffsetDateTime,
}

impl CertificateMaterial {
    pub fn from_pems(private_key_pem: String, certificate_pem: String) -> Result<Self, CertError> {
        let (not_before, not_after) = validator::validity_window(&certificate_pem)?;
        Ok(Self {
            private_key_pem,
            certificate_pem,
            not_before,
            not_after,
        })
    }
}

/// Assembles the rustls server config handed to the listener. No client auth,
/// single static certificate.
pub fn build_server_config(material: &CertificateMaterial) -> io::Result<rustls::ServerConfig> {
    let certs: Result<Vec<_>, _> =
        CertificateDer::pem_slice_iter(material.certificate_pem.as_bytes()).collect();
    let certs =
        certs.map_err(|err| io::Error::new(io::ErrorKind::InvalidInput, err.to_string()))?;

    if certs.is_empty() {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            "No certificates found in PEM material",
        ));
    }

    let private_key = PrivateKeyDer::from_pem_slice(material.private_key_pem.as_bytes())
        .map_err(|err| io::Error::new(io::ErrorKind::InvalidInput, err.to_string()))?;

    rustls::ServerConfig::builder()
        .with_no_client_auth()
        .with_single_cert(certs, private_key)
        .map_err(|err| io::Error::new(io::ErrorKind::InvalidInput, err.to_string()))
}
