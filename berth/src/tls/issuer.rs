// This file is part of the product Berth.
// SPDX-FileCopyrightText: 2025-2026 Zivatar Limited
// SPDX-License-Identifier: AGPL-3.0-or-later
// The code and documentation in this repository is licensed under the GNU Affero General Public License v3.0 or later (AGPL-3.0-or-later). See LICENSE.

use super::{CertError, CertificateMaterial};
use crate::config::TlsSettings;
use rcgen::{
    CertificateParams, DistinguishedName, DnType, ExtendedKeyUsagePurpose, IsCa, KeyPair,
    KeyUsagePurpose, SanType, SerialNumber,
};
use rsa::RsaPrivateKey;
use rsa::pkcs8::{EncodePrivateKey, LineEnding};
use std::net::IpAddr;
use time::{Duration, OffsetDateTime};

const RSA_KEY_BITS: usize = 2048;

/// Issues a fresh RSA-2048 self-signed pair. Every call generates a new key;
/// the validity window length is fixed by the settings.
pub fn issue(settings: &TlsSettings) -> Result<CertificateMaterial, CertError> {
    let mut rng = rand::rngs::OsRng;
    let private_key = RsaPrivateKey::new(&mut rng, RSA_KEY_BITS)
        .map_err(|err| CertError::Issuance(format!("RSA key generation failed: {}", err)))?;
    let key_pem = private_key
        .to_pkcs8_pem(LineEnding::LF)
        .map_err(|err| CertError::Issuance(format!("RSA key encoding failed: {}", err)))?;
    let key_pair = KeyPair::from_pem_and_sign_algo(&key_pem, &rcgen::PKCS_RSA_SHA256)
        .map_err(|err| CertError::Issuance(format!("RSA key import failed: {}", err)))?;

    let mut dns_names = Vec::new();
    let mut ip_addresses = Vec::new();
    for name in &settings.subject_alt_names {
        match name.parse::<IpAddr>() {
            Ok(ip) => ip_addresses.push(ip),
            Err(_) => dns_names.push(name.clone()),
        }
    }

    let mut params = CertificateParams::new(dns_names)
        .map_err(|err| CertError::Issuance(err.to_string()))?;
    for ip in ip_addresses {
        params.subject_alt_names.push(SanType::IpAddress(ip));
    }

    let mut dn = DistinguishedName::new();
    dn.push(DnType::CommonName, settings.common_name.as_str());
    dn.push(DnType::OrganizationName, settings.organization.as_str());
    dn.push(DnType::CountryName, settings.country.as_str());
    params.distinguished_name = dn;

    let not_before = OffsetDateTime::now_utc();
    let not_after = not_before + Duration::days(settings.validity_days);
    params.not_before = not_before;
    params.not_after = not_after;

    params.is_ca = IsCa::ExplicitNoCa;
    params.key_usages = vec![
        KeyUsagePurpose::DigitalSignature,
        KeyUsagePurpose::KeyEncipherment,
    ];
    params.extended_key_usages = vec![ExtendedKeyUsagePurpose::ServerAuth];

    if let Some(serial) = settings.serial_number {
        params.serial_number = Some(SerialNumber::from(serial));
    }

    let cert = params
        .self_signed(&key_pair)
        .map_err(|err| CertError::Issuance(err.to_string()))?;

    Ok(CertificateMaterial {
        private_key_pem: key_pair.serialize_pem(),
        certificate_pem: cert.pem(),
        not_before,
        not_after,
    })
}
