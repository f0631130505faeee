// This file is part of the product Berth.
// SPDX-FileCopyrightText: 2025-2026 Zivatar Limited
// SPDX-License-Identifier: AGPL-3.0-or-later
// The code and documentation in this repository is licensed under the GNU Affero General Public License v3.0 or later (AGPL-3.0-or-later). See LICENSE.

use super::CertError;
use time::{Duration, OffsetDateTime};
use x509_parser::pem::parse_x509_pem;
use x509_parser::prelude::{FromDer, X509Certificate};

pub fn validity_window(
    certificate_pem: &str,
) -> Result<(OffsetDateTime, OffsetDateTime), CertError> {
    let (_, pem) = parse_x509_pem(certificate_pem.as_bytes())
        .map_err(|err| CertError::Parse(err.to_string()))?;
    let (_, cert) = X509Certificate::from_der(pem.contents.as_slice())
        .map_err(|err| CertError::Parse(err.to_string()))?;
    let validity = cert.validity();
    Ok((
        validity.not_before.to_datetime(),
        validity.not_after.to_datetime(),
    ))
}

/// An unparseable certificate always needs renewal; a readable one needs
/// renewal once it is expired or inside the threshold window.
pub fn renewal_needed(certificate_pem: &str, now: OffsetDateTime, threshold_days: i64) -> bool {
    let not_after = match validity_window(certificate_pem) {
        Ok((_, not_after)) => not_after,
        Err(_) => return true,
    };

    if not_after <= now {
        return true;
    }

    not_after - now <= Duration::days(threshold_days)
}

pub fn remaining_days(certificate_pem: &str, now: OffsetDateTime) -> Result<i64, CertError> {
    let (_, not_after) = validity_window(certificate_pem)?;
    Ok((not_after - now).whole_days())
}
