// This file is part of the product Berth.
// SPDX-FileCopyrightText: 2025-2026 Zivatar Limited
// SPDX-License-Identifier: AGPL-3.0-or-later
// The code and documentation in this repository is licensed under the GNU Affero General Public License v3.0 or later (AGPL-3.0-or-later). See LICENSE.

mod common;

use berth::tls::CertificateLifecycle;
use berth::util::test_fixtures::{TestFixtureRoot, test_tls_settings};
use rcgen::{CertificateParams, KeyPair};
use std::fs;
use time::{Duration, OffsetDateTime};
use x509_parser::pem::parse_x509_pem;
use x509_parser::prelude::{FromDer, X509Certificate};

#[test]
fn first_acquire_creates_both_files_with_full_validity_window() {
    let fixture = TestFixtureRoot::new_unique("acquire-fresh").unwrap();
    let mut settings = test_tls_settings(fixture.path());
    settings.validity_days = 365;
    settings.renewal_threshold_days = 30;

    let lifecycle = CertificateLifecycle::new(settings.clone());
    let material = lifecycle.acquire().expect("acquire");

    assert!(settings.key_path().exists());
    assert!(settings.cert_path().exists());

    let stored = fs::read_to_string(settings.cert_path()).unwrap();
    assert_eq!(stored, material.certificate_pem);

    let (_, pem) = parse_x509_pem(stored.as_bytes()).unwrap();
    let (_, cert) = X509Certificate::from_der(pem.contents.as_slice()).unwrap();
    let not_before = cert.validity().not_before.to_datetime();
    let not_after = cert.validity().not_after.to_datetime();
    assert_eq!(not_after - not_before, Duration::days(365));
}

#[test]
fn repeated_acquire_returns_byte_identical_material() {
    let fixture = TestFixtureRoot::new_unique("acquire-stable").unwrap();
    let settings = test_tls_settings(fixture.path());
    let lifecycle = CertificateLifecycle::new(settings.clone());

    let first = lifecycle.acquire().expect("first acquire");
    let first_key_on_disk = fs::read_to_string(settings.key_path()).unwrap();

    let second = lifecycle.acquire().expect("second acquire");
    let second_key_on_disk = fs::read_to_string(settings.key_path()).unwrap();

    assert_eq!(first.certificate_pem, second.certificate_pem);
    assert_eq!(first.private_key_pem, second.private_key_pem);
    assert_eq!(first_key_on_disk, second_key_on_disk);
}

#[test]
fn certificate_inside_renewal_threshold_is_replaced() {
    let fixture = TestFixtureRoot::new_unique("acquire-renews").unwrap();
    let settings = test_tls_settings(fixture.path());

    // Plant a pair with 10 days left against a 30-day threshold.
    fs::create_dir_all(&settings.directory).unwrap();
    let mut params = CertificateParams::new(vec!["localhost".to_string()]).unwrap();
    let now = OffsetDateTime::now_utc();
    params.not_before = now - Duration::days(355);
    params.not_after = now + Duration::days(10);
    let key_pair = KeyPair::generate().unwrap();
    let cert = params.self_signed(&key_pair).unwrap();
    fs::write(settings.cert_path(), cert.pem()).unwrap();
    fs::write(settings.key_path(), key_pair.serialize_pem()).unwrap();
    let planted_pem = cert.pem();

    let lifecycle = CertificateLifecycle::new(settings.clone());
    let renewed = lifecycle.acquire().expect("acquire");

    assert_ne!(renewed.certificate_pem, planted_pem);
    let stored = fs::read_to_string(settings.cert_path()).unwrap();
    assert_eq!(stored, renewed.certificate_pem);

    // The replacement carries a full window again.
    let (_, pem) = parse_x509_pem(stored.as_bytes()).unwrap();
    let (_, parsed) = X509Certificate::from_der(pem.contents.as_slice()).unwrap();
    let not_after = parsed.validity().not_after.to_datetime();
    assert!(not_after - now > Duration::days(300));
}

#[test]
fn expired_certificate_is_replaced() {
    let fixture = TestFixtureRoot::new_unique("acquire-expired").unwrap();
    let settings = test_tls_settings(fixture.path());

    fs::create_dir_all(&settings.directory).unwrap();
    let mut params = CertificateParams::new(vec!["localhost".to_string()]).unwrap();
    let now = OffsetDateTime::now_utc();
    params.not_before = now - Duration::days(2);
    params.not_after = now - Duration::days(1);
    let key_pair = KeyPair::generate().unwrap();
    fs::write(settings.cert_path(), params.self_signed(&key_pair).unwrap().pem()).unwrap();
    fs::write(settings.key_path(), key_pair.serialize_pem()).unwrap();

    let lifecycle = CertificateLifecycle::new(settings.clone());
    let renewed = lifecycle.acquire().expect("acquire");

    assert!(renewed.not_after > now, "expected a live replacement");
}

#[test]
fn missing_key_file_forces_a_fresh_pair() {
    let fixture = TestFixtureRoot::new_unique("acquire-half-pair").unwrap();
    let settings = test_tls_settings(fixture.path());

    let lifecycle = CertificateLifecycle::new(settings.clone());
    let original = lifecycle.acquire().expect("seed pair");

    fs::remove_file(settings.key_path()).unwrap();
    let replaced = lifecycle.acquire().expect("acquire after key loss");

    assert_ne!(original.certificate_pem, replaced.certificate_pem);
    assert!(settings.key_path().exists());
}
