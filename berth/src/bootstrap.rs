// This file is part of the product Berth.
// SPDX-FileCopyrightText: 2025-2026 Zivatar Limited
// SPDX-License-Identifier: AGPL-3.0-or-later
// The code and documentation in this repository is licensed under the GNU Affero General Public License v3.0 or later (AGPL-3.0-or-later). See LICENSE.

use crate::config::ValidatedConfig;
use crate::port::{PlatformInspector, ProcessInspector, ProcessReaper};
use crate::tls::{self, CertError, CertificateLifecycle};
use log::{debug, error, info, warn};
use std::io;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootstrapState {
    Idle,
    ClearingPort,
    AcquiringCertificate,
    Binding,
    Listening,
    Retrying,
    Failed,
}

#[derive(Debug)]
pub enum BootstrapError {
    Certificate(CertError),
    PortStillBound { port: u16, attempts: u32 },
    Bind(io::Error),
}

impl std::fmt::Display for BootstrapError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BootstrapError::Certificate(err) => {
                write!(f, "No usable TLS certificate: {}", err)
            }
            BootstrapError::PortStillBound { port, attempts } => write!(
                f,
                "Port {} still in use after {} bind attempt(s)",
                port, attempts
            ),
            BootstrapError::Bind(err) => write!(f, "Listener bind failed: {}", err),
        }
    }
}

impl std::error::Error for BootstrapError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            BootstrapError::Certificate(err) => Some(err),
            BootstrapError::Bind(err) => Some(err),
            BootstrapError::PortStillBound { .. } => None,
        }
    }
}

#[derive(Debug)]
pub enum BootstrapOutcome<L> {
    Listening { listener: L, port: u16 },
    Failed(BootstrapError),
}

impl<L> BootstrapOutcome<L> {
    pub fn is_listening(&self) -> bool {
        matches!(self, BootstrapOutcome::Listening { .. })
    }
}

/// Drives a single startup sequence: clear the port, acquire certificate
/// material, bind the caller's handler. Failure is a returned outcome; this
/// never panics and never terminates the process. One instance per process.
pub struct ServerBootstrapper {
    config: ValidatedConfig,
    lifecycle: CertificateLifecycle,
    reaper: ProcessReaper,
    state: BootstrapState,
}

impl ServerBootstrapper {
    pub fn new(config: &ValidatedConfig) -> Self {
        Self::with_inspector(config, Arc::new(PlatformInspector::default()))
    }

    pub fn with_inspector(config: &ValidatedConfig, inspector: Arc<dyn ProcessInspector>) -> Self {
        Self {
            config: config.clone(),
            lifecycle: CertificateLifecycle::new(config.tls.clone()),
            reaper: ProcessReaper::new(inspector),
            state: BootstrapState::Idle,
        }
    }

    pub fn state(&self) -> BootstrapState {
        self.state
    }

    /// The bind callback receives the port and the assembled rustls config and
    /// returns the running listener. Only `AddrInUse` triggers a retry; any
    /// other error is terminal. The certificate is acquired once per run.
    pub fn start<L, B>(&mut self, mut bind: B) -> BootstrapOutcome<L>
    where
        B: FnMut(u16, &rustls::ServerConfig) -> io::Result<L>,
    {
        let port = self.config.server.port;
        let reclaim_retries = self.config.server.reclaim_retries;
        let reclaim_delay = Duration::from_millis(self.config.server.reclaim_delay_ms);
        let retry_delay = Duration::from_millis(self.config.server.retry_delay_ms);
        let max_bind_retries = self.config.server.bind_retries;

        self.transition(BootstrapState::ClearingPort);
        self.reaper.free_port(port, reclaim_retries, reclaim_delay);

        self.transition(BootstrapState::AcquiringCertificate);
        let material = match self.lifecycle.acquire() {
            Ok(material) => material,
            Err(err) => {
                error!("Certificate acquisition failed: {}", err);
                self.transition(BootstrapState::Failed);
                return BootstrapOutcome::Failed(BootstrapError::Certificate(err));
            }
        };

        let tls_config = match tls::build_server_config(&material) {
            Ok(config) => config,
            Err(err) => {
                error!("TLS server configuration rejected the material: {}", err);
                self.transition(BootstrapState::Failed);
                return BootstrapOutcome::Failed(BootstrapError::Bind(err));
            }
        };

        for attempt in 1..=max_bind_retries {
            self.transition(BootstrapState::Binding);
            match bind(port, &tls_config) {
                Ok(listener) => {
                    self.transition(BootstrapState::Listening);
                    info!("Listening on port {}", port);
                    return BootstrapOutcome::Listening { listener, port };
                }
                Err(err) if err.kind() == io::ErrorKind::AddrInUse => {
                    warn!(
                        "Port {} in use on bind attempt {}/{}",
                        port, attempt, max_bind_retries
                    );
                    if attempt < max_bind_retries {
                        self.transition(BootstrapState::Retrying);
                        self.reaper.free_port(port, reclaim_retries, reclaim_delay);
                        thread::sleep(retry_delay);
                    }
                }
                Err(err) => {
                    error!("Bind on port {} failed: {}", port, err);
                    self.transition(BootstrapState::Failed);
                    return BootstrapOutcome::Failed(BootstrapError::Bind(err));
                }
            }
        }

        error!(
            "Exhausted {} bind attempt(s) on port {}; continuing without a listener",
            max_bind_retries, port
        );
        self.transition(BootstrapState::Failed);
        BootstrapOutcome::Failed(BootstrapError::PortStillBound {
            port,
            attempts: max_bind_retries,
        })
    }

    fn transition(&mut self, next: BootstrapState) {
        debug!("Bootstrap state {:?} -> {:?}", self.state, next);
        self.state = next;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::test_fixtures::{TestFixtureRoot, test_config};
    use std::sync::Mutex;

    struct IdleInspector;

    impl ProcessInspector for IdleInspector {
        fn listening_pids(&self, _port: u16) -> io::Result<Vec<u32>> {
            Ok(Vec::new())
        }

        fn terminate(&self, _pid: u32) -> io::Result<()> {
            Ok(())
        }
    }

    struct StubbornInspector {
        port: u16,
        terminated: Mutex<Vec<u32>>,
    }

    impl ProcessInspector for StubbornInspector {
        fn listening_pids(&self, port: u16) -> io::Result<Vec<u32>> {
            if port == self.port {
                Ok(vec![4242])
            } else {
                Ok(Vec::new())
            }
        }

        fn terminate(&self, pid: u32) -> io::Result<()> {
            self.terminated.lock().unwrap().push(pid);
            Ok(())
        }
    }

    fn install_ring_provider() {
        let _ = rustls::crypto::ring::default_provider().install_default();
    }

    #[test]
    fn successful_bind_reaches_listening() {
        install_ring_provider();
        let fixture = TestFixtureRoot::new_unique("bootstrap-listening").unwrap();
        let config = test_config(fixture.path(), 3085);
        let mut bootstrapper =
            ServerBootstrapper::with_inspector(&config, Arc::new(IdleInspector));

        let mut bind_calls = 0u32;
        let outcome = bootstrapper.start(|port, _tls| {
            bind_calls += 1;
            Ok(port)
        });

        assert!(outcome.is_listening());
        assert_eq!(bind_calls, 1);
        assert_eq!(bootstrapper.state(), BootstrapState::Listening);
    }

    #[test]
    fn unkillable_occupant_fails_after_exhausting_bind_retries() {
        install_ring_provider();
        let fixture = TestFixtureRoot::new_unique("bootstrap-exhausted").unwrap();
        let config = test_config(fixture.path(), 3086);
        let inspector = Arc::new(StubbornInspector {
            port: 3086,
            terminated: Mutex::new(Vec::new()),
        });
        let mut bootstrapper = ServerBootstrapper::with_inspector(
            &config,
            Arc::clone(&inspector) as Arc<dyn ProcessInspector>,
        );

        let mut bind_calls = 0u32;
        let outcome = bootstrapper.start::<(), _>(|_port, _tls| {
            bind_calls += 1;
            Err(io::Error::new(io::ErrorKind::AddrInUse, "port busy"))
        });

        assert_eq!(bind_calls, config.server.bind_retries);
        assert_eq!(bootstrapper.state(), BootstrapState::Failed);
        match outcome {
            BootstrapOutcome::Failed(BootstrapError::PortStillBound { port, attempts }) => {
                assert_eq!(port, 3086);
                assert_eq!(attempts, config.server.bind_retries);
            }
            other => panic!("expected PortStillBound, got {:?}", other),
        }
        assert!(
            !inspector.terminated.lock().unwrap().is_empty(),
            "expected reclamation to attempt termination"
        );
    }

    #[test]
    fn non_address_errors_fail_without_retry() {
        install_ring_provider();
        let fixture = TestFixtureRoot::new_unique("bootstrap-permission").unwrap();
        let config = test_config(fixture.path(), 443);
        let mut bootstrapper =
            ServerBootstrapper::with_inspector(&config, Arc::new(IdleInspector));

        let mut bind_calls = 0u32;
        let outcome = bootstrapper.start::<(), _>(|_port, _tls| {
            bind_calls += 1;
            Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                "privileged port",
            ))
        });

        assert_eq!(bind_calls, 1);
        assert!(matches!(
            outcome,
            BootstrapOutcome::Failed(BootstrapError::Bind(_))
        ));
        assert_eq!(bootstrapper.state(), BootstrapState::Failed);
    }

    #[test]
    fn certificate_is_not_reacquired_across_bind_retries() {
        install_ring_provider();
        let fixture = TestFixtureRoot::new_unique("bootstrap-one-cert").unwrap();
        let config = test_config(fixture.path(), 3087);
        let mut bootstrapper =
            ServerBootstrapper::with_inspector(&config, Arc::new(IdleInspector));

        let cert_path = config.tls.cert_path();
        let mut seen_pems: Vec<String> = Vec::new();
        let outcome = bootstrapper.start::<(), _>(|_port, _tls| {
            seen_pems.push(std::fs::read_to_string(&cert_path).unwrap());
            Err(io::Error::new(io::ErrorKind::AddrInUse, "port busy"))
        });

        assert!(!outcome.is_listening());
        assert!(seen_pems.len() > 1);
        assert!(
            seen_pems.windows(2).all(|pair| pair[0] == pair[1]),
            "certificate material changed between bind attempts"
        );
    }
}
