// This file is part of the product Berth.
// SPDX-FileCopyrightText: 2025-2026 Zivatar Limited
// SPDX-License-Identifier: AGPL-3.0-or-later
// The code and documentation in this repository is licensed under the GNU Affero General Public License v3.0 or later (AGPL-3.0-or-later). See LICENSE.

use log::{info, warn};
use std::io;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

pub(crate) mod parse;

#[cfg(unix)]
mod posix;
#[cfg(not(any(unix, windows)))]
mod unsupported;
#[cfg(windows)]
mod windows;

#[cfg(unix)]
pub use posix::PlatformInspector;
#[cfg(not(any(unix, windows)))]
pub use unsupported::PlatformInspector;
#[cfg(windows)]
pub use windows::PlatformInspector;

/// Capability boundary for OS-level socket and process access, so the probe
/// and reaper run against deterministic doubles in tests.
pub trait ProcessInspector: Send + Sync {
    /// PIDs of processes holding a listening socket on exactly this port.
    fn listening_pids(&self, port: u16) -> io::Result<Vec<u32>>;

    /// Forcibly terminates a process. A process that is already gone is not
    /// an error.
    fn terminate(&self, pid: u32) -> io::Result<()>;
}

pub struct PortProbe {
    inspector: Arc<dyn ProcessInspector>,
}

impl PortProbe {
    pub fn new(inspector: Arc<dyn ProcessInspector>) -> Self {
        Self { inspector }
    }

    pub fn platform() -> Self {
        Self::new(Arc::new(PlatformInspector::default()))
    }

    /// Enumeration failure reads as a free port. Fail-open keeps startup
    /// moving on hosts where the enumeration tooling is unavailable.
    pub fn is_bound(&self, port: u16) -> bool {
        match self.inspector.listening_pids(port) {
            Ok(pids) => !pids.is_empty(),
            Err(err) => {
                warn!(
                    "Listener enumeration for port {} failed ({}); assuming the port is free",
                    port, err
                );
                false
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReclaimOutcome {
    /// Nothing was listening; no termination was attempted.
    AlreadyFree,
    Cleared { attempts: u32, terminated: u32 },
    StillBound { terminated: u32 },
}

pub struct ProcessReaper {
    inspector: Arc<dyn ProcessInspector>,
    own_pid: u32,
}

impl ProcessReaper {
    pub fn new(inspector: Arc<dyn ProcessInspector>) -> Self {
        Self {
            inspector,
            own_pid: std::process::id(),
        }
    }

    pub fn platform() -> Self {
        Self::new(Arc::new(PlatformInspector::default()))
    }

    /// Repeatedly terminates whatever holds the port, up to `max_retries`
    /// sweeps with `delay` between them. Termination failures are swallowed:
    /// the process may have exited between enumeration and the signal.
    pub fn free_port(&self, port: u16, max_retries: u32, delay: Duration) -> ReclaimOutcome {
        let probe = PortProbe::new(Arc::clone(&self.inspector));
        let mut terminated = 0u32;

        for attempt in 1..=max_retries {
            if !probe.is_bound(port) {
                if attempt == 1 && terminated == 0 {
                    return ReclaimOutcome::AlreadyFree;
                }
                info!(
                    "Port {} reclaimed after {} attempt(s), {} process(es) terminated",
                    port,
                    attempt - 1,
                    terminated
                );
                return ReclaimOutcome::Cleared {
                    attempts: attempt - 1,
                    terminated,
                };
            }

            let owners: Vec<u32> = match self.inspector.listening_pids(port) {
                Ok(pids) => pids.into_iter().filter(|pid| *pid != self.own_pid).collect(),
                Err(err) => {
                    warn!(
                        "Owner enumeration for port {} failed ({}); skipping sweep {}/{}",
                        port, err, attempt, max_retries
                    );
                    Vec::new()
                }
            };

            info!(
                "Port {} held by {:?}; reclamation attempt {}/{}",
                port, owners, attempt, max_retries
            );

            for pid in owners {
                match self.inspector.terminate(pid) {
                    Ok(()) => terminated += 1,
                    Err(err) => {
                        warn!("Could not terminate pid {} on port {}: {}", pid, port, err);
                    }
                }
            }

            thread::sleep(delay);
        }

        if probe.is_bound(port) {
            warn!(
                "Port {} still bound after {} reclamation attempt(s)",
                port, max_retries
            );
            ReclaimOutcome::StillBound { terminated }
        } else {
            info!(
                "Port {} reclaimed after {} attempt(s), {} process(es) terminated",
                port, max_retries, terminated
            );
            ReclaimOutcome::Cleared {
                attempts: max_retries,
                terminated,
            }
        }
    }
}
