// This file is part of the product Berth.
// SPDX-FileCopyrightText: 2025-2026 Zivatar Limited
// SPDX-License-Identifier: AGPL-3.0-or-later
// The code and documentation in this repository is licensed under the GNU Affero General Public License v3.0 or later (AGPL-3.0-or-later). See LICENSE.

use super::{ProcessInspector, parse};
use std::io;
use std::process::Command;

#[derive(Debug, Default)]
pub struct PlatformInspector;

impl ProcessInspector for PlatformInspector {
    fn listening_pids(&self, port: u16) -> io::Result<Vec<u32>> {
        let output = Command::new("lsof")
            .args(["-nP", &format!("-iTCP:{}", port), "-sTCP:LISTEN", "-t"])
            .output()?;

        // lsof exits non-zero when no process matches; that is a free port,
        // not an enumeration failure.
        if output.stdout.is_empty() {
            return Ok(Vec::new());
        }

        Ok(parse::parse_lsof_pids(&String::from_utf8_lossy(
            &output.stdout,
        )))
    }

    fn terminate(&self, pid: u32) -> io::Result<()> {
        let result = unsafe { libc::kill(pid as libc::pid_t, libc::SIGKILL) };
        if result == 0 {
            return Ok(());
        }

        let err = io::Error::last_os_error();
        match err.raw_os_error() {
            // Already exited between enumeration and the signal.
            Some(libc::ESRCH) => Ok(()),
            _ => Err(err),
        }
    }
}
