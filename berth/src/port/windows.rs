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
        let output = Command::new("netstat").args(["-ano", "-p", "TCP"]).output()?;

        if !output.status.success() {
            return Err(io::Error::other(format!(
                "netstat exited with {}",
                output.status
            )));
        }

        Ok(parse::parse_netstat_pids(
            &String::from_utf8_lossy(&output.stdout),
            port,
        ))
    }

    fn terminate(&self, pid: u32) -> io::Result<()> {
        let output = Command::new("taskkill")
            .args(["/PID", &pid.to_string(), "/F"])
            .output()?;

        if output.status.success() {
            return Ok(());
        }

        // A process that exited before the signal is not a failure.
        let stderr = String::from_utf8_lossy(&output.stderr);
        if stderr.contains("not found") {
            return Ok(());
        }

        Err(io::Error::other(format!(
            "taskkill /PID {} failed: {}",
            pid,
            stderr.trim()
        )))
    }
}
