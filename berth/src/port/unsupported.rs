// This file is part of the product Berth.
// SPDX-FileCopyrightText: 2025-2026 Zivatar Limited
// SPDX-License-Identifier: AGPL-3.0-or-later
// The code and documentation in this repository is licensed under the GNU Affero General Public License v3.0 or later (AGPL-3.0-or-later). See LICENSE.

use super::ProcessInspector;
use std::io;

#[derive(Debug, Default)]
pub struct PlatformInspector;

impl ProcessInspector for PlatformInspector {
    fn listening_pids(&self, _port: u16) -> io::Result<Vec<u32>> {
        // No enumeration support; the probe treats this as a free port.
        Ok(Vec::new())
    }

    fn terminate(&self, pid: u32) -> io::Result<()> {
        Err(io::Error::new(
            io::ErrorKind::Unsupported,
            format!("process termination is not supported on this platform (pid {})", pid),
        ))
    }
}
