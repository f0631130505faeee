// This file is part of the product Berth.
// SPDX-FileCopyrightText: 2025-2026 Zivatar Limited
// SPDX-License-Identifier: AGPL-3.0-or-later
// The code and documentation in this repository is licensed under the GNU Affero General Public License v3.0 or later (AGPL-3.0-or-later). See LICENSE.

#![allow(dead_code)]

/// Output of `lsof -t`: one PID per line.
pub(crate) fn parse_lsof_pids(output: &str) -> Vec<u32> {
    let mut pids = Vec::new();
    for line in output.lines() {
        if let Ok(pid) = line.trim().parse::<u32>()
            && !pids.contains(&pid)
        {
            pids.push(pid);
        }
    }
    pids
}

/// Output of `netstat -ano -p TCP`. The local-address column is matched on the
/// parsed port number, so a probe for 808 is never satisfied by :8080.
pub(crate) fn parse_netstat_pids(output: &str, port: u16) -> Vec<u32> {
    let mut pids = Vec::new();
    for line in output.lines() {
        let columns: Vec<&str> = line.split_whitespace().collect();
        let [proto, local, _foreign, state, pid] = columns.as_slice() else {
            continue;
        };

        if !proto.eq_ignore_ascii_case("tcp") || !state.eq_ignore_ascii_case("listening") {
            continue;
        }

        let Some((_, local_port)) = local.rsplit_once(':') else {
            continue;
        };
        if local_port.parse::<u16>() != Ok(port) {
            continue;
        }

        if let Ok(pid) = pid.parse::<u32>()
            && !pids.contains(&pid)
        {
            pids.push(pid);
        }
    }
    pids
}
