// This file is part of the product Berth.
// SPDX-FileCopyrightText: 2025-2026 Zivatar Limited
// SPDX-License-Identifier: AGPL-3.0-or-later
// The code and documentation in this repository is licensed under the GNU Affero General Public License v3.0 or later (AGPL-3.0-or-later). See LICENSE.

#![allow(dead_code)]

use berth::port::ProcessInspector;
use std::io;
use std::net::TcpListener;
use std::sync::Mutex;

pub fn install_ring_provider() {
    let _ = rustls::crypto::ring::default_provider().install_default();
}

/// Grabs an ephemeral port and releases it so the caller can bind it.
pub fn free_loopback_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind ephemeral");
    listener.local_addr().expect("local addr").port()
}

/// Inspector double that sees no listeners and records termination requests.
#[derive(Default)]
pub struct QuietInspector {
    pub terminated: Mutex<Vec<u32>>,
}

impl ProcessInspector for QuietInspector {
    fn listening_pids(&self, _port: u16) -> io::Result<Vec<u32>> {
        Ok(Vec::new())
    }

    fn terminate(&self, pid: u32) -> io::Result<()> {
        self.terminated.lock().unwrap().push(pid);
        Ok(())
    }
}

/// Inspector double for a port whose occupant never dies.
pub struct StubbornInspector {
    pub port: u16,
    pub occupant: u32,
    pub terminated: Mutex<Vec<u32>>,
}

impl StubbornInspector {
    pub fn new(port: u16, occupant: u32) -> Self {
        Self {
            port,
            occupant,
            terminated: Mutex::new(Vec::new()),
        }
    }
}

impl ProcessInspector for StubbornInspector {
    fn listening_pids(&self, port: u16) -> io::Result<Vec<u32>> {
        if port == self.port {
            Ok(vec![self.occupant])
        } else {
            Ok(Vec::new())
        }
    }

    fn terminate(&self, pid: u32) -> io::Result<()> {
        self.terminated.lock().unwrap().push(pid);
        Ok(())
    }
}
