// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! A hand-rolled single-shot guard for the service instance's once-only
//! `start`/`wait` invocations (spec.md §3). Not `std::sync::OnceLock`:
//! a stopped instance is respawned by rearming the guard, which
//! `OnceLock` has no way to do.

use parking_lot::Mutex;

pub struct SingleShot {
    armed: Mutex<bool>,
}

impl SingleShot {
    pub fn new() -> Self {
        Self { armed: Mutex::new(true) }
    }

    /// Returns `true` the first time it's called after arming, `false`
    /// every time after.
    pub fn try_take(&self) -> bool {
        let mut armed = self.armed.lock();
        if *armed {
            *armed = false;
            true
        } else {
            false
        }
    }

    pub fn rearm(&self) {
        *self.armed.lock() = true;
    }
}

impl Default for SingleShot {
    fn default() -> Self {
        Self::new()
    }
}
