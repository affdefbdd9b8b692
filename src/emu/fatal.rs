//
// fatal.rs --- Cooperative shutdown and fatal error reporting.
//
// Copyright (C) 2016, James Bielman <jamesjb@gmail.com>
// All Rights Reserved.
//
// Released under the "BSD3" license. See the file "LICENSE"
// for details.
//

use std::fmt::Display;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// The "emulator is running" flag.
///
/// Cloning a `RunFlag` shares it, so a debugger thread can stop the
/// CPU loop. The run loop polls it before every tick; nothing ever
/// interrupts an instruction in flight.
#[derive(Clone, Debug)]
pub struct RunFlag {
    running: Arc<Mutex<bool>>,
}

impl RunFlag {
    pub fn new() -> RunFlag {
        RunFlag { running: Arc::new(Mutex::new(true)) }
    }

    fn lock(&self) -> MutexGuard<bool> {
        self.running.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn is_running(&self) -> bool {
        *self.lock()
    }

    pub fn set_running(&self, running: bool) {
        *self.lock() = running;
    }

    /// Request that the run loop stop after the current tick.
    pub fn stop(&self) {
        self.set_running(false);
    }
}

impl Default for RunFlag {
    fn default() -> RunFlag {
        RunFlag::new()
    }
}

/// Log a fatal condition with its source location and stop the
/// emulator. Use the `fatal!` macro rather than calling this directly.
pub fn report<E: Display + ?Sized>(run: &RunFlag, file: &str, line: u32, err: &E) {
    log::error!("{}:{}: {}", file, line, err);
    run.stop();
}

/// Report a fatal error against a `RunFlag`, recording the caller's
/// file and line.
#[macro_export]
macro_rules! fatal {
    ($run:expr, $err:expr) => {
        $crate::emu::fatal::report(&$run, file!(), line!(), &$err)
    };
}
