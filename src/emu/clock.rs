//
// clock.rs --- CPU clock rate limiting.
//
// Copyright (C) 2016, James Bielman <jamesjb@gmail.com>
// All Rights Reserved.
//
// Released under the "BSD3" license. See the file "LICENSE"
// for details.
//

//! Rate limiting for the run loop.
//!
//! The clock never sleeps. The run loop asks how many cycles are due
//! against a monotonic timestamp, runs that many, and asks again.

use std::time::Instant;

/// Clock rates in Hz, slowest first. `None` runs unmetered.
pub const SPEEDS: [Option<u32>; 16] = [
    Some(25_000),
    Some(50_000),
    Some(100_000),
    Some(150_000),
    Some(250_000),
    Some(500_000),
    Some(750_000),
    Some(1_000_000),
    Some(1_500_000),
    Some(2_000_000),
    Some(3_000_000),
    Some(4_000_000),
    Some(5_000_000),
    Some(8_000_000),
    Some(10_000_000),
    None,
];

/// The level a new clock starts at (1MHz).
pub const DEFAULT_SPEED: usize = 7;

/// Cycles handed out per call when unmetered.
pub const UNMETERED_BATCH: u64 = 10_000;

/// One call returns at most 1/50 second of cycles. A host that falls
/// further behind than that loses the backlog.
const MAX_BURST_DIVISOR: u32 = 50;

pub struct Clock {
    level: usize,
    epoch: Instant,
    issued: u64,
}

impl Clock {
    pub fn new() -> Clock {
        Clock {
            level: DEFAULT_SPEED,
            epoch: Instant::now(),
            issued: 0,
        }
    }

    pub fn level(&self) -> usize {
        self.level
    }

    /// Clock rate in Hz, or `None` if unmetered.
    pub fn hz(&self) -> Option<u32> {
        SPEEDS[self.level]
    }

    /// Select a speed level. Returns false if `level` is out of range.
    pub fn set_level(&mut self, level: usize) -> bool {
        if level >= SPEEDS.len() {
            return false;
        }
        self.level = level;
        self.restart();
        log::debug!("clock speed {}", describe(SPEEDS[level]));
        true
    }

    /// Forget time spent so far, e.g. after the machine was paused.
    pub fn restart(&mut self) {
        self.epoch = Instant::now();
        self.issued = 0;
    }

    /// Return the number of cycles the CPU may run now.
    pub fn cycles_due(&mut self) -> u64 {
        let hz = match self.hz() {
            Some(hz) => hz,
            None => return UNMETERED_BATCH,
        };

        let target = (self.epoch.elapsed().as_secs_f64() * hz as f64) as u64;
        let due = target.saturating_sub(self.issued);
        let cap = (hz / MAX_BURST_DIVISOR).max(1) as u64;

        if due > cap {
            self.restart();
            cap
        } else {
            self.issued += due;
            due
        }
    }
}

impl Default for Clock {
    fn default() -> Clock {
        Clock::new()
    }
}

/// Human readable clock rate.
pub fn describe(speed: Option<u32>) -> String {
    match speed {
        None => "unmetered".to_string(),
        Some(hz) if hz >= 1_000_000 && hz % 1_000_000 == 0 => format!("{}MHz", hz / 1_000_000),
        Some(hz) if hz >= 1_000_000 => format!("{:.1}MHz", hz as f64 / 1_000_000.0),
        Some(hz) => format!("{}kHz", hz / 1000),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn speed_table() {
        assert_eq!(SPEEDS.len(), 16);
        assert_eq!(SPEEDS[0], Some(25_000));
        assert_eq!(SPEEDS[DEFAULT_SPEED], Some(1_000_000));
        assert_eq!(SPEEDS[15], None);

        let rates: Vec<u32> = SPEEDS.iter().filter_map(|s| *s).collect();
        assert!(rates.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn describe_rates() {
        assert_eq!(describe(Some(25_000)), "25kHz");
        assert_eq!(describe(Some(1_500_000)), "1.5MHz");
        assert_eq!(describe(Some(8_000_000)), "8MHz");
        assert_eq!(describe(None), "unmetered");
    }

    #[test]
    fn unmetered_runs_in_batches() {
        let mut clock = Clock::new();
        assert!(clock.set_level(15));
        assert_eq!(clock.cycles_due(), UNMETERED_BATCH);
        assert!(!clock.set_level(16));
        assert_eq!(clock.level(), 15);
    }

    #[test]
    fn metered_clock_is_bounded() {
        let mut clock = Clock::new();
        assert!(clock.set_level(0));

        thread::sleep(Duration::from_millis(5));
        let due = clock.cycles_due();
        assert!(due > 0);
        assert!(due <= 25_000 / 50);

        // Nothing new is due straight away.
        assert!(clock.cycles_due() < due);
    }
}
