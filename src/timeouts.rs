/*
 * How long each phase of the cycle lasts. The table is replaced as a whole or
 * not at all, so the cycle never runs on a mix of old and new timeouts.
 */

use core::fmt;

use crate::config::{DEFAULT_TIMEOUTS, TIMEOUT_COUNT, TIMEOUT_LIMIT};
use crate::error::{ReconfigError, Result};
use crate::trafficlight::CyclePhase;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TimeoutTable {
    millis: [u32; TIMEOUT_COUNT],
}

impl TimeoutTable {
    pub const fn new() -> Self {
        TimeoutTable {
            millis: DEFAULT_TIMEOUTS,
        }
    }

    // Every entry must be in 1..TIMEOUT_LIMIT.
    pub fn from_millis(millis: [i32; TIMEOUT_COUNT]) -> Result<Self> {
        let mut table = [0; TIMEOUT_COUNT];
        for (slot, value) in table.iter_mut().zip(millis) {
            if value <= 0 || value as u32 >= TIMEOUT_LIMIT {
                return Err(ReconfigError::OutOfRange { value });
            }
            *slot = value as u32;
        }
        Ok(TimeoutTable { millis: table })
    }

    pub fn phase_time_millis(&self, phase: CyclePhase) -> u32 {
        self.millis[phase.index()]
    }

    pub fn as_millis(&self) -> &[u32; TIMEOUT_COUNT] {
        &self.millis
    }
}

impl Default for TimeoutTable {
    fn default() -> Self {
        TimeoutTable::new()
    }
}

impl fmt::Display for TimeoutTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, millis) in self.millis.iter().enumerate() {
            if i > 0 {
                write!(f, ",")?;
            }
            write!(f, "{}", millis)?;
        }
        Ok(())
    }
}
