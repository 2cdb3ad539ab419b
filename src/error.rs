/*
 * Reconfiguration error types
 *
 * Nothing in the controller is fatal. These errors only travel as far as the
 * serial line, where they are reported and the input line is discarded.
 */

use core::fmt;

use crate::config::{TIMEOUT_COUNT, TIMEOUT_LIMIT};

// Result type for reconfiguration operations
pub type Result<T> = core::result::Result<T, ReconfigError>;

// Why a reconfiguration line was thrown away
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ReconfigError {
    // More than six values on the line
    TooManyValues,
    // The line ended before six values were read
    TooFewValues { count: usize },
    // A value that is not in `1..TIMEOUT_LIMIT`; non-numbers read as 0
    OutOfRange { value: i32 },
    // The line did not fit the input buffer
    Overflow,
}

impl fmt::Display for ReconfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReconfigError::TooManyValues => write!(f, "more than {} values", TIMEOUT_COUNT),
            ReconfigError::TooFewValues { count } => {
                write!(f, "expected {} values, got {}", TIMEOUT_COUNT, count)
            }
            ReconfigError::OutOfRange { value } => {
                write!(f, "{} is not in 1..{}", value, TIMEOUT_LIMIT)
            }
            ReconfigError::Overflow => write!(f, "line too long"),
        }
    }
}
