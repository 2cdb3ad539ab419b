/*
 * Compile-time settings for the controller. Only the phase timeouts can be
 * changed at runtime, through the serial line protocol in `reconfig`.
 */

// Phase timeouts in milliseconds, indexed by cycle phase.
pub const DEFAULT_TIMEOUTS: [u32; TIMEOUT_COUNT] = [500, 6000, 2000, 500, 6000, 2000];
pub const TIMEOUT_COUNT: usize = 6;
// A timeout has at most four digits, so anything from here up is rejected.
pub const TIMEOUT_LIMIT: u32 = 9999;

// The camera watchdog: a vehicle still in the intersection after this long
// gets photographed.
pub const CAMERA_TIMEOUT_MILLIS: u64 = 2000;
pub const DWELL_TICK_MILLIS: u64 = 1;

// Longest reconfiguration line, terminator excluded.
pub const LINE_CAPACITY: usize = 40;

pub const BUTTON_DEBOUNCE_MILLIS: u64 = 20;
pub const MASKER_HZ: u64 = 100;
pub const CHANNEL_CAPACITY: usize = 4;
// Room for a few pasted lines while their echo is written out.
pub const SERIAL_RX_BUFFER_SIZE: usize = 128;
