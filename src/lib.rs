#![cfg_attr(not(test), no_std)]

/*
 * The hardware-free part of the traffic light controller.
 *
 * Everything that decides what the lights should show lives here, so that it
 * can be tested on the host. The firmware binary in `main.rs` and `io.rs` only
 * moves events from the pins, timers and serial port into the `Controller` and
 * moves the resulting `Effects` back out.
 */

pub mod logging;

pub mod camera;
pub mod config;
pub mod controller;
pub mod debounce;
pub mod effects;
pub mod error;
pub mod mode;
pub mod pedestrian;
pub mod reconfig;
pub mod timed_output_masker;
pub mod timeouts;
pub mod trafficlight;

pub use controller::{Button, Controller, SharedController, Switches};
pub use effects::{Effects, Message, TimerCommand, TimerId};
pub use mode::OperationMode;
pub use trafficlight::{Approach, Colour, CyclePhase, SignalFrame};
