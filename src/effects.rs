/*
 * Everything the controller wants done outside itself.
 *
 * Handlers on the controller never touch pins, timers or the serial port.
 * They return an `Effects` value describing what should happen, and the
 * firmware has exactly one writer for each of those resources that applies
 * them. That keeps the handlers short enough to run inside a critical section,
 * and means two handlers can never interleave a read-modify-write on the same
 * output register.
 */

use core::fmt;

use heapless::Vec;

use crate::error::ReconfigError;
use crate::mode::OperationMode;
use crate::reconfig::LineBuffer;
use crate::timeouts::TimeoutTable;
use crate::trafficlight::SignalFrame;

const MAX_TIMER_COMMANDS: usize = 4;
const MAX_MESSAGES: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TimerId {
    // One-shot watchdog for a vehicle that stays in the intersection.
    Camera,
    // 1 ms periodic counter of the time spent in the intersection.
    Dwell,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TimerCommand {
    Start(TimerId),
    Stop(TimerId),
}

/*
 * Lines for the serial port. The text is what the operator at the other end
 * of the link sees.
 */
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    CameraActivated,
    VehicleLeft { dwell_millis: u32 },
    Snapshot,
    ExpectingTimeouts,
    Echo(LineBuffer),
    TimeoutsUpdated(TimeoutTable),
    Rejected(ReconfigError),
    StillReceiving,
    Resuming,
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Message::CameraActivated => write!(f, "Camera activated"),
            Message::VehicleLeft { dwell_millis } => {
                write!(f, "Vehicle left after {} milliseconds", dwell_millis)
            }
            Message::Snapshot => write!(f, "Snapshot taken"),
            Message::ExpectingTimeouts => write!(f, "Expecting new timeout values"),
            Message::Echo(line) => {
                write!(f, "New input: ")?;
                for byte in line.iter() {
                    write!(f, "{}", *byte as char)?;
                }
                Ok(())
            }
            Message::TimeoutsUpdated(table) => write!(f, "Updating timeout values: {}", table),
            Message::Rejected(err) => write!(f, "Invalid input: {}", err),
            Message::StillReceiving => write!(f, "Switch still high, receiving new timeouts"),
            Message::Resuming => write!(f, "Received. Unblocking"),
        }
    }
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct Effects {
    pub frame: Option<SignalFrame>,
    pub next_tick_millis: Option<u32>,
    pub mode_changed: Option<OperationMode>,
    pub timers: Vec<TimerCommand, MAX_TIMER_COMMANDS>,
    pub messages: Vec<Message, MAX_MESSAGES>,
}

impl Effects {
    pub fn new() -> Self {
        Effects::default()
    }

    pub fn timer(&mut self, command: TimerCommand) {
        if self.timers.push(command).is_err() {
            crate::log_warn!("effects: timer command dropped");
        }
    }

    pub fn say(&mut self, message: Message) {
        if self.messages.push(message).is_err() {
            crate::log_warn!("effects: message dropped");
        }
    }

    pub fn is_empty(&self) -> bool {
        self.frame.is_none()
            && self.next_tick_millis.is_none()
            && self.mode_changed.is_none()
            && self.timers.is_empty()
            && self.messages.is_empty()
    }
}
