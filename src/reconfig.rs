/*
 * The timeout reconfiguration protocol.
 *
 * In the configurable modes an operator can replace the six phase timeouts
 * over the serial link. Raising the reconfigure switch while the crossing is
 * all red opens a session. While the session is open the cycle is held in
 * that all-red phase, and the operator types a line like
 *
 *     500,6000,2000,500,6000,2000
 *
 * ended by CR or LF. A good line replaces the whole timeout table. A bad line
 * is reported and dropped, and the operator can simply try again. The session
 * ends, and the cycle moves on, after a good line has been taken with the
 * switch back down. A line that overruns the buffer drops the session
 * altogether; the next tick opens a new one if the switch is still up.
 */

use heapless::Vec;

use crate::config::{LINE_CAPACITY, TIMEOUT_COUNT};
use crate::effects::{Effects, Message};
use crate::error::{ReconfigError, Result};
use crate::timeouts::TimeoutTable;

pub type LineBuffer = Vec<u8, LINE_CAPACITY>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SessionState {
    Idle,
    Receiving,
}

#[derive(Debug)]
pub struct Reconfigurator {
    state: SessionState,
    line: LineBuffer,
}

impl Reconfigurator {
    pub const fn new() -> Self {
        Reconfigurator {
            state: SessionState::Idle,
            line: Vec::new(),
        }
    }

    // While a session is open the traffic cycle must not advance.
    pub fn is_holding(&self) -> bool {
        self.state == SessionState::Receiving
    }

    pub fn open(&mut self, effects: &mut Effects) {
        if self.is_holding() {
            return;
        }
        crate::log_info!("reconfig: session open, holding the cycle");
        self.line.clear();
        self.state = SessionState::Receiving;
        effects.say(Message::ExpectingTimeouts);
    }

    // Feed one byte from the serial link. `switch_up` is the reconfigure
    // switch as it reads right now.
    pub fn feed(
        &mut self,
        byte: u8,
        switch_up: bool,
        table: &mut TimeoutTable,
        effects: &mut Effects,
    ) {
        if !self.is_holding() {
            crate::log_trace!("reconfig: ignoring byte {} outside a session", byte);
            return;
        }

        match byte {
            b'\r' | b'\n' => {
                if self.line.is_empty() {
                    return;
                }
                let result = parse_timeouts(&self.line);
                self.line.clear();
                match result {
                    Ok(new_table) => self.apply(new_table, switch_up, table, effects),
                    Err(err) => {
                        crate::log_warn!("reconfig: rejected line: {}", err);
                        effects.say(Message::Rejected(err));
                    }
                }
            }
            _ => {
                if self.line.push(byte).is_err() {
                    crate::log_warn!("reconfig: {}, dropping session", ReconfigError::Overflow);
                    self.line.clear();
                    self.state = SessionState::Idle;
                    return;
                }
                effects.say(Message::Echo(self.line.clone()));
            }
        }
    }

    fn apply(
        &mut self,
        new_table: TimeoutTable,
        switch_up: bool,
        table: &mut TimeoutTable,
        effects: &mut Effects,
    ) {
        *table = new_table;
        crate::log_info!("reconfig: timeouts now {}", new_table);
        effects.say(Message::TimeoutsUpdated(new_table));

        if switch_up {
            effects.say(Message::StillReceiving);
        } else {
            self.state = SessionState::Idle;
            effects.say(Message::Resuming);
        }
    }
}

impl Default for Reconfigurator {
    fn default() -> Self {
        Reconfigurator::new()
    }
}

/*
 * Numbers are read the way C's `atoi` reads them: optional leading blanks and
 * sign, then digits up to the first non-digit. A token without digits reads
 * as 0, which the range check then rejects. Empty tokens between commas are
 * skipped.
 */
fn atoi(token: &[u8]) -> i32 {
    let mut rest = token.iter().copied().skip_while(|b| b.is_ascii_whitespace()).peekable();
    let negative = match rest.peek() {
        Some(b'-') => {
            rest.next();
            true
        }
        Some(b'+') => {
            rest.next();
            false
        }
        _ => false,
    };

    let mut value: i32 = 0;
    for digit in rest.take_while(|b| b.is_ascii_digit()) {
        value = value.saturating_mul(10).saturating_add((digit - b'0') as i32);
    }
    if negative { -value } else { value }
}

// Parse a full line of comma separated timeouts.
pub fn parse_timeouts(line: &[u8]) -> Result<TimeoutTable> {
    let mut values = [0i32; TIMEOUT_COUNT];
    let mut count = 0;

    for token in line.split(|b| *b == b',').filter(|token| !token.is_empty()) {
        if count >= TIMEOUT_COUNT {
            return Err(ReconfigError::TooManyValues);
        }
        values[count] = atoi(token);
        count += 1;
    }

    if count < TIMEOUT_COUNT {
        // a bad value ahead of the short count is the more useful report
        if let Some(value) = values[..count].iter().find(|value| **value <= 0) {
            return Err(ReconfigError::OutOfRange { value: *value });
        }
        return Err(ReconfigError::TooFewValues { count });
    }
    TimeoutTable::from_millis(values)
}
