/*
 * Intersection camera (mode 4)
 *
 * A single button stands in for a vehicle sensor at the stop line.
 * Successive presses alternate between "a vehicle enters" and "the vehicle
 * leaves". A vehicle that enters while the crossing is all red opens a
 * session: a watchdog timer starts, and a 1 ms counter measures how long the
 * vehicle stays. A clean exit reports that dwell time. A vehicle still in the
 * intersection when the watchdog fires, or one entering while an approach has
 * green, gets photographed.
 */

use crate::effects::{Effects, Message, TimerCommand, TimerId};
use crate::trafficlight::CyclePhase;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Edge {
    Entering,
    Exiting,
}

impl Edge {
    fn flip(self) -> Self {
        match self {
            Edge::Entering => Edge::Exiting,
            Edge::Exiting => Edge::Entering,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Session {
    pub dwell_millis: u32,
}

#[derive(Debug)]
pub struct IntersectionTracker {
    // How the next button press is read.
    next_edge: Edge,
    session: Option<Session>,
}

impl IntersectionTracker {
    pub const fn new() -> Self {
        IntersectionTracker {
            next_edge: Edge::Entering,
            session: None,
        }
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    pub fn next_edge(&self) -> Edge {
        self.next_edge
    }

    // Handle a vehicle button press while the lights show `shown`.
    pub fn vehicle_edge(&mut self, shown: CyclePhase, effects: &mut Effects) {
        let edge = self.next_edge;
        self.next_edge = edge.flip();

        match shown {
            CyclePhase::ClearBeforeNorthSouth | CyclePhase::ClearBeforeEastWest => {
                match (edge, self.session.is_some()) {
                    (Edge::Entering, false) => self.start(effects),
                    (Edge::Exiting, true) => self.finish(effects),
                    (Edge::Entering, true) | (Edge::Exiting, false) => {}
                }
            }
            CyclePhase::NorthSouthGo | CyclePhase::EastWestGo => match edge {
                // Something entered on a green; keep the evidence and drop the
                // session, it can no longer end cleanly.
                Edge::Entering => {
                    crate::log_info!("camera: vehicle in intersection during phase {}", shown);
                    effects.say(Message::Snapshot);
                    effects.timer(TimerCommand::Stop(TimerId::Dwell));
                    self.session = None;
                    self.next_edge = Edge::Entering;
                }
                Edge::Exiting => {
                    if self.session.is_some() {
                        self.finish(effects);
                    }
                }
            },
            CyclePhase::NorthSouthYield | CyclePhase::EastWestYield => {
                self.next_edge = Edge::Entering;
            }
        }
    }

    // One period of the dwell timer.
    pub fn dwell_tick(&mut self, effects: &mut Effects) {
        match self.session.as_mut() {
            Some(session) => session.dwell_millis = session.dwell_millis.saturating_add(1),
            None => {
                crate::log_debug!("camera: stale dwell tick");
                effects.timer(TimerCommand::Stop(TimerId::Dwell));
            }
        }
    }

    // The watchdog fired: the vehicle has overstayed.
    pub fn camera_timeout(&mut self, effects: &mut Effects) {
        if self.session.take().is_none() {
            crate::log_debug!("camera: watchdog fired without a session");
            return;
        }
        crate::log_info!("camera: watchdog expired, vehicle overstayed");
        effects.say(Message::Snapshot);
        effects.timer(TimerCommand::Stop(TimerId::Dwell));
        self.next_edge = Edge::Entering;
    }

    // Drop any session without reporting it, e.g. when leaving camera mode.
    pub fn reset(&mut self, effects: &mut Effects) {
        if self.session.take().is_some() {
            effects.timer(TimerCommand::Stop(TimerId::Camera));
            effects.timer(TimerCommand::Stop(TimerId::Dwell));
        }
        self.next_edge = Edge::Entering;
    }

    fn start(&mut self, effects: &mut Effects) {
        self.session = Some(Session { dwell_millis: 0 });
        effects.timer(TimerCommand::Start(TimerId::Camera));
        effects.timer(TimerCommand::Start(TimerId::Dwell));
        effects.say(Message::CameraActivated);
    }

    fn finish(&mut self, effects: &mut Effects) {
        let Some(session) = self.session.take() else {
            return;
        };
        effects.timer(TimerCommand::Stop(TimerId::Camera));
        effects.timer(TimerCommand::Stop(TimerId::Dwell));
        effects.say(Message::VehicleLeft {
            dwell_millis: session.dwell_millis,
        });
    }
}

impl Default for IntersectionTracker {
    fn default() -> Self {
        IntersectionTracker::new()
    }
}
