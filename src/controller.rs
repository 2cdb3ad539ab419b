/*
 * The controller aggregate.
 *
 * All state that the tick, the button interrupts, the camera timers and the
 * serial link share lives in one `Controller`. Each event source has one
 * method, and each method returns the `Effects` it wants applied. The
 * firmware keeps the controller in a `SharedController`, which runs every
 * method inside a critical section, so no event handler ever sees another one
 * half way through.
 */

use core::cell::RefCell;

use embassy_sync::blocking_mutex::{Mutex, raw::CriticalSectionRawMutex};

use crate::camera::IntersectionTracker;
use crate::effects::Effects;
use crate::mode::{self, OperationMode};
use crate::pedestrian::PedestrianRequests;
use crate::reconfig::Reconfigurator;
use crate::timeouts::TimeoutTable;
use crate::trafficlight::interlock::CrossingInterlock;
use crate::trafficlight::{Approach, CyclePhase, SignalFrame, TrafficCycle};

// The switch bank as sampled by the caller.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Switches {
    pub mode_select: u8,
    pub reconfigure: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Button {
    EastWestPedestrian,
    NorthSouthPedestrian,
    Vehicle,
}

#[derive(Debug)]
pub struct Controller {
    mode: OperationMode,
    cycle: TrafficCycle,
    timeouts: TimeoutTable,
    requests: PedestrianRequests,
    camera: IntersectionTracker,
    reconfig: Reconfigurator,
    interlock: CrossingInterlock,
    // The last frame handed out, for the output writer to pick up.
    frame: SignalFrame,
}

impl Controller {
    pub const fn new() -> Self {
        Controller {
            mode: OperationMode::Simple,
            cycle: TrafficCycle::new(),
            timeouts: TimeoutTable::new(),
            requests: PedestrianRequests::new(),
            camera: IntersectionTracker::new(),
            reconfig: Reconfigurator::new(),
            interlock: CrossingInterlock::new(),
            frame: SignalFrame::all_red(),
        }
    }

    pub fn mode(&self) -> OperationMode {
        self.mode
    }

    pub fn phase(&self) -> CyclePhase {
        self.cycle.phase()
    }

    pub fn shown(&self) -> CyclePhase {
        self.cycle.shown()
    }

    pub fn timeouts(&self) -> &TimeoutTable {
        &self.timeouts
    }

    pub fn requests(&self) -> &PedestrianRequests {
        &self.requests
    }

    pub fn camera(&self) -> &IntersectionTracker {
        &self.camera
    }

    pub fn is_holding(&self) -> bool {
        self.reconfig.is_holding()
    }

    /*
     * What the lights should show right now. Frames also travel in `Effects`,
     * but effects from different handlers may be applied out of order; this
     * one always follows the order in which the handlers ran.
     */
    pub fn frame(&self) -> SignalFrame {
        self.frame
    }

    /*
     * One expiry of the periodic timer: pick the mode, maybe open a
     * reconfiguration session, render the upcoming phase and move on unless a
     * session holds the cycle. A held tick re-renders the same all-red phase
     * and leaves the mode alone, as if the timer had been stopped.
     */
    pub fn tick(&mut self, switches: Switches) -> Effects {
        let mut effects = Effects::new();
        let phase = self.cycle.phase();

        if !self.reconfig.is_holding() {
            let selected = mode::refresh(self.mode, phase, switches.mode_select);
            if selected != self.mode {
                self.change_mode(selected, &mut effects);
            }

            if self.mode.takes_reconfiguration() && phase.is_safe() && switches.reconfigure {
                self.reconfig.open(&mut effects);
            }
        }

        let frame = self.cycle.render(self.mode, &mut self.requests);
        effects.frame = Some(self.show(frame));
        effects.next_tick_millis = Some(self.timeouts.phase_time_millis(phase));

        self.cycle.advance(self.reconfig.is_holding());
        effects
    }

    pub fn button(&mut self, button: Button) -> Effects {
        match button {
            Button::EastWestPedestrian => self.pedestrian_request(Approach::EastWest),
            Button::NorthSouthPedestrian => self.pedestrian_request(Approach::NorthSouth),
            Button::Vehicle => self.vehicle_button(),
        }
    }

    pub fn pedestrian_request(&mut self, approach: Approach) -> Effects {
        let mut effects = Effects::new();
        if !self.mode.takes_pedestrians() {
            return effects;
        }
        if self.requests.request(approach, self.cycle.shown()) {
            // light the wait indicator straight away
            let frame = SignalFrame::compose(self.mode, self.cycle.shown(), &self.requests);
            effects.frame = Some(self.show(frame));
        }
        effects
    }

    pub fn vehicle_button(&mut self) -> Effects {
        let mut effects = Effects::new();
        if self.mode.has_camera() {
            self.camera.vehicle_edge(self.cycle.shown(), &mut effects);
        }
        effects
    }

    pub fn camera_timeout(&mut self) -> Effects {
        let mut effects = Effects::new();
        self.camera.camera_timeout(&mut effects);
        effects
    }

    pub fn dwell_tick(&mut self) -> Effects {
        let mut effects = Effects::new();
        self.camera.dwell_tick(&mut effects);
        effects
    }

    pub fn serial_input(&mut self, byte: u8, switches: Switches) -> Effects {
        let mut effects = Effects::new();
        if self.reconfig.is_holding() && !self.cycle.phase().is_safe() {
            // cannot happen: sessions only open in, and hold, an all-red phase
            crate::log_error!("reconfig: session open in phase {}", self.cycle.phase());
            return effects;
        }
        self.reconfig
            .feed(byte, switches.reconfigure, &mut self.timeouts, &mut effects);
        effects
    }

    fn show(&mut self, frame: SignalFrame) -> SignalFrame {
        self.frame = self.interlock.admit(frame);
        self.frame
    }

    fn change_mode(&mut self, mode: OperationMode, effects: &mut Effects) {
        crate::log_info!("mode: {} -> {}", self.mode, mode);
        self.requests.clear_all();
        if !mode.has_camera() {
            self.camera.reset(effects);
        }
        self.mode = mode;
        effects.mode_changed = Some(mode);
    }
}

impl Default for Controller {
    fn default() -> Self {
        Controller::new()
    }
}

/*
 * The controller as the interrupt-driven tasks see it. `lock` runs the
 * closure inside a critical section.
 */
pub struct SharedController {
    inner: Mutex<CriticalSectionRawMutex, RefCell<Controller>>,
}

impl SharedController {
    pub const fn new() -> Self {
        SharedController {
            inner: Mutex::new(RefCell::new(Controller::new())),
        }
    }

    pub fn lock<R>(&self, f: impl FnOnce(&mut Controller) -> R) -> R {
        self.inner.lock(|cell| f(&mut *cell.borrow_mut()))
    }
}

impl Default for SharedController {
    fn default() -> Self {
        SharedController::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::effects::{Message, TimerCommand, TimerId};
    use crate::trafficlight::Colour;

    const MODE_1: u8 = 0b0001;
    const MODE_2: u8 = 0b0010;
    const MODE_3: u8 = 0b0100;
    const MODE_4: u8 = 0b1000;

    fn mode(bits: u8) -> Switches {
        Switches {
            mode_select: bits,
            reconfigure: false,
        }
    }

    fn reconfiguring(bits: u8) -> Switches {
        Switches {
            mode_select: bits,
            reconfigure: true,
        }
    }

    fn ticks_until(controller: &mut Controller, switches: Switches, phase: CyclePhase) {
        for _ in 0..6 {
            if controller.phase() == phase {
                return;
            }
            controller.tick(switches);
        }
        panic!("never reached phase {}", phase);
    }

    fn feed(controller: &mut Controller, line: &[u8], switches: Switches) -> Vec<Message> {
        let mut messages = Vec::new();
        for byte in line {
            messages.extend(controller.serial_input(*byte, switches).messages);
        }
        messages
    }

    #[test]
    fn test_phase_advances_once_per_tick() {
        let mut controller = Controller::new();
        for i in 0..13 {
            assert_eq!(controller.phase().index(), i % 6);
            let effects = controller.tick(mode(MODE_1));
            assert!(effects.frame.is_some());
        }
    }

    #[test]
    fn test_next_tick_uses_rendered_phase_timeout() {
        let mut controller = Controller::new();
        let durations: Vec<u32> = (0..6)
            .map(|_| controller.tick(mode(MODE_1)).next_tick_millis.unwrap())
            .collect();
        assert_eq!(durations, vec![500, 6000, 2000, 500, 6000, 2000]);
    }

    #[test]
    fn test_lights_never_both_non_red() {
        let mut controller = Controller::new();
        for i in 0..60 {
            let bits = [MODE_1, MODE_2, MODE_3, MODE_4][i % 4];
            if i % 3 == 0 {
                controller.button(Button::NorthSouthPedestrian);
                controller.button(Button::EastWestPedestrian);
                controller.button(Button::Vehicle);
            }
            let frame = controller.tick(mode(bits)).frame.unwrap();
            assert!(
                frame.north_south.colour == Colour::Red || frame.east_west.colour == Colour::Red
            );
        }
    }

    #[test]
    fn test_mode_change_waits_for_safe_phase() {
        let mut controller = Controller::new();
        controller.tick(mode(MODE_1));
        assert_eq!(controller.phase(), CyclePhase::NorthSouthGo);

        let effects = controller.tick(mode(MODE_2));
        assert_eq!(effects.mode_changed, None);
        assert_eq!(controller.mode(), OperationMode::Simple);
        let effects = controller.tick(mode(MODE_2));
        assert_eq!(effects.mode_changed, None);

        assert_eq!(controller.phase(), CyclePhase::ClearBeforeEastWest);
        let effects = controller.tick(mode(MODE_2));
        assert_eq!(effects.mode_changed, Some(OperationMode::Pedestrian));
        assert_eq!(controller.mode(), OperationMode::Pedestrian);
    }

    #[test]
    fn test_mode_change_clears_requests() {
        let mut controller = Controller::new();
        controller.tick(mode(MODE_2));
        controller.button(Button::EastWestPedestrian);
        assert!(controller.requests().is_pending(Approach::EastWest));

        ticks_until(&mut controller, mode(MODE_2), CyclePhase::ClearBeforeEastWest);
        controller.tick(mode(MODE_3));
        assert_eq!(controller.mode(), OperationMode::Configurable);
        assert!(!controller.requests().is_pending(Approach::EastWest));
    }

    #[test]
    fn test_pedestrian_gating_by_shown_phase() {
        let mut controller = Controller::new();
        controller.tick(mode(MODE_2));
        // lights show phase 0, the next tick renders north-south green
        assert_eq!(controller.phase().index(), 1);
        let effects = controller.button(Button::NorthSouthPedestrian);
        assert!(controller.requests().is_pending(Approach::NorthSouth));
        assert!(effects.frame.unwrap().north_south.wait);

        let frame = controller.tick(mode(MODE_2)).frame.unwrap();
        assert!(frame.north_south.walk);

        // lights show north-south green now: already being served
        assert_eq!(controller.phase().index(), 2);
        controller.requests.clear(Approach::NorthSouth);
        let effects = controller.button(Button::NorthSouthPedestrian);
        assert!(effects.frame.is_none());
        assert!(!controller.requests().is_pending(Approach::NorthSouth));
    }

    #[test]
    fn test_pedestrian_request_cleared_once_at_yellow() {
        let mut controller = Controller::new();
        controller.tick(mode(MODE_2));
        controller.button(Button::NorthSouthPedestrian);

        controller.tick(mode(MODE_2));
        assert!(controller.requests().is_pending(Approach::NorthSouth));
        let frame = controller.tick(mode(MODE_2)).frame.unwrap();
        assert_eq!(frame.north_south.colour, Colour::Yellow);
        assert!(frame.north_south.walk);
        assert!(!controller.requests().is_pending(Approach::NorthSouth));

        for _ in 0..3 {
            let frame = controller.tick(mode(MODE_2)).frame.unwrap();
            assert!(!frame.north_south.walk);
        }
    }

    #[test]
    fn test_simple_mode_ignores_buttons() {
        let mut controller = Controller::new();
        controller.tick(mode(MODE_1));
        assert!(controller.button(Button::NorthSouthPedestrian).is_empty());
        assert!(controller.button(Button::Vehicle).is_empty());
        assert!(!controller.requests().is_pending(Approach::NorthSouth));
    }

    #[test]
    fn test_reconfiguration_replaces_table() {
        let mut controller = Controller::new();
        controller.tick(mode(MODE_3));
        ticks_until(&mut controller, mode(MODE_3), CyclePhase::ClearBeforeEastWest);

        let effects = controller.tick(reconfiguring(MODE_3));
        assert!(controller.is_holding());
        assert!(effects.messages.contains(&Message::ExpectingTimeouts));
        assert_eq!(controller.phase(), CyclePhase::ClearBeforeEastWest);

        let messages = feed(&mut controller, b"100,200,300,400,500,600\n", mode(MODE_3));
        assert_eq!(controller.timeouts().as_millis(), &[100, 200, 300, 400, 500, 600]);
        assert!(messages.contains(&Message::Resuming));
        assert!(!controller.is_holding());

        let effects = controller.tick(mode(MODE_3));
        assert_eq!(effects.next_tick_millis, Some(400));
        assert_eq!(controller.phase(), CyclePhase::EastWestGo);
    }

    #[test]
    fn test_rejected_lines_leave_table() {
        let mut controller = Controller::new();
        controller.tick(reconfiguring(MODE_4));
        assert!(controller.is_holding());

        let messages = feed(&mut controller, b"100,200,300\n", reconfiguring(MODE_4));
        assert!(matches!(messages.last(), Some(Message::Rejected(_))));
        let messages = feed(&mut controller, b"10000,1,1,1,1,1\n", reconfiguring(MODE_4));
        assert!(matches!(messages.last(), Some(Message::Rejected(_))));

        assert_eq!(controller.timeouts(), &TimeoutTable::new());
        assert!(controller.is_holding());
    }

    #[test]
    fn test_held_ticks_are_idempotent() {
        let mut controller = Controller::new();
        controller.tick(reconfiguring(MODE_3));
        let phase = controller.phase();
        let table = *controller.timeouts();

        for i in 0..20 {
            let bits = [MODE_1, MODE_2, MODE_3, MODE_4][i % 4];
            let effects = controller.tick(reconfiguring(bits));
            assert_eq!(effects.mode_changed, None);
            assert_eq!(effects.frame, Some(SignalFrame::all_red()));
        }
        assert_eq!(controller.phase(), phase);
        assert_eq!(controller.timeouts(), &table);
        assert_eq!(controller.mode(), OperationMode::Configurable);
    }

    #[test]
    fn test_reconfigure_switch_ignored_outside_clearance_phases() {
        let mut controller = Controller::new();
        controller.tick(mode(MODE_3));

        for bits in [MODE_3, MODE_3, MODE_4, MODE_4, MODE_4] {
            let phase = controller.phase();
            if phase.is_safe() {
                // change modes where that is allowed, without the switch
                controller.tick(mode(bits));
                continue;
            }
            assert!(controller.mode().takes_reconfiguration());

            let effects = controller.tick(reconfiguring(bits));
            assert!(!controller.is_holding(), "held in phase {}", phase);
            assert!(!effects.messages.contains(&Message::ExpectingTimeouts));
            assert_eq!(controller.phase(), phase.next());

            let messages = feed(&mut controller, b"1,2,3,4,5,6\n", reconfiguring(bits));
            assert!(messages.is_empty());
            assert_eq!(controller.timeouts(), &TimeoutTable::new());
        }
        assert_eq!(controller.mode(), OperationMode::Camera);
        assert_eq!(controller.phase(), CyclePhase::ClearBeforeNorthSouth);
    }

    #[test]
    fn test_frame_follows_handler_order() {
        let mut controller = Controller::new();
        assert_eq!(controller.frame(), SignalFrame::all_red());

        let tick = controller.tick(mode(MODE_2));
        assert_eq!(tick.frame, Some(controller.frame()));

        let press = controller.button(Button::NorthSouthPedestrian);
        assert_ne!(press.frame, tick.frame);
        // the tick's frame is older; the controller keeps the newer one
        assert_eq!(press.frame, Some(controller.frame()));
        assert!(controller.frame().north_south.wait);

        // a rejected press leaves the frame alone
        controller.tick(mode(MODE_2));
        let shown = controller.frame();
        controller.button(Button::NorthSouthPedestrian);
        assert_eq!(controller.frame(), shown);
    }

    #[test]
    fn test_no_reconfiguration_in_pedestrian_mode() {
        let mut controller = Controller::new();
        controller.tick(reconfiguring(MODE_2));
        assert!(!controller.is_holding());
        assert_eq!(controller.phase(), CyclePhase::NorthSouthGo);

        feed(&mut controller, b"1,2,3,4,5,6\n", reconfiguring(MODE_2));
        assert_eq!(controller.timeouts(), &TimeoutTable::new());
    }

    #[test]
    fn test_camera_session_dwell() {
        let mut controller = Controller::new();
        controller.tick(mode(MODE_4));
        assert_eq!(controller.shown(), CyclePhase::ClearBeforeNorthSouth);

        let effects = controller.button(Button::Vehicle);
        assert!(effects.timers.contains(&TimerCommand::Start(TimerId::Dwell)));
        for _ in 0..250 {
            controller.dwell_tick();
        }

        ticks_until(&mut controller, mode(MODE_4), CyclePhase::EastWestGo);
        assert_eq!(controller.shown(), CyclePhase::ClearBeforeEastWest);
        let effects = controller.button(Button::Vehicle);
        assert_eq!(
            effects.messages.as_slice(),
            &[Message::VehicleLeft { dwell_millis: 250 }]
        );
    }

    #[test]
    fn test_camera_watchdog() {
        let mut controller = Controller::new();
        controller.tick(mode(MODE_4));
        controller.button(Button::Vehicle);

        let effects = controller.camera_timeout();
        let snapshots = effects
            .messages
            .iter()
            .filter(|message| **message == Message::Snapshot)
            .count();
        assert_eq!(snapshots, 1);
        assert!(controller.camera().session().is_none());
        assert!(controller.camera_timeout().messages.is_empty());
    }

    #[test]
    fn test_leaving_camera_mode_ends_session() {
        let mut controller = Controller::new();
        controller.tick(mode(MODE_4));
        controller.button(Button::Vehicle);
        assert!(controller.camera().session().is_some());

        ticks_until(&mut controller, mode(MODE_4), CyclePhase::ClearBeforeEastWest);
        let effects = controller.tick(mode(MODE_3));
        assert!(effects.timers.contains(&TimerCommand::Stop(TimerId::Camera)));
        assert!(controller.camera().session().is_none());
        assert!(controller.button(Button::Vehicle).is_empty());
    }

    #[test]
    fn test_shared_controller_lock() {
        let shared = SharedController::new();
        shared.lock(|controller| controller.tick(mode(MODE_2)));
        let phase = shared.lock(|controller| controller.phase());
        assert_eq!(phase, CyclePhase::NorthSouthGo);
    }
}
