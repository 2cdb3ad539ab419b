pub mod interlock;

use core::fmt;

use enum_ordinalize::Ordinalize;

use crate::mode::OperationMode;
use crate::pedestrian::PedestrianRequests;

#[derive(Ordinalize, Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(usize)]
pub enum CyclePhase {
    ClearBeforeNorthSouth,
    NorthSouthGo,
    NorthSouthYield,
    ClearBeforeEastWest,
    EastWestGo,
    EastWestYield,
}

impl CyclePhase {
    pub fn index(self) -> usize {
        self.ordinal()
    }

    /*
     * Phase indices only come from our own arithmetic, but a bad index must
     * never turn into a half-defined light pattern. Anything out of range lands
     * on the first all-red phase.
     */
    pub fn from_index(index: usize) -> Self {
        match CyclePhase::from_ordinal(index) {
            Some(phase) => phase,
            None => {
                crate::log_warn!("phase index {} out of range, clamping to 0", index);
                CyclePhase::ClearBeforeNorthSouth
            }
        }
    }

    // phase' = (phase + 1) mod 6
    pub fn next(self) -> Self {
        CyclePhase::from_index((self.index() + 1) % CyclePhase::VARIANT_COUNT)
    }

    // Both approaches red: the only phases in which the controller may be
    // reconfigured.
    pub fn is_safe(self) -> bool {
        match self {
            CyclePhase::ClearBeforeNorthSouth | CyclePhase::ClearBeforeEastWest => true,
            CyclePhase::NorthSouthGo
            | CyclePhase::NorthSouthYield
            | CyclePhase::EastWestGo
            | CyclePhase::EastWestYield => false,
        }
    }

    pub fn colour(self, approach: Approach) -> Colour {
        match (self, approach) {
            (CyclePhase::NorthSouthGo, Approach::NorthSouth) => Colour::Green,
            (CyclePhase::NorthSouthYield, Approach::NorthSouth) => Colour::Yellow,
            (CyclePhase::EastWestGo, Approach::EastWest) => Colour::Green,
            (CyclePhase::EastWestYield, Approach::EastWest) => Colour::Yellow,
            (CyclePhase::ClearBeforeNorthSouth | CyclePhase::ClearBeforeEastWest, _)
            | (CyclePhase::NorthSouthGo | CyclePhase::NorthSouthYield, Approach::EastWest)
            | (CyclePhase::EastWestGo | CyclePhase::EastWestYield, Approach::NorthSouth) => {
                Colour::Red
            }
        }
    }
}

impl fmt::Display for CyclePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.index())
    }
}

#[derive(Debug, PartialEq, Eq, Copy, Clone)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Approach {
    NorthSouth,
    EastWest,
}

impl Approach {
    pub fn go_phase(self) -> CyclePhase {
        match self {
            Approach::NorthSouth => CyclePhase::NorthSouthGo,
            Approach::EastWest => CyclePhase::EastWestGo,
        }
    }

    pub fn yield_phase(self) -> CyclePhase {
        match self {
            Approach::NorthSouth => CyclePhase::NorthSouthYield,
            Approach::EastWest => CyclePhase::EastWestYield,
        }
    }

    // True while this approach shows green or yellow.
    pub fn is_served_in(self, phase: CyclePhase) -> bool {
        phase == self.go_phase() || phase == self.yield_phase()
    }
}

#[derive(Debug, PartialEq, Eq, Copy, Clone)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Colour {
    Red,
    Yellow,
    Green,
}

/*
 * What one approach shows: the vehicle light, plus the two pedestrian
 * indicators. `walk` is lit while a pedestrian request is being served and
 * `wait` while one is pending.
 */
#[derive(Debug, PartialEq, Eq, Copy, Clone)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Aspect {
    pub approach: Approach,
    pub colour: Colour,
    pub walk: bool,
    pub wait: bool,
}

impl Aspect {
    pub const fn red(approach: Approach) -> Self {
        Aspect {
            approach,
            colour: Colour::Red,
            walk: false,
            wait: false,
        }
    }
}

#[derive(Debug, PartialEq, Eq, Copy, Clone)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SignalFrame {
    pub north_south: Aspect,
    pub east_west: Aspect,
}

impl SignalFrame {
    pub const fn all_red() -> Self {
        SignalFrame {
            north_south: Aspect::red(Approach::NorthSouth),
            east_west: Aspect::red(Approach::EastWest),
        }
    }

    pub fn aspect(&self, approach: Approach) -> &Aspect {
        match approach {
            Approach::NorthSouth => &self.north_south,
            Approach::EastWest => &self.east_west,
        }
    }

    /*
     * The pattern for a phase. Pedestrian indicators only exist in the modes
     * that take pedestrian requests; in `Simple` both approaches show plain
     * lights whatever the flags say.
     */
    pub fn compose(mode: OperationMode, phase: CyclePhase, requests: &PedestrianRequests) -> Self {
        let aspect = |approach: Approach| {
            let pending = mode.takes_pedestrians() && requests.is_pending(approach);
            let served = approach.is_served_in(phase);
            Aspect {
                approach,
                colour: phase.colour(approach),
                walk: pending && served,
                wait: pending && !served,
            }
        };

        SignalFrame {
            north_south: aspect(Approach::NorthSouth),
            east_west: aspect(Approach::EastWest),
        }
    }
}

/*
 * The traffic cycle engine. `phase` is the phase the next tick will render and
 * `shown` the one the lights display right now. They are equal only before the
 * first tick and while a reconfiguration hold keeps the cycle in place.
 */
#[derive(Debug)]
pub struct TrafficCycle {
    phase: CyclePhase,
    shown: CyclePhase,
}

impl TrafficCycle {
    pub const fn new() -> Self {
        TrafficCycle {
            phase: CyclePhase::ClearBeforeNorthSouth,
            shown: CyclePhase::ClearBeforeNorthSouth,
        }
    }

    pub fn phase(&self) -> CyclePhase {
        self.phase
    }

    pub fn shown(&self) -> CyclePhase {
        self.shown
    }

    /*
     * Render the upcoming phase. A pending request is served across the green
     * and yellow of its approach, and consumed when the yellow is rendered.
     */
    pub fn render(&mut self, mode: OperationMode, requests: &mut PedestrianRequests) -> SignalFrame {
        let frame = SignalFrame::compose(mode, self.phase, requests);

        for approach in [Approach::NorthSouth, Approach::EastWest] {
            if self.phase == approach.yield_phase() {
                requests.clear(approach);
            }
        }

        self.shown = self.phase;
        frame
    }

    pub fn advance(&mut self, hold: bool) {
        if !hold {
            self.phase = self.phase.next();
        }
    }
}

impl Default for TrafficCycle {
    fn default() -> Self {
        TrafficCycle::new()
    }
}
