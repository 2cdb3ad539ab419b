/*
 * Operating modes and the mode selector.
 *
 * The four modes stack: every mode runs the same cycle, and each one switches
 * on one more extension. The selector reads the four mode switches once per
 * tick, but only acts on them while the crossing is all red.
 */

use core::fmt;

use crate::trafficlight::CyclePhase;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum OperationMode {
    Simple,
    Pedestrian,
    Configurable,
    Camera,
}

impl OperationMode {
    pub fn number(self) -> u8 {
        match self {
            OperationMode::Simple => 1,
            OperationMode::Pedestrian => 2,
            OperationMode::Configurable => 3,
            OperationMode::Camera => 4,
        }
    }

    /*
     * Bit 0 selects mode 1 up to bit 3 for mode 4. The switches are meant to
     * be one-hot; when more than one is up the lowest mode wins.
     */
    pub fn from_switches(bits: u8) -> Option<Self> {
        if bits & (1 << 0) != 0 {
            Some(OperationMode::Simple)
        } else if bits & (1 << 1) != 0 {
            Some(OperationMode::Pedestrian)
        } else if bits & (1 << 2) != 0 {
            Some(OperationMode::Configurable)
        } else if bits & (1 << 3) != 0 {
            Some(OperationMode::Camera)
        } else {
            None
        }
    }

    pub fn takes_pedestrians(self) -> bool {
        match self {
            OperationMode::Simple => false,
            OperationMode::Pedestrian | OperationMode::Configurable | OperationMode::Camera => {
                true
            }
        }
    }

    pub fn takes_reconfiguration(self) -> bool {
        match self {
            OperationMode::Configurable | OperationMode::Camera => true,
            OperationMode::Simple | OperationMode::Pedestrian => false,
        }
    }

    pub fn has_camera(self) -> bool {
        self == OperationMode::Camera
    }
}

impl fmt::Display for OperationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.number())
    }
}

/*
 * The mode to run during the upcoming phase.
 *
 * Outside the all-red phases the switches are ignored, so a mode change
 * never lands in the middle of a green or yellow. No switch up keeps the
 * current mode.
 */
pub fn refresh(current: OperationMode, phase: CyclePhase, switch_bits: u8) -> OperationMode {
    if !phase.is_safe() {
        return current;
    }
    OperationMode::from_switches(switch_bits).unwrap_or(current)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_one_hot_switches() {
        assert_eq!(OperationMode::from_switches(0b0001), Some(OperationMode::Simple));
        assert_eq!(OperationMode::from_switches(0b0010), Some(OperationMode::Pedestrian));
        assert_eq!(OperationMode::from_switches(0b0100), Some(OperationMode::Configurable));
        assert_eq!(OperationMode::from_switches(0b1000), Some(OperationMode::Camera));
        assert_eq!(OperationMode::from_switches(0), None);
    }

    #[test]
    fn test_lowest_mode_wins() {
        assert_eq!(OperationMode::from_switches(0b1010), Some(OperationMode::Pedestrian));
        assert_eq!(OperationMode::from_switches(0b1111), Some(OperationMode::Simple));
        assert_eq!(OperationMode::from_switches(0b1100), Some(OperationMode::Configurable));
    }

    #[test]
    fn test_refresh_ignored_outside_safe_phase() {
        for phase in [
            CyclePhase::NorthSouthGo,
            CyclePhase::NorthSouthYield,
            CyclePhase::EastWestGo,
            CyclePhase::EastWestYield,
        ] {
            assert_eq!(
                refresh(OperationMode::Simple, phase, 0b1000),
                OperationMode::Simple
            );
        }
    }

    #[test]
    fn test_refresh_in_safe_phase() {
        assert_eq!(
            refresh(OperationMode::Simple, CyclePhase::ClearBeforeEastWest, 0b1000),
            OperationMode::Camera
        );
        assert_eq!(
            refresh(OperationMode::Camera, CyclePhase::ClearBeforeNorthSouth, 0),
            OperationMode::Camera
        );
    }

    #[test]
    fn test_extensions_per_mode() {
        assert!(!OperationMode::Simple.takes_pedestrians());
        assert!(OperationMode::Pedestrian.takes_pedestrians());
        assert!(!OperationMode::Pedestrian.takes_reconfiguration());
        assert!(OperationMode::Configurable.takes_reconfiguration());
        assert!(OperationMode::Camera.takes_reconfiguration());
        assert!(OperationMode::Camera.has_camera());
        assert!(!OperationMode::Configurable.has_camera());
    }
}
