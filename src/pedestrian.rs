/*
 * Pedestrian crossing requests, one per approach.
 *
 * A request is only taken while its approach is red: if the approach already
 * shows green or yellow the pedestrian is being served and the button press is
 * dropped. The traffic cycle consumes a request when it renders the yellow of
 * that approach.
 */

use crate::trafficlight::{Approach, CyclePhase};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PedestrianRequests {
    north_south: bool,
    east_west: bool,
}

impl PedestrianRequests {
    pub const fn new() -> Self {
        PedestrianRequests {
            north_south: false,
            east_west: false,
        }
    }

    // Record a request, given the phase the lights show right now. Returns
    // whether the request was taken.
    pub fn request(&mut self, approach: Approach, shown: CyclePhase) -> bool {
        if approach.is_served_in(shown) {
            return false;
        }
        *self.flag(approach) = true;
        true
    }

    pub fn is_pending(&self, approach: Approach) -> bool {
        match approach {
            Approach::NorthSouth => self.north_south,
            Approach::EastWest => self.east_west,
        }
    }

    pub fn clear(&mut self, approach: Approach) {
        *self.flag(approach) = false;
    }

    pub fn clear_all(&mut self) {
        *self = PedestrianRequests::new();
    }

    fn flag(&mut self, approach: Approach) -> &mut bool {
        match approach {
            Approach::NorthSouth => &mut self.north_south,
            Approach::EastWest => &mut self.east_west,
        }
    }
}
