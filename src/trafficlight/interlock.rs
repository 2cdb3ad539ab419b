/*
 * Mutual exclusion on the crossing.
 *
 * Only one approach may hold the crossing at a time. An approach takes the
 * permit when its light leaves red and gives it back when the light returns
 * to red. The permit can only change hands through a frame in which both
 * approaches are red, which is exactly the clearance phase of the cycle.
 *
 * The cycle tables never ask for anything else, so this is a check rather than
 * a scheduler: a frame that would break the rule is replaced by all red.
 */

use super::{Approach, Colour, SignalFrame};

#[derive(Debug, Default)]
pub struct CrossingInterlock {
    holder: Option<Approach>,
}

fn wants_permit(frame: &SignalFrame) -> Result<Option<Approach>, ()> {
    match (frame.north_south.colour, frame.east_west.colour) {
        (Colour::Red, Colour::Red) => Ok(None),
        (_, Colour::Red) => Ok(Some(Approach::NorthSouth)),
        (Colour::Red, _) => Ok(Some(Approach::EastWest)),
        (_, _) => Err(()),
    }
}

impl CrossingInterlock {
    pub const fn new() -> Self {
        CrossingInterlock { holder: None }
    }

    pub fn holder(&self) -> Option<Approach> {
        self.holder
    }

    pub fn admit(&mut self, frame: SignalFrame) -> SignalFrame {
        match (self.holder, wants_permit(&frame)) {
            (_, Ok(None)) => {
                self.release_permit();
                frame
            }
            (None, Ok(Some(approach))) => {
                self.holder = Some(approach);
                frame
            }
            (Some(holder), Ok(Some(approach))) if holder == approach => frame,
            (Some(holder), Ok(Some(approach))) => {
                crate::log_error!(
                    "interlock: {} asked for the crossing while {} holds it",
                    approach_name(approach),
                    approach_name(holder)
                );
                self.release_permit();
                SignalFrame::all_red()
            }
            (_, Err(())) => {
                crate::log_error!("interlock: both approaches non-red, forcing all red");
                self.release_permit();
                SignalFrame::all_red()
            }
        }
    }

    fn release_permit(&mut self) {
        self.holder = None;
    }
}

fn approach_name(approach: Approach) -> &'static str {
    match approach {
        Approach::NorthSouth => "north-south",
        Approach::EastWest => "east-west",
    }
}
