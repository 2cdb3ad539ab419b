/*
 * Push button debouncing.
 *
 * The button task waits for any edge, then for the line to be quiet for the
 * debounce time, and hands the level it settled on to `settled`. Only a
 * settled change from released to pressed counts as a press. Bounce on
 * release makes falling edges too, but the line then settles released, so it
 * never counts twice.
 */

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Edge {
    Pressed,
    Released,
}

#[derive(Debug)]
pub struct Debouncer {
    pressed: bool,
}

impl Debouncer {
    pub const fn new() -> Self {
        Debouncer { pressed: false }
    }

    pub fn settled(&mut self, pressed: bool) -> Option<Edge> {
        match (self.pressed, pressed) {
            (false, true) => {
                self.pressed = true;
                Some(Edge::Pressed)
            }
            (true, false) => {
                self.pressed = false;
                Some(Edge::Released)
            }
            (false, false) | (true, true) => None,
        }
    }
}

impl Default for Debouncer {
    fn default() -> Self {
        Debouncer::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_press_and_release() {
        let mut debouncer = Debouncer::new();
        assert_eq!(debouncer.settled(true), Some(Edge::Pressed));
        assert_eq!(debouncer.settled(false), Some(Edge::Released));
        assert_eq!(debouncer.settled(true), Some(Edge::Pressed));
    }

    #[test]
    fn test_release_bounce_is_not_a_press() {
        let mut debouncer = Debouncer::new();
        let presses = [true, false, false, false]
            .into_iter()
            .filter(|level| debouncer.settled(*level) == Some(Edge::Pressed))
            .count();
        assert_eq!(presses, 1);
    }

    #[test]
    fn test_bounce_that_settles_pressed_counts_once() {
        let mut debouncer = Debouncer::new();
        assert_eq!(debouncer.settled(true), Some(Edge::Pressed));
        assert_eq!(debouncer.settled(true), None);
    }

    #[test]
    fn test_glitch_while_released_is_ignored() {
        let mut debouncer = Debouncer::new();
        assert_eq!(debouncer.settled(false), None);
    }
}
