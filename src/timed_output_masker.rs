/*
 * The walk indicator flashes while its approach shows yellow, and everything
 * else is steady. Rather than have the control logic toggle that lamp on a
 * timer of its own, we separate setting the desired pin state from setting the
 * output pin. The control logic hands over a `SignalFrame` whenever it has a
 * new one. This module turns frames into output state descriptors, which say
 * whether a pin is on and whether it is subject to the flash timer, and masks
 * them into pin levels at a fixed rate. All flashing lamps change together
 * because they share one timer.
 *
 * It is also the single writer of the light outputs: nothing else in the
 * firmware decides a pin level.
 */

use enum_ordinalize::Ordinalize;

use crate::trafficlight::{Approach, Aspect, Colour, SignalFrame};

#[derive(Ordinalize, Debug, Clone, Copy, PartialEq, Eq)]
#[repr(usize)]
pub enum Pins {
    // North-south approach: vehicle lights, walk and wait indicators.
    NsRed,
    NsYellow,
    NsGreen,
    NsWalk,
    NsWait,

    // East-west approach.
    EwRed,
    EwYellow,
    EwGreen,
    EwWalk,
    EwWait,
}

#[derive(Copy, Clone)]
struct OutputStateDescriptor {
    on: bool,
    subject_to_flash: bool,
}

impl OutputStateDescriptor {
    const fn new() -> Self {
        OutputStateDescriptor {
            on: false,
            subject_to_flash: false,
        }
    }
}

pub struct TimedOutputMasker {
    output_descriptors: [OutputStateDescriptor; Pins::VARIANT_COUNT],
    active_lows: [bool; Pins::VARIANT_COUNT],
    tick_count: u8,
    flash_value: bool,
}

// At 100 Hz: flash at 2.5 Hz.
const TICKS_PER_CYCLE: u8 = 40;

impl TimedOutputMasker {
    // Until the first frame arrives both approaches show red.
    pub const fn new(active_lows: [bool; Pins::VARIANT_COUNT]) -> Self {
        let mut output_descriptors = [OutputStateDescriptor::new(); Pins::VARIANT_COUNT];
        output_descriptors[Pins::NsRed as usize].on = true;
        output_descriptors[Pins::EwRed as usize].on = true;

        TimedOutputMasker {
            output_descriptors,
            active_lows,
            tick_count: TICKS_PER_CYCLE - 1,
            flash_value: false,
        }
    }

    /*
     * Time stays outside this module so it can be tested; the I/O task calls
     * this at `MASKER_HZ` and writes the levels out.
     */
    pub fn call_at_100_hz(&mut self) -> [bool; Pins::VARIANT_COUNT] {
        self.advance_timers();
        self.mask_output_pins()
    }

    pub fn apply(&mut self, frame: &SignalFrame) {
        for approach in [Approach::NorthSouth, Approach::EastWest] {
            self.apply_aspect(frame.aspect(approach));
        }
    }

    fn apply_aspect(&mut self, aspect: &Aspect) {
        let [red, yellow, green, walk, wait] = match aspect.approach {
            Approach::NorthSouth => [
                Pins::NsRed,
                Pins::NsYellow,
                Pins::NsGreen,
                Pins::NsWalk,
                Pins::NsWait,
            ],
            Approach::EastWest => [
                Pins::EwRed,
                Pins::EwYellow,
                Pins::EwGreen,
                Pins::EwWalk,
                Pins::EwWait,
            ],
        };

        self.set_on_off3(
            red,
            aspect.colour == Colour::Red,
            yellow,
            aspect.colour == Colour::Yellow,
            green,
            aspect.colour == Colour::Green,
        );
        self.set_pin(walk, aspect.walk, aspect.colour == Colour::Yellow);
        self.set_on_off(wait, aspect.wait);
    }

    fn advance_timers(&mut self) {
        self.tick_count = (self.tick_count + 1) % TICKS_PER_CYCLE;
        self.flash_value = self.tick_count < TICKS_PER_CYCLE / 2;
    }

    fn mask_output_pins(&self) -> [bool; Pins::VARIANT_COUNT] {
        let mut outputs = [false; Pins::VARIANT_COUNT];
        for (i, output) in outputs.iter_mut().enumerate() {
            let output_descriptor = &self.output_descriptors[i];
            *output = output_descriptor.on;

            if output_descriptor.subject_to_flash {
                *output &= self.flash_value;
            }

            if self.active_lows[i] {
                *output = !*output;
            }
        }

        outputs
    }

    fn set_on_off3(
        &mut self,
        pin0: Pins,
        on0: bool,
        pin1: Pins,
        on1: bool,
        pin2: Pins,
        on2: bool,
    ) {
        self.set_pin(pin0, on0, false);
        self.set_pin(pin1, on1, false);
        self.set_pin(pin2, on2, false);
    }

    fn set_on_off(&mut self, pin: Pins, on: bool) {
        self.set_pin(pin, on, false);
    }

    fn set_pin(&mut self, pin: Pins, on: bool, subject_to_flash: bool) {
        self.output_descriptors[pin.ordinal()] = OutputStateDescriptor {
            on,
            subject_to_flash,
        }
    }
}
