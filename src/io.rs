/*
 * The I/O module for the traffic lights.
 *
 * This is the only device-specific part of the program. It takes the chip
 * peripherals apart into the pieces the tasks in `main.rs` own: the light
 * outputs, the switch bank, the three push buttons and the serial port. The
 * pin choices follow the DESPI-M02 wiring; changing boards means changing this
 * file only.
 */

use despi_m02_tlc::Button;
use despi_m02_tlc::Switches;
use despi_m02_tlc::timed_output_masker::Pins;
use embassy_stm32::{
    Peripherals, bind_interrupts,
    exti::{Channel, ExtiInput},
    gpio::{Input, Level, Output, Pin, Pull, Speed},
    mode::Async,
    peripherals,
    usart::{self, Config, Uart},
};
use enum_ordinalize::Ordinalize;

bind_interrupts!(struct Irqs {
    USART1 => usart::InterruptHandler<peripherals::USART1>;
});

// Outputs in `Pins` order.
pub struct LightBank {
    outputs: [Output<'static>; Pins::VARIANT_COUNT],
}

impl LightBank {
    pub fn write(&mut self, levels: &[bool; Pins::VARIANT_COUNT]) {
        for (output, on) in self.outputs.iter_mut().zip(levels) {
            light(output, *on);
        }
    }
}

// Deal with the pin level here, so that the masker can just use easy to
// understand `true` for on.
fn light(output: &mut Output, on: bool) {
    output.set_level(if on { Level::High } else { Level::Low });
}

/*
 * Four mode switches and the reconfigure switch. The switches connect to
 * 3.3V, so an open switch reads low.
 */
pub struct SwitchBank {
    mode_select: [Input<'static>; 4],
    reconfigure: Input<'static>,
}

impl SwitchBank {
    pub fn sample(&self) -> Switches {
        let mode_select = self
            .mode_select
            .iter()
            .enumerate()
            .fold(0u8, |bits, (i, input)| bits | (u8::from(input.is_high()) << i));

        Switches {
            mode_select,
            reconfigure: self.reconfigure.is_high(),
        }
    }
}

pub struct Board {
    pub lights: LightBank,
    pub switches: SwitchBank,
    // Push buttons are active-low with the internal pull-up.
    pub buttons: [(Button, ExtiInput<'static>); 3],
    pub uart: Uart<'static, Async>,
}

impl Board {
    pub fn new(peripherals: Peripherals) -> Self {
        let lights = LightBank {
            outputs: [
                // north-south: red, yellow, green, walk, wait
                Output::new(peripherals.PE1.degrade(), Level::High, Speed::Low),
                Output::new(peripherals.PB9.degrade(), Level::Low, Speed::Low),
                Output::new(peripherals.PB7.degrade(), Level::Low, Speed::Low),
                Output::new(peripherals.PD8.degrade(), Level::Low, Speed::Low),
                Output::new(peripherals.PD9.degrade(), Level::Low, Speed::Low),
                // east-west
                Output::new(peripherals.PB6.degrade(), Level::High, Speed::Low),
                Output::new(peripherals.PB8.degrade(), Level::Low, Speed::Low),
                Output::new(peripherals.PE0.degrade(), Level::Low, Speed::Low),
                Output::new(peripherals.PD10.degrade(), Level::Low, Speed::Low),
                Output::new(peripherals.PD11.degrade(), Level::Low, Speed::Low),
            ],
        };

        let switches = SwitchBank {
            mode_select: [
                Input::new(peripherals.PC0.degrade(), Pull::Down),
                Input::new(peripherals.PC1.degrade(), Pull::Down),
                Input::new(peripherals.PC2.degrade(), Pull::Down),
                Input::new(peripherals.PC3.degrade(), Pull::Down),
            ],
            reconfigure: Input::new(peripherals.PC4.degrade(), Pull::Down),
        };

        let buttons = [
            (
                Button::EastWestPedestrian,
                ExtiInput::new(
                    peripherals.PE2.degrade(),
                    peripherals.EXTI2.degrade(),
                    Pull::Up,
                ),
            ),
            (
                Button::NorthSouthPedestrian,
                ExtiInput::new(
                    peripherals.PE3.degrade(),
                    peripherals.EXTI3.degrade(),
                    Pull::Up,
                ),
            ),
            (
                // the on-board button
                Button::Vehicle,
                ExtiInput::new(
                    peripherals.PE11.degrade(),
                    peripherals.EXTI11.degrade(),
                    Pull::Up,
                ),
            ),
        ];

        // 115200 baud, no way to carry on without a console
        let uart = Uart::new(
            peripherals.USART1,
            peripherals.PA10,
            peripherals.PA9,
            Irqs,
            peripherals.DMA1_CH4,
            peripherals.DMA1_CH5,
            Config::default(),
        )
        .unwrap();

        Board {
            lights,
            switches,
            buttons,
            uart,
        }
    }
}
