#![no_std]
#![no_main]

use core::fmt::Write as _;
use core::future::pending;

use defmt_rtt as _;
use despi_m02_tlc::config::{
    BUTTON_DEBOUNCE_MILLIS, CAMERA_TIMEOUT_MILLIS, CHANNEL_CAPACITY, DEFAULT_TIMEOUTS,
    DWELL_TICK_MILLIS, MASKER_HZ, SERIAL_RX_BUFFER_SIZE,
};
use despi_m02_tlc::debounce::{Debouncer, Edge};
use despi_m02_tlc::timed_output_masker::{Pins, TimedOutputMasker};
use despi_m02_tlc::{
    Button, Effects, SharedController, Switches, TimerCommand, TimerId, log_debug, log_info,
    log_warn,
};
use embassy_executor::Spawner;
use embassy_futures::select::{Either, Either3, select, select3};
use embassy_stm32::exti::ExtiInput;
use embassy_stm32::mode::Async;
use embassy_stm32::usart::{RingBufferedUartRx, UartTx};
use embassy_sync::blocking_mutex::raw::ThreadModeRawMutex;
use embassy_sync::channel::{Channel, Receiver};
use embassy_sync::mutex::Mutex;
use embassy_time::{Duration, Instant, Ticker, Timer};
use enum_ordinalize::Ordinalize;
use panic_halt as _;
use static_cell::StaticCell;

mod io;

type Line = heapless::String<64>;

static CONTROLLER: SharedController = SharedController::new();
static SWITCHES: Mutex<ThreadModeRawMutex, Option<io::SwitchBank>> = Mutex::new(None);

static TIMERS: Channel<ThreadModeRawMutex, TimerCommand, CHANNEL_CAPACITY> = Channel::new();
static LINES: Channel<ThreadModeRawMutex, Line, CHANNEL_CAPACITY> = Channel::new();

#[embassy_executor::main]
async fn main(spawner: Spawner) {
    let io::Board {
        lights,
        switches,
        buttons,
        uart,
    } = io::Board::new(embassy_stm32::init(Default::default()));
    *SWITCHES.lock().await = Some(switches);
    let (tx, rx) = uart.split();

    // Input keeps arriving while the echo of earlier bytes is still being
    // written out.
    static RX_BUFFER: StaticCell<[u8; SERIAL_RX_BUFFER_SIZE]> = StaticCell::new();
    let rx = rx.into_ring_buffered(RX_BUFFER.init([0; SERIAL_RX_BUFFER_SIZE]));

    spawner.spawn(io_task(lights)).unwrap();
    spawner.spawn(serial_tx_task(tx, LINES.receiver())).unwrap();
    spawner.spawn(serial_rx_task(rx)).unwrap();
    spawner.spawn(camera_task(TIMERS.receiver())).unwrap();
    for (button, input) in buttons {
        spawner.spawn(button_task(input, button)).unwrap();
    }

    log_info!("traffic light controller started");
    let mode = CONTROLLER.lock(|controller| controller.mode());
    say(format_args!("MODE: {}", mode)).await;

    spawner.spawn(tick_task()).unwrap();
}

async fn sample_switches() -> Switches {
    match SWITCHES.lock().await.as_ref() {
        Some(bank) => bank.sample(),
        None => Switches::default(),
    }
}

async fn say(args: core::fmt::Arguments<'_>) {
    let mut line = Line::new();
    if line.write_fmt(args).is_err() {
        log_warn!("serial: line truncated");
    }
    LINES.send(line).await;
}

/*
 * Everything but the timer commands. Frames are left out too: the I/O task
 * reads the current one from the controller, so a frame that waited here
 * behind a serial line can never overwrite a newer one.
 */
async fn publish(effects: Effects) {
    if let Some(mode) = effects.mode_changed {
        say(format_args!("MODE: {}", mode)).await;
    }
    for message in effects.messages.iter() {
        say(format_args!("{}", message)).await;
    }
}

async fn dispatch(effects: Effects) {
    for command in effects.timers.iter() {
        TIMERS.send(*command).await;
    }
    publish(effects).await;
}

/*
 * The periodic driver. The hold during reconfiguration is decided inside
 * `tick`, so this loop never stops; a held tick just renders the same all-red
 * phase again.
 */
#[embassy_executor::task]
async fn tick_task() -> ! {
    loop {
        let switches = sample_switches().await;
        let effects = CONTROLLER.lock(|controller| controller.tick(switches));
        let millis = effects.next_tick_millis.unwrap_or(DEFAULT_TIMEOUTS[0]);
        dispatch(effects).await;

        Timer::after_millis(millis as u64).await;
    }
}

// The buttons are active-low. A press counts once the line has been quiet
// for the debounce time and has settled low.
#[embassy_executor::task(pool_size = 3)]
async fn button_task(mut input: ExtiInput<'static>, button: Button) -> ! {
    let debounce = Duration::from_millis(BUTTON_DEBOUNCE_MILLIS);
    let mut debouncer = Debouncer::new();

    loop {
        input.wait_for_any_edge().await;

        'debounce_loop: loop {
            match select(input.wait_for_any_edge(), Timer::after(debounce)).await {
                Either::First(_) => {}
                Either::Second(_) => break 'debounce_loop,
            }
        }

        if debouncer.settled(input.is_low()) != Some(Edge::Pressed) {
            continue;
        }
        log_debug!("button: {}", button);
        let effects = CONTROLLER.lock(|controller| controller.button(button));
        dispatch(effects).await;
    }
}

struct CameraTimers {
    watchdog: Option<Instant>,
    dwell: Option<Ticker>,
}

impl CameraTimers {
    fn apply(&mut self, command: TimerCommand) {
        match command {
            TimerCommand::Start(TimerId::Camera) => {
                self.watchdog = Some(Instant::now() + Duration::from_millis(CAMERA_TIMEOUT_MILLIS))
            }
            TimerCommand::Stop(TimerId::Camera) => self.watchdog = None,
            TimerCommand::Start(TimerId::Dwell) => {
                self.dwell = Some(Ticker::every(Duration::from_millis(DWELL_TICK_MILLIS)))
            }
            TimerCommand::Stop(TimerId::Dwell) => self.dwell = None,
        }
    }
}

/*
 * The two camera timers: a one-shot watchdog and the 1 ms dwell counter.
 * Commands coming out of our own callbacks are applied here directly, since
 * sending them to our own channel could block forever.
 */
#[embassy_executor::task]
async fn camera_task(
    commands: Receiver<'static, ThreadModeRawMutex, TimerCommand, CHANNEL_CAPACITY>,
) -> ! {
    let mut timers = CameraTimers {
        watchdog: None,
        dwell: None,
    };

    loop {
        let watchdog = timers.watchdog;
        let deadline = async move {
            match watchdog {
                Some(at) => Timer::at(at).await,
                None => pending::<()>().await,
            }
        };
        let dwell = async {
            match timers.dwell.as_mut() {
                Some(ticker) => ticker.next().await,
                None => pending::<()>().await,
            }
        };

        let event = select3(commands.receive(), deadline, dwell).await;
        let effects = match event {
            Either3::First(command) => {
                timers.apply(command);
                continue;
            }
            Either3::Second(()) => {
                timers.watchdog = None;
                CONTROLLER.lock(|controller| controller.camera_timeout())
            }
            Either3::Third(()) => CONTROLLER.lock(|controller| controller.dwell_tick()),
        };

        for command in effects.timers.iter() {
            timers.apply(*command);
        }
        publish(effects).await;
    }
}

// The line protocol is fed one byte at a time; this task sleeps until bytes
// arrive in the ring buffer.
#[embassy_executor::task]
async fn serial_rx_task(mut rx: RingBufferedUartRx<'static>) -> ! {
    let mut chunk = [0u8; 16];

    loop {
        let count = match rx.read(&mut chunk).await {
            Ok(count) => count,
            Err(_) => {
                log_warn!("serial: read error");
                continue;
            }
        };
        for byte in &chunk[..count] {
            let switches = sample_switches().await;
            let effects = CONTROLLER.lock(|controller| controller.serial_input(*byte, switches));
            dispatch(effects).await;
        }
    }
}

#[embassy_executor::task]
async fn serial_tx_task(
    mut tx: UartTx<'static, Async>,
    lines: Receiver<'static, ThreadModeRawMutex, Line, CHANNEL_CAPACITY>,
) -> ! {
    loop {
        let line = lines.receive().await;
        if tx.write(line.as_bytes()).await.is_err() || tx.write(b"\r\n").await.is_err() {
            log_warn!("serial: write error");
        }
    }
}

// The single writer of the light outputs.
#[embassy_executor::task]
async fn io_task(mut lights: io::LightBank) -> ! {
    let mut masker = TimedOutputMasker::new([false; Pins::VARIANT_COUNT]);
    let mut refresh = Ticker::every(Duration::from_hz(MASKER_HZ));

    loop {
        refresh.next().await;
        let frame = CONTROLLER.lock(|controller| controller.frame());
        masker.apply(&frame);
        lights.write(&masker.call_at_100_hz());
    }
}
