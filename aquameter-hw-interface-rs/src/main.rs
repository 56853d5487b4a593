//! aquameter-hw-interface
//!
//! Water-meter firmware for the Raspberry Pi Pico 2. Wires the three
//! library crates into a running meter:
//!
//! 1. The YF-S201 flow sensor emits one pulse per ~2.2 ml; the flow task
//!    counts rising edges into the static [`PulseCounter`].
//! 2. The meter task runs the [`MeterController`] control loop every
//!    50 ms: it drains the counter once per second, commits whole liters
//!    to the EEPROM once per minute, services the three buttons and
//!    pushes text frames to the OLED.
//!
//! The DS3231 clock, its AT24C32 EEPROM and the SSD1306 OLED share I2C0.

#![no_std]
#![no_main]

use defmt::*;
use embassy_executor::Spawner;
use embassy_rp::block::ImageDef;
use embassy_rp::bind_interrupts;
use embassy_rp::gpio::{Input, Pull};
use embassy_rp::i2c::{self, I2c};
use embassy_rp::peripherals::I2C0;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::mutex::Mutex;
use embassy_embedded_hal::shared_bus::asynch::i2c::I2cDevice;
use embassy_time::{Duration, Instant, Timer};
use static_cell::StaticCell;
use {defmt_rtt as _, panic_probe as _};

use aquameter::accounting::{ButtonInputs, MeterController, MeterIo, PulseCounter, LOOP_DELAY_MS};
use aquameter_oled_display_rs::{OledDriver, OledSink, TextLayout};
use meter_peripherals::{At24c32, Ds3231, AT24C32_ADDRESS, DS3231_ADDRESS};

// ---------------------------------------------------------------------------
// Boot block and interrupt binding
// ---------------------------------------------------------------------------

/// Tell the RP2350 Boot ROM about our application.
#[link_section = ".start_block"]
#[used]
pub static IMAGE_DEF: ImageDef = embassy_rp::block::ImageDef::secure_exe();

// Wire the I2C0 peripheral interrupt to Embassy's async handler.
bind_interrupts!(struct Irqs {
    I2C0_IRQ => i2c::InterruptHandler<I2C0>;
});

// ---------------------------------------------------------------------------
// Static storage
// ---------------------------------------------------------------------------

/// Shared I2C0 bus — clock, EEPROM and OLED access it through I2cDevice
/// wrappers that serialise transactions.
static I2C_BUS: StaticCell<
    Mutex<CriticalSectionRawMutex, I2c<'static, I2C0, i2c::Async>>,
> = StaticCell::new();

/// Flow-sensor pulses since the last sample. Written by the flow task,
/// drained by the meter task.
static PULSES: PulseCounter = PulseCounter::new();

// ---------------------------------------------------------------------------
// Type aliases
// ---------------------------------------------------------------------------

/// One device handle on I2C_BUS. The clock, the EEPROM and the OLED each
/// get their own.
type BusDevice = I2cDevice<
    'static,
    CriticalSectionRawMutex,
    I2c<'static, I2C0, i2c::Async>,
>;

type Rtc = Ds3231<BusDevice>;
type Eeprom = At24c32<BusDevice>;
type Oled = OledSink<BusDevice>;

/// Active-low push buttons, pull-ups enabled.
struct Buttons {
    mode: Input<'static>,
    reset: Input<'static>,
    select: Input<'static>,
}

impl Buttons {
    fn sample(&self) -> ButtonInputs {
        ButtonInputs::from_levels(self.mode.is_high(), self.reset.is_high(), self.select.is_high())
    }
}

// ---------------------------------------------------------------------------
// Tasks
// ---------------------------------------------------------------------------

/// Count flow-sensor pulses. Nothing else runs on this path.
#[embassy_executor::task]
async fn flow_task(mut flow_pin: Input<'static>) {
    info!("Flow task started");
    loop {
        flow_pin.wait_for_rising_edge().await;
        PULSES.record_pulse();
    }
}

/// The control loop: one [`MeterController::poll()`] every `LOOP_DELAY_MS`.
#[embassy_executor::task]
async fn meter_task(buttons: Buttons, mut rtc: Rtc, mut eeprom: Eeprom, mut oled: Oled) {
    let mut io = MeterIo::new(&mut rtc, &mut eeprom, &mut oled);
    let mut meter = MeterController::start(Instant::now().as_millis(), &mut io).await;
    info!("Meter task started in mode {}", meter.mode());

    loop {
        let now_ms = Instant::now().as_millis();
        meter.poll(now_ms, &PULSES, buttons.sample(), &mut io).await;
        Timer::after(Duration::from_millis(LOOP_DELAY_MS)).await;
    }
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

#[embassy_executor::main]
async fn main(spawner: Spawner) {
    let p = embassy_rp::init(Default::default());
    info!("aquameter-hw-interface starting");

    // —— Pin assignments ————————————————————————————————————————————————————
    // I2C_SDA → GP20  (p.PIN_20)
    // I2C_SCL → GP21  (p.PIN_21)
    // FLOW    → GP15  (p.PIN_15)  open-collector sensor output, pull-up
    // BTN_MODE   → GP16  (p.PIN_16)  active-low, pull-up
    // BTN_RESET  → GP17  (p.PIN_17)  active-low, pull-up
    // BTN_SELECT → GP18  (p.PIN_18)  active-low, pull-up
    // ———————————————————————————————————————————————————————————————————————

    let i2c = I2c::new_async(
        p.I2C0,
        p.PIN_21, // SCL
        p.PIN_20, // SDA
        Irqs,
        i2c::Config::default(),
    );
    let i2c_bus = I2C_BUS.init(Mutex::new(i2c));

    let rtc = Ds3231::new(I2cDevice::new(i2c_bus), DS3231_ADDRESS);
    let eeprom = At24c32::new(I2cDevice::new(i2c_bus), AT24C32_ADDRESS);

    // OLED at the standard SSD1306 address. On failure the meter still
    // counts and persists; frames are dropped.
    let mut oled = OledSink::new(OledDriver::new(I2cDevice::new(i2c_bus), 0x3C), TextLayout::default());
    if let Err(e) = oled.init().await {
        error!("OLED init failed: {}", e);
    }

    let flow_pin = Input::new(p.PIN_15, Pull::Up);
    let buttons = Buttons {
        mode: Input::new(p.PIN_16, Pull::Up),
        reset: Input::new(p.PIN_17, Pull::Up),
        select: Input::new(p.PIN_18, Pull::Up),
    };

    // —— Spawn tasks ————————————————————————————————————————————————————————

    spawner.spawn(flow_task(flow_pin)).unwrap();
    spawner.spawn(meter_task(buttons, rtc, eeprom, oled)).unwrap();

    info!("All tasks spawned");
}
