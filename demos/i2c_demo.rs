//! Trains two classes over I2C on an RP235x board, then runs one inference.
//!
//! Wiring: GRC accelerator on I2C0 (SDA/SCL per board default), address
//! 0x2A, with its reset line on GPIO 15.

#![no_std]
#![no_main]

use defmt::{info, unwrap};
use defmt_rtt as _;
use panic_probe as _;

use rp235x_hal as hal;
use hal::block::ImageDef;
use hal::fugit::RateExtU32;
use hal::gpio::{FunctionI2C, PullUp};

use grc_driver::{Config, I2cTransport, InferenceFlags, Session, TrainFlags};

#[unsafe(link_section = ".start_block")]
#[used]
pub static IMAGE_DEF: ImageDef = hal::block::ImageDef::secure_exe();

const GRC_ADDRESS: u8 = 0x2A;
const XTAL_FREQ_HZ: u32 = 12_000_000;

#[hal::entry]
fn main() -> ! {
    let mut pac = hal::pac::Peripherals::take().unwrap();
    let mut watchdog = hal::Watchdog::new(pac.WATCHDOG);
    let clocks = hal::clocks::init_clocks_and_plls(
        XTAL_FREQ_HZ,
        pac.XOSC,
        pac.CLOCKS,
        pac.PLL_SYS,
        pac.PLL_USB,
        &mut pac.RESETS,
        &mut watchdog,
    )
    .unwrap();

    let sio = hal::Sio::new(pac.SIO);
    let pins = hal::gpio::Pins::new(
        pac.IO_BANK0,
        pac.PADS_BANK0,
        sio.gpio_bank0,
        &mut pac.RESETS,
    );
    let mut delay = cortex_m::delay::Delay::new(
        cortex_m::peripheral::Peripherals::take().unwrap().SYST,
        clocks.system_clock.freq().to_Hz(),
    );

    let sda = pins.gpio4.into_function::<FunctionI2C>().into_pull_type::<PullUp>();
    let scl = pins.gpio5.into_function::<FunctionI2C>().into_pull_type::<PullUp>();
    let i2c = hal::I2C::i2c0(
        pac.I2C0,
        sda,
        scl,
        400.kHz(),
        &mut pac.RESETS,
        &clocks.system_clock,
    );
    let reset_pin = pins.gpio15.into_push_pull_output();

    let transport = I2cTransport::with_reset(i2c, delay, reset_pin, GRC_ADDRESS);
    let mut session = unwrap!(Session::open(transport, Config { channels: 3, neurons: 10 })
        .map_err(|_| "failed to open GRC session"));

    info!("grc session open");

    let sample_a = [0.1f32, 0.2, 0.3];
    let sample_b = [0.9f32, 0.8, 0.7];

    let train_flags = TrainFlags { add_new_tag: true, ..Default::default() };
    let idx_a = unwrap!(session.train(train_flags, 0, &sample_a).map_err(|_| "train a failed"));
    info!("trained class a -> index {}", idx_a);

    let idx_b = unwrap!(session.train(train_flags, 0, &sample_b).map_err(|_| "train b failed"));
    info!("trained class b -> index {}", idx_b);

    let inference_flags = InferenceFlags::default();
    let probe = [0.85f32, 0.75, 0.65];
    match session.inference(inference_flags, 0, &probe) {
        Ok(tag) => info!("classified as tag {}", tag),
        Err(_) => info!("inference did not classify the input"),
    }

    loop {
        cortex_m::asm::wfi();
    }
}
