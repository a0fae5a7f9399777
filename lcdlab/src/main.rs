mod config;

use crate::config::{Config, TransportKind};
use dotenv::dotenv;
use eyre::eyre;
use lcdlab_gpio::gpiod::GpiodDriver;
use lcdlab_gpio::lcd::hd44780::driver::{Geometry, HD44780, SpinDelay};
use lcdlab_gpio::lcd::hd44780::transport::{
    BusTransport, HD44780Transport, PinTransport, RegisterTransport,
};
use lcdlab_gpio::raw::RawGpioDriver;
use lcdlab_gpio::{GpioDriver, GpioOutput, GpioResult};
use log::{debug, info};
use sysinfo::System;

fn main() -> eyre::Result<()> {
    dotenv().ok();
    pretty_env_logger::init();

    const UNKNOWN_STR: &str = "???";

    info!(
        "lcdlab starting on {} ({}), kernel {}",
        System::name().as_deref().unwrap_or(UNKNOWN_STR),
        System::cpu_arch(),
        System::kernel_version().as_deref().unwrap_or(UNKNOWN_STR),
    );

    let config = Config::load()?;
    let geometry = config.geometry()?;

    info!(
        "LCD {}x{} @ RS: {}, RW: {:?}, E: {}, Data: {:?}, via {:?}",
        geometry.width(),
        geometry.height(),
        config.pin_rs,
        config.pin_rw,
        config.pin_e,
        config.pins_data,
        config.transport,
    );

    match config.transport {
        TransportKind::Pins => {
            let gpio = RawGpioDriver::new_gpiomem()?;
            debug!("{:?} initialized.", gpio);
            run_pins(&gpio, &config, geometry)
        }
        TransportKind::Bus => {
            let gpio = GpiodDriver::open(&config.gpio_chip)?;
            debug!("{:?} initialized.", gpio);
            run_bus(&gpio, &config, geometry)
        }
        TransportKind::Register => {
            let gpio = RawGpioDriver::new_gpiomem()?;
            debug!("{:?} initialized.", gpio);
            let transport = RegisterTransport::new(
                &gpio,
                config.pin_rs,
                config.pin_rw,
                config.pin_e,
                config.data_base()?,
            )?;
            show(&transport, &config, geometry)
        }
    }
}

fn run_pins<D: GpioDriver>(gpio: &D, config: &Config, geometry: Geometry) -> eyre::Result<()> {
    let mut pin_rs = gpio.get_pin(config.pin_rs)?;
    let mut pin_rw = config.pin_rw.map(|index| gpio.get_pin(index)).transpose()?;
    let mut pin_e = gpio.get_pin(config.pin_e)?;
    let mut data_pins = config
        .pins_data
        .iter()
        .map(|&index| gpio.get_pin(index))
        .collect::<GpioResult<Vec<_>>>()?;

    let pin_rs_out = pin_rs.as_output()?;
    let pin_rw_out = match pin_rw.as_mut() {
        Some(pin) => Some(pin.as_output()?),
        None => None,
    };
    let pin_e_out = pin_e.as_output()?;
    let data_outs = data_pins
        .iter_mut()
        .map(|pin| pin.as_output())
        .collect::<GpioResult<Vec<_>>>()?;
    let data: [&dyn GpioOutput; 8] = std::array::from_fn(|i| &*data_outs[i]);

    let transport = PinTransport::new(&*pin_rs_out, pin_rw_out.as_deref(), &*pin_e_out, data)?;
    show(&transport, config, geometry)
}

fn run_bus<D: GpioDriver>(gpio: &D, config: &Config, geometry: Geometry) -> eyre::Result<()> {
    let mut pin_rs = gpio.get_pin(config.pin_rs)?;
    let mut pin_rw = config.pin_rw.map(|index| gpio.get_pin(index)).transpose()?;
    let mut pin_e = gpio.get_pin(config.pin_e)?;
    let mut data_bus = gpio.get_pin_bus(config.pins_data)?;

    let pin_rs_out = pin_rs.as_output()?;
    let pin_rw_out = match pin_rw.as_mut() {
        Some(pin) => Some(pin.as_output()?),
        None => None,
    };
    let pin_e_out = pin_e.as_output()?;
    let data_bus_out = data_bus.as_output()?;

    let transport = BusTransport::new(
        &*pin_rs_out,
        pin_rw_out.as_deref(),
        &*pin_e_out,
        &*data_bus_out,
    )?;
    show(&transport, config, geometry)
}

fn show(
    transport: &dyn HD44780Transport,
    config: &Config,
    geometry: Geometry,
) -> eyre::Result<()> {
    let delay = SpinDelay;
    let mut lcd = HD44780::new(transport, &delay, geometry)?;
    debug!("{:?} initialized.", lcd);

    if config.text.len() > geometry.height() {
        return Err(eyre!(
            "{} lines of text for a display with {} rows",
            config.text.len(),
            geometry.height()
        ));
    }

    for (row, line) in config.text.iter().enumerate() {
        lcd.set_cursor(0, row)?;
        let line: String = line.chars().take(geometry.width()).collect();
        lcd.write_text(&line)?;
    }

    info!("Wrote {} line(s), cursor at {}", config.text.len(), lcd.cursor());
    Ok(())
}
