//! HD44780 character LCD support, 8-bit parallel bus, write-only.
//!
//! [driver::HD44780] speaks the controller's protocol; [transport] gets the bytes onto the wires.
//!
//! ```no_run
//! use lcdlab_gpio::GpioDriver;
//! use lcdlab_gpio::lcd::hd44780::driver::{Geometry, HD44780, SpinDelay};
//! use lcdlab_gpio::lcd::hd44780::transport::BusTransport;
//! use lcdlab_gpio::gpiod::GpiodDriver;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let gpio = GpiodDriver::open("/dev/gpiochip0")?;
//! let mut pin_rs = gpio.get_pin(22)?;
//! let mut pin_e = gpio.get_pin(17)?;
//! let mut data_bus = gpio.get_pin_bus([5, 6, 13, 19, 26, 16, 20, 21])?;
//! let rs = pin_rs.as_output()?;
//! let e = pin_e.as_output()?;
//! let bus = data_bus.as_output()?;
//!
//! let transport = BusTransport::new(&*rs, None, &*e, &*bus)?;
//! let mut lcd = HD44780::new(&transport, &SpinDelay, Geometry::default())?;
//! lcd.write_text("Hello, world!")?;
//! # Ok(())
//! # }
//! ```

pub mod driver;
pub mod transport;
