//! Transports move single bytes and control-line states to the HD44780 and know nothing about
//! its instruction set. [HD44780](super::driver::HD44780) is written against [HD44780Transport] only.
//!
//! Three wirings are provided:
//! - [PinTransport]: eight independent [GpioOutput] lines, written one after another.
//! - [BusTransport]: one [GpioBusOutput] of eight lines, written in a single call.
//! - [RegisterTransport]: raw [GpioRegisterBank](crate::GpioRegisterBank) stores, one per primitive.
//!
//! All of them latch on the falling edge of E: E is raised, held for [ENABLE_PULSE_WIDTH] and
//! dropped. The R/W line, when wired, is driven to write once at construction and never touched
//! again. Settling delays are left to the driver.
//!
//! [GpioOutput]: crate::GpioOutput
//! [GpioBusOutput]: crate::GpioBusOutput

mod gpio;
mod register;

use crate::{GpioOutput, GpioResult};
use crate::lcd::hd44780::driver::spin_for;
pub use gpio::*;
pub use register::*;
use std::fmt::Debug;
use std::time::Duration;

/// Minimum high time of the E line. The datasheet asks for 450 ns (PW_EH).
pub const ENABLE_PULSE_WIDTH: Duration = Duration::from_micros(1);

/// The four primitives an HD44780 wiring has to provide.
///
/// Methods take `&self` so that one transport can be borrowed by several drivers sharing the
/// same physical bus. Callers have to serialize those drivers themselves.
pub trait HD44780Transport: Debug {
    /// Drives RS low: the next byte is an instruction.
    fn select_instruction_register(&self) -> GpioResult<()>;

    /// Drives RS high: the next byte is character data.
    fn select_data_register(&self) -> GpioResult<()>;

    /// Performs exactly one enable transition, latching RS and the data lines.
    fn pulse_enable(&self) -> GpioResult<()>;

    /// Makes `value` observable on D0..D7 by the time [HD44780Transport::pulse_enable] fires.
    fn transmit_byte(&self, value: u8) -> GpioResult<()>;
}

pub(crate) fn pulse_pin(pin: &dyn GpioOutput) -> GpioResult<()> {
    pin.write(true)?;
    spin_for(ENABLE_PULSE_WIDTH);
    pin.write(false)?;
    Ok(())
}
