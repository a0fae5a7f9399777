use crate::lcd::hd44780::transport::{HD44780Transport, pulse_pin};
use crate::{GpioBusOutput, GpioOutput, GpioResult};
use log::trace;

/// Bit-banged wiring: every data line is its own [GpioOutput].
#[derive(Debug)]
pub struct PinTransport<'a> {
    pin_rs: &'a dyn GpioOutput,
    pin_e: &'a dyn GpioOutput,
    data_pins: [&'a dyn GpioOutput; 8],
}

impl<'a> PinTransport<'a> {
    /// Creates a transport over discrete pins.
    ///
    /// # Parameters
    ///
    /// - `pin_rs`: Register select output pin.
    /// - `pin_rw`: Optional read/write output pin, driven low (write) here. If not provided, the
    ///   R/W pin of the display must be tied to GND.
    /// - `pin_e`: Enable output pin, driven low here.
    /// - `data_pins`: D0..D7, in that order.
    pub fn new(
        pin_rs: &'a dyn GpioOutput,
        pin_rw: Option<&'a dyn GpioOutput>,
        pin_e: &'a dyn GpioOutput,
        data_pins: [&'a dyn GpioOutput; 8],
    ) -> GpioResult<Self> {
        if let Some(rw) = pin_rw {
            rw.write(false)?;
        }
        pin_e.write(false)?;

        Ok(PinTransport {
            pin_rs,
            pin_e,
            data_pins,
        })
    }
}

impl HD44780Transport for PinTransport<'_> {
    fn select_instruction_register(&self) -> GpioResult<()> {
        self.pin_rs.write(false)
    }

    fn select_data_register(&self) -> GpioResult<()> {
        self.pin_rs.write(true)
    }

    fn pulse_enable(&self) -> GpioResult<()> {
        pulse_pin(self.pin_e)
    }

    fn transmit_byte(&self, value: u8) -> GpioResult<()> {
        trace!("Writing pins: {:08b}", value);
        for (i, pin) in self.data_pins.iter().enumerate() {
            pin.write(value & (1 << i) != 0)?;
        }
        Ok(())
    }
}

/// Aggregated wiring: the data lines form one [GpioBusOutput] written in a single call.
#[derive(Debug)]
pub struct BusTransport<'a> {
    pin_rs: &'a dyn GpioOutput,
    pin_e: &'a dyn GpioOutput,
    data_bus: &'a dyn GpioBusOutput<8>,
}

impl<'a> BusTransport<'a> {
    /// Creates a transport over an eight-line bus, D0 being the first line of the bus.
    ///
    /// See [PinTransport::new] for the control pins.
    pub fn new(
        pin_rs: &'a dyn GpioOutput,
        pin_rw: Option<&'a dyn GpioOutput>,
        pin_e: &'a dyn GpioOutput,
        data_bus: &'a dyn GpioBusOutput<8>,
    ) -> GpioResult<Self> {
        if let Some(rw) = pin_rw {
            rw.write(false)?;
        }
        pin_e.write(false)?;

        Ok(BusTransport {
            pin_rs,
            pin_e,
            data_bus,
        })
    }
}

impl HD44780Transport for BusTransport<'_> {
    fn select_instruction_register(&self) -> GpioResult<()> {
        self.pin_rs.write(false)
    }

    fn select_data_register(&self) -> GpioResult<()> {
        self.pin_rs.write(true)
    }

    fn pulse_enable(&self) -> GpioResult<()> {
        pulse_pin(self.pin_e)
    }

    fn transmit_byte(&self, value: u8) -> GpioResult<()> {
        trace!("Writing bus: {:08b}", value);
        self.data_bus.write_byte(value)
    }
}
