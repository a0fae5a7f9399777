use crate::lcd::hd44780::driver::spin_for;
use crate::lcd::hd44780::transport::{ENABLE_PULSE_WIDTH, HD44780Transport};
use crate::{GpioError, GpioRegisterBank, GpioResult};
use log::{debug, trace};

const BANK_WIDTH: usize = 32;

/// Register-mapped wiring: every primitive is a single masked store into the GPIO output
/// registers.
///
/// D0..D7 must be consecutive lines of one bank, so a byte is presented with one store no matter
/// which bits change. The control lines may live in any bank.
#[derive(Debug)]
pub struct RegisterTransport<'a> {
    bank: &'a dyn GpioRegisterBank,
    pin_rs: usize,
    pin_rw: Option<usize>,
    pin_e: usize,
    data_base: usize,
}

impl<'a> RegisterTransport<'a> {
    /// Claims the lines and drives R/W (if wired) and E low.
    ///
    /// `data_base` is the line number of D0; D7 is `data_base + 7`.
    ///
    /// # Errors
    /// - `GpioError::InvalidArgument` if the data lines cross a bank boundary, a line is out of
    ///   range, or two roles share a line.
    /// - `GpioError::AlreadyInUse` if a line is claimed already. Lines claimed up to that point
    ///   are released again.
    pub fn new(
        bank: &'a dyn GpioRegisterBank,
        pin_rs: usize,
        pin_rw: Option<usize>,
        pin_e: usize,
        data_base: usize,
    ) -> GpioResult<Self> {
        match data_base.checked_add(8) {
            Some(data_end) if data_end <= bank.count() => {}
            _ => return Err(GpioError::InvalidArgument),
        }
        if data_base % BANK_WIDTH + 8 > BANK_WIDTH {
            return Err(GpioError::InvalidArgument);
        }

        let pins = Self::lines(pin_rs, pin_rw, pin_e, data_base);
        for (i, pin) in pins.iter().enumerate() {
            if *pin >= bank.count() || pins[..i].contains(pin) {
                return Err(GpioError::InvalidArgument);
            }
        }

        for (i, &pin) in pins.iter().enumerate() {
            if let Err(err) = bank.claim_output(pin) {
                for &claimed in &pins[..i] {
                    bank.release(claimed);
                }
                return Err(err);
            }
        }
        debug!("Claimed lines {:?} of {:?}", pins, bank);

        // From here on, dropping the transport releases the lines.
        let transport = RegisterTransport {
            bank,
            pin_rs,
            pin_rw,
            pin_e,
            data_base,
        };

        if let Some(rw) = pin_rw {
            transport.write_line(rw, false)?;
        }
        transport.write_line(pin_e, false)?;

        Ok(transport)
    }

    fn lines(pin_rs: usize, pin_rw: Option<usize>, pin_e: usize, data_base: usize) -> Vec<usize> {
        let mut pins = vec![pin_rs, pin_e];
        pins.extend(pin_rw);
        pins.extend(data_base..data_base + 8);
        pins
    }

    fn write_line(&self, pin: usize, high: bool) -> GpioResult<()> {
        let bit = 1 << (pin % BANK_WIDTH);
        self.bank
            .write_masked(pin / BANK_WIDTH, bit, if high { bit } else { 0 })
    }
}

impl HD44780Transport for RegisterTransport<'_> {
    fn select_instruction_register(&self) -> GpioResult<()> {
        self.write_line(self.pin_rs, false)
    }

    fn select_data_register(&self) -> GpioResult<()> {
        self.write_line(self.pin_rs, true)
    }

    fn pulse_enable(&self) -> GpioResult<()> {
        self.write_line(self.pin_e, true)?;
        spin_for(ENABLE_PULSE_WIDTH);
        self.write_line(self.pin_e, false)
    }

    fn transmit_byte(&self, value: u8) -> GpioResult<()> {
        let shift = self.data_base % BANK_WIDTH;
        trace!("Writing register: {:08b} << {}", value, shift);
        self.bank.write_masked(
            self.data_base / BANK_WIDTH,
            0xFF << shift,
            (value as u32) << shift,
        )
    }
}

impl Drop for RegisterTransport<'_> {
    fn drop(&mut self) {
        for pin in Self::lines(self.pin_rs, self.pin_rw, self.pin_e, self.data_base) {
            self.bank.release(pin);
        }
    }
}
