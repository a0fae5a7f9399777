pub mod gpiod;
pub mod lcd;
pub mod raw;

use std::fmt::Debug;
use thiserror::Error;

#[derive(Debug, Error, Eq, PartialEq, Clone)]
pub enum GpioError {
    #[error("pin already in use")]
    AlreadyInUse,
    #[error("invalid argument")]
    InvalidArgument,
    #[error("the feature is not supported on this backend")]
    NotSupported,
    #[error("IO error: {0}")]
    Io(std::io::ErrorKind),
    #[error("error: {0}")]
    Other(String),
}

impl From<std::io::Error> for GpioError {
    fn from(err: std::io::Error) -> Self {
        GpioError::Io(err.kind())
    }
}

pub type GpioResult<T> = Result<T, GpioError>;

pub trait GpioDriver: Debug {
    /// Gets the amount of GPIO pins available.
    fn count(&self) -> GpioResult<usize>;

    /// Gets the GPIO pin at the given index.
    fn get_pin(&self, index: usize) -> GpioResult<Box<dyn GpioPin + '_>>;

    /// Gets the GPIO pin bus at the specific indices.
    ///
    /// The first index is the least significant line of the bus.
    fn get_pin_bus<const N: usize>(
        &self,
        indices: [usize; N],
    ) -> GpioResult<Box<dyn GpioBus<N> + '_>>;
}

/// Specifies the active level of the GPIO pin.
///
/// By default, the active level is high.
///
/// Might be software-implemented.
#[derive(Copy, Clone, Debug, Default)]
pub enum GpioActiveLevel {
    #[default]
    High,
    Low,
}

impl GpioActiveLevel {
    /// Gets the real state that will be outputted on the GPIO pin based on the active level and the value.
    pub fn get_state(&self, value: bool) -> bool {
        match self {
            GpioActiveLevel::High => value,
            GpioActiveLevel::Low => !value,
        }
    }
}

/// A single claimed GPIO line.
///
/// The LCD is driven write-only, so pins only ever become outputs.
pub trait GpioPin: Debug {
    /// Sets the GPIO pin function to output, allowing writing its state.
    fn as_output(&mut self) -> GpioResult<Box<dyn GpioOutput + '_>>;

    /// Gets whether the GPIO pin supports active level.
    fn supports_active_level(&self) -> bool {
        false
    }
    /// Gets the active level of the GPIO pin.
    fn active_level(&self) -> GpioActiveLevel {
        GpioActiveLevel::High
    }
    /// Sets the active level of the GPIO pin.
    ///
    /// # Errors
    /// - `GpioError::NotSupported` if the pin does not support active level.
    fn set_active_level(&mut self, _level: GpioActiveLevel) -> GpioResult<()> {
        Err(GpioError::NotSupported)
    }
    fn with_active_level(mut self, level: GpioActiveLevel) -> GpioResult<Self>
    where
        Self: Sized,
    {
        self.set_active_level(level)?;
        Ok(self)
    }
}

pub trait GpioOutput: Debug {
    /// Writes the state of the GPIO pin.
    fn write(&self, value: bool) -> GpioResult<()>;
}

/// Several GPIO lines claimed together and written in a single operation.
pub trait GpioBus<const N: usize>: Debug {
    fn as_output(&mut self) -> GpioResult<Box<dyn GpioBusOutput<N> + '_>>;

    fn supports_active_level(&self) -> bool {
        false
    }
    fn active_level(&self) -> GpioActiveLevel {
        GpioActiveLevel::High
    }
    fn set_active_level(&mut self, _level: GpioActiveLevel) -> GpioResult<()> {
        Err(GpioError::NotSupported)
    }
}

pub trait GpioBusOutput<const N: usize>: Debug {
    fn write(&self, values: &[bool; N]) -> GpioResult<()>;
}

impl dyn GpioBusOutput<8> + '_ {
    /// Writes the values to the GPIO pins in the bus.
    /// The values are written as a byte, LSb first.
    pub fn write_byte(&self, value: u8) -> GpioResult<()> {
        self.write(&byte_to_bits(value))
    }
}

/// Splits a byte into its bits, LSb first.
pub fn byte_to_bits(value: u8) -> [bool; 8] {
    let mut values = [false; 8];
    for (i, bit) in values.iter_mut().enumerate() {
        *bit = (value & (1 << i)) != 0;
    }
    values
}

/// Direct access to the GPIO output registers, one 32-bit register per bank of 32 lines.
///
/// Unlike [GpioBus], the caller chooses the bit positions itself, so several lines living in the
/// same bank are changed by a single call.
pub trait GpioRegisterBank: Debug {
    /// Gets the amount of GPIO lines behind the registers.
    fn count(&self) -> usize;

    /// Reserves the line and switches it to output mode.
    ///
    /// # Errors
    /// - `GpioError::InvalidArgument` if the index is out of range.
    /// - `GpioError::AlreadyInUse` if the line is claimed already.
    fn claim_output(&self, index: usize) -> GpioResult<()>;

    /// Releases a line previously claimed with [GpioRegisterBank::claim_output].
    fn release(&self, index: usize);

    /// Drives every line of `bank` whose bit is set in `mask` to the matching bit of `bits`.
    /// Lines outside of `mask` are left untouched.
    fn write_masked(&self, bank: usize, mask: u32, bits: u32) -> GpioResult<()>;
}
