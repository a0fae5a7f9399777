//! GPIO driver poking the BCM283x GPIO registers through a memory mapping of `/dev/gpiomem` or `/dev/mem`.
//!
//! Besides the usual pin and bus handles, [RawGpioDriver] exposes its set/clear registers as a
//! [GpioRegisterBank], which lets a caller change up to 32 lines with one register store each.
use crate::{
    GpioBus, GpioBusOutput, GpioDriver, GpioError, GpioOutput, GpioPin, GpioRegisterBank,
    GpioResult,
};
use bitvec::vec::BitVec;
use log::trace;
use memmap2::{MmapOptions, MmapRaw};
use std::fmt::{Debug, Formatter};
use std::fs::OpenOptions;
use std::sync::atomic::AtomicU8;

pub struct RawGpioDriver {
    mmap: MmapRaw,
    used_pins: BitVec<AtomicU8>,
}

impl RawGpioDriver {
    // #[cfg(target_pointer_width = "64")]
    // const GPIO_BASE: u32 = 0xFE200000;
    const GPIO_BASE: u32 = 0x3F200000;

    const PIN_COUNT: usize = 58;

    // Word offsets into the GPIO block
    const GPSET0: usize = 0x1c / 4;
    const GPCLR0: usize = 0x28 / 4;

    fn create(path: &str) -> GpioResult<Self> {
        let file = OpenOptions::new().read(true).write(true).open(path)?;

        let mmap = MmapOptions::new()
            .offset(Self::GPIO_BASE as u64)
            .len(4096)
            .map_raw(&file)?;

        Ok(RawGpioDriver {
            mmap,
            used_pins: BitVec::repeat(false, Self::PIN_COUNT),
        })
    }

    pub fn new_gpiomem() -> GpioResult<Self> {
        Self::create("/dev/gpiomem")
    }

    pub fn new_mem() -> GpioResult<Self> {
        Self::create("/dev/mem")
    }

    pub fn raw_set_pin_function(&self, pin_index: usize, function: u8) -> GpioResult<()> {
        if function > 0b111 {
            return Err(GpioError::InvalidArgument);
        }

        if pin_index >= Self::PIN_COUNT {
            return Err(GpioError::InvalidArgument);
        }

        let mmap = self.mmap.as_mut_ptr() as *mut u32;
        // GPFSELn register
        let register_ptr = unsafe { mmap.add(pin_index / 10) };
        let shift = (pin_index % 10) * 3;

        let mut register_value = unsafe { register_ptr.read_volatile() };
        register_value &= !(0b111 << shift);
        register_value |= (function as u32) << shift;
        unsafe { register_ptr.write_volatile(register_value) };

        Ok(())
    }

    /// Stores `bits` into the GPSETn (`high`) or GPCLRn (`!high`) register of the bank.
    /// Zero bits leave their lines alone, so one store changes only the lines named in `bits`.
    fn raw_store(&self, bank: usize, high: bool, bits: u32) -> GpioResult<()> {
        if bank > (Self::PIN_COUNT - 1) / 32 {
            return Err(GpioError::InvalidArgument);
        }

        let mmap = self.mmap.as_mut_ptr() as *mut u32;
        let base = if high { Self::GPSET0 } else { Self::GPCLR0 };
        let register_ptr = unsafe { mmap.add(base + bank) };
        unsafe { register_ptr.write_volatile(bits) };

        Ok(())
    }

    pub(crate) fn raw_set_pin_output(&self, pin_index: usize, high: bool) -> GpioResult<()> {
        if pin_index >= Self::PIN_COUNT {
            return Err(GpioError::InvalidArgument);
        }
        self.raw_store(pin_index / 32, high, 1 << (pin_index % 32))
    }

    pub(crate) fn raw_reset(&self, pin_index: usize) -> GpioResult<()> {
        self.raw_set_pin_function(pin_index, 0)?;
        self.raw_set_pin_output(pin_index, false)?;
        Ok(())
    }

    fn claim(&self, index: usize) -> GpioResult<()> {
        if index >= Self::PIN_COUNT {
            return Err(GpioError::InvalidArgument);
        }
        if self.used_pins[index] {
            return Err(GpioError::AlreadyInUse);
        }
        self.used_pins.set_aliased(index, true);
        Ok(())
    }
}

impl Debug for RawGpioDriver {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "RawGpioDriver({:?})", self.mmap.as_ptr().addr())
    }
}

impl GpioDriver for RawGpioDriver {
    fn count(&self) -> GpioResult<usize> {
        Ok(Self::PIN_COUNT)
    }

    fn get_pin(&self, index: usize) -> GpioResult<Box<dyn GpioPin + '_>> {
        self.claim(index)?;
        self.raw_reset(index)?;

        Ok(Box::new(RawGpioPin {
            driver: self,
            pin_index: index,
        }))
    }

    fn get_pin_bus<const N: usize>(
        &self,
        indices: [usize; N],
    ) -> GpioResult<Box<dyn GpioBus<N> + '_>> {
        if indices.iter().any(|&index| index >= Self::PIN_COUNT) {
            return Err(GpioError::InvalidArgument);
        }

        if indices.iter().any(|&index| self.used_pins[index]) {
            return Err(GpioError::AlreadyInUse);
        }

        for &index in &indices {
            self.used_pins.set_aliased(index, true);
            self.raw_reset(index)?;
        }

        Ok(Box::new(RawGpioBus {
            driver: self,
            pin_indices: indices,
        }))
    }
}

impl GpioRegisterBank for RawGpioDriver {
    fn count(&self) -> usize {
        Self::PIN_COUNT
    }

    fn claim_output(&self, index: usize) -> GpioResult<()> {
        self.claim(index)?;
        if let Err(err) = self
            .raw_reset(index)
            .and_then(|_| self.raw_set_pin_function(index, 1))
        {
            self.used_pins.set_aliased(index, false);
            return Err(err);
        }
        Ok(())
    }

    fn release(&self, index: usize) {
        if index < Self::PIN_COUNT {
            _ = self.raw_set_pin_function(index, 0);
            self.used_pins.set_aliased(index, false);
        }
    }

    fn write_masked(&self, bank: usize, mask: u32, bits: u32) -> GpioResult<()> {
        trace!("Bank {}: mask={:032b} bits={:032b}", bank, mask, bits);
        let set = mask & bits;
        let clear = mask & !bits;
        if set != 0 {
            self.raw_store(bank, true, set)?;
        }
        if clear != 0 {
            self.raw_store(bank, false, clear)?;
        }
        Ok(())
    }
}

struct RawGpioPin<'a> {
    driver: &'a RawGpioDriver,
    pin_index: usize,
}

impl Debug for RawGpioPin<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}[{}]", self.driver, self.pin_index)
    }
}

impl GpioPin for RawGpioPin<'_> {
    fn as_output(&mut self) -> GpioResult<Box<dyn GpioOutput + '_>> {
        self.driver.raw_set_pin_function(self.pin_index, 1)?;
        Ok(Box::new(RawGpioOutput { pin: self }))
    }
}

impl Drop for RawGpioPin<'_> {
    fn drop(&mut self) {
        _ = self.driver.raw_set_pin_function(self.pin_index, 0);
        self.driver.used_pins.set_aliased(self.pin_index, false);
    }
}

struct RawGpioOutput<'a> {
    pin: &'a RawGpioPin<'a>,
}

impl Debug for RawGpioOutput<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}[output]", self.pin)
    }
}

impl GpioOutput for RawGpioOutput<'_> {
    fn write(&self, value: bool) -> GpioResult<()> {
        self.pin.driver.raw_set_pin_output(self.pin.pin_index, value)
    }
}

struct RawGpioBus<'a, const N: usize> {
    driver: &'a RawGpioDriver,
    pin_indices: [usize; N],
}

impl<const N: usize> Debug for RawGpioBus<'_, N> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}{:?}", self.driver, self.pin_indices)
    }
}

impl<const N: usize> GpioBus<N> for RawGpioBus<'_, N> {
    fn as_output(&mut self) -> GpioResult<Box<dyn GpioBusOutput<N> + '_>> {
        for &pin_index in &self.pin_indices {
            self.driver.raw_set_pin_function(pin_index, 1)?;
        }
        Ok(Box::new(RawGpioBusOutput { bus: self }))
    }
}

impl<const N: usize> Drop for RawGpioBus<'_, N> {
    fn drop(&mut self) {
        for &pin_index in &self.pin_indices {
            _ = self.driver.raw_set_pin_function(pin_index, 0);
            self.driver.used_pins.set_aliased(pin_index, false);
        }
    }
}

struct RawGpioBusOutput<'a, const N: usize> {
    bus: &'a RawGpioBus<'a, N>,
}

impl<const N: usize> Debug for RawGpioBusOutput<'_, N> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}[output]", self.bus)
    }
}

impl<const N: usize> GpioBusOutput<N> for RawGpioBusOutput<'_, N> {
    fn write(&self, values: &[bool; N]) -> GpioResult<()> {
        // Lines can sit anywhere, so collect them per bank and store once per bank and level.
        let mut set = [0u32; 2];
        let mut clear = [0u32; 2];
        for (&pin_index, &value) in self.bus.pin_indices.iter().zip(values) {
            let bit = 1 << (pin_index % 32);
            if value {
                set[pin_index / 32] |= bit;
            } else {
                clear[pin_index / 32] |= bit;
            }
        }
        for bank in 0..2 {
            if set[bank] != 0 {
                self.bus.driver.raw_store(bank, true, set[bank])?;
            }
            if clear[bank] != 0 {
                self.bus.driver.raw_store(bank, false, clear[bank])?;
            }
        }
        Ok(())
    }
}
