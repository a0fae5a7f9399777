//! HD44780 protocol driver.
//!
//! [HD44780] owns everything the controller's datasheet defines: opcodes, the initialization
//! sequence, settling delays and cursor addressing. It reaches the hardware only through an
//! [HD44780Transport] and waits only through a [Delay], so the same code drives every wiring.

mod delay;
mod error;
mod instruction;

use crate::lcd::hd44780::transport::HD44780Transport;
pub(crate) use delay::spin_for;
pub use delay::{Delay, SpinDelay};
pub use error::{LcdError, LcdResult};
pub use instruction::{Instruction, LONG_DELAY, SHORT_DELAY};
use log::{debug, trace, warn};
use std::fmt::{Display, Formatter};
use std::time::Duration;

/// Instructions sent by [HD44780::new], in order.
pub const INIT_SEQUENCE: [Instruction; 4] = [
    Instruction::FunctionSet,
    Instruction::DisplayOn {
        cursor: false,
        blink: false,
    },
    Instruction::EntryModeSet,
    Instruction::ClearDisplay,
];

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum CursorDirection {
    Left,
    Right,
}

/// Which of the two controller registers the next byte goes to, as selected by the RS line.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Register {
    Instruction,
    Data,
}

/// Size of the display in characters.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct Geometry {
    width: usize,
    height: usize,
}

impl Geometry {
    /// Validates a `width`×`height` display.
    ///
    /// The controller has 80 bytes of display RAM split in two 40-byte lines. Displays with
    /// three or four rows fold each of those lines in half, so they are limited to 20 columns.
    pub fn new(width: usize, height: usize) -> LcdResult<Self> {
        let max_width = match height {
            1 | 2 => 40,
            3 | 4 => 20,
            _ => 0,
        };
        if width == 0 || width > max_width {
            return Err(LcdError::InvalidGeometry { width, height });
        }
        Ok(Geometry { width, height })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn cells(&self) -> usize {
        self.width * self.height
    }

    /// DDRAM address of the first column of `row`.
    pub fn row_address(&self, row: usize) -> u8 {
        match row {
            0 => 0x00,
            1 => 0x40,
            2 => self.width as u8,
            _ => 0x40 + self.width as u8,
        }
    }
}

impl Default for Geometry {
    fn default() -> Self {
        Geometry {
            width: 16,
            height: 2,
        }
    }
}

/// Position of the next character.
///
/// After the last cell of the display is written, `column` equals the width and the cursor
/// stays there until it is moved explicitly.
#[derive(Debug, Default, Copy, Clone, Eq, PartialEq)]
pub struct Cursor {
    pub column: usize,
    pub row: usize,
}

impl Display for Cursor {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.column, self.row)
    }
}

/// Write-only HD44780 driver for the 8-bit parallel bus.
///
/// The driver borrows its transport, so several displays can share one data bus by wiring
/// separate E lines and giving each driver its own transport, or share one transport outright.
/// Operations on drivers sharing hardware must not interleave.
///
/// Text is written with auto-increment. When a row is full the cursor wraps to the start of the
/// next row; when the last row is full, further writes fail with [LcdError::Overflow]. Out of
/// range cursor moves fail with [LcdError::CursorOutOfRange]. Both are detected before anything
/// is sent.
///
/// Character codes are not validated: the controller's character ROM decides what a byte looks like.
#[derive(Debug)]
pub struct HD44780<'a> {
    transport: &'a dyn HD44780Transport,
    delay: &'a dyn Delay,
    geometry: Geometry,
    cursor: Cursor,
    register: Option<Register>,
    /// Set when a transfer failed, so the controller's address counter may not match `cursor`.
    address_stale: bool,
    buffer: Vec<u8>,
}

impl<'a> HD44780<'a> {
    /// Creates the driver and initializes the display with [INIT_SEQUENCE].
    ///
    /// Afterwards the display is on and empty, with the cursor hidden at (0, 0).
    pub fn new(
        transport: &'a dyn HD44780Transport,
        delay: &'a dyn Delay,
        geometry: Geometry,
    ) -> LcdResult<Self> {
        let mut lcd = HD44780 {
            transport,
            delay,
            geometry,
            cursor: Cursor::default(),
            register: None,
            address_stale: false,
            buffer: vec![b' '; geometry.cells()],
        };
        lcd.init()?;
        Ok(lcd)
    }

    fn init(&mut self) -> LcdResult<()> {
        debug!(
            "Initializing {}x{} display on {:?}",
            self.geometry.width, self.geometry.height, self.transport
        );
        self.begin();
        for instruction in INIT_SEQUENCE {
            self.send_instruction(instruction)?;
        }
        self.reset_model();
        Ok(())
    }

    pub fn geometry(&self) -> Geometry {
        self.geometry
    }

    pub fn cursor(&self) -> Cursor {
        self.cursor
    }

    /// Writes a string at the cursor.
    ///
    /// Characters up to U+00FF are sent as their code point; anything else becomes `?`.
    pub fn write_text(&mut self, text: &str) -> LcdResult<()> {
        let bytes: Vec<u8> = text
            .chars()
            .map(|c| {
                u8::try_from(c).unwrap_or_else(|_| {
                    warn!("Character {:?} has no single-byte code, sending '?'", c);
                    b'?'
                })
            })
            .collect();
        self.write_bytes(&bytes)
    }

    /// Writes raw character codes at the cursor.
    pub fn write_bytes(&mut self, bytes: &[u8]) -> LcdResult<()> {
        if bytes.is_empty() {
            return Ok(());
        }

        let available = self.remaining_cells();
        if bytes.len() > available {
            return Err(LcdError::Overflow {
                requested: bytes.len(),
                available,
            });
        }

        self.begin();
        for &byte in bytes {
            self.sync_address()?;
            self.send_data(byte)?;
            let index = self.index(self.cursor);
            self.buffer[index] = byte;

            // Rows are not contiguous in DDRAM, so the address has to be set again.
            let Cursor { column, row } = self.cursor;
            if column + 1 == self.geometry.width && row + 1 < self.geometry.height {
                self.cursor = Cursor {
                    column: 0,
                    row: row + 1,
                };
                self.address_stale = true;
                self.sync_address()?;
            } else {
                self.cursor.column += 1;
            }
        }
        Ok(())
    }

    /// Moves the cursor to `column` of `row`, both counted from 0.
    pub fn set_cursor(&mut self, column: usize, row: usize) -> LcdResult<()> {
        if column >= self.geometry.width || row >= self.geometry.height {
            return Err(LcdError::CursorOutOfRange {
                column,
                row,
                width: self.geometry.width,
                height: self.geometry.height,
            });
        }
        self.begin();
        self.move_to(column, row)
    }

    /// Moves the cursor to the first column of the next row.
    pub fn new_line(&mut self) -> LcdResult<()> {
        self.set_cursor(0, self.cursor.row + 1)
    }

    /// Moves the cursor one cell within the current row.
    pub fn shift_cursor(&mut self, direction: CursorDirection) -> LcdResult<()> {
        let Cursor { column, row } = self.cursor;
        let (instruction, column) = match direction {
            CursorDirection::Left if column > 0 => (Instruction::CursorShiftLeft, column - 1),
            CursorDirection::Right if column + 1 < self.geometry.width => {
                (Instruction::CursorShiftRight, column + 1)
            }
            _ => {
                return Err(LcdError::ShiftOutOfRange {
                    direction,
                    cursor: self.cursor,
                });
            }
        };
        self.begin();
        self.sync_address()?;
        self.send_instruction(instruction)?;
        self.cursor = Cursor { column, row };
        Ok(())
    }

    /// Clears the display and moves the cursor to (0, 0).
    pub fn clear_display(&mut self) -> LcdResult<()> {
        debug!("Clearing display");
        self.begin();
        self.send_instruction(Instruction::ClearDisplay)?;
        self.reset_model();
        Ok(())
    }

    /// Moves the cursor to (0, 0) without touching the contents.
    pub fn return_home(&mut self) -> LcdResult<()> {
        self.begin();
        self.send_instruction(Instruction::ReturnHome)?;
        self.cursor = Cursor::default();
        self.address_stale = false;
        Ok(())
    }

    /// Shows or hides the underline cursor and the blinking block. The display stays on.
    pub fn set_display_control(&mut self, cursor: bool, blink: bool) -> LcdResult<()> {
        self.begin();
        self.send_instruction(Instruction::DisplayOn { cursor, blink })
    }

    /// Last character written to a cell, as tracked by the driver.
    pub fn char_at(&self, column: usize, row: usize) -> Option<u8> {
        if column >= self.geometry.width || row >= self.geometry.height {
            return None;
        }
        Some(self.buffer[self.index(Cursor { column, row })])
    }

    /// Contents of a row as tracked by the driver, bytes mapped to `char` one to one.
    pub fn row_text(&self, row: usize) -> Option<String> {
        if row >= self.geometry.height {
            return None;
        }
        let start = row * self.geometry.width;
        let row = &self.buffer[start..start + self.geometry.width];
        Some(row.iter().map(|&b| char::from(b)).collect())
    }

    fn index(&self, cursor: Cursor) -> usize {
        cursor.row * self.geometry.width + cursor.column
    }

    fn remaining_cells(&self) -> usize {
        self.geometry.cells() - self.index(self.cursor)
    }

    fn reset_model(&mut self) {
        self.cursor = Cursor::default();
        self.address_stale = false;
        self.buffer.fill(b' ');
    }

    // RS might have been moved by someone sharing the transport since our last operation.
    fn begin(&mut self) {
        self.register = None;
    }

    /// Re-sends the cursor position if an earlier failure left the controller elsewhere.
    fn sync_address(&mut self) -> LcdResult<()> {
        if self.address_stale {
            let Cursor { column, row } = self.cursor;
            self.move_to(column, row)?;
        }
        Ok(())
    }

    fn move_to(&mut self, column: usize, row: usize) -> LcdResult<()> {
        let address = self.geometry.row_address(row) + column as u8;
        self.send_instruction(Instruction::SetDdramAddress(address))?;
        self.cursor = Cursor { column, row };
        self.address_stale = false;
        trace!("Cursor at {}", self.cursor);
        Ok(())
    }

    fn send_instruction(&mut self, instruction: Instruction) -> LcdResult<()> {
        self.transfer(
            Register::Instruction,
            instruction.opcode(),
            instruction.settle_time(),
        )
    }

    fn send_data(&mut self, data: u8) -> LcdResult<()> {
        self.transfer(Register::Data, data, SHORT_DELAY)
    }

    fn transfer(&mut self, register: Register, value: u8, settle: Duration) -> LcdResult<()> {
        trace!("Sending data: {:08b}, RS: {:?}", value, register);

        if let Err(err) = self.strobe(register, value) {
            // The byte may or may not have been latched.
            self.register = None;
            self.address_stale = true;
            return Err(err);
        }
        self.delay.delay(settle);
        Ok(())
    }

    fn strobe(&mut self, register: Register, value: u8) -> LcdResult<()> {
        if self.register != Some(register) {
            match register {
                Register::Instruction => self.transport.select_instruction_register()?,
                Register::Data => self.transport.select_data_register()?,
            }
            self.register = Some(register);
        }

        self.transport.transmit_byte(value)?;
        self.transport.pulse_enable()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{GpioError, GpioResult};
    use std::cell::{Cell, RefCell};

    #[derive(Debug, Copy, Clone, Eq, PartialEq)]
    enum Event {
        SelectInstruction,
        SelectData,
        Transmit(u8),
        Pulse,
        Wait(Duration),
    }

    use Event::*;

    /// Records every primitive with the simulated time it happened at. Serves as both
    /// transport and time source, so waits show up in the same log.
    #[derive(Debug, Default)]
    struct MockBus {
        log: RefCell<Vec<(Duration, Event)>>,
        now: Cell<Duration>,
        fail_transmit: Cell<bool>,
        fail_on: Cell<Option<u8>>,
    }

    impl MockBus {
        fn record(&self, event: Event) {
            self.log.borrow_mut().push((self.now.get(), event));
        }

        fn events(&self) -> Vec<Event> {
            self.log.borrow().iter().map(|&(_, event)| event).collect()
        }

        fn take(&self) -> Vec<Event> {
            let events = self.events();
            self.log.borrow_mut().clear();
            events
        }
    }

    impl HD44780Transport for MockBus {
        fn select_instruction_register(&self) -> GpioResult<()> {
            self.record(SelectInstruction);
            Ok(())
        }

        fn select_data_register(&self) -> GpioResult<()> {
            self.record(SelectData);
            Ok(())
        }

        fn pulse_enable(&self) -> GpioResult<()> {
            self.record(Pulse);
            Ok(())
        }

        fn transmit_byte(&self, value: u8) -> GpioResult<()> {
            if self.fail_transmit.get() || self.fail_on.get() == Some(value) {
                return Err(GpioError::Other("bus fault".into()));
            }
            self.record(Transmit(value));
            Ok(())
        }
    }

    impl Delay for MockBus {
        fn delay(&self, duration: Duration) {
            self.record(Wait(duration));
            self.now.set(self.now.get() + duration);
        }
    }

    fn transmitted(events: &[Event]) -> usize {
        events.iter().filter(|e| matches!(e, Transmit(_))).count()
    }

    fn data_transfer(byte: u8) -> [Event; 3] {
        [Transmit(byte), Pulse, Wait(SHORT_DELAY)]
    }

    fn address_set(address: u8) -> [Event; 4] {
        [SelectInstruction, Transmit(0x80 | address), Pulse, Wait(SHORT_DELAY)]
    }

    #[test]
    fn test_init_sequence() {
        let bus = MockBus::default();
        let lcd = HD44780::new(&bus, &bus, Geometry::default()).unwrap();

        assert_eq!(
            bus.events(),
            vec![
                SelectInstruction,
                Transmit(0x38),
                Pulse,
                Wait(SHORT_DELAY),
                Transmit(0x0C),
                Pulse,
                Wait(SHORT_DELAY),
                Transmit(0x06),
                Pulse,
                Wait(SHORT_DELAY),
                Transmit(0x01),
                Pulse,
                Wait(LONG_DELAY),
            ]
        );
        assert_eq!(bus.now.get(), SHORT_DELAY * 3 + LONG_DELAY);
        assert_eq!(lcd.cursor(), Cursor::default());
        assert_eq!(lcd.row_text(0).unwrap(), " ".repeat(16));
    }

    #[test]
    fn test_long_delay_once_right_after_clear() {
        let bus = MockBus::default();
        HD44780::new(&bus, &bus, Geometry::default()).unwrap();
        let events = bus.events();

        let long_waits: Vec<usize> = events
            .iter()
            .enumerate()
            .filter(|(_, e)| **e == Wait(LONG_DELAY))
            .map(|(i, _)| i)
            .collect();
        assert_eq!(long_waits.len(), 1);
        assert_eq!(&events[long_waits[0] - 2..long_waits[0]], &[Transmit(0x01), Pulse]);
        assert_eq!(transmitted(&events), 4);
    }

    #[test]
    fn test_write_ab_sequence() {
        let bus = MockBus::default();
        let mut lcd = HD44780::new(&bus, &bus, Geometry::default()).unwrap();
        bus.take();
        let start = bus.now.get();

        lcd.write_text("AB").unwrap();

        let log = bus.log.borrow();
        let events: Vec<Event> = log.iter().map(|&(_, e)| e).collect();
        let mut expected = vec![SelectData];
        expected.extend(data_transfer(b'A'));
        expected.extend(data_transfer(b'B'));
        assert_eq!(events, expected);
        // B is only presented after A has settled.
        assert_eq!(log[4], (start + SHORT_DELAY, Transmit(b'B')));
        assert_eq!(lcd.cursor(), Cursor { column: 2, row: 0 });
    }

    #[test]
    fn test_write_empty_is_noop() {
        let bus = MockBus::default();
        let mut lcd = HD44780::new(&bus, &bus, Geometry::default()).unwrap();
        lcd.set_cursor(3, 1).unwrap();
        bus.take();

        lcd.write_text("").unwrap();
        lcd.write_bytes(&[]).unwrap();

        assert!(bus.events().is_empty());
        assert_eq!(lcd.cursor(), Cursor { column: 3, row: 1 });
    }

    #[test]
    fn test_set_cursor_then_write_advances_column() {
        let bus = MockBus::default();
        let mut lcd = HD44780::new(&bus, &bus, Geometry::default()).unwrap();

        for row in 0..2 {
            for column in 0..15 {
                lcd.set_cursor(column, row).unwrap();
                lcd.write_text("X").unwrap();
                assert_eq!(lcd.cursor(), Cursor { column: column + 1, row });
                assert_eq!(lcd.char_at(column, row), Some(b'X'));
            }
        }
    }

    #[test]
    fn test_set_cursor_addresses() {
        let bus = MockBus::default();
        let mut lcd = HD44780::new(&bus, &bus, Geometry::new(20, 4).unwrap()).unwrap();
        bus.take();

        lcd.set_cursor(5, 0).unwrap();
        lcd.set_cursor(0, 1).unwrap();
        lcd.set_cursor(3, 2).unwrap();
        lcd.set_cursor(19, 3).unwrap();

        let mut expected = Vec::new();
        for address in [0x05, 0x40, 0x17, 0x67] {
            expected.extend(address_set(address));
        }
        assert_eq!(bus.events(), expected);
        assert_eq!(lcd.cursor(), Cursor { column: 19, row: 3 });
    }

    #[test]
    fn test_set_cursor_out_of_range_sends_nothing() {
        let bus = MockBus::default();
        let mut lcd = HD44780::new(&bus, &bus, Geometry::default()).unwrap();
        lcd.set_cursor(4, 1).unwrap();
        bus.take();

        assert_eq!(
            lcd.set_cursor(16, 0),
            Err(LcdError::CursorOutOfRange {
                column: 16,
                row: 0,
                width: 16,
                height: 2,
            })
        );
        assert!(matches!(
            lcd.set_cursor(0, 2),
            Err(LcdError::CursorOutOfRange { .. })
        ));
        assert!(bus.events().is_empty());
        assert_eq!(lcd.cursor(), Cursor { column: 4, row: 1 });
    }

    #[test]
    fn test_write_at_row_end_wraps_to_next_row() {
        let bus = MockBus::default();
        let mut lcd = HD44780::new(&bus, &bus, Geometry::default()).unwrap();
        lcd.set_cursor(15, 0).unwrap();
        bus.take();

        lcd.write_text("XY").unwrap();

        let mut expected = vec![SelectData];
        expected.extend(data_transfer(b'X'));
        expected.extend(address_set(0x40));
        expected.push(SelectData);
        expected.extend(data_transfer(b'Y'));
        assert_eq!(bus.events(), expected);
        assert_eq!(lcd.cursor(), Cursor { column: 1, row: 1 });
        assert_eq!(lcd.char_at(15, 0), Some(b'X'));
        assert_eq!(lcd.char_at(0, 1), Some(b'Y'));
    }

    #[test]
    fn test_write_before_row_end_does_not_wrap() {
        let bus = MockBus::default();
        let mut lcd = HD44780::new(&bus, &bus, Geometry::default()).unwrap();
        lcd.set_cursor(14, 0).unwrap();
        bus.take();

        lcd.write_text("X").unwrap();

        assert_eq!(transmitted(&bus.events()), 1);
        assert!(!bus.events().contains(&SelectInstruction));
        assert_eq!(lcd.cursor(), Cursor { column: 15, row: 0 });
    }

    #[test]
    fn test_fill_whole_display_then_overflow() {
        let bus = MockBus::default();
        let mut lcd = HD44780::new(&bus, &bus, Geometry::default()).unwrap();
        let text = "0123456789abcdefghijklmnopqrstuv";
        bus.take();

        lcd.write_text(text).unwrap();

        assert_eq!(transmitted(&bus.events()), 32 + 1);
        assert_eq!(lcd.cursor(), Cursor { column: 16, row: 1 });
        assert_eq!(lcd.row_text(0).unwrap(), "0123456789abcdef");
        assert_eq!(lcd.row_text(1).unwrap(), "ghijklmnopqrstuv");
        bus.take();

        assert_eq!(
            lcd.write_text("!"),
            Err(LcdError::Overflow {
                requested: 1,
                available: 0,
            })
        );
        assert!(bus.events().is_empty());
        assert_eq!(lcd.cursor(), Cursor { column: 16, row: 1 });
    }

    #[test]
    fn test_overflowing_write_sends_nothing() {
        let bus = MockBus::default();
        let mut lcd = HD44780::new(&bus, &bus, Geometry::default()).unwrap();
        lcd.set_cursor(10, 1).unwrap();
        bus.take();

        assert_eq!(
            lcd.write_text("1234567"),
            Err(LcdError::Overflow {
                requested: 7,
                available: 6,
            })
        );
        assert!(bus.events().is_empty());
        assert_eq!(lcd.row_text(1).unwrap(), " ".repeat(16));

        lcd.write_text("123456").unwrap();
        assert_eq!(lcd.cursor(), Cursor { column: 16, row: 1 });
    }

    #[test]
    fn test_clear_resets_cursor_and_buffer() {
        let bus = MockBus::default();
        let mut lcd = HD44780::new(&bus, &bus, Geometry::default()).unwrap();
        lcd.set_cursor(7, 1).unwrap();
        lcd.write_text("hi").unwrap();
        bus.take();

        lcd.clear_display().unwrap();

        assert_eq!(
            bus.events(),
            vec![SelectInstruction, Transmit(0x01), Pulse, Wait(LONG_DELAY)]
        );
        assert_eq!(lcd.cursor(), Cursor::default());
        assert_eq!(lcd.char_at(7, 1), Some(b' '));
    }

    #[test]
    fn test_clear_after_full_display() {
        let bus = MockBus::default();
        let mut lcd = HD44780::new(&bus, &bus, Geometry::new(8, 1).unwrap()).unwrap();
        lcd.write_text("12345678").unwrap();

        lcd.clear_display().unwrap();
        assert_eq!(lcd.cursor(), Cursor::default());
        lcd.write_text("ok").unwrap();
        assert_eq!(lcd.row_text(0).unwrap(), "ok      ");
    }

    #[test]
    fn test_return_home_keeps_contents() {
        let bus = MockBus::default();
        let mut lcd = HD44780::new(&bus, &bus, Geometry::default()).unwrap();
        lcd.write_text("abc").unwrap();
        bus.take();

        lcd.return_home().unwrap();

        assert_eq!(
            bus.events(),
            vec![SelectInstruction, Transmit(0x02), Pulse, Wait(LONG_DELAY)]
        );
        assert_eq!(lcd.cursor(), Cursor::default());
        assert_eq!(lcd.char_at(2, 0), Some(b'c'));
    }

    #[test]
    fn test_new_line() {
        let bus = MockBus::default();
        let mut lcd = HD44780::new(&bus, &bus, Geometry::default()).unwrap();
        lcd.write_text("abc").unwrap();
        bus.take();

        lcd.new_line().unwrap();
        assert_eq!(bus.events(), address_set(0x40).to_vec());
        assert_eq!(lcd.cursor(), Cursor { column: 0, row: 1 });

        bus.take();
        assert!(matches!(
            lcd.new_line(),
            Err(LcdError::CursorOutOfRange { row: 2, .. })
        ));
        assert!(bus.events().is_empty());
    }

    #[test]
    fn test_shift_cursor_within_row() {
        let bus = MockBus::default();
        let mut lcd = HD44780::new(&bus, &bus, Geometry::default()).unwrap();
        bus.take();

        assert_eq!(
            lcd.shift_cursor(CursorDirection::Left),
            Err(LcdError::ShiftOutOfRange {
                direction: CursorDirection::Left,
                cursor: Cursor::default(),
            })
        );
        assert!(bus.events().is_empty());

        lcd.shift_cursor(CursorDirection::Right).unwrap();
        lcd.shift_cursor(CursorDirection::Right).unwrap();
        lcd.shift_cursor(CursorDirection::Left).unwrap();
        assert_eq!(lcd.cursor(), Cursor { column: 1, row: 0 });
        assert_eq!(
            bus.events(),
            vec![
                SelectInstruction,
                Transmit(0x14),
                Pulse,
                Wait(SHORT_DELAY),
                SelectInstruction,
                Transmit(0x14),
                Pulse,
                Wait(SHORT_DELAY),
                SelectInstruction,
                Transmit(0x10),
                Pulse,
                Wait(SHORT_DELAY),
            ]
        );

        lcd.set_cursor(15, 0).unwrap();
        assert!(matches!(
            lcd.shift_cursor(CursorDirection::Right),
            Err(LcdError::ShiftOutOfRange { .. })
        ));
    }

    #[test]
    fn test_shift_left_from_past_the_end() {
        let bus = MockBus::default();
        let mut lcd = HD44780::new(&bus, &bus, Geometry::new(4, 1).unwrap()).unwrap();
        lcd.write_text("abcd").unwrap();

        lcd.shift_cursor(CursorDirection::Left).unwrap();
        assert_eq!(lcd.cursor(), Cursor { column: 3, row: 0 });
        lcd.write_text("D").unwrap();
        assert_eq!(lcd.row_text(0).unwrap(), "abcD");
    }

    #[test]
    fn test_set_display_control() {
        let bus = MockBus::default();
        let mut lcd = HD44780::new(&bus, &bus, Geometry::default()).unwrap();
        bus.take();

        lcd.set_display_control(true, true).unwrap();

        assert_eq!(
            bus.events(),
            vec![SelectInstruction, Transmit(0x0F), Pulse, Wait(SHORT_DELAY)]
        );
    }

    #[test]
    fn test_two_drivers_on_one_bus() {
        let bus = MockBus::default();
        let mut first = HD44780::new(&bus, &bus, Geometry::default()).unwrap();
        let init = bus.take();
        let mut second = HD44780::new(&bus, &bus, Geometry::new(20, 4).unwrap()).unwrap();
        assert_eq!(bus.take(), init);

        let mut expected = vec![SelectData];
        expected.extend(data_transfer(b'A'));
        expected.extend(data_transfer(b'B'));

        first.write_text("AB").unwrap();
        assert_eq!(bus.take(), expected);
        second.write_text("AB").unwrap();
        assert_eq!(bus.take(), expected);

        // The second driver left RS on data; the first must not assume instruction mode.
        first.set_cursor(0, 1).unwrap();
        assert_eq!(bus.take(), address_set(0x40).to_vec());
        assert_eq!(first.cursor(), Cursor { column: 0, row: 1 });
        assert_eq!(second.cursor(), Cursor { column: 2, row: 0 });
    }

    #[test]
    fn test_transport_error_is_propagated() {
        let bus = MockBus::default();
        let mut lcd = HD44780::new(&bus, &bus, Geometry::default()).unwrap();
        bus.fail_transmit.set(true);

        assert_eq!(
            lcd.write_text("A"),
            Err(LcdError::Transport(GpioError::Other("bus fault".into())))
        );
        assert_eq!(lcd.cursor(), Cursor::default());
    }

    #[test]
    fn test_failed_wrap_keeps_cursor_on_screen() {
        let bus = MockBus::default();
        let mut lcd = HD44780::new(&bus, &bus, Geometry::default()).unwrap();
        lcd.set_cursor(15, 0).unwrap();
        bus.fail_on.set(Some(0x80 | 0x40));

        assert!(matches!(lcd.write_text("X"), Err(LcdError::Transport(_))));
        assert_eq!(lcd.cursor(), Cursor { column: 0, row: 1 });
        assert_eq!(lcd.char_at(15, 0), Some(b'X'));

        bus.fail_on.set(None);
        bus.take();
        lcd.write_text("AB").unwrap();

        // The wrap address is sent again before any data.
        let mut expected = address_set(0x40).to_vec();
        expected.push(SelectData);
        expected.extend(data_transfer(b'A'));
        expected.extend(data_transfer(b'B'));
        assert_eq!(bus.events(), expected);
        assert_eq!(lcd.cursor(), Cursor { column: 2, row: 1 });
        assert_eq!(lcd.char_at(0, 1), Some(b'A'));
        assert_eq!(lcd.char_at(1, 1), Some(b'B'));
        assert_eq!(lcd.row_text(0).unwrap(), format!("{}X", " ".repeat(15)));
    }

    #[test]
    fn test_failed_write_resyncs_before_shift() {
        let bus = MockBus::default();
        let mut lcd = HD44780::new(&bus, &bus, Geometry::default()).unwrap();
        lcd.write_text("ab").unwrap();
        bus.fail_on.set(Some(b'c'));

        assert!(lcd.write_text("c").is_err());
        assert_eq!(lcd.cursor(), Cursor { column: 2, row: 0 });

        bus.fail_on.set(None);
        bus.take();
        lcd.shift_cursor(CursorDirection::Left).unwrap();

        let mut expected = address_set(0x02).to_vec();
        expected.extend([Transmit(0x10), Pulse, Wait(SHORT_DELAY)]);
        assert_eq!(bus.events(), expected);
        assert_eq!(lcd.cursor(), Cursor { column: 1, row: 0 });
    }

    #[test]
    fn test_failed_init_returns_error() {
        let bus = MockBus::default();
        bus.fail_transmit.set(true);

        let result = HD44780::new(&bus, &bus, Geometry::default());
        assert!(matches!(result, Err(LcdError::Transport(_))));
        // Nothing is retried.
        assert_eq!(bus.events(), vec![SelectInstruction]);
    }

    #[test]
    fn test_non_latin1_is_replaced() {
        let bus = MockBus::default();
        let mut lcd = HD44780::new(&bus, &bus, Geometry::default()).unwrap();
        bus.take();

        lcd.write_text("é€").unwrap();

        let mut expected = vec![SelectData];
        expected.extend(data_transfer(0xE9));
        expected.extend(data_transfer(b'?'));
        assert_eq!(bus.events(), expected);
        assert_eq!(lcd.cursor(), Cursor { column: 2, row: 0 });
    }

    #[test]
    fn test_geometry_validation() {
        assert_eq!(Geometry::default(), Geometry::new(16, 2).unwrap());
        assert!(Geometry::new(40, 2).is_ok());
        assert!(Geometry::new(20, 4).is_ok());
        assert!(Geometry::new(1, 1).is_ok());
        for (width, height) in [(0, 2), (16, 0), (41, 1), (21, 4), (16, 5)] {
            assert_eq!(
                Geometry::new(width, height),
                Err(LcdError::InvalidGeometry { width, height })
            );
        }
    }

    #[test]
    fn test_row_addresses() {
        let geometry = Geometry::new(16, 4).unwrap();
        assert_eq!(geometry.row_address(0), 0x00);
        assert_eq!(geometry.row_address(1), 0x40);
        assert_eq!(geometry.row_address(2), 0x10);
        assert_eq!(geometry.row_address(3), 0x50);
    }

    #[test]
    fn test_buffer_accessors_out_of_range() {
        let bus = MockBus::default();
        let lcd = HD44780::new(&bus, &bus, Geometry::default()).unwrap();
        assert_eq!(lcd.char_at(16, 0), None);
        assert_eq!(lcd.char_at(0, 2), None);
        assert_eq!(lcd.row_text(2), None);
    }
}
