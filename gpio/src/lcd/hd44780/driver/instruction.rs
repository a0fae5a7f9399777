use std::time::Duration;

/// Settling time after every instruction or data write except clear/return-home.
///
/// The datasheet gives 37 µs (45 µs at the slowest oscillator), rounded up.
pub const SHORT_DELAY: Duration = Duration::from_micros(50);

/// Settling time after clear-display and return-home. The datasheet gives 1.52 ms, rounded up.
pub const LONG_DELAY: Duration = Duration::from_millis(2);

/// The subset of the HD44780 instruction set used by [HD44780](super::HD44780).
///
/// Bit layouts follow the datasheet (instruction table, page 24).
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Instruction {
    /// `00000001`: clears DDRAM and sets the address counter to 0.
    ClearDisplay,
    /// `00000010`: sets the address counter to 0 and undoes any display shift.
    ReturnHome,
    /// `000001IS` with I = 1 (increment), S = 0 (no display shift).
    EntryModeSet,
    /// `00001DCB` with D = 1 (display on).
    DisplayOn { cursor: bool, blink: bool },
    /// `00010000`: moves the cursor one cell to the left.
    CursorShiftLeft,
    /// `00010100`: moves the cursor one cell to the right.
    CursorShiftRight,
    /// `001DNF00` with DL = 1 (8-bit bus), N = 1 (two lines), F = 0 (5×8 dots).
    FunctionSet,
    /// `1AAAAAAA`: sets the DDRAM address, i.e. moves the cursor.
    SetDdramAddress(u8),
}

impl Instruction {
    pub const fn opcode(self) -> u8 {
        match self {
            Instruction::ClearDisplay => 0b0000_0001,
            Instruction::ReturnHome => 0b0000_0010,
            Instruction::EntryModeSet => 0b0000_0110,
            Instruction::DisplayOn { cursor, blink } => {
                0b0000_1100 | ((cursor as u8) << 1) | blink as u8
            }
            Instruction::CursorShiftLeft => 0b0001_0000,
            Instruction::CursorShiftRight => 0b0001_0100,
            Instruction::FunctionSet => 0b0011_1000,
            Instruction::SetDdramAddress(address) => 0b1000_0000 | (address & 0b0111_1111),
        }
    }

    /// How long the controller needs before it accepts the next transfer.
    pub const fn settle_time(self) -> Duration {
        match self {
            Instruction::ClearDisplay | Instruction::ReturnHome => LONG_DELAY,
            _ => SHORT_DELAY,
        }
    }
}
