use crate::GpioError;
use crate::lcd::hd44780::driver::{Cursor, CursorDirection};
use thiserror::Error;

#[derive(Debug, Error, Eq, PartialEq, Clone)]
pub enum LcdError {
    /// The geometry cannot be addressed by the controller's 80 bytes of display RAM.
    #[error("invalid display geometry {width}x{height}")]
    InvalidGeometry { width: usize, height: usize },
    /// Nothing was sent to the display.
    #[error("cursor position ({column}, {row}) is outside of the {width}x{height} display")]
    CursorOutOfRange {
        column: usize,
        row: usize,
        width: usize,
        height: usize,
    },
    /// Nothing was sent to the display.
    #[error("cannot move the cursor {direction:?} from {cursor}")]
    ShiftOutOfRange {
        direction: CursorDirection,
        cursor: Cursor,
    },
    /// Nothing was sent to the display.
    #[error("{requested} characters do not fit into the {available} remaining cells")]
    Overflow { requested: usize, available: usize },
    /// The transport failed mid-operation. Whatever was latched before stays on the display.
    #[error("transport error: {0}")]
    Transport(#[from] GpioError),
}

pub type LcdResult<T> = Result<T, LcdError>;
