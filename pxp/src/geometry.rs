//! Points and inclusive rectangular areas.

use crate::PxpError;

/// A point in buffer coordinates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Point {
    /// X coordinate.
    pub x: i32,
    /// Y coordinate.
    pub y: i32,
}

impl Point {
    /// Create a new point.
    pub const fn new(x: i32, y: i32) -> Self {
        Point { x, y }
    }
}

/// Rectangular area with inclusive corners, relative to a buffer origin.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Area {
    /// Left column.
    pub x1: i32,
    /// Top row.
    pub y1: i32,
    /// Right column, inclusive.
    pub x2: i32,
    /// Bottom row, inclusive.
    pub y2: i32,
}

impl Area {
    /// Create an area from its corners.
    pub const fn new(x1: i32, y1: i32, x2: i32, y2: i32) -> Self {
        Area { x1, y1, x2, y2 }
    }

    /// Create an area from an origin and a size.
    pub const fn with_size(x: i32, y: i32, width: i32, height: i32) -> Self {
        Area {
            x1: x,
            y1: y,
            x2: x + width - 1,
            y2: y + height - 1,
        }
    }

    /// Width in pixels.
    pub const fn width(&self) -> i32 {
        self.x2 - self.x1 + 1
    }

    /// Height in pixels.
    pub const fn height(&self) -> i32 {
        self.y2 - self.y1 + 1
    }

    /// Translate the area.
    pub fn translate(&mut self, dx: i32, dy: i32) {
        self.x1 += dx;
        self.y1 += dy;
        self.x2 += dx;
        self.y2 += dy;
    }

    /// Same origin with width and height exchanged.
    pub const fn transposed(&self) -> Self {
        Area::with_size(self.x1, self.y1, self.height(), self.width())
    }

    /// Check that the area can be handed to the hardware.
    ///
    /// The PXP addresses pixels from the buffer start, so the origin must
    /// not be negative and the size must fit its 16-bit position registers.
    pub fn validate(&self) -> Result<(), PxpError> {
        let w = self.width();
        let h = self.height();
        if self.x1 < 0 || self.y1 < 0 || w <= 0 || h <= 0 {
            return Err(PxpError::InvalidArea);
        }
        if w > u16::MAX as i32 || h > u16::MAX as i32 {
            return Err(PxpError::InvalidArea);
        }
        Ok(())
    }
}
