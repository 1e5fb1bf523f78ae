//! Color handling for the PXP pixel formats.
//!
//! Colors are specified as 8-bit RGB. The hardware works in the native
//! channel widths of the configured color depth, so color-key math is
//! done on [`NativeColor`] values and widened back to 32-bit register
//! values with [`ColorDepth::to_register`].

/// Framebuffer color depth.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorDepth {
    /// 16-bit RGB 5:6:5.
    Rgb565,
    /// 32-bit ARGB 8:8:8:8.
    Argb8888,
}

impl ColorDepth {
    /// Get bytes per pixel.
    pub const fn bytes_per_pixel(&self) -> u32 {
        match self {
            ColorDepth::Rgb565 => 2,
            ColorDepth::Argb8888 => 4,
        }
    }

    /// Largest value of each native channel (red, green, blue).
    pub const fn channel_max(&self) -> NativeColor {
        match self {
            ColorDepth::Rgb565 => NativeColor { red: 0x1f, green: 0x3f, blue: 0x1f },
            ColorDepth::Argb8888 => NativeColor { red: 0xff, green: 0xff, blue: 0xff },
        }
    }

    /// Reduce an 8-bit color to native channel widths.
    pub const fn native(&self, color: Color) -> NativeColor {
        match self {
            ColorDepth::Rgb565 => NativeColor {
                red: color.red >> 3,
                green: color.green >> 2,
                blue: color.blue >> 3,
            },
            ColorDepth::Argb8888 => NativeColor {
                red: color.red,
                green: color.green,
                blue: color.blue,
            },
        }
    }

    /// Expand a native color to the 32-bit ARGB value the registers expect.
    pub fn to_register(&self, color: NativeColor) -> u32 {
        let (r, g, b) = match self {
            ColorDepth::Rgb565 => (
                (color.red as u32 * 263 + 7) >> 5,
                (color.green as u32 * 259 + 3) >> 6,
                (color.blue as u32 * 263 + 7) >> 5,
            ),
            ColorDepth::Argb8888 => (color.red as u32, color.green as u32, color.blue as u32),
        };
        0xff00_0000 | (r << 16) | (g << 8) | b
    }

    /// Register value of an 8-bit color at this depth.
    pub fn pack(&self, color: Color) -> u32 {
        self.to_register(self.native(color))
    }

    /// Mix two native colors; `ratio` is the weight of `fg` (255 = only `fg`).
    pub fn mix(&self, fg: NativeColor, bg: NativeColor, ratio: u8) -> NativeColor {
        let round = match self {
            ColorDepth::Rgb565 => 128,
            ColorDepth::Argb8888 => 0,
        };
        let ch = |a: u8, b: u8| -> u8 {
            let sum = a as u32 * ratio as u32 + b as u32 * (255 - ratio as u32) + round;
            udiv255(sum) as u8
        };
        NativeColor {
            red: ch(fg.red, bg.red),
            green: ch(fg.green, bg.green),
            blue: ch(fg.blue, bg.blue),
        }
    }
}

/// Fast division by 255 for values up to 255 * 255 + 255.
#[inline]
fn udiv255(x: u32) -> u32 {
    (x * 0x8081) >> 23
}

/// 8-bit RGB color.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Color {
    pub red: u8,
    pub green: u8,
    pub blue: u8,
}

impl Color {
    /// Black.
    pub const BLACK: Color = Color::from_hex(0x000000);
    /// White.
    pub const WHITE: Color = Color::from_hex(0xffffff);

    /// Create a color from channels.
    pub const fn new(red: u8, green: u8, blue: u8) -> Self {
        Color { red, green, blue }
    }

    /// Create a color from a `0xRRGGBB` value.
    pub const fn from_hex(hex: u32) -> Self {
        Color {
            red: ((hex >> 16) & 0xff) as u8,
            green: ((hex >> 8) & 0xff) as u8,
            blue: (hex & 0xff) as u8,
        }
    }
}

/// Color in the channel widths of a [`ColorDepth`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NativeColor {
    pub red: u8,
    pub green: u8,
    pub blue: u8,
}
