//! PXP driver configuration.
//!
//! Opacity constants follow the 0..=255 scale used by the graphics stack.
//! Values at or above [`OPA_MAX`] are treated as fully opaque.

use core::time::Duration;

use crate::color::{Color, ColorDepth};
use crate::device::{AsPixelFormat, BlockSize, OutputPixelFormat, PsPixelFormat};
use crate::PxpError;

/// Fully transparent.
pub const OPA_TRANSP: u8 = 0;

/// Below this opacity nothing is drawn.
pub const OPA_MIN: u8 = 2;

/// At or above this opacity a layer is drawn as opaque.
pub const OPA_MAX: u8 = 253;

/// Fully opaque.
pub const OPA_COVER: u8 = 255;

/// Default chroma key (pure green).
pub const DEFAULT_CHROMA_KEY: Color = Color::from_hex(0x00ff00);

/// Accelerator configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PxpConfig {
    /// Color depth of every buffer the PXP touches.
    pub color_depth: ColorDepth,
    /// Processing block size.
    pub block_size: BlockSize,
    /// Keep color space converter 1 disabled (it is on after reset).
    pub disable_csc1: bool,
    /// Interrupt priority, left untouched when `None`.
    pub irq_priority: Option<u8>,
    /// Whether the process surface accepts ARGB8888. Older PXP revisions
    /// only read RGB888 there.
    pub ps_extended_formats: bool,
    /// Color treated as transparent by chroma-keyed images.
    pub chroma_key: Color,
    /// Upper bound on waiting for a job, unbounded when `None`.
    pub wait_timeout: Option<Duration>,
}

impl Default for PxpConfig {
    fn default() -> Self {
        PxpConfig {
            color_depth: ColorDepth::Argb8888,
            block_size: BlockSize::Size16,
            disable_csc1: true,
            irq_priority: None,
            ps_extended_formats: true,
            chroma_key: DEFAULT_CHROMA_KEY,
            wait_timeout: None,
        }
    }
}

impl PxpConfig {
    /// Set the color depth.
    pub fn with_color_depth(mut self, depth: ColorDepth) -> Self {
        self.color_depth = depth;
        self
    }

    /// Set the processing block size.
    pub fn with_block_size(mut self, size: BlockSize) -> Self {
        self.block_size = size;
        self
    }

    /// Set the interrupt priority.
    pub fn with_irq_priority(mut self, priority: u8) -> Self {
        self.irq_priority = Some(priority);
        self
    }

    /// Declare whether the process surface supports ARGB8888.
    pub fn with_ps_extended_formats(mut self, supported: bool) -> Self {
        self.ps_extended_formats = supported;
        self
    }

    /// Set the chroma key color.
    pub fn with_chroma_key(mut self, key: Color) -> Self {
        self.chroma_key = key;
        self
    }

    /// Bound every wait by `timeout`.
    pub fn with_wait_timeout(mut self, timeout: Duration) -> Self {
        self.wait_timeout = Some(timeout);
        self
    }

    /// Reject inconsistent settings.
    pub fn validate(&self) -> Result<(), PxpError> {
        if self.wait_timeout == Some(Duration::ZERO) {
            return Err(PxpError::Config("wait timeout must be non-zero"));
        }
        Ok(())
    }

    /// Output buffer format for the configured depth.
    pub fn output_format(&self) -> OutputPixelFormat {
        match self.color_depth {
            ColorDepth::Rgb565 => OutputPixelFormat::Rgb565,
            ColorDepth::Argb8888 => OutputPixelFormat::Argb8888,
        }
    }

    /// Alpha surface format for the configured depth.
    pub fn as_format(&self) -> AsPixelFormat {
        match self.color_depth {
            ColorDepth::Rgb565 => AsPixelFormat::Rgb565,
            ColorDepth::Argb8888 => AsPixelFormat::Argb8888,
        }
    }

    /// Process surface format for the configured depth.
    pub fn ps_format(&self) -> PsPixelFormat {
        match (self.color_depth, self.ps_extended_formats) {
            (ColorDepth::Rgb565, _) => PsPixelFormat::Rgb565,
            (ColorDepth::Argb8888, true) => PsPixelFormat::Argb8888,
            (ColorDepth::Argb8888, false) => PsPixelFormat::Rgb888,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = PxpConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.block_size, BlockSize::Size16);
        assert_eq!(config.ps_format(), PsPixelFormat::Argb8888);
    }

    #[test]
    fn test_legacy_ps_format() {
        let config = PxpConfig::default().with_ps_extended_formats(false);
        assert_eq!(config.ps_format(), PsPixelFormat::Rgb888);

        let config = config.with_color_depth(ColorDepth::Rgb565);
        assert_eq!(config.ps_format(), PsPixelFormat::Rgb565);
        assert_eq!(config.output_format(), OutputPixelFormat::Rgb565);
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let config = PxpConfig::default().with_wait_timeout(Duration::ZERO);
        assert!(matches!(config.validate(), Err(PxpError::Config(_))));
    }
}
