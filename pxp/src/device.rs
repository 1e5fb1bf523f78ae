//! Register-level PXP interface.
//!
//! The platform provides an implementation of [`PxpDevice`] that writes the
//! configuration structures below into the PXP register block. Methods take
//! `&self` because they model MMIO writes and must be callable from the
//! completion interrupt while the owner still holds the device.

/// Physical address of a pixel buffer as seen by the PXP.
pub type PhysAddr = usize;

bitflags::bitflags! {
    /// PXP status flags.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct StatusFlags: u32 {
        /// Processing of the current frame is complete.
        const COMPLETE = 1 << 0;
        /// AXI write error.
        const AXI0_WRITE_ERROR = 1 << 1;
        /// AXI read error.
        const AXI0_READ_ERROR = 1 << 2;
        /// Next command register became available.
        const NEXT_IRQ = 1 << 3;
    }
}

bitflags::bitflags! {
    /// PXP interrupt enables.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct InterruptEnable: u32 {
        /// Raise an interrupt on frame completion.
        const COMPLETE = 1 << 1;
        /// Raise an interrupt when the next command is consumed.
        const COMMAND_LOADED = 1 << 2;
    }
}

/// Processing block size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockSize {
    /// 8x8 pixel blocks.
    Size8,
    /// 16x16 pixel blocks.
    Size16,
}

/// Output buffer pixel formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputPixelFormat {
    Rgb565,
    Argb8888,
}

/// Alpha surface pixel formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AsPixelFormat {
    Rgb565,
    Argb8888,
}

/// Process surface pixel formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PsPixelFormat {
    Rgb565,
    Rgb888,
    Argb8888,
}

/// Output interlacing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterlacedMode {
    Progressive,
    Field0,
    Field1,
    Interlaced,
}

/// Output buffer configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutputBufferConfig {
    pub pixel_format: OutputPixelFormat,
    pub interlaced_mode: InterlacedMode,
    pub buffer0_addr: PhysAddr,
    pub buffer1_addr: PhysAddr,
    pub pitch_bytes: u32,
    pub width: u16,
    pub height: u16,
}

/// Alpha surface (AS) buffer configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AsBufferConfig {
    pub pixel_format: AsPixelFormat,
    pub buffer_addr: PhysAddr,
    pub pitch_bytes: u32,
}

/// Process surface (PS) buffer configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PsBufferConfig {
    pub pixel_format: PsPixelFormat,
    pub swap_byte: bool,
    pub buffer_addr: PhysAddr,
    pub buffer_addr_u: PhysAddr,
    pub buffer_addr_v: PhysAddr,
    pub pitch_bytes: u32,
}

/// How the AS alpha is obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlphaMode {
    /// Use the alpha embedded in the pixels.
    Embedded,
    /// Replace pixel alpha with the global alpha.
    Override,
    /// Multiply pixel alpha by the global alpha.
    Multiply,
    /// Combine AS and PS with a raster operation.
    Rop,
}

/// Raster operations available in [`AlphaMode::Rop`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RopMode {
    MaskAs,
    MaskNotAs,
    MaskAsNot,
    MergeAs,
    MergeNotAs,
    MergeAsNot,
    NotCopyAs,
    Not,
    NotMaskAs,
    NotMergeAs,
    XorAs,
    NotXorAs,
}

/// AS blending configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AsBlendConfig {
    pub alpha: u8,
    pub invert_alpha: bool,
    pub alpha_mode: AlphaMode,
    pub rop_mode: RopMode,
}

/// Porter-Duff color mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PorterDuffColorMode {
    NoAlpha,
    WithAlpha,
}

/// Porter-Duff global alpha selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PorterDuffGlobalAlphaMode {
    Global,
    Local,
    Scaled,
}

/// Porter-Duff blend factor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PorterDuffFactorMode {
    One,
    Zero,
    Straight,
    Inversed,
}

/// Porter-Duff alpha polarity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PorterDuffAlphaMode {
    Straight,
    Inversed,
}

/// Porter-Duff blender configuration.
///
/// The vendor header swaps the meaning of the factor fields: `src_factor_mode`
/// applies to the PS alpha and `dst_factor_mode` to the AS alpha.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PorterDuffConfig {
    pub enable: bool,
    pub dst_color_mode: PorterDuffColorMode,
    pub src_color_mode: PorterDuffColorMode,
    pub dst_global_alpha_mode: PorterDuffGlobalAlphaMode,
    pub src_global_alpha_mode: PorterDuffGlobalAlphaMode,
    pub dst_factor_mode: PorterDuffFactorMode,
    pub src_factor_mode: PorterDuffFactorMode,
    pub dst_global_alpha: u8,
    pub src_global_alpha: u8,
    pub dst_alpha_mode: PorterDuffAlphaMode,
    pub src_alpha_mode: PorterDuffAlphaMode,
}

/// Which stage the rotation applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RotatePosition {
    OutputBuffer,
    ProcessSurface,
}

/// Hardware rotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rotation {
    Rotate0,
    Rotate90,
    Rotate180,
    Rotate270,
}

/// Hardware flip.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flip {
    Disable,
    Horizontal,
    Vertical,
    Both,
}

/// Picture copy command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PicCopyConfig {
    pub src_pic_base_addr: PhysAddr,
    pub src_pitch_bytes: u32,
    pub src_offset_x: u16,
    pub src_offset_y: u16,
    pub dest_pic_base_addr: PhysAddr,
    pub dest_pitch_bytes: u32,
    pub dest_offset_x: u16,
    pub dest_offset_y: u16,
    pub width: u16,
    pub height: u16,
    pub pixel_format: AsPixelFormat,
}

/// Surface position that disables a surface.
pub const SURFACE_DISABLED: SurfacePosition = SurfacePosition {
    upper_left_x: 0xffff,
    upper_left_y: 0xffff,
    lower_right_x: 0,
    lower_right_y: 0,
};

/// Inclusive surface position within the output frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SurfacePosition {
    pub upper_left_x: u16,
    pub upper_left_y: u16,
    pub lower_right_x: u16,
    pub lower_right_y: u16,
}

impl SurfacePosition {
    /// Surface covering `width` x `height` pixels from the frame origin.
    pub const fn sized(width: u16, height: u16) -> Self {
        SurfacePosition {
            upper_left_x: 0,
            upper_left_y: 0,
            lower_right_x: width - 1,
            lower_right_y: height - 1,
        }
    }
}

/// PXP register interface.
pub trait PxpDevice: Send + Sync {
    /// Bring the block out of reset and apply power-on defaults.
    fn init(&self);

    /// Reset the control registers, keeping the block powered.
    fn reset_control(&self);

    /// Enable or disable color space converter 1.
    fn enable_csc1(&self, enable: bool);

    /// Set the processing block size.
    fn set_process_block_size(&self, size: BlockSize);

    /// Enable interrupts.
    fn enable_interrupts(&self, mask: InterruptEnable);

    /// Disable interrupts.
    fn disable_interrupts(&self, mask: InterruptEnable);

    /// Read the status flags.
    fn status_flags(&self) -> StatusFlags;

    /// Clear status flags.
    fn clear_status_flags(&self, flags: StatusFlags);

    /// Start processing with the current configuration.
    fn start(&self);

    fn set_output_buffer_config(&self, config: &OutputBufferConfig);

    fn set_alpha_surface_buffer_config(&self, config: &AsBufferConfig);

    fn set_alpha_surface_position(&self, position: SurfacePosition);

    fn set_alpha_surface_blend_config(&self, config: &AsBlendConfig);

    /// Enable chroma keying on the alpha surface.
    fn enable_alpha_surface_overlay_color_key(&self, enable: bool);

    /// Set the inclusive chroma key range as 32-bit colors.
    fn set_alpha_surface_overlay_color_key(&self, low: u32, high: u32);

    fn set_process_surface_buffer_config(&self, config: &PsBufferConfig);

    fn set_process_surface_position(&self, position: SurfacePosition);

    /// Color generated where the process surface is disabled.
    fn set_process_surface_background_color(&self, color: u32);

    fn set_porter_duff_config(&self, config: &PorterDuffConfig);

    fn set_rotate_config(&self, position: RotatePosition, rotation: Rotation, flip: Flip);

    /// Program and start a plain rectangle copy.
    fn start_picture_copy(&self, config: &PicCopyConfig);
}
