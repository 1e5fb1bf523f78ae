//! Compositing operations.
//!
//! Fill, blit and buffer copy on top of the PXP surfaces:
//!
//! - AS (alpha surface): the source image.
//! - PS (process surface): the background. When disabled its background
//!   color register acts as a solid color generator.
//! - OUT: the output buffer.
//!
//! Every operation waits for the previous job in [`Pxp::reset`]. Fills and
//! blits return with their job in flight; [`Pxp::buffer_copy`] waits.
//! Buffers are plain addresses, the caller must keep them alive and
//! untouched until the job that uses them has completed.

use crate::color::Color;
use crate::config::{OPA_COVER, OPA_MAX, OPA_MIN, OPA_TRANSP};
use crate::device::{
    AlphaMode, AsBlendConfig, AsBufferConfig, Flip, InterlacedMode, OutputBufferConfig,
    PhysAddr, PicCopyConfig, PorterDuffAlphaMode, PorterDuffColorMode, PorterDuffConfig,
    PorterDuffFactorMode, PorterDuffGlobalAlphaMode, PsBufferConfig, PxpDevice, RopMode,
    RotatePosition, Rotation, SurfacePosition, SURFACE_DISABLED,
};
use crate::geometry::{Area, Point};
use crate::irq::IrqLine;
use crate::pxp::Pxp;
use crate::signal::CompletionSignal;
use crate::PxpError;

/// A pixel buffer in PXP-visible memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelBuf {
    /// Address of the first pixel.
    pub addr: PhysAddr,
    /// Row stride in pixels.
    pub stride: u32,
}

impl PixelBuf {
    /// Describe a buffer at `addr`.
    pub const fn new(addr: PhysAddr, stride: u32) -> Self {
        PixelBuf { addr, stride }
    }

    /// Describe the buffer backing `pixels`.
    pub fn from_slice<T>(pixels: &[T], stride: u32) -> Self {
        PixelBuf {
            addr: pixels.as_ptr() as PhysAddr,
            stride,
        }
    }
}

/// Display rotation applied to a plain blit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayRotation {
    None,
    Rotate90,
    Rotate180,
    Rotate270,
}

impl DisplayRotation {
    fn hw(self) -> Rotation {
        match self {
            DisplayRotation::None => Rotation::Rotate0,
            DisplayRotation::Rotate90 => Rotation::Rotate90,
            DisplayRotation::Rotate180 => Rotation::Rotate180,
            DisplayRotation::Rotate270 => Rotation::Rotate270,
        }
    }
}

/// Source image color format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorFormat {
    /// Native pixels without alpha.
    TrueColor,
    /// Native pixels with per-pixel alpha.
    TrueColorAlpha,
    /// Native pixels where the chroma key color is transparent.
    TrueColorChromaKeyed,
}

impl ColorFormat {
    /// Whether pixels carry their own alpha.
    pub fn has_alpha(&self) -> bool {
        matches!(self, ColorFormat::TrueColorAlpha)
    }

    /// Whether the chroma key color is transparent.
    pub fn is_chroma_keyed(&self) -> bool {
        matches!(self, ColorFormat::TrueColorChromaKeyed)
    }
}

/// How an image is drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageDescriptor {
    /// Rotation in tenths of a degree. The PXP handles 0, 900, 1800 and 2700.
    pub angle: u16,
    /// Rotation pivot relative to the image.
    pub pivot: Point,
    /// Image opacity.
    pub opa: u8,
    /// Color mixed into the image.
    pub recolor: Color,
    /// Strength of the recoloring.
    pub recolor_opa: u8,
}

impl Default for ImageDescriptor {
    fn default() -> Self {
        ImageDescriptor {
            angle: 0,
            pivot: Point::new(0, 0),
            opa: OPA_COVER,
            recolor: Color::BLACK,
            recolor_opa: OPA_TRANSP,
        }
    }
}

impl ImageDescriptor {
    /// Set the rotation and its pivot.
    pub fn with_rotation(mut self, angle: u16, pivot: Point) -> Self {
        self.angle = angle;
        self.pivot = pivot;
        self
    }

    /// Set the opacity.
    pub fn with_opa(mut self, opa: u8) -> Self {
        self.opa = opa;
        self
    }

    /// Set the recoloring.
    pub fn with_recolor(mut self, color: Color, opa: u8) -> Self {
        self.recolor = color;
        self.recolor_opa = opa;
        self
    }

    /// Whether a recolor tint is applied.
    pub fn has_recolor(&self) -> bool {
        self.recolor_opa != OPA_TRANSP
    }

    /// Whether the image is rotated.
    pub fn has_rotation(&self) -> bool {
        self.angle != 0
    }
}

/// Bytes of a `side` x `side` scratch image. The PXP addresses 32 bits.
fn scratch_len(side: i32, bytes_per_pixel: u32) -> Result<usize, PxpError> {
    let side = u64::try_from(side).map_err(|_| PxpError::InvalidArea)?;
    let len = side
        .checked_mul(side)
        .and_then(|len| len.checked_mul(u64::from(bytes_per_pixel)))
        .filter(|&len| len <= u64::from(u32::MAX))
        .ok_or(PxpError::InvalidArea)?;
    usize::try_from(len).map_err(|_| PxpError::InvalidArea)
}

/// Hardware rotation for `angle` and the output shift that keeps `pivot`
/// in place for a `width` x `height` image.
pub fn rotation_for(angle: u16, pivot: Point, width: i32, height: i32) -> Result<(Rotation, i32, i32), PxpError> {
    match angle {
        0 => Ok((Rotation::Rotate0, 0, 0)),
        900 => Ok((Rotation::Rotate90, pivot.x + pivot.y - height, pivot.y - pivot.x)),
        1800 => Ok((Rotation::Rotate180, 2 * pivot.x - width, 2 * pivot.y - height)),
        2700 => Ok((Rotation::Rotate270, pivot.x - pivot.y, pivot.x + pivot.y - width)),
        _ => Err(PxpError::Unsupported("rotation must be a multiple of 90 degrees")),
    }
}

fn coord(value: i32) -> Result<u16, PxpError> {
    u16::try_from(value).map_err(|_| PxpError::InvalidArea)
}

impl<D, I, S> Pxp<D, I, S>
where
    D: PxpDevice + 'static,
    I: IrqLine,
    S: CompletionSignal + 'static,
{
    fn bytes_per_pixel(&self) -> u32 {
        self.config().color_depth.bytes_per_pixel()
    }

    fn pitch(&self, buf: PixelBuf) -> u32 {
        buf.stride * self.bytes_per_pixel()
    }

    /// Address of the top-left pixel of `area`. The area must be validated.
    fn pixel_addr(&self, buf: PixelBuf, area: &Area) -> PhysAddr {
        let offset = buf.stride as usize * area.y1 as usize + area.x1 as usize;
        buf.addr + offset * self.bytes_per_pixel() as usize
    }

    fn output_config(&self, dest: PixelBuf, area: &Area, width: i32, height: i32) -> Result<OutputBufferConfig, PxpError> {
        Ok(OutputBufferConfig {
            pixel_format: self.config().output_format(),
            interlaced_mode: InterlacedMode::Progressive,
            buffer0_addr: self.pixel_addr(dest, area),
            buffer1_addr: 0,
            pitch_bytes: self.pitch(dest),
            width: coord(width)?,
            height: coord(height)?,
        })
    }

    fn as_buffer_config(&self, src: PixelBuf, area: &Area) -> AsBufferConfig {
        AsBufferConfig {
            pixel_format: self.config().as_format(),
            buffer_addr: self.pixel_addr(src, area),
            pitch_bytes: self.pitch(src),
        }
    }

    fn ps_buffer_config(&self, buf: PixelBuf, area: &Area) -> PsBufferConfig {
        PsBufferConfig {
            pixel_format: self.config().ps_format(),
            swap_byte: false,
            buffer_addr: self.pixel_addr(buf, area),
            buffer_addr_u: 0,
            buffer_addr_v: 0,
            pitch_bytes: self.pitch(buf),
        }
    }

    fn position(area: &Area) -> Result<SurfacePosition, PxpError> {
        Ok(SurfacePosition::sized(coord(area.width())?, coord(area.height())?))
    }

    /// Fill `dest_area` with `color` at opacity `opa`.
    pub fn fill(&mut self, dest: PixelBuf, dest_area: &Area, color: Color, opa: u8) -> Result<(), PxpError> {
        dest_area.validate()?;
        if opa < OPA_MIN {
            return Ok(());
        }
        let output = self.output_config(dest, dest_area, dest_area.width(), dest_area.height())?;
        let position = Self::position(dest_area)?;

        self.reset()?;
        let device = self.device();
        device.set_output_buffer_config(&output);

        if opa >= OPA_MAX {
            device.set_alpha_surface_position(SURFACE_DISABLED);
        } else {
            // Blend against the destination: AS reads what OUT overwrites.
            device.set_alpha_surface_buffer_config(&AsBufferConfig {
                pixel_format: self.config().as_format(),
                buffer_addr: output.buffer0_addr,
                pitch_bytes: output.pitch_bytes,
            });
            device.set_alpha_surface_position(position);
        }

        device.set_process_surface_position(SURFACE_DISABLED);
        device.set_process_surface_background_color(self.config().color_depth.pack(color));

        device.set_porter_duff_config(&PorterDuffConfig {
            enable: true,
            dst_color_mode: PorterDuffColorMode::NoAlpha,
            src_color_mode: PorterDuffColorMode::NoAlpha,
            dst_global_alpha_mode: PorterDuffGlobalAlphaMode::Global,
            src_global_alpha_mode: PorterDuffGlobalAlphaMode::Global,
            dst_factor_mode: PorterDuffFactorMode::Straight,
            src_factor_mode: if opa >= OPA_MAX {
                PorterDuffFactorMode::Straight
            } else {
                PorterDuffFactorMode::Inversed
            },
            dst_global_alpha: opa,
            src_global_alpha: opa,
            dst_alpha_mode: PorterDuffAlphaMode::Straight,
            src_alpha_mode: PorterDuffAlphaMode::Straight,
        });

        log::trace!("PXP fill {:?} opa {}", dest_area, opa);
        self.run()
    }

    /// Copy `src_area` onto `dest_area` at opacity `opa`, rotating the
    /// output by `rotation`.
    pub fn blit(
        &mut self,
        dest: PixelBuf,
        dest_area: &Area,
        src: PixelBuf,
        src_area: &Area,
        opa: u8,
        rotation: DisplayRotation,
    ) -> Result<(), PxpError> {
        dest_area.validate()?;
        src_area.validate()?;
        if opa < OPA_MIN {
            return Ok(());
        }
        let output = self.output_config(dest, dest_area, dest_area.width(), dest_area.height())?;

        self.reset()?;
        let device = self.device();
        device.set_rotate_config(RotatePosition::OutputBuffer, rotation.hw(), Flip::Disable);

        let mut blend = AsBlendConfig {
            alpha: opa,
            invert_alpha: false,
            alpha_mode: AlphaMode::Rop,
            rop_mode: RopMode::MergeAs,
        };

        if opa >= OPA_MAX {
            device.set_process_surface_position(SURFACE_DISABLED);
        } else {
            blend.alpha_mode = AlphaMode::Override;
            device.set_process_surface_buffer_config(&self.ps_buffer_config(dest, dest_area));
            device.set_process_surface_position(Self::position(dest_area)?);
        }

        device.set_alpha_surface_buffer_config(&self.as_buffer_config(src, src_area));
        device.set_alpha_surface_position(Self::position(src_area)?);
        device.set_alpha_surface_blend_config(&blend);
        device.enable_alpha_surface_overlay_color_key(false);
        device.set_output_buffer_config(&output);

        log::trace!("PXP blit {:?} -> {:?} opa {} {:?}", src_area, dest_area, opa, rotation);
        self.run()
    }

    /// Copy `src_area` onto `dest_area` applying the rotation, recoloring,
    /// opacity and color format of `image`.
    pub fn blit_transform(
        &mut self,
        dest: PixelBuf,
        dest_area: &Area,
        src: PixelBuf,
        src_area: &Area,
        image: &ImageDescriptor,
        format: ColorFormat,
    ) -> Result<(), PxpError> {
        if image.opa < OPA_MIN {
            dest_area.validate()?;
            return src_area.validate();
        }
        if image.has_recolor() || image.has_rotation() {
            if image.opa >= OPA_MAX && !format.has_alpha() && !format.is_chroma_keyed() {
                return self.blit_cover(dest, *dest_area, src, src_area, image, format, true);
            }
            // Transformation with blending needs two passes.
            return self.blit_opa(dest, dest_area, src, src_area, image, format);
        }

        self.blit_cf(dest, dest_area, src, src_area, image, format)
    }

    /// Copy `src_area` onto `dest_area` without blending and wait for it.
    pub fn buffer_copy(&mut self, dest: PixelBuf, dest_area: &Area, src: PixelBuf, src_area: &Area) -> Result<(), PxpError> {
        dest_area.validate()?;
        src_area.validate()?;

        let copy = PicCopyConfig {
            src_pic_base_addr: src.addr,
            src_pitch_bytes: self.pitch(src),
            src_offset_x: coord(src_area.x1)?,
            src_offset_y: coord(src_area.y1)?,
            dest_pic_base_addr: dest.addr,
            dest_pitch_bytes: self.pitch(dest),
            dest_offset_x: coord(dest_area.x1)?,
            dest_offset_y: coord(dest_area.y1)?,
            width: coord(src_area.width())?,
            height: coord(src_area.height())?,
            pixel_format: self.config().as_format(),
        };

        self.reset()?;
        self.run_with(|device| device.start_picture_copy(&copy))?;
        self.wait()
    }

    /// Two-pass transform: rotate and recolor into scratch memory at full
    /// opacity, then blend the result onto the destination.
    fn blit_opa(
        &mut self,
        dest: PixelBuf,
        dest_area: &Area,
        src: PixelBuf,
        src_area: &Area,
        image: &ImageDescriptor,
        format: ColorFormat,
    ) -> Result<(), PxpError> {
        dest_area.validate()?;
        let width = dest_area.width();
        let height = dest_area.height();
        let (_, dx, dy) = rotation_for(image.angle, image.pivot, width, height)?;

        let side = width.max(height);
        let len = scratch_len(side, self.bytes_per_pixel())?;
        let temp = PixelBuf::new(self.scratch(len)?, side as u32);
        let temp_area = Area::with_size(0, 0, width, height);

        self.blit_cover(temp, temp_area, src, src_area, image, format, false)?;

        let rotated = match image.angle {
            900 | 2700 => temp_area.transposed(),
            _ => temp_area,
        };
        let mut out_area = Area::with_size(dest_area.x1, dest_area.y1, rotated.width(), rotated.height());
        out_area.translate(dx, dy);

        self.blit_cf(dest, &out_area, temp, &rotated, image, format)
    }

    /// Single pass transform at full opacity.
    ///
    /// With `shift_pivot` the output is moved so the pivot stays in place.
    #[allow(clippy::too_many_arguments)]
    fn blit_cover(
        &mut self,
        dest: PixelBuf,
        mut dest_area: Area,
        src: PixelBuf,
        src_area: &Area,
        image: &ImageDescriptor,
        format: ColorFormat,
        shift_pivot: bool,
    ) -> Result<(), PxpError> {
        dest_area.validate()?;
        src_area.validate()?;
        let width = dest_area.width();
        let height = dest_area.height();

        let rotation = if image.has_rotation() {
            let (rotation, dx, dy) = rotation_for(image.angle, image.pivot, width, height)?;
            if shift_pivot {
                dest_area.translate(dx, dy);
                dest_area.validate()?;
            }
            Some(rotation)
        } else {
            None
        };
        let output = self.output_config(dest, &dest_area, width, height)?;

        self.reset()?;
        let device = self.device();
        if let Some(rotation) = rotation {
            device.set_rotate_config(RotatePosition::OutputBuffer, rotation, Flip::Disable);
        }

        device.set_alpha_surface_buffer_config(&self.as_buffer_config(src, src_area));
        device.set_alpha_surface_position(Self::position(src_area)?);

        device.set_process_surface_position(SURFACE_DISABLED);
        if image.has_recolor() {
            device.set_process_surface_background_color(self.config().color_depth.pack(image.recolor));
        }

        device.set_output_buffer_config(&output);

        if image.has_recolor() || format.has_alpha() {
            // Factor fields are swapped in hardware: src applies to PS, dst to AS.
            device.set_porter_duff_config(&PorterDuffConfig {
                enable: true,
                dst_color_mode: PorterDuffColorMode::WithAlpha,
                src_color_mode: PorterDuffColorMode::NoAlpha,
                dst_global_alpha_mode: PorterDuffGlobalAlphaMode::Global,
                src_global_alpha_mode: if format.has_alpha() {
                    PorterDuffGlobalAlphaMode::Local
                } else {
                    PorterDuffGlobalAlphaMode::Global
                },
                dst_factor_mode: PorterDuffFactorMode::Straight,
                src_factor_mode: PorterDuffFactorMode::Inversed,
                dst_global_alpha: if image.has_recolor() { image.recolor_opa } else { 0 },
                src_global_alpha: 0xff,
                dst_alpha_mode: PorterDuffAlphaMode::Straight,
                src_alpha_mode: PorterDuffAlphaMode::Straight,
            });
        }

        log::trace!("PXP cover blit {:?} -> {:?} angle {}", src_area, dest_area, image.angle);
        self.run()
    }

    /// Blit handling opacity, embedded alpha and chroma keying, without
    /// transformation. PS and OUT share the destination, blending in place.
    fn blit_cf(
        &mut self,
        dest: PixelBuf,
        dest_area: &Area,
        src: PixelBuf,
        src_area: &Area,
        image: &ImageDescriptor,
        format: ColorFormat,
    ) -> Result<(), PxpError> {
        dest_area.validate()?;
        src_area.validate()?;
        let output = self.output_config(dest, dest_area, dest_area.width(), dest_area.height())?;

        self.reset()?;
        let device = self.device();

        let mut blend = AsBlendConfig {
            alpha: image.opa,
            invert_alpha: false,
            alpha_mode: AlphaMode::Rop,
            rop_mode: RopMode::MergeAs,
        };

        if image.opa >= OPA_MAX && !format.is_chroma_keyed() && !format.has_alpha() {
            device.set_process_surface_position(SURFACE_DISABLED);
        } else {
            blend.alpha_mode = match (image.opa >= OPA_MAX, format.has_alpha()) {
                (true, true) => AlphaMode::Embedded,
                (false, true) => AlphaMode::Multiply,
                (_, false) => AlphaMode::Override,
            };
            device.set_process_surface_buffer_config(&self.ps_buffer_config(dest, dest_area));
            device.set_process_surface_position(Self::position(dest_area)?);
        }

        device.set_alpha_surface_buffer_config(&self.as_buffer_config(src, src_area));
        device.set_alpha_surface_position(Self::position(src_area)?);
        device.set_alpha_surface_blend_config(&blend);

        if format.is_chroma_keyed() {
            let (low, high) = self.chroma_key_range(image);
            device.set_alpha_surface_overlay_color_key(low, high);
        }
        device.enable_alpha_surface_overlay_color_key(format.is_chroma_keyed());

        device.set_output_buffer_config(&output);

        log::trace!("PXP blit {:?} -> {:?} {:?} opa {}", src_area, dest_area, format, image.opa);
        self.run()
    }

    /// Chroma key range as register values.
    ///
    /// Recoloring shifts the key, so the recolored key is widened by one
    /// step per channel to absorb rounding.
    pub fn chroma_key_range(&self, image: &ImageDescriptor) -> (u32, u32) {
        let depth = self.config().color_depth;
        let key = depth.native(self.config().chroma_key);

        if !image.has_recolor() {
            let value = depth.to_register(key);
            return (value, value);
        }

        let shifted = depth.mix(depth.native(image.recolor), key, image.recolor_opa);
        let max = depth.channel_max();
        let mut low = shifted;
        let mut high = shifted;

        low.red = shifted.red.saturating_sub(1);
        low.green = shifted.green.saturating_sub(1);
        low.blue = shifted.blue.saturating_sub(1);
        high.red = shifted.red.saturating_add(1).min(max.red);
        high.green = shifted.green.saturating_add(1).min(max.green);
        high.blue = shifted.blue.saturating_add(1).min(max.blue);

        (depth.to_register(low), depth.to_register(high))
    }
}
