//! Recording PXP device for tests.

use alloc::sync::Arc;
use alloc::vec::Vec;
use core::sync::atomic::{AtomicU32, Ordering};
use spin::Mutex;

use crate::device::*;
use crate::irq::SoftIrq;

/// One register-level call made by the driver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Op {
    Init,
    ResetControl,
    EnableCsc1(bool),
    SetBlockSize(BlockSize),
    EnableInterrupts(InterruptEnable),
    DisableInterrupts(InterruptEnable),
    Start,
    Output(OutputBufferConfig),
    AsBuffer(AsBufferConfig),
    AsPosition(SurfacePosition),
    AsBlend(AsBlendConfig),
    EnableColorKey(bool),
    ColorKey(u32, u32),
    PsBuffer(PsBufferConfig),
    PsPosition(SurfacePosition),
    PsBackground(u32),
    PorterDuff(PorterDuffConfig),
    Rotate(RotatePosition, Rotation, Flip),
    PictureCopy(PicCopyConfig),
}

/// Device that records every call and completes jobs on request.
pub struct MockPxp {
    ops: Mutex<Vec<Op>>,
    status: AtomicU32,
    instant_irq: Mutex<Option<Arc<SoftIrq>>>,
}

impl MockPxp {
    pub fn new() -> Self {
        MockPxp {
            ops: Mutex::new(Vec::new()),
            status: AtomicU32::new(0),
            instant_irq: Mutex::new(None),
        }
    }

    /// Finish every job as soon as it starts, raising `irq`.
    pub fn complete_on_start(&self, irq: Arc<SoftIrq>) {
        *self.instant_irq.lock() = Some(irq);
    }

    /// Raise the completion status as the hardware would.
    pub fn finish_job(&self) {
        self.status
            .fetch_or(StatusFlags::COMPLETE.bits(), Ordering::AcqRel);
    }

    pub fn ops(&self) -> Vec<Op> {
        self.ops.lock().clone()
    }

    pub fn clear_ops(&self) {
        self.ops.lock().clear();
    }

    /// Calls recorded since the last `ResetControl`.
    pub fn job_ops(&self) -> Vec<Op> {
        let ops = self.ops.lock();
        let begin = ops
            .iter()
            .rposition(|op| *op == Op::ResetControl)
            .map_or(0, |i| i + 1);
        ops[begin..].to_vec()
    }

    fn record(&self, op: Op) {
        self.ops.lock().push(op);
    }

    fn kicked(&self) {
        let irq = self.instant_irq.lock().clone();
        if let Some(irq) = irq {
            self.finish_job();
            irq.raise();
        }
    }
}

impl PxpDevice for MockPxp {
    fn init(&self) {
        self.record(Op::Init);
    }

    fn reset_control(&self) {
        self.record(Op::ResetControl);
    }

    fn enable_csc1(&self, enable: bool) {
        self.record(Op::EnableCsc1(enable));
    }

    fn set_process_block_size(&self, size: BlockSize) {
        self.record(Op::SetBlockSize(size));
    }

    fn enable_interrupts(&self, mask: InterruptEnable) {
        self.record(Op::EnableInterrupts(mask));
    }

    fn disable_interrupts(&self, mask: InterruptEnable) {
        self.record(Op::DisableInterrupts(mask));
    }

    fn status_flags(&self) -> StatusFlags {
        StatusFlags::from_bits_truncate(self.status.load(Ordering::Acquire))
    }

    fn clear_status_flags(&self, flags: StatusFlags) {
        self.status.fetch_and(!flags.bits(), Ordering::AcqRel);
    }

    fn start(&self) {
        self.record(Op::Start);
        self.kicked();
    }

    fn set_output_buffer_config(&self, config: &OutputBufferConfig) {
        self.record(Op::Output(*config));
    }

    fn set_alpha_surface_buffer_config(&self, config: &AsBufferConfig) {
        self.record(Op::AsBuffer(*config));
    }

    fn set_alpha_surface_position(&self, position: SurfacePosition) {
        self.record(Op::AsPosition(position));
    }

    fn set_alpha_surface_blend_config(&self, config: &AsBlendConfig) {
        self.record(Op::AsBlend(*config));
    }

    fn enable_alpha_surface_overlay_color_key(&self, enable: bool) {
        self.record(Op::EnableColorKey(enable));
    }

    fn set_alpha_surface_overlay_color_key(&self, low: u32, high: u32) {
        self.record(Op::ColorKey(low, high));
    }

    fn set_process_surface_buffer_config(&self, config: &PsBufferConfig) {
        self.record(Op::PsBuffer(*config));
    }

    fn set_process_surface_position(&self, position: SurfacePosition) {
        self.record(Op::PsPosition(position));
    }

    fn set_process_surface_background_color(&self, color: u32) {
        self.record(Op::PsBackground(color));
    }

    fn set_porter_duff_config(&self, config: &PorterDuffConfig) {
        self.record(Op::PorterDuff(*config));
    }

    fn set_rotate_config(&self, position: RotatePosition, rotation: Rotation, flip: Flip) {
        self.record(Op::Rotate(position, rotation, flip));
    }

    fn start_picture_copy(&self, config: &PicCopyConfig) {
        self.record(Op::PictureCopy(*config));
        self.kicked();
    }
}
