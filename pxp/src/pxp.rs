//! Accelerator lifecycle.
//!
//! [`Pxp`] owns the register interface, the interrupt line and the job
//! gate. Every compositing operation goes through the same sequence:
//! [`reset`](Pxp::reset) (which waits for the previous job), register
//! configuration, then [`run`](Pxp::run).

use alloc::boxed::Box;
use alloc::sync::Arc;
use alloc::vec::Vec;

use crate::config::PxpConfig;
use crate::device::{InterruptEnable, PxpDevice};
use crate::gate::{GateStats, JobGate};
use crate::irq::IrqLine;
use crate::signal::CompletionSignal;
use crate::PxpError;

/// An initialized PXP accelerator.
pub struct Pxp<D, I, S>
where
    D: PxpDevice + 'static,
    I: IrqLine,
    S: CompletionSignal + 'static,
{
    /// Register interface, shared with the interrupt handler.
    device: Arc<D>,
    /// Line the completion interrupt arrives on.
    irq: I,
    /// Busy/idle handshake, shared with the interrupt handler.
    gate: Arc<JobGate<S>>,
    /// Driver configuration.
    config: PxpConfig,
    /// Intermediate buffer for two-pass blits.
    scratch: Vec<u8>,
    /// Whether the interrupt handler is registered.
    attached: bool,
}

impl<D, I, S> Pxp<D, I, S>
where
    D: PxpDevice + 'static,
    I: IrqLine,
    S: CompletionSignal + 'static,
{
    /// Initialize the accelerator and register the completion interrupt.
    pub fn init(device: Arc<D>, irq: I, signal: S, config: PxpConfig) -> Result<Self, PxpError> {
        if let Err(err) = config.validate() {
            log::error!("PXP init failed: {}", err);
            return Err(err);
        }
        if config.wait_timeout.is_some() && !signal.supports_timeout() {
            log::error!("PXP init failed: completion signal cannot time out");
            return Err(PxpError::Config("wait timeout needs a signal with a clock"));
        }

        device.init();
        if config.disable_csc1 {
            device.enable_csc1(false);
        }
        device.set_process_block_size(config.block_size);
        device.enable_interrupts(InterruptEnable::COMPLETE);

        let gate = Arc::new(JobGate::new(signal));
        if let Err(err) = Self::attach(&irq, &device, &gate, &config) {
            device.disable_interrupts(InterruptEnable::COMPLETE);
            log::error!("PXP init failed: {}", err);
            return Err(err);
        }

        log::debug!(
            "PXP initialized: {:?}, block size {:?}",
            config.color_depth,
            config.block_size
        );

        Ok(Pxp {
            device,
            irq,
            gate,
            config,
            scratch: Vec::new(),
            attached: true,
        })
    }

    fn attach(irq: &I, device: &Arc<D>, gate: &Arc<JobGate<S>>, config: &PxpConfig) -> Result<(), PxpError> {
        let isr_device = Arc::clone(device);
        let isr_gate = Arc::clone(gate);
        irq.attach(Box::new(move || {
            isr_gate.handle_interrupt(&*isr_device);
        }))?;

        if let Some(priority) = config.irq_priority {
            if let Err(err) = irq.set_priority(priority) {
                irq.detach();
                return Err(err);
            }
        }

        irq.enable();
        Ok(())
    }

    /// Wait for the last job and release the interrupt line.
    ///
    /// The line is released even if the wait times out.
    pub fn shutdown(mut self) -> Result<(), PxpError> {
        self.release()
    }

    /// Wait for the last job, then deinit. A job still in flight keeps its
    /// scratch buffer: it is leaked rather than handed back to the heap.
    fn release(&mut self) -> Result<(), PxpError> {
        if !self.attached {
            return Ok(());
        }
        let waited = self.wait();
        if waited.is_err() && self.scratch.capacity() != 0 {
            log::warn!("PXP released with a job in flight, leaking {} scratch bytes", self.scratch.capacity());
            core::mem::forget(core::mem::take(&mut self.scratch));
        }
        self.deinit();
        waited
    }

    fn deinit(&mut self) {
        if !self.attached {
            return;
        }
        self.irq.disable();
        self.irq.detach();
        self.device.disable_interrupts(InterruptEnable::COMPLETE);
        self.attached = false;
        log::debug!("PXP shut down");
    }

    /// Wait for the previous job, then restore the control registers.
    pub fn reset(&mut self) -> Result<(), PxpError> {
        self.wait()?;

        self.device.reset_control();
        if self.config.disable_csc1 {
            self.device.enable_csc1(false);
        }
        self.device.set_process_block_size(self.config.block_size);
        Ok(())
    }

    /// Start the configured job.
    pub fn run(&self) -> Result<(), PxpError> {
        self.gate.start(&*self.device)
    }

    /// Start a job with a custom start command.
    pub(crate) fn run_with<F: FnOnce(&D)>(&self, kick: F) -> Result<(), PxpError> {
        self.gate.start_with(&*self.device, kick)
    }

    /// Wait for the outstanding job, bounded by the configured timeout.
    pub fn wait(&self) -> Result<(), PxpError> {
        match self.config.wait_timeout {
            Some(timeout) => self.gate.wait_timeout(timeout),
            None => {
                self.gate.wait();
                Ok(())
            }
        }
    }

    /// Whether no job is outstanding.
    pub fn is_idle(&self) -> bool {
        self.gate.is_idle()
    }

    /// Job counters.
    pub fn stats(&self) -> GateStats {
        self.gate.stats()
    }

    /// Driver configuration.
    pub fn config(&self) -> &PxpConfig {
        &self.config
    }

    /// Register interface.
    pub fn device(&self) -> &D {
        &self.device
    }

    /// Job gate.
    pub fn gate(&self) -> &JobGate<S> {
        &self.gate
    }

    /// Grow the scratch buffer to at least `len` bytes and return its address.
    ///
    /// Waits first, the previous job may still be reading the buffer.
    pub(crate) fn scratch(&mut self, len: usize) -> Result<usize, PxpError> {
        self.wait()?;
        if self.scratch.len() < len {
            self.scratch
                .try_reserve_exact(len - self.scratch.len())
                .map_err(|_| PxpError::OutOfMemory)?;
            self.scratch.resize(len, 0);
        }
        Ok(self.scratch.as_ptr() as usize)
    }
}

impl<D, I, S> Drop for Pxp<D, I, S>
where
    D: PxpDevice + 'static,
    I: IrqLine,
    S: CompletionSignal + 'static,
{
    fn drop(&mut self) {
        let _ = self.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::{BlockSize, PxpDevice};
    use crate::irq::{IrqHandler, SoftIrq};
    use crate::mock::{MockPxp, Op};
    use crate::signal::{SemaphoreSignal, SpinSignal};
    use core::time::Duration;
    use std::thread;

    type TestPxp = Pxp<MockPxp, Arc<SoftIrq>, SemaphoreSignal>;

    fn setup(config: PxpConfig) -> (TestPxp, Arc<MockPxp>, Arc<SoftIrq>) {
        let device = Arc::new(MockPxp::new());
        let irq = Arc::new(SoftIrq::new());
        let pxp = Pxp::init(Arc::clone(&device), Arc::clone(&irq), SemaphoreSignal::new(), config).unwrap();
        (pxp, device, irq)
    }

    struct RefusingIrq;

    impl IrqLine for RefusingIrq {
        fn attach(&self, _handler: IrqHandler) -> Result<(), PxpError> {
            Err(PxpError::InterruptInit("vector unavailable"))
        }
        fn set_priority(&self, _priority: u8) -> Result<(), PxpError> {
            Ok(())
        }
        fn enable(&self) {}
        fn disable(&self) {}
        fn detach(&self) {}
    }

    #[test]
    fn test_init_sequence() {
        let (pxp, device, irq) = setup(PxpConfig::default().with_irq_priority(3));
        assert_eq!(
            device.ops(),
            vec![
                Op::Init,
                Op::EnableCsc1(false),
                Op::SetBlockSize(BlockSize::Size16),
                Op::EnableInterrupts(InterruptEnable::COMPLETE),
            ]
        );
        assert!(irq.is_enabled());
        assert!(irq.is_attached());
        assert_eq!(irq.priority(), 3);
        assert!(pxp.is_idle());
    }

    #[test]
    fn test_init_fails_when_attach_fails() {
        let device = Arc::new(MockPxp::new());
        let result = Pxp::init(Arc::clone(&device), RefusingIrq, SemaphoreSignal::new(), PxpConfig::default());

        assert!(matches!(result, Err(PxpError::InterruptInit(_))));
        assert_eq!(
            device.ops().last(),
            Some(&Op::DisableInterrupts(InterruptEnable::COMPLETE))
        );
    }

    #[test]
    fn test_timeout_requires_clocked_signal() {
        let device = Arc::new(MockPxp::new());
        let config = PxpConfig::default().with_wait_timeout(Duration::from_millis(10));
        let result = Pxp::init(device, SoftIrq::new(), SpinSignal::new(), config);

        assert!(matches!(result, Err(PxpError::Config(_))));
    }

    #[test]
    fn test_run_and_complete_through_irq() {
        let (mut pxp, device, irq) = setup(PxpConfig::default());
        pxp.reset().unwrap();
        pxp.run().unwrap();
        assert!(!pxp.is_idle());

        device.finish_job();
        assert!(irq.raise());
        pxp.wait().unwrap();
        assert!(pxp.is_idle());
        assert_eq!(pxp.stats().completed, 1);
    }

    #[test]
    fn test_reset_waits_for_previous_job() {
        let (mut pxp, device, irq) = setup(PxpConfig::default().with_wait_timeout(Duration::from_secs(5)));
        pxp.run().unwrap();

        let isr = {
            let device = Arc::clone(&device);
            let irq = Arc::clone(&irq);
            thread::spawn(move || {
                thread::sleep(Duration::from_millis(5));
                device.finish_job();
                irq.raise();
            })
        };

        pxp.reset().unwrap();
        assert!(pxp.is_idle());
        assert_eq!(device.ops().last(), Some(&Op::SetBlockSize(BlockSize::Size16)));
        isr.join().unwrap();
    }

    #[test]
    fn test_bounded_wait_times_out() {
        let (pxp, device, irq) = setup(PxpConfig::default().with_wait_timeout(Duration::from_millis(10)));
        pxp.run().unwrap();
        assert_eq!(pxp.wait(), Err(PxpError::HardwareTimeout));

        // Let drop observe the completion instead of timing out again.
        device.finish_job();
        irq.raise();
    }

    #[test]
    fn test_timed_out_release_keeps_scratch() {
        let (mut pxp, _device, irq) = setup(PxpConfig::default().with_wait_timeout(Duration::from_millis(5)));
        let addr = pxp.scratch(64).unwrap();
        pxp.scratch[0] = 0xa5;
        pxp.run().unwrap();

        assert_eq!(pxp.release(), Err(PxpError::HardwareTimeout));
        assert_eq!(pxp.scratch.capacity(), 0);
        assert!(!irq.is_attached());
        // Still owned by the in-flight job, so never returned to the allocator.
        assert_eq!(unsafe { *(addr as *const u8) }, 0xa5);

        // Drop has nothing left to release.
        drop(pxp);
    }

    #[test]
    fn test_completed_release_frees_scratch() {
        let (mut pxp, device, irq) = setup(PxpConfig::default());
        pxp.scratch(64).unwrap();
        pxp.run().unwrap();
        device.finish_job();
        irq.raise();

        assert_eq!(pxp.release(), Ok(()));
        assert!(pxp.scratch.capacity() >= 64);
        assert_eq!(pxp.release(), Ok(()));
    }

    #[test]
    fn test_shutdown_releases_line() {
        let (pxp, device, irq) = setup(PxpConfig::default());
        pxp.shutdown().unwrap();

        assert!(!irq.is_enabled());
        assert!(!irq.is_attached());
        assert_eq!(
            device.ops().last(),
            Some(&Op::DisableInterrupts(InterruptEnable::COMPLETE))
        );
    }
}
