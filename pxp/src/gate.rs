//! Job completion gate.
//!
//! The gate tracks whether a PXP job is outstanding and lets the submitting
//! context block until the completion interrupt for that job has fired.
//!
//! ```text
//!          start()                 completion interrupt
//!   Idle ----------> Busy ---------------------------------> Idle
//! ```
//!
//! `start` is the only writer of `Idle -> Busy`, the interrupt path the only
//! writer of `Busy -> Idle`. `wait` observes the state: it returns at once
//! when idle and otherwise blocks on the [`CompletionSignal`].

use core::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use core::time::Duration;

use crate::device::{InterruptEnable, PxpDevice, StatusFlags};
use crate::signal::CompletionSignal;
use crate::PxpError;

/// Observed gate state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateState {
    /// No job in flight.
    Idle,
    /// A job was started and has not completed yet.
    Busy,
}

/// Gate counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GateStats {
    /// Jobs started.
    pub started: usize,
    /// Completions that finished a job.
    pub completed: usize,
    /// Completions that arrived with no job in flight.
    pub spurious: usize,
}

/// Single-slot busy/idle handshake between job submission and completion.
pub struct JobGate<S: CompletionSignal> {
    busy: AtomicBool,
    signal: S,
    started: AtomicUsize,
    completed: AtomicUsize,
    spurious: AtomicUsize,
}

impl<S: CompletionSignal> JobGate<S> {
    /// Create an idle gate.
    pub fn new(signal: S) -> Self {
        JobGate {
            busy: AtomicBool::new(false),
            signal,
            started: AtomicUsize::new(0),
            completed: AtomicUsize::new(0),
            spurious: AtomicUsize::new(0),
        }
    }

    /// Current state.
    pub fn state(&self) -> GateState {
        if self.busy.load(Ordering::Acquire) {
            GateState::Busy
        } else {
            GateState::Idle
        }
    }

    /// Whether no job is outstanding.
    pub fn is_idle(&self) -> bool {
        self.state() == GateState::Idle
    }

    /// Snapshot of the gate counters.
    pub fn stats(&self) -> GateStats {
        GateStats {
            started: self.started.load(Ordering::Relaxed),
            completed: self.completed.load(Ordering::Relaxed),
            spurious: self.spurious.load(Ordering::Relaxed),
        }
    }

    /// Start the configured job.
    pub fn start<D: PxpDevice + ?Sized>(&self, device: &D) -> Result<(), PxpError> {
        self.start_with(device, |dev| dev.start())
    }

    /// Start a job using a custom start command.
    ///
    /// Fails with [`PxpError::Busy`] without touching the hardware if the
    /// previous job has not completed.
    pub fn start_with<D, F>(&self, device: &D, kick: F) -> Result<(), PxpError>
    where
        D: PxpDevice + ?Sized,
        F: FnOnce(&D),
    {
        if self
            .busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            log::warn!("PXP start rejected, previous job still in flight");
            return Err(PxpError::Busy);
        }

        // No completion can arrive before the kick below, so a stale latch
        // from an earlier job is safe to drop here.
        self.signal.arm();
        let job = self.started.fetch_add(1, Ordering::Relaxed) + 1;

        device.enable_interrupts(InterruptEnable::COMPLETE);
        kick(device);
        log::trace!("PXP job {} started", job);
        Ok(())
    }

    /// Block until the outstanding job completes.
    ///
    /// Returns immediately when no job is outstanding.
    pub fn wait(&self) {
        if !self.busy.load(Ordering::Acquire) {
            return;
        }
        self.signal.wait();
    }

    /// Block until the outstanding job completes or `timeout` elapses.
    ///
    /// On timeout the job stays outstanding.
    pub fn wait_timeout(&self, timeout: Duration) -> Result<(), PxpError> {
        if !self.busy.load(Ordering::Acquire) {
            return Ok(());
        }
        if self.signal.wait_timeout(timeout) || !self.busy.load(Ordering::Acquire) {
            return Ok(());
        }
        log::warn!("PXP job did not complete within {:?}", timeout);
        Err(PxpError::HardwareTimeout)
    }

    /// Completion interrupt handler.
    ///
    /// Reads and clears the completion status. Returns `true` if the
    /// interrupt was a completion.
    pub fn handle_interrupt<D: PxpDevice + ?Sized>(&self, device: &D) -> bool {
        if !device.status_flags().contains(StatusFlags::COMPLETE) {
            return false;
        }
        device.clear_status_flags(StatusFlags::COMPLETE);
        self.complete();
        true
    }

    /// Mark the outstanding job complete and wake the waiter.
    ///
    /// A completion with no job in flight is counted and ignored.
    pub fn complete(&self) {
        if self
            .busy
            .compare_exchange(true, false, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
        {
            self.completed.fetch_add(1, Ordering::Relaxed);
            self.signal.signal();
        } else {
            self.spurious.fetch_add(1, Ordering::Relaxed);
            log::warn!("PXP completion with no job in flight");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{MockPxp, Op};
    use crate::signal::{SemaphoreSignal, SpinSignal};
    use proptest::prelude::*;
    use std::sync::Arc;
    use std::thread;
    use std::time::Instant;

    fn semaphore_gate() -> JobGate<SemaphoreSignal> {
        JobGate::new(SemaphoreSignal::new())
    }

    fn fire(gate: &JobGate<impl CompletionSignal>, device: &MockPxp) -> bool {
        device.finish_job();
        gate.handle_interrupt(device)
    }

    #[test]
    fn test_wait_without_start_returns() {
        let gate = semaphore_gate();
        gate.wait();
        assert_eq!(gate.wait_timeout(Duration::from_millis(1)), Ok(()));
        assert_eq!(gate.state(), GateState::Idle);
    }

    #[test]
    fn test_start_programs_hardware() {
        let gate = semaphore_gate();
        let device = MockPxp::new();
        gate.start(&device).unwrap();

        assert_eq!(gate.state(), GateState::Busy);
        assert_eq!(
            device.ops(),
            vec![Op::EnableInterrupts(InterruptEnable::COMPLETE), Op::Start]
        );
    }

    #[test]
    fn test_completion_before_wait_is_latched() {
        let gate = semaphore_gate();
        let device = MockPxp::new();
        gate.start(&device).unwrap();
        assert!(fire(&gate, &device));

        gate.wait();
        assert!(gate.is_idle());
        assert!(!device.status_flags().contains(StatusFlags::COMPLETE));
    }

    #[test]
    fn test_second_wait_is_immediate() {
        let gate = semaphore_gate();
        let device = MockPxp::new();
        gate.start(&device).unwrap();
        fire(&gate, &device);

        gate.wait();
        gate.wait();
        assert!(gate.is_idle());
    }

    #[test]
    fn test_start_while_busy_is_rejected() {
        let gate = semaphore_gate();
        let device = MockPxp::new();
        gate.start(&device).unwrap();
        device.clear_ops();

        assert_eq!(gate.start(&device), Err(PxpError::Busy));
        assert!(device.ops().is_empty());
        assert_eq!(gate.stats().started, 1);
    }

    #[test]
    fn test_interrupt_without_completion_flag() {
        let gate = semaphore_gate();
        let device = MockPxp::new();
        gate.start(&device).unwrap();

        assert!(!gate.handle_interrupt(&device));
        assert_eq!(gate.state(), GateState::Busy);
    }

    #[test]
    fn test_duplicate_completion_does_not_release_next_job() {
        let gate = semaphore_gate();
        let device = MockPxp::new();
        gate.start(&device).unwrap();
        fire(&gate, &device);
        fire(&gate, &device);
        gate.wait();

        let stats = gate.stats();
        assert_eq!(stats.completed, 1);
        assert_eq!(stats.spurious, 1);

        gate.start(&device).unwrap();
        assert_eq!(
            gate.wait_timeout(Duration::from_millis(20)),
            Err(PxpError::HardwareTimeout)
        );
        assert_eq!(gate.state(), GateState::Busy);
    }

    #[test]
    fn test_wait_blocks_until_interrupt() {
        let gate = Arc::new(semaphore_gate());
        let device = Arc::new(MockPxp::new());
        gate.start(&*device).unwrap();

        let begin = Instant::now();
        let isr = {
            let gate = Arc::clone(&gate);
            let device = Arc::clone(&device);
            thread::spawn(move || {
                thread::sleep(Duration::from_millis(5));
                fire(&*gate, &*device);
            })
        };

        assert_eq!(gate.wait_timeout(Duration::from_secs(5)), Ok(()));
        assert!(begin.elapsed() >= Duration::from_millis(5));
        assert!(gate.is_idle());
        isr.join().unwrap();
        assert_eq!(gate.stats().completed, 1);
    }

    #[test]
    fn test_spin_gate_wait_blocks_until_interrupt() {
        let gate = Arc::new(JobGate::new(SpinSignal::new()));
        let device = Arc::new(MockPxp::new());
        gate.start(&*device).unwrap();

        let isr = {
            let gate = Arc::clone(&gate);
            let device = Arc::clone(&device);
            thread::spawn(move || {
                thread::sleep(Duration::from_millis(5));
                fire(&*gate, &*device);
            })
        };

        gate.wait();
        assert!(gate.is_idle());
        isr.join().unwrap();
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        /// Any run of start / complete / wait cycles leaves the gate idle
        /// after every wait, whether the completion arrives before the wait
        /// or is latched by a duplicate interrupt.
        #[test]
        fn gate_idle_after_every_wait(cycles in prop::collection::vec((any::<bool>(), 1usize..3), 1..24)) {
            let gate = semaphore_gate();
            let device = MockPxp::new();

            for (extra_wait, interrupts) in &cycles {
                gate.start(&device).unwrap();
                for _ in 0..*interrupts {
                    fire(&gate, &device);
                }
                gate.wait();
                prop_assert!(gate.is_idle());
                if *extra_wait {
                    gate.wait();
                    prop_assert!(gate.is_idle());
                }
            }

            let stats = gate.stats();
            prop_assert_eq!(stats.started, cycles.len());
            prop_assert_eq!(stats.completed, cycles.len());
            let extra: usize = cycles.iter().map(|(_, n)| n - 1).sum();
            prop_assert_eq!(stats.spurious, extra);
        }
    }
}
