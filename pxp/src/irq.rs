//! Interrupt line abstraction.
//!
//! The driver registers its completion handler on an [`IrqLine`]. On real
//! hardware the platform maps this onto its interrupt controller; hosted
//! builds and tests use [`SoftIrq`], which invokes the handler when raised.

use alloc::boxed::Box;
use alloc::sync::Arc;
use core::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use spin::Mutex;

use crate::PxpError;

/// Interrupt handler callback.
pub type IrqHandler = Box<dyn Fn() + Send + Sync>;

/// An interrupt line the PXP completion interrupt is routed to.
pub trait IrqLine: Send + Sync {
    /// Register the handler for this line.
    fn attach(&self, handler: IrqHandler) -> Result<(), PxpError>;

    /// Set the line priority.
    fn set_priority(&self, priority: u8) -> Result<(), PxpError>;

    /// Unmask the line.
    fn enable(&self);

    /// Mask the line.
    fn disable(&self);

    /// Remove the registered handler.
    fn detach(&self);
}

impl<T: IrqLine + ?Sized> IrqLine for Arc<T> {
    fn attach(&self, handler: IrqHandler) -> Result<(), PxpError> {
        (**self).attach(handler)
    }

    fn set_priority(&self, priority: u8) -> Result<(), PxpError> {
        (**self).set_priority(priority)
    }

    fn enable(&self) {
        (**self).enable()
    }

    fn disable(&self) {
        (**self).disable()
    }

    fn detach(&self) {
        (**self).detach()
    }
}

/// Software interrupt line.
pub struct SoftIrq {
    handler: Mutex<Option<IrqHandler>>,
    enabled: AtomicBool,
    priority: AtomicU8,
}

impl SoftIrq {
    /// Create a masked line with no handler.
    pub const fn new() -> Self {
        SoftIrq {
            handler: Mutex::new(None),
            enabled: AtomicBool::new(false),
            priority: AtomicU8::new(0),
        }
    }

    /// Deliver the interrupt.
    ///
    /// Returns `true` if the line was enabled and a handler ran.
    pub fn raise(&self) -> bool {
        if !self.enabled.load(Ordering::Acquire) {
            return false;
        }
        match self.handler.lock().as_ref() {
            Some(handler) => {
                handler();
                true
            }
            None => false,
        }
    }

    /// Whether the line is unmasked.
    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Acquire)
    }

    /// Whether a handler is registered.
    pub fn is_attached(&self) -> bool {
        self.handler.lock().is_some()
    }

    /// Current priority.
    pub fn priority(&self) -> u8 {
        self.priority.load(Ordering::Relaxed)
    }
}

impl Default for SoftIrq {
    fn default() -> Self {
        Self::new()
    }
}

impl IrqLine for SoftIrq {
    fn attach(&self, handler: IrqHandler) -> Result<(), PxpError> {
        let mut slot = self.handler.lock();
        if slot.is_some() {
            return Err(PxpError::InterruptInit("line already has a handler"));
        }
        *slot = Some(handler);
        Ok(())
    }

    fn set_priority(&self, priority: u8) -> Result<(), PxpError> {
        self.priority.store(priority, Ordering::Relaxed);
        Ok(())
    }

    fn enable(&self) {
        self.enabled.store(true, Ordering::Release);
    }

    fn disable(&self) {
        self.enabled.store(false, Ordering::Release);
    }

    fn detach(&self) {
        *self.handler.lock() = None;
    }
}
