//! KPIO PXP Accelerator Driver
//!
//! This crate drives the PXP, a fixed-function 2D pixel pipeline that
//! rotates, recolors, alpha-blends and chroma-keys rectangular images
//! on behalf of the graphics stack.
//!
//! # Architecture
//!
//! The driver is organized into:
//!
//! - `device`: Register-level interface implemented by the platform
//! - `irq`: Interrupt line abstraction and a software interrupt line
//! - `signal`: Completion signals (spinning and semaphore based)
//! - `gate`: Busy/idle handshake between job submission and completion
//! - `pxp`: Accelerator lifecycle (init, reset, run, wait, shutdown)
//! - `blend`: Fill, blit, transformed blit and buffer copy
//! - `color`, `geometry`, `config`: Supporting types
//!
//! Only one job may be in flight at a time. Every compositing operation
//! waits for the previous job before reprogramming the hardware.

#![cfg_attr(not(any(feature = "std", test)), no_std)]

extern crate alloc;

pub mod blend;
pub mod color;
pub mod config;
pub mod device;
pub mod gate;
pub mod geometry;
pub mod irq;
pub mod pxp;
pub mod signal;

#[cfg(test)]
mod mock;

pub use blend::{ColorFormat, DisplayRotation, ImageDescriptor, PixelBuf};
pub use color::{Color, ColorDepth};
pub use config::PxpConfig;
pub use device::PxpDevice;
pub use gate::{GateState, GateStats, JobGate};
pub use geometry::{Area, Point};
pub use irq::{IrqHandler, IrqLine, SoftIrq};
pub use pxp::Pxp;
pub use signal::{CompletionSignal, SpinSignal};

#[cfg(any(feature = "std", test))]
pub use signal::SemaphoreSignal;

/// PXP driver error types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum PxpError {
    /// Invalid driver configuration.
    #[error("PXP configuration error: {0}")]
    Config(&'static str),
    /// Interrupt registration failed.
    #[error("PXP interrupt init failed: {0}")]
    InterruptInit(&'static str),
    /// A job is already outstanding.
    #[error("PXP job already in flight")]
    Busy,
    /// The completion interrupt did not arrive in time.
    #[error("PXP job did not complete before the deadline")]
    HardwareTimeout,
    /// Area is empty or lies outside the buffer.
    #[error("invalid PXP area")]
    InvalidArea,
    /// Scratch memory could not be allocated.
    #[error("PXP scratch allocation failed")]
    OutOfMemory,
    /// The hardware cannot perform the requested transformation.
    #[error("unsupported by PXP: {0}")]
    Unsupported(&'static str),
}
