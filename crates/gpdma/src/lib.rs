//! Shared GPDMA channel allocator for STM32.
//!
//! GPDMA channels are a scarce resource shared by every peripheral driver
//! that moves data without the CPU (SPI, SAI, SDMMC, UART...). This crate
//! lets those drivers claim a channel at runtime, get notified through a
//! handler when the channel raises an interrupt, and hand the channel back
//! when they are done, without ever stepping on each other.
//!
//! # Architecture Layers
//!
//! ```text
//! Peripheral drivers (SPI, SAI, SDMMC ...)
//!         ↓  claim / release / streaming setup
//! GpdmaAllocator (this crate: ownership mask + handler slots)
//!         ↓                        ↓
//! ClockGate / VectorController   ChannelRegisters
//!         ↓                        ↓
//! RCC + NVIC                     GPDMA channel register blocks
//! ```
//!
//! # Modules
//!
//! - [`registry`] - immutable channel table and clock-domain grouping
//! - [`allocator`] - claim/release and interrupt dispatch
//! - [`regs`] - channel register contract and flag/control words
//! - [`clock`] - clock-domain gating collaborator
//! - [`vector`] - interrupt vector collaborator
//! - [`handler`] - per-channel interrupt handler trait
//! - [`platform`] - channel tables and PAC back-ends for supported parts
//!
//! # Features
//!
//! - `std`: Enable standard library support (for testing, enables [`mocks`])
//! - `gpdma2`: Include the second GPDMA controller in the platform table
//! - `hardware`: PAC-backed channel registers, RCC clock gate and NVIC vector
//!   controller (pulls in `embassy-stm32` and `cortex-m`)
//! - `defmt`: Enable defmt logging
//!
//! # Example
//!
//! Firmware build with the `hardware` feature:
//!
//! ```ignore
//! use gpdma::platform::stm32h5::{self, GpdmaChannel, RccClockGate};
//! use gpdma::vector::NvicVectors;
//! use gpdma::{ChannelFlags, GpdmaAllocator, IrqPriority};
//!
//! static REGISTRY: stm32h5::Registry = stm32h5::registry();
//! static DMA: GpdmaAllocator<'static, GpdmaChannel, RccClockGate, NvicVectors, { stm32h5::CHANNELS }> =
//!     GpdmaAllocator::new(&REGISTRY, RccClockGate, NvicVectors);
//!
//! fn on_spi_dma(_flags: ChannelFlags) {}
//! static SPI_DMA_HANDLER: fn(ChannelFlags) = on_spi_dma;
//!
//! DMA.init();
//! let prio = IrqPriority::new(5)?;
//! let channel = DMA.claim_exclusive_locked(stm32h5::GPDMA1_ANY, prio, Some(&SPI_DMA_HANDLER))?;
//! // ... configure and run transfers through channel.regs() ...
//! DMA.release_exclusive_locked(channel);
//!
//! #[interrupt]
//! fn GPDMA1_CH0() {
//!     if let Some(id) = stm32h5::channel(stm32h5::Controller::Gpdma1, 0) {
//!         DMA.serve_interrupt_by_id(id);
//!     }
//! }
//! ```

// ── Lint policy ─────────────────────────────────────────────────────────────
#![deny(clippy::unwrap_used)] // no .unwrap() in production code
#![deny(clippy::expect_used)] // no .expect() in production code
#![deny(clippy::panic)] // no panic!() in production code
#![deny(clippy::unreachable)] // no unreachable!() that isn't documented
#![deny(unused_must_use)]
// all Results must be handled
// ────────────────────────────────────────────────────────────────────────────
#![cfg_attr(not(any(test, feature = "std")), no_std)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(unsafe_op_in_unsafe_fn)] // unsafe fn body is not implicitly unsafe block
#![warn(clippy::print_stdout)] // prefer defmt over println! in lib code
// Pedantic lints suppressed for this hardware HAL crate:
#![allow(clippy::doc_markdown)] // register names in doc comments
#![allow(clippy::must_use_candidate)] // hardware accessors: callers decide
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]

pub mod allocator;
pub mod clock;
pub mod error;
pub mod handler;
pub mod platform;
pub mod registry;
pub mod regs;
pub mod vector;

pub mod mocks;

// Re-export the allocator surface
pub use allocator::{Claimed, GpdmaAllocator};
pub use error::{AllocError, OutOfRangeError};
pub use handler::ChannelHandler;

// Re-export table and register types
pub use registry::{ChannelDescriptor, ChannelId, ChannelMask, ClockDomain, DomainId, Registry};
pub use regs::{ChannelControl, ChannelFlags, ChannelRegisters};

// Re-export collaborator traits
pub use clock::ClockGate;
pub use vector::{IrqPriority, VectorController, VectorId};
