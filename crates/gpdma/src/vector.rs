//! Interrupt vector control.
//!
//! A channel's NVIC line is enabled while the channel is owned by a consumer
//! that registered a handler, and disabled on release.

use crate::error::OutOfRangeError;

/// NVIC priority bits implemented on STM32H5 (16 levels).
pub const PRIORITY_BITS: u8 = 4;

/// Identifier of an NVIC interrupt line (IRQ number).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(transparent)]
pub struct VectorId(pub u16);

// SAFETY: VectorId values come from the platform table, which only lists IRQ
// numbers that exist on the device.
#[cfg(feature = "hardware")]
unsafe impl cortex_m::interrupt::InterruptNumber for VectorId {
    fn number(self) -> u16 {
        self.0
    }
}

/// Logical interrupt priority, `0` (highest) to `2^PRIORITY_BITS - 1`.
///
/// Stored unshifted; [`IrqPriority::to_nvic`] produces the byte written to
/// the NVIC priority register.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(transparent)]
pub struct IrqPriority(u8);

impl IrqPriority {
    /// Lowest urgency level supported by the NVIC.
    pub const LOWEST: Self = Self((1 << PRIORITY_BITS) - 1);

    /// Highest urgency level.
    pub const HIGHEST: Self = Self(0);

    /// Create an `IrqPriority`, returning an error if `level` does not fit in
    /// [`PRIORITY_BITS`].
    ///
    /// # Errors
    ///
    /// Returns [`OutOfRangeError`] if `level > 2^PRIORITY_BITS - 1`.
    pub const fn new(level: u8) -> Result<Self, OutOfRangeError> {
        if level > Self::LOWEST.0 {
            Err(OutOfRangeError {
                value: level as u32,
                min: 0,
                max: Self::LOWEST.0 as u32,
            })
        } else {
            Ok(Self(level))
        }
    }

    /// Return the logical level.
    #[must_use]
    pub const fn get(self) -> u8 {
        self.0
    }

    /// Priority byte for the NVIC `IPR` register (level in the high bits).
    #[must_use]
    pub const fn to_nvic(self) -> u8 {
        self.0 << (8 - PRIORITY_BITS)
    }
}

/// Interrupt controller collaborator.
///
/// Both operations must be idempotent.
pub trait VectorController {
    /// Set the priority of `vector` and unmask it.
    fn enable_vector(&self, vector: VectorId, priority: IrqPriority);

    /// Mask `vector`.
    fn disable_vector(&self, vector: VectorId);
}

impl<T: VectorController + ?Sized> VectorController for &T {
    fn enable_vector(&self, vector: VectorId, priority: IrqPriority) {
        (**self).enable_vector(vector, priority);
    }

    fn disable_vector(&self, vector: VectorId) {
        (**self).disable_vector(vector);
    }
}

/// Cortex-M NVIC vector controller.
#[cfg(feature = "hardware")]
#[derive(Debug, Clone, Copy, Default)]
pub struct NvicVectors;

#[cfg(feature = "hardware")]
impl VectorController for NvicVectors {
    fn enable_vector(&self, vector: VectorId, priority: IrqPriority) {
        // SAFETY: only called from inside the allocator's critical section,
        // so no other owner of the NVIC handle runs concurrently. The handler
        // for `vector` is installed by the firmware's vector table and routes
        // to `GpdmaAllocator::serve_interrupt`, so unmasking cannot break a
        // mask-based critical section elsewhere.
        unsafe {
            let mut nvic = cortex_m::Peripherals::steal().NVIC;
            nvic.set_priority(vector, priority.to_nvic());
            cortex_m::peripheral::NVIC::unmask(vector);
        }
    }

    fn disable_vector(&self, vector: VectorId) {
        cortex_m::peripheral::NVIC::mask(vector);
        cortex_m::peripheral::NVIC::unpend(vector);
    }
}
