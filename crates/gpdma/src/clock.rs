//! Clock-domain gating.
//!
//! Every GPDMA controller sits behind one RCC enable bit. The allocator turns
//! a controller's clock on when the first of its channels is claimed and off
//! when the last one is released; it never tracks the clock state itself.
//! The STM32H5 gate is `platform::stm32h5::RccClockGate` (`hardware` feature).

use crate::registry::DomainId;

/// Clock gate collaborator.
///
/// Both operations must be idempotent: the allocator calls `enable_domain`
/// on every claim, even when the domain is already running.
pub trait ClockGate {
    /// Start the clock of `domain`.
    fn enable_domain(&self, domain: DomainId);

    /// Stop the clock of `domain`.
    fn disable_domain(&self, domain: DomainId);
}

impl<T: ClockGate + ?Sized> ClockGate for &T {
    fn enable_domain(&self, domain: DomainId) {
        (**self).enable_domain(domain);
    }

    fn disable_domain(&self, domain: DomainId) {
        (**self).disable_domain(domain);
    }
}
