//! Per-channel interrupt handlers.

use crate::regs::ChannelFlags;

/// Receiver of a claimed channel's interrupts.
///
/// Called from the channel's interrupt context with the full status word
/// read from `CxSR`, after the flags have already been acknowledged. The
/// handler carries whatever context it needs (a driver struct, a signal, a
/// waker) instead of an opaque parameter pointer.
///
/// Implementations must be `Sync`: the allocator stores a shared reference
/// and calls it from interrupt context.
pub trait ChannelHandler: Sync {
    /// Handle an interrupt carrying `flags`.
    fn on_interrupt(&self, flags: ChannelFlags);
}

impl<F> ChannelHandler for F
where
    F: Fn(ChannelFlags) + Sync,
{
    fn on_interrupt(&self, flags: ChannelFlags) {
        self(flags);
    }
}
