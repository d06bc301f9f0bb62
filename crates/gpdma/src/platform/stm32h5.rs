//! STM32H5 GPDMA channel table and register back-ends.
//!
//! ## GPDMA layout on STM32H563/H573
//!
//! | Controller | Channels | IRQs (CH0..CH7) | RCC enable          |
//! |------------|----------|-----------------|---------------------|
//! | GPDMA1     | 0..8     | 27..=34         | AHB1ENR.GPDMA1EN    |
//! | GPDMA2     | 8..16    | 90..=97         | AHB1ENR.GPDMA2EN    |
//!
//! Registry index `i` maps to GPDMA1 channel `i` for `i < 8` and to GPDMA2
//! channel `i - 8` otherwise. Without the `gpdma2` feature the table only
//! holds GPDMA1.
//!
//! Register access goes through the `embassy-stm32` PAC (`hardware`
//! feature). The table itself only names controllers and channel numbers,
//! so it builds and can be inspected on the host.
//!
//! ## Usage
//! ```rust
//! use gpdma::platform::stm32h5;
//!
//! static REGISTRY: stm32h5::Registry = stm32h5::registry();
//!
//! // Any GPDMA1 channel (e.g. for a peripheral that is only routed to GPDMA1):
//! let candidates = stm32h5::GPDMA1_ANY;
//! assert_eq!(candidates.bits(), 0x00FF);
//! ```

#[cfg(feature = "hardware")]
use embassy_stm32::pac;

#[cfg(feature = "hardware")]
use crate::clock::ClockGate;
use crate::registry::{self, ChannelDescriptor, ChannelId, ChannelMask, ClockDomain, DomainId};
#[cfg(feature = "hardware")]
use crate::regs::{ChannelControl, ChannelFlags, ChannelRegisters};
use crate::vector::VectorId;

/// Channels implemented by each controller.
pub const CHANNELS_PER_CONTROLLER: usize = 8;

/// Channels in the registry.
#[cfg(feature = "gpdma2")]
pub const CHANNELS: usize = 2 * CHANNELS_PER_CONTROLLER;

/// Channels in the registry.
#[cfg(not(feature = "gpdma2"))]
pub const CHANNELS: usize = CHANNELS_PER_CONTROLLER;

/// NVIC line of GPDMA1 channel 0; channels 1..8 follow consecutively.
pub const GPDMA1_CH0_IRQ: u16 = 27;

/// NVIC line of GPDMA2 channel 0; channels 1..8 follow consecutively.
pub const GPDMA2_CH0_IRQ: u16 = 90;

// ── Clock domains and candidate masks ────────────────────────────────────────

/// Clock domain of GPDMA1 (RCC bit `GPDMA1EN`).
pub const GPDMA1: DomainId = DomainId(0);

/// Clock domain of GPDMA2 (RCC bit `GPDMA2EN`).
pub const GPDMA2: DomainId = DomainId(1);

/// Any GPDMA1 channel.
pub const GPDMA1_ANY: ChannelMask = ChannelMask::from_bits(0x00FF);

/// Any GPDMA2 channel.
#[cfg(feature = "gpdma2")]
pub const GPDMA2_ANY: ChannelMask = ChannelMask::from_bits(0xFF00);

/// Any channel of the registry.
pub const ANY: ChannelMask = ChannelMask::first(CHANNELS);

#[cfg(feature = "gpdma2")]
const DOMAINS: &[ClockDomain] = &[
    ClockDomain {
        id: GPDMA1,
        channels: GPDMA1_ANY,
    },
    ClockDomain {
        id: GPDMA2,
        channels: GPDMA2_ANY,
    },
];

#[cfg(not(feature = "gpdma2"))]
const DOMAINS: &[ClockDomain] = &[ClockDomain {
    id: GPDMA1,
    channels: GPDMA1_ANY,
}];

// ── Channels ─────────────────────────────────────────────────────────────────

/// A GPDMA controller instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Controller {
    /// GPDMA1.
    Gpdma1,
    /// GPDMA2.
    Gpdma2,
}

/// One channel of a GPDMA controller.
///
/// With the `hardware` feature this implements [`ChannelRegisters`] on the
/// channel's `CxCR`/`CxSR`/`CxFCR` through the PAC.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct GpdmaChannel {
    controller: Controller,
    number: u8,
}

impl GpdmaChannel {
    /// Channel `number` of `controller`.
    #[must_use]
    pub const fn new(controller: Controller, number: u8) -> Self {
        Self { controller, number }
    }

    /// Controller the channel belongs to.
    #[must_use]
    pub const fn controller(&self) -> Controller {
        self.controller
    }

    /// Channel number inside its controller (0..8).
    #[must_use]
    pub const fn number(&self) -> u8 {
        self.number
    }

    #[cfg(feature = "hardware")]
    fn block(self) -> pac::gpdma::Channel {
        let dma = match self.controller {
            Controller::Gpdma1 => pac::GPDMA1,
            Controller::Gpdma2 => pac::GPDMA2,
        };
        dma.ch(usize::from(self.number))
    }
}

/// Polls of `CxSR.SUSPF` before giving up on a graceful suspend.
///
/// A suspend completes within one AHB burst; the bound only keeps quiesce
/// from spinning forever on a wedged channel, which is reset regardless.
#[cfg(feature = "hardware")]
const SUSPEND_SPIN_LIMIT: u32 = 1_000;

#[cfg(feature = "hardware")]
impl ChannelRegisters for GpdmaChannel {
    fn control(&self) -> ChannelControl {
        ChannelControl::from_bits(self.block().cr().read().0)
    }

    fn set_control(&self, value: ChannelControl) {
        self.block().cr().write(|w| w.0 = value.bits());
    }

    fn status(&self) -> ChannelFlags {
        ChannelFlags::from_bits(self.block().sr().read().0)
    }

    fn clear_flags(&self, flags: ChannelFlags) {
        // Bits of CxFCR outside the event flags are reserved.
        let flags = flags & ChannelFlags::EVENTS;
        self.block().fcr().write(|w| w.0 = flags.bits());
    }

    fn quiesce(&self) {
        let ch = self.block();
        if ch.cr().read().en() {
            // An active channel must be suspended before it can be reset.
            ch.cr().modify(|w| w.set_susp(true));
            let mut spins = 0u32;
            while !ch.sr().read().suspf() && spins < SUSPEND_SPIN_LIMIT {
                spins = spins.saturating_add(1);
            }
            ch.cr().write(|w| w.set_reset(true));
        }
        ch.cr().write(|w| w.0 = ChannelControl::QUIESCENT.bits());
        ch.fcr().write(|w| w.0 = ChannelFlags::EVENTS.bits());
    }
}

// ── Clock gate ───────────────────────────────────────────────────────────────

/// Clock gate driving `RCC_AHB1ENR.GPDMAxEN`.
///
/// The register update is a read-modify-write; the allocator only calls it
/// from inside its critical section.
#[cfg(feature = "hardware")]
#[derive(Debug, Clone, Copy, Default)]
pub struct RccClockGate;

#[cfg(feature = "hardware")]
impl RccClockGate {
    fn set(domain: DomainId, enabled: bool) {
        pac::RCC.ahb1enr().modify(|w| match domain {
            GPDMA1 => w.set_gpdma1en(enabled),
            GPDMA2 => w.set_gpdma2en(enabled),
            _ => {
                #[cfg(feature = "defmt")]
                defmt::warn!("gpdma: unknown clock domain {=u8}", domain.0);
            }
        });
    }
}

#[cfg(feature = "hardware")]
impl ClockGate for RccClockGate {
    fn enable_domain(&self, domain: DomainId) {
        Self::set(domain, true);
        // RM0481: read back once so the enable has propagated before the
        // first access to the controller.
        let _ = pac::RCC.ahb1enr().read();
    }

    fn disable_domain(&self, domain: DomainId) {
        Self::set(domain, false);
    }
}

// ── Registry ─────────────────────────────────────────────────────────────────

/// Registry type for this part.
pub type Registry = registry::Registry<GpdmaChannel, CHANNELS>;

/// Registry index of channel `n` of `controller`.
///
/// Returns `None` for a channel number past [`CHANNELS_PER_CONTROLLER`] or a
/// controller not in the registry.
#[must_use]
#[allow(clippy::arithmetic_side_effects)] // n < CHANNELS_PER_CONTROLLER checked
pub const fn channel(controller: Controller, n: usize) -> Option<ChannelId> {
    if n >= CHANNELS_PER_CONTROLLER {
        return None;
    }
    let index = match controller {
        Controller::Gpdma1 => n,
        Controller::Gpdma2 => CHANNELS_PER_CONTROLLER + n,
    };
    if index < CHANNELS {
        Some(ChannelId::from_index(index))
    } else {
        None
    }
}

/// Build the channel table for this part.
#[allow(clippy::indexing_slicing)] // i < CHANNELS bounded by the loop condition
#[allow(clippy::arithmetic_side_effects)] // loop counter bounded by CHANNELS
pub const fn registry() -> Registry {
    let mut channels = [descriptor(0); CHANNELS];
    let mut i = 1;
    while i < CHANNELS {
        channels[i] = descriptor(i);
        i += 1;
    }
    registry::Registry::new(channels, DOMAINS)
}

#[allow(clippy::arithmetic_side_effects)] // i < 16, IRQ numbers < 128
#[allow(clippy::cast_possible_truncation)] // n < 8
const fn descriptor(i: usize) -> ChannelDescriptor<GpdmaChannel> {
    let (controller, n, irq0) = if i < CHANNELS_PER_CONTROLLER {
        (Controller::Gpdma1, i, GPDMA1_CH0_IRQ)
    } else {
        (Controller::Gpdma2, i - CHANNELS_PER_CONTROLLER, GPDMA2_CH0_IRQ)
    };
    ChannelDescriptor::new(
        ChannelId::from_index(i),
        GpdmaChannel::new(controller, n as u8),
        VectorId(irq0 + n as u16),
    )
}
