//! GPDMA channel register contract.
//!
//! Each channel exposes three registers the allocator cares about:
//!
//! | Register | Access | Contents |
//! |----------|--------|----------|
//! | `CxFCR`  | W1C    | flag clear, same layout as `CxSR` |
//! | `CxSR`   | RO     | sticky event flags |
//! | `CxCR`   | RW     | enable, reset, suspend, per-source IE bits |
//!
//! The interrupt-enable bits of `CxCR` sit at the same positions as the
//! matching flags in `CxSR` (RM0481 §17.8), so "is this flag an enabled
//! interrupt source" is a plain AND.
//!
//! Transfer setup (addresses, burst, linked lists) belongs to the streaming
//! layer on top of a claimed channel and is not modelled here. The STM32H5
//! implementation lives in [`crate::platform::stm32h5::GpdmaChannel`].

// ── Flags ────────────────────────────────────────────────────────────────────

/// Contents of a channel status register (`CxSR`).
///
/// Passed verbatim to the owner's [`crate::handler::ChannelHandler`]; the
/// allocator does not interpret error flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(transparent)]
pub struct ChannelFlags(u32);

impl ChannelFlags {
    /// No flag set.
    pub const NONE: Self = Self(0);
    /// Channel idle (not an interrupt source).
    pub const IDLE: Self = Self(1 << 0);
    /// Transfer complete.
    pub const TRANSFER_COMPLETE: Self = Self(1 << 8);
    /// Half transfer.
    pub const HALF_TRANSFER: Self = Self(1 << 9);
    /// Data transfer error.
    pub const DATA_ERROR: Self = Self(1 << 10);
    /// Update link transfer error.
    pub const LINK_ERROR: Self = Self(1 << 11);
    /// User setting error.
    pub const USER_SETTING_ERROR: Self = Self(1 << 12);
    /// Completed suspension.
    pub const SUSPENDED: Self = Self(1 << 13);
    /// Trigger overrun.
    pub const TRIGGER_OVERRUN: Self = Self(1 << 14);

    /// Every flag that can raise an interrupt and be cleared through `CxFCR`.
    pub const EVENTS: Self = Self(0x7F << 8);

    /// Wrap raw `CxSR` bits.
    #[must_use]
    pub const fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    /// Return the raw bits.
    #[must_use]
    pub const fn bits(self) -> u32 {
        self.0
    }

    /// `true` when no bit is set.
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// `true` when every bit of `other` is set in `self`.
    #[must_use]
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// `true` when `self` and `other` share at least one bit.
    #[must_use]
    pub const fn intersects(self, other: Self) -> bool {
        self.0 & other.0 != 0
    }

    /// `true` for any of the three error flags.
    #[must_use]
    pub const fn is_error(self) -> bool {
        self.intersects(Self(
            Self::DATA_ERROR.0 | Self::LINK_ERROR.0 | Self::USER_SETTING_ERROR.0,
        ))
    }
}

impl core::ops::BitOr for ChannelFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl core::ops::BitAnd for ChannelFlags {
    type Output = Self;

    fn bitand(self, rhs: Self) -> Self {
        Self(self.0 & rhs.0)
    }
}

// ── Control ──────────────────────────────────────────────────────────────────

/// Contents of a channel control register (`CxCR`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(transparent)]
pub struct ChannelControl(u32);

impl ChannelControl {
    /// Channel disabled, no interrupt source enabled.
    pub const QUIESCENT: Self = Self(0);
    /// Channel enable.
    pub const EN: Self = Self(1 << 0);
    /// Channel reset (write-only, self-clearing).
    pub const RESET: Self = Self(1 << 1);
    /// Channel suspend request.
    pub const SUSP: Self = Self(1 << 2);
    /// Transfer complete interrupt enable.
    pub const TCIE: Self = Self(1 << 8);
    /// Half transfer interrupt enable.
    pub const HTIE: Self = Self(1 << 9);
    /// Data transfer error interrupt enable.
    pub const DTEIE: Self = Self(1 << 10);
    /// Update link error interrupt enable.
    pub const ULEIE: Self = Self(1 << 11);
    /// User setting error interrupt enable.
    pub const USEIE: Self = Self(1 << 12);
    /// Completed suspension interrupt enable.
    pub const SUSPIE: Self = Self(1 << 13);
    /// Trigger overrun interrupt enable.
    pub const TOIE: Self = Self(1 << 14);

    /// Wrap raw `CxCR` bits.
    #[must_use]
    pub const fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    /// Return the raw bits.
    #[must_use]
    pub const fn bits(self) -> u32 {
        self.0
    }

    /// `true` when `EN` is set.
    #[must_use]
    pub const fn is_enabled(self) -> bool {
        self.0 & Self::EN.0 != 0
    }

    /// Status flags whose interrupt source is enabled in this control word.
    #[must_use]
    pub const fn enabled_sources(self) -> ChannelFlags {
        ChannelFlags(self.0 & ChannelFlags::EVENTS.0)
    }
}

impl core::ops::BitOr for ChannelControl {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

// ── Register contract ────────────────────────────────────────────────────────

/// Register access for one GPDMA channel.
///
/// Methods take `&self`: register blocks are shared hardware, and exclusive
/// use is guaranteed by channel ownership rather than by Rust borrows.
pub trait ChannelRegisters {
    /// Read `CxCR`.
    fn control(&self) -> ChannelControl;

    /// Write `CxCR`.
    fn set_control(&self, value: ChannelControl);

    /// Read `CxSR`.
    fn status(&self) -> ChannelFlags;

    /// Write `flags` to `CxFCR` (write-1-to-clear).
    fn clear_flags(&self, flags: ChannelFlags);

    /// Put the channel in its quiescent state: disabled, no interrupt source
    /// enabled, no pending flag.
    fn quiesce(&self) {
        self.set_control(ChannelControl::QUIESCENT);
        self.clear_flags(ChannelFlags::EVENTS);
    }
}
