//! Channel registry: the immutable table of GPDMA channels.
//!
//! The registry is built once from static platform data (see
//! [`crate::platform`]) and never mutated. Each entry binds a channel index
//! to its register block and its NVIC vector. Channels are also grouped into
//! clock domains: one domain per physical GPDMA controller, gated by a single
//! RCC enable bit.
//!
//! Channel identity is the explicit [`ChannelId`] stored in the descriptor.
//! Nothing here derives an index from a descriptor's address.

use crate::error::OutOfRangeError;
use crate::vector::VectorId;

/// Hard upper bound on channels per registry: ownership is tracked in a `u32`.
pub const MAX_CHANNELS: usize = 32;

// ── ChannelId ────────────────────────────────────────────────────────────────

/// Index of a channel in the registry, in `[0, MAX_CHANNELS)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(transparent)]
pub struct ChannelId(u8);

impl ChannelId {
    /// Create a `ChannelId`, returning an error if `index >= MAX_CHANNELS`.
    ///
    /// # Errors
    ///
    /// Returns [`OutOfRangeError`] if `index` does not fit the ownership mask.
    #[allow(clippy::cast_possible_truncation)] // MAX_CHANNELS = 32 fits u32
    pub const fn new(index: u8) -> Result<Self, OutOfRangeError> {
        if (index as usize) < MAX_CHANNELS {
            Ok(Self(index))
        } else {
            Err(OutOfRangeError {
                value: index as u32,
                min: 0,
                max: (MAX_CHANNELS - 1) as u32,
            })
        }
    }

    /// Table-building constructor; `Registry::new` rejects a wrong index.
    #[allow(clippy::cast_possible_truncation)] // callers stay below MAX_CHANNELS
    pub(crate) const fn from_index(index: usize) -> Self {
        Self(index as u8)
    }

    /// Return the channel index.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    /// Single-bit mask selecting only this channel.
    #[must_use]
    pub const fn mask(self) -> ChannelMask {
        ChannelMask(1 << self.0)
    }
}

// ── ChannelMask ──────────────────────────────────────────────────────────────

/// Set of channels, one bit per channel index.
///
/// Used both as the candidate set of a claim request and as the allocator's
/// ownership mask.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(transparent)]
pub struct ChannelMask(u32);

impl ChannelMask {
    /// No channels.
    pub const EMPTY: Self = Self(0);

    /// Every representable channel. Bits beyond a registry's channel count
    /// are ignored by the allocator.
    pub const ALL: Self = Self(u32::MAX);

    /// Wrap raw mask bits.
    #[must_use]
    pub const fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    /// Mask of the first `n` channels, `[0, n)`. Saturates at 32.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)] // n < 32 checked
    pub const fn first(n: usize) -> Self {
        if n >= MAX_CHANNELS {
            Self::ALL
        } else {
            Self((1u32 << n as u32).wrapping_sub(1))
        }
    }

    /// Return the raw mask bits.
    #[must_use]
    pub const fn bits(self) -> u32 {
        self.0
    }

    /// `true` when no bit is set.
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// `true` when `channel`'s bit is set.
    #[must_use]
    pub const fn contains(self, channel: ChannelId) -> bool {
        self.0 & channel.mask().0 != 0
    }

    /// Set `channel`'s bit.
    pub fn insert(&mut self, channel: ChannelId) {
        self.0 |= channel.mask().0;
    }

    /// Clear `channel`'s bit.
    pub fn remove(&mut self, channel: ChannelId) {
        self.0 &= !channel.mask().0;
    }

    /// Bits present in both masks.
    #[must_use]
    pub const fn intersection(self, other: Self) -> Self {
        Self(self.0 & other.0)
    }

    /// Bits present in either mask.
    #[must_use]
    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    /// Bits of `self` not present in `other`.
    #[must_use]
    pub const fn difference(self, other: Self) -> Self {
        Self(self.0 & !other.0)
    }

    /// Number of channels in the set.
    #[must_use]
    pub const fn len(self) -> u32 {
        self.0.count_ones()
    }

    /// Lowest-indexed channel in the set, if any.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)] // trailing_zeros < 32 when non-empty
    pub const fn lowest(self) -> Option<ChannelId> {
        if self.0 == 0 {
            None
        } else {
            Some(ChannelId(self.0.trailing_zeros() as u8))
        }
    }

    /// Iterate over the channels in the set in ascending index order.
    pub fn iter(self) -> impl Iterator<Item = ChannelId> {
        let mut rest = self;
        core::iter::from_fn(move || {
            let next = rest.lowest()?;
            rest.remove(next);
            Some(next)
        })
    }
}

impl core::ops::BitOr for ChannelMask {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        self.union(rhs)
    }
}

impl core::ops::BitAnd for ChannelMask {
    type Output = Self;

    fn bitand(self, rhs: Self) -> Self {
        self.intersection(rhs)
    }
}

// ── Clock domains ────────────────────────────────────────────────────────────

/// Identifier of a clock domain (one per physical GPDMA controller).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(transparent)]
pub struct DomainId(pub u8);

/// A group of channels sharing one clock-gating control.
///
/// The domain's clock must be running while at least one member channel is
/// owned, and may be stopped once the last member is released.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ClockDomain {
    /// Domain identifier passed to the [`crate::clock::ClockGate`].
    pub id: DomainId,
    /// Channels clocked by this domain.
    pub channels: ChannelMask,
}

// ── ChannelDescriptor ────────────────────────────────────────────────────────

/// One channel of the registry.
///
/// `R` is the hardware handle: [`crate::platform::stm32h5::GpdmaChannel`]
/// on target, a mock register file in tests.
#[derive(Debug, Clone, Copy)]
pub struct ChannelDescriptor<R> {
    id: ChannelId,
    regs: R,
    vector: VectorId,
}

impl<R> ChannelDescriptor<R> {
    /// Bind a channel index to its register block and interrupt vector.
    pub const fn new(id: ChannelId, regs: R, vector: VectorId) -> Self {
        Self { id, regs, vector }
    }

    /// Channel index.
    pub const fn id(&self) -> ChannelId {
        self.id
    }

    /// Channel register block.
    pub const fn regs(&self) -> &R {
        &self.regs
    }

    /// NVIC vector raised by this channel.
    pub const fn vector(&self) -> VectorId {
        self.vector
    }
}

// ── Registry ─────────────────────────────────────────────────────────────────

/// Immutable table of the `N` channels and their clock domains.
#[derive(Debug)]
pub struct Registry<R, const N: usize> {
    channels: [ChannelDescriptor<R>; N],
    domains: &'static [ClockDomain],
}

impl<R, const N: usize> Registry<R, N> {
    /// Build a registry from its channel table and clock-domain grouping.
    ///
    /// Intended for `static`/`const` initialisation, where a malformed table
    /// is rejected at compile time.
    ///
    /// # Panics
    ///
    /// Panics if `N > MAX_CHANNELS`, if entry `i` does not carry
    /// `ChannelId` `i`, or if a domain names a channel outside `[0, N)`.
    #[allow(clippy::indexing_slicing)] // i < N bounded by the loop condition
    #[allow(clippy::arithmetic_side_effects)] // loop counters bounded by N / domains.len()
    pub const fn new(channels: [ChannelDescriptor<R>; N], domains: &'static [ClockDomain]) -> Self {
        assert!(N <= MAX_CHANNELS, "registry exceeds ownership mask width");
        let mut i = 0;
        while i < N {
            assert!(channels[i].id.index() == i, "descriptor index mismatch");
            i += 1;
        }
        let valid = ChannelMask::first(N);
        let mut d = 0;
        while d < domains.len() {
            assert!(
                domains[d].channels.difference(valid).is_empty(),
                "clock domain names a channel outside the registry"
            );
            d += 1;
        }
        Self { channels, domains }
    }

    /// Number of channels.
    pub const fn len(&self) -> usize {
        N
    }

    /// `true` for a registry without channels.
    pub const fn is_empty(&self) -> bool {
        N == 0
    }

    /// Mask of every valid channel index, `[0, N)`.
    pub const fn valid_mask(&self) -> ChannelMask {
        ChannelMask::first(N)
    }

    /// Descriptor for `id`, or `None` if `id` is outside this registry.
    pub fn channel(&self, id: ChannelId) -> Option<&ChannelDescriptor<R>> {
        self.channels.get(id.index())
    }

    /// All descriptors in index order.
    pub fn channels(&self) -> impl Iterator<Item = &ChannelDescriptor<R>> {
        self.channels.iter()
    }

    /// Clock domains.
    pub const fn domains(&self) -> &'static [ClockDomain] {
        self.domains
    }

    /// Clock domains clocking `id`.
    pub fn domains_of(&self, id: ChannelId) -> impl Iterator<Item = &'static ClockDomain> {
        self.domains.iter().filter(move |d| d.channels.contains(id))
    }
}
