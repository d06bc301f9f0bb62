//! GPDMA channel allocator and interrupt dispatcher.
//!
//! # Ownership model
//!
//! Ownership is a single `N`-bit mask: bit *i* is set while channel *i* is
//! held by exactly one consumer. Next to it sits one handler slot per
//! channel, written together with the ownership bit on claim and cleared
//! together with it on release. Both live behind a critical-section mutex,
//! so claim and release are safe from thread mode and from interrupt
//! handlers alike.
//!
//! A claim hands back a [`Claimed`] token. The token cannot be cloned and
//! release consumes it, so releasing a channel twice, or releasing one that
//! was never claimed, does not type-check. Each token also carries the
//! instance number of the allocator that issued it; any other allocator
//! refuses it.
//!
//! # Locked and already-locked shapes
//!
//! Every mutating operation comes in two shapes:
//!
//! | Shape | Use from |
//! |-------|----------|
//! | `claim_exclusive_locked` / `release_exclusive_locked` | ordinary code: enters the critical section itself |
//! | `claim_exclusive(cs, ..)` / `release_exclusive(cs, ..)` | code already inside a critical section (another driver's ISR, a larger atomic update) |
//!
//! The critical section masks interrupts for a bounded time: one scan over
//! at most 32 mask bits plus a handful of register writes. Do not call
//! claim/release from a context where masking interrupts is not allowed
//! (e.g. above the kernel's BASEPRI ceiling with a non-maskable deadline).
//!
//! # Interrupt dispatch
//!
//! [`GpdmaAllocator::serve_interrupt`] is meant to be called from the
//! channel's vector. It acknowledges every pending flag, and forwards the
//! status to the owner's handler only when at least one reported flag is an
//! interrupt source enabled in `CxCR`. Stale or spurious interrupts, and
//! interrupts for channels without a handler, are acknowledged and dropped.

use core::cell::RefCell;
use core::sync::atomic::{AtomicU32, Ordering};

use critical_section::CriticalSection;
use embassy_sync::blocking_mutex::CriticalSectionMutex;

use crate::clock::ClockGate;
use crate::error::AllocError;
use crate::handler::ChannelHandler;
use crate::registry::{ChannelDescriptor, ChannelId, ChannelMask, Registry};
use crate::regs::ChannelRegisters;
use crate::vector::{IrqPriority, VectorController};

// ── Allocation state ─────────────────────────────────────────────────────────

/// Source of allocator instance numbers; 0 means "not yet assigned".
static NEXT_INSTANCE: AtomicU32 = AtomicU32::new(1);

/// Ownership mask plus one handler slot per channel.
///
/// Invariant: `slots[i].is_some()` implies bit `i` of `owned` is set.
struct AllocationState<'r, const N: usize> {
    owned: ChannelMask,
    slots: [Option<&'r dyn ChannelHandler>; N],
    instance: u32,
}

impl<'r, const N: usize> AllocationState<'r, N> {
    const fn new() -> Self {
        Self {
            owned: ChannelMask::EMPTY,
            slots: [None; N],
            instance: 0,
        }
    }

    /// Instance number stamped into tokens, assigned on first claim.
    fn instance(&mut self) -> u32 {
        if self.instance == 0 {
            self.instance = NEXT_INSTANCE.fetch_add(1, Ordering::Relaxed);
        }
        self.instance
    }
}

// ── Claimed token ────────────────────────────────────────────────────────────

/// A channel owned by the caller.
///
/// Gives access to the channel's registers for the streaming layer. Hand it
/// back with [`GpdmaAllocator::release_exclusive_locked`] (or the
/// already-locked variant); dropping it keeps the channel allocated forever.
#[must_use = "dropping a Claimed channel leaks it; release it through the allocator"]
#[derive(Debug)]
pub struct Claimed<'r, R> {
    channel: &'r ChannelDescriptor<R>,
    instance: u32,
}

impl<'r, R> Claimed<'r, R> {
    /// Channel index.
    pub fn id(&self) -> ChannelId {
        self.channel.id()
    }

    /// Channel register block.
    pub fn regs(&self) -> &'r R {
        self.channel.regs()
    }

    /// The registry descriptor of the channel.
    pub fn descriptor(&self) -> &'r ChannelDescriptor<R> {
        self.channel
    }
}

// ── Allocator ────────────────────────────────────────────────────────────────

/// Shared GPDMA channel allocator.
///
/// One instance per system, usually a `static`, constructed with
/// [`GpdmaAllocator::new`] and reset with [`GpdmaAllocator::init`] before the
/// first claim. Drivers receive it by reference.
pub struct GpdmaAllocator<'r, R, C, V, const N: usize> {
    registry: &'r Registry<R, N>,
    clocks: C,
    vectors: V,
    state: CriticalSectionMutex<RefCell<AllocationState<'r, N>>>,
}

impl<'r, R, C, V, const N: usize> GpdmaAllocator<'r, R, C, V, N> {
    /// Create an allocator over `registry` with every channel free.
    pub const fn new(registry: &'r Registry<R, N>, clocks: C, vectors: V) -> Self {
        Self {
            registry,
            clocks,
            vectors,
            state: CriticalSectionMutex::new(RefCell::new(AllocationState::new())),
        }
    }

    /// The channel table this allocator manages.
    pub fn registry(&self) -> &'r Registry<R, N> {
        self.registry
    }

    /// The clock gate collaborator.
    pub fn clocks(&self) -> &C {
        &self.clocks
    }

    /// The interrupt vector collaborator.
    pub fn vectors(&self) -> &V {
        &self.vectors
    }

    /// Snapshot of the ownership mask.
    pub fn owned_mask(&self) -> ChannelMask {
        critical_section::with(|cs| self.state.borrow(cs).borrow().owned)
    }

    /// `true` while `id` is claimed.
    pub fn is_owned(&self, id: ChannelId) -> bool {
        self.owned_mask().contains(id)
    }

    /// Channels of `candidates` that a claim could currently hand out.
    pub fn free_in(&self, candidates: ChannelMask) -> ChannelMask {
        candidates
            .intersection(self.registry.valid_mask())
            .difference(self.owned_mask())
    }
}

impl<'r, R, C, V, const N: usize> GpdmaAllocator<'r, R, C, V, N>
where
    R: ChannelRegisters,
    C: ClockGate,
    V: VectorController,
{
    /// Reset to all-unowned and force every channel to quiescent.
    ///
    /// Call once at system init, before any claim. Tokens issued before a
    /// reset are refused by [`GpdmaAllocator::release_exclusive`] afterwards.
    pub fn init(&self) {
        critical_section::with(|cs| {
            let mut state = self.state.borrow(cs).borrow_mut();
            *state = AllocationState::new();
            for channel in self.registry.channels() {
                channel.regs().set_control(crate::regs::ChannelControl::QUIESCENT);
            }
        });
        #[cfg(feature = "defmt")]
        defmt::debug!("gpdma: allocator initialised, {=usize} channels", N);
    }

    /// Claim the lowest-indexed free channel of `candidates`.
    ///
    /// Caller already holds the critical section. Only indices in both
    /// `candidates` and `[0, N)` are considered; candidate bits beyond the
    /// registry are ignored.
    ///
    /// On success the channel's clock domain is running, its vector is
    /// enabled at `priority` if a `handler` was given, and its registers are
    /// quiescent with no stale flags.
    ///
    /// # Errors
    ///
    /// [`AllocError::NoChannelAvailable`] when every candidate is owned;
    /// nothing is modified in that case.
    pub fn claim_exclusive(
        &self,
        cs: CriticalSection<'_>,
        candidates: ChannelMask,
        priority: IrqPriority,
        handler: Option<&'r dyn ChannelHandler>,
    ) -> Result<Claimed<'r, R>, AllocError> {
        let mut guard = self.state.borrow(cs).borrow_mut();
        let state = &mut *guard;

        let free = candidates
            .intersection(self.registry.valid_mask())
            .difference(state.owned);
        let Some(channel) = free.lowest().and_then(|id| self.registry.channel(id)) else {
            #[cfg(feature = "defmt")]
            defmt::warn!(
                "gpdma: no channel free in {=u32:#x} (owned {=u32:#x})",
                candidates.bits(),
                state.owned.bits()
            );
            return Err(AllocError::NoChannelAvailable);
        };
        let id = channel.id();
        let Some(slot) = state.slots.get_mut(id.index()) else {
            return Err(AllocError::NoChannelAvailable);
        };

        *slot = handler;
        state.owned.insert(id);
        let instance = state.instance();

        for domain in self.registry.domains_of(id) {
            self.clocks.enable_domain(domain.id);
        }
        if handler.is_some() {
            self.vectors.enable_vector(channel.vector(), priority);
        }
        channel.regs().quiesce();

        #[cfg(feature = "defmt")]
        defmt::debug!(
            "gpdma: claimed channel {=usize} (owned {=u32:#x})",
            id.index(),
            state.owned.bits()
        );

        Ok(Claimed { channel, instance })
    }

    /// Claim the lowest-indexed free channel of `candidates`, entering the
    /// critical section for the duration of the claim.
    ///
    /// # Errors
    ///
    /// See [`GpdmaAllocator::claim_exclusive`].
    pub fn claim_exclusive_locked(
        &self,
        candidates: ChannelMask,
        priority: IrqPriority,
        handler: Option<&'r dyn ChannelHandler>,
    ) -> Result<Claimed<'r, R>, AllocError> {
        critical_section::with(|cs| self.claim_exclusive(cs, candidates, priority, handler))
    }

    /// Release a claimed channel. Caller already holds the critical section.
    ///
    /// Disables the channel's vector, drops its handler and stops every clock
    /// domain of the channel that has no other owned member.
    ///
    /// Releasing a token this allocator did not issue (one from another
    /// allocator over the same registry, or from before the last
    /// [`GpdmaAllocator::init`]) is a programming error and trips a debug
    /// assertion. In release builds such a token is ignored: the ownership
    /// mask, handler slots, vectors and clocks are left untouched.
    pub fn release_exclusive(&self, cs: CriticalSection<'_>, channel: Claimed<'r, R>) {
        let Claimed { channel, instance } = channel;
        let id = channel.id();

        let mut guard = self.state.borrow(cs).borrow_mut();
        let state = &mut *guard;

        let issued_here = state.instance != 0 && instance == state.instance;
        if !issued_here {
            #[cfg(feature = "defmt")]
            defmt::warn!("gpdma: ch{=usize} token from another allocator ignored", id.index());
            debug_assert!(issued_here, "gpdma: channel not allocated by this allocator");
            return;
        }
        debug_assert!(state.owned.contains(id), "gpdma: channel not allocated");

        state.owned.remove(id);
        self.vectors.disable_vector(channel.vector());
        if let Some(slot) = state.slots.get_mut(id.index()) {
            *slot = None;
        }

        for domain in self.registry.domains_of(id) {
            if state.owned.intersection(domain.channels).is_empty() {
                self.clocks.disable_domain(domain.id);
            }
        }

        #[cfg(feature = "defmt")]
        defmt::debug!(
            "gpdma: released channel {=usize} (owned {=u32:#x})",
            id.index(),
            state.owned.bits()
        );
    }

    /// Release a claimed channel, entering the critical section for the
    /// duration of the release.
    pub fn release_exclusive_locked(&self, channel: Claimed<'r, R>) {
        critical_section::with(|cs| self.release_exclusive(cs, channel));
    }

    /// Serve an interrupt raised by `channel`.
    ///
    /// Call from the channel's vector. Reads `CxSR`, acknowledges every
    /// reported flag, and calls the owner's handler with the full status
    /// when at least one flag is an interrupt source enabled in `CxCR`.
    pub fn serve_interrupt(&self, channel: &ChannelDescriptor<R>) {
        let regs = channel.regs();
        let status = regs.status();
        regs.clear_flags(status);

        if !status.intersects(regs.control().enabled_sources()) {
            #[cfg(feature = "defmt")]
            defmt::trace!(
                "gpdma: ch{=usize} flags {=u32:#x} not enabled, dropped",
                channel.id().index(),
                status.bits()
            );
            return;
        }

        // Copy the handler out so it runs without the state borrowed: a
        // handler is allowed to release its own channel.
        let handler = critical_section::with(|cs| {
            self.state
                .borrow(cs)
                .borrow()
                .slots
                .get(channel.id().index())
                .copied()
                .flatten()
        });

        match handler {
            Some(handler) => handler.on_interrupt(status),
            None => {
                #[cfg(feature = "defmt")]
                defmt::warn!(
                    "gpdma: ch{=usize} interrupt without handler, flags {=u32:#x}",
                    channel.id().index(),
                    status.bits()
                );
            }
        }
    }

    /// Serve an interrupt for the channel with index `id` of this
    /// allocator's registry. Unknown indices are ignored.
    pub fn serve_interrupt_by_id(&self, id: ChannelId) {
        if let Some(channel) = self.registry.channel(id) {
            self.serve_interrupt(channel);
        }
    }
}
