//! Mock implementations for testing
//!
//! This module provides mock register blocks, collaborators and handlers so
//! the allocator can be exercised on the host.

#![cfg(any(test, feature = "std"))]

use core::cell::RefCell;
use core::sync::atomic::{AtomicU32, Ordering};

use embassy_sync::blocking_mutex::CriticalSectionMutex;

use crate::allocator::GpdmaAllocator;
use crate::clock::ClockGate;
use crate::handler::ChannelHandler;
use crate::registry::{ChannelDescriptor, ChannelId, ChannelMask, ClockDomain, DomainId, Registry};
use crate::regs::{ChannelControl, ChannelFlags, ChannelRegisters};
use crate::vector::{IrqPriority, VectorController, VectorId};

/// Allocator over mock hardware.
pub type MockAllocator<'r, const N: usize> =
    GpdmaAllocator<'r, MockChannel, MockClockGate, MockVectors, N>;

/// Vector number of mock channel 0; channel `i` uses `MOCK_VECTOR_BASE + i`.
pub const MOCK_VECTOR_BASE: u16 = 100;

/// Domain A: channels 0..8.
pub const DOMAIN_A: DomainId = DomainId(0);

/// Domain B: channels 8..16.
pub const DOMAIN_B: DomainId = DomainId(1);

/// Two clock domains of eight channels each.
pub const TWO_DOMAINS: &[ClockDomain] = &[
    ClockDomain {
        id: DOMAIN_A,
        channels: ChannelMask::from_bits(0x00FF),
    },
    ClockDomain {
        id: DOMAIN_B,
        channels: ChannelMask::from_bits(0xFF00),
    },
];

/// Registry of `N` mock channels grouped into `domains`.
pub fn mock_registry<const N: usize>(domains: &'static [ClockDomain]) -> Registry<MockChannel, N> {
    Registry::new(
        core::array::from_fn(|i| {
            let vector = u16::try_from(i).map_or(u16::MAX, |i| MOCK_VECTOR_BASE.saturating_add(i));
            ChannelDescriptor::new(ChannelId::from_index(i), MockChannel::new(), VectorId(vector))
        }),
        domains,
    )
}

/// Sixteen mock channels in [`TWO_DOMAINS`].
pub fn two_domain_registry() -> Registry<MockChannel, 16> {
    mock_registry(TWO_DOMAINS)
}

/// Allocator over `registry` with fresh mock collaborators, already initialised.
pub fn mock_allocator<const N: usize>(registry: &Registry<MockChannel, N>) -> MockAllocator<'_, N> {
    let alloc = GpdmaAllocator::new(registry, MockClockGate::new(), MockVectors::new());
    alloc.init();
    alloc
}

// ── Registers ────────────────────────────────────────────────────────────────

/// Mock channel register file.
///
/// `CxSR` is only changed by [`MockChannel::raise`] (hardware side) and
/// cleared through `CxFCR` with write-1-to-clear semantics.
#[derive(Debug, Default)]
pub struct MockChannel {
    control: AtomicU32,
    status: AtomicU32,
    quiesce_count: AtomicU32,
}

impl MockChannel {
    /// Create a channel with all registers zero.
    pub const fn new() -> Self {
        Self {
            control: AtomicU32::new(0),
            status: AtomicU32::new(0),
            quiesce_count: AtomicU32::new(0),
        }
    }

    /// Set status flags as the hardware would.
    pub fn raise(&self, flags: ChannelFlags) {
        self.status.fetch_or(flags.bits(), Ordering::SeqCst);
    }

    /// Number of times the channel was quiesced.
    pub fn quiesce_count(&self) -> u32 {
        self.quiesce_count.load(Ordering::SeqCst)
    }
}

impl ChannelRegisters for MockChannel {
    fn control(&self) -> ChannelControl {
        ChannelControl::from_bits(self.control.load(Ordering::SeqCst))
    }

    fn set_control(&self, value: ChannelControl) {
        self.control.store(value.bits(), Ordering::SeqCst);
    }

    fn status(&self) -> ChannelFlags {
        ChannelFlags::from_bits(self.status.load(Ordering::SeqCst))
    }

    fn clear_flags(&self, flags: ChannelFlags) {
        self.status.fetch_and(!flags.bits(), Ordering::SeqCst);
    }

    fn quiesce(&self) {
        self.quiesce_count.fetch_add(1, Ordering::SeqCst);
        self.set_control(ChannelControl::QUIESCENT);
        self.clear_flags(ChannelFlags::EVENTS);
    }
}

// ── Clock gate ───────────────────────────────────────────────────────────────

/// Mock clock gate recording which domains are running.
#[derive(Debug, Default)]
pub struct MockClockGate {
    running: AtomicU32,
    enable_calls: AtomicU32,
    disable_calls: AtomicU32,
}

impl MockClockGate {
    /// Create a gate with every domain stopped.
    pub const fn new() -> Self {
        Self {
            running: AtomicU32::new(0),
            enable_calls: AtomicU32::new(0),
            disable_calls: AtomicU32::new(0),
        }
    }

    /// `true` while `domain` is clocked.
    pub fn is_enabled(&self, domain: DomainId) -> bool {
        self.running.load(Ordering::SeqCst) & domain_bit(domain) != 0
    }

    /// Number of `enable_domain` calls.
    pub fn enable_calls(&self) -> u32 {
        self.enable_calls.load(Ordering::SeqCst)
    }

    /// Number of `disable_domain` calls.
    pub fn disable_calls(&self) -> u32 {
        self.disable_calls.load(Ordering::SeqCst)
    }
}

fn domain_bit(domain: DomainId) -> u32 {
    1u32 << (domain.0 & 31)
}

impl ClockGate for MockClockGate {
    fn enable_domain(&self, domain: DomainId) {
        self.enable_calls.fetch_add(1, Ordering::SeqCst);
        self.running.fetch_or(domain_bit(domain), Ordering::SeqCst);
    }

    fn disable_domain(&self, domain: DomainId) {
        self.disable_calls.fetch_add(1, Ordering::SeqCst);
        self.running.fetch_and(!domain_bit(domain), Ordering::SeqCst);
    }
}

// ── Vector controller ────────────────────────────────────────────────────────

/// Mock NVIC recording enabled vectors and their priorities.
pub struct MockVectors {
    enabled: CriticalSectionMutex<RefCell<heapless::LinearMap<VectorId, IrqPriority, 32>>>,
}

impl Default for MockVectors {
    fn default() -> Self {
        Self::new()
    }
}

impl MockVectors {
    /// Create a controller with every vector masked.
    pub const fn new() -> Self {
        Self {
            enabled: CriticalSectionMutex::new(RefCell::new(heapless::LinearMap::new())),
        }
    }

    /// `true` while `vector` is unmasked.
    pub fn is_enabled(&self, vector: VectorId) -> bool {
        self.priority(vector).is_some()
    }

    /// Priority `vector` was enabled with, if it is unmasked.
    pub fn priority(&self, vector: VectorId) -> Option<IrqPriority> {
        self.enabled.lock(|map| map.borrow().get(&vector).copied())
    }

    /// Number of unmasked vectors.
    pub fn enabled_count(&self) -> usize {
        self.enabled.lock(|map| map.borrow().len())
    }
}

impl VectorController for MockVectors {
    fn enable_vector(&self, vector: VectorId, priority: IrqPriority) {
        self.enabled.lock(|map| {
            // Capacity covers MAX_CHANNELS; a full map means a test bug.
            let _ = map.borrow_mut().insert(vector, priority);
        });
    }

    fn disable_vector(&self, vector: VectorId) {
        self.enabled.lock(|map| {
            map.borrow_mut().remove(&vector);
        });
    }
}

// ── Handlers ─────────────────────────────────────────────────────────────────

/// Handler recording every status word it receives.
pub struct RecordingHandler {
    calls: CriticalSectionMutex<RefCell<heapless::Vec<ChannelFlags, 16>>>,
}

impl Default for RecordingHandler {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordingHandler {
    /// Create a handler with no recorded calls.
    pub const fn new() -> Self {
        Self {
            calls: CriticalSectionMutex::new(RefCell::new(heapless::Vec::new())),
        }
    }

    /// Number of calls received.
    pub fn count(&self) -> usize {
        self.calls.lock(|calls| calls.borrow().len())
    }

    /// Status passed to the most recent call.
    pub fn last(&self) -> Option<ChannelFlags> {
        self.calls.lock(|calls| calls.borrow().last().copied())
    }
}

impl ChannelHandler for RecordingHandler {
    fn on_interrupt(&self, flags: ChannelFlags) {
        self.calls.lock(|calls| {
            // Older calls are enough for assertions once the buffer is full.
            let _ = calls.borrow_mut().push(flags);
        });
    }
}
