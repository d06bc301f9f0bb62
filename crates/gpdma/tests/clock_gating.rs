//! Clock-domain and interrupt-vector side effects of claim/release.

#![allow(clippy::unwrap_used)]

use gpdma::mocks::{mock_allocator, two_domain_registry, RecordingHandler, DOMAIN_A, DOMAIN_B};
use gpdma::{ChannelMask, IrqPriority, VectorId};

const DOMAIN_A_MASK: ChannelMask = ChannelMask::from_bits(0x00FF);
const DOMAIN_B_MASK: ChannelMask = ChannelMask::from_bits(0xFF00);

fn prio(level: u8) -> IrqPriority {
    IrqPriority::new(level).unwrap()
}

// ── Clock domains ────────────────────────────────────────────────────────────

#[test]
fn claim_enables_only_the_channels_domain() {
    let reg = two_domain_registry();
    let alloc = mock_allocator(&reg);
    assert!(!alloc.clocks().is_enabled(DOMAIN_A));
    assert!(!alloc.clocks().is_enabled(DOMAIN_B));

    let c = alloc.claim_exclusive_locked(DOMAIN_B_MASK, prio(3), None).unwrap();
    assert!(alloc.clocks().is_enabled(DOMAIN_B));
    assert!(!alloc.clocks().is_enabled(DOMAIN_A), "domain A untouched");
    assert_eq!(alloc.clocks().enable_calls(), 1);

    alloc.release_exclusive_locked(c);
}

#[test]
fn domain_clock_runs_until_last_member_is_released() {
    let reg = two_domain_registry();
    let alloc = mock_allocator(&reg);

    let a0 = alloc.claim_exclusive_locked(DOMAIN_A_MASK, prio(3), None).unwrap();
    let a1 = alloc.claim_exclusive_locked(DOMAIN_A_MASK, prio(3), None).unwrap();
    let b0 = alloc.claim_exclusive_locked(DOMAIN_B_MASK, prio(3), None).unwrap();
    // Enabling is requested on every claim; the gate is idempotent.
    assert_eq!(alloc.clocks().enable_calls(), 3);

    alloc.release_exclusive_locked(a0);
    assert!(alloc.clocks().is_enabled(DOMAIN_A), "a1 still owned");
    assert_eq!(alloc.clocks().disable_calls(), 0);

    alloc.release_exclusive_locked(b0);
    assert!(!alloc.clocks().is_enabled(DOMAIN_B));
    assert!(alloc.clocks().is_enabled(DOMAIN_A), "releasing B never stops A");

    alloc.release_exclusive_locked(a1);
    assert!(!alloc.clocks().is_enabled(DOMAIN_A));
    assert_eq!(alloc.clocks().disable_calls(), 2);
}

#[test]
fn failed_claim_does_not_touch_clocks() {
    let reg = two_domain_registry();
    let alloc = mock_allocator(&reg);

    assert!(alloc
        .claim_exclusive_locked(ChannelMask::EMPTY, prio(3), None)
        .is_err());
    assert_eq!(alloc.clocks().enable_calls(), 0);
    assert_eq!(alloc.vectors().enabled_count(), 0);
}

// ── Interrupt vectors ────────────────────────────────────────────────────────

#[test]
fn vector_enabled_only_when_a_handler_is_registered() {
    let reg = two_domain_registry();
    let handler = RecordingHandler::new();
    let alloc = mock_allocator(&reg);

    let silent = alloc.claim_exclusive_locked(ChannelMask::ALL, prio(2), None).unwrap();
    assert!(!alloc.vectors().is_enabled(silent.descriptor().vector()));

    let noisy = alloc
        .claim_exclusive_locked(ChannelMask::ALL, prio(7), Some(&handler))
        .unwrap();
    let vector = noisy.descriptor().vector();
    assert_eq!(vector, VectorId(101), "mock channel 1 uses vector 101");
    assert_eq!(alloc.vectors().priority(vector), Some(prio(7)));

    alloc.release_exclusive_locked(noisy);
    assert!(!alloc.vectors().is_enabled(vector), "release masks the vector");

    alloc.release_exclusive_locked(silent);
    assert_eq!(alloc.vectors().enabled_count(), 0);
}
