//! Interrupt dispatch: acknowledge, filter on enabled sources, route to owner.

#![allow(clippy::unwrap_used)]

use core::cell::RefCell;
use core::sync::atomic::{AtomicU32, Ordering};

use embassy_sync::blocking_mutex::CriticalSectionMutex;
use gpdma::mocks::{
    mock_allocator, two_domain_registry, MockAllocator, MockChannel, RecordingHandler, DOMAIN_A,
};
use gpdma::{
    ChannelControl, ChannelFlags, ChannelHandler, ChannelMask, ChannelRegisters, Claimed,
    IrqPriority,
};

fn prio() -> IrqPriority {
    IrqPriority::new(4).unwrap()
}

#[test]
fn enabled_source_reaches_owner_with_full_status() {
    let reg = two_domain_registry();
    let handler = RecordingHandler::new();
    let alloc = mock_allocator(&reg);

    let c = alloc
        .claim_exclusive_locked(ChannelMask::ALL, prio(), Some(&handler))
        .unwrap();
    c.regs().set_control(ChannelControl::EN | ChannelControl::TCIE);

    // Half-transfer is not enabled but is reported alongside transfer-complete.
    let raised = ChannelFlags::TRANSFER_COMPLETE | ChannelFlags::HALF_TRANSFER;
    c.regs().raise(raised);
    alloc.serve_interrupt(c.descriptor());

    assert_eq!(handler.count(), 1);
    assert_eq!(handler.last(), Some(raised), "status forwarded verbatim");
    assert!(c.regs().status().is_empty(), "every reported flag acknowledged");

    alloc.release_exclusive_locked(c);
}

#[test]
fn flags_without_enabled_source_are_dropped() {
    let reg = two_domain_registry();
    let handler = RecordingHandler::new();
    let alloc = mock_allocator(&reg);

    let c = alloc
        .claim_exclusive_locked(ChannelMask::ALL, prio(), Some(&handler))
        .unwrap();
    c.regs().set_control(ChannelControl::EN | ChannelControl::TCIE);

    c.regs().raise(ChannelFlags::HALF_TRANSFER | ChannelFlags::IDLE);
    alloc.serve_interrupt(c.descriptor());

    assert_eq!(handler.count(), 0, "no enabled source among the reported flags");
    assert!(
        !c.regs().status().intersects(ChannelFlags::EVENTS),
        "still acknowledged"
    );

    alloc.release_exclusive_locked(c);
}

#[test]
fn interrupt_for_released_channel_is_acknowledged_silently() {
    let reg = two_domain_registry();
    let handler = RecordingHandler::new();
    let alloc = mock_allocator(&reg);

    let c = alloc
        .claim_exclusive_locked(ChannelMask::ALL, prio(), Some(&handler))
        .unwrap();
    let descriptor = c.descriptor();
    alloc.release_exclusive_locked(c);

    // Stale configuration and a late flag left behind by the previous owner.
    descriptor.regs().set_control(ChannelControl::TCIE);
    descriptor.regs().raise(ChannelFlags::TRANSFER_COMPLETE);
    alloc.serve_interrupt(descriptor);

    assert_eq!(handler.count(), 0);
    assert!(descriptor.regs().status().is_empty());
}

#[test]
fn channel_claimed_without_handler_never_dispatches() {
    let reg = two_domain_registry();
    let alloc = mock_allocator(&reg);

    let c = alloc.claim_exclusive_locked(ChannelMask::ALL, prio(), None).unwrap();
    c.regs().set_control(ChannelControl::EN | ChannelControl::DTEIE);
    c.regs().raise(ChannelFlags::DATA_ERROR);
    alloc.serve_interrupt(c.descriptor());

    assert!(c.regs().status().is_empty());
    alloc.release_exclusive_locked(c);
}

#[test]
fn interrupts_route_to_the_owning_channel_only() {
    let reg = two_domain_registry();
    let first = RecordingHandler::new();
    let second = RecordingHandler::new();
    let alloc = mock_allocator(&reg);

    let a = alloc
        .claim_exclusive_locked(ChannelMask::ALL, prio(), Some(&first))
        .unwrap();
    let b = alloc
        .claim_exclusive_locked(ChannelMask::ALL, prio(), Some(&second))
        .unwrap();
    for c in [&a, &b] {
        c.regs().set_control(ChannelControl::EN | ChannelControl::TCIE | ChannelControl::DTEIE);
    }

    b.regs().raise(ChannelFlags::DATA_ERROR);
    alloc.serve_interrupt_by_id(b.id());

    assert_eq!(first.count(), 0);
    assert_eq!(second.count(), 1);
    assert!(second.last().unwrap().is_error());

    alloc.release_exclusive_locked(a);
    alloc.release_exclusive_locked(b);
}

#[test]
fn closures_capture_their_own_context() {
    let reg = two_domain_registry();
    let completed = AtomicU32::new(0);
    let on_complete = |flags: ChannelFlags| {
        if flags.contains(ChannelFlags::TRANSFER_COMPLETE) {
            completed.fetch_add(1, Ordering::SeqCst);
        }
    };
    let alloc = mock_allocator(&reg);

    let c = alloc
        .claim_exclusive_locked(ChannelMask::from_bits(0xFF00), prio(), Some(&on_complete))
        .unwrap();
    c.regs().set_control(ChannelControl::EN | ChannelControl::TCIE);

    for _ in 0..3 {
        c.regs().raise(ChannelFlags::TRANSFER_COMPLETE);
        alloc.serve_interrupt(c.descriptor());
    }
    // An interrupt with nothing pending is spurious.
    alloc.serve_interrupt(c.descriptor());

    assert_eq!(completed.load(Ordering::SeqCst), 3);
    alloc.release_exclusive_locked(c);
}

/// Completion handler that hands its channel back from interrupt context.
struct ReleaseOnComplete {
    dma: &'static MockAllocator<'static, 16>,
    token: CriticalSectionMutex<RefCell<Option<Claimed<'static, MockChannel>>>>,
}

impl ChannelHandler for ReleaseOnComplete {
    fn on_interrupt(&self, flags: ChannelFlags) {
        if !flags.contains(ChannelFlags::TRANSFER_COMPLETE) {
            return;
        }
        if let Some(token) = self.token.lock(|t| t.borrow_mut().take()) {
            self.dma.release_exclusive_locked(token);
        }
    }
}

#[test]
fn handler_may_release_its_own_channel() {
    let reg: &'static _ = Box::leak(Box::new(two_domain_registry()));
    let dma: &'static MockAllocator<'static, 16> = Box::leak(Box::new(mock_allocator(reg)));
    let handler: &'static ReleaseOnComplete = Box::leak(Box::new(ReleaseOnComplete {
        dma,
        token: CriticalSectionMutex::new(RefCell::new(None)),
    }));

    let c = dma
        .claim_exclusive_locked(ChannelMask::ALL, prio(), Some(handler))
        .unwrap();
    let descriptor = c.descriptor();
    let vector = descriptor.vector();
    c.regs().set_control(ChannelControl::EN | ChannelControl::TCIE);
    handler.token.lock(|t| *t.borrow_mut() = Some(c));

    descriptor.regs().raise(ChannelFlags::TRANSFER_COMPLETE);
    dma.serve_interrupt(descriptor);

    assert!(dma.owned_mask().is_empty(), "released from inside the handler");
    assert!(!dma.vectors().is_enabled(vector));
    assert!(!dma.clocks().is_enabled(DOMAIN_A));

    // The channel is immediately claimable again, and a late interrupt for
    // the old owner is dropped.
    descriptor.regs().raise(ChannelFlags::TRANSFER_COMPLETE);
    dma.serve_interrupt(descriptor);
    let again = dma.claim_exclusive_locked(ChannelMask::ALL, prio(), None).unwrap();
    assert_eq!(again.id(), descriptor.id());
    dma.release_exclusive_locked(again);
}
