//! Property-based tests for the channel allocator.
//! Random claim/release sequences are checked against a plain bitmask model.

#![allow(clippy::unwrap_used)]
#![allow(clippy::arithmetic_side_effects)]
#![allow(clippy::indexing_slicing)]
#![allow(clippy::cast_possible_truncation)]

use gpdma::mocks::{mock_allocator, two_domain_registry, DOMAIN_A, DOMAIN_B};
use gpdma::{ChannelMask, IrqPriority};
use proptest::prelude::*;

#[derive(Debug, Clone)]
enum Op {
    Claim(u32),
    Release(usize),
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => any::<u32>().prop_map(Op::Claim),
        // Narrow candidate sets hit exhaustion more often.
        2 => (0u32..=0xFFFF).prop_map(|bits| Op::Claim(bits & 0x0F0F)),
        3 => any::<usize>().prop_map(Op::Release),
    ]
}

proptest! {
    /// Every claim hands out the lowest free candidate inside [0, 16), and
    /// the ownership mask always equals the set of outstanding tokens.
    #[test]
    fn claims_follow_the_lowest_free_model(ops in proptest::collection::vec(op(), 1..64)) {
        let reg = two_domain_registry();
        let alloc = mock_allocator(&reg);
        let prio = IrqPriority::new(6).unwrap();
        let mut held = Vec::new();
        let mut model = 0u32;

        for op in ops {
            match op {
                Op::Claim(bits) => {
                    let free = bits & 0xFFFF & !model;
                    match alloc.claim_exclusive_locked(ChannelMask::from_bits(bits), prio, None) {
                        Ok(c) => {
                            prop_assert_ne!(free, 0);
                            prop_assert_eq!(c.id().index(), free.trailing_zeros() as usize);
                            model |= 1 << c.id().index();
                            held.push(c);
                        }
                        Err(_) => {
                            prop_assert_eq!(free, 0, "claim failed with {:#x} free", free);
                        }
                    }
                }
                Op::Release(pick) if !held.is_empty() => {
                    let c = held.swap_remove(pick % held.len());
                    model &= !(1 << c.id().index());
                    alloc.release_exclusive_locked(c);
                }
                Op::Release(_) => {}
            }

            prop_assert_eq!(alloc.owned_mask().bits(), model);
            prop_assert_eq!(alloc.owned_mask().len() as usize, held.len());
            prop_assert_eq!(
                alloc.clocks().is_enabled(DOMAIN_A),
                model & 0x00FF != 0,
                "domain A clock must run exactly while one of its channels is owned"
            );
            prop_assert_eq!(alloc.clocks().is_enabled(DOMAIN_B), model & 0xFF00 != 0);
        }

        for c in held {
            alloc.release_exclusive_locked(c);
        }
        prop_assert!(alloc.owned_mask().is_empty());
        prop_assert!(!alloc.clocks().is_enabled(DOMAIN_A));
        prop_assert!(!alloc.clocks().is_enabled(DOMAIN_B));
    }

    /// Two outstanding tokens never name the same channel.
    #[test]
    fn outstanding_tokens_are_distinct(masks in proptest::collection::vec(any::<u32>(), 1..24)) {
        let reg = two_domain_registry();
        let alloc = mock_allocator(&reg);
        let prio = IrqPriority::LOWEST;
        let mut seen = 0u32;
        let mut held = Vec::new();

        for bits in masks {
            if let Ok(c) = alloc.claim_exclusive_locked(ChannelMask::from_bits(bits), prio, None) {
                let bit = 1u32 << c.id().index();
                prop_assert_eq!(seen & bit, 0, "channel {} handed out twice", c.id().index());
                prop_assert_ne!(bits & bit, 0, "channel outside its candidate set");
                seen |= bit;
                held.push(c);
            }
        }
        for c in held {
            alloc.release_exclusive_locked(c);
        }
    }
}
