//! Property-based tests for alignment and marker round-trips

use std::sync::Arc;

use proptest::prelude::*;
use strata_arena::{Arena, ArenaOptions, ErrorSink};

/// Sink that swallows expected-failure reports so proptest output stays
/// readable
fn quiet() -> ErrorSink {
    Arc::new(|_message| {})
}

proptest! {
    #[test]
    fn returned_pointers_honor_alignment(
        size in 1usize..512,
        align_pow in 0u32..8,
    ) {
        let align = 1usize << align_pow;
        let arena = Arena::with_capacity(8192).unwrap();

        let ptr = arena.alloc_bytes_aligned(size, align).unwrap();
        prop_assert_eq!(ptr.as_ptr() as usize % align, 0);
        prop_assert!(arena.used() <= arena.capacity());
    }

    #[test]
    fn marker_round_trip_restores_used(sizes in prop::collection::vec(1usize..128, 1..16)) {
        let arena = Arena::with_capacity(1 << 16).unwrap();
        let _ = arena.alloc_bytes(32).unwrap();

        let marker = arena.mark().unwrap();
        let before = arena.used();
        for size in &sizes {
            let _ = arena.alloc_bytes(*size).unwrap();
        }
        prop_assert!(arena.used() >= before + sizes.iter().sum::<usize>());

        unsafe { arena.pop(marker).unwrap() };
        prop_assert_eq!(arena.used(), before);
        prop_assert_eq!(arena.stats().live_allocations(), 1);
    }

    #[test]
    fn offset_never_exceeds_capacity(sizes in prop::collection::vec(1usize..512, 0..64)) {
        let arena = Arena::new(
            ArenaOptions::new().with_initial_size(4096).with_error_sink(quiet()),
        )
        .unwrap();
        for size in sizes {
            let _ = arena.alloc_bytes(size);
            prop_assert!(arena.used() <= arena.capacity());
            prop_assert!(arena.peak() >= arena.used());
        }
    }

    #[test]
    fn growth_keeps_invariants(sizes in prop::collection::vec(1usize..256, 1..32)) {
        let arena = Arena::new(
            ArenaOptions::new().with_initial_size(64).with_growth(true),
        )
        .unwrap();

        let mut requested = 0usize;
        for size in sizes {
            let _ = arena.alloc_bytes(size).unwrap();
            requested += size;
        }

        prop_assert!(arena.used() >= requested);
        prop_assert!(arena.used() <= arena.capacity());
        prop_assert_eq!(arena.stats().failed_allocations(), 0);
        prop_assert!(arena.stats().bytes_allocated() >= requested as u64);
    }
}
