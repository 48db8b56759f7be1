//! Concurrency properties of the thread-safe arena
#![cfg(feature = "thread-safe")]

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;

use strata_arena::Arena;

const THREADS: usize = 4;
const ROUNDS: usize = 200;

#[test]
fn concurrent_allocations_are_linearized() {
    let arena = Arc::new(Arena::with_capacity(THREADS * ROUNDS * 64).unwrap());

    let mut handles = Vec::new();
    for _ in 0..THREADS {
        let arena = Arc::clone(&arena);
        handles.push(thread::spawn(move || {
            let mut max_seen = 0usize;
            for _ in 0..ROUNDS {
                let _ = arena.alloc_bytes(16).unwrap();
                arena.update_peak();
                max_seen = max_seen.max(arena.used());
            }
            max_seen
        }));
    }

    let mut max_observed = 0usize;
    for handle in handles {
        max_observed = max_observed.max(handle.join().unwrap());
    }

    assert_eq!(arena.stats().total_allocations() as usize, THREADS * ROUNDS);
    assert_eq!(arena.used(), THREADS * ROUNDS * 16);
    assert!(arena.peak() >= max_observed);
    assert!(arena.peak() >= arena.used());
}

#[test]
fn is_valid_holds_during_concurrent_allocations() {
    let arena = Arc::new(Arena::with_capacity(1 << 20).unwrap());
    let stop = Arc::new(AtomicBool::new(false));

    let checker = {
        let arena = Arc::clone(&arena);
        let stop = Arc::clone(&stop);
        thread::spawn(move || {
            let mut checks = 0u64;
            while !stop.load(Ordering::Acquire) {
                assert!(arena.is_valid());
                checks += 1;
            }
            checks
        })
    };

    for _ in 0..2000 {
        let _ = arena.alloc_bytes(32).unwrap();
    }
    stop.store(true, Ordering::Release);
    assert!(checker.join().unwrap() > 0);
}

#[test]
fn concurrent_saves_of_quiescent_arena_are_identical() {
    let arena = Arc::new(Arena::with_capacity(4096).unwrap());
    let _ = arena.alloc_slice(&[0x5Au8; 1024]).unwrap();

    let dir = tempfile::tempdir().unwrap();
    let mut handles = Vec::new();
    for i in 0..2 {
        let arena = Arc::clone(&arena);
        let path = dir.path().join(format!("snap-{i}"));
        handles.push(thread::spawn(move || {
            arena.save(&path).unwrap();
            std::fs::read(&path).unwrap()
        }));
    }

    let first = handles.pop().unwrap().join().unwrap();
    let second = handles.pop().unwrap().join().unwrap();
    assert_eq!(first, second);
}

#[test]
fn stats_are_consistent_under_contention() {
    let arena = Arc::new(Arena::with_capacity(1 << 16).unwrap());

    let mut handles = Vec::new();
    for _ in 0..THREADS {
        let arena = Arc::clone(&arena);
        handles.push(thread::spawn(move || {
            let mut failures = 0u64;
            for _ in 0..ROUNDS {
                if arena.alloc_bytes(128).is_err() {
                    failures += 1;
                }
            }
            failures
        }));
    }

    let failures: u64 = handles.into_iter().map(|h| h.join().unwrap()).sum();
    let stats = arena.stats().snapshot();

    assert_eq!(stats.failed_allocations, failures);
    assert_eq!(
        stats.total_allocations + failures,
        (THREADS * ROUNDS) as u64
    );
    assert!(arena.used() <= arena.capacity());
}
