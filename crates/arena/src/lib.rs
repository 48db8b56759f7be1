//! # strata-arena
//!
//! Region-based memory allocation for the strata toolkit.
//!
//! A single-owner bump arena hands out aligned sub-ranges of one
//! contiguous byte buffer and reclaims them in bulk:
//! - marker-based LIFO rollback ([`ArenaMarker`])
//! - whole-arena reset
//! - nested sub-arenas carved from a parent's capacity ([`SubArena`])
//! - binary snapshots of the live buffer region to and from files
//!
//! Individual frees are never supported; that is the point of an arena.
//!
//! ## Quick Start
//!
//! ```rust
//! use strata_arena::{Arena, ArenaOptions};
//!
//! let arena = Arena::with_capacity(4096)?;
//!
//! let greeting = arena.alloc_str("hello")?;
//! assert_eq!(greeting, "hello");
//!
//! let marker = arena.mark()?;
//! let scratch = arena.alloc_slice(&[0u64; 16])?;
//! assert_eq!(scratch.len(), 16);
//!
//! // Roll back everything allocated after the marker.
//! unsafe { arena.pop(marker)? };
//! assert_eq!(arena.used(), marker.position());
//! # Ok::<(), strata_arena::MemoryError>(())
//! ```
//!
//! ## Features
//!
//! - `thread-safe` (default): reentrant per-arena locking; without it the
//!   arena is single-threaded
//! - `poison` (default): fill released memory with a debug pattern
//! - `logging` (default): lifecycle tracing via the `tracing` facade
//!
//! ## Pointer invalidation
//!
//! Buffer growth moves the arena's memory and invalidates every
//! previously returned pointer, so growth is disabled by default
//! ([`ArenaOptions::with_growth`] opts in). `reset` and `pop` invalidate
//! pointers too and are `unsafe` for that reason. The arena's
//! [`generation`](Arena::generation) counter changes whenever previously
//! returned pointers may have become dangling.

#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(clippy::all)]
#![warn(clippy::perf)]
#![warn(rust_2018_idioms)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
// Explicit lifetimes are clearer in unsafe/arena code even when elidable
#![allow(clippy::elidable_lifetime_names)]
// inline(always) on small alignment helpers is intentional for hot paths
#![allow(clippy::inline_always)]

// Error types
pub mod error;

// Core modules
pub mod arena;
pub mod growth;
pub mod observer;
pub mod snapshot;
pub mod stats;
pub mod utils;

mod sync;

// Re-export core types for convenience
pub use crate::arena::{
    Arena, ArenaId, ArenaMarker, ArenaOptions, DEFAULT_ALIGNMENT, MARKER_STACK_DEPTH, SubArena,
};
pub use crate::error::{MemoryError, MemoryResult, Result};
pub use crate::growth::{GrowthFn, default_growth};
pub use crate::observer::{ArenaEvent, ArenaObserver, ErrorSink, NoOpObserver};
pub use crate::stats::{ArenaStats, ArenaStatsSnapshot};

pub mod prelude {
    //! Convenient re-exports of commonly used types and traits.

    pub use crate::arena::{Arena, ArenaMarker, ArenaOptions, SubArena};
    pub use crate::error::{MemoryError, MemoryResult, Result};
    pub use crate::observer::{ArenaEvent, ArenaObserver, ErrorSink};
    pub use crate::stats::{ArenaStats, ArenaStatsSnapshot};
}
