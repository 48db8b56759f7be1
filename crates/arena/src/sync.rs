//! Per-arena locking primitive
//!
//! The lock is reentrant within a thread so observer callbacks fired from
//! inside an arena operation may call back into the same arena. When the
//! `thread-safe` feature is disabled the primitive collapses to a no-op
//! and the arena becomes single-threaded.

#[cfg(feature = "thread-safe")]
mod imp {
    use parking_lot::{ReentrantMutex, ReentrantMutexGuard};

    /// Reentrant scoped lock guarding an arena's mutable state
    #[derive(Debug, Default)]
    pub(crate) struct ArenaLock {
        inner: ReentrantMutex<()>,
    }

    impl ArenaLock {
        pub(crate) fn new() -> Self {
            Self {
                inner: ReentrantMutex::new(()),
            }
        }

        /// Acquire the lock; released when the guard drops
        #[inline]
        pub(crate) fn lock(&self) -> ReentrantMutexGuard<'_, ()> {
            self.inner.lock()
        }
    }
}

#[cfg(not(feature = "thread-safe"))]
mod imp {
    /// No-op stand-in used in single-threaded builds
    #[derive(Debug, Default)]
    pub(crate) struct ArenaLock;

    /// Zero-sized guard matching the locked build's RAII shape
    pub(crate) struct ArenaLockGuard;

    impl ArenaLock {
        pub(crate) fn new() -> Self {
            Self
        }

        #[inline]
        pub(crate) fn lock(&self) -> ArenaLockGuard {
            ArenaLockGuard
        }
    }
}

pub(crate) use imp::ArenaLock;
