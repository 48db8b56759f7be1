//! Region-based bump arena
//!
//! The [`Arena`] owns (or borrows) one contiguous byte buffer and hands
//! out aligned sub-ranges of it by advancing an offset. Reclamation is
//! always bulk: roll back to an [`ArenaMarker`], `reset` the whole arena,
//! or destroy it. Individual frees are never supported.
//!
//! Basic usage:
//!
//! ```
//! use strata_arena::arena::Arena;
//!
//! let arena = Arena::with_capacity(1024)?;
//! let value = arena.alloc(42u32)?;
//! assert_eq!(*value, 42);
//! # Ok::<(), strata_arena::MemoryError>(())
//! ```

mod marker;
mod subarena;

pub use marker::{ArenaMarker, MARKER_STACK_DEPTH};
pub use subarena::SubArena;

pub(crate) use marker::MarkerFrame;

use core::cell::UnsafeCell;
use core::fmt;
use core::mem;
use core::num::NonZeroU64;
use core::ptr::{self, NonNull};
use core::sync::atomic::{AtomicBool, AtomicPtr, AtomicU64, AtomicUsize, Ordering};
use std::alloc::{Layout, alloc as heap_alloc, dealloc as heap_dealloc};
use std::sync::Arc;

use crate::error::{MemoryError, MemoryResult};
use crate::growth::{GrowthFn, default_growth};
use crate::observer::{ArenaEvent, ArenaObserver, ErrorSink, dispatch_error};
use crate::stats::ArenaStats;
use crate::sync::ArenaLock;
use crate::utils::{align_up, poison};

/// Default allocation alignment: the platform's maximum scalar alignment
pub const DEFAULT_ALIGNMENT: usize = 16;

type MarkerStack = heapless::Vec<MarkerFrame, MARKER_STACK_DEPTH>;

/// Process-wide unique arena identifier
///
/// Uses `NonZeroU64` so `Option<ArenaId>` stays pointer-sized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ArenaId(NonZeroU64);

impl ArenaId {
    /// Generate a new unique arena ID
    ///
    /// IDs are generated atomically and increase monotonically within the
    /// process.
    #[must_use]
    pub(crate) fn next() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(1);
        let id = COUNTER.fetch_add(1, Ordering::Relaxed);
        // COUNTER starts at 1, so zero is only reachable after wraparound.
        Self(NonZeroU64::new(id).unwrap_or(NonZeroU64::MIN))
    }

    /// Raw ID value
    #[inline]
    #[must_use]
    pub fn get(self) -> u64 {
        self.0.get()
    }
}

impl fmt::Display for ArenaId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Arena construction options
#[derive(Clone)]
pub struct ArenaOptions {
    /// Buffer size in bytes for internally allocated buffers
    pub initial_size: usize,
    /// Whether the arena may reallocate its buffer on exhaustion
    ///
    /// Growth moves the buffer and invalidates every previously returned
    /// pointer, so it is off by default.
    pub can_grow: bool,
    /// Growth policy consulted when `can_grow` is set
    pub growth: GrowthFn,
    /// Debug label used in error reports
    pub label: String,
    /// Observer notified of alloc/reset/destroy events
    pub observer: Option<Arc<dyn ArenaObserver>>,
    /// Sink receiving formatted error messages; stderr when unset
    pub error_sink: Option<ErrorSink>,
}

impl ArenaOptions {
    /// Creates options with default values
    #[must_use]
    pub fn new() -> Self {
        Self {
            initial_size: 4096,
            can_grow: false,
            growth: default_growth,
            label: String::from("arena"),
            observer: None,
            error_sink: None,
        }
    }

    /// Sets the initial buffer size
    #[must_use = "builder methods must be chained or built"]
    pub fn with_initial_size(mut self, size: usize) -> Self {
        self.initial_size = size;
        self
    }

    /// Enables or disables buffer growth
    #[must_use = "builder methods must be chained or built"]
    pub fn with_growth(mut self, can_grow: bool) -> Self {
        self.can_grow = can_grow;
        self
    }

    /// Sets the growth policy
    #[must_use = "builder methods must be chained or built"]
    pub fn with_growth_fn(mut self, growth: GrowthFn) -> Self {
        self.growth = growth;
        self
    }

    /// Sets the debug label
    #[must_use = "builder methods must be chained or built"]
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    /// Installs an event observer
    #[must_use = "builder methods must be chained or built"]
    pub fn with_observer(mut self, observer: Arc<dyn ArenaObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Installs an error sink
    #[must_use = "builder methods must be chained or built"]
    pub fn with_error_sink(mut self, sink: ErrorSink) -> Self {
        self.error_sink = Some(sink);
        self
    }

    /// Validates the options
    pub fn validate(&self) -> MemoryResult<()> {
        if self.initial_size == 0 {
            return Err(MemoryError::invalid_argument(
                "initial size must be greater than 0",
            ));
        }
        Ok(())
    }
}

impl Default for ArenaOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ArenaOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArenaOptions")
            .field("initial_size", &self.initial_size)
            .field("can_grow", &self.can_grow)
            .field("label", &self.label)
            .field("observer", &self.observer.is_some())
            .field("error_sink", &self.error_sink.is_some())
            .finish()
    }
}

/// Where an arena's buffer comes from
enum BufferSource {
    /// Allocate `size` bytes internally; the arena owns and releases them
    Fresh { size: usize },
    /// Adopt caller-allocated storage; the arena owns and releases it
    Adopted {
        ptr: NonNull<u8>,
        size: usize,
        align: usize,
    },
    /// Reference external storage; the caller keeps ownership
    Borrowed { ptr: NonNull<u8>, size: usize },
}

/// Region-based bump allocator
///
/// Mutating operations funnel through the per-arena reentrant lock;
/// lifecycle flags are atomics so early-exit checks and [`is_valid`]
/// work without acquiring it.
///
/// [`is_valid`]: Arena::is_valid
pub struct Arena {
    /// Start of the backing buffer; null once destroyed
    pub(crate) ptr: AtomicPtr<u8>,
    /// Capacity in bytes
    pub(crate) size: AtomicUsize,
    /// Bytes in use from the start of the buffer
    pub(crate) offset: AtomicUsize,
    /// Alignment the owned buffer was allocated with (release needs it)
    buf_align: AtomicUsize,
    pub(crate) owns_buffer: AtomicBool,
    can_grow: AtomicBool,
    pub(crate) destroying: AtomicBool,
    /// Bumped whenever the buffer moves or the offset rolls back
    generation: AtomicU64,
    growth: GrowthFn,
    pub(crate) markers: UnsafeCell<MarkerStack>,
    observer: Option<Arc<dyn ArenaObserver>>,
    error_sink: Option<ErrorSink>,
    label: String,
    id: ArenaId,
    parent: Option<ArenaId>,
    pub(crate) stats: ArenaStats,
    pub(crate) lock: ArenaLock,
}

// SAFETY: the marker stack and buffer contents are only mutated while the
// reentrant lock is held (or through &mut self); everything else is atomic.
#[cfg(feature = "thread-safe")]
unsafe impl Sync for Arena {}

// SAFETY: the raw buffer pointer is owned (or borrowed with a caller-side
// liveness contract) and carries no thread affinity.
unsafe impl Send for Arena {}

impl Arena {
    // --- Lifecycle -------------------------------------------------------

    /// Creates an arena with an internally allocated, owned buffer
    pub fn new(options: ArenaOptions) -> MemoryResult<Self> {
        options.validate().map_err(|err| {
            Self::report_detached(options.error_sink.as_ref(), &options.label, &err);
            err
        })?;
        Self::initialize(
            BufferSource::Fresh {
                size: options.initial_size,
            },
            None,
            options,
        )
    }

    /// Creates an arena with default options and the given capacity
    pub fn with_capacity(capacity: usize) -> MemoryResult<Self> {
        Self::new(ArenaOptions::new().with_initial_size(capacity))
    }

    /// Creates an arena from a pre-allocated boxed slice
    ///
    /// The arena takes ownership of the storage and releases it on
    /// destroy. The buffer cannot be grown beyond its original length
    /// unless `options.can_grow` is set, in which case growth reallocates
    /// through the global allocator like any owned buffer.
    pub fn from_boxed_slice(buffer: Box<[u8]>, options: ArenaOptions) -> MemoryResult<Self> {
        if buffer.is_empty() {
            let err = MemoryError::invalid_argument("buffer must not be empty");
            Self::report_detached(options.error_sink.as_ref(), &options.label, &err);
            return Err(err);
        }
        let size = buffer.len();
        let raw = Box::into_raw(buffer) as *mut u8;
        // SAFETY: Box::into_raw never returns null.
        let ptr = unsafe { NonNull::new_unchecked(raw) };
        Self::initialize(
            BufferSource::Adopted {
                ptr,
                size,
                align: 1,
            },
            None,
            options,
        )
    }

    /// Creates an arena over an external buffer the caller keeps alive
    ///
    /// The arena does not own the buffer: destroy leaves it untouched,
    /// growth is disabled, and snapshot operations are rejected.
    ///
    /// # Safety
    ///
    /// `ptr..ptr + size` must be valid for reads and writes for the whole
    /// lifetime of the arena, and must not be accessed through any other
    /// path while the arena is live.
    pub unsafe fn from_raw_parts(
        ptr: NonNull<u8>,
        size: usize,
        options: ArenaOptions,
    ) -> MemoryResult<Self> {
        if size == 0 {
            let err = MemoryError::invalid_argument("buffer must not be empty");
            Self::report_detached(options.error_sink.as_ref(), &options.label, &err);
            return Err(err);
        }
        Self::initialize(BufferSource::Borrowed { ptr, size }, None, options)
    }

    /// Destroys the current contents and re-initializes in place
    ///
    /// The arena gets a fresh internally allocated buffer and a new id;
    /// the struct storage is reused.
    pub fn reinit(&mut self, options: ArenaOptions) -> MemoryResult<()> {
        let fresh = Self::new(options)?;
        self.destroy();
        *self = fresh;
        Ok(())
    }

    /// Destroys the current contents and re-initializes over an external buffer
    ///
    /// # Safety
    ///
    /// Same contract as [`Arena::from_raw_parts`].
    pub unsafe fn reinit_with_buffer(
        &mut self,
        ptr: NonNull<u8>,
        size: usize,
        options: ArenaOptions,
    ) -> MemoryResult<()> {
        let fresh = unsafe { Self::from_raw_parts(ptr, size, options)? };
        self.destroy();
        *self = fresh;
        Ok(())
    }

    /// Single finalization routine every constructor converges on
    fn initialize(
        source: BufferSource,
        parent: Option<ArenaId>,
        options: ArenaOptions,
    ) -> MemoryResult<Self> {
        let (ptr, size, align, owns, can_grow) = match source {
            BufferSource::Fresh { size } => {
                let ptr = Self::allocate_buffer(size).map_err(|err| {
                    Self::report_detached(options.error_sink.as_ref(), &options.label, &err);
                    err
                })?;
                (ptr, size, DEFAULT_ALIGNMENT, true, options.can_grow)
            }
            BufferSource::Adopted { ptr, size, align } => {
                (ptr, size, align, true, options.can_grow)
            }
            // External buffers cannot be reallocated, so growth is off
            // regardless of the requested options.
            BufferSource::Borrowed { ptr, size } => (ptr, size, 1, false, false),
        };

        let id = ArenaId::next();

        #[cfg(feature = "logging")]
        tracing::debug!(
            id = id.get(),
            size,
            owns,
            can_grow,
            label = options.label.as_str(),
            "arena initialized"
        );

        Ok(Self {
            ptr: AtomicPtr::new(ptr.as_ptr()),
            size: AtomicUsize::new(size),
            offset: AtomicUsize::new(0),
            buf_align: AtomicUsize::new(align),
            owns_buffer: AtomicBool::new(owns),
            can_grow: AtomicBool::new(can_grow),
            destroying: AtomicBool::new(false),
            generation: AtomicU64::new(0),
            growth: options.growth,
            markers: UnsafeCell::new(MarkerStack::new()),
            observer: options.observer,
            error_sink: options.error_sink,
            label: options.label,
            id,
            parent,
            stats: ArenaStats::new(),
            lock: ArenaLock::new(),
        })
    }

    /// Releases the buffer and clears metadata; idempotent
    ///
    /// The struct itself stays usable for queries (`used` reports 0,
    /// `is_valid` reports false) and statistics remain readable but
    /// frozen. Every mutating entry point rejects with a busy error once
    /// destruction has started, including observer callbacks fired from
    /// the destroy event itself.
    pub fn destroy(&mut self) {
        if self
            .destroying
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return;
        }

        #[cfg(feature = "logging")]
        tracing::debug!(id = self.id.get(), label = self.label.as_str(), "arena destroyed");

        if let Some(observer) = self.observer.clone() {
            observer.on_event(self, &ArenaEvent::Destroy);
        }

        let ptr = self.ptr.swap(ptr::null_mut(), Ordering::AcqRel);
        let size = self.size.swap(0, Ordering::AcqRel);
        if self.owns_buffer.swap(false, Ordering::AcqRel) && !ptr.is_null() && size > 0 {
            let align = self.buf_align.load(Ordering::Relaxed);
            // SAFETY: the buffer was allocated with exactly this layout and
            // the ownership bit guaranteed nobody else releases it.
            unsafe {
                Self::release_buffer(ptr, size, align);
            }
        }

        self.offset.store(0, Ordering::Release);
        self.markers.get_mut().clear();
        self.stats.release_all();
        self.generation.fetch_add(1, Ordering::Relaxed);
    }

    fn allocate_buffer(size: usize) -> MemoryResult<NonNull<u8>> {
        let layout = Layout::from_size_align(size, DEFAULT_ALIGNMENT)
            .map_err(|_| MemoryError::exceeds_max_size(size, crate::growth::MAX_ARENA_SIZE))?;
        // SAFETY: layout has non-zero size (callers validate) and a valid
        // power-of-two alignment.
        let raw = unsafe { heap_alloc(layout) };
        NonNull::new(raw).ok_or_else(|| MemoryError::allocation_failed(size, DEFAULT_ALIGNMENT))
    }

    /// # Safety
    ///
    /// `ptr` must have been allocated with exactly `(size, align)`.
    unsafe fn release_buffer(ptr: *mut u8, size: usize, align: usize) {
        unsafe {
            heap_dealloc(ptr, Layout::from_size_align_unchecked(size, align));
        }
    }

    // --- Allocation ------------------------------------------------------

    /// Allocates `size` bytes at the default alignment
    ///
    /// Returns a pointer into the arena buffer. The pointed-to bytes are
    /// uninitialized. The pointer is invalidated by buffer growth,
    /// rollback past it, reset and destroy.
    pub fn alloc_bytes(&self, size: usize) -> MemoryResult<NonNull<u8>> {
        self.alloc_bytes_aligned(size, DEFAULT_ALIGNMENT)
    }

    /// Allocates `size` bytes aligned to `align` (a power of two)
    pub fn alloc_bytes_aligned(&self, size: usize, align: usize) -> MemoryResult<NonNull<u8>> {
        let _guard = self.lock.lock();

        if self.destroying.load(Ordering::Acquire) {
            return Err(self.report(MemoryError::busy("alloc")));
        }
        if size == 0 {
            return Err(self.report(MemoryError::invalid_argument("zero-size allocation")));
        }
        if !align.is_power_of_two() {
            return Err(self.report(MemoryError::invalid_alignment(align)));
        }

        let offset = self.offset.load(Ordering::Relaxed);
        let capacity = self.size.load(Ordering::Relaxed);
        let mut base = self.ptr.load(Ordering::Relaxed) as usize;
        debug_assert!(base != 0, "live arena must have a buffer");

        let mut aligned = align_up(base + offset, align);
        let end = match aligned.checked_add(size) {
            Some(end) if end <= base + capacity => end,
            _ => {
                // Exhausted: grow when the policy allows it, fail otherwise.
                if !(self.can_grow.load(Ordering::Acquire)
                    && self.owns_buffer.load(Ordering::Acquire))
                {
                    self.stats.record_failure();
                    return Err(self.report(MemoryError::arena_exhausted(
                        size,
                        capacity.saturating_sub(offset),
                    )));
                }

                // Worst-case requirement that holds for any new base address.
                let required = offset
                    .checked_add(align - 1)
                    .and_then(|v| v.checked_add(size));
                let Some(required) = required else {
                    self.stats.record_failure();
                    return Err(self.report(MemoryError::exceeds_max_size(
                        size,
                        crate::growth::MAX_ARENA_SIZE,
                    )));
                };

                if let Err(err) = self.grow_locked(required.saturating_sub(capacity)) {
                    self.stats.record_failure();
                    return Err(self.report(err));
                }

                base = self.ptr.load(Ordering::Relaxed) as usize;
                aligned = align_up(base + offset, align);
                let end = aligned + size;
                debug_assert!(end <= base + self.size.load(Ordering::Relaxed));
                end
            }
        };

        // `end` is an absolute address; the new offset is relative.
        let new_offset = end - base;
        self.offset.store(new_offset, Ordering::Release);
        self.stats.record_allocation(size);
        self.stats.update_peak(new_offset);

        // SAFETY: aligned lies within the buffer, which is never null here.
        let result = unsafe { NonNull::new_unchecked(aligned as *mut u8) };

        if let Some(observer) = &self.observer {
            observer.on_event(self, &ArenaEvent::Alloc { ptr: result, size });
        }

        Ok(result)
    }

    /// Allocates `size` zero-filled bytes at the default alignment
    pub fn alloc_bytes_zeroed(&self, size: usize) -> MemoryResult<NonNull<u8>> {
        let _guard = self.lock.lock();
        let ptr = self.alloc_bytes(size)?;
        // SAFETY: alloc_bytes just reserved `size` writable bytes at `ptr`.
        unsafe {
            ptr::write_bytes(ptr.as_ptr(), 0, size);
        }
        Ok(ptr)
    }

    /// Resizes the allocation at `old`, in place when it was the most
    /// recent one and capacity allows, by copy otherwise
    ///
    /// The old range is poisoned when the data moves; its bytes are not
    /// reclaimed (arenas never free individual blocks).
    ///
    /// # Safety
    ///
    /// `old` must be the pointer of a prior allocation of `old_size` bytes
    /// from this arena, still within the live region.
    pub unsafe fn realloc_bytes(
        &self,
        old: NonNull<u8>,
        old_size: usize,
        new_size: usize,
    ) -> MemoryResult<NonNull<u8>> {
        let _guard = self.lock.lock();

        if self.destroying.load(Ordering::Acquire) {
            return Err(self.report(MemoryError::busy("realloc")));
        }
        if new_size == 0 {
            return Err(self.report(MemoryError::invalid_argument("zero-size reallocation")));
        }

        let base = self.ptr.load(Ordering::Relaxed) as usize;
        let offset = self.offset.load(Ordering::Relaxed);
        let capacity = self.size.load(Ordering::Relaxed);
        let old_addr = old.as_ptr() as usize;
        let is_most_recent = old_addr + old_size == base + offset;

        if is_most_recent {
            if new_size >= old_size {
                let extra = new_size - old_size;
                if let Some(new_offset) = offset.checked_add(extra).filter(|end| *end <= capacity)
                {
                    self.offset.store(new_offset, Ordering::Release);
                    self.stats.record_extend(extra);
                    self.stats.update_peak(new_offset);
                    return Ok(old);
                }
                // Fall through to the copying path below.
            } else {
                let shrink = old_size - new_size;
                // SAFETY: the released tail is inside the live buffer.
                unsafe {
                    poison((old_addr + new_size) as *mut u8, shrink);
                }
                self.offset.store(offset - shrink, Ordering::Release);
                return Ok(old);
            }
        }

        // The buffer may move if the fresh allocation grows it, so track
        // the old block by offset rather than by address.
        let old_off = old_addr - base;
        let fresh = self.alloc_bytes(new_size)?;
        let base = self.ptr.load(Ordering::Relaxed);
        // SAFETY: old_off..old_off + old_size was live before the fresh
        // allocation and growth copies the live region verbatim; the fresh
        // block is disjoint from it.
        unsafe {
            let src = base.add(old_off);
            ptr::copy_nonoverlapping(src, fresh.as_ptr(), old_size.min(new_size));
            poison(src, old_size);
        }
        Ok(fresh)
    }

    /// Allocates and initializes a value
    ///
    /// Zero-sized types succeed without consuming arena space.
    pub fn alloc<T>(&self, value: T) -> MemoryResult<&mut T> {
        if mem::size_of::<T>() == 0 {
            let ptr = NonNull::<T>::dangling().as_ptr();
            // SAFETY: any dangling, aligned pointer is valid for a ZST;
            // the write moves `value` in without running its destructor.
            unsafe {
                ptr.write(value);
                return Ok(&mut *ptr);
            }
        }
        let ptr =
            self.alloc_bytes_aligned(mem::size_of::<T>(), mem::align_of::<T>())?.as_ptr() as *mut T;
        // SAFETY: just allocated properly aligned space for T.
        unsafe {
            ptr.write(value);
            Ok(&mut *ptr)
        }
    }

    /// Allocates and copies a slice
    pub fn alloc_slice<T: Copy>(&self, slice: &[T]) -> MemoryResult<&mut [T]> {
        if slice.is_empty() {
            return Ok(&mut []);
        }
        let ptr =
            self.alloc_bytes_aligned(mem::size_of_val(slice), mem::align_of::<T>())?.as_ptr()
                as *mut T;
        // SAFETY: just allocated properly aligned space for the slice.
        unsafe {
            ptr::copy_nonoverlapping(slice.as_ptr(), ptr, slice.len());
            Ok(&mut *ptr::slice_from_raw_parts_mut(ptr, slice.len()))
        }
    }

    /// Allocates a string
    pub fn alloc_str(&self, s: &str) -> MemoryResult<&str> {
        let bytes = self.alloc_slice(s.as_bytes())?;
        // SAFETY: bytes came from valid UTF-8.
        unsafe { Ok(core::str::from_utf8_unchecked(bytes)) }
    }

    /// Reallocates the buffer; callers hold the lock
    fn grow_locked(&self, additional: usize) -> MemoryResult<()> {
        let old_size = self.size.load(Ordering::Relaxed);
        let Some(new_size) = (self.growth)(old_size, additional) else {
            return Err(MemoryError::exceeds_max_size(
                old_size.saturating_add(additional),
                crate::growth::MAX_ARENA_SIZE,
            ));
        };

        let new_ptr = Self::allocate_buffer(new_size)?;
        let offset = self.offset.load(Ordering::Relaxed);
        let old_ptr = self.ptr.load(Ordering::Relaxed);
        // SAFETY: both regions are live and disjoint; offset <= old_size.
        unsafe {
            ptr::copy_nonoverlapping(old_ptr, new_ptr.as_ptr(), offset);
            Self::release_buffer(old_ptr, old_size, self.buf_align.load(Ordering::Relaxed));
        }

        self.ptr.store(new_ptr.as_ptr(), Ordering::Release);
        self.size.store(new_size, Ordering::Release);
        self.buf_align.store(DEFAULT_ALIGNMENT, Ordering::Relaxed);
        self.generation.fetch_add(1, Ordering::Relaxed);

        #[cfg(feature = "logging")]
        tracing::debug!(
            id = self.id.get(),
            old_size,
            new_size,
            "arena grown; outstanding pointers are invalidated"
        );

        Ok(())
    }

    // --- State operations ------------------------------------------------

    /// Bytes in use from the start of the buffer
    pub fn used(&self) -> usize {
        let _guard = self.lock.lock();
        self.offset.load(Ordering::Relaxed)
    }

    /// Bytes still available before the arena is exhausted
    pub fn remaining(&self) -> usize {
        let _guard = self.lock.lock();
        self.size.load(Ordering::Relaxed) - self.offset.load(Ordering::Relaxed)
    }

    /// Current buffer capacity in bytes
    pub fn capacity(&self) -> usize {
        let _guard = self.lock.lock();
        self.size.load(Ordering::Relaxed)
    }

    /// Highest offset ever observed
    pub fn peak(&self) -> usize {
        let _guard = self.lock.lock();
        self.stats.peak_usage()
    }

    /// Folds the current offset into the recorded peak
    ///
    /// Atomic-safe; callable from an observer while the lock is held.
    pub fn update_peak(&self) {
        self.stats.update_peak(self.offset.load(Ordering::Acquire));
    }

    /// Records the current offset as a rollback marker
    ///
    /// Fails when [`MARKER_STACK_DEPTH`] markers are already outstanding.
    pub fn mark(&self) -> MemoryResult<ArenaMarker> {
        let _guard = self.lock.lock();
        if self.destroying.load(Ordering::Acquire) {
            return Err(self.report(MemoryError::busy("mark")));
        }

        let position = self.offset.load(Ordering::Relaxed);
        // SAFETY: marker stack is only touched under the lock.
        let frames = unsafe { &mut *self.markers.get() };
        if frames
            .push(MarkerFrame {
                position,
                live: self.stats.live_allocations(),
            })
            .is_err()
        {
            return Err(self.report(MemoryError::marker_stack_full(MARKER_STACK_DEPTH)));
        }
        Ok(ArenaMarker {
            position,
            depth: frames.len(),
        })
    }

    /// Rolls back to `marker`, releasing every later allocation
    ///
    /// The released range is poisoned when the `poison` feature is on.
    /// A marker that lies past the current offset, or that was already
    /// invalidated by a reset or an older pop, is rejected without any
    /// state change.
    ///
    /// # Safety
    ///
    /// Every pointer returned by an allocation made after `marker` becomes
    /// dangling; the caller must ensure none of them is used again.
    pub unsafe fn pop(&self, marker: ArenaMarker) -> MemoryResult<()> {
        let _guard = self.lock.lock();
        if self.destroying.load(Ordering::Acquire) {
            return Err(self.report(MemoryError::busy("pop")));
        }

        let offset = self.offset.load(Ordering::Relaxed);
        if marker.position > offset {
            return Err(self.report(MemoryError::marker_out_of_range(marker.position, offset)));
        }

        // SAFETY: marker stack is only touched under the lock.
        let frames = unsafe { &mut *self.markers.get() };
        let frame = match frames.get(marker.depth.wrapping_sub(1)) {
            Some(frame) if frame.position == marker.position => *frame,
            _ => {
                return Err(
                    self.report(MemoryError::marker_out_of_range(marker.position, offset))
                );
            }
        };
        frames.truncate(marker.depth - 1);

        let base = self.ptr.load(Ordering::Relaxed);
        // SAFETY: position..offset is inside the live buffer.
        unsafe {
            poison(base.add(marker.position), offset - marker.position);
        }
        self.offset.store(marker.position, Ordering::Release);
        self.stats.restore_live(frame.live);
        self.generation.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    /// Releases every allocation and rewinds the offset to zero
    ///
    /// The whole buffer is poisoned when the `poison` feature is on;
    /// markers are cleared; `peak_usage` is intentionally preserved.
    /// During destroy this is a no-op that reports a busy error.
    ///
    /// # Safety
    ///
    /// Every pointer previously returned by this arena becomes dangling;
    /// the caller must ensure none of them is used again.
    pub unsafe fn reset(&self) {
        let _guard = self.lock.lock();
        if self.destroying.load(Ordering::Acquire) {
            let _ = self.report(MemoryError::busy("reset"));
            return;
        }

        let base = self.ptr.load(Ordering::Relaxed);
        let size = self.size.load(Ordering::Relaxed);
        // SAFETY: the whole buffer is live and writable.
        unsafe {
            poison(base, size);
        }
        self.offset.store(0, Ordering::Release);
        {
            // SAFETY: marker stack is only touched under the lock.
            let frames = unsafe { &mut *self.markers.get() };
            frames.clear();
        }
        self.stats.release_all();
        self.generation.fetch_add(1, Ordering::Relaxed);

        if let Some(observer) = &self.observer {
            observer.on_event(self, &ArenaEvent::Reset);
        }
    }

    // --- Queries and debug surfaces --------------------------------------

    /// Unique, process-wide monotonic id
    pub fn id(&self) -> ArenaId {
        self.id
    }

    /// Debug label used in error reports
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Replaces the debug label
    pub fn set_label(&mut self, label: impl Into<String>) {
        self.label = label.into();
    }

    /// Id of the parent arena when this is a sub-arena
    pub fn parent_id(&self) -> Option<ArenaId> {
        self.parent
    }

    /// Number of times the buffer moved or the offset rolled back
    ///
    /// A pointer obtained before the counter changed may be dangling.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Relaxed)
    }

    /// Whether destroy will release the buffer
    pub fn owns_buffer(&self) -> bool {
        self.owns_buffer.load(Ordering::Acquire)
    }

    /// Whether the arena may reallocate its buffer on exhaustion
    pub fn can_grow(&self) -> bool {
        self.can_grow.load(Ordering::Acquire)
    }

    /// Whether destruction has started
    pub fn is_destroying(&self) -> bool {
        self.destroying.load(Ordering::Acquire)
    }

    /// Defensive validity predicate; never mutates and takes no lock
    pub fn is_valid(&self) -> bool {
        if self.destroying.load(Ordering::Acquire) {
            return false;
        }
        let ptr = self.ptr.load(Ordering::Acquire);
        let size = self.size.load(Ordering::Acquire);
        let offset = self.offset.load(Ordering::Acquire);
        !ptr.is_null() && size > 0 && offset <= size
    }

    /// Raw pointer to the start of the buffer
    ///
    /// Useful for diagnostics and snapshot verification. Invalidated by
    /// growth, reset and destroy; null once the arena is destroyed.
    pub fn base_ptr(&self) -> *const u8 {
        self.ptr.load(Ordering::Acquire)
    }

    /// Allocation statistics
    pub fn stats(&self) -> &ArenaStats {
        &self.stats
    }

    /// Formats an error, dispatches it to the sink and hands it back
    pub(crate) fn report(&self, err: MemoryError) -> MemoryError {
        let message = format!("arena '{}' #{}: {}", self.label, self.id, err);
        dispatch_error(self.error_sink.as_ref(), &message);
        err
    }

    /// Error dispatch for paths with no arena yet (constructors)
    fn report_detached(sink: Option<&ErrorSink>, label: &str, err: &MemoryError) {
        let message = format!("arena '{label}': {err}");
        dispatch_error(sink, &message);
    }

    /// Internal constructor used by [`Arena::subarena`]
    pub(crate) fn new_borrowed(
        ptr: NonNull<u8>,
        size: usize,
        parent: Option<ArenaId>,
        options: ArenaOptions,
    ) -> MemoryResult<Self> {
        Self::initialize(BufferSource::Borrowed { ptr, size }, parent, options)
    }
}

impl Drop for Arena {
    fn drop(&mut self) {
        self.destroy();
    }
}

impl fmt::Debug for Arena {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Arena")
            .field("id", &self.id)
            .field("label", &self.label)
            .field("size", &self.size.load(Ordering::Relaxed))
            .field("offset", &self.offset.load(Ordering::Relaxed))
            .field("owns_buffer", &self.owns_buffer.load(Ordering::Relaxed))
            .field("can_grow", &self.can_grow.load(Ordering::Relaxed))
            .field("destroying", &self.destroying.load(Ordering::Relaxed))
            .field("generation", &self.generation.load(Ordering::Relaxed))
            .field("parent", &self.parent)
            .finish_non_exhaustive()
    }
}
