//! Standalone error types for strata-arena
//!
//! Uses thiserror for clean, idiomatic Rust error definitions.

use thiserror::Error;

/// Arena memory management errors
#[must_use = "errors should be handled"]
#[non_exhaustive]
#[derive(Error, Debug, Clone)]
pub enum MemoryError {
    // --- Allocation Errors ---
    #[error("memory allocation failed: {size} bytes with {align} byte alignment")]
    AllocationFailed { size: usize, align: usize },

    #[error("arena exhausted: requested {requested} bytes, available {available}")]
    ArenaExhausted { requested: usize, available: usize },

    #[error("allocation exceeds maximum size: {requested} bytes (max: {max})")]
    ExceedsMaxSize { requested: usize, max: usize },

    #[error("invalid alignment: {alignment} (must be a power of two)")]
    InvalidAlignment { alignment: usize },

    #[error("invalid argument: {reason}")]
    InvalidArgument { reason: String },

    // --- Marker Errors ---
    #[error("marker out of range: marker at {marker}, arena offset at {offset}")]
    MarkerOutOfRange { marker: usize, offset: usize },

    #[error("marker stack full (capacity: {capacity})")]
    MarkerStackFull { capacity: usize },

    // --- Snapshot Errors ---
    #[error("invalid snapshot: {reason}")]
    SnapshotInvalid { reason: String },

    #[error("snapshot i/o failed during {operation}: {reason}")]
    SnapshotIo {
        operation: &'static str,
        reason: String,
    },

    // --- Lifecycle Errors ---
    #[error("arena does not own its buffer: {operation} requires ownership")]
    NotOwned { operation: &'static str },

    #[error("arena is being destroyed: {operation} rejected")]
    Busy { operation: &'static str },
}

impl MemoryError {
    /// Get error code for categorization
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::AllocationFailed { .. } => "ARENA:ALLOC:FAILED",
            Self::ArenaExhausted { .. } => "ARENA:ALLOC:EXHAUSTED",
            Self::ExceedsMaxSize { .. } => "ARENA:ALLOC:MAX",
            Self::InvalidAlignment { .. } => "ARENA:ARG:ALIGN",
            Self::InvalidArgument { .. } => "ARENA:ARG:INVALID",
            Self::MarkerOutOfRange { .. } => "ARENA:MARKER:RANGE",
            Self::MarkerStackFull { .. } => "ARENA:MARKER:FULL",
            Self::SnapshotInvalid { .. } => "ARENA:SNAPSHOT:INVALID",
            Self::SnapshotIo { .. } => "ARENA:SNAPSHOT:IO",
            Self::NotOwned { .. } => "ARENA:LIFECYCLE:OWNERSHIP",
            Self::Busy { .. } => "ARENA:LIFECYCLE:BUSY",
        }
    }

    /// Check if error indicates exhausted capacity (retry after releasing memory)
    #[must_use]
    pub fn is_out_of_memory(&self) -> bool {
        matches!(
            self,
            Self::AllocationFailed { .. } | Self::ArenaExhausted { .. } | Self::ExceedsMaxSize { .. }
        )
    }

    /// Check if error was caused by an in-flight destroy
    #[must_use]
    pub fn is_busy(&self) -> bool {
        matches!(self, Self::Busy { .. })
    }

    // --- Convenience Constructors ---

    /// Create allocation failed error
    #[must_use]
    pub fn allocation_failed(size: usize, align: usize) -> Self {
        Self::AllocationFailed { size, align }
    }

    /// Create arena exhausted error
    #[must_use]
    pub fn arena_exhausted(requested: usize, available: usize) -> Self {
        Self::ArenaExhausted {
            requested,
            available,
        }
    }

    /// Create allocation too large error
    #[must_use]
    pub fn exceeds_max_size(requested: usize, max: usize) -> Self {
        Self::ExceedsMaxSize { requested, max }
    }

    /// Create invalid alignment error
    #[must_use]
    pub fn invalid_alignment(alignment: usize) -> Self {
        Self::InvalidAlignment { alignment }
    }

    /// Create invalid argument error
    pub fn invalid_argument(reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            reason: reason.into(),
        }
    }

    /// Create marker out of range error
    #[must_use]
    pub fn marker_out_of_range(marker: usize, offset: usize) -> Self {
        Self::MarkerOutOfRange { marker, offset }
    }

    /// Create marker stack full error
    #[must_use]
    pub fn marker_stack_full(capacity: usize) -> Self {
        Self::MarkerStackFull { capacity }
    }

    /// Create invalid snapshot error
    pub fn snapshot_invalid(reason: impl Into<String>) -> Self {
        Self::SnapshotInvalid {
            reason: reason.into(),
        }
    }

    /// Create snapshot i/o error
    pub fn snapshot_io(operation: &'static str, source: &std::io::Error) -> Self {
        Self::SnapshotIo {
            operation,
            reason: source.to_string(),
        }
    }

    /// Create ownership error
    #[must_use]
    pub fn not_owned(operation: &'static str) -> Self {
        Self::NotOwned { operation }
    }

    /// Create busy error
    #[must_use]
    pub fn busy(operation: &'static str) -> Self {
        Self::Busy { operation }
    }
}

/// Result type for arena operations
pub type MemoryResult<T> = core::result::Result<T, MemoryError>;

/// Generic result type alias
pub type Result<T> = MemoryResult<T>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_messages_carry_context() {
        let error = MemoryError::arena_exhausted(1024, 512);
        assert!(error.to_string().contains("1024"));
        assert!(error.to_string().contains("512"));

        let error = MemoryError::invalid_alignment(3);
        assert!(error.to_string().contains("power of two"));
    }

    #[test]
    fn error_codes() {
        assert_eq!(
            MemoryError::allocation_failed(1024, 8).code(),
            "ARENA:ALLOC:FAILED"
        );
        assert_eq!(MemoryError::busy("alloc").code(), "ARENA:LIFECYCLE:BUSY");
        assert_eq!(
            MemoryError::not_owned("save").code(),
            "ARENA:LIFECYCLE:OWNERSHIP"
        );
    }

    #[test]
    fn predicates() {
        assert!(MemoryError::arena_exhausted(64, 0).is_out_of_memory());
        assert!(MemoryError::exceeds_max_size(usize::MAX, 0).is_out_of_memory());
        assert!(!MemoryError::invalid_alignment(3).is_out_of_memory());
        assert!(MemoryError::busy("reset").is_busy());
    }
}
