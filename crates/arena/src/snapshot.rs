//! Binary snapshot I/O for the live portion of an arena buffer
//!
//! File layout (packed, 21-byte header):
//!
//! | Offset | Size   | Field     | Value                               |
//! |--------|--------|-----------|-------------------------------------|
//! | 0      | 9      | `magic`   | ASCII `ARENASNAP`                   |
//! | 9      | 4      | `version` | little-endian u32, currently `1`    |
//! | 13     | 8      | `used`    | host-endian u64                     |
//! | 21     | `used` | payload   | raw bytes `buffer[0..used]`         |
//!
//! The `used` field is stored in host byte order; snapshots are not
//! portable across architectures.

use core::slice;
use core::sync::atomic::Ordering;
use std::fs::File;
use std::io::{self, Read, Write};
use std::path::Path;

use crate::arena::Arena;
use crate::error::{MemoryError, MemoryResult};

/// Magic bytes opening every snapshot file
pub const SNAPSHOT_MAGIC: [u8; 9] = *b"ARENASNAP";

/// Current snapshot format version
pub const SNAPSHOT_VERSION: u32 = 1;

const HEADER_LEN: usize = SNAPSHOT_MAGIC.len() + 4 + 8;

fn read_error(operation: &'static str, err: &io::Error) -> MemoryError {
    if err.kind() == io::ErrorKind::UnexpectedEof {
        MemoryError::snapshot_invalid(format!("truncated file while reading {operation}"))
    } else {
        MemoryError::snapshot_io(operation, err)
    }
}

impl Arena {
    /// Writes the live portion of the buffer to `path`
    ///
    /// Fails when the arena does not own its buffer or is being
    /// destroyed. The offset and buffer pointer are snapshotted under the
    /// lock; the payload itself is written after the lock is released, so
    /// callers must guarantee the arena is quiescent for the duration of
    /// the call.
    pub fn save(&self, path: impl AsRef<Path>) -> MemoryResult<()> {
        if !self.owns_buffer.load(Ordering::Acquire) {
            return Err(self.report(MemoryError::not_owned("save")));
        }

        let (base, used) = {
            let _guard = self.lock.lock();
            if self.destroying.load(Ordering::Acquire) {
                return Err(self.report(MemoryError::busy("save")));
            }
            (
                self.ptr.load(Ordering::Acquire),
                self.offset.load(Ordering::Acquire),
            )
        };

        let mut file = File::create(path.as_ref())
            .map_err(|err| self.report(MemoryError::snapshot_io("create", &err)))?;

        file.write_all(&SNAPSHOT_MAGIC)
            .and_then(|()| file.write_all(&SNAPSHOT_VERSION.to_le_bytes()))
            .and_then(|()| file.write_all(&(used as u64).to_ne_bytes()))
            .map_err(|err| self.report(MemoryError::snapshot_io("write header", &err)))?;

        // SAFETY: base..base + used is the live region; the caller
        // guarantees no concurrent mutation while the payload is written.
        let payload = unsafe { slice::from_raw_parts(base, used) };
        file.write_all(payload)
            .map_err(|err| self.report(MemoryError::snapshot_io("write payload", &err)))?;

        #[cfg(feature = "logging")]
        tracing::debug!(id = self.id().get(), used, "arena snapshot saved");

        Ok(())
    }

    /// Restores a snapshot from `path` into this arena's buffer
    ///
    /// Fails without mutating the arena on a bad magic, an unsupported
    /// version, or a payload larger than the arena's capacity. On success
    /// the offset becomes the snapshot's `used` value, outstanding
    /// markers are cleared, and the peak is raised to at least `used`.
    /// On a payload read failure the buffer contents are unspecified but
    /// the arena remains structurally valid.
    pub fn load(&mut self, path: impl AsRef<Path>) -> MemoryResult<()> {
        if !self.owns_buffer.load(Ordering::Acquire) {
            return Err(self.report(MemoryError::not_owned("load")));
        }

        let _guard = self.lock.lock();
        if self.destroying.load(Ordering::Acquire) {
            return Err(self.report(MemoryError::busy("load")));
        }

        let mut file = File::open(path.as_ref())
            .map_err(|err| self.report(MemoryError::snapshot_io("open", &err)))?;

        let mut header = [0u8; HEADER_LEN];
        file.read_exact(&mut header)
            .map_err(|err| self.report(read_error("header", &err)))?;

        if header[..SNAPSHOT_MAGIC.len()] != SNAPSHOT_MAGIC {
            return Err(self.report(MemoryError::snapshot_invalid("bad magic")));
        }

        let mut version = [0u8; 4];
        version.copy_from_slice(&header[9..13]);
        let version = u32::from_le_bytes(version);
        if version != SNAPSHOT_VERSION {
            return Err(self.report(MemoryError::snapshot_invalid(format!(
                "unsupported version {version} (expected {SNAPSHOT_VERSION})"
            ))));
        }

        let mut used = [0u8; 8];
        used.copy_from_slice(&header[13..21]);
        let used = u64::from_ne_bytes(used);
        let Ok(used) = usize::try_from(used) else {
            return Err(self.report(MemoryError::snapshot_invalid(format!(
                "payload size {used} does not fit the address space"
            ))));
        };

        let capacity = self.size.load(Ordering::Relaxed);
        if used > capacity {
            return Err(self.report(MemoryError::snapshot_invalid(format!(
                "payload of {used} bytes exceeds arena capacity of {capacity}"
            ))));
        }

        let base = self.ptr.load(Ordering::Relaxed);
        // SAFETY: used <= capacity, and &mut self rules out concurrent
        // access to the buffer.
        let dst = unsafe { slice::from_raw_parts_mut(base, used) };
        file.read_exact(dst)
            .map_err(|err| self.report(read_error("payload", &err)))?;

        self.offset.store(used, Ordering::Release);
        self.markers.get_mut().clear();
        self.stats.update_peak(used);

        #[cfg(feature = "logging")]
        tracing::debug!(id = self.id().get(), used, "arena snapshot loaded");

        Ok(())
    }
}
