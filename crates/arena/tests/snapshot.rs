//! Snapshot save/load round-trips and validation failures

use std::fs;
use std::io::Write;
use std::ptr::NonNull;

use strata_arena::snapshot::{SNAPSHOT_MAGIC, SNAPSHOT_VERSION};
use strata_arena::{Arena, ArenaOptions, MemoryError};

fn snapshot_path(dir: &tempfile::TempDir, name: &str) -> std::path::PathBuf {
    dir.path().join(name)
}

#[test]
fn save_writes_exact_layout() {
    let dir = tempfile::tempdir().unwrap();
    let path = snapshot_path(&dir, "layout.snap");

    let arena = Arena::with_capacity(512).unwrap();
    let _ = arena.alloc_slice(b"hello\0").unwrap();
    arena.save(&path).unwrap();

    let bytes = fs::read(&path).unwrap();
    assert_eq!(bytes.len(), 21 + 6);
    assert_eq!(&bytes[..9], &SNAPSHOT_MAGIC);
    assert_eq!(&bytes[9..13], &SNAPSHOT_VERSION.to_le_bytes());
    assert_eq!(&bytes[13..21], &6u64.to_ne_bytes());
    assert_eq!(&bytes[21..], b"hello\0");
}

#[test]
fn round_trip_restores_offset_and_contents() {
    let dir = tempfile::tempdir().unwrap();
    let path = snapshot_path(&dir, "roundtrip.snap");

    let source = Arena::with_capacity(64).unwrap();
    let _ = source.alloc_slice(b"hello\0").unwrap();
    source.save(&path).unwrap();

    let mut target = Arena::with_capacity(512).unwrap();
    target.load(&path).unwrap();

    assert_eq!(target.used(), 6);
    assert!(target.peak() >= 6);
    let restored = unsafe { std::slice::from_raw_parts(target.base_ptr(), 6) };
    assert_eq!(restored, b"hello\0");
}

#[test]
fn empty_arena_round_trips() {
    let dir = tempfile::tempdir().unwrap();
    let path = snapshot_path(&dir, "empty.snap");

    let source = Arena::with_capacity(64).unwrap();
    source.save(&path).unwrap();
    assert_eq!(fs::read(&path).unwrap().len(), 21);

    let mut target = Arena::with_capacity(64).unwrap();
    let _ = target.alloc_bytes(10).unwrap();
    target.load(&path).unwrap();
    assert_eq!(target.used(), 0);
}

#[test]
fn bad_magic_is_rejected_without_mutation() {
    let dir = tempfile::tempdir().unwrap();
    let path = snapshot_path(&dir, "badmagic.snap");

    let mut file = fs::File::create(&path).unwrap();
    file.write_all(b"BADMAGIC\0").unwrap();
    file.write_all(&SNAPSHOT_VERSION.to_le_bytes()).unwrap();
    file.write_all(&0u64.to_ne_bytes()).unwrap();
    drop(file);

    let mut arena = Arena::with_capacity(64).unwrap();
    let _ = arena.alloc_slice(b"keep").unwrap();

    let err = arena.load(&path).unwrap_err();
    assert!(matches!(err, MemoryError::SnapshotInvalid { .. }));
    assert_eq!(arena.used(), 4);
    let kept = unsafe { std::slice::from_raw_parts(arena.base_ptr(), 4) };
    assert_eq!(kept, b"keep");
}

#[test]
fn unsupported_version_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = snapshot_path(&dir, "version.snap");

    let mut file = fs::File::create(&path).unwrap();
    file.write_all(&SNAPSHOT_MAGIC).unwrap();
    file.write_all(&7u32.to_le_bytes()).unwrap();
    file.write_all(&0u64.to_ne_bytes()).unwrap();
    drop(file);

    let mut arena = Arena::with_capacity(64).unwrap();
    let err = arena.load(&path).unwrap_err();
    assert!(matches!(err, MemoryError::SnapshotInvalid { .. }));
}

#[test]
fn truncated_header_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = snapshot_path(&dir, "truncated.snap");
    fs::write(&path, b"AREN").unwrap();

    let mut arena = Arena::with_capacity(64).unwrap();
    let err = arena.load(&path).unwrap_err();
    assert!(matches!(err, MemoryError::SnapshotInvalid { .. }));
}

#[test]
fn truncated_payload_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = snapshot_path(&dir, "shortpayload.snap");

    let mut file = fs::File::create(&path).unwrap();
    file.write_all(&SNAPSHOT_MAGIC).unwrap();
    file.write_all(&SNAPSHOT_VERSION.to_le_bytes()).unwrap();
    file.write_all(&32u64.to_ne_bytes()).unwrap();
    file.write_all(&[0xAB; 8]).unwrap(); // 8 of the promised 32 bytes
    drop(file);

    let mut arena = Arena::with_capacity(64).unwrap();
    let err = arena.load(&path).unwrap_err();
    assert!(matches!(err, MemoryError::SnapshotInvalid { .. }));
    // The offset was not advanced; the arena remains structurally valid.
    assert_eq!(arena.used(), 0);
    assert!(arena.is_valid());
}

#[test]
fn oversized_payload_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = snapshot_path(&dir, "oversized.snap");

    let source = Arena::with_capacity(256).unwrap();
    let _ = source.alloc_bytes(200).unwrap();
    source.save(&path).unwrap();

    let mut small = Arena::with_capacity(64).unwrap();
    let err = small.load(&path).unwrap_err();
    assert!(matches!(err, MemoryError::SnapshotInvalid { .. }));
    assert_eq!(small.used(), 0);
}

#[test]
fn missing_file_is_an_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = snapshot_path(&dir, "does-not-exist.snap");

    let mut arena = Arena::with_capacity(64).unwrap();
    let err = arena.load(&path).unwrap_err();
    assert!(matches!(err, MemoryError::SnapshotIo { .. }));
}

#[test]
fn non_owning_arena_rejects_snapshots() {
    let dir = tempfile::tempdir().unwrap();
    let path = snapshot_path(&dir, "notowned.snap");

    let mut backing = vec![0u8; 128];
    let ptr = NonNull::new(backing.as_mut_ptr()).unwrap();
    let mut arena =
        unsafe { Arena::from_raw_parts(ptr, backing.len(), ArenaOptions::new()) }.unwrap();

    let err = arena.save(&path).unwrap_err();
    assert!(matches!(err, MemoryError::NotOwned { .. }));
    let err = arena.load(&path).unwrap_err();
    assert!(matches!(err, MemoryError::NotOwned { .. }));
}

#[test]
fn load_clears_outstanding_markers() {
    let dir = tempfile::tempdir().unwrap();
    let path = snapshot_path(&dir, "markers.snap");

    let source = Arena::with_capacity(64).unwrap();
    let _ = source.alloc_bytes(8).unwrap();
    source.save(&path).unwrap();

    let mut target = Arena::with_capacity(64).unwrap();
    let _ = target.alloc_bytes(32).unwrap();
    let stale = target.mark().unwrap();
    target.load(&path).unwrap();

    assert_eq!(target.used(), 8);
    // The marker predates the load and is no longer honored.
    let err = unsafe { target.pop(stale).unwrap_err() };
    assert!(matches!(err, MemoryError::MarkerOutOfRange { .. }));
}
