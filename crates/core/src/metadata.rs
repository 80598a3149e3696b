// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Runtime metadata record.
//!
//! The record is published by the daemon under the runtime directory lock
//! and read lock-free by clients; torn or missing files are never treated
//! as fatal, only as "stale".

use std::io;
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

/// The published descriptor of a live daemon.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuntimeMetadata {
    pub protocol_version: u32,
    pub pid: u32,
    pub host: String,
    pub port: u16,
    pub service_name: String,
    pub codec_id: String,
    pub started_at_unix_ms: u64,
}

impl RuntimeMetadata {
    pub fn new(protocol_version: u32, port: u16, service_name: &str, codec_id: &str) -> Self {
        Self {
            protocol_version,
            pid: std::process::id(),
            host: "127.0.0.1".to_string(),
            port,
            service_name: service_name.to_string(),
            codec_id: codec_id.to_string(),
            started_at_unix_ms: now_unix_ms(),
        }
    }
}

fn now_unix_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Outcome of reading the metadata file.
pub enum MetadataRead {
    Valid(RuntimeMetadata),
    /// File missing, unreadable, or not valid JSON — equivalent to "stale".
    Missing,
}

/// Read the metadata record. Parse failures are promoted to `Missing`
/// rather than propagated, so callers treat a torn write the same way they
/// treat a daemon that never started.
pub fn read_metadata(path: &Path) -> MetadataRead {
    match std::fs::read(path) {
        Ok(bytes) => match serde_json::from_slice::<RuntimeMetadata>(&bytes) {
            Ok(m) => MetadataRead::Valid(m),
            Err(_) => MetadataRead::Missing,
        },
        Err(_) => MetadataRead::Missing,
    }
}

/// Atomically publish the metadata record: write to a temp file in the same
/// directory, then rename over the final path. Must be called while holding
/// the runtime directory's exclusive lock.
pub fn publish_metadata(path: &Path, metadata: &RuntimeMetadata) -> io::Result<()> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let tmp_path = dir.join(format!("metadata.tmp.{}", std::process::id()));
    let json = serde_json::to_vec_pretty(metadata)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    std::fs::write(&tmp_path, json)?;
    std::fs::rename(&tmp_path, path)?;
    Ok(())
}

/// Unlink the metadata record and its sibling auth-token file. Must be
/// called while holding the runtime directory's exclusive lock. Missing
/// files are not an error.
pub fn clear_metadata(metadata_path: &Path, auth_path: &Path) -> io::Result<()> {
    for p in [metadata_path, auth_path] {
        match std::fs::remove_file(p) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(e),
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn publish_then_read_round_trips() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("metadata");
        let metadata = RuntimeMetadata::new(1, 4242, "demo", "json-v1");
        publish_metadata(&path, &metadata).unwrap();

        match read_metadata(&path) {
            MetadataRead::Valid(read_back) => assert_eq!(read_back, metadata),
            MetadataRead::Missing => panic!("expected valid metadata"),
        }
    }

    #[test]
    fn corrupt_metadata_is_reported_as_missing() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("metadata");
        std::fs::write(&path, b"not json").unwrap();
        assert!(matches!(read_metadata(&path), MetadataRead::Missing));
    }

    #[test]
    fn missing_file_is_reported_as_missing() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("does-not-exist");
        assert!(matches!(read_metadata(&path), MetadataRead::Missing));
    }

    #[test]
    fn clear_removes_both_files_and_tolerates_absence() {
        let dir = tempdir().unwrap();
        let metadata_path = dir.path().join("metadata");
        let auth_path = dir.path().join("auth");
        std::fs::write(&metadata_path, b"{}").unwrap();
        std::fs::write(&auth_path, b"token").unwrap();

        clear_metadata(&metadata_path, &auth_path).unwrap();
        assert!(!metadata_path.exists());
        assert!(!auth_path.exists());

        // Calling again on already-absent files must not error.
        clear_metadata(&metadata_path, &auth_path).unwrap();
    }
}
