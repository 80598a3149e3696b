// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-name runtime directory: the filesystem rendezvous namespace.

use std::path::{Path, PathBuf};

use crate::env;
use crate::error::SingletonError;
use crate::metadata::{self, MetadataRead, RuntimeMetadata};

/// Paths for one logical name's runtime directory.
#[derive(Debug, Clone)]
pub struct RuntimeDir {
    pub dir: PathBuf,
    pub metadata_path: PathBuf,
    pub auth_path: PathBuf,
    pub lock_path: PathBuf,
}

impl RuntimeDir {
    /// Resolve the runtime directory for `service_name` under the
    /// platform/environment base directory (created on demand).
    pub fn resolve(service_name: &str) -> Result<Self, SingletonError> {
        let base = env::runtime_base_dir()?;
        Ok(Self::at(base.join(service_name)))
    }

    /// Build a `RuntimeDir` rooted at an explicit directory (used by tests
    /// and by callers that already resolved the base directory).
    pub fn at(dir: PathBuf) -> Self {
        Self {
            metadata_path: dir.join("metadata"),
            auth_path: dir.join("auth"),
            lock_path: dir.join("lock"),
            dir,
        }
    }

    /// Create the directory on demand with restrictive permissions where
    /// the host OS permits.
    pub fn ensure_exists(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.dir)?;
        restrict_dir_permissions(&self.dir)
    }

    /// Read the current metadata record; a missing directory or corrupt
    /// record are both reported as `MetadataRead::Missing` ("stale"),
    /// never as an error.
    pub fn read_metadata(&self) -> MetadataRead {
        if !self.dir.exists() {
            return MetadataRead::Missing;
        }
        metadata::read_metadata(&self.metadata_path)
    }

    /// Publish the metadata record atomically. Caller must hold the
    /// exclusive lock.
    pub fn publish_metadata(&self, record: &RuntimeMetadata) -> std::io::Result<()> {
        metadata::publish_metadata(&self.metadata_path, record)
    }

    /// Unlink the metadata record and auth token. Caller must hold the
    /// exclusive lock.
    pub fn clear(&self) -> std::io::Result<()> {
        metadata::clear_metadata(&self.metadata_path, &self.auth_path)
    }
}

#[cfg(unix)]
fn restrict_dir_permissions(dir: &Path) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(dir, std::fs::Permissions::from_mode(0o700))
}

#[cfg(not(unix))]
fn restrict_dir_permissions(_dir: &Path) -> std::io::Result<()> {
    Ok(())
}
