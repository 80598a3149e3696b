// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Auth token generation, storage, and constant-time comparison.

use std::io;
use std::path::Path;

use rand::RngCore;
use subtle::ConstantTimeEq;

/// 256 bits of entropy.
const TOKEN_BYTES: usize = 32;

/// An opaque bearer credential. The bytes are the sole secret; equality
/// must only ever be checked via [`AuthToken::matches`].
#[derive(Clone)]
pub struct AuthToken(Vec<u8>);

impl AuthToken {
    /// Generate a fresh token with the configured entropy.
    pub fn generate() -> Self {
        let mut bytes = vec![0u8; TOKEN_BYTES];
        rand::rng().fill_bytes(&mut bytes);
        Self(bytes)
    }

    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Constant-time comparison, independent of where the two tokens
    /// diverge. Used for HELLO handshake verification.
    pub fn matches(&self, other: &AuthToken) -> bool {
        self.0.ct_eq(&other.0).into()
    }

    /// Write the token to `path` with the most restrictive permissions the
    /// host OS supports (mode 0600 on unix).
    pub fn write_to(&self, path: &Path) -> io::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, &self.0)?;
        restrict_permissions(path)?;
        Ok(())
    }

    pub fn read_from(path: &Path) -> io::Result<Self> {
        Ok(Self(std::fs::read(path)?))
    }
}

#[cfg(unix)]
fn restrict_permissions(path: &Path) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))
}

#[cfg(not(unix))]
fn restrict_permissions(_path: &Path) -> io::Result<()> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn generated_tokens_have_configured_entropy() {
        let token = AuthToken::generate();
        assert_eq!(token.as_bytes().len(), TOKEN_BYTES);
    }

    #[test]
    fn distinct_tokens_do_not_match() {
        let a = AuthToken::generate();
        let b = AuthToken::generate();
        assert!(!a.matches(&b));
    }

    #[test]
    fn a_token_matches_itself() {
        let a = AuthToken::generate();
        let b = AuthToken::from_bytes(a.as_bytes().to_vec());
        assert!(a.matches(&b));
    }

    #[test]
    fn round_trips_through_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("auth");
        let token = AuthToken::generate();
        token.write_to(&path).unwrap();

        let read_back = AuthToken::read_from(&path).unwrap();
        assert!(token.matches(&read_back));

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = std::fs::metadata(&path).unwrap().permissions().mode();
            assert_eq!(mode & 0o777, 0o600);
        }
    }
}
