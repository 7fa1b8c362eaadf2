//! Stable document ids for paths.

use std::fmt::Debug;
use std::hash::{DefaultHasher, Hash, Hasher};
use std::path::Path;

use crate::error::Result;

/// Gives a `u64` document id for a path that stays the same while the
/// file exists.
pub trait IdentityProvider: Send + Sync + Debug {
    fn identify(&self, path: &Path) -> Result<u64>;
}

/// Uses the file's inode number.
#[cfg(unix)]
#[derive(Debug, Clone, Copy, Default)]
pub struct InodeIdentity;

#[cfg(unix)]
impl IdentityProvider for InodeIdentity {
    fn identify(&self, path: &Path) -> Result<u64> {
        use std::os::unix::fs::MetadataExt;

        Ok(std::fs::metadata(path)?.ino())
    }
}

/// Hashes the path string. Used where inodes are unavailable; renaming a
/// file changes its id.
#[derive(Debug, Clone, Copy, Default)]
pub struct PathHashIdentity;

impl IdentityProvider for PathHashIdentity {
    fn identify(&self, path: &Path) -> Result<u64> {
        let mut hasher = DefaultHasher::new();
        path.hash(&mut hasher);
        Ok(hasher.finish())
    }
}

/// The identity provider for the current platform.
pub fn default_identity() -> Box<dyn IdentityProvider> {
    #[cfg(unix)]
    {
        Box::new(InodeIdentity)
    }
    #[cfg(not(unix))]
    {
        Box::new(PathHashIdentity)
    }
}
