//! # pkgcache-store
//!
//! On-disk store for package distribution files with case-insensitive
//! name resolution.
//!
//! ## Directory Layout
//!
//! ```text
//! <root>/
//! └── packages/
//!     └── D/                      # first character of the package name
//!         └── Django/             # package name, case preserved
//!             └── Django-1.0.tar.gz
//! ```
//!
//! Files are raw bytes, identical to what was written. A package exists
//! as long as its directory does; there is no separate metadata.
//!
//! Reads that miss on the exact-case path fall back to a case-insensitive
//! scan of what is stored ("fishing"). Writes never fish and never
//! overwrite.

mod cache;
mod layout;
mod listing;
pub mod remote;
mod resolve;
mod write;

pub use cache::PackageCache;
pub use layout::{shard_letter, validate_filename, validate_package, PACKAGES_DIR};
pub use listing::{file_checksum, FileIter, FileRecord};
pub use remote::{RemoteError, RemoteIndex};
pub use resolve::ResolvedFile;

use std::io;
use std::path::{Path, PathBuf};

use pkgcache_config::StorageConfig;
use thiserror::Error;

/// Errors that can occur during store operations
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Package {package}: {filename} not found in {}", .path.display())]
    NotFound {
        package: String,
        filename: String,
        path: PathBuf,
    },

    #[error("Not overwriting {}", .path.display())]
    NotOverwriting { path: PathBuf },

    #[error("Invalid package name {name:?}: {reason}")]
    InvalidPackageName { name: String, reason: &'static str },

    #[error("Invalid file name {name:?}: {reason}")]
    InvalidFileName { name: String, reason: &'static str },

    #[error("I/O error at {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error(transparent)]
    Remote(#[from] RemoteError),
}

pub type Result<T> = std::result::Result<T, StoreError>;

/// Attach the path being worked on to a filesystem error.
pub(crate) trait IoResultExt<T> {
    fn at_path(self, path: &Path) -> Result<T>;
}

impl<T> IoResultExt<T> for io::Result<T> {
    fn at_path(self, path: &Path) -> Result<T> {
        self.map_err(|source| StoreError::Io {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Package store rooted at a single directory.
///
/// Cheap to clone; holds only the root path. Nothing is created on disk
/// until the first write.
#[derive(Debug, Clone)]
pub struct PackageStore {
    root: PathBuf,
}

impl PackageStore {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    /// Store at the configured root, with `~` expanded.
    pub fn from_config(config: &StorageConfig) -> Self {
        Self::new(config.resolved_root())
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}
