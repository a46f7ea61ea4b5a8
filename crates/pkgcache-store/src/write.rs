//! Write-once storage.
//!
//! Content is staged in a temp file next to its target and published with
//! an exclusive hard link, so the existence check and the creation are a
//! single filesystem operation and readers never see a partial file.

use std::fs;
use std::io::{self, Read};

use pkgcache_config::{log_store_debug, log_store_warn};
use tracing::instrument;

use crate::layout::TEMP_PREFIX;
use crate::{IoResultExt, PackageStore, Result, StoreError};

impl PackageStore {
    /// Store `content` under the exact-case `(package, filename)`.
    ///
    /// Fails with [`StoreError::NotOverwriting`] if anything already
    /// occupies the target path.
    pub fn add_file(&self, package: &str, filename: &str, content: &[u8]) -> Result<()> {
        self.add_file_from_reader(package, filename, content)
    }

    /// Like [`add_file`](Self::add_file), draining `content` to the end
    /// before the file becomes visible.
    #[instrument(skip(self, content), level = "debug")]
    pub fn add_file_from_reader<R: Read>(
        &self,
        package: &str,
        filename: &str,
        mut content: R,
    ) -> Result<()> {
        let path = self.get_file_path(package, filename)?;

        // Early out before staging; persist_noclobber below is the real check.
        if path.symlink_metadata().is_ok() {
            log_store_warn!("Not overwriting", path = tracing::field::debug(&path));
            return Err(StoreError::NotOverwriting { path });
        }

        let Some(parent) = path.parent() else {
            return Err(StoreError::InvalidFileName {
                name: filename.to_string(),
                reason: "no parent directory",
            });
        };
        if !parent.is_dir() {
            log_store_debug!("Making directories", path = tracing::field::debug(parent));
            fs::create_dir_all(parent).at_path(parent)?;
        }

        let mut staged = tempfile::Builder::new()
            .prefix(TEMP_PREFIX)
            .tempfile_in(parent)
            .at_path(parent)?;
        // Dropping `staged` on any error below removes the partial file.
        io::copy(&mut content, staged.as_file_mut()).at_path(&path)?;
        staged.as_file().sync_all().at_path(&path)?;

        match staged.persist_noclobber(&path) {
            Ok(_) => Ok(()),
            Err(e) if e.error.kind() == io::ErrorKind::AlreadyExists => {
                log_store_warn!("Not overwriting", path = tracing::field::debug(&path));
                Err(StoreError::NotOverwriting { path })
            }
            Err(e) => Err(StoreError::Io {
                path,
                source: e.error,
            }),
        }
    }
}
