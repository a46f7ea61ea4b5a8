//! Read-through cache: local store first, upstream index on a miss.

use std::fs::File;

use pkgcache_config::{log_remote_debug, log_remote_info, Config};

use crate::remote::RemoteIndex;
use crate::{PackageStore, Result, StoreError};

pub struct PackageCache<R> {
    store: PackageStore,
    remote: R,
    show_hidden: bool,
}

impl<R: RemoteIndex> PackageCache<R> {
    pub fn new(store: PackageStore, remote: R) -> Self {
        Self {
            store,
            remote,
            show_hidden: false,
        }
    }

    pub fn from_config(config: &Config, remote: R) -> Self {
        Self::new(PackageStore::from_config(&config.storage), remote)
            .with_show_hidden(config.remote.show_hidden)
    }

    pub fn with_show_hidden(mut self, show_hidden: bool) -> Self {
        self.show_hidden = show_hidden;
        self
    }

    pub fn store(&self) -> &PackageStore {
        &self.store
    }

    pub fn remote(&self) -> &R {
        &self.remote
    }

    /// Serve a file from the store, fetching and storing it first if no
    /// exact or case-insensitive match exists locally.
    ///
    /// Fetched files are stored under the names the caller supplied.
    pub fn get_file(
        &self,
        package: &str,
        filename: &str,
        python_version: Option<&str>,
    ) -> Result<File> {
        match self.store.get_file(package, filename) {
            Err(StoreError::NotFound { .. }) => {}
            other => return other,
        }

        log_remote_info!(
            "Fetching from upstream",
            package = package,
            filename = filename
        );
        let data = self.remote.fetch_file(package, filename, python_version)?;

        match self.store.add_file(package, filename, &data) {
            Ok(()) => {}
            Err(StoreError::NotOverwriting { .. }) => {
                log_remote_debug!(
                    "Another writer stored the file first",
                    package = package,
                    filename = filename
                );
            }
            Err(e) => return Err(e),
        }
        self.store.get_file(package, filename)
    }

    /// Release versions known upstream.
    pub fn versions(&self, package: &str) -> Result<Vec<String>> {
        log_remote_debug!("Listing upstream versions", package = package);
        Ok(self.remote.versions(package, self.show_hidden)?)
    }
}
