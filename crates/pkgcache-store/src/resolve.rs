//! Read path with case-insensitive fallback ("fishing").
//!
//! An exact-case miss triggers a linear scan over the current package
//! enumeration and, per matching package, over its files. The first match
//! in enumeration order wins. The scan is not atomic with respect to
//! concurrent writers.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use pkgcache_config::{log_store_debug, log_store_info};
use tracing::instrument;

use crate::{IoResultExt, PackageStore, Result, StoreError};

/// Canonical on-disk spelling of a requested `(package, filename)` pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedFile {
    pub package: String,
    /// Path below the package directory, `/`-separated
    pub relative_path: String,
}

/// Open `path` if it is a regular file. Any failure to open counts as a
/// miss: a stray file where a directory should be, a permission problem
/// or a plain absence all send the caller on to fishing.
fn open_regular(path: &Path) -> Option<File> {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(e) => {
            log_store_debug!(
                "Exact path not readable",
                path = tracing::field::debug(path),
                error = tracing::field::display(&e)
            );
            return None;
        }
    };
    match file.metadata() {
        Ok(meta) if meta.is_file() => Some(file),
        _ => None,
    }
}

impl PackageStore {
    /// Open a stored file for reading.
    ///
    /// Tries the exact-case path first, then looks for a package and file
    /// whose names match ignoring case. Fails with [`StoreError::NotFound`]
    /// naming the exact-case path when neither succeeds.
    #[instrument(skip(self), level = "debug")]
    pub fn get_file(&self, package: &str, filename: &str) -> Result<File> {
        let path = self.get_file_path(package, filename)?;
        if let Some(file) = open_regular(&path) {
            return Ok(file);
        }

        log_store_info!(
            "Fishing for package file",
            package = package,
            filename = filename
        );
        if let Some(resolved) = self.find_file(package, filename)? {
            let canonical = self.get_file_path(&resolved.package, &resolved.relative_path)?;
            if let Some(file) = open_regular(&canonical) {
                return Ok(file);
            }
        }

        Err(StoreError::NotFound {
            package: package.to_string(),
            filename: filename.to_string(),
            path,
        })
    }

    /// Read a stored file fully into memory.
    pub fn read_file(&self, package: &str, filename: &str) -> Result<Vec<u8>> {
        let mut file = self.get_file(package, filename)?;
        let mut data = Vec::new();
        file.read_to_end(&mut data)
            .at_path(&self.get_file_path(package, filename)?)?;
        Ok(data)
    }

    /// First stored package, other than `package` itself, whose name
    /// equals `package` ignoring case.
    pub fn find_package(&self, package: &str) -> Result<Option<String>> {
        let wanted = package.to_lowercase();
        Ok(self
            .list_packages()?
            .into_iter()
            .find(|candidate| candidate != package && candidate.to_lowercase() == wanted))
    }

    /// Case-insensitive search for a file across every package whose name
    /// matches `package` ignoring case, including the exact spelling.
    ///
    /// A file matches when its base name or its path below the package
    /// directory equals `filename` ignoring case.
    pub fn find_file(&self, package: &str, filename: &str) -> Result<Option<ResolvedFile>> {
        let wanted_package = package.to_lowercase();
        let wanted_file = filename.to_lowercase();

        for candidate in self.list_packages()? {
            if candidate.to_lowercase() != wanted_package {
                continue;
            }
            // Mis-sharded packages show up in the enumeration but have no
            // directory at their computed location.
            let Some(walk) = self.walk_exact(&candidate)? else {
                continue;
            };
            for walked in walk {
                let walked = walked?;
                if walked.filename.to_lowercase() == wanted_file
                    || walked.relative_path.to_lowercase() == wanted_file
                {
                    return Ok(Some(ResolvedFile {
                        package: candidate,
                        relative_path: walked.relative_path,
                    }));
                }
            }
        }
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn seed(root: &Path, rel: &str, content: &[u8]) {
        let path = root.join("packages").join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    #[test]
    fn test_exact_read() {
        let temp = TempDir::new().unwrap();
        seed(temp.path(), "D/Django/Django-1.0.tar.gz", b"sdist");
        let store = PackageStore::new(temp.path());
        assert_eq!(store.read_file("Django", "Django-1.0.tar.gz").unwrap(), b"sdist");
    }

    #[test]
    fn test_fishing_package_and_file_case() {
        let temp = TempDir::new().unwrap();
        seed(temp.path(), "D/Django/Django-1.0.tar.gz", b"sdist");
        let store = PackageStore::new(temp.path());

        assert_eq!(store.read_file("django", "django-1.0.tar.gz").unwrap(), b"sdist");
        assert_eq!(store.read_file("DJANGO", "DJANGO-1.0.TAR.GZ").unwrap(), b"sdist");
    }

    #[test]
    fn test_fishing_file_case_within_exact_package() {
        let temp = TempDir::new().unwrap();
        seed(temp.path(), "P/PyYAML/PyYAML-3.10.tar.gz", b"yaml");
        let store = PackageStore::new(temp.path());

        assert_eq!(store.read_file("PyYAML", "pyyaml-3.10.tar.gz").unwrap(), b"yaml");
    }

    #[test]
    fn test_fishing_finds_nested_file() {
        let temp = TempDir::new().unwrap();
        seed(temp.path(), "n/nose/2.7/nose-1.0-py2.7.egg", b"egg");
        let store = PackageStore::new(temp.path());

        assert_eq!(store.read_file("Nose", "NOSE-1.0-py2.7.egg").unwrap(), b"egg");
        let resolved = store.find_file("nose", "nose-1.0-py2.7.egg").unwrap().unwrap();
        assert_eq!(resolved.relative_path, "2.7/nose-1.0-py2.7.egg");
    }

    #[test]
    fn test_not_found_names_computed_path() {
        let temp = TempDir::new().unwrap();
        let store = PackageStore::new(temp.path());

        let err = store.get_file("nosuchpkg", "x").unwrap_err();
        match &err {
            StoreError::NotFound {
                package,
                filename,
                path,
            } => {
                assert_eq!(package, "nosuchpkg");
                assert_eq!(filename, "x");
                assert!(path.ends_with("packages/n/nosuchpkg/x"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(err.to_string().contains("packages/n/nosuchpkg/x"));
    }

    #[test]
    fn test_mis_sharded_package_is_not_found() {
        let temp = TempDir::new().unwrap();
        seed(temp.path(), "y/xlrd/xlrd-0.9.zip", b"zip");
        let store = PackageStore::new(temp.path());

        assert!(store.list_packages().unwrap().contains(&"xlrd".to_string()));
        let err = store.get_file("xlrd", "xlrd-0.9.zip").unwrap_err();
        assert!(matches!(err, StoreError::NotFound { .. }));
    }

    #[test]
    fn test_directory_is_not_a_file() {
        let temp = TempDir::new().unwrap();
        seed(temp.path(), "s/six/sub/six-1.0.zip", b"zip");
        let store = PackageStore::new(temp.path());

        let err = store.get_file("six", "sub").unwrap_err();
        assert!(matches!(err, StoreError::NotFound { .. }));
    }

    #[test]
    fn test_stray_file_in_shard_still_fishes() {
        let temp = TempDir::new().unwrap();
        seed(temp.path(), "A/Attrs/x", b"real");
        // A regular file where the lowercase shard's package dir would be.
        seed(temp.path(), "a/attrs", b"stray");
        let store = PackageStore::new(temp.path());

        assert_eq!(store.read_file("attrs", "x").unwrap(), b"real");

        let err = store.get_file("attrs", "y").unwrap_err();
        match err {
            StoreError::NotFound { path, .. } => {
                assert!(path.ends_with("packages/a/attrs/y"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_find_package_skips_exact_spelling() {
        let temp = TempDir::new().unwrap();
        seed(temp.path(), "F/Flask/Flask-0.9.tar.gz", b"f");
        let store = PackageStore::new(temp.path());

        assert_eq!(store.find_package("flask").unwrap(), Some("Flask".to_string()));
        assert_eq!(store.find_package("Flask").unwrap(), None);
        assert_eq!(store.find_package("bottle").unwrap(), None);
    }

    #[test]
    fn test_first_lexicographic_match_wins() {
        let temp = TempDir::new().unwrap();
        seed(temp.path(), "M/MarkupSafe/MarkupSafe-0.1.tar.gz", b"upper");
        seed(temp.path(), "m/markupsafe/MarkupSafe-0.1.tar.gz", b"lower");
        let store = PackageStore::new(temp.path());

        assert_eq!(
            store.read_file("MARKUPSAFE", "markupsafe-0.1.tar.gz").unwrap(),
            b"upper"
        );
    }
}
