//! Namespace mapping: `(package, filename)` to a location under the root.
//!
//! ```text
//! <root>/packages/<first-letter>/<package>/<filename>
//! ```
//!
//! Pure path arithmetic, no I/O.

use std::path::{Component, Path, PathBuf};

use crate::{PackageStore, Result, StoreError};

/// Directory under the root that holds all shards.
pub const PACKAGES_DIR: &str = "packages";

/// Prefix of in-flight write files; never reported by listings.
pub(crate) const TEMP_PREFIX: &str = ".pkgcache-tmp-";

/// The shard letter of a package: its first character.
pub fn shard_letter(package: &str) -> Result<char> {
    validate_package(package)?;
    // validate_package guarantees a first character
    package.chars().next().ok_or_else(|| StoreError::InvalidPackageName {
        name: package.to_string(),
        reason: "empty",
    })
}

/// Reject package names that cannot be a single directory under a shard.
pub fn validate_package(package: &str) -> Result<()> {
    let reason = if package.is_empty() {
        "empty"
    } else if package.contains(['/', '\\']) {
        "contains a path separator"
    } else if package.starts_with('.') {
        "starts with '.'"
    } else {
        return Ok(());
    };
    Err(StoreError::InvalidPackageName {
        name: package.to_string(),
        reason,
    })
}

/// Reject file names that would escape the package directory.
pub fn validate_filename(filename: &str) -> Result<()> {
    let invalid = |reason| StoreError::InvalidFileName {
        name: filename.to_string(),
        reason,
    };
    if filename.is_empty() {
        return Err(invalid("empty"));
    }
    for component in Path::new(filename).components() {
        match component {
            Component::Normal(_) | Component::CurDir => {}
            Component::ParentDir => return Err(invalid("contains '..'")),
            Component::RootDir | Component::Prefix(_) => return Err(invalid("absolute path")),
        }
    }
    Ok(())
}

impl PackageStore {
    /// `<root>/packages`
    pub fn packages_dir(&self) -> PathBuf {
        self.root.join(PACKAGES_DIR)
    }

    /// `<root>/packages/<first-letter>/<package>`
    pub fn package_dir(&self, package: &str) -> Result<PathBuf> {
        let letter = shard_letter(package)?;
        Ok(self
            .packages_dir()
            .join(letter.to_string())
            .join(package))
    }

    /// Exact-case location of a file. Deterministic and free of I/O.
    pub fn get_file_path(&self, package: &str, filename: &str) -> Result<PathBuf> {
        validate_filename(filename)?;
        Ok(self.package_dir(package)?.join(filename))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_path_layout() {
        let store = PackageStore::new("/cache");
        let path = store.get_file_path("Django", "Django-1.0.tar.gz").unwrap();
        assert_eq!(
            path,
            PathBuf::from("/cache/packages/D/Django/Django-1.0.tar.gz")
        );
    }

    #[test]
    fn test_path_is_deterministic() {
        let store = PackageStore::new("/cache");
        let a = store.get_file_path("requests", "requests-2.0.tar.gz").unwrap();
        let b = store.get_file_path("requests", "requests-2.0.tar.gz").unwrap();
        assert_eq!(a, b);
        assert!(!a.exists());
    }

    #[test]
    fn test_shard_uses_first_char_not_byte() {
        let store = PackageStore::new("/cache");
        let path = store.get_file_path("élan", "élan-0.1.zip").unwrap();
        assert_eq!(path, PathBuf::from("/cache/packages/é/élan/élan-0.1.zip"));
    }

    #[test]
    fn test_shard_is_case_sensitive() {
        assert_eq!(shard_letter("Django").unwrap(), 'D');
        assert_eq!(shard_letter("django").unwrap(), 'd');
    }

    #[test]
    fn test_empty_package_rejected() {
        let store = PackageStore::new("/cache");
        let err = store.get_file_path("", "x").unwrap_err();
        assert!(matches!(err, StoreError::InvalidPackageName { .. }));
    }

    #[test]
    fn test_package_with_separator_rejected() {
        assert!(validate_package("a/b").is_err());
        assert!(validate_package("a\\b").is_err());
        assert!(validate_package("..").is_err());
        assert!(validate_package(".hidden").is_err());
        assert!(validate_package("zope.interface").is_ok());
    }

    #[test]
    fn test_filename_validation() {
        assert!(validate_filename("").is_err());
        assert!(validate_filename("../escape").is_err());
        assert!(validate_filename("/etc/passwd").is_err());
        assert!(validate_filename("sub/nested-1.0.zip").is_ok());
        assert!(validate_filename("simple-1.0.tar.gz").is_ok());
    }
}
