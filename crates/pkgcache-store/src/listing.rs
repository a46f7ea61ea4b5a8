//! Enumeration of stored packages and of the files inside a package.

use std::collections::BTreeSet;
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

use pkgcache_config::{log_store_debug, log_store_info, log_store_warn};
use walkdir::WalkDir;

use crate::layout::{shard_letter, TEMP_PREFIX};
use crate::{IoResultExt, PackageStore, Result, StoreError};

/// One stored file, as seen by a listing walk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRecord {
    /// Canonical on-disk package name
    pub package: String,
    /// Shard letter of `package`
    pub first_letter: char,
    /// Base name of the file
    pub filename: String,
    /// Path below the package directory, `/`-separated
    pub relative_path: String,
    /// Lowercase hex BLAKE3 digest of the content (advisory)
    pub checksum: String,
}

/// A regular file found under a package directory, before hashing.
#[derive(Debug)]
pub(crate) struct WalkedFile {
    pub path: PathBuf,
    pub filename: String,
    pub relative_path: String,
}

/// Depth-unbounded walk of one package directory, contents first, sorted.
pub(crate) struct PackageWalk {
    base: PathBuf,
    walker: walkdir::IntoIter,
}

impl PackageWalk {
    pub(crate) fn new(base: PathBuf) -> Self {
        let walker = WalkDir::new(&base)
            .min_depth(1)
            .contents_first(true)
            .sort_by_file_name()
            .into_iter();
        Self { base, walker }
    }
}

impl Iterator for PackageWalk {
    type Item = Result<WalkedFile>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let entry = match self.walker.next()? {
                Ok(entry) => entry,
                Err(e) => {
                    let path = e.path().unwrap_or(&self.base).to_path_buf();
                    return Some(Err(StoreError::Io {
                        path,
                        source: io::Error::from(e),
                    }));
                }
            };
            // Symlinks to regular files count, like any other file.
            if !entry.path().is_file() {
                continue;
            }
            let Some(filename) = entry.file_name().to_str() else {
                log_store_warn!(
                    "Skipping non-UTF-8 file name",
                    path = tracing::field::debug(entry.path())
                );
                continue;
            };
            if filename.starts_with(TEMP_PREFIX) {
                continue;
            }
            let Some(relative_path) = relative_slash_path(&self.base, entry.path()) else {
                log_store_warn!(
                    "Skipping non-UTF-8 path",
                    path = tracing::field::debug(entry.path())
                );
                continue;
            };
            return Some(Ok(WalkedFile {
                filename: filename.to_string(),
                relative_path,
                path: entry.into_path(),
            }));
        }
    }
}

fn relative_slash_path(base: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(base).ok()?;
    let parts: Option<Vec<&str>> = relative.iter().map(|part| part.to_str()).collect();
    Some(parts?.join("/"))
}

/// BLAKE3 of a file's content, streamed.
pub fn file_checksum(path: &Path) -> io::Result<String> {
    let mut file = File::open(path)?;
    let mut hasher = blake3::Hasher::new();
    io::copy(&mut file, &mut hasher)?;
    Ok(hex::encode(hasher.finalize().as_bytes()))
}

enum IterState {
    Done,
    Failed(StoreError),
    Walking {
        package: String,
        first_letter: char,
        walk: PackageWalk,
    },
}

/// Lazy sequence of [`FileRecord`]s for one package.
///
/// Checksums are computed as records are pulled. Dropping the iterator
/// early skips the rest of the walk.
pub struct FileIter {
    state: IterState,
}

impl FileIter {
    pub(crate) fn empty() -> Self {
        Self {
            state: IterState::Done,
        }
    }

    pub(crate) fn failed(err: StoreError) -> Self {
        Self {
            state: IterState::Failed(err),
        }
    }

    fn walking(package: &str, first_letter: char, dir: PathBuf) -> Self {
        Self {
            state: IterState::Walking {
                package: package.to_string(),
                first_letter,
                walk: PackageWalk::new(dir),
            },
        }
    }
}

impl Iterator for FileIter {
    type Item = Result<FileRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        if matches!(self.state, IterState::Failed(_)) {
            if let IterState::Failed(err) = std::mem::replace(&mut self.state, IterState::Done) {
                return Some(Err(err));
            }
        }
        let IterState::Walking {
            package,
            first_letter,
            walk,
        } = &mut self.state
        else {
            return None;
        };

        let walked = match walk.next()? {
            Ok(walked) => walked,
            Err(e) => return Some(Err(e)),
        };
        let walked_path = walked.path;
        let record = file_checksum(&walked_path).map(|checksum| FileRecord {
            package: package.clone(),
            first_letter: *first_letter,
            filename: walked.filename,
            relative_path: walked.relative_path,
            checksum,
        });
        Some(record.at_path(&walked_path))
    }
}

impl PackageStore {
    /// All package directories across every shard, sorted and deduplicated.
    ///
    /// Only single-character shard directories are scanned. Non-directory
    /// entries and hidden names are ignored. The result is collected
    /// eagerly: sorting and deduplication need the whole scan anyway, and
    /// callers iterate it once.
    pub fn list_packages(&self) -> Result<Vec<String>> {
        let packages_dir = self.packages_dir();
        log_store_info!(
            "Listing packages",
            path = tracing::field::debug(&packages_dir)
        );

        let shards = match fs::read_dir(&packages_dir) {
            Ok(shards) => shards,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(StoreError::Io {
                    path: packages_dir,
                    source: e,
                })
            }
        };

        let mut names = BTreeSet::new();
        for shard in shards {
            let shard = shard.at_path(&packages_dir)?;
            let is_single_char = shard
                .file_name()
                .to_str()
                .is_some_and(|name| name.chars().count() == 1 && name != ".");
            if !is_single_char || !shard.path().is_dir() {
                continue;
            }

            let shard_dir = shard.path();
            for entry in fs::read_dir(&shard_dir).at_path(&shard_dir)? {
                let entry = entry.at_path(&shard_dir)?;
                if !entry.path().is_dir() {
                    continue;
                }
                match entry.file_name().into_string() {
                    Ok(name) if name.starts_with('.') => {}
                    Ok(name) => {
                        names.insert(name);
                    }
                    Err(raw) => {
                        log_store_warn!(
                            "Skipping non-UTF-8 package directory",
                            name = tracing::field::debug(&raw)
                        );
                    }
                }
            }
        }

        Ok(names.into_iter().collect())
    }

    /// Records for every file under `package`, resolving the package name
    /// case-insensitively when the exact-case directory is missing.
    ///
    /// A package that does not exist under any casing yields nothing.
    pub fn list_files(&self, package: &str) -> FileIter {
        let dir = match self.package_dir(package) {
            Ok(dir) => dir,
            Err(e) => return FileIter::failed(e),
        };
        log_store_debug!("Using package prefix", prefix = tracing::field::debug(&dir));

        if dir.is_dir() {
            return self.list_files_exact(package);
        }

        log_store_info!("Fishing for package", package = package);
        match self.find_package(package) {
            Ok(Some(canonical)) => self.list_files_exact(&canonical),
            Ok(None) => FileIter::empty(),
            Err(e) => FileIter::failed(e),
        }
    }

    /// Records for the exact-case package directory only; no fishing.
    pub(crate) fn list_files_exact(&self, package: &str) -> FileIter {
        let letter = match shard_letter(package) {
            Ok(letter) => letter,
            Err(e) => return FileIter::failed(e),
        };
        let dir = match self.package_dir(package) {
            Ok(dir) => dir,
            Err(e) => return FileIter::failed(e),
        };
        if dir.is_dir() {
            FileIter::walking(package, letter, dir)
        } else {
            FileIter::empty()
        }
    }

    pub(crate) fn walk_exact(&self, package: &str) -> Result<Option<PackageWalk>> {
        let dir = self.package_dir(package)?;
        Ok(dir.is_dir().then(|| PackageWalk::new(dir)))
    }
}
