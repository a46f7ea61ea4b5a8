//! Contract for the upstream package index.
//!
//! The store never talks to the network itself. Implementations of
//! [`RemoteIndex`] fetch bytes from a registry; the helpers here describe
//! the registry's URL layout and the status policy every client applies.

use thiserror::Error;

use crate::layout::shard_letter;
use crate::Result;

pub use pkgcache_config::normalize_index_url;

/// Failures reported by a remote index client.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RemoteError {
    #[error("Can't locate {uri}")]
    NotFound { uri: String },

    #[error("Unexpected response from {uri}: {status}")]
    Unexpected { uri: String, status: u16 },

    #[error("Request to {uri} failed: {message}")]
    Transport { uri: String, message: String },
}

/// Upstream package index client.
pub trait RemoteIndex {
    /// Available release versions for `package`.
    fn versions(
        &self,
        package: &str,
        show_hidden: bool,
    ) -> std::result::Result<Vec<String>, RemoteError>;

    /// Raw bytes of one distribution file.
    fn fetch_file(
        &self,
        package: &str,
        filename: &str,
        python_version: Option<&str>,
    ) -> std::result::Result<Vec<u8>, RemoteError>;
}

impl<T: RemoteIndex + ?Sized> RemoteIndex for &T {
    fn versions(
        &self,
        package: &str,
        show_hidden: bool,
    ) -> std::result::Result<Vec<String>, RemoteError> {
        (**self).versions(package, show_hidden)
    }

    fn fetch_file(
        &self,
        package: &str,
        filename: &str,
        python_version: Option<&str>,
    ) -> std::result::Result<Vec<u8>, RemoteError> {
        (**self).fetch_file(package, filename, python_version)
    }
}

/// Where the index serves a distribution file.
///
/// Source distributions live under `packages/source/`, built ones under
/// `packages/<python_version>/`; both are sharded by first letter.
pub fn file_uri(
    index_url: &str,
    package: &str,
    filename: &str,
    python_version: Option<&str>,
) -> Result<String> {
    let letter = shard_letter(package)?;
    let index_url = normalize_index_url(index_url);
    let flavor = python_version.unwrap_or("source");
    Ok(format!(
        "{}packages/{}/{}/{}/{}",
        index_url, flavor, letter, package, filename
    ))
}

/// Simple-index page for a package.
pub fn simple_uri(index_url: &str, package: &str) -> String {
    format!("{}simple/{}/", normalize_index_url(index_url), package)
}

/// 200 is success, 404 is [`RemoteError::NotFound`], anything else is
/// [`RemoteError::Unexpected`]. No retries.
pub fn classify_status(uri: &str, status: u16) -> std::result::Result<(), RemoteError> {
    match status {
        200 => Ok(()),
        404 => Err(RemoteError::NotFound {
            uri: uri.to_string(),
        }),
        _ => Err(RemoteError::Unexpected {
            uri: uri.to_string(),
            status,
        }),
    }
}
