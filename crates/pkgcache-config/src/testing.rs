//! Test environment abstraction for isolated testing.
//!
//! Provides `TestEnvironment` to manage:
//! - An isolated storage root
//! - A project directory for config files
//! - Raw seeding of package files, bypassing the store's write path
//!
//! # Usage
//!
//! ```ignore
//! use pkgcache_config::testing::TestEnvironment;
//!
//! let env = TestEnvironment::new().unwrap();
//! env.seed("D", "Django", "Django-1.0.tar.gz", b"sdist").unwrap();
//! ```

use std::path::PathBuf;
use std::sync::atomic::{AtomicU32, Ordering};
use tempfile::TempDir;

/// Atomic counter for unique test IDs
static TEST_COUNTER: AtomicU32 = AtomicU32::new(0);

/// Isolated test environment with unique paths
pub struct TestEnvironment {
    /// Temporary directory (dropped on cleanup)
    _temp_dir: TempDir,
    /// Isolated storage root
    pub store_root: PathBuf,
    /// Project root for the test (holds `.pkgcache/config.toml`)
    pub project_root: PathBuf,
    /// Unique test ID
    pub test_id: u32,
}

impl TestEnvironment {
    /// Create a new isolated test environment
    pub fn new() -> anyhow::Result<Self> {
        let test_id = TEST_COUNTER.fetch_add(1, Ordering::Relaxed);
        let temp_dir = TempDir::new()?;
        let root = temp_dir.path();

        let store_root = root.join(format!("store-{}", test_id));
        let project_root = root.join("project");

        std::fs::create_dir_all(&store_root)?;
        std::fs::create_dir_all(project_root.join(".pkgcache"))?;

        Ok(Self {
            _temp_dir: temp_dir,
            store_root,
            project_root,
            test_id,
        })
    }

    /// `<store_root>/packages`
    pub fn packages_dir(&self) -> PathBuf {
        self.store_root.join("packages")
    }

    /// Place a file at `packages/<shard>/<package>/<relative_path>`.
    ///
    /// The shard is taken verbatim so tests can build layouts the store
    /// itself would never write.
    pub fn seed(
        &self,
        shard: &str,
        package: &str,
        relative_path: &str,
        content: &[u8],
    ) -> anyhow::Result<PathBuf> {
        let path = self
            .packages_dir()
            .join(shard)
            .join(package)
            .join(relative_path);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&path, content)?;
        Ok(path)
    }

    /// Write the project config file.
    pub fn write_project_config(&self, toml: &str) -> anyhow::Result<PathBuf> {
        let path = self.project_root.join(".pkgcache").join("config.toml");
        std::fs::write(&path, toml)?;
        Ok(path)
    }

    /// Config pointing at this environment's storage root.
    pub fn config(&self) -> crate::Config {
        let mut cfg = crate::Config::default();
        cfg.storage.root = self.store_root.clone();
        cfg
    }
}

impl Default for TestEnvironment {
    fn default() -> Self {
        Self::new().expect("Failed to create test environment")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_environment_creates_directories() {
        let env = TestEnvironment::new().unwrap();
        assert!(env.store_root.exists());
        assert!(env.project_root.join(".pkgcache").exists());
        assert!(!env.packages_dir().exists());
    }

    #[test]
    fn test_environment_has_unique_store_root() {
        let env1 = TestEnvironment::new().unwrap();
        let env2 = TestEnvironment::new().unwrap();
        assert_ne!(env1.store_root, env2.store_root);
    }

    #[test]
    fn test_seed_writes_raw_layout() {
        let env = TestEnvironment::new().unwrap();
        let path = env.seed("x", "Yarl", "nested/yarl-1.0.zip", b"zip").unwrap();
        assert_eq!(
            path,
            env.store_root.join("packages/x/Yarl/nested/yarl-1.0.zip")
        );
        assert_eq!(std::fs::read(&path).unwrap(), b"zip");
    }

    #[test]
    fn test_config_points_at_store_root() {
        let env = TestEnvironment::new().unwrap();
        assert_eq!(env.config().storage.root, env.store_root);
    }
}
