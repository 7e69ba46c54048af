use std::path::{Path, PathBuf};

use async_trait::async_trait;

use super::Device;

/// Directory storage device. Bundles are stored in files named after them,
/// directly under the storage root.
pub struct DirDevice {
    dir: PathBuf,
}

impl DirDevice {
    /// Creates a device reading from `path`.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            dir: path.as_ref().to_owned(),
        }
    }

    fn bundle_path(&self, bundle_name: &str) -> PathBuf {
        self.dir.join(bundle_name)
    }
}

#[async_trait]
impl Device for DirDevice {
    fn load(&self, bundle_name: &str) -> Option<Vec<u8>> {
        std::fs::read(self.bundle_path(bundle_name)).ok()
    }

    async fn load_async(&self, bundle_name: &str) -> Option<Vec<u8>> {
        tokio::fs::read(self.bundle_path(bundle_name)).await.ok()
    }
}
