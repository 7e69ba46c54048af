use std::{collections::HashMap, sync::RwLock};

use async_trait::async_trait;

use super::Device;

/// In-memory storage device, for embedded or generated bundles.
#[derive(Default)]
pub struct MemoryDevice {
    bundles: RwLock<HashMap<String, Vec<u8>>>,
}

impl MemoryDevice {
    /// Creates an empty device.
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a bundle file, replacing any previous content.
    pub fn insert(&self, bundle_name: impl Into<String>, content: Vec<u8>) {
        self.bundles
            .write()
            .unwrap()
            .insert(bundle_name.into(), content);
    }

    /// Removes a bundle file.
    pub fn remove(&self, bundle_name: &str) -> Option<Vec<u8>> {
        self.bundles.write().unwrap().remove(bundle_name)
    }
}

#[async_trait]
impl Device for MemoryDevice {
    fn load(&self, bundle_name: &str) -> Option<Vec<u8>> {
        self.bundles.read().unwrap().get(bundle_name).cloned()
    }

    async fn load_async(&self, bundle_name: &str) -> Option<Vec<u8>> {
        self.load(bundle_name)
    }
}
