//! Storage devices bundles are read from.

use std::sync::Arc;

use async_trait::async_trait;

mod dir_device;
mod memory_device;

pub use dir_device::*;
pub use memory_device::*;

/// Storage a bundle file can be read from.
///
/// Bundles are addressed by name; each device decides where a name lives.
/// Returning `None` lets the next device try.
#[async_trait]
pub trait Device: Send + Sync {
    /// Reads a bundle file, blocking the calling thread.
    fn load(&self, bundle_name: &str) -> Option<Vec<u8>>;

    /// Reads a bundle file without blocking the calling task.
    async fn load_async(&self, bundle_name: &str) -> Option<Vec<u8>>;
}

#[async_trait]
impl<D: Device + ?Sized> Device for Arc<D> {
    fn load(&self, bundle_name: &str) -> Option<Vec<u8>> {
        (**self).load(bundle_name)
    }

    async fn load_async(&self, bundle_name: &str) -> Option<Vec<u8>> {
        (**self).load_async(bundle_name).await
    }
}
