use std::sync::Arc;

use crate::ResourceType;

/// Error type for the bundle runtime.
#[derive(thiserror::Error, Debug, Clone)]
pub enum BundleError {
    /// No storage device could provide the bundle.
    #[error("Bundle '{0}' could not be loaded from storage")]
    StorageLoadFailed(String),

    /// The bundle bytes are not a valid bundle file.
    #[error("Bundle '{0}' is invalid: {1}")]
    InvalidBundle(String, String),

    /// Lookup of a bundle that is not in the cache.
    #[error("Bundle '{0}' is not loaded")]
    BundleNotFound(String),

    /// Insertion of a bundle that is already in the cache.
    #[error("Bundle '{0}' is already loaded")]
    DuplicateBundle(String),

    /// Retrieval through a bundle that has been unloaded.
    #[error("Bundle '{0}' was unloaded")]
    BundleUnloaded(String),

    /// The bundle has no resource of that name and type.
    #[error("Resource '{resource}' not found in bundle '{bundle}'")]
    ResourceNotFound {
        /// Bundle that was searched.
        bundle: String,
        /// Requested resource name.
        resource: String,
    },

    /// No loader is registered for the resource type.
    #[error("ResourceLoader for ResourceType '{0}' not found")]
    LoaderNotFound(ResourceType),

    /// A blocking load was attempted while another load holds the gate.
    #[error("Another bundle load is in flight, cannot load '{0}'")]
    LoadInFlight(String),

    /// The manifest dependency graph contains a cycle.
    #[error("Dependency cycle detected through bundle '{0}'")]
    DependencyCycle(String),

    /// Invalid configuration.
    #[error("Settings error: {0}")]
    Settings(String),

    /// General IO Error when loading a resource
    #[error("IO error: {0}")]
    IOError(Arc<std::io::Error>),
}

impl From<std::io::Error> for BundleError {
    fn from(err: std::io::Error) -> Self {
        Self::IOError(Arc::new(err))
    }
}
