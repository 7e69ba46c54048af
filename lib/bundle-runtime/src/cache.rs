use std::{collections::HashMap, sync::Arc};

use log::warn;

use crate::{Bundle, BundleError};

/// Bundles currently resident in memory, by name.
///
/// A name is present only while its bundle is loaded and usable. There is no
/// eviction policy: entries live until they are removed.
#[derive(Default)]
pub struct BundleCache {
    bundles: HashMap<String, Arc<Bundle>>,
}

impl BundleCache {
    /// Creates an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if the bundle is resident.
    pub fn contains(&self, name: &str) -> bool {
        self.bundles.contains_key(name)
    }

    /// Retrieves a resident bundle.
    ///
    /// # Errors
    /// Returns `BundleError::BundleNotFound` if the bundle is not resident.
    pub fn get(&self, name: &str) -> Result<Arc<Bundle>, BundleError> {
        self.bundles
            .get(name)
            .cloned()
            .ok_or_else(|| BundleError::BundleNotFound(name.to_string()))
    }

    /// Adds a bundle.
    ///
    /// A live entry is never replaced: the insertion is ignored and reported.
    ///
    /// # Errors
    /// Returns `BundleError::DuplicateBundle` if the name is already present.
    pub fn insert(&mut self, name: &str, bundle: Arc<Bundle>) -> Result<(), BundleError> {
        if self.bundles.contains_key(name) {
            warn!("Bundle '{}' is already loaded, ignoring insertion", name);
            return Err(BundleError::DuplicateBundle(name.to_string()));
        }
        self.bundles.insert(name.to_string(), bundle);
        Ok(())
    }

    /// Removes a bundle, returning it if it was present.
    pub fn remove(&mut self, name: &str) -> Option<Arc<Bundle>> {
        self.bundles.remove(name)
    }

    /// Drops all entries without unloading them.
    pub fn clear(&mut self) {
        self.bundles.clear();
    }

    /// Removes and returns all entries.
    pub fn drain(&mut self) -> Vec<(String, Arc<Bundle>)> {
        self.bundles.drain().collect()
    }

    /// Names of the resident bundles.
    pub fn names(&self) -> Vec<String> {
        let mut names = self.bundles.keys().cloned().collect::<Vec<_>>();
        names.sort();
        names
    }

    /// Number of resident bundles.
    pub fn len(&self) -> usize {
        self.bundles.len()
    }

    /// Returns true if no bundle is resident.
    pub fn is_empty(&self) -> bool {
        self.bundles.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::BundleBuilder;

    fn empty_bundle(name: &str) -> Arc<Bundle> {
        Arc::new(Bundle::from_bytes(name, &BundleBuilder::new().to_bytes()).unwrap())
    }

    #[test]
    fn insert_and_get() {
        let mut cache = BundleCache::new();
        assert!(cache.is_empty());

        let bundle = empty_bundle("characters");
        cache.insert("characters", bundle.clone()).unwrap();

        assert!(cache.contains("characters"));
        assert!(!cache.contains("Characters"));
        assert!(Arc::ptr_eq(&cache.get("characters").unwrap(), &bundle));
        assert!(matches!(
            cache.get("props"),
            Err(BundleError::BundleNotFound(name)) if name == "props"
        ));
    }

    #[test]
    fn duplicate_insert_keeps_live_entry() {
        let mut cache = BundleCache::new();
        let first = empty_bundle("characters");
        cache.insert("characters", first.clone()).unwrap();

        let result = cache.insert("characters", empty_bundle("characters"));
        assert!(matches!(result, Err(BundleError::DuplicateBundle(_))));
        assert!(Arc::ptr_eq(&cache.get("characters").unwrap(), &first));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn remove_and_clear() {
        let mut cache = BundleCache::new();
        cache.insert("a", empty_bundle("a")).unwrap();
        cache.insert("b", empty_bundle("b")).unwrap();
        cache.insert("c", empty_bundle("c")).unwrap();
        assert_eq!(cache.names(), ["a", "b", "c"]);

        assert!(cache.remove("a").is_some());
        assert!(cache.remove("a").is_none());

        let drained = cache.drain();
        assert_eq!(drained.len(), 2);
        assert!(cache.is_empty());

        cache.insert("d", empty_bundle("d")).unwrap();
        cache.clear();
        assert!(cache.is_empty());
    }
}
