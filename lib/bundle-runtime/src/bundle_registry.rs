use std::{
    io,
    path::Path,
    sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard},
    time::Instant,
};

use log::{debug, error, info};
use serde::de::DeserializeOwned;
use tokio::{runtime::Handle, task::JoinHandle};

use crate::{
    manifest::{ManifestLoader, MANIFEST_ASSET_NAME},
    resource::LoaderMap,
    vfs, AnyResource, Bundle, BundleCache, BundleError, BundleSettings, JsonLoader, LoadGate,
    Manifest, Resource, ResourceLoader, ResourceRef, ResourceType,
};

/// Options which can be used to configure the creation of [`BundleRegistry`].
pub struct BundleRegistryOptions {
    settings: BundleSettings,
    loaders: LoaderMap,
    devices: Vec<Box<dyn vfs::Device>>,
}

impl BundleRegistryOptions {
    /// Creates a blank set of options for a registry configured by
    /// `settings`.
    pub fn new(settings: BundleSettings) -> Self {
        Self {
            settings,
            loaders: LoaderMap::new(),
            devices: vec![],
        }
    }

    /// Adds a device that can read bundles.
    ///
    /// Devices are queried in the order they were added. The storage root
    /// directory is always queried last.
    #[must_use]
    pub fn add_device(mut self, device: Box<dyn vfs::Device>) -> Self {
        self.devices.push(device);
        self
    }

    /// Mounts a directory of bundle files.
    #[must_use]
    pub fn add_device_dir(self, path: impl AsRef<Path>) -> Self {
        self.add_device(Box::new(vfs::DirDevice::new(path)))
    }

    /// Add a loader for a specific `ResourceType`
    #[must_use]
    pub fn add_loader(mut self, kind: ResourceType, loader: Arc<dyn ResourceLoader>) -> Self {
        self.loaders.insert(kind, loader);
        self
    }

    /// Add a [`JsonLoader`] for resources of type `T`.
    #[must_use]
    pub fn add_json_loader<T: Resource + DeserializeOwned>(self) -> Self {
        self.add_loader(T::TYPE, Arc::new(JsonLoader::<T>::default()))
    }

    /// Creates [`BundleRegistry`] based on `BundleRegistryOptions`.
    pub fn create(self) -> Arc<BundleRegistry> {
        let Self {
            settings,
            mut loaders,
            mut devices,
        } = self;

        let manifest_loader: Arc<dyn ResourceLoader> = Arc::new(ManifestLoader::default());
        loaders.entry(Manifest::TYPE).or_insert(manifest_loader);
        devices.push(Box::new(vfs::DirDevice::new(&settings.storage_root)));

        info!(
            "Bundle registry created (main bundle '{}', storage root {:?})",
            settings.main_bundle_name(),
            settings.storage_root
        );

        Arc::new(BundleRegistry {
            settings,
            devices,
            loaders: Arc::new(loaders),
            inner: RwLock::new(Inner::default()),
            gate: LoadGate::new(),
        })
    }
}

struct MainBundle {
    bundle: Arc<Bundle>,
    manifest: Arc<Manifest>,
}

#[derive(Default)]
struct Inner {
    main: Option<MainBundle>,
    cache: BundleCache,
}

/// Registry of all loaded bundles.
///
/// Provides an API to load resources by bundle and resource name. Loading a
/// resource first makes the main bundle, then every dependency of the
/// requested bundle, then the bundle itself resident. Bundles stay loaded
/// until [`BundleRegistry::unload`] or [`BundleRegistry::unload_all`].
///
/// Every read from storage holds the registry's [`LoadGate`]: bundle loads
/// never overlap, even across unrelated requests. Blocking requests never
/// wait for the gate; they fail with `BundleError::LoadInFlight` while an
/// asynchronous load holds it.
///
/// Requests come in three flavors:
/// * `load_*_sync`, blocking the calling thread,
/// * `load_*_async`, suspending the calling task,
/// * `load_*_with`, spawning a task and calling back with the result.
///
/// Each returns `None` on failure, after logging the reason. The `try_`
/// variants return the [`BundleError`] instead.
pub struct BundleRegistry {
    settings: BundleSettings,
    devices: Vec<Box<dyn vfs::Device>>,
    loaders: Arc<LoaderMap>,
    inner: RwLock<Inner>,
    gate: LoadGate,
}

impl BundleRegistry {
    fn read_inner(&self) -> RwLockReadGuard<'_, Inner> {
        self.inner.read().unwrap()
    }

    fn write_inner(&self) -> RwLockWriteGuard<'_, Inner> {
        self.inner.write().unwrap()
    }

    /// Configuration of the registry.
    pub fn settings(&self) -> &BundleSettings {
        &self.settings
    }

    /// The manifest, once the main bundle is loaded.
    pub fn manifest(&self) -> Option<Arc<Manifest>> {
        self.read_inner()
            .main
            .as_ref()
            .map(|main| Arc::clone(&main.manifest))
    }

    /// Retrieve the transitive dependencies of a bundle, in load order.
    ///
    /// Returns `None` until the main bundle is loaded.
    pub fn get_dependencies(&self, bundle_name: &str) -> Option<Vec<String>> {
        self.manifest()
            .map(|manifest| manifest.dependencies_of(bundle_name).to_vec())
    }

    /// Returns true once the main bundle and its manifest are resident.
    pub fn is_main_bundle_loaded(&self) -> bool {
        self.read_inner().main.is_some()
    }

    /// Returns true if the bundle is cached.
    pub fn is_loaded(&self, bundle_name: &str) -> bool {
        self.read_inner().cache.contains(bundle_name)
    }

    /// Names of the cached bundles, not including the main bundle.
    pub fn loaded_bundles(&self) -> Vec<String> {
        self.read_inner().cache.names()
    }

    /// Interface to return a cached bundle (won't trigger a load if it is not
    /// cached).
    pub fn get_bundle(&self, bundle_name: &str) -> Option<Arc<Bundle>> {
        self.read_inner().cache.get(bundle_name).ok()
    }

    /// Returns true while a bundle is being read from storage.
    pub fn is_loading(&self) -> bool {
        self.gate.is_held()
    }

    fn open_bundle(
        bundle_name: &str,
        content: &[u8],
        start: Instant,
    ) -> Result<Arc<Bundle>, BundleError> {
        let bundle = Bundle::from_bytes(bundle_name, content)?;
        info!(
            "Loaded bundle '{}' ({} bytes) in {:?}",
            bundle_name,
            content.len(),
            start.elapsed()
        );
        Ok(Arc::new(bundle))
    }

    fn read_bundle(&self, bundle_name: &str) -> Result<Arc<Bundle>, BundleError> {
        let start = Instant::now();
        let content = self
            .devices
            .iter()
            .find_map(|device| device.load(bundle_name))
            .ok_or_else(|| BundleError::StorageLoadFailed(bundle_name.to_string()))?;
        Self::open_bundle(bundle_name, &content, start)
    }

    async fn read_bundle_async(&self, bundle_name: &str) -> Result<Arc<Bundle>, BundleError> {
        let start = Instant::now();
        for device in &self.devices {
            if let Some(content) = device.load_async(bundle_name).await {
                return Self::open_bundle(bundle_name, &content, start);
            }
        }
        Err(BundleError::StorageLoadFailed(bundle_name.to_string()))
    }

    fn install_main(&self, bundle: Arc<Bundle>) -> Result<Arc<Manifest>, BundleError> {
        let manifest = bundle.load_typed::<Manifest>(MANIFEST_ASSET_NAME, &self.loaders)?;
        debug!(
            "Manifest of '{}' lists {} bundles",
            bundle.name(),
            manifest.bundle_names().count()
        );
        self.write_inner().main = Some(MainBundle {
            bundle,
            manifest: Arc::clone(&manifest),
        });
        Ok(manifest)
    }

    fn install_bundle(
        &self,
        bundle_name: &str,
        bundle: Arc<Bundle>,
    ) -> Result<Arc<Bundle>, BundleError> {
        self.write_inner()
            .cache
            .insert(bundle_name, Arc::clone(&bundle))?;
        Ok(bundle)
    }

    fn ensure_main(&self) -> Result<Arc<Manifest>, BundleError> {
        if let Some(manifest) = self.manifest() {
            return Ok(manifest);
        }
        let main_name = self.settings.main_bundle_name();
        let _permit = self
            .gate
            .try_acquire()
            .ok_or_else(|| BundleError::LoadInFlight(main_name.to_string()))?;
        if let Some(manifest) = self.manifest() {
            return Ok(manifest);
        }
        let bundle = self.read_bundle(main_name)?;
        self.install_main(bundle)
    }

    async fn ensure_main_async(&self) -> Result<Arc<Manifest>, BundleError> {
        if let Some(manifest) = self.manifest() {
            return Ok(manifest);
        }
        let _permit = self.gate.acquire().await;
        if let Some(manifest) = self.manifest() {
            return Ok(manifest);
        }
        let bundle = self
            .read_bundle_async(self.settings.main_bundle_name())
            .await?;
        self.install_main(bundle)
    }

    fn ensure_bundle(&self, bundle_name: &str) -> Result<Arc<Bundle>, BundleError> {
        if let Some(bundle) = self.get_bundle(bundle_name) {
            return Ok(bundle);
        }
        let _permit = self
            .gate
            .try_acquire()
            .ok_or_else(|| BundleError::LoadInFlight(bundle_name.to_string()))?;
        if let Some(bundle) = self.get_bundle(bundle_name) {
            return Ok(bundle);
        }
        let bundle = self.read_bundle(bundle_name)?;
        self.install_bundle(bundle_name, bundle)
    }

    async fn ensure_bundle_async(&self, bundle_name: &str) -> Result<Arc<Bundle>, BundleError> {
        if let Some(bundle) = self.get_bundle(bundle_name) {
            return Ok(bundle);
        }
        let _permit = self.gate.acquire().await;
        if let Some(bundle) = self.get_bundle(bundle_name) {
            return Ok(bundle);
        }
        let bundle = self.read_bundle_async(bundle_name).await?;
        self.install_bundle(bundle_name, bundle)
    }

    /// Loads a bundle and all of its dependencies, blocking the calling
    /// thread.
    ///
    /// # Errors
    /// Returns `BundleError` if the main bundle, a dependency or the bundle
    /// itself fails to load. Dependencies loaded before the failure stay
    /// cached.
    pub fn try_load_bundle_sync(&self, bundle_name: &str) -> Result<Arc<Bundle>, BundleError> {
        let manifest = self.ensure_main()?;
        for dependency in manifest.dependencies_of(bundle_name) {
            self.ensure_bundle(dependency)?;
        }
        self.ensure_bundle(bundle_name)
    }

    /// Loads a bundle and all of its dependencies, suspending the calling
    /// task.
    ///
    /// # Errors
    /// See [`Self::try_load_bundle_sync`].
    pub async fn try_load_bundle_async(
        &self,
        bundle_name: &str,
    ) -> Result<Arc<Bundle>, BundleError> {
        let manifest = self.ensure_main_async().await?;
        for dependency in manifest.dependencies_of(bundle_name) {
            self.ensure_bundle_async(dependency).await?;
        }
        self.ensure_bundle_async(bundle_name).await
    }

    /// Loads a bundle and all of its dependencies, `None` on failure.
    pub fn load_bundle_sync(&self, bundle_name: &str) -> Option<Arc<Bundle>> {
        self.try_load_bundle_sync(bundle_name)
            .map_err(|err| log_failure(bundle_name, None, &err))
            .ok()
    }

    /// Asynchronous version of [`Self::load_bundle_sync`].
    pub async fn load_bundle_async(&self, bundle_name: &str) -> Option<Arc<Bundle>> {
        self.try_load_bundle_async(bundle_name)
            .await
            .map_err(|err| log_failure(bundle_name, None, &err))
            .ok()
    }

    /// Loads a resource, blocking the calling thread.
    ///
    /// `kind` restricts the lookup to resources of that type. Spawnable
    /// resources are returned as fresh instances, anything else is shared
    /// with its bundle.
    ///
    /// # Errors
    /// Returns `BundleError` if a bundle fails to load or the resource is
    /// missing. A missing resource leaves its bundle cached.
    pub fn try_load_resource_sync(
        &self,
        bundle_name: &str,
        resource_name: &str,
        kind: Option<ResourceType>,
    ) -> Result<ResourceRef<dyn AnyResource>, BundleError> {
        let bundle = self.try_load_bundle_sync(bundle_name)?;
        let resource = bundle.load_resource(resource_name, kind, &self.loaders)?;
        Ok(instantiate(resource))
    }

    /// Loads a resource, blocking the calling thread. `None` on failure.
    pub fn load_resource_sync(
        &self,
        bundle_name: &str,
        resource_name: &str,
        kind: Option<ResourceType>,
    ) -> Option<ResourceRef<dyn AnyResource>> {
        self.try_load_resource_sync(bundle_name, resource_name, kind)
            .map_err(|err| log_failure(bundle_name, Some(resource_name), &err))
            .ok()
    }

    /// Typed version of [`Self::try_load_resource_sync`].
    ///
    /// # Errors
    /// See [`Self::try_load_resource_sync`].
    pub fn try_load_sync<T: Resource>(
        &self,
        bundle_name: &str,
        resource_name: &str,
    ) -> Result<ResourceRef<T>, BundleError> {
        let resource = self.try_load_resource_sync(bundle_name, resource_name, Some(T::TYPE))?;
        downcast(resource, bundle_name, resource_name)
    }

    /// Typed version of [`Self::load_resource_sync`].
    pub fn load_sync<T: Resource>(
        &self,
        bundle_name: &str,
        resource_name: &str,
    ) -> Option<ResourceRef<T>> {
        self.try_load_sync(bundle_name, resource_name)
            .map_err(|err| log_failure(bundle_name, Some(resource_name), &err))
            .ok()
    }

    /// Loads a resource, suspending the calling task.
    ///
    /// The resource is decoded on the blocking thread pool.
    ///
    /// # Errors
    /// See [`Self::try_load_resource_sync`].
    pub async fn try_load_resource_async(
        &self,
        bundle_name: &str,
        resource_name: &str,
        kind: Option<ResourceType>,
    ) -> Result<ResourceRef<dyn AnyResource>, BundleError> {
        let bundle = self.try_load_bundle_async(bundle_name).await?;

        let loaders = Arc::clone(&self.loaders);
        let resource_name = resource_name.to_string();
        let resource = tokio::task::spawn_blocking(move || {
            bundle.load_resource(&resource_name, kind, &loaders)
        })
        .await
        .map_err(|err| io::Error::new(io::ErrorKind::Other, err))??;

        Ok(instantiate(resource))
    }

    /// Loads a resource, suspending the calling task. `None` on failure.
    pub async fn load_resource_async(
        &self,
        bundle_name: &str,
        resource_name: &str,
        kind: Option<ResourceType>,
    ) -> Option<ResourceRef<dyn AnyResource>> {
        self.try_load_resource_async(bundle_name, resource_name, kind)
            .await
            .map_err(|err| log_failure(bundle_name, Some(resource_name), &err))
            .ok()
    }

    /// Typed version of [`Self::try_load_resource_async`].
    ///
    /// # Errors
    /// See [`Self::try_load_resource_sync`].
    pub async fn try_load_async<T: Resource>(
        &self,
        bundle_name: &str,
        resource_name: &str,
    ) -> Result<ResourceRef<T>, BundleError> {
        let resource = self
            .try_load_resource_async(bundle_name, resource_name, Some(T::TYPE))
            .await?;
        downcast(resource, bundle_name, resource_name)
    }

    /// Typed version of [`Self::load_resource_async`].
    pub async fn load_async<T: Resource>(
        &self,
        bundle_name: &str,
        resource_name: &str,
    ) -> Option<ResourceRef<T>> {
        self.try_load_async(bundle_name, resource_name)
            .await
            .map_err(|err| log_failure(bundle_name, Some(resource_name), &err))
            .ok()
    }

    /// Loads a resource on a new task, then calls `on_complete` with the
    /// result, `None` on failure.
    ///
    /// Outside of a tokio runtime no task can be spawned: `on_complete` is
    /// called with `None` before returning, and no handle is returned.
    pub fn load_resource_with<F>(
        self: &Arc<Self>,
        bundle_name: &str,
        resource_name: &str,
        kind: Option<ResourceType>,
        on_complete: F,
    ) -> Option<JoinHandle<()>>
    where
        F: FnOnce(Option<ResourceRef<dyn AnyResource>>) + Send + 'static,
    {
        let runtime = match Handle::try_current() {
            Ok(runtime) => runtime,
            Err(err) => {
                error!(
                    "Failed to load '{}' from bundle '{}': {}",
                    resource_name, bundle_name, err
                );
                on_complete(None);
                return None;
            }
        };

        let registry = Arc::clone(self);
        let bundle_name = bundle_name.to_string();
        let resource_name = resource_name.to_string();
        Some(runtime.spawn(async move {
            let resource = registry
                .load_resource_async(&bundle_name, &resource_name, kind)
                .await;
            on_complete(resource);
        }))
    }

    /// Typed version of [`Self::load_resource_with`].
    pub fn load_with<T, F>(
        self: &Arc<Self>,
        bundle_name: &str,
        resource_name: &str,
        on_complete: F,
    ) -> Option<JoinHandle<()>>
    where
        T: Resource,
        F: FnOnce(Option<ResourceRef<T>>) + Send + 'static,
    {
        self.load_resource_with(bundle_name, resource_name, Some(T::TYPE), move |resource| {
            on_complete(resource.and_then(|resource| resource.downcast::<T>()));
        })
    }

    /// Removes a bundle from the cache and releases it.
    ///
    /// With `release_all_objects`, the resources decoded from the bundle are
    /// released too. Unloading a bundle that is not loaded does nothing.
    pub fn unload(&self, bundle_name: &str, release_all_objects: bool) {
        let removed = self.write_inner().cache.remove(bundle_name);
        match removed {
            Some(bundle) => {
                bundle.unload(release_all_objects);
                info!("Unloaded bundle '{}'", bundle_name);
            }
            None => debug!("Bundle '{}' is not loaded, nothing to unload", bundle_name),
        }
    }

    /// Releases every bundle, the main bundle included.
    ///
    /// The next request loads the main bundle and its manifest again.
    pub fn unload_all(&self, release_all_objects: bool) {
        let (main, bundles) = {
            let mut inner = self.write_inner();
            (inner.main.take(), inner.cache.drain())
        };

        let count = bundles.len();
        for (_name, bundle) in bundles {
            bundle.unload(release_all_objects);
        }
        if let Some(main) = main {
            main.bundle.unload(release_all_objects);
        }
        info!("Unloaded all bundles ({} besides the main bundle)", count);
    }
}

fn instantiate(resource: Arc<dyn AnyResource>) -> ResourceRef<dyn AnyResource> {
    match resource.spawn_dyn() {
        Some(instance) => ResourceRef::Instance(instance),
        None => ResourceRef::Resident(resource),
    }
}

fn downcast<T: Resource>(
    resource: ResourceRef<dyn AnyResource>,
    bundle_name: &str,
    resource_name: &str,
) -> Result<ResourceRef<T>, BundleError> {
    resource
        .downcast::<T>()
        .ok_or_else(|| BundleError::ResourceNotFound {
            bundle: bundle_name.to_string(),
            resource: resource_name.to_string(),
        })
}

fn log_failure(bundle_name: &str, resource_name: Option<&str>, err: &BundleError) {
    // a busy gate is expected when mixing blocking and async requests
    let level = if matches!(err, BundleError::LoadInFlight(_)) {
        log::Level::Warn
    } else {
        log::Level::Error
    };
    match resource_name {
        Some(resource_name) => log::log!(
            level,
            "Failed to load '{}' from bundle '{}': {}",
            resource_name,
            bundle_name,
            err
        ),
        None => log::log!(level, "Failed to load bundle '{}': {}", bundle_name, err),
    }
}
