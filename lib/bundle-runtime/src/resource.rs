use std::{any::Any, collections::HashMap, fmt, io, marker::PhantomData, ops::Deref, sync::Arc};

use serde::de::DeserializeOwned;

use crate::ResourceType;

/// Types implementing `Resource` represent data stored inside a bundle.
pub trait Resource: Any + Send + Sync + Sized {
    /// Name of the resource type.
    const TYPENAME: &'static str;

    /// Type tag recorded in bundle files for this resource type.
    const TYPE: ResourceType = ResourceType::new(Self::TYPENAME.as_bytes());

    /// Instantiates a fresh copy of a spawnable resource.
    ///
    /// Spawnable resources are templates: every request receives its own copy
    /// while the resident original stays untouched in the bundle. Plain data
    /// returns `None` and is shared with the bundle instead.
    fn spawn(&self) -> Option<Self> {
        None
    }
}

/// Object-safe view of a [`Resource`].
pub trait AnyResource: Any + Send + Sync {
    /// Type tag of the resource.
    fn resource_type(&self) -> ResourceType;

    /// Name of the resource type.
    fn type_name(&self) -> &'static str;

    /// Cast to &dyn Any type.
    fn as_any(&self) -> &dyn Any;

    /// Converts a shared resource into a shared `Any`.
    fn into_any_arc(self: Arc<Self>) -> Arc<dyn Any + Send + Sync>;

    /// Converts an owned resource into an owned `Any`.
    fn into_any_box(self: Box<Self>) -> Box<dyn Any + Send + Sync>;

    /// See [`Resource::spawn`].
    fn spawn_dyn(&self) -> Option<Box<dyn AnyResource>>;
}

impl<T: Resource> AnyResource for T {
    fn resource_type(&self) -> ResourceType {
        T::TYPE
    }

    fn type_name(&self) -> &'static str {
        T::TYPENAME
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn into_any_arc(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }

    fn into_any_box(self: Box<Self>) -> Box<dyn Any + Send + Sync> {
        self
    }

    fn spawn_dyn(&self) -> Option<Box<dyn AnyResource>> {
        self.spawn()
            .map(|instance| Box::new(instance) as Box<dyn AnyResource>)
    }
}

impl dyn AnyResource {
    /// Returns true if the resource is of type `T`.
    pub fn is<T: Resource>(&self) -> bool {
        self.as_any().is::<T>()
    }

    /// Returns a reference to the resource if it is of type `T`.
    pub fn downcast_ref<T: Resource>(&self) -> Option<&T> {
        self.as_any().downcast_ref::<T>()
    }
}

impl fmt::Debug for dyn AnyResource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnyResource")
            .field("type_name", &self.type_name())
            .field("resource_type", &self.resource_type())
            .finish()
    }
}

/// Result of a resource request.
///
/// Resident resources are shared with the bundle they were loaded from and
/// must not be assumed exclusive. Instances are fresh copies of spawnable
/// resources owned by the caller.
pub enum ResourceRef<T: ?Sized> {
    /// The resource kept resident in its bundle.
    Resident(Arc<T>),
    /// A freshly spawned instance.
    Instance(Box<T>),
}

impl<T: ?Sized> ResourceRef<T> {
    /// Returns true if this is a freshly spawned instance.
    pub fn is_instance(&self) -> bool {
        matches!(self, Self::Instance(_))
    }

    /// Returns the shared resident resource, if this is not an instance.
    pub fn as_resident(&self) -> Option<&Arc<T>> {
        match self {
            Self::Resident(resident) => Some(resident),
            Self::Instance(_) => None,
        }
    }
}

impl ResourceRef<dyn AnyResource> {
    /// Converts an untyped result into a typed one, `None` on type mismatch.
    pub fn downcast<T: Resource>(self) -> Option<ResourceRef<T>> {
        match self {
            Self::Resident(resident) => resident
                .into_any_arc()
                .downcast::<T>()
                .ok()
                .map(ResourceRef::Resident),
            Self::Instance(instance) => instance
                .into_any_box()
                .downcast::<T>()
                .ok()
                .map(ResourceRef::Instance),
        }
    }
}

impl<T: ?Sized> Deref for ResourceRef<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        match self {
            Self::Resident(resident) => &**resident,
            Self::Instance(instance) => &**instance,
        }
    }
}

impl<T: ?Sized + fmt::Debug> fmt::Debug for ResourceRef<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Resident(resident) => f.debug_tuple("Resident").field(&&**resident).finish(),
            Self::Instance(instance) => f.debug_tuple("Instance").field(&&**instance).finish(),
        }
    }
}

/// An interface allowing to create resources from bundle payloads.
pub trait ResourceLoader: Send + Sync {
    /// Decodes one resource payload.
    fn load(&self, reader: &mut dyn io::Read) -> io::Result<Box<dyn AnyResource>>;
}

pub(crate) type LoaderMap = HashMap<ResourceType, Arc<dyn ResourceLoader>>;

/// [`ResourceLoader`] for resources stored as JSON documents.
pub struct JsonLoader<T> {
    _pd: PhantomData<fn() -> T>,
}

impl<T> Default for JsonLoader<T> {
    fn default() -> Self {
        Self { _pd: PhantomData }
    }
}

impl<T: Resource + DeserializeOwned> ResourceLoader for JsonLoader<T> {
    fn load(&self, reader: &mut dyn io::Read) -> io::Result<Box<dyn AnyResource>> {
        let resource: T = serde_json::from_reader(reader).map_err(io::Error::from)?;
        Ok(Box::new(resource))
    }
}
