use std::{
    collections::HashMap,
    io::{self, Read},
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, RwLock,
    },
};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use log::debug;
use serde::Serialize;

use crate::{
    manifest::{Manifest, MANIFEST_ASSET_NAME},
    resource::LoaderMap,
    AnyResource, BundleError, Resource, ResourceType,
};

const BUNDLE_FILE_TYPENAME: &[u8; 4] = b"lgnb";
const BUNDLE_FILE_VERSION: u16 = 1;
// name length, resource type and payload length
const BUNDLE_ENTRY_MIN_SIZE: usize = 8 + 4 + 8;

struct BundleEntry {
    name: String,
    kind: ResourceType,
    data: Vec<u8>,
}

/// A loaded bundle file.
///
/// Resources are decoded on first request and then stay resident in the
/// bundle, so every later request for the same resource shares one object.
/// Once unloaded, the bundle refuses any further retrieval.
pub struct Bundle {
    name: String,
    entries: RwLock<Vec<BundleEntry>>,
    resident: RwLock<HashMap<(String, ResourceType), Arc<dyn AnyResource>>>,
    unloaded: AtomicBool,
}

impl Bundle {
    /// Parses a bundle file.
    ///
    /// # Errors
    /// Returns `BundleError::InvalidBundle` if the content is not a valid
    /// bundle file.
    pub fn from_bytes(name: &str, content: &[u8]) -> Result<Self, BundleError> {
        let entries = Self::read_entries(content)
            .map_err(|err| BundleError::InvalidBundle(name.to_string(), err.to_string()))?;

        Ok(Self {
            name: name.to_string(),
            entries: RwLock::new(entries),
            resident: RwLock::new(HashMap::new()),
            unloaded: AtomicBool::new(false),
        })
    }

    fn read_entries(mut reader: &[u8]) -> io::Result<Vec<BundleEntry>> {
        let mut typename: [u8; 4] = [0; 4];
        reader.read_exact(&mut typename)?;
        if &typename != BUNDLE_FILE_TYPENAME {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                "Filetype Mismatch",
            ));
        }

        let version = reader.read_u16::<LittleEndian>()?;
        if version != BUNDLE_FILE_VERSION {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                "Version Mismatch",
            ));
        }

        let entry_count = reader.read_u64::<LittleEndian>()?;
        if entry_count > (reader.len() / BUNDLE_ENTRY_MIN_SIZE) as u64 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                "Entry count exceeds bundle size",
            ));
        }

        let mut entries = vec![];
        for _ in 0..entry_count {
            let name_len = reader.read_u64::<LittleEndian>()?;
            let name = String::from_utf8(Self::read_bytes(&mut reader, name_len)?)
                .map_err(|err| io::Error::new(io::ErrorKind::InvalidData, err))?;

            let kind = ResourceType::from_raw(reader.read_u32::<LittleEndian>()?);

            let nbytes = reader.read_u64::<LittleEndian>()?;
            let data = Self::read_bytes(&mut reader, nbytes)?;

            entries.push(BundleEntry { name, kind, data });
        }
        Ok(entries)
    }

    // lengths come from the file and are checked before allocating
    fn read_bytes(reader: &mut &[u8], len: u64) -> io::Result<Vec<u8>> {
        let len = usize::try_from(len)
            .ok()
            .filter(|len| *len <= reader.len())
            .ok_or_else(|| {
                io::Error::new(io::ErrorKind::InvalidData, "Entry exceeds bundle size")
            })?;
        let (bytes, rest) = reader.split_at(len);
        *reader = rest;
        Ok(bytes.to_vec())
    }

    /// Name of the bundle.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns true once the bundle has been unloaded.
    pub fn is_unloaded(&self) -> bool {
        self.unloaded.load(Ordering::Acquire)
    }

    /// Returns true if the bundle has a resource of that name, optionally of
    /// a given type.
    pub fn contains(&self, resource_name: &str, kind: Option<ResourceType>) -> bool {
        self.entries
            .read()
            .unwrap()
            .iter()
            .any(|entry| Self::matches(entry, resource_name, kind))
    }

    /// Names and types of all resources stored in the bundle.
    pub fn resources(&self) -> Vec<(String, ResourceType)> {
        self.entries
            .read()
            .unwrap()
            .iter()
            .map(|entry| (entry.name.clone(), entry.kind))
            .collect()
    }

    fn matches(entry: &BundleEntry, resource_name: &str, kind: Option<ResourceType>) -> bool {
        entry.name == resource_name && kind.map_or(true, |kind| kind == entry.kind)
    }

    /// Retrieves a resource, decoding it on first request.
    pub(crate) fn load_resource(
        &self,
        resource_name: &str,
        kind: Option<ResourceType>,
        loaders: &LoaderMap,
    ) -> Result<Arc<dyn AnyResource>, BundleError> {
        // unload raises the flag before clearing the entries
        let entries = self.entries.read().unwrap();
        if self.is_unloaded() {
            return Err(BundleError::BundleUnloaded(self.name.clone()));
        }
        let entry = entries
            .iter()
            .find(|entry| Self::matches(entry, resource_name, kind))
            .ok_or_else(|| BundleError::ResourceNotFound {
                bundle: self.name.clone(),
                resource: resource_name.to_string(),
            })?;

        let key = (entry.name.clone(), entry.kind);
        if let Some(resident) = self.resident.read().unwrap().get(&key) {
            return Ok(resident.clone());
        }

        let loader = loaders
            .get(&entry.kind)
            .ok_or(BundleError::LoaderNotFound(entry.kind))?;
        let resource: Arc<dyn AnyResource> = Arc::from(loader.load(&mut &entry.data[..])?);
        if resource.resource_type() != entry.kind {
            return Err(BundleError::InvalidBundle(
                self.name.clone(),
                format!(
                    "resource '{}' decoded as '{}' instead of {}",
                    entry.name,
                    resource.type_name(),
                    entry.kind
                ),
            ));
        }
        debug!("Decoded '{}' from bundle '{}'", entry.name, self.name);

        let resource = self
            .resident
            .write()
            .unwrap()
            .entry(key)
            .or_insert(resource)
            .clone();
        Ok(resource)
    }

    /// Typed version of [`Self::load_resource`].
    pub(crate) fn load_typed<T: Resource>(
        &self,
        resource_name: &str,
        loaders: &LoaderMap,
    ) -> Result<Arc<T>, BundleError> {
        self.load_resource(resource_name, Some(T::TYPE), loaders)?
            .into_any_arc()
            .downcast::<T>()
            .map_err(|_any| BundleError::ResourceNotFound {
                bundle: self.name.clone(),
                resource: resource_name.to_string(),
            })
    }

    /// Releases the bundle file content.
    ///
    /// With `release_all_objects`, resources decoded from the bundle are
    /// released as well; otherwise callers already holding them keep them
    /// alive.
    pub fn unload(&self, release_all_objects: bool) {
        self.unloaded.store(true, Ordering::Release);
        self.entries.write().unwrap().clear();
        if release_all_objects {
            self.resident.write().unwrap().clear();
        }
        debug!(
            "Unloaded bundle '{}' (release_all_objects: {})",
            self.name, release_all_objects
        );
    }
}

/// Writes bundle files.
#[derive(Default)]
pub struct BundleBuilder {
    entries: Vec<BundleEntry>,
}

impl BundleBuilder {
    /// Creates an empty bundle.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an already encoded resource.
    #[must_use]
    pub fn add_raw(mut self, name: impl Into<String>, kind: ResourceType, data: Vec<u8>) -> Self {
        self.entries.push(BundleEntry {
            name: name.into(),
            kind,
            data,
        });
        self
    }

    /// Adds a resource encoded as JSON, readable by [`crate::JsonLoader`].
    ///
    /// # Errors
    /// Returns an error if the resource fails to serialize.
    pub fn add_json<T: Resource + Serialize>(
        self,
        name: impl Into<String>,
        resource: &T,
    ) -> Result<Self, BundleError> {
        let data = serde_json::to_vec(resource).map_err(io::Error::from)?;
        Ok(self.add_raw(name, T::TYPE, data))
    }

    /// Adds the dependency manifest, making this a main bundle.
    ///
    /// # Errors
    /// Returns an error if the manifest fails to serialize.
    pub fn add_manifest(self, manifest: &Manifest) -> Result<Self, BundleError> {
        self.add_json(MANIFEST_ASSET_NAME, manifest)
    }

    /// Writes the bundle file.
    ///
    /// # Errors
    /// Returns an error if the writer fails.
    pub fn write(&self, writer: &mut dyn io::Write) -> io::Result<()> {
        writer.write_all(BUNDLE_FILE_TYPENAME)?;
        writer.write_u16::<LittleEndian>(BUNDLE_FILE_VERSION)?;
        writer.write_u64::<LittleEndian>(self.entries.len() as u64)?;
        for entry in &self.entries {
            writer.write_u64::<LittleEndian>(entry.name.len() as u64)?;
            writer.write_all(entry.name.as_bytes())?;
            writer.write_u32::<LittleEndian>(entry.kind.raw())?;
            writer.write_u64::<LittleEndian>(entry.data.len() as u64)?;
            writer.write_all(&entry.data)?;
        }
        Ok(())
    }

    /// Returns the bundle file content.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut content = vec![];
        // writing to a Vec does not fail
        let _result = self.write(&mut content);
        content
    }
}
