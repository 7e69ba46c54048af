//! Module containing the dependency manifest stored in the main bundle.

use std::{
    collections::{BTreeMap, HashMap, HashSet},
    io,
};

use serde::{Deserialize, Serialize};

use crate::{BundleError, JsonLoader, Resource};

/// Name under which the manifest is stored in the main bundle.
pub const MANIFEST_ASSET_NAME: &str = "AssetBundleManifest";

/// Description of a built bundle.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct CompiledBundle {
    /// The name of the bundle.
    pub name: String,
    /// Every bundle this bundle depends on, directly or not.
    pub dependencies: Vec<String>,
}

/// `Manifest` lists the transitive dependencies of every bundle.
///
/// The dependency list of a bundle is returned exactly as it was recorded,
/// which puts dependencies before the bundles depending on them when the
/// manifest was built with [`Manifest::from_direct_dependencies`].
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
#[serde(from = "Vec<CompiledBundle>", into = "Vec<CompiledBundle>")]
pub struct Manifest(BTreeMap<String, Vec<String>>);

impl Resource for Manifest {
    const TYPENAME: &'static str = "bundle_manifest";
}

/// [`crate::ResourceLoader`] for [`Manifest`].
pub type ManifestLoader = JsonLoader<Manifest>;

impl Manifest {
    /// Retrieve the transitive dependencies of a bundle.
    ///
    /// A bundle the manifest does not know about has no dependencies.
    pub fn dependencies_of(&self, bundle_name: &str) -> &[String] {
        self.0.get(bundle_name).map_or(&[], Vec::as_slice)
    }

    /// Add new information about a bundle, replacing any previous entry.
    pub fn insert(&mut self, bundle_name: impl Into<String>, dependencies: Vec<String>) {
        self.0.insert(bundle_name.into(), dependencies);
    }

    /// Returns true if the manifest has an entry for the bundle.
    pub fn contains(&self, bundle_name: &str) -> bool {
        self.0.contains_key(bundle_name)
    }

    /// Names of all bundles described by the manifest.
    pub fn bundle_names(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// Builds a manifest from the direct dependencies of each bundle.
    ///
    /// Every bundle gets its full transitive closure, listed so that a bundle
    /// always comes after everything it depends on.
    ///
    /// # Errors
    /// Returns `BundleError::DependencyCycle` if bundles depend on each other.
    pub fn from_direct_dependencies<I, N, D>(direct: I) -> Result<Self, BundleError>
    where
        I: IntoIterator<Item = (N, D)>,
        N: Into<String>,
        D: IntoIterator,
        D::Item: Into<String>,
    {
        let direct: HashMap<String, Vec<String>> = direct
            .into_iter()
            .map(|(name, deps)| (name.into(), deps.into_iter().map(Into::into).collect()))
            .collect();

        let mut roots = direct.keys().collect::<Vec<_>>();
        roots.sort();

        let mut manifest = Self::default();
        for root in roots {
            let mut visiting = HashSet::from([root.as_str()]);
            let mut visited = HashSet::new();
            let mut closure = vec![];
            Self::collect_closure(root, &direct, &mut visiting, &mut visited, &mut closure)?;
            manifest.insert(root.clone(), closure);
        }
        Ok(manifest)
    }

    fn collect_closure<'a>(
        bundle_name: &str,
        direct: &'a HashMap<String, Vec<String>>,
        visiting: &mut HashSet<&'a str>,
        visited: &mut HashSet<&'a str>,
        closure: &mut Vec<String>,
    ) -> Result<(), BundleError> {
        for dep in direct.get(bundle_name).into_iter().flatten() {
            if visited.contains(dep.as_str()) {
                continue;
            }
            if !visiting.insert(dep.as_str()) {
                return Err(BundleError::DependencyCycle(dep.clone()));
            }
            Self::collect_closure(dep, direct, visiting, visited, closure)?;
            visiting.remove(dep.as_str());
            visited.insert(dep.as_str());
            closure.push(dep.clone());
        }
        Ok(())
    }

    /// Construct `Manifest` by reading in persisted information
    ///
    /// # Errors
    /// Returns an error if the content is not a valid manifest document.
    pub fn import(reader: impl io::Read) -> Result<Self, BundleError> {
        let manifest = serde_json::from_reader(reader).map_err(io::Error::from)?;
        Ok(manifest)
    }

    /// Export to list of compiled bundles
    ///
    /// # Errors
    /// Returns an error if the writer fails.
    pub fn export(&self, writer: impl io::Write) -> Result<(), BundleError> {
        serde_json::to_writer_pretty(writer, self).map_err(io::Error::from)?;
        Ok(())
    }
}

impl From<Vec<CompiledBundle>> for Manifest {
    fn from(compiled_bundles: Vec<CompiledBundle>) -> Self {
        let mut manifest = Self::default();
        for compiled in compiled_bundles {
            manifest.insert(compiled.name, compiled.dependencies);
        }
        manifest
    }
}

impl From<Manifest> for Vec<CompiledBundle> {
    fn from(manifest: Manifest) -> Self {
        manifest
            .0
            .into_iter()
            .map(|(name, dependencies)| CompiledBundle { name, dependencies })
            .collect()
    }
}
