use std::{fs, io, path::Path, sync::Arc};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use lgn_bundle_runtime::{
    AnyResource, BundleBuilder, BundleRegistryOptions, BundleSettings, Manifest, Platform,
    Resource, ResourceLoader,
};
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Material {
    pub shader: String,
}

impl Resource for Material {
    const TYPENAME: &'static str = "material";
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Prefab {
    pub name: String,
    pub materials: Vec<String>,
}

impl Resource for Prefab {
    const TYPENAME: &'static str = "prefab";

    fn spawn(&self) -> Option<Self> {
        Some(self.clone())
    }
}

#[derive(Debug, PartialEq)]
pub struct Texture {
    pub width: u32,
    pub height: u32,
}

impl Resource for Texture {
    const TYPENAME: &'static str = "texture";
}

impl Texture {
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut content = vec![];
        content.write_u32::<LittleEndian>(self.width).unwrap();
        content.write_u32::<LittleEndian>(self.height).unwrap();
        content
    }
}

pub struct TextureLoader;

impl ResourceLoader for TextureLoader {
    fn load(&self, reader: &mut dyn io::Read) -> io::Result<Box<dyn AnyResource>> {
        let width = reader.read_u32::<LittleEndian>()?;
        let height = reader.read_u32::<LittleEndian>()?;
        Ok(Box::new(Texture { width, height }))
    }
}

/// Writes the Android main bundle and a small character set:
/// characters -> shared_materials -> textures.
pub fn write_bundles(dir: &Path) {
    fs::create_dir_all(dir).unwrap();

    let manifest = Manifest::from_direct_dependencies([
        ("characters", vec!["shared_materials"]),
        ("shared_materials", vec!["textures"]),
        ("textures", vec![]),
    ])
    .unwrap();
    BundleBuilder::new()
        .add_manifest(&manifest)
        .unwrap()
        .write(&mut fs::File::create(dir.join("Android")).unwrap())
        .unwrap();

    let knight = Prefab {
        name: "Knight".to_string(),
        materials: vec!["steel".to_string()],
    };
    fs::write(
        dir.join("characters"),
        BundleBuilder::new()
            .add_json("Knight", &knight)
            .unwrap()
            .to_bytes(),
    )
    .unwrap();

    let steel = Material {
        shader: "pbr".to_string(),
    };
    fs::write(
        dir.join("shared_materials"),
        BundleBuilder::new()
            .add_json("steel", &steel)
            .unwrap()
            .to_bytes(),
    )
    .unwrap();

    let albedo = Texture {
        width: 256,
        height: 128,
    };
    fs::write(
        dir.join("textures"),
        BundleBuilder::new()
            .add_raw("steel_albedo", Texture::TYPE, albedo.to_bytes())
            .to_bytes(),
    )
    .unwrap();
}

pub fn registry_options(settings: BundleSettings) -> BundleRegistryOptions {
    BundleRegistryOptions::new(settings)
        .add_json_loader::<Material>()
        .add_json_loader::<Prefab>()
        .add_loader(Texture::TYPE, Arc::new(TextureLoader))
}

pub fn android_settings(dir: &Path) -> BundleSettings {
    BundleSettings::new(dir).with_primary_bundle_key(Platform::Android)
}
