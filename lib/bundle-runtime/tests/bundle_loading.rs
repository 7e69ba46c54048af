use std::{fs, sync::Arc};

use lgn_bundle_runtime::{
    settings::Settings, vfs::MemoryDevice, BundleError, BundleSettings, Platform, Resource,
};

mod common;
use common::{Material, Prefab, Texture};

#[test]
fn load_with_settings_from_config_file() {
    let work_dir = tempfile::tempdir().unwrap();
    common::write_bundles(&work_dir.path().join("bundles"));

    let config_path = work_dir.path().join("legionapp.toml");
    fs::write(
        &config_path,
        "[bundle_runtime]\nstorage_root = \"bundles\"\nprimary_bundle_key = \"Android\"\n",
    )
    .unwrap();

    let settings =
        Settings::from_toml(work_dir.path(), &fs::read_to_string(&config_path).unwrap()).unwrap();
    let settings = BundleSettings::from_settings(&settings).unwrap();
    assert_eq!(settings.primary_bundle_key, Platform::Android);

    let registry = common::registry_options(settings).create();
    let knight = registry.load_sync::<Prefab>("characters", "Knight").unwrap();
    assert!(knight.is_instance());
    assert_eq!(knight.materials, ["steel"]);

    assert_eq!(
        registry.loaded_bundles(),
        ["characters", "shared_materials", "textures"]
    );
    assert_eq!(
        registry.get_dependencies("characters").unwrap(),
        ["textures", "shared_materials"]
    );
}

#[test]
fn custom_loader_decodes_binary_payload() {
    let work_dir = tempfile::tempdir().unwrap();
    common::write_bundles(work_dir.path());

    let registry = common::registry_options(common::android_settings(work_dir.path())).create();
    let albedo = registry
        .load_resource_sync("textures", "steel_albedo", Some(Texture::TYPE))
        .unwrap();
    assert!(!albedo.is_instance());
    assert_eq!(
        albedo.downcast_ref::<Texture>(),
        Some(&Texture {
            width: 256,
            height: 128
        })
    );

    // without a loader the resource cannot be decoded
    let registry =
        lgn_bundle_runtime::BundleRegistryOptions::new(common::android_settings(work_dir.path()))
            .create();
    assert!(matches!(
        registry.try_load_resource_sync("textures", "steel_albedo", None),
        Err(BundleError::LoaderNotFound(kind)) if kind == Texture::TYPE
    ));
    assert!(registry.is_loaded("textures"));
}

#[tokio::test]
async fn concurrent_async_requests() {
    let work_dir = tempfile::tempdir().unwrap();
    common::write_bundles(work_dir.path());

    let registry = common::registry_options(common::android_settings(work_dir.path())).create();

    let knights = futures::future::join_all(
        (0..4).map(|_| registry.load_async::<Prefab>("characters", "Knight")),
    )
    .await;
    for knight in &knights {
        assert_eq!(knight.as_ref().unwrap().name, "Knight");
    }

    let materials = futures::future::join_all(
        (0..4).map(|_| registry.load_async::<Material>("shared_materials", "steel")),
    )
    .await;
    let first = materials[0].as_ref().unwrap().as_resident().unwrap();
    for material in &materials {
        assert!(Arc::ptr_eq(
            first,
            material.as_ref().unwrap().as_resident().unwrap()
        ));
    }
    assert_eq!(registry.loaded_bundles().len(), 3);
}

#[tokio::test]
async fn cached_bundles_survive_storage_removal() {
    let work_dir = tempfile::tempdir().unwrap();
    common::write_bundles(work_dir.path());

    let registry = common::registry_options(common::android_settings(work_dir.path())).create();
    assert!(registry
        .load_async::<Material>("shared_materials", "steel")
        .await
        .is_some());

    fs::remove_file(work_dir.path().join("shared_materials")).unwrap();
    assert!(registry
        .load_async::<Material>("shared_materials", "steel")
        .await
        .is_some());

    registry.unload("shared_materials", true);
    assert!(matches!(
        registry
            .try_load_async::<Material>("shared_materials", "steel")
            .await,
        Err(BundleError::StorageLoadFailed(name)) if name == "shared_materials"
    ));
    assert!(!registry.is_loaded("shared_materials"));
}

#[tokio::test]
async fn devices_are_queried_before_storage_root() {
    let work_dir = tempfile::tempdir().unwrap();
    common::write_bundles(work_dir.path());

    let patched = MemoryDevice::new();
    patched.insert(
        "shared_materials",
        lgn_bundle_runtime::BundleBuilder::new()
            .add_json(
                "steel",
                &Material {
                    shader: "unlit".to_string(),
                },
            )
            .unwrap()
            .to_bytes(),
    );

    let registry = common::registry_options(common::android_settings(work_dir.path()))
        .add_device(Box::new(patched))
        .create();
    let steel = registry
        .load_async::<Material>("shared_materials", "steel")
        .await
        .unwrap();
    assert_eq!(steel.shader, "unlit");

    // the main bundle and the other bundles still come from the storage root
    assert!(registry.is_main_bundle_loaded());
    assert!(registry.is_loaded("textures"));
}
