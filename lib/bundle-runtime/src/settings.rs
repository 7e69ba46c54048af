//! Configuration of the bundle runtime.
//!
//! Settings are read once, from the `[bundle_runtime]` table of the
//! application config file:
//!
//! ```toml
//! [bundle_runtime]
//! storage_root = "bundles"
//! primary_bundle_key = "Android"
//! ```

use std::{
    env, fs,
    path::{Path, PathBuf},
};

use serde::de::DeserializeOwned;
use toml::value::{Table, Value};

use crate::{BundleError, Platform};

const DEFAULT_CONFIG_FILENAME: &str = "legionapp.toml";

/// Application config file.
pub struct Settings {
    config_path: PathBuf,
    table: Table,
}

impl Settings {
    /// Searches for the config file from the executable directory, walking up
    /// to the parent directories. Missing or invalid files yield empty
    /// settings.
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        let mut exe_dir = env::current_exe().unwrap_or_default();
        exe_dir.pop();
        Self::search_from(exe_dir)
    }

    /// Searches for the config file from `start_dir`, walking up to the
    /// parent directories.
    pub fn search_from(start_dir: impl AsRef<Path>) -> Self {
        let mut config_dir = start_dir.as_ref().to_owned();

        let mut table: Option<Table> = None;

        let file = Path::new(DEFAULT_CONFIG_FILENAME);
        loop {
            config_dir.push(file);

            if config_dir.is_file() {
                if let Ok(config_toml) = fs::read_to_string(&config_dir) {
                    match Self::parse(&config_toml) {
                        Ok(parsed) => table = Some(parsed),
                        Err(err) => log::warn!("Failed to parse TOML {:?}: {}", &config_dir, err),
                    }
                }
                config_dir.pop();
                break;
            }
            if !(config_dir.pop() && config_dir.pop()) {
                break;
            }
        }

        Self {
            config_path: config_dir,
            table: table.unwrap_or_default(),
        }
    }

    /// Settings parsed from a config file content. Relative paths resolve
    /// against `config_dir`.
    ///
    /// # Errors
    /// Returns `BundleError::Settings` if the content is not a TOML table.
    pub fn from_toml(config_dir: impl AsRef<Path>, content: &str) -> Result<Self, BundleError> {
        Ok(Self {
            config_path: config_dir.as_ref().to_owned(),
            table: Self::parse(content)?,
        })
    }

    fn parse(content: &str) -> Result<Table, BundleError> {
        content
            .parse::<Value>()
            .map_err(|err| BundleError::Settings(err.to_string()))?
            .try_into::<Table>()
            .map_err(|err| BundleError::Settings(format!("Not a table: {}", err)))
    }

    fn find_table_entry(&self, property_name: &str) -> Option<&Value> {
        if let Some((table_name, variable_name)) = property_name.split_once('.') {
            if let Some(table) = self.table.get(table_name).and_then(Value::as_table) {
                return table.get(variable_name);
            }
        }
        log::debug!("Settings entry not found: {}", property_name);
        None
    }

    /// Reads a `table.key` entry.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.find_table_entry(key)
            .and_then(|value| value.clone().try_into().ok())
    }

    /// Reads a `table.key` path entry, relative to the config file directory.
    pub fn get_absolute_path(&self, key: &str) -> Option<PathBuf> {
        self.find_table_entry(key)
            .and_then(Value::as_str)
            .map(|path| self.config_path.join(path))
    }
}

/// Configuration of a [`crate::BundleRegistry`], fixed for its lifetime.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BundleSettings {
    /// Directory holding the bundle files.
    pub storage_root: PathBuf,
    /// Selects the main bundle holding the manifest.
    pub primary_bundle_key: Platform,
}

impl BundleSettings {
    /// Settings for the current platform.
    pub fn new(storage_root: impl AsRef<Path>) -> Self {
        Self {
            storage_root: storage_root.as_ref().to_owned(),
            primary_bundle_key: Platform::current(),
        }
    }

    /// Overrides the platform whose main bundle is loaded.
    #[must_use]
    pub fn with_primary_bundle_key(mut self, primary_bundle_key: Platform) -> Self {
        self.primary_bundle_key = primary_bundle_key;
        self
    }

    /// Reads the `[bundle_runtime]` table.
    ///
    /// # Errors
    /// Returns `BundleError::Settings` if `storage_root` is missing or
    /// `primary_bundle_key` is not a known platform.
    pub fn from_settings(settings: &Settings) -> Result<Self, BundleError> {
        let storage_root = settings
            .get_absolute_path("bundle_runtime.storage_root")
            .ok_or_else(|| {
                BundleError::Settings("bundle_runtime.storage_root is not set".to_string())
            })?;

        let primary_bundle_key = match settings.find_table_entry("bundle_runtime.primary_bundle_key")
        {
            Some(value) => value.clone().try_into::<Platform>().map_err(|err| {
                BundleError::Settings(format!("Invalid primary_bundle_key: {}", err))
            })?,
            None => Platform::current(),
        };

        Ok(Self {
            storage_root,
            primary_bundle_key,
        })
    }

    /// Name of the main bundle file.
    pub fn main_bundle_name(&self) -> &'static str {
        self.primary_bundle_key.main_bundle_name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bundle_settings_from_toml() {
        let settings = Settings::from_toml(
            "/app",
            r#"
            [bundle_runtime]
            storage_root = "bundles"
            primary_bundle_key = "IOS"
            "#,
        )
        .unwrap();

        let bundle_settings = BundleSettings::from_settings(&settings).unwrap();
        assert_eq!(bundle_settings.storage_root, Path::new("/app").join("bundles"));
        assert_eq!(bundle_settings.primary_bundle_key, Platform::Ios);
        assert_eq!(bundle_settings.main_bundle_name(), "IOS");
    }

    #[test]
    fn primary_bundle_key_defaults_to_current_platform() {
        let settings =
            Settings::from_toml("/app", "[bundle_runtime]\nstorage_root = \"/data\"\n").unwrap();

        let bundle_settings = BundleSettings::from_settings(&settings).unwrap();
        assert_eq!(bundle_settings.storage_root, Path::new("/data"));
        assert_eq!(bundle_settings.primary_bundle_key, Platform::current());
    }

    #[test]
    fn invalid_settings() {
        let settings = Settings::from_toml("/app", "[other]\nvalue = 1\n").unwrap();
        assert!(matches!(
            BundleSettings::from_settings(&settings),
            Err(BundleError::Settings(_))
        ));

        let settings = Settings::from_toml(
            "/app",
            "[bundle_runtime]\nstorage_root = \"bundles\"\nprimary_bundle_key = \"Amiga\"\n",
        )
        .unwrap();
        assert!(BundleSettings::from_settings(&settings).is_err());

        assert!(Settings::from_toml("/app", "storage_root = ").is_err());
    }

    #[test]
    fn config_file_found_in_parent_directory() {
        let work_dir = tempfile::tempdir().unwrap();
        fs::write(
            work_dir.path().join(DEFAULT_CONFIG_FILENAME),
            "[bundle_runtime]\nstorage_root = \"bundles\"\nprimary_bundle_key = \"Android\"\n",
        )
        .unwrap();
        let start_dir = work_dir.path().join("target").join("debug");
        fs::create_dir_all(&start_dir).unwrap();

        let settings = Settings::search_from(&start_dir);
        let bundle_settings = BundleSettings::from_settings(&settings).unwrap();
        assert_eq!(bundle_settings.storage_root, work_dir.path().join("bundles"));
        assert_eq!(bundle_settings.primary_bundle_key, Platform::Android);

        // the closest file wins
        fs::write(
            start_dir.join(DEFAULT_CONFIG_FILENAME),
            "[bundle_runtime]\nstorage_root = \"local\"\n",
        )
        .unwrap();
        let settings = Settings::search_from(&start_dir);
        assert_eq!(
            settings.get_absolute_path("bundle_runtime.storage_root"),
            Some(start_dir.join("local"))
        );
    }

    #[test]
    fn typed_entries() {
        let settings = Settings::from_toml(
            "/app",
            "[test_settings]\ntest_string = \"TestString\"\ntest_int = 1337\n",
        )
        .unwrap();

        let test_string: String = settings.get("test_settings.test_string").unwrap();
        assert_eq!(test_string, "TestString");
        let test_int: i32 = settings.get("test_settings.test_int").unwrap();
        assert_eq!(test_int, 1337);
        assert!(settings.get::<i32>("test_settings.missing").is_none());
        assert!(settings.get::<i32>("no_table_separator").is_none());
    }
}
