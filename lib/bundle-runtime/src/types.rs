use core::fmt;
use std::fmt::LowerHex;

use serde::{Deserialize, Serialize};

/// Type identifier of a resource stored in a bundle.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Debug)]
pub struct ResourceType(u32);

impl ResourceType {
    const CRC32_ALGO: crc::Crc<u32> = crc::Crc::<u32>::new(&crc::CRC_32_CKSUM);

    const fn crc32(v: &[u8]) -> u32 {
        Self::CRC32_ALGO.checksum(v)
    }

    /// Creates a new 32 bit resource type id from series of bytes.
    ///
    /// It is recommended to use this method to define a public constant
    /// which can be used to identify a resource type.
    pub const fn new(v: &[u8]) -> Self {
        Self(Self::crc32(v))
    }

    /// Creates a 32 bit resource type id from its raw value, as read from a
    /// bundle file.
    pub const fn from_raw(v: u32) -> Self {
        Self(v)
    }

    /// Returns the raw value written to bundle files.
    pub const fn raw(self) -> u32 {
        self.0
    }
}

impl LowerHex for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::LowerHex::fmt(&self.0, f)
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_fmt(format_args!("{:#010x}", self.0))
    }
}

/// Selects which main bundle holds the manifest.
///
/// Each build target packages its own main bundle, named after the platform.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Debug)]
pub enum Platform {
    /// Desktop builds.
    #[serde(alias = "PC", alias = "pc")]
    Pc,
    /// Android builds.
    #[serde(alias = "android")]
    Android,
    /// iOS builds.
    #[serde(alias = "IOS", alias = "ios")]
    Ios,
}

impl Platform {
    /// Platform of the running executable.
    pub fn current() -> Self {
        if cfg!(target_os = "ios") {
            Self::Ios
        } else if cfg!(target_os = "android") {
            Self::Android
        } else {
            Self::Pc
        }
    }

    /// File name of the main bundle for this platform.
    pub fn main_bundle_name(self) -> &'static str {
        match self {
            Self::Pc => "PC",
            Self::Android => "Android",
            Self::Ios => "IOS",
        }
    }
}

impl Default for Platform {
    fn default() -> Self {
        Self::current()
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.main_bundle_name())
    }
}
