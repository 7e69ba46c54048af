//! Runtime bundle loading.
//!
//! Resources are shipped in `bundles`: named archives that are loaded as a
//! unit and may depend on other bundles. A platform specific `main bundle`
//! carries the [`Manifest`] listing the transitive dependencies of every
//! bundle.
//!
//! A resource request goes through the [`BundleRegistry`]:
//!
//! * the main bundle and its manifest are loaded on first use,
//! * every dependency of the requested bundle is made resident, in manifest
//!   order,
//! * the requested bundle is made resident,
//! * the resource is extracted, and instantiated if it is spawnable.
//!
//! Loaded bundles are cached until unloaded. Every low-level bundle load goes
//! through a single [`LoadGate`], so at most one bundle is read from storage
//! at any time.
//!
//! ## `Bundle File` format
//! ```markdown
//! |--------- header ----------|
//! | magic "lgnb", version     |
//! | entry count               |
//! |--------- entry #1 --------|
//! | name, resource type       |
//! | payload size, payload     |
//! |--------- entry #2 --------|
//! | ...                       |
//! ```
//!
//! ## Example
//! ```no_run
//! # use lgn_bundle_runtime::{BundleRegistryOptions, BundleSettings, Platform};
//! # async fn run() {
//! let settings = BundleSettings::new("bundles").with_primary_bundle_key(Platform::Pc);
//! let registry = BundleRegistryOptions::new(settings).create();
//! let hero = registry
//!     .load_resource_async("characters", "Hero", None)
//!     .await;
//! # }
//! ```

// BEGIN - Legion Labs lints v0.6
// do not change or add/remove here, but one can add exceptions after this section
#![deny(unsafe_code)]
#![warn(future_incompatible, nonstandard_style, rust_2018_idioms)]
// Rustdoc lints
#![warn(
    rustdoc::broken_intra_doc_links,
    rustdoc::missing_crate_level_docs,
    rustdoc::private_intra_doc_links
)]
// Clippy pedantic lints, treat all as warnings by default, add exceptions in allow list
#![warn(clippy::pedantic)]
#![allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::if_not_else,
    clippy::items_after_statements,
    clippy::missing_panics_doc,
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::similar_names,
    clippy::shadow_unrelated,
    clippy::unreadable_literal,
    clippy::unseparated_literal_suffix
)]
// Clippy nursery lints, still under development
#![warn(
    clippy::debug_assert_with_mut_call,
    clippy::disallowed_method,
    clippy::disallowed_type,
    clippy::fallible_impl_from,
    clippy::imprecise_flops,
    clippy::mutex_integer,
    clippy::path_buf_push_overwrite,
    clippy::string_lit_as_bytes,
    clippy::use_self,
    clippy::useless_transmute
)]
// Clippy restriction lints, usually not considered bad, but useful in specific cases
#![warn(
    clippy::dbg_macro,
    clippy::exit,
    clippy::float_cmp_const,
    clippy::map_err_ignore,
    clippy::mem_forget,
    clippy::missing_enforced_import_renames,
    clippy::rest_pat_in_fully_bound_structs,
    clippy::string_to_string,
    clippy::todo,
    clippy::unimplemented,
    clippy::verbose_file_reads
)]
// END - Legion Labs lints v0.6
// crate-specific lint exceptions:
#![warn(missing_docs)]

pub mod manifest;
pub use manifest::Manifest;

pub mod settings;
pub use settings::BundleSettings;

pub mod vfs;

mod bundle;
pub use bundle::*;

mod bundle_registry;
pub use bundle_registry::*;

mod cache;
pub use cache::*;

mod error;
pub use error::*;

mod load_gate;
pub use load_gate::*;

mod resource;
pub use resource::*;

mod types;
pub use types::*;

#[cfg(test)]
mod test_resource;
