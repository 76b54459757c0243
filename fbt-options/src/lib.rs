//! # fbt-options
//!
//! Build options for the firmware build tool (`fbt`), with local overrides.
//!
//! A checkout carries a base set of options: firmware origin, target
//! hardware, optimization flags, the autostart application, the radio stack
//! image and a map of named application sets. Developers tweak any of them in
//! an untracked `fbt_options_local.toml` that is applied on top. Override
//! files are plain TOML (or JSON) assignments; they are parsed, never
//! executed.
//!
//! ## Modules
//!
//! - [`options`] - The typed options and their defaults
//! - [`loader`] - Layered loading with provenance
//! - [`manifest`] - Application manifest (`application.fam`) scanning
//! - [`check`] - Consistency checks across options and manifests
//! - [`export`] - Rendering options for the build tool
//!
//! ## Example
//!
//! ```rust,no_run
//! use fbt_options::loader::OptionsLoader;
//!
//! let loaded = OptionsLoader::new(".").load().unwrap();
//! for group in loaded.options.active_profile().unwrap() {
//!     println!("{group}");
//! }
//! ```

use std::path::PathBuf;

use thiserror::Error;

/// Consistency checks across options and manifests.
pub mod check;

/// Rendering options for the build tool.
pub mod export;

/// Layered loading of options files.
pub mod loader;

/// Application manifest scanning.
pub mod manifest;

/// Firmware build option types and defaults.
pub mod options;

#[macro_use]
extern crate log;

pub use loader::{LOCAL_OPTIONS_FILE, LoadedOptions, OptionsLoader, load_options};
pub use options::FbtOptions;

/// Errors raised by this crate.
#[derive(Debug, Error)]
pub enum OptionsError {
    /// An options file could not be read, parsed or applied.
    #[error(transparent)]
    Load(#[from] fbtconf::ConfError),

    /// A base options file was requested but does not exist.
    #[error("base options file not found: {}", .0.display())]
    MissingBase(PathBuf),

    /// The working directory could not be determined.
    #[error("cannot determine working directory")]
    WorkDir(#[source] std::io::Error),

    /// `LOADER_START_DELAY` is negative or not a finite number.
    #[error("LOADER_START_DELAY: {0} is not a valid number of seconds")]
    InvalidDelay(f64),

    /// A profile name has no entry in `FIRMWARE_APPS`.
    #[error("unknown application set `{name}` (available: {})", .available.join(", "))]
    UnknownProfile { name: String, available: Vec<String> },

    /// A manifest directory or file could not be read.
    #[error("failed to read manifest {}", .path.display())]
    Manifest {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
