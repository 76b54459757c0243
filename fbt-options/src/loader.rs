//! Options loading.
//!
//! [`OptionsLoader`] applies, in order:
//!
//! 1. the built-in defaults ([`FbtOptions::default`]),
//! 2. an optional base file (`--base`), which must exist when configured,
//! 3. the local override file, `fbt_options_local.toml` in the working
//!    directory unless pointed elsewhere; skipped when absent.
//!
//! Each step is all-or-nothing. A file that fails to parse or that assigns a
//! value of the wrong type aborts the load with the file path and location.

use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
};

use fbtconf::{Layer, LayerSource, LayerStack};

use crate::{OptionsError, options::FbtOptions};

/// Local override file name, resolved against the working directory.
pub const LOCAL_OPTIONS_FILE: &str = "fbt_options_local.toml";

/// Path configuration grouping all path-related inputs of a load.
#[derive(Default, Debug, Clone)]
pub struct PathConfig {
    /// Directory relative paths are resolved against.
    pub workdir: PathBuf,
    /// Base options file applied over the built-in defaults.
    pub base: Option<PathBuf>,
    /// Local override file; defaults to [`LOCAL_OPTIONS_FILE`].
    pub local: Option<PathBuf>,
}

impl PathConfig {
    /// Gets the local override path.
    pub fn local_path(&self) -> PathBuf {
        let local = self
            .local
            .clone()
            .unwrap_or_else(|| PathBuf::from(LOCAL_OPTIONS_FILE));
        self.resolve(&local)
    }

    /// Gets the base options path if configured.
    pub fn base_path(&self) -> Option<PathBuf> {
        self.base.as_deref().map(|p| self.resolve(p))
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_relative() {
            self.workdir.join(path)
        } else {
            path.to_path_buf()
        }
    }
}

/// Loads [`FbtOptions`] from defaults, an optional base file and the local
/// override.
#[derive(Debug, Clone)]
pub struct OptionsLoader {
    /// Where to look for option files.
    pub paths: PathConfig,
    defaults: FbtOptions,
}

impl OptionsLoader {
    /// Loader resolving relative paths against `workdir`.
    pub fn new(workdir: impl Into<PathBuf>) -> Self {
        Self {
            paths: PathConfig {
                workdir: workdir.into(),
                ..Default::default()
            },
            defaults: FbtOptions::default(),
        }
    }

    /// Apply `path` between the built-in defaults and the local override.
    pub fn with_base(mut self, path: impl Into<PathBuf>) -> Self {
        self.paths.base = Some(path.into());
        self
    }

    /// Use `path` as the local override file.
    pub fn with_local(mut self, path: impl Into<PathBuf>) -> Self {
        self.paths.local = Some(path.into());
        self
    }

    /// Start from `defaults` instead of the built-in values.
    pub fn with_defaults(mut self, defaults: FbtOptions) -> Self {
        self.defaults = defaults;
        self
    }

    /// Run the load.
    ///
    /// # Errors
    ///
    /// Returns an error if the configured base file is missing, or if any
    /// present file cannot be read, parsed or converted.
    pub fn load(&self) -> Result<LoadedOptions, OptionsError> {
        let mut stack = LayerStack::new();
        let mut options: FbtOptions = stack.apply(Layer::from_serialize(&self.defaults)?)?;

        if let Some(base) = self.paths.base_path() {
            if !base.exists() {
                return Err(OptionsError::MissingBase(base));
            }
            options = stack.apply(Layer::read(&base)?.expand_env())?;
        }

        let local = self.paths.local_path();
        match Layer::read_optional(&local)? {
            Some(layer) => {
                info!("applying local options from {}", local.display());
                options = stack.apply(layer.expand_env())?;
            }
            None => debug!("{} not found, using base options", local.display()),
        }

        Ok(LoadedOptions { options, stack })
    }
}

/// Load options for the current working directory.
///
/// # Errors
///
/// See [`OptionsLoader::load`].
pub fn load_options() -> Result<LoadedOptions, OptionsError> {
    let cwd = std::env::current_dir().map_err(OptionsError::WorkDir)?;
    OptionsLoader::new(cwd).load()
}

/// Options together with where each value came from.
#[derive(Debug, Clone)]
pub struct LoadedOptions {
    /// The resolved options.
    pub options: FbtOptions,
    stack: LayerStack,
}

impl LoadedOptions {
    /// Layers that were applied, in order.
    pub fn sources(&self) -> &[LayerSource] {
        self.stack.sources()
    }

    /// Layer that last set `key` (`TARGET_HW`, `FIRMWARE_APPS.minimal`, ...).
    pub fn origin(&self, key: &str) -> Option<&LayerSource> {
        self.stack.origin(key)
    }

    /// Every leaf key with its layer.
    pub fn origins(&self) -> &BTreeMap<String, LayerSource> {
        self.stack.origins()
    }

    /// Whether a file layer was applied on top of the defaults.
    pub fn overridden(&self) -> bool {
        self.stack
            .sources()
            .iter()
            .any(|s| matches!(s, LayerSource::File(_)))
    }
}
