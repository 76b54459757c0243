use std::path::PathBuf;

use thiserror::Error;

use crate::layer::LayerSource;

/// Result alias for layer operations.
pub type Result<T> = std::result::Result<T, ConfError>;

/// Errors raised while reading or applying a configuration layer.
///
/// Every variant names the layer it came from so the user knows which file
/// to fix.
#[derive(Debug, Error)]
pub enum ConfError {
    /// The layer file exists but could not be read.
    #[error("failed to read {}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The layer text is not valid TOML/JSON.
    #[error("{layer}:{line}:{column}: syntax error: {message}")]
    Syntax {
        layer: LayerSource,
        line: usize,
        column: usize,
        message: String,
    },

    /// The layer file extension maps to no known format.
    #[error("{layer}: unsupported config file extension: {ext:?}")]
    UnsupportedExtension { layer: LayerSource, ext: String },

    /// The layer parsed, but the merged result does not fit the typed config.
    #[error("{layer}{}: invalid value{}: {message}", line_suffix(.line), key_suffix(.key))]
    Invalid {
        layer: LayerSource,
        key: Option<String>,
        line: Option<usize>,
        message: String,
    },

    /// Built-in defaults could not be turned into a layer.
    #[error("failed to serialize built-in defaults: {0}")]
    Defaults(#[from] toml::ser::Error),
}

fn line_suffix(line: &Option<usize>) -> String {
    line.map(|l| format!(":{l}")).unwrap_or_default()
}

fn key_suffix(key: &Option<String>) -> String {
    key.as_ref()
        .map(|k| format!(" for `{k}`"))
        .unwrap_or_default()
}

impl ConfError {
    /// The layer the error belongs to, when it is known.
    pub fn layer(&self) -> Option<LayerSource> {
        match self {
            ConfError::Io { path, .. } => Some(LayerSource::File(path.clone())),
            ConfError::Syntax { layer, .. }
            | ConfError::UnsupportedExtension { layer, .. }
            | ConfError::Invalid { layer, .. } => Some(layer.clone()),
            ConfError::Defaults(_) => Some(LayerSource::Defaults),
        }
    }
}
