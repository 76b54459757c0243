use std::collections::BTreeMap;

use serde::de::DeserializeOwned;
use toml::{Table, Value};

use crate::{
    error::{ConfError, Result},
    layer::{Layer, LayerSource},
    merge::merge_tables,
};

/// Ordered stack of applied layers.
///
/// The stack owns the merged table, the list of applied sources and, for
/// every leaf key, the source that last assigned it.
#[derive(Debug, Clone, Default)]
pub struct LayerStack {
    table: Table,
    sources: Vec<LayerSource>,
    origins: BTreeMap<String, LayerSource>,
}

impl LayerStack {
    /// Create an empty stack.
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge `layer` on top of the stack and convert the result to `C`.
    ///
    /// Nothing is committed unless the conversion succeeds, so a rejected
    /// layer leaves the stack exactly as it was.
    ///
    /// # Errors
    ///
    /// Returns [`ConfError::Invalid`] naming the layer, and when it can be
    /// isolated, the offending key and its line.
    pub fn apply<C: DeserializeOwned>(&mut self, layer: Layer) -> Result<C> {
        let mut merged = self.table.clone();
        let touched = merge_tables(&mut merged, layer.table.clone());

        let typed = match to_typed::<C>(&merged) {
            Ok(typed) => typed,
            Err(err) => return Err(self.blame::<C>(&layer, err)),
        };

        info!("applied {} ({} keys)", layer.source, touched.len());
        for key in touched {
            debug!("{key} <- {}", layer.source);
            let nested = format!("{key}.");
            self.origins.retain(|k, _| !k.starts_with(&nested));
            self.origins.insert(key, layer.source.clone());
        }
        self.table = merged;
        self.sources.push(layer.source);

        Ok(typed)
    }

    /// Convert the current merged table to `C`.
    pub fn typed<C: DeserializeOwned>(&self) -> std::result::Result<C, toml::de::Error> {
        to_typed(&self.table)
    }

    /// The merged table.
    pub fn table(&self) -> &Table {
        &self.table
    }

    /// Sources applied so far, in order.
    pub fn sources(&self) -> &[LayerSource] {
        &self.sources
    }

    /// Every leaf key with the source that last set it.
    pub fn origins(&self) -> &BTreeMap<String, LayerSource> {
        &self.origins
    }

    /// Source that last set `key`.
    ///
    /// `key` may be a leaf (`FIRMWARE_APPS.default`) or anything below one;
    /// the nearest recorded ancestor answers.
    pub fn origin(&self, key: &str) -> Option<&LayerSource> {
        let mut key = key;
        loop {
            if let Some(source) = self.origins.get(key) {
                return Some(source);
            }
            key = key.rsplit_once('.')?.0;
        }
    }

    fn blame<C: DeserializeOwned>(&self, layer: &Layer, err: toml::de::Error) -> ConfError {
        // Only a stack that already converts cleanly can single out a key.
        let key = if self.sources.is_empty() {
            None
        } else {
            layer
                .table
                .iter()
                .find(|(key, value)| {
                    let mut single = Table::new();
                    single.insert((*key).clone(), (*value).clone());
                    let mut candidate = self.table.clone();
                    merge_tables(&mut candidate, single);
                    to_typed::<C>(&candidate).is_err()
                })
                .map(|(key, _)| key.clone())
        };

        ConfError::Invalid {
            layer: layer.source.clone(),
            line: key.as_deref().and_then(|k| layer.line_of(k)),
            key,
            message: err.message().trim().to_string(),
        }
    }
}

fn to_typed<C: DeserializeOwned>(table: &Table) -> std::result::Result<C, toml::de::Error> {
    Value::Table(table.clone()).try_into()
}
