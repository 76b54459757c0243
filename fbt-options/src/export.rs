//! Rendering options for the build tool.
//!
//! The build tool takes its options as `NAME=value` command-line
//! assignments. [`build_args`] produces those; [`to_toml`] and [`to_json`]
//! render the whole resolved configuration.

use std::collections::BTreeMap;

use serde::ser::Error as _;
use toml::Value;

use crate::{OptionsError, options::FbtOptions};

/// `NAME=value` assignments for every setting, sorted by name.
///
/// Flags render as `0`/`1`, the active application set as its
/// comma-separated groups under `FIRMWARE_APPS`, and unset optional settings
/// are left out.
///
/// # Errors
///
/// Returns [`OptionsError::UnknownProfile`] when the selected application
/// set does not exist and [`OptionsError::InvalidDelay`] when the start delay
/// is not a number of seconds.
pub fn build_args(options: &FbtOptions) -> Result<Vec<String>, OptionsError> {
    let mut vars = BTreeMap::new();

    vars.insert("FIRMWARE_ORIGIN", options.firmware_origin.clone());
    vars.insert("TARGET_HW", options.target_hw.to_string());
    vars.insert("COMPACT", flag(options.compact));
    vars.insert("DEBUG", flag(options.debug));
    if let Some(name) = options.autostart() {
        vars.insert("LOADER_AUTOSTART", name.to_string());
    }
    if let Some(delay) = options.checked_start_delay()? {
        vars.insert("LOADER_START_DELAY", delay.as_secs_f64().to_string());
    }
    vars.insert("COPRO_STACK_BIN", options.copro_stack_bin.clone());
    vars.insert("COPRO_STACK_TYPE", options.copro_stack_type.clone());
    vars.insert("FIRMWARE_APP_SET", options.firmware_app_set.clone());
    vars.insert("FIRMWARE_APPS", options.active_profile()?.join(","));

    for (key, value) in &options.extra {
        vars.insert(key.as_str(), render_extra(value));
    }

    Ok(vars
        .into_iter()
        .map(|(key, value)| format!("{key}={value}"))
        .collect())
}

/// The resolved options as an options file.
pub fn to_toml(options: &FbtOptions) -> Result<String, toml::ser::Error> {
    toml::to_string_pretty(options)
}

/// The resolved options as pretty JSON.
///
/// Fails on a start delay JSON cannot represent instead of writing `null`.
/// Datetime settings are written as strings.
pub fn to_json(options: &FbtOptions) -> serde_json::Result<String> {
    options
        .checked_start_delay()
        .map_err(serde_json::Error::custom)?;

    let mut value = serde_json::to_value(options)?;
    if let Some(object) = value.as_object_mut() {
        for (key, extra) in &options.extra {
            object.insert(key.clone(), json_value(extra));
        }
    }
    serde_json::to_string_pretty(&value)
}

fn flag(on: bool) -> String {
    u8::from(on).to_string()
}

fn render_extra(value: &Value) -> String {
    match value {
        Value::Boolean(b) => flag(*b),
        Value::Integer(i) => i.to_string(),
        Value::Float(f) => f.to_string(),
        Value::String(s) => s.clone(),
        Value::Datetime(dt) => dt.to_string(),
        Value::Array(items) => items
            .iter()
            .map(render_extra)
            .collect::<Vec<_>>()
            .join(","),
        Value::Table(_) => json_value(value).to_string(),
    }
}

fn json_value(value: &Value) -> serde_json::Value {
    match value {
        Value::Boolean(b) => serde_json::Value::Bool(*b),
        Value::Integer(i) => serde_json::Value::from(*i),
        Value::Float(f) => serde_json::Number::from_f64(*f)
            .map(serde_json::Value::Number)
            .unwrap_or_else(|| serde_json::Value::String(f.to_string())),
        Value::String(s) => serde_json::Value::String(s.clone()),
        Value::Datetime(dt) => serde_json::Value::String(dt.to_string()),
        Value::Array(items) => items.iter().map(json_value).collect(),
        Value::Table(table) => table
            .iter()
            .map(|(k, v)| (k.clone(), json_value(v)))
            .collect(),
    }
}
