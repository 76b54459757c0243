//! Firmware build options.
//!
//! This module defines the settings the firmware build tool reads, with the
//! values a fresh checkout starts from. Option files use the same upper-case
//! names:
//!
//! ```toml
//! FIRMWARE_ORIGIN = "NaTo1000-Custom"
//! TARGET_HW = 7
//! COMPACT = 0
//! DEBUG = 1
//! LOADER_AUTOSTART = "Autostart Test"
//! COPRO_STACK_BIN = "stm32wb5x_BLE_Stack_light_fw.bin"
//! COPRO_STACK_TYPE = "ble_light"
//! FIRMWARE_APP_SET = "default"
//!
//! [FIRMWARE_APPS]
//! default = ["basic_services", "main_apps", "system_apps", "settings_apps"]
//! minimal = ["basic_services", "updater_app", "archive"]
//! ```

use std::{collections::BTreeMap, time::Duration};

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::OptionsError;

/// Name of the profile selected when nothing overrides it.
pub const DEFAULT_APP_SET: &str = "default";

/// Resolved firmware build options.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct FbtOptions {
    /// Custom origin string the firmware is tagged with.
    pub firmware_origin: String,
    /// Target hardware revision (7 for f7, 18 for f18).
    pub target_hw: u32,
    /// Optimize for size.
    #[serde(serialize_with = "flag::serialize", deserialize_with = "flag::deserialize")]
    #[schemars(with = "u8")]
    pub compact: bool,
    /// Optimize for debugging experience.
    #[serde(serialize_with = "flag::serialize", deserialize_with = "flag::deserialize")]
    #[schemars(with = "u8")]
    pub debug: bool,
    /// Application started on boot; must equal a manifest's `name`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub loader_autostart: Option<String>,
    /// Seconds to wait before launching the autostart application.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub loader_start_delay: Option<f64>,
    /// Prebuilt radio stack image to flash.
    pub copro_stack_bin: String,
    /// Radio stack variant.
    pub copro_stack_type: String,
    /// Named application sets: profile name to ordered application groups.
    pub firmware_apps: BTreeMap<String, Vec<String>>,
    /// Which application set is built.
    pub firmware_app_set: String,
    /// Settings the build tool understands that have no dedicated field.
    #[serde(flatten)]
    #[schemars(with = "BTreeMap<String, serde_json::Value>")]
    pub extra: BTreeMap<String, toml::Value>,
}

impl Default for FbtOptions {
    fn default() -> Self {
        Self {
            firmware_origin: "NaTo1000-Custom".to_string(),
            target_hw: 7,
            compact: false,
            debug: true,
            loader_autostart: Some("Autostart Test".to_string()),
            loader_start_delay: None,
            copro_stack_bin: "stm32wb5x_BLE_Stack_light_fw.bin".to_string(),
            copro_stack_type: "ble_light".to_string(),
            firmware_apps: BTreeMap::from([
                (
                    DEFAULT_APP_SET.to_string(),
                    strings(&["basic_services", "main_apps", "system_apps", "settings_apps"]),
                ),
                (
                    "minimal".to_string(),
                    strings(&["basic_services", "updater_app", "archive"]),
                ),
            ]),
            firmware_app_set: DEFAULT_APP_SET.to_string(),
            extra: BTreeMap::new(),
        }
    }
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

impl FbtOptions {
    /// Application groups of the selected profile, in build order.
    ///
    /// # Errors
    ///
    /// Returns [`OptionsError::UnknownProfile`] when `FIRMWARE_APP_SET` names
    /// no entry of `FIRMWARE_APPS`.
    pub fn active_profile(&self) -> Result<&[String], OptionsError> {
        self.profile(&self.firmware_app_set)
    }

    /// Application groups of the profile `name`.
    pub fn profile(&self, name: &str) -> Result<&[String], OptionsError> {
        self.firmware_apps
            .get(name)
            .map(Vec::as_slice)
            .ok_or_else(|| OptionsError::UnknownProfile {
                name: name.to_string(),
                available: self.profile_names(),
            })
    }

    /// Profile names, sorted.
    pub fn profile_names(&self) -> Vec<String> {
        self.firmware_apps.keys().cloned().collect()
    }

    /// Autostart application name; an empty string disables autostart.
    pub fn autostart(&self) -> Option<&str> {
        self.loader_autostart
            .as_deref()
            .filter(|name| !name.is_empty())
    }

    /// Autostart delay, when one is set and representable.
    pub fn start_delay(&self) -> Option<Duration> {
        self.loader_start_delay
            .and_then(|secs| Duration::try_from_secs_f64(secs).ok())
    }

    /// Autostart delay, rejecting negative and non-finite values.
    ///
    /// # Errors
    ///
    /// Returns [`OptionsError::InvalidDelay`] when `LOADER_START_DELAY` is
    /// set to something that is not a number of seconds.
    pub fn checked_start_delay(&self) -> Result<Option<Duration>, OptionsError> {
        match self.loader_start_delay {
            None => Ok(None),
            Some(secs) => Duration::try_from_secs_f64(secs)
                .map(Some)
                .map_err(|_| OptionsError::InvalidDelay(secs)),
        }
    }
}

/// Boolean options written the way the build tool expects them: `0`/`1`.
///
/// Reading also accepts `true`/`false`; any non-zero integer is on.
mod flag {
    use serde::{Deserialize, Deserializer, Serializer, de};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Bool(bool),
        Int(i64),
    }

    pub fn serialize<S: Serializer>(value: &bool, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(u8::from(*value))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
        match Raw::deserialize(deserializer) {
            Ok(Raw::Bool(b)) => Ok(b),
            Ok(Raw::Int(i)) => Ok(i != 0),
            Err(_) => Err(de::Error::custom("expected 0, 1, true or false")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_profile() {
        let options = FbtOptions::default();
        assert_eq!(
            options.active_profile().unwrap(),
            ["basic_services", "main_apps", "system_apps", "settings_apps"]
        );
        assert_eq!(options.profile_names(), ["default", "minimal"]);
        assert!(options.loader_start_delay.is_none());
        assert!(options.start_delay().is_none());
    }

    #[test]
    fn test_unknown_profile() {
        let options = FbtOptions {
            firmware_app_set: "full".to_string(),
            ..Default::default()
        };
        match options.active_profile().unwrap_err() {
            OptionsError::UnknownProfile { name, available } => {
                assert_eq!(name, "full");
                assert_eq!(available, ["default", "minimal"]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_flags_serialize_as_integers() {
        let text = toml::to_string(&FbtOptions::default()).unwrap();
        assert!(text.contains("COMPACT = 0"));
        assert!(text.contains("DEBUG = 1"));
        assert!(!text.contains("LOADER_START_DELAY"));
    }

    #[test]
    fn test_flags_accept_bool_and_int() {
        let mut table = toml::Table::try_from(FbtOptions::default()).unwrap();
        table.insert("COMPACT".into(), toml::Value::Boolean(true));
        table.insert("DEBUG".into(), toml::Value::Integer(0));
        let options: FbtOptions = toml::Value::Table(table).try_into().unwrap();
        assert!(options.compact);
        assert!(!options.debug);
    }

    #[test]
    fn test_flag_rejects_string() {
        let mut table = toml::Table::try_from(FbtOptions::default()).unwrap();
        table.insert("COMPACT".into(), toml::Value::String("yes".into()));
        let result: Result<FbtOptions, _> = toml::Value::Table(table).try_into();
        assert!(result.is_err());
    }

    #[test]
    fn test_integer_delay_accepted() {
        let mut table = toml::Table::try_from(FbtOptions::default()).unwrap();
        table.insert("LOADER_START_DELAY".into(), toml::Value::Integer(2));
        let options: FbtOptions = toml::Value::Table(table).try_into().unwrap();
        assert_eq!(options.loader_start_delay, Some(2.0));
        assert_eq!(options.start_delay(), Some(Duration::from_secs(2)));
    }

    #[test]
    fn test_extra_settings_kept() {
        let mut table = toml::Table::try_from(FbtOptions::default()).unwrap();
        table.insert("FBT_NO_SYNC".into(), toml::Value::Integer(3));
        let options: FbtOptions = toml::Value::Table(table).try_into().unwrap();
        assert_eq!(
            options.extra.get("FBT_NO_SYNC"),
            Some(&toml::Value::Integer(3))
        );
    }

    #[test]
    fn test_extra_datetime_survives_round_trip() {
        let text = format!(
            "BUILD_DATE = 2024-01-02\n{}",
            toml::to_string(&FbtOptions::default()).unwrap()
        );
        let options: FbtOptions = toml::from_str(&text).unwrap();
        assert!(matches!(
            options.extra.get("BUILD_DATE"),
            Some(toml::Value::Datetime(_))
        ));

        let written = toml::to_string(&options).unwrap();
        assert!(written.contains("BUILD_DATE = 2024-01-02"), "{written}");
    }

    #[test]
    fn test_checked_start_delay() {
        let mut options = FbtOptions {
            loader_start_delay: Some(0.5),
            ..Default::default()
        };
        assert_eq!(
            options.checked_start_delay().unwrap(),
            Some(Duration::from_millis(500))
        );

        for bad in [f64::NAN, -1.0, f64::INFINITY] {
            options.loader_start_delay = Some(bad);
            assert!(matches!(
                options.checked_start_delay(),
                Err(OptionsError::InvalidDelay(_))
            ));
            assert!(options.start_delay().is_none());
        }
    }

    #[test]
    fn test_sample_file_matches_defaults() {
        let sample: FbtOptions = toml::from_str(include_str!("../fbt_options.toml")).unwrap();
        assert_eq!(sample, FbtOptions::default());
    }
}
