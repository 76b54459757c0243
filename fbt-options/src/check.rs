//! Consistency checks.
//!
//! Loading accepts any well-typed options. Whether the selected application
//! set exists, or whether the autostart application is a real application,
//! is decided here, after loading, where the manifests are available too.

use std::{collections::BTreeSet, fmt};

use colored::Colorize;
use serde::Serialize;

use crate::{
    manifest::{AppManifest, find_by_name},
    options::FbtOptions,
};

/// Hardware targets the build tool has support packages for.
pub const KNOWN_TARGETS: &[u32] = &[7, 18];

/// How bad a finding is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Builds, but probably not what was meant.
    Warning,
    /// The build tool will reject or misbuild this configuration.
    Error,
}

/// One finding about a setting.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Diagnostic {
    /// Severity of the finding.
    pub severity: Severity,
    /// Setting the finding is about.
    pub key: String,
    /// Human readable description.
    pub message: String,
}

impl Diagnostic {
    fn error(key: &str, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            key: key.to_string(),
            message: message.into(),
        }
    }

    fn warning(key: &str, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            key: key.to_string(),
            message: message.into(),
        }
    }

    /// Whether this finding should fail the check.
    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self.severity {
            Severity::Error => "error".red().bold(),
            Severity::Warning => "warning".yellow().bold(),
        };
        write!(f, "{label}: {}: {}", self.key.bold(), self.message)
    }
}

/// Check `options`, cross-checking the autostart name against `manifests`
/// when they were scanned.
pub fn check_options(options: &FbtOptions, manifests: Option<&[AppManifest]>) -> Vec<Diagnostic> {
    let mut diags = Vec::new();

    check_profiles(options, &mut diags);
    check_autostart(options, manifests, &mut diags);
    check_build_flags(options, &mut diags);

    diags.sort_by(|a, b| b.severity.cmp(&a.severity));
    diags
}

/// Whether any finding is an error.
pub fn has_errors(diags: &[Diagnostic]) -> bool {
    diags.iter().any(Diagnostic::is_error)
}

fn check_profiles(options: &FbtOptions, diags: &mut Vec<Diagnostic>) {
    if let Err(e) = options.active_profile() {
        diags.push(Diagnostic::error("FIRMWARE_APP_SET", e.to_string()));
    }

    for (name, groups) in &options.firmware_apps {
        let key = format!("FIRMWARE_APPS.{name}");
        if groups.is_empty() {
            diags.push(Diagnostic::warning(&key, "application set is empty"));
            continue;
        }
        let mut seen = BTreeSet::new();
        for group in groups {
            if !seen.insert(group.as_str()) {
                diags.push(Diagnostic::warning(
                    &key,
                    format!("`{group}` is listed more than once"),
                ));
            }
        }
    }
}

fn check_autostart(
    options: &FbtOptions,
    manifests: Option<&[AppManifest]>,
    diags: &mut Vec<Diagnostic>,
) {
    if let Some(delay) = options.loader_start_delay {
        if options.checked_start_delay().is_err() {
            diags.push(Diagnostic::error(
                "LOADER_START_DELAY",
                format!("{delay} is not a valid number of seconds"),
            ));
        }
        if options.autostart().is_none() {
            diags.push(Diagnostic::warning(
                "LOADER_START_DELAY",
                "set without LOADER_AUTOSTART, it has no effect",
            ));
        }
    }

    let (Some(name), Some(apps)) = (options.autostart(), manifests) else {
        return;
    };
    if find_by_name(apps, name).is_some() {
        return;
    }

    let mut message = format!("no application is named `{name}`");
    if let Some(app) = apps.iter().find(|app| {
        app.appid == name
            || app
                .name
                .as_deref()
                .is_some_and(|n| n.eq_ignore_ascii_case(name))
    }) {
        message += &format!(
            "; did you mean `{}` ({})?",
            app.name.as_deref().unwrap_or(&app.appid),
            app.path.display()
        );
    }
    diags.push(Diagnostic::error("LOADER_AUTOSTART", message));
}

fn check_build_flags(options: &FbtOptions, diags: &mut Vec<Diagnostic>) {
    if !KNOWN_TARGETS.contains(&options.target_hw) {
        diags.push(Diagnostic::warning(
            "TARGET_HW",
            format!("unknown hardware target {}", options.target_hw),
        ));
    }
    if options.compact && options.debug {
        diags.push(Diagnostic::warning(
            "COMPACT",
            "COMPACT and DEBUG are both enabled",
        ));
    }
    if !options.copro_stack_bin.ends_with(".bin") {
        diags.push(Diagnostic::warning(
            "COPRO_STACK_BIN",
            format!("`{}` does not look like a .bin image", options.copro_stack_bin),
        ));
    }
}
