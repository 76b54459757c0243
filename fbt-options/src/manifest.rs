//! Application manifest scanning.
//!
//! Every application directory carries an `application.fam` declaring one or
//! more `App(...)` entries:
//!
//! ```text
//! App(
//!     appid="autostart_test",
//!     name="Autostart Test",
//!     apptype=FlipperAppType.EXTERNAL,
//!     entry_point="autostart_test_app",
//! )
//! ```
//!
//! Only the keyword arguments needed to cross-check options are extracted;
//! the file is never evaluated.

use std::{
    fs,
    path::{Path, PathBuf},
    sync::LazyLock,
};

use regex::Regex;
use serde::Serialize;

use crate::OptionsError;

/// Manifest file name inside an application directory.
pub const MANIFEST_FILE: &str = "application.fam";

static APP_START: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bApp\s*\(").expect("valid App( pattern"));

static KEYWORD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"\b(appid|name|apptype|entry_point)\s*=\s*(?:"([^"]*)"|'([^']*)'|([A-Za-z_][\w.]*))"#)
        .expect("valid keyword pattern")
});

/// One `App(...)` declaration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AppManifest {
    /// Unique application id.
    pub appid: String,
    /// Display name; what `LOADER_AUTOSTART` has to match.
    pub name: Option<String>,
    /// Application type, e.g. `FlipperAppType.EXTERNAL`.
    pub apptype: Option<String>,
    /// Entry point symbol.
    pub entry_point: Option<String>,
    /// File the declaration was read from.
    pub path: PathBuf,
}

/// Extract the `App(...)` declarations of one manifest file.
///
/// Declarations without an `appid` are skipped.
pub fn parse_manifest(content: &str, path: &Path) -> Vec<AppManifest> {
    let content: String = content
        .lines()
        .map(strip_comment)
        .collect::<Vec<_>>()
        .join("\n");

    let starts: Vec<usize> = APP_START.find_iter(&content).map(|m| m.end()).collect();
    let mut apps = Vec::new();

    for (i, &start) in starts.iter().enumerate() {
        let end = starts
            .get(i + 1)
            .copied()
            .unwrap_or(content.len());
        let body = &content[start..end];

        let mut appid = None;
        let mut name = None;
        let mut apptype = None;
        let mut entry_point = None;

        for cap in KEYWORD.captures_iter(body) {
            let value = cap
                .get(2)
                .or_else(|| cap.get(3))
                .or_else(|| cap.get(4))
                .map(|m| m.as_str().to_string());
            let slot = match &cap[1] {
                "appid" => &mut appid,
                "name" => &mut name,
                "apptype" => &mut apptype,
                _ => &mut entry_point,
            };
            if slot.is_none() {
                *slot = value;
            }
        }

        match appid {
            Some(appid) => apps.push(AppManifest {
                appid,
                name,
                apptype,
                entry_point,
                path: path.to_path_buf(),
            }),
            None => warn!("{}: App() without appid, skipping", path.display()),
        }
    }

    apps
}

/// `line` up to its first `#` outside a string literal.
fn strip_comment(line: &str) -> &str {
    let mut quote = None;
    let mut escaped = false;
    for (i, ch) in line.char_indices() {
        match quote {
            Some(_) if escaped => escaped = false,
            Some(_) if ch == '\\' => escaped = true,
            Some(q) if ch == q => quote = None,
            Some(_) => {}
            None if ch == '"' || ch == '\'' => quote = Some(ch),
            None if ch == '#' => return &line[..i],
            None => {}
        }
    }
    line
}

/// Collect manifests from `dirs`.
///
/// Each directory may hold a manifest itself and/or one application per
/// subdirectory (`<dir>/<app>/application.fam`). Results are sorted by
/// `appid`.
///
/// # Errors
///
/// Returns an error if a directory or manifest cannot be read.
pub fn scan_manifests<P: AsRef<Path>>(dirs: &[P]) -> Result<Vec<AppManifest>, OptionsError> {
    let mut apps = Vec::new();

    for dir in dirs {
        let dir = dir.as_ref();
        let mut files = vec![dir.join(MANIFEST_FILE)];

        let entries = fs::read_dir(dir).map_err(|source| OptionsError::Manifest {
            path: dir.to_path_buf(),
            source,
        })?;
        for entry in entries {
            let entry = entry.map_err(|source| OptionsError::Manifest {
                path: dir.to_path_buf(),
                source,
            })?;
            if entry.path().is_dir() {
                files.push(entry.path().join(MANIFEST_FILE));
            }
        }

        for file in files.into_iter().filter(|f| f.is_file()) {
            let content = fs::read_to_string(&file).map_err(|source| OptionsError::Manifest {
                path: file.clone(),
                source,
            })?;
            let found = parse_manifest(&content, &file);
            debug!("{}: {} app(s)", file.display(), found.len());
            apps.extend(found);
        }
    }

    apps.sort_by(|a, b| a.appid.cmp(&b.appid));
    Ok(apps)
}

/// Manifest whose display name is exactly `name`.
pub fn find_by_name<'a>(apps: &'a [AppManifest], name: &str) -> Option<&'a AppManifest> {
    apps.iter().find(|app| app.name.as_deref() == Some(name))
}
