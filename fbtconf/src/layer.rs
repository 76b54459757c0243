use std::{
    fmt::{self, Display},
    fs,
    path::{Path, PathBuf},
};

use serde::Serialize;
use serde_json::error::Category;
use toml::{Table, Value};

use crate::error::{ConfError, Result};

/// Where a layer came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LayerSource {
    /// Values compiled into the tool.
    Defaults,
    /// A configuration file on disk.
    File(PathBuf),
}

impl Display for LayerSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LayerSource::Defaults => write!(f, "<built-in defaults>"),
            LayerSource::File(path) => write!(f, "{}", path.display()),
        }
    }
}

/// One configuration source: a table of top-level assignments.
#[derive(Debug, Clone)]
pub struct Layer {
    /// Where the assignments came from.
    pub source: LayerSource,
    /// The assignments, keyed by setting name.
    pub table: Table,
    text: Option<String>,
}

impl Layer {
    /// Build a layer from in-memory assignments.
    pub fn new(source: LayerSource, table: Table) -> Self {
        Self {
            source,
            table,
            text: None,
        }
    }

    /// Build the defaults layer from any serializable value.
    ///
    /// The value must serialize to a table (a struct or a map).
    pub fn from_serialize<T: Serialize>(value: &T) -> Result<Self> {
        let table = Table::try_from(value)?;
        Ok(Self::new(LayerSource::Defaults, table))
    }

    /// Parse layer text in the format named by `ext` (`toml` or `json`).
    ///
    /// Whitespace-only text is an empty layer.
    pub fn parse(content: &str, source: LayerSource, ext: &str) -> Result<Self> {
        if content.trim().is_empty() {
            return Ok(Self {
                source,
                table: Table::new(),
                text: Some(content.to_string()),
            });
        }

        let table = match ext {
            "toml" | "tml" => toml::from_str::<Table>(content).map_err(|e| {
                let (line, column) = e
                    .span()
                    .map(|span| line_column(content, span.start))
                    .unwrap_or((1, 1));
                ConfError::Syntax {
                    layer: source.clone(),
                    line,
                    column,
                    message: e.message().trim().to_string(),
                }
            })?,
            "json" => serde_json::from_str::<Table>(content).map_err(|e| {
                let message = e.to_string();
                let message = match message.rsplit_once(" at line ") {
                    Some((m, _)) => m.to_string(),
                    None => message,
                };
                match e.classify() {
                    Category::Data => ConfError::Invalid {
                        layer: source.clone(),
                        key: None,
                        line: Some(e.line()),
                        message,
                    },
                    _ => ConfError::Syntax {
                        layer: source.clone(),
                        line: e.line(),
                        column: e.column(),
                        message,
                    },
                }
            })?,
            _ => {
                return Err(ConfError::UnsupportedExtension {
                    layer: source,
                    ext: ext.to_string(),
                });
            }
        };

        Ok(Self {
            source,
            table,
            text: Some(content.to_string()),
        })
    }

    /// Read and parse a layer file; the format follows the file extension.
    pub fn read(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let ext = path
            .extension()
            .and_then(|s| s.to_str())
            .unwrap_or("")
            .to_ascii_lowercase();
        Self::parse(&content, LayerSource::File(path.to_path_buf()), &ext)
    }

    /// Like [`Layer::read`], but a missing file is `Ok(None)`.
    pub fn read_optional(path: impl AsRef<Path>) -> Result<Option<Self>> {
        let path = path.as_ref();
        if !path.exists() {
            debug!("no layer at {}, skipping", path.display());
            return Ok(None);
        }
        Self::read(path).map(Some)
    }

    /// Expand `${env:NAME}` placeholders in every string value.
    pub fn expand_env(mut self) -> Self {
        crate::env::expand_table(&mut self.table);
        self
    }

    /// Best-effort 1-based line on which `key` is assigned in the layer text.
    ///
    /// Recognizes `KEY = ...`, dotted `KEY.sub = ...`, `[KEY]`/`[KEY.sub]`
    /// headers and JSON `"KEY":`.
    pub fn line_of(&self, key: &str) -> Option<usize> {
        let text = self.text.as_ref()?;
        let quoted = format!("\"{key}\"");
        text.lines().position(|line| {
            let line = line.trim_start();
            let header = line.trim_start_matches('[').trim_start();
            [line, header, line.trim_start_matches('{').trim_start()]
                .iter()
                .any(|l| assigns(l, key) || assigns(l, &quoted))
        })
        .map(|idx| idx + 1)
    }

    /// Top-level value for `key`.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.table.get(key)
    }

    /// Whether the layer assigns nothing.
    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}

fn assigns(line: &str, key: &str) -> bool {
    match line.strip_prefix(key) {
        Some(rest) => {
            let rest = rest.trim_start();
            rest.starts_with(['=', '.', ']', ':'])
        }
        None => false,
    }
}

fn line_column(content: &str, offset: usize) -> (usize, usize) {
    let offset = offset.min(content.len());
    let before = &content[..offset];
    let line = before.matches('\n').count() + 1;
    let column = match before.rfind('\n') {
        Some(nl) => before[nl + 1..].chars().count() + 1,
        None => before.chars().count() + 1,
    };
    (line, column)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(name: &str) -> LayerSource {
        LayerSource::File(PathBuf::from(name))
    }

    #[test]
    fn test_parse_toml_assignments() {
        let layer = Layer::parse(
            "FIRMWARE_APP_SET = \"minimal\"\nLOADER_START_DELAY = 0.5\n\n[FIRMWARE_APPS]\nmine = [\"a\", \"b\"]\n",
            file("local.toml"),
            "toml",
        )
        .unwrap();

        assert_eq!(
            layer.get("FIRMWARE_APP_SET").and_then(Value::as_str),
            Some("minimal")
        );
        assert_eq!(
            layer.get("LOADER_START_DELAY").and_then(Value::as_float),
            Some(0.5)
        );
        let apps = layer.get("FIRMWARE_APPS").and_then(Value::as_table).unwrap();
        assert_eq!(apps["mine"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn test_parse_json_assignments() {
        let layer = Layer::parse(
            r#"{ "TARGET_HW": 18, "FIRMWARE_APPS": { "mine": ["x"] } }"#,
            file("local.json"),
            "json",
        )
        .unwrap();
        assert_eq!(layer.get("TARGET_HW").and_then(Value::as_integer), Some(18));
    }

    #[test]
    fn test_empty_text_is_empty_layer() {
        let layer = Layer::parse("  \n", file("local.json"), "json").unwrap();
        assert!(layer.is_empty());
    }

    #[test]
    fn test_syntax_error_location() {
        let err = Layer::parse(
            "TARGET_HW = 7\nFIRMWARE_APP_SET \"minimal\"\nDEBUG = 1\n",
            file("fbt_options_local.toml"),
            "toml",
        )
        .unwrap_err();
        match err {
            ConfError::Syntax { layer, line, .. } => {
                assert_eq!(layer, file("fbt_options_local.toml"));
                assert_eq!(line, 2);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_json_syntax_error_location() {
        let err = Layer::parse("{\n  \"A\": 1,\n  oops\n}", file("l.json"), "json").unwrap_err();
        match err {
            ConfError::Syntax { line, message, .. } => {
                assert_eq!(line, 3);
                assert!(!message.contains(" at line "));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_json_top_level_must_be_object() {
        let err = Layer::parse("[1, 2]", file("l.json"), "json").unwrap_err();
        assert!(matches!(err, ConfError::Invalid { .. }));
    }

    #[test]
    fn test_json_null_is_invalid_value_not_syntax() {
        let err = Layer::parse(
            "{\n  \"TARGET_HW\": 7,\n  \"LOADER_START_DELAY\": null\n}",
            file("l.json"),
            "json",
        )
        .unwrap_err();
        match &err {
            ConfError::Invalid { layer, line, .. } => {
                assert_eq!(layer, &file("l.json"));
                assert_eq!(*line, Some(3));
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(!err.to_string().contains("syntax error"));
    }

    #[test]
    fn test_unsupported_extension() {
        let err = Layer::parse("X = 1", file("local.py"), "py").unwrap_err();
        assert!(matches!(err, ConfError::UnsupportedExtension { ext, .. } if ext == "py"));
    }

    #[test]
    fn test_read_optional_missing() {
        let dir = tempfile::tempdir().unwrap();
        let layer = Layer::read_optional(dir.path().join("absent.toml")).unwrap();
        assert!(layer.is_none());
    }

    #[test]
    fn test_read_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("local.TOML");
        fs::write(&path, "COMPACT = 1\n").unwrap();
        let layer = Layer::read(&path).unwrap();
        assert_eq!(layer.source, LayerSource::File(path));
        assert_eq!(layer.get("COMPACT").and_then(Value::as_integer), Some(1));
    }

    #[test]
    fn test_line_of() {
        let layer = Layer::parse(
            "# local\nTARGET_HW = 18\nFIRMWARE_APPS.extra = []\n\n[other]\nx = 1\n",
            file("l.toml"),
            "toml",
        )
        .unwrap();
        assert_eq!(layer.line_of("TARGET_HW"), Some(2));
        assert_eq!(layer.line_of("FIRMWARE_APPS"), Some(3));
        assert_eq!(layer.line_of("other"), Some(5));
        assert_eq!(layer.line_of("missing"), None);
    }

    #[test]
    fn test_from_serialize() {
        #[derive(Serialize)]
        struct Defaults {
            #[serde(rename = "TARGET_HW")]
            target_hw: u32,
        }
        let layer = Layer::from_serialize(&Defaults { target_hw: 7 }).unwrap();
        assert_eq!(layer.source, LayerSource::Defaults);
        assert_eq!(layer.get("TARGET_HW").and_then(Value::as_integer), Some(7));
    }

    #[test]
    fn test_source_display() {
        assert_eq!(LayerSource::Defaults.to_string(), "<built-in defaults>");
        assert_eq!(file("a/b.toml").to_string(), "a/b.toml");
    }
}
