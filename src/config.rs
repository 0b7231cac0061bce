use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use tracing::debug;

use crate::error::SqlembedError;
use crate::mode::Mode;

const CONFIG_FILE: &str = "sqlembed.toml";

const KNOWN_KEYS: &[&str] = &[
    "line_length",
    "indent_width",
    "dialect",
    "keyword_case",
    "comma_position",
    "group_by_single_line",
    "align_aliases",
    "multi_statement",
    "max_inline_columns",
    "condition_width",
    "name_keywords",
    "statement_keywords",
    "structural_keywords",
    "extra_keywords",
    "exclude",
];

/// Load configuration from `sqlembed.toml` or the `[tool.sqlembed]` table of
/// a `pyproject.toml`. Searches parent directories of the inputs when no
/// config path is given, then the user config directory.
pub fn load_config(files: &[PathBuf], config_path: Option<&Path>) -> Result<Mode, SqlembedError> {
    let mut mode = Mode::default();

    let config_file = match config_path {
        Some(path) => {
            if path.exists() {
                Some(path.to_path_buf())
            } else {
                return Err(SqlembedError::Config(format!(
                    "Config file not found: {}",
                    path.display()
                )));
            }
        }
        None => find_config_file(files).or_else(user_config_file),
    };

    if let Some(path) = config_file {
        debug!(path = %path.display(), "loading config");
        let raw = load_config_from_path(&path)?;
        apply_config(&mut mode, &raw)?;
    }

    Ok(mode)
}

/// Search the common parent directories of the inputs. A `sqlembed.toml`
/// wins over a `pyproject.toml` in the same directory; a `pyproject.toml`
/// only counts when it has a `[tool.sqlembed]` table.
fn find_config_file(files: &[PathBuf]) -> Option<PathBuf> {
    for parent in get_common_parents(files) {
        let config = parent.join(CONFIG_FILE);
        if config.is_file() {
            return Some(config);
        }
        let config = parent.join("pyproject.toml");
        if config.is_file() && has_tool_section(&config) {
            return Some(config);
        }
    }
    None
}

fn user_config_file() -> Option<PathBuf> {
    let path = dirs::config_dir()?.join("sqlembed").join(CONFIG_FILE);
    path.is_file().then_some(path)
}

fn has_tool_section(path: &Path) -> bool {
    std::fs::read_to_string(path)
        .ok()
        .and_then(|content| content.parse::<toml::Table>().ok())
        .is_some_and(|table| table.get("tool").and_then(|t| t.get("sqlembed")).is_some())
}

/// Get the common parent directories of the given file paths, ordered
/// from most specific to least specific.
fn get_common_parents(files: &[PathBuf]) -> Vec<PathBuf> {
    let mut parents = Vec::new();

    for file in files {
        let parent = if file.is_dir() {
            file.clone()
        } else {
            match file.parent() {
                Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
                _ => PathBuf::from("."),
            }
        };
        let parent = parent.canonicalize().unwrap_or(parent);

        // Walk up to root
        let mut current = Some(parent.as_path());
        while let Some(dir) = current {
            let dir_buf = dir.to_path_buf();
            if !parents.contains(&dir_buf) {
                parents.push(dir_buf);
            }
            current = dir.parent();
        }
    }

    parents
}

/// Load and parse a TOML config file.
fn load_config_from_path(path: &Path) -> Result<HashMap<String, toml::Value>, SqlembedError> {
    let content = std::fs::read_to_string(path)?;
    let parsed: toml::Table = content.parse()?;

    let is_pyproject = path.file_name().is_some_and(|n| n == "pyproject.toml");
    let section = if is_pyproject {
        parsed.get("tool").and_then(|t| t.get("sqlembed")).cloned()
    } else {
        Some(toml::Value::Table(parsed))
    };

    match section {
        Some(toml::Value::Table(table)) => Ok(table
            .into_iter()
            .map(|(k, v)| (k.to_lowercase(), v))
            .collect()),
        Some(_) => Err(SqlembedError::Config(format!(
            "[tool.sqlembed] in {} must be a table",
            path.display()
        ))),
        None => Ok(HashMap::new()),
    }
}

fn value<T: DeserializeOwned>(
    config: &HashMap<String, toml::Value>,
    key: &str,
) -> Result<Option<T>, SqlembedError> {
    config
        .get(key)
        .map(|v| {
            v.clone()
                .try_into()
                .map_err(|e| SqlembedError::Config(format!("Invalid value for {}: {}", key, e)))
        })
        .transpose()
}

/// Apply configuration values to a Mode.
fn apply_config(mode: &mut Mode, config: &HashMap<String, toml::Value>) -> Result<(), SqlembedError> {
    // Validate no unknown keys
    for key in config.keys() {
        if !KNOWN_KEYS.contains(&key.as_str()) {
            return Err(SqlembedError::Config(format!(
                "Unknown config option: {}",
                key
            )));
        }
    }

    macro_rules! set {
        ($field:ident, $key:literal) => {
            if let Some(v) = value(config, $key)? {
                mode.$field = v;
            }
        };
    }

    set!(line_length, "line_length");
    set!(indent_width, "indent_width");
    set!(dialect_name, "dialect");
    set!(keyword_case, "keyword_case");
    set!(comma_position, "comma_position");
    set!(group_by_single_line, "group_by_single_line");
    set!(align_aliases, "align_aliases");
    set!(multi_statement, "multi_statement");
    set!(max_inline_columns, "max_inline_columns");
    set!(condition_width, "condition_width");
    set!(name_keywords, "name_keywords");
    set!(statement_keywords, "statement_keywords");
    set!(structural_keywords, "structural_keywords");
    set!(extra_keywords, "extra_keywords");
    set!(exclude, "exclude");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mode::{CommaPosition, KeywordCase};

    fn config_of(pairs: &[(&str, toml::Value)]) -> HashMap<String, toml::Value> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_apply_config() {
        let mut mode = Mode::default();
        let config = config_of(&[
            ("line_length", toml::Value::Integer(120)),
            ("dialect", toml::Value::String("postgres".to_string())),
            ("keyword_case", toml::Value::String("lower".to_string())),
            ("comma_position", toml::Value::String("start".to_string())),
            ("align_aliases", toml::Value::Boolean(true)),
            (
                "name_keywords",
                toml::Value::Array(vec!["sql".into(), "query".into()]),
            ),
        ]);

        apply_config(&mut mode, &config).unwrap();
        assert_eq!(mode.line_length, 120);
        assert_eq!(mode.dialect_name, "postgres");
        assert_eq!(mode.keyword_case, KeywordCase::Lower);
        assert_eq!(mode.comma_position, CommaPosition::Start);
        assert!(mode.align_aliases);
        assert_eq!(mode.name_keywords, vec!["sql", "query"]);
    }

    #[test]
    fn test_unknown_config_key_error() {
        let mut mode = Mode::default();
        let config = config_of(&[("unknown_option", toml::Value::Boolean(true))]);
        assert!(apply_config(&mut mode, &config).is_err());
    }

    #[test]
    fn test_invalid_value_error() {
        let mut mode = Mode::default();
        let config = config_of(&[("keyword_case", toml::Value::String("shouty".to_string()))]);
        let err = apply_config(&mut mode, &config).unwrap_err();
        assert!(err.to_string().contains("keyword_case"));

        let config = config_of(&[("line_length", toml::Value::String("wide".to_string()))]);
        assert!(apply_config(&mut mode, &config).is_err());
    }

    #[test]
    fn test_load_sqlembed_toml() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("sqlembed.toml"),
            "line_length = 60\nmulti_statement = \"first\"\n",
        )
        .unwrap();
        let file = dir.path().join("app.py");
        std::fs::write(&file, "").unwrap();

        let mode = load_config(&[file], None).unwrap();
        assert_eq!(mode.line_length, 60);
        assert_eq!(mode.multi_statement, crate::mode::MultiStatement::First);
    }

    #[test]
    fn test_load_pyproject_section() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pyproject.toml");
        std::fs::write(
            &path,
            "[project]\nname = \"demo\"\n\n[tool.sqlembed]\ngroup_by_single_line = true\n",
        )
        .unwrap();

        let mode = load_config(&[], Some(&path)).unwrap();
        assert!(mode.group_by_single_line);
    }

    #[test]
    fn test_missing_explicit_config() {
        let err = load_config(&[], Some(Path::new("/nonexistent/sqlembed.toml")));
        assert!(matches!(err, Err(SqlembedError::Config(_))));
    }
}
