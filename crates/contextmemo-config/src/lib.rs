use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Characters of context stored either side of a selection
pub const DEFAULT_CONTEXT_CHARS: usize = 30;
/// Consecutive text nodes a single match may span
pub const DEFAULT_MAX_WINDOW_UNITS: usize = 40;

const DEFAULT_NOTES_PATH: &str = "~/.local/share/contextmemo/notes.json";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {config_path}: {source}")]
    ConfigReadError {
        config_path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file at {config_path}: {source}")]
    ConfigParseError {
        config_path: PathBuf,
        source: toml::de::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// JSON file holding saved notes
    #[serde(default = "default_notes_path")]
    pub notes_path: PathBuf,
    #[serde(default)]
    pub anchoring: AnchoringConfig,
}

/// Tuning for anchor creation and re-resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnchoringConfig {
    pub context_chars: usize,
    pub max_window_units: usize,
}

impl Default for AnchoringConfig {
    fn default() -> Self {
        Self {
            context_chars: DEFAULT_CONTEXT_CHARS,
            max_window_units: DEFAULT_MAX_WINDOW_UNITS,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            notes_path: default_notes_path(),
            anchoring: AnchoringConfig::default(),
        }
    }
}

fn default_notes_path() -> PathBuf {
    PathBuf::from(shellexpand::tilde(DEFAULT_NOTES_PATH).as_ref())
}

impl Config {
    pub fn load_from_path<P: AsRef<Path>>(config_path: P) -> Result<Option<Self>, ConfigError> {
        let config_path = config_path.as_ref();
        if !config_path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(config_path).map_err(|source| {
            ConfigError::ConfigReadError {
                config_path: config_path.to_path_buf(),
                source,
            }
        })?;

        let mut config: Config =
            toml::from_str(&content).map_err(|source| ConfigError::ConfigParseError {
                config_path: config_path.to_path_buf(),
                source,
            })?;

        // Expand shell variables and tilde in the loaded notes path
        config.notes_path = Self::expand_path(&config.notes_path).unwrap_or(config.notes_path);

        Ok(Some(config))
    }

    pub fn load() -> Result<Option<Self>, ConfigError> {
        let config_path = Self::config_path();
        Self::load_from_path(&config_path)
    }

    /// Like [`Config::load_from_path`], but a missing file gives the defaults.
    pub fn load_or_default<P: AsRef<Path>>(config_path: P) -> Result<Self, ConfigError> {
        Ok(Self::load_from_path(config_path)?.unwrap_or_default())
    }

    pub fn save_to_path<P: AsRef<Path>>(&self, config_path: P) -> anyhow::Result<()> {
        let config_path = config_path.as_ref();
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(config_path, content)?;
        Ok(())
    }

    pub fn save(&self) -> anyhow::Result<()> {
        let config_path = Self::config_path();
        self.save_to_path(&config_path)
    }

    pub fn config_path() -> PathBuf {
        let config_dir = shellexpand::tilde("~/.config/contextmemo");
        PathBuf::from(config_dir.as_ref()).join("config.toml")
    }

    pub fn expand_path(path: &Path) -> Option<PathBuf> {
        let path_str = path.to_string_lossy();
        match shellexpand::full(&path_str) {
            Ok(expanded) => Some(PathBuf::from(expanded.as_ref())),
            Err(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::env;
    use tempfile::TempDir;

    #[test]
    fn test_config_path() {
        let config_path = Config::config_path();
        let path_str = config_path.to_string_lossy();

        assert!(!path_str.starts_with('~'));
        assert!(path_str.ends_with(".config/contextmemo/config.toml"));
    }

    #[test]
    fn test_default_notes_path_is_expanded() {
        let config = Config::default();
        let path_str = config.notes_path.to_string_lossy();

        assert!(!path_str.starts_with('~'));
        assert!(path_str.ends_with(".local/share/contextmemo/notes.json"));
    }

    #[test]
    fn test_config_serialization_roundtrip() {
        let original = Config {
            notes_path: PathBuf::from("/tmp/test-notes.json"),
            anchoring: AnchoringConfig {
                context_chars: 12,
                max_window_units: 5,
            },
        };

        let toml_str = toml::to_string(&original).unwrap();
        let deserialized: Config = toml::from_str(&toml_str).unwrap();

        assert_eq!(original, deserialized);
    }

    #[test]
    fn test_missing_anchoring_section_uses_defaults() {
        let config: Config = toml::from_str("notes_path = \"/tmp/notes.json\"\n").unwrap();

        assert_eq!(config.anchoring, AnchoringConfig::default());
        assert_eq!(config.anchoring.context_chars, 30);
        assert_eq!(config.anchoring.max_window_units, 40);
    }

    #[test]
    fn test_partial_anchoring_section() {
        let config_content = r#"
notes_path = "/tmp/notes.json"

[anchoring]
context_chars = 50
"#;
        let config: Config = toml::from_str(config_content).unwrap();

        assert_eq!(config.anchoring.context_chars, 50);
        assert_eq!(config.anchoring.max_window_units, DEFAULT_MAX_WINDOW_UNITS);
    }

    #[test]
    fn test_expand_path_with_tilde() {
        let path = PathBuf::from("~/test/path");
        let expanded = Config::expand_path(&path);

        assert!(expanded.is_some());
        let expanded = expanded.unwrap();
        assert!(!expanded.to_string_lossy().starts_with('~'));
        assert!(expanded.to_string_lossy().contains("test/path"));
    }

    #[test]
    fn test_expand_path_with_env_var() {
        unsafe {
            env::set_var("CONTEXTMEMO_TEST_VAR", "/test/env/path");
        }

        let path = PathBuf::from("$CONTEXTMEMO_TEST_VAR/notes.json");
        let expanded = Config::expand_path(&path);

        assert_eq!(expanded, Some(PathBuf::from("/test/env/path/notes.json")));

        unsafe {
            env::remove_var("CONTEXTMEMO_TEST_VAR");
        }
    }

    #[test]
    fn test_expand_path_with_absolute_path() {
        let path = PathBuf::from("/absolute/path");
        let expanded = Config::expand_path(&path).unwrap();

        assert_eq!(expanded, path);
    }

    #[test]
    fn test_expand_path_with_unknown_variable() {
        let path = PathBuf::from("$CONTEXTMEMO_SURELY_UNSET_VAR/notes.json");
        assert_eq!(Config::expand_path(&path), None);
    }

    #[test]
    fn test_load_config_file_not_found() {
        let temp_dir = TempDir::new().unwrap();
        let non_existent_config = temp_dir.path().join("nonexistent.toml");

        let result = Config::load_from_path(&non_existent_config).unwrap();
        assert!(result.is_none());

        let fallback = Config::load_or_default(&non_existent_config).unwrap();
        assert_eq!(fallback, Config::default());
    }

    #[test]
    fn test_load_config_parse_error() {
        let temp_dir = TempDir::new().unwrap();
        let config_file = temp_dir.path().join("config.toml");
        std::fs::write(&config_file, "notes_path = [not toml").unwrap();

        let error = Config::load_from_path(&config_file).unwrap_err();

        assert!(matches!(error, ConfigError::ConfigParseError { .. }));
        assert!(error.to_string().contains("config.toml"));
    }

    #[test]
    fn test_save_and_load_config() {
        // Given a config saved into a directory that does not exist yet
        let temp_dir = TempDir::new().unwrap();
        let config_file = temp_dir.path().join("nested").join("config.toml");
        let test_config = Config {
            notes_path: PathBuf::from("/tmp/test-notes.json"),
            anchoring: AnchoringConfig::default(),
        };

        // When saving and loading it back
        test_config.save_to_path(&config_file).unwrap();
        let loaded_config = Config::load_from_path(&config_file).unwrap().unwrap();

        // Then nothing is lost
        assert!(config_file.exists());
        assert_eq!(loaded_config, test_config);
    }

    #[test]
    fn test_config_with_env_var_in_toml() {
        unsafe {
            env::set_var("CONTEXTMEMO_NOTES_ROOT", "/custom/notes");
        }
        let temp_dir = TempDir::new().unwrap();
        let config_file = temp_dir.path().join("config.toml");
        std::fs::write(
            &config_file,
            "notes_path = \"$CONTEXTMEMO_NOTES_ROOT/notes.json\"\n",
        )
        .unwrap();

        let config = Config::load_from_path(&config_file).unwrap().unwrap();

        assert_eq!(config.notes_path, PathBuf::from("/custom/notes/notes.json"));

        unsafe {
            env::remove_var("CONTEXTMEMO_NOTES_ROOT");
        }
    }
}
