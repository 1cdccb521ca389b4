//! Configuration loading and discovery for `atlas.toml`

use super::schema::{AtlasConfig, CONFIG_FILE_NAME};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Configuration loading error
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    /// No config given and none found by discovery
    #[error("No {} found in {} or any parent directory", CONFIG_FILE_NAME, .0.display())]
    NotFound(PathBuf),
    /// File I/O error
    #[error("Failed to read config {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// TOML parsing error
    #[error("Failed to parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    /// Validation error
    #[error("Config validation failed:\n{}", .0.iter().map(|e| format!("  - {}", e)).collect::<Vec<_>>().join("\n"))]
    Validation(Vec<String>),
}

/// A parsed config and where it was read from.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub path: PathBuf,
    pub config: AtlasConfig,
}

impl LoadedConfig {
    /// Directory relative paths in the config are resolved against.
    pub fn base_dir(&self) -> &Path {
        match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        }
    }
}

/// Find `atlas.toml` by walking up from the current working directory.
pub fn find_config() -> Option<PathBuf> {
    env::current_dir().ok().and_then(find_config_from)
}

/// Find `atlas.toml` by walking up from `start`.
pub fn find_config_from(start: PathBuf) -> Option<PathBuf> {
    let mut current = start;

    loop {
        let config_path = current.join(CONFIG_FILE_NAME);
        if config_path.is_file() {
            return Some(config_path);
        }
        if !current.pop() {
            return None;
        }
    }
}

/// Load configuration from `path`, or from the discovered `atlas.toml`.
///
/// # Example
/// ```ignore
/// let loaded = load_config(None)?;
/// println!("{} jobs from {}", loaded.config.job_count(), loaded.path.display());
/// ```
pub fn load_config(path: Option<&Path>) -> Result<LoadedConfig, ConfigError> {
    let config_path = match path {
        Some(p) => p.to_path_buf(),
        None => find_config().ok_or_else(|| {
            ConfigError::NotFound(env::current_dir().unwrap_or_else(|_| PathBuf::from(".")))
        })?,
    };
    load_config_file(&config_path)
}

/// Load and validate a specific config file.
pub fn load_config_file(path: &Path) -> Result<LoadedConfig, ConfigError> {
    let contents =
        fs::read_to_string(path).map_err(|source| ConfigError::Io { path: path.to_path_buf(), source })?;
    let config: AtlasConfig =
        toml::from_str(&contents).map_err(|source| ConfigError::Parse { path: path.to_path_buf(), source })?;

    let errors = config.validate();
    if !errors.is_empty() {
        return Err(ConfigError::Validation(errors.into_iter().map(|e| e.to_string()).collect()));
    }

    Ok(LoadedConfig { path: path.to_path_buf(), config })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_find_config_in_parent_dir() {
        let temp = TempDir::new().expect("should create temp dir");
        let config_path = temp.path().join(CONFIG_FILE_NAME);
        fs::write(&config_path, "[defaults]\n").expect("should write config");

        let subdir = temp.path().join("assets").join("species");
        fs::create_dir_all(&subdir).expect("should create subdirectories");

        assert_eq!(find_config_from(subdir), Some(config_path.clone()));
        assert_eq!(find_config_from(temp.path().to_path_buf()), Some(config_path));
    }

    #[test]
    fn test_find_config_not_found() {
        let temp = TempDir::new().expect("should create temp dir");
        let found = find_config_from(temp.path().to_path_buf());
        // A stray atlas.toml above the temp dir would also be a valid answer
        if let Some(path) = found {
            assert!(!path.starts_with(temp.path()));
        }
    }

    #[test]
    fn test_load_reports_parse_errors_with_path() {
        let temp = TempDir::new().expect("should create temp dir");
        let path = temp.path().join(CONFIG_FILE_NAME);
        fs::write(&path, "[[pack]\nfolders = 3").expect("should write config");

        let err = load_config(Some(&path)).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
        assert!(err.to_string().contains(CONFIG_FILE_NAME));
    }

    #[test]
    fn test_load_rejects_invalid_values() {
        let temp = TempDir::new().expect("should create temp dir");
        let path = temp.path().join(CONFIG_FILE_NAME);
        fs::write(&path, "[[downscale]]\nfolders = [\"x\"]\nscale = 0.0\n").expect("should write config");

        match load_config(Some(&path)) {
            Err(ConfigError::Validation(errors)) => {
                assert_eq!(errors.len(), 1);
                assert!(errors[0].contains("downscale[0].scale"));
            }
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_base_dir() {
        let loaded = LoadedConfig { path: PathBuf::from("atlas.toml"), config: AtlasConfig::default() };
        assert_eq!(loaded.base_dir(), Path::new("."));
        let loaded = LoadedConfig { path: PathBuf::from("/p/q/atlas.toml"), config: AtlasConfig::default() };
        assert_eq!(loaded.base_dir(), Path::new("/p/q"));
    }
}
