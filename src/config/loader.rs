use crate::config::schema::{SurgeryConfig, ValidationError};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

/// Environment variable naming a config file to use when none is passed.
pub const CONFIG_ENV: &str = "FILE_SURGERY_CONFIG";

#[derive(Debug)]
pub enum ConfigError {
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    Toml {
        path: Option<PathBuf>,
        source: toml_edit::de::Error,
    },
    Validation {
        path: Option<PathBuf>,
        source: ValidationError,
    },
}

impl ConfigError {
    fn at(self, path: &Path) -> Self {
        match self {
            ConfigError::Toml { path: None, source } => ConfigError::Toml {
                path: Some(path.to_path_buf()),
                source,
            },
            ConfigError::Validation { path: None, source } => ConfigError::Validation {
                path: Some(path.to_path_buf()),
                source,
            },
            other => other,
        }
    }

    fn location(&self) -> Option<&Path> {
        match self {
            ConfigError::Io { path, .. } => Some(path),
            ConfigError::Toml { path, .. } | ConfigError::Validation { path, .. } => {
                path.as_deref()
            }
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let what = match self {
            ConfigError::Io { .. } => "cannot read surgery config",
            ConfigError::Toml { .. } => "malformed surgery config",
            ConfigError::Validation { .. } => "invalid surgery config",
        };
        match self.location() {
            Some(path) => write!(f, "{what} {}: ", path.display())?,
            None => write!(f, "{what}: ")?,
        }
        match self {
            ConfigError::Io { source, .. } => write!(f, "{source}"),
            ConfigError::Toml { source, .. } => write!(f, "{}", source.to_string().trim_end()),
            ConfigError::Validation { source, .. } => write!(f, "{source}"),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Io { source, .. } => Some(source),
            ConfigError::Toml { source, .. } => Some(source),
            ConfigError::Validation { source, .. } => Some(source),
        }
    }
}

/// Parse and validate a TOML config. Missing keys take their defaults; a
/// leading `~/` in `backup_dir` is expanded to the home directory.
pub fn load_from_str(input: &str) -> Result<SurgeryConfig, ConfigError> {
    let mut config: SurgeryConfig = toml_edit::de::from_str(input)
        .map_err(|source| ConfigError::Toml { path: None, source })?;
    config.backup_dir = expand_home(&config.backup_dir);
    config
        .validate()
        .map_err(|source| ConfigError::Validation { path: None, source })?;
    Ok(config)
}

pub fn load_from_path(path: impl AsRef<Path>) -> Result<SurgeryConfig, ConfigError> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    load_from_str(&contents).map_err(|error| error.at(path))
}

/// `~/.file-surgery/config.toml`, if the home directory is known.
pub fn default_config_path() -> Option<PathBuf> {
    home::home_dir().map(|home| home.join(".file-surgery").join("config.toml"))
}

/// Resolve the effective config, then apply environment overrides.
///
/// Lookup order: `explicit`, then `$FILE_SURGERY_CONFIG`, then
/// [`default_config_path`] if that file exists, then built-in defaults. A
/// file that is named explicitly or by the environment must exist.
pub fn resolve(explicit: Option<&Path>) -> Result<SurgeryConfig, ConfigError> {
    let named = explicit.map(Path::to_path_buf).or_else(|| {
        std::env::var_os(CONFIG_ENV)
            .filter(|v| !v.is_empty())
            .map(PathBuf::from)
    });

    let config = match named {
        Some(path) => load_from_path(path)?,
        None => match default_config_path().filter(|p| p.is_file()) {
            Some(path) => load_from_path(path)?,
            None => SurgeryConfig::default(),
        },
    };
    Ok(config.with_env_overrides())
}

fn expand_home(path: &Path) -> PathBuf {
    match path.strip_prefix("~") {
        Ok(rest) => match home::home_dir() {
            Some(home) => home.join(rest),
            None => path.to_path_buf(),
        },
        Err(_) => path.to_path_buf(),
    }
}
