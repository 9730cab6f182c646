//! Detection configuration and its JSON config file.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::ConfigError;
use crate::files::normalize_extension;

/// Default config file name looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "collision-detector.json";

/// On-disk shape of `collision-detector.json`.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields, rename_all = "camelCase")]
pub struct ConfigFile {
    pub scan_paths: Vec<String>,
    pub exclude_paths: Vec<String>,
    pub file_extensions: Vec<String>,
    pub ignore_parse_failures: bool,
}

impl Default for ConfigFile {
    fn default() -> Self {
        Self {
            scan_paths: Vec::new(),
            exclude_paths: Vec::new(),
            file_extensions: vec!["php".into()],
            ignore_parse_failures: false,
        }
    }
}

/// Validated settings for one detection run. All paths are canonical.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetectionConfig {
    /// Files or directories to scan, in order.
    pub scan_paths: Vec<PathBuf>,
    /// Paths whose text, found anywhere in a candidate path, excludes it.
    pub exclude_paths: Vec<PathBuf>,
    /// Dot-prefixed file name suffixes to scan.
    pub file_extensions: Vec<String>,
    /// Directory stripped from reported file paths.
    pub base_dir: PathBuf,
    /// Count unparsable files as excluded instead of failing the run.
    pub ignore_parse_failures: bool,
}

impl DetectionConfig {
    /// Build a config from existing paths.
    pub fn new<S, E>(
        scan_paths: &[S],
        exclude_paths: &[E],
        file_extensions: &[String],
        base_dir: &Path,
        ignore_parse_failures: bool,
    ) -> Result<Self, ConfigError>
    where
        S: AsRef<Path>,
        E: AsRef<Path>,
    {
        Ok(Self {
            scan_paths: scan_paths
                .iter()
                .map(|p| canonicalize(p.as_ref()))
                .collect::<Result<_, _>>()?,
            exclude_paths: exclude_paths
                .iter()
                .map(|p| canonicalize(p.as_ref()))
                .collect::<Result<_, _>>()?,
            file_extensions: file_extensions
                .iter()
                .map(|e| normalize_extension(e))
                .collect(),
            base_dir: canonicalize(base_dir)?,
            ignore_parse_failures,
        })
    }

    /// Load `config_path`. Non-empty `provided_paths` replace the file's
    /// `scanPaths` and resolve against `cwd`; everything else in the file
    /// resolves against the file's own directory.
    pub fn from_config_file(
        provided_paths: &[PathBuf],
        cwd: &Path,
        config_path: &Path,
    ) -> Result<Self, ConfigError> {
        let config_path = cwd.join(config_path);
        if !config_path.is_file() {
            return Err(ConfigError::NotAFile(config_path));
        }
        let text = fs::read_to_string(&config_path).map_err(|source| ConfigError::Read {
            path: config_path.clone(),
            source,
        })?;
        let file: ConfigFile = serde_json::from_str(&text).map_err(|source| ConfigError::Json {
            path: config_path.clone(),
            source,
        })?;
        let config_dir = config_path.parent().unwrap_or(cwd);
        Self::from_config_data(provided_paths, cwd, config_dir, file)
    }

    /// Defaults with the given scan paths, resolved against `cwd`.
    pub fn from_defaults(provided_paths: &[PathBuf], cwd: &Path) -> Result<Self, ConfigError> {
        Self::from_config_data(provided_paths, cwd, cwd, ConfigFile::default())
    }

    fn from_config_data(
        provided_paths: &[PathBuf],
        cwd: &Path,
        config_dir: &Path,
        file: ConfigFile,
    ) -> Result<Self, ConfigError> {
        let scan_paths = if provided_paths.is_empty() {
            file.scan_paths
                .iter()
                .map(|p| join_existing(config_dir, Path::new(p)))
                .collect::<Result<Vec<_>, _>>()?
        } else {
            provided_paths
                .iter()
                .map(|p| join_existing(cwd, p))
                .collect::<Result<Vec<_>, _>>()?
        };
        let exclude_paths = file
            .exclude_paths
            .iter()
            .map(|p| join_existing(config_dir, Path::new(p)))
            .collect::<Result<Vec<_>, _>>()?;

        Self::new(
            &scan_paths,
            &exclude_paths,
            &file.file_extensions,
            cwd,
            file.ignore_parse_failures,
        )
    }
}

fn join_existing(directory: &Path, path: &Path) -> Result<PathBuf, ConfigError> {
    let joined = directory.join(path);
    if joined.is_dir() || joined.is_file() {
        Ok(joined)
    } else {
        Err(ConfigError::InvalidPath(joined))
    }
}

fn canonicalize(path: &Path) -> Result<PathBuf, ConfigError> {
    if !path.is_dir() && !path.is_file() {
        return Err(ConfigError::InvalidPath(path.to_path_buf()));
    }
    fs::canonicalize(path).map_err(|source| ConfigError::Canonicalize {
        path: path.to_path_buf(),
        source,
    })
}
