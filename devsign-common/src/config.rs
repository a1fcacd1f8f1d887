//! Configuration loading and root folder resolution
//!
//! Bootstrap settings follow this priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. TOML config file
//! 4. Compiled default (fallback)

use crate::models::ArtifactSlot;
use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable naming an explicit config file
pub const CONFIG_ENV_VAR: &str = "DEVSIGN_CONFIG";

/// Environment variable overriding the root folder
pub const ROOT_FOLDER_ENV_VAR: &str = "DEVSIGN_ROOT_FOLDER";

pub const DEFAULT_BIND_ADDRESS: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 5780;

/// Per-file upload ceiling (1 GiB)
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 1024 * 1024 * 1024;

const DATABASE_FILE_NAME: &str = "devsign.db";
const UPLOAD_DIR_NAME: &str = "uploads";

/// Contents of `devsign-assembly.toml`
///
/// Every key is optional; a missing file is equivalent to an empty one.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TomlConfig {
    #[serde(default)]
    pub root_folder: Option<PathBuf>,

    #[serde(default)]
    pub bind_address: Option<String>,

    #[serde(default)]
    pub port: Option<u16>,

    #[serde(default)]
    pub max_upload_bytes: Option<usize>,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub uploads: UploadPolicy,
}

/// Logging configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoggingConfig {
    /// Filter directive (trace, debug, info, warn, error, or a full EnvFilter string)
    #[serde(default)]
    pub level: Option<String>,
}

/// Allowed file extensions per artifact slot
///
/// An empty list accepts any extension.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct UploadPolicy {
    #[serde(default = "default_primary_extensions")]
    pub primary_extensions: Vec<String>,

    #[serde(default = "default_document_extensions")]
    pub document_extensions: Vec<String>,

    #[serde(default)]
    pub other_extensions: Vec<String>,
}

fn default_primary_extensions() -> Vec<String> {
    vec!["ppt".to_string(), "pptx".to_string()]
}

fn default_document_extensions() -> Vec<String> {
    vec!["pdf".to_string()]
}

impl Default for UploadPolicy {
    fn default() -> Self {
        Self {
            primary_extensions: default_primary_extensions(),
            document_extensions: default_document_extensions(),
            other_extensions: Vec::new(),
        }
    }
}

impl UploadPolicy {
    pub fn allowed(&self, slot: ArtifactSlot) -> &[String] {
        match slot {
            ArtifactSlot::Primary => &self.primary_extensions,
            ArtifactSlot::Document => &self.document_extensions,
            ArtifactSlot::Other => &self.other_extensions,
        }
    }

    /// Reject a filename whose extension the slot does not accept
    pub fn check(&self, slot: ArtifactSlot, filename: &str) -> Result<()> {
        let allowed = self.allowed(slot);
        if allowed.is_empty() {
            return Ok(());
        }

        let extension = file_extension(filename);
        match extension {
            Some(ext) if allowed.iter().any(|a| a.eq_ignore_ascii_case(&ext)) => Ok(()),
            _ => Err(Error::Validation(format!(
                "{} slot accepts only .{} files, got '{}'",
                slot,
                allowed.join(" / ."),
                filename
            ))),
        }
    }
}

/// Lowercased extension after the last dot, `None` when absent or empty
pub fn file_extension(filename: &str) -> Option<String> {
    let (_, ext) = filename.rsplit_once('.')?;
    if ext.is_empty() {
        None
    } else {
        Some(ext.to_ascii_lowercase())
    }
}

/// Values supplied on the command line (or through clap's env fallback)
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub root_folder: Option<PathBuf>,
    pub bind_address: Option<String>,
    pub port: Option<u16>,
    pub max_upload_bytes: Option<usize>,
    pub log_level: Option<String>,
}

/// Fully resolved service configuration
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub root_folder: PathBuf,
    pub bind_address: String,
    pub port: u16,
    pub max_upload_bytes: usize,
    pub log_level: Option<String>,
    pub uploads: UploadPolicy,
}

impl ServiceConfig {
    /// Merge command-line overrides over the TOML file over compiled defaults
    pub fn resolve(cli: CliOverrides, toml: TomlConfig) -> Self {
        let root_folder = resolve_root_folder(cli.root_folder.as_deref(), toml.root_folder.as_deref());

        Self {
            root_folder,
            bind_address: cli
                .bind_address
                .or(toml.bind_address)
                .unwrap_or_else(|| DEFAULT_BIND_ADDRESS.to_string()),
            port: cli.port.or(toml.port).unwrap_or(DEFAULT_PORT),
            max_upload_bytes: cli
                .max_upload_bytes
                .or(toml.max_upload_bytes)
                .unwrap_or(DEFAULT_MAX_UPLOAD_BYTES),
            log_level: cli.log_level.or(toml.logging.level),
            uploads: toml.uploads,
        }
    }

    pub fn database_path(&self) -> PathBuf {
        self.root_folder.join(DATABASE_FILE_NAME)
    }

    pub fn upload_dir(&self) -> PathBuf {
        self.root_folder.join(UPLOAD_DIR_NAME)
    }

    /// Create the root and upload folders if missing
    pub fn ensure_directories(&self) -> Result<()> {
        std::fs::create_dir_all(&self.root_folder)?;
        std::fs::create_dir_all(self.upload_dir())?;
        Ok(())
    }
}

/// Root folder: CLI argument, then environment, then TOML, then platform default
pub fn resolve_root_folder(cli_arg: Option<&Path>, toml_value: Option<&Path>) -> PathBuf {
    if let Some(path) = cli_arg {
        return path.to_path_buf();
    }

    if let Ok(path) = std::env::var(ROOT_FOLDER_ENV_VAR) {
        if !path.trim().is_empty() {
            return PathBuf::from(path);
        }
    }

    if let Some(path) = toml_value {
        return path.to_path_buf();
    }

    default_root_folder()
}

/// Get OS-dependent default root folder path
pub fn default_root_folder() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("devsign"))
        .unwrap_or_else(|| PathBuf::from("./devsign_data"))
}

/// Config file location: CLI argument, then environment, then platform config dir
pub fn resolve_config_path(cli_arg: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = cli_arg {
        return Some(path.to_path_buf());
    }

    if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
        if !path.trim().is_empty() {
            return Some(PathBuf::from(path));
        }
    }

    dirs::config_dir().map(|d| d.join("devsign").join("devsign-assembly.toml"))
}

/// Where the loaded configuration came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    /// No config location could be determined
    Unresolved,
    /// The config file does not exist; defaults apply
    Missing(PathBuf),
    Loaded(PathBuf),
}

impl ConfigSource {
    /// Report the outcome once logging is up
    pub fn log(&self) {
        match self {
            ConfigSource::Unresolved => {
                warn!("No config file location available, using defaults")
            }
            ConfigSource::Missing(path) => {
                warn!("Config file not found at {}, using defaults", path.display())
            }
            ConfigSource::Loaded(path) => info!("Loaded config file: {}", path.display()),
        }
    }
}

/// Load the TOML config file, falling back to defaults when it does not exist
///
/// Runs before the subscriber is installed, so the outcome is returned
/// rather than logged.
pub fn load_toml_config(path: Option<&Path>) -> Result<(TomlConfig, ConfigSource)> {
    let Some(path) = path else {
        return Ok((TomlConfig::default(), ConfigSource::Unresolved));
    };

    if !path.exists() {
        return Ok((TomlConfig::default(), ConfigSource::Missing(path.to_path_buf())));
    }

    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Read {} failed: {}", path.display(), e)))?;
    let config = toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse {} failed: {}", path.display(), e)))?;

    Ok((config, ConfigSource::Loaded(path.to_path_buf())))
}
