//! Logging configuration via `stagelog.toml`
//!
//! On first start a commented default file can be written with
//! [`LogConfig::write_default_if_missing`]; edit it and restart to change
//! settings.

use crate::global;
use crate::logger::{Logger, LoggerOptions};
use serde::{Deserialize, Serialize};
use stagelog_core::{FormatFlags, LogError, Result, Severity, MB};
use stagelog_durability::RotationPolicy;
use std::path::{Path, PathBuf};

/// Conventional config file name.
pub const CONFIG_FILE_NAME: &str = "stagelog.toml";

/// How the active file is rotated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RotationMode {
    /// Once per local calendar day
    #[default]
    Daily,
    /// When the file reaches `max_size` bytes
    Size,
}

/// The `[rotation]` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RotationConfig {
    /// `"daily"` or `"size"`.
    #[serde(default)]
    pub mode: RotationMode,
    /// Size threshold in bytes (size mode).
    #[serde(default = "default_max_size")]
    pub max_size: u64,
    /// Number of rotated files kept (size mode).
    #[serde(default = "default_max_count")]
    pub max_count: u32,
}

fn default_max_size() -> u64 {
    100 * MB
}

fn default_max_count() -> u32 {
    10
}

impl Default for RotationConfig {
    fn default() -> Self {
        RotationConfig {
            mode: RotationMode::Daily,
            max_size: default_max_size(),
            max_count: default_max_count(),
        }
    }
}

impl RotationConfig {
    /// Rotation policy for the rolling file.
    pub fn policy(&self) -> RotationPolicy {
        match self.mode {
            RotationMode::Daily => RotationPolicy::Daily,
            RotationMode::Size => RotationPolicy::BySize {
                max_size: self.max_size,
                max_count: self.max_count,
            },
        }
    }
}

/// Logging configuration loaded from `stagelog.toml`.
///
/// # Example
///
/// ```toml
/// console = false
/// level = "info"
/// dir = "/var/log/app"
/// filename = "app.log"
/// staging_filename = "app.log.mmap"
///
/// [rotation]
/// mode = "size"
/// max_size = 104857600
/// max_count = 10
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogConfig {
    /// Echo records to stderr.
    #[serde(default = "default_console")]
    pub console: bool,
    /// Minimum severity, by name or rank.
    #[serde(default)]
    pub level: Severity,
    /// Directory of the log files.
    #[serde(default = "default_dir")]
    pub dir: PathBuf,
    /// Active log file name.
    #[serde(default = "default_filename")]
    pub filename: String,
    /// Staging file name inside `dir`; unset writes directly.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub staging_filename: Option<String>,
    /// Rotation settings.
    #[serde(default)]
    pub rotation: RotationConfig,
}

fn default_console() -> bool {
    true
}

fn default_dir() -> PathBuf {
    PathBuf::from("./logs")
}

fn default_filename() -> String {
    "app.log".to_string()
}

impl Default for LogConfig {
    fn default() -> Self {
        LogConfig {
            console: default_console(),
            level: Severity::default(),
            dir: default_dir(),
            filename: default_filename(),
            staging_filename: None,
            rotation: RotationConfig::default(),
        }
    }
}

impl LogConfig {
    /// Returns the default config file content with comments.
    pub fn default_toml() -> &'static str {
        r#"# stagelog configuration
#
# Echo every record to stderr (default: true)
console = true

# Minimum severity: all, debug, info, warn, error, fatal, off
# or its rank:      0    1      2     3     4      5      6
level = "debug"

# Log directory and active file name
dir = "./logs"
filename = "app.log"

# Stage records through a memory-mapped file inside `dir` (default: unset)
# staging_filename = "app.log.mmap"

[rotation]
# "daily" renames the active file to <filename>.<YYYY-MM-DD> at day change
# "size"  renames it to <filename>.<1..=max_count> once it reaches max_size
mode = "daily"
# max_size = 104857600
# max_count = 10
"#
    }

    /// Parse config from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`LogError::Config`] if the text cannot be parsed or fails
    /// validation.
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: LogConfig = toml::from_str(content)
            .map_err(|e| LogError::Config(format!("Failed to parse log config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse config from a file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed or validated.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            LogError::Config(format!(
                "Failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        Self::from_toml(&content).map_err(|e| match e {
            LogError::Config(msg) => LogError::Config(format!("{} ({})", msg, path.display())),
            other => other,
        })
    }

    /// Write the default config file if it does not already exist.
    ///
    /// Returns `Ok(())` whether the file was created or already existed.
    pub fn write_default_if_missing(path: &Path) -> Result<()> {
        if !path.exists() {
            std::fs::write(path, Self::default_toml()).map_err(|e| {
                LogError::Config(format!(
                    "Failed to write default config file '{}': {}",
                    path.display(),
                    e
                ))
            })?;
        }
        Ok(())
    }

    /// Serialize this config to TOML and write it to the given path.
    ///
    /// # Errors
    ///
    /// Returns [`LogError::Config`] if serialization fails and
    /// [`LogError::Io`] if the file cannot be written.
    pub fn write_to_file(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| LogError::Config(format!("Failed to serialize log config: {}", e)))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Check values the type system does not.
    ///
    /// # Errors
    ///
    /// Returns [`LogError::Config`] for an empty file name or a zero size
    /// limit in size mode.
    pub fn validate(&self) -> Result<()> {
        if self.filename.trim().is_empty() {
            return Err(LogError::Config("filename must not be empty".to_string()));
        }
        if matches!(&self.staging_filename, Some(name) if name.trim().is_empty()) {
            return Err(LogError::Config(
                "staging_filename must not be empty when set".to_string(),
            ));
        }
        if self.rotation.mode == RotationMode::Size && self.rotation.max_size == 0 {
            return Err(LogError::Config(
                "rotation.max_size must be greater than 0 in size mode".to_string(),
            ));
        }
        Ok(())
    }

    /// Options for opening a [`Logger`] as configured.
    pub fn logger_options(&self) -> LoggerOptions {
        let options = LoggerOptions::new(&self.dir, &self.filename)
            .with_flags(FormatFlags::FLAG_NORMAL)
            .with_policy(self.rotation.policy());
        match &self.staging_filename {
            Some(name) => options.with_staging_file(name),
            None => options,
        }
    }

    /// Apply console and level to the process-wide facade and install the
    /// configured logger.
    ///
    /// # Errors
    ///
    /// Returns an error if the config is invalid or the logger cannot be
    /// opened; the facade is left unchanged in that case.
    pub fn install(&self) -> Result<()> {
        self.validate()?;
        let logger = Logger::open(self.logger_options())?;
        global::set_console(self.console);
        global::set_level(self.level);
        global::install_logger(logger);
        Ok(())
    }
}
