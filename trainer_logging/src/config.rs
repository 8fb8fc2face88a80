use std::path::{Path, PathBuf};

use trainer_config::groups::log::ConfigValueGroup as LogConfigGroup;

#[derive(Clone, Debug, PartialEq)]
pub enum LoggingMode {
    Directory(PathBuf),
    File(PathBuf),
    Console,
}

#[derive(Clone, Debug, PartialEq)]
pub struct LoggingConfig {
    pub logging_mode: LoggingMode,
    pub use_json: bool,
    pub version: String,
    pub file_prefix: String,
}

impl LoggingConfig {
    /// Console logging unless the log group names a destination.
    pub fn from_config(version: impl Into<String>, log: &LogConfigGroup) -> LoggingConfig {
        let logging_mode = match &log.dest {
            Some(dest) if !dest.trim().is_empty() => {
                let path = PathBuf::from(dest);
                if dest.ends_with('/') || (cfg!(windows) && dest.ends_with('\\')) || path.is_dir() {
                    LoggingMode::Directory(path)
                } else {
                    LoggingMode::File(path)
                }
            },
            _ => LoggingMode::Console,
        };

        let use_json = match &log.format {
            Some(format) => format.to_ascii_lowercase().trim() == "json",
            None => logging_mode != LoggingMode::Console,
        };

        Self {
            logging_mode,
            use_json,
            version: version.into(),
            file_prefix: log.prefix.clone(),
        }
    }

    /// Set up logging to a directory regardless of the environment.
    pub fn to_directory(version: impl Into<String>, log_directory: impl AsRef<Path>) -> LoggingConfig {
        Self {
            logging_mode: LoggingMode::Directory(log_directory.as_ref().to_path_buf()),
            use_json: true,
            version: version.into(),
            file_prefix: LogConfigGroup::default().prefix,
        }
    }
}
