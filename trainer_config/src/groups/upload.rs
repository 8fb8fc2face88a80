use std::fmt;
use std::str::FromStr;

use thiserror::Error;
use utils::ByteSize;
use utils::configuration_utils::FromStrParseable;

/// How a training file is sent to the backend.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum UploadMode {
    /// Sequential fixed-size multipart chunks to `/api/model-train/chunk`.
    #[default]
    Chunked,
    /// The whole file as a raw body to `/api/model-train/start`.
    WholeFile,
}

#[derive(Debug, Error)]
#[error("unknown upload mode {0:?}; expected \"chunked\" or \"whole_file\"")]
pub struct UploadModeParseError(String);

impl FromStr for UploadMode {
    type Err = UploadModeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "chunked" | "chunk" => Ok(Self::Chunked),
            "whole_file" | "whole" | "single" => Ok(Self::WholeFile),
            _ => Err(UploadModeParseError(s.to_owned())),
        }
    }
}

impl fmt::Display for UploadMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Chunked => write!(f, "chunked"),
            Self::WholeFile => write!(f, "whole_file"),
        }
    }
}

impl FromStrParseable for UploadMode {}

crate::config_group!({

    /// Size of every chunk but the last one in a chunked upload.
    ///
    /// The default value is 1mib.
    ///
    /// Use the environment variable `TRAINER_UPLOAD_CHUNK_SIZE` to set this value.
    ref chunk_size: ByteSize = ByteSize::mib(1);

    /// Files larger than this are rejected before any request is made.
    ///
    /// The default value is 25mib.
    ///
    /// Use the environment variable `TRAINER_UPLOAD_MAX_FILE_SIZE` to set this value.
    ref max_file_size: ByteSize = ByteSize::mib(25);

    /// Either "chunked" or "whole_file".
    ///
    /// The default value is "chunked".
    ///
    /// Use the environment variable `TRAINER_UPLOAD_MODE` to set this value.
    ref mode: UploadMode = UploadMode::Chunked;

});
