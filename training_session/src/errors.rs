//! Error types for training sessions

use thiserror::Error;
use trainer_client::TrainerClientError;
use utils::ByteSize;

/// Errors of the upload, polling and inference workflow.
///
/// The `Display` text of each variant is what ends up in the machine state shown to the user.
#[derive(Debug, Error)]
pub enum TrainingSessionError {
    #[error("File of {} exceeds the {} limit", ByteSize::new(*size), ByteSize::new(*limit))]
    FileTooLarge { size: u64, limit: u64 },

    #[error("File is empty.")]
    EmptyFile,

    #[error("Select a CSV file first.")]
    NoFileSelected,

    #[error("An upload is already running for machine {0}")]
    UploadInProgress(String),

    #[error("{message}")]
    ChunkUploadFailed { chunk_index: u64, message: String },

    #[error("Upload finished but the server returned no tracking id")]
    MissingTrackingId,

    #[error("{0}")]
    PollingFailed(String),

    #[error("{0}")]
    TrainingFailed(String),

    #[error("No trained model available.")]
    NoModelAvailable,

    #[error("{0}")]
    InferenceFailed(String),

    #[error("Machine name must not be empty")]
    InvalidMachineName,

    #[error("Unknown machine: {0}")]
    UnknownMachine(String),

    #[error("Invalid configuration: {0}")]
    Configuration(String),

    #[error("Training controller has been shut down")]
    ShutDown,

    #[error(transparent)]
    Client(#[from] TrainerClientError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, TrainingSessionError>;
