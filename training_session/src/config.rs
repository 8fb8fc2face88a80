use std::time::Duration;

use trainer_config::{TrainerConfig, UploadMode};

use crate::errors::{Result, TrainingSessionError};

/// The slice of [`TrainerConfig`] the training workflow needs, validated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    pub chunk_size: u64,
    pub max_file_size: u64,
    pub upload_mode: UploadMode,
    pub poll_interval: Duration,
}

impl SessionConfig {
    pub fn from_config(config: &TrainerConfig) -> Result<Self> {
        Self {
            chunk_size: config.upload.chunk_size.as_u64(),
            max_file_size: config.upload.max_file_size.as_u64(),
            upload_mode: config.upload.mode,
            poll_interval: config.poll.interval,
        }
        .validated()
    }

    pub fn validated(self) -> Result<Self> {
        if self.chunk_size == 0 {
            return Err(TrainingSessionError::Configuration("upload chunk size must be positive".into()));
        }
        if self.max_file_size == 0 {
            return Err(TrainingSessionError::Configuration("maximum file size must be positive".into()));
        }
        if self.poll_interval.is_zero() {
            return Err(TrainingSessionError::Configuration("poll interval must be positive".into()));
        }
        Ok(self)
    }

    pub fn with_chunk_size(mut self, chunk_size: u64) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    pub fn with_upload_mode(mut self, mode: UploadMode) -> Self {
        self.upload_mode = mode;
        self
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        let config = TrainerConfig::default();
        Self {
            chunk_size: config.upload.chunk_size.as_u64(),
            max_file_size: config.upload.max_file_size.as_u64(),
            upload_mode: config.upload.mode,
            poll_interval: config.poll.interval,
        }
    }
}
