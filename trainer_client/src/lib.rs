#![cfg_attr(feature = "strict", deny(warnings))]

pub use crate::error::{Result, TrainerClientError};
pub use http_client::{AuthMiddleware, build_http_client};
pub use interface::{ChunkUpload, FileUpload, TrainerApi};
pub use memory_client::{MemoryTrainerApi, RecordedChunk, ScriptedStatus};
pub use remote_client::RemoteClient;

mod error;
mod http_client;
mod interface;
mod memory_client;
mod remote_client;
