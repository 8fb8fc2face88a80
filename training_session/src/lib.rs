//! Upload-and-train tracking for machine models.
//!
//! A [`TrainingController`] owns the per-machine state.  It uploads a training file through
//! the configured [`UploadStrategy`], follows the resulting training job by polling its status,
//! and runs inference against the trained model.  Every state change is pushed to a
//! [`StateObserver`] as a full [`MachineState`] snapshot.

#![cfg_attr(feature = "strict", deny(warnings))]

mod chunking;
mod config;
mod controller;
mod errors;
mod inference;
mod observer;
mod poller;
mod source;
mod state;
mod strategy;

pub use chunking::{ChunkPlan, PlannedChunk};
pub use config::SessionConfig;
pub use controller::TrainingController;
pub use errors::{Result, TrainingSessionError};
pub use inference::invoke_inference;
pub use observer::{ChannelObserver, NoOpObserver, StateObserver, StateSnapshot};
pub use poller::{PollEvent, PollOutcome, PollRegistry, PollTicket, next_event, run_poll_cycle};
pub use source::SourceFile;
pub use state::{MachineState, PollState, StateEvent};
pub use strategy::{ChunkedUpload, UploadOutcome, UploadProgress, UploadStrategy, WholeFileUpload, strategy_for};
