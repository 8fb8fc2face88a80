//! Request and response bodies exchanged with the training backend.

mod dashboard;
mod error_body;
mod lenient;
mod machine;
mod machine_ref;
mod training;

pub use dashboard::{MachineSummary, MachinesDataError, parse_machines_data};
pub use error_body::ErrorBody;
pub use machine::{Machine, MachineListResponse, NewMachine, NewMachineResponse};
pub use machine_ref::MachineRef;
pub use training::{
    ChunkUploadResponse, InferenceRequest, StartTrainingResponse, TrainingStatus, TrainingStatusResponse,
};
