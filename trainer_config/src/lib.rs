//! Configuration for the trainer client.
//!
//! Values are grouped by concern; every value has a compiled-in default and may be
//! overridden through an environment variable named `TRAINER_<GROUP>_<NAME>`.

pub mod macros;
pub mod trainer_config;

pub mod groups;

pub use groups::upload::UploadMode;
pub use trainer_config::TrainerConfig;
// Used by the config_group macro.
pub use utils::configuration_utils::ParsableConfigValue;

/// Prefix shared by every environment variable the configuration reads.
pub const ENV_PREFIX: &str = "TRAINER";
