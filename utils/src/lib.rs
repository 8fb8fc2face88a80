#![cfg_attr(feature = "strict", deny(warnings))]

pub mod byte_size;
pub use byte_size::ByteSize;

pub mod configuration_utils;
pub use configuration_utils::ParsableConfigValue;

mod guards;
pub use guards::EnvVarGuard;
