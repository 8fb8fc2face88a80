#![cfg_attr(feature = "strict", deny(warnings))]

pub mod app;
mod console;

pub const CURRENT_VERSION: &str = env!("CARGO_PKG_VERSION");
