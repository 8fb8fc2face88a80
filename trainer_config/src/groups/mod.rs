pub mod client;
pub mod log;
pub mod poll;
pub mod upload;
