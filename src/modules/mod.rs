use crate::modules::error::RustRelayResult;

pub mod common;
pub mod database;
pub mod error;
pub mod logger;
pub mod rest;
pub mod settings;
pub mod smtp;
pub mod utils;

pub trait Initialize {
    async fn initialize() -> RustRelayResult<()>;
}
