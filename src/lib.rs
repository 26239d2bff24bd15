pub mod app;
pub mod cli;
pub mod config;
pub mod lamps;
pub mod panel;
pub mod policy;
pub mod protocol;
pub mod serial;
pub mod state;

use protocol::OutOfRangeEdit;
use serial::ConnectionError;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid arguments: {0}")]
    InvalidArgs(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("config error: {0}")]
    Config(String),
    #[error(transparent)]
    Connection(#[from] ConnectionError),
    #[error(transparent)]
    OutOfRange(#[from] OutOfRangeEdit),
}
