pub mod audio;
pub mod config;
pub mod error;

pub use config::AudioConfig;
pub use error::{DeviceError, NegotiationError, Result, StreamError};
