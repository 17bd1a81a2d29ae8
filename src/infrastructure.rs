//! Infrastructure layer: configuration, logging, the extraction host and
//! the single-instance socket.

pub mod config;
pub mod extractor;
pub mod ipc;
pub mod logging;

pub use config::{AppConfig, ConfigManager};
pub use extractor::{ExtractError, ExtractionRequest};
