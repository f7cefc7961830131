//! Headless core of the automation console: typed REST access, the
//! workflow visualizer, the launch prompt wizard and resource forms.

pub mod api;
pub mod config;
pub mod error;
pub mod forms;
pub mod prompt;
pub mod workflow;

pub use error::{ApiError, ConsoleError, ErrorMessage, Result};
