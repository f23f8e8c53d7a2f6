//! Signage Common Library
//!
//! Configuration and wire models shared by the signage verification suite.

pub mod config;
pub mod error;
pub mod types;

// Re-export commonly used types
pub use config::{DeviceTarget, Settings, TestUser};
pub use error::{Error, Result};
pub use types::*;

