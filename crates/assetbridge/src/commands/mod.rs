//! Command handlers for the assetbridge CLI.

pub mod logging;
pub mod serve;

pub use logging::*;
pub use serve::*;
