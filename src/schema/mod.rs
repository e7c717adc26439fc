//! Schema module - Chain, configuration and result types for epicycle fitting.

mod circle;
mod config;
mod result;

pub use circle::*;
pub use config::*;
pub use result::*;
