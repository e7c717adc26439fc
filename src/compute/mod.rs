//! Compute module - Chain kinematics, error landscapes and evolutionary fitting.

mod landscape;
mod states;

pub mod evolution;

pub use landscape::*;
pub use states::*;
