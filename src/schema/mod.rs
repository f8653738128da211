//! Schema module - Configuration and seeding types for the engine.

mod config;
mod seed;

pub use config::*;
pub use seed::*;
