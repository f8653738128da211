//! Lenia - continuous cellular automata simulation and analysis engine.
//!
//! This crate implements the numerical core of a Lenia explorer: kernel
//! generation, the per-step convolution-and-growth update (single-channel
//! and multi-channel rule passes), edge and obstacle handling, and a
//! statistics subsystem that detects stabilization, periodicity, and
//! movement. Rendering, UI, and asset loading are external collaborators
//! that talk to the engine through the upload primitives and the observer
//! trait.
//!
//! # Architecture
//!
//! - `schema`: configuration types and seed patterns
//! - `compute`: field, kernels, growth, convolution, step engine, analysis
//!
//! # Example
//!
//! ```rust,no_run
//! use lenia_engine::{
//!     compute::{Field, StepEngine},
//!     schema::{EngineConfig, Seed},
//! };
//!
//! let config = EngineConfig::default();
//! config.validate().expect("valid configuration");
//!
//! let mut field = Field::new(config.width, config.height, config.channels);
//! Seed::default().apply(&mut field);
//!
//! let mut engine = StepEngine::new(config.width, config.height);
//! engine.step(&mut field, &config, 100);
//!
//! let snapshot = engine.analyze(&field, 0.01);
//! println!("mass after 100 steps: {}", snapshot.total_mass);
//! ```

pub mod compute;
pub mod schema;

// Re-export commonly used types
pub use compute::{AnalysisEngine, AnalysisSnapshot, EngineObserver, Field, StepEngine};
pub use schema::{EngineConfig, GrowthType, KernelConfig, KernelShape, Pattern, Seed};
