//! Boundary to the external video generation engine.
//!
//! The engine is opaque to the rest of the system: it is loaded once at
//! startup, then invoked with resolved [`GenerationParams`] and reports
//! fractional progress through a callback until it yields an output file or
//! a [`GenerationError`].
//!
//! [`GenerationParams`]: vidgen_core::generation::GenerationParams

pub mod command;
pub mod engine;
pub mod handle;
#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use command::{CommandEngine, CommandEngineConfig};
pub use engine::{GenerationEngine, GenerationError, ProgressFn};
pub use handle::EngineHandle;
