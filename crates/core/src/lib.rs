//! Domain types and pure logic shared by every vidgen crate.
//!
//! Nothing in here performs I/O: presets, parameter validation, the job
//! state machine and time estimation are all deterministic functions so the
//! store, dispatcher and both gateways agree on the same rules.

pub mod config;
pub mod error;
pub mod estimation;
pub mod generation;
pub mod job;
pub mod preset;
pub mod types;
