//! Webhook gateway for workflow-automation tools.
//!
//! A thin, separately deployed translation layer in front of the vidgen
//! API: it expands preset shorthand, forwards submissions, reshapes status
//! for polling loops and hands out validated download URLs. It keeps no
//! state of its own.

pub mod config;
pub mod error;
pub mod handlers;
pub mod router;
pub mod state;
pub mod upstream;
