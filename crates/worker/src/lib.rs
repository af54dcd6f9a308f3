//! Bounded job dispatcher.
//!
//! A fixed pool of long-lived worker tasks drains a single FIFO queue of job
//! ids, moving each job through `processing` to `completed` or `failed` while
//! never running more than the configured number of engine invocations.

pub mod dispatcher;

pub use dispatcher::{DispatchError, Dispatcher, DispatcherConfig};
