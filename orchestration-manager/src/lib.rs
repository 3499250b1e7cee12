#![warn(clippy::pedantic)]
//! The concurrent orchestration core (spec.md §4.5): binds the adapter
//! registry, the `Store`, and the `Broadcaster` together and drives
//! individual provider turns to completion.

pub mod broadcaster;
pub mod manager;
pub mod outcome;
pub mod registry;

pub use broadcaster::{Broadcaster, LoggingBroadcaster};
pub use manager::Manager;
pub use outcome::{ExecuteOptions, TurnOutcome};
pub use provider_model::CancellationToken;
pub use registry::AdapterRegistry;
