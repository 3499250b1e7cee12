#![warn(clippy::pedantic)]
//! Shared, I/O-free data model consumed by every provider adapter and by the
//! orchestration manager: the normalized [`event::Event`] type, the
//! tool-name normalizer and summary renderer (`tools`), and the model-name
//! mapper (`models`).

pub mod adapter;
pub mod event;
pub mod image;
pub mod models;
pub mod tools;

pub use adapter::{EventStream, ProviderAdapter, TurnOptions};
pub use tokio_util::sync::CancellationToken;
pub use event::{Event, EventKind, ProviderStatus, Role, SessionHandle};
pub use image::{ImageInput, ResolvedImage};
pub use models::resolve_model;
pub use tools::{normalize_tool_name, render_tool_summary, CanonicalTool};
