// ABOUTME: Composable capability traits for container runtimes.
// ABOUTME: Defines ContainerOps, ImageOps, NetworkOps, LogOps, EventOps, RuntimeInfo and the Runtime bundle.

mod container;
mod events;
mod image;
mod kind;
mod logs;
mod network;
mod runtime_info;
mod shared_types;

pub use container::{ContainerError, ContainerFilters, ContainerOps};
pub use events::{EventError, EventFilter, EventOps, EventStream, RuntimeEvent};
pub use image::{ImageError, ImageOps};
pub use kind::{Classify, ErrorKind};
pub use logs::{LogChunk, LogChunkStream, LogError, LogOps, LogOptions, LogStream};
pub use network::{NetworkError, NetworkOps};
pub use runtime_info::{RuntimeInfo, RuntimeInfoError};
pub use shared_types::*;

/// Every capability the gateway needs, as one object-safe bundle.
///
/// Implemented automatically for any type that implements all capability traits,
/// so the gateway can hold an `Arc<dyn Runtime>` without knowing the client library.
pub trait Runtime: ContainerOps + ImageOps + NetworkOps + LogOps + EventOps + RuntimeInfo {}

impl<T> Runtime for T where
    T: ContainerOps + ImageOps + NetworkOps + LogOps + EventOps + RuntimeInfo
{
}
