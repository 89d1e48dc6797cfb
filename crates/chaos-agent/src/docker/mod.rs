//! Docker module — bollard-backed client, domain calls, container snapshots.

pub mod client;
pub mod container;
pub mod image;
pub mod shell;
pub mod snapshot;

pub use client::{DockerClient, DockerError};
pub use container::RemoveOptions;
pub use snapshot::ContainerSnapshot;
