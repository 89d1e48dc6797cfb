//! Client module — the `DockerOps` seam and its live and fake implementations.

pub mod docker;
pub mod fake;
pub mod live;

pub use docker::DockerOps;
pub use fake::{FakeCall, FakeContainer, FakeDocker};
