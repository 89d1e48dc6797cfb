//! Filter module — container selection by name list or regex.

pub mod engine;

pub use engine::{ContainerFilter, FilterError};
