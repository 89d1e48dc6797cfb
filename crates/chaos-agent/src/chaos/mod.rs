pub mod engine;
pub mod error;
pub mod exec;
pub mod intent;
pub mod netem;
pub mod stop;

pub use engine::{ChaosEngine, NetemRequest};
pub use error::ChaosError;
pub use exec::ExecStrategy;
