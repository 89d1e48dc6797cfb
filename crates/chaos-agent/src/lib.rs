// Domain-driven module structure for the chaos agent.

// Core infrastructure
pub mod docker;
pub mod client;
pub mod filter;

// Domain modules
pub mod chaos;
pub mod conf;
pub mod runtime;
