//! Runtime module — process lifecycle: boot, then one chaos run.

pub mod boot;
pub mod run;
