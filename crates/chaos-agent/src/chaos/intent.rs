//! Intent — the one structured event every chaos operation emits before
//! acting (or, in a dry run, instead of acting).

use std::fmt;

use tracing::info;

use crate::docker::snapshot::ContainerSnapshot;

/// Event target, so subscribers can route or format intents separately.
pub const INTENT_TARGET: &str = "chaos_agent::intent";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Stop,
    Kill,
    Start,
    Rename,
    RemoveImage,
    RemoveContainer,
    Pause,
    Unpause,
    NetemStart,
    NetemStop,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Stop => "stop",
            Operation::Kill => "kill",
            Operation::Start => "start",
            Operation::Rename => "rename",
            Operation::RemoveImage => "rmi",
            Operation::RemoveContainer => "rm",
            Operation::Pause => "pause",
            Operation::Unpause => "unpause",
            Operation::NetemStart => "netem",
            Operation::NetemStop => "netem-stop",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct Intent<'a> {
    pub operation: Operation,
    pub target: &'a ContainerSnapshot,
    /// Human-readable parameters, e.g. `signal=SIGKILL` or the tc command.
    pub detail: String,
    pub dry_run: bool,
}

impl<'a> Intent<'a> {
    pub fn new(operation: Operation, target: &'a ContainerSnapshot, dry_run: bool) -> Self {
        Self {
            operation,
            target,
            detail: String::new(),
            dry_run,
        }
    }

    pub fn detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = detail.into();
        self
    }

    pub fn emit(&self) {
        info!(
            target: INTENT_TARGET,
            operation = %self.operation,
            container_id = %self.target.id,
            container_name = %self.target.name,
            snapshot_at = self.target.captured_at,
            detail = %self.detail,
            dry_run = self.dry_run,
            "chaos intent"
        );
    }
}
