use std::fmt;

use serde::Serialize;

/// Where a pipeline run stands.
///
/// Variants are declared in run order; a run only ever moves forward, and
/// `Failed` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineState {
    Idle,
    Snapshotted,
    Normalized,
    FeaturesMarked,
    Solved,
    Polished,
    Shaded,
    Done,
    Failed,
}

impl PipelineState {
    pub fn is_terminal(self) -> bool {
        matches!(self, PipelineState::Done | PipelineState::Failed)
    }

    /// Whether moving from `self` to `next` is a legal transition
    pub fn can_advance_to(self, next: PipelineState) -> bool {
        if self.is_terminal() {
            return false;
        }
        next == PipelineState::Failed || next > self
    }

    /// Stages that a run may skip depending on settings
    pub fn is_optional(self) -> bool {
        matches!(self, PipelineState::FeaturesMarked | PipelineState::Polished)
    }
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PipelineState::Idle => "idle",
            PipelineState::Snapshotted => "snapshot",
            PipelineState::Normalized => "normalize",
            PipelineState::FeaturesMarked => "feature marking",
            PipelineState::Solved => "quad solve",
            PipelineState::Polished => "flow polish",
            PipelineState::Shaded => "shading",
            PipelineState::Done => "done",
            PipelineState::Failed => "failed",
        };
        f.write_str(name)
    }
}
