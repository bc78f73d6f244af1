//! Per-slot worker state, transitioned only by the scheduler.

use crate::core::types::{ChunkIndex, JobId};
use crate::streaming::request::BuildJob;

/// Summary of the job a slot is executing
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct InFlight {
    pub job: JobId,
    pub chunk: ChunkIndex,
    pub detail: u32,
    pub sequence: u64,
}

impl From<&BuildJob> for InFlight {
    fn from(job: &BuildJob) -> Self {
        Self {
            job: job.id,
            chunk: job.chunk(),
            detail: job.detail(),
            sequence: job.sequence,
        }
    }
}

/// State of one worker execution slot
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SlotState {
    /// Spawned or restarted, waiting for its ready signal
    #[default]
    Starting,
    /// Ready for a job
    Idle,
    /// Executing a job
    Busy(InFlight),
    /// Died and could not be restarted
    Faulted,
}

impl SlotState {
    pub fn is_idle(&self) -> bool {
        matches!(self, SlotState::Idle)
    }

    pub fn is_busy(&self) -> bool {
        matches!(self, SlotState::Busy(_))
    }

    pub fn in_flight(&self) -> Option<&InFlight> {
        match self {
            SlotState::Busy(job) => Some(job),
            _ => None,
        }
    }
}
