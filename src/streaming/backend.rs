//! Execution backends for mesh builds
//!
//! The scheduler owns all bookkeeping and talks to its execution units only
//! through this trait: jobs and height edits go out, [`WorkerEvent`]s come
//! back when the scheduler polls. Nothing here blocks the caller.

use crate::core::error::WorkerError;
use crate::core::types::SlotId;
use crate::streaming::request::{BuildJob, JobResult};
use crate::terrain::height_field::HeightEdit;

/// Message from a worker slot to the scheduler
#[derive(Debug)]
pub enum WorkerEvent {
    /// Slot finished starting up and can take a job
    Ready(SlotId),
    /// Slot finished a job (the slot is ready again afterwards)
    Completed { slot: SlotId, result: JobResult },
    /// Slot stopped responding; any job it held is lost
    Faulted(SlotId),
}

/// A fixed set of execution slots that build meshes
pub trait BuildBackend {
    /// Number of execution slots
    fn slot_count(&self) -> usize;

    /// Hand a job to a slot the scheduler believes is idle
    fn dispatch(&mut self, slot: SlotId, job: BuildJob) -> Result<(), WorkerError>;

    /// Apply a height edit to every slot's snapshot
    fn broadcast_height(&mut self, edit: HeightEdit);

    /// Drain events that arrived since the last poll, without blocking
    fn poll_events(&mut self) -> Vec<WorkerEvent>;

    /// Replace a faulted slot with a fresh one holding the current heights
    fn restart(&mut self, slot: SlotId) -> Result<(), WorkerError>;
}

impl<B: BuildBackend + ?Sized> BuildBackend for Box<B> {
    fn slot_count(&self) -> usize {
        (**self).slot_count()
    }

    fn dispatch(&mut self, slot: SlotId, job: BuildJob) -> Result<(), WorkerError> {
        (**self).dispatch(slot, job)
    }

    fn broadcast_height(&mut self, edit: HeightEdit) {
        (**self).broadcast_height(edit)
    }

    fn poll_events(&mut self) -> Vec<WorkerEvent> {
        (**self).poll_events()
    }

    fn restart(&mut self, slot: SlotId) -> Result<(), WorkerError> {
        (**self).restart(slot)
    }
}
