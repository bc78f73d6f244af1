//! Single-slot backend that builds on the calling thread
//!
//! Used when workers are disabled. The build runs inside `dispatch`, but
//! its result is only handed back on the next poll so the scheduler sees
//! the same event flow as with threaded workers.

use std::collections::VecDeque;

use crate::core::error::WorkerError;
use crate::core::types::SlotId;
use crate::streaming::backend::{BuildBackend, WorkerEvent};
use crate::streaming::request::{BuildJob, JobResult};
use crate::terrain::height_field::{HeightEdit, HeightField};

pub struct InlineBuilder {
    field: HeightField,
    events: VecDeque<WorkerEvent>,
}

impl InlineBuilder {
    pub fn new(field: HeightField) -> Self {
        let mut events = VecDeque::new();
        events.push_back(WorkerEvent::Ready(0));
        Self { field, events }
    }

    pub fn field(&self) -> &HeightField {
        &self.field
    }
}

impl BuildBackend for InlineBuilder {
    fn slot_count(&self) -> usize {
        1
    }

    fn dispatch(&mut self, slot: SlotId, job: BuildJob) -> Result<(), WorkerError> {
        if slot != 0 {
            return Err(WorkerError::UnknownSlot(slot));
        }

        let result = JobResult::build(&job, &self.field);
        self.events.push_back(WorkerEvent::Completed { slot, result });
        Ok(())
    }

    fn broadcast_height(&mut self, edit: HeightEdit) {
        if let Err(e) = self.field.apply(edit) {
            log::warn!("Height edit not applied: {}", e);
        }
    }

    fn poll_events(&mut self) -> Vec<WorkerEvent> {
        self.events.drain(..).collect()
    }

    fn restart(&mut self, slot: SlotId) -> Result<(), WorkerError> {
        if slot != 0 {
            return Err(WorkerError::UnknownSlot(slot));
        }
        self.events.push_back(WorkerEvent::Ready(0));
        Ok(())
    }
}
