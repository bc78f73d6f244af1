//! Chunk build scheduler
//!
//! Keeps a fixed set of worker slots busy with mesh builds while holding
//! two guarantees:
//! - at most one queued request per chunk (newer requests coalesce into it)
//! - at most one dispatched job per chunk
//!
//! All state lives on the coordinating thread. Workers are reached only
//! through a [`BuildBackend`], and their replies are processed in
//! [`ChunkScheduler::pump`].

use std::collections::HashMap;

use crate::core::types::{ChunkIndex, JobId, SlotId};
use crate::streaming::backend::{BuildBackend, WorkerEvent};
use crate::streaming::request::{BuildJob, BuildRequest, JobOutcome, JobResult};
use crate::streaming::request_queue::{BuildQueue, QueueAction};
use crate::streaming::slot::{InFlight, SlotState};
use crate::terrain::height_field::HeightEdit;

/// Running totals for the scheduler
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SchedulerStats {
    /// Requests passed to `submit`
    pub submitted: u64,
    /// Requests folded into an already queued entry
    pub coalesced: u64,
    /// Jobs handed to a worker
    pub dispatched: u64,
    /// Jobs that returned a mesh
    pub completed: u64,
    /// Jobs the builder rejected
    pub failed: u64,
    /// Jobs lost to worker faults
    pub lost: u64,
    /// Worker faults observed
    pub faults: u64,
    /// Successful worker restarts
    pub restarts: u64,
}

/// Dispatches coalesced build requests to a fixed pool of worker slots
pub struct ChunkScheduler<B: BuildBackend> {
    backend: B,
    queue: BuildQueue,
    slots: Vec<SlotState>,
    /// Chunks with a dispatched job, and the slot running it
    busy_chunks: HashMap<ChunkIndex, SlotId>,
    /// Last dispatch sequence handed out per chunk
    sequences: HashMap<ChunkIndex, u64>,
    next_job: JobId,
    stats: SchedulerStats,
}

impl<B: BuildBackend> ChunkScheduler<B> {
    /// Wrap a backend. Slots start in `Starting` until they report ready.
    pub fn new(backend: B) -> Self {
        let slots = vec![SlotState::Starting; backend.slot_count()];
        Self {
            backend,
            queue: BuildQueue::new(),
            slots,
            busy_chunks: HashMap::new(),
            sequences: HashMap::new(),
            next_job: 0,
            stats: SchedulerStats::default(),
        }
    }

    /// Queue a build, coalescing with a pending request for the same chunk,
    /// then hand work to any idle slot.
    pub fn submit(&mut self, request: BuildRequest) -> QueueAction {
        self.stats.submitted += 1;

        let action = self.queue.submit(request);
        match action {
            QueueAction::Appended => {
                log::trace!("Queued chunk {} at detail {}", request.chunk, request.detail);
            }
            QueueAction::Coalesced { previous_detail } => {
                self.stats.coalesced += 1;
                log::debug!(
                    "Coalesced chunk {} request: detail {} -> {}",
                    request.chunk,
                    previous_detail,
                    request.detail
                );
            }
        }

        self.assign_idle_slots();
        action
    }

    /// Mark a slot ready and give it the next eligible request.
    ///
    /// A slot that reports ready while still holding a job has dropped it;
    /// that job comes back as a `Lost` result for its chunk.
    pub fn on_worker_ready(&mut self, slot: SlotId) -> Option<JobResult> {
        let Some(state) = self.slots.get(slot).copied() else {
            log::warn!("Ready signal from unknown worker slot {}", slot);
            return None;
        };

        let lost = state.in_flight().map(|job| {
            log::warn!("Worker {} became ready while running job {}", slot, job.job);
            self.lose(*job)
        });

        self.slots[slot] = SlotState::Idle;
        self.dispatch_next(slot);
        lost
    }

    /// Record a finished job, free its slot, and return the result for delivery
    pub fn on_job_complete(&mut self, slot: SlotId, result: JobResult) -> JobResult {
        let expected = matches!(
            self.slots.get(slot),
            Some(SlotState::Busy(job)) if job.job == result.job
        );

        match &result.outcome {
            JobOutcome::Built(_) => self.stats.completed += 1,
            JobOutcome::Failed(e) => {
                self.stats.failed += 1;
                log::warn!("Build failed for chunk {}: {}", result.chunk, e);
            }
            JobOutcome::Lost => self.stats.lost += 1,
        }

        if expected {
            self.busy_chunks.remove(&result.chunk);
            self.slots[slot] = SlotState::Idle;
            self.dispatch_next(slot);
        } else {
            log::warn!(
                "Worker {} reported job {} it was not assigned; delivering without slot update",
                slot,
                result.job
            );
        }

        result
    }

    /// Handle a slot that stopped responding.
    ///
    /// Returns a `Lost` result for the job it held, if any, and restarts the slot.
    pub fn on_worker_fault(&mut self, slot: SlotId) -> Option<JobResult> {
        let state = *self.slots.get(slot)?;
        self.stats.faults += 1;

        let lost = state.in_flight().map(|job| {
            log::warn!(
                "Worker {} faulted while building chunk {} (job {})",
                slot,
                job.chunk,
                job.job
            );
            self.lose(*job)
        });

        self.restart_slot(slot);
        lost
    }

    /// Process every pending worker event, returning results to deliver to chunks
    pub fn pump(&mut self) -> Vec<JobResult> {
        let mut results = Vec::new();

        for event in self.backend.poll_events() {
            match event {
                WorkerEvent::Ready(slot) => results.extend(self.on_worker_ready(slot)),
                WorkerEvent::Completed { slot, result } => {
                    results.push(self.on_job_complete(slot, result));
                }
                WorkerEvent::Faulted(slot) => results.extend(self.on_worker_fault(slot)),
            }
        }

        results
    }

    /// Forward a height edit to every worker snapshot
    pub fn broadcast_height(&mut self, edit: HeightEdit) {
        self.backend.broadcast_height(edit);
    }

    /// Release a dispatched job that will never report, as a `Lost` result
    fn lose(&mut self, job: InFlight) -> JobResult {
        self.busy_chunks.remove(&job.chunk);
        self.stats.lost += 1;
        JobResult {
            job: job.job,
            chunk: job.chunk,
            detail: job.detail,
            sequence: job.sequence,
            outcome: JobOutcome::Lost,
        }
    }

    fn assign_idle_slots(&mut self) {
        for slot in 0..self.slots.len() {
            if self.queue.is_empty() {
                break;
            }
            if self.slots[slot].is_idle() {
                self.dispatch_next(slot);
            }
        }
    }

    fn dispatch_next(&mut self, slot: SlotId) {
        let busy = &self.busy_chunks;
        let Some(request) = self.queue.pop_next(|chunk| busy.contains_key(&chunk)) else {
            return;
        };

        let sequence = self.sequences.entry(request.chunk).or_insert(0);
        *sequence += 1;
        self.next_job += 1;

        let job = BuildJob {
            id: self.next_job,
            sequence: *sequence,
            request,
        };

        match self.backend.dispatch(slot, job) {
            Ok(()) => {
                log::trace!(
                    "Dispatched job {} (chunk {}, detail {}, seq {}) to worker {}",
                    job.id,
                    job.chunk(),
                    job.detail(),
                    job.sequence,
                    slot
                );
                self.slots[slot] = SlotState::Busy(InFlight::from(&job));
                self.busy_chunks.insert(job.chunk(), slot);
                self.stats.dispatched += 1;
            }
            Err(e) => {
                log::warn!("Dispatch to worker {} failed: {}", slot, e);
                self.queue.requeue_front(request);
                self.stats.faults += 1;
                self.restart_slot(slot);
            }
        }
    }

    fn restart_slot(&mut self, slot: SlotId) {
        match self.backend.restart(slot) {
            Ok(()) => {
                self.stats.restarts += 1;
                self.slots[slot] = SlotState::Starting;
                log::info!("Restarted worker {}", slot);
            }
            Err(e) => {
                self.slots[slot] = SlotState::Faulted;
                log::error!("Worker {} could not be restarted: {}", slot, e);
            }
        }
    }

    pub fn slot_states(&self) -> &[SlotState] {
        &self.slots
    }

    /// Number of jobs currently dispatched
    pub fn in_flight(&self) -> usize {
        self.busy_chunks.len()
    }

    /// Number of requests waiting for a slot
    pub fn queued(&self) -> usize {
        self.queue.len()
    }

    pub fn is_in_flight(&self, chunk: ChunkIndex) -> bool {
        self.busy_chunks.contains_key(&chunk)
    }

    pub fn is_queued(&self, chunk: ChunkIndex) -> bool {
        self.queue.contains(chunk)
    }

    /// No queued requests and no dispatched jobs
    pub fn is_idle(&self) -> bool {
        self.queue.is_empty() && self.busy_chunks.is_empty()
    }

    pub fn stats(&self) -> &SchedulerStats {
        &self.stats
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }
}
