//! Thread-backed build workers
//!
//! Each slot is a named OS thread that owns a private copy of the height
//! field. Commands reach it over an unbounded tokio channel and replies
//! come back the same way, so the coordinating thread never blocks: it
//! drains replies with `try_recv` when the scheduler polls. A worker whose
//! reply channel closes without a shutdown has died and is reported as
//! faulted.

use std::thread::{self, JoinHandle};

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TryRecvError;

use crate::core::error::{ConfigError, WorkerError};
use crate::core::types::SlotId;
use crate::streaming::backend::{BuildBackend, WorkerEvent};
use crate::streaming::request::{BuildJob, JobResult};
use crate::terrain::height_field::{HeightEdit, HeightField};

/// Coordinator -> worker
#[derive(Debug)]
enum WorkerCommand {
    Build(BuildJob),
    SetHeight(HeightEdit),
    Shutdown,
}

/// Worker -> coordinator
#[derive(Debug)]
enum WorkerReply {
    Ready,
    Completed(JobResult),
}

struct WorkerHandle {
    command_tx: mpsc::UnboundedSender<WorkerCommand>,
    reply_rx: mpsc::UnboundedReceiver<WorkerReply>,
    thread: Option<JoinHandle<()>>,
    /// Fault already reported for this handle
    faulted: bool,
}

impl WorkerHandle {
    fn spawn(slot: SlotId, field: HeightField) -> Result<Self, WorkerError> {
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (reply_tx, reply_rx) = mpsc::unbounded_channel();

        let thread = thread::Builder::new()
            .name(format!("terrain-worker-{}", slot))
            .spawn(move || worker_loop(slot, field, command_rx, reply_tx))
            .map_err(|source| WorkerError::Spawn { slot, source })?;

        Ok(Self {
            command_tx,
            reply_rx,
            thread: Some(thread),
            faulted: false,
        })
    }

    /// Ask the thread to exit and wait for it
    fn shutdown(&mut self) {
        let _ = self.command_tx.send(WorkerCommand::Shutdown);
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                log::debug!("Worker thread had panicked before shutdown");
            }
        }
    }

    /// Let go of a dead worker without waiting on a thread that may still be unwinding
    fn discard(mut self) {
        if let Some(thread) = self.thread.take() {
            if thread.is_finished() {
                let _ = thread.join();
            }
        }
    }
}

fn worker_loop(
    slot: SlotId,
    mut field: HeightField,
    mut command_rx: mpsc::UnboundedReceiver<WorkerCommand>,
    reply_tx: mpsc::UnboundedSender<WorkerReply>,
) {
    log::debug!("Worker {} started", slot);
    if reply_tx.send(WorkerReply::Ready).is_err() {
        return;
    }

    while let Some(command) = command_rx.blocking_recv() {
        match command {
            WorkerCommand::Build(job) => {
                let result = JobResult::build(&job, &field);
                if reply_tx.send(WorkerReply::Completed(result)).is_err() {
                    break;
                }
            }
            WorkerCommand::SetHeight(edit) => {
                if let Err(e) = field.apply(edit) {
                    log::warn!("Worker {} ignored height edit: {}", slot, e);
                }
            }
            WorkerCommand::Shutdown => break,
        }
    }

    log::debug!("Worker {} stopped", slot);
}

/// Fixed pool of build threads, one per slot
pub struct WorkerPool {
    workers: Vec<WorkerHandle>,
    /// Authoritative heights, used to seed restarted workers
    field: HeightField,
}

impl WorkerPool {
    /// Spawn `count` workers, each with its own copy of `field`
    pub fn spawn(count: usize, field: &HeightField) -> crate::Result<Self> {
        if count == 0 {
            return Err(ConfigError::ZeroWorkers.into());
        }

        let mut workers = Vec::with_capacity(count);
        for slot in 0..count {
            workers.push(WorkerHandle::spawn(slot, field.clone())?);
        }

        log::info!(
            "Spawned {} terrain workers for a {}x{} height field",
            count,
            field.width(),
            field.depth()
        );

        Ok(Self {
            workers,
            field: field.clone(),
        })
    }

    /// The heights new workers start from
    pub fn field(&self) -> &HeightField {
        &self.field
    }
}

impl BuildBackend for WorkerPool {
    fn slot_count(&self) -> usize {
        self.workers.len()
    }

    fn dispatch(&mut self, slot: SlotId, job: BuildJob) -> Result<(), WorkerError> {
        let worker = self.workers.get(slot).ok_or(WorkerError::UnknownSlot(slot))?;
        worker
            .command_tx
            .send(WorkerCommand::Build(job))
            .map_err(|_| WorkerError::Disconnected(slot))
    }

    fn broadcast_height(&mut self, edit: HeightEdit) {
        if let Err(e) = self.field.apply(edit) {
            log::warn!("Height edit not applied: {}", e);
            return;
        }

        for (slot, worker) in self.workers.iter().enumerate() {
            // A dead worker picks the edit up from `field` when restarted
            if worker.command_tx.send(WorkerCommand::SetHeight(edit)).is_err() {
                log::debug!("Worker {} missed a height edit", slot);
            }
        }
    }

    fn poll_events(&mut self) -> Vec<WorkerEvent> {
        let mut events = Vec::new();

        for (slot, worker) in self.workers.iter_mut().enumerate() {
            loop {
                match worker.reply_rx.try_recv() {
                    Ok(WorkerReply::Ready) => events.push(WorkerEvent::Ready(slot)),
                    Ok(WorkerReply::Completed(result)) => {
                        events.push(WorkerEvent::Completed { slot, result });
                    }
                    Err(TryRecvError::Empty) => break,
                    Err(TryRecvError::Disconnected) => {
                        if !worker.faulted {
                            worker.faulted = true;
                            log::warn!("Worker {} disconnected", slot);
                            events.push(WorkerEvent::Faulted(slot));
                        }
                        break;
                    }
                }
            }
        }

        events
    }

    fn restart(&mut self, slot: SlotId) -> Result<(), WorkerError> {
        if slot >= self.workers.len() {
            return Err(WorkerError::UnknownSlot(slot));
        }

        let fresh = WorkerHandle::spawn(slot, self.field.clone())?;
        let old = std::mem::replace(&mut self.workers[slot], fresh);
        old.discard();
        Ok(())
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        for worker in &mut self.workers {
            worker.shutdown();
        }
    }
}
