//! Chunk build scheduling across worker slots

pub mod request;
pub mod request_queue;
pub mod slot;
pub mod backend;
pub mod scheduler;
pub mod worker_pool;
pub mod inline;

pub use request::{BuildRequest, BuildJob, JobOutcome, JobResult};
pub use request_queue::{BuildQueue, QueueAction};
pub use slot::{InFlight, SlotState};
pub use backend::{BuildBackend, WorkerEvent};
pub use scheduler::{ChunkScheduler, SchedulerStats};
pub use worker_pool::WorkerPool;
pub use inline::InlineBuilder;
