//! Build Request Queue - FIFO of pending chunk builds
//!
//! At most one entry per chunk. A newer request for a chunk that is
//! already queued overwrites the pending detail index in place, keeping
//! its position, so the queue never grows past the number of distinct
//! chunks waiting for a build.

use std::collections::VecDeque;

use crate::core::types::ChunkIndex;
use crate::streaming::request::BuildRequest;

/// How a submission changed the queue
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum QueueAction {
    /// New entry at the back
    Appended,
    /// Existing entry updated in place
    Coalesced { previous_detail: u32 },
}

/// Coalescing FIFO of build requests
#[derive(Debug, Default)]
pub struct BuildQueue {
    entries: VecDeque<BuildRequest>,
}

impl BuildQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a request, coalescing with any pending entry for the same chunk
    pub fn submit(&mut self, request: BuildRequest) -> QueueAction {
        if let Some(entry) = self.entries.iter_mut().find(|e| e.chunk == request.chunk) {
            let previous_detail = entry.detail;
            entry.detail = request.detail;
            return QueueAction::Coalesced { previous_detail };
        }

        self.entries.push_back(request);
        QueueAction::Appended
    }

    /// Put a request back at the head, unless the chunk was re-queued meanwhile
    pub fn requeue_front(&mut self, request: BuildRequest) -> bool {
        if self.contains(request.chunk) {
            return false;
        }
        self.entries.push_front(request);
        true
    }

    /// Remove the first entry whose chunk is not blocked
    pub fn pop_next(&mut self, blocked: impl Fn(ChunkIndex) -> bool) -> Option<BuildRequest> {
        let pos = self.entries.iter().position(|e| !blocked(e.chunk))?;
        self.entries.remove(pos)
    }

    pub fn contains(&self, chunk: ChunkIndex) -> bool {
        self.entries.iter().any(|e| e.chunk == chunk)
    }

    /// Pending detail index for a chunk, if queued
    pub fn pending_detail(&self, chunk: ChunkIndex) -> Option<u32> {
        self.entries.iter().find(|e| e.chunk == chunk).map(|e| e.detail)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &BuildRequest> {
        self.entries.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::terrain::layout::ChunkGrid;
    use glam::Vec3;

    fn request(chunk: ChunkIndex, detail: u32) -> BuildRequest {
        let grid = ChunkGrid::new(400, 400, 100, Vec3::ZERO).unwrap();
        BuildRequest::new(*grid.region(chunk).unwrap(), detail)
    }

    #[test]
    fn test_fifo_order() {
        let mut queue = BuildQueue::new();
        assert_eq!(queue.submit(request(3, 0)), QueueAction::Appended);
        assert_eq!(queue.submit(request(1, 0)), QueueAction::Appended);
        assert_eq!(queue.submit(request(2, 0)), QueueAction::Appended);

        let order: Vec<_> = std::iter::from_fn(|| queue.pop_next(|_| false))
            .map(|r| r.chunk)
            .collect();
        assert_eq!(order, vec![3, 1, 2]);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_coalesce_keeps_position() {
        let mut queue = BuildQueue::new();
        queue.submit(request(5, 0));
        queue.submit(request(6, 0));

        assert_eq!(queue.submit(request(5, 2)), QueueAction::Coalesced { previous_detail: 0 });
        assert_eq!(queue.len(), 2);
        assert_eq!(queue.pending_detail(5), Some(2));

        let first = queue.pop_next(|_| false).unwrap();
        assert_eq!((first.chunk, first.detail), (5, 2));
    }

    #[test]
    fn test_length_bounded_by_distinct_chunks() {
        let mut queue = BuildQueue::new();
        for round in 0..10 {
            for chunk in 0..4 {
                queue.submit(request(chunk, round % 3));
            }
        }
        assert_eq!(queue.len(), 4);
    }

    #[test]
    fn test_pop_skips_blocked_chunks() {
        let mut queue = BuildQueue::new();
        queue.submit(request(1, 0));
        queue.submit(request(2, 0));
        queue.submit(request(3, 0));

        let next = queue.pop_next(|chunk| chunk == 1).unwrap();
        assert_eq!(next.chunk, 2);
        assert!(queue.contains(1));
        assert_eq!(queue.iter().map(|r| r.chunk).collect::<Vec<_>>(), vec![1, 3]);

        assert!(queue.pop_next(|_| true).is_none());
    }

    #[test]
    fn test_requeue_front() {
        let mut queue = BuildQueue::new();
        queue.submit(request(1, 0));

        assert!(queue.requeue_front(request(2, 1)));
        assert_eq!(queue.pop_next(|_| false).unwrap().chunk, 2);

        // A fresher entry for the chunk wins over the returned one
        assert!(!queue.requeue_front(request(1, 3)));
        assert_eq!(queue.pending_detail(1), Some(0));
    }
}
