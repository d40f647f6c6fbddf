//! Ingest queue
//!
//! Multi-producer, single-consumer FIFO. Producers never block beyond the
//! short critical section of a push; the consumer can park on the queue with
//! a bounded wait that a cancellation request interrupts immediately. Once
//! closed, the queue refuses every push so late records can be counted.

use std::collections::VecDeque;
use std::time::Duration;

use parking_lot::{Condvar, Mutex};

use crate::record::Record;

struct QueueState {
    records: VecDeque<Record>,
    cancelled: bool,
    closed: bool,
}

/// What the consumer finds when it polls the queue
#[derive(Debug)]
pub enum Dequeued {
    /// Oldest pending record
    Record(Record),
    /// Nothing pending, keep waiting
    Empty,
    /// Nothing pending and cancellation was requested
    Finished,
}

/// Pending records plus the cancellation flag the drain loop observes
pub struct IngestQueue {
    state: Mutex<QueueState>,
    available: Condvar,
}

impl IngestQueue {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(QueueState {
                records: VecDeque::new(),
                cancelled: false,
                closed: false,
            }),
            available: Condvar::new(),
        }
    }

    /// Append a record and wake the consumer
    ///
    /// Returns false, dropping the record, if the queue is closed.
    pub fn enqueue(&self, record: Record) -> bool {
        self.push(record, usize::MAX)
    }

    /// Like [`enqueue`](Self::enqueue), but also refuses the record when
    /// `limit` records are already pending
    pub fn enqueue_bounded(&self, record: Record, limit: usize) -> bool {
        self.push(record, limit)
    }

    fn push(&self, record: Record, limit: usize) -> bool {
        let mut state = self.state.lock();
        if state.closed || state.records.len() >= limit {
            return false;
        }
        state.records.push_back(record);
        drop(state);
        self.available.notify_one();
        true
    }

    /// Take the oldest pending record, if any
    pub fn dequeue(&self) -> Option<Record> {
        self.state.lock().records.pop_front()
    }

    /// Take the oldest record, or report whether the consumer should stop
    ///
    /// Emptiness and cancellation are checked under one lock, so a record
    /// queued before `cancel` is never left behind.
    pub fn poll(&self) -> Dequeued {
        let mut state = self.state.lock();
        match state.records.pop_front() {
            Some(record) => Dequeued::Record(record),
            None if state.cancelled => Dequeued::Finished,
            None => Dequeued::Empty,
        }
    }

    /// Number of records waiting
    pub fn len(&self) -> usize {
        self.state.lock().records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Ask the consumer to stop once the queue is empty
    pub fn cancel(&self) {
        self.state.lock().cancelled = true;
        self.available.notify_all();
    }

    pub fn is_cancelled(&self) -> bool {
        self.state.lock().cancelled
    }

    /// Park until a record arrives, cancellation is requested, or `timeout` passes
    ///
    /// Returns immediately if either condition already holds.
    pub fn wait_for_work(&self, timeout: Duration) {
        let mut state = self.state.lock();
        if state.cancelled || !state.records.is_empty() {
            return;
        }
        let _ = self.available.wait_for(&mut state, timeout);
    }

    /// Refuse all further pushes and drop everything still pending,
    /// returning how many records were lost
    pub fn close(&self) -> usize {
        let mut state = self.state.lock();
        state.closed = true;
        let count = state.records.len();
        state.records.clear();
        count
    }
}

impl Default for IngestQueue {
    fn default() -> Self {
        Self::new()
    }
}
