//! Deterministic timer scheduler.
//!
//! The runtime is single-threaded and cooperative; all timers (debounce,
//! polling, visibility delays) live in one min-heap keyed by deadline
//! and are fired by `advance(ms)`. Embedders drive wall time; tests
//! drive virtual time. Entries are cancelled by id, which debounce uses
//! to realize trailing-edge semantics (reschedule = cancel + schedule).

use std::collections::{BinaryHeap, HashMap};

use uni_dom::NodeId;

/// Handle to a scheduled timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerId(u64);

/// What to do when a timer fires.
#[derive(Debug, Clone, PartialEq)]
pub enum TimerTask {
    /// Drain a component's action queue to the server.
    Flush { component_id: String },
    /// Fire a component's poll method.
    Poll { component_id: String },
    /// Fire a visibility-triggered method for one element.
    Visibility { component_id: String, node: NodeId },
}

#[derive(Debug)]
struct Entry {
    deadline: u64,
    seq: u64,
    id: TimerId,
}

impl PartialEq for Entry {
    fn eq(&self, other: &Self) -> bool {
        self.deadline == other.deadline && self.seq == other.seq
    }
}

impl Eq for Entry {}

impl PartialOrd for Entry {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Entry {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        // Min-heap: earlier deadlines first, insertion order breaking
        // ties.
        other
            .deadline
            .cmp(&self.deadline)
            .then(other.seq.cmp(&self.seq))
    }
}

/// Min-heap timer queue over virtual milliseconds.
#[derive(Debug, Default)]
pub struct Scheduler {
    now_ms: u64,
    next_id: u64,
    seq: u64,
    heap: BinaryHeap<Entry>,
    // Cancellation = removal from this map; stale heap entries are
    // skipped when popped.
    tasks: HashMap<TimerId, TimerTask>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current virtual time.
    pub fn now(&self) -> u64 {
        self.now_ms
    }

    /// Schedule `task` to fire `delay_ms` from now.
    pub fn schedule(&mut self, delay_ms: u64, task: TimerTask) -> TimerId {
        let id = TimerId(self.next_id);
        self.next_id += 1;
        self.seq += 1;
        self.heap.push(Entry {
            deadline: self.now_ms.saturating_add(delay_ms),
            seq: self.seq,
            id,
        });
        self.tasks.insert(id, task);
        id
    }

    /// Cancel a pending timer. Cancelling an already-fired id is a
    /// no-op.
    pub fn cancel(&mut self, id: TimerId) {
        self.tasks.remove(&id);
    }

    /// Whether a timer is still pending.
    pub fn is_pending(&self, id: TimerId) -> bool {
        self.tasks.contains_key(&id)
    }

    /// Advance virtual time by `ms`, returning every task whose
    /// deadline passed, in deadline order.
    pub fn advance(&mut self, ms: u64) -> Vec<TimerTask> {
        self.now_ms = self.now_ms.saturating_add(ms);
        let mut due = Vec::new();
        while let Some(top) = self.heap.peek() {
            if top.deadline > self.now_ms {
                break;
            }
            let entry = self.heap.pop().expect("peeked entry exists");
            if let Some(task) = self.tasks.remove(&entry.id) {
                due.push(task);
            }
        }
        due
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flush(id: &str) -> TimerTask {
        TimerTask::Flush { component_id: id.to_string() }
    }

    #[test]
    fn fires_in_deadline_order() {
        let mut s = Scheduler::new();
        s.schedule(200, flush("b"));
        s.schedule(100, flush("a"));

        assert_eq!(s.advance(150), vec![flush("a")]);
        assert_eq!(s.advance(100), vec![flush("b")]);
        assert!(s.advance(1000).is_empty());
    }

    #[test]
    fn cancelled_timers_never_fire() {
        let mut s = Scheduler::new();
        let id = s.schedule(100, flush("a"));
        s.cancel(id);
        assert!(s.advance(500).is_empty());
        assert!(!s.is_pending(id));
    }

    #[test]
    fn reschedule_realizes_trailing_edge_debounce() {
        let mut s = Scheduler::new();
        let mut pending = s.schedule(250, flush("c"));

        // Three triggers inside the window, each pushing the deadline
        // out; only the last survives.
        for _ in 0..3 {
            assert!(s.advance(100).is_empty());
            s.cancel(pending);
            pending = s.schedule(250, flush("c"));
        }
        assert!(s.advance(249).is_empty());
        assert_eq!(s.advance(1), vec![flush("c")]);
    }

    #[test]
    fn ties_break_by_insertion_order() {
        let mut s = Scheduler::new();
        s.schedule(100, flush("first"));
        s.schedule(100, flush("second"));
        assert_eq!(s.advance(100), vec![flush("first"), flush("second")]);
    }
}
