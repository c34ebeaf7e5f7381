//! Deferred work on the logical clock
//!
//! Merged spawns, pending-set releases and the drop cooldown fire a fixed
//! delay after the frame that scheduled them. Each task carries the session
//! it was scheduled in; a reset starts a new session and stale tasks are
//! discarded when they come due.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use glam::Vec2;

use super::physics::BodyHandle;
use crate::ladder::Rank;

/// A deferred mutation
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Deferred {
    /// Spawn the output of a merge at the midpoint captured at merge time
    SpawnMerged { pos: Vec2, rank: Rank },
    /// Return merge inputs to the eligible pool
    ReleasePending { bodies: [BodyHandle; 2] },
    /// Allow the next drop
    EndDropCooldown,
}

#[derive(Debug, Clone)]
struct Scheduled {
    due: u64,
    seq: u64,
    session: u32,
    task: Deferred,
}

// Min-heap on (due, seq): earliest first, FIFO among equal due times
impl Ord for Scheduled {
    fn cmp(&self, other: &Self) -> Ordering {
        (other.due, other.seq).cmp(&(self.due, self.seq))
    }
}

impl PartialOrd for Scheduled {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Scheduled {
    fn eq(&self, other: &Self) -> bool {
        self.due == other.due && self.seq == other.seq
    }
}

impl Eq for Scheduled {}

/// Queue of deferred tasks for a single-threaded frame loop
#[derive(Debug, Default)]
pub struct Scheduler {
    queue: BinaryHeap<Scheduled>,
    next_seq: u64,
    session: u32,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Invalidate everything scheduled so far
    pub fn new_session(&mut self) {
        self.session = self.session.wrapping_add(1);
    }

    /// Run `task` at `now + delay_ms`
    pub fn schedule(&mut self, now: u64, delay_ms: u64, task: Deferred) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.queue.push(Scheduled {
            due: now + delay_ms,
            seq,
            session: self.session,
            task,
        });
    }

    /// Pop every task due at or before `now`, oldest first. Tasks from a
    /// previous session are dropped.
    pub fn take_due(&mut self, now: u64) -> Vec<Deferred> {
        let mut due = Vec::new();
        while self.queue.peek().is_some_and(|s| s.due <= now) {
            let Some(scheduled) = self.queue.pop() else {
                break;
            };
            if scheduled.session == self.session {
                due.push(scheduled.task);
            } else {
                log::trace!("dropping stale task {:?}", scheduled.task);
            }
        }
        due
    }

    /// Tasks still waiting (including stale ones)
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}
