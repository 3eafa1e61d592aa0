//! Weighted selection across the three priority lanes.
//!
//! High work is preferred, but after `streak_limit` consecutive High
//! dispatches a waiting Normal unit is taken instead, so Normal gets at
//! least one slot in every `streak_limit + 1` dispatches while both lanes
//! are busy. Low work only runs once both other lanes are empty.

use super::priority::{Priority, PriorityQueues};
use crate::executor::Task;

#[derive(Debug)]
pub(crate) struct Scheduler {
    high_streak: usize,
    streak_limit: usize,
}

impl Scheduler {
    pub fn new(streak_limit: usize) -> Self {
        debug_assert!(streak_limit > 0);
        Self {
            high_streak: 0,
            streak_limit,
        }
    }

    /// Lane the next dispatch should take from, updating the streak counter.
    ///
    /// Returns `None` when no lane holds eligible work; the caller is
    /// expected to park until the queues change.
    pub fn select(&mut self, queues: &PriorityQueues) -> Option<Priority> {
        let high = queues.has(Priority::High);
        let normal = queues.has(Priority::Normal);

        // A dispatch that finds High empty ends the current burst.
        if !high {
            self.high_streak = 0;
        }

        if high && !(normal && self.high_streak >= self.streak_limit) {
            // saturate: only the comparison against the limit matters
            self.high_streak = (self.high_streak + 1).min(self.streak_limit);
            return Some(Priority::High);
        }

        if normal {
            self.high_streak = 0;
            return Some(Priority::Normal);
        }

        if queues.has(Priority::Low) {
            return Some(Priority::Low);
        }

        None
    }

    /// Select and dequeue in one step.
    pub fn next(&mut self, queues: &mut PriorityQueues) -> Option<Task> {
        let lane = self.select(queues)?;
        queues.pop(lane)
    }

    #[cfg(test)]
    pub fn high_streak(&self) -> usize {
        self.high_streak
    }
}
