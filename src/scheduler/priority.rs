use crate::executor::Task;
use std::collections::VecDeque;
use std::fmt;

/// Priority tier a unit of work is submitted under.
///
/// Ordered for selection (`High < Normal < Low`, most urgent first), but each
/// tier is stored in its own FIFO; there is no sorted structure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum Priority {
    High = 0,
    Normal = 1,
    Low = 2,
}

impl Priority {
    pub const ALL: [Priority; 3] = [Priority::High, Priority::Normal, Priority::Low];

    pub(crate) fn index(self) -> usize {
        self as usize
    }
}

impl Default for Priority {
    fn default() -> Self {
        Priority::Normal
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Priority::High => "high",
            Priority::Normal => "normal",
            Priority::Low => "low",
        };
        f.write_str(name)
    }
}

/// Three independent FIFO queues, one per [`Priority`].
///
/// Not synchronized on its own: the pool keeps it behind the same lock as
/// the lifecycle state and in-flight set.
#[derive(Debug, Default)]
pub(crate) struct PriorityQueues {
    lanes: [VecDeque<Task>; 3],
}

impl PriorityQueues {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, task: Task) {
        self.lanes[task.priority.index()].push_back(task);
    }

    pub fn pop(&mut self, priority: Priority) -> Option<Task> {
        self.lanes[priority.index()].pop_front()
    }

    pub fn has(&self, priority: Priority) -> bool {
        !self.lanes[priority.index()].is_empty()
    }

    pub fn len(&self, priority: Priority) -> usize {
        self.lanes[priority.index()].len()
    }

    pub fn total(&self) -> usize {
        self.lanes.iter().map(VecDeque::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.lanes.iter().all(VecDeque::is_empty)
    }
}
