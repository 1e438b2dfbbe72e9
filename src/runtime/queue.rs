//! FIFO of work deferred until the current event cycle unwinds.

use std::cell::RefCell;
use std::collections::VecDeque;

pub(crate) type Task = Box<dyn FnOnce()>;

#[derive(Default)]
pub(crate) struct ExecutionQueue {
    tasks: RefCell<VecDeque<Task>>,
}

impl ExecutionQueue {
    pub(crate) fn push(&self, task: Task) {
        self.tasks.borrow_mut().push_back(task);
    }

    /// Pops the oldest task. The borrow is released before the task runs,
    /// so tasks may push more work.
    pub(crate) fn pop(&self) -> Option<Task> {
        self.tasks.borrow_mut().pop_front()
    }
}
