//! Deferred work that must run after the host flushes pending updates.
//!
//! A content swap is only reflected in the editor's size once the host has
//! processed it, so follow-up work (selection restore) is queued here and run
//! by the host at its next flush/render point.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

/// A deferred task.
pub type Task = Box<dyn FnOnce()>;

/// Runs tasks after the host's next flush.
pub trait Scheduler {
    fn after_flush(&self, task: Task);
}

/// Queue of tasks drained by `flush`.
///
/// Cloning shares the queue. Tasks queued while a flush is running wait for
/// the following flush.
#[derive(Clone, Default)]
pub struct FlushQueue {
    tasks: Rc<RefCell<VecDeque<Task>>>,
}

impl FlushQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue `task`.
    pub fn defer(&self, task: impl FnOnce() + 'static) {
        self.tasks.borrow_mut().push_back(Box::new(task));
    }

    /// Run everything queued before this call. Returns how many tasks ran.
    pub fn flush(&self) -> usize {
        let batch = std::mem::take(&mut *self.tasks.borrow_mut());
        let ran = batch.len();
        for task in batch {
            task();
        }
        ran
    }

    pub fn pending(&self) -> usize {
        self.tasks.borrow().len()
    }
}

impl Scheduler for FlushQueue {
    fn after_flush(&self, task: Task) {
        self.tasks.borrow_mut().push_back(task);
    }
}

impl std::fmt::Debug for FlushQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FlushQueue")
            .field("pending", &self.pending())
            .finish()
    }
}
