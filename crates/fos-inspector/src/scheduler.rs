//! Deferred task scheduling
//!
//! The only suspension point of the inspector is the deferred batch flush.
//! Flushes are scheduled through [`Scheduler`] so the embedder decides which
//! event loop runs them.

use std::cell::{Cell, RefCell};
use std::collections::{HashSet, VecDeque};
use std::rc::Rc;
use std::time::Duration;

use smol::{LocalExecutor, Timer};

/// Deferred unit of work
pub type Task = Box<dyn FnOnce()>;

/// Handle of a scheduled task
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TaskHandle(u64);

/// Zero-delay deferred task scheduler
pub trait Scheduler {
    /// Run `task` once, after the current synchronous work. Never runs it
    /// from inside this call.
    fn schedule(&self, task: Task) -> TaskHandle;

    /// Drop a task that has not run yet; finished or unknown handles are
    /// ignored
    fn cancel(&self, handle: TaskHandle);
}

/// FIFO queue of deferred tasks, drained by the embedder
#[derive(Default)]
pub struct DeferredQueue {
    queue: RefCell<VecDeque<(TaskHandle, Task)>>,
    next: Cell<u64>,
}

impl DeferredQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Tasks waiting to run
    pub fn len(&self) -> usize {
        self.queue.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.borrow().is_empty()
    }

    /// Run the tasks queued before this call; tasks they schedule wait for
    /// the next round
    pub fn run_pending(&self) -> usize {
        let limit = TaskHandle(self.next.get());
        let mut ran = 0;
        loop {
            let next = {
                let mut queue = self.queue.borrow_mut();
                let ready = matches!(queue.front(), Some((handle, _)) if *handle < limit);
                if ready { queue.pop_front() } else { None }
            };
            let Some((_, task)) = next else {
                break;
            };
            task();
            ran += 1;
        }
        ran
    }

    /// Run rounds until nothing is queued
    pub fn run_until_idle(&self) -> usize {
        let mut total = 0;
        loop {
            let ran = self.run_pending();
            if ran == 0 {
                return total;
            }
            total += ran;
        }
    }
}

impl Scheduler for DeferredQueue {
    fn schedule(&self, task: Task) -> TaskHandle {
        let handle = TaskHandle(self.next.get());
        self.next.set(handle.0 + 1);
        self.queue.borrow_mut().push_back((handle, task));
        handle
    }

    fn cancel(&self, handle: TaskHandle) {
        self.queue.borrow_mut().retain(|(h, _)| *h != handle);
    }
}

impl std::fmt::Debug for DeferredQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeferredQueue")
            .field("queued", &self.len())
            .field("next", &self.next.get())
            .finish()
    }
}

/// Scheduler backed by a `smol` local executor and zero-delay timers
pub struct LocalExecutorScheduler {
    executor: Rc<LocalExecutor<'static>>,
    live: Rc<RefCell<HashSet<TaskHandle>>>,
    next: Cell<u64>,
}

impl LocalExecutorScheduler {
    pub fn new(executor: Rc<LocalExecutor<'static>>) -> Self {
        Self {
            executor,
            live: Rc::default(),
            next: Cell::new(0),
        }
    }

    /// Tasks scheduled and not yet run or cancelled
    pub fn pending(&self) -> usize {
        self.live.borrow().len()
    }
}

impl Scheduler for LocalExecutorScheduler {
    fn schedule(&self, task: Task) -> TaskHandle {
        let handle = TaskHandle(self.next.get());
        self.next.set(handle.0 + 1);
        self.live.borrow_mut().insert(handle);

        let live = self.live.clone();
        self.executor
            .spawn(async move {
                Timer::after(Duration::ZERO).await;
                let still_live = live.borrow_mut().remove(&handle);
                if still_live {
                    task();
                }
            })
            .detach();
        handle
    }

    fn cancel(&self, handle: TaskHandle) {
        self.live.borrow_mut().remove(&handle);
    }
}

impl std::fmt::Debug for LocalExecutorScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalExecutorScheduler")
            .field("pending", &self.pending())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn counter() -> (Rc<Cell<u32>>, impl Fn() -> Task) {
        let hits = Rc::new(Cell::new(0));
        let sink = hits.clone();
        let make = move || -> Task {
            let sink = sink.clone();
            Box::new(move || sink.set(sink.get() + 1))
        };
        (hits, make)
    }

    #[test]
    fn test_queue_defers_until_run() {
        let queue = DeferredQueue::new();
        let (hits, task) = counter();
        queue.schedule(task());
        queue.schedule(task());
        assert_eq!(hits.get(), 0);
        assert_eq!(queue.run_pending(), 2);
        assert_eq!(hits.get(), 2);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_queue_cancel() {
        let queue = DeferredQueue::new();
        let (hits, task) = counter();
        let first = queue.schedule(task());
        queue.schedule(task());
        queue.cancel(first);
        queue.cancel(first);
        assert_eq!(queue.run_until_idle(), 1);
        assert_eq!(hits.get(), 1);
    }

    #[test]
    fn test_tasks_scheduled_while_running_wait_a_round() {
        let queue = Rc::new(DeferredQueue::new());
        let (hits, task) = counter();
        let inner = queue.clone();
        let follow_up = task();
        queue.schedule(Box::new(move || {
            inner.schedule(follow_up);
        }));

        assert_eq!(queue.run_pending(), 1);
        assert_eq!(hits.get(), 0);
        assert_eq!(queue.len(), 1);
        assert_eq!(queue.run_until_idle(), 1);
        assert_eq!(hits.get(), 1);
    }

    #[test]
    fn test_local_executor_scheduler() {
        let executor = Rc::new(LocalExecutor::new());
        let scheduler = LocalExecutorScheduler::new(executor.clone());
        let (hits, task) = counter();

        let cancelled = scheduler.schedule(task());
        scheduler.schedule(task());
        scheduler.cancel(cancelled);
        assert_eq!(scheduler.pending(), 1);
        assert_eq!(hits.get(), 0);

        smol::block_on(executor.run(Timer::after(Duration::from_millis(50))));
        assert_eq!(hits.get(), 1);
        assert_eq!(scheduler.pending(), 0);
    }
}
