#![forbid(unsafe_code)]

//! Single-threaded cooperative scheduler with a microtask queue and a
//! virtual-time timer queue.
//!
//! The two queues model the platform's task/microtask split:
//!
//! - **Microtasks** ([`Scheduler::defer`]) run whenever the queue is drained
//!   with [`Scheduler::flush`]. The runtime uses them to process pending
//!   re-renders "before paint".
//! - **Timers** ([`Scheduler::defer_after`]) fire only when virtual time
//!   moves via [`Scheduler::advance`] or [`Scheduler::tick`]. Coalescing
//!   windows and the store unmount delay live here, so a flush never
//!   collapses a batching window early.
//!
//! Time is virtual and owned by the scheduler (the `LabClock` approach):
//! tests advance it explicitly and get fully deterministic runs.
//!
//! # Invariants
//!
//! 1. Timers fire in `(due, arm-order)` order; ties never reorder.
//! 2. A timer armed during `advance` fires in the same call when its due
//!    time is within the advanced window.
//! 3. Microtasks scheduled by a timer callback run before the next timer.
//! 4. A cancelled timer never runs, even if already due.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::fmt;
use std::rc::Rc;

use web_time::Duration;

type Task = Box<dyn FnOnce()>;

/// Cancellation handle for a task armed with [`Scheduler::defer_after`].
///
/// Cloning shares the cancellation flag; cancelling any clone cancels the
/// task. Cancelling an already-fired or already-cancelled task is a no-op.
#[derive(Clone)]
pub struct TaskHandle {
    cancelled: Rc<Cell<bool>>,
}

impl TaskHandle {
    /// Prevent the task from running when it comes due.
    pub fn cancel(&self) {
        self.cancelled.set(true);
    }

    /// Whether the task has been cancelled.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.get()
    }
}

impl fmt::Debug for TaskHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskHandle")
            .field("cancelled", &self.cancelled.get())
            .finish()
    }
}

struct TimerEntry {
    due_us: u64,
    seq: u64,
    cancelled: Rc<Cell<bool>>,
    task: Option<Task>,
}

struct SchedulerInner {
    now_us: u64,
    next_seq: u64,
    microtasks: VecDeque<Task>,
    timers: Vec<TimerEntry>,
}

/// Shared handle to the thread's cooperative scheduler.
///
/// Cheap to clone; all clones drive the same queues and the same virtual
/// clock.
#[derive(Clone)]
pub struct Scheduler {
    inner: Rc<RefCell<SchedulerInner>>,
}

thread_local! {
    static CURRENT: RefCell<Option<Scheduler>> = const { RefCell::new(None) };
}

impl Scheduler {
    /// Create a fresh scheduler with an empty queue and time at zero.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Rc::new(RefCell::new(SchedulerInner {
                now_us: 0,
                next_seq: 0,
                microtasks: VecDeque::new(),
                timers: Vec::new(),
            })),
        }
    }

    /// The calling thread's scheduler, created lazily on first use.
    ///
    /// Stores capture this at construction; each test thread therefore owns
    /// an isolated clock and queue.
    #[must_use]
    pub fn current() -> Scheduler {
        CURRENT.with(|current| {
            let mut current = current.borrow_mut();
            current.get_or_insert_with(Scheduler::new).clone()
        })
    }

    /// Install this scheduler as the thread's current one.
    pub fn install(&self) {
        CURRENT.with(|current| {
            *current.borrow_mut() = Some(self.clone());
        });
    }

    /// Queue a microtask to run on the next [`flush`](Self::flush).
    pub fn defer(&self, task: impl FnOnce() + 'static) {
        self.inner.borrow_mut().microtasks.push_back(Box::new(task));
    }

    /// Arm a single-shot timer due after `delay` of virtual time.
    ///
    /// A `Duration::ZERO` delay models a zero-delay platform timeout: it
    /// fires on the next [`tick`](Self::tick) or [`advance`](Self::advance),
    /// never during a microtask flush.
    pub fn defer_after(&self, delay: Duration, task: impl FnOnce() + 'static) -> TaskHandle {
        let cancelled = Rc::new(Cell::new(false));
        let handle = TaskHandle {
            cancelled: Rc::clone(&cancelled),
        };
        let mut inner = self.inner.borrow_mut();
        let due_us = inner.now_us.saturating_add(duration_us(delay));
        let seq = inner.next_seq;
        inner.next_seq += 1;
        inner.timers.push(TimerEntry {
            due_us,
            seq,
            cancelled,
            task: Some(Box::new(task)),
        });
        handle
    }

    /// Drain the microtask queue, including tasks queued while draining.
    pub fn flush(&self) {
        loop {
            let task = self.inner.borrow_mut().microtasks.pop_front();
            match task {
                Some(task) => task(),
                None => break,
            }
        }
    }

    /// Advance virtual time by `delta`, firing every timer that comes due.
    ///
    /// Microtasks are flushed before each timer and once more at the end, so
    /// a re-render requested by a timer callback completes within the same
    /// `advance` call.
    pub fn advance(&self, delta: Duration) {
        let target = {
            let inner = self.inner.borrow();
            inner.now_us.saturating_add(duration_us(delta))
        };
        loop {
            self.flush();
            let task = {
                let mut inner = self.inner.borrow_mut();
                inner
                    .timers
                    .retain(|entry| !entry.cancelled.get() && entry.task.is_some());
                let next = inner
                    .timers
                    .iter()
                    .enumerate()
                    .filter(|(_, entry)| entry.due_us <= target)
                    .min_by_key(|(_, entry)| (entry.due_us, entry.seq))
                    .map(|(index, _)| index);
                match next {
                    Some(index) => {
                        let entry = inner.timers.remove(index);
                        inner.now_us = inner.now_us.max(entry.due_us);
                        entry.task
                    }
                    None => {
                        inner.now_us = target;
                        None
                    }
                }
            };
            match task {
                Some(task) => task(),
                None => break,
            }
        }
        self.flush();
    }

    /// Fire every timer already due, without moving the clock.
    ///
    /// The rendition of "let the event loop turn once": zero-delay timers
    /// armed earlier in this tick fire here.
    pub fn tick(&self) {
        self.advance(Duration::ZERO);
    }

    /// Current virtual time since the scheduler was created.
    #[must_use]
    pub fn now(&self) -> Duration {
        Duration::from_micros(self.inner.borrow().now_us)
    }

    /// Number of armed, not-yet-cancelled timers.
    #[must_use]
    pub fn timer_count(&self) -> usize {
        self.inner
            .borrow()
            .timers
            .iter()
            .filter(|entry| !entry.cancelled.get() && entry.task.is_some())
            .count()
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("Scheduler")
            .field("now_us", &inner.now_us)
            .field("microtasks", &inner.microtasks.len())
            .field("timers", &inner.timers.len())
            .finish()
    }
}

fn duration_us(duration: Duration) -> u64 {
    duration.as_micros().min(u128::from(u64::MAX)) as u64
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
