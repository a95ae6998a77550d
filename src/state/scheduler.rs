//! Timer Scheduling
//!
//! The store never sleeps; it asks the host to run a task later. Hosts driven
//! by a frame loop use [`ManualScheduler`]; hosts running a tokio `LocalSet`
//! use [`TokioScheduler`].

use ahash::AHashMap;
use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::rc::Rc;
use std::time::Duration;
use tokio::task::JoinHandle;

/// Deferred task
pub type TimerTask = Box<dyn FnOnce()>;

/// Identifies a scheduled task for cancellation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerHandle(u64);

/// Host scheduling facility
pub trait Scheduler {
    fn schedule(&self, delay: Duration, task: TimerTask) -> TimerHandle;

    /// Cancel a pending task; no-op when it already ran
    fn cancel(&self, handle: TimerHandle);
}

#[derive(Default)]
struct ManualClock {
    now: Duration,
    next_id: u64,
    /// (due, id) keeps insertion order among equal due times
    pending: BTreeMap<(Duration, u64), TimerTask>,
}

/// Host-driven clock: tasks run from [`advance`](Self::advance)
#[derive(Clone, Default)]
pub struct ManualScheduler {
    clock: Rc<RefCell<ManualClock>>,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Elapsed time since creation
    pub fn now(&self) -> Duration {
        self.clock.borrow().now
    }

    pub fn pending(&self) -> usize {
        self.clock.borrow().pending.len()
    }

    /// Move the clock forward, running every task that falls due in order
    pub fn advance(&self, by: Duration) {
        let target = self.clock.borrow().now + by;
        loop {
            let task = {
                let mut clock = self.clock.borrow_mut();
                let next = clock.pending.first_key_value().map(|(&key, _)| key);
                match next {
                    Some(key) if key.0 <= target => {
                        clock.now = key.0;
                        clock.pending.remove(&key)
                    }
                    _ => None,
                }
            };
            match task {
                Some(task) => task(),
                None => break,
            }
        }
        self.clock.borrow_mut().now = target;
    }
}

impl Scheduler for ManualScheduler {
    fn schedule(&self, delay: Duration, task: TimerTask) -> TimerHandle {
        let mut clock = self.clock.borrow_mut();
        let id = clock.next_id;
        clock.next_id += 1;
        let due = clock.now + delay;
        clock.pending.insert((due, id), task);
        TimerHandle(id)
    }

    fn cancel(&self, handle: TimerHandle) {
        let removed = {
            let mut clock = self.clock.borrow_mut();
            let key = clock
                .pending
                .keys()
                .find(|(_, id)| *id == handle.0)
                .copied();
            key.and_then(|key| clock.pending.remove(&key))
        };
        drop(removed);
    }
}

/// Timers backed by `tokio::task::spawn_local`; must be used inside a `LocalSet`
#[derive(Default)]
pub struct TokioScheduler {
    next_id: Cell<u64>,
    tasks: RefCell<AHashMap<u64, JoinHandle<()>>>,
}

impl TokioScheduler {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Scheduler for TokioScheduler {
    fn schedule(&self, delay: Duration, task: TimerTask) -> TimerHandle {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        let handle = tokio::task::spawn_local(async move {
            tokio::time::sleep(delay).await;
            task();
        });
        let mut tasks = self.tasks.borrow_mut();
        tasks.retain(|_, handle| !handle.is_finished());
        tasks.insert(id, handle);
        TimerHandle(id)
    }

    fn cancel(&self, handle: TimerHandle) {
        if let Some(task) = self.tasks.borrow_mut().remove(&handle.0) {
            task.abort();
        }
    }
}
