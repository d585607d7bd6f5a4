use std::cell::{Cell, RefCell};

use futures::channel::oneshot;
use futures::executor::{LocalPool, LocalSpawner};
use futures::future::{FutureExt, LocalBoxFuture};
use futures::task::LocalSpawnExt;
use log::warn;

use crate::host::{Scheduler, TimerId, Viewport};

struct Pending {
    id: TimerId,
    due: f64,
    seq: u64,
    callback: Box<dyn FnOnce()>,
}

/// Virtual clock: time only moves through [`ManualScheduler::advance`].
///
/// Spawned tasks run on a single-threaded pool that is drained after every
/// spawn and after every fired timer.
pub struct ManualScheduler {
    now: Cell<f64>,
    next_seq: Cell<u64>,
    pending: RefCell<Vec<Pending>>,
    pool: RefCell<LocalPool>,
    spawner: LocalSpawner,
}

impl Default for ManualScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl ManualScheduler {
    pub fn new() -> Self {
        let pool = LocalPool::new();
        let spawner = pool.spawner();
        Self {
            now: Cell::new(0.0),
            next_seq: Cell::new(1),
            pending: RefCell::new(Vec::new()),
            pool: RefCell::new(pool),
            spawner,
        }
    }

    /// Moves the clock forward, firing due timers in order.
    pub fn advance(&self, ms: u32) {
        let target = self.now.get() + f64::from(ms);
        self.run_tasks();
        while let Some(timer) = self.pop_due(target) {
            if timer.due > self.now.get() {
                self.now.set(timer.due);
            }
            (timer.callback)();
            self.run_tasks();
        }
        self.now.set(target);
    }

    pub fn pending_timers(&self) -> usize {
        self.pending.borrow().len()
    }

    /// Polls spawned tasks until none can make progress.
    pub fn run_tasks(&self) {
        // Re-entrant calls happen when a running task spawns; the outer run picks the new task up.
        if let Ok(mut pool) = self.pool.try_borrow_mut() {
            pool.run_until_stalled();
        }
    }

    fn pop_due(&self, target: f64) -> Option<Pending> {
        let mut pending = self.pending.borrow_mut();
        let index = pending
            .iter()
            .enumerate()
            .filter(|(_, timer)| timer.due <= target)
            .min_by(|(_, a), (_, b)| a.due.total_cmp(&b.due).then(a.seq.cmp(&b.seq)))
            .map(|(index, _)| index)?;
        Some(pending.remove(index))
    }
}

impl Scheduler for ManualScheduler {
    fn now(&self) -> f64 {
        self.now.get()
    }

    fn set_timeout(&self, delay_ms: u32, callback: Box<dyn FnOnce()>) -> TimerId {
        let seq = self.next_seq.get();
        self.next_seq.set(seq + 1);
        let id = TimerId(seq);
        self.pending.borrow_mut().push(Pending {
            id,
            due: self.now.get() + f64::from(delay_ms),
            seq,
            callback,
        });
        id
    }

    fn clear_timeout(&self, id: TimerId) {
        self.pending.borrow_mut().retain(|timer| timer.id != id);
    }

    fn sleep(&self, delay_ms: u32) -> LocalBoxFuture<'static, ()> {
        let (done, wait) = oneshot::channel();
        self.set_timeout(
            delay_ms,
            Box::new(move || {
                let _ = done.send(());
            }),
        );
        async move {
            let _ = wait.await;
        }
        .boxed_local()
    }

    fn spawn(&self, task: LocalBoxFuture<'static, ()>) {
        if let Err(err) = self.spawner.spawn_local(task) {
            warn!("could not spawn task: {}", err);
            return;
        }
        self.run_tasks();
    }
}

/// Window stand-in that records scrolling and navigation.
#[derive(Debug)]
pub struct RecordingViewport {
    width: Cell<f64>,
    scroll_y: Cell<f64>,
    pathname: RefCell<String>,
    scrolls: RefCell<Vec<f64>>,
    hashes: RefCell<Vec<String>>,
    navigations: RefCell<Vec<String>>,
}

impl Default for RecordingViewport {
    fn default() -> Self {
        Self {
            width: Cell::new(1280.0),
            scroll_y: Cell::new(0.0),
            pathname: RefCell::new("/index.html".to_string()),
            scrolls: RefCell::new(Vec::new()),
            hashes: RefCell::new(Vec::new()),
            navigations: RefCell::new(Vec::new()),
        }
    }
}

impl RecordingViewport {
    pub fn set_width(&self, width: f64) {
        self.width.set(width);
    }

    pub fn set_scroll_y(&self, y: f64) {
        self.scroll_y.set(y);
    }

    pub fn set_pathname(&self, pathname: &str) {
        *self.pathname.borrow_mut() = pathname.to_string();
    }

    pub fn scrolls(&self) -> Vec<f64> {
        self.scrolls.borrow().clone()
    }

    pub fn hashes(&self) -> Vec<String> {
        self.hashes.borrow().clone()
    }

    pub fn navigations(&self) -> Vec<String> {
        self.navigations.borrow().clone()
    }
}

impl Viewport for RecordingViewport {
    fn inner_width(&self) -> f64 {
        self.width.get()
    }

    fn scroll_y(&self) -> f64 {
        self.scroll_y.get()
    }

    fn scroll_to(&self, top: f64) {
        self.scrolls.borrow_mut().push(top);
        self.scroll_y.set(top);
    }

    fn pathname(&self) -> String {
        self.pathname.borrow().clone()
    }

    fn push_hash(&self, hash: &str) {
        self.hashes.borrow_mut().push(hash.to_string());
    }

    fn navigate(&self, href: &str) {
        self.navigations.borrow_mut().push(href.to_string());
    }
}
