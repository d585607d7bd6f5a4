use std::cell::Cell;
use std::rc::Rc;

use crate::host::{Scheduler, TimerId};

pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#039;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

/// Id of the in-page target of a hash link, `None` for `#`, `#!` and hrefs without a hash.
pub fn hash_target(href: &str) -> Option<&str> {
    let hash = &href[href.find('#')?..];
    match &hash[1..] {
        "" | "!" => None,
        id => Some(id),
    }
}

/// Runs the latest call once no new call arrived for `delay_ms`.
pub struct Debouncer {
    scheduler: Rc<dyn Scheduler>,
    delay_ms: u32,
    pending: Rc<Cell<Option<TimerId>>>,
}

impl Debouncer {
    pub fn new(scheduler: Rc<dyn Scheduler>, delay_ms: u32) -> Self {
        Self {
            scheduler,
            delay_ms,
            pending: Rc::new(Cell::new(None)),
        }
    }

    pub fn call(&self, callback: Box<dyn FnOnce()>) {
        if let Some(previous) = self.pending.take() {
            self.scheduler.clear_timeout(previous);
        }
        let slot = Rc::clone(&self.pending);
        let id = self.scheduler.set_timeout(
            self.delay_ms,
            Box::new(move || {
                slot.set(None);
                callback();
            }),
        );
        self.pending.set(Some(id));
    }
}

/// Admits at most one call per interval.
#[derive(Debug)]
pub struct Throttle {
    interval_ms: f64,
    last: Cell<Option<f64>>,
}

impl Throttle {
    pub fn new(interval_ms: u32) -> Self {
        Self {
            interval_ms: f64::from(interval_ms),
            last: Cell::new(None),
        }
    }

    pub fn ready(&self, now: f64) -> bool {
        match self.last.get() {
            Some(last) if now - last < self.interval_ms => false,
            _ => {
                self.last.set(Some(now));
                true
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use futures::future::LocalBoxFuture;

    use super::*;
    use crate::headless::ManualScheduler;

    /// Records which timers get cleared.
    struct ClearLog {
        clock: ManualScheduler,
        cleared: RefCell<Vec<TimerId>>,
    }

    impl Scheduler for ClearLog {
        fn now(&self) -> f64 {
            self.clock.now()
        }

        fn set_timeout(&self, delay_ms: u32, callback: Box<dyn FnOnce()>) -> TimerId {
            self.clock.set_timeout(delay_ms, callback)
        }

        fn clear_timeout(&self, id: TimerId) {
            self.cleared.borrow_mut().push(id);
            self.clock.clear_timeout(id);
        }

        fn sleep(&self, delay_ms: u32) -> LocalBoxFuture<'static, ()> {
            self.clock.sleep(delay_ms)
        }

        fn spawn(&self, task: LocalBoxFuture<'static, ()>) {
            self.clock.spawn(task)
        }
    }

    #[test]
    fn debouncer_only_clears_timers_still_pending() {
        let log = Rc::new(ClearLog {
            clock: ManualScheduler::new(),
            cleared: RefCell::new(Vec::new()),
        });
        let runs = Rc::new(Cell::new(0));
        let debouncer = Debouncer::new(log.clone() as Rc<dyn Scheduler>, 300);
        let call = |debouncer: &Debouncer| {
            let runs = Rc::clone(&runs);
            debouncer.call(Box::new(move || runs.set(runs.get() + 1)));
        };

        call(&debouncer);
        log.clock.advance(100);
        call(&debouncer);
        assert_eq!(log.cleared.borrow().len(), 1);

        log.clock.advance(300);
        assert_eq!(runs.get(), 1);
        call(&debouncer);
        assert_eq!(log.cleared.borrow().len(), 1);
        log.clock.advance(300);
        assert_eq!(runs.get(), 2);
        assert_eq!(log.clock.pending_timers(), 0);
    }

    #[test]
    fn escapes_markup_characters() {
        assert_eq!(
            escape_html(r#"<img src="x" onerror='go()'> & more"#),
            "&lt;img src=&quot;x&quot; onerror=&#039;go()&#039;&gt; &amp; more"
        );
        assert_eq!(escape_html("Grüße"), "Grüße");
    }

    #[test]
    fn hash_targets() {
        assert_eq!(hash_target("#kontakt"), Some("kontakt"));
        assert_eq!(hash_target("/index.html#leistungen"), Some("leistungen"));
        assert_eq!(hash_target("#"), None);
        assert_eq!(hash_target("#!"), None);
        assert_eq!(hash_target("/about.html"), None);
    }

    #[test]
    fn throttle_admits_one_call_per_interval() {
        let throttle = Throttle::new(200);
        assert!(throttle.ready(0.0));
        assert!(!throttle.ready(150.0));
        assert!(throttle.ready(200.0));
        assert!(!throttle.ready(399.0));
        assert!(throttle.ready(1000.0));
    }
}
