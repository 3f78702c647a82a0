//! The process instance is global, so everything touching it lives in one
//! test binary with a single test.

use std::sync::Arc;

use odex_compute::scheduler::instance::{get_instance, set_instance, shutdown_instance};
use odex_compute::{DebugScheduler, Scheduler};

struct Noop(i64);

impl odex_compute::Schedulable for Noop {
    fn user_id(&self) -> i64 {
        1
    }

    fn task_id(&self) -> i64 {
        self.0
    }

    fn do_work(&mut self) -> i32 {
        0
    }
}

#[test]
fn instance_can_be_replaced_and_torn_down() {
    assert!(!shutdown_instance());

    let debug: Arc<dyn Scheduler> = Arc::new(DebugScheduler::new());
    assert!(set_instance(Arc::clone(&debug)).is_none());

    let current = get_instance().unwrap();
    assert!(Arc::ptr_eq(&current, &debug));
    assert_eq!(current.targeted_worker_count(), 0);

    current.schedule(Box::new(Noop(1)));
    current.schedule(Box::new(Noop(2)));
    assert_eq!(debug.snapshot().pending_count(), 2);

    assert!(shutdown_instance());
    assert_eq!(debug.snapshot().pending_count(), 0);
    assert!(!shutdown_instance());

    // a fresh production instance is built on demand
    let built = get_instance().unwrap();
    assert!(built.targeted_worker_count() >= 1);
    assert!(Arc::ptr_eq(&built, &get_instance().unwrap()));
    assert!(shutdown_instance());
}
