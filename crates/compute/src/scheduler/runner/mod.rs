//! Production scheduler -- user round-robin over a bounded worker pool.
//!
//! Split into focused submodules:
//! - `core`: shared state, constructor, `Scheduler` impl and teardown
//! - `dispatch`: the dispatcher thread selecting the next unit
//! - `main_context`: the single-threaded executor running all hooks

mod core;
mod dispatch;
mod main_context;

pub use self::core::UserRoundRobinScheduler;
