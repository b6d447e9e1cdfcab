//! Shared helper types used across CloudBox crates.

pub mod clock;
pub mod keyed_lock;

pub use clock::{Clock, ManualClock, SystemClock};
pub use keyed_lock::KeyedLocks;
