// src/scheduler/mod.rs
pub mod time_interface;

pub use time_interface::{Clock, ManualClock, StdClock, elapsed_ms};
