#![forbid(unsafe_code)]

pub mod model;
pub mod reachability;
pub mod time;

pub use time::Clock;
