// src/control/mod.rs

pub mod pid;

pub use pid::{Pid, PidGains, DEFAULT_DT};
