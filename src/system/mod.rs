pub mod counters;
pub mod cpu;
pub mod host;
pub mod memory;
pub mod platform;
pub mod snapshot;
