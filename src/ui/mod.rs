//! Consumers of the metrics core: the status line and detail notifications.

pub mod detail;
pub mod notify;
pub mod statusbar;
