//! Admin live-monitoring controller.

pub mod monitor;

pub use monitor::{
    AdminMonitor, RowSnapshot, DEFAULT_POLL_INTERVAL, MAX_RECENT_SUBMISSIONS,
};
