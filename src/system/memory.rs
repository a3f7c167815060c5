use std::sync::Arc;

use parking_lot::Mutex;
use serde::Serialize;

use super::counters::CounterSource;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MemoryUsage {
    pub used_bytes: u64,
    pub total_bytes: u64,
}

impl MemoryUsage {
    pub fn usage_percent(&self) -> f64 {
        if self.total_bytes == 0 {
            return 0.0;
        }
        self.used_bytes as f64 / self.total_bytes as f64 * 100.0
    }
}

/// Instantaneous memory snapshot; nothing carries over between samples
/// except the cached last result.
pub struct MemoryEngine {
    source: Arc<dyn CounterSource>,
    latest: Mutex<MemoryUsage>,
}

impl MemoryEngine {
    pub fn new(source: Arc<dyn CounterSource>) -> Self {
        MemoryEngine {
            source,
            latest: Mutex::new(MemoryUsage::default()),
        }
    }

    /// Never fails: an unreadable physical size gives `0/0`, unreadable page
    /// counts give `0/total`.
    pub fn sample_memory(&self) -> MemoryUsage {
        let usage = self.read_usage();
        *self.latest.lock() = usage;
        usage
    }

    pub fn current_memory_usage(&self) -> MemoryUsage {
        *self.latest.lock()
    }

    fn read_usage(&self) -> MemoryUsage {
        let total_bytes = match self.source.read_total_physical_memory() {
            Ok(total) => total,
            Err(e) => {
                tracing::warn!(error = %e, "physical memory size unavailable");
                return MemoryUsage::default();
            }
        };
        let pages = match self.source.read_memory_page_counts() {
            Ok(pages) => pages,
            Err(e) => {
                tracing::warn!(error = %e, "vm page counts unavailable");
                return MemoryUsage {
                    used_bytes: 0,
                    total_bytes,
                };
            }
        };
        let used_bytes = pages.used_bytes().unwrap_or_else(|| {
            tracing::debug!(?pages, "reclaimable pages exceed resident pages, clamping to 0");
            0
        });
        MemoryUsage {
            used_bytes,
            total_bytes,
        }
    }
}
