use thiserror::Error;

/// Cumulative tick counts for one CPU scope (whole system or a single core).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RawCpuSample {
    pub user: u64,
    pub system: u64,
    pub idle: u64,
    pub nice: u64,
}

impl RawCpuSample {
    pub fn new(user: u64, system: u64, idle: u64, nice: u64) -> Self {
        Self {
            user,
            system,
            idle,
            nice,
        }
    }

    /// Field-wise delta against `previous`. A field that went backwards is
    /// treated as a counter reset, so its delta is the current value.
    pub fn delta_since(&self, previous: &RawCpuSample) -> RawCpuSample {
        RawCpuSample {
            user: counter_delta(self.user, previous.user),
            system: counter_delta(self.system, previous.system),
            idle: counter_delta(self.idle, previous.idle),
            nice: counter_delta(self.nice, previous.nice),
        }
    }

    pub fn busy(&self) -> u64 {
        self.user
            .saturating_add(self.system)
            .saturating_add(self.nice)
    }

    pub fn total(&self) -> u64 {
        self.busy().saturating_add(self.idle)
    }
}

fn counter_delta(current: u64, previous: u64) -> u64 {
    if current >= previous {
        current - previous
    } else {
        current
    }
}

/// Page-granular VM counters plus the host page size.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RawMemorySample {
    pub active: u64,
    pub wired: u64,
    pub speculative: u64,
    pub inactive: u64,
    pub compressed: u64,
    pub purgeable: u64,
    pub external: u64,
    pub page_size: u64,
}

impl RawMemorySample {
    /// Used bytes, or `None` when the reclaimable pages exceed the resident ones.
    pub fn used_bytes(&self) -> Option<u64> {
        let resident = self
            .active
            .saturating_add(self.wired)
            .saturating_add(self.speculative)
            .saturating_add(self.inactive)
            .saturating_add(self.compressed);
        let reclaimable = self.purgeable.saturating_add(self.external);
        resident
            .checked_sub(reclaimable)
            .map(|pages| pages.saturating_mul(self.page_size))
    }
}

#[derive(Debug, Error)]
pub enum CounterError {
    #[error("{call} failed with kernel return code {code}")]
    Kernel { call: &'static str, code: i32 },
    #[error("failed to read {path}: {source}")]
    Io {
        path: &'static str,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed counter data in {path}: {detail}")]
    Parse { path: &'static str, detail: String },
    #[error("kernel counters are not available on this platform")]
    Unsupported,
}

/// Read-only access to the host's kernel counters. Every call is a single
/// bounded query with no state kept between calls.
pub trait CounterSource: Send + Sync {
    fn read_system_cpu_ticks(&self) -> Result<RawCpuSample, CounterError>;

    /// One entry per logical core, in the same order on every call.
    fn read_per_core_cpu_ticks(&self) -> Result<Vec<RawCpuSample>, CounterError>;

    fn read_memory_page_counts(&self) -> Result<RawMemorySample, CounterError>;

    fn read_total_physical_memory(&self) -> Result<u64, CounterError>;

    fn logical_core_count(&self) -> Result<usize, CounterError>;
}
