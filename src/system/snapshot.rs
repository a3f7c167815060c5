use serde::Serialize;

use super::cpu::{CpuEngine, CpuUsage};
use super::memory::{MemoryEngine, MemoryUsage};

/// Last computed figures of both engines, for consumers that want numbers
/// rather than display strings.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricsSnapshot {
    pub cpu_percent: f64,
    pub cpu: CpuUsage,
    pub per_core_percent: Vec<f64>,
    pub memory: MemoryUsage,
    pub memory_percent: f64,
}

impl MetricsSnapshot {
    /// Reads cached values only; no kernel queries.
    pub fn capture(cpu: &CpuEngine, memory: &MemoryEngine) -> Self {
        let usage = cpu.current_usage();
        let mem = memory.current_memory_usage();
        MetricsSnapshot {
            cpu_percent: usage.total(),
            cpu: usage,
            per_core_percent: cpu.current_per_core_usage(),
            memory: mem,
            memory_percent: mem.usage_percent(),
        }
    }
}
