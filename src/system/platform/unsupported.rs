use crate::system::counters::{CounterError, CounterSource, RawCpuSample, RawMemorySample};

#[derive(Default)]
pub struct HostCounters;

impl HostCounters {
    pub fn new() -> Self {
        HostCounters
    }
}

impl CounterSource for HostCounters {
    fn read_system_cpu_ticks(&self) -> Result<RawCpuSample, CounterError> {
        Err(CounterError::Unsupported)
    }

    fn read_per_core_cpu_ticks(&self) -> Result<Vec<RawCpuSample>, CounterError> {
        Err(CounterError::Unsupported)
    }

    fn read_memory_page_counts(&self) -> Result<RawMemorySample, CounterError> {
        Err(CounterError::Unsupported)
    }

    fn read_total_physical_memory(&self) -> Result<u64, CounterError> {
        Err(CounterError::Unsupported)
    }

    fn logical_core_count(&self) -> Result<usize, CounterError> {
        Err(CounterError::Unsupported)
    }
}
