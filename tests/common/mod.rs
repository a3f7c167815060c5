#![allow(dead_code)]

use std::collections::VecDeque;

use parking_lot::Mutex;
use pulsebar::system::counters::{CounterError, CounterSource, RawCpuSample, RawMemorySample};

pub const GIB: u64 = 1024 * 1024 * 1024;

/// Scripted readings; an exhausted queue reports `Unsupported`.
#[derive(Default)]
pub struct ScriptedCounters {
    pub system: Mutex<VecDeque<Result<RawCpuSample, CounterError>>>,
    pub per_core: Mutex<VecDeque<Result<Vec<RawCpuSample>, CounterError>>>,
    pub memory: Mutex<VecDeque<Result<RawMemorySample, CounterError>>>,
    pub total_memory: Mutex<VecDeque<Result<u64, CounterError>>>,
    pub cores: usize,
}

impl ScriptedCounters {
    pub fn with_cores(cores: usize) -> Self {
        Self {
            cores,
            ..Self::default()
        }
    }

    pub fn system(self, reading: Result<RawCpuSample, CounterError>) -> Self {
        self.system.lock().push_back(reading);
        self
    }

    pub fn per_core(self, reading: Result<Vec<RawCpuSample>, CounterError>) -> Self {
        self.per_core.lock().push_back(reading);
        self
    }

    pub fn memory(self, pages: RawMemorySample, total: u64) -> Self {
        self.memory.lock().push_back(Ok(pages));
        self.total_memory.lock().push_back(Ok(total));
        self
    }
}

fn pop<T>(queue: &Mutex<VecDeque<Result<T, CounterError>>>) -> Result<T, CounterError> {
    queue
        .lock()
        .pop_front()
        .unwrap_or(Err(CounterError::Unsupported))
}

impl CounterSource for ScriptedCounters {
    fn read_system_cpu_ticks(&self) -> Result<RawCpuSample, CounterError> {
        pop(&self.system)
    }

    fn read_per_core_cpu_ticks(&self) -> Result<Vec<RawCpuSample>, CounterError> {
        pop(&self.per_core)
    }

    fn read_memory_page_counts(&self) -> Result<RawMemorySample, CounterError> {
        pop(&self.memory)
    }

    fn read_total_physical_memory(&self) -> Result<u64, CounterError> {
        pop(&self.total_memory)
    }

    fn logical_core_count(&self) -> Result<usize, CounterError> {
        Ok(self.cores)
    }
}

pub fn kernel_failure(call: &'static str) -> CounterError {
    CounterError::Kernel { call, code: 5 }
}
