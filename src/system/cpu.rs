use std::sync::Arc;

use parking_lot::Mutex;
use serde::Serialize;

use super::counters::{CounterError, CounterSource, RawCpuSample};

/// Percentage breakdown of one sampling interval.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct CpuUsage {
    pub user: f64,
    pub system: f64,
    pub idle: f64,
    pub nice: f64,
}

impl CpuUsage {
    /// All fields are zero when the delta covers no ticks.
    pub fn from_delta(delta: &RawCpuSample) -> Self {
        let total = delta.total();
        if total == 0 {
            return CpuUsage::default();
        }
        let pct = |ticks: u64| ticks as f64 / total as f64 * 100.0;
        CpuUsage {
            user: pct(delta.user),
            system: pct(delta.system),
            idle: pct(delta.idle),
            nice: pct(delta.nice),
        }
    }

    /// User plus system time; nice time is reported separately.
    pub fn total(&self) -> f64 {
        self.user + self.system
    }
}

/// What a core reports on the first reading, before a previous sample exists.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FirstCoreSample {
    /// Use the raw counters as the delta, i.e. usage since boot.
    #[default]
    SinceBoot,
    /// Report 0% until a real interval has elapsed.
    Zero,
}

impl FirstCoreSample {
    pub fn from_str_config(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "zero" => FirstCoreSample::Zero,
            _ => FirstCoreSample::SinceBoot,
        }
    }
}

pub fn core_usage(
    previous: Option<&RawCpuSample>,
    current: &RawCpuSample,
    first: FirstCoreSample,
) -> f64 {
    let delta = match (previous, first) {
        (Some(prev), _) => current.delta_since(prev),
        (None, FirstCoreSample::SinceBoot) => *current,
        (None, FirstCoreSample::Zero) => return 0.0,
    };
    let total = delta.total();
    if total == 0 {
        return 0.0;
    }
    delta.busy() as f64 / total as f64 * 100.0
}

/// Per-core usage, index-aligned with `current`. Cores without a predecessor
/// at the same index are handled per `first`.
pub fn per_core_usage(
    previous: Option<&[RawCpuSample]>,
    current: &[RawCpuSample],
    first: FirstCoreSample,
) -> Vec<f64> {
    current
        .iter()
        .enumerate()
        .map(|(i, cur)| core_usage(previous.and_then(|p| p.get(i)), cur, first))
        .collect()
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CpuReading {
    pub usage: CpuUsage,
    pub per_core: Vec<f64>,
}

#[derive(Default)]
struct PreviousSamples {
    system: Option<RawCpuSample>,
    cores: Option<Vec<RawCpuSample>>,
}

pub struct CpuEngine {
    source: Arc<dyn CounterSource>,
    first_core_sample: FirstCoreSample,
    // Held for a whole sampling step so state transitions never interleave.
    previous: Mutex<PreviousSamples>,
    latest: Mutex<CpuUsage>,
    // Read from the foreground, written by the sampler; locked only to swap or copy.
    core_usages: Mutex<Vec<f64>>,
}

impl CpuEngine {
    pub fn new(source: Arc<dyn CounterSource>, first_core_sample: FirstCoreSample) -> Self {
        CpuEngine {
            source,
            first_core_sample,
            previous: Mutex::new(PreviousSamples::default()),
            latest: Mutex::new(CpuUsage::default()),
            core_usages: Mutex::new(Vec::new()),
        }
    }

    /// Samples system-wide ticks. The first call only records a baseline and
    /// returns zero usage. On error the baseline is left as it was.
    pub fn sample_system_wide(&self) -> Result<CpuUsage, CounterError> {
        let mut previous = self.previous.lock();
        let current = self.source.read_system_cpu_ticks()?;
        let usage = match previous.system {
            Some(prev) => CpuUsage::from_delta(&current.delta_since(&prev)),
            None => CpuUsage::default(),
        };
        previous.system = Some(current);
        *self.latest.lock() = usage;
        Ok(usage)
    }

    pub fn sample_per_core(&self) -> Result<Vec<f64>, CounterError> {
        let mut previous = self.previous.lock();
        let current = self.source.read_per_core_cpu_ticks()?;
        let usages = per_core_usage(previous.cores.as_deref(), &current, self.first_core_sample);
        *self.core_usages.lock() = usages.clone();
        previous.cores = Some(current);
        Ok(usages)
    }

    /// One scheduled cycle: system-wide, then per-core. A per-core failure
    /// keeps the last per-core figures; a system-wide failure skips the cycle.
    pub fn sample(&self) -> Result<CpuReading, CounterError> {
        let usage = self.sample_system_wide()?;
        let per_core = match self.sample_per_core() {
            Ok(per_core) => per_core,
            Err(e) => {
                tracing::warn!(error = %e, "per-core cpu sample skipped");
                self.current_per_core_usage()
            }
        };
        Ok(CpuReading { usage, per_core })
    }

    pub fn current_aggregate_usage(&self) -> f64 {
        self.latest.lock().total()
    }

    pub fn current_usage(&self) -> CpuUsage {
        *self.latest.lock()
    }

    pub fn current_per_core_usage(&self) -> Vec<f64> {
        self.core_usages.lock().clone()
    }

    pub fn logical_core_count(&self) -> Result<usize, CounterError> {
        self.source.logical_core_count()
    }
}
