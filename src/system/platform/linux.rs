use std::collections::HashMap;

use crate::system::counters::{CounterError, CounterSource, RawCpuSample, RawMemorySample};

const PROC_STAT: &str = "/proc/stat";
const PROC_MEMINFO: &str = "/proc/meminfo";

fn read_proc(path: &'static str) -> Result<String, CounterError> {
    std::fs::read_to_string(path).map_err(|source| CounterError::Io { path, source })
}

fn parse_error(path: &'static str, detail: impl Into<String>) -> CounterError {
    CounterError::Parse {
        path,
        detail: detail.into(),
    }
}

/// Folds a `/proc/stat` cpu line into the four-state model:
/// irq and softirq count as system time, iowait as idle time.
fn parse_cpu_line(line: &str) -> Result<RawCpuSample, CounterError> {
    let fields: Vec<u64> = line
        .split_whitespace()
        .skip(1)
        .map(|f| f.parse::<u64>())
        .collect::<Result<_, _>>()
        .map_err(|e| parse_error(PROC_STAT, format!("{line:?}: {e}")))?;
    if fields.len() < 4 {
        return Err(parse_error(PROC_STAT, format!("short cpu line {line:?}")));
    }
    let field = |i: usize| fields.get(i).copied().unwrap_or(0);
    Ok(RawCpuSample {
        user: field(0),
        nice: field(1),
        system: field(2).saturating_add(field(5)).saturating_add(field(6)),
        idle: field(3).saturating_add(field(4)),
    })
}

pub(crate) fn parse_system_ticks(stat: &str) -> Result<RawCpuSample, CounterError> {
    let line = stat
        .lines()
        .find(|l| l.starts_with("cpu "))
        .ok_or_else(|| parse_error(PROC_STAT, "missing aggregate cpu line"))?;
    parse_cpu_line(line)
}

/// Kernel id `N` of a `cpuN` line; `None` for the aggregate line.
fn core_id(line: &str) -> Option<usize> {
    let rest = line.strip_prefix("cpu")?;
    let (id, _) = rest.split_once(char::is_whitespace)?;
    id.parse().ok()
}

/// One slot per kernel core id, so a core keeps its index across readings.
/// Offline cores are absent from `/proc/stat`; their slots hold zero ticks.
pub(crate) fn parse_per_core_ticks(stat: &str) -> Result<Vec<RawCpuSample>, CounterError> {
    let mut cores = Vec::new();
    for line in stat.lines() {
        let Some(id) = core_id(line) else {
            continue;
        };
        let sample = parse_cpu_line(line)?;
        if cores.len() <= id {
            cores.resize(id + 1, RawCpuSample::default());
        }
        cores[id] = sample;
    }
    Ok(cores)
}

fn parse_meminfo(contents: &str) -> HashMap<&str, u64> {
    contents
        .lines()
        .filter_map(|line| {
            let (key, rest) = line.split_once(':')?;
            let kb = rest.split_whitespace().next()?.parse().ok()?;
            Some((key.trim(), kb))
        })
        .collect()
}

/// Maps `/proc/meminfo` onto page classes: file-backed LRU pages play the
/// role of external pages, zswap the compressor, unreclaimable kernel
/// memory the wired pages.
pub(crate) fn memory_sample_from_meminfo(
    contents: &str,
    page_size: u64,
) -> Result<RawMemorySample, CounterError> {
    let info = parse_meminfo(contents);
    let kb = |key: &str| info.get(key).copied().unwrap_or(0);
    let pages = |bytes_kb: u64| bytes_kb.saturating_mul(1024) / page_size.max(1);

    if !info.contains_key("Active") || !info.contains_key("Inactive") {
        return Err(parse_error(PROC_MEMINFO, "missing Active/Inactive"));
    }

    Ok(RawMemorySample {
        active: pages(kb("Active")),
        wired: pages(
            kb("Unevictable")
                .saturating_add(kb("SUnreclaim"))
                .saturating_add(kb("KernelStack"))
                .saturating_add(kb("PageTables")),
        ),
        speculative: 0,
        inactive: pages(kb("Inactive")),
        compressed: pages(kb("Zswap")),
        purgeable: 0,
        external: pages(kb("Active(file)").saturating_add(kb("Inactive(file)"))),
        page_size,
    })
}

fn page_size() -> Result<u64, CounterError> {
    // SAFETY: sysconf has no memory-safety preconditions.
    let size = unsafe { libc::sysconf(libc::_SC_PAGESIZE) };
    if size <= 0 {
        return Err(CounterError::Kernel {
            call: "sysconf",
            code: size as i32,
        });
    }
    Ok(size as u64)
}

pub struct HostCounters;

impl HostCounters {
    pub fn new() -> Self {
        HostCounters
    }
}

impl Default for HostCounters {
    fn default() -> Self {
        Self::new()
    }
}

impl CounterSource for HostCounters {
    fn read_system_cpu_ticks(&self) -> Result<RawCpuSample, CounterError> {
        parse_system_ticks(&read_proc(PROC_STAT)?)
    }

    fn read_per_core_cpu_ticks(&self) -> Result<Vec<RawCpuSample>, CounterError> {
        parse_per_core_ticks(&read_proc(PROC_STAT)?)
    }

    fn read_memory_page_counts(&self) -> Result<RawMemorySample, CounterError> {
        memory_sample_from_meminfo(&read_proc(PROC_MEMINFO)?, page_size()?)
    }

    fn read_total_physical_memory(&self) -> Result<u64, CounterError> {
        let contents = read_proc(PROC_MEMINFO)?;
        parse_meminfo(&contents)
            .get("MemTotal")
            .map(|kb| kb.saturating_mul(1024))
            .ok_or_else(|| parse_error(PROC_MEMINFO, "missing MemTotal"))
    }

    // Counted from /proc/stat so it always agrees with the per-core readings.
    fn logical_core_count(&self) -> Result<usize, CounterError> {
        Ok(parse_per_core_ticks(&read_proc(PROC_STAT)?)?.len())
    }
}
