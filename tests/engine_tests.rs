mod common;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;

use common::{GIB, ScriptedCounters, kernel_failure};
use insta::assert_snapshot;
use parking_lot::Mutex;
use pulsebar::format::format_memory_usage;
use pulsebar::system::counters::{CounterError, CounterSource, RawCpuSample, RawMemorySample};
use pulsebar::system::cpu::{CpuEngine, FirstCoreSample};
use pulsebar::system::memory::MemoryEngine;
use pulsebar::system::snapshot::MetricsSnapshot;

#[test]
fn delta_is_independent_of_counter_magnitude() {
    let small = Arc::new(
        ScriptedCounters::with_cores(1)
            .system(Ok(RawCpuSample::new(10, 10, 10, 10)))
            .system(Ok(RawCpuSample::new(40, 20, 80, 10))),
    );
    let huge_base = 9_000_000_000u64;
    let huge = Arc::new(
        ScriptedCounters::with_cores(1)
            .system(Ok(RawCpuSample::new(huge_base, huge_base, huge_base, huge_base)))
            .system(Ok(RawCpuSample::new(
                huge_base + 30,
                huge_base + 10,
                huge_base + 70,
                huge_base,
            ))),
    );

    let a = CpuEngine::new(small, FirstCoreSample::SinceBoot);
    let b = CpuEngine::new(huge, FirstCoreSample::SinceBoot);
    assert_eq!(a.sample_system_wide().unwrap().total(), 0.0);
    assert_eq!(b.sample_system_wide().unwrap().total(), 0.0);
    assert_eq!(a.sample_system_wide().unwrap(), b.sample_system_wide().unwrap());
    assert!((a.current_aggregate_usage() - 36.363_636).abs() < 1e-4);
}

#[test]
fn failed_cycle_does_not_reset_baseline() {
    let source = Arc::new(
        ScriptedCounters::with_cores(2)
            .system(Ok(RawCpuSample::new(100, 100, 800, 0)))
            .per_core(Ok(vec![RawCpuSample::new(50, 50, 400, 0); 2]))
            .system(Err(kernel_failure("host_statistics")))
            .system(Ok(RawCpuSample::new(150, 150, 900, 0)))
            .per_core(Ok(vec![RawCpuSample::new(100, 50, 450, 0); 2])),
    );
    let engine = CpuEngine::new(source, FirstCoreSample::SinceBoot);

    engine.sample().unwrap();
    let before = engine.current_per_core_usage();
    assert!(matches!(engine.sample(), Err(CounterError::Kernel { .. })));
    assert_eq!(engine.current_per_core_usage(), before);

    let reading = engine.sample().unwrap();
    // 50 user + 50 system out of 200 ticks since the pre-failure sample.
    assert_eq!(reading.usage.total(), 50.0);
    assert_eq!(reading.per_core, vec![50.0, 50.0]);
}

#[test]
fn memory_formats_half_of_sixteen_gib() {
    let page_size = 16_384;
    let pages = RawMemorySample {
        active: 4 * GIB / page_size,
        wired: 2 * GIB / page_size,
        inactive: 3 * GIB / page_size,
        purgeable: GIB / page_size,
        page_size,
        ..RawMemorySample::default()
    };
    let engine = MemoryEngine::new(Arc::new(ScriptedCounters::with_cores(1).memory(pages, 16 * GIB)));
    let usage = engine.sample_memory();
    assert_eq!(usage.used_bytes, 8 * GIB);
    assert_eq!(format_memory_usage(&usage), "8.0/16.0GB (50%)");
}

#[test]
fn snapshot_serializes_cached_figures() {
    let source = Arc::new(
        ScriptedCounters::with_cores(1)
            .system(Ok(RawCpuSample::new(0, 0, 0, 0)))
            .system(Ok(RawCpuSample::new(25, 25, 50, 0)))
            .per_core(Ok(vec![RawCpuSample::new(1, 1, 2, 0)]))
            .memory(
                RawMemorySample {
                    active: 524_288,
                    page_size: 16_384,
                    ..RawMemorySample::default()
                },
                16 * GIB,
            ),
    );
    let cpu = CpuEngine::new(source.clone(), FirstCoreSample::SinceBoot);
    let memory = MemoryEngine::new(source);
    cpu.sample_system_wide().unwrap();
    cpu.sample().unwrap();
    memory.sample_memory();

    let json = serde_json::to_string_pretty(&MetricsSnapshot::capture(&cpu, &memory)).unwrap();
    assert_snapshot!(json, @r#"
    {
      "cpu_percent": 50.0,
      "cpu": {
        "user": 25.0,
        "system": 25.0,
        "idle": 50.0,
        "nice": 0.0
      },
      "per_core_percent": [
        50.0
      ],
      "memory": {
        "used_bytes": 8589934592,
        "total_bytes": 17179869184
      },
      "memory_percent": 50.0
    }
    "#);
}

/// Every core advances by the same busy fraction per call, so any complete
/// per-core sequence is uniform.
struct UniformCores {
    cores: usize,
    calls: Mutex<(u64, RawCpuSample)>,
}

impl CounterSource for UniformCores {
    fn read_system_cpu_ticks(&self) -> Result<RawCpuSample, CounterError> {
        Err(CounterError::Unsupported)
    }

    fn read_per_core_cpu_ticks(&self) -> Result<Vec<RawCpuSample>, CounterError> {
        let mut state = self.calls.lock();
        state.0 += 1;
        let busy = state.0 % 101;
        state.1.user += busy;
        state.1.idle += 100 - busy;
        Ok(vec![state.1; self.cores])
    }

    fn read_memory_page_counts(&self) -> Result<RawMemorySample, CounterError> {
        Err(CounterError::Unsupported)
    }

    fn read_total_physical_memory(&self) -> Result<u64, CounterError> {
        Err(CounterError::Unsupported)
    }

    fn logical_core_count(&self) -> Result<usize, CounterError> {
        Ok(self.cores)
    }
}

#[test]
fn readers_never_see_a_mixed_per_core_sequence() {
    let engine = Arc::new(CpuEngine::new(
        Arc::new(UniformCores {
            cores: 64,
            calls: Mutex::new((0, RawCpuSample::default())),
        }),
        FirstCoreSample::SinceBoot,
    ));
    let done = Arc::new(AtomicBool::new(false));

    let readers: Vec<_> = (0..4)
        .map(|_| {
            let engine = engine.clone();
            let done = done.clone();
            thread::spawn(move || {
                while !done.load(Ordering::Relaxed) {
                    let usage = engine.current_per_core_usage();
                    if let Some(first) = usage.first() {
                        assert_eq!(usage.len(), 64);
                        assert!(usage.iter().all(|u| u == first), "mixed sequence: {usage:?}");
                    }
                }
            })
        })
        .collect();

    for _ in 0..2_000 {
        let usages = engine.sample_per_core().unwrap();
        assert!(usages.iter().all(|u| (0.0..=100.0).contains(u)));
    }
    done.store(true, Ordering::Relaxed);
    for reader in readers {
        reader.join().unwrap();
    }
}
