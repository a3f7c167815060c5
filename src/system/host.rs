use sysinfo::{CpuRefreshKind, RefreshKind, System};

/// Marketing name of the first CPU, e.g. "Apple M2".
pub fn cpu_brand() -> Option<String> {
    let sys = System::new_with_specifics(RefreshKind::nothing().with_cpu(CpuRefreshKind::nothing()));
    sys.cpus()
        .first()
        .map(|cpu| cpu.brand().trim().to_string())
        .filter(|brand| !brand.is_empty())
}
