use crate::system::memory::MemoryUsage;

pub const BYTES_PER_GB: f64 = 1_073_741_824.0;

pub fn bytes_to_gb(bytes: u64) -> f64 {
    bytes as f64 / BYTES_PER_GB
}

/// `"12.3%"`
pub fn format_cpu_usage(percent: f64) -> String {
    format!("{percent:.1}%")
}

/// `"8.0/16.0GB (50%)"`
pub fn format_memory_usage(usage: &MemoryUsage) -> String {
    format!(
        "{:.1}/{:.1}GB ({:.0}%)",
        bytes_to_gb(usage.used_bytes),
        bytes_to_gb(usage.total_bytes),
        usage.usage_percent()
    )
}
