use std::fmt::Write;

use crate::format::bytes_to_gb;
use crate::system::cpu::CpuUsage;
use crate::system::memory::MemoryUsage;
use crate::ui::notify::Notification;

pub fn cpu_details(usage: &CpuUsage, per_core: &[f64], brand: Option<&str>) -> Notification {
    let mut body = String::new();
    let _ = write!(body, "Current CPU Usage: {:.1}%", usage.total());
    let _ = write!(
        body,
        "\nUser: {:.1}%  System: {:.1}%  Idle: {:.1}%  Nice: {:.1}%",
        usage.user, usage.system, usage.idle, usage.nice
    );
    for (core, percent) in per_core.iter().enumerate() {
        let _ = write!(body, "\nCore {core}: {percent:.1}%");
    }
    Notification {
        title: "CPU Usage Details".to_string(),
        subtitle: brand.map(str::to_string),
        body,
    }
}

pub fn memory_details(usage: &MemoryUsage) -> Notification {
    Notification {
        title: "Memory Usage Details".to_string(),
        subtitle: None,
        body: format!(
            "Used: {:.2} GB\nTotal: {:.2} GB\nUsage: {:.1}%",
            bytes_to_gb(usage.used_bytes),
            bytes_to_gb(usage.total_bytes),
            usage.usage_percent()
        ),
    }
}
