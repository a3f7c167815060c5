#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    CpuDetails,
    MemoryDetails,
    RefreshCpu,
    RefreshMemory,
    Snapshot,
    Quit,
    None,
}

impl Action {
    /// Maps a line typed on stdin to an action. Unknown input is ignored.
    pub fn from_command(line: &str) -> Self {
        match line.trim().to_lowercase().as_str() {
            "c" | "cpu" => Action::CpuDetails,
            "m" | "mem" | "memory" => Action::MemoryDetails,
            "rc" => Action::RefreshCpu,
            "rm" => Action::RefreshMemory,
            "s" | "snapshot" => Action::Snapshot,
            "q" | "quit" => Action::Quit,
            _ => Action::None,
        }
    }
}
