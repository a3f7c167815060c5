use std::io::{self, Write};

use crossterm::cursor::MoveToColumn;
use crossterm::queue;
use crossterm::style::Print;
use crossterm::terminal::{Clear, ClearType};

const LOADING: &str = "Loading...";

/// Single-line stand-in for the two status items. Redrawing in place means
/// repeated or out-of-order updates just overwrite the line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusBar {
    memory: String,
    cpu: String,
}

impl Default for StatusBar {
    fn default() -> Self {
        Self::new()
    }
}

impl StatusBar {
    pub fn new() -> Self {
        StatusBar {
            memory: format!("Mem: {LOADING}"),
            cpu: format!("CPU: {LOADING}"),
        }
    }

    pub fn set_memory(&mut self, value: &str) {
        self.memory = format!("Mem: {value}");
    }

    pub fn set_cpu(&mut self, value: &str) {
        self.cpu = format!("CPU: {value}");
    }

    pub fn line(&self) -> String {
        format!("{}  |  {}", self.memory, self.cpu)
    }

    pub fn render<W: Write>(&self, out: &mut W) -> io::Result<()> {
        queue!(
            out,
            MoveToColumn(0),
            Clear(ClearType::CurrentLine),
            Print(self.line())
        )?;
        out.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_loading() {
        assert_eq!(
            StatusBar::new().line(),
            "Mem: Loading...  |  CPU: Loading..."
        );
    }

    #[test]
    fn updates_replace_labels() {
        let mut bar = StatusBar::new();
        bar.set_cpu("12.5%");
        bar.set_memory("8.0/16.0GB (50%)");
        bar.set_cpu("13.0%");
        assert_eq!(bar.line(), "Mem: 8.0/16.0GB (50%)  |  CPU: 13.0%");
    }

    #[test]
    fn render_ends_with_line_text() {
        let mut bar = StatusBar::new();
        bar.set_cpu("1.0%");
        let mut buf = Vec::new();
        bar.render(&mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert!(text.ends_with("CPU: 1.0%"));
    }
}
