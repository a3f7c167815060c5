use std::io::{self, Write};
use std::sync::Arc;

use tokio::sync::mpsc;

use crate::action::Action;
use crate::config::{Config, OutputMode};
use crate::event::Event;
use crate::sampler::{CpuProbe, MemoryProbe, Sampler};
use crate::system::counters::CounterSource;
use crate::system::cpu::CpuEngine;
use crate::system::host;
use crate::system::memory::MemoryEngine;
use crate::system::snapshot::MetricsSnapshot;
use crate::ui::detail::{cpu_details, memory_details};
use crate::ui::notify::{LogNotifier, Notifier, StdoutNotifier};
use crate::ui::statusbar::StatusBar;

pub fn notifier_from_config(name: &str) -> Box<dyn Notifier> {
    match name.to_lowercase().as_str() {
        "log" => Box::new(LogNotifier),
        _ => Box::new(StdoutNotifier),
    }
}

/// Owns the one CPU engine and one memory engine of the process, their
/// samplers, and the presentation sinks.
pub struct App {
    pub running: bool,
    pub cpu: Arc<CpuEngine>,
    pub memory: Arc<MemoryEngine>,
    pub cpu_sampler: Sampler<CpuProbe>,
    pub memory_sampler: Sampler<MemoryProbe>,
    pub status: StatusBar,
    pub output: OutputMode,
    notifier: Box<dyn Notifier>,
    cpu_brand: Option<String>,
    pending_snapshot: bool,
}

impl App {
    pub fn new(config: &Config, source: Arc<dyn CounterSource>, notifier: Box<dyn Notifier>) -> Self {
        let cpu = Arc::new(CpuEngine::new(
            source.clone(),
            config.cpu.first_core_sample(),
        ));
        let memory = Arc::new(MemoryEngine::new(source));
        // One schedule so both samplers share a coalescing epoch.
        let schedule = config.sampling.schedule();

        App {
            running: true,
            cpu_sampler: Sampler::new(CpuProbe(cpu.clone()), schedule),
            memory_sampler: Sampler::new(MemoryProbe(memory.clone()), schedule),
            cpu,
            memory,
            status: StatusBar::new(),
            output: OutputMode::from_str_config(&config.output.mode),
            notifier,
            cpu_brand: host::cpu_brand(),
            pending_snapshot: false,
        }
    }

    /// Routes sampler publications into the foreground event queue.
    pub fn connect(&self, tx: mpsc::UnboundedSender<Event>) {
        let cpu_tx = tx.clone();
        self.cpu_sampler.subscription().register(move |value| {
            let _ = cpu_tx.send(Event::CpuUpdate(value));
        });
        self.memory_sampler.subscription().register(move |value| {
            let _ = tx.send(Event::MemoryUpdate(value));
        });
    }

    pub fn start(&self) {
        self.memory_sampler.start();
        self.cpu_sampler.start();
    }

    pub fn stop(&self) {
        self.memory_sampler.stop();
        self.cpu_sampler.stop();
    }

    /// Forces one out-of-band sample on both engines.
    pub fn sample_now(&self) {
        self.memory_sampler.sample_now();
        self.cpu_sampler.sample_now();
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot::capture(&self.cpu, &self.memory)
    }

    /// Returns true when the display should be redrawn.
    pub fn handle_event(&mut self, event: Event) -> bool {
        match event {
            Event::CpuUpdate(value) => {
                self.status.set_cpu(&value);
                true
            }
            Event::MemoryUpdate(value) => {
                self.status.set_memory(&value);
                true
            }
            Event::Command(line) => {
                self.dispatch(Action::from_command(&line));
                self.pending_snapshot
            }
            Event::Interrupt => {
                self.running = false;
                false
            }
        }
    }

    pub fn dispatch(&mut self, action: Action) {
        match action {
            Action::CpuDetails => {
                let notification = cpu_details(
                    &self.cpu.current_usage(),
                    &self.cpu.current_per_core_usage(),
                    self.cpu_brand.as_deref(),
                );
                self.notifier.notify(&notification);
            }
            Action::MemoryDetails => {
                let notification = memory_details(&self.memory.sample_memory());
                self.notifier.notify(&notification);
            }
            Action::RefreshCpu => {
                self.cpu_sampler.stop();
                self.cpu_sampler.start();
            }
            Action::RefreshMemory => {
                self.memory_sampler.stop();
                self.memory_sampler.start();
            }
            Action::Snapshot => self.pending_snapshot = true,
            Action::Quit => self.running = false,
            Action::None => {}
        }
    }

    pub fn render<W: Write>(&mut self, out: &mut W) -> io::Result<()> {
        let snapshot_requested = std::mem::take(&mut self.pending_snapshot);
        match self.output {
            OutputMode::Status if snapshot_requested => {
                writeln!(out)?;
                self.write_snapshot(out)?;
                self.status.render(out)
            }
            OutputMode::Status => self.status.render(out),
            OutputMode::Json => self.write_snapshot(out),
        }
    }

    pub fn write_snapshot<W: Write>(&self, out: &mut W) -> io::Result<()> {
        serde_json::to_writer(&mut *out, &self.snapshot())?;
        writeln!(out)?;
        out.flush()
    }
}
