use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    Command(String),
    CpuUpdate(String),
    MemoryUpdate(String),
    Interrupt,
}

/// Funnels stdin commands, Ctrl-C and sampler publications into one queue
/// consumed by the foreground loop.
pub struct EventHandler {
    tx: mpsc::UnboundedSender<Event>,
    rx: mpsc::UnboundedReceiver<Event>,
    _task: tokio::task::JoinHandle<()>,
}

impl Default for EventHandler {
    fn default() -> Self {
        Self::new()
    }
}

impl EventHandler {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel::<Event>();
        let input_tx = tx.clone();

        let task = tokio::spawn(async move {
            let mut lines = BufReader::new(tokio::io::stdin()).lines();
            let mut stdin_open = true;
            let mut signals_ok = true;

            loop {
                tokio::select! {
                    line = lines.next_line(), if stdin_open => {
                        match line {
                            Ok(Some(line)) => {
                                if input_tx.send(Event::Command(line)).is_err() {
                                    break;
                                }
                            }
                            // Detached from a terminal: keep running until interrupted.
                            Ok(None) | Err(_) => stdin_open = false,
                        }
                    }
                    signal = tokio::signal::ctrl_c(), if signals_ok => {
                        match signal {
                            Ok(()) => {
                                let _ = input_tx.send(Event::Interrupt);
                                break;
                            }
                            Err(e) => {
                                tracing::warn!(error = %e, "ctrl-c handler unavailable");
                                signals_ok = false;
                            }
                        }
                    }
                    else => break,
                }
            }
        });

        Self { tx, rx, _task: task }
    }

    pub fn sender(&self) -> mpsc::UnboundedSender<Event> {
        self.tx.clone()
    }

    pub async fn next(&mut self) -> Option<Event> {
        self.rx.recv().await
    }
}
