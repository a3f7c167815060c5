use std::io::{self, Write};

use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub title: String,
    pub subtitle: Option<String>,
    pub body: String,
}

/// Fire-and-forget delivery. Implementations log their own failures.
pub trait Notifier: Send + Sync {
    fn notify(&self, notification: &Notification);
}

pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, notification: &Notification) {
        tracing::info!(
            title = %notification.title,
            subtitle = notification.subtitle.as_deref().unwrap_or(""),
            body = %notification.body,
            "notification"
        );
    }
}

pub struct StdoutNotifier;

impl StdoutNotifier {
    fn write_to<W: Write>(out: &mut W, notification: &Notification) -> io::Result<()> {
        writeln!(out)?;
        writeln!(out, "== {} ==", notification.title)?;
        if let Some(subtitle) = &notification.subtitle {
            writeln!(out, "{subtitle}")?;
        }
        writeln!(out, "{}", notification.body)?;
        out.flush()
    }
}

impl Notifier for StdoutNotifier {
    fn notify(&self, notification: &Notification) {
        let stdout = io::stdout();
        let mut lock = stdout.lock();
        if let Err(e) = Self::write_to(&mut lock, notification) {
            tracing::warn!(error = %e, title = %notification.title, "failed to show notification");
        }
    }
}
