//! Periodic sampling and publication of formatted readings.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Mutex, RwLock};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant};

use crate::format::{format_cpu_usage, format_memory_usage};
use crate::system::cpu::CpuEngine;
use crate::system::memory::MemoryEngine;

pub const DEFAULT_PERIOD: Duration = Duration::from_secs(5);
pub const DEFAULT_TOLERANCE: Duration = Duration::from_millis(100);

/// One sampling step. `None` means the cycle was skipped.
pub trait Probe: Send + Sync + 'static {
    fn name(&self) -> &'static str;
    fn sample(&self) -> Option<String>;
}

pub struct CpuProbe(pub Arc<CpuEngine>);

impl Probe for CpuProbe {
    fn name(&self) -> &'static str {
        "cpu"
    }

    fn sample(&self) -> Option<String> {
        match self.0.sample() {
            Ok(reading) => Some(format_cpu_usage(reading.usage.total())),
            Err(e) => {
                tracing::warn!(error = %e, "cpu sample skipped");
                None
            }
        }
    }
}

pub struct MemoryProbe(pub Arc<MemoryEngine>);

impl Probe for MemoryProbe {
    fn name(&self) -> &'static str {
        "memory"
    }

    fn sample(&self) -> Option<String> {
        Some(format_memory_usage(&self.0.sample_memory()))
    }
}

type Callback = Arc<dyn Fn(String) + Send + Sync>;

/// At most one callback. Replacing it is atomic with respect to delivery:
/// a delivery sees either the old callback or the new one.
#[derive(Default)]
pub struct Subscription {
    slot: RwLock<Option<Callback>>,
}

impl Subscription {
    pub fn register<F>(&self, callback: F)
    where
        F: Fn(String) + Send + Sync + 'static,
    {
        *self.slot.write() = Some(Arc::new(callback));
    }

    pub fn clear(&self) {
        *self.slot.write() = None;
    }

    pub fn is_registered(&self) -> bool {
        self.slot.read().is_some()
    }

    fn deliver(&self, value: String) {
        // Invoke outside the lock so a callback may re-register.
        let callback = self.slot.read().clone();
        if let Some(callback) = callback {
            callback(value);
        }
    }
}

/// Fixed period plus a coalescing tolerance. Deadlines are rounded up to a
/// multiple of `tolerance` measured from `epoch`, so samplers sharing an
/// epoch fire together.
#[derive(Debug, Clone, Copy)]
pub struct Schedule {
    pub period: Duration,
    pub tolerance: Duration,
    epoch: Instant,
}

impl Schedule {
    pub fn new(period: Duration, tolerance: Duration) -> Self {
        Schedule {
            period,
            tolerance,
            epoch: Instant::now(),
        }
    }

    /// Never earlier than `nominal`, always earlier than `nominal + tolerance`.
    pub fn coalesce(&self, nominal: Instant) -> Instant {
        let tolerance = self.tolerance.as_nanos();
        if tolerance == 0 {
            return nominal;
        }
        let offset = nominal.saturating_duration_since(self.epoch).as_nanos();
        let rounded = offset.div_ceil(tolerance) * tolerance;
        let extra = (rounded - offset) as u64;
        nominal + Duration::from_nanos(extra)
    }
}

impl Default for Schedule {
    fn default() -> Self {
        Schedule::new(DEFAULT_PERIOD, DEFAULT_TOLERANCE)
    }
}

struct Shared<P> {
    probe: P,
    subscription: Subscription,
    latest: watch::Sender<Option<String>>,
}

impl<P: Probe> Shared<P> {
    fn fire(&self) -> Option<String> {
        let value = self.probe.sample()?;
        self.latest.send_replace(Some(value.clone()));
        self.subscription.deliver(value.clone());
        Some(value)
    }
}

struct Running {
    stop: watch::Sender<bool>,
    _task: JoinHandle<()>,
}

pub struct Sampler<P: Probe> {
    shared: Arc<Shared<P>>,
    schedule: Schedule,
    running: Mutex<Option<Running>>,
}

impl<P: Probe> Sampler<P> {
    pub fn new(probe: P, schedule: Schedule) -> Self {
        let (latest, _) = watch::channel(None);
        Sampler {
            shared: Arc::new(Shared {
                probe,
                subscription: Subscription::default(),
                latest,
            }),
            schedule,
            running: Mutex::new(None),
        }
    }

    pub fn subscription(&self) -> &Subscription {
        &self.shared.subscription
    }

    /// Observer channel carrying the most recent published value.
    pub fn subscribe(&self) -> watch::Receiver<Option<String>> {
        self.shared.latest.subscribe()
    }

    pub fn probe(&self) -> &P {
        &self.shared.probe
    }

    /// Starts (or restarts) the periodic task and samples once immediately.
    /// Must be called from within a tokio runtime.
    pub fn start(&self) {
        {
            let mut running = self.running.lock();
            if let Some(old) = running.take() {
                let _ = old.stop.send(true);
            }
            let (stop, stop_rx) = watch::channel(false);
            let task = tokio::spawn(run(self.shared.clone(), self.schedule, stop_rx));
            *running = Some(Running { stop, _task: task });
        }
        tracing::debug!(probe = self.shared.probe.name(), "sampler started");
        self.shared.fire();
    }

    /// Prevents future firings. A firing already in progress completes.
    pub fn stop(&self) {
        if let Some(old) = self.running.lock().take() {
            let _ = old.stop.send(true);
            tracing::debug!(probe = self.shared.probe.name(), "sampler stopped");
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.lock().is_some()
    }

    /// Out-of-band sample, published like a scheduled one.
    pub fn sample_now(&self) -> Option<String> {
        self.shared.fire()
    }
}

impl<P: Probe> Drop for Sampler<P> {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn run<P: Probe>(shared: Arc<Shared<P>>, schedule: Schedule, mut stop: watch::Receiver<bool>) {
    let mut nominal = Instant::now() + schedule.period;
    loop {
        let deadline = schedule.coalesce(nominal);
        tokio::select! {
            biased;
            _ = stop.changed() => break,
            _ = time::sleep_until(deadline) => {}
        }
        if shared.fire().is_none() {
            tracing::debug!(probe = shared.probe.name(), "cycle skipped");
        }
        nominal += schedule.period;
        let now = Instant::now();
        if nominal <= now {
            // Fell behind (suspend, long stall): resume the cadence from now.
            nominal = now + schedule.period;
        }
    }
}
