//! Destinations for request log lines
//!
//! Producers never wait on a sink: every implementation here enqueues with
//! `try_send` onto a bounded channel and rejects the message when the channel
//! is full. A slow consumer costs log lines, never request latency.

use super::level::Severity;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, error, info, trace, warn};

/// Queue capacity used when none is configured
pub const DEFAULT_CAPACITY: usize = 1024;

/// How many rejected messages between two overflow diagnostics
const DROP_REPORT_INTERVAL: u64 = 1000;

/// One formatted request log line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogMessage {
    /// Severity the line is emitted at
    pub severity: Severity,
    /// Category of the emitting filter
    pub category: Arc<str>,
    /// The formatted line, severity prefix included
    pub line: String,
    /// When the request entered the chain
    pub timestamp: SystemTime,
}

impl LogMessage {
    /// Whether the line contains `needle`
    pub fn contains(&self, needle: &str) -> bool {
        self.line.contains(needle)
    }
}

/// Where the logging filter hands finished lines
pub trait LogSink: Send + Sync + 'static {
    /// Enqueue a message. Must return without waiting for delivery.
    fn submit(&self, message: LogMessage);

    /// Whether messages of `severity` would be delivered at all
    fn enabled(&self, severity: Severity) -> bool;
}

fn passes(threshold: Severity, severity: Severity) -> bool {
    severity != Severity::Off && severity >= threshold
}

/// Producer half shared by the sinks: bounded `try_send` with drop counting
#[derive(Debug)]
struct Enqueue {
    sender: mpsc::Sender<LogMessage>,
    dropped: AtomicU64,
}

impl Enqueue {
    fn push(&self, message: LogMessage) {
        if let Err(err) = self.sender.try_send(message) {
            let dropped = self.dropped.fetch_add(1, Ordering::Relaxed) + 1;
            if dropped % DROP_REPORT_INTERVAL == 1 {
                let reason = match err {
                    mpsc::error::TrySendError::Full(_) => "queue full",
                    mpsc::error::TrySendError::Closed(_) => "consumer gone",
                };
                warn!(dropped, reason, "request log message rejected");
            }
        }
    }

    fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

/// Production sink forwarding lines to `tracing`
///
/// A single consumer task drains the queue and emits each line through the
/// macro matching its severity, with the category as a field. Built inside a
/// tokio runtime the consumer is a task on that runtime; outside of one it
/// gets a dedicated thread.
#[derive(Debug)]
pub struct TracingLogSink {
    queue: Enqueue,
    threshold: Severity,
}

impl TracingLogSink {
    /// Sink with the default capacity
    pub fn new(threshold: Severity) -> Self {
        Self::with_capacity(DEFAULT_CAPACITY, threshold)
    }

    /// Sink with an explicit queue capacity
    pub fn with_capacity(capacity: usize, threshold: Severity) -> Self {
        Self::with_prefix(capacity, threshold, None)
    }

    /// Sink whose emitted category is `<prefix>.<category>`
    pub fn with_prefix(capacity: usize, threshold: Severity, prefix: Option<String>) -> Self {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        spawn_consumer(receiver, prefix.map(Arc::from));
        Self {
            queue: Enqueue {
                sender,
                dropped: AtomicU64::new(0),
            },
            threshold,
        }
    }

    /// Messages rejected so far
    pub fn dropped(&self) -> u64 {
        self.queue.dropped()
    }

    /// Lowest severity delivered
    pub fn threshold(&self) -> Severity {
        self.threshold
    }
}

impl LogSink for TracingLogSink {
    fn submit(&self, message: LogMessage) {
        self.queue.push(message);
    }

    fn enabled(&self, severity: Severity) -> bool {
        passes(self.threshold, severity)
    }
}

fn spawn_consumer(mut receiver: mpsc::Receiver<LogMessage>, prefix: Option<Arc<str>>) {
    if let Ok(handle) = tokio::runtime::Handle::try_current() {
        handle.spawn(async move {
            while let Some(message) = receiver.recv().await {
                emit(&message, prefix.as_deref());
            }
            debug!("request log consumer stopped");
        });
        return;
    }

    let spawned = std::thread::Builder::new()
        .name("httpfilter-log-sink".to_string())
        .spawn(move || {
            while let Some(message) = receiver.blocking_recv() {
                emit(&message, prefix.as_deref());
            }
        });
    if let Err(e) = spawned {
        error!(error = %e, "failed to start request log consumer; messages will be dropped");
    }
}

fn emit(message: &LogMessage, prefix: Option<&str>) {
    let composed;
    let category = match prefix {
        Some(prefix) => {
            composed = format!("{prefix}.{}", message.category);
            composed.as_str()
        }
        None => &*message.category,
    };
    match message.severity {
        Severity::Trace => trace!(category, "{}", message.line),
        Severity::Debug => debug!(category, "{}", message.line),
        Severity::Info => info!(category, "{}", message.line),
        Severity::Warn => warn!(category, "{}", message.line),
        Severity::Error => error!(category, "{}", message.line),
        Severity::Off => {}
    }
}

/// Observable sink for tests
///
/// Keeps submitted messages in a bounded queue that a test can await with
/// a timeout. Producers see the same non-blocking contract as in production.
#[derive(Debug)]
pub struct MemoryLogSink {
    queue: Enqueue,
    receiver: Mutex<mpsc::Receiver<LogMessage>>,
    threshold: Severity,
}

impl MemoryLogSink {
    /// Sink accepting every severity
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY, Severity::Trace)
    }

    /// Sink ignoring severities below `threshold`
    pub fn with_threshold(threshold: Severity) -> Self {
        Self::with_capacity(DEFAULT_CAPACITY, threshold)
    }

    /// Sink with an explicit capacity and threshold
    pub fn with_capacity(capacity: usize, threshold: Severity) -> Self {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        Self {
            queue: Enqueue {
                sender,
                dropped: AtomicU64::new(0),
            },
            receiver: Mutex::new(receiver),
            threshold,
        }
    }

    /// Wait up to `timeout` for the next message
    pub async fn next_message(&self, timeout: Duration) -> Option<LogMessage> {
        let mut receiver = self.receiver.lock().await;
        tokio::time::timeout(timeout, receiver.recv())
            .await
            .ok()
            .flatten()
    }

    /// Next message if one is already queued
    pub fn try_next_message(&self) -> Option<LogMessage> {
        let mut receiver = self.receiver.try_lock().ok()?;
        receiver.try_recv().ok()
    }

    /// Everything queued right now
    pub fn drain(&self) -> Vec<LogMessage> {
        std::iter::from_fn(|| self.try_next_message()).collect()
    }

    /// Messages rejected so far
    pub fn dropped(&self) -> u64 {
        self.queue.dropped()
    }
}

impl Default for MemoryLogSink {
    fn default() -> Self {
        Self::new()
    }
}

impl LogSink for MemoryLogSink {
    fn submit(&self, message: LogMessage) {
        self.queue.push(message);
    }

    fn enabled(&self, severity: Severity) -> bool {
        passes(self.threshold, severity)
    }
}
