// src/io/monitor.rs
//
// Connection state machine. A dedicated blocking worker ticks every
// `tick` interval: while disconnected it retries `open` at the currently
// configured bit rate; while connected it polls hardware status to catch
// adapter removal. The loop never terminates on error — only the stop
// flag ends it, after which any open handle is closed during teardown.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde::Serialize;
use tokio::sync::broadcast;

use super::channel::ChannelHandle;
use super::driver::{CanDriver, StatusClass};
use super::BaudRate;
use crate::tlog;

/// Default monitor tick interval.
pub const DEFAULT_TICK: Duration = Duration::from_millis(10);

/// Capacity of the status event channel. Slow subscribers lag rather than
/// block the monitor.
const EVENT_CAPACITY: usize = 64;

/// Why the monitor reported a disconnect.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DisconnectReason {
    /// Orderly teardown via the stop flag
    Shutdown,
    /// The adapter vanished while the channel was open
    HardwareRemoved,
    /// A baud-rate change forced a reopen
    BaudRateChange,
}

/// Status events broadcast to subscribers (CLI printer, tests, UI layers).
#[derive(Clone, Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MonitorEvent {
    Connected { baud: BaudRate },
    Disconnected { reason: DisconnectReason },
    AttemptFailed { text: String },
}

/// Owns the monitor worker, the shared channel and the event fan-out.
pub struct ConnectionMonitor {
    channel: Arc<Mutex<ChannelHandle>>,
    stop_flag: Arc<AtomicBool>,
    event_tx: broadcast::Sender<MonitorEvent>,
    tick: Duration,
    worker: Option<tokio::task::JoinHandle<()>>,
}

impl ConnectionMonitor {
    /// Build a monitor around a driver. The channel starts closed; nothing
    /// runs until `start`.
    pub fn new(driver: Box<dyn CanDriver>, baud_rate: BaudRate, tick: Duration) -> Self {
        let (event_tx, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            channel: Arc::new(Mutex::new(ChannelHandle::new(driver, baud_rate))),
            stop_flag: Arc::new(AtomicBool::new(false)),
            event_tx,
            tick,
            worker: None,
        }
    }

    /// Shared channel handle, for the command surface.
    pub fn channel(&self) -> Arc<Mutex<ChannelHandle>> {
        Arc::clone(&self.channel)
    }

    /// Event sender, for layers that report transitions (baud changes).
    pub(crate) fn event_sender(&self) -> broadcast::Sender<MonitorEvent> {
        self.event_tx.clone()
    }

    /// Subscribe to status events. Late subscribers only see future events.
    pub fn subscribe(&self) -> broadcast::Receiver<MonitorEvent> {
        self.event_tx.subscribe()
    }

    /// Whether the channel is currently open.
    pub fn is_connected(&self) -> bool {
        self.channel.lock().unwrap().is_open()
    }

    /// Start the monitor loop on a blocking worker task.
    /// Must be called from within a tokio runtime.
    pub fn start(&mut self) {
        if self.worker.is_some() {
            return;
        }
        self.stop_flag.store(false, Ordering::SeqCst);

        let channel = Arc::clone(&self.channel);
        let stop_flag = Arc::clone(&self.stop_flag);
        let event_tx = self.event_tx.clone();
        let tick = self.tick;

        self.worker = Some(tokio::task::spawn_blocking(move || {
            run_monitor(channel, stop_flag, event_tx, tick);
        }));
    }

    /// Signal the loop to stop and wait for it to finish its teardown.
    /// The worker observes the flag within one tick and closes any open
    /// handle before exiting.
    pub async fn shutdown(&mut self) {
        self.stop_flag.store(true, Ordering::SeqCst);
        if let Some(worker) = self.worker.take() {
            let _ = worker.await;
        }
    }
}

/// The monitor loop. The channel lock is held only around driver calls,
/// never across the tick sleep.
fn run_monitor(
    channel: Arc<Mutex<ChannelHandle>>,
    stop_flag: Arc<AtomicBool>,
    event_tx: broadcast::Sender<MonitorEvent>,
    tick: Duration,
) {
    while !stop_flag.load(Ordering::SeqCst) {
        {
            let mut ch = channel.lock().unwrap();
            if !ch.is_open() {
                let baud = ch.baud_rate();
                let status = ch.open();
                match status.class {
                    StatusClass::Ok => {
                        tlog!("[monitor] CAN channel initialised at {}", baud);
                        let _ = event_tx.send(MonitorEvent::Connected { baud });
                    }
                    StatusClass::Retryable => {
                        // Hardware not present yet; retried next tick with
                        // whatever rate is configured by then
                    }
                    _ => {
                        let text = crate::status::status_text(
                            Some("CAN init failed"),
                            status,
                            &ch.error_text(status),
                        );
                        tlog!("[monitor] {}", text);
                        let _ = event_tx.send(MonitorEvent::AttemptFailed { text });
                    }
                }
            } else {
                let status = ch.poll_status();
                if status.class == StatusClass::HardwareRemoved {
                    ch.close();
                    tlog!("[monitor] CAN channel closed: adapter removed?");
                    let _ = event_tx.send(MonitorEvent::Disconnected {
                        reason: DisconnectReason::HardwareRemoved,
                    });
                }
            }
        }
        std::thread::sleep(tick);
    }

    // Teardown: release any open handle before reporting termination
    let mut ch = channel.lock().unwrap();
    if ch.is_open() {
        ch.close();
        tlog!("[monitor] CAN channel closed (shutdown)");
        let _ = event_tx.send(MonitorEvent::Disconnected {
            reason: DisconnectReason::Shutdown,
        });
    }
}
