// src/surface.rs
//
// Command surface exposed to external layers (CLI, scripting, SDO logic).
// Thin pass-throughs to the shared channel handle: callers never drive the
// state machine directly — a baud-rate request closes the channel and lets
// the monitor reopen at the new rate on its next tick.

use std::sync::{Arc, Mutex};

use tokio::sync::broadcast;

use crate::io::channel::ChannelHandle;
use crate::io::monitor::{ConnectionMonitor, DisconnectReason, MonitorEvent};
use crate::io::{BaudRate, CanFrame, IoError};
use crate::tlog;

/// Caller-facing handle to the shared channel.
///
/// Clones are cheap; all clones operate on the same channel.
#[derive(Clone)]
pub struct CommandSurface {
    channel: Arc<Mutex<ChannelHandle>>,
    event_tx: broadcast::Sender<MonitorEvent>,
}

impl CommandSurface {
    pub fn new(monitor: &ConnectionMonitor) -> Self {
        Self {
            channel: monitor.channel(),
            event_tx: monitor.event_sender(),
        }
    }

    /// Transmit one frame. Fails with `NotConnected` while the adapter is
    /// absent, without invoking the driver.
    pub fn write_frame(&self, frame: &CanFrame) -> Result<(), IoError> {
        self.channel.lock().unwrap().write(frame)
    }

    /// Poll for one received frame. `Ok(None)` when nothing is pending.
    pub fn read_frame(&self) -> Result<Option<CanFrame>, IoError> {
        self.channel.lock().unwrap().read()
    }

    /// Request a baud-rate change by table index (0–13; out-of-range
    /// indices clamp to the last entry). If the channel is open it is
    /// closed here; the monitor reopens at the new rate on its next tick.
    /// Returns the rate that was applied.
    pub fn request_baud_rate(&self, index: u8) -> BaudRate {
        let rate = BaudRate::from_index(index);
        let closed = self.channel.lock().unwrap().set_baud_rate(rate);
        if closed {
            tlog!("[surface] baud rate change to {}: channel closed for reopen", rate);
            let _ = self.event_tx.send(MonitorEvent::Disconnected {
                reason: DisconnectReason::BaudRateChange,
            });
        } else {
            tlog!("[surface] baud rate set to {} for next connect", rate);
        }
        rate
    }

    /// Whether the channel is currently open.
    pub fn is_connected(&self) -> bool {
        self.channel.lock().unwrap().is_open()
    }

    /// Currently configured bit rate.
    pub fn baud_rate(&self) -> BaudRate {
        self.channel.lock().unwrap().baud_rate()
    }
}
