// src/io/driver/sim.rs
//
// Simulated adapter driver. Tests script open/poll outcomes and inject
// received frames through a `SimHandle`; the monitor drives the `SimDriver`
// half exactly as it would real hardware. Also usable from the CLI to
// exercise the connection lifecycle without an adapter.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use super::super::codec::WireFrame;
use super::super::BaudRate;
use super::{CanDriver, DriverStatus, StatusClass};

#[derive(Debug)]
struct SimState {
    open: bool,
    /// Scripted results for upcoming `open` calls; empty falls back to `default_open`
    open_results: VecDeque<DriverStatus>,
    default_open: DriverStatus,
    /// Scripted results for upcoming `get_status` calls; empty falls back to Ok
    poll_results: VecDeque<DriverStatus>,
    /// Frames waiting to be read
    rx_queue: VecDeque<WireFrame>,
    /// Frames the driver was asked to transmit
    tx_log: Vec<WireFrame>,
    /// Bit rate of the last successful open
    last_baud: Option<BaudRate>,
    open_calls: u64,
    close_calls: u64,
    write_calls: u64,
    /// Highest number of simultaneously open handles ever observed
    max_open: u32,
    open_handles: u32,
}

impl SimState {
    fn new() -> Self {
        Self {
            open: false,
            open_results: VecDeque::new(),
            default_open: DriverStatus::OK,
            poll_results: VecDeque::new(),
            rx_queue: VecDeque::new(),
            tx_log: Vec::new(),
            last_baud: None,
            open_calls: 0,
            close_calls: 0,
            write_calls: 0,
            max_open: 0,
            open_handles: 0,
        }
    }
}

/// Driver half handed to the channel/monitor.
pub struct SimDriver {
    state: Arc<Mutex<SimState>>,
}

/// Test/control half: scripts outcomes and inspects driver activity.
#[derive(Clone)]
pub struct SimHandle {
    state: Arc<Mutex<SimState>>,
}

impl SimDriver {
    /// Create a simulated driver plus its control handle.
    /// With nothing scripted, `open` succeeds immediately and polls report Ok.
    pub fn new() -> (Self, SimHandle) {
        let state = Arc::new(Mutex::new(SimState::new()));
        (
            SimDriver {
                state: Arc::clone(&state),
            },
            SimHandle { state },
        )
    }
}

impl CanDriver for SimDriver {
    fn open(&mut self, baud: BaudRate) -> DriverStatus {
        let mut state = self.state.lock().unwrap();
        state.open_calls += 1;
        let status = state
            .open_results
            .pop_front()
            .unwrap_or(state.default_open);
        if status.is_ok() {
            if !state.open {
                state.open = true;
                state.open_handles += 1;
                state.max_open = state.max_open.max(state.open_handles);
            }
            state.last_baud = Some(baud);
        }
        status
    }

    fn close(&mut self) -> DriverStatus {
        let mut state = self.state.lock().unwrap();
        state.close_calls += 1;
        if state.open {
            state.open = false;
            state.open_handles = state.open_handles.saturating_sub(1);
        }
        DriverStatus::OK
    }

    fn write(&mut self, frame: &WireFrame) -> DriverStatus {
        let mut state = self.state.lock().unwrap();
        state.write_calls += 1;
        if !state.open {
            return DriverStatus::other(SIM_CODE_NOT_OPEN);
        }
        state.tx_log.push(*frame);
        DriverStatus::OK
    }

    fn read(&mut self) -> (Option<WireFrame>, DriverStatus) {
        let mut state = self.state.lock().unwrap();
        if !state.open {
            return (None, DriverStatus::other(SIM_CODE_NOT_OPEN));
        }
        match state.rx_queue.pop_front() {
            Some(frame) => (Some(frame), DriverStatus::OK),
            None => (None, DriverStatus::retryable(SIM_CODE_QUEUE_EMPTY)),
        }
    }

    fn get_status(&mut self) -> DriverStatus {
        let mut state = self.state.lock().unwrap();
        state.poll_results.pop_front().unwrap_or(DriverStatus::OK)
    }

    fn error_text(&self, status: DriverStatus) -> String {
        match status.class {
            StatusClass::Ok => "no error".to_string(),
            StatusClass::Retryable => format!("simulated: hardware not ready ({})", status.code),
            StatusClass::HardwareRemoved => {
                format!("simulated: adapter removed ({})", status.code)
            }
            StatusClass::Other => format!("simulated: driver fault ({})", status.code),
        }
    }
}

const SIM_CODE_NOT_OPEN: u32 = 900;
const SIM_CODE_QUEUE_EMPTY: u32 = 901;

impl SimHandle {
    /// Queue a result for the next `open` call.
    pub fn push_open_result(&self, status: DriverStatus) {
        self.state.lock().unwrap().open_results.push_back(status);
    }

    /// Set the result `open` returns when nothing is scripted.
    pub fn set_default_open(&self, status: DriverStatus) {
        self.state.lock().unwrap().default_open = status;
    }

    /// Queue a result for the next `get_status` poll.
    pub fn push_poll_status(&self, status: DriverStatus) {
        self.state.lock().unwrap().poll_results.push_back(status);
    }

    /// Make a frame available for the next `read` poll.
    pub fn push_rx_frame(&self, frame: WireFrame) {
        self.state.lock().unwrap().rx_queue.push_back(frame);
    }

    /// Frames the driver was asked to transmit, oldest first.
    pub fn written_frames(&self) -> Vec<WireFrame> {
        self.state.lock().unwrap().tx_log.clone()
    }

    /// Bit rate of the most recent successful open.
    pub fn last_open_baud(&self) -> Option<BaudRate> {
        self.state.lock().unwrap().last_baud
    }

    pub fn is_open(&self) -> bool {
        self.state.lock().unwrap().open
    }

    pub fn open_calls(&self) -> u64 {
        self.state.lock().unwrap().open_calls
    }

    pub fn close_calls(&self) -> u64 {
        self.state.lock().unwrap().close_calls
    }

    pub fn write_calls(&self) -> u64 {
        self.state.lock().unwrap().write_calls
    }

    /// Highest number of simultaneously open handles ever observed.
    /// Stays at 1 when the single-handle invariant holds.
    pub fn max_open_handles(&self) -> u32 {
        self.state.lock().unwrap().max_open
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_open_succeeds() {
        let (mut driver, handle) = SimDriver::new();
        assert!(driver.open(BaudRate::Baud250K).is_ok());
        assert!(handle.is_open());
        assert_eq!(handle.last_open_baud(), Some(BaudRate::Baud250K));
    }

    #[test]
    fn test_scripted_open_results_run_in_order() {
        let (mut driver, handle) = SimDriver::new();
        handle.push_open_result(DriverStatus::retryable(1));
        handle.push_open_result(DriverStatus::retryable(1));

        assert_eq!(driver.open(BaudRate::Baud250K).class, StatusClass::Retryable);
        assert_eq!(driver.open(BaudRate::Baud250K).class, StatusClass::Retryable);
        // Queue drained: falls back to the default (Ok)
        assert!(driver.open(BaudRate::Baud250K).is_ok());
        assert_eq!(handle.open_calls(), 3);
    }

    #[test]
    fn test_read_empty_queue_is_retryable() {
        let (mut driver, _handle) = SimDriver::new();
        driver.open(BaudRate::Baud250K);
        let (frame, status) = driver.read();
        assert!(frame.is_none());
        assert_eq!(status.class, StatusClass::Retryable);
    }

    #[test]
    fn test_write_when_closed_fails() {
        let (mut driver, handle) = SimDriver::new();
        let frame = WireFrame {
            id: 0x123,
            msg_type: 0,
            dlc: 0,
            data: [0u8; 8],
        };
        assert_eq!(driver.write(&frame).class, StatusClass::Other);
        assert!(handle.written_frames().is_empty());
    }

    #[test]
    fn test_open_close_handle_accounting() {
        let (mut driver, handle) = SimDriver::new();
        driver.open(BaudRate::Baud250K);
        // A second open while already open must not create a second handle
        driver.open(BaudRate::Baud250K);
        assert_eq!(handle.max_open_handles(), 1);
        driver.close();
        driver.close();
        assert!(!handle.is_open());
    }
}
