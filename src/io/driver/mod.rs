// src/io/driver/mod.rs
//
// Adapter driver boundary. The monitor and command surface only ever talk
// to this trait, so the whole connection lifecycle can run against the
// simulated driver in tests.
//
// The contract is synchronous and polling-based: every call returns
// promptly (bounded by the driver's own timeout) with a status code that
// classifies into one of four outcome classes.

pub mod sim;

#[cfg(target_os = "linux")]
pub mod socketcan;

use super::codec::WireFrame;
use super::BaudRate;

// ============================================================================
// Status Codes
// ============================================================================

/// Outcome class of a driver status code.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StatusClass {
    /// Operation succeeded
    Ok,
    /// Transient condition: hardware not present yet, or receive queue empty
    Retryable,
    /// The adapter was unplugged after being open
    HardwareRemoved,
    /// Unexpected driver error
    Other,
}

/// Raw driver result code together with its classification.
///
/// The code itself is opaque above the driver boundary; only the class and
/// the driver-provided text ever travel upward.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DriverStatus {
    /// Driver-specific raw code (0 is success by convention)
    pub code: u32,
    pub class: StatusClass,
}

impl DriverStatus {
    /// Successful operation.
    pub const OK: DriverStatus = DriverStatus {
        code: 0,
        class: StatusClass::Ok,
    };

    pub fn retryable(code: u32) -> Self {
        DriverStatus {
            code,
            class: StatusClass::Retryable,
        }
    }

    pub fn hardware_removed(code: u32) -> Self {
        DriverStatus {
            code,
            class: StatusClass::HardwareRemoved,
        }
    }

    pub fn other(code: u32) -> Self {
        DriverStatus {
            code,
            class: StatusClass::Other,
        }
    }

    pub fn is_ok(&self) -> bool {
        self.class == StatusClass::Ok
    }
}

// ============================================================================
// Driver Trait
// ============================================================================

/// The adapter driver surface: open/close/read/write/status/error-text.
///
/// Implementations hold at most one OS handle and must tolerate `close`
/// when nothing is open. All calls are bounded; `read` is a non-blocking
/// poll that reports an empty queue as `Retryable`.
pub trait CanDriver: Send {
    /// Acquire the hardware handle at the given bit rate.
    fn open(&mut self, baud: BaudRate) -> DriverStatus;

    /// Release the hardware handle. Safe to call when already closed.
    fn close(&mut self) -> DriverStatus;

    /// Transmit one frame. Fails when no handle is open.
    fn write(&mut self, frame: &WireFrame) -> DriverStatus;

    /// Poll for one received frame. `(None, Retryable)` means the receive
    /// queue is empty.
    fn read(&mut self) -> (Option<WireFrame>, DriverStatus);

    /// Query live hardware status without transferring data. Used to
    /// detect asynchronous adapter removal.
    fn get_status(&mut self) -> DriverStatus;

    /// Driver-provided text for a status code.
    fn error_text(&self, status: DriverStatus) -> String;
}
