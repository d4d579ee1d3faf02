// src/io/mod.rs
//
// Adapter IO layer: shared frame/baud types, the frame codec, the driver
// boundary, the channel handle and the connection monitor.
//
// The monitor owns the single channel; everything else reaches the bus
// through the command surface in `crate::surface`.

pub mod channel;
pub mod codec;
pub mod driver;
mod error;
pub mod monitor;

pub use channel::ChannelHandle;
pub use codec::{decode, encode, WireFrame};
pub use driver::sim::{SimDriver, SimHandle};
#[cfg(target_os = "linux")]
pub use driver::socketcan::SocketCanDriver;
pub use driver::{CanDriver, DriverStatus, StatusClass};
pub use error::IoError;
pub use monitor::{ConnectionMonitor, DisconnectReason, MonitorEvent};

use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

// ============================================================================
// Shared Types
// ============================================================================

/// Classic CAN frame with an 11-bit identifier and up to 8 data bytes.
///
/// Value type, created per message. Bytes past `len` are filler and are
/// kept zeroed so frames compare by value.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanFrame {
    /// Frame identifier (0–0x7FF, standard addressing only)
    pub id: u16,
    /// Number of valid data bytes (0–8)
    pub len: u8,
    /// Frame payload; only the first `len` bytes are meaningful
    pub data: [u8; 8],
}

impl CanFrame {
    /// Highest valid standard-frame identifier.
    pub const MAX_ID: u16 = 0x7FF;

    /// Build a frame from an identifier and payload slice.
    /// Rejects identifiers outside standard addressing and payloads over 8 bytes.
    pub fn new(id: u16, payload: &[u8]) -> Result<Self, IoError> {
        if id > Self::MAX_ID {
            return Err(IoError::configuration(format!(
                "frame id 0x{:X} exceeds standard addressing (max 0x{:X})",
                id,
                Self::MAX_ID
            )));
        }
        if payload.len() > 8 {
            return Err(IoError::configuration(format!(
                "payload length {} exceeds 8 bytes",
                payload.len()
            )));
        }
        let mut data = [0u8; 8];
        data[..payload.len()].copy_from_slice(payload);
        Ok(Self {
            id,
            len: payload.len() as u8,
            data,
        })
    }

    /// The valid portion of the payload.
    pub fn payload(&self) -> &[u8] {
        &self.data[..(self.len as usize).min(8)]
    }
}

/// Get current time in microseconds since UNIX epoch
pub fn now_us() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_micros() as u64)
        .unwrap_or(0)
}

// ============================================================================
// Baud Rates
// ============================================================================

/// The fixed 14-entry bit-rate table, indexed 0–13.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BaudRate {
    Baud1M,
    Baud800K,
    Baud500K,
    Baud250K,
    Baud125K,
    Baud100K,
    Baud95K,
    Baud83K,
    Baud50K,
    Baud47K,
    Baud33K,
    Baud20K,
    Baud10K,
    Baud5K,
}

/// (rate, bits per second, display label) for every table entry, in index order
pub const BAUD_TABLE: [(BaudRate, u32, &str); 14] = [
    (BaudRate::Baud1M, 1_000_000, "1 MBit/s"),
    (BaudRate::Baud800K, 800_000, "800 kBit/s"),
    (BaudRate::Baud500K, 500_000, "500 kBit/s"),
    (BaudRate::Baud250K, 250_000, "250 kBit/s"),
    (BaudRate::Baud125K, 125_000, "125 kBit/s"),
    (BaudRate::Baud100K, 100_000, "100 kBit/s"),
    (BaudRate::Baud95K, 95_238, "95.238 kBit/s"),
    (BaudRate::Baud83K, 83_333, "83.333 kBit/s"),
    (BaudRate::Baud50K, 50_000, "50 kBit/s"),
    (BaudRate::Baud47K, 47_619, "47.619 kBit/s"),
    (BaudRate::Baud33K, 33_333, "33.333 kBit/s"),
    (BaudRate::Baud20K, 20_000, "20 kBit/s"),
    (BaudRate::Baud10K, 10_000, "10 kBit/s"),
    (BaudRate::Baud5K, 5_000, "5 kBit/s"),
];

impl BaudRate {
    /// Look up a rate by table index. Indices past the end of the table
    /// clamp to the last entry.
    pub fn from_index(index: u8) -> Self {
        let clamped = (index as usize).min(BAUD_TABLE.len() - 1);
        BAUD_TABLE[clamped].0
    }

    /// Table index of this rate (0–13).
    pub fn index(&self) -> u8 {
        BAUD_TABLE
            .iter()
            .position(|(rate, _, _)| rate == self)
            .unwrap_or(0) as u8
    }

    /// Nominal bit rate in bits per second.
    pub fn bits(&self) -> u32 {
        BAUD_TABLE[self.index() as usize].1
    }

    /// Human-readable label, e.g. "250 kBit/s".
    pub fn label(&self) -> &'static str {
        BAUD_TABLE[self.index() as usize].2
    }
}

impl Default for BaudRate {
    fn default() -> Self {
        BaudRate::Baud250K
    }
}

impl std::fmt::Display for BaudRate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

// ============================================================================
// Tests
// ============================================================================
