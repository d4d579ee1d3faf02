// src/lib.rs
//
// canwatch: background CAN adapter connection monitor.
//
// The connection monitor keeps one channel to a CAN adapter alive — it
// retries initialisation while the hardware is absent, detects hot-plug
// removal, and reopens after baud-rate changes — while concurrent callers
// read and write frames through the command surface. An expedited SDO
// client rides on the same channel.

pub mod logging;

pub mod io;
pub mod sdo;
pub mod settings;
pub mod status;
pub mod surface;

pub use io::{
    BaudRate, CanDriver, CanFrame, ConnectionMonitor, DisconnectReason, DriverStatus, IoError,
    MonitorEvent, SimDriver, SimHandle, StatusClass,
};
pub use sdo::{SdoClient, SdoData};
pub use settings::MonitorSettings;
pub use surface::CommandSurface;
