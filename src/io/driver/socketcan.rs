// src/io/driver/socketcan.rs
//
// SocketCAN adapter driver for Linux. USB-CAN adapters bound by the kernel
// (gs_usb/candleLight, slcan, native controllers) appear as network
// interfaces; unplugging the adapter removes the interface, which is how
// asynchronous removal is detected here.
//
// The kernel owns the bit timing (`ip link set canX type can bitrate N`),
// so `open` records the requested rate but cannot program it from
// userspace. This module is only compiled on Linux.

use socketcan::{CanDataFrame, CanSocket, EmbeddedFrame, Frame, Id, Socket, StandardId};

use super::super::codec::{WireFrame, WIRE_MSG_STANDARD};
use super::super::BaudRate;
use super::{CanDriver, DriverStatus, StatusClass};

/// Fallback raw code when the OS gives us no errno.
const CODE_UNKNOWN: u32 = 0xFFFF;

/// SocketCAN driver bound to one interface name (e.g. "can0").
pub struct SocketCanDriver {
    interface: String,
    socket: Option<CanSocket>,
    /// Text of the most recent failure, keyed by its raw code
    last_error: Option<(u32, String)>,
}

impl SocketCanDriver {
    pub fn new(interface: impl Into<String>) -> Self {
        Self {
            interface: interface.into(),
            socket: None,
            last_error: None,
        }
    }

    /// Whether the kernel still knows the interface. Unplugging a USB
    /// adapter removes its entry under /sys/class/net.
    fn interface_present(&self) -> bool {
        std::path::Path::new("/sys/class/net")
            .join(&self.interface)
            .exists()
    }

    fn remember(&mut self, code: u32, text: String) {
        self.last_error = Some((code, text));
    }

    /// Classify an open failure: a missing interface is the transient
    /// "hardware not present yet" case the monitor retries silently.
    fn classify_open_error(e: &std::io::Error) -> DriverStatus {
        let code = e.raw_os_error().map(|c| c as u32).unwrap_or(CODE_UNKNOWN);
        match e.raw_os_error() {
            // ENODEV, ENXIO
            Some(19) | Some(6) => DriverStatus::retryable(code),
            _ if e.kind() == std::io::ErrorKind::NotFound => DriverStatus::retryable(code),
            _ => DriverStatus::other(code),
        }
    }

    /// Classify a read/write failure on an open socket. The interface
    /// vanishing underneath us is hardware removal, not a driver fault.
    fn classify_io_error(e: &std::io::Error) -> DriverStatus {
        let code = e.raw_os_error().map(|c| c as u32).unwrap_or(CODE_UNKNOWN);
        match e.raw_os_error() {
            // ENODEV, ENXIO, ENETDOWN
            Some(19) | Some(6) | Some(100) => DriverStatus::hardware_removed(code),
            _ if e.kind() == std::io::ErrorKind::WouldBlock => DriverStatus::retryable(code),
            _ => DriverStatus::other(code),
        }
    }
}

impl CanDriver for SocketCanDriver {
    fn open(&mut self, _baud: BaudRate) -> DriverStatus {
        if self.socket.is_some() {
            return DriverStatus::OK;
        }

        let socket = match CanSocket::open(&self.interface) {
            Ok(s) => s,
            Err(e) => {
                let status = Self::classify_open_error(&e);
                self.remember(status.code, format!("open {}: {}", self.interface, e));
                return status;
            }
        };

        if let Err(e) = socket.set_nonblocking(true) {
            let code = e.raw_os_error().map(|c| c as u32).unwrap_or(CODE_UNKNOWN);
            self.remember(code, format!("set non-blocking on {}: {}", self.interface, e));
            return DriverStatus::other(code);
        }

        self.socket = Some(socket);
        DriverStatus::OK
    }

    fn close(&mut self) -> DriverStatus {
        // Dropping the socket releases the OS handle
        self.socket = None;
        DriverStatus::OK
    }

    fn write(&mut self, frame: &WireFrame) -> DriverStatus {
        let socket = match self.socket.as_ref() {
            Some(s) => s,
            None => return DriverStatus::other(CODE_UNKNOWN),
        };

        let id = match StandardId::new((frame.id & 0x7FF) as u16) {
            Some(id) => id,
            None => return DriverStatus::other(CODE_UNKNOWN),
        };
        let payload = &frame.data[..(frame.dlc as usize).min(8)];
        let data_frame = match CanDataFrame::new(Id::Standard(id), payload) {
            Some(f) => f,
            None => return DriverStatus::other(CODE_UNKNOWN),
        };

        match socket.write_frame(&socketcan::CanFrame::Data(data_frame)) {
            Ok(()) => DriverStatus::OK,
            Err(e) => {
                let status = Self::classify_io_error(&e);
                self.remember(status.code, format!("write {}: {}", self.interface, e));
                status
            }
        }
    }

    fn read(&mut self) -> (Option<WireFrame>, DriverStatus) {
        let socket = match self.socket.as_ref() {
            Some(s) => s,
            None => return (None, DriverStatus::other(CODE_UNKNOWN)),
        };

        match socket.read_frame() {
            Ok(socketcan::CanFrame::Data(f)) => {
                // Extended and remote frames are outside standard addressing
                if f.is_extended() {
                    return (None, DriverStatus::retryable(0));
                }
                let payload = f.data();
                let mut data = [0u8; 8];
                let len = payload.len().min(8);
                data[..len].copy_from_slice(&payload[..len]);
                let wire = WireFrame {
                    id: f.raw_id() & 0x7FF,
                    msg_type: WIRE_MSG_STANDARD,
                    dlc: len as u8,
                    data,
                };
                (Some(wire), DriverStatus::OK)
            }
            Ok(_) => (None, DriverStatus::retryable(0)),
            Err(e) => {
                let status = Self::classify_io_error(&e);
                if status.class != StatusClass::Retryable {
                    self.remember(status.code, format!("read {}: {}", self.interface, e));
                }
                (None, status)
            }
        }
    }

    fn get_status(&mut self) -> DriverStatus {
        if self.socket.is_none() {
            return DriverStatus::retryable(CODE_UNKNOWN);
        }
        if self.interface_present() {
            DriverStatus::OK
        } else {
            let status = DriverStatus::hardware_removed(19);
            self.remember(
                status.code,
                format!("interface {} disappeared", self.interface),
            );
            status
        }
    }

    fn error_text(&self, status: DriverStatus) -> String {
        if let Some((code, text)) = &self.last_error {
            if *code == status.code {
                return text.clone();
            }
        }
        match status.class {
            StatusClass::Ok => "no error".to_string(),
            StatusClass::Retryable => format!("{} not available yet", self.interface),
            StatusClass::HardwareRemoved => format!("{} removed", self.interface),
            StatusClass::Other => format!("driver error on {} (code {})", self.interface, status.code),
        }
    }
}
