// src/io/channel.rs
//
// Channel handle: owns the single adapter driver handle and enforces the
// one-open-handle invariant. The monitor and the command surface share one
// instance behind a mutex; the lock is only ever held for the duration of
// a driver call.

use super::codec;
use super::driver::{CanDriver, DriverStatus, StatusClass};
use super::{BaudRate, CanFrame, IoError};

/// The single owner of the adapter handle.
///
/// `is_open == true` implies the driver handle is valid and was initialised
/// at `baud_rate`; `is_open == false` implies no handle is held.
pub struct ChannelHandle {
    driver: Box<dyn CanDriver>,
    is_open: bool,
    baud_rate: BaudRate,
    last_status: DriverStatus,
}

impl ChannelHandle {
    pub fn new(driver: Box<dyn CanDriver>, baud_rate: BaudRate) -> Self {
        Self {
            driver,
            is_open: false,
            baud_rate,
            last_status: DriverStatus::OK,
        }
    }

    /// Attempt to acquire the hardware handle at the configured bit rate.
    /// Idempotent: already open returns success without reopening.
    pub fn open(&mut self) -> DriverStatus {
        if self.is_open {
            return DriverStatus::OK;
        }
        let status = self.driver.open(self.baud_rate);
        self.last_status = status;
        if status.is_ok() {
            self.is_open = true;
        }
        status
    }

    /// Release the handle unconditionally. Safe to call when already closed.
    pub fn close(&mut self) {
        self.driver.close();
        self.is_open = false;
        self.last_status = DriverStatus::OK;
    }

    /// Transmit one frame. Fails fast with `NotConnected` when the channel
    /// is closed, without touching the driver.
    pub fn write(&mut self, frame: &CanFrame) -> Result<(), IoError> {
        if !self.is_open {
            return Err(IoError::NotConnected);
        }
        let status = self.driver.write(&codec::encode(frame));
        self.last_status = status;
        if status.is_ok() {
            Ok(())
        } else {
            Err(IoError::driver(self.driver.error_text(status)))
        }
    }

    /// Poll for one received frame. `Ok(None)` means the queue is empty.
    pub fn read(&mut self) -> Result<Option<CanFrame>, IoError> {
        if !self.is_open {
            return Err(IoError::NotConnected);
        }
        let (wire, status) = self.driver.read();
        self.last_status = status;
        match status.class {
            StatusClass::Ok => Ok(wire.as_ref().map(codec::decode)),
            StatusClass::Retryable => Ok(None),
            _ => Err(IoError::driver(self.driver.error_text(status))),
        }
    }

    /// Query live hardware status without transferring data.
    pub fn poll_status(&mut self) -> DriverStatus {
        let status = self.driver.get_status();
        self.last_status = status;
        status
    }

    /// Store a new bit rate; if the channel is open, close it so the next
    /// open attempt uses the new rate. Returns whether a handle was closed.
    pub fn set_baud_rate(&mut self, baud_rate: BaudRate) -> bool {
        self.baud_rate = baud_rate;
        if self.is_open {
            self.close();
            true
        } else {
            false
        }
    }

    pub fn is_open(&self) -> bool {
        self.is_open
    }

    pub fn baud_rate(&self) -> BaudRate {
        self.baud_rate
    }

    pub fn last_status(&self) -> DriverStatus {
        self.last_status
    }

    /// Driver-provided text for a status code.
    pub fn error_text(&self, status: DriverStatus) -> String {
        self.driver.error_text(status)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::super::driver::sim::SimDriver;
    use super::*;

    fn channel() -> (ChannelHandle, super::super::driver::sim::SimHandle) {
        let (driver, handle) = SimDriver::new();
        (
            ChannelHandle::new(Box::new(driver), BaudRate::default()),
            handle,
        )
    }

    #[test]
    fn test_open_is_idempotent() {
        let (mut ch, sim) = channel();
        assert!(ch.open().is_ok());
        assert!(ch.open().is_ok());
        // Second open never reached the driver
        assert_eq!(sim.open_calls(), 1);
        assert_eq!(sim.max_open_handles(), 1);
    }

    #[test]
    fn test_close_when_already_closed_is_a_noop() {
        let (mut ch, sim) = channel();
        ch.close();
        ch.close();
        assert!(!ch.is_open());
        assert!(!sim.is_open());
    }

    #[test]
    fn test_write_when_closed_skips_driver() {
        let (mut ch, sim) = channel();
        let frame = CanFrame::new(0x123, &[1, 2]).unwrap();
        assert_eq!(ch.write(&frame), Err(IoError::NotConnected));
        assert_eq!(sim.write_calls(), 0);
    }

    #[test]
    fn test_read_when_closed_fails_fast() {
        let (mut ch, _sim) = channel();
        assert_eq!(ch.read(), Err(IoError::NotConnected));
    }

    #[test]
    fn test_write_reaches_driver_when_open() {
        let (mut ch, sim) = channel();
        ch.open();
        let frame = CanFrame::new(0x70A, &[0xAB]).unwrap();
        ch.write(&frame).unwrap();
        let written = sim.written_frames();
        assert_eq!(written.len(), 1);
        assert_eq!(written[0].id, 0x70A);
        assert_eq!(written[0].dlc, 1);
    }

    #[test]
    fn test_read_round_trips_through_codec() {
        let (mut ch, sim) = channel();
        ch.open();
        let frame = CanFrame::new(0x181, &[0x10, 0x20, 0x30]).unwrap();
        sim.push_rx_frame(codec::encode(&frame));
        assert_eq!(ch.read().unwrap(), Some(frame));
        // Queue now empty: Retryable maps to Ok(None)
        assert_eq!(ch.read().unwrap(), None);
    }

    #[test]
    fn test_baud_change_closes_open_channel() {
        let (mut ch, sim) = channel();
        ch.open();
        assert!(ch.set_baud_rate(BaudRate::Baud1M));
        assert!(!ch.is_open());
        assert!(!sim.is_open());
        // Next open uses the new rate
        ch.open();
        assert_eq!(sim.last_open_baud(), Some(BaudRate::Baud1M));
    }

    #[test]
    fn test_baud_change_while_closed_just_stores() {
        let (mut ch, sim) = channel();
        assert!(!ch.set_baud_rate(BaudRate::Baud500K));
        assert_eq!(ch.baud_rate(), BaudRate::Baud500K);
        assert_eq!(sim.close_calls(), 0);
    }
}
