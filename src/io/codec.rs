// src/io/codec.rs
//
// Frame codec: conversion between the neutral `CanFrame` and the fixed
// wire record the adapter driver reads and writes.
//
// Both directions are pure, total functions. Identifiers above the
// standard-frame range are clamped (masked to 11 bits); payload bytes past
// the declared length are zeroed so that decode(encode(f)) == f holds for
// every valid frame.

use super::CanFrame;

/// Message type marker for standard (11-bit) data frames.
pub const WIRE_MSG_STANDARD: u8 = 0x00;

/// Fixed-layout frame record exchanged with the adapter driver.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WireFrame {
    /// Raw identifier as the driver carries it
    pub id: u32,
    /// Driver message type (standard data frames only at this layer)
    pub msg_type: u8,
    /// Data length code (0–8)
    pub dlc: u8,
    /// Fixed payload buffer; `dlc` bytes are valid
    pub data: [u8; 8],
}

/// Encode a neutral frame into the driver's wire record.
pub fn encode(frame: &CanFrame) -> WireFrame {
    let len = (frame.len as usize).min(8);
    let mut data = [0u8; 8];
    data[..len].copy_from_slice(&frame.data[..len]);
    WireFrame {
        id: u32::from(frame.id) & u32::from(CanFrame::MAX_ID),
        msg_type: WIRE_MSG_STANDARD,
        dlc: len as u8,
        data,
    }
}

/// Decode a driver wire record into a neutral frame.
pub fn decode(wire: &WireFrame) -> CanFrame {
    let len = (wire.dlc as usize).min(8);
    let mut data = [0u8; 8];
    data[..len].copy_from_slice(&wire.data[..len]);
    CanFrame {
        id: (wire.id & u32::from(CanFrame::MAX_ID)) as u16,
        len: len as u8,
        data,
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roundtrip_all_lengths() {
        for len in 0..=8usize {
            let payload: Vec<u8> = (0..len as u8).map(|i| 0x10 + i).collect();
            let frame = CanFrame::new(0x123, &payload).unwrap();
            assert_eq!(decode(&encode(&frame)), frame);
        }
    }

    #[test]
    fn test_roundtrip_boundary_ids() {
        for id in [0x000, 0x001, 0x3FF, 0x7FF] {
            let frame = CanFrame::new(id, &[0xDE, 0xAD]).unwrap();
            assert_eq!(decode(&encode(&frame)), frame);
        }
    }

    #[test]
    fn test_decode_clamps_out_of_range_id() {
        let wire = WireFrame {
            id: 0x1234_5678,
            msg_type: WIRE_MSG_STANDARD,
            dlc: 0,
            data: [0u8; 8],
        };
        assert_eq!(decode(&wire).id, 0x678 & 0x7FF);
        assert!(decode(&wire).id <= CanFrame::MAX_ID);
    }

    #[test]
    fn test_decode_clamps_oversized_dlc() {
        let wire = WireFrame {
            id: 0x100,
            msg_type: WIRE_MSG_STANDARD,
            dlc: 15,
            data: [0xFF; 8],
        };
        let frame = decode(&wire);
        assert_eq!(frame.len, 8);
    }

    #[test]
    fn test_decode_zeroes_filler_bytes() {
        let wire = WireFrame {
            id: 0x100,
            msg_type: WIRE_MSG_STANDARD,
            dlc: 2,
            data: [0xAA; 8],
        };
        let frame = decode(&wire);
        assert_eq!(frame.payload(), &[0xAA, 0xAA]);
        assert_eq!(frame.data[2..], [0u8; 6]);
    }

    #[test]
    fn test_encode_marks_standard_type() {
        let frame = CanFrame::new(0x7FF, &[1, 2, 3]).unwrap();
        let wire = encode(&frame);
        assert_eq!(wire.msg_type, WIRE_MSG_STANDARD);
        assert_eq!(wire.dlc, 3);
        assert_eq!(wire.id, 0x7FF);
    }
}
