// src/sdo.rs
//
// SDO client: expedited Service Data Object transfers over the command
// surface. Requests go out on COB-ID 0x600 + node, responses come back on
// 0x580 + node; transfers above 4 bytes (segmented mode) are out of scope
// for this tool.
//
// The client is a single consumer of the channel's receive queue: frames
// observed while waiting for a response that are not the response are
// discarded.

use std::time::Duration;

use crate::io::{CanFrame, IoError};
use crate::surface::CommandSurface;

/// COB-ID base for client → server SDO requests.
pub const SDO_REQUEST_BASE: u16 = 0x600;
/// COB-ID base for server → client SDO responses.
pub const SDO_RESPONSE_BASE: u16 = 0x580;

const CS_UPLOAD_REQUEST: u8 = 0x40;
const CS_DOWNLOAD_RESPONSE: u8 = 0x60;
const CS_ABORT: u8 = 0x80;

/// Node ids live in 1–0x7F; higher values wrap into range.
fn wrap_node_id(node_id: u8) -> u8 {
    node_id & 0x7F
}

// ============================================================================
// Expedited Payload
// ============================================================================

/// Payload of an expedited transfer: 1–4 bytes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SdoData {
    len: u8,
    bytes: [u8; 4],
}

impl SdoData {
    /// Build from a slice of 1–4 bytes.
    pub fn new(payload: &[u8]) -> Result<Self, IoError> {
        if payload.is_empty() || payload.len() > 4 {
            return Err(IoError::configuration(format!(
                "expedited SDO payload must be 1-4 bytes, got {}",
                payload.len()
            )));
        }
        let mut bytes = [0u8; 4];
        bytes[..payload.len()].copy_from_slice(payload);
        Ok(Self {
            len: payload.len() as u8,
            bytes,
        })
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.bytes[..self.len as usize]
    }

    pub fn len(&self) -> usize {
        self.len as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Value as little-endian u32, zero-extended.
    pub fn as_u32(&self) -> u32 {
        u32::from_le_bytes(self.bytes)
    }
}

// ============================================================================
// Request / Response Framing
// ============================================================================

/// Client → server request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SdoRequest {
    /// Read an object (expedited upload)
    Upload { index: u16, sub_index: u8 },
    /// Write an object (expedited download)
    Download {
        index: u16,
        sub_index: u8,
        data: SdoData,
    },
}

impl SdoRequest {
    fn index(&self) -> u16 {
        match self {
            SdoRequest::Upload { index, .. } | SdoRequest::Download { index, .. } => *index,
        }
    }

    fn sub_index(&self) -> u8 {
        match self {
            SdoRequest::Upload { sub_index, .. } | SdoRequest::Download { sub_index, .. } => {
                *sub_index
            }
        }
    }
}

/// Server → client response.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SdoResponse {
    Upload {
        index: u16,
        sub_index: u8,
        data: SdoData,
    },
    Download {
        index: u16,
        sub_index: u8,
    },
    Abort {
        index: u16,
        sub_index: u8,
        code: u32,
    },
}

impl SdoResponse {
    fn index(&self) -> u16 {
        match self {
            SdoResponse::Upload { index, .. }
            | SdoResponse::Download { index, .. }
            | SdoResponse::Abort { index, .. } => *index,
        }
    }

    fn sub_index(&self) -> u8 {
        match self {
            SdoResponse::Upload { sub_index, .. }
            | SdoResponse::Download { sub_index, .. }
            | SdoResponse::Abort { sub_index, .. } => *sub_index,
        }
    }
}

/// Encode a request into the 8-byte SDO frame for the node.
pub fn encode_request(node_id: u8, request: &SdoRequest) -> CanFrame {
    let id = SDO_REQUEST_BASE + u16::from(wrap_node_id(node_id));
    let mut data = [0u8; 8];
    data[1] = (request.index() & 0xFF) as u8;
    data[2] = (request.index() >> 8) as u8;
    data[3] = request.sub_index();

    match request {
        SdoRequest::Upload { .. } => {
            data[0] = CS_UPLOAD_REQUEST;
        }
        SdoRequest::Download { data: payload, .. } => {
            // Expedited, size indicated: 0x23/0x27/0x2B/0x2F for 4..1 bytes
            let unused = 4 - payload.len() as u8;
            data[0] = 0x23 | (unused << 2);
            data[4..4 + payload.len()].copy_from_slice(payload.as_slice());
        }
    }

    CanFrame { id, len: 8, data }
}

/// Decode a frame as an SDO response from the node. Returns `None` for
/// frames on other COB-IDs, segmented transfers and unknown specifiers.
pub fn decode_response(node_id: u8, frame: &CanFrame) -> Option<SdoResponse> {
    if frame.id != SDO_RESPONSE_BASE + u16::from(wrap_node_id(node_id)) {
        return None;
    }
    if frame.len < 4 {
        return None;
    }

    let cs = frame.data[0];
    let index = u16::from_le_bytes([frame.data[1], frame.data[2]]);
    let sub_index = frame.data[3];

    if cs == CS_ABORT {
        let code = u32::from_le_bytes([
            frame.data[4],
            frame.data[5],
            frame.data[6],
            frame.data[7],
        ]);
        return Some(SdoResponse::Abort {
            index,
            sub_index,
            code,
        });
    }

    if cs == CS_DOWNLOAD_RESPONSE {
        return Some(SdoResponse::Download { index, sub_index });
    }

    // Upload response: 0x4x with the expedited bit set
    if cs & 0xE0 == 0x40 && cs & 0x02 != 0 {
        let len = if cs & 0x01 != 0 {
            4 - ((cs >> 2) & 0x03) as usize
        } else {
            4
        };
        let data = SdoData::new(&frame.data[4..4 + len]).ok()?;
        return Some(SdoResponse::Upload {
            index,
            sub_index,
            data,
        });
    }

    None
}

// ============================================================================
// Client
// ============================================================================

/// Default bound on a response wait.
pub const DEFAULT_SDO_TIMEOUT: Duration = Duration::from_millis(500);

/// Interval between receive-queue polls while waiting for a response.
const RESPONSE_POLL_INTERVAL: Duration = Duration::from_millis(2);

/// Issues expedited SDO transfers through the command surface.
pub struct SdoClient {
    surface: CommandSurface,
    node_id: u8,
    timeout: Duration,
}

impl SdoClient {
    pub fn new(surface: CommandSurface, node_id: u8) -> Self {
        Self {
            surface,
            node_id: wrap_node_id(node_id),
            timeout: DEFAULT_SDO_TIMEOUT,
        }
    }

    pub fn set_timeout(&mut self, timeout: Duration) {
        self.timeout = timeout;
    }

    /// Read an object from the node's dictionary.
    pub async fn upload(&self, index: u16, sub_index: u8) -> Result<SdoData, IoError> {
        let request = SdoRequest::Upload { index, sub_index };
        match self.transfer(request).await? {
            SdoResponse::Upload { data, .. } => Ok(data),
            other => Err(IoError::driver(format!(
                "unexpected SDO response: {:?}",
                other
            ))),
        }
    }

    /// Write an object to the node's dictionary.
    pub async fn download(&self, index: u16, sub_index: u8, data: SdoData) -> Result<(), IoError> {
        let request = SdoRequest::Download {
            index,
            sub_index,
            data,
        };
        match self.transfer(request).await? {
            SdoResponse::Download { .. } => Ok(()),
            other => Err(IoError::driver(format!(
                "unexpected SDO response: {:?}",
                other
            ))),
        }
    }

    /// Send one request and wait for its matching response within the
    /// timeout. Aborts surface as `IoError::SdoAbort`.
    async fn transfer(&self, request: SdoRequest) -> Result<SdoResponse, IoError> {
        self.surface
            .write_frame(&encode_request(self.node_id, &request))?;

        let deadline = tokio::time::Instant::now() + self.timeout;
        loop {
            match self.surface.read_frame()? {
                Some(frame) => {
                    if let Some(response) = decode_response(self.node_id, &frame) {
                        if response.index() == request.index()
                            && response.sub_index() == request.sub_index()
                        {
                            if let SdoResponse::Abort { code, .. } = response {
                                return Err(IoError::SdoAbort { code });
                            }
                            return Ok(response);
                        }
                    }
                    // Unrelated frame while waiting; keep draining
                }
                None => tokio::time::sleep(RESPONSE_POLL_INTERVAL).await,
            }
            if tokio::time::Instant::now() >= deadline {
                return Err(IoError::Timeout);
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upload_request_layout() {
        let frame = encode_request(
            0x23,
            &SdoRequest::Upload {
                index: 0x1017,
                sub_index: 0x01,
            },
        );
        assert_eq!(frame.id, 0x623);
        assert_eq!(frame.len, 8);
        assert_eq!(&frame.data[..4], &[0x40, 0x17, 0x10, 0x01]);
        assert_eq!(&frame.data[4..], &[0, 0, 0, 0]);
    }

    #[test]
    fn test_download_request_specifier_per_size() {
        // 0x2F, 0x2B, 0x27, 0x23 for 1..4 bytes
        let expected = [0x2F, 0x2B, 0x27, 0x23];
        for len in 1..=4usize {
            let payload: Vec<u8> = (1..=len as u8).collect();
            let frame = encode_request(
                0x01,
                &SdoRequest::Download {
                    index: 0x2000,
                    sub_index: 0,
                    data: SdoData::new(&payload).unwrap(),
                },
            );
            assert_eq!(frame.data[0], expected[len - 1], "len {}", len);
            assert_eq!(&frame.data[4..4 + len], payload.as_slice());
        }
    }

    #[test]
    fn test_node_id_wraps_into_range() {
        let frame = encode_request(
            0xFF,
            &SdoRequest::Upload {
                index: 0,
                sub_index: 0,
            },
        );
        assert_eq!(frame.id, 0x600 + 0x7F);
        assert!(frame.id <= CanFrame::MAX_ID);
    }

    #[test]
    fn test_decode_expedited_upload_sizes() {
        for len in 1..=4usize {
            let cs = 0x43 | (((4 - len) as u8) << 2);
            let mut data = [0u8; 8];
            data[0] = cs;
            data[1] = 0x17;
            data[2] = 0x10;
            data[3] = 0x00;
            for (i, byte) in (0..len).enumerate() {
                data[4 + i] = 0xA0 + byte as u8;
            }
            let frame = CanFrame { id: 0x585, len: 8, data };
            match decode_response(0x05, &frame) {
                Some(SdoResponse::Upload { index, data, .. }) => {
                    assert_eq!(index, 0x1017);
                    assert_eq!(data.len(), len);
                }
                other => panic!("expected upload response, got {:?}", other),
            }
        }
    }

    #[test]
    fn test_decode_download_ack() {
        let frame = CanFrame {
            id: 0x581,
            len: 8,
            data: [0x60, 0x00, 0x20, 0x01, 0, 0, 0, 0],
        };
        assert_eq!(
            decode_response(0x01, &frame),
            Some(SdoResponse::Download {
                index: 0x2000,
                sub_index: 0x01
            })
        );
    }

    #[test]
    fn test_decode_abort_code() {
        let code: u32 = 0x0602_0000; // object does not exist
        let mut data = [0u8; 8];
        data[0] = 0x80;
        data[1] = 0x99;
        data[2] = 0x10;
        data[3] = 0x02;
        data[4..8].copy_from_slice(&code.to_le_bytes());
        let frame = CanFrame { id: 0x581, len: 8, data };
        assert_eq!(
            decode_response(0x01, &frame),
            Some(SdoResponse::Abort {
                index: 0x1099,
                sub_index: 0x02,
                code
            })
        );
    }

    #[test]
    fn test_decode_ignores_other_cob_ids() {
        let frame = CanFrame {
            id: 0x181, // a PDO, not our SDO response
            len: 8,
            data: [0x43, 0, 0, 0, 0, 0, 0, 0],
        };
        assert_eq!(decode_response(0x01, &frame), None);
        // Response for a different node
        let frame = CanFrame {
            id: 0x582,
            len: 8,
            data: [0x60, 0, 0, 0, 0, 0, 0, 0],
        };
        assert_eq!(decode_response(0x01, &frame), None);
    }

    #[test]
    fn test_decode_rejects_segmented_upload() {
        // Expedited bit clear: segmented transfer, unsupported here
        let frame = CanFrame {
            id: 0x581,
            len: 8,
            data: [0x41, 0x00, 0x10, 0x00, 0x10, 0, 0, 0],
        };
        assert_eq!(decode_response(0x01, &frame), None);
    }

    #[test]
    fn test_sdo_data_bounds() {
        assert!(SdoData::new(&[]).is_err());
        assert!(SdoData::new(&[0u8; 5]).is_err());
        let data = SdoData::new(&[0x78, 0x56, 0x34, 0x12]).unwrap();
        assert_eq!(data.as_u32(), 0x1234_5678);
    }
}
