// tests/sdo_client.rs
//
// Expedited SDO transfers end-to-end: client requests go out through the
// command surface, scripted responses come back through the simulated
// driver's receive queue.

use std::time::Duration;

use canwatch::io::{encode, BaudRate, CanFrame, ConnectionMonitor, SimDriver, SimHandle};
use canwatch::sdo::{SdoClient, SdoData};
use canwatch::{CommandSurface, IoError};

const TEST_TICK: Duration = Duration::from_millis(1);
const NODE_ID: u8 = 0x22;

async fn setup_connected() -> (ConnectionMonitor, SimHandle, CommandSurface) {
    let (driver, sim) = SimDriver::new();
    let mut monitor = ConnectionMonitor::new(Box::new(driver), BaudRate::default(), TEST_TICK);
    let surface = CommandSurface::new(&monitor);
    monitor.start();

    tokio::time::timeout(Duration::from_secs(5), async {
        while !surface.is_connected() {
            tokio::time::sleep(Duration::from_millis(2)).await;
        }
    })
    .await
    .expect("monitor failed to connect");

    (monitor, sim, surface)
}

fn response_frame(node_id: u8, data: [u8; 8]) -> CanFrame {
    CanFrame {
        id: 0x580 + u16::from(node_id),
        len: 8,
        data,
    }
}

#[tokio::test]
async fn test_upload_returns_expedited_data() {
    let (mut monitor, sim, surface) = setup_connected().await;

    // Heartbeat producer time (0x1017): 2-byte expedited response, 1000 ms
    sim.push_rx_frame(encode(&response_frame(
        NODE_ID,
        [0x4B, 0x17, 0x10, 0x00, 0xE8, 0x03, 0x00, 0x00],
    )));

    let client = SdoClient::new(surface, NODE_ID);
    let data = client.upload(0x1017, 0x00).await.unwrap();
    assert_eq!(data.as_slice(), &[0xE8, 0x03]);
    assert_eq!(data.as_u32(), 1000);

    // The request went out on the node's request COB-ID
    let written = sim.written_frames();
    assert_eq!(written.len(), 1);
    assert_eq!(written[0].id, 0x600 + u32::from(NODE_ID));
    assert_eq!(written[0].data[0], 0x40);

    monitor.shutdown().await;
}

#[tokio::test]
async fn test_download_acknowledged() {
    let (mut monitor, sim, surface) = setup_connected().await;

    sim.push_rx_frame(encode(&response_frame(
        NODE_ID,
        [0x60, 0x00, 0x20, 0x01, 0x00, 0x00, 0x00, 0x00],
    )));

    let client = SdoClient::new(surface, NODE_ID);
    let data = SdoData::new(&[0x12, 0x34]).unwrap();
    client.download(0x2000, 0x01, data).await.unwrap();

    let written = sim.written_frames();
    assert_eq!(written.len(), 1);
    // 2-byte expedited download: specifier 0x2B
    assert_eq!(written[0].data[0], 0x2B);
    assert_eq!(&written[0].data[4..6], &[0x12, 0x34]);

    monitor.shutdown().await;
}

#[tokio::test]
async fn test_abort_is_surfaced() {
    let (mut monitor, sim, surface) = setup_connected().await;

    // Abort 0x06020000: object does not exist
    let code: u32 = 0x0602_0000;
    let mut data = [0u8; 8];
    data[0] = 0x80;
    data[1] = 0x99;
    data[2] = 0x10;
    data[3] = 0x00;
    data[4..8].copy_from_slice(&code.to_le_bytes());
    sim.push_rx_frame(encode(&response_frame(NODE_ID, data)));

    let client = SdoClient::new(surface, NODE_ID);
    let err = client.upload(0x1099, 0x00).await.unwrap_err();
    assert_eq!(err, IoError::SdoAbort { code });

    monitor.shutdown().await;
}

#[tokio::test]
async fn test_unrelated_frames_are_skipped() {
    let (mut monitor, sim, surface) = setup_connected().await;

    // A PDO and a response for a different node arrive first
    sim.push_rx_frame(encode(
        &CanFrame::new(0x181, &[0xDE, 0xAD, 0xBE, 0xEF]).unwrap(),
    ));
    sim.push_rx_frame(encode(&response_frame(
        0x23,
        [0x60, 0x00, 0x20, 0x00, 0x00, 0x00, 0x00, 0x00],
    )));
    sim.push_rx_frame(encode(&response_frame(
        NODE_ID,
        [0x4F, 0x00, 0x60, 0x00, 0x7F, 0x00, 0x00, 0x00],
    )));

    let client = SdoClient::new(surface, NODE_ID);
    let data = client.upload(0x6000, 0x00).await.unwrap();
    assert_eq!(data.as_slice(), &[0x7F]);

    monitor.shutdown().await;
}

#[tokio::test]
async fn test_missing_response_times_out() {
    let (mut monitor, _sim, surface) = setup_connected().await;

    let mut client = SdoClient::new(surface, NODE_ID);
    client.set_timeout(Duration::from_millis(30));
    let err = client.upload(0x1000, 0x00).await.unwrap_err();
    assert_eq!(err, IoError::Timeout);

    monitor.shutdown().await;
}

#[tokio::test]
async fn test_request_while_disconnected_fails() {
    let (driver, sim) = SimDriver::new();
    sim.set_default_open(canwatch::io::DriverStatus::retryable(5));
    let mut monitor = ConnectionMonitor::new(Box::new(driver), BaudRate::default(), TEST_TICK);
    let surface = CommandSurface::new(&monitor);
    monitor.start();
    tokio::time::sleep(Duration::from_millis(10)).await;

    let client = SdoClient::new(surface, NODE_ID);
    let err = client.upload(0x1000, 0x00).await.unwrap_err();
    assert_eq!(err, IoError::NotConnected);
    assert_eq!(sim.write_calls(), 0);

    monitor.shutdown().await;
}
