//! Full session lifecycle through the public surface: factory dispatch,
//! initialization, command injection and teardown, all over an in-memory
//! transport.

use std::sync::{Arc, Mutex};
use std::time::Duration;
use wearbridge::domain::specs::{NotificationKind, NotificationSpec};
use wearbridge::infrastructure::bluetooth::BluetoothBinding;
use wearbridge::infrastructure::loopback::{LoopbackPeer, LoopbackTransport};
use wearbridge::infrastructure::transport::{Transport, TransportError};
use wearbridge::{
    ConnectionState, DeviceCommand, DeviceIdentity, DeviceManager, DeviceSupportFactory,
    DeviceType, WarningSink,
};

/// Radio stand-in handing out loopback transports and keeping the peer
/// ends so the test can watch the wire.
#[derive(Default)]
struct LoopbackRadio {
    peers: Mutex<Vec<LoopbackPeer>>,
}

impl LoopbackRadio {
    fn last_peer(&self) -> LoopbackPeer {
        self.peers.lock().unwrap().last().cloned().unwrap()
    }
}

impl BluetoothBinding for LoopbackRadio {
    fn is_present(&self) -> bool {
        true
    }

    fn is_enabled(&self) -> bool {
        true
    }

    fn open_classic(&self, _address: &str) -> Result<Box<dyn Transport>, TransportError> {
        let (transport, peer) = LoopbackTransport::new();
        self.peers.lock().unwrap().push(peer);
        Ok(Box::new(transport))
    }

    fn open_low_energy(&self, address: &str) -> Result<Box<dyn Transport>, TransportError> {
        self.open_classic(address)
    }
}

struct QuietSink;

impl WarningSink for QuietSink {
    fn warn(&self, _message: &str) {}
}

fn pebble_endpoint(frame: &[u8]) -> u16 {
    u16::from_be_bytes([frame[2], frame[3]])
}

async fn wait_for_state(
    handle: &wearbridge::DeviceSupportHandle,
    wanted: ConnectionState,
) -> ConnectionState {
    let mut rx = handle.subscribe();
    let connection = tokio::time::timeout(
        Duration::from_secs(5),
        rx.wait_for(|s| s.connection == wanted),
    )
    .await
    .expect("state never reached")
    .expect("state channel closed")
    .connection;
    connection
}

#[tokio::test]
async fn pebble_session_runs_from_connect_to_dispose() {
    let radio = Arc::new(LoopbackRadio::default());
    let factory =
        DeviceSupportFactory::new(radio.clone(), Arc::new(QuietSink), &Default::default());
    let manager = DeviceManager::new(factory);

    let device = DeviceIdentity::new("AA:BB:CC:DD:EE:FF", DeviceType::Pebble);
    let handle = manager
        .connect(&device)
        .await
        .expect("factory failed")
        .expect("no handler matched");

    // Initialization runs on the queue worker; wait for it to land.
    assert_eq!(
        wait_for_state(&handle, ConnectionState::Initialized).await,
        ConnectionState::Initialized
    );

    // The handshake frames were on the wire before the state committed:
    // phone-version announce first, then time sync.
    let peer = radio.last_peer();
    let sent = peer.sent();
    assert_eq!(sent.len(), 2);
    assert_eq!(pebble_endpoint(&sent[0]), 17);
    assert_eq!(pebble_endpoint(&sent[1]), 11);

    // Inject a notification through the asynchronous command channel.
    let sender = handle.command_sender();
    assert!(sender.send(DeviceCommand::Notification(NotificationSpec {
        id: 1,
        kind: NotificationKind::Sms,
        title: "ping".into(),
        body: "hello".into(),
        sender: None,
    })));
    tokio::time::timeout(Duration::from_secs(5), async {
        while peer.sent().len() < 3 {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("notification never hit the wire");
    assert_eq!(pebble_endpoint(&peer.sent()[2]), 3000);

    // Unsupported commands are silent no-ops and write nothing.
    handle.dispatch(DeviceCommand::RequestScreenshot);
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(peer.sent().len(), 3);

    // Teardown: the session ends at Disconnected and the transport closes.
    manager.disconnect(device.address());
    assert!(handle.is_disposed());
    assert_eq!(
        wait_for_state(&handle, ConnectionState::Disconnected).await,
        ConnectionState::Disconnected
    );
    assert!(!peer.is_open());

    // Nothing dispatched afterwards reaches the wire.
    handle.dispatch(DeviceCommand::SetTime);
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(peer.sent().len(), 3);
}

#[tokio::test]
async fn manager_keeps_one_handle_per_device() {
    let radio = Arc::new(LoopbackRadio::default());
    let factory =
        DeviceSupportFactory::new(radio.clone(), Arc::new(QuietSink), &Default::default());
    let manager = DeviceManager::new(factory);

    let device = DeviceIdentity::new("AA:BB:CC:DD:EE:FF", DeviceType::Pebble);
    let first = manager.connect(&device).await.unwrap().unwrap();
    let second = manager.connect(&device).await.unwrap().unwrap();
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(radio.peers.lock().unwrap().len(), 1);

    manager.dispose_all();
    assert!(first.is_disposed());
}
