//! Pebble handler. Works over Bluetooth Classic (RFCOMM) or, for the
//! emulator, over the socket transport; both carry the same framing.

use crate::domain::command::{CommandKind, DeviceCommand};
use crate::domain::device::DeviceIdentity;
use crate::domain::specs::{NotificationSpec, ResetMode};
use crate::domain::state::ConnectionState;
use crate::service::queue::SubmitError;
use crate::service::support::{DeviceSupport, SupportContext};
use crate::service::transaction::TransactionBuilder;
use chrono::Utc;
use std::sync::Arc;
use tracing::debug;

const ENDPOINT_TIME: u16 = 11;
const ENDPOINT_PHONE_VERSION: u16 = 17;
const ENDPOINT_RESET: u16 = 2003;
const ENDPOINT_NOTIFICATION: u16 = 3000;

const TIME_SET_TIME: u8 = 0x02;
const RESET_REBOOT: u8 = 0x00;
const RESET_FACTORY: u8 = 0x01;
const NOTIFICATION_SMS: u8 = 0x01;
const NOTIFICATION_EMAIL: u8 = 0x00;

/// Frame a payload for one endpoint: u16 length, u16 endpoint, payload,
/// all big-endian.
fn frame(endpoint: u16, payload: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(4 + payload.len());
    out.extend_from_slice(&(payload.len() as u16).to_be_bytes());
    out.extend_from_slice(&endpoint.to_be_bytes());
    out.extend_from_slice(payload);
    out
}

/// Length-prefixed string, truncated to 255 bytes.
fn pascal_string(s: &str) -> Vec<u8> {
    let bytes = s.as_bytes();
    let len = bytes.len().min(255);
    let mut out = Vec::with_capacity(1 + len);
    out.push(len as u8);
    out.extend_from_slice(&bytes[..len]);
    out
}

pub struct PebbleSupport {
    context: SupportContext,
}

impl PebbleSupport {
    pub fn create(context: SupportContext) -> anyhow::Result<Arc<dyn DeviceSupport>> {
        Ok(Arc::new(Self { context }))
    }

    fn set_time_frame() -> Vec<u8> {
        let now = Utc::now().timestamp() as u32;
        let mut payload = vec![TIME_SET_TIME];
        payload.extend_from_slice(&now.to_be_bytes());
        frame(ENDPOINT_TIME, &payload)
    }

    fn notification_frame(spec: &NotificationSpec) -> Vec<u8> {
        use crate::domain::specs::NotificationKind;
        let kind = match spec.kind {
            NotificationKind::Email => NOTIFICATION_EMAIL,
            _ => NOTIFICATION_SMS,
        };
        let mut payload = vec![kind];
        payload.extend(pascal_string(spec.sender.as_deref().unwrap_or("")));
        payload.extend(pascal_string(&spec.body));
        payload.extend(pascal_string(&spec.title));
        frame(ENDPOINT_NOTIFICATION, &payload)
    }

    fn reset_frame(mode: ResetMode) -> Vec<u8> {
        let cmd = match mode {
            ResetMode::Reboot => RESET_REBOOT,
            ResetMode::FactoryReset => RESET_FACTORY,
        };
        frame(ENDPOINT_RESET, &[cmd])
    }
}

impl DeviceSupport for PebbleSupport {
    fn device(&self) -> &DeviceIdentity {
        &self.context.device
    }

    fn supported_commands(&self) -> &'static [CommandKind] {
        &[
            CommandKind::Notification,
            CommandKind::SetTime,
            CommandKind::Reset,
            CommandKind::FetchRecordedData,
        ]
    }

    fn connect(&self) -> Result<(), SubmitError> {
        // The phone-version announce doubles as the handshake; the watch
        // drops the link if it never arrives.
        let announce = frame(ENDPOINT_PHONE_VERSION, &[0x01, 0xFF, 0xFF, 0xFF, 0xFF]);
        self.context.queue.submit(
            TransactionBuilder::new("pebble initialize")
                .initializing()
                .set_state(ConnectionState::Connecting)
                .open()
                .set_state(ConnectionState::Initializing)
                .write(announce)
                .write(Self::set_time_frame())
                .set_state(ConnectionState::Initialized)
                .build(),
        )
    }

    fn on_command(&self, command: DeviceCommand) {
        let result = match command {
            DeviceCommand::Notification(spec) => self.context.queue.submit(
                TransactionBuilder::new("pebble notification")
                    .write(Self::notification_frame(&spec))
                    .build(),
            ),
            DeviceCommand::SetTime => self.context.queue.submit(
                TransactionBuilder::new("pebble set time")
                    .write(Self::set_time_frame())
                    .build(),
            ),
            DeviceCommand::Reset(mode) => self.context.queue.submit(
                TransactionBuilder::new("pebble reset")
                    .write(Self::reset_frame(mode))
                    .build(),
            ),
            DeviceCommand::FetchRecordedData { kinds } => self.context.queue.submit(
                // Busy for the duration of the transfer request, so other
                // commands can be held off while history is in flight.
                TransactionBuilder::new("pebble fetch recorded data")
                    .set_busy(true)
                    .write(frame(ENDPOINT_TIME, &[TIME_SET_TIME.wrapping_add(kinds as u8)]))
                    .set_busy(false)
                    .build(),
            ),
            other => {
                debug!("Pebble handler got undispatched command {}", other.kind());
                return;
            }
        };
        if let Err(e) = result {
            debug!("Pebble command dropped: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::specs::NotificationKind;

    #[test]
    fn frames_carry_length_and_endpoint() {
        let f = frame(ENDPOINT_TIME, &[0x02, 0, 0, 0, 0]);
        assert_eq!(f[0..2], [0, 5]); // payload length
        assert_eq!(f[2..4], [0, 11]); // endpoint
        assert_eq!(f.len(), 9);
    }

    #[test]
    fn notification_frame_encodes_strings_in_order() {
        let spec = NotificationSpec {
            id: 1,
            kind: NotificationKind::Sms,
            title: "T".into(),
            body: "B".into(),
            sender: Some("S".into()),
        };
        let f = PebbleSupport::notification_frame(&spec);
        assert_eq!(f[2..4], ENDPOINT_NOTIFICATION.to_be_bytes());
        // kind byte, then sender, body, title as pascal strings
        assert_eq!(f[4], NOTIFICATION_SMS);
        assert_eq!(&f[5..7], &[1, b'S']);
        assert_eq!(&f[7..9], &[1, b'B']);
        assert_eq!(&f[9..11], &[1, b'T']);
    }

    #[test]
    fn pascal_string_truncates() {
        let long = "x".repeat(300);
        let encoded = pascal_string(&long);
        assert_eq!(encoded[0], 255);
        assert_eq!(encoded.len(), 256);
    }
}
