//! PineTime (InfiniTime) handler, Bluetooth Low Energy.
//!
//! Uses the standard GATT profiles InfiniTime exposes: Current Time
//! Service for time sync, Alert Notification Service for notifications
//! and the Immediate Alert level for find-device.

use crate::domain::command::{CommandKind, DeviceCommand};
use crate::domain::device::DeviceIdentity;
use crate::domain::specs::{NotificationKind, NotificationSpec};
use crate::domain::state::ConnectionState;
use crate::service::queue::SubmitError;
use crate::service::support::{DeviceSupport, SupportContext};
use crate::service::transaction::TransactionBuilder;
use chrono::{Datelike, Timelike, Utc};
use std::sync::Arc;
use tracing::debug;

const ALERT_CATEGORY_SIMPLE: u8 = 0x00;
const ALERT_CATEGORY_SMS: u8 = 0x05;
const IMMEDIATE_ALERT_NONE: u8 = 0x00;
const IMMEDIATE_ALERT_HIGH: u8 = 0x02;

pub struct PineTimeSupport {
    context: SupportContext,
}

impl PineTimeSupport {
    pub fn create(context: SupportContext) -> anyhow::Result<Arc<dyn DeviceSupport>> {
        Ok(Arc::new(Self { context }))
    }

    /// Current Time Service characteristic value.
    fn current_time_value() -> Vec<u8> {
        let now = Utc::now();
        let year = now.year() as u16;
        vec![
            (year & 0xFF) as u8,
            (year >> 8) as u8,
            now.month() as u8,
            now.day() as u8,
            now.hour() as u8,
            now.minute() as u8,
            now.second() as u8,
            now.weekday().number_from_monday() as u8,
            0x00, // fractions
            0x00, // adjust reason
        ]
    }

    fn alert_value(spec: &NotificationSpec) -> Vec<u8> {
        let category = match spec.kind {
            NotificationKind::Sms | NotificationKind::Chat => ALERT_CATEGORY_SMS,
            _ => ALERT_CATEGORY_SIMPLE,
        };
        let mut value = vec![category, 0x01];
        value.extend_from_slice(spec.title.as_bytes());
        value.push(0x00);
        value.extend_from_slice(spec.body.as_bytes());
        value
    }
}

impl DeviceSupport for PineTimeSupport {
    fn device(&self) -> &DeviceIdentity {
        &self.context.device
    }

    fn supported_commands(&self) -> &'static [CommandKind] {
        &[
            CommandKind::Notification,
            CommandKind::SetTime,
            CommandKind::FindDevice,
        ]
    }

    fn use_auto_connect(&self) -> bool {
        true
    }

    fn connect(&self) -> Result<(), SubmitError> {
        self.context.queue.submit(
            TransactionBuilder::new("pinetime initialize")
                .initializing()
                .set_state(ConnectionState::Connecting)
                .open()
                .set_state(ConnectionState::Initializing)
                .write(Self::current_time_value())
                .set_state(ConnectionState::Initialized)
                .build(),
        )
    }

    fn on_command(&self, command: DeviceCommand) {
        let result = match command {
            DeviceCommand::Notification(spec) => self.context.queue.submit(
                TransactionBuilder::new("pinetime notification")
                    .write(Self::alert_value(&spec))
                    .build(),
            ),
            DeviceCommand::SetTime => self.context.queue.submit(
                TransactionBuilder::new("pinetime set time")
                    .write(Self::current_time_value())
                    .build(),
            ),
            DeviceCommand::FindDevice(start) => {
                let level = if start {
                    IMMEDIATE_ALERT_HIGH
                } else {
                    IMMEDIATE_ALERT_NONE
                };
                self.context.queue.submit(
                    TransactionBuilder::new("pinetime find device")
                        .write(vec![level])
                        .build(),
                )
            }
            other => {
                debug!("PineTime handler got undispatched command {}", other.kind());
                return;
            }
        };
        if let Err(e) = result {
            debug!("PineTime command dropped: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn current_time_value_is_ten_bytes() {
        let value = PineTimeSupport::current_time_value();
        assert_eq!(value.len(), 10);
        let year = u16::from(value[0]) | (u16::from(value[1]) << 8);
        assert!(year >= 2024);
        assert!((1..=12).contains(&value[2]));
    }

    #[test]
    fn alert_value_separates_title_and_body() {
        let spec = NotificationSpec {
            id: 7,
            kind: NotificationKind::Sms,
            title: "hi".into(),
            body: "there".into(),
            sender: None,
        };
        let value = PineTimeSupport::alert_value(&spec);
        assert_eq!(value[0], ALERT_CATEGORY_SMS);
        assert_eq!(value[1], 0x01);
        assert_eq!(&value[2..4], b"hi");
        assert_eq!(value[4], 0x00);
        assert_eq!(&value[5..], b"there");
    }
}
