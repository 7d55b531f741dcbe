//! Capability payload types carried by [`DeviceCommand`](super::command::DeviceCommand).
//!
//! These describe *what* the caller wants on the device; each handler turns
//! them into its own wire format.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NotificationKind {
    Generic,
    Email,
    Sms,
    Chat,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationSpec {
    /// Host-side identifier, used later for dismissal.
    pub id: i32,
    pub kind: NotificationKind,
    pub title: String,
    pub body: String,
    pub sender: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CallCommand {
    Incoming,
    Outgoing,
    Start,
    End,
    Reject,
    Accept,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallSpec {
    pub command: CallCommand,
    pub number: Option<String>,
    pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MusicStateSpec {
    pub playing: bool,
    pub position_secs: u32,
    pub shuffle: bool,
    pub repeat: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MusicSpec {
    pub artist: String,
    pub album: String,
    pub track: String,
    pub duration_secs: u32,
}

/// One alarm slot on the device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Alarm {
    pub index: u8,
    pub enabled: bool,
    pub hour: u8,
    pub minute: u8,
    /// Bitmask of weekdays, bit 0 = Monday.
    pub repetition: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CannedMessagesSpec {
    pub messages: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalendarEventSpec {
    pub id: i64,
    pub begin: DateTime<Utc>,
    pub duration_secs: u32,
    pub title: String,
    pub description: Option<String>,
    pub location: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherSpec {
    pub timestamp: DateTime<Utc>,
    pub location: String,
    /// Temperatures in kelvin, matching common device protocols.
    pub current_temp_k: u16,
    pub today_max_temp_k: u16,
    pub today_min_temp_k: u16,
    pub condition_code: u16,
    pub current_condition: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResetMode {
    Reboot,
    FactoryReset,
}
