//! The capability contract's command set.
//!
//! One variant per logical device capability. A handler declares the
//! variants it supports; everything else is dropped by the dispatch layer
//! as a no-op, so callers never probe capability sets before invoking.

use crate::domain::specs::{
    Alarm, CalendarEventSpec, CallSpec, CannedMessagesSpec, MusicSpec, MusicStateSpec,
    NotificationSpec, ResetMode, WeatherSpec,
};
use std::fmt;
use std::path::PathBuf;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq)]
pub enum DeviceCommand {
    Notification(NotificationSpec),
    DeleteNotification { id: i32 },
    SetTime,
    SetAlarms(Vec<Alarm>),
    SetCallState(CallSpec),
    SetCannedMessages(CannedMessagesSpec),
    SetMusicState(MusicStateSpec),
    SetMusicInfo(MusicSpec),
    EnableRealtimeSteps(bool),
    EnableRealtimeHeartRate(bool),
    HeartRateTest,
    SetHeartRateMeasurementInterval { seconds: u32 },
    InstallApp { path: PathBuf },
    RequestAppInfo,
    StartApp { uuid: Uuid, start: bool },
    DeleteApp { uuid: Uuid },
    ConfigureApp { uuid: Uuid, config: String },
    ReorderApps { uuids: Vec<Uuid> },
    FetchRecordedData { kinds: u32 },
    Reset(ResetMode),
    FindDevice(bool),
    SetConstantVibration { intensity: u32 },
    RequestScreenshot,
    AddCalendarEvent(CalendarEventSpec),
    DeleteCalendarEvent { id: i64 },
    SendConfiguration { config: String },
    ReadConfiguration { config: String },
    SendWeather(WeatherSpec),
}

/// Payload-free discriminant of [`DeviceCommand`], used by handlers to
/// declare supported variants and by the dispatch layer to check them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandKind {
    Notification,
    DeleteNotification,
    SetTime,
    SetAlarms,
    SetCallState,
    SetCannedMessages,
    SetMusicState,
    SetMusicInfo,
    EnableRealtimeSteps,
    EnableRealtimeHeartRate,
    HeartRateTest,
    SetHeartRateMeasurementInterval,
    InstallApp,
    RequestAppInfo,
    StartApp,
    DeleteApp,
    ConfigureApp,
    ReorderApps,
    FetchRecordedData,
    Reset,
    FindDevice,
    SetConstantVibration,
    RequestScreenshot,
    AddCalendarEvent,
    DeleteCalendarEvent,
    SendConfiguration,
    ReadConfiguration,
    SendWeather,
}

impl DeviceCommand {
    pub fn kind(&self) -> CommandKind {
        match self {
            DeviceCommand::Notification(_) => CommandKind::Notification,
            DeviceCommand::DeleteNotification { .. } => CommandKind::DeleteNotification,
            DeviceCommand::SetTime => CommandKind::SetTime,
            DeviceCommand::SetAlarms(_) => CommandKind::SetAlarms,
            DeviceCommand::SetCallState(_) => CommandKind::SetCallState,
            DeviceCommand::SetCannedMessages(_) => CommandKind::SetCannedMessages,
            DeviceCommand::SetMusicState(_) => CommandKind::SetMusicState,
            DeviceCommand::SetMusicInfo(_) => CommandKind::SetMusicInfo,
            DeviceCommand::EnableRealtimeSteps(_) => CommandKind::EnableRealtimeSteps,
            DeviceCommand::EnableRealtimeHeartRate(_) => CommandKind::EnableRealtimeHeartRate,
            DeviceCommand::HeartRateTest => CommandKind::HeartRateTest,
            DeviceCommand::SetHeartRateMeasurementInterval { .. } => {
                CommandKind::SetHeartRateMeasurementInterval
            }
            DeviceCommand::InstallApp { .. } => CommandKind::InstallApp,
            DeviceCommand::RequestAppInfo => CommandKind::RequestAppInfo,
            DeviceCommand::StartApp { .. } => CommandKind::StartApp,
            DeviceCommand::DeleteApp { .. } => CommandKind::DeleteApp,
            DeviceCommand::ConfigureApp { .. } => CommandKind::ConfigureApp,
            DeviceCommand::ReorderApps { .. } => CommandKind::ReorderApps,
            DeviceCommand::FetchRecordedData { .. } => CommandKind::FetchRecordedData,
            DeviceCommand::Reset(_) => CommandKind::Reset,
            DeviceCommand::FindDevice(_) => CommandKind::FindDevice,
            DeviceCommand::SetConstantVibration { .. } => CommandKind::SetConstantVibration,
            DeviceCommand::RequestScreenshot => CommandKind::RequestScreenshot,
            DeviceCommand::AddCalendarEvent(_) => CommandKind::AddCalendarEvent,
            DeviceCommand::DeleteCalendarEvent { .. } => CommandKind::DeleteCalendarEvent,
            DeviceCommand::SendConfiguration { .. } => CommandKind::SendConfiguration,
            DeviceCommand::ReadConfiguration { .. } => CommandKind::ReadConfiguration,
            DeviceCommand::SendWeather(_) => CommandKind::SendWeather,
        }
    }
}

impl fmt::Display for CommandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::specs::NotificationKind;

    #[test]
    fn kind_matches_variant() {
        let cmd = DeviceCommand::Notification(NotificationSpec {
            id: 1,
            kind: NotificationKind::Sms,
            title: "hi".into(),
            body: "there".into(),
            sender: None,
        });
        assert_eq!(cmd.kind(), CommandKind::Notification);
        assert_eq!(DeviceCommand::SetTime.kind(), CommandKind::SetTime);
        assert_eq!(
            DeviceCommand::FindDevice(true).kind(),
            CommandKind::FindDevice
        );
    }
}
