//! Device identity and the closed device-type registry.

use serde::{Deserialize, Serialize};
use std::fmt;

/// For every supported device family a constant must exist here.
///
/// Note: the key of every constant is persisted externally, so it is fixed
/// forever and may not be changed. New device kinds always get a new key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DeviceType {
    Unknown,
    Pebble,
    PineTimeJF,
    NothingEar1,
    BinarySensor,
    FlipperZero,
    Test,
}

impl DeviceType {
    pub const ALL: [DeviceType; 7] = [
        DeviceType::Unknown,
        DeviceType::Pebble,
        DeviceType::PineTimeJF,
        DeviceType::NothingEar1,
        DeviceType::BinarySensor,
        DeviceType::FlipperZero,
        DeviceType::Test,
    ];

    /// Permanent external identifier. Append-only, never reassigned.
    pub fn key(self) -> i32 {
        match self {
            DeviceType::Unknown => -1,
            DeviceType::Pebble => 1,
            DeviceType::PineTimeJF => 190,
            DeviceType::NothingEar1 => 410,
            DeviceType::BinarySensor => 510,
            DeviceType::FlipperZero => 520,
            DeviceType::Test => 1000,
        }
    }

    /// Look up a type by its persisted key, falling back to `Unknown` for
    /// keys this build does not know about.
    pub fn from_key(key: i32) -> DeviceType {
        DeviceType::ALL
            .iter()
            .copied()
            .find(|t| t.key() == key)
            .unwrap_or(DeviceType::Unknown)
    }

    pub fn is_supported(self) -> bool {
        self != DeviceType::Unknown
    }

    pub fn label(self) -> &'static str {
        match self {
            DeviceType::Unknown => "Unknown device",
            DeviceType::Pebble => "Pebble",
            DeviceType::PineTimeJF => "PineTime (InfiniTime)",
            DeviceType::NothingEar1 => "Nothing Ear (1)",
            DeviceType::BinarySensor => "Binary sensor",
            DeviceType::FlipperZero => "Flipper Zero",
            DeviceType::Test => "Test device",
        }
    }
}

impl fmt::Display for DeviceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Which transport family an address string selects, derived purely from
/// its format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressKind {
    /// `host:port` — exactly one colon.
    Socket,
    /// Bluetooth hardware address — more than one colon.
    Bluetooth,
    /// No colon at all: a handler name to resolve via the named registry.
    HandlerName,
}

/// A device as the harness sees it: an opaque address plus its type.
/// Immutable once a session for the device exists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceIdentity {
    address: String,
    device_type: DeviceType,
}

impl DeviceIdentity {
    pub fn new(address: impl Into<String>, device_type: DeviceType) -> Self {
        Self {
            address: address.into(),
            device_type,
        }
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn device_type(&self) -> DeviceType {
        self.device_type
    }

    pub fn address_kind(&self) -> AddressKind {
        match self.address.matches(':').count() {
            0 => AddressKind::HandlerName,
            1 => AddressKind::Socket,
            _ => AddressKind::Bluetooth,
        }
    }
}

impl fmt::Display for DeviceIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.device_type.label(), self.address)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_lookup_roundtrips_for_known_types() {
        for t in DeviceType::ALL {
            assert_eq!(DeviceType::from_key(t.key()), t);
        }
    }

    #[test]
    fn unknown_key_falls_back_to_unknown() {
        assert_eq!(DeviceType::from_key(9999), DeviceType::Unknown);
        assert_eq!(DeviceType::from_key(0), DeviceType::Unknown);
    }

    #[test]
    fn only_unknown_is_unsupported() {
        assert!(!DeviceType::Unknown.is_supported());
        for t in DeviceType::ALL.iter().filter(|t| **t != DeviceType::Unknown) {
            assert!(t.is_supported());
        }
    }

    #[test]
    fn address_classification_by_colon_count() {
        let socket = DeviceIdentity::new("192.168.1.5:8080", DeviceType::Pebble);
        assert_eq!(socket.address_kind(), AddressKind::Socket);

        let bt = DeviceIdentity::new("AA:BB:CC:DD:EE:FF", DeviceType::Pebble);
        assert_eq!(bt.address_kind(), AddressKind::Bluetooth);

        let named = DeviceIdentity::new("com.example.TestSupport", DeviceType::Test);
        assert_eq!(named.address_kind(), AddressKind::HandlerName);
    }
}
