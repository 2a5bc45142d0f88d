use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Protected capability gating access to a device resource.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PermissionRight {
    ReadSms,
    SendSms,
    ReceiveSms,
    ReadContacts,
    ReadPhoneState,
}

impl PermissionRight {
    pub const ALL: [PermissionRight; 5] = [
        PermissionRight::ReadSms,
        PermissionRight::SendSms,
        PermissionRight::ReceiveSms,
        PermissionRight::ReadContacts,
        PermissionRight::ReadPhoneState,
    ];

    /// Logical name used in configuration files and permission maps.
    pub fn as_str(&self) -> &'static str {
        match self {
            PermissionRight::ReadSms => "read_sms",
            PermissionRight::SendSms => "send_sms",
            PermissionRight::ReceiveSms => "receive_sms",
            PermissionRight::ReadContacts => "read_contacts",
            PermissionRight::ReadPhoneState => "read_phone_state",
        }
    }
}

impl fmt::Display for PermissionRight {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PermissionRight {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        PermissionRight::ALL
            .into_iter()
            .find(|right| right.as_str() == raw)
            .ok_or_else(|| format!("unknown permission right '{raw}'"))
    }
}

/// Per-right outcome reported by the platform after a prompt.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PermissionStatus {
    Granted,
    Denied,
}

impl PermissionStatus {
    pub fn is_granted(self) -> bool {
        matches!(self, PermissionStatus::Granted)
    }
}

impl From<bool> for PermissionStatus {
    fn from(granted: bool) -> Self {
        if granted {
            PermissionStatus::Granted
        } else {
            PermissionStatus::Denied
        }
    }
}
