//! Data structures shared by the edit buffer, the sync controller and the
//! remote collaborators.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// Canonical, server-confirmed profile record. Replaced wholesale on fetch.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Profile {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub gender: String,
}

impl Profile {
    pub fn get(&self, field: FieldName) -> &str {
        match field {
            FieldName::Name => &self.name,
            FieldName::Phone => &self.phone,
            FieldName::Email => &self.email,
            FieldName::Address => &self.address,
            FieldName::Gender => &self.gender,
        }
    }

    pub fn set(&mut self, field: FieldName, value: impl Into<String>) {
        let value = value.into();
        match field {
            FieldName::Name => self.name = value,
            FieldName::Phone => self.phone = value,
            FieldName::Email => self.email = value,
            FieldName::Address => self.address = value,
            FieldName::Gender => self.gender = value,
        }
    }

    /// Whether the contact field behind `channel` is populated.
    pub fn has_contact(&self, channel: Channel) -> bool {
        !self.get(channel.field()).trim().is_empty()
    }

    /// Lowercase hex SHA-256 over the canonical JSON form.
    pub fn fingerprint(&self) -> String {
        let payload = serde_json::to_vec(self).unwrap_or_default();
        format!("{:x}", Sha256::digest(&payload))
    }
}

/// Editable profile fields.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum FieldName {
    Name,
    Phone,
    Email,
    Address,
    Gender,
}

impl FieldName {
    pub const ALL: [FieldName; 5] = [
        FieldName::Name,
        FieldName::Phone,
        FieldName::Email,
        FieldName::Address,
        FieldName::Gender,
    ];

    /// Key used by the field-update mutation.
    pub fn key(self) -> &'static str {
        match self {
            FieldName::Name => "name",
            FieldName::Phone => "phone",
            FieldName::Email => "email",
            FieldName::Address => "address",
            FieldName::Gender => "gender",
        }
    }

    /// Sensitive fields need a verified OTP channel before they are persisted.
    pub fn channel(self) -> Option<Channel> {
        match self {
            FieldName::Phone => Some(Channel::Phone),
            FieldName::Email => Some(Channel::Email),
            _ => None,
        }
    }

    pub fn is_sensitive(self) -> bool {
        self.channel().is_some()
    }
}

impl fmt::Display for FieldName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Contact channel proven through a one-time passcode.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    Phone,
    Email,
}

impl Channel {
    pub const ALL: [Channel; 2] = [Channel::Phone, Channel::Email];

    pub fn field(self) -> FieldName {
        match self {
            Channel::Phone => FieldName::Phone,
            Channel::Email => FieldName::Email,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Channel::Phone => "phone",
            Channel::Email => "email",
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Value carried by a field-update mutation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum FieldValue {
    Number(u64),
    Text(String),
}

impl FieldValue {
    /// String form as stored in a [`Profile`].
    pub fn to_profile_string(&self) -> String {
        match self {
            FieldValue::Number(n) => n.to_string(),
            FieldValue::Text(s) => s.clone(),
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Number(n) => write!(f, "{n}"),
            FieldValue::Text(s) => f.write_str(s),
        }
    }
}

/// Arguments of `updateProfileField(key, value, otp?)`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FieldUpdate {
    pub key: FieldName,
    pub value: FieldValue,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub otp: Option<String>,
}

impl FieldUpdate {
    pub fn new(key: FieldName, value: FieldValue) -> Self {
        Self {
            key,
            value,
            otp: None,
        }
    }

    pub fn with_otp(mut self, otp: impl Into<String>) -> Self {
        self.otp = Some(otp.into());
        self
    }
}

/// Response of `verifyOtp`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct OtpVerdict {
    pub success: bool,
}
