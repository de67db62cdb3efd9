//! Local checks applied before a value leaves the client.

use regex::Regex;
use std::sync::OnceLock;

use crate::config::ValidationSettings;
use crate::error::{SyncError, SyncResult};

use super::model::{Channel, FieldName, FieldValue};

fn email_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern compiles")
    })
}

/// Converts a buffered value into the payload pushed for `field`.
///
/// Phone numbers travel as numbers; everything else as text.
pub fn normalize_field(
    settings: &ValidationSettings,
    field: FieldName,
    raw: &str,
) -> SyncResult<FieldValue> {
    match field {
        FieldName::Phone => parse_phone(settings, raw).map(FieldValue::Number),
        FieldName::Email => {
            let email = raw.trim();
            if !email_pattern().is_match(email) {
                return Err(SyncError::validation(field, "Invalid email address"));
            }
            Ok(FieldValue::Text(email.to_string()))
        }
        FieldName::Gender => match raw.trim() {
            value @ ("M" | "F" | "O") => Ok(FieldValue::Text(value.to_string())),
            other => Err(SyncError::validation(
                field,
                format!("'{other}' is not one of M, F, O"),
            )),
        },
        FieldName::Name | FieldName::Address => Ok(FieldValue::Text(raw.to_string())),
    }
}

/// Validates the contact value an OTP will be delivered to.
///
/// The target is the trimmed text as typed, so leading zeros in a phone
/// number survive; only the pushed payload is numeric.
pub fn validate_contact_target(
    settings: &ValidationSettings,
    channel: Channel,
    raw: &str,
) -> SyncResult<String> {
    if raw.trim().is_empty() {
        return Err(SyncError::validation(
            channel.field(),
            "enter a value before requesting a code",
        ));
    }
    normalize_field(settings, channel.field(), raw)?;
    Ok(raw.trim().to_string())
}

/// Submitted codes must be non-empty digit strings.
pub fn validate_code(channel: Channel, code: &str) -> SyncResult<String> {
    let code = code.trim();
    if code.is_empty() || !code.chars().all(|c| c.is_ascii_digit()) {
        return Err(SyncError::validation(
            channel.field(),
            "the code must contain digits only",
        ));
    }
    Ok(code.to_string())
}

fn parse_phone(settings: &ValidationSettings, raw: &str) -> SyncResult<u64> {
    let digits = raw.trim();
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err(SyncError::validation(
            FieldName::Phone,
            "phone numbers may only contain digits",
        ));
    }
    if digits.len() < settings.min_phone_digits || digits.len() > settings.max_phone_digits {
        return Err(SyncError::validation(
            FieldName::Phone,
            format!(
                "expected {}-{} digits, got {}",
                settings.min_phone_digits,
                settings.max_phone_digits,
                digits.len()
            ),
        ));
    }
    digits
        .parse::<u64>()
        .map_err(|err| SyncError::validation(FieldName::Phone, err.to_string()))
}
