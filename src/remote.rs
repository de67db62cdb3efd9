//! Remote collaborators consumed by the sync controller.
//!
//! [`ProfileRemote`] mirrors the four RPC-style calls the panel makes. The
//! in-memory store is a reference server: it owns the canonical profile,
//! issues codes, and lets callers inject failures.

use rand::Rng;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap, VecDeque};

use crate::config::SyncConfig;
use crate::error::RemoteError;
use crate::profile::model::{Channel, FieldUpdate, OtpVerdict, Profile};

pub trait ProfileRemote {
    /// Idempotent read of canonical state.
    fn fetch_profile(&mut self) -> Result<Profile, RemoteError>;

    /// Persists one field. Whether `otp` is required is server policy.
    fn update_profile_field(&mut self, update: &FieldUpdate) -> Result<(), RemoteError>;

    /// Triggers out-of-band delivery of a code to `target`.
    fn request_otp(&mut self, channel: Channel, target: &str) -> Result<(), RemoteError>;

    /// Validates a previously issued code.
    fn verify_otp(&mut self, channel: Channel, code: &str) -> Result<OtpVerdict, RemoteError>;
}

impl<R: ProfileRemote + ?Sized> ProfileRemote for Box<R> {
    fn fetch_profile(&mut self) -> Result<Profile, RemoteError> {
        (**self).fetch_profile()
    }

    fn update_profile_field(&mut self, update: &FieldUpdate) -> Result<(), RemoteError> {
        (**self).update_profile_field(update)
    }

    fn request_otp(&mut self, channel: Channel, target: &str) -> Result<(), RemoteError> {
        (**self).request_otp(channel, target)
    }

    fn verify_otp(&mut self, channel: Channel, code: &str) -> Result<OtpVerdict, RemoteError> {
        (**self).verify_otp(channel, code)
    }
}

/// Call kinds, used to target injected failures.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum RemoteOperation {
    FetchProfile,
    UpdateField,
    RequestOtp,
    VerifyOtp,
}

/// Record of one call received by the in-memory store.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case", tag = "call")]
pub enum RemoteCall {
    FetchProfile,
    UpdateField { update: FieldUpdate },
    RequestOtp { channel: Channel, target: String },
    VerifyOtp { channel: Channel, code: String },
}

impl RemoteCall {
    pub fn operation(&self) -> RemoteOperation {
        match self {
            RemoteCall::FetchProfile => RemoteOperation::FetchProfile,
            RemoteCall::UpdateField { .. } => RemoteOperation::UpdateField,
            RemoteCall::RequestOtp { .. } => RemoteOperation::RequestOtp,
            RemoteCall::VerifyOtp { .. } => RemoteOperation::VerifyOtp,
        }
    }
}

#[derive(Debug, Clone)]
struct IssuedCode {
    target: String,
    code: String,
}

#[derive(Debug)]
pub struct InMemoryProfileStore {
    profile: Profile,
    issued: BTreeMap<Channel, IssuedCode>,
    verified: BTreeMap<Channel, IssuedCode>,
    failures: HashMap<RemoteOperation, VecDeque<RemoteError>>,
    calls: Vec<RemoteCall>,
    code_length: usize,
    fixed_code: Option<String>,
    require_contact_otp: bool,
}

impl Default for InMemoryProfileStore {
    fn default() -> Self {
        Self::new(Profile::default())
    }
}

impl InMemoryProfileStore {
    pub fn new(profile: Profile) -> Self {
        Self {
            profile,
            issued: BTreeMap::new(),
            verified: BTreeMap::new(),
            failures: HashMap::new(),
            calls: Vec::new(),
            code_length: 4,
            fixed_code: None,
            require_contact_otp: false,
        }
    }

    pub fn from_config(profile: Profile, config: &SyncConfig) -> Self {
        let mut store = Self::new(profile);
        store.code_length = config.otp.code_length.max(1);
        store
    }

    /// Issue `code` for every request instead of a random one.
    pub fn with_fixed_code(mut self, code: impl Into<String>) -> Self {
        self.fixed_code = Some(code.into());
        self
    }

    /// Refuse contact updates that do not carry the verifying code.
    pub fn require_contact_otp(mut self, required: bool) -> Self {
        self.require_contact_otp = required;
        self
    }

    /// Makes the next call of `operation` fail with `error`.
    pub fn fail_next(&mut self, operation: RemoteOperation, error: RemoteError) {
        self.failures.entry(operation).or_default().push_back(error);
    }

    pub fn profile(&self) -> &Profile {
        &self.profile
    }

    /// Server-side edit made by another client.
    pub fn profile_mut(&mut self) -> &mut Profile {
        &mut self.profile
    }

    /// Code most recently issued for `channel` and not yet consumed.
    pub fn issued_code(&self, channel: Channel) -> Option<&str> {
        self.issued.get(&channel).map(|issued| issued.code.as_str())
    }

    /// Contact value proven by the last accepted code for `channel`.
    pub fn verified_target(&self, channel: Channel) -> Option<&str> {
        self.verified.get(&channel).map(|issued| issued.target.as_str())
    }

    pub fn calls(&self) -> &[RemoteCall] {
        &self.calls
    }

    pub fn count(&self, operation: RemoteOperation) -> usize {
        self.calls
            .iter()
            .filter(|call| call.operation() == operation)
            .count()
    }

    /// Field updates received, in order.
    pub fn updates(&self) -> Vec<&FieldUpdate> {
        self.calls
            .iter()
            .filter_map(|call| match call {
                RemoteCall::UpdateField { update } => Some(update),
                _ => None,
            })
            .collect()
    }

    fn take_failure(&mut self, operation: RemoteOperation) -> Result<(), RemoteError> {
        match self
            .failures
            .get_mut(&operation)
            .and_then(|queue| queue.pop_front())
        {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    fn next_code(&self) -> String {
        if let Some(code) = &self.fixed_code {
            return code.clone();
        }
        let mut rng = rand::thread_rng();
        (0..self.code_length)
            .map(|_| char::from(b'0' + rng.gen_range(0..10u8)))
            .collect()
    }
}

impl ProfileRemote for InMemoryProfileStore {
    fn fetch_profile(&mut self) -> Result<Profile, RemoteError> {
        self.calls.push(RemoteCall::FetchProfile);
        self.take_failure(RemoteOperation::FetchProfile)?;
        Ok(self.profile.clone())
    }

    fn update_profile_field(&mut self, update: &FieldUpdate) -> Result<(), RemoteError> {
        self.calls.push(RemoteCall::UpdateField {
            update: update.clone(),
        });
        self.take_failure(RemoteOperation::UpdateField)?;
        if let Some(channel) = update.key.channel() {
            match (&update.otp, self.verified.get(&channel)) {
                (Some(otp), Some(verified)) if *otp == verified.code => {}
                (Some(_), _) => {
                    return Err(RemoteError::Refused(format!(
                        "{channel} code does not match a verified code"
                    )))
                }
                (None, _) if self.require_contact_otp => {
                    return Err(RemoteError::Refused(format!(
                        "{channel} updates require a verified code"
                    )))
                }
                (None, _) => {}
            }
        }
        self.profile.set(update.key, update.value.to_profile_string());
        Ok(())
    }

    fn request_otp(&mut self, channel: Channel, target: &str) -> Result<(), RemoteError> {
        self.calls.push(RemoteCall::RequestOtp {
            channel,
            target: target.to_string(),
        });
        self.take_failure(RemoteOperation::RequestOtp)?;
        let code = self.next_code();
        self.issued.insert(
            channel,
            IssuedCode {
                target: target.to_string(),
                code,
            },
        );
        Ok(())
    }

    fn verify_otp(&mut self, channel: Channel, code: &str) -> Result<OtpVerdict, RemoteError> {
        self.calls.push(RemoteCall::VerifyOtp {
            channel,
            code: code.to_string(),
        });
        self.take_failure(RemoteOperation::VerifyOtp)?;
        let matches = self
            .issued
            .get(&channel)
            .map(|issued| issued.code == code)
            .unwrap_or(false);
        if matches {
            if let Some(issued) = self.issued.remove(&channel) {
                self.verified.insert(channel, issued);
            }
        }
        Ok(OtpVerdict { success: matches })
    }
}
