//! One-time passcode challenge for a single contact channel.
//!
//! ```text
//! Idle --delivered--> Sent --accepted--> Verified
//!                      |  ^
//!              rejected|  |resend / retry
//!                      v  |
//!                    Rejected
//! Idle --snapshot shows contact--> Verified
//! ```
//!
//! The server decides whether a code is valid; the challenge only tracks what
//! the client may do next. Requests are not coalesced: every delivery
//! replaces the target the next accepted code will verify.

use serde::{Deserialize, Serialize};

use crate::error::{SyncError, SyncResult};
use crate::profile::model::Channel;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum OtpState {
    Idle,
    Sent,
    Verified,
    Rejected,
}

impl OtpState {
    /// Sent and Rejected both accept a code.
    pub fn accepts_code(self) -> bool {
        matches!(self, OtpState::Sent | OtpState::Rejected)
    }
}

/// How a channel reached `Verified`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case", tag = "via", content = "code")]
pub enum Verification {
    /// Trusted because the fetched snapshot already carried the contact.
    Snapshot,
    /// Proven in this session with the given code.
    Code(String),
}

#[derive(Debug, Clone)]
pub struct OtpChallenge {
    channel: Channel,
    state: OtpState,
    target: Option<String>,
    verification: Option<Verification>,
    deliveries: u32,
    rejections: u32,
}

impl OtpChallenge {
    pub fn new(channel: Channel) -> Self {
        Self {
            channel,
            state: OtpState::Idle,
            target: None,
            verification: None,
            deliveries: 0,
            rejections: 0,
        }
    }

    pub fn channel(&self) -> Channel {
        self.channel
    }

    pub fn state(&self) -> OtpState {
        self.state
    }

    pub fn is_verified(&self) -> bool {
        self.state == OtpState::Verified
    }

    /// Contact value the most recent delivered code was sent to.
    pub fn target(&self) -> Option<&str> {
        self.target.as_deref()
    }

    pub fn verification(&self) -> Option<&Verification> {
        self.verification.as_ref()
    }

    /// Code that verified the channel, if it was proven in this session.
    pub fn verifying_code(&self) -> Option<&str> {
        match &self.verification {
            Some(Verification::Code(code)) => Some(code),
            _ => None,
        }
    }

    pub fn deliveries(&self) -> u32 {
        self.deliveries
    }

    pub fn rejections(&self) -> u32 {
        self.rejections
    }

    /// Checks that a new code may be requested.
    pub fn ensure_can_request(&self) -> SyncResult<()> {
        if self.is_verified() {
            return Err(SyncError::AlreadyVerified {
                channel: self.channel,
            });
        }
        Ok(())
    }

    /// Checks that a code may be submitted.
    pub fn ensure_can_submit(&self) -> SyncResult<()> {
        match self.state {
            OtpState::Verified => Err(SyncError::AlreadyVerified {
                channel: self.channel,
            }),
            OtpState::Idle => Err(SyncError::NoPendingChallenge {
                channel: self.channel,
            }),
            OtpState::Sent | OtpState::Rejected => Ok(()),
        }
    }

    /// The service accepted a send request for `target`.
    pub fn delivered(&mut self, target: impl Into<String>) {
        if self.is_verified() {
            return;
        }
        self.state = OtpState::Sent;
        self.target = Some(target.into());
        self.deliveries = self.deliveries.saturating_add(1);
    }

    /// The service accepted `code`. Returns the target to persist, or `None`
    /// when the channel was already verified.
    pub fn accepted(&mut self, code: impl Into<String>) -> Option<String> {
        if self.is_verified() {
            return None;
        }
        self.state = OtpState::Verified;
        self.verification = Some(Verification::Code(code.into()));
        self.target.clone()
    }

    /// The service rejected a code. No-op unless a code was outstanding.
    pub fn rejected(&mut self) -> bool {
        if !self.state.accepts_code() {
            return false;
        }
        self.state = OtpState::Rejected;
        self.rejections = self.rejections.saturating_add(1);
        true
    }

    /// Trust-on-fetch: a populated contact in the snapshot verifies the
    /// channel. An empty contact never downgrades it.
    pub fn reconcile(&mut self, contact_populated: bool) -> bool {
        if !contact_populated || self.is_verified() {
            return false;
        }
        self.state = OtpState::Verified;
        self.verification = Some(Verification::Snapshot);
        true
    }
}
