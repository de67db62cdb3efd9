//! Profile synchronization controller.
//!
//! The controller is a unidirectional state machine: commands (mount, edit,
//! tick, OTP actions, close) and remote [`Completion`]s go in; [`Effect`]s
//! describing remote calls come out, together with user-facing [`Notice`]s.
//! It performs no I/O itself, so every interleaving of edits and in-flight
//! responses can be driven deterministically.
//!
//! Gate: non-sensitive fields are pushed as soon as their edit is stable.
//! Phone and email are pushed only while their OTP channel is verified;
//! otherwise the stable value is withheld until a code is accepted, at which
//! point the verified contact is pushed together with the code.
//!
//! Reconciliation is last-confirmed-wins: every successful push triggers a
//! refetch, and the refetched snapshot overwrites the whole edit buffer even
//! if the user typed further while the push was in flight.

use serde_json::json;
use std::collections::{BTreeMap, HashMap};

use crate::config::SyncConfig;
use crate::error::{RemoteError, SyncError, SyncResult};
use crate::profile::buffer::FieldEditBuffer;
use crate::profile::model::{Channel, FieldName, FieldUpdate, OtpVerdict, Profile};
use crate::profile::validation::{normalize_field, validate_code, validate_contact_target};

use super::debounce::Debouncer;
use super::journal::{SyncEventType, SyncJournal};
use super::otp::{OtpChallenge, OtpState};

pub type RequestId = u64;

/// Remote call the driver must perform on the controller's behalf.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    FetchProfile {
        request: RequestId,
    },
    UpdateField {
        request: RequestId,
        update: FieldUpdate,
    },
    RequestOtp {
        request: RequestId,
        channel: Channel,
        target: String,
    },
    VerifyOtp {
        request: RequestId,
        channel: Channel,
        code: String,
    },
}

impl Effect {
    pub fn request(&self) -> RequestId {
        match self {
            Effect::FetchProfile { request }
            | Effect::UpdateField { request, .. }
            | Effect::RequestOtp { request, .. }
            | Effect::VerifyOtp { request, .. } => *request,
        }
    }
}

/// Response to a previously emitted [`Effect`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    ProfileFetched(Result<Profile, RemoteError>),
    FieldUpdated(Result<(), RemoteError>),
    OtpRequested(Result<(), RemoteError>),
    OtpChecked(Result<OtpVerdict, RemoteError>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    pub request: RequestId,
    pub outcome: Outcome,
}

impl Completion {
    pub fn new(request: RequestId, outcome: Outcome) -> Self {
        Self { request, outcome }
    }
}

/// Message the panel should show.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    FieldSaved { field: FieldName },
    /// A stable contact edit is waiting for verification.
    VerificationRequired { field: FieldName },
    CodeSent { channel: Channel },
    ChannelVerified { channel: Channel },
    Failed(SyncError),
}

#[derive(Debug, Clone)]
enum InFlight {
    Fetch,
    Update { field: FieldName },
    OtpRequest { channel: Channel, target: String },
    OtpCheck { channel: Channel, code: String },
}

pub struct ProfileSyncController {
    config: SyncConfig,
    buffer: FieldEditBuffer,
    confirmed: Option<Profile>,
    debouncer: Debouncer,
    challenges: BTreeMap<Channel, OtpChallenge>,
    withheld: BTreeMap<Channel, String>,
    in_flight: HashMap<RequestId, InFlight>,
    next_request: RequestId,
    notices: Vec<Notice>,
    journal: SyncJournal,
    closed: bool,
}

impl ProfileSyncController {
    pub fn new(config: SyncConfig, journal: SyncJournal) -> Self {
        let challenges = Channel::ALL
            .iter()
            .map(|channel| (*channel, OtpChallenge::new(*channel)))
            .collect();
        Self {
            config,
            buffer: FieldEditBuffer::new(),
            confirmed: None,
            debouncer: Debouncer::new(),
            challenges,
            withheld: BTreeMap::new(),
            in_flight: HashMap::new(),
            next_request: 1,
            notices: Vec::new(),
            journal,
            closed: false,
        }
    }

    /// Starts the session by fetching the canonical profile.
    pub fn mount(&mut self) -> SyncResult<Vec<Effect>> {
        self.ensure_open()?;
        self.journal.record(SyncEventType::Mounted, json!({}));
        Ok(vec![self.fetch()])
    }

    /// Invalidates the snapshot and fetches it again.
    pub fn refresh(&mut self) -> SyncResult<Vec<Effect>> {
        self.ensure_open()?;
        Ok(vec![self.fetch()])
    }

    /// Records a keystroke and restarts the field's quiescence timer.
    ///
    /// Fields configured as immediate are gated on the same call. Re-entering
    /// the value already buffered does not re-arm the timer unless a
    /// different value is still pending for the field.
    pub fn edit(&mut self, field: FieldName, value: &str, now_ms: u64) -> SyncResult<Vec<Effect>> {
        self.ensure_open()?;
        let changed = self.buffer.set(field, value);
        let superseded = self
            .debouncer
            .pending_value(field)
            .is_some_and(|pending| pending != value);
        if !changed && !superseded {
            return Ok(self.tick(now_ms));
        }
        let window = self.config.debounce.window_for(field);
        self.debouncer.observe(field, value, now_ms, window);
        Ok(self.tick(now_ms))
    }

    /// Gates every edit whose quiescence window has elapsed.
    pub fn tick(&mut self, now_ms: u64) -> Vec<Effect> {
        if self.closed {
            return Vec::new();
        }
        let stable = self.debouncer.flush_ready(now_ms);
        stable
            .into_iter()
            .filter_map(|edit| self.gate(edit.field, &edit.value))
            .collect()
    }

    /// Re-runs the gate on the current buffer value of `field`.
    pub fn retry(&mut self, field: FieldName) -> SyncResult<Vec<Effect>> {
        self.ensure_open()?;
        self.debouncer.cancel(field);
        let value = self.buffer.get(field).to_string();
        Ok(self.gate(field, &value).into_iter().collect())
    }

    /// Asks the channel's service to deliver a code to the buffered contact.
    pub fn request_otp(&mut self, channel: Channel) -> SyncResult<Vec<Effect>> {
        self.ensure_open()?;
        self.challenge(channel).ensure_can_request()?;
        let target = validate_contact_target(
            &self.config.validation,
            channel,
            self.buffer.get(channel.field()),
        )?;
        let request = self.track(InFlight::OtpRequest {
            channel,
            target: target.clone(),
        });
        self.journal.record(
            SyncEventType::OtpRequested,
            json!({ "channel": channel, "request": request }),
        );
        tracing::debug!(%channel, request, "requesting otp");
        Ok(vec![Effect::RequestOtp {
            request,
            channel,
            target,
        }])
    }

    /// Submits a code for the channel's outstanding challenge.
    pub fn submit_code(&mut self, channel: Channel, code: &str) -> SyncResult<Vec<Effect>> {
        self.ensure_open()?;
        let code = validate_code(channel, code)?;
        self.challenge(channel).ensure_can_submit()?;
        let request = self.track(InFlight::OtpCheck {
            channel,
            code: code.clone(),
        });
        self.journal.record(
            SyncEventType::OtpSubmitted,
            json!({ "channel": channel, "request": request }),
        );
        Ok(vec![Effect::VerifyOtp {
            request,
            channel,
            code,
        }])
    }

    /// Applies a remote response. Responses for unknown requests, or that
    /// arrive after [`close`](Self::close), are dropped.
    pub fn complete(&mut self, completion: Completion) -> Vec<Effect> {
        let pending = if self.closed {
            None
        } else {
            self.in_flight.remove(&completion.request)
        };
        let Some(pending) = pending else {
            tracing::debug!(request = completion.request, "ignoring completion");
            self.journal.record(
                SyncEventType::CompletionIgnored,
                json!({ "request": completion.request, "closed": self.closed }),
            );
            return Vec::new();
        };

        match (pending, completion.outcome) {
            (InFlight::Fetch, Outcome::ProfileFetched(Ok(profile))) => {
                self.reconcile(profile);
                Vec::new()
            }
            (InFlight::Fetch, Outcome::ProfileFetched(Err(err))) => {
                self.fail(SyncError::Unavailable {
                    action: "load profile".into(),
                    reason: err.to_string(),
                });
                Vec::new()
            }
            (InFlight::Update { field }, Outcome::FieldUpdated(Ok(()))) => {
                self.journal
                    .record(SyncEventType::FieldPersisted, json!({ "field": field }));
                self.notices.push(Notice::FieldSaved { field });
                vec![self.fetch()]
            }
            (InFlight::Update { field }, Outcome::FieldUpdated(Err(err))) => {
                tracing::warn!(%field, error = %err, "field update failed");
                self.journal.record(
                    SyncEventType::PersistenceFailed,
                    json!({ "field": field, "reason": err.to_string() }),
                );
                self.fail(SyncError::Persistence {
                    field,
                    reason: err.to_string(),
                });
                Vec::new()
            }
            (InFlight::OtpRequest { channel, target }, Outcome::OtpRequested(Ok(()))) => {
                self.challenge_mut(channel).delivered(target);
                self.journal
                    .record(SyncEventType::OtpDelivered, json!({ "channel": channel }));
                self.notices.push(Notice::CodeSent { channel });
                Vec::new()
            }
            (InFlight::OtpRequest { channel, .. }, Outcome::OtpRequested(Err(err))) => {
                self.journal.record(
                    SyncEventType::OtpDeliveryFailed,
                    json!({ "channel": channel, "reason": err.to_string() }),
                );
                self.fail(SyncError::OtpDelivery {
                    channel,
                    reason: err.to_string(),
                });
                Vec::new()
            }
            (InFlight::OtpCheck { channel, code }, Outcome::OtpChecked(Ok(verdict))) => {
                if verdict.success {
                    self.verified(channel, code)
                } else {
                    if self.challenge_mut(channel).rejected() {
                        self.journal
                            .record(SyncEventType::OtpRejected, json!({ "channel": channel }));
                        self.fail(SyncError::OtpRejected { channel });
                    }
                    Vec::new()
                }
            }
            (InFlight::OtpCheck { channel, .. }, Outcome::OtpChecked(Err(err))) => {
                self.fail(SyncError::Unavailable {
                    action: format!("check {channel} code"),
                    reason: err.to_string(),
                });
                Vec::new()
            }
            (pending, outcome) => {
                tracing::warn!(?pending, ?outcome, "completion does not match request");
                self.journal.record(
                    SyncEventType::CompletionIgnored,
                    json!({ "request": completion.request, "mismatched": true }),
                );
                Vec::new()
            }
        }
    }

    /// Overwrites the edit buffer with `snapshot` and trusts every contact
    /// channel the snapshot already carries.
    pub fn reconcile(&mut self, snapshot: Profile) {
        self.buffer.hydrate(&snapshot);
        for channel in Channel::ALL {
            let populated = snapshot.has_contact(channel);
            if self.challenge_mut(channel).reconcile(populated) {
                self.withheld.remove(&channel);
                self.journal
                    .record(SyncEventType::ChannelTrusted, json!({ "channel": channel }));
            }
        }
        self.journal.record(
            SyncEventType::Hydrated,
            json!({ "fingerprint": snapshot.fingerprint() }),
        );
        self.confirmed = Some(snapshot);
    }

    /// Tears the session down: pending timers are cancelled and later
    /// completions are ignored.
    pub fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        let cancelled = self.debouncer.cancel_all();
        let abandoned = self.in_flight.len();
        self.in_flight.clear();
        self.journal.record(
            SyncEventType::Closed,
            json!({ "cancelled_timers": cancelled, "abandoned_requests": abandoned }),
        );
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn buffer(&self) -> &FieldEditBuffer {
        &self.buffer
    }

    /// Last snapshot received from the server.
    pub fn confirmed(&self) -> Option<&Profile> {
        self.confirmed.as_ref()
    }

    pub fn challenge(&self, channel: Channel) -> &OtpChallenge {
        &self.challenges[&channel]
    }

    pub fn otp_state(&self, channel: Channel) -> OtpState {
        self.challenge(channel).state()
    }

    /// Stable contact value held back until the channel is verified.
    pub fn withheld(&self, channel: Channel) -> Option<&str> {
        self.withheld.get(&channel).map(String::as_str)
    }

    pub fn next_deadline(&self) -> Option<u64> {
        self.debouncer.next_deadline()
    }

    pub fn debouncer(&self) -> &Debouncer {
        &self.debouncer
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }

    pub fn journal(&self) -> &SyncJournal {
        &self.journal
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    pub fn take_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }

    fn ensure_open(&self) -> SyncResult<()> {
        if self.closed {
            return Err(SyncError::Closed);
        }
        Ok(())
    }

    fn challenge_mut(&mut self, channel: Channel) -> &mut OtpChallenge {
        self.challenges
            .entry(channel)
            .or_insert_with(|| OtpChallenge::new(channel))
    }

    fn track(&mut self, pending: InFlight) -> RequestId {
        let request = self.next_request;
        self.next_request += 1;
        self.in_flight.insert(request, pending);
        request
    }

    fn fetch(&mut self) -> Effect {
        let request = self.track(InFlight::Fetch);
        Effect::FetchProfile { request }
    }

    fn fail(&mut self, error: SyncError) {
        self.notices.push(Notice::Failed(error));
    }

    fn gate(&mut self, field: FieldName, raw: &str) -> Option<Effect> {
        self.journal
            .record(SyncEventType::EditStable, json!({ "field": field }));
        let value = match normalize_field(&self.config.validation, field, raw) {
            Ok(value) => value,
            Err(err) => {
                self.journal.record(
                    SyncEventType::ValidationFailed,
                    json!({ "field": field, "reason": err.to_string() }),
                );
                self.fail(err);
                return None;
            }
        };

        let mut update = FieldUpdate::new(field, value);
        if let Some(channel) = field.channel() {
            let challenge = self.challenge(channel);
            let state = challenge.state();
            let code = challenge.verifying_code().map(str::to_string);
            if state != OtpState::Verified {
                tracing::debug!(%field, ?state, "withholding contact edit");
                self.withheld.insert(channel, raw.to_string());
                self.journal
                    .record(SyncEventType::PushWithheld, json!({ "field": field }));
                self.notices.push(Notice::VerificationRequired { field });
                return None;
            }
            update.otp = code;
        }
        Some(self.push(update))
    }

    fn verified(&mut self, channel: Channel, code: String) -> Vec<Effect> {
        let Some(target) = self.challenge_mut(channel).accepted(code.clone()) else {
            tracing::debug!(%channel, "code accepted for a channel already verified");
            self.journal.record(
                SyncEventType::CompletionIgnored,
                json!({ "channel": channel, "already_verified": true }),
            );
            return Vec::new();
        };
        let field = channel.field();
        // A contact typed after the code was requested is pushed after the target.
        let newer = self
            .withheld
            .remove(&channel)
            .filter(|value| value.trim() != target);
        if self.debouncer.pending_value(field) == Some(target.as_str()) {
            self.debouncer.cancel(field);
        }
        self.journal
            .record(SyncEventType::OtpVerified, json!({ "channel": channel }));
        self.notices.push(Notice::ChannelVerified { channel });
        tracing::info!(%channel, "contact verified");

        let mut effects = Vec::new();
        match normalize_field(&self.config.validation, field, &target) {
            Ok(value) => effects.push(self.push(FieldUpdate::new(field, value).with_otp(code))),
            Err(err) => self.fail(err),
        }
        if let Some(value) = newer {
            effects.extend(self.gate(field, &value));
        }
        effects
    }

    fn push(&mut self, update: FieldUpdate) -> Effect {
        let field = update.key;
        let request = self.track(InFlight::Update { field });
        self.journal.record(
            SyncEventType::PushIssued,
            json!({ "field": field, "request": request, "with_otp": update.otp.is_some() }),
        );
        tracing::debug!(%field, request, "pushing field update");
        Effect::UpdateField { request, update }
    }
}
