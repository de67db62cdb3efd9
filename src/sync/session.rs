//! Synchronous driver that runs controller effects against a remote.
//!
//! Effects are executed in FIFO order and their completions fed straight back,
//! so a command returns once every call it caused (including refetches) has
//! settled. Time only moves through the supplied [`Clock`].

use anyhow::Result;
use std::collections::VecDeque;

use crate::config::SyncConfig;
use crate::error::SyncResult;
use crate::profile::model::{Channel, FieldName};
use crate::remote::ProfileRemote;

use super::clock::Clock;
use super::controller::{Completion, Effect, Notice, Outcome, ProfileSyncController};
use super::journal::SyncJournal;

/// Performs one effect and wraps the response for the controller.
pub fn execute<R: ProfileRemote + ?Sized>(remote: &mut R, effect: &Effect) -> Completion {
    let outcome = match effect {
        Effect::FetchProfile { .. } => Outcome::ProfileFetched(remote.fetch_profile()),
        Effect::UpdateField { update, .. } => {
            Outcome::FieldUpdated(remote.update_profile_field(update))
        }
        Effect::RequestOtp {
            channel, target, ..
        } => Outcome::OtpRequested(remote.request_otp(*channel, target)),
        Effect::VerifyOtp { channel, code, .. } => {
            Outcome::OtpChecked(remote.verify_otp(*channel, code))
        }
    };
    Completion::new(effect.request(), outcome)
}

pub struct SyncSession<R, C> {
    controller: ProfileSyncController,
    remote: R,
    clock: C,
    queue: VecDeque<Effect>,
}

impl<R: ProfileRemote, C: Clock> SyncSession<R, C> {
    /// Session with an in-memory journal.
    pub fn new(config: SyncConfig, remote: R, clock: C) -> Self {
        Self::with_journal(config, SyncJournal::in_memory(), remote, clock)
    }

    /// Session whose journal follows `config.journal`.
    pub fn open(config: SyncConfig, remote: R, clock: C) -> Result<Self> {
        let journal = SyncJournal::from_config(&config)?;
        Ok(Self::with_journal(config, journal, remote, clock))
    }

    pub fn with_journal(config: SyncConfig, journal: SyncJournal, remote: R, clock: C) -> Self {
        Self {
            controller: ProfileSyncController::new(config, journal),
            remote,
            clock,
            queue: VecDeque::new(),
        }
    }

    pub fn mount(&mut self) -> SyncResult<()> {
        let effects = self.controller.mount()?;
        self.run(effects);
        Ok(())
    }

    pub fn refresh(&mut self) -> SyncResult<()> {
        let effects = self.controller.refresh()?;
        self.run(effects);
        Ok(())
    }

    pub fn edit(&mut self, field: FieldName, value: &str) -> SyncResult<()> {
        let now = self.clock.now_ms();
        let effects = self.controller.edit(field, value, now)?;
        self.run(effects);
        Ok(())
    }

    /// Fires every debounce timer that has expired by now.
    pub fn tick(&mut self) {
        let now = self.clock.now_ms();
        let effects = self.controller.tick(now);
        self.run(effects);
    }

    pub fn retry(&mut self, field: FieldName) -> SyncResult<()> {
        let effects = self.controller.retry(field)?;
        self.run(effects);
        Ok(())
    }

    pub fn request_otp(&mut self, channel: Channel) -> SyncResult<()> {
        let effects = self.controller.request_otp(channel)?;
        self.run(effects);
        Ok(())
    }

    pub fn submit_code(&mut self, channel: Channel, code: &str) -> SyncResult<()> {
        let effects = self.controller.submit_code(channel, code)?;
        self.run(effects);
        Ok(())
    }

    pub fn close(&mut self) {
        self.queue.clear();
        self.controller.close();
    }

    pub fn take_notices(&mut self) -> Vec<Notice> {
        self.controller.take_notices()
    }

    pub fn controller(&self) -> &ProfileSyncController {
        &self.controller
    }

    pub fn remote(&self) -> &R {
        &self.remote
    }

    pub fn remote_mut(&mut self) -> &mut R {
        &mut self.remote
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    fn run(&mut self, effects: Vec<Effect>) {
        self.queue.extend(effects);
        while let Some(effect) = self.queue.pop_front() {
            let completion = execute(&mut self.remote, &effect);
            let follow_up = self.controller.complete(completion);
            self.queue.extend(follow_up);
        }
    }
}
