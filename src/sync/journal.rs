use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use uuid::Uuid;

use crate::config::{journal_file_path, SyncConfig};

/// Type of sync events that can be journaled.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SyncEventType {
    Mounted,
    Hydrated,
    ChannelTrusted,
    EditStable,
    ValidationFailed,
    PushIssued,
    PushWithheld,
    FieldPersisted,
    PersistenceFailed,
    OtpRequested,
    OtpDelivered,
    OtpDeliveryFailed,
    OtpSubmitted,
    OtpVerified,
    OtpRejected,
    CompletionIgnored,
    Closed,
}

/// Single journal entry stored as JSONL.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncEvent {
    pub event_id: Uuid,
    pub event_type: SyncEventType,
    pub timestamp: DateTime<Utc>,
    pub details: serde_json::Value,
}

/// Ordered record of controller decisions, optionally mirrored to disk.
#[derive(Debug, Default)]
pub struct SyncJournal {
    events: Vec<SyncEvent>,
    mirror: Option<PathBuf>,
}

impl SyncJournal {
    pub fn in_memory() -> Self {
        Self::default()
    }

    pub fn with_mirror(path: impl Into<PathBuf>) -> Self {
        Self {
            events: Vec::new(),
            mirror: Some(path.into()),
        }
    }

    /// Builds the journal described by `config.journal`.
    pub fn from_config(config: &SyncConfig) -> Result<Self> {
        if config.journal.persist {
            Ok(Self::with_mirror(journal_file_path(config)?))
        } else {
            Ok(Self::in_memory())
        }
    }

    pub fn record(&mut self, event_type: SyncEventType, details: serde_json::Value) -> Uuid {
        let event = SyncEvent {
            event_id: Uuid::new_v4(),
            event_type,
            timestamp: Utc::now(),
            details,
        };
        if let Some(path) = &self.mirror {
            // Mirroring is best effort; the in-memory record stays authoritative.
            if let Err(err) = append_event(path, &event) {
                tracing::warn!(path = %path.display(), error = %err, "failed to mirror sync event");
            }
        }
        let event_id = event.event_id;
        self.events.push(event);
        event_id
    }

    pub fn events(&self) -> &[SyncEvent] {
        &self.events
    }

    pub fn count(&self, event_type: SyncEventType) -> usize {
        self.events
            .iter()
            .filter(|event| event.event_type == event_type)
            .count()
    }

    pub fn last(&self, event_type: SyncEventType) -> Option<&SyncEvent> {
        self.events
            .iter()
            .rev()
            .find(|event| event.event_type == event_type)
    }

    pub fn mirror_path(&self) -> Option<&Path> {
        self.mirror.as_deref()
    }
}

fn append_event(path: &Path, event: &SyncEvent) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut file = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)?;
    file.write_all(serde_json::to_string(event)?.as_bytes())?;
    file.write_all(b"\n")?;
    Ok(())
}

/// Reads a mirrored journal back from disk.
pub fn load_events(path: &Path) -> Result<Vec<SyncEvent>> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let data = fs::read_to_string(path)?;
    let mut events = Vec::new();
    for line in data.lines().filter(|l| !l.trim().is_empty()) {
        let event: SyncEvent = serde_json::from_str(line)?;
        events.push(event);
    }
    Ok(events)
}
