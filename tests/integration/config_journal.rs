use anyhow::Result;
use profilesync::config::{config_file_path, journal_file_path, load_or_default, save};
use profilesync::sync::journal::load_events;
use profilesync::sync::{ManualClock, SyncEventType};
use profilesync::{FieldName, InMemoryProfileStore, Profile, SyncSession};

use crate::IntegrationHarness;

// Single test so the PROFILESYNC_HOME override is not raced by another test.
#[test]
fn config_round_trip_and_persisted_journal() -> Result<()> {
    let harness = IntegrationHarness::new();

    let defaults = load_or_default()?;
    assert_eq!(defaults.debounce.quiescence_ms, 1_000);
    assert!(!config_file_path()?.exists());

    let mut config = defaults;
    config.debounce.quiescence_ms = 250;
    config.journal.persist = true;
    save(&config)?;
    assert!(config_file_path()?.starts_with(harness.workspace_path()));

    let reloaded = load_or_default()?;
    assert_eq!(reloaded.debounce.quiescence_ms, 250);
    assert!(reloaded.journal.persist);

    let clock = ManualClock::new(0);
    let store = InMemoryProfileStore::new(Profile::default());
    let mut session = SyncSession::open(reloaded.clone(), store, &clock)?;
    session.mount()?;
    session.edit(FieldName::Name, "Ada")?;
    clock.advance(250);
    session.tick();
    assert_eq!(session.remote().profile().name, "Ada");

    let events = load_events(&journal_file_path(&reloaded)?)?;
    let types: Vec<_> = events.iter().map(|event| event.event_type).collect();
    assert_eq!(types.first(), Some(&SyncEventType::Mounted));
    assert!(types.contains(&SyncEventType::PushIssued));
    assert!(types.contains(&SyncEventType::FieldPersisted));
    assert_eq!(events.len(), session.controller().journal().events().len());
    Ok(())
}
