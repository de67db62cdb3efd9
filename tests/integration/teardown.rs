use profilesync::remote::RemoteOperation;
use profilesync::sync::session::execute;
use profilesync::sync::{SyncEventType, SyncJournal};
use profilesync::{
    Channel, FieldName, InMemoryProfileStore, Profile, ProfileSyncController, SyncConfig, SyncError,
};

use crate::support::session::{mounted, settle};

#[test]
fn closing_cancels_pending_timers() {
    let mut session = mounted(Profile::default());
    session.edit(FieldName::Name, "Ada").unwrap();
    session.edit(FieldName::Address, "1 Loop Rd").unwrap();
    session.close();
    settle(&mut session);

    assert_eq!(session.remote().count(RemoteOperation::UpdateField), 0);
    let closed = session
        .controller()
        .journal()
        .last(SyncEventType::Closed)
        .expect("close should be journaled");
    assert_eq!(closed.details["cancelled_timers"], 2);
}

#[test]
fn completions_after_close_are_ignored() {
    let mut store = InMemoryProfileStore::new(Profile::default());
    let mut controller = ProfileSyncController::new(SyncConfig::default(), SyncJournal::in_memory());
    for effect in controller.mount().unwrap() {
        let completion = execute(&mut store, &effect);
        controller.complete(completion);
    }
    controller.edit(FieldName::Name, "Ada", 0).unwrap();
    let push = controller.tick(1_000);
    assert_eq!(controller.in_flight(), 1);

    controller.close();
    let completion = execute(&mut store, &push[0]);
    let follow_up = controller.complete(completion);

    assert!(follow_up.is_empty());
    assert!(controller.take_notices().is_empty());
    assert_eq!(controller.confirmed().unwrap().name, "");
    assert_eq!(controller.journal().count(SyncEventType::CompletionIgnored), 1);
    // The server still applied the write; only the client handler was dropped.
    assert_eq!(store.profile().name, "Ada");
}

#[test]
fn commands_after_close_report_closed() {
    let mut session = mounted(Profile::default());
    session.close();
    assert_eq!(session.edit(FieldName::Name, "Ada"), Err(SyncError::Closed));
    assert_eq!(session.request_otp(Channel::Phone), Err(SyncError::Closed));
    assert_eq!(session.submit_code(Channel::Phone, "1234"), Err(SyncError::Closed));
    assert_eq!(session.retry(FieldName::Name), Err(SyncError::Closed));
    assert!(session.controller().is_closed());
    assert!(!SyncError::Closed.is_retryable());
}
