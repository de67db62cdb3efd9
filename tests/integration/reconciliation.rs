use profilesync::sync::session::execute;
use profilesync::sync::{Effect, SyncJournal};
use profilesync::{
    Channel, FieldName, FieldValue, InMemoryProfileStore, OtpState, Profile, ProfileSyncController,
    SyncConfig,
};

use crate::support::session::{contact_profile, mounted, settle};

fn run_all(
    controller: &mut ProfileSyncController,
    store: &mut InMemoryProfileStore,
    effects: Vec<Effect>,
) {
    let mut queue = effects;
    while !queue.is_empty() {
        let effect = queue.remove(0);
        let completion = execute(store, &effect);
        queue.extend(controller.complete(completion));
    }
}

#[test]
fn same_snapshot_hydrates_identically() {
    let mut session = mounted(contact_profile("5550001", "ada@example.com"));
    let first = session.controller().buffer().clone();
    session.refresh().unwrap();
    assert_eq!(*session.controller().buffer(), first);
    assert_eq!(
        session.controller().buffer().snapshot(),
        contact_profile("5550001", "ada@example.com")
    );
}

#[test]
fn refetch_overwrites_edits_typed_during_flight() {
    let mut store = InMemoryProfileStore::new(contact_profile("", ""));
    let mut controller = ProfileSyncController::new(SyncConfig::default(), SyncJournal::in_memory());
    let mount = controller.mount().unwrap();
    run_all(&mut controller, &mut store, mount);

    controller.edit(FieldName::Name, "Grace", 0).unwrap();
    let push = controller.tick(1_000);
    assert_eq!(push.len(), 1);

    // The user keeps typing while the update is in flight.
    controller.edit(FieldName::Name, "Grace Hopper", 1_100).unwrap();
    assert_eq!(controller.buffer().get(FieldName::Name), "Grace Hopper");

    run_all(&mut controller, &mut store, push);
    assert_eq!(controller.buffer().get(FieldName::Name), "Grace");
    assert_eq!(controller.confirmed().unwrap().name, "Grace");

    // The newer edit still reaches the server once its own window elapses.
    let later = controller.tick(2_100);
    let Effect::UpdateField { update, .. } = &later[0] else {
        panic!("expected a field update, got {later:?}");
    };
    assert_eq!(update.value, FieldValue::Text("Grace Hopper".into()));
    run_all(&mut controller, &mut store, later);
    assert_eq!(controller.buffer().get(FieldName::Name), "Grace Hopper");
}

#[test]
fn refetch_reverts_unsaved_contact_in_buffer() {
    let mut session = mounted(Profile::default());
    session.edit(FieldName::Phone, "5551234").unwrap();
    session.edit(FieldName::Address, "1 Loop Rd").unwrap();
    settle(&mut session);

    // The address save refetched the snapshot, which has no phone yet.
    assert_eq!(session.controller().buffer().get(FieldName::Address), "1 Loop Rd");
    assert_eq!(session.controller().buffer().get(FieldName::Phone), "");
    assert_eq!(session.controller().withheld(Channel::Phone), Some("5551234"));
}

#[test]
fn contact_confirmed_elsewhere_becomes_trusted() {
    let mut session = mounted(Profile::default());
    session.edit(FieldName::Email, "mine@example.com").unwrap();
    settle(&mut session);
    assert_eq!(
        session.controller().withheld(Channel::Email),
        Some("mine@example.com")
    );

    session.remote_mut().profile_mut().email = "theirs@example.com".into();
    session.refresh().unwrap();

    assert_eq!(session.controller().otp_state(Channel::Email), OtpState::Verified);
    assert_eq!(session.controller().withheld(Channel::Email), None);
    assert_eq!(
        session.controller().buffer().get(FieldName::Email),
        "theirs@example.com"
    );
}

#[test]
fn empty_snapshot_never_downgrades_a_channel() {
    let mut controller = ProfileSyncController::new(SyncConfig::default(), SyncJournal::in_memory());
    controller.reconcile(contact_profile("5550001", ""));
    controller.reconcile(Profile::default());
    assert_eq!(controller.otp_state(Channel::Phone), OtpState::Verified);
}
