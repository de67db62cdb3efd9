use profilesync::remote::RemoteOperation;
use profilesync::sync::Notice;
use profilesync::{Channel, FieldName, Profile, RemoteError, SyncError};

use crate::support::session::{
    contact_profile, failures, mounted, mounted_with, settle, store, ISSUED_CODE,
};

#[test]
fn failed_save_keeps_typed_value_without_retrying() {
    let mut backing = store(Profile::default());
    backing.fail_next(
        RemoteOperation::UpdateField,
        RemoteError::Unavailable("timeout".into()),
    );
    let mut session = mounted_with(backing);
    session.edit(FieldName::Address, "1 Loop Rd").unwrap();
    settle(&mut session);

    assert_eq!(session.controller().buffer().get(FieldName::Address), "1 Loop Rd");
    assert_eq!(session.remote().profile().address, "");
    let errors = failures(&session.take_notices());
    assert!(matches!(
        errors.as_slice(),
        [SyncError::Persistence {
            field: FieldName::Address,
            ..
        }]
    ));

    // Nothing is retried on its own.
    settle(&mut session);
    settle(&mut session);
    assert_eq!(session.remote().count(RemoteOperation::UpdateField), 1);

    session.retry(FieldName::Address).unwrap();
    assert_eq!(session.remote().profile().address, "1 Loop Rd");
    assert!(session.take_notices().contains(&Notice::FieldSaved {
        field: FieldName::Address
    }));
}

#[test]
fn next_stable_edit_retries_after_failure() {
    let mut backing = store(Profile::default());
    backing.fail_next(
        RemoteOperation::UpdateField,
        RemoteError::Unavailable("timeout".into()),
    );
    let mut session = mounted_with(backing);
    session.edit(FieldName::Name, "Ada").unwrap();
    settle(&mut session);
    session.edit(FieldName::Name, "Ada L").unwrap();
    settle(&mut session);
    assert_eq!(session.remote().profile().name, "Ada L");
    assert_eq!(session.remote().count(RemoteOperation::UpdateField), 2);
}

#[test]
fn invalid_values_never_reach_the_server() {
    let mut session = mounted(contact_profile("5550001", "ada@example.com"));
    session.edit(FieldName::Email, "ada at example").unwrap();
    session.edit(FieldName::Phone, "555-0002").unwrap();
    session.edit(FieldName::Gender, "X").unwrap();
    settle(&mut session);

    assert_eq!(session.remote().count(RemoteOperation::UpdateField), 0);
    let fields: Vec<_> = failures(&session.take_notices())
        .into_iter()
        .filter_map(|err| match err {
            SyncError::Validation { field, .. } => Some(field),
            _ => None,
        })
        .collect();
    assert_eq!(
        fields,
        vec![FieldName::Gender, FieldName::Phone, FieldName::Email]
    );
}

#[test]
fn strict_server_refuses_trusted_contact_without_code() {
    let backing = store(contact_profile("5550001", "")).require_contact_otp(true);
    let mut session = mounted_with(backing);
    session.edit(FieldName::Phone, "5550002").unwrap();
    settle(&mut session);

    assert_eq!(session.remote().profile().phone, "5550001");
    assert!(matches!(
        failures(&session.take_notices()).as_slice(),
        [SyncError::Persistence {
            field: FieldName::Phone,
            ..
        }]
    ));

    // A session-verified channel carries its code and passes the same policy.
    session.edit(FieldName::Email, "ada@example.com").unwrap();
    session.request_otp(Channel::Email).unwrap();
    session.submit_code(Channel::Email, ISSUED_CODE).unwrap();
    assert_eq!(session.remote().profile().email, "ada@example.com");
}

#[test]
fn failed_refresh_keeps_local_edits() {
    let mut session = mounted(contact_profile("5550001", "ada@example.com"));
    session.edit(FieldName::Name, "Grace").unwrap();
    session.remote_mut().fail_next(
        RemoteOperation::FetchProfile,
        RemoteError::Unavailable("offline".into()),
    );
    session.refresh().unwrap();

    assert!(matches!(
        failures(&session.take_notices()).as_slice(),
        [SyncError::Unavailable { .. }]
    ));
    assert_eq!(session.controller().buffer().get(FieldName::Name), "Grace");
    assert_eq!(
        session.controller().confirmed().map(|profile| profile.name.as_str()),
        Some("Ada Lovelace")
    );

    // The pending edit still goes out once the service is back.
    settle(&mut session);
    assert_eq!(session.remote().profile().name, "Grace");
    assert!(failures(&session.take_notices()).is_empty());
}
