use profilesync::sync::{ManualClock, Notice};
use profilesync::{Profile, SyncConfig, InMemoryProfileStore, SyncError, SyncSession};

pub type TestSession = SyncSession<InMemoryProfileStore, ManualClock>;

pub const QUIESCENCE_MS: u64 = 1_000;
pub const ISSUED_CODE: &str = "1234";

/// Store that always issues [`ISSUED_CODE`].
pub fn store(profile: Profile) -> InMemoryProfileStore {
    InMemoryProfileStore::new(profile).with_fixed_code(ISSUED_CODE)
}

pub fn mounted_with(store: InMemoryProfileStore) -> TestSession {
    let mut session = SyncSession::new(SyncConfig::default(), store, ManualClock::new(0));
    session.mount().expect("mount should succeed");
    session
}

pub fn mounted(profile: Profile) -> TestSession {
    mounted_with(store(profile))
}

/// Lets every pending debounce timer expire and fires it.
pub fn settle(session: &mut TestSession) {
    session.clock().advance(QUIESCENCE_MS);
    session.tick();
}

pub fn contact_profile(phone: &str, email: &str) -> Profile {
    Profile {
        name: "Ada Lovelace".into(),
        phone: phone.into(),
        email: email.into(),
        address: "12 Analytical Way".into(),
        gender: "F".into(),
    }
}

pub fn failures(notices: &[Notice]) -> Vec<SyncError> {
    notices
        .iter()
        .filter_map(|notice| match notice {
            Notice::Failed(err) => Some(err.clone()),
            _ => None,
        })
        .collect()
}
