use std::{env, thread, time::Duration};

use anyhow::{anyhow, Context, Result};
use profilesync::{
    config::load_or_default,
    sync::{Notice, SystemClock},
    Channel, FieldName, InMemoryProfileStore, Profile, SyncSession,
};
use tracing_subscriber::EnvFilter;

/// Replays the phone verification flow against the in-memory store:
/// edit, withheld push, wrong code, right code, single persisted update.
fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let phone = env::args().nth(1).unwrap_or_else(|| "5551234".into());
    let config = load_or_default()?;
    let quiescence = config.debounce.quiescence_ms;
    let store = InMemoryProfileStore::from_config(Profile::default(), &config)
        .with_fixed_code("1234");
    let mut session = SyncSession::open(config, store, SystemClock)?;

    session.mount()?;
    session.edit(FieldName::Phone, &phone)?;
    thread::sleep(Duration::from_millis(quiescence));
    session.tick();
    report(&mut session);

    session.request_otp(Channel::Phone)?;
    session.submit_code(Channel::Phone, "0000")?;
    report(&mut session);
    session.submit_code(Channel::Phone, "1234")?;
    report(&mut session);

    let verified = session.remote().verified_target(Channel::Phone);
    if verified != Some(phone.trim()) {
        return Err(anyhow!("code was verified for {verified:?}, not '{phone}'"));
    }
    // Phone numbers are stored numerically.
    let expected = phone
        .trim()
        .parse::<u64>()
        .with_context(|| format!("'{phone}' is not a phone number"))?
        .to_string();
    let saved = &session.remote().profile().phone;
    if *saved != expected {
        return Err(anyhow!("phone was not persisted (server has '{saved}')"));
    }
    println!(
        "phone {} persisted after {} update call(s)",
        saved,
        session.remote().updates().len()
    );
    for event in session.controller().journal().events() {
        let line = serde_json::to_string(event).context("Failed to render sync event")?;
        println!("{line}");
    }
    Ok(())
}

fn report<C: profilesync::sync::Clock>(session: &mut SyncSession<InMemoryProfileStore, C>) {
    for notice in session.take_notices() {
        match notice {
            Notice::Failed(err) => println!("! {err}"),
            other => println!("- {other:?}"),
        }
    }
}
