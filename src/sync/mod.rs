//! Debounced profile synchronization and contact verification.

pub mod clock;
pub mod controller;
pub mod debounce;
pub mod journal;
pub mod otp;
pub mod session;

pub use clock::{Clock, ManualClock, SystemClock};
pub use controller::{Completion, Effect, Notice, Outcome, ProfileSyncController, RequestId};
pub use debounce::{Debouncer, StableEdit};
pub use journal::{SyncEvent, SyncEventType, SyncJournal};
pub use otp::{OtpChallenge, OtpState, Verification};
pub use session::SyncSession;
