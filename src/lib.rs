pub mod config;
pub mod error;
pub mod profile;
pub mod remote;
pub mod sync;

// Re-export commonly used types for convenience.
pub use config::SyncConfig;
pub use error::{RemoteError, SyncError};
pub use profile::{Channel, FieldEditBuffer, FieldName, FieldUpdate, FieldValue, Profile};
pub use remote::{InMemoryProfileStore, ProfileRemote};
pub use sync::{OtpState, ProfileSyncController, SyncSession};
