//! Document autosave
//!
//! Keeps a will being edited in sync with its store without an explicit
//! save action. Edits are debounced; a settled document is saved only when
//! it differs from what was last persisted, and at most one save is in
//! flight at a time. A failed save is never retried automatically: the
//! error stays until the content changes or the user asks for a retry.

mod debounce;
mod endpoint;
mod saver;
mod state;

pub use debounce::{Debouncer, DEFAULT_WINDOW};
pub use endpoint::{SaveError, SaveRequest, SavedWill, WillEndpoint};
pub use saver::{spawn_autosave, AutoSaveCommand, AutoSaveConfig, AutoSaveHandle, SaveNotice};
pub use state::{Phase, SaveStatus, Snapshot, SyncState};
