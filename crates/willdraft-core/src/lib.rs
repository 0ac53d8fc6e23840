//! willdraft Core Library
//!
//! This crate provides the core of willdraft, a tool for drafting a personal
//! will through a step-by-step form, with edits saved automatically.
//!
//! # Architecture
//!
//! - **Autosave**: a single task per editing session that debounces edits,
//!   skips saves when nothing changed and never runs two saves at once
//! - **Store**: JSON files per will, photos alongside; implements the save
//!   endpoint the autosave task talks to
//!
//! # Quick Start
//!
//! ```text
//! let config = Config::load()?;
//! let store = Arc::new(LocalWillStore::open(&config)?);
//! let location = Arc::new(QueryLocation::new());
//!
//! let handle = spawn_autosave(WillValues::new(), store, location, AutoSaveConfig::default());
//! handle.update(|will| will.title = Some("My will".into()));
//! ```
//!
//! # Modules
//!
//! - `autosave`: debounced autosave task, its state machine and the endpoint trait
//! - `store`: local file-backed will store (main entry point for persistence)
//! - `models`: editable values and stored records
//! - `attachment`: photo references and their comparison rule
//! - `validation`: normalization and validation before saving
//! - `permissions`: subscription plans and what they unlock
//! - `steps`: wizard steps
//! - `location`: query-string state (`willId`, `step`)
//! - `storage`: atomic file persistence
//! - `config`: Application configuration

pub mod attachment;
pub mod autosave;
pub mod config;
pub mod location;
pub mod models;
pub mod permissions;
pub mod steps;
pub mod storage;
pub mod store;
pub mod validation;

pub use attachment::{Attachment, LocalBlob};
pub use autosave::{
    spawn_autosave, AutoSaveConfig, AutoSaveHandle, SaveError, SaveNotice, SaveRequest,
    SaveStatus, SavedWill, WillEndpoint,
};
pub use config::Config;
pub use location::{Location, QueryLocation, STEP_PARAM, WILL_ID_PARAM};
pub use models::{FieldError, WillRecord, WillValues};
pub use permissions::SubscriptionLevel;
pub use steps::EditorStep;
pub use storage::{StorageError, StorageResult};
pub use store::LocalWillStore;
pub use validation::ValidationError;
