//! Save endpoint contract
//!
//! The synchronizer talks to whatever persists wills through
//! [`WillEndpoint`]. Implementations must be idempotent: sending the same
//! request twice for the same id must not create a second record.

use async_trait::async_trait;
use thiserror::Error;

use crate::attachment::Attachment;
use crate::models::{WillRecord, WillValues};
use crate::storage::StorageError;
use crate::validation::ValidationError;

/// Payload of a save call
#[derive(Debug, Clone, PartialEq)]
pub struct SaveRequest {
    /// Target will; `None` creates a new one
    pub id: Option<String>,
    /// Field values. `values.photo` is always `Attachment::None`; the photo
    /// travels in `photo`.
    pub values: WillValues,
    /// Photo change, `None` when the photo is unchanged and must not be
    /// re-uploaded
    pub photo: Option<Attachment>,
}

impl SaveRequest {
    /// Build the request for `values`, omitting the photo when it matches
    /// `previous_photo`
    pub fn new(id: Option<String>, values: &WillValues, previous_photo: &Attachment) -> Self {
        let mut values = values.clone();
        let photo = std::mem::take(&mut values.photo);
        values.id = id.clone();
        let photo = (photo != *previous_photo).then_some(photo);
        Self { id, values, photo }
    }
}

/// Result of a successful save
#[derive(Debug, Clone, PartialEq)]
pub struct SavedWill {
    /// Id assigned by the store; stable across later saves
    pub id: String,
    /// The record as stored
    pub record: WillRecord,
}

/// Errors returned by a save endpoint
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SaveError {
    #[error("Invalid will: {0}")]
    Validation(#[from] ValidationError),

    #[error("Could not reach the server: {0}")]
    Transport(String),

    #[error("Not authorized: {0}")]
    Unauthorized(String),

    #[error("Will not found: {0}")]
    NotFound(String),

    #[error("You have reached the limit of wills you can create")]
    LimitReached,

    #[error("You need a Pro Plus subscription to use customizations")]
    CustomizationRequiresUpgrade,

    #[error("Storage error: {0}")]
    Storage(String),
}

impl SaveError {
    /// Whether retrying the identical request could succeed
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            SaveError::Transport(_) | SaveError::Unauthorized(_) | SaveError::Storage(_)
        )
    }
}

impl From<StorageError> for SaveError {
    fn from(err: StorageError) -> Self {
        SaveError::Storage(err.to_string())
    }
}

/// Something that persists wills
#[async_trait]
pub trait WillEndpoint: Send + Sync {
    /// Create or update a will
    async fn save_will(&self, request: SaveRequest) -> Result<SavedWill, SaveError>;
}
