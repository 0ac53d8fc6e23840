//! Synchronizer state and its transitions
//!
//! ```text
//! IDLE   --(content settles & differs)--> SAVING
//! SAVING --(success)--------------------> IDLE   (last_persisted updated)
//! SAVING --(failure)--------------------> ERROR
//! ERROR  --(content changes again)------> IDLE
//! ERROR  --(manual retry)---------------> SAVING
//! ```
//!
//! Only the autosave task mutates this state. Every method here is
//! synchronous; the task calls them between its suspension points.

use std::ops::Deref;
use std::sync::Arc;

use serde::Serialize;

use super::endpoint::{SaveRequest, SavedWill};
use crate::models::WillValues;

/// Immutable point-in-time copy of a will
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot(Arc<WillValues>);

impl Snapshot {
    /// Deep-copy the given values
    pub fn capture(values: &WillValues) -> Self {
        Self(Arc::new(values.clone()))
    }

    pub fn values(&self) -> &WillValues {
        &self.0
    }
}

impl Deref for Snapshot {
    type Target = WillValues;

    fn deref(&self) -> &WillValues {
        &self.0
    }
}

/// Where the state machine currently is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Idle,
    Saving,
    Error,
}

/// Status exposed to the editor
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SaveStatus {
    /// A save call is in flight
    pub is_saving: bool,
    /// The live document differs from the last persisted snapshot
    pub has_unsaved_changes: bool,
    /// The last save failed and has not been retried or superseded
    pub has_error: bool,
    /// Id of the will once the store has assigned one
    pub will_id: Option<String>,
}

impl SaveStatus {
    /// Leaving now would lose edits
    pub fn should_warn_before_exit(&self) -> bool {
        self.has_unsaved_changes
    }
}

/// State owned by the autosave task
#[derive(Debug)]
pub struct SyncState {
    last_persisted: Snapshot,
    in_flight: bool,
    last_error_occurred: bool,
    /// Id of the target will, cached after the first successful save
    target_id: Option<String>,
    /// Most recent settled snapshot
    latest_settled: Option<Snapshot>,
    /// Snapshot of the in-flight or failed save
    attempted: Option<Snapshot>,
}

impl SyncState {
    /// Start idle with `initial` as the persisted state
    pub fn new(initial: &WillValues) -> Self {
        Self {
            last_persisted: Snapshot::capture(initial),
            in_flight: false,
            last_error_occurred: false,
            target_id: initial.id.clone(),
            latest_settled: None,
            attempted: None,
        }
    }

    pub fn phase(&self) -> Phase {
        if self.in_flight {
            Phase::Saving
        } else if self.last_error_occurred {
            Phase::Error
        } else {
            Phase::Idle
        }
    }

    pub fn last_persisted(&self) -> &Snapshot {
        &self.last_persisted
    }

    pub fn target_id(&self) -> Option<&str> {
        self.target_id.as_deref()
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight
    }

    pub fn has_error(&self) -> bool {
        self.last_error_occurred
    }

    pub fn has_unsaved_changes(&self, live: &WillValues) -> bool {
        *live != *self.last_persisted.values()
    }

    /// Status for the given live document
    pub fn status(&self, live: &WillValues) -> SaveStatus {
        SaveStatus {
            is_saving: self.in_flight,
            has_unsaved_changes: self.has_unsaved_changes(live),
            has_error: self.last_error_occurred,
            will_id: self.target_id.clone(),
        }
    }

    /// Clear the error once content moves away from the failed snapshot
    ///
    /// Returns true if the error was cleared.
    pub fn observe_edit(&mut self, live: &WillValues) -> bool {
        if !self.last_error_occurred {
            return false;
        }
        let changed = match &self.attempted {
            Some(failed) => *live != *failed.values(),
            None => true,
        };
        if changed {
            self.last_error_occurred = false;
            self.attempted = None;
        }
        changed
    }

    /// Record a settled snapshot; returns the request to send, if any
    pub fn settle(&mut self, snapshot: Snapshot) -> Option<SaveRequest> {
        self.observe_edit(snapshot.values());
        self.latest_settled = Some(snapshot);
        self.next_request()
    }

    /// Dirty check on the latest settled snapshot
    ///
    /// Starts a save when the snapshot differs from the persisted one, no
    /// save is in flight and no error is pending.
    pub fn next_request(&mut self) -> Option<SaveRequest> {
        if self.in_flight || self.last_error_occurred {
            return None;
        }
        let snapshot = self.latest_settled.clone()?;
        if snapshot == self.last_persisted {
            return None;
        }
        Some(self.begin(snapshot))
    }

    /// Re-send the failed snapshot
    ///
    /// Only valid in the error phase; returns `None` otherwise.
    pub fn retry(&mut self) -> Option<SaveRequest> {
        if self.in_flight || !self.last_error_occurred {
            return None;
        }
        let snapshot = self.attempted.clone()?;
        Some(self.begin(snapshot))
    }

    fn begin(&mut self, snapshot: Snapshot) -> SaveRequest {
        let request = SaveRequest::new(
            self.target_id.clone(),
            snapshot.values(),
            &self.last_persisted.photo,
        );
        self.in_flight = true;
        self.last_error_occurred = false;
        self.attempted = Some(snapshot);
        request
    }

    /// Apply a successful save
    ///
    /// The sent snapshot becomes the persisted state, not the store's echo.
    pub fn succeed(&mut self, saved: &SavedWill) {
        if let Some(sent) = self.attempted.take() {
            self.last_persisted = sent;
        }
        self.target_id = Some(saved.id.clone());
        self.in_flight = false;
        self.last_error_occurred = false;
    }

    /// Apply a failed save; the snapshot is kept for retry
    pub fn fail(&mut self) {
        self.in_flight = false;
        self.last_error_occurred = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attachment::{Attachment, LocalBlob};
    use crate::models::WillRecord;
    use chrono::Utc;

    fn will(title: &str) -> WillValues {
        WillValues {
            title: Some(title.to_string()),
            ..Default::default()
        }
    }

    fn saved(id: &str) -> SavedWill {
        SavedWill {
            id: id.to_string(),
            record: WillRecord::new(id, Utc::now()),
        }
    }

    #[test]
    fn test_unchanged_settle_does_nothing() {
        let mut state = SyncState::new(&will("A"));
        assert!(state.settle(Snapshot::capture(&will("A"))).is_none());
        assert_eq!(state.phase(), Phase::Idle);
    }

    #[test]
    fn test_changed_settle_starts_save() {
        let mut state = SyncState::new(&will("A"));
        let request = state.settle(Snapshot::capture(&will("AB"))).unwrap();
        assert_eq!(request.values.title.as_deref(), Some("AB"));
        assert!(request.id.is_none());
        assert_eq!(state.phase(), Phase::Saving);

        state.succeed(&saved("w1"));
        assert_eq!(state.phase(), Phase::Idle);
        assert_eq!(state.target_id(), Some("w1"));
        assert_eq!(state.last_persisted().title.as_deref(), Some("AB"));

        // Same snapshot again: suppressed by the dirty check
        assert!(state.settle(Snapshot::capture(&will("AB"))).is_none());
    }

    #[test]
    fn test_no_second_request_while_in_flight() {
        let mut state = SyncState::new(&will("A"));
        state.settle(Snapshot::capture(&will("B"))).unwrap();
        assert!(state.settle(Snapshot::capture(&will("C"))).is_none());
        assert!(state.settle(Snapshot::capture(&will("D"))).is_none());

        state.succeed(&saved("w1"));
        let follow_up = state.next_request().unwrap();
        assert_eq!(follow_up.values.title.as_deref(), Some("D"));
        assert_eq!(follow_up.id.as_deref(), Some("w1"));
    }

    #[test]
    fn test_failure_blocks_until_content_changes() {
        let mut state = SyncState::new(&will("A"));
        state.settle(Snapshot::capture(&will("B"))).unwrap();
        state.fail();
        assert_eq!(state.phase(), Phase::Error);
        assert!(state.has_unsaved_changes(&will("B")));

        // Same content settles again: no automatic retry
        assert!(state.settle(Snapshot::capture(&will("B"))).is_none());
        assert!(state.has_error());

        // Editing clears the error
        assert!(state.observe_edit(&will("BC")));
        assert_eq!(state.phase(), Phase::Idle);
        let request = state.settle(Snapshot::capture(&will("BC"))).unwrap();
        assert_eq!(request.values.title.as_deref(), Some("BC"));
    }

    #[test]
    fn test_retry_resends_failed_snapshot() {
        let mut state = SyncState::new(&will("A"));
        let first = state.settle(Snapshot::capture(&will("B"))).unwrap();
        state.fail();

        let retried = state.retry().unwrap();
        assert_eq!(retried, first);
        assert_eq!(state.phase(), Phase::Saving);

        // Not in the error phase: retry is refused
        assert!(state.retry().is_none());
        state.succeed(&saved("w1"));
        assert!(state.retry().is_none());
    }

    #[test]
    fn test_last_persisted_only_moves_on_success() {
        let mut state = SyncState::new(&will("A"));
        state.settle(Snapshot::capture(&will("B"))).unwrap();
        assert_eq!(state.last_persisted().title.as_deref(), Some("A"));
        state.fail();
        assert_eq!(state.last_persisted().title.as_deref(), Some("A"));
    }

    #[test]
    fn test_status_reflects_live_document() {
        let state = SyncState::new(&will("A"));
        let status = state.status(&will("A"));
        assert!(!status.has_unsaved_changes);
        assert!(!status.should_warn_before_exit());

        let status = state.status(&will("AB"));
        assert!(status.has_unsaved_changes);
        assert!(!status.is_saving);
        assert!(status.should_warn_before_exit());
    }

    #[test]
    fn test_photo_omitted_when_metadata_unchanged() {
        let mut initial = will("A");
        initial.photo = Attachment::Pending(LocalBlob::new("me.png", "image/png", 9, vec![1u8]));
        let mut state = SyncState::new(&initial);

        let mut edited = initial.clone();
        edited.title = Some("AB".to_string());
        edited.photo = Attachment::Pending(LocalBlob::new("me.png", "image/png", 9, vec![2u8]));

        let request = state.settle(Snapshot::capture(&edited)).unwrap();
        assert!(request.photo.is_none());
    }

    #[test]
    fn test_initial_id_is_target() {
        let mut initial = will("A");
        initial.id = Some("existing".to_string());
        let mut state = SyncState::new(&initial);

        let mut edited = initial.clone();
        edited.title = Some("B".to_string());
        let request = state.settle(Snapshot::capture(&edited)).unwrap();
        assert_eq!(request.id.as_deref(), Some("existing"));
    }
}
