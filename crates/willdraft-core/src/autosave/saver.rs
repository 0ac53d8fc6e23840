//! Autosave task
//!
//! One task per editing session. It owns the [`SyncState`] and reacts to
//! four inputs:
//!
//! - live document changes (re-arm the debouncer, refresh status)
//! - the debouncer settling (dirty check, maybe start a save)
//! - the in-flight save completing (apply result, re-check)
//! - commands from the editor (retry, status report, shutdown)
//!
//! All state changes happen inside the task loop, so the in-flight flag is
//! the only exclusion needed to keep saves strictly serialized.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::debounce::{Debouncer, DEFAULT_WINDOW};
use super::endpoint::{SaveError, SaveRequest, SavedWill, WillEndpoint};
use super::state::{SaveStatus, Snapshot, SyncState};
use crate::location::{Location, WILL_ID_PARAM};
use crate::models::WillValues;

type SaveFuture = Pin<Box<dyn Future<Output = Result<SavedWill, SaveError>> + Send>>;

/// Commands sent to the autosave task
///
/// Edits made before a command was sent are applied before the command.
#[derive(Debug)]
pub enum AutoSaveCommand {
    /// Re-send the snapshot whose save failed
    Retry,
    /// Reply with the current status
    Report(oneshot::Sender<SaveStatus>),
    /// Finish any in-flight save, then stop
    Shutdown,
}

/// Notifications for the user
#[derive(Debug, Clone, PartialEq)]
pub enum SaveNotice {
    /// A save completed
    Saved { id: String },
    /// A save failed; the editor should offer a retry
    Failed { error: SaveError },
}

/// Autosave settings
#[derive(Debug, Clone)]
pub struct AutoSaveConfig {
    /// Quiescence window before a settled document is saved
    pub delay: Duration,
}

impl Default for AutoSaveConfig {
    fn default() -> Self {
        Self {
            delay: DEFAULT_WINDOW,
        }
    }
}

/// Handle to the autosave task
///
/// Edits go in through [`AutoSaveHandle::update`] or
/// [`AutoSaveHandle::publish`]; status and notices come out.
pub struct AutoSaveHandle {
    document_tx: watch::Sender<WillValues>,
    command_tx: mpsc::Sender<AutoSaveCommand>,
    status_rx: watch::Receiver<SaveStatus>,
    notice_rx: mpsc::Receiver<SaveNotice>,
    task: JoinHandle<()>,
}

impl AutoSaveHandle {
    /// Edit the live document in place
    pub fn update(&self, edit: impl FnOnce(&mut WillValues)) {
        self.document_tx.send_modify(edit);
    }

    /// Replace the live document
    pub fn publish(&self, values: WillValues) {
        self.document_tx.send_replace(values);
    }

    /// Copy of the live document
    pub fn document(&self) -> WillValues {
        self.document_tx.borrow().clone()
    }

    /// Current status
    pub fn status(&self) -> SaveStatus {
        self.status_rx.borrow().clone()
    }

    /// Subscribe to status changes
    pub fn subscribe_status(&self) -> watch::Receiver<SaveStatus> {
        self.status_rx.clone()
    }

    /// Receive the next notice
    pub async fn next_notice(&mut self) -> Option<SaveNotice> {
        self.notice_rx.recv().await
    }

    /// Take a notice if one is queued
    pub fn try_notice(&mut self) -> Option<SaveNotice> {
        self.notice_rx.try_recv().ok()
    }

    /// Retry the failed save
    ///
    /// Ignored unless the last save failed.
    pub async fn retry(&self) {
        let _ = self.command_tx.send(AutoSaveCommand::Retry).await;
    }

    /// Status after the task has seen every edit made so far
    ///
    /// Unlike [`AutoSaveHandle::status`], this cannot lag behind an edit
    /// that was just made.
    pub async fn refresh_status(&self) -> SaveStatus {
        let (reply_tx, reply_rx) = oneshot::channel();
        if self
            .command_tx
            .send(AutoSaveCommand::Report(reply_tx))
            .await
            .is_err()
        {
            return self.status();
        }
        reply_rx.await.unwrap_or_else(|_| self.status())
    }

    /// Stop the task, waiting for an in-flight save to finish
    pub async fn shutdown(self) -> SaveStatus {
        let _ = self.command_tx.send(AutoSaveCommand::Shutdown).await;
        let _ = self.task.await;
        let status = self.status_rx.borrow().clone();
        status
    }
}

/// Spawn the autosave task for one editing session
///
/// `initial` is both the first live document and the persisted baseline.
pub fn spawn_autosave(
    initial: WillValues,
    endpoint: Arc<dyn WillEndpoint>,
    location: Arc<dyn Location>,
    config: AutoSaveConfig,
) -> AutoSaveHandle {
    let state = SyncState::new(&initial);
    let (document_tx, document_rx) = watch::channel(initial.clone());
    let (command_tx, command_rx) = mpsc::channel(16);
    let (notice_tx, notice_rx) = mpsc::channel(64);
    let (status_tx, status_rx) = watch::channel(state.status(&initial));

    let saver = Saver {
        state,
        live: document_rx,
        debouncer: Debouncer::new(config.delay),
        in_flight: None,
        endpoint,
        location,
        status_tx,
        notice_tx,
    };
    let task = tokio::spawn(saver.run(command_rx));

    AutoSaveHandle {
        document_tx,
        command_tx,
        status_rx,
        notice_rx,
        task,
    }
}

struct Saver {
    state: SyncState,
    live: watch::Receiver<WillValues>,
    debouncer: Debouncer,
    in_flight: Option<SaveFuture>,
    endpoint: Arc<dyn WillEndpoint>,
    location: Arc<dyn Location>,
    status_tx: watch::Sender<SaveStatus>,
    notice_tx: mpsc::Sender<SaveNotice>,
}

impl Saver {
    async fn run(mut self, mut command_rx: mpsc::Receiver<AutoSaveCommand>) {
        let mut live_open = true;

        loop {
            tokio::select! {
                changed = self.live.changed(), if live_open => {
                    if changed.is_err() {
                        live_open = false;
                        continue;
                    }
                    self.on_edit();
                }
                _ = self.debouncer.settled(), if self.debouncer.is_armed() => {
                    let snapshot = Snapshot::capture(&self.live.borrow());
                    debug!("Document settled");
                    if let Some(request) = self.state.settle(snapshot) {
                        self.start(request);
                    }
                    self.publish_status();
                }
                result = poll_in_flight(&mut self.in_flight), if self.in_flight.is_some() => {
                    self.in_flight = None;
                    self.finish(result);
                    if let Some(request) = self.state.next_request() {
                        self.start(request);
                    }
                    self.publish_status();
                }
                cmd = command_rx.recv() => {
                    if self.live.has_changed().unwrap_or(false) {
                        self.on_edit();
                    }
                    match cmd {
                        Some(AutoSaveCommand::Retry) => self.retry(),
                        Some(AutoSaveCommand::Report(reply)) => {
                            let _ = reply.send(self.state.status(&self.live.borrow()));
                        }
                        Some(AutoSaveCommand::Shutdown) | None => break,
                    }
                }
            }
        }

        // In-flight saves are never cancelled
        if let Some(save) = self.in_flight.take() {
            let result = save.await;
            self.finish(result);
            self.publish_status();
        }
        debug!("Autosave task stopped");
    }

    fn on_edit(&mut self) {
        self.debouncer.touch();
        let live = self.live.borrow_and_update().clone();
        if self.state.observe_edit(&live) {
            debug!("Content changed after a failed save, error cleared");
        }
        self.publish_status();
    }

    fn start(&mut self, request: SaveRequest) {
        debug!(
            id = ?request.id,
            with_photo = request.photo.is_some(),
            "Saving will"
        );
        let endpoint = Arc::clone(&self.endpoint);
        self.in_flight = Some(Box::pin(async move { endpoint.save_will(request).await }));
    }

    fn retry(&mut self) {
        match self.state.retry() {
            Some(request) => {
                info!("Retrying failed save");
                self.start(request);
                self.publish_status();
            }
            None => debug!("Retry ignored, no failed save pending"),
        }
    }

    fn finish(&mut self, result: Result<SavedWill, SaveError>) {
        match result {
            Ok(saved) => {
                info!(id = %saved.id, "Will saved");
                self.state.succeed(&saved);
                if self.location.query_param(WILL_ID_PARAM).as_deref() != Some(saved.id.as_str()) {
                    self.location.replace_query(WILL_ID_PARAM, &saved.id);
                }
                self.notify(SaveNotice::Saved { id: saved.id });
            }
            Err(error) => {
                warn!("Could not save changes: {}", error);
                self.state.fail();
                self.notify(SaveNotice::Failed { error });
            }
        }
    }

    /// Queue a notice without waiting for the editor to read it
    fn notify(&self, notice: SaveNotice) {
        match self.notice_tx.try_send(notice) {
            Ok(()) | Err(TrySendError::Closed(_)) => {}
            Err(TrySendError::Full(notice)) => {
                warn!(?notice, "Notice queue full, dropping notice");
            }
        }
    }

    fn publish_status(&self) {
        let status = self.state.status(&self.live.borrow());
        self.status_tx.send_if_modified(|current| {
            if *current == status {
                false
            } else {
                *current = status;
                true
            }
        });
    }
}

async fn poll_in_flight(save: &mut Option<SaveFuture>) -> Result<SavedWill, SaveError> {
    match save.as_mut() {
        Some(save) => save.await,
        None => std::future::pending().await,
    }
}
