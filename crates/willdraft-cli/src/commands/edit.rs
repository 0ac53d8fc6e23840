//! Edit session
//!
//! Reads edits line by line and hands them to the autosave task. Nothing is
//! saved explicitly: the will is saved once input pauses for the configured
//! delay. Save results are printed as they arrive.

use std::sync::Arc;

use anyhow::{bail, Context, Result};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;

use willdraft_core::autosave::{spawn_autosave, AutoSaveConfig, AutoSaveHandle, SaveNotice};
use willdraft_core::permissions::can_create_will;
use willdraft_core::steps::{current_step, set_step};
use willdraft_core::validation::validate_photo;
use willdraft_core::{
    Attachment, Config, EditorStep, LocalBlob, LocalWillStore, Location, QueryLocation,
    SaveError, WillValues, WILL_ID_PARAM,
};

use super::will::resolve_will_id;
use crate::output::{short_id, Output};
use crate::session::{parse_input, Input, HELP};

/// What the session loop should do after an input
#[derive(Debug, PartialEq, Eq)]
enum Flow {
    Continue,
    Quit,
}

/// Run an interactive edit session
///
/// Without an id a new will is started; it gets an id on its first save.
pub async fn run(
    store: &LocalWillStore,
    config: &Config,
    id: Option<String>,
    output: &Output,
) -> Result<()> {
    let initial = match id {
        Some(id) => {
            let id = resolve_will_id(store, &id)?;
            store.load_values(&id).context("Failed to load will")?
        }
        None => {
            if !can_create_will(store.level(), store.count()?) {
                bail!("{}", SaveError::LimitReached);
            }
            WillValues::new()
        }
    };

    let location = Arc::new(match &initial.id {
        Some(id) => QueryLocation::from_query(&format!("?{}={}", WILL_ID_PARAM, id)),
        None => QueryLocation::new(),
    });

    match &initial.id {
        Some(id) => output.message(&format!("Editing will {}", short_id(id))),
        None => output.message("Editing a new will"),
    }
    output.message("Changes are saved automatically. Type :help for commands.");
    output.print_step(current_step(&*location));

    let mut handle = spawn_autosave(
        initial,
        Arc::new(store.clone()),
        Arc::clone(&location) as Arc<dyn Location>,
        AutoSaveConfig {
            delay: config.autosave_delay(),
        },
    );

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut input_open = true;

    while input_open {
        tokio::select! {
            line = lines.next_line() => {
                match line.context("Failed to read input")? {
                    Some(line) => {
                        let flow = match parse_input(&line) {
                            Ok(input) => apply(input, &handle, &*location, output).await,
                            Err(e) => {
                                output.warn(&e.to_string());
                                Flow::Continue
                            }
                        };
                        if flow == Flow::Quit {
                            break;
                        }
                    }
                    None => {
                        // End of input (piped edits): let pending edits save first
                        wait_until_settled(&mut handle, output).await;
                        input_open = false;
                    }
                }
            }
            notice = handle.next_notice() => {
                match notice {
                    Some(notice) => report(&notice, output),
                    None => break,
                }
            }
        }
    }

    let status = handle.shutdown().await;
    if status.has_unsaved_changes {
        output.warn("Unsaved changes were discarded");
    }
    if let Some(id) = status.will_id {
        info!(id = %id, "Edit session closed");
        output.success(&format!("Will {}", id));
    }

    Ok(())
}

/// Apply one parsed input to the session
async fn apply(
    input: Input,
    handle: &AutoSaveHandle,
    location: &dyn Location,
    output: &Output,
) -> Flow {
    match input {
        Input::Empty => {}
        Input::Set { field, value } => {
            let mut doc = handle.document();
            match doc.set_field(&field, value) {
                Ok(()) => handle.publish(doc),
                Err(e) => output.warn(&e.to_string()),
            }
        }
        Input::AddSkill(skill) => handle.update(|doc| doc.skills.push(skill)),
        Input::Photo(path) => match LocalBlob::from_path(&path) {
            Ok(blob) => {
                let photo = Attachment::Pending(blob);
                match validate_photo(&photo) {
                    Ok(()) => handle.update(|doc| doc.photo = photo),
                    Err(e) => output.warn(&e.to_string()),
                }
            }
            Err(e) => output.warn(&format!("Cannot read {}: {}", path.display(), e)),
        },
        Input::ClearPhoto => handle.update(|doc| doc.photo = Attachment::None),
        Input::Remove { list, index } => {
            let mut doc = handle.document();
            match doc.remove_entry(&list, index) {
                Ok(()) => handle.publish(doc),
                Err(e) => output.warn(&e.to_string()),
            }
        }
        Input::Next => match current_step(location).next() {
            Some(step) => go_to(location, step, output),
            None => output.message("Already on the last step."),
        },
        Input::Prev => match current_step(location).previous() {
            Some(step) => go_to(location, step, output),
            None => output.message("Already on the first step."),
        },
        Input::Step(key) => match EditorStep::from_key(&key) {
            Some(step) => go_to(location, step, output),
            None => output.warn(&format!(
                "Unknown step: {} (expected one of: {})",
                key,
                EditorStep::ALL
                    .iter()
                    .map(|s| s.key())
                    .collect::<Vec<_>>()
                    .join(", ")
            )),
        },
        Input::Retry => {
            if handle.refresh_status().await.has_error {
                handle.retry().await;
            } else {
                output.message("Nothing to retry.");
            }
        }
        Input::Status => output.print_status(&handle.refresh_status().await),
        Input::Show => output.print_values(&handle.document()),
        Input::Help => output.message(HELP),
        Input::Quit { force } => {
            if !force && handle.refresh_status().await.should_warn_before_exit() {
                output.warn(
                    "You have unsaved changes. Wait for them to save, or use :quit! to discard them.",
                );
            } else {
                return Flow::Quit;
            }
        }
    }
    Flow::Continue
}

fn go_to(location: &dyn Location, step: EditorStep, output: &Output) {
    set_step(location, step);
    output.print_step(step);
}

fn report(notice: &SaveNotice, output: &Output) {
    match notice {
        SaveNotice::Saved { id } => output.message(&format!("Saved ({})", short_id(id))),
        SaveNotice::Failed { error } => output.warn(&failure_message(error)),
    }
}

fn failure_message(error: &SaveError) -> String {
    if error.is_retryable() {
        format!("Could not save changes: {}. Type :retry to try again.", error)
    } else {
        format!("Could not save changes: {}", error)
    }
}

/// Wait until every edit is saved or a save has failed
async fn wait_until_settled(handle: &mut AutoSaveHandle, output: &Output) {
    let mut status = handle.subscribe_status();
    handle.refresh_status().await;
    loop {
        while let Some(notice) = handle.try_notice() {
            report(&notice, output);
        }
        {
            let current = status.borrow_and_update();
            let failed = current.has_error && !current.is_saving;
            if !current.has_unsaved_changes || failed {
                break;
            }
        }
        if status.changed().await.is_err() {
            break;
        }
    }
    while let Some(notice) = handle.try_notice() {
        report(&notice, output);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::OutputFormat;
    use std::time::Duration;
    use tempfile::TempDir;
    use willdraft_core::SubscriptionLevel;

    fn session(temp_dir: &TempDir) -> (LocalWillStore, AutoSaveHandle, Arc<QueryLocation>) {
        let store = LocalWillStore::with_root(temp_dir.path(), SubscriptionLevel::Free);
        let location = Arc::new(QueryLocation::new());
        let handle = spawn_autosave(
            WillValues::new(),
            Arc::new(store.clone()),
            Arc::clone(&location) as Arc<dyn Location>,
            AutoSaveConfig {
                delay: Duration::from_millis(10),
            },
        );
        (store, handle, location)
    }

    async fn feed(lines: &[&str], handle: &AutoSaveHandle, location: &dyn Location) -> Flow {
        let output = Output::new(OutputFormat::Quiet);
        let mut flow = Flow::Continue;
        for line in lines {
            flow = apply(parse_input(line).unwrap(), handle, location, &output).await;
        }
        flow
    }

    #[tokio::test]
    async fn test_edits_reach_the_store() {
        let temp_dir = TempDir::new().unwrap();
        let (store, mut handle, location) = session(&temp_dir);

        feed(
            &["title=My will", "skill+=Rust", "work.0.company=Acme"],
            &handle,
            &*location,
        )
        .await;

        let output = Output::new(OutputFormat::Quiet);
        tokio::time::timeout(
            Duration::from_secs(5),
            wait_until_settled(&mut handle, &output),
        )
        .await
        .unwrap();

        let id = location.query_param(WILL_ID_PARAM).unwrap();
        let record = store.get(&id).unwrap().unwrap();
        assert_eq!(record.title.as_deref(), Some("My will"));
        assert_eq!(record.skills, vec!["Rust".to_string()]);
        assert_eq!(record.work_experiences[0].company.as_deref(), Some("Acme"));

        handle.shutdown().await;
    }

    #[tokio::test]
    async fn test_quit_refused_with_unsaved_changes() {
        let temp_dir = TempDir::new().unwrap();
        let store = LocalWillStore::with_root(temp_dir.path(), SubscriptionLevel::Free);
        let location = Arc::new(QueryLocation::new());
        let handle = spawn_autosave(
            WillValues::new(),
            Arc::new(store),
            Arc::clone(&location) as Arc<dyn Location>,
            AutoSaveConfig {
                delay: Duration::from_secs(60),
            },
        );

        let flow = feed(&["title=Draft"], &handle, &*location).await;
        assert_eq!(flow, Flow::Continue);

        assert_eq!(feed(&[":quit"], &handle, &*location).await, Flow::Continue);
        assert_eq!(feed(&[":quit!"], &handle, &*location).await, Flow::Quit);

        let status = handle.shutdown().await;
        assert!(status.has_unsaved_changes);
    }

    #[tokio::test]
    async fn test_step_navigation_pushes_history() {
        let temp_dir = TempDir::new().unwrap();
        let (_store, handle, location) = session(&temp_dir);

        feed(&[":next", ":next", ":prev"], &handle, &*location).await;
        assert_eq!(current_step(&*location), EditorStep::PersonalInfo);
        assert_eq!(location.history_len(), 4);

        feed(&[":step summary"], &handle, &*location).await;
        assert_eq!(current_step(&*location), EditorStep::Summary);

        handle.shutdown().await;
    }

    #[test]
    fn test_failure_message_offers_retry_only_when_useful() {
        let transient = failure_message(&SaveError::Transport("timeout".to_string()));
        assert!(transient.contains(":retry"));

        let limit = failure_message(&SaveError::LimitReached);
        assert!(!limit.contains(":retry"));
        assert!(limit.contains("limit of wills"));

        let upgrade = failure_message(&SaveError::CustomizationRequiresUpgrade);
        assert!(!upgrade.contains(":retry"));
    }

    #[tokio::test]
    async fn test_invalid_field_leaves_document_untouched() {
        let temp_dir = TempDir::new().unwrap();
        let (_store, handle, location) = session(&temp_dir);

        feed(&["nickname=Bob", "work.3.company=Acme"], &handle, &*location).await;
        assert_eq!(handle.document(), WillValues::new());

        handle.shutdown().await;
    }
}
