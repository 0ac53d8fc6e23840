//! Will command handlers (list, show, delete)

use anyhow::{bail, Context, Result};

use willdraft_core::LocalWillStore;

use crate::output::{short_id, Output};
use crate::prompt::confirm;

/// List all wills, newest first
pub fn list(store: &LocalWillStore, output: &Output) -> Result<()> {
    let wills = store.list().context("Failed to list wills")?;
    output.print_wills(&wills);
    Ok(())
}

/// Show a single will
pub fn show(store: &LocalWillStore, id: String, output: &Output) -> Result<()> {
    let id = resolve_will_id(store, &id)?;

    let will = store
        .get(&id)?
        .ok_or_else(|| anyhow::anyhow!("Will not found: {}", id))?;

    output.print_will(&will);
    Ok(())
}

/// Delete a will
pub fn delete(store: &LocalWillStore, id: String, output: &Output) -> Result<()> {
    let id = resolve_will_id(store, &id)?;

    let will = store
        .get(&id)?
        .ok_or_else(|| anyhow::anyhow!("Will not found: {}", id))?;

    if output.should_prompt() {
        println!("Delete will: {} - {}", short_id(&will.id), will.display_title());
        if !confirm("Are you sure?")? {
            println!("Cancelled.");
            return Ok(());
        }
    }

    store.delete(&id).context("Failed to delete will")?;

    output.success(&format!("Deleted will: {}", id));

    Ok(())
}

/// Resolve a full id or a unique id prefix
pub fn resolve_will_id(store: &LocalWillStore, id: &str) -> Result<String> {
    if store.get(id)?.is_some() {
        return Ok(id.to_string());
    }

    let wills = store.list()?;
    let matches: Vec<_> = wills.iter().filter(|w| w.id.starts_with(id)).collect();

    match matches.len() {
        0 => bail!("No will found matching: {}", id),
        1 => Ok(matches[0].id.clone()),
        _ => {
            eprintln!("Multiple wills match '{}':", id);
            for will in &matches {
                eprintln!("  {} - {}", will.id, will.display_title());
            }
            bail!("Ambiguous ID. Please provide more characters.");
        }
    }
}
