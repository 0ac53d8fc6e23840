//! Edit session input parsing
//!
//! One line of input is either a field assignment or a `:command`.
//!
//! ```text
//! title=My will          set a field (empty value clears it)
//! work.0.company=Acme    set an entry field (index == len appends)
//! skill+=Rust            append a skill
//! photo=./me.png         attach a photo
//! photo=none             remove the photo
//! :remove work 0         remove an entry
//! :next / :prev          move through the wizard
//! :step skills           jump to a step
//! :retry                 retry a failed save
//! :status / :show        print save status / the will
//! :quit / :quit!         leave (the second form discards unsaved changes)
//! ```

use std::path::PathBuf;

use anyhow::{bail, Context, Result};

/// A parsed input line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    /// Blank line
    Empty,
    Set { field: String, value: Option<String> },
    AddSkill(String),
    Photo(PathBuf),
    ClearPhoto,
    Remove { list: String, index: usize },
    Next,
    Prev,
    Step(String),
    Retry,
    Status,
    Show,
    Help,
    Quit { force: bool },
}

/// Parse one line of session input
pub fn parse_input(line: &str) -> Result<Input> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(Input::Empty);
    }

    if let Some(command) = line.strip_prefix(':') {
        return parse_command(command);
    }

    if let Some(skill) = line.strip_prefix("skill+=") {
        let skill = skill.trim();
        if skill.is_empty() {
            bail!("Skill cannot be empty");
        }
        return Ok(Input::AddSkill(skill.to_string()));
    }

    let Some((field, value)) = line.split_once('=') else {
        bail!("Expected field=value or a :command (type :help)");
    };
    let field = field.trim();
    let value = value.trim();
    if field.is_empty() {
        bail!("Missing field name before '='");
    }

    if field == "photo" {
        return Ok(match value {
            "" | "none" => Input::ClearPhoto,
            path => Input::Photo(PathBuf::from(path)),
        });
    }

    Ok(Input::Set {
        field: field.to_string(),
        value: (!value.is_empty()).then(|| value.to_string()),
    })
}

fn parse_command(command: &str) -> Result<Input> {
    let mut words = command.split_whitespace();
    let name = words.next().unwrap_or_default();

    let input = match name {
        "next" | "n" => Input::Next,
        "prev" | "p" => Input::Prev,
        "step" => {
            let key = words.next().context("Usage: :step KEY")?;
            Input::Step(key.to_string())
        }
        "remove" | "rm" => {
            let list = words.next().context("Usage: :remove work|education INDEX")?;
            let index = words
                .next()
                .context("Usage: :remove work|education INDEX")?
                .parse()
                .context("Entry index must be a number")?;
            Input::Remove {
                list: list.to_string(),
                index,
            }
        }
        "retry" => Input::Retry,
        "status" => Input::Status,
        "show" => Input::Show,
        "help" | "h" | "?" => Input::Help,
        "quit" | "q" => Input::Quit { force: false },
        "quit!" | "q!" => Input::Quit { force: true },
        other => bail!("Unknown command: :{} (type :help)", other),
    };

    if words.next().is_some() {
        bail!("Too many arguments for :{}", name);
    }
    Ok(input)
}

/// Help text for the session
pub const HELP: &str = "\
Commands:
  FIELD=VALUE             set a field (empty value clears it)
  work.N.FIELD=VALUE      set a work experience field (N = count appends)
  education.N.FIELD=VALUE set an education field
  skill+=VALUE            add a skill (skills=a,b,c replaces all)
  photo=PATH | photo=none attach or remove the photo
  :remove work|education N
  :next  :prev  :step KEY
  :retry                  retry the last failed save
  :status  :show
  :quit                   leave (refused while changes are unsaved)
  :quit!                  leave and discard unsaved changes";
