//! Output formatting for CLI
//!
//! Provides consistent output formatting across all commands:
//! - Human-readable default output
//! - JSON output (--json flag)
//! - Quiet mode for scripting (--quiet flag)

use serde::Serialize;

use willdraft_core::{EditorStep, SaveStatus, WillRecord, WillValues};

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable output (default)
    Human,
    /// JSON output
    Json,
    /// Quiet mode - minimal output
    Quiet,
}

impl OutputFormat {
    /// Create format from CLI flags
    pub fn from_flags(json: bool, quiet: bool) -> Self {
        if quiet {
            OutputFormat::Quiet
        } else if json {
            OutputFormat::Json
        } else {
            OutputFormat::Human
        }
    }
}

/// Output helper for consistent formatting
pub struct Output {
    /// The output format
    pub format: OutputFormat,
}

impl Output {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Check if output is in quiet mode
    pub fn is_quiet(&self) -> bool {
        matches!(self.format, OutputFormat::Quiet)
    }

    /// Print a stored will
    pub fn print_will(&self, will: &WillRecord) {
        match self.format {
            OutputFormat::Human => {
                println!("ID:          {}", will.id);
                println!("Title:       {}", will.display_title());
                if let Some(ref desc) = will.description {
                    println!("Description: {}", desc);
                }
                let name: Vec<&str> = [will.first_name.as_deref(), will.last_name.as_deref()]
                    .into_iter()
                    .flatten()
                    .collect();
                if !name.is_empty() {
                    println!("Name:        {}", name.join(" "));
                }
                if let Some(ref job) = will.job_title {
                    println!("Job title:   {}", job);
                }
                if let Some(ref photo) = will.photo_url {
                    println!("Photo:       {}", photo);
                }
                if !will.skills.is_empty() {
                    println!("Skills:      {}", will.skills.join(", "));
                }
                println!("Created:     {}", will.created_at.format("%Y-%m-%d %H:%M"));
                println!("Updated:     {}", will.updated_at.format("%Y-%m-%d %H:%M"));

                if !will.work_experiences.is_empty() {
                    println!();
                    println!("── Work experience ({}) ──", will.work_experiences.len());
                    for exp in &will.work_experiences {
                        println!(
                            "{} at {} ({} - {})",
                            exp.position.as_deref().unwrap_or("?"),
                            exp.company.as_deref().unwrap_or("?"),
                            exp.start_date.map(|d| d.to_string()).unwrap_or_default(),
                            exp.end_date
                                .map(|d| d.to_string())
                                .unwrap_or_else(|| "present".to_string())
                        );
                    }
                }
                if !will.educations.is_empty() {
                    println!();
                    println!("── Education ({}) ──", will.educations.len());
                    for edu in &will.educations {
                        println!(
                            "{}, {}",
                            edu.degree.as_deref().unwrap_or("?"),
                            edu.school.as_deref().unwrap_or("?")
                        );
                    }
                }
                if let Some(ref summary) = will.summary {
                    println!();
                    println!("── Summary ──");
                    println!("{}", summary);
                }
            }
            OutputFormat::Json => print_json(will),
            OutputFormat::Quiet => {
                println!("{}", will.id);
            }
        }
    }

    /// Print a list of wills
    pub fn print_wills(&self, wills: &[WillRecord]) {
        match self.format {
            OutputFormat::Human => {
                if wills.is_empty() {
                    println!("No wills found.");
                    return;
                }
                for will in wills {
                    println!(
                        "{} | {} | {}",
                        short_id(&will.id),
                        truncate(will.display_title(), 40),
                        will.updated_at.format("%Y-%m-%d %H:%M")
                    );
                }
                println!("\n{} will(s)", wills.len());
            }
            OutputFormat::Json => print_json(&wills),
            OutputFormat::Quiet => {
                for will in wills {
                    println!("{}", will.id);
                }
            }
        }
    }

    /// Print the will being edited
    pub fn print_values(&self, values: &WillValues) {
        match self.format {
            OutputFormat::Human => {
                for (name, value) in [
                    ("title", &values.title),
                    ("description", &values.description),
                    ("first_name", &values.first_name),
                    ("last_name", &values.last_name),
                    ("job_title", &values.job_title),
                    ("city", &values.city),
                    ("country", &values.country),
                    ("phone", &values.phone),
                    ("email", &values.email),
                    ("summary", &values.summary),
                    ("color_hex", &values.color_hex),
                    ("border_style", &values.border_style),
                ] {
                    if let Some(value) = value {
                        println!("{:<13}{}", format!("{}:", name), truncate_line(value, 60));
                    }
                }
                if let Some(blob) = values.photo.as_pending() {
                    println!("photo:       {} (not uploaded yet)", blob.name);
                } else if let Some(url) = values.photo.as_remote() {
                    println!("photo:       {}", url);
                }
                for (i, exp) in values.work_experiences.iter().enumerate() {
                    println!(
                        "work.{}:      {} at {}",
                        i,
                        exp.position.as_deref().unwrap_or("?"),
                        exp.company.as_deref().unwrap_or("?")
                    );
                }
                for (i, edu) in values.educations.iter().enumerate() {
                    println!(
                        "education.{}: {}, {}",
                        i,
                        edu.degree.as_deref().unwrap_or("?"),
                        edu.school.as_deref().unwrap_or("?")
                    );
                }
                if !values.skills.is_empty() {
                    println!("skills:      {}", values.skills.join(", "));
                }
            }
            OutputFormat::Json => print_json(values),
            OutputFormat::Quiet => {}
        }
    }

    /// Print autosave status
    pub fn print_status(&self, status: &SaveStatus) {
        match self.format {
            OutputFormat::Human => {
                let state = if status.is_saving {
                    "saving..."
                } else if status.has_error {
                    "save failed (type :retry)"
                } else if status.has_unsaved_changes {
                    "unsaved changes"
                } else {
                    "all changes saved"
                };
                match status.will_id {
                    Some(ref id) => println!("[{}] {}", short_id(id), state),
                    None => println!("[new] {}", state),
                }
            }
            OutputFormat::Json => print_json(status),
            OutputFormat::Quiet => {}
        }
    }

    /// Print the current wizard step and its fields
    pub fn print_step(&self, step: EditorStep) {
        if self.format != OutputFormat::Human {
            return;
        }
        let position = EditorStep::ALL
            .iter()
            .position(|s| *s == step)
            .map(|i| i + 1)
            .unwrap_or(1);
        println!(
            "── Step {}/{}: {} ──",
            position,
            EditorStep::ALL.len(),
            step.title()
        );
        println!("Fields: {}", step.fields().join(", "));
    }

    /// Print a success message
    pub fn success(&self, message: &str) {
        match self.format {
            OutputFormat::Human => println!("✓ {}", message),
            OutputFormat::Json => {
                println!(
                    "{}",
                    serde_json::json!({"status": "success", "message": message})
                );
            }
            OutputFormat::Quiet => {}
        }
    }

    /// Print a warning to stderr (shown in every mode)
    pub fn warn(&self, message: &str) {
        match self.format {
            OutputFormat::Json => {
                eprintln!(
                    "{}",
                    serde_json::json!({"status": "warning", "message": message})
                );
            }
            _ => eprintln!("! {}", message),
        }
    }

    /// Check if we should prompt for confirmation
    pub fn should_prompt(&self) -> bool {
        self.format == OutputFormat::Human
    }

    /// Print an informational message
    pub fn message(&self, msg: &str) {
        match self.format {
            OutputFormat::Human => println!("{}", msg),
            OutputFormat::Json => {
                println!("{}", serde_json::json!({"message": msg}));
            }
            OutputFormat::Quiet => {}
        }
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("Failed to serialize output: {}", e),
    }
}

/// First 8 characters of an id
pub fn short_id(id: &str) -> &str {
    id.char_indices().nth(8).map(|(i, _)| &id[..i]).unwrap_or(id)
}

/// Truncate a string to max length, adding "..." if truncated
fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

/// Truncate to first line and max length
fn truncate_line(s: &str, max_len: usize) -> String {
    let first_line = s.lines().next().unwrap_or("");
    truncate(first_line, max_len)
}
