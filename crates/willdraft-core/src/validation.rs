//! Input normalization and validation
//!
//! Text is trimmed and blank values are dropped before a will is stored.
//! Photos must be images no larger than [`MAX_PHOTO_SIZE`].

use thiserror::Error;

use crate::attachment::Attachment;
use crate::models::{parse_date, Education, WillValues, WorkExperience};

/// Largest accepted photo, in bytes (4 MiB)
pub const MAX_PHOTO_SIZE: u64 = 4 * 1024 * 1024;

/// Validation failures
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Must be an image file (got '{kind}')")]
    NotAnImage { kind: String },

    #[error("File size must be less than 4MB (got {size} bytes)")]
    PhotoTooLarge { size: u64 },

    #[error("Invalid date for {field}: '{value}' (expected YYYY-MM-DD)")]
    InvalidDate { field: String, value: String },
}

impl WillValues {
    /// Return a copy with all text trimmed and blank values removed
    pub fn normalized(&self) -> Self {
        Self {
            id: self.id.clone(),
            title: trimmed(&self.title),
            description: trimmed(&self.description),
            photo: self.photo.clone(),
            first_name: trimmed(&self.first_name),
            last_name: trimmed(&self.last_name),
            job_title: trimmed(&self.job_title),
            city: trimmed(&self.city),
            country: trimmed(&self.country),
            phone: trimmed(&self.phone),
            email: trimmed(&self.email),
            work_experiences: self
                .work_experiences
                .iter()
                .map(|exp| WorkExperience {
                    position: trimmed(&exp.position),
                    company: trimmed(&exp.company),
                    start_date: trimmed(&exp.start_date),
                    end_date: trimmed(&exp.end_date),
                    description: trimmed(&exp.description),
                })
                .collect(),
            educations: self
                .educations
                .iter()
                .map(|edu| Education {
                    degree: trimmed(&edu.degree),
                    school: trimmed(&edu.school),
                    start_date: trimmed(&edu.start_date),
                    end_date: trimmed(&edu.end_date),
                })
                .collect(),
            skills: self
                .skills
                .iter()
                .map(|s| s.trim())
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect(),
            summary: trimmed(&self.summary),
            color_hex: trimmed(&self.color_hex),
            border_style: trimmed(&self.border_style),
        }
    }
}

/// Validate a will (photo and entry dates)
pub fn validate(values: &WillValues) -> Result<(), ValidationError> {
    validate_photo(&values.photo)?;

    for (i, exp) in values.work_experiences.iter().enumerate() {
        check_date(&format!("work.{}.start_date", i), &exp.start_date)?;
        check_date(&format!("work.{}.end_date", i), &exp.end_date)?;
    }
    for (i, edu) in values.educations.iter().enumerate() {
        check_date(&format!("education.{}.start_date", i), &edu.start_date)?;
        check_date(&format!("education.{}.end_date", i), &edu.end_date)?;
    }

    Ok(())
}

/// Validate a photo attachment
///
/// Only pending uploads are checked; remote references were validated when
/// they were uploaded.
pub fn validate_photo(photo: &Attachment) -> Result<(), ValidationError> {
    let Some(blob) = photo.as_pending() else {
        return Ok(());
    };

    if !blob.kind.starts_with("image/") {
        return Err(ValidationError::NotAnImage {
            kind: blob.kind.clone(),
        });
    }
    if blob.size > MAX_PHOTO_SIZE {
        return Err(ValidationError::PhotoTooLarge { size: blob.size });
    }
    Ok(())
}

fn check_date(field: &str, value: &Option<String>) -> Result<(), ValidationError> {
    match value.as_deref().map(str::trim) {
        Some(v) if !v.is_empty() && parse_date(v).is_none() => Err(ValidationError::InvalidDate {
            field: field.to_string(),
            value: v.to_string(),
        }),
        _ => Ok(()),
    }
}

fn trimmed(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}
