//! Data models for willdraft
//!
//! `WillValues` is the editable form of a will: every field optional, lists
//! kept in order. `WillRecord` is the canonical form held by the store.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::attachment::Attachment;

/// Date format used for entry start/end dates in `WillValues`
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Errors from addressing a field by name
#[derive(Error, Debug, PartialEq, Eq)]
pub enum FieldError {
    #[error("Unknown field: {0}")]
    UnknownField(String),

    #[error("Entry index {index} out of range for {list} (have {len})")]
    IndexOutOfRange {
        list: &'static str,
        index: usize,
        len: usize,
    },
}

/// A work experience entry
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkExperience {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// An education entry
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Education {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub degree: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub school: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<String>,
}

/// The will being edited
///
/// Equality is structural; a pending photo compares by metadata only
/// (see [`crate::attachment::LocalBlob`]).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WillValues {
    /// Store id; absent until the will is first saved
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub photo: Attachment,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default)]
    pub work_experiences: Vec<WorkExperience>,
    #[serde(default)]
    pub educations: Vec<Education>,
    #[serde(default)]
    pub skills: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color_hex: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub border_style: Option<String>,
}

/// Top-level text fields addressable by name
pub const TEXT_FIELDS: &[&str] = &[
    "title",
    "description",
    "first_name",
    "last_name",
    "job_title",
    "city",
    "country",
    "phone",
    "email",
    "summary",
    "color_hex",
    "border_style",
];

impl WillValues {
    /// Create an empty will
    pub fn new() -> Self {
        Self::default()
    }

    /// Map a stored record to editable values
    ///
    /// Empty strings become `None`, dates are rendered as `YYYY-MM-DD`.
    pub fn from_record(record: &WillRecord) -> Self {
        Self {
            id: Some(record.id.clone()),
            title: non_empty(&record.title),
            description: non_empty(&record.description),
            photo: record
                .photo_url
                .as_ref()
                .filter(|url| !url.is_empty())
                .map(|url| Attachment::Remote(url.clone()))
                .unwrap_or_default(),
            first_name: non_empty(&record.first_name),
            last_name: non_empty(&record.last_name),
            job_title: non_empty(&record.job_title),
            city: non_empty(&record.city),
            country: non_empty(&record.country),
            phone: non_empty(&record.phone),
            email: non_empty(&record.email),
            work_experiences: record
                .work_experiences
                .iter()
                .map(|exp| WorkExperience {
                    position: non_empty(&exp.position),
                    company: non_empty(&exp.company),
                    start_date: exp.start_date.map(format_date),
                    end_date: exp.end_date.map(format_date),
                    description: non_empty(&exp.description),
                })
                .collect(),
            educations: record
                .educations
                .iter()
                .map(|edu| Education {
                    degree: non_empty(&edu.degree),
                    school: non_empty(&edu.school),
                    start_date: edu.start_date.map(format_date),
                    end_date: edu.end_date.map(format_date),
                })
                .collect(),
            skills: record.skills.clone(),
            summary: non_empty(&record.summary),
            color_hex: non_empty(&record.color_hex),
            border_style: non_empty(&record.border_style),
        }
    }

    /// Set a field by name
    ///
    /// Accepts the names in [`TEXT_FIELDS`], `skills` (comma separated) and
    /// entry paths like `work.0.company` or `education.1.school`. An entry
    /// index equal to the list length appends a new entry.
    pub fn set_field(&mut self, name: &str, value: Option<String>) -> Result<(), FieldError> {
        let mut parts = name.splitn(3, '.');
        let head = parts.next().unwrap_or_default();

        match (head, parts.next(), parts.next()) {
            ("skills", None, None) => {
                self.skills = value
                    .map(|v| v.split(',').map(|s| s.trim().to_string()).collect())
                    .unwrap_or_default();
                Ok(())
            }
            ("work", Some(index), Some(field)) => {
                let index = parse_index(name, index)?;
                let entry = entry_mut(&mut self.work_experiences, "work", index)?;
                let slot = match field {
                    "position" => &mut entry.position,
                    "company" => &mut entry.company,
                    "start_date" => &mut entry.start_date,
                    "end_date" => &mut entry.end_date,
                    "description" => &mut entry.description,
                    _ => return Err(FieldError::UnknownField(name.to_string())),
                };
                *slot = value;
                Ok(())
            }
            ("education", Some(index), Some(field)) => {
                let index = parse_index(name, index)?;
                let entry = entry_mut(&mut self.educations, "education", index)?;
                let slot = match field {
                    "degree" => &mut entry.degree,
                    "school" => &mut entry.school,
                    "start_date" => &mut entry.start_date,
                    "end_date" => &mut entry.end_date,
                    _ => return Err(FieldError::UnknownField(name.to_string())),
                };
                *slot = value;
                Ok(())
            }
            (field, None, None) => {
                let slot = self
                    .text_field_mut(field)
                    .ok_or_else(|| FieldError::UnknownField(name.to_string()))?;
                *slot = value;
                Ok(())
            }
            _ => Err(FieldError::UnknownField(name.to_string())),
        }
    }

    /// Remove an entry from `work` or `education`
    pub fn remove_entry(&mut self, list: &str, index: usize) -> Result<(), FieldError> {
        let (name, len) = match list {
            "work" => ("work", self.work_experiences.len()),
            "education" => ("education", self.educations.len()),
            _ => return Err(FieldError::UnknownField(list.to_string())),
        };
        if index >= len {
            return Err(FieldError::IndexOutOfRange {
                list: name,
                index,
                len,
            });
        }
        match name {
            "work" => {
                self.work_experiences.remove(index);
            }
            _ => {
                self.educations.remove(index);
            }
        }
        Ok(())
    }

    /// Display name assembled from first and last name
    pub fn full_name(&self) -> Option<String> {
        let parts: Vec<&str> = [self.first_name.as_deref(), self.last_name.as_deref()]
            .into_iter()
            .flatten()
            .collect();
        if parts.is_empty() {
            None
        } else {
            Some(parts.join(" "))
        }
    }

    fn text_field_mut(&mut self, name: &str) -> Option<&mut Option<String>> {
        let slot = match name {
            "title" => &mut self.title,
            "description" => &mut self.description,
            "first_name" => &mut self.first_name,
            "last_name" => &mut self.last_name,
            "job_title" => &mut self.job_title,
            "city" => &mut self.city,
            "country" => &mut self.country,
            "phone" => &mut self.phone,
            "email" => &mut self.email,
            "summary" => &mut self.summary,
            "color_hex" => &mut self.color_hex,
            "border_style" => &mut self.border_style,
            _ => return None,
        };
        Some(slot)
    }
}

/// A stored work experience entry
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkExperienceRecord {
    pub position: Option<String>,
    pub company: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub description: Option<String>,
}

/// A stored education entry
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EducationRecord {
    pub degree: Option<String>,
    pub school: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

/// Canonical will as held by the store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WillRecord {
    pub id: String,
    pub title: Option<String>,
    pub description: Option<String>,
    pub photo_url: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub job_title: Option<String>,
    pub city: Option<String>,
    pub country: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    #[serde(default)]
    pub work_experiences: Vec<WorkExperienceRecord>,
    #[serde(default)]
    pub educations: Vec<EducationRecord>,
    #[serde(default)]
    pub skills: Vec<String>,
    pub summary: Option<String>,
    pub color_hex: Option<String>,
    pub border_style: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl WillRecord {
    /// Empty record with both timestamps set to `now`
    pub fn new(id: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            title: None,
            description: None,
            photo_url: None,
            first_name: None,
            last_name: None,
            job_title: None,
            city: None,
            country: None,
            phone: None,
            email: None,
            work_experiences: Vec::new(),
            educations: Vec::new(),
            skills: Vec::new(),
            summary: None,
            color_hex: None,
            border_style: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Title for listings, falling back to "Untitled will"
    pub fn display_title(&self) -> &str {
        self.title
            .as_deref()
            .filter(|t| !t.is_empty())
            .unwrap_or("Untitled will")
    }
}

/// Parse a `YYYY-MM-DD` date
pub fn parse_date(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value, DATE_FORMAT).ok()
}

fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value.as_ref().filter(|v| !v.is_empty()).cloned()
}

fn parse_index(name: &str, index: &str) -> Result<usize, FieldError> {
    index
        .parse()
        .map_err(|_| FieldError::UnknownField(name.to_string()))
}

fn entry_mut<'a, T: Default>(
    list: &'a mut Vec<T>,
    name: &'static str,
    index: usize,
) -> Result<&'a mut T, FieldError> {
    let len = list.len();
    if index == len {
        list.push(T::default());
    } else if index > len {
        return Err(FieldError::IndexOutOfRange {
            list: name,
            index,
            len,
        });
    }
    Ok(&mut list[index])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attachment::LocalBlob;

    fn sample_record() -> WillRecord {
        let now = Utc::now();
        WillRecord {
            id: "will-1".to_string(),
            title: Some("My Will".to_string()),
            description: Some(String::new()),
            photo_url: Some("photos/abc.png".to_string()),
            first_name: Some("Ada".to_string()),
            last_name: None,
            job_title: None,
            city: None,
            country: None,
            phone: None,
            email: None,
            work_experiences: vec![WorkExperienceRecord {
                position: Some("Engineer".to_string()),
                company: Some("Acme".to_string()),
                start_date: NaiveDate::from_ymd_opt(2020, 1, 15),
                end_date: None,
                description: None,
            }],
            educations: vec![EducationRecord {
                degree: Some("BSc".to_string()),
                school: Some(String::new()),
                start_date: None,
                end_date: NaiveDate::from_ymd_opt(2019, 6, 30),
            }],
            skills: vec!["rust".to_string()],
            summary: None,
            color_hex: Some("#000000".to_string()),
            border_style: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_from_record() {
        let values = WillValues::from_record(&sample_record());
        assert_eq!(values.id.as_deref(), Some("will-1"));
        assert_eq!(values.title.as_deref(), Some("My Will"));
        assert!(values.description.is_none());
        assert_eq!(values.photo.as_remote(), Some("photos/abc.png"));
        assert_eq!(
            values.work_experiences[0].start_date.as_deref(),
            Some("2020-01-15")
        );
        assert!(values.work_experiences[0].end_date.is_none());
        assert!(values.educations[0].school.is_none());
        assert_eq!(values.educations[0].end_date.as_deref(), Some("2019-06-30"));
        assert_eq!(values.skills, vec!["rust"]);
    }

    #[test]
    fn test_from_record_without_photo() {
        let mut record = sample_record();
        record.photo_url = Some(String::new());
        assert!(WillValues::from_record(&record).photo.is_none());
    }

    #[test]
    fn test_set_text_field() {
        let mut values = WillValues::new();
        values.set_field("title", Some("A".to_string())).unwrap();
        values.set_field("first_name", Some("Ada".to_string())).unwrap();
        assert_eq!(values.title.as_deref(), Some("A"));
        assert_eq!(values.first_name.as_deref(), Some("Ada"));

        values.set_field("title", None).unwrap();
        assert!(values.title.is_none());

        assert_eq!(
            values.set_field("nickname", Some("x".to_string())),
            Err(FieldError::UnknownField("nickname".to_string()))
        );
    }

    #[test]
    fn test_set_entry_fields() {
        let mut values = WillValues::new();
        values.set_field("work.0.company", Some("Acme".to_string())).unwrap();
        values.set_field("work.0.position", Some("Dev".to_string())).unwrap();
        values.set_field("work.1.company", Some("Initech".to_string())).unwrap();
        assert_eq!(values.work_experiences.len(), 2);
        assert_eq!(values.work_experiences[0].position.as_deref(), Some("Dev"));

        let err = values
            .set_field("work.5.company", Some("x".to_string()))
            .unwrap_err();
        assert!(matches!(err, FieldError::IndexOutOfRange { index: 5, len: 2, .. }));

        values.set_field("education.0.school", Some("MIT".to_string())).unwrap();
        assert_eq!(values.educations[0].school.as_deref(), Some("MIT"));
        assert!(values.set_field("education.0.company", None).is_err());
    }

    #[test]
    fn test_set_skills() {
        let mut values = WillValues::new();
        values.set_field("skills", Some("rust, go ,sql".to_string())).unwrap();
        assert_eq!(values.skills, vec!["rust", "go", "sql"]);
    }

    #[test]
    fn test_remove_entry() {
        let mut values = WillValues::new();
        values.set_field("education.0.degree", Some("BSc".to_string())).unwrap();
        values.set_field("education.1.degree", Some("MSc".to_string())).unwrap();
        values.remove_entry("education", 0).unwrap();
        assert_eq!(values.educations.len(), 1);
        assert_eq!(values.educations[0].degree.as_deref(), Some("MSc"));
        assert!(values.remove_entry("education", 3).is_err());
        assert!(values.remove_entry("hobbies", 0).is_err());
    }

    #[test]
    fn test_equality_ignores_blob_contents() {
        let mut a = WillValues::new();
        a.photo = Attachment::Pending(LocalBlob::new("me.png", "image/png", 1, vec![1u8, 2]));
        let mut b = a.clone();
        b.photo = Attachment::Pending(LocalBlob::new("me.png", "image/png", 1, vec![7u8, 7]));
        assert_eq!(a, b);

        b.title = Some("changed".to_string());
        assert_ne!(a, b);
    }

    #[test]
    fn test_full_name() {
        let mut values = WillValues::new();
        assert!(values.full_name().is_none());
        values.last_name = Some("Lovelace".to_string());
        assert_eq!(values.full_name().as_deref(), Some("Lovelace"));
        values.first_name = Some("Ada".to_string());
        assert_eq!(values.full_name().as_deref(), Some("Ada Lovelace"));
    }

    #[test]
    fn test_values_serialization_is_camel_case() {
        let mut values = WillValues::new();
        values.first_name = Some("Ada".to_string());
        let json = serde_json::to_value(&values).unwrap();
        assert_eq!(json["firstName"], "Ada");
        assert!(json.get("title").is_none());

        let parsed: WillValues = serde_json::from_value(json).unwrap();
        assert_eq!(parsed, values);
    }
}
