//! Editor wizard steps
//!
//! The editor walks the user through a fixed sequence of form steps. The
//! current step lives in the location's `step` parameter so that back and
//! forward navigation works.

use crate::location::{Location, STEP_PARAM};

/// A step of the editor wizard
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EditorStep {
    GeneralInfo,
    PersonalInfo,
    WorkExperience,
    Education,
    Skills,
    Summary,
}

impl EditorStep {
    /// All steps in order
    pub const ALL: [EditorStep; 6] = [
        EditorStep::GeneralInfo,
        EditorStep::PersonalInfo,
        EditorStep::WorkExperience,
        EditorStep::Education,
        EditorStep::Skills,
        EditorStep::Summary,
    ];

    /// Key used in the location
    pub fn key(self) -> &'static str {
        match self {
            EditorStep::GeneralInfo => "general-info",
            EditorStep::PersonalInfo => "personal-info",
            EditorStep::WorkExperience => "work-experience",
            EditorStep::Education => "education",
            EditorStep::Skills => "skills",
            EditorStep::Summary => "summary",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            EditorStep::GeneralInfo => "General info",
            EditorStep::PersonalInfo => "Personal info",
            EditorStep::WorkExperience => "Work experience",
            EditorStep::Education => "Education",
            EditorStep::Skills => "Skills",
            EditorStep::Summary => "Summary",
        }
    }

    /// Fields edited on this step (names accepted by `WillValues::set_field`)
    pub fn fields(self) -> &'static [&'static str] {
        match self {
            EditorStep::GeneralInfo => &["title", "description"],
            EditorStep::PersonalInfo => &[
                "photo",
                "first_name",
                "last_name",
                "job_title",
                "city",
                "country",
                "phone",
                "email",
            ],
            EditorStep::WorkExperience => &[
                "work.N.position",
                "work.N.company",
                "work.N.start_date",
                "work.N.end_date",
                "work.N.description",
            ],
            EditorStep::Education => &[
                "education.N.degree",
                "education.N.school",
                "education.N.start_date",
                "education.N.end_date",
            ],
            EditorStep::Skills => &["skills"],
            EditorStep::Summary => &["summary", "color_hex", "border_style"],
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|step| step.key() == key)
    }

    fn index(self) -> usize {
        Self::ALL
            .iter()
            .position(|step| *step == self)
            .unwrap_or_default()
    }

    /// Previous step, `None` on the first
    pub fn previous(self) -> Option<Self> {
        self.index().checked_sub(1).map(|i| Self::ALL[i])
    }

    /// Next step, `None` on the last
    pub fn next(self) -> Option<Self> {
        Self::ALL.get(self.index() + 1).copied()
    }
}

/// Current step from the location, defaulting to the first step
///
/// Unknown keys also fall back to the first step.
pub fn current_step(location: &dyn Location) -> EditorStep {
    location
        .query_param(STEP_PARAM)
        .and_then(|key| EditorStep::from_key(&key))
        .unwrap_or(EditorStep::ALL[0])
}

/// Navigate to a step, adding a history entry
pub fn set_step(location: &dyn Location, step: EditorStep) {
    location.push_query(STEP_PARAM, step.key());
}
