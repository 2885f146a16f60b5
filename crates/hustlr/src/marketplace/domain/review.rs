use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{AccountId, ReviewId, ServiceId};
use crate::marketplace::validation::{bounded, ValidationError};

pub const TITLE_MAX_CHARS: usize = 100;
pub const DESCRIPTION_MAX_CHARS: usize = 500;

/// Integer star rating, strictly within 1..=5.
///
/// Deserializes from an integer only, so `4.5` or `"4"` never reach the range check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "u8")]
pub struct Rating(u8);

impl Rating {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 5;

    pub fn new(value: i64) -> Result<Self, ValidationError> {
        if (i64::from(Self::MIN)..=i64::from(Self::MAX)).contains(&value) {
            Ok(Self(value as u8))
        } else {
            Err(ValidationError::Range {
                field: "rating",
                detail: format!(
                    "must be between {} and {} (found {value})",
                    Self::MIN,
                    Self::MAX
                ),
            })
        }
    }

    pub fn value(self) -> u8 {
        self.0
    }
}

impl TryFrom<i64> for Rating {
    type Error = ValidationError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Rating> for u8 {
    fn from(rating: Rating) -> Self {
        rating.0
    }
}

/// Inbound review content before ids and timestamps are assigned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewDraft {
    pub title: String,
    pub description: String,
    pub rating: Rating,
    #[serde(default)]
    pub service_id: Option<ServiceId>,
}

/// Feedback one account leaves about another.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Review {
    id: ReviewId,
    author_id: AccountId,
    subject_id: AccountId,
    service_id: Option<ServiceId>,
    title: String,
    description: String,
    rating: Rating,
    created_at: DateTime<Utc>,
}

impl Review {
    pub fn new(
        author_id: AccountId,
        subject_id: AccountId,
        draft: ReviewDraft,
    ) -> Result<Self, ValidationError> {
        let ReviewDraft {
            title,
            description,
            rating,
            service_id,
        } = draft;
        bounded("title", &title, TITLE_MAX_CHARS)?;
        bounded("description", &description, DESCRIPTION_MAX_CHARS)?;

        Ok(Self {
            id: ReviewId::generate(),
            author_id,
            subject_id,
            service_id,
            title,
            description,
            rating,
            created_at: Utc::now(),
        })
    }

    pub fn id(&self) -> &ReviewId {
        &self.id
    }

    pub fn author_id(&self) -> &AccountId {
        &self.author_id
    }

    pub fn subject_id(&self) -> &AccountId {
        &self.subject_id
    }

    pub fn service_id(&self) -> Option<&ServiceId> {
        self.service_id.as_ref()
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn rating(&self) -> Rating {
        self.rating
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn set_title(&mut self, title: impl Into<String>) -> Result<(), ValidationError> {
        let title = title.into();
        bounded("title", &title, TITLE_MAX_CHARS)?;
        self.title = title;
        Ok(())
    }

    pub fn set_description(&mut self, description: impl Into<String>) -> Result<(), ValidationError> {
        let description = description.into();
        bounded("description", &description, DESCRIPTION_MAX_CHARS)?;
        self.description = description;
        Ok(())
    }

    pub fn set_rating(&mut self, rating: Rating) {
        self.rating = rating;
    }

    /// Replace the editable content, keeping id, parties, and creation time.
    pub(crate) fn revise(&mut self, draft: ReviewDraft) -> Result<(), ValidationError> {
        bounded("title", &draft.title, TITLE_MAX_CHARS)?;
        bounded("description", &draft.description, DESCRIPTION_MAX_CHARS)?;
        self.title = draft.title;
        self.description = draft.description;
        self.rating = draft.rating;
        if draft.service_id.is_some() {
            self.service_id = draft.service_id;
        }
        Ok(())
    }
}
