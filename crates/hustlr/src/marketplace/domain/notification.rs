use chrono::{DateTime, Utc};
use serde::Serialize;

use super::NotificationId;
use crate::marketplace::validation::{bounded, ValidationError};

pub const TITLE_MAX_CHARS: usize = 100;
pub const DESCRIPTION_MAX_CHARS: usize = 500;

/// Short message held in exactly one account's notification list.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Notification {
    id: NotificationId,
    title: String,
    description: String,
    created_at: DateTime<Utc>,
}

impl Notification {
    pub fn new(
        title: impl Into<String>,
        description: impl Into<String>,
    ) -> Result<Self, ValidationError> {
        Self::with_timestamp(NotificationId::generate(), title, description, Utc::now())
    }

    pub fn with_timestamp(
        id: NotificationId,
        title: impl Into<String>,
        description: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Result<Self, ValidationError> {
        let title = title.into();
        let description = description.into();
        bounded("title", &title, TITLE_MAX_CHARS)?;
        bounded("description", &description, DESCRIPTION_MAX_CHARS)?;
        Ok(Self {
            id,
            title,
            description,
            created_at,
        })
    }

    pub fn id(&self) -> &NotificationId {
        &self.id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn description(&self) -> &str {
        &self.description
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
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn description_limit_is_inclusive() {
        assert!(Notification::new("Booked", "x".repeat(500)).is_ok());
        let err = Notification::new("Booked", "x".repeat(501)).expect_err("501 chars rejected");
        assert_eq!(
            err,
            ValidationError::TooLong {
                field: "description",
                max: 500,
                found: 501
            }
        );
    }

    #[test]
    fn title_limit_is_inclusive() {
        assert!(Notification::new("t".repeat(100), "body").is_ok());
        assert!(Notification::new("t".repeat(101), "body").is_err());
        assert!(Notification::new("   ", "body").is_err());
    }

    #[test]
    fn failed_update_keeps_previous_value() {
        let mut notification = Notification::new("Booked", "Your booking is confirmed").expect("valid");
        assert!(notification.set_description("").is_err());
        assert_eq!(notification.description(), "Your booking is confirmed");
        notification
            .set_title("Rescheduled")
            .expect("valid title accepted");
        assert_eq!(notification.title(), "Rescheduled");
    }
}
