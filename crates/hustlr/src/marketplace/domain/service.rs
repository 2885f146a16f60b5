use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};

use super::{AccountId, ServiceId};
use crate::marketplace::validation::{
    bounded, formatted, non_negative_amount, Pattern, ValidationError,
};

pub const DESCRIPTION_MAX_CHARS: usize = 300;

/// Inclusive price band quoted by a provider.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PriceRange {
    min: f64,
    max: f64,
}

impl PriceRange {
    pub fn new(min: f64, max: f64) -> Result<Self, ValidationError> {
        non_negative_amount("min_price", min)?;
        non_negative_amount("max_price", max)?;
        if min > max {
            return Err(ValidationError::Range {
                field: "price",
                detail: format!("minimum ({min}) cannot exceed maximum ({max})"),
            });
        }
        Ok(Self { min, max })
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }
}

/// Fields a provider supplies when posting a service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceDraft {
    pub category: String,
    pub description: String,
    pub min_price: f64,
    pub max_price: f64,
}

/// Partial edit; `None` leaves the field untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServiceUpdate {
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub min_price: Option<f64>,
    #[serde(default)]
    pub max_price: Option<f64>,
    #[serde(default)]
    pub completed: Option<bool>,
}

/// A priced offering owned by exactly one provider.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Service {
    id: ServiceId,
    provider_id: AccountId,
    category: String,
    description: String,
    posted_on: NaiveDate,
    completed: bool,
    price: PriceRange,
}

impl Service {
    pub fn new(provider_id: AccountId, draft: ServiceDraft) -> Result<Self, ValidationError> {
        Self::restore(
            ServiceId::generate(),
            provider_id,
            draft,
            Local::now().date_naive(),
            false,
        )
    }

    /// Rebuild a previously posted service, re-running every field rule.
    pub fn restore(
        id: ServiceId,
        provider_id: AccountId,
        draft: ServiceDraft,
        posted_on: NaiveDate,
        completed: bool,
    ) -> Result<Self, ValidationError> {
        if id.as_str().trim().is_empty() {
            return Err(ValidationError::Empty { field: "service_id" });
        }
        validate_category(&draft.category)?;
        bounded("description", &draft.description, DESCRIPTION_MAX_CHARS)?;
        let price = PriceRange::new(draft.min_price, draft.max_price)?;

        Ok(Self {
            id,
            provider_id,
            category: draft.category,
            description: draft.description,
            posted_on,
            completed,
            price,
        })
    }

    pub fn id(&self) -> &ServiceId {
        &self.id
    }

    pub fn provider_id(&self) -> &AccountId {
        &self.provider_id
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn posted_on(&self) -> NaiveDate {
        self.posted_on
    }

    pub fn is_completed(&self) -> bool {
        self.completed
    }

    pub fn price(&self) -> PriceRange {
        self.price
    }

    pub fn set_category(&mut self, category: impl Into<String>) -> Result<(), ValidationError> {
        let category = category.into();
        validate_category(&category)?;
        self.category = category;
        Ok(())
    }

    pub fn set_description(&mut self, description: impl Into<String>) -> Result<(), ValidationError> {
        let description = description.into();
        bounded("description", &description, DESCRIPTION_MAX_CHARS)?;
        self.description = description;
        Ok(())
    }

    pub fn set_price(&mut self, min: f64, max: f64) -> Result<(), ValidationError> {
        self.price = PriceRange::new(min, max)?;
        Ok(())
    }

    pub fn set_completed(&mut self, completed: bool) {
        self.completed = completed;
    }

    /// Apply an edit atomically: every supplied field is checked before any is written.
    pub fn apply(&mut self, update: ServiceUpdate) -> Result<(), ValidationError> {
        if let Some(category) = &update.category {
            validate_category(category)?;
        }
        if let Some(description) = &update.description {
            bounded("description", description, DESCRIPTION_MAX_CHARS)?;
        }
        let price = match (update.min_price, update.max_price) {
            (None, None) => None,
            (min, max) => Some(PriceRange::new(
                min.unwrap_or(self.price.min),
                max.unwrap_or(self.price.max),
            )?),
        };

        if let Some(category) = update.category {
            self.category = category;
        }
        if let Some(description) = update.description {
            self.description = description;
        }
        if let Some(price) = price {
            self.price = price;
        }
        if let Some(completed) = update.completed {
            self.completed = completed;
        }
        Ok(())
    }
}

fn validate_category(category: &str) -> Result<(), ValidationError> {
    formatted("category", category, Pattern::LettersAndSpaces)
}
