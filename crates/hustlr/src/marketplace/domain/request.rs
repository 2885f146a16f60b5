use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::{AccountId, RequestId, ServiceId};
use crate::marketplace::validation::{non_negative_amount, ValidationError};

/// Lifecycle of a consumer's request against a service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestStatus {
    #[serde(alias = "open")]
    Pending,
    #[serde(alias = "confirmed")]
    Accepted,
    Denied,
    Completed,
    Cancelled,
}

impl RequestStatus {
    pub const fn label(self) -> &'static str {
        match self {
            RequestStatus::Pending => "pending",
            RequestStatus::Accepted => "accepted",
            RequestStatus::Denied => "denied",
            RequestStatus::Completed => "completed",
            RequestStatus::Cancelled => "cancelled",
        }
    }

    pub const fn can_become(self, next: RequestStatus) -> bool {
        matches!(
            (self, next),
            (
                RequestStatus::Pending,
                RequestStatus::Accepted | RequestStatus::Denied | RequestStatus::Cancelled
            ) | (
                RequestStatus::Accepted,
                RequestStatus::Completed | RequestStatus::Cancelled
            )
        )
    }

    /// Parse the lowercase labels plus the `open`/`confirmed` aliases.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "pending" | "open" => Some(RequestStatus::Pending),
            "accepted" | "confirmed" => Some(RequestStatus::Accepted),
            "denied" => Some(RequestStatus::Denied),
            "completed" => Some(RequestStatus::Completed),
            "cancelled" | "canceled" => Some(RequestStatus::Cancelled),
            _ => None,
        }
    }
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Rejected status change.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("request cannot move from {from} to {to}")]
pub struct TransitionError {
    pub from: RequestStatus,
    pub to: RequestStatus,
}

/// Appointment slot attached to a booking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schedule {
    pub date: NaiveDate,
    pub time: NaiveTime,
}

/// A consumer's request to engage a specific service.
///
/// Consumer, service, and provider ids are captured once at creation and never re-derived.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ServiceRequest {
    id: RequestId,
    consumer_id: AccountId,
    service_id: ServiceId,
    provider_id: AccountId,
    status: RequestStatus,
    created_at: DateTime<Utc>,
    schedule: Option<Schedule>,
    price: f64,
}

impl ServiceRequest {
    pub fn new(
        consumer_id: AccountId,
        service_id: ServiceId,
        provider_id: AccountId,
        schedule: Option<Schedule>,
        price: f64,
    ) -> Result<Self, ValidationError> {
        Self::restore(
            RequestId::generate(),
            consumer_id,
            service_id,
            provider_id,
            RequestStatus::Pending,
            Utc::now(),
            schedule,
            price,
        )
    }

    #[allow(clippy::too_many_arguments)]
    pub fn restore(
        id: RequestId,
        consumer_id: AccountId,
        service_id: ServiceId,
        provider_id: AccountId,
        status: RequestStatus,
        created_at: DateTime<Utc>,
        schedule: Option<Schedule>,
        price: f64,
    ) -> Result<Self, ValidationError> {
        if id.as_str().trim().is_empty() {
            return Err(ValidationError::Empty { field: "request_id" });
        }
        non_negative_amount("price", price)?;
        Ok(Self {
            id,
            consumer_id,
            service_id,
            provider_id,
            status,
            created_at,
            schedule,
            price,
        })
    }

    pub fn id(&self) -> &RequestId {
        &self.id
    }

    pub fn consumer_id(&self) -> &AccountId {
        &self.consumer_id
    }

    pub fn service_id(&self) -> &ServiceId {
        &self.service_id
    }

    pub fn provider_id(&self) -> &AccountId {
        &self.provider_id
    }

    pub fn status(&self) -> RequestStatus {
        self.status
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn schedule(&self) -> Option<Schedule> {
        self.schedule
    }

    pub fn price(&self) -> f64 {
        self.price
    }

    pub fn set_price(&mut self, price: f64) -> Result<(), ValidationError> {
        non_negative_amount("price", price)?;
        self.price = price;
        Ok(())
    }

    pub fn transition(&mut self, next: RequestStatus) -> Result<(), TransitionError> {
        if !self.status.can_become(next) {
            return Err(TransitionError {
                from: self.status,
                to: next,
            });
        }
        self.status = next;
        Ok(())
    }

    pub fn accept(&mut self) -> Result<(), TransitionError> {
        self.transition(RequestStatus::Accepted)
    }

    pub fn deny(&mut self) -> Result<(), TransitionError> {
        self.transition(RequestStatus::Denied)
    }

    pub fn complete(&mut self) -> Result<(), TransitionError> {
        self.transition(RequestStatus::Completed)
    }

    pub fn cancel(&mut self) -> Result<(), TransitionError> {
        self.transition(RequestStatus::Cancelled)
    }
}
