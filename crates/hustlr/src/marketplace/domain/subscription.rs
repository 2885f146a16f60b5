use chrono::{Local, NaiveDate};
use serde::Serialize;

use super::{AccountId, RequestId, SubscriptionId};
use crate::marketplace::validation::{non_negative_amount, ValidationError};

/// Recurring-payment arrangement tied to a service request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Subscription {
    transaction_id: SubscriptionId,
    consumer_id: AccountId,
    request_id: RequestId,
    amount: f64,
    started_on: NaiveDate,
    active: bool,
}

impl Subscription {
    pub fn new(
        consumer_id: AccountId,
        request_id: RequestId,
        amount: f64,
    ) -> Result<Self, ValidationError> {
        Self::restore(
            SubscriptionId::generate(),
            consumer_id,
            request_id,
            amount,
            Local::now().date_naive(),
            true,
        )
    }

    pub fn restore(
        transaction_id: SubscriptionId,
        consumer_id: AccountId,
        request_id: RequestId,
        amount: f64,
        started_on: NaiveDate,
        active: bool,
    ) -> Result<Self, ValidationError> {
        if transaction_id.as_str().trim().is_empty() {
            return Err(ValidationError::Empty {
                field: "transaction_id",
            });
        }
        non_negative_amount("amount", amount)?;
        Ok(Self {
            transaction_id,
            consumer_id,
            request_id,
            amount,
            started_on,
            active,
        })
    }

    pub fn transaction_id(&self) -> &SubscriptionId {
        &self.transaction_id
    }

    pub fn consumer_id(&self) -> &AccountId {
        &self.consumer_id
    }

    pub fn request_id(&self) -> &RequestId {
        &self.request_id
    }

    pub fn amount(&self) -> f64 {
        self.amount
    }

    pub fn started_on(&self) -> NaiveDate {
        self.started_on
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn set_amount(&mut self, amount: f64) -> Result<(), ValidationError> {
        non_negative_amount("amount", amount)?;
        self.amount = amount;
        Ok(())
    }

    pub fn deactivate(&mut self) {
        self.active = false;
    }
}
