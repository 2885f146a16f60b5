use std::sync::Arc;

use chrono::{Local, NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

use super::domain::{
    Account, AccountError, AccountId, AccountProfileView, AccountRegistration, AccountUpdate,
    Notification, NotificationId, PasswordError, Report, RequestId, RequestStatus, Review,
    ReviewDraft, ReviewId, Role, Schedule, Service, ServiceDraft, ServiceId, ServiceRequest,
    ServiceUpdate, Subscription, SubscriptionId, TransitionError, Wallet, WalletDraft, WalletView,
};
use super::repository::{MarketplaceRepository, RepositoryError};
use super::validation::ValidationError;

/// Catalogue filter; blank values are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ServiceFilter {
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub provider_id: Option<AccountId>,
}

impl ServiceFilter {
    pub fn matches(&self, service: &Service) -> bool {
        let category = self
            .category
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty());
        let provider = self
            .provider_id
            .as_ref()
            .filter(|id| !id.as_str().trim().is_empty());

        category.map_or(true, |wanted| service.category().eq_ignore_ascii_case(wanted))
            && provider.map_or(true, |wanted| service.provider_id() == wanted)
    }
}

/// Booking payload accepted by the JSON API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookingDraft {
    pub service_id: ServiceId,
    pub consumer_id: AccountId,
    pub provider_id: AccountId,
    pub date: NaiveDate,
    /// `HH:MM` or `HH:MM:SS`.
    pub time: String,
    pub price: f64,
}

/// Successful login: an opaque token plus the public profile.
#[derive(Debug, Clone, Serialize)]
pub struct LoginOutcome {
    pub token: String,
    pub user: AccountProfileView,
}

/// Service facade composing the repository with marketplace rules.
pub struct Marketplace<R> {
    repository: Arc<R>,
    password_cost: u32,
}

impl<R> Marketplace<R>
where
    R: MarketplaceRepository + 'static,
{
    pub fn new(repository: Arc<R>, password_cost: u32) -> Self {
        Self {
            repository,
            password_cost,
        }
    }

    pub fn repository(&self) -> &Arc<R> {
        &self.repository
    }

    pub fn password_cost(&self) -> u32 {
        self.password_cost
    }

    // Accounts

    /// Create an account; the password is hashed before anything is stored.
    pub fn register(&self, registration: AccountRegistration) -> Result<Account, MarketplaceError> {
        let mut account = Account::register(registration, self.password_cost)?;
        account.push_notification(Notification::new(
            "Welcome to Hustlr",
            "Your account is ready. Complete your profile and add a wallet to get started.",
        )?);

        let stored = match self.repository.insert_account(account) {
            Ok(stored) => stored,
            Err(RepositoryError::Conflict) => return Err(MarketplaceError::DuplicateAccount),
            Err(other) => return Err(other.into()),
        };
        tracing::info!(account_id = %stored.id(), role = %stored.role(), "account registered");
        Ok(stored)
    }

    /// Check credentials where `identifier` is either the email or the username.
    pub fn login(&self, identifier: &str, password: &str) -> Result<LoginOutcome, MarketplaceError> {
        let account = match self.repository.find_account_by_email(identifier)? {
            Some(account) => Some(account),
            None => self.repository.find_account_by_username(identifier)?,
        };

        match account {
            Some(account) if account.verify_password(password) => {
                tracing::info!(account_id = %account.id(), "login succeeded");
                Ok(LoginOutcome {
                    token: uuid::Uuid::new_v4().simple().to_string(),
                    user: account.profile_view(),
                })
            }
            _ => {
                tracing::warn!("login rejected");
                Err(MarketplaceError::InvalidCredentials)
            }
        }
    }

    pub fn account(&self, id: &AccountId) -> Result<Account, MarketplaceError> {
        self.repository
            .fetch_account(id)?
            .ok_or_else(|| MarketplaceError::not_found("account", id))
    }

    pub fn update_account(
        &self,
        id: &AccountId,
        update: AccountUpdate,
    ) -> Result<Account, MarketplaceError> {
        let updated = self.edit_account(id, |account| {
            account.update_details(update)?;
            Ok(account.clone())
        });
        match updated {
            Err(MarketplaceError::Repository(RepositoryError::Conflict)) => {
                Err(MarketplaceError::DuplicateAccount)
            }
            other => other,
        }
    }

    pub fn account_report(&self, id: &AccountId) -> Result<Report, MarketplaceError> {
        Ok(self.account(id)?.report()?)
    }

    pub fn add_review(
        &self,
        author_id: &AccountId,
        subject_id: &AccountId,
        draft: ReviewDraft,
    ) -> Result<Review, MarketplaceError> {
        if author_id == subject_id {
            return Err(MarketplaceError::SelfReview);
        }
        self.account(author_id)?;
        self.account(subject_id)?;
        if let Some(service_id) = &draft.service_id {
            self.service(service_id)?;
        }

        let review = Review::new(author_id.clone(), subject_id.clone(), draft)?;
        let notice = Notification::new(
            "New review",
            format!("You received a {}-star review: {}", review.rating().value(), review.title()),
        )?;
        self.edit_account(subject_id, |subject| {
            subject.add_review(review.clone());
            subject.push_notification(notice);
            Ok(())
        })?;
        Ok(review)
    }

    pub fn edit_review(
        &self,
        author_id: &AccountId,
        subject_id: &AccountId,
        review_id: &ReviewId,
        draft: ReviewDraft,
    ) -> Result<Review, MarketplaceError> {
        self.edit_account(subject_id, |subject| {
            let index = subject
                .review_index(review_id)
                .ok_or_else(|| MarketplaceError::not_found("review", review_id))?;
            if subject.reviews()[index].author_id() != author_id {
                return Err(MarketplaceError::not_owner("review", review_id));
            }
            Ok(subject.edit_review(index, draft)?.clone())
        })
    }

    pub fn delete_review(
        &self,
        author_id: &AccountId,
        subject_id: &AccountId,
        review_id: &ReviewId,
    ) -> Result<Review, MarketplaceError> {
        self.edit_account(subject_id, |subject| {
            let owned = subject
                .reviews()
                .iter()
                .find(|review| review.id() == review_id)
                .map(|review| review.author_id() == author_id)
                .ok_or_else(|| MarketplaceError::not_found("review", review_id))?;
            if !owned {
                return Err(MarketplaceError::not_owner("review", review_id));
            }
            Ok(subject.delete_review(review_id)?)
        })
    }

    pub fn notifications(&self, account_id: &AccountId) -> Result<Vec<Notification>, MarketplaceError> {
        Ok(self.account(account_id)?.notifications().to_vec())
    }

    pub fn delete_notification(
        &self,
        account_id: &AccountId,
        notification_id: &NotificationId,
    ) -> Result<Notification, MarketplaceError> {
        self.edit_account(account_id, |account| {
            Ok(account.delete_notification(notification_id)?)
        })
    }

    pub fn attach_wallet(
        &self,
        account_id: &AccountId,
        draft: WalletDraft,
    ) -> Result<WalletView, MarketplaceError> {
        let wallet = Wallet::new(draft)?;
        let today = Local::now().date_naive();
        if wallet.card().is_some_and(|card| card.is_expired(today)) {
            return Err(ValidationError::Format {
                field: "expiry",
                rule: "not be in the past",
            }
            .into());
        }
        let view = wallet.view();
        self.edit_account(account_id, |account| {
            account.attach_wallet(wallet);
            Ok(())
        })?;
        tracing::debug!(account_id = %account_id, "wallet attached");
        Ok(view)
    }

    /// False when the account has no wallet or no card on file.
    pub fn verify_wallet(&self, account_id: &AccountId, pin: &str) -> Result<bool, MarketplaceError> {
        let account = self.account(account_id)?;
        Ok(account.wallet().is_some_and(|wallet| wallet.verify(pin)))
    }

    // Providers

    pub fn create_service(
        &self,
        provider_id: &AccountId,
        draft: ServiceDraft,
    ) -> Result<Service, MarketplaceError> {
        self.account_with_role(provider_id, Role::Provider)?;
        let service = Service::new(provider_id.clone(), draft)?;
        let stored = self.repository.insert_service(service)?;
        tracing::info!(
            service_id = %stored.id(),
            provider_id = %provider_id,
            category = stored.category(),
            "service posted"
        );
        Ok(stored)
    }

    pub fn edit_service(
        &self,
        provider_id: &AccountId,
        service_id: &ServiceId,
        update: ServiceUpdate,
    ) -> Result<Service, MarketplaceError> {
        let mut service = self.owned_service(provider_id, service_id)?;
        service.apply(update)?;
        self.repository.update_service(service.clone())?;
        Ok(service)
    }

    pub fn delete_service(
        &self,
        provider_id: &AccountId,
        service_id: &ServiceId,
    ) -> Result<Service, MarketplaceError> {
        self.owned_service(provider_id, service_id)?;
        let removed = match self.repository.remove_service(service_id) {
            Ok(removed) => removed,
            Err(RepositoryError::Conflict) => {
                return Err(MarketplaceError::in_use("service", service_id, "bookings"))
            }
            Err(other) => return Err(other.into()),
        };
        tracing::info!(service_id = %service_id, "service withdrawn");
        Ok(removed)
    }

    pub fn accept_request(
        &self,
        provider_id: &AccountId,
        request_id: &RequestId,
    ) -> Result<ServiceRequest, MarketplaceError> {
        self.provider_transition(provider_id, request_id, RequestStatus::Accepted)
    }

    pub fn deny_request(
        &self,
        provider_id: &AccountId,
        request_id: &RequestId,
    ) -> Result<ServiceRequest, MarketplaceError> {
        self.provider_transition(provider_id, request_id, RequestStatus::Denied)
    }

    pub fn complete_request(
        &self,
        provider_id: &AccountId,
        request_id: &RequestId,
    ) -> Result<ServiceRequest, MarketplaceError> {
        self.provider_transition(provider_id, request_id, RequestStatus::Completed)
    }

    pub fn provider_services(&self, provider_id: &AccountId) -> Result<Vec<Service>, MarketplaceError> {
        self.account_with_role(provider_id, Role::Provider)?;
        self.list_services(&ServiceFilter {
            category: None,
            provider_id: Some(provider_id.clone()),
        })
    }

    pub fn provider_requests(
        &self,
        provider_id: &AccountId,
    ) -> Result<Vec<ServiceRequest>, MarketplaceError> {
        self.account_with_role(provider_id, Role::Provider)?;
        self.list_bookings(provider_id, Role::Provider)
    }

    // Consumers

    /// Request a service; without an explicit price the service's minimum is quoted.
    pub fn request_service(
        &self,
        consumer_id: &AccountId,
        service_id: &ServiceId,
        schedule: Option<Schedule>,
        price: Option<f64>,
    ) -> Result<ServiceRequest, MarketplaceError> {
        self.account_with_role(consumer_id, Role::Consumer)?;
        let service = self.service(service_id)?;
        let price = price.unwrap_or_else(|| service.price().min());
        let request = ServiceRequest::new(
            consumer_id.clone(),
            service_id.clone(),
            service.provider_id().clone(),
            schedule,
            price,
        )?;
        self.store_request(request, &service)
    }

    /// Remove a request the consumer no longer wants; accepted requests must be cancelled instead.
    pub fn delete_request(
        &self,
        consumer_id: &AccountId,
        request_id: &RequestId,
    ) -> Result<ServiceRequest, MarketplaceError> {
        let request = self.request(request_id)?;
        if request.consumer_id() != consumer_id {
            return Err(MarketplaceError::not_owner("request", request_id));
        }
        if request.status() == RequestStatus::Accepted {
            return Err(MarketplaceError::RequestLocked(request_id.clone()));
        }
        let removed = match self.repository.remove_request(request_id) {
            Ok(removed) => removed,
            Err(RepositoryError::Conflict) => {
                return Err(MarketplaceError::in_use("request", request_id, "subscriptions"))
            }
            Err(other) => return Err(other.into()),
        };
        if removed.status() == RequestStatus::Pending {
            self.notify(
                removed.provider_id(),
                "Request withdrawn",
                format!("A pending request for service {} was withdrawn.", removed.service_id()),
            )?;
        }
        Ok(removed)
    }

    /// Open a request for the service and a subscription paying `amount` against it.
    pub fn apply_for_subscription(
        &self,
        consumer_id: &AccountId,
        service_id: &ServiceId,
        amount: f64,
    ) -> Result<Subscription, MarketplaceError> {
        self.account_with_role(consumer_id, Role::Consumer)?;
        let service = self.service(service_id)?;
        let request = ServiceRequest::new(
            consumer_id.clone(),
            service_id.clone(),
            service.provider_id().clone(),
            None,
            amount,
        )?;
        let subscription = Subscription::new(consumer_id.clone(), request.id().clone(), amount)?;
        let request_id = self.store_request(request, &service)?.id().clone();
        let stored = match self.repository.insert_subscription(subscription) {
            Ok(stored) => stored,
            Err(RepositoryError::NotFound) => {
                return Err(MarketplaceError::not_found("request", request_id))
            }
            Err(other) => return Err(other.into()),
        };
        tracing::info!(
            transaction_id = %stored.transaction_id(),
            consumer_id = %consumer_id,
            "subscription opened"
        );
        Ok(stored)
    }

    /// Deactivate a subscription and cancel its request if still open.
    pub fn cancel_subscription(
        &self,
        consumer_id: &AccountId,
        subscription_id: &SubscriptionId,
    ) -> Result<Subscription, MarketplaceError> {
        let mut subscription = self
            .repository
            .fetch_subscription(subscription_id)?
            .ok_or_else(|| MarketplaceError::not_found("subscription", subscription_id))?;
        if subscription.consumer_id() != consumer_id {
            return Err(MarketplaceError::not_owner("subscription", subscription_id));
        }
        subscription.deactivate();
        self.repository.update_subscription(subscription.clone())?;

        if let Some(mut request) = self.repository.fetch_request(subscription.request_id())? {
            if request.status().can_become(RequestStatus::Cancelled) {
                request.cancel()?;
                self.repository.update_request(request.clone())?;
                self.announce(&request)?;
            }
        }
        Ok(subscription)
    }

    pub fn consumer_requests(
        &self,
        consumer_id: &AccountId,
    ) -> Result<Vec<ServiceRequest>, MarketplaceError> {
        self.account_with_role(consumer_id, Role::Consumer)?;
        self.list_bookings(consumer_id, Role::Consumer)
    }

    pub fn consumer_subscriptions(
        &self,
        consumer_id: &AccountId,
    ) -> Result<Vec<Subscription>, MarketplaceError> {
        self.account_with_role(consumer_id, Role::Consumer)?;
        Ok(self
            .repository
            .subscriptions()?
            .into_iter()
            .filter(|subscription| subscription.consumer_id() == consumer_id)
            .collect())
    }

    // Catalogue and bookings

    pub fn list_services(&self, filter: &ServiceFilter) -> Result<Vec<Service>, MarketplaceError> {
        Ok(self
            .repository
            .services()?
            .into_iter()
            .filter(|service| filter.matches(service))
            .collect())
    }

    pub fn service(&self, id: &ServiceId) -> Result<Service, MarketplaceError> {
        self.repository
            .fetch_service(id)?
            .ok_or_else(|| MarketplaceError::not_found("service", id))
    }

    /// Book a service; the service, consumer, and provider are checked in that order.
    pub fn create_booking(&self, draft: BookingDraft) -> Result<ServiceRequest, MarketplaceError> {
        let service = self.service(&draft.service_id)?;
        self.booking_party(&draft.consumer_id, Role::Consumer)?;
        self.booking_party(&draft.provider_id, Role::Provider)?;
        if service.provider_id() != &draft.provider_id {
            return Err(MarketplaceError::ProviderMismatch {
                service: draft.service_id,
                provider: draft.provider_id,
            });
        }

        let schedule = Schedule {
            date: draft.date,
            time: parse_time(&draft.time)?,
        };
        let request = ServiceRequest::new(
            draft.consumer_id,
            draft.service_id,
            draft.provider_id,
            Some(schedule),
            draft.price,
        )?;
        self.store_request(request, &service)
    }

    pub fn booking(&self, id: &RequestId) -> Result<ServiceRequest, MarketplaceError> {
        self.request(id)
    }

    /// Bookings where the account takes part in the given role.
    pub fn list_bookings(
        &self,
        account_id: &AccountId,
        role: Role,
    ) -> Result<Vec<ServiceRequest>, MarketplaceError> {
        Ok(self
            .repository
            .requests()?
            .into_iter()
            .filter(|request| match role {
                Role::Consumer => request.consumer_id() == account_id,
                Role::Provider => request.provider_id() == account_id,
            })
            .collect())
    }

    pub fn update_booking_status(
        &self,
        id: &RequestId,
        status: RequestStatus,
    ) -> Result<ServiceRequest, MarketplaceError> {
        let mut request = self.request(id)?;
        request.transition(status)?;
        self.repository.update_request(request.clone())?;
        tracing::info!(request_id = %id, status = %status, "booking status changed");
        self.announce(&request)?;
        Ok(request)
    }

    fn request(&self, id: &RequestId) -> Result<ServiceRequest, MarketplaceError> {
        self.repository
            .fetch_request(id)?
            .ok_or_else(|| MarketplaceError::not_found("booking", id))
    }

    fn account_with_role(&self, id: &AccountId, role: Role) -> Result<Account, MarketplaceError> {
        let account = self.account(id)?;
        if account.role() != role {
            return Err(MarketplaceError::RoleMismatch {
                account: id.clone(),
                expected: role,
            });
        }
        Ok(account)
    }

    /// A booking party that is missing or holds the other role counts as unknown.
    fn booking_party(&self, id: &AccountId, role: Role) -> Result<Account, MarketplaceError> {
        match self.repository.fetch_account(id)? {
            Some(account) if account.role() == role => Ok(account),
            _ => Err(MarketplaceError::not_found(role.label(), id)),
        }
    }

    fn owned_service(
        &self,
        provider_id: &AccountId,
        service_id: &ServiceId,
    ) -> Result<Service, MarketplaceError> {
        self.account_with_role(provider_id, Role::Provider)?;
        let service = self.service(service_id)?;
        if service.provider_id() != provider_id {
            return Err(MarketplaceError::not_owner("service", service_id));
        }
        Ok(service)
    }

    fn provider_transition(
        &self,
        provider_id: &AccountId,
        request_id: &RequestId,
        status: RequestStatus,
    ) -> Result<ServiceRequest, MarketplaceError> {
        self.account_with_role(provider_id, Role::Provider)?;
        let request = self.request(request_id)?;
        if request.provider_id() != provider_id {
            return Err(MarketplaceError::not_owner("request", request_id));
        }
        self.update_booking_status(request_id, status)
    }

    fn store_request(
        &self,
        request: ServiceRequest,
        service: &Service,
    ) -> Result<ServiceRequest, MarketplaceError> {
        let stored = match self.repository.insert_request(request) {
            Ok(stored) => stored,
            Err(RepositoryError::NotFound) => {
                return Err(MarketplaceError::not_found("service", service.id()))
            }
            Err(other) => return Err(other.into()),
        };
        self.notify(
            stored.provider_id(),
            "New service request",
            format!(
                "You have a new request for {} (quoted at ${:.2}).",
                service.category(),
                stored.price()
            ),
        )?;
        tracing::info!(
            request_id = %stored.id(),
            service_id = %stored.service_id(),
            consumer_id = %stored.consumer_id(),
            "service requested"
        );
        Ok(stored)
    }

    /// Tell the counterparty about the request's current status.
    fn announce(&self, request: &ServiceRequest) -> Result<(), MarketplaceError> {
        let (recipient, title) = match request.status() {
            RequestStatus::Accepted => (request.consumer_id(), "Request accepted"),
            RequestStatus::Denied => (request.consumer_id(), "Request denied"),
            RequestStatus::Completed => (request.consumer_id(), "Request completed"),
            RequestStatus::Cancelled => (request.provider_id(), "Request cancelled"),
            RequestStatus::Pending => return Ok(()),
        };
        self.notify(
            recipient,
            title,
            format!("Request {} is now {}.", request.id(), request.status()),
        )
    }

    /// Push a notification; a vanished recipient is logged rather than failing the caller.
    fn notify(
        &self,
        recipient: &AccountId,
        title: &str,
        description: String,
    ) -> Result<(), MarketplaceError> {
        let notice = Notification::new(title, description)?;
        let pushed = self.edit_account(recipient, |account| {
            account.push_notification(notice);
            Ok(())
        });
        match pushed {
            Err(MarketplaceError::NotFound { .. }) => {
                tracing::warn!(account_id = %recipient, "notification recipient missing");
                Ok(())
            }
            other => other,
        }
    }

    /// Apply `change` to the stored account as one step.
    fn edit_account<T>(
        &self,
        id: &AccountId,
        change: impl FnOnce(&mut Account) -> Result<T, MarketplaceError>,
    ) -> Result<T, MarketplaceError> {
        match self.repository.modify_account(id, change) {
            Err(MarketplaceError::Repository(RepositoryError::NotFound)) => {
                Err(MarketplaceError::not_found("account", id))
            }
            other => other,
        }
    }
}

fn parse_time(raw: &str) -> Result<NaiveTime, ValidationError> {
    let raw = raw.trim();
    NaiveTime::parse_from_str(raw, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M:%S"))
        .map_err(|_| ValidationError::Format {
            field: "time",
            rule: "be a time of day in HH:MM format",
        })
}

/// Error raised by the marketplace facade.
#[derive(Debug, thiserror::Error)]
pub enum MarketplaceError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Password(#[from] PasswordError),
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: String },
    #[error("account {account} is not a {expected}")]
    RoleMismatch { account: AccountId, expected: Role },
    #[error("{entity} {id} belongs to another account")]
    NotOwner { entity: &'static str, id: String },
    #[error("accounts cannot review themselves")]
    SelfReview,
    #[error("request {0} has been accepted; cancel it instead of deleting it")]
    RequestLocked(RequestId),
    #[error("{entity} {id} still has linked {dependents}")]
    InUse {
        entity: &'static str,
        id: String,
        dependents: &'static str,
    },
    #[error("service {service} is not offered by provider {provider}")]
    ProviderMismatch {
        service: ServiceId,
        provider: AccountId,
    },
    #[error(transparent)]
    Transition(#[from] TransitionError),
    #[error("an account with that email or username already exists")]
    DuplicateAccount,
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl MarketplaceError {
    fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    fn in_use(entity: &'static str, id: impl ToString, dependents: &'static str) -> Self {
        Self::InUse {
            entity,
            id: id.to_string(),
            dependents,
        }
    }

    fn not_owner(entity: &'static str, id: impl ToString) -> Self {
        Self::NotOwner {
            entity,
            id: id.to_string(),
        }
    }
}

impl From<AccountError> for MarketplaceError {
    fn from(value: AccountError) -> Self {
        match value {
            AccountError::Validation(err) => Self::Validation(err),
            AccountError::Password(err) => Self::Password(err),
            AccountError::ReviewIndex { index, .. } => Self::not_found("review", index),
            AccountError::ReviewNotFound(id) => Self::not_found("review", id),
            AccountError::NotificationNotFound(id) => Self::not_found("notification", id),
        }
    }
}
