use super::domain::{
    Account, AccountId, RequestId, Service, ServiceId, ServiceRequest, Subscription,
    SubscriptionId,
};

/// Storage abstraction so the marketplace facade can be exercised against any backend.
///
/// Listing methods return records in insertion order. Inserting a request or
/// subscription whose parent row is missing yields `NotFound`; removing a service
/// or request that still has dependents yields `Conflict`.
pub trait MarketplaceRepository: Send + Sync {
    fn insert_account(&self, account: Account) -> Result<Account, RepositoryError>;
    /// Apply `change` to the stored account while holding the write side of the table.
    ///
    /// The row is replaced only when `change` returns `Ok`; a missing row yields
    /// `RepositoryError::NotFound` converted into `E`. `change` must not call back
    /// into the repository.
    fn modify_account<T, E, F>(&self, id: &AccountId, change: F) -> Result<T, E>
    where
        F: FnOnce(&mut Account) -> Result<T, E>,
        E: From<RepositoryError>;
    fn fetch_account(&self, id: &AccountId) -> Result<Option<Account>, RepositoryError>;
    fn find_account_by_email(&self, email: &str) -> Result<Option<Account>, RepositoryError>;
    fn find_account_by_username(&self, username: &str)
        -> Result<Option<Account>, RepositoryError>;
    fn accounts(&self) -> Result<Vec<Account>, RepositoryError>;

    fn insert_service(&self, service: Service) -> Result<Service, RepositoryError>;
    fn update_service(&self, service: Service) -> Result<(), RepositoryError>;
    fn fetch_service(&self, id: &ServiceId) -> Result<Option<Service>, RepositoryError>;
    fn remove_service(&self, id: &ServiceId) -> Result<Service, RepositoryError>;
    fn services(&self) -> Result<Vec<Service>, RepositoryError>;

    fn insert_request(&self, request: ServiceRequest) -> Result<ServiceRequest, RepositoryError>;
    fn update_request(&self, request: ServiceRequest) -> Result<(), RepositoryError>;
    fn fetch_request(&self, id: &RequestId) -> Result<Option<ServiceRequest>, RepositoryError>;
    fn remove_request(&self, id: &RequestId) -> Result<ServiceRequest, RepositoryError>;
    fn requests(&self) -> Result<Vec<ServiceRequest>, RepositoryError>;

    fn insert_subscription(
        &self,
        subscription: Subscription,
    ) -> Result<Subscription, RepositoryError>;
    fn update_subscription(&self, subscription: Subscription) -> Result<(), RepositoryError>;
    fn fetch_subscription(
        &self,
        id: &SubscriptionId,
    ) -> Result<Option<Subscription>, RepositoryError>;
    fn subscriptions(&self) -> Result<Vec<Subscription>, RepositoryError>;
}

/// Error enumeration for repository failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}
