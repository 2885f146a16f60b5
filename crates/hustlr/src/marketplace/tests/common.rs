use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request};
use axum::response::Response;
use chrono::NaiveDate;
use serde_json::Value;

use crate::marketplace::domain::{
    Account, AccountId, AccountProfile, AccountRegistration, RequestId, Role, Service,
    ServiceDraft, ServiceId, ServiceRequest, Subscription, SubscriptionId,
};
use crate::marketplace::repository::{MarketplaceRepository, RepositoryError};
use crate::marketplace::service::Marketplace;
use crate::marketplace::store::InMemoryRepository;

pub(super) const COST: u32 = 4;
pub(super) const PASSWORD: &str = "Passw0rd!";

pub(super) fn profile(role: Role, username: &str) -> AccountProfile {
    AccountProfile {
        role,
        first_name: "Alex".to_string(),
        last_name: "Morgan".to_string(),
        date_of_birth: NaiveDate::from_ymd_opt(1990, 6, 15).expect("valid date"),
        address: "21 Beach Rd, Manly".to_string(),
        phone: "0400 111 222".to_string(),
        email: format!("{username}@example.com"),
        username: username.to_string(),
    }
}

pub(super) fn registration(role: Role, username: &str) -> AccountRegistration {
    AccountRegistration {
        profile: profile(role, username),
        password: PASSWORD.to_string(),
    }
}

pub(super) fn service_draft(category: &str) -> ServiceDraft {
    ServiceDraft {
        category: category.to_string(),
        description: "Blocked drains cleared and leaking taps repaired".to_string(),
        min_price: 80.0,
        max_price: 150.0,
    }
}

pub(super) fn build_marketplace() -> (Marketplace<InMemoryRepository>, Arc<InMemoryRepository>) {
    let repository = Arc::new(InMemoryRepository::new());
    let marketplace = Marketplace::new(repository.clone(), COST);
    (marketplace, repository)
}

/// A marketplace holding one provider, one consumer, and one posted service.
pub(super) struct Seeded {
    pub(super) marketplace: Arc<Marketplace<InMemoryRepository>>,
    pub(super) provider: Account,
    pub(super) consumer: Account,
    pub(super) service: Service,
}

pub(super) fn seeded() -> Seeded {
    let (marketplace, _) = build_marketplace();
    let provider = marketplace
        .register(registration(Role::Provider, "pat_plumber"))
        .expect("provider registers");
    let consumer = marketplace
        .register(registration(Role::Consumer, "casey_c"))
        .expect("consumer registers");
    let service = marketplace
        .create_service(provider.id(), service_draft("Plumbing"))
        .expect("service posts");
    Seeded {
        marketplace: Arc::new(marketplace),
        provider,
        consumer,
        service,
    }
}

pub(super) struct UnavailableRepository;

fn offline<T>() -> Result<T, RepositoryError> {
    Err(RepositoryError::Unavailable("database offline".to_string()))
}

impl MarketplaceRepository for UnavailableRepository {
    fn insert_account(&self, _account: Account) -> Result<Account, RepositoryError> {
        offline()
    }

    fn modify_account<T, E, F>(&self, _id: &AccountId, _change: F) -> Result<T, E>
    where
        F: FnOnce(&mut Account) -> Result<T, E>,
        E: From<RepositoryError>,
    {
        Err(RepositoryError::Unavailable("database offline".to_string()).into())
    }

    fn fetch_account(&self, _id: &AccountId) -> Result<Option<Account>, RepositoryError> {
        offline()
    }

    fn find_account_by_email(&self, _email: &str) -> Result<Option<Account>, RepositoryError> {
        offline()
    }

    fn find_account_by_username(
        &self,
        _username: &str,
    ) -> Result<Option<Account>, RepositoryError> {
        offline()
    }

    fn accounts(&self) -> Result<Vec<Account>, RepositoryError> {
        offline()
    }

    fn insert_service(&self, _service: Service) -> Result<Service, RepositoryError> {
        offline()
    }

    fn update_service(&self, _service: Service) -> Result<(), RepositoryError> {
        offline()
    }

    fn fetch_service(&self, _id: &ServiceId) -> Result<Option<Service>, RepositoryError> {
        offline()
    }

    fn remove_service(&self, _id: &ServiceId) -> Result<Service, RepositoryError> {
        offline()
    }

    fn services(&self) -> Result<Vec<Service>, RepositoryError> {
        offline()
    }

    fn insert_request(&self, _request: ServiceRequest) -> Result<ServiceRequest, RepositoryError> {
        offline()
    }

    fn update_request(&self, _request: ServiceRequest) -> Result<(), RepositoryError> {
        offline()
    }

    fn fetch_request(&self, _id: &RequestId) -> Result<Option<ServiceRequest>, RepositoryError> {
        offline()
    }

    fn remove_request(&self, _id: &RequestId) -> Result<ServiceRequest, RepositoryError> {
        offline()
    }

    fn requests(&self) -> Result<Vec<ServiceRequest>, RepositoryError> {
        offline()
    }

    fn insert_subscription(
        &self,
        _subscription: Subscription,
    ) -> Result<Subscription, RepositoryError> {
        offline()
    }

    fn update_subscription(&self, _subscription: Subscription) -> Result<(), RepositoryError> {
        offline()
    }

    fn fetch_subscription(
        &self,
        _id: &SubscriptionId,
    ) -> Result<Option<Subscription>, RepositoryError> {
        offline()
    }

    fn subscriptions(&self) -> Result<Vec<Subscription>, RepositoryError> {
        offline()
    }
}

pub(super) fn json_request(method: &str, uri: &str, payload: &Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(serde_json::to_vec(payload).expect("serialize payload")))
        .expect("build request")
}

pub(super) fn form_request(uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(body.to_string()))
        .expect("build request")
}

pub(super) fn empty_request(method: &str, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .expect("build request")
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
