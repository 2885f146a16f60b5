//! Services marketplace: accounts, posted services, requests, reviews, and wallets.
//!
//! Entities live in [`domain`]; [`service::Marketplace`] applies the role and
//! ownership rules on top of a [`repository::MarketplaceRepository`], and
//! [`router`] exposes the catalogue form and the JSON booking API.

pub mod domain;
pub mod fixture;
pub mod repository;
pub mod router;
pub mod service;
pub mod store;
pub mod validation;

#[cfg(test)]
mod tests;

pub use domain::{
    Account, AccountError, AccountId, AccountProfile, AccountProfileView, AccountRegistration,
    AccountUpdate, CardDetails, Notification, NotificationId, PasswordError, PasswordHash,
    PriceRange, Rating, Report, ReportError, RequestId, RequestStatus, Review, ReviewDraft,
    ReviewId, Role, Schedule, Service, ServiceDraft, ServiceId, ServiceRequest, ServiceUpdate,
    Subscription, SubscriptionId, TransitionError, Wallet, WalletDraft, WalletView,
};
pub use fixture::{generate_fixture, Fixture, FixtureError, FixtureSummary, SeedOptions};
pub use repository::{MarketplaceRepository, RepositoryError};
pub use router::{api_router, catalogue_router, marketplace_router};
pub use service::{BookingDraft, LoginOutcome, Marketplace, MarketplaceError, ServiceFilter};
pub use store::InMemoryRepository;
pub use validation::{check_password_policy, PasswordRule, ValidationError};
