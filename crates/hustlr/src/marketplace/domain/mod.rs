//! Canonical marketplace entities.
//!
//! Every entity is built through a validating constructor and exposes
//! validate-then-commit setters; there is no way to hold a partially valid value.

pub mod account;
pub mod notification;
pub mod report;
pub mod request;
pub mod review;
pub mod service;
pub mod subscription;
pub mod wallet;

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! identifier {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            /// Mint a fresh random identifier.
            pub fn generate() -> Self {
                Self(format!("{}-{}", $prefix, uuid::Uuid::new_v4()))
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }
    };
}

identifier!(
    /// Identifier wrapper for consumer and provider accounts.
    AccountId,
    "acct"
);
identifier!(
    /// Identifier wrapper for posted services.
    ServiceId,
    "svc"
);
identifier!(
    /// Identifier wrapper for service requests (bookings).
    RequestId,
    "req"
);
identifier!(ReviewId, "rev");
identifier!(NotificationId, "ntf");
identifier!(
    /// Transaction identifier of a subscription.
    SubscriptionId,
    "sub"
);
identifier!(ReportId, "rpt");

pub use account::{
    Account, AccountError, AccountProfile, AccountProfileView, AccountRegistration, AccountUpdate,
    PasswordError, PasswordHash, Role,
};
pub use notification::Notification;
pub use report::{Report, ReportError};
pub use request::{RequestStatus, Schedule, ServiceRequest, TransitionError};
pub use review::{Rating, Review, ReviewDraft};
pub use service::{PriceRange, Service, ServiceDraft, ServiceUpdate};
pub use subscription::Subscription;
pub use wallet::{CardDetails, Wallet, WalletDraft, WalletView};
