use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::notification::Notification;
use super::report::Report;
use super::review::{Review, ReviewDraft};
use super::wallet::{Wallet, WalletView};
use super::{AccountId, NotificationId, ReviewId};
use crate::marketplace::validation::{
    check_password_policy, formatted, required, Pattern, ValidationError,
};

/// Capability tag deciding which marketplace operations an account may perform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Consumer,
    #[serde(alias = "business")]
    Provider,
}

impl Role {
    pub const fn label(self) -> &'static str {
        match self {
            Role::Consumer => "consumer",
            Role::Provider => "provider",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "consumer" => Some(Role::Consumer),
            "provider" | "business" => Some(Role::Provider),
            _ => None,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PasswordError {
    #[error(transparent)]
    Policy(#[from] ValidationError),
    #[error("failed to hash password: {0}")]
    Hash(#[from] bcrypt::BcryptError),
    #[error("stored password hash is not a bcrypt hash")]
    MalformedHash,
}

/// Salted bcrypt hash; the plain password is never retained.
#[derive(Clone, PartialEq, Eq)]
pub struct PasswordHash(String);

impl PasswordHash {
    pub fn create(plain: &str, cost: u32) -> Result<Self, PasswordError> {
        check_password_policy(plain)?;
        let hashed = bcrypt::hash(plain, cost)?;
        Ok(Self(hashed))
    }

    pub fn from_stored(hash: impl Into<String>) -> Result<Self, PasswordError> {
        let hash = hash.into();
        let recognised = ["$2a$", "$2b$", "$2x$", "$2y$"]
            .iter()
            .any(|prefix| hash.starts_with(prefix));
        if recognised && hash.len() == 60 {
            Ok(Self(hash))
        } else {
            Err(PasswordError::MalformedHash)
        }
    }

    pub fn verify(&self, candidate: &str) -> bool {
        bcrypt::verify(candidate, &self.0).unwrap_or(false)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for PasswordHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PasswordHash(<redacted>)")
    }
}

/// Identity fields shared by registration and stored accounts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountProfile {
    pub role: Role,
    pub first_name: String,
    pub last_name: String,
    pub date_of_birth: NaiveDate,
    pub address: String,
    pub phone: String,
    pub email: String,
    pub username: String,
}

/// Sign-up payload: profile fields plus the plain password.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AccountRegistration {
    #[serde(flatten)]
    pub profile: AccountProfile,
    pub password: String,
}

/// Partial profile edit applied by [`Account::update_details`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountUpdate {
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub date_of_birth: Option<NaiveDate>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum AccountError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Password(#[from] PasswordError),
    #[error("review index {index} is out of range ({len} reviews)")]
    ReviewIndex { index: usize, len: usize },
    #[error("review {0} not found on this account")]
    ReviewNotFound(ReviewId),
    #[error("notification {0} not found on this account")]
    NotificationNotFound(NotificationId),
}

/// Identity record for consumers and providers.
#[derive(Debug, Clone)]
pub struct Account {
    id: AccountId,
    profile: AccountProfile,
    password: PasswordHash,
    notifications: Vec<Notification>,
    reviews: Vec<Review>,
    wallet: Option<Wallet>,
}

impl Account {
    pub fn register(registration: AccountRegistration, cost: u32) -> Result<Self, AccountError> {
        let AccountRegistration { profile, password } = registration;
        validate_profile(&profile)?;
        let password = PasswordHash::create(&password, cost)?;
        Ok(Self {
            id: AccountId::generate(),
            profile,
            password,
            notifications: Vec::new(),
            reviews: Vec::new(),
            wallet: None,
        })
    }

    /// Rebuild a stored account, re-validating its profile.
    pub fn restore(
        id: AccountId,
        profile: AccountProfile,
        password: PasswordHash,
    ) -> Result<Self, ValidationError> {
        if id.as_str().trim().is_empty() {
            return Err(ValidationError::Empty { field: "account_id" });
        }
        validate_profile(&profile)?;
        Ok(Self {
            id,
            profile,
            password,
            notifications: Vec::new(),
            reviews: Vec::new(),
            wallet: None,
        })
    }

    pub fn id(&self) -> &AccountId {
        &self.id
    }

    pub fn role(&self) -> Role {
        self.profile.role
    }

    pub fn profile(&self) -> &AccountProfile {
        &self.profile
    }

    pub fn first_name(&self) -> &str {
        &self.profile.first_name
    }

    pub fn last_name(&self) -> &str {
        &self.profile.last_name
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.profile.first_name, self.profile.last_name)
    }

    pub fn date_of_birth(&self) -> NaiveDate {
        self.profile.date_of_birth
    }

    pub fn address(&self) -> &str {
        &self.profile.address
    }

    pub fn phone(&self) -> &str {
        &self.profile.phone
    }

    pub fn email(&self) -> &str {
        &self.profile.email
    }

    pub fn username(&self) -> &str {
        &self.profile.username
    }

    pub fn password_hash(&self) -> &PasswordHash {
        &self.password
    }

    pub fn notifications(&self) -> &[Notification] {
        &self.notifications
    }

    pub fn reviews(&self) -> &[Review] {
        &self.reviews
    }

    pub fn wallet(&self) -> Option<&Wallet> {
        self.wallet.as_ref()
    }

    /// Mean rating across received reviews, `0.0` until the first review lands.
    pub fn community_rating(&self) -> f64 {
        if self.reviews.is_empty() {
            return 0.0;
        }
        let total: u32 = self
            .reviews
            .iter()
            .map(|review| u32::from(review.rating().value()))
            .sum();
        f64::from(total) / self.reviews.len() as f64
    }

    pub fn set_first_name(&mut self, name: impl Into<String>) -> Result<(), ValidationError> {
        let name = name.into();
        validate_name("first_name", &name)?;
        self.profile.first_name = name;
        Ok(())
    }

    pub fn set_last_name(&mut self, name: impl Into<String>) -> Result<(), ValidationError> {
        let name = name.into();
        validate_name("last_name", &name)?;
        self.profile.last_name = name;
        Ok(())
    }

    pub fn set_date_of_birth(&mut self, date_of_birth: NaiveDate) -> Result<(), ValidationError> {
        validate_date_of_birth(date_of_birth)?;
        self.profile.date_of_birth = date_of_birth;
        Ok(())
    }

    pub fn set_address(&mut self, address: impl Into<String>) -> Result<(), ValidationError> {
        let address = address.into();
        required("address", &address)?;
        self.profile.address = address;
        Ok(())
    }

    pub fn set_phone(&mut self, phone: impl Into<String>) -> Result<(), ValidationError> {
        let phone = phone.into();
        formatted("phone", &phone, Pattern::Phone)?;
        self.profile.phone = phone;
        Ok(())
    }

    pub fn set_email(&mut self, email: impl Into<String>) -> Result<(), ValidationError> {
        let email = email.into();
        formatted("email", &email, Pattern::Email)?;
        self.profile.email = email;
        Ok(())
    }

    pub fn set_username(&mut self, username: impl Into<String>) -> Result<(), ValidationError> {
        let username = username.into();
        formatted("username", &username, Pattern::Username)?;
        self.profile.username = username;
        Ok(())
    }

    pub fn change_password(&mut self, plain: &str, cost: u32) -> Result<(), PasswordError> {
        self.password = PasswordHash::create(plain, cost)?;
        Ok(())
    }

    pub fn verify_password(&self, candidate: &str) -> bool {
        self.password.verify(candidate)
    }

    /// Apply several profile edits at once; nothing is written unless all of them pass.
    pub fn update_details(&mut self, update: AccountUpdate) -> Result<(), ValidationError> {
        let mut staged = self.profile.clone();
        if let Some(first_name) = update.first_name {
            validate_name("first_name", &first_name)?;
            staged.first_name = first_name;
        }
        if let Some(last_name) = update.last_name {
            validate_name("last_name", &last_name)?;
            staged.last_name = last_name;
        }
        if let Some(date_of_birth) = update.date_of_birth {
            validate_date_of_birth(date_of_birth)?;
            staged.date_of_birth = date_of_birth;
        }
        if let Some(address) = update.address {
            required("address", &address)?;
            staged.address = address;
        }
        if let Some(phone) = update.phone {
            formatted("phone", &phone, Pattern::Phone)?;
            staged.phone = phone;
        }
        if let Some(email) = update.email {
            formatted("email", &email, Pattern::Email)?;
            staged.email = email;
        }
        if let Some(username) = update.username {
            formatted("username", &username, Pattern::Username)?;
            staged.username = username;
        }
        self.profile = staged;
        Ok(())
    }

    pub fn add_review(&mut self, review: Review) {
        self.reviews.push(review);
    }

    pub fn review_index(&self, id: &ReviewId) -> Option<usize> {
        self.reviews.iter().position(|review| review.id() == id)
    }

    pub fn edit_review(&mut self, index: usize, draft: ReviewDraft) -> Result<&Review, AccountError> {
        let len = self.reviews.len();
        let review = self
            .reviews
            .get_mut(index)
            .ok_or(AccountError::ReviewIndex { index, len })?;
        review.revise(draft)?;
        Ok(review)
    }

    pub fn delete_review(&mut self, id: &ReviewId) -> Result<Review, AccountError> {
        let index = self
            .review_index(id)
            .ok_or_else(|| AccountError::ReviewNotFound(id.clone()))?;
        Ok(self.reviews.remove(index))
    }

    pub fn push_notification(&mut self, notification: Notification) {
        self.notifications.push(notification);
    }

    pub fn delete_notification(&mut self, id: &NotificationId) -> Result<Notification, AccountError> {
        let index = self
            .notifications
            .iter()
            .position(|notification| notification.id() == id)
            .ok_or_else(|| AccountError::NotificationNotFound(id.clone()))?;
        Ok(self.notifications.remove(index))
    }

    pub fn attach_wallet(&mut self, wallet: Wallet) {
        self.wallet = Some(wallet);
    }

    /// Account summary covering contact details and activity counts.
    pub fn report(&self) -> Result<Report, ValidationError> {
        let data = vec![
            ("username".to_string(), self.profile.username.clone()),
            ("name".to_string(), self.full_name()),
            ("role".to_string(), self.role().label().to_string()),
            ("email".to_string(), self.profile.email.clone()),
            ("phone".to_string(), self.profile.phone.clone()),
            ("address".to_string(), self.profile.address.clone()),
            (
                "community_rating".to_string(),
                format!("{:.1}", self.community_rating()),
            ),
            (
                "notifications".to_string(),
                self.notifications.len().to_string(),
            ),
            ("reviews".to_string(), self.reviews.len().to_string()),
        ];
        Report::new("Account Summary", data)
    }

    pub fn profile_view(&self) -> AccountProfileView {
        AccountProfileView {
            id: self.id.clone(),
            role: self.role(),
            first_name: self.profile.first_name.clone(),
            last_name: self.profile.last_name.clone(),
            username: self.profile.username.clone(),
            email: self.profile.email.clone(),
            phone: self.profile.phone.clone(),
            community_rating: self.community_rating(),
            review_count: self.reviews.len(),
            notification_count: self.notifications.len(),
            wallet: self.wallet.as_ref().map(Wallet::view),
        }
    }
}

/// Public account representation; never carries the password hash or raw wallet numbers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AccountProfileView {
    pub id: AccountId,
    pub role: Role,
    pub first_name: String,
    pub last_name: String,
    pub username: String,
    pub email: String,
    pub phone: String,
    pub community_rating: f64,
    pub review_count: usize,
    pub notification_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wallet: Option<WalletView>,
}

fn validate_profile(profile: &AccountProfile) -> Result<(), ValidationError> {
    validate_name("first_name", &profile.first_name)?;
    validate_name("last_name", &profile.last_name)?;
    validate_date_of_birth(profile.date_of_birth)?;
    required("address", &profile.address)?;
    formatted("phone", &profile.phone, Pattern::Phone)?;
    formatted("email", &profile.email, Pattern::Email)?;
    formatted("username", &profile.username, Pattern::Username)?;
    Ok(())
}

fn validate_name(field: &'static str, name: &str) -> Result<(), ValidationError> {
    formatted(field, name, Pattern::PersonName)
}

fn validate_date_of_birth(date_of_birth: NaiveDate) -> Result<(), ValidationError> {
    let today = Local::now().date_naive();
    if date_of_birth > today {
        return Err(ValidationError::Range {
            field: "date_of_birth",
            detail: format!("cannot be in the future (found {date_of_birth})"),
        });
    }
    Ok(())
}
