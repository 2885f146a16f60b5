//! JSON fixture documents that seed the in-memory repository.
//!
//! Every record passes through the same validating constructors the HTTP
//! surface uses, so a fixture can never smuggle in a malformed entity.

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;

use chrono::{DateTime, Duration, Local, NaiveDate, NaiveTime, Utc};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::domain::{
    Account, AccountId, AccountProfile, PasswordError, PasswordHash, RequestId, RequestStatus,
    Role, Schedule, Service, ServiceDraft, ServiceId, ServiceRequest, Subscription,
    SubscriptionId,
};
use super::repository::{MarketplaceRepository, RepositoryError};
use super::store::InMemoryRepository;
use super::validation::ValidationError;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Fixture {
    #[serde(default)]
    pub users: Vec<FixtureUser>,
    #[serde(default)]
    pub services: Vec<FixtureService>,
    #[serde(default)]
    pub bookings: Vec<FixtureBooking>,
    #[serde(default)]
    pub subscriptions: Vec<FixtureSubscription>,
}

/// Stored account; carries either a bcrypt `password_hash` or a plain seed `password`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FixtureUser {
    pub id: AccountId,
    #[serde(flatten)]
    pub profile: AccountProfile,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password_hash: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FixtureService {
    pub id: ServiceId,
    pub provider_id: AccountId,
    pub category: String,
    pub description: String,
    pub min_price: f64,
    pub max_price: f64,
    pub posted_on: NaiveDate,
    #[serde(default)]
    pub completed: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FixtureBooking {
    pub id: RequestId,
    pub consumer_id: AccountId,
    pub service_id: ServiceId,
    pub provider_id: AccountId,
    pub status: RequestStatus,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schedule: Option<Schedule>,
    pub price: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FixtureSubscription {
    pub transaction_id: SubscriptionId,
    pub consumer_id: AccountId,
    pub request_id: RequestId,
    pub amount: f64,
    pub started_on: NaiveDate,
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

/// Record counts reported after a fixture load.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FixtureSummary {
    pub users: usize,
    pub services: usize,
    pub bookings: usize,
    pub subscriptions: usize,
}

#[derive(Debug, thiserror::Error)]
pub enum FixtureError {
    #[error("failed to read fixture: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed fixture JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("{collection}[{index}] is invalid: {source}")]
    InvalidRecord {
        collection: &'static str,
        index: usize,
        #[source]
        source: ValidationError,
    },
    #[error("users[{index}] has unusable credentials: {source}")]
    Credentials {
        index: usize,
        #[source]
        source: PasswordError,
    },
    #[error("users[{index}] needs either password_hash or password")]
    MissingCredentials { index: usize },
    #[error("{collection}[{index}] references {detail}")]
    DanglingReference {
        collection: &'static str,
        index: usize,
        detail: String,
    },
    #[error("{collection}[{index}] duplicates {detail}")]
    Duplicate {
        collection: &'static str,
        index: usize,
        detail: String,
    },
    #[error("failed to store fixture records: {0}")]
    Repository(#[from] RepositoryError),
}

impl Fixture {
    pub fn from_json(raw: &str) -> Result<Self, FixtureError> {
        Ok(serde_json::from_str(raw)?)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, FixtureError> {
        let raw = fs::read_to_string(path)?;
        Self::from_json(&raw)
    }

    pub fn to_json(&self) -> Result<String, FixtureError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), FixtureError> {
        fs::write(path, self.to_json()?)?;
        Ok(())
    }

    /// Rebuild the document from live records; credentials are exported as hashes.
    pub fn from_records(
        accounts: &[Account],
        services: &[Service],
        requests: &[ServiceRequest],
        subscriptions: &[Subscription],
    ) -> Self {
        Self {
            users: accounts
                .iter()
                .map(|account| FixtureUser {
                    id: account.id().clone(),
                    profile: account.profile().clone(),
                    password_hash: Some(account.password_hash().as_str().to_string()),
                    password: None,
                })
                .collect(),
            services: services
                .iter()
                .map(|service| FixtureService {
                    id: service.id().clone(),
                    provider_id: service.provider_id().clone(),
                    category: service.category().to_string(),
                    description: service.description().to_string(),
                    min_price: service.price().min(),
                    max_price: service.price().max(),
                    posted_on: service.posted_on(),
                    completed: service.is_completed(),
                })
                .collect(),
            bookings: requests
                .iter()
                .map(|request| FixtureBooking {
                    id: request.id().clone(),
                    consumer_id: request.consumer_id().clone(),
                    service_id: request.service_id().clone(),
                    provider_id: request.provider_id().clone(),
                    status: request.status(),
                    created_at: request.created_at(),
                    schedule: request.schedule(),
                    price: request.price(),
                })
                .collect(),
            subscriptions: subscriptions
                .iter()
                .map(|subscription| FixtureSubscription {
                    transaction_id: subscription.transaction_id().clone(),
                    consumer_id: subscription.consumer_id().clone(),
                    request_id: subscription.request_id().clone(),
                    amount: subscription.amount(),
                    started_on: subscription.started_on(),
                    active: subscription.is_active(),
                })
                .collect(),
        }
    }

    /// Validate every record and its references, then insert them into `repository`.
    ///
    /// Nothing is written unless the whole document is valid. Seed passwords are
    /// hashed at `cost`.
    pub fn load_into<R>(self, repository: &R, cost: u32) -> Result<FixtureSummary, FixtureError>
    where
        R: MarketplaceRepository + ?Sized,
    {
        let accounts = self.build_accounts(cost)?;
        let roles: HashMap<&AccountId, Role> = accounts
            .iter()
            .map(|account| (account.id(), account.role()))
            .collect();

        let mut services = Vec::with_capacity(self.services.len());
        for (index, record) in self.services.iter().enumerate() {
            expect_role(&roles, &record.provider_id, Role::Provider, "services", index)?;
            let draft = ServiceDraft {
                category: record.category.clone(),
                description: record.description.clone(),
                min_price: record.min_price,
                max_price: record.max_price,
            };
            let service = Service::restore(
                record.id.clone(),
                record.provider_id.clone(),
                draft,
                record.posted_on,
                record.completed,
            )
            .map_err(|source| invalid("services", index, source))?;
            services.push(service);
        }

        let owners: HashMap<&ServiceId, &AccountId> = services
            .iter()
            .map(|service| (service.id(), service.provider_id()))
            .collect();

        let mut requests = Vec::with_capacity(self.bookings.len());
        for (index, record) in self.bookings.iter().enumerate() {
            let owner = owners.get(&record.service_id).ok_or_else(|| {
                FixtureError::DanglingReference {
                    collection: "bookings",
                    index,
                    detail: format!("unknown service {}", record.service_id),
                }
            })?;
            expect_role(&roles, &record.consumer_id, Role::Consumer, "bookings", index)?;
            if *owner != &record.provider_id {
                return Err(FixtureError::DanglingReference {
                    collection: "bookings",
                    index,
                    detail: format!(
                        "provider {} who does not own service {}",
                        record.provider_id, record.service_id
                    ),
                });
            }
            let request = ServiceRequest::restore(
                record.id.clone(),
                record.consumer_id.clone(),
                record.service_id.clone(),
                record.provider_id.clone(),
                record.status,
                record.created_at,
                record.schedule,
                record.price,
            )
            .map_err(|source| invalid("bookings", index, source))?;
            requests.push(request);
        }

        let mut subscriptions = Vec::with_capacity(self.subscriptions.len());
        for (index, record) in self.subscriptions.iter().enumerate() {
            expect_role(&roles, &record.consumer_id, Role::Consumer, "subscriptions", index)?;
            let linked = requests
                .iter()
                .find(|request| request.id() == &record.request_id)
                .ok_or_else(|| FixtureError::DanglingReference {
                    collection: "subscriptions",
                    index,
                    detail: format!("unknown booking {}", record.request_id),
                })?;
            if linked.consumer_id() != &record.consumer_id {
                return Err(FixtureError::DanglingReference {
                    collection: "subscriptions",
                    index,
                    detail: format!(
                        "booking {} that belongs to another consumer",
                        record.request_id
                    ),
                });
            }
            let subscription = Subscription::restore(
                record.transaction_id.clone(),
                record.consumer_id.clone(),
                record.request_id.clone(),
                record.amount,
                record.started_on,
                record.active,
            )
            .map_err(|source| invalid("subscriptions", index, source))?;
            subscriptions.push(subscription);
        }

        ensure_unique(repository, &accounts, &services, &requests, &subscriptions)?;

        let summary = FixtureSummary {
            users: accounts.len(),
            services: services.len(),
            bookings: requests.len(),
            subscriptions: subscriptions.len(),
        };

        for account in accounts {
            repository.insert_account(account)?;
        }
        for service in services {
            repository.insert_service(service)?;
        }
        for request in requests {
            repository.insert_request(request)?;
        }
        for subscription in subscriptions {
            repository.insert_subscription(subscription)?;
        }

        tracing::info!(
            users = summary.users,
            services = summary.services,
            bookings = summary.bookings,
            subscriptions = summary.subscriptions,
            "fixture loaded"
        );
        Ok(summary)
    }

    /// Build a fresh in-memory repository seeded with this document.
    pub fn into_repository(self, cost: u32) -> Result<InMemoryRepository, FixtureError> {
        let repository = InMemoryRepository::new();
        self.load_into(&repository, cost)?;
        Ok(repository)
    }

    fn build_accounts(&self, cost: u32) -> Result<Vec<Account>, FixtureError> {
        let mut accounts = Vec::with_capacity(self.users.len());
        for (index, record) in self.users.iter().enumerate() {
            let password = match (&record.password_hash, &record.password) {
                (Some(hash), _) => PasswordHash::from_stored(hash.clone()),
                (None, Some(plain)) => PasswordHash::create(plain, cost),
                (None, None) => return Err(FixtureError::MissingCredentials { index }),
            }
            .map_err(|source| FixtureError::Credentials { index, source })?;
            let account = Account::restore(record.id.clone(), record.profile.clone(), password)
                .map_err(|source| invalid("users", index, source))?;
            accounts.push(account);
        }
        Ok(accounts)
    }
}

/// Reject ids, emails or usernames that repeat within the document or clash
/// with rows already in `repository`.
fn ensure_unique<R>(
    repository: &R,
    accounts: &[Account],
    services: &[Service],
    requests: &[ServiceRequest],
    subscriptions: &[Subscription],
) -> Result<(), FixtureError>
where
    R: MarketplaceRepository + ?Sized,
{
    let existing = repository.accounts()?;
    let mut ids: HashSet<String> = existing
        .iter()
        .map(|account| account.id().to_string())
        .collect();
    let mut emails: HashSet<String> = existing
        .iter()
        .map(|account| account.email().to_ascii_lowercase())
        .collect();
    let mut usernames: HashSet<String> = existing
        .iter()
        .map(|account| account.username().to_ascii_lowercase())
        .collect();
    for (index, account) in accounts.iter().enumerate() {
        claim(&mut ids, account.id().to_string(), "users", index, "id")?;
        let email = account.email().to_ascii_lowercase();
        claim(&mut emails, email, "users", index, "email")?;
        let username = account.username().to_ascii_lowercase();
        claim(&mut usernames, username, "users", index, "username")?;
    }

    let mut ids: HashSet<String> = repository
        .services()?
        .iter()
        .map(|service| service.id().to_string())
        .collect();
    for (index, service) in services.iter().enumerate() {
        claim(&mut ids, service.id().to_string(), "services", index, "id")?;
    }

    let mut ids: HashSet<String> = repository
        .requests()?
        .iter()
        .map(|request| request.id().to_string())
        .collect();
    for (index, request) in requests.iter().enumerate() {
        claim(&mut ids, request.id().to_string(), "bookings", index, "id")?;
    }

    let mut ids: HashSet<String> = repository
        .subscriptions()?
        .iter()
        .map(|subscription| subscription.transaction_id().to_string())
        .collect();
    for (index, subscription) in subscriptions.iter().enumerate() {
        claim(
            &mut ids,
            subscription.transaction_id().to_string(),
            "subscriptions",
            index,
            "transaction id",
        )?;
    }
    Ok(())
}

fn claim(
    seen: &mut HashSet<String>,
    key: String,
    collection: &'static str,
    index: usize,
    field: &str,
) -> Result<(), FixtureError> {
    if seen.contains(&key) {
        return Err(FixtureError::Duplicate {
            collection,
            index,
            detail: format!("{field} {key}"),
        });
    }
    seen.insert(key);
    Ok(())
}

fn invalid(collection: &'static str, index: usize, source: ValidationError) -> FixtureError {
    FixtureError::InvalidRecord {
        collection,
        index,
        source,
    }
}

fn expect_role(
    roles: &HashMap<&AccountId, Role>,
    id: &AccountId,
    role: Role,
    collection: &'static str,
    index: usize,
) -> Result<(), FixtureError> {
    match roles.get(id) {
        Some(found) if *found == role => Ok(()),
        Some(found) => Err(FixtureError::DanglingReference {
            collection,
            index,
            detail: format!("{found} account {id} where a {role} is required"),
        }),
        None => Err(FixtureError::DanglingReference {
            collection,
            index,
            detail: format!("unknown account {id}"),
        }),
    }
}

/// Sizes for a generated fixture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeedOptions {
    pub users: usize,
    pub services: usize,
    pub bookings: usize,
}

impl Default for SeedOptions {
    fn default() -> Self {
        Self {
            users: 10,
            services: 12,
            bookings: 20,
        }
    }
}

const FIRST_NAMES: &[&str] = &[
    "Olivia", "Liam", "Charlotte", "Noah", "Amelia", "Jack", "Isla", "William", "Mia", "Oliver",
    "Ava", "Henry",
];
const LAST_NAMES: &[&str] = &[
    "Smith", "Nguyen", "Brown", "Wilson", "Taylor", "Martin", "O'Connor", "Walker", "White",
    "Kelly",
];
const STREETS: &[&str] = &[
    "George St", "Collins St", "Queen St", "King William St", "Hay St", "Murray St",
];
const CITIES: &[&str] = &["Sydney", "Melbourne", "Brisbane", "Adelaide", "Perth", "Hobart"];
const CATEGORIES: &[(&str, &str)] = &[
    ("Plumbing", "Leak repairs, tap replacements and blocked drains"),
    ("Gardening", "Lawn mowing, hedge trimming and green waste removal"),
    ("House Cleaning", "Weekly or fortnightly whole-home cleaning"),
    ("Dog Walking", "Thirty minute neighbourhood walks for one or two dogs"),
    ("Tutoring", "High school maths and science tutoring"),
    ("Electrical", "Licensed electrician for lighting and power points"),
    ("Painting", "Interior feature walls and touch ups"),
    ("Removals", "Small apartment moves with a two person crew"),
];

/// Generate a random but fully valid fixture.
///
/// Accounts alternate between provider and consumer so both roles exist once
/// `users >= 2`; every generated user shares `password_hash`.
pub fn generate_fixture<G: Rng + ?Sized>(
    options: SeedOptions,
    password_hash: &PasswordHash,
    rng: &mut G,
) -> Fixture {
    let today = Local::now().date_naive();
    let mut fixture = Fixture::default();

    for index in 0..options.users {
        let role = if index % 2 == 0 {
            Role::Provider
        } else {
            Role::Consumer
        };
        let first_name = pick(FIRST_NAMES, rng, "Sam");
        let last_name = pick(LAST_NAMES, rng, "Lee");
        let slug: String = format!("{first_name}.{last_name}")
            .chars()
            .filter(|c| c.is_ascii_alphanumeric() || *c == '.')
            .collect::<String>()
            .to_ascii_lowercase();
        let username: String = format!("{}{}", slug.chars().take(14).collect::<String>(), index);
        let date_of_birth =
            today - Duration::days(rng.gen_range(18 * 365..70 * 365));
        fixture.users.push(FixtureUser {
            id: AccountId::generate(),
            profile: AccountProfile {
                role,
                first_name: first_name.to_string(),
                last_name: last_name.to_string(),
                date_of_birth,
                address: format!(
                    "{} {}, {}",
                    rng.gen_range(1..400),
                    pick(STREETS, rng, "High St"),
                    pick(CITIES, rng, "Sydney")
                ),
                phone: format!("04{:08}", rng.gen_range(0..100_000_000u32)),
                email: format!("{username}@example.com"),
                username,
            },
            password_hash: Some(password_hash.as_str().to_string()),
            password: None,
        });
    }

    let providers: Vec<AccountId> = ids_with_role(&fixture.users, Role::Provider);
    let consumers: Vec<AccountId> = ids_with_role(&fixture.users, Role::Consumer);

    if !providers.is_empty() {
        for _ in 0..options.services {
            let (category, description) = CATEGORIES
                .choose(rng)
                .copied()
                .unwrap_or(("Handyman", "General odd jobs around the home"));
            let min_price = f64::from(rng.gen_range(2..20u32) * 10);
            let max_price = min_price + f64::from(rng.gen_range(0..15u32) * 10);
            fixture.services.push(FixtureService {
                id: ServiceId::generate(),
                provider_id: providers[rng.gen_range(0..providers.len())].clone(),
                category: category.to_string(),
                description: description.to_string(),
                min_price,
                max_price,
                posted_on: today - Duration::days(rng.gen_range(0..120)),
                completed: false,
            });
        }
    }

    if !consumers.is_empty() && !fixture.services.is_empty() {
        const STATUSES: [RequestStatus; 5] = [
            RequestStatus::Pending,
            RequestStatus::Accepted,
            RequestStatus::Denied,
            RequestStatus::Completed,
            RequestStatus::Cancelled,
        ];
        for _ in 0..options.bookings {
            let service = &fixture.services[rng.gen_range(0..fixture.services.len())];
            let price = rng.gen_range(service.min_price..=service.max_price).round();
            let date = today + Duration::days(rng.gen_range(1..60));
            let time = NaiveTime::from_hms_opt(rng.gen_range(8..18), 0, 0);
            fixture.bookings.push(FixtureBooking {
                id: RequestId::generate(),
                consumer_id: consumers[rng.gen_range(0..consumers.len())].clone(),
                service_id: service.id.clone(),
                provider_id: service.provider_id.clone(),
                status: STATUSES[rng.gen_range(0..STATUSES.len())],
                created_at: Utc::now() - Duration::hours(rng.gen_range(1..24 * 30)),
                schedule: time.map(|time| Schedule { date, time }),
                price,
            });
        }

        let accepted: Vec<&FixtureBooking> = fixture
            .bookings
            .iter()
            .filter(|booking| booking.status == RequestStatus::Accepted)
            .collect();
        fixture.subscriptions = accepted
            .into_iter()
            .take(3)
            .map(|booking| FixtureSubscription {
                transaction_id: SubscriptionId::generate(),
                consumer_id: booking.consumer_id.clone(),
                request_id: booking.id.clone(),
                amount: booking.price,
                started_on: today,
                active: true,
            })
            .collect();
    }

    fixture
}

fn pick<'a, G: Rng + ?Sized>(pool: &[&'a str], rng: &mut G, fallback: &'a str) -> &'a str {
    pool.choose(rng).copied().unwrap_or(fallback)
}

fn ids_with_role(users: &[FixtureUser], role: Role) -> Vec<AccountId> {
    users
        .iter()
        .filter(|user| user.profile.role == role)
        .map(|user| user.id.clone())
        .collect()
}
