use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Arc, Mutex, MutexGuard};

use super::domain::{
    Account, AccountId, RequestId, Service, ServiceId, ServiceRequest, Subscription,
    SubscriptionId,
};
use super::fixture::Fixture;
use super::repository::{MarketplaceRepository, RepositoryError};

/// Keyed rows that remember the order they were first inserted in.
#[derive(Debug)]
struct Table<K, V> {
    order: Vec<K>,
    rows: HashMap<K, V>,
}

impl<K, V> Default for Table<K, V> {
    fn default() -> Self {
        Self {
            order: Vec::new(),
            rows: HashMap::new(),
        }
    }
}

impl<K, V> Table<K, V>
where
    K: Clone + Eq + Hash,
    V: Clone,
{
    fn insert(&mut self, key: K, value: V) -> Result<V, RepositoryError> {
        if self.rows.contains_key(&key) {
            return Err(RepositoryError::Conflict);
        }
        self.order.push(key.clone());
        self.rows.insert(key, value.clone());
        Ok(value)
    }

    fn replace(&mut self, key: &K, value: V) -> Result<(), RepositoryError> {
        let slot = self.rows.get_mut(key).ok_or(RepositoryError::NotFound)?;
        *slot = value;
        Ok(())
    }

    fn get(&self, key: &K) -> Option<V> {
        self.rows.get(key).cloned()
    }

    fn remove(&mut self, key: &K) -> Result<V, RepositoryError> {
        let removed = self.rows.remove(key).ok_or(RepositoryError::NotFound)?;
        self.order.retain(|existing| existing != key);
        Ok(removed)
    }

    fn values(&self) -> Vec<V> {
        self.order
            .iter()
            .filter_map(|key| self.rows.get(key).cloned())
            .collect()
    }
}

/// Mutex-guarded in-memory implementation of [`MarketplaceRepository`].
///
/// Cloning shares the underlying tables. Tables that reference each other are
/// always locked in the order services, requests, subscriptions.
#[derive(Debug, Default, Clone)]
pub struct InMemoryRepository {
    accounts: Arc<Mutex<Table<AccountId, Account>>>,
    services: Arc<Mutex<Table<ServiceId, Service>>>,
    requests: Arc<Mutex<Table<RequestId, ServiceRequest>>>,
    subscriptions: Arc<Mutex<Table<SubscriptionId, Subscription>>>,
}

fn lock<'a, T>(
    table: &'a Mutex<T>,
    name: &str,
) -> Result<MutexGuard<'a, T>, RepositoryError> {
    table
        .lock()
        .map_err(|_| RepositoryError::Unavailable(format!("{name} table lock poisoned")))
}

fn identity_clash(existing: &Account, candidate: &Account) -> bool {
    existing.id() != candidate.id()
        && (existing.email().eq_ignore_ascii_case(candidate.email())
            || existing.username().eq_ignore_ascii_case(candidate.username()))
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Export every table as a fixture document.
    pub fn snapshot(&self) -> Result<Fixture, RepositoryError> {
        Ok(Fixture::from_records(
            &self.accounts()?,
            &self.services()?,
            &self.requests()?,
            &self.subscriptions()?,
        ))
    }
}

impl MarketplaceRepository for InMemoryRepository {
    fn insert_account(&self, account: Account) -> Result<Account, RepositoryError> {
        let mut accounts = lock(&self.accounts, "accounts")?;
        if accounts
            .rows
            .values()
            .any(|existing| identity_clash(existing, &account))
        {
            return Err(RepositoryError::Conflict);
        }
        accounts.insert(account.id().clone(), account)
    }

    fn modify_account<T, E, F>(&self, id: &AccountId, change: F) -> Result<T, E>
    where
        F: FnOnce(&mut Account) -> Result<T, E>,
        E: From<RepositoryError>,
    {
        let mut accounts = lock(&self.accounts, "accounts")?;
        let mut working = accounts.get(id).ok_or(RepositoryError::NotFound)?;
        let outcome = change(&mut working)?;
        if working.id() != id
            || accounts
                .rows
                .values()
                .any(|existing| identity_clash(existing, &working))
        {
            return Err(RepositoryError::Conflict.into());
        }
        accounts.replace(id, working)?;
        Ok(outcome)
    }

    fn fetch_account(&self, id: &AccountId) -> Result<Option<Account>, RepositoryError> {
        Ok(lock(&self.accounts, "accounts")?.get(id))
    }

    fn find_account_by_email(&self, email: &str) -> Result<Option<Account>, RepositoryError> {
        let accounts = lock(&self.accounts, "accounts")?;
        Ok(accounts
            .rows
            .values()
            .find(|account| account.email().eq_ignore_ascii_case(email.trim()))
            .cloned())
    }

    fn find_account_by_username(
        &self,
        username: &str,
    ) -> Result<Option<Account>, RepositoryError> {
        let accounts = lock(&self.accounts, "accounts")?;
        Ok(accounts
            .rows
            .values()
            .find(|account| account.username().eq_ignore_ascii_case(username.trim()))
            .cloned())
    }

    fn accounts(&self) -> Result<Vec<Account>, RepositoryError> {
        Ok(lock(&self.accounts, "accounts")?.values())
    }

    fn insert_service(&self, service: Service) -> Result<Service, RepositoryError> {
        lock(&self.services, "services")?.insert(service.id().clone(), service)
    }

    fn update_service(&self, service: Service) -> Result<(), RepositoryError> {
        let id = service.id().clone();
        lock(&self.services, "services")?.replace(&id, service)
    }

    fn fetch_service(&self, id: &ServiceId) -> Result<Option<Service>, RepositoryError> {
        Ok(lock(&self.services, "services")?.get(id))
    }

    fn remove_service(&self, id: &ServiceId) -> Result<Service, RepositoryError> {
        let mut services = lock(&self.services, "services")?;
        let requests = lock(&self.requests, "requests")?;
        if requests.rows.values().any(|request| request.service_id() == id) {
            return Err(RepositoryError::Conflict);
        }
        services.remove(id)
    }

    fn services(&self) -> Result<Vec<Service>, RepositoryError> {
        Ok(lock(&self.services, "services")?.values())
    }

    fn insert_request(&self, request: ServiceRequest) -> Result<ServiceRequest, RepositoryError> {
        let services = lock(&self.services, "services")?;
        let mut requests = lock(&self.requests, "requests")?;
        if !services.rows.contains_key(request.service_id()) {
            return Err(RepositoryError::NotFound);
        }
        requests.insert(request.id().clone(), request)
    }

    fn update_request(&self, request: ServiceRequest) -> Result<(), RepositoryError> {
        let id = request.id().clone();
        lock(&self.requests, "requests")?.replace(&id, request)
    }

    fn fetch_request(&self, id: &RequestId) -> Result<Option<ServiceRequest>, RepositoryError> {
        Ok(lock(&self.requests, "requests")?.get(id))
    }

    fn remove_request(&self, id: &RequestId) -> Result<ServiceRequest, RepositoryError> {
        let mut requests = lock(&self.requests, "requests")?;
        let subscriptions = lock(&self.subscriptions, "subscriptions")?;
        if subscriptions
            .rows
            .values()
            .any(|subscription| subscription.request_id() == id)
        {
            return Err(RepositoryError::Conflict);
        }
        requests.remove(id)
    }

    fn requests(&self) -> Result<Vec<ServiceRequest>, RepositoryError> {
        Ok(lock(&self.requests, "requests")?.values())
    }

    fn insert_subscription(
        &self,
        subscription: Subscription,
    ) -> Result<Subscription, RepositoryError> {
        let requests = lock(&self.requests, "requests")?;
        let mut subscriptions = lock(&self.subscriptions, "subscriptions")?;
        if !requests.rows.contains_key(subscription.request_id()) {
            return Err(RepositoryError::NotFound);
        }
        subscriptions.insert(subscription.transaction_id().clone(), subscription)
    }

    fn update_subscription(&self, subscription: Subscription) -> Result<(), RepositoryError> {
        let id = subscription.transaction_id().clone();
        lock(&self.subscriptions, "subscriptions")?.replace(&id, subscription)
    }

    fn fetch_subscription(
        &self,
        id: &SubscriptionId,
    ) -> Result<Option<Subscription>, RepositoryError> {
        Ok(lock(&self.subscriptions, "subscriptions")?.get(id))
    }

    fn subscriptions(&self) -> Result<Vec<Subscription>, RepositoryError> {
        Ok(lock(&self.subscriptions, "subscriptions")?.values())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::marketplace::domain::{AccountProfile, PasswordHash, Role, ServiceDraft};
    use chrono::NaiveDate;

    fn account(username: &str) -> Account {
        let profile = AccountProfile {
            role: Role::Consumer,
            first_name: "Jamie".to_string(),
            last_name: "Reid".to_string(),
            date_of_birth: NaiveDate::from_ymd_opt(1992, 4, 9).expect("valid date"),
            address: "5 Hill St, Perth".to_string(),
            phone: "0400 222 333".to_string(),
            email: format!("{username}@example.com"),
            username: username.to_string(),
        };
        let password = PasswordHash::create("Passw0rd!", 4).expect("hash");
        Account::restore(AccountId::generate(), profile, password).expect("valid account")
    }

    fn service(category: &str) -> Service {
        Service::new(
            AccountId::from("acct-provider"),
            ServiceDraft {
                category: category.to_string(),
                description: "Weekly garden maintenance".to_string(),
                min_price: 40.0,
                max_price: 80.0,
            },
        )
        .expect("valid service")
    }

    #[test]
    fn listings_keep_insertion_order() {
        let repository = InMemoryRepository::new();
        let ids: Vec<ServiceId> = ["Gardening", "Plumbing", "Cleaning"]
            .into_iter()
            .map(|category| {
                repository
                    .insert_service(service(category))
                    .expect("insert")
                    .id()
                    .clone()
            })
            .collect();

        repository.remove_service(&ids[1]).expect("remove");
        let listed: Vec<String> = repository
            .services()
            .expect("list")
            .iter()
            .map(|service| service.category().to_string())
            .collect();
        assert_eq!(listed, vec!["Gardening", "Cleaning"]);
    }

    #[test]
    fn duplicate_ids_conflict() {
        let repository = InMemoryRepository::new();
        let service = service("Gardening");
        repository.insert_service(service.clone()).expect("insert");
        assert!(matches!(
            repository.insert_service(service),
            Err(RepositoryError::Conflict)
        ));
    }

    #[test]
    fn updates_require_existing_rows() {
        let repository = InMemoryRepository::new();
        assert!(matches!(
            repository.update_service(service("Gardening")),
            Err(RepositoryError::NotFound)
        ));
        assert!(matches!(
            repository.remove_request(&RequestId::from("req-missing")),
            Err(RepositoryError::NotFound)
        ));
    }

    #[test]
    fn rows_with_dependents_cannot_be_removed() {
        let repository = InMemoryRepository::new();
        let service = repository.insert_service(service("Gardening")).expect("insert");
        let request = ServiceRequest::new(
            AccountId::from("acct-consumer"),
            service.id().clone(),
            service.provider_id().clone(),
            None,
            60.0,
        )
        .expect("valid request");
        let request = repository.insert_request(request).expect("insert");
        let subscription =
            Subscription::new(AccountId::from("acct-consumer"), request.id().clone(), 60.0)
                .expect("valid subscription");
        repository.insert_subscription(subscription).expect("insert");

        assert!(matches!(
            repository.remove_service(service.id()),
            Err(RepositoryError::Conflict)
        ));
        assert!(matches!(
            repository.remove_request(request.id()),
            Err(RepositoryError::Conflict)
        ));
        assert!(repository.fetch_service(service.id()).expect("fetch").is_some());
        assert!(repository.fetch_request(request.id()).expect("fetch").is_some());
    }

    #[test]
    fn orphaned_children_are_refused() {
        let repository = InMemoryRepository::new();
        let request = ServiceRequest::new(
            AccountId::from("acct-consumer"),
            ServiceId::from("svc-missing"),
            AccountId::from("acct-provider"),
            None,
            60.0,
        )
        .expect("valid request");
        assert!(matches!(
            repository.insert_request(request),
            Err(RepositoryError::NotFound)
        ));

        let subscription = Subscription::new(
            AccountId::from("acct-consumer"),
            RequestId::from("req-missing"),
            60.0,
        )
        .expect("valid subscription");
        assert!(matches!(
            repository.insert_subscription(subscription),
            Err(RepositoryError::NotFound)
        ));
        assert!(repository.requests().expect("list").is_empty());
        assert!(repository.subscriptions().expect("list").is_empty());
    }

    #[test]
    fn modify_account_commits_only_successful_changes() {
        let repository = InMemoryRepository::new();
        let jamie = repository.insert_account(account("jamie_r")).expect("insert");
        repository.insert_account(account("taken_name")).expect("insert");

        let failed: Result<(), RepositoryError> =
            repository.modify_account(jamie.id(), |account| {
                account.set_address("9 New Rd, Perth").expect("valid address");
                Err(RepositoryError::Unavailable("change abandoned".to_string()))
            });
        assert!(failed.is_err());
        let stored = repository.fetch_account(jamie.id()).expect("fetch").expect("row");
        assert_eq!(stored.address(), "5 Hill St, Perth");

        let clash: Result<(), RepositoryError> =
            repository.modify_account(jamie.id(), |account| {
                account.set_username("TAKEN_NAME").expect("valid username");
                Ok(())
            });
        assert!(matches!(clash, Err(RepositoryError::Conflict)));

        let missing: Result<(), RepositoryError> =
            repository.modify_account(&AccountId::from("acct-missing"), |_| Ok(()));
        assert!(matches!(missing, Err(RepositoryError::NotFound)));

        repository
            .modify_account::<_, RepositoryError, _>(jamie.id(), |account| {
                account.set_phone("0400 999 000").expect("valid phone");
                Ok(())
            })
            .expect("committed");
        let stored = repository.fetch_account(jamie.id()).expect("fetch").expect("row");
        assert_eq!(stored.phone(), "0400 999 000");
    }

    #[test]
    fn clones_share_tables() {
        let repository = InMemoryRepository::new();
        let shared = repository.clone();
        let stored = repository.insert_service(service("Gardening")).expect("insert");
        assert!(shared
            .fetch_service(stored.id())
            .expect("fetch")
            .is_some());
    }
}
