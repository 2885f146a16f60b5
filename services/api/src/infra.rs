use hustlr::error::AppError;
use hustlr::marketplace::{Fixture, InMemoryRepository};
use metrics_exporter_prometheus::PrometheusHandle;
use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Build the store the server runs against; a missing fixture path yields an empty marketplace.
pub(crate) fn load_repository(
    fixture_path: Option<&Path>,
    cost: u32,
) -> Result<InMemoryRepository, AppError> {
    let Some(path) = fixture_path else {
        warn!("no fixture configured; starting with an empty marketplace");
        return Ok(InMemoryRepository::new());
    };

    let repository = InMemoryRepository::new();
    let summary = Fixture::from_path(path)?.load_into(&repository, cost)?;
    info!(
        path = %path.display(),
        users = summary.users,
        services = summary.services,
        bookings = summary.bookings,
        subscriptions = summary.subscriptions,
        "marketplace seeded"
    );
    Ok(repository)
}

#[cfg(test)]
mod tests {
    use super::*;
    use hustlr::marketplace::MarketplaceRepository;

    #[test]
    fn missing_path_starts_empty() {
        let repository = load_repository(None, 4).expect("empty store");
        assert!(repository.accounts().expect("listed").is_empty());
    }

    #[test]
    fn unreadable_fixture_is_an_error() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("absent.json");
        assert!(matches!(
            load_repository(Some(&path), 4),
            Err(AppError::Fixture(_))
        ));
    }

    #[test]
    fn bundled_demo_fixture_loads() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../demos/marketplace.json");
        let repository = load_repository(Some(&path), 4).expect("demo fixture is valid");
        assert!(!repository.services().expect("listed").is_empty());
    }
}
