use std::sync::Arc;

use axum::{
    extract::{rejection::FormRejection, Form, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
    routing::{get, post, put},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;

use super::domain::{
    AccountId, AccountRegistration, RequestId, RequestStatus, Role, ServiceDraft, ServiceId,
};
use super::repository::{MarketplaceRepository, RepositoryError};
use super::service::{BookingDraft, Marketplace, MarketplaceError, ServiceFilter};

/// Form-driven catalogue: the service listing plus the "add service" form post.
pub fn catalogue_router<R>(service: Arc<Marketplace<R>>) -> Router
where
    R: MarketplaceRepository + 'static,
{
    Router::new()
        .route("/", get(index_handler::<R>))
        .route("/add", post(add_service_form_handler::<R>))
        .with_state(service)
}

/// JSON booking API.
pub fn api_router<R>(service: Arc<Marketplace<R>>) -> Router
where
    R: MarketplaceRepository + 'static,
{
    Router::new()
        .route("/api/auth/login", post(login_handler::<R>))
        .route("/api/auth/register", post(register_handler::<R>))
        .route(
            "/api/services",
            get(list_services_handler::<R>).post(create_service_handler::<R>),
        )
        .route("/api/services/:service_id", get(get_service_handler::<R>))
        .route(
            "/api/bookings",
            get(list_bookings_handler::<R>).post(create_booking_handler::<R>),
        )
        .route(
            "/api/bookings/:booking_id",
            put(update_booking_handler::<R>),
        )
        .route("/api/accounts/:account_id", get(account_handler::<R>))
        .route(
            "/api/accounts/:account_id/notifications",
            get(notifications_handler::<R>),
        )
        .route(
            "/api/accounts/:account_id/report",
            get(report_handler::<R>),
        )
        .with_state(service)
}

/// Both surfaces merged onto one router.
pub fn marketplace_router<R>(service: Arc<Marketplace<R>>) -> Router
where
    R: MarketplaceRepository + 'static,
{
    catalogue_router(service.clone()).merge(api_router(service))
}

impl IntoResponse for MarketplaceError {
    fn into_response(self) -> Response {
        let status = match &self {
            MarketplaceError::Validation(_)
            | MarketplaceError::Password(_)
            | MarketplaceError::SelfReview
            | MarketplaceError::ProviderMismatch { .. } => StatusCode::BAD_REQUEST,
            MarketplaceError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            MarketplaceError::RoleMismatch { .. } | MarketplaceError::NotOwner { .. } => {
                StatusCode::FORBIDDEN
            }
            MarketplaceError::NotFound { .. }
            | MarketplaceError::Repository(RepositoryError::NotFound) => StatusCode::NOT_FOUND,
            MarketplaceError::Transition(_)
            | MarketplaceError::RequestLocked(_)
            | MarketplaceError::InUse { .. }
            | MarketplaceError::DuplicateAccount
            | MarketplaceError::Repository(RepositoryError::Conflict) => StatusCode::CONFLICT,
            MarketplaceError::Repository(RepositoryError::Unavailable(_)) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!(error = %self, "marketplace request failed");
        }
        let payload = json!({
            "error": self.to_string(),
        });
        (status, Json(payload)).into_response()
    }
}

fn bad_request(message: impl Into<String>) -> Response {
    let payload = json!({
        "error": message.into(),
    });
    (StatusCode::BAD_REQUEST, Json(payload)).into_response()
}

fn worker_failed(error: tokio::task::JoinError) -> Response {
    tracing::error!(error = %error, "password worker failed");
    let payload = json!({
        "error": "internal error",
    });
    (StatusCode::INTERNAL_SERVER_ERROR, Json(payload)).into_response()
}

pub(crate) async fn index_handler<R>(State(service): State<Arc<Marketplace<R>>>) -> Response
where
    R: MarketplaceRepository + 'static,
{
    match service.list_services(&ServiceFilter::default()) {
        Ok(services) => (StatusCode::OK, Json(services)).into_response(),
        Err(error) => error.into_response(),
    }
}

/// Field names used by the catalogue's HTML form.
#[derive(Debug, Clone, Deserialize)]
pub struct AddServiceForm {
    #[serde(rename = "serviceType")]
    pub service_type: String,
    pub description: String,
    #[serde(rename = "minPrice")]
    pub min_price: String,
    #[serde(rename = "maxPrice")]
    pub max_price: String,
    #[serde(rename = "providerId")]
    pub provider_id: String,
}

fn parse_price(field: &str, raw: &str) -> Result<f64, Response> {
    raw.trim()
        .parse::<f64>()
        .map_err(|_| bad_request(format!("{field} must be a number")))
}

pub(crate) async fn add_service_form_handler<R>(
    State(service): State<Arc<Marketplace<R>>>,
    form: Result<Form<AddServiceForm>, FormRejection>,
) -> Response
where
    R: MarketplaceRepository + 'static,
{
    let Form(form) = match form {
        Ok(form) => form,
        Err(rejection) => return bad_request(rejection.body_text()),
    };
    let min_price = match parse_price("minPrice", &form.min_price) {
        Ok(value) => value,
        Err(response) => return response,
    };
    let max_price = match parse_price("maxPrice", &form.max_price) {
        Ok(value) => value,
        Err(response) => return response,
    };

    let draft = ServiceDraft {
        category: form.service_type,
        description: form.description,
        min_price,
        max_price,
    };
    match service.create_service(&AccountId(form.provider_id), draft) {
        Ok(_) => Redirect::to("/").into_response(),
        Err(MarketplaceError::Repository(error)) => {
            MarketplaceError::Repository(error).into_response()
        }
        Err(error) => bad_request(error.to_string()),
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

pub(crate) async fn login_handler<R>(
    State(service): State<Arc<Marketplace<R>>>,
    Json(request): Json<LoginRequest>,
) -> Response
where
    R: MarketplaceRepository + 'static,
{
    let outcome =
        tokio::task::spawn_blocking(move || service.login(&request.email, &request.password))
            .await;
    match outcome {
        Ok(Ok(outcome)) => (StatusCode::OK, Json(outcome)).into_response(),
        Ok(Err(error)) => error.into_response(),
        Err(error) => worker_failed(error),
    }
}

pub(crate) async fn register_handler<R>(
    State(service): State<Arc<Marketplace<R>>>,
    Json(registration): Json<AccountRegistration>,
) -> Response
where
    R: MarketplaceRepository + 'static,
{
    let outcome = tokio::task::spawn_blocking(move || service.register(registration)).await;
    match outcome {
        Ok(Ok(account)) => (StatusCode::CREATED, Json(account.profile_view())).into_response(),
        Ok(Err(error)) => error.into_response(),
        Err(error) => worker_failed(error),
    }
}

pub(crate) async fn list_services_handler<R>(
    State(service): State<Arc<Marketplace<R>>>,
    Query(filter): Query<ServiceFilter>,
) -> Response
where
    R: MarketplaceRepository + 'static,
{
    match service.list_services(&filter) {
        Ok(services) => (StatusCode::OK, Json(services)).into_response(),
        Err(error) => error.into_response(),
    }
}

pub(crate) async fn get_service_handler<R>(
    State(service): State<Arc<Marketplace<R>>>,
    Path(service_id): Path<String>,
) -> Response
where
    R: MarketplaceRepository + 'static,
{
    match service.service(&ServiceId(service_id)) {
        Ok(found) => (StatusCode::OK, Json(found)).into_response(),
        Err(error) => error.into_response(),
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateServiceRequest {
    pub provider_id: AccountId,
    #[serde(flatten)]
    pub draft: ServiceDraft,
}

pub(crate) async fn create_service_handler<R>(
    State(service): State<Arc<Marketplace<R>>>,
    Json(request): Json<CreateServiceRequest>,
) -> Response
where
    R: MarketplaceRepository + 'static,
{
    match service.create_service(&request.provider_id, request.draft) {
        Ok(created) => (StatusCode::CREATED, Json(created)).into_response(),
        Err(error) => error.into_response(),
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct BookingQuery {
    pub user_id: AccountId,
    pub user_type: String,
}

pub(crate) async fn list_bookings_handler<R>(
    State(service): State<Arc<Marketplace<R>>>,
    Query(query): Query<BookingQuery>,
) -> Response
where
    R: MarketplaceRepository + 'static,
{
    let Some(role) = Role::parse(&query.user_type) else {
        return bad_request(format!("unknown user_type '{}'", query.user_type));
    };
    match service.list_bookings(&query.user_id, role) {
        Ok(bookings) => (StatusCode::OK, Json(bookings)).into_response(),
        Err(error) => error.into_response(),
    }
}

pub(crate) async fn create_booking_handler<R>(
    State(service): State<Arc<Marketplace<R>>>,
    Json(draft): Json<BookingDraft>,
) -> Response
where
    R: MarketplaceRepository + 'static,
{
    match service.create_booking(draft) {
        Ok(booking) => (StatusCode::CREATED, Json(booking)).into_response(),
        Err(error) => error.into_response(),
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct StatusQuery {
    pub status: String,
}

pub(crate) async fn update_booking_handler<R>(
    State(service): State<Arc<Marketplace<R>>>,
    Path(booking_id): Path<String>,
    Query(query): Query<StatusQuery>,
) -> Response
where
    R: MarketplaceRepository + 'static,
{
    let Some(status) = RequestStatus::parse(&query.status) else {
        return bad_request(format!("unknown status '{}'", query.status));
    };
    match service.update_booking_status(&RequestId(booking_id), status) {
        Ok(booking) => (StatusCode::OK, Json(booking)).into_response(),
        Err(error) => error.into_response(),
    }
}

pub(crate) async fn account_handler<R>(
    State(service): State<Arc<Marketplace<R>>>,
    Path(account_id): Path<String>,
) -> Response
where
    R: MarketplaceRepository + 'static,
{
    match service.account(&AccountId(account_id)) {
        Ok(account) => (StatusCode::OK, Json(account.profile_view())).into_response(),
        Err(error) => error.into_response(),
    }
}

pub(crate) async fn notifications_handler<R>(
    State(service): State<Arc<Marketplace<R>>>,
    Path(account_id): Path<String>,
) -> Response
where
    R: MarketplaceRepository + 'static,
{
    match service.notifications(&AccountId(account_id)) {
        Ok(notifications) => (StatusCode::OK, Json(notifications)).into_response(),
        Err(error) => error.into_response(),
    }
}

pub(crate) async fn report_handler<R>(
    State(service): State<Arc<Marketplace<R>>>,
    Path(account_id): Path<String>,
) -> Response
where
    R: MarketplaceRepository + 'static,
{
    match service.account_report(&AccountId(account_id)) {
        Ok(report) => {
            let summary = report.render();
            let payload = json!({
                "report": report,
                "summary": summary,
            });
            (StatusCode::OK, Json(payload)).into_response()
        }
        Err(error) => error.into_response(),
    }
}
