use std::sync::Arc;

use axum::extract::State;
use axum::http::{header, StatusCode};
use serde_json::{json, Value};
use tower::ServiceExt;

use super::common::*;
use crate::marketplace::router::{api_router, catalogue_router, marketplace_router};
use crate::marketplace::service::{Marketplace, ServiceFilter};

fn booking_payload(seeded: &Seeded) -> Value {
    json!({
        "service_id": seeded.service.id(),
        "consumer_id": seeded.consumer.id(),
        "provider_id": seeded.provider.id(),
        "date": "2030-03-14",
        "time": "10:00",
        "price": 95.0,
    })
}

#[tokio::test]
async fn index_lists_posted_services() {
    let seeded = seeded();
    let response = catalogue_router(seeded.marketplace.clone())
        .oneshot(empty_request("GET", "/"))
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json_body(response).await;
    let listed = body.as_array().expect("array");
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0]["category"], "Plumbing");
    assert_eq!(listed[0]["price"]["min"], 80.0);
}

#[tokio::test]
async fn add_form_redirects_to_index() {
    let seeded = seeded();
    let body = format!(
        "serviceType=Dog+Walking&description=Two+walks+a+day&minPrice=20&maxPrice=35.5&providerId={}",
        seeded.provider.id()
    );
    let response = catalogue_router(seeded.marketplace.clone())
        .oneshot(form_request("/add", &body))
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(
        response.headers().get(header::LOCATION).expect("location"),
        "/"
    );
    let services = seeded
        .marketplace
        .list_services(&ServiceFilter::default())
        .expect("listed");
    assert_eq!(services.len(), 2);
    assert_eq!(services[1].category(), "Dog Walking");
}

#[tokio::test]
async fn add_form_rejects_malformed_input() {
    let seeded = seeded();
    let provider = seeded.provider.id().to_string();
    let cases = [
        format!("serviceType=Cleaning&description=Deep+clean&minPrice=ten&maxPrice=20&providerId={provider}"),
        format!("serviceType=Cleaning&description=Deep+clean&minPrice=100&maxPrice=50&providerId={provider}"),
        format!("serviceType=Cleaning&minPrice=10&maxPrice=20&providerId={provider}"),
        format!("serviceType=Cleaning2&description=Deep+clean&minPrice=10&maxPrice=20&providerId={provider}"),
        "serviceType=Cleaning&description=Deep+clean&minPrice=10&maxPrice=20&providerId=acct-nobody"
            .to_string(),
    ];

    for body in cases {
        let response = catalogue_router(seeded.marketplace.clone())
            .oneshot(form_request("/add", &body))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{body}");
        let payload = read_json_body(response).await;
        assert!(payload["error"].is_string(), "{body}");
    }

    let services = seeded
        .marketplace
        .list_services(&ServiceFilter::default())
        .expect("listed");
    assert_eq!(services.len(), 1);
}

#[tokio::test]
async fn login_returns_token_or_unauthorized() {
    let seeded = seeded();
    let router = api_router(seeded.marketplace.clone());

    let response = router
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/auth/login",
            &json!({ "email": "casey_c@example.com", "password": PASSWORD }),
        ))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json_body(response).await;
    assert!(body["token"].as_str().is_some_and(|token| !token.is_empty()));
    assert_eq!(body["user"]["role"], "consumer");
    assert!(body["user"].get("password").is_none());

    let response = router
        .oneshot(json_request(
            "POST",
            "/api/auth/login",
            &json!({ "email": "casey_c@example.com", "password": "Nope-1234" }),
        ))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn register_creates_accounts_and_reports_policy_failures() {
    let (marketplace, _) = build_marketplace();
    let router = api_router(Arc::new(marketplace));

    let mut payload = json!({
        "role": "business",
        "first_name": "Robin",
        "last_name": "Ng",
        "date_of_birth": "1988-02-29",
        "address": "4 Lake St, Perth",
        "phone": "+61 8 9000 1234",
        "email": "robin@example.com",
        "username": "robin_ng",
        "password": PASSWORD,
    });
    let response = router
        .clone()
        .oneshot(json_request("POST", "/api/auth/register", &payload))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = read_json_body(response).await;
    assert_eq!(body["role"], "provider");

    let response = router
        .clone()
        .oneshot(json_request("POST", "/api/auth/register", &payload))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::CONFLICT);

    payload["username"] = json!("robin_two");
    payload["email"] = json!("robin.two@example.com");
    payload["password"] = json!("password");
    let response = router
        .oneshot(json_request("POST", "/api/auth/register", &payload))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = read_json_body(response).await;
    assert!(body["error"]
        .as_str()
        .is_some_and(|message| message.contains("uppercase")));
}

#[tokio::test]
async fn services_endpoint_filters_and_creates() {
    let seeded = seeded();
    let router = api_router(seeded.marketplace.clone());

    let uri = format!("/api/services?category=plumbing&provider_id={}", seeded.provider.id());
    let response = router
        .clone()
        .oneshot(empty_request("GET", &uri))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(read_json_body(response).await.as_array().map(Vec::len), Some(1));

    let response = router
        .clone()
        .oneshot(empty_request("GET", "/api/services/svc-missing"))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let payload = json!({
        "provider_id": seeded.consumer.id(),
        "category": "Tutoring",
        "description": "Year twelve chemistry",
        "min_price": 40.0,
        "max_price": 60.0,
    });
    let response = router
        .clone()
        .oneshot(json_request("POST", "/api/services", &payload))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let mut payload = payload;
    payload["provider_id"] = json!(seeded.provider.id());
    let response = router
        .oneshot(json_request("POST", "/api/services", &payload))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = read_json_body(response).await;
    assert_eq!(body["category"], "Tutoring");
    assert_eq!(body["completed"], false);
}

#[tokio::test]
async fn create_booking_returns_not_found_for_unknown_references() {
    let seeded = seeded();
    let router = api_router(seeded.marketplace.clone());

    for (field, expected) in [
        ("service_id", "service"),
        ("consumer_id", "consumer"),
        ("provider_id", "provider"),
    ] {
        let mut payload = booking_payload(&seeded);
        payload[field] = json!("missing-id");
        let response = router
            .clone()
            .oneshot(json_request("POST", "/api/bookings", &payload))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::NOT_FOUND, "{field}");
        let body = read_json_body(response).await;
        assert!(
            body["error"]
                .as_str()
                .is_some_and(|message| message.starts_with(expected)),
            "{field}: {body}"
        );
    }

    let response = router
        .oneshot(json_request("POST", "/api/bookings", &booking_payload(&seeded)))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = read_json_body(response).await;
    assert_eq!(body["status"], "pending");
    assert_eq!(body["price"], 95.0);
}

#[tokio::test]
async fn booking_status_updates_map_errors() {
    let seeded = seeded();
    let booking = seeded
        .marketplace
        .request_service(seeded.consumer.id(), seeded.service.id(), None, None)
        .expect("requested");
    let router = api_router(seeded.marketplace.clone());

    let uri = format!("/api/bookings/{}?status=confirmed", booking.id());
    let response = router
        .clone()
        .oneshot(empty_request("PUT", &uri))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(read_json_body(response).await["status"], "accepted");

    let uri = format!("/api/bookings/{}?status=pending", booking.id());
    let response = router
        .clone()
        .oneshot(empty_request("PUT", &uri))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let uri = format!("/api/bookings/{}?status=teleported", booking.id());
    let response = router
        .clone()
        .oneshot(empty_request("PUT", &uri))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = router
        .oneshot(empty_request("PUT", "/api/bookings/req-missing?status=completed"))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn bookings_are_listed_for_business_users() {
    let seeded = seeded();
    seeded
        .marketplace
        .request_service(seeded.consumer.id(), seeded.service.id(), None, None)
        .expect("requested");
    let router = api_router(seeded.marketplace.clone());

    let uri = format!("/api/bookings?user_id={}&user_type=business", seeded.provider.id());
    let response = router
        .clone()
        .oneshot(empty_request("GET", &uri))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(read_json_body(response).await.as_array().map(Vec::len), Some(1));

    let uri = format!("/api/bookings?user_id={}&user_type=admin", seeded.provider.id());
    let response = router
        .oneshot(empty_request("GET", &uri))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn account_endpoints_expose_redacted_views() {
    let seeded = seeded();
    let router = marketplace_router(seeded.marketplace.clone());

    let uri = format!("/api/accounts/{}", seeded.provider.id());
    let response = router
        .clone()
        .oneshot(empty_request("GET", &uri))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json_body(response).await;
    assert_eq!(body["username"], "pat_plumber");
    assert!(!body.to_string().contains("$2"));

    let uri = format!("/api/accounts/{}/notifications", seeded.provider.id());
    let response = router
        .clone()
        .oneshot(empty_request("GET", &uri))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(read_json_body(response).await[0]["title"], "Welcome to Hustlr");

    let uri = format!("/api/accounts/{}/report", seeded.provider.id());
    let response = router
        .clone()
        .oneshot(empty_request("GET", &uri))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json_body(response).await;
    assert_eq!(body["report"]["report_type"], "Account Summary");
    assert!(body["summary"]
        .as_str()
        .is_some_and(|summary| summary.contains("username: pat_plumber")));

    let response = router
        .oneshot(empty_request("GET", "/api/accounts/acct-missing"))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn repository_outage_maps_to_internal_error() {
    let service = Arc::new(Marketplace::new(Arc::new(UnavailableRepository), COST));
    let response = crate::marketplace::router::index_handler::<UnavailableRepository>(State(
        service,
    ))
    .await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = read_json_body(response).await;
    assert!(body["error"]
        .as_str()
        .is_some_and(|message| message.contains("database offline")));
}

#[tokio::test]
async fn merged_router_serves_both_surfaces() {
    let seeded = seeded();
    let router = marketplace_router(seeded.marketplace.clone());
    for uri in ["/", "/api/services"] {
        let response = router
            .clone()
            .oneshot(empty_request("GET", uri))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::OK, "{uri}");
    }
}

#[tokio::test]
async fn records_still_in_use_map_to_conflict() {
    let seeded = seeded();
    seeded
        .marketplace
        .request_service(seeded.consumer.id(), seeded.service.id(), None, None)
        .expect("requested");
    let error = seeded
        .marketplace
        .delete_service(seeded.provider.id(), seeded.service.id())
        .expect_err("service has a booking");
    let response = axum::response::IntoResponse::into_response(error);
    assert_eq!(response.status(), StatusCode::CONFLICT);
    let body = read_json_body(response).await;
    assert!(body["error"]
        .as_str()
        .is_some_and(|message| message.contains("still has linked bookings")));
}
