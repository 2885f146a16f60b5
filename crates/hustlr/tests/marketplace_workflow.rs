//! End-to-end marketplace scenarios driven through the public facade and merged router.
//!
//! A provider posts through the catalogue form, a consumer books through the JSON API, and
//! the provider works the booking to completion before the consumer leaves a review.

mod common {
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::{header, Request};
    use axum::response::Response;
    use serde_json::{json, Value};

    use hustlr::marketplace::{Fixture, InMemoryRepository, Marketplace};

    pub(super) const COST: u32 = 4;
    pub(super) const PASSWORD: &str = "Sunny-day7!";

    pub(super) fn fixture() -> Fixture {
        let document = json!({
            "users": [
                {
                    "id": "acct-sam",
                    "role": "provider",
                    "first_name": "Sam",
                    "last_name": "Okafor",
                    "date_of_birth": "1983-03-09",
                    "address": "17 Rundle St, Adelaide",
                    "phone": "+61 412 000 111",
                    "email": "sam@hustlr.test",
                    "username": "sam_fixes",
                    "password": PASSWORD
                },
                {
                    "id": "acct-jo",
                    "role": "consumer",
                    "first_name": "Jo",
                    "last_name": "De Silva",
                    "date_of_birth": "1999-12-01",
                    "address": "2 Carrington St, Adelaide",
                    "phone": "+61 412 000 222",
                    "email": "jo@hustlr.test",
                    "username": "jo_ds",
                    "password": PASSWORD
                }
            ]
        });
        serde_json::from_value(document).expect("fixture parses")
    }

    pub(super) fn marketplace() -> Arc<Marketplace<InMemoryRepository>> {
        let repository = fixture().into_repository(COST).expect("fixture loads");
        Arc::new(Marketplace::new(Arc::new(repository), COST))
    }

    pub(super) fn json_request(method: &str, uri: &str, payload: Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(payload.to_string()))
            .expect("request")
    }

    pub(super) fn get(uri: &str) -> Request<Body> {
        Request::builder()
            .uri(uri)
            .body(Body::empty())
            .expect("request")
    }

    pub(super) async fn read_json(response: Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body");
        serde_json::from_slice(&bytes).expect("json")
    }
}

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use serde_json::json;
use tower::ServiceExt;

use common::*;
use hustlr::marketplace::{marketplace_router, AccountId, Rating, RequestStatus, ReviewDraft, Role};

#[tokio::test]
async fn provider_posts_consumer_books_and_reviews() {
    let marketplace = marketplace();
    let router = marketplace_router(marketplace.clone());

    let form = Request::builder()
        .method("POST")
        .uri("/add")
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(
            "serviceType=Appliance+Repair&description=Washing+machines+and+dryers&minPrice=70&maxPrice=180&providerId=acct-sam",
        ))
        .expect("request");
    let response = router.clone().oneshot(form).await.expect("response");
    assert_eq!(response.status(), StatusCode::SEE_OTHER);

    let response = router
        .clone()
        .oneshot(get("/api/services?category=appliance%20repair"))
        .await
        .expect("response");
    let services = read_json(response).await;
    let service_id = services[0]["id"].as_str().expect("service id").to_string();

    let response = router
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/auth/login",
            json!({ "email": "jo@hustlr.test", "password": PASSWORD }),
        ))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    let login = read_json(response).await;
    assert_eq!(login["user"]["id"], "acct-jo");

    let response = router
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/bookings",
            json!({
                "service_id": service_id,
                "consumer_id": "acct-jo",
                "provider_id": "acct-sam",
                "date": "2031-01-20",
                "time": "14:00",
                "price": 110.0,
            }),
        ))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::CREATED);
    let booking_id = read_json(response).await["id"]
        .as_str()
        .expect("booking id")
        .to_string();

    let sam = AccountId::from("acct-sam");
    let jo = AccountId::from("acct-jo");
    marketplace
        .accept_request(&sam, &booking_id.as_str().into())
        .expect("accepted");
    let completed = marketplace
        .complete_request(&sam, &booking_id.as_str().into())
        .expect("completed");
    assert_eq!(completed.status(), RequestStatus::Completed);

    let response = router
        .clone()
        .oneshot(
            Request::builder()
                .method("PUT")
                .uri(format!("/api/bookings/{booking_id}?status=cancelled"))
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::CONFLICT);

    marketplace
        .add_review(
            &jo,
            &sam,
            ReviewDraft {
                title: "Fixed it first visit".to_string(),
                description: "Dryer works again and the price matched the quote".to_string(),
                rating: Rating::new(5).expect("rating"),
                service_id: Some(service_id.as_str().into()),
            },
        )
        .expect("reviewed");

    let response = router
        .clone()
        .oneshot(get("/api/accounts/acct-sam"))
        .await
        .expect("response");
    let profile = read_json(response).await;
    assert_eq!(profile["community_rating"], 5.0);
    assert_eq!(profile["review_count"], 1);

    let response = router
        .oneshot(get("/api/accounts/acct-jo/notifications"))
        .await
        .expect("response");
    let titles: Vec<String> = read_json(response)
        .await
        .as_array()
        .expect("array")
        .iter()
        .filter_map(|notification| notification["title"].as_str().map(str::to_string))
        .collect();
    assert_eq!(titles, vec!["Request accepted", "Request completed"]);

    let bookings = marketplace
        .list_bookings(&jo, Role::Consumer)
        .expect("listed");
    assert_eq!(bookings.len(), 1);
}

#[tokio::test]
async fn unknown_booking_references_return_not_found() {
    let router = marketplace_router(marketplace());
    let response = router
        .oneshot(json_request(
            "POST",
            "/api/bookings",
            json!({
                "service_id": "svc-nowhere",
                "consumer_id": "acct-jo",
                "provider_id": "acct-sam",
                "date": "2031-01-20",
                "time": "14:00",
                "price": 110.0,
            }),
        ))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = read_json(response).await;
    assert_eq!(body["error"], "service svc-nowhere not found");
}

#[test]
fn account_report_exports_to_csv() {
    let marketplace = marketplace();
    let report = marketplace
        .account_report(&AccountId::from("acct-jo"))
        .expect("report");
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("jo.csv");
    report.export(&path).expect("exported");
    assert!(report.export(&path).is_err());

    let imported = hustlr::marketplace::Report::import(&path).expect("imported");
    assert_eq!(imported.get("name"), Some("Jo De Silva"));
    assert_eq!(imported.get("community_rating"), Some("0.0"));
}
