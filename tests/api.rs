use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

use actix_web::{
    http::StatusCode,
    test::{self, TestRequest},
    web::Data,
    App,
};
use anyhow::anyhow;
use async_trait::async_trait;
use serde_json::{json, Value};
use vecino_incidents::{
    api::{
        source::IncidentSource,
        store::{sample_incidents, IncidentStore},
    },
    app::{configure_app, AppState},
    schema::model::Incident,
    session::VIEWER_HEADER,
};

fn sample_state() -> Data<AppState> {
    Data::new(AppState::new(
        IncidentStore::from_incidents(sample_incidents()),
        None,
    ))
}

fn identity() -> Value {
    json!({ "name": "Marta", "phone": "611 222 333" })
}

macro_rules! service {
    ($state:expr) => {
        test::init_service(App::new().app_data($state).configure(configure_app)).await
    };
}

fn ids(body: &Value) -> Vec<u64> {
    body.as_array()
        .unwrap()
        .iter()
        .map(|incident| incident["id"].as_u64().unwrap())
        .collect()
}

#[actix_web::test]
async fn reports_are_filtered_in_source_order() {
    let app = service!(sample_state());

    let req = TestRequest::get().uri("/api/reports").to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(ids(&body), vec![1, 2, 3]);
    assert_eq!(body[1]["status"], "in_progress");
    assert_eq!(body[0]["commentsCount"], 5);

    let req = TestRequest::get()
        .uri("/api/reports?category=road,trash")
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(ids(&body), vec![1, 3]);

    let req = TestRequest::get()
        .uri("/api/reports?category=road,trash&status=resolved")
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(ids(&body), vec![3]);
}

#[actix_web::test]
async fn unknown_filter_value_is_rejected() {
    let app = service!(sample_state());
    let req = TestRequest::get()
        .uri("/api/reports?category=potholes")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn single_report_lookup() {
    let app = service!(sample_state());
    let req = TestRequest::get().uri("/api/reports/2").to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["category"], "lighting");

    let req = TestRequest::get().uri("/api/reports/40").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn vote_lifecycle() {
    let app = service!(sample_state());

    let req = TestRequest::post()
        .uri("/api/votes")
        .insert_header((VIEWER_HEADER, "session-a"))
        .set_json(json!({ "incidentId": 1, "type": "down", "viewer": identity() }))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["state"], "voted_down");
    assert_eq!((body["upvotes"].as_u64(), body["downvotes"].as_u64()), (Some(23), Some(3)));

    // a second POST must not silently cancel
    let req = TestRequest::post()
        .uri("/api/votes")
        .insert_header((VIEWER_HEADER, "session-a"))
        .set_json(json!({ "incidentId": 1, "type": "down", "viewer": identity() }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);

    let req = TestRequest::put()
        .uri("/api/votes/1")
        .insert_header((VIEWER_HEADER, "session-a"))
        .set_json(json!({ "type": "up", "viewer": identity() }))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["state"], "voted_up");
    assert_eq!((body["upvotes"].as_u64(), body["downvotes"].as_u64()), (Some(24), Some(2)));

    let req = TestRequest::get()
        .uri("/api/votes/1")
        .insert_header((VIEWER_HEADER, "session-b"))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["state"], "no_vote");
    assert_eq!(body["upvotes"], 24);

    let req = TestRequest::delete()
        .uri("/api/votes/1")
        .insert_header((VIEWER_HEADER, "session-a"))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["state"], "no_vote");
    assert_eq!((body["upvotes"].as_u64(), body["downvotes"].as_u64()), (Some(23), Some(2)));

    let req = TestRequest::get().uri("/api/reports/1").to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["upvotes"], 23);
}

#[actix_web::test]
async fn vote_requires_session_and_valid_identity() {
    let app = service!(sample_state());

    let req = TestRequest::post()
        .uri("/api/votes")
        .set_json(json!({ "incidentId": 1, "type": "up", "viewer": identity() }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let req = TestRequest::post()
        .uri("/api/votes")
        .insert_header((VIEWER_HEADER, "session-a"))
        .set_json(json!({ "incidentId": 1, "type": "up", "viewer": { "name": "M", "phone": "123" } }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert!(body["errors"]["name"].is_string());
    assert!(body["errors"]["phone"].is_string());

    let req = TestRequest::put()
        .uri("/api/votes/1")
        .insert_header((VIEWER_HEADER, "session-a"))
        .set_json(json!({ "type": "up", "viewer": identity() }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);
}

#[actix_web::test]
async fn comments_are_validated_and_listed_newest_first() {
    let app = service!(sample_state());

    let req = TestRequest::post()
        .uri("/api/comments")
        .set_json(json!({
            "incidentId": 3,
            "author": "A",
            "phone": "611222333",
            "content": "Sigue igual"
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert!(body["errors"]["author"].is_string());

    for content in ["Primer aviso", "Segundo aviso"] {
        let req = TestRequest::post()
            .uri("/api/comments")
            .set_json(json!({
                "incidentId": 3,
                "author": "Marta",
                "phone": "611222333",
                "dni": "12345678Z",
                "content": content
            }))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["author"], "Marta");
        assert!(body.get("phone").is_none());
        assert!(body.get("dni").is_none());
    }

    let req = TestRequest::get().uri("/api/reports/3/comments").to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    let contents: Vec<&str> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["content"].as_str().unwrap())
        .collect();
    assert_eq!(contents, vec!["Segundo aviso", "Primer aviso"]);

    let req = TestRequest::get().uri("/api/reports/3").to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["commentsCount"], 9);

    let req = TestRequest::get().uri("/api/reports/77/comments").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn taxonomy_and_version() {
    let app = service!(sample_state());

    let req = TestRequest::get().uri("/api/taxonomy").to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["categories"].as_array().unwrap().len(), 8);
    assert_eq!(body["statuses"][2]["value"], "resolved");
    assert_eq!(body["statuses"][2]["markerColor"], "#30D158");

    let req = TestRequest::get().uri("/api/version").to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
}

struct FlakySource {
    fail_first: AtomicUsize,
    list_calls: AtomicUsize,
}

#[async_trait]
impl IncidentSource for FlakySource {
    async fn fetch_incidents(&self) -> Result<Vec<Incident>, anyhow::Error> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_first.load(Ordering::SeqCst) > 0 {
            self.fail_first.fetch_sub(1, Ordering::SeqCst);
            return Err(anyhow!("connection refused"));
        }
        Ok(sample_incidents())
    }

    async fn fetch_incident_direct(&self, _id: u64) -> Result<Option<Incident>, anyhow::Error> {
        Err(anyhow!("connection refused"))
    }
}

#[actix_web::test]
async fn upstream_failure_is_a_bad_gateway_and_retried() {
    let source = Arc::new(FlakySource {
        fail_first: AtomicUsize::new(1),
        list_calls: AtomicUsize::new(0),
    });
    let upstream: Arc<dyn IncidentSource> = source.clone();
    let state = Data::new(AppState::new(IncidentStore::new(), Some(upstream)));
    let app = service!(state);

    let req = TestRequest::get().uri("/api/reports").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_GATEWAY);

    let req = TestRequest::get().uri("/api/reports").to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(ids(&body), vec![1, 2, 3]);

    // loaded once, later requests are served from the store
    let req = TestRequest::get().uri("/api/reports?status=active").to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(ids(&body), vec![1]);
    assert_eq!(source.list_calls.load(Ordering::SeqCst), 2);
}

#[actix_web::test]
async fn votes_and_comments_wait_for_the_upstream_load() {
    let source = Arc::new(FlakySource {
        fail_first: AtomicUsize::new(1),
        list_calls: AtomicUsize::new(0),
    });
    let upstream: Arc<dyn IncidentSource> = source.clone();
    let state = Data::new(AppState::new(IncidentStore::new(), Some(upstream)));
    let app = service!(state);

    // nothing is accepted against data that never loaded
    let req = TestRequest::post()
        .uri("/api/votes")
        .insert_header((VIEWER_HEADER, "session-a"))
        .set_json(json!({ "incidentId": 1, "type": "up", "viewer": identity() }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_GATEWAY);

    let req = TestRequest::post()
        .uri("/api/votes")
        .insert_header((VIEWER_HEADER, "session-a"))
        .set_json(json!({ "incidentId": 1, "type": "up", "viewer": identity() }))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["state"], "voted_up");
    assert_eq!(body["upvotes"], 24);

    let req = TestRequest::get().uri("/api/reports/1/comments").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let req = TestRequest::post()
        .uri("/api/comments")
        .set_json(json!({
            "incidentId": 1,
            "author": "Marta",
            "phone": "611222333",
            "content": "Sigue sin arreglar"
        }))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["id"], 1);

    let req = TestRequest::get()
        .uri("/api/votes/1")
        .insert_header((VIEWER_HEADER, "session-a"))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["state"], "voted_up");
    assert_eq!(source.list_calls.load(Ordering::SeqCst), 2);
}
