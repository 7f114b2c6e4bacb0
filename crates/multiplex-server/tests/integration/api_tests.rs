use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use tempfile::TempDir;

use multiplex_server::routes::IN_PROGRESS;

use crate::common::{
    BASE, body_json, body_text, setup_test_app, setup_test_app_in, setup_test_app_with,
};

#[tokio::test]
async fn submit_returns_202_with_job_id() {
    let app = setup_test_app().await;

    let response = app.submit(&[app.link("/echo/X")]).await;

    assert_eq!(response.status(), StatusCode::ACCEPTED);
    assert_eq!(body_text(response).await, "1");
}

#[tokio::test]
async fn finished_job_returns_results_in_submission_order() {
    let app = setup_test_app().await;
    let slow = app.link("/sleep/150");
    let fast = app.link("/echo/Y");
    let missing = app.link("/status/404");

    let response = app
        .submit(&[slow.clone(), fast.clone(), missing.clone()])
        .await;
    let id = body_text(response).await;
    app.wait_idle().await;

    let response = app.poll(&id).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "application/json"
    );

    let json = body_json(response).await;
    assert_eq!(
        json,
        serde_json::json!([
            {"url": slow, "status_code": 200, "body": "slept"},
            {"url": fast, "status_code": 200, "body": "Y"},
            {"url": missing, "status_code": 404, "body": ""},
        ])
    );
    assert!(app.store.path().join(format!("{id}.json")).exists());
}

#[tokio::test]
async fn running_job_answers_in_progress() {
    let app = setup_test_app().await;

    let id = body_text(app.submit(&[app.link("/sleep/500")]).await).await;
    let response = app.poll(&id).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_text(response).await, IN_PROGRESS);
    app.wait_idle().await;
}

#[tokio::test]
async fn empty_link_list_is_rejected_without_consuming_an_id() {
    let app = setup_test_app().await;

    let response = app.submit(&[]).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["error"], "validation_error");

    let response = app.submit(&[app.link("/echo/X")]).await;
    assert_eq!(body_text(response).await, "1");
}

#[tokio::test]
async fn too_many_links_are_rejected() {
    let app = setup_test_app_with(|config| {
        config.max_links_per_request = 2;
        config.max_parallel_fetches = 2;
    })
    .await;

    let links = vec![app.link("/echo/a"), app.link("/echo/b"), app.link("/echo/c")];
    let response = app.submit(&links).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert!(json["message"].as_str().unwrap().contains("Maximum 2 links"));
}

#[tokio::test]
async fn relative_link_is_rejected() {
    let app = setup_test_app().await;

    let response = app.submit(&["not a url".to_string()]).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn malformed_body_is_rejected() {
    let app = setup_test_app().await;

    let response = app
        .send(
            Request::post(format!("{BASE}/links"))
                .body(Body::from(r#"{"links": "nope"}"#))
                .unwrap(),
        )
        .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["error"], "serialization_error");
}

#[tokio::test]
async fn admission_limit_returns_429() {
    let app = setup_test_app_with(|config| config.max_parallel_requests = 1).await;

    let first = app.submit(&[app.link("/sleep/500")]).await;
    assert_eq!(first.status(), StatusCode::ACCEPTED);

    let second = app.submit(&[app.link("/echo/X")]).await;
    assert_eq!(second.status(), StatusCode::TOO_MANY_REQUESTS);
    let json = body_json(second).await;
    assert_eq!(json["error"], "rate_limit_exceeded");

    app.wait_idle().await;
    // The slot is freed right after the registry entry.
    tokio::time::sleep(Duration::from_millis(50)).await;
    let third = app.submit(&[app.link("/echo/X")]).await;
    assert_eq!(third.status(), StatusCode::ACCEPTED);
    assert_eq!(body_text(third).await, "2");
}

#[tokio::test]
async fn failed_job_is_not_found() {
    let app = setup_test_app_with(|config| config.fetch_timeout = Duration::from_millis(200)).await;

    let links = vec![app.link("/echo/X"), app.link("/sleep/2000")];
    let id = body_text(app.submit(&links).await).await;
    app.wait_idle().await;

    let response = app.poll(&id).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert!(!app.store.path().join(format!("{id}.json")).exists());
}

#[tokio::test]
async fn cancel_running_job() {
    let app = setup_test_app().await;

    let id = body_text(app.submit(&[app.link("/sleep/1500")]).await).await;

    let response = app.cancel(&id).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    app.wait_idle().await;
    assert_eq!(app.poll(&id).await.status(), StatusCode::NOT_FOUND);
    assert_eq!(app.cancel(&id).await.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn cancel_finished_job_is_not_found() {
    let app = setup_test_app().await;

    let id = body_text(app.submit(&[app.link("/echo/X")]).await).await;
    app.wait_idle().await;

    assert_eq!(app.cancel(&id).await.status(), StatusCode::NOT_FOUND);
    assert_eq!(app.poll(&id).await.status(), StatusCode::OK);
}

#[tokio::test]
async fn invalid_job_id_returns_400() {
    let app = setup_test_app().await;

    let response = app.poll("abc").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["error"], "invalid_job_id");

    assert_eq!(app.cancel("-3").await.status(), StatusCode::BAD_REQUEST);
    assert_eq!(app.poll("+1").await.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn unknown_job_id_returns_404() {
    let app = setup_test_app().await;

    let response = app.poll("12345").await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let json = body_json(response).await;
    assert_eq!(json["error"], "not_found");
}

#[tokio::test]
async fn wrong_method_returns_405() {
    let app = setup_test_app().await;

    let response = app
        .send(
            Request::get(format!("{BASE}/links"))
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);

    let response = app
        .send(
            Request::put(format!("{BASE}/links/1"))
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
}

#[tokio::test]
async fn routes_outside_base_path_return_404() {
    let app = setup_test_app().await;

    let response = app
        .send(Request::get("/links/1").body(Body::empty()).unwrap())
        .await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn ids_continue_after_stored_results() {
    let store = TempDir::new().unwrap();
    std::fs::write(store.path().join("5.json"), "[]").unwrap();
    std::fs::write(store.path().join("9.json"), "[]").unwrap();
    let app = setup_test_app_in(store, |_| {}).await;

    let response = app.submit(&[app.link("/echo/X")]).await;

    assert_eq!(body_text(response).await, "10");
    assert_eq!(app.poll("9").await.status(), StatusCode::OK);
    app.wait_idle().await;
}

#[tokio::test]
async fn openapi_document_is_served() {
    let app = setup_test_app().await;

    let response = app
        .send(
            Request::get(format!("{BASE}/docs/openapi.json"))
                .body(Body::empty())
                .unwrap(),
        )
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["info"]["title"], "Multiplex API");
    assert_eq!(json["servers"][0]["url"], BASE);
    assert!(json["paths"]["/links/{id}"]["delete"].is_object());
}
