//! End-to-end tests of the request pipeline and resource routers.

use std::time::Duration;

use axum::{
    body::Body,
    http::{
        header::{
            ACCESS_CONTROL_ALLOW_ORIGIN, ACCESS_CONTROL_REQUEST_METHOD, CONTENT_TYPE, COOKIE,
            ORIGIN, RETRY_AFTER, SET_COOKIE, X_CONTENT_TYPE_OPTIONS, X_FRAME_OPTIONS,
        },
        Request, StatusCode,
    },
};
use serde_json::json;
use tempfile::TempDir;

use bootcamp_api::config::AppConfig;

mod common;
use common::{body_json, body_text, build_server, get, json_request, send, CLIENT_A, CLIENT_B};

fn public_dir() -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("index.html"), "<h1>DevCamper</h1>").unwrap();
    dir
}

fn limited_config(dir: &TempDir, max_requests: u32, window_secs: u64) -> AppConfig {
    let mut config = common::test_config(dir.path());
    config.rate_limit.max_requests = max_requests;
    config.rate_limit.window_secs = window_secs;
    config
}

#[tokio::test]
async fn test_static_assets_bypass_security_stages() {
    let dir = public_dir();
    let server = build_server(common::test_config(dir.path()));
    let app = server.app();

    let response = send(&app, get("/index.html"), CLIENT_A).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert!(!response.headers().contains_key(X_CONTENT_TYPE_OPTIONS));
    assert!(!response.headers().contains_key("x-ratelimit-limit"));
    assert!(!response.headers().contains_key(ACCESS_CONTROL_ALLOW_ORIGIN));
    assert_eq!(body_text(response).await, "<h1>DevCamper</h1>");
    assert_eq!(server.rate_limiter().tracked_clients(), 0);
}

#[tokio::test]
async fn test_api_responses_carry_every_response_header() {
    let dir = public_dir();
    let app = build_server(common::test_config(dir.path())).app();

    let mut request = get("/api/v2/bootcamps");
    request
        .headers_mut()
        .insert(ORIGIN, "http://example.com".parse().unwrap());
    let response = send(&app, request, CLIENT_A).await;

    assert_eq!(response.status(), StatusCode::OK);
    let headers = response.headers();
    assert_eq!(headers.get(X_CONTENT_TYPE_OPTIONS).unwrap(), "nosniff");
    assert_eq!(headers.get(X_FRAME_OPTIONS).unwrap(), "SAMEORIGIN");
    assert_eq!(headers.get(ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(), "*");
    assert_eq!(headers.get("x-ratelimit-limit").unwrap(), "100");
    assert_eq!(headers.get("x-ratelimit-remaining").unwrap(), "99");

    let body = body_json(response).await;
    assert_eq!(body, json!({"success": true, "count": 0, "data": []}));
}

#[tokio::test]
async fn test_request_over_the_limit_is_rejected() {
    let dir = public_dir();
    let app = build_server(common::test_config(dir.path())).app();

    for _ in 0..100 {
        let response = send(&app, get("/api/v2/courses"), CLIENT_A).await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    let mut request = get("/api/v2/courses");
    request
        .headers_mut()
        .insert(ORIGIN, "http://example.com".parse().unwrap());
    let response = send(&app, request, CLIENT_A).await;

    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(response.headers().get(X_CONTENT_TYPE_OPTIONS).unwrap(), "nosniff");
    assert!(response.headers().contains_key(RETRY_AFTER));
    assert!(!response.headers().contains_key(ACCESS_CONTROL_ALLOW_ORIGIN));
    assert_eq!(
        body_text(response).await,
        "Too many requests, please try again later."
    );

    let other = send(&app, get("/api/v2/courses"), CLIENT_B).await;
    assert_eq!(other.status(), StatusCode::OK);
}

#[tokio::test(start_paused = true)]
async fn test_limit_resets_when_window_ends() {
    let dir = public_dir();
    let app = build_server(limited_config(&dir, 2, 60)).app();

    for _ in 0..2 {
        assert_eq!(send(&app, get("/api/v2/users"), CLIENT_A).await.status(), StatusCode::OK);
    }
    assert_eq!(
        send(&app, get("/api/v2/users"), CLIENT_A).await.status(),
        StatusCode::TOO_MANY_REQUESTS
    );

    tokio::time::advance(Duration::from_secs(61)).await;

    assert_eq!(send(&app, get("/api/v2/users"), CLIENT_A).await.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_crud_round_trip() {
    let dir = public_dir();
    let app = build_server(common::test_config(dir.path())).app();

    let created = send(
        &app,
        json_request("POST", "/api/v2/bootcamps", &json!({"name": "Devworks Bootcamp"})),
        CLIENT_A,
    )
    .await;
    assert_eq!(created.status(), StatusCode::CREATED);
    let id = body_json(created).await["data"]["_id"]
        .as_str()
        .unwrap()
        .to_string();

    let updated = send(
        &app,
        json_request(
            "PUT",
            &format!("/api/v2/bootcamps/{}", id),
            &json!({"housing": true}),
        ),
        CLIENT_A,
    )
    .await;
    let body = body_json(updated).await;
    assert_eq!(body["data"]["name"], "Devworks Bootcamp");
    assert_eq!(body["data"]["housing"], true);

    let deleted = send(
        &app,
        Request::builder()
            .method("DELETE")
            .uri(format!("/api/v2/bootcamps/{}", id))
            .body(Body::empty())
            .unwrap(),
        CLIENT_A,
    )
    .await;
    assert_eq!(body_json(deleted).await, json!({"success": true, "data": {}}));

    let missing = send(&app, get(&format!("/api/v2/bootcamps/{}", id)), CLIENT_A).await;
    assert_eq!(missing.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_trailing_slash_reaches_mounted_routes() {
    let dir = public_dir();
    let app = build_server(common::test_config(dir.path())).app();

    send(
        &app,
        json_request("POST", "/api/v2/bootcamps/", &json!({"name": "Devcentral"})),
        CLIENT_A,
    )
    .await;

    let response = send(&app, get("/api/v2/bootcamps/"), CLIENT_A).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["count"], 1);
    assert_eq!(body["data"][0]["name"], "Devcentral");

    for prefix in ["courses", "users", "reviews"] {
        let response = send(&app, get(&format!("/api/v2/{}/", prefix)), CLIENT_A).await;
        assert_eq!(response.status(), StatusCode::OK, "GET /api/v2/{}/", prefix);
    }
    let logout = send(&app, get("/api/v2/auth/logout/"), CLIENT_A).await;
    assert_eq!(logout.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_repeated_query_names_keep_last_value() {
    let dir = public_dir();
    let app = build_server(common::test_config(dir.path())).app();

    for name in ["ModernTech", "Codemasters"] {
        send(
            &app,
            json_request("POST", "/api/v2/bootcamps", &json!({"name": name})),
            CLIENT_A,
        )
        .await;
    }

    let response = send(
        &app,
        get("/api/v2/bootcamps?name=ModernTech&name=Codemasters"),
        CLIENT_A,
    )
    .await;
    let body = body_json(response).await;
    assert_eq!(body["count"], 1);
    assert_eq!(body["data"][0]["name"], "Codemasters");
}

#[tokio::test]
async fn test_operator_keys_are_stripped() {
    let dir = public_dir();
    let app = build_server(common::test_config(dir.path())).app();

    let created = send(
        &app,
        json_request(
            "POST",
            "/api/v2/users",
            &json!({
                "name": "Jane",
                "$where": "sleep(1000)",
                "profile": {"address.city": "Boston", "bio": "hi"},
            }),
        ),
        CLIENT_A,
    )
    .await;
    let user = body_json(created).await["data"].clone();
    assert!(user.get("$where").is_none());
    assert_eq!(user["profile"], json!({"bio": "hi"}));

    // An unstripped `$where` filter would match nothing.
    let listed = send(&app, get("/api/v2/users?%24where=1"), CLIENT_A).await;
    assert_eq!(body_json(listed).await["count"], 1);
}

#[tokio::test]
async fn test_markup_is_escaped_before_storage() {
    let dir = public_dir();
    let app = build_server(common::test_config(dir.path())).app();

    let created = send(
        &app,
        json_request(
            "POST",
            "/api/v2/reviews",
            &json!({"title": "<script>alert('x')</script>", "rating": 8}),
        ),
        CLIENT_A,
    )
    .await;

    let review = body_json(created).await["data"].clone();
    assert_eq!(review["title"], "&lt;script>alert('x')&lt;/script>");
    assert_eq!(review["rating"], 8);
}

#[tokio::test]
async fn test_errors_use_the_json_envelope() {
    let dir = public_dir();
    let app = build_server(common::test_config(dir.path())).app();

    let unknown = send(&app, get("/api/v2/nowhere"), CLIENT_A).await;
    assert_eq!(unknown.status(), StatusCode::NOT_FOUND);
    assert_eq!(
        body_json(unknown).await,
        json!({"success": false, "error": "Cannot GET /api/v2/nowhere"})
    );

    let bad_id = send(&app, get("/api/v2/courses/123"), CLIENT_A).await;
    assert_eq!(bad_id.status(), StatusCode::NOT_FOUND);
    assert_eq!(
        body_json(bad_id).await["error"],
        "Resource not found with id of 123"
    );

    let malformed = send(
        &app,
        Request::builder()
            .method("POST")
            .uri("/api/v2/courses")
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from("{\"title\":"))
            .unwrap(),
        CLIENT_A,
    )
    .await;
    assert_eq!(malformed.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(malformed).await["success"], false);
}

#[tokio::test]
async fn test_cors_preflight_is_answered() {
    let dir = public_dir();
    let app = build_server(common::test_config(dir.path())).app();

    let response = send(
        &app,
        Request::builder()
            .method("OPTIONS")
            .uri("/api/v2/bootcamps")
            .header(ORIGIN, "http://example.com")
            .header(ACCESS_CONTROL_REQUEST_METHOD, "POST")
            .body(Body::empty())
            .unwrap(),
        CLIENT_A,
    )
    .await;

    assert!(response.status().is_success());
    assert_eq!(response.headers().get(ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(), "*");
}

fn photo_upload(id: &str, content_type: &str, data: &str) -> Request<Body> {
    let boundary = "BOOTCAMP-PHOTO";
    let body = format!(
        "--{b}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"campus.jpg\"\r\n\
         Content-Type: {ct}\r\n\r\n{data}\r\n--{b}--\r\n",
        b = boundary,
        ct = content_type,
        data = data
    );
    Request::builder()
        .method("PUT")
        .uri(format!("/api/v2/bootcamps/{}/photo", id))
        .header(CONTENT_TYPE, format!("multipart/form-data; boundary={}", boundary))
        .body(Body::from(body))
        .unwrap()
}

#[tokio::test]
async fn test_bootcamp_photo_upload() {
    let dir = public_dir();
    let mut config = common::test_config(dir.path());
    config.uploads.max_file_size = 64;
    let app = build_server(config).app();

    let created = send(
        &app,
        json_request("POST", "/api/v2/bootcamps", &json!({"name": "Devcentral"})),
        CLIENT_A,
    )
    .await;
    let id = body_json(created).await["data"]["_id"]
        .as_str()
        .unwrap()
        .to_string();

    let uploaded = send(&app, photo_upload(&id, "image/jpeg", "jpegbytes"), CLIENT_A).await;
    assert_eq!(uploaded.status(), StatusCode::OK);
    let expected = format!("photo_{}.jpg", id);
    assert_eq!(body_json(uploaded).await["data"], expected.as_str());

    let shown = send(&app, get(&format!("/api/v2/bootcamps/{}", id)), CLIENT_A).await;
    assert_eq!(body_json(shown).await["data"]["photo"], expected.as_str());

    let not_image = send(&app, photo_upload(&id, "text/plain", "hello"), CLIENT_A).await;
    assert_eq!(not_image.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(not_image).await["error"], "Please upload an image file");

    let too_large = send(&app, photo_upload(&id, "image/jpeg", &"x".repeat(100)), CLIENT_A).await;
    assert_eq!(too_large.status(), StatusCode::PAYLOAD_TOO_LARGE);
}

#[tokio::test]
async fn test_auth_routes() {
    let dir = public_dir();
    let app = build_server(common::test_config(dir.path())).app();

    let logout = send(&app, get("/api/v2/auth/logout"), CLIENT_A).await;
    assert_eq!(logout.status(), StatusCode::OK);
    let cookie = logout
        .headers()
        .get(SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        .unwrap()
        .to_string();
    assert!(cookie.starts_with("token=none"));
    assert!(cookie.contains("HttpOnly"));

    let anonymous = send(&app, get("/api/v2/auth/me"), CLIENT_A).await;
    assert_eq!(anonymous.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(
        body_json(anonymous).await["error"],
        "Not authorized to access this route"
    );

    let mut request = get("/api/v2/auth/me");
    request
        .headers_mut()
        .insert(COOKIE, "token=abc.def.ghi".parse().unwrap());
    let signed_in = send(&app, request, CLIENT_A).await;
    assert_eq!(signed_in.status(), StatusCode::OK);
}
