mod common;

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
};
use common::{
    body_json, json_request, multipart_body, multipart_request, request_with_cookies,
    set_cookie_header, set_cookie_value, TestApp,
};
use serde_json::json;
use tower::ServiceExt;

const ACCESS: &str = "auth-token";
const REFRESH: &str = "refresh-token";

async fn register(app: &TestApp, name: &str, email: &str, password: &str) -> StatusCode {
    app.router
        .clone()
        .oneshot(json_request(
            "POST",
            "/auth/register",
            json!({ "name": name, "email": email, "password": password }),
        ))
        .await
        .unwrap()
        .status()
}

async fn login(app: &TestApp, email: &str, password: &str) -> (String, String) {
    let response = app
        .router
        .clone()
        .oneshot(json_request(
            "POST",
            "/auth/login",
            json!({ "email": email, "password": password }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    (
        set_cookie_value(&response, ACCESS).expect("auth-token cookie"),
        set_cookie_value(&response, REFRESH).expect("refresh-token cookie"),
    )
}

#[tokio::test]
async fn register_login_me_refresh_and_replay() {
    let app = TestApp::spawn();

    assert_eq!(register(&app, "A", "a@x.com", "secret1").await, StatusCode::CREATED);

    let (access, refresh) = login(&app, "a@x.com", "secret1").await;
    assert!(!access.is_empty());
    assert!(!refresh.is_empty());

    let me = app
        .router
        .clone()
        .oneshot(request_with_cookies("GET", "/auth/me", &[(ACCESS, &access)]))
        .await
        .unwrap();
    assert_eq!(me.status(), StatusCode::OK);
    let body = body_json(me).await;
    assert_eq!(body["name"], "A");
    assert_eq!(body["email"], "a@x.com");
    assert!(body["id"].is_i64());
    assert_eq!(body.as_object().unwrap().len(), 3);

    let refreshed = app
        .router
        .clone()
        .oneshot(request_with_cookies("POST", "/auth/refresh-token", &[(REFRESH, &refresh)]))
        .await
        .unwrap();
    assert_eq!(refreshed.status(), StatusCode::OK);
    let new_access = set_cookie_value(&refreshed, ACCESS).unwrap();
    let new_refresh = set_cookie_value(&refreshed, REFRESH).unwrap();
    assert_ne!(new_access, access);
    assert_ne!(new_refresh, refresh);

    let replay = app
        .router
        .clone()
        .oneshot(request_with_cookies("POST", "/auth/refresh-token", &[(REFRESH, &refresh)]))
        .await
        .unwrap();
    assert_eq!(replay.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn login_cookies_are_http_only() {
    let app = TestApp::spawn();
    register(&app, "B", "b@x.com", "secret1").await;

    let response = app
        .router
        .clone()
        .oneshot(json_request(
            "POST",
            "/auth/login",
            json!({ "email": "b@x.com", "password": "secret1" }),
        ))
        .await
        .unwrap();

    for name in [ACCESS, REFRESH] {
        let cookie = set_cookie_header(&response, name).unwrap();
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains("Path=/"));
        assert!(cookie.contains("Max-Age="));
    }
    let body = body_json(response).await;
    assert_eq!(body["status"], "success");
}

#[tokio::test]
async fn bad_credentials_are_indistinguishable() {
    let app = TestApp::spawn();
    register(&app, "C", "c@x.com", "secret1").await;

    let mut bodies = Vec::new();
    for (email, password) in [("c@x.com", "wrong-password"), ("nobody@x.com", "secret1")] {
        let response = app
            .router
            .clone()
            .oneshot(json_request(
                "POST",
                "/auth/login",
                json!({ "email": email, "password": password }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(set_cookie_value(&response, ACCESS).is_none());
        bodies.push(body_json(response).await);
    }
    assert_eq!(bodies[0], bodies[1]);
}

#[tokio::test]
async fn register_rejects_invalid_and_duplicate_input() {
    let app = TestApp::spawn();

    assert_eq!(
        register(&app, "D", "not-an-email", "secret1").await,
        StatusCode::UNPROCESSABLE_ENTITY
    );
    assert_eq!(
        register(&app, "D", "d@x.com", "short").await,
        StatusCode::UNPROCESSABLE_ENTITY
    );

    let malformed = app
        .router
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/auth/register")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from("{not json"))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(malformed.status(), StatusCode::BAD_REQUEST);

    assert_eq!(register(&app, "D", "d@x.com", "secret1").await, StatusCode::CREATED);
    assert_eq!(register(&app, "D2", "D@X.com", "secret1").await, StatusCode::CONFLICT);
}

#[tokio::test]
async fn refresh_without_cookie_is_unauthorized() {
    let app = TestApp::spawn();

    let response = app
        .router
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/auth/refresh-token")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn access_token_is_not_accepted_as_refresh_token() {
    let app = TestApp::spawn();
    register(&app, "E", "e@x.com", "secret1").await;
    let (access, _) = login(&app, "e@x.com", "secret1").await;

    let response = app
        .router
        .clone()
        .oneshot(request_with_cookies("POST", "/auth/refresh-token", &[(REFRESH, &access)]))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_refresh_requests_have_one_winner() {
    let app = TestApp::spawn();
    register(&app, "F", "f@x.com", "secret1").await;
    let (_, refresh) = login(&app, "f@x.com", "secret1").await;

    let mut handles = Vec::new();
    for _ in 0..8 {
        let router = app.router.clone();
        let refresh = refresh.clone();
        handles.push(tokio::spawn(async move {
            router
                .oneshot(request_with_cookies(
                    "POST",
                    "/auth/refresh-token",
                    &[(REFRESH, &refresh)],
                ))
                .await
                .unwrap()
                .status()
        }));
    }

    let mut ok = 0;
    for handle in handles {
        match handle.await.unwrap() {
            StatusCode::OK => ok += 1,
            status => assert_eq!(status, StatusCode::UNAUTHORIZED),
        }
    }
    assert_eq!(ok, 1);
}

#[tokio::test]
async fn logout_clears_cookies_and_revokes_refresh_token() {
    let app = TestApp::spawn();
    register(&app, "G", "g@x.com", "secret1").await;
    let (access, refresh) = login(&app, "g@x.com", "secret1").await;

    let response = app
        .router
        .clone()
        .oneshot(request_with_cookies(
            "POST",
            "/auth/logout",
            &[(ACCESS, &access), (REFRESH, &refresh)],
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    for name in [ACCESS, REFRESH] {
        assert_eq!(set_cookie_value(&response, name).as_deref(), Some(""));
        assert!(set_cookie_header(&response, name).unwrap().contains("Max-Age=0"));
    }

    let replay = app
        .router
        .clone()
        .oneshot(request_with_cookies("POST", "/auth/refresh-token", &[(REFRESH, &refresh)]))
        .await
        .unwrap();
    assert_eq!(replay.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn logout_without_session_still_succeeds() {
    let app = TestApp::spawn();

    let response = app
        .router
        .clone()
        .oneshot(request_with_cookies("POST", "/auth/logout", &[(REFRESH, "garbage")]))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(set_cookie_header(&response, ACCESS).is_some());
}

#[tokio::test]
async fn profile_requires_a_valid_token_via_cookie_or_bearer() {
    let app = TestApp::spawn();
    register(&app, "H", "h@x.com", "secret1").await;
    let (access, _) = login(&app, "h@x.com", "secret1").await;

    let anonymous = app
        .router
        .clone()
        .oneshot(Request::builder().uri("/auth/profile").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(anonymous.status(), StatusCode::UNAUTHORIZED);

    let forged = app
        .router
        .clone()
        .oneshot(request_with_cookies("GET", "/auth/profile", &[(ACCESS, "forged.token.value")]))
        .await
        .unwrap();
    assert_eq!(forged.status(), StatusCode::UNAUTHORIZED);

    let via_cookie = app
        .router
        .clone()
        .oneshot(request_with_cookies("GET", "/auth/profile", &[(ACCESS, &access)]))
        .await
        .unwrap();
    assert_eq!(via_cookie.status(), StatusCode::OK);
    assert_eq!(body_json(via_cookie).await["email"], "h@x.com");

    let via_bearer = app
        .router
        .clone()
        .oneshot(
            Request::builder()
                .uri("/auth/profile")
                .header(header::AUTHORIZATION, format!("Bearer {}", access))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(via_bearer.status(), StatusCode::OK);
}

#[tokio::test]
async fn resource_routes_reject_anonymous_requests() {
    let app = TestApp::spawn();

    for (method, uri) in [
        ("GET", "/users"),
        ("GET", "/users/1"),
        ("GET", "/category"),
        ("POST", "/location"),
        ("GET", "/jobs"),
        ("DELETE", "/jobs/1"),
        ("GET", "/jobs/1/photos"),
        ("GET", "/payment"),
    ] {
        let response = app
            .router
            .clone()
            .oneshot(Request::builder().method(method).uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "{} {}", method, uri);
    }
}

#[tokio::test]
async fn public_user_creation_never_grants_admin() {
    let app = TestApp::spawn();

    let response = app
        .router
        .clone()
        .oneshot(json_request(
            "POST",
            "/users",
            json!({ "name": "Mallory", "email": "m@x.com", "password": "secret1", "admin": true }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);
    let user = body_json(response).await;
    assert_eq!(user["email"], "m@x.com");
    assert_eq!(user["admin"], false);
    assert!(user.get("passwordHash").is_none());
}

#[tokio::test]
async fn photo_upload_without_files_is_a_bad_request() {
    let app = TestApp::spawn();
    register(&app, "I", "i@x.com", "secret1").await;
    let (access, _) = login(&app, "i@x.com", "secret1").await;

    let boundary = "studio-test-boundary";
    let body = format!(
        "--{b}\r\nContent-Disposition: form-data; name=\"workType\"\r\n\r\nWedding\r\n\
         --{b}\r\nContent-Disposition: form-data; name=\"workName\"\r\n\r\nAna Rui\r\n\
         --{b}--\r\n",
        b = boundary
    );

    let response = app
        .router
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/jobs/1/photos")
                .header(header::COOKIE, format!("{}={}", ACCESS, access))
                .header(
                    header::CONTENT_TYPE,
                    format!("multipart/form-data; boundary={}", boundary),
                )
                .body(Body::from(body))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["error"], "No files provided for upload.");
    assert!(app.photo_store.is_empty());
}

#[tokio::test]
async fn photo_batch_larger_than_two_megabytes_is_parsed() {
    let app = TestApp::spawn();
    register(&app, "J", "j@x.com", "secret1").await;
    let (access, _) = login(&app, "j@x.com", "secret1").await;

    // One camera-sized frame plus enough thumbnails to trip the file-count
    // check, which only runs once the whole body has been read.
    let frame = vec![0xFF_u8; 3 * 1024 * 1024];
    let thumb = [0xD8_u8; 64];
    let body = multipart_body(
        &[("workType", "Wedding"), ("workName", "Ana Rui")],
        &[
            ("frame.jpg", frame.as_slice()),
            ("t1.jpg", &thumb[..]),
            ("t2.jpg", &thumb[..]),
            ("t3.jpg", &thumb[..]),
            ("t4.jpg", &thumb[..]),
            ("t5.jpg", &thumb[..]),
        ],
    );

    let response = app
        .router
        .clone()
        .oneshot(multipart_request("/jobs/1/photos", &access, body))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["error"], "At most 5 files can be uploaded at once");
    assert!(app.photo_store.is_empty());
}

#[tokio::test]
async fn photo_upload_over_configured_limit_is_payload_too_large() {
    let app = TestApp::spawn_with(|config| config.photos.max_upload_bytes = 1024);
    register(&app, "K", "k@x.com", "secret1").await;
    let (access, _) = login(&app, "k@x.com", "secret1").await;

    let frame = vec![0xFF_u8; 8 * 1024];
    let body = multipart_body(
        &[("workType", "Wedding"), ("workName", "Ana Rui")],
        &[("frame.jpg", frame.as_slice())],
    );

    let response = app
        .router
        .clone()
        .oneshot(multipart_request("/jobs/1/photos", &access, body))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    assert!(app.photo_store.is_empty());
}

#[tokio::test]
async fn request_id_and_security_headers_are_set() {
    let app = TestApp::spawn();

    let response = app
        .router
        .clone()
        .oneshot(request_with_cookies("POST", "/auth/logout", &[]))
        .await
        .unwrap();

    assert!(response.headers().contains_key("x-request-id"));
    assert_eq!(
        response.headers().get("x-content-type-options").unwrap(),
        "nosniff"
    );
}

#[tokio::test]
async fn metrics_endpoint_serves_prometheus_text() {
    studio_service::services::metrics::init_metrics();
    let app = TestApp::spawn();

    let response = app
        .router
        .clone()
        .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}
