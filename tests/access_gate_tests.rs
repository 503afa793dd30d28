//! 隐藏后台闸门与登录流程集成测试

use axum::http::{header, StatusCode};
use serde_json::json;
use studio_backoffice::models::security::SecurityEventType;

mod common;
use common::{
    body_json, cookie_header, create_test_app, get, get_with_cookie, json_request, send, set_cookies,
    ADMIN_PASSWORD,
};

fn login_request(password: &str, cookie: Option<&str>) -> axum::http::Request<axum::body::Body> {
    let mut request = json_request("POST", "/hasnaat/login", json!({ "password": password }));
    if let Some(cookie) = cookie {
        request
            .headers_mut()
            .insert(header::COOKIE, cookie.parse().unwrap());
    }
    request
}

#[tokio::test]
async fn test_legacy_admin_paths_return_404() {
    let (app, _) = create_test_app();

    for path in ["/admin", "/admin/login", "/dashboard", "/dashboard/settings"] {
        let response = send(&app, get(path)).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND, "path {}", path);
    }
}

#[tokio::test]
async fn test_protected_route_redirects_to_login() {
    let (app, _) = create_test_app();

    let response = send(&app, get("/hasnaat/dashboard")).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);

    let location = response.headers().get(header::LOCATION).unwrap().to_str().unwrap();
    assert_eq!(location, "/hasnaat/login?redirect=/hasnaat/dashboard");
}

#[tokio::test]
async fn test_login_page_is_public() {
    let (app, _) = create_test_app();

    let response = send(&app, get("/hasnaat/login")).await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["data"]["login_path"], "/hasnaat/login");
    assert_eq!(json["data"]["admin_configured"], true);
    assert_eq!(json["data"]["remaining_attempts"], 2);
    assert_eq!(json["data"]["authenticated"], false);
}

#[tokio::test]
async fn test_successful_login_grants_access() {
    let (app, state) = create_test_app();

    let response = send(&app, login_request(ADMIN_PASSWORD, None)).await;
    assert_eq!(response.status(), StatusCode::OK);

    let cookies = set_cookies(&response);
    assert!(cookies.iter().any(|c| c.starts_with("admin-auth=") && c.len() > "admin-auth=".len()));

    let json = body_json(response).await;
    assert_eq!(json["success"], true);
    assert_eq!(json["data"]["redirect"], "/hasnaat");
    assert_eq!(json["data"]["expires_in"], 1800);

    let response = send(&app, get_with_cookie("/hasnaat/dashboard", &cookie_header(&cookies))).await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert!(json["data"]["current_session"].is_string());
    assert_eq!(state.session_manager.stats().await.total, 1);
}

#[tokio::test]
async fn test_login_redirect_stays_inside_admin_path() {
    let (app, _) = create_test_app();

    let request = json_request(
        "POST",
        "/hasnaat/login",
        json!({ "password": ADMIN_PASSWORD, "redirect": "https://evil.example.com" }),
    );
    let json = body_json(send(&app, request).await).await;
    assert_eq!(json["data"]["redirect"], "/hasnaat");

    let request = json_request(
        "POST",
        "/hasnaat/login",
        json!({ "password": ADMIN_PASSWORD, "redirect": "/hasnaat/dashboard" }),
    );
    let json = body_json(send(&app, request).await).await;
    assert_eq!(json["data"]["redirect"], "/hasnaat/dashboard");
}

#[tokio::test]
async fn test_two_failed_logins_block_client() {
    let (app, state) = create_test_app();

    let first = send(&app, login_request("wrong", None)).await;
    assert_eq!(first.status(), StatusCode::UNAUTHORIZED);
    let first_cookies = set_cookies(&first);
    assert!(first_cookies.contains(&"failed-attempts=1".to_string()));
    let json = body_json(first).await;
    assert_eq!(json["success"], false);
    assert_eq!(json["remaining_attempts"], 1);

    let second = send(&app, login_request("wrong-again", Some(&cookie_header(&first_cookies)))).await;
    assert_eq!(second.status(), StatusCode::UNAUTHORIZED);
    let second_cookies = set_cookies(&second);
    assert!(second_cookies.contains(&"failed-attempts=2".to_string()));
    assert!(second_cookies.contains(&"security-block=true".to_string()));
    assert!(second_cookies.iter().any(|c| c.starts_with("block-timestamp=")));

    // 携带封禁 Cookie 的后续请求
    let response = send(&app, get_with_cookie("/hasnaat/dashboard", &cookie_header(&second_cookies))).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    // 删除 Cookie 后服务端封禁依然有效
    let response = send(&app, get("/hasnaat/dashboard")).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    // 被封禁后即使密码正确也无法登录
    let response = send(&app, login_request(ADMIN_PASSWORD, None)).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let events = state.security_monitor.events_for_ip("unknown").await;
    assert_eq!(
        events
            .iter()
            .filter(|e| e.event_type == SecurityEventType::FailedLogin)
            .count(),
        2
    );
    assert!(events
        .iter()
        .any(|e| e.event_type == SecurityEventType::SuspiciousActivity));
    assert_eq!(state.security_monitor.blocked_clients().await.len(), 2);
}

#[tokio::test]
async fn test_failed_logins_without_cookies_block_client() {
    let (app, _) = create_test_app();

    let first = send(&app, login_request("wrong", None)).await;
    assert_eq!(body_json(first).await["remaining_attempts"], 1);

    // 客户端丢弃 Cookie，计数由服务端延续
    let second = send(&app, login_request("wrong-again", None)).await;
    assert_eq!(second.status(), StatusCode::UNAUTHORIZED);
    assert!(set_cookies(&second).contains(&"failed-attempts=2".to_string()));
    assert_eq!(body_json(second).await["remaining_attempts"], 0);

    let response = send(&app, get("/hasnaat/dashboard")).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_security_block_cookie_without_timestamp_blocks() {
    let (app, _) = create_test_app();

    let response = send(&app, get_with_cookie("/hasnaat/dashboard", "security-block=true")).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = send(
        &app,
        get_with_cookie("/hasnaat/dashboard", "security-block=true; block-timestamp=garbage"),
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    // 超过封禁时长的时间戳解除 Cookie 封禁
    let stale_ms = (chrono::Utc::now() - chrono::Duration::hours(1)).timestamp_millis();
    let cookie = format!("security-block=true; block-timestamp={}", stale_ms);
    let response = send(&app, get_with_cookie("/hasnaat/dashboard", &cookie)).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
}

#[tokio::test]
async fn test_block_cookie_alone_denies_access() {
    let (app, _) = create_test_app();
    let now_ms = chrono::Utc::now().timestamp_millis();

    let cookie = format!("security-block=true; block-timestamp={}", now_ms);
    let response = send(&app, get_with_cookie("/hasnaat", &cookie)).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = send(&app, get_with_cookie("/hasnaat/login", "failed-attempts=2")).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_forged_cookie_is_rejected() {
    let (app, state) = create_test_app();

    let response = send(&app, get_with_cookie("/hasnaat/dashboard", "admin-auth=true")).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);

    let events = state.security_monitor.events_for_ip("unknown").await;
    assert!(events
        .iter()
        .any(|e| e.event_type == SecurityEventType::UnauthorizedAccess));
}

#[tokio::test]
async fn test_logout_ends_session_and_expires_cookies() {
    let (app, state) = create_test_app();

    let response = send(&app, login_request(ADMIN_PASSWORD, None)).await;
    let cookie = cookie_header(&set_cookies(&response));

    let request = axum::http::Request::builder()
        .method("POST")
        .uri("/hasnaat/logout")
        .header(header::COOKIE, &cookie)
        .body(axum::body::Body::empty())
        .unwrap();
    let response = send(&app, request).await;
    assert_eq!(response.status(), StatusCode::OK);

    let expired = set_cookies(&response);
    for name in ["admin-auth=", "failed-attempts=", "security-block=", "block-timestamp="] {
        assert!(expired.iter().any(|c| c == name), "{} not expired", name);
    }
    assert!(state.session_manager.active_sessions().await.is_empty());
}

#[tokio::test]
async fn test_cookie_replayed_after_logout_is_rejected() {
    let (app, state) = create_test_app();

    let response = send(&app, login_request(ADMIN_PASSWORD, None)).await;
    let cookie = cookie_header(&set_cookies(&response));
    assert_eq!(
        send(&app, get_with_cookie("/hasnaat/dashboard", &cookie)).await.status(),
        StatusCode::OK
    );

    let request = axum::http::Request::builder()
        .method("POST")
        .uri("/hasnaat/logout")
        .header(header::COOKIE, &cookie)
        .body(axum::body::Body::empty())
        .unwrap();
    assert_eq!(send(&app, request).await.status(), StatusCode::OK);

    let response = send(&app, get_with_cookie("/hasnaat/dashboard", &cookie)).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert!(state.session_manager.active_sessions().await.is_empty());

    // 管理 API 同样拒绝已登出的 Cookie
    let response = send(&app, get_with_cookie("/api/security/stats", &cookie)).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    // 重新登录签发新令牌后旧 Cookie 仍然无效
    let response = send(&app, login_request(ADMIN_PASSWORD, None)).await;
    let fresh = cookie_header(&set_cookies(&response));
    assert_eq!(
        send(&app, get_with_cookie("/hasnaat/dashboard", &fresh)).await.status(),
        StatusCode::OK
    );
    assert_eq!(
        send(&app, get_with_cookie("/hasnaat/dashboard", &cookie)).await.status(),
        StatusCode::SEE_OTHER
    );
}

#[tokio::test]
async fn test_cookie_from_another_device_is_rejected() {
    let (app, _) = create_test_app();

    let response = send(&app, login_request(ADMIN_PASSWORD, None)).await;
    let cookie = cookie_header(&set_cookies(&response));

    let request = axum::http::Request::builder()
        .uri("/hasnaat/dashboard")
        .header(header::COOKIE, &cookie)
        .header("x-forwarded-for", "203.0.113.99")
        .body(axum::body::Body::empty())
        .unwrap();
    assert_eq!(send(&app, request).await.status(), StatusCode::SEE_OTHER);
}

#[tokio::test]
async fn test_public_routes_bypass_gate() {
    let (app, _) = create_test_app();

    let response = send(&app, get("/health")).await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = send(&app, get("/hasnaat-not-admin")).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
