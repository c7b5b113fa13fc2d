use super::*;
use axum::http::{HeaderMap, HeaderValue, StatusCode, header};
use serde_json::json;

use crate::state::test_helpers;

fn jar_from(cookie_header: &str) -> CookieJar {
    let mut headers = HeaderMap::new();
    headers.insert(header::COOKIE, HeaderValue::from_str(cookie_header).unwrap());
    CookieJar::from_headers(&headers)
}

#[test]
fn target_uid_prefers_query() {
    assert_eq!(target_uid(Some("u5".into()), &jar_from("auth-token=u1")), Some("u5".into()));
}

#[test]
fn target_uid_falls_back_to_session() {
    assert_eq!(target_uid(None, &jar_from("auth-token=u1")), Some("u1".into()));
    assert_eq!(target_uid(Some(String::new()), &jar_from("auth-token=u1")), Some("u1".into()));
}

#[test]
fn target_uid_none_without_either() {
    assert_eq!(target_uid(None, &CookieJar::new()), None);
}

#[tokio::test]
async fn profile_for_session_user() {
    let backend = test_helpers::spawn_mock_backend().await;
    let base = test_helpers::spawn_app(&backend).await;
    let resp = reqwest::Client::new()
        .get(format!("{base}/api/users/profile"))
        .header(header::COOKIE, "auth-token=u1")
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["username"], "alice");
    assert_eq!(body["country"], "NL");
}

#[tokio::test]
async fn profile_without_uid_or_session_is_unauthorized() {
    let backend = test_helpers::spawn_mock_backend().await;
    let base = test_helpers::spawn_app(&backend).await;
    let resp = reqwest::get(format!("{base}/api/users/profile")).await.unwrap();

    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body, json!({ "error": "Unauthorized - User ID is required" }));
}

#[tokio::test]
async fn profile_backend_error_keeps_status_and_detail() {
    let backend = test_helpers::spawn_mock_backend().await;
    let base = test_helpers::spawn_app(&backend).await;
    let resp = reqwest::get(format!("{base}/api/users/profile?uid=nobody")).await.unwrap();

    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body, json!({ "error": "User not found" }));
}

// =============================================================================
// PUT /api/users/update
// =============================================================================

fn update_with(username: Option<&str>) -> ProfileUpdate {
    ProfileUpdate { username: username.map(str::to_owned), ..ProfileUpdate::default() }
}

fn alice_session() -> SessionUser {
    SessionUser { id: "u1".into(), display_name: "alice".into() }
}

#[test]
fn parse_age_takes_integer_prefix() {
    assert_eq!(parse_age(&json!("27")), Some(27));
    assert_eq!(parse_age(&json!(" 31 years")), Some(31));
    assert_eq!(parse_age(&json!(42)), Some(42));
    assert_eq!(parse_age(&json!(19.9)), Some(19));
    assert_eq!(parse_age(&json!("0")), Some(0));
}

#[test]
fn parse_age_rejects_blank_and_garbage() {
    assert_eq!(parse_age(&json!("")), None);
    assert_eq!(parse_age(&json!("abc")), None);
    assert_eq!(parse_age(&json!(0)), None);
    assert_eq!(parse_age(&json!(true)), None);
    assert_eq!(parse_age(&Value::Null), None);
}

#[test]
fn backend_fields_omit_missing_text_but_keep_age() {
    let update = ProfileUpdate {
        uid: Some("u1".into()),
        country: Some("NL".into()),
        age: Some(json!("30")),
        ..ProfileUpdate::default()
    };
    let value = serde_json::to_value(BackendProfileFields::from(&update)).unwrap();
    assert_eq!(value, json!({ "age": 30, "country": "NL" }));

    let value = serde_json::to_value(BackendProfileFields::from(&ProfileUpdate::default())).unwrap();
    assert_eq!(value, json!({ "age": null }));
}

#[test]
fn renamed_only_when_name_differs_from_session() {
    let session = alice_session();
    assert_eq!(renamed_to(&update_with(Some("alicia")), Some(&session)), Some("alicia"));
    assert_eq!(renamed_to(&update_with(Some("alice")), Some(&session)), None);
    assert_eq!(renamed_to(&update_with(Some("")), Some(&session)), None);
    assert_eq!(renamed_to(&update_with(None), Some(&session)), None);
    assert_eq!(renamed_to(&update_with(Some("alicia")), None), None);
}

fn username_set_cookie(resp: &reqwest::Response) -> Option<String> {
    resp.headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find(|c| c.starts_with("username="))
        .map(str::to_owned)
}

#[tokio::test]
async fn update_rename_reissues_username_cookie() {
    let backend = test_helpers::spawn_mock_backend().await;
    let base = test_helpers::spawn_app(&backend).await;
    let resp = reqwest::Client::new()
        .put(format!("{base}/api/users/update"))
        .header(header::COOKIE, "auth-token=u1; username=alice")
        .json(&json!({ "username": "alicia", "age": "29", "country": "NL" }))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let cookie = username_set_cookie(&resp).expect("username cookie re-issued");
    assert!(cookie.starts_with("username=alicia"), "{cookie}");
    assert!(cookie.contains("Max-Age=604800"), "{cookie}");
    assert!(cookie.contains("Path=/"), "{cookie}");
    assert!(!cookie.contains("HttpOnly"), "{cookie}");

    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["username"], "alicia");
    assert_eq!(body["age"], 29);
}

#[tokio::test]
async fn update_without_rename_leaves_cookies_alone() {
    let backend = test_helpers::spawn_mock_backend().await;
    let base = test_helpers::spawn_app(&backend).await;
    let resp = reqwest::Client::new()
        .put(format!("{base}/api/users/update"))
        .header(header::COOKIE, "auth-token=u1; username=alice")
        .json(&json!({ "username": "alice", "country": "BE" }))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    assert!(resp.headers().get(header::SET_COOKIE).is_none());
}

#[tokio::test]
async fn update_without_uid_or_session_is_unauthorized() {
    let backend = test_helpers::spawn_mock_backend().await;
    let base = test_helpers::spawn_app(&backend).await;
    let resp = reqwest::Client::new()
        .put(format!("{base}/api/users/update"))
        .json(&json!({ "username": "alicia" }))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body, json!({ "error": "Unauthorized - User ID is required" }));
}

#[tokio::test]
async fn update_backend_rejection_keeps_status_and_detail() {
    let backend = test_helpers::spawn_mock_backend().await;
    let base = test_helpers::spawn_app(&backend).await;
    let resp = reqwest::Client::new()
        .put(format!("{base}/api/users/update"))
        .header(header::COOKIE, "auth-token=u1; username=alice")
        .json(&json!({ "username": "taken" }))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert!(username_set_cookie(&resp).is_none());
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body, json!({ "error": "Username already taken" }));
}
