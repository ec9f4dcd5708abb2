/// Integration tests for the MarketDesk API
///
/// These tests drive the full router:
/// - Registration and login for every account class
/// - Session resolution, expiry and logout
/// - Administrator-only guards
/// - Validation error responses
/// - Health reporting without a database

mod common;

use axum::http::StatusCode;
use common::{json_body, TestApp, PASSWORD};
use marketdesk_shared::auth::provider::SessionPolicies;
use marketdesk_shared::models::account::{AccountClass, AccountStatus};
use serde_json::json;

#[tokio::test]
async fn test_health_reports_degraded_without_database() {
    let app = TestApp::new();

    let response = app.send("GET", "/health", None, None).await;
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(response.headers().get("X-Frame-Options").unwrap(), "DENY");

    let body = json_body(response).await;
    assert_eq!(body["status"], "degraded");
    assert_eq!(body["database"], "disconnected");
}

#[tokio::test]
async fn test_user_registration_is_active_immediately() {
    let app = TestApp::new();

    let response = app
        .send(
            "POST",
            "/v1/auth/register",
            None,
            Some(json!({
                "class": "user",
                "login_id": "Jane.Doe",
                "password": PASSWORD,
                "display_name": "Jane Doe"
            })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let body = json_body(response).await;
    assert_eq!(body["status"], "active");
    assert_eq!(body["login_id"], "jane.doe");
    assert!(body.get("password_hash").is_none());
    assert!(body.get("password").is_none());

    // Login ID is case-insensitive
    let token = app.login(AccountClass::User, "JANE.DOE").await;
    assert!(!token.is_empty());
}

#[tokio::test]
async fn test_organization_registration_waits_for_approval() {
    let app = TestApp::new();

    let response = app
        .send(
            "POST",
            "/v1/auth/register",
            None,
            Some(json!({
                "class": "seeking_organization",
                "login_id": "acme",
                "password": PASSWORD,
                "display_name": "Acme Buyer",
                "organization_name": "Acme Ltd",
                "organization_type": "Start-up",
                "country": "India"
            })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    assert_eq!(json_body(response).await["status"], "pending");

    let response = app
        .send(
            "POST",
            "/v1/auth/login",
            None,
            Some(json!({
                "class": "seeking_organization",
                "login_id": "acme",
                "password": PASSWORD
            })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(json_body(response).await["error"], "account_pending");
}

#[tokio::test]
async fn test_registration_errors() {
    let app = TestApp::new();

    // Administrators cannot self-register
    let response = app
        .send(
            "POST",
            "/v1/auth/register",
            None,
            Some(json!({
                "class": "administrator",
                "login_id": "root",
                "password": PASSWORD,
                "display_name": "Root"
            })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(json_body(response).await["error"], "registration_closed");

    // Weak password and missing organization name
    let response = app
        .send(
            "POST",
            "/v1/auth/register",
            None,
            Some(json!({
                "class": "seeking_organization",
                "login_id": "weak",
                "password": "password",
                "display_name": "Weak"
            })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let body = json_body(response).await;
    assert_eq!(body["error"], "validation_error");
    let fields: Vec<&str> = body["details"]
        .as_array()
        .unwrap()
        .iter()
        .map(|d| d["field"].as_str().unwrap())
        .collect();
    assert!(fields.contains(&"password"));
    assert!(fields.contains(&"__all__"));

    // Duplicate login ID within a class
    app.auth.seed(AccountClass::User, "taken", AccountStatus::Active);
    let response = app
        .send(
            "POST",
            "/v1/auth/register",
            None,
            Some(json!({
                "class": "user",
                "login_id": "Taken",
                "password": PASSWORD,
                "display_name": "Second"
            })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_bad_credentials_are_indistinguishable() {
    let app = TestApp::new();
    app.auth.seed(AccountClass::User, "jane", AccountStatus::Active);

    let unknown = app
        .send(
            "POST",
            "/v1/auth/login",
            None,
            Some(json!({ "class": "user", "login_id": "nobody", "password": PASSWORD })),
        )
        .await;
    let wrong_password = app
        .send(
            "POST",
            "/v1/auth/login",
            None,
            Some(json!({ "class": "user", "login_id": "jane", "password": "Wrong#2024" })),
        )
        .await;

    assert_eq!(unknown.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(wrong_password.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(json_body(unknown).await, json_body(wrong_password).await);

    // Accounts are scoped by class
    let other_portal = app
        .send(
            "POST",
            "/v1/auth/login",
            None,
            Some(json!({ "class": "administrator", "login_id": "jane", "password": PASSWORD })),
        )
        .await;
    assert_eq!(other_portal.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_inactive_and_rejected_accounts_cannot_log_in() {
    let app = TestApp::new();
    app.auth.seed(AccountClass::User, "inactive", AccountStatus::Inactive);
    app.auth
        .seed(AccountClass::SeekingOrganization, "rejected", AccountStatus::Rejected);

    for (class, login_id, code) in [
        ("user", "inactive", "account_inactive"),
        ("seeking_organization", "rejected", "account_rejected"),
    ] {
        let response = app
            .send(
                "POST",
                "/v1/auth/login",
                None,
                Some(json!({ "class": class, "login_id": login_id, "password": PASSWORD })),
            )
            .await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert_eq!(json_body(response).await["error"], code);
    }
}

#[tokio::test]
async fn test_session_and_logout() {
    let app = TestApp::new();
    app.auth
        .seed(AccountClass::SeekingOrganization, "acme", AccountStatus::Active);
    let token = app.login(AccountClass::SeekingOrganization, "acme").await;

    let response = app.send("GET", "/v1/auth/session", Some(&token), None).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers().get("Cache-Control").unwrap(), "no-store");

    let body = json_body(response).await;
    assert_eq!(body["class"], "seeking_organization");
    assert_eq!(body["organization_name"], "Acme Ltd");
    assert_eq!(body["membership_status"], "not-a-member");

    let response = app.send("POST", "/v1/auth/logout", Some(&token), None).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert_eq!(app.auth.session_count(), 0);

    let response = app.send("GET", "/v1/auth/session", Some(&token), None).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_expired_session_is_rejected() {
    let policies = SessionPolicies::default().with_lifetime_hours(AccountClass::User, 0);
    let app = TestApp::with_policies(policies);
    app.auth.seed(AccountClass::User, "jane", AccountStatus::Active);
    let token = app.login(AccountClass::User, "jane").await;

    let response = app.send("GET", "/v1/auth/session", Some(&token), None).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(json_body(response).await["message"], "Session expired");
    assert_eq!(app.auth.session_count(), 0);
}

#[tokio::test]
async fn test_protected_routes_require_a_bearer_token() {
    let app = TestApp::new();

    let response = app.send("GET", "/v1/auth/session", None, None).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .send("GET", "/v1/master-data/countries", Some("not-a-session"), None)
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(json_body(response).await["error"], "unauthorized");
}

#[tokio::test]
async fn test_admin_routes_reject_other_classes() {
    let app = TestApp::new();
    app.auth.seed(AccountClass::User, "jane", AccountStatus::Active);
    let token = app.login(AccountClass::User, "jane").await;

    let requests = [
        ("GET", "/v1/admin/accounts", None),
        ("GET", "/v1/admin/dashboard", None),
        ("POST", "/v1/master-data/countries", Some(json!({ "name": "India", "code": "IN" }))),
        ("GET", "/v1/pricing/configs", None),
        ("POST", "/v1/pricing/configs/import", None),
    ];

    for (method, uri, body) in requests {
        let response = app.send(method, uri, Some(&token), body).await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN, "{} {}", method, uri);
        assert_eq!(json_body(response).await["error"], "forbidden");
    }
}

#[tokio::test]
async fn test_admin_request_validation() {
    let app = TestApp::new();
    app.auth
        .seed(AccountClass::Administrator, "root", AccountStatus::Active);
    let token = app.login(AccountClass::Administrator, "root").await;

    let response = app
        .send("GET", "/v1/admin/accounts?class=robots", Some(&token), None)
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app.send("GET", "/v1/master-data/planets", Some(&token), None).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    // Countries need a code
    let response = app
        .send(
            "POST",
            "/v1/master-data/countries",
            Some(&token),
            Some(json!({ "name": "India", "code": "  " })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(json_body(response).await["details"][0]["field"], "code");

    let response = app
        .send(
            "POST",
            "/v1/pricing/configs",
            Some(&token),
            Some(json!({
                "engagementModel": "Market Place",
                "organizationType": "Start-up",
                "discountPercentage": 150
            })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_pricing_resolve_requires_engagement_model() {
    let app = TestApp::new();
    app.auth.seed(AccountClass::User, "jane", AccountStatus::Active);
    let token = app.login(AccountClass::User, "jane").await;

    let response = app
        .send(
            "POST",
            "/v1/pricing/resolve",
            Some(&token),
            Some(json!({ "engagementModel": "" })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(json_body(response).await["details"][0]["field"], "engagement_model");
}
