use reqwest::{header, Method, StatusCode};

use serde_json::{json, Value};

use sqlx::PgPool;

use url::Url;

use wiremock::matchers::{method, path};
use wiremock::{Mock, ResponseTemplate};

use clarifi::domain::UserRole;
use clarifi::repo::UsersRepo;

use crate::helpers::{refresh_cookie, TestApp, TestUser, PASSWORD};

#[sqlx::test]
async fn register_returns_tokens_and_refresh_cookie(pool: PgPool) -> sqlx::Result<()> {
    let app = TestApp::spawn(&pool).await;

    let res = app
        .register(&json!({
            "email": "New.User@Test.com",
            "username": "new_user",
            "password": PASSWORD,
            "firstName": "New",
        }))
        .await
        .expect("Failed to execute request");

    assert_eq!(StatusCode::CREATED, res.status());
    let cookie = res
        .headers()
        .get(header::SET_COOKIE)
        .and_then(|value| value.to_str().ok())
        .expect("Missing refresh cookie")
        .to_string();
    assert!(cookie.starts_with("refreshToken="));
    assert!(cookie.contains("HttpOnly"));
    assert!(cookie.contains("SameSite=Strict"));

    let body: Value = res.json().await.unwrap();
    assert_eq!("new.user@test.com", body["user"]["email"]);
    assert_eq!("BORROWER", body["user"]["role"]);
    assert!(body["user"].get("passwordHash").is_none());
    assert!(body["tokens"]["accessToken"].as_str().is_some());
    assert_eq!(900, body["tokens"]["expiresIn"]);

    Ok(())
}

#[sqlx::test]
async fn register_rejects_missing_fields(pool: PgPool) -> sqlx::Result<()> {
    let app = TestApp::spawn(&pool).await;

    let cases = [
        json!({ "username": "someone", "password": PASSWORD }),
        json!({ "email": "a@test.com", "password": PASSWORD }),
        json!({ "email": "a@test.com", "username": "someone" }),
    ];
    for body in cases {
        let res = app.register(&body).await.expect("Failed to execute request");
        assert_eq!(StatusCode::BAD_REQUEST, res.status(), "{}", body);
    }

    Ok(())
}

#[sqlx::test]
async fn register_reports_every_problem(pool: PgPool) -> sqlx::Result<()> {
    let app = TestApp::spawn(&pool).await;

    let res = app
        .register(&json!({
            "email": "not-an-email",
            "username": "ab",
            "password": "weak",
        }))
        .await
        .expect("Failed to execute request");

    assert_eq!(StatusCode::BAD_REQUEST, res.status());
    let body: Value = res.json().await.unwrap();
    assert_eq!("Validation Error", body["error"]);
    // email, username, and at least one password rule
    assert!(body["details"].as_array().unwrap().len() >= 3);

    Ok(())
}

#[sqlx::test]
async fn register_rejects_taken_email_and_username(pool: PgPool) -> sqlx::Result<()> {
    let app = TestApp::spawn(&pool).await;
    let user = TestUser::create(&app, UserRole::Borrower).await;

    let res = app
        .register(&json!({
            "email": user.email,
            "username": "another_name",
            "password": PASSWORD,
        }))
        .await
        .unwrap();
    assert_eq!(StatusCode::CONFLICT, res.status());

    let res = app
        .register(&json!({
            "email": "another@test.com",
            "username": user.username,
            "password": PASSWORD,
        }))
        .await
        .unwrap();
    assert_eq!(StatusCode::CONFLICT, res.status());
    let body: Value = res.json().await.unwrap();
    assert_eq!("Username already taken", body["error"]);

    Ok(())
}

#[sqlx::test]
async fn login_rejects_bad_credentials(pool: PgPool) -> sqlx::Result<()> {
    let app = TestApp::spawn(&pool).await;
    let user = TestUser::create(&app, UserRole::Borrower).await;

    let res = app.login(&user.email, "WrongPass123!").await.unwrap();
    assert_eq!(StatusCode::UNAUTHORIZED, res.status());
    let body: Value = res.json().await.unwrap();
    assert_eq!("Invalid email or password", body["error"]);

    let res = app.login("nobody@test.com", PASSWORD).await.unwrap();
    assert_eq!(StatusCode::UNAUTHORIZED, res.status());

    Ok(())
}

#[sqlx::test]
async fn login_rejects_disabled_accounts(pool: PgPool) -> sqlx::Result<()> {
    let app = TestApp::spawn(&pool).await;
    let user = TestUser::create(&app, UserRole::Borrower).await;
    UsersRepo::update_active(&pool, user.id, false).await?;

    let res = app.login(&user.email, PASSWORD).await.unwrap();

    assert_eq!(StatusCode::FORBIDDEN, res.status());
    Ok(())
}

#[sqlx::test]
async fn me_requires_a_valid_access_token(pool: PgPool) -> sqlx::Result<()> {
    let app = TestApp::spawn(&pool).await;
    let user = TestUser::create(&app, UserRole::Lender).await;

    let res = app
        .request(Method::GET, "api/auth/me")
        .send()
        .await
        .unwrap();
    assert_eq!(StatusCode::UNAUTHORIZED, res.status());

    let res = app
        .request(Method::GET, "api/auth/me")
        .bearer_auth("garbage.token")
        .send()
        .await
        .unwrap();
    assert_eq!(StatusCode::FORBIDDEN, res.status());

    let res = app.api(Method::GET, "auth/me", &user).send().await.unwrap();
    assert_eq!(StatusCode::OK, res.status());
    let body: Value = res.json().await.unwrap();
    assert_eq!(user.email, body["email"]);
    assert_eq!("LENDER", body["role"]);
    assert!(body["lastLoginAt"].is_string());

    Ok(())
}

#[sqlx::test]
async fn refresh_rotates_the_refresh_token(pool: PgPool) -> sqlx::Result<()> {
    let app = TestApp::spawn(&pool).await;
    let user = TestUser::create(&app, UserRole::Borrower).await;

    let res = app
        .request(Method::POST, "api/auth/refresh")
        .header(header::COOKIE, format!("refreshToken={}", user.refresh_token))
        .send()
        .await
        .unwrap();
    assert_eq!(StatusCode::OK, res.status());
    let rotated = refresh_cookie(&res).expect("Missing rotated cookie");
    assert_ne!(user.refresh_token, rotated);
    let body: Value = res.json().await.unwrap();
    assert!(body["accessToken"].as_str().is_some());

    // Replaying the old token fails
    let res = app
        .request(Method::POST, "api/auth/refresh")
        .json(&json!({ "refreshToken": user.refresh_token }))
        .send()
        .await
        .unwrap();
    assert_eq!(StatusCode::FORBIDDEN, res.status());
    let body: Value = res.json().await.unwrap();
    assert_eq!("Invalid refresh token", body["error"]);

    // The rotated one still works
    let res = app
        .request(Method::POST, "api/auth/refresh")
        .json(&json!({ "refreshToken": rotated }))
        .send()
        .await
        .unwrap();
    assert_eq!(StatusCode::OK, res.status());

    Ok(())
}

#[sqlx::test]
async fn refresh_requires_a_token(pool: PgPool) -> sqlx::Result<()> {
    let app = TestApp::spawn(&pool).await;

    let res = app
        .request(Method::POST, "api/auth/refresh")
        .send()
        .await
        .unwrap();

    assert_eq!(StatusCode::BAD_REQUEST, res.status());
    Ok(())
}

#[sqlx::test]
async fn logout_revokes_sessions(pool: PgPool) -> sqlx::Result<()> {
    let app = TestApp::spawn(&pool).await;
    let user = TestUser::create(&app, UserRole::Borrower).await;

    let res = app
        .api(Method::POST, "auth/logout", &user)
        .send()
        .await
        .unwrap();
    assert_eq!(StatusCode::OK, res.status());
    assert_eq!(Some(String::new()), refresh_cookie(&res));

    let res = app
        .request(Method::POST, "api/auth/refresh")
        .json(&json!({ "refreshToken": user.refresh_token }))
        .send()
        .await
        .unwrap();
    assert_eq!(StatusCode::FORBIDDEN, res.status());

    Ok(())
}

/// Pull the reset token out of the link in the captured email
async fn reset_token_from_email(app: &TestApp) -> String {
    let requests = app.email_server.received_requests().await.unwrap();
    let body: Value = serde_json::from_slice(&requests[0].body).unwrap();
    let text = body["TextBody"].as_str().unwrap();

    let links: Vec<_> = linkify::LinkFinder::new()
        .links(text)
        .filter(|link| *link.kind() == linkify::LinkKind::Url)
        .collect();
    assert_eq!(1, links.len());

    let link = Url::parse(links[0].as_str()).unwrap();
    assert_eq!(Some("localhost"), link.host_str());
    link.query_pairs()
        .find(|(key, _)| key == "token")
        .map(|(_, value)| value.into_owned())
        .expect("Reset link has no token")
}

#[sqlx::test]
async fn password_reset_flow(pool: PgPool) -> sqlx::Result<()> {
    let app = TestApp::spawn(&pool).await;
    let user = TestUser::create(&app, UserRole::Borrower).await;

    Mock::given(path("/email"))
        .and(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&app.email_server)
        .await;

    let res = app
        .request(Method::POST, "api/auth/password-reset/request")
        .json(&json!({ "email": user.email }))
        .send()
        .await
        .unwrap();
    assert_eq!(StatusCode::OK, res.status());

    let token = reset_token_from_email(&app).await;
    let confirm = |password: &'static str| {
        app.request(Method::POST, "api/auth/password-reset/confirm")
            .json(&json!({ "resetToken": token, "newPassword": password }))
            .send()
    };

    let res = confirm("weak").await.unwrap();
    assert_eq!(StatusCode::BAD_REQUEST, res.status());

    let res = confirm("BrandNewPass456!").await.unwrap();
    assert_eq!(StatusCode::OK, res.status());

    // Spent once the password changed
    let res = confirm("AnotherPass789!").await.unwrap();
    assert_eq!(StatusCode::UNAUTHORIZED, res.status());

    let res = app.login(&user.email, "BrandNewPass456!").await.unwrap();
    assert_eq!(StatusCode::OK, res.status());
    let res = app.login(&user.email, PASSWORD).await.unwrap();
    assert_eq!(StatusCode::UNAUTHORIZED, res.status());

    // Existing sessions were revoked
    let res = app
        .request(Method::POST, "api/auth/refresh")
        .json(&json!({ "refreshToken": user.refresh_token }))
        .send()
        .await
        .unwrap();
    assert_eq!(StatusCode::FORBIDDEN, res.status());

    Ok(())
}

#[sqlx::test]
async fn password_reset_request_is_neutral_for_unknown_emails(pool: PgPool) -> sqlx::Result<()> {
    let app = TestApp::spawn(&pool).await;

    Mock::given(path("/email"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&app.email_server)
        .await;

    let res = app
        .request(Method::POST, "api/auth/password-reset/request")
        .json(&json!({ "email": "nobody@test.com" }))
        .send()
        .await
        .unwrap();

    assert_eq!(StatusCode::OK, res.status());
    Ok(())
}

#[sqlx::test]
async fn password_reset_rejects_forged_tokens(pool: PgPool) -> sqlx::Result<()> {
    let app = TestApp::spawn(&pool).await;

    let res = app
        .request(Method::POST, "api/auth/password-reset/confirm")
        .json(&json!({ "resetToken": "forged.token", "newPassword": "BrandNewPass456!" }))
        .send()
        .await
        .unwrap();

    assert_eq!(StatusCode::UNAUTHORIZED, res.status());
    Ok(())
}

#[sqlx::test]
async fn change_password(pool: PgPool) -> sqlx::Result<()> {
    let app = TestApp::spawn(&pool).await;
    let user = TestUser::create(&app, UserRole::Borrower).await;
    let change = |current: &'static str, new: &'static str| {
        app.api(Method::POST, "auth/password/change", &user)
            .json(&json!({ "currentPassword": current, "newPassword": new }))
            .send()
    };

    let res = change("WrongPass123!", "BrandNewPass456!").await.unwrap();
    assert_eq!(StatusCode::UNAUTHORIZED, res.status());

    let res = change(PASSWORD, PASSWORD).await.unwrap();
    assert_eq!(StatusCode::BAD_REQUEST, res.status());

    let res = change(PASSWORD, "short").await.unwrap();
    assert_eq!(StatusCode::BAD_REQUEST, res.status());

    let res = change(PASSWORD, "BrandNewPass456!").await.unwrap();
    assert_eq!(StatusCode::OK, res.status());

    let res = app.login(&user.email, "BrandNewPass456!").await.unwrap();
    assert_eq!(StatusCode::OK, res.status());

    Ok(())
}

#[sqlx::test]
async fn admins_manage_roles_and_status(pool: PgPool) -> sqlx::Result<()> {
    let app = TestApp::spawn(&pool).await;
    let admin = TestUser::create(&app, UserRole::Admin).await;
    let lender = TestUser::create(&app, UserRole::Lender).await;
    let user = TestUser::create(&app, UserRole::Borrower).await;

    let res = app
        .api(Method::PUT, &format!("users/{}/role", user.id), &lender)
        .json(&json!({ "role": "UNDERWRITER" }))
        .send()
        .await
        .unwrap();
    assert_eq!(StatusCode::FORBIDDEN, res.status());

    let res = app
        .api(Method::PUT, &format!("users/{}/role", user.id), &admin)
        .json(&json!({ "role": "UNDERWRITER" }))
        .send()
        .await
        .unwrap();
    assert_eq!(StatusCode::OK, res.status());
    let body: Value = res.json().await.unwrap();
    assert_eq!("UNDERWRITER", body["role"]);

    let res = app
        .api(Method::PUT, &format!("users/{}/role", uuid::Uuid::new_v4()), &admin)
        .json(&json!({ "role": "LENDER" }))
        .send()
        .await
        .unwrap();
    assert_eq!(StatusCode::NOT_FOUND, res.status());

    let res = app
        .api(Method::PUT, &format!("users/{}/status", user.id), &admin)
        .json(&json!({ "isActive": false }))
        .send()
        .await
        .unwrap();
    assert_eq!(StatusCode::OK, res.status());

    // Deactivation ends every session
    let res = app
        .request(Method::POST, "api/auth/refresh")
        .json(&json!({ "refreshToken": user.refresh_token }))
        .send()
        .await
        .unwrap();
    assert_eq!(StatusCode::FORBIDDEN, res.status());

    Ok(())
}
