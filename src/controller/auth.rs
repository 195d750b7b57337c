use actix_web::dev::HttpServiceFactory;
use actix_web::{get, post, web, HttpRequest, HttpResponse};

use serde::{Deserialize, Serialize};
use serde_json::json;

use secrecy::{ExposeSecret, Secret};

use sqlx::PgPool;

use crate::auth::{
    hash_password, issue_session, revoke_sessions, rotate_session, verify_password,
    AccessTokenBody, AuthConfig, AuthenticatedUser, IssuedTokens, REFRESH_COOKIE,
};
use crate::client::{Email, EmailClient};
use crate::crypto::ResetClaims;
use crate::domain::{ActivityAction, EmailAddress, NewPassword, PersonName, UserRole, Username};
use crate::error::{Error, Result};
use crate::model::{NewActivity, NewUser, RequestOrigin, User};
use crate::repo::UsersRepo;

use super::{record_activity, required};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterBody {
    email: Option<String>,
    username: Option<String>,
    password: Option<Secret<String>>,
    first_name: Option<String>,
    last_name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginBody {
    email: Option<String>,
    password: Option<Secret<String>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshBody {
    refresh_token: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ResetRequestBody {
    email: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetConfirmBody {
    reset_token: Option<String>,
    new_password: Option<Secret<String>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordBody {
    current_password: Option<Secret<String>>,
    new_password: Option<Secret<String>>,
}

#[derive(Debug, Serialize)]
struct SessionBody<'a> {
    user: &'a User,
    tokens: AccessTokenBody,
}

/// Respond with the user, the access token, and the refresh token cookie
fn session_response(
    mut response: actix_web::HttpResponseBuilder,
    auth: &AuthConfig,
    user: &User,
    tokens: &IssuedTokens,
) -> HttpResponse {
    response
        .cookie(auth.refresh_cookie(&tokens.refresh_token))
        .json(SessionBody {
            user,
            tokens: tokens.body(),
        })
}

fn parse_new_password(candidate: &Secret<String>) -> Result<NewPassword> {
    NewPassword::parse(candidate.expose_secret())
        .map_err(|reasons| Error::validation_with("Password does not meet requirements", reasons))
}

#[tracing::instrument(name = "Register a new user", skip(body, pool, auth, origin), fields(email = ?body.email))]
#[post("/register")]
async fn register(
    body: web::Json<RegisterBody>,
    pool: web::Data<PgPool>,
    auth: web::Data<AuthConfig>,
    origin: RequestOrigin,
) -> Result<HttpResponse> {
    let pool = pool.get_ref();
    let body = body.into_inner();

    let (email, username, password) = match (body.email, body.username, body.password) {
        (Some(email), Some(username), Some(password)) => (email, username, password),
        _ => return Err(Error::validation("Email, username, and password are required")),
    };

    // Report every problem at once
    let mut reasons = Vec::new();
    let email = email
        .parse::<EmailAddress>()
        .map_err(|e| reasons.push(e))
        .ok();
    let username = username
        .parse::<Username>()
        .map_err(|e| reasons.push(e))
        .ok();
    let first_name = parse_optional_name(body.first_name, &mut reasons);
    let last_name = parse_optional_name(body.last_name, &mut reasons);
    let password = NewPassword::parse(password.expose_secret())
        .map_err(|errors| reasons.extend(errors))
        .ok();

    let (email, username, password) = match (email, username, password) {
        (Some(email), Some(username), Some(password)) if reasons.is_empty() => {
            (email, username, password)
        }
        _ => return Err(Error::validation_with("Invalid registration data", reasons)),
    };

    match UsersRepo::find_taken(pool, &email, &username).await? {
        (true, _) => return Err(Error::Conflict("Email already registered".into())),
        (_, true) => return Err(Error::Conflict("Username already taken".into())),
        _ => {}
    }

    let password_hash = hash_password(password.into()).await?;
    let new_user = NewUser {
        email,
        username,
        password_hash,
        first_name,
        last_name,
        role: UserRole::Borrower,
    };
    let user = UsersRepo::insert(pool, &new_user).await?;
    let tokens = issue_session(pool, &auth.keys, &user).await?;

    record_activity(
        pool,
        NewActivity::new(user.id, ActivityAction::UserRegistered, origin)
            .description(format!("User {} registered", user.username))
            .resource(user.id),
    )
    .await;
    tracing::info!(user.id = %user.id, "Registered new user");

    Ok(session_response(HttpResponse::Created(), &auth, &user, &tokens))
}

fn parse_optional_name(value: Option<String>, reasons: &mut Vec<String>) -> Option<PersonName> {
    match value {
        Some(value) if !value.trim().is_empty() => value.parse().map_err(|e| reasons.push(e)).ok(),
        _ => None,
    }
}

#[tracing::instrument(name = "Log in", skip(body, pool, auth, origin), fields(email = ?body.email))]
#[post("/login")]
async fn login(
    body: web::Json<LoginBody>,
    pool: web::Data<PgPool>,
    auth: web::Data<AuthConfig>,
    origin: RequestOrigin,
) -> Result<HttpResponse> {
    let pool = pool.get_ref();
    let body = body.into_inner();

    let (email, password) = match (body.email, body.password) {
        (Some(email), Some(password)) => (email, password),
        _ => return Err(Error::validation("Email and password are required")),
    };

    let user = match email.parse::<EmailAddress>() {
        Ok(email) => UsersRepo::fetch_by_email(pool, &email).await?,
        Err(_) => None,
    };
    let password_hash = user.as_ref().map(|user| user.password_hash.clone());

    let user = match (verify_password(password, password_hash).await?, user) {
        (true, Some(user)) => user,
        _ => return Err(Error::Authentication("Invalid email or password".into())),
    };
    if !user.is_active {
        tracing::warn!(user.id = %user.id, "Login attempt on disabled account");
        return Err(Error::Forbidden("Account is disabled".into()));
    }

    UsersRepo::record_login(pool, user.id).await?;
    let tokens = issue_session(pool, &auth.keys, &user).await?;

    record_activity(
        pool,
        NewActivity::new(user.id, ActivityAction::UserLogin, origin).resource(user.id),
    )
    .await;

    Ok(session_response(HttpResponse::Ok(), &auth, &user, &tokens))
}

#[tracing::instrument(name = "Refresh access token", skip(req, body, pool, auth))]
#[post("/refresh")]
async fn refresh(
    req: HttpRequest,
    body: Option<web::Json<RefreshBody>>,
    pool: web::Data<PgPool>,
    auth: web::Data<AuthConfig>,
) -> Result<HttpResponse> {
    // The cookie wins over the body
    let refresh_token = req
        .cookie(REFRESH_COOKIE)
        .map(|cookie| cookie.value().to_string())
        .filter(|token| !token.is_empty())
        .or_else(|| body.and_then(|body| body.into_inner().refresh_token));
    let refresh_token = required(refresh_token, "Refresh token required")?;

    let tokens = rotate_session(pool.get_ref(), &auth.keys, &refresh_token).await?;

    Ok(HttpResponse::Ok()
        .cookie(auth.refresh_cookie(&tokens.refresh_token))
        .json(tokens.body()))
}

#[tracing::instrument(name = "Log out", skip(pool, auth, origin), fields(user.id = %user.id))]
#[post("/logout")]
async fn logout(
    user: AuthenticatedUser,
    pool: web::Data<PgPool>,
    auth: web::Data<AuthConfig>,
    origin: RequestOrigin,
) -> Result<HttpResponse> {
    let pool = pool.get_ref();

    revoke_sessions(pool, user.id).await?;
    record_activity(
        pool,
        NewActivity::new(user.id, ActivityAction::UserLogout, origin).resource(user.id),
    )
    .await;

    Ok(HttpResponse::Ok()
        .cookie(auth.removal_cookie())
        .json(json!({ "message": "Logged out successfully" })))
}

#[tracing::instrument(name = "Fetch current user", skip(pool), fields(user.id = %user.id))]
#[get("/me")]
async fn me(user: AuthenticatedUser, pool: web::Data<PgPool>) -> Result<HttpResponse> {
    let user = UsersRepo::fetch_by_id(pool.get_ref(), user.id)
        .await?
        .ok_or(Error::NotFound("User"))?;

    Ok(HttpResponse::Ok().json(user))
}

#[tracing::instrument(name = "Request a password reset", skip(body, pool, auth, email_client))]
#[post("/password-reset/request")]
async fn request_password_reset(
    body: web::Json<ResetRequestBody>,
    pool: web::Data<PgPool>,
    auth: web::Data<AuthConfig>,
    email_client: web::Data<EmailClient>,
) -> Result<HttpResponse> {
    let email = required(body.into_inner().email, "Email is required")?;

    // Same answer whether or not the account exists
    let response = HttpResponse::Ok().json(json!({
        "message": "If an account exists with that email, a reset link has been sent"
    }));

    let Ok(email) = email.parse::<EmailAddress>() else {
        return Ok(response);
    };
    let user = match UsersRepo::fetch_by_email(pool.get_ref(), &email).await? {
        Some(user) if user.is_active => user,
        _ => {
            tracing::info!("Password reset requested for unknown or disabled account");
            return Ok(response);
        }
    };

    let token = auth
        .keys
        .sign_reset(&ResetClaims::new(user.id, &user.password_hash))
        .map_err(Error::TokenSigning)?;
    let link = auth.password_reset_link(&token);
    let message = Email::password_reset(email, &link, auth.keys.reset_ttl().num_minutes());

    if let Err(error) = email_client.send(&message).await {
        tracing::error!(error.cause_chain = ?error, user.id = %user.id, "Failed to send password reset email");
    }

    Ok(response)
}

#[tracing::instrument(name = "Confirm a password reset", skip(body, pool, auth, origin))]
#[post("/password-reset/confirm")]
async fn confirm_password_reset(
    body: web::Json<ResetConfirmBody>,
    pool: web::Data<PgPool>,
    auth: web::Data<AuthConfig>,
    origin: RequestOrigin,
) -> Result<HttpResponse> {
    let pool = pool.get_ref();
    let body = body.into_inner();

    let (reset_token, new_password) = match (body.reset_token, body.new_password) {
        (Some(token), Some(password)) => (token, password),
        _ => {
            return Err(Error::validation(
                "Reset token and new password are required",
            ))
        }
    };

    let invalid = || Error::Authentication("Invalid or expired reset token".into());
    let claims = auth.keys.verify_reset(&reset_token).map_err(|e| {
        tracing::debug!(error.cause_chain = ?e, "Rejected reset token");
        invalid()
    })?;
    let user = UsersRepo::fetch_by_id(pool, claims.sub)
        .await?
        .filter(|user| user.is_active)
        .ok_or_else(invalid)?;
    // A token issued before the last password change is spent
    if !claims.matches(&user.password_hash) {
        return Err(invalid());
    }

    let new_password = parse_new_password(&new_password)?;
    let password_hash = hash_password(new_password.into()).await?;

    let mut tx = pool.begin().await?;
    UsersRepo::update_password_hash(&mut *tx, user.id, &password_hash).await?;
    revoke_sessions(&mut *tx, user.id).await?;
    tx.commit().await?;

    record_activity(
        pool,
        NewActivity::new(user.id, ActivityAction::PasswordReset, origin).resource(user.id),
    )
    .await;

    Ok(HttpResponse::Ok().json(json!({ "message": "Password has been reset successfully" })))
}

#[tracing::instrument(name = "Change password", skip(body, pool, origin), fields(user.id = %user.id))]
#[post("/password/change")]
async fn change_password(
    user: AuthenticatedUser,
    body: web::Json<ChangePasswordBody>,
    pool: web::Data<PgPool>,
    origin: RequestOrigin,
) -> Result<HttpResponse> {
    let pool = pool.get_ref();
    let body = body.into_inner();

    let (current_password, new_password) = match (body.current_password, body.new_password) {
        (Some(current), Some(new)) => (current, new),
        _ => {
            return Err(Error::validation(
                "Current password and new password are required",
            ))
        }
    };

    let stored = UsersRepo::fetch_by_id(pool, user.id)
        .await?
        .ok_or(Error::NotFound("User"))?;
    let unchanged = current_password.expose_secret() == new_password.expose_secret();
    if !verify_password(current_password, Some(stored.password_hash)).await? {
        return Err(Error::Authentication("Current password is incorrect".into()));
    }
    if unchanged {
        return Err(Error::validation(
            "New password must be different from current password",
        ));
    }

    let new_password = parse_new_password(&new_password)?;
    let password_hash = hash_password(new_password.into()).await?;
    UsersRepo::update_password_hash(pool, user.id, &password_hash).await?;

    record_activity(
        pool,
        NewActivity::new(user.id, ActivityAction::PasswordChanged, origin).resource(user.id),
    )
    .await;

    Ok(HttpResponse::Ok().json(json!({ "message": "Password changed successfully" })))
}

/// Authentication API endpoints
pub fn scope() -> impl HttpServiceFactory {
    web::scope("/auth")
        .service(register)
        .service(login)
        .service(refresh)
        .service(logout)
        .service(me)
        .service(request_password_reset)
        .service(confirm_password_reset)
        .service(change_password)
}
