use chrono::Utc;

use serde::Serialize;

use sqlx::{PgExecutor, PgPool};

use uuid::Uuid;

use crate::crypto::{sha256_hex, AccessClaims, RefreshClaims, Token, TokenKeys, TokenKind};
use crate::error::{Error, Result};
use crate::model::User;
use crate::repo::{SessionsRepo, UsersRepo};

/// Access and refresh tokens handed out together
#[derive(Debug)]
pub struct IssuedTokens {
    pub access_token: Token,
    pub refresh_token: Token,
    /// Lifetime of the access token, in seconds
    pub expires_in: i64,
}

impl IssuedTokens {
    /// The part of the pair returned in a response body, the refresh token travels in a cookie
    pub fn body(&self) -> AccessTokenBody {
        AccessTokenBody {
            access_token: self.access_token.to_string(),
            expires_in: self.expires_in,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessTokenBody {
    pub access_token: String,
    pub expires_in: i64,
}

fn sign_pair(keys: &TokenKeys, user: &User) -> Result<IssuedTokens> {
    let access_claims = AccessClaims {
        sub: user.id,
        email: user.email.clone(),
        username: user.username.clone(),
        role: user.role,
        kind: TokenKind::Access,
    };
    let refresh_claims = RefreshClaims {
        sub: user.id,
        jti: Uuid::new_v4(),
        kind: TokenKind::Refresh,
    };

    Ok(IssuedTokens {
        access_token: keys.sign_access(&access_claims).map_err(Error::TokenSigning)?,
        refresh_token: keys
            .sign_refresh(&refresh_claims)
            .map_err(Error::TokenSigning)?,
        expires_in: keys.access_ttl().num_seconds(),
    })
}

/// Create a token pair for `user` and store its refresh session
#[tracing::instrument("Issue session", skip(pool, keys, user), fields(user.id = %user.id))]
pub async fn issue_session(pool: &PgPool, keys: &TokenKeys, user: &User) -> Result<IssuedTokens> {
    let tokens = sign_pair(keys, user)?;
    let expires_at = Utc::now() + keys.refresh_ttl();

    SessionsRepo::delete_expired_for_user(pool, user.id).await?;
    SessionsRepo::insert(
        pool,
        user.id,
        &sha256_hex(tokens.refresh_token.as_ref()),
        expires_at,
    )
    .await?;

    Ok(tokens)
}

/// Exchange a refresh token for a new pair, invalidating the old refresh token
#[tracing::instrument("Rotate session", skip(pool, keys, refresh_token))]
pub async fn rotate_session(
    pool: &PgPool,
    keys: &TokenKeys,
    refresh_token: &str,
) -> Result<IssuedTokens> {
    let invalid = || Error::Forbidden("Invalid refresh token".into());

    let claims = keys.verify_refresh(refresh_token).map_err(|e| {
        tracing::debug!(error.cause_chain = ?e, "Rejected refresh token");
        invalid()
    })?;

    let old_hash = sha256_hex(refresh_token);
    let session = SessionsRepo::fetch_active_by_hash(pool, &old_hash)
        .await?
        .ok_or_else(|| {
            tracing::warn!(user.id = %claims.sub, "Refresh token has no live session");
            invalid()
        })?;
    if session.user_id != claims.sub {
        return Err(invalid());
    }

    let user = UsersRepo::fetch_by_id(pool, claims.sub)
        .await?
        .filter(|user| user.is_active)
        .ok_or_else(invalid)?;

    let tokens = sign_pair(keys, &user)?;
    let new_hash = sha256_hex(tokens.refresh_token.as_ref());
    let expires_at = Utc::now() + keys.refresh_ttl();

    if !SessionsRepo::rotate(pool, session.id, &old_hash, &new_hash, expires_at).await? {
        // Raced with another rotation of the same token
        return Err(invalid());
    }
    Ok(tokens)
}

/// End every session of a user
#[tracing::instrument("Revoke sessions", skip(executor))]
pub async fn revoke_sessions<'con>(executor: impl PgExecutor<'con>, user_id: Uuid) -> Result<u64> {
    let revoked = SessionsRepo::delete_for_user(executor, user_id).await?;
    tracing::info!(revoked, "Revoked user sessions");
    Ok(revoked)
}
