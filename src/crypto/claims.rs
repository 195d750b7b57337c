use chrono::Duration;

use serde::{Deserialize, Serialize};

use uuid::Uuid;

use crate::domain::UserRole;

use super::{sha256_hex, SigningKey, Token, TokenError, TokenResult};

/// The purpose a token was issued for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TokenKind {
    Access,
    Refresh,
    PasswordReset,
}

/// Claims carried by short-lived access tokens
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccessClaims {
    pub sub: Uuid,
    pub email: String,
    pub username: String,
    pub role: UserRole,
    pub kind: TokenKind,
}

/// Claims carried by long-lived refresh tokens
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RefreshClaims {
    pub sub: Uuid,
    /// Unique per issued token, so two refresh tokens are never equal
    pub jti: Uuid,
    pub kind: TokenKind,
}

/// Claims carried by password-reset tokens
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResetClaims {
    pub sub: Uuid,
    /// Derived from the password hash the token was issued against
    pub fingerprint: String,
    pub kind: TokenKind,
}

impl ResetClaims {
    pub fn new(user_id: Uuid, password_hash: &str) -> Self {
        Self {
            sub: user_id,
            fingerprint: password_fingerprint(password_hash),
            kind: TokenKind::PasswordReset,
        }
    }

    /// Whether the token was issued against the given (current) password hash
    pub fn matches(&self, password_hash: &str) -> bool {
        self.fingerprint == password_fingerprint(password_hash)
    }
}

fn password_fingerprint(password_hash: &str) -> String {
    let digest = sha256_hex(password_hash);
    digest[..16].to_string()
}

/// Keys and lifetimes for every token the service issues
#[derive(Clone)]
pub struct TokenKeys {
    access_key: SigningKey,
    refresh_key: SigningKey,
    access_ttl: Duration,
    refresh_ttl: Duration,
    reset_ttl: Duration,
}

impl TokenKeys {
    pub fn new(
        access_key: SigningKey,
        refresh_key: SigningKey,
        access_ttl: Duration,
        refresh_ttl: Duration,
        reset_ttl: Duration,
    ) -> Self {
        Self {
            access_key,
            refresh_key,
            access_ttl,
            refresh_ttl,
            reset_ttl,
        }
    }

    pub fn access_ttl(&self) -> Duration {
        self.access_ttl
    }

    pub fn refresh_ttl(&self) -> Duration {
        self.refresh_ttl
    }

    pub fn reset_ttl(&self) -> Duration {
        self.reset_ttl
    }

    pub fn sign_access(&self, claims: &AccessClaims) -> TokenResult<Token> {
        Token::builder(claims)
            .expires_in(self.access_ttl)
            .sign(self.access_key.as_ref())
    }

    pub fn sign_refresh(&self, claims: &RefreshClaims) -> TokenResult<Token> {
        Token::builder(claims)
            .expires_in(self.refresh_ttl)
            .sign(self.refresh_key.as_ref())
    }

    pub fn sign_reset(&self, claims: &ResetClaims) -> TokenResult<Token> {
        Token::builder(claims)
            .expires_in(self.reset_ttl)
            .sign(self.access_key.as_ref())
    }

    pub fn verify_access(&self, token: &str) -> TokenResult<AccessClaims> {
        let claims: AccessClaims = token.parse::<Token>()?.verify(self.access_key.as_ref())?;
        expect_kind(claims.kind, TokenKind::Access)?;
        Ok(claims)
    }

    pub fn verify_refresh(&self, token: &str) -> TokenResult<RefreshClaims> {
        let claims: RefreshClaims = token.parse::<Token>()?.verify(self.refresh_key.as_ref())?;
        expect_kind(claims.kind, TokenKind::Refresh)?;
        Ok(claims)
    }

    pub fn verify_reset(&self, token: &str) -> TokenResult<ResetClaims> {
        let claims: ResetClaims = token.parse::<Token>()?.verify(self.access_key.as_ref())?;
        expect_kind(claims.kind, TokenKind::PasswordReset)?;
        Ok(claims)
    }
}

fn expect_kind(actual: TokenKind, expected: TokenKind) -> TokenResult<()> {
    if actual == expected {
        Ok(())
    } else {
        Err(TokenError::WrongKind)
    }
}
