use actix_web::http::header::{self, HeaderMap};

use anyhow::Context;

const BEARER_AUTH_PREFIX: &str = "Bearer ";

/// Extract the token from an `Authorization: Bearer <token>` header
pub fn bearer_token(headers: &HeaderMap) -> anyhow::Result<&str> {
    let header_value = headers
        .get(header::AUTHORIZATION)
        .context("Missing authorization in header")?
        .to_str()?;

    let token = header_value
        .strip_prefix(BEARER_AUTH_PREFIX)
        .context("Authorization scheme not bearer")?
        .trim();

    if token.is_empty() {
        anyhow::bail!("Missing bearer token");
    }
    Ok(token)
}
