mod credentials;
mod guard;
mod password;
mod session;

pub use credentials::*;
pub use guard::*;
pub use password::*;
pub use session::*;

use actix_web::cookie::{time, Cookie, SameSite};

use url::Url;

use crate::crypto::{Token, TokenKeys};

/// Name of the cookie carrying the refresh token
pub const REFRESH_COOKIE: &str = "refreshToken";
const REFRESH_COOKIE_PATH: &str = "/api/auth";

/// Token keys and cookie policy shared by every request
#[derive(Clone)]
pub struct AuthConfig {
    pub keys: TokenKeys,
    pub secure_cookies: bool,
    pub password_reset_url: Url,
}

impl AuthConfig {
    /// The httpOnly cookie handing a refresh token to the browser
    pub fn refresh_cookie(&self, token: &Token) -> Cookie<'static> {
        let max_age = time::Duration::seconds(self.keys.refresh_ttl().num_seconds());
        Cookie::build(REFRESH_COOKIE, token.to_string())
            .path(REFRESH_COOKIE_PATH)
            .http_only(true)
            .secure(self.secure_cookies)
            .same_site(SameSite::Strict)
            .max_age(max_age)
            .finish()
    }

    /// A cookie instructing the browser to drop the refresh token
    pub fn removal_cookie(&self) -> Cookie<'static> {
        let mut cookie = Cookie::build(REFRESH_COOKIE, "")
            .path(REFRESH_COOKIE_PATH)
            .http_only(true)
            .secure(self.secure_cookies)
            .same_site(SameSite::Strict)
            .finish();
        cookie.make_removal();
        cookie
    }

    /// Link sent by email to let the user pick a new password
    pub fn password_reset_link(&self, token: &Token) -> Url {
        let mut link = self.password_reset_url.clone();
        link.query_pairs_mut().append_pair("token", token.as_ref());
        link
    }
}
