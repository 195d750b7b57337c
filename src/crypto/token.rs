use std::fmt;
use std::str::FromStr;

use hmac::Mac;

use serde::{Deserialize, Serialize};

use chrono::{DateTime, Duration, TimeZone, Utc};

use base64::{
    alphabet,
    engine::{self, general_purpose},
    Engine as _,
};
use regex::Regex;

lazy_static::lazy_static! {
    // Base64 deserialization engine
    static ref BASE64_ENGINE: engine::GeneralPurpose =
        engine::GeneralPurpose::new(&alphabet::URL_SAFE, general_purpose::NO_PAD);
    // Regex for checking token strings
    static ref TOKEN_REGEX: Regex = Regex::new(r"^([\w-]+)\.([\w-]+)$").unwrap();
}

/// Various errors that can occur when handling tokens
#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    // Token specific errors
    #[error("Token signature does not match")]
    SignatureMismatch,
    #[error("Token is expired")]
    Expired,
    #[error("Token is of invalid format")]
    InvalidFormat,
    #[error("Token was issued for a different purpose")]
    WrongKind,
    // External errors
    #[error("Invalid Utf8 string")]
    Utf8(#[from] std::str::Utf8Error),
    #[error("Serialization error")]
    Serde(#[from] serde_json::Error),
    #[error("Decode error")]
    DecodeError(#[from] base64::DecodeError),
}

/// Wrapper for token results
pub type TokenResult<T> = Result<T, TokenError>;

/// A serialized, signed token of the form `<base64 message>.<base64 signature>`
#[derive(Debug, Clone, PartialEq)]
pub struct Token(String);

impl Token {
    /// Initialize a token builder to construct a token
    pub fn builder<T: Serialize>(payload: T) -> TokenBuilder<T> {
        TokenBuilder::new(payload)
    }

    /// Verify the token and deconstruct into the encoded payload value
    pub fn verify<T, K>(&self, key: &K) -> TokenResult<T>
    where
        T: for<'de> Deserialize<'de>,
        K: Mac + Clone,
    {
        // Split the token string into it's base64 encoded components
        let (msg, sig) = self.split().ok_or(TokenError::InvalidFormat)?;
        // Decode the components
        let msg = BASE64_ENGINE.decode(msg)?;
        let sig = BASE64_ENGINE.decode(sig)?;
        // Verify and deserialize the message
        TokenMessage::verify_from_bytes(key, &msg, &sig)
    }

    fn split(&self) -> Option<(&str, &str)> {
        let captures = TOKEN_REGEX.captures(&self.0)?;

        let msg = captures.get(1)?.as_str();
        let sig = captures.get(2)?.as_str();
        Some((msg, sig))
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for Token {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl FromStr for Token {
    type Err = TokenError;

    fn from_str(token: &str) -> TokenResult<Self> {
        if !TOKEN_REGEX.is_match(token) {
            Err(TokenError::InvalidFormat)
        } else {
            Ok(Self(token.to_string()))
        }
    }
}

/// Handy builder for creating and signing Tokens
#[derive(Debug)]
pub struct TokenBuilder<T> {
    expiration: Option<DateTime<Utc>>,
    payload: T,
}

impl<T: Serialize> TokenBuilder<T> {
    /// Create a new token builder with the specified payload
    pub fn new(payload: T) -> Self {
        Self {
            expiration: None,
            payload,
        }
    }
    /// Set the token to expire after a specified duration
    pub fn expires_in(mut self, duration: Duration) -> Self {
        self.expiration = Some(Utc::now() + duration);
        self
    }
    /// Set the token to expire at a specified date-time
    pub fn expires_at(mut self, timestamp: DateTime<Utc>) -> Self {
        self.expiration = Some(timestamp);
        self
    }
    /// Sign the token with the specified key
    pub fn sign<K>(self, key: &K) -> TokenResult<Token>
    where
        K: Mac + Clone,
    {
        // Serialize the message to a string
        let msg = self.serialize_message()?;
        // Sign the message
        let sig = key
            .clone()
            .chain_update(msg.as_bytes())
            .finalize()
            .into_bytes();
        // Base64 encode the two portions of the token
        let msg = BASE64_ENGINE.encode(msg);
        let sig = BASE64_ENGINE.encode(sig);
        // Combine to the final token string
        Ok(Token(format!("{}.{}", msg, sig)))
    }

    fn serialize_message(self) -> serde_json::Result<String> {
        let msg: TokenMessage<T> = self.into();
        serde_json::to_string(&msg)
    }
}

/// Serializable structure for token messages
/// Contains the expiration timestamp and serializable payload
#[derive(Debug, Serialize, Deserialize)]
struct TokenMessage<T> {
    exp: Option<i64>,
    data: T,
}

impl<T: for<'de> Deserialize<'de>> TokenMessage<T> {
    /// Deserialize constructor for Token messages
    fn verify_from_bytes<K>(key: &K, msg: &[u8], signature: &[u8]) -> TokenResult<T>
    where
        K: Mac + Clone,
    {
        // Verify the message before deserialization, in constant time
        key.clone()
            .chain_update(msg)
            .verify_slice(signature)
            .map_err(|_| TokenError::SignatureMismatch)?;
        // Convert the bytes into a UTF8 string
        let msg = std::str::from_utf8(msg)?;
        // Deserialize from JSON
        let msg: TokenMessage<T> = serde_json::from_str(msg)?;
        // Check that the message is not expired
        if msg.is_expired() {
            Err(TokenError::Expired)
        } else {
            Ok(msg.data)
        }
    }

    /// Check if this token message is expired
    fn is_expired(&self) -> bool {
        match self.exp {
            None => false,
            // NOTE: An unrepresentable timestamp counts as expired
            Some(exp) => Utc
                .timestamp_opt(exp, 0u32)
                .earliest()
                .map(|exp| Utc::now() >= exp)
                .unwrap_or(true),
        }
    }
}

/// Convert a TokenBuilder into a TokenMessage
impl<T> From<TokenBuilder<T>> for TokenMessage<T> {
    fn from(value: TokenBuilder<T>) -> Self {
        Self {
            exp: value.expiration.map(|d| d.timestamp()),
            data: value.payload,
        }
    }
}
