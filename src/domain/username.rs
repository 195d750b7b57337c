use std::str::FromStr;

use regex::Regex;

use unicode_segmentation::UnicodeSegmentation;

const MIN_LEN: usize = 3;
const MAX_LEN: usize = 50;

/// A unique login handle
#[derive(Debug, Clone, PartialEq)]
pub struct Username(String);

impl AsRef<str> for Username {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl FromStr for Username {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        lazy_static::lazy_static! {
            static ref USERNAME_REGEX: Regex = Regex::new(r"^[\w.-]+$").unwrap();
        }

        let value = value.trim();
        let len = value.graphemes(true).count();
        if len < MIN_LEN {
            return Err(format!("Username must be at least {} characters", MIN_LEN));
        }
        if len > MAX_LEN {
            return Err(format!("Username must be at most {} characters", MAX_LEN));
        }
        if !USERNAME_REGEX.is_match(value) {
            return Err("Username may only contain letters, digits, '.', '_' and '-'".into());
        }
        Ok(Self(value.to_string()))
    }
}
