use secrecy::Secret;

const MIN_LEN: usize = 8;
const SPECIAL_CHARS: &str = r#"!@#$%^&*()_+-=[]{};':"\|,.<>/?"#;

/// A password that satisfies the strength policy
#[derive(Debug)]
pub struct NewPassword(Secret<String>);

impl NewPassword {
    /// Check a candidate against the policy, reporting every violated rule
    pub fn parse(candidate: &str) -> Result<Self, Vec<String>> {
        let mut errors = Vec::new();

        if candidate.chars().count() < MIN_LEN {
            errors.push(format!(
                "Password must be at least {} characters long",
                MIN_LEN
            ));
        }
        if !candidate.chars().any(|c| c.is_ascii_uppercase()) {
            errors.push("Password must contain at least one uppercase letter".into());
        }
        if !candidate.chars().any(|c| c.is_ascii_lowercase()) {
            errors.push("Password must contain at least one lowercase letter".into());
        }
        if !candidate.chars().any(|c| c.is_ascii_digit()) {
            errors.push("Password must contain at least one digit".into());
        }
        if !candidate.chars().any(|c| SPECIAL_CHARS.contains(c)) {
            errors.push("Password must contain at least one special character".into());
        }

        if errors.is_empty() {
            Ok(Self(Secret::new(candidate.to_string())))
        } else {
            Err(errors)
        }
    }
}

impl From<NewPassword> for Secret<String> {
    fn from(value: NewPassword) -> Self {
        value.0
    }
}
