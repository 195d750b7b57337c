use chrono::{DateTime, Utc};

use rand::distributions::Alphanumeric;
use rand::Rng;

const SUFFIX_LEN: usize = 6;

/// Generate a human-readable loan number of the form `LOAN-YYYYMMDD-XXXXXX`
pub fn generate_loan_number(now: DateTime<Utc>) -> String {
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(SUFFIX_LEN)
        .map(|b| char::from(b).to_ascii_uppercase())
        .collect();
    format!("LOAN-{}-{}", now.format("%Y%m%d"), suffix)
}
