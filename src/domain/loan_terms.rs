use rust_decimal::Decimal;

use unicode_segmentation::UnicodeSegmentation;

const MIN_AMOUNT: i64 = 1_000;
const MAX_AMOUNT: i64 = 1_000_000;
const VALID_TERMS: [i32; 4] = [12, 24, 36, 48];
const MAX_PURPOSE_LEN: usize = 500;

/// Requested principal, in dollars
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LoanAmount(Decimal);

impl LoanAmount {
    pub fn parse(value: Decimal) -> Result<Self, String> {
        if value < Decimal::from(MIN_AMOUNT) || value > Decimal::from(MAX_AMOUNT) {
            return Err("Loan amount must be between $1,000 and $1,000,000".into());
        }
        Ok(Self(value.round_dp(2)))
    }

    pub fn value(&self) -> Decimal {
        self.0
    }
}

/// Repayment term in months
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LoanTerm(i32);

impl LoanTerm {
    pub fn parse(months: i32) -> Result<Self, String> {
        if !VALID_TERMS.contains(&months) {
            return Err("Loan term must be 12, 24, 36, or 48 months".into());
        }
        Ok(Self(months))
    }

    pub fn months(&self) -> i32 {
        self.0
    }
}

/// Free-text statement of what the loan is for
#[derive(Debug, Clone, PartialEq)]
pub struct LoanPurpose(String);

impl LoanPurpose {
    pub fn parse(value: &str) -> Result<Self, String> {
        let value = value.trim();
        if value.is_empty() {
            return Err("Purpose required".into());
        }
        if value.graphemes(true).count() > MAX_PURPOSE_LEN {
            return Err(format!(
                "Purpose must be at most {} characters",
                MAX_PURPOSE_LEN
            ));
        }
        Ok(Self(value.to_string()))
    }
}

impl AsRef<str> for LoanPurpose {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Borrower income figures
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Income {
    pub annual: Decimal,
    pub additional: Decimal,
}

impl Income {
    pub fn parse(annual: Decimal, additional: Option<Decimal>) -> Result<Self, String> {
        if annual <= Decimal::ZERO {
            return Err("Annual income must be positive".into());
        }
        let additional = additional.unwrap_or(Decimal::ZERO);
        if additional < Decimal::ZERO {
            return Err("Additional income must be non-negative".into());
        }
        Ok(Self { annual, additional })
    }
}
