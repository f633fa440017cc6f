//! Validation of caller-supplied item fields.
//!
//! Both helpers run before any ledger state is touched; a rejected input
//! never produces a partial mutation.

use crate::error::TypeError;

/// Validate a display name and return its trimmed form.
pub fn validate_name(raw: &str) -> Result<String, TypeError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(TypeError::EmptyName);
    }
    Ok(trimmed.to_string())
}

/// Parse a whole-unit price from text input.
///
/// Surrounding whitespace is ignored. Empty, negative, fractional and
/// otherwise non-numeric input is rejected.
pub fn parse_price(raw: &str) -> Result<u64, TypeError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(TypeError::InvalidPrice("price is required".into()));
    }
    if let Some(rest) = trimmed.strip_prefix('-') {
        if !rest.is_empty() && rest.chars().all(|c| c.is_ascii_digit()) {
            return Err(TypeError::InvalidPrice(format!(
                "price must not be negative: {trimmed}"
            )));
        }
    }
    trimmed
        .parse::<u64>()
        .map_err(|_| TypeError::InvalidPrice(format!("not a whole number: {trimmed}")))
}
