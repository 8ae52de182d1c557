//! Validation utilities

use bigdecimal::BigDecimal;

use crate::types::*;

/// Longest purpose text accepted on an application
pub const MAX_PURPOSE_LENGTH: usize = 500;
/// Longest decision note accepted on an application
pub const MAX_NOTES_LENGTH: usize = 1000;

/// Validate that an amount is representable in whole cents
///
/// Returns the amount normalized to [`MONEY_SCALE`] digits.
pub fn validate_money(amount: &BigDecimal) -> BankResult<BigDecimal> {
    let normalized = amount.with_scale(MONEY_SCALE);
    if normalized != *amount {
        return Err(BankError::Validation(format!(
            "Amount {} has more than {} decimal places",
            amount, MONEY_SCALE
        )));
    }
    Ok(normalized)
}

/// Validate that an amount is positive
pub fn validate_positive_amount(amount: &BigDecimal) -> BankResult<BigDecimal> {
    if *amount <= BigDecimal::from(0) {
        return Err(BankError::Validation(
            "Amount must be positive".to_string(),
        ));
    }
    validate_money(amount)
}

/// Validate that an initial deposit is zero or more
pub fn validate_initial_deposit(amount: &BigDecimal) -> BankResult<BigDecimal> {
    if *amount < BigDecimal::from(0) {
        return Err(BankError::Validation(
            "Initial deposit cannot be negative".to_string(),
        ));
    }
    validate_money(amount)
}

/// Validate that an account number is ten ASCII digits
pub fn validate_account_number(account_number: &str) -> BankResult<()> {
    if account_number.len() != 10 || !account_number.bytes().all(|b| b.is_ascii_digit()) {
        return Err(BankError::Validation(format!(
            "Account number '{}' must be exactly 10 digits",
            account_number
        )));
    }
    Ok(())
}

/// Validate the purpose text of an application
pub fn validate_purpose(purpose: &str) -> BankResult<()> {
    if purpose.chars().count() > MAX_PURPOSE_LENGTH {
        return Err(BankError::Validation(format!(
            "Purpose cannot exceed {} characters",
            MAX_PURPOSE_LENGTH
        )));
    }
    Ok(())
}

/// Validate the notes attached to a decision
pub fn validate_notes(notes: Option<&str>) -> BankResult<()> {
    if notes.is_some_and(|n| n.chars().count() > MAX_NOTES_LENGTH) {
        return Err(BankError::Validation(format!(
            "Decision notes cannot exceed {} characters",
            MAX_NOTES_LENGTH
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> BigDecimal {
        BigDecimal::from_str(s).unwrap()
    }

    #[test]
    fn test_positive_amount() {
        assert!(validate_positive_amount(&dec("0")).is_err());
        assert!(validate_positive_amount(&dec("-1")).is_err());
        assert_eq!(validate_positive_amount(&dec("12.5")).unwrap(), dec("12.50"));
    }

    #[test]
    fn test_sub_cent_amounts_rejected() {
        assert!(validate_positive_amount(&dec("0.001")).is_err());
        assert!(validate_money(&dec("10.10")).is_ok());
    }

    #[test]
    fn test_initial_deposit_may_be_zero() {
        assert!(validate_initial_deposit(&dec("0")).is_ok());
        assert!(validate_initial_deposit(&dec("-0.01")).is_err());
    }

    #[test]
    fn test_account_number_format() {
        assert!(validate_account_number("1234567890").is_ok());
        assert!(validate_account_number("123456789").is_err());
        assert!(validate_account_number("12345678x0").is_err());
    }

    #[test]
    fn test_text_limits() {
        assert!(validate_purpose(&"p".repeat(MAX_PURPOSE_LENGTH)).is_ok());
        assert!(validate_purpose(&"p".repeat(MAX_PURPOSE_LENGTH + 1)).is_err());
        assert!(validate_notes(None).is_ok());
        assert!(validate_notes(Some(&"n".repeat(MAX_NOTES_LENGTH + 1))).is_err());
    }
}
