use super::FxError;

/// Trims and uppercases a currency code, rejecting anything that is not
/// three ASCII letters.
pub fn normalize_currency_code(currency: &str) -> Result<String, FxError> {
    let code = currency.trim().to_ascii_uppercase();
    if code.len() == 3 && code.chars().all(|c| c.is_ascii_alphabetic()) {
        Ok(code)
    } else {
        Err(FxError::InvalidCurrency(currency.trim().to_string()))
    }
}
