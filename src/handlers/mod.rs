// handlers/mod.rs - 3-tier handler layout
//
// Public (no auth) → Protected (admin JWT + tenant) → Elevated (super admin JWT)
pub mod elevated;
pub mod protected;
pub mod public;

use crate::error::ApiError;

/// Parse a numeric path id, answering 400 with `Invalid <what> ID` otherwise.
pub(crate) fn record_id(raw: &str, what: &str) -> Result<i32, ApiError> {
    raw.parse::<i32>()
        .map_err(|_| ApiError::bad_request(format!("Invalid {} ID", what)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_id_rejects_non_numeric() {
        assert_eq!(record_id("42", "order").unwrap(), 42);
        let err = record_id("abc", "order").unwrap_err();
        assert_eq!(err.message(), "Invalid order ID");
    }
}
