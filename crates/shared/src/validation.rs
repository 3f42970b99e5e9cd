//! Common validation utilities.

use validator::ValidationError;

/// Minimum length of a rejection reason. Rejections must carry an
/// actionable explanation for the vendor.
pub const MIN_REJECTION_COMMENT_LEN: usize = 10;

/// Maximum length of approval/rejection comments.
pub const MAX_COMMENT_LEN: usize = 2000;

/// Validates a rejection comment: required, trimmed length within bounds.
pub fn validate_rejection_comment(comment: &str) -> Result<(), ValidationError> {
    let trimmed = comment.trim();
    if trimmed.len() < MIN_REJECTION_COMMENT_LEN {
        let mut err = ValidationError::new("comment_too_short");
        err.message = Some(
            format!(
                "Rejection comments must be at least {} characters",
                MIN_REJECTION_COMMENT_LEN
            )
            .into(),
        );
        return Err(err);
    }
    if trimmed.len() > MAX_COMMENT_LEN {
        let mut err = ValidationError::new("comment_too_long");
        err.message =
            Some(format!("Comments must be at most {} characters", MAX_COMMENT_LEN).into());
        return Err(err);
    }
    Ok(())
}

/// Validates that a price in cents is positive.
pub fn validate_price_cents(price_cents: i64) -> Result<(), ValidationError> {
    if price_cents > 0 {
        Ok(())
    } else {
        let mut err = ValidationError::new("price_range");
        err.message = Some("Price must be greater than zero".into());
        Err(err)
    }
}

/// Validates that a stock count is non-negative.
pub fn validate_stock(stock: i32) -> Result<(), ValidationError> {
    if stock >= 0 {
        Ok(())
    } else {
        let mut err = ValidationError::new("stock_range");
        err.message = Some("Stock must be non-negative".into());
        Err(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejection_comment_too_short() {
        assert!(validate_rejection_comment("short").is_err());
        assert!(validate_rejection_comment("").is_err());
        // 9 characters of padding around whitespace still fails
        assert!(validate_rejection_comment("  bad fit  ").is_err());
    }

    #[test]
    fn test_rejection_comment_valid() {
        assert!(validate_rejection_comment("Images are too low resolution").is_ok());
        // Exactly at the boundary
        assert!(validate_rejection_comment(&"x".repeat(MIN_REJECTION_COMMENT_LEN)).is_ok());
    }

    #[test]
    fn test_rejection_comment_too_long() {
        assert!(validate_rejection_comment(&"x".repeat(MAX_COMMENT_LEN + 1)).is_err());
    }

    #[test]
    fn test_price_cents() {
        assert!(validate_price_cents(1).is_ok());
        assert!(validate_price_cents(129_900).is_ok());
        assert!(validate_price_cents(0).is_err());
        assert!(validate_price_cents(-5).is_err());
    }

    #[test]
    fn test_stock() {
        assert!(validate_stock(0).is_ok());
        assert!(validate_stock(500).is_ok());
        assert!(validate_stock(-1).is_err());
    }
}
