//! Validation helpers for DTOs.

use validator::ValidationError;

/// Length of a match code.
pub const MATCH_CODE_LENGTH: usize = 6;
/// Longest accepted display name.
pub const MAX_DISPLAY_NAME: usize = 32;

/// Validates that a match code is exactly six uppercase alphanumerics.
pub fn validate_match_code(code: &str) -> Result<(), ValidationError> {
    if code.len() != MATCH_CODE_LENGTH {
        let mut err = ValidationError::new("match_code_length");
        err.message = Some(
            format!(
                "match code must be exactly {MATCH_CODE_LENGTH} characters (got {})",
                code.len()
            )
            .into(),
        );
        return Err(err);
    }

    if !code
        .chars()
        .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit())
    {
        let mut err = ValidationError::new("match_code_format");
        err.message =
            Some("match code must contain only uppercase letters and digits".into());
        return Err(err);
    }

    Ok(())
}

/// Validates that a display name is non-blank and within length bounds.
pub fn validate_display_name(name: &str) -> Result<(), ValidationError> {
    if name.trim().is_empty() {
        let mut err = ValidationError::new("display_name_blank");
        err.message = Some("display name must not be blank".into());
        return Err(err);
    }

    if name.chars().count() > MAX_DISPLAY_NAME {
        let mut err = ValidationError::new("display_name_length");
        err.message =
            Some(format!("display name must be at most {MAX_DISPLAY_NAME} characters").into());
        return Err(err);
    }

    Ok(())
}
