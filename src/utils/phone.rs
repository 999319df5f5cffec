use crate::error::{AppError, AppResult};
use regex::Regex;

/// Normalizes a Korean mobile number to E.164 (`+8210XXXXXXXX`).
///
/// Accepts local (`010-1234-5678`), bare-digit (`01012345678`) and already
/// internationalized (`+82 10-1234-5678`) inputs.
pub fn format_phone(input: &str) -> AppResult<String> {
    let digits: String = input.chars().filter(|c| c.is_ascii_digit()).collect();

    let normalized = if digits.starts_with("82") {
        format!("+{digits}")
    } else if let Some(rest) = digits.strip_prefix('0') {
        format!("+82{rest}")
    } else {
        return Err(AppError::FailedValidate(format!(
            "invalid phone number: {input}"
        )));
    };

    let pattern = Regex::new(r"^\+82\d{9,10}$").unwrap();
    if !pattern.is_match(&normalized) {
        return Err(AppError::FailedValidate(format!(
            "invalid phone number: {input}"
        )));
    }

    Ok(normalized)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_local_numbers() {
        assert_eq!(format_phone("010-1234-5678").unwrap(), "+821012345678");
        assert_eq!(format_phone("01012345678").unwrap(), "+821012345678");
    }

    #[test]
    fn keeps_international_numbers() {
        assert_eq!(format_phone("+82 10-1234-5678").unwrap(), "+821012345678");
        assert_eq!(format_phone("+821012345678").unwrap(), "+821012345678");
    }

    #[test]
    fn rejects_garbage() {
        assert!(format_phone("hello").is_err());
        assert!(format_phone("12345").is_err());
        assert!(format_phone("").is_err());
    }
}
