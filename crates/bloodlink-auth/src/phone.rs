//! Phone number handling.

use uuid::Uuid;

use bloodlink_core::error::AppError;
use bloodlink_core::types::UserId;

/// Namespace for deriving user ids from verified phone numbers.
const PHONE_NAMESPACE: Uuid = Uuid::from_u128(0x6b1f_3c2e_9a4d_4f1b_8e7c_2d5a_0b9e_41c7);

/// Normalize user input to E.164 (`+` followed by 8 to 15 digits).
///
/// Spaces, dashes, dots and parentheses are dropped and a leading `00`
/// international prefix becomes `+`.
pub fn normalize_phone(input: &str) -> Result<String, AppError> {
    let compact: String = input
        .trim()
        .chars()
        .filter(|c| !matches!(c, ' ' | '-' | '.' | '(' | ')'))
        .collect();

    let digits = if let Some(rest) = compact.strip_prefix('+') {
        rest
    } else if let Some(rest) = compact.strip_prefix("00") {
        rest
    } else {
        return Err(AppError::validation(
            "Phone number must include the country code",
        ));
    };

    if !(8..=15).contains(&digits.len()) || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(AppError::validation("Invalid phone number format"));
    }
    if digits.starts_with('0') {
        return Err(AppError::validation("Invalid country code"));
    }
    Ok(format!("+{digits}"))
}

/// Stable user id for a normalized phone number.
pub fn user_id_for_phone(phone: &str) -> UserId {
    UserId::from(Uuid::new_v5(&PHONE_NAMESPACE, phone.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalizes_common_formats() {
        assert_eq!(normalize_phone("+222 36 12-34 56").unwrap(), "+22236123456");
        assert_eq!(normalize_phone("0022236123456").unwrap(), "+22236123456");
        assert_eq!(normalize_phone("(+1) 415.555.0100").unwrap(), "+14155550100");
    }

    #[test]
    fn test_rejects_malformed() {
        assert!(normalize_phone("36123456").is_err());
        assert!(normalize_phone("+12").is_err());
        assert!(normalize_phone("+2223612345a").is_err());
        assert!(normalize_phone("").is_err());
    }

    #[test]
    fn test_user_id_is_stable() {
        assert_eq!(
            user_id_for_phone("+22236123456"),
            user_id_for_phone("+22236123456")
        );
        assert_ne!(
            user_id_for_phone("+22236123456"),
            user_id_for_phone("+22236123457")
        );
    }
}
