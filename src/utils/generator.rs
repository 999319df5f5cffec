use rand::distributions::Alphanumeric;
use rand::Rng;

/// Uniqueness loops give up after this many collisions instead of spinning
/// forever under pathological collision pressure.
pub const MAX_GENERATE_ATTEMPTS: u32 = 16;

/// 6-digit numeric verification code.
pub fn generate_verification_code() -> String {
    let mut rng = rand::thread_rng();
    format!("{:06}", rng.gen_range(100000..=999999))
}

/// 6-hex-character referral code.
pub fn generate_referral_code() -> String {
    let mut rng = rand::thread_rng();
    format!("{:06x}", rng.gen_range(0..0x1000000u32))
}

/// Unguessable session token.
pub fn generate_session_token() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(64)
        .map(char::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verification_code_is_six_digits() {
        for _ in 0..32 {
            let code = generate_verification_code();
            assert_eq!(code.len(), 6);
            assert!(code.chars().all(|c| c.is_ascii_digit()));
        }
    }

    #[test]
    fn referral_code_is_six_hex_chars() {
        for _ in 0..32 {
            let code = generate_referral_code();
            assert_eq!(code.len(), 6);
            assert!(code.chars().all(|c| c.is_ascii_hexdigit()));
        }
    }

    #[test]
    fn session_token_is_64_alphanumeric_chars() {
        let token = generate_session_token();
        assert_eq!(token.len(), 64);
        assert!(token.chars().all(|c| c.is_ascii_alphanumeric()));
    }
}
