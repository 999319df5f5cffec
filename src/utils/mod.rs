pub mod generator;
pub mod phone;

pub use generator::{
    generate_referral_code, generate_session_token, generate_verification_code,
    MAX_GENERATE_ATTEMPTS,
};
pub use phone::format_phone;
