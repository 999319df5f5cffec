pub mod kakao;
pub mod messaging;
pub mod payments;
pub mod platform;
pub mod sms;

pub use kakao::{KakaoClient, KakaoUser};
pub use messaging::MessagingClient;
pub use payments::{Coupon, CouponGroup, PaymentsClient};
pub use platform::PlatformClient;
pub use sms::SmsClient;
