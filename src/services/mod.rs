pub mod centercoin_service;
pub mod coupon_service;
pub mod level_service;
pub mod license_service;
pub mod method_service;
pub mod notification_service;
pub mod pass_program_service;
pub mod pass_service;
pub mod phone_service;
pub mod point_service;
pub mod referral_service;
pub mod session_service;
pub mod user_service;

pub use centercoin_service::CentercoinService;
pub use coupon_service::CouponService;
pub use level_service::LevelService;
pub use license_service::LicenseService;
pub use method_service::MethodService;
pub use notification_service::NotificationService;
pub use pass_program_service::PassProgramService;
pub use pass_service::PassService;
pub use phone_service::PhoneService;
pub use point_service::PointService;
pub use referral_service::ReferralService;
pub use session_service::SessionService;
pub use user_service::UserService;
