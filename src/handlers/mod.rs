pub mod auth;
pub mod coupons;
pub mod internal;
pub mod license;
pub mod methods;
pub mod notifications;
pub mod passes;
pub mod points;
pub mod referral;

pub use auth::auth_config;
pub use coupons::coupons_config;
pub use internal::internal_config;
pub use license::license_config;
pub use methods::methods_config;
pub use notifications::notifications_config;
pub use passes::passes_config;
pub use points::points_config;
pub use referral::referral_config;
