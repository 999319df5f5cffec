pub mod auth;
pub mod common;
pub mod internal;
pub mod misc;
pub mod pass;

pub use auth::{
    LoginWithKakaoRequest, LoginWithPhoneRequest, LogoutParams, MessagingTokenRequest,
    ModifyUserRequest, PhoneToken, SendVerificationRequest, SignupRequest, VerifyCodeRequest,
};
pub use common::PaginationParams;
pub use internal::{
    AddPointRequest, CentercoinRequest, CreateNotificationRequest, SecessionRequest,
};
pub use misc::{RedeemCouponRequest, RegisterReferralRequest, SetLicenseRequest};
pub use pass::{
    AssignPassRequest, CreatePassProgramRequest, ModifyPassProgramRequest, PurchasePassRequest,
};
