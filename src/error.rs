use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use serde_json::json;
use thiserror::Error;

pub type AppResult<T> = Result<T, AppError>;

/// Domain failures with the fixed numeric opcode taxonomy shared with the
/// other internal services. Opcode 0 is reserved for success envelopes.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Not registered user")]
    NotRegisteredUser,

    #[error("Access key required")]
    RequiredAccessKey,

    #[error("Access key expired")]
    ExpiredAccessKey,

    #[error("Permission denied")]
    PermissionDenied,

    #[error("Login required")]
    RequiredLogin,

    #[error("Internal error: {0}")]
    InvalidError(String),

    #[error("Validation failed: {0}")]
    FailedValidate(String),

    #[error("Invalid API")]
    InvalidApi,

    #[error("Invalid license")]
    InvalidLicense,

    #[error("Not connected with method")]
    NotConnectedWithMethod,

    #[error("Cannot find user with kakao")]
    CannotFindWithKakao,

    #[error("Already connected with method")]
    AlreadyConnectWithMethod,

    #[error("Cannot find user")]
    CannotFindUser,

    #[error("Already registered user")]
    AlreadyRegisteredUser,

    #[error("Invalid phone validation code")]
    InvalidPhoneValidateCode,

    #[error("Phone must be verified again")]
    RetryPhoneValidate,

    #[error("Cannot find session")]
    CannotFindSession,

    #[error("Invalid messaging token")]
    InvalidMessagingToken,

    #[error("License required")]
    RequiredLicense,

    #[error("Invalid referral code")]
    InvalidReferralCode,

    #[error("Referrer already selected")]
    AlreadySelectedReferrer,

    #[error("Cannot refer yourself")]
    CannotReferralMyself,

    #[error("Redemption limit exceeded: {0}")]
    ExcessLimits(String),

    #[error("Cannot find coupon")]
    CannotFindCoupon,

    #[error("Cannot find notification")]
    CannotFindNotification,

    #[error("Cannot find pass")]
    CannotFindPass,

    #[error("Cannot find pass program")]
    CannotFindPassProgram,

    #[error("Pass program is in use by {0} passes")]
    PassProgramHasUsing(u64),

    #[error("Pass program does not allow renewal")]
    PassProgramNotAllowRenew,

    #[error("Pass program is not on sale")]
    PassProgramIsNotSale,

    /// A rejection returned by the payments service, with its own opcode
    /// preserved so callers can classify business failures.
    #[error("Payments error ({opcode}): {message}")]
    Payments { opcode: i64, message: String },

    #[error("External API error: {0}")]
    ExternalApiError(String),

    #[error("Database error: {0}")]
    DatabaseError(#[from] sea_orm::DbErr),

    #[error("JWT error: {0}")]
    JwtError(#[from] jsonwebtoken::errors::Error),

    #[error("HTTP request error: {0}")]
    ReqwestError(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    SerdeJsonError(#[from] serde_json::Error),
}

impl AppError {
    pub fn opcode(&self) -> i64 {
        match self {
            AppError::NotRegisteredUser => 100,
            AppError::RequiredAccessKey => 101,
            AppError::ExpiredAccessKey => 102,
            AppError::PermissionDenied => 103,
            AppError::RequiredLogin => 104,
            AppError::InvalidError(_) => 105,
            AppError::FailedValidate(_) => 106,
            AppError::InvalidApi => 107,
            AppError::InvalidLicense => 108,
            AppError::NotConnectedWithMethod => 109,
            AppError::CannotFindWithKakao => 110,
            AppError::AlreadyConnectWithMethod => 111,
            AppError::CannotFindUser => 112,
            AppError::AlreadyRegisteredUser => 113,
            AppError::InvalidPhoneValidateCode => 114,
            AppError::RetryPhoneValidate => 115,
            AppError::CannotFindSession => 116,
            AppError::InvalidMessagingToken => 117,
            AppError::RequiredLicense => 118,
            AppError::InvalidReferralCode => 119,
            AppError::AlreadySelectedReferrer => 120,
            AppError::CannotReferralMyself => 121,
            AppError::ExcessLimits(_) => 122,
            AppError::CannotFindCoupon => 123,
            AppError::CannotFindNotification => 124,
            AppError::CannotFindPass => 210,
            AppError::CannotFindPassProgram => 211,
            AppError::PassProgramHasUsing(_) => 212,
            AppError::PassProgramNotAllowRenew => 215,
            AppError::PassProgramIsNotSale => 221,
            AppError::Payments { opcode, .. } => *opcode,
            _ => 105,
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::RequiredAccessKey
            | AppError::ExpiredAccessKey
            | AppError::RequiredLogin => StatusCode::UNAUTHORIZED,
            AppError::PermissionDenied => StatusCode::FORBIDDEN,
            AppError::FailedValidate(_)
            | AppError::InvalidLicense
            | AppError::RetryPhoneValidate
            | AppError::InvalidMessagingToken
            | AppError::RequiredLicense
            | AppError::CannotReferralMyself
            | AppError::PassProgramNotAllowRenew
            | AppError::PassProgramIsNotSale => StatusCode::BAD_REQUEST,
            AppError::NotRegisteredUser
            | AppError::InvalidApi
            | AppError::NotConnectedWithMethod
            | AppError::CannotFindWithKakao
            | AppError::CannotFindUser
            | AppError::InvalidPhoneValidateCode
            | AppError::CannotFindSession
            | AppError::InvalidReferralCode
            | AppError::CannotFindCoupon
            | AppError::CannotFindNotification
            | AppError::CannotFindPass
            | AppError::CannotFindPassProgram => StatusCode::NOT_FOUND,
            AppError::AlreadyConnectWithMethod
            | AppError::AlreadyRegisteredUser
            | AppError::AlreadySelectedReferrer
            | AppError::PassProgramHasUsing(_) => StatusCode::CONFLICT,
            AppError::ExcessLimits(_) => StatusCode::TOO_MANY_REQUESTS,
            AppError::Payments { .. } | AppError::ExternalApiError(_) => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Whether this is one of the payments opcodes the pass scheduler treats
    /// as a terminal business rejection rather than a transient outage.
    pub fn is_renewal_rejection(&self) -> bool {
        matches!(self.opcode(), 215 | 221)
    }
}

impl ResponseError for AppError {
    fn error_response(&self) -> HttpResponse {
        let status = self.status();
        if status.is_server_error() {
            log::error!("{self}");
        } else {
            log::warn!("{self}");
        }

        HttpResponse::build(status).json(json!({
            "opcode": self.opcode(),
            "message": self.to_string(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opcode_and_status_mapping() {
        assert_eq!(AppError::NotRegisteredUser.opcode(), 100);
        assert_eq!(AppError::NotRegisteredUser.status(), StatusCode::NOT_FOUND);
        assert_eq!(AppError::RetryPhoneValidate.opcode(), 115);
        assert_eq!(
            AppError::RetryPhoneValidate.status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(AppError::AlreadyRegisteredUser.status(), StatusCode::CONFLICT);
        assert_eq!(AppError::PassProgramIsNotSale.opcode(), 221);
        assert_eq!(AppError::PassProgramNotAllowRenew.opcode(), 215);
    }

    #[test]
    fn renewal_rejection_set() {
        assert!(AppError::PassProgramIsNotSale.is_renewal_rejection());
        assert!(AppError::PassProgramNotAllowRenew.is_renewal_rejection());
        assert!(AppError::Payments {
            opcode: 221,
            message: "not on sale".into()
        }
        .is_renewal_rejection());
        assert!(!AppError::Payments {
            opcode: 500,
            message: "outage".into()
        }
        .is_renewal_rejection());
        assert!(!AppError::CannotFindPass.is_renewal_rejection());
    }
}
