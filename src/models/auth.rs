use chrono::NaiveDate;
use serde::Deserialize;

/// Proof that a phone number was just verified. The number and code are
/// checked again against the stored row before the token is honored.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhoneToken {
    pub phone_id: String,
    pub phone_no: String,
    pub code: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignupRequest {
    pub realname: String,
    pub birthday: NaiveDate,
    #[serde(default)]
    pub email: Option<String>,
    pub phone: PhoneToken,
    /// Driver's license number, validated before the account is created.
    #[serde(default)]
    pub license_str: Option<String>,
    /// Kakao access token to link during signup.
    #[serde(default)]
    pub kakao_access_token: Option<String>,
    #[serde(default)]
    pub receive_push: Option<bool>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModifyUserRequest {
    #[serde(default)]
    pub realname: Option<String>,
    #[serde(default)]
    pub birthday: Option<NaiveDate>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<PhoneToken>,
    #[serde(default)]
    pub receive_push: Option<bool>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginWithPhoneRequest {
    pub phone: PhoneToken,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginWithKakaoRequest {
    pub access_token: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendVerificationRequest {
    pub phone_no: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyCodeRequest {
    pub phone_no: String,
    pub code: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessagingTokenRequest {
    pub messaging_token: String,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct LogoutParams {
    /// Revoke every session of the user instead of only the current one.
    #[serde(default)]
    pub all: Option<bool>,
}
