use crate::error::{AppError, AppResult};
use reqwest::Client;
use serde::Deserialize;

const USER_ME_URL: &str = "https://kapi.kakao.com/v2/user/me";

#[derive(Debug, Clone, Deserialize)]
pub struct KakaoUser {
    pub id: i64,
    #[serde(default)]
    pub kakao_account: Option<KakaoAccount>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct KakaoAccount {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone_number: Option<String>,
    #[serde(default)]
    pub birthyear: Option<String>,
    #[serde(default)]
    pub birthday: Option<String>,
    #[serde(default)]
    pub profile: Option<KakaoProfile>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct KakaoProfile {
    #[serde(default)]
    pub nickname: Option<String>,
}

impl KakaoUser {
    /// Stable identity string stored on the method row.
    pub fn identity(&self) -> String {
        self.id.to_string()
    }

    pub fn nickname(&self) -> Option<&str> {
        self.kakao_account
            .as_ref()?
            .profile
            .as_ref()?
            .nickname
            .as_deref()
    }
}

/// Kakao REST API client. User access tokens come from the mobile client;
/// this only resolves them to an account identity and profile.
#[derive(Clone)]
pub struct KakaoClient {
    client: Client,
}

impl KakaoClient {
    pub fn new() -> Self {
        Self {
            client: Client::new(),
        }
    }

    pub async fn get_user(&self, access_token: &str) -> AppResult<KakaoUser> {
        let response = self
            .client
            .get(USER_ME_URL)
            .bearer_auth(access_token)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(AppError::CannotFindWithKakao);
        }

        Ok(response.json().await?)
    }
}

impl Default for KakaoClient {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_user_payload() {
        let raw = r#"{
            "id": 123456789,
            "kakao_account": {
                "email": "rider@example.com",
                "phone_number": "+82 10-1234-5678",
                "profile": { "nickname": "rider" }
            }
        }"#;

        let user: KakaoUser = serde_json::from_str(raw).unwrap();
        assert_eq!(user.identity(), "123456789");
        assert_eq!(user.nickname(), Some("rider"));
        assert_eq!(
            user.kakao_account.unwrap().phone_number.as_deref(),
            Some("+82 10-1234-5678")
        );
    }

    #[test]
    fn tolerates_missing_account_fields() {
        let user: KakaoUser = serde_json::from_str(r#"{"id": 42}"#).unwrap();
        assert_eq!(user.identity(), "42");
        assert_eq!(user.nickname(), None);
    }
}
