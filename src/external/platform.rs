use crate::config::PlatformConfig;
use crate::error::{AppError, AppResult};
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;

/// Government driver's-license verification gateway.
#[derive(Clone)]
pub struct PlatformClient {
    client: Client,
    config: PlatformConfig,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ValidateResponse {
    opcode: i64,
    #[serde(default)]
    is_valid: bool,
}

impl PlatformClient {
    pub fn new(config: PlatformConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    /// Checks a license against the registry. Any gateway failure counts as
    /// invalid; a license is only accepted on an explicit positive answer.
    pub async fn validate_license(
        &self,
        realname: &str,
        birthday: &str,
        license_str: &str,
    ) -> AppResult<()> {
        let url = format!("{}/license", self.config.base_url.trim_end_matches('/'));
        let response = self
            .client
            .post(&url)
            .header("X-Access-Key", &self.config.access_key)
            .json(&json!({
                "realname": realname,
                "birthday": birthday,
                "license": license_str,
            }))
            .send()
            .await
            .map_err(|e| {
                log::error!("license validation request failed: {e}");
                AppError::InvalidLicense
            })?;

        if !response.status().is_success() {
            log::warn!(
                "license validation gateway answered {}",
                response.status()
            );
            return Err(AppError::InvalidLicense);
        }

        let body: ValidateResponse = response.json().await.map_err(|e| {
            log::error!("license validation response unreadable: {e}");
            AppError::InvalidLicense
        })?;

        if body.opcode != 0 || !body.is_valid {
            return Err(AppError::InvalidLicense);
        }

        Ok(())
    }
}
