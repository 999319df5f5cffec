use crate::config::SmsConfig;
use crate::error::{AppError, AppResult};
use reqwest::Client;
use serde_json::json;

/// SMS gateway client for verification codes.
#[derive(Clone)]
pub struct SmsClient {
    client: Client,
    config: SmsConfig,
}

impl SmsClient {
    pub fn new(config: SmsConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    pub async fn send_verification_code(&self, phone_no: &str, code: &str) -> AppResult<()> {
        let body = format!("인증번호 [{code}]를 입력해주세요.");
        self.send(phone_no, &body).await
    }

    pub async fn send(&self, to: &str, body: &str) -> AppResult<()> {
        if self.config.debug {
            // Local stacks have no gateway credentials.
            log::info!("sms debug mode, skipping send to {to}: {body}");
            return Ok(());
        }

        let url = format!("{}/messages", self.config.base_url.trim_end_matches('/'));
        let response = self
            .client
            .post(&url)
            .header("X-Api-Key", &self.config.api_key)
            .json(&json!({
                "from": self.config.from,
                "to": to,
                "body": body,
            }))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(AppError::ExternalApiError(format!(
                "sms gateway answered {status}: {text}"
            )));
        }

        log::info!("sms sent to {to}");
        Ok(())
    }
}
