use crate::config::MessagingConfig;
use crate::error::AppResult;
use reqwest::Client;
use serde_json::json;

const FCM_SEND_URL: &str = "https://fcm.googleapis.com/fcm/send";

/// FCM push client. Delivery is best effort; a push that cannot be sent is
/// logged and swallowed so it never fails the surrounding operation.
#[derive(Clone)]
pub struct MessagingClient {
    client: Client,
    config: MessagingConfig,
}

impl MessagingClient {
    pub fn new(config: MessagingConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    pub async fn send_push(&self, token: &str, title: &str, body: &str) -> AppResult<()> {
        if self.config.fcm_server_key.is_empty() {
            log::warn!("fcm server key not configured, skipping push");
            return Ok(());
        }

        let result = self
            .client
            .post(FCM_SEND_URL)
            .header(
                "Authorization",
                format!("key={}", self.config.fcm_server_key),
            )
            .json(&json!({
                "to": token,
                "notification": {
                    "title": title,
                    "body": body,
                },
            }))
            .send()
            .await;

        match result {
            Ok(response) if response.status().is_success() => Ok(()),
            Ok(response) => {
                log::warn!("fcm answered {} for push to token", response.status());
                Ok(())
            }
            Err(e) => {
                log::warn!("fcm request failed: {e}");
                Ok(())
            }
        }
    }
}
