use crate::config::PaymentsConfig;
use crate::error::{AppError, AppResult};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{encode, EncodingKey, Header};
use reqwest::{Client, Method, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Coupon owned by the payments service; referenced here by id only.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Coupon {
    pub coupon_id: String,
    pub user_id: String,
    pub coupon_group_id: String,
    #[serde(default)]
    pub coupon_group: Option<CouponGroup>,
    #[serde(default)]
    pub used_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub expired_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CouponGroup {
    pub coupon_group_id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub validity: Option<i64>,
    /// Per-user redemption cap; `None` or 0 means uncapped.
    #[serde(default)]
    pub limit: Option<i64>,
    #[serde(default)]
    pub code: Option<String>,
}

#[derive(Debug, Serialize)]
struct TokenClaims {
    sub: String,
    iss: String,
    aud: String,
    iat: i64,
    exp: i64,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    opcode: i64,
    #[serde(default)]
    message: Option<String>,
}

/// Internal payments/coupon service client. Signs short-lived HS256 tokens
/// against the shared secret; tokens are cached until shortly before expiry.
#[derive(Clone)]
pub struct PaymentsClient {
    client: Client,
    config: PaymentsConfig,
    token: Arc<Mutex<Option<(String, DateTime<Utc>)>>>,
}

impl PaymentsClient {
    pub fn new(config: PaymentsConfig) -> Self {
        Self {
            client: Client::new(),
            config,
            token: Arc::new(Mutex::new(None)),
        }
    }

    async fn access_token(&self) -> AppResult<String> {
        let mut cached = self.token.lock().await;
        if let Some((token, expires_at)) = cached.as_ref() {
            if *expires_at > Utc::now() + Duration::minutes(5) {
                return Ok(token.clone());
            }
        }

        let now = Utc::now();
        let expires_at = now + Duration::hours(1);
        let claims = TokenClaims {
            sub: "coreservice-payments".to_string(),
            iss: self.config.issuer.clone(),
            aud: self.config.audience.clone(),
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
        };

        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.config.secret_key.as_bytes()),
        )?;
        *cached = Some((token.clone(), expires_at));
        Ok(token)
    }

    async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<serde_json::Value>,
    ) -> AppResult<serde_json::Value> {
        let url = format!("{}/{}", self.config.base_url.trim_end_matches('/'), path);
        let token = self.access_token().await?;
        let mut req = self.client.request(method, &url).bearer_auth(token);
        if let Some(body) = body {
            req = req.json(&body);
        }

        let response = req.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response.json().await?);
        }

        // The payments service answers rejections with its own opcode
        // envelope; keep it so callers can classify business failures.
        let text = response.text().await.unwrap_or_default();
        if let Ok(err) = serde_json::from_str::<ErrorBody>(&text) {
            return Err(AppError::Payments {
                opcode: err.opcode,
                message: err.message.unwrap_or_else(|| status.to_string()),
            });
        }

        if status == StatusCode::NOT_FOUND {
            return Err(AppError::InvalidApi);
        }

        Err(AppError::ExternalApiError(format!(
            "payments {url} failed with {status}: {text}"
        )))
    }

    pub async fn generate_coupon(
        &self,
        user_id: &str,
        coupon_group_id: &str,
    ) -> AppResult<Coupon> {
        #[derive(Deserialize)]
        struct Res {
            coupon: Coupon,
        }

        let body = json!({ "couponGroupId": coupon_group_id });
        let value = self
            .request(Method::POST, &format!("users/{user_id}/coupons"), Some(body))
            .await?;
        let res: Res = serde_json::from_value(value)?;
        Ok(res.coupon)
    }

    pub async fn delete_coupon(&self, user_id: &str, coupon_id: &str) -> AppResult<()> {
        self.request(
            Method::DELETE,
            &format!("users/{user_id}/coupons/{coupon_id}"),
            None,
        )
        .await?;
        Ok(())
    }

    pub async fn get_coupons(&self, user_id: &str) -> AppResult<Vec<Coupon>> {
        #[derive(Deserialize)]
        struct Res {
            coupons: Vec<Coupon>,
        }

        let value = self
            .request(Method::GET, &format!("users/{user_id}/coupons"), None)
            .await?;
        let res: Res = serde_json::from_value(value)?;
        Ok(res.coupons)
    }

    pub async fn count_coupons(&self, user_id: &str, coupon_group_id: &str) -> AppResult<i64> {
        let coupons = self.get_coupons(user_id).await?;
        Ok(coupons
            .iter()
            .filter(|c| c.coupon_group_id == coupon_group_id)
            .count() as i64)
    }

    pub async fn get_coupon_group_by_code(&self, code: &str) -> AppResult<CouponGroup> {
        #[derive(Deserialize)]
        struct Res {
            #[serde(rename = "couponGroup")]
            coupon_group: CouponGroup,
        }

        let value = self
            .request(Method::GET, &format!("couponGroups/codes/{code}"), None)
            .await?;
        let res: Res = serde_json::from_value(value)?;
        Ok(res.coupon_group)
    }

    /// Posts a required charge record. The payments service rejects the
    /// record (nonzero opcode) when the charge cannot be made.
    pub async fn create_record(
        &self,
        user_id: &str,
        name: &str,
        amount: i64,
        properties: serde_json::Value,
    ) -> AppResult<()> {
        let body = json!({
            "userId": user_id,
            "name": name,
            "amount": amount,
            "required": true,
            "properties": properties,
        });

        self.request(Method::POST, "records", Some(body)).await?;
        Ok(())
    }
}
