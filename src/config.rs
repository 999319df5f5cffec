use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub internal: InternalConfig,
    pub payments: PaymentsConfig,
    pub platform: PlatformConfig,
    pub sms: SmsConfig,
    #[serde(default)]
    pub messaging: MessagingConfig,
    #[serde(default)]
    pub phone: PhoneConfig,
    #[serde(default)]
    pub referral: ReferralConfig,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

/// Shared secret for the internal service-to-service tokens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InternalConfig {
    pub secret_key: String,
    pub issuer: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentsConfig {
    pub base_url: String,
    pub secret_key: String,
    pub issuer: String,
    pub audience: String,
}

/// License verification API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlatformConfig {
    pub base_url: String,
    pub access_key: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SmsConfig {
    pub base_url: String,
    pub api_key: String,
    pub from: String,
    /// Skip the gateway call and only log the code.
    #[serde(default)]
    pub debug: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct MessagingConfig {
    #[serde(default)]
    pub fcm_server_key: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PhoneConfig {
    /// Verification code accepted unconditionally. Never set in production.
    #[serde(default)]
    pub bypass_code: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ReferralConfig {
    /// Coupon group granted to the referrer; unset disables the reward.
    #[serde(default)]
    pub coupon_group_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    pub pass_extend_interval_secs: u64,
    pub level_update_interval_secs: u64,
    pub enabled: bool,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            pass_extend_interval_secs: 6 * 3600,
            level_update_interval_secs: 24 * 3600,
            enabled: true,
        }
    }
}

impl Config {
    pub fn from_toml() -> Result<Self, Box<dyn std::error::Error>> {
        let config_path = env::var("CONFIG_PATH").unwrap_or_else(|_| "config.toml".to_string());
        let config_str = std::fs::read_to_string(&config_path)
            .map_err(|e| format!("failed to read {config_path}: {e}"))?;
        let mut config: Config =
            toml::from_str(&config_str).map_err(|e| format!("failed to parse {config_path}: {e}"))?;

        // Deployment overrides.
        if let Ok(v) = env::var("SERVER_HOST") {
            config.server.host = v;
        }
        if let Ok(v) = env::var("SERVER_PORT") {
            if let Ok(p) = v.parse() {
                config.server.port = p;
            }
        }
        if let Ok(v) = env::var("DATABASE_URL") {
            config.database.url = v;
        }
        if let Ok(v) = env::var("DB_MAX_CONNECTIONS") {
            if let Ok(mc) = v.parse() {
                config.database.max_connections = mc;
            }
        }
        if let Ok(v) = env::var("INTERNAL_SECRET_KEY") {
            config.internal.secret_key = v;
        }
        if let Ok(v) = env::var("PAYMENTS_BASE_URL") {
            config.payments.base_url = v;
        }
        if let Ok(v) = env::var("PAYMENTS_SECRET_KEY") {
            config.payments.secret_key = v;
        }
        if let Ok(v) = env::var("PLATFORM_BASE_URL") {
            config.platform.base_url = v;
        }
        if let Ok(v) = env::var("PLATFORM_ACCESS_KEY") {
            config.platform.access_key = v;
        }
        if let Ok(v) = env::var("SMS_API_KEY") {
            config.sms.api_key = v;
        }
        if let Ok(v) = env::var("FCM_SERVER_KEY") {
            config.messaging.fcm_server_key = v;
        }

        Ok(config)
    }
}
