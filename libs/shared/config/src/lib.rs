use std::env;
use tracing::warn;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub baas_url: String,
    pub baas_anon_key: String,
    pub baas_jwt_secret: String,
    pub payment_gateway_base_url: String,
    pub payment_key_id: String,
    pub payment_key_secret: String,
    pub payment_webhook_secret: String,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let config = Self {
            baas_url: env::var("BAAS_URL")
                .unwrap_or_else(|_| {
                    warn!("BAAS_URL not set, using empty value");
                    String::new()
                }),
            baas_anon_key: env::var("BAAS_ANON_KEY")
                .unwrap_or_else(|_| {
                    warn!("BAAS_ANON_KEY not set, using empty value");
                    String::new()
                }),
            baas_jwt_secret: env::var("BAAS_JWT_SECRET")
                .unwrap_or_else(|_| {
                    warn!("BAAS_JWT_SECRET not set, using empty value");
                    String::new()
                }),
            payment_gateway_base_url: env::var("PAYMENT_GATEWAY_BASE_URL")
                .unwrap_or_else(|_| {
                    warn!("PAYMENT_GATEWAY_BASE_URL not set, using default");
                    "https://api.razorpay.com/v1".to_string()
                }),
            payment_key_id: env::var("PAYMENT_KEY_ID")
                .unwrap_or_else(|_| {
                    warn!("PAYMENT_KEY_ID not set, using empty value");
                    String::new()
                }),
            payment_key_secret: env::var("PAYMENT_KEY_SECRET")
                .unwrap_or_else(|_| {
                    warn!("PAYMENT_KEY_SECRET not set, using empty value");
                    String::new()
                }),
            payment_webhook_secret: env::var("PAYMENT_WEBHOOK_SECRET")
                .unwrap_or_else(|_| {
                    warn!("PAYMENT_WEBHOOK_SECRET not set, using empty value");
                    String::new()
                }),
        };

        if !config.is_configured() {
            warn!("Application not fully configured - missing environment variables");
        }

        config
    }

    pub fn is_configured(&self) -> bool {
        !self.baas_url.is_empty()
            && !self.baas_anon_key.is_empty()
            && !self.baas_jwt_secret.is_empty()
    }

    pub fn is_payment_configured(&self) -> bool {
        !self.payment_key_id.is_empty()
            && !self.payment_key_secret.is_empty()
            && !self.payment_gateway_base_url.is_empty()
    }
}
