// libs/payment-cell/src/services/gateway.rs
use hmac::{Hmac, Mac};
use reqwest::Client;
use serde_json::json;
use sha2::Sha256;
use tracing::{debug, error, info};

use shared_config::AppConfig;

use crate::models::{PaymentError, PaymentOrder};

type HmacSha256 = Hmac<Sha256>;

/// Payment gateway client: creates orders ahead of the checkout widget and
/// verifies the signatures the widget (or a webhook) reports back.
#[derive(Debug)]
pub struct PaymentGatewayClient {
    client: Client,
    base_url: String,
    key_id: String,
    key_secret: String,
    webhook_secret: String,
}

impl PaymentGatewayClient {
    pub fn new(config: &AppConfig) -> Result<Self, PaymentError> {
        if !config.is_payment_configured() {
            return Err(PaymentError::NotConfigured);
        }

        Ok(Self {
            client: Client::new(),
            base_url: config.payment_gateway_base_url.clone(),
            key_id: config.payment_key_id.clone(),
            key_secret: config.payment_key_secret.clone(),
            webhook_secret: config.payment_webhook_secret.clone(),
        })
    }

    /// Create an order for the given amount in minor currency units.
    /// POST /orders
    pub async fn create_order(
        &self,
        amount: i64,
        currency: &str,
        receipt: &str,
    ) -> Result<PaymentOrder, PaymentError> {
        if amount <= 0 {
            return Err(PaymentError::InvalidAmount(amount));
        }

        info!("Creating payment order for {} {} (receipt {})", amount, currency, receipt);

        let url = format!("{}/orders", self.base_url);

        let request_body = json!({
            "amount": amount,
            "currency": currency,
            "receipt": receipt,
        });

        debug!("Sending order creation request to: {}", url);

        let response = self
            .client
            .post(&url)
            .basic_auth(&self.key_id, Some(&self.key_secret))
            .header("Content-Type", "application/json")
            .json(&request_body)
            .send()
            .await?;

        let status = response.status();
        let response_text = response.text().await?;

        debug!("Gateway order creation response: {} - {}", status, response_text);

        if !status.is_success() {
            error!("Gateway order creation failed: {} - {}", status, response_text);
            return Err(PaymentError::GatewayError {
                message: format!("HTTP {}: {}", status, response_text),
            });
        }

        let order: PaymentOrder = serde_json::from_str(&response_text)
            .map_err(|e| PaymentError::GatewayError {
                message: format!("Failed to parse order response: {}", e),
            })?;

        info!("Payment order created: {}", order.id);
        Ok(order)
    }

    /// Verify the checkout widget callback signature:
    /// hex(HMAC-SHA256(key_secret, "{order_id}|{payment_id}")).
    pub fn verify_checkout_signature(
        &self,
        order_id: &str,
        payment_id: &str,
        signature: &str,
    ) -> Result<(), PaymentError> {
        verify_hmac_hex(
            &self.key_secret,
            &format!("{}|{}", order_id, payment_id),
            signature,
        )
    }

    /// Verify a webhook payload signature against the webhook secret.
    pub fn verify_webhook_signature(
        &self,
        payload: &str,
        signature: &str,
    ) -> Result<(), PaymentError> {
        verify_hmac_hex(&self.webhook_secret, payload, signature)
    }
}

fn verify_hmac_hex(secret: &str, message: &str, signature: &str) -> Result<(), PaymentError> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|_| PaymentError::SignatureMismatch)?;
    mac.update(message.as_bytes());

    let expected = hex::encode(mac.finalize().into_bytes());

    // Signatures come from an external caller; compare the hex forms
    // case-insensitively.
    if expected.eq_ignore_ascii_case(signature) {
        Ok(())
    } else {
        debug!("Signature mismatch for message of {} bytes", message.len());
        Err(PaymentError::SignatureMismatch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sign(secret: &str, message: &str) -> String {
        let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).unwrap();
        mac.update(message.as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }

    #[test]
    fn checkout_signature_accepts_valid_hmac() {
        let signature = sign("secret", "order_abc|pay_xyz");
        assert!(verify_hmac_hex("secret", "order_abc|pay_xyz", &signature).is_ok());
    }

    #[test]
    fn checkout_signature_rejects_tampered_payment_id() {
        let signature = sign("secret", "order_abc|pay_xyz");
        assert!(verify_hmac_hex("secret", "order_abc|pay_other", &signature).is_err());
    }

    #[test]
    fn checkout_signature_rejects_wrong_secret() {
        let signature = sign("other-secret", "order_abc|pay_xyz");
        assert!(verify_hmac_hex("secret", "order_abc|pay_xyz", &signature).is_err());
    }

    #[test]
    fn checkout_signature_is_case_insensitive_over_hex() {
        let signature = sign("secret", "order_abc|pay_xyz").to_uppercase();
        assert!(verify_hmac_hex("secret", "order_abc|pay_xyz", &signature).is_ok());
    }
}
