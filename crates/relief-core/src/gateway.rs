use async_trait::async_trait;
use relief_types::money::to_cents;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};
use uuid::Uuid;

/// Card-gateway failures. `Declined` means the gateway answered and refused
/// the charge; `Transport` means it could not be reached or answered with
/// something unusable.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("payment declined: {0}")]
    Declined(String),

    #[error("payment gateway unavailable: {0}")]
    Transport(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChargeOutcome {
    pub external_id: String,
    /// False when the gateway accepted the charge but has not settled it yet.
    pub succeeded: bool,
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn authorize_charge(
        &self,
        amount: Decimal,
        method_token: &str,
    ) -> Result<ChargeOutcome, GatewayError>;
}

/// Stripe PaymentIntents client. Charges are created and confirmed in one
/// call, amounts are sent in centavos.
pub struct StripeGateway {
    client: reqwest::Client,
    api_base: String,
    secret_key: String,
    currency: String,
}

#[derive(Deserialize)]
struct PaymentIntent {
    id: String,
    status: String,
}

#[derive(Deserialize)]
struct StripeErrorBody {
    error: StripeErrorDetail,
}

#[derive(Deserialize)]
struct StripeErrorDetail {
    #[serde(rename = "type")]
    kind: Option<String>,
    message: Option<String>,
}

impl StripeGateway {
    pub fn new(api_base: &str, secret_key: &str, currency: &str) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self {
            client,
            api_base: api_base.trim_end_matches('/').to_string(),
            secret_key: secret_key.to_string(),
            currency: currency.to_string(),
        }
    }
}

#[async_trait]
impl PaymentGateway for StripeGateway {
    async fn authorize_charge(
        &self,
        amount: Decimal,
        method_token: &str,
    ) -> Result<ChargeOutcome, GatewayError> {
        let url = format!("{}/v1/payment_intents", self.api_base);
        let minor_units = to_cents(amount)
            .ok_or_else(|| GatewayError::Declined(format!("amount {} cannot be charged", amount)))?
            .to_string();

        let resp = self
            .client
            .post(&url)
            .bearer_auth(&self.secret_key)
            .form(&[
                ("amount", minor_units.as_str()),
                ("currency", self.currency.as_str()),
                ("payment_method", method_token),
                ("confirm", "true"),
            ])
            .send()
            .await
            .map_err(|e| GatewayError::Transport(e.to_string()))?;

        let status = resp.status();
        if status.is_success() {
            let intent: PaymentIntent = resp
                .json()
                .await
                .map_err(|e| GatewayError::Transport(format!("malformed payment intent: {}", e)))?;
            debug!("Payment intent {} is {}", intent.id, intent.status);
            return Ok(ChargeOutcome {
                succeeded: intent.status == "succeeded",
                external_id: intent.id,
            });
        }

        let body: Option<StripeErrorBody> = resp.json().await.ok();
        let (kind, message) = body
            .map(|b| (b.error.kind, b.error.message))
            .unwrap_or((None, None));
        let message = message.unwrap_or_else(|| format!("gateway returned {}", status));

        if status.as_u16() == 402 || kind.as_deref() == Some("card_error") {
            warn!("Card charge declined: {}", message);
            Err(GatewayError::Declined(message))
        } else {
            Err(GatewayError::Transport(message))
        }
    }
}

/// Offline gateway for development and tests.
///
/// Tokens select the outcome: `tok_declined` is refused, `tok_pending` is
/// accepted but unsettled, `tok_unreachable` fails as a transport error, and
/// anything else succeeds.
#[derive(Debug, Default, Clone, Copy)]
pub struct SandboxGateway;

#[async_trait]
impl PaymentGateway for SandboxGateway {
    async fn authorize_charge(
        &self,
        _amount: Decimal,
        method_token: &str,
    ) -> Result<ChargeOutcome, GatewayError> {
        let external_id = format!("sandbox_{}", Uuid::new_v4().simple());
        match method_token {
            "tok_declined" => Err(GatewayError::Declined("card was declined".into())),
            "tok_unreachable" => Err(GatewayError::Transport("sandbox gateway offline".into())),
            "tok_pending" => Ok(ChargeOutcome {
                external_id,
                succeeded: false,
            }),
            _ => Ok(ChargeOutcome {
                external_id,
                succeeded: true,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn sandbox_tokens_select_outcome() {
        let gw = SandboxGateway;
        let amount = Decimal::from(100);

        let ok = gw.authorize_charge(amount, "tok_visa").await.unwrap();
        assert!(ok.succeeded);
        assert!(ok.external_id.starts_with("sandbox_"));

        let pending = gw.authorize_charge(amount, "tok_pending").await.unwrap();
        assert!(!pending.succeeded);

        assert!(matches!(
            gw.authorize_charge(amount, "tok_declined").await,
            Err(GatewayError::Declined(_))
        ));
        assert!(matches!(
            gw.authorize_charge(amount, "tok_unreachable").await,
            Err(GatewayError::Transport(_))
        ));
    }

    #[tokio::test]
    async fn stripe_unreachable_is_transport_error() {
        // Port 9 (discard) on loopback is closed in test environments.
        let gw = StripeGateway::new("http://127.0.0.1:9", "sk_test", "php");
        let err = gw.authorize_charge(Decimal::from(100), "pm_card_visa").await.unwrap_err();
        assert!(matches!(err, GatewayError::Transport(_)));
    }
}
