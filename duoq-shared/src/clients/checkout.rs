use reqwest::Client;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::{AppError, ErrorCode};

/// Subscription price tier. Amounts are fixed in USD cents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PriceTier {
    Monthly,
    Yearly,
}

impl PriceTier {
    pub fn amount_cents(&self) -> u32 {
        match self {
            PriceTier::Monthly => 300,
            PriceTier::Yearly => 3000,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PriceTier::Monthly => "monthly",
            PriceTier::Yearly => "yearly",
        }
    }
}

/// Client for the Polar checkout API.
#[derive(Clone)]
pub struct CheckoutClient {
    client: Client,
    api_url: String,
    access_token: String,
}

#[derive(Debug, Serialize)]
struct CheckoutRequest {
    product_id: String,
    success_url: String,
    amount: u32,
    currency: String,
    metadata: CheckoutMetadata,
}

#[derive(Debug, Serialize)]
struct CheckoutMetadata {
    subscription_type: String,
    user_id: Uuid,
}

#[derive(Debug, Deserialize)]
struct CheckoutApiResponse {
    id: String,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    checkout_url: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CheckoutSession {
    pub checkout_url: String,
    pub session_id: String,
}

impl CheckoutClient {
    pub fn new(api_url: &str, access_token: &str) -> Self {
        Self {
            client: Client::new(),
            api_url: api_url.trim_end_matches('/').to_string(),
            access_token: access_token.to_string(),
        }
    }

    /// Creates a checkout session and returns the redirect URL. The call has
    /// no local side effects; failures surface as `PaymentProviderError`.
    pub async fn create_checkout(
        &self,
        product_id: &str,
        tier: PriceTier,
        user_id: Uuid,
        success_url: &str,
    ) -> Result<CheckoutSession, AppError> {
        let request = CheckoutRequest {
            product_id: product_id.to_string(),
            success_url: success_url.to_string(),
            amount: tier.amount_cents(),
            currency: "USD".to_string(),
            metadata: CheckoutMetadata {
                subscription_type: tier.as_str().to_string(),
                user_id,
            },
        };

        let response = self.client
            .post(format!("{}/v1/checkouts/", self.api_url))
            .header("Authorization", format!("Bearer {}", self.access_token))
            .json(&request)
            .send()
            .await
            .map_err(|e| AppError::new(ErrorCode::PaymentProviderError, format!("checkout request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, body = %body, "checkout provider error");
            return Err(AppError::new(
                ErrorCode::PaymentProviderError,
                format!("checkout provider returned {status}"),
            ));
        }

        let checkout: CheckoutApiResponse = response
            .json()
            .await
            .map_err(|e| AppError::new(ErrorCode::PaymentProviderError, format!("invalid checkout response: {e}")))?;

        let checkout_url = checkout
            .url
            .or(checkout.checkout_url)
            .ok_or_else(|| AppError::new(ErrorCode::PaymentProviderError, "checkout response missing redirect URL"))?;

        tracing::debug!(session_id = %checkout.id, "checkout session created");

        Ok(CheckoutSession {
            checkout_url,
            session_id: checkout.id,
        })
    }
}
