//! HTTP transport to the gateway

use crate::error::{PaymentError, PaymentResult};
use async_trait::async_trait;
use std::time::Duration;

/// Content type the `ProcessCreditCard` endpoint expects.
pub const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// Sends an encoded request body and returns the raw response body.
#[async_trait]
pub trait GatewayTransport: Send + Sync {
    async fn post(&self, endpoint: &str, body: String) -> PaymentResult<String>;
}

/// reqwest-backed transport. One attempt per call, no retries.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new(timeout: Duration) -> PaymentResult<Self> {
        // The gateway's certificate chain is not verifiable on every host.
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .danger_accept_invalid_certs(true)
            .build()?;
        Ok(Self { client })
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl GatewayTransport for HttpTransport {
    async fn post(&self, endpoint: &str, body: String) -> PaymentResult<String> {
        let response = self
            .client
            .post(endpoint)
            .header(reqwest::header::CONTENT_TYPE, FORM_CONTENT_TYPE)
            .body(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(PaymentError::Transport(format!(
                "gateway returned HTTP {}",
                status.as_u16()
            )));
        }

        Ok(response.text().await?)
    }
}
