//! HTTP SMS provider speaking the Twilio Messages API.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tracing::debug;

use bloodlink_core::config::SmsConfig;
use bloodlink_core::error::AppError;
use bloodlink_core::result::AppResult;
use bloodlink_core::traits::{DeliveryMode, SmsError, SmsProvider, SmsReceipt};

/// Sends messages through `POST {base_url}/Accounts/{sid}/Messages.json`.
#[derive(Debug, Clone)]
pub struct HttpSmsProvider {
    client: Client,
    messages_url: String,
    account_sid: String,
    auth_token: String,
    from_number: String,
}

#[derive(Debug, Deserialize)]
struct MessageResponse {
    sid: String,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    #[serde(default)]
    code: Option<i64>,
    #[serde(default)]
    message: Option<String>,
}

impl HttpSmsProvider {
    /// Build a provider from complete credentials. Each HTTP call is capped
    /// at `call_timeout`.
    pub fn new(config: &SmsConfig, call_timeout: Duration) -> AppResult<Self> {
        let required = |value: &Option<String>, field: &str| {
            value
                .as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .ok_or_else(|| AppError::configuration(format!("sms.{field} is required")))
        };
        let account_sid = required(&config.account_sid, "account_sid")?;
        let auth_token = required(&config.auth_token, "auth_token")?;
        let from_number = required(&config.from_number, "from_number")?;

        let client = Client::builder()
            .timeout(call_timeout)
            .build()
            .map_err(|e| AppError::configuration(format!("Failed to build SMS client: {e}")))?;

        Ok(Self {
            client,
            messages_url: format!(
                "{}/Accounts/{}/Messages.json",
                config.base_url.trim_end_matches('/'),
                account_sid
            ),
            account_sid,
            auth_token,
            from_number,
        })
    }
}

/// Throttling and server errors are worth retrying; any other rejection is
/// final.
fn classify(status: StatusCode, detail: String) -> SmsError {
    if status == StatusCode::TOO_MANY_REQUESTS
        || status == StatusCode::REQUEST_TIMEOUT
        || status.is_server_error()
    {
        SmsError::Transient(format!("provider returned {status}: {detail}"))
    } else {
        SmsError::Permanent(format!("provider returned {status}: {detail}"))
    }
}

#[async_trait]
impl SmsProvider for HttpSmsProvider {
    async fn send(&self, to: &str, body: &str) -> Result<SmsReceipt, SmsError> {
        let response = self
            .client
            .post(&self.messages_url)
            .basic_auth(&self.account_sid, Some(&self.auth_token))
            .form(&[("To", to), ("From", self.from_number.as_str()), ("Body", body)])
            .send()
            .await
            .map_err(|e| {
                if e.is_builder() {
                    SmsError::Permanent(format!("invalid SMS request: {e}"))
                } else {
                    SmsError::Transient(format!("SMS provider unreachable: {e}"))
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let detail = match response.json::<ErrorResponse>().await {
                Ok(ErrorResponse {
                    code: Some(code),
                    message: Some(message),
                }) => format!("{code} {message}"),
                Ok(ErrorResponse {
                    message: Some(message),
                    ..
                }) => message,
                _ => "no error body".to_string(),
            };
            return Err(classify(status, detail));
        }

        let message: MessageResponse = response
            .json()
            .await
            .map_err(|e| SmsError::Transient(format!("unreadable provider response: {e}")))?;

        debug!(to, sid = %message.sid, "SMS accepted by provider");
        Ok(SmsReceipt {
            id: message.sid,
            mode: DeliveryMode::Delivered,
        })
    }

    fn name(&self) -> &'static str {
        "http"
    }
}
