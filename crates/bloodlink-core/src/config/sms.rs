//! SMS provider configuration.

use serde::{Deserialize, Serialize};

/// Which SMS implementation to wire.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SmsProviderKind {
    /// REST provider (Twilio-compatible Messages API).
    Http,
    /// No external provider. Messages are logged and reported as simulated.
    #[default]
    Development,
}

/// SMS provider settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SmsConfig {
    /// Requested provider.
    #[serde(default)]
    pub provider: SmsProviderKind,
    /// Provider account identifier.
    #[serde(default)]
    pub account_sid: Option<String>,
    /// Provider auth token.
    #[serde(default)]
    pub auth_token: Option<String>,
    /// Sender number in E.164 form.
    #[serde(default)]
    pub from_number: Option<String>,
    /// Provider API base URL.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Permit the simulated provider in production. Operators must opt in.
    #[serde(default)]
    pub allow_development_fallback: bool,
}

impl SmsConfig {
    /// Whether every credential the HTTP provider needs is present.
    pub fn has_credentials(&self) -> bool {
        let present = |v: &Option<String>| v.as_deref().is_some_and(|s| !s.trim().is_empty());
        present(&self.account_sid) && present(&self.auth_token) && present(&self.from_number)
    }
}

impl Default for SmsConfig {
    fn default() -> Self {
        Self {
            provider: SmsProviderKind::default(),
            account_sid: None,
            auth_token: None,
            from_number: None,
            base_url: default_base_url(),
            allow_development_fallback: false,
        }
    }
}

fn default_base_url() -> String {
    "https://api.twilio.com/2010-04-01".to_string()
}
