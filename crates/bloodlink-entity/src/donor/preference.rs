//! Donor notification preferences.

use serde::{Deserialize, Serialize};

use crate::blood::Urgency;
use crate::notification::DeliveryChannel;

/// Which channels a donor accepts and for which urgencies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationPreferences {
    /// Receive SMS.
    #[serde(default = "default_true")]
    pub sms: bool,
    /// Receive in-app realtime events.
    #[serde(default = "default_true")]
    pub realtime: bool,
    /// Urgency levels the donor wants to hear about.
    #[serde(default = "all_urgencies")]
    pub urgencies: Vec<Urgency>,
}

impl NotificationPreferences {
    /// Whether the donor opted into this urgency.
    pub fn accepts(&self, urgency: Urgency) -> bool {
        self.urgencies.contains(&urgency)
    }

    /// Channels the donor has enabled, SMS first.
    pub fn enabled_channels(&self) -> Vec<DeliveryChannel> {
        let mut channels = Vec::with_capacity(2);
        if self.sms {
            channels.push(DeliveryChannel::Sms);
        }
        if self.realtime {
            channels.push(DeliveryChannel::Realtime);
        }
        channels
    }

    /// Whether at least one channel is on.
    pub fn has_enabled_channel(&self) -> bool {
        self.sms || self.realtime
    }
}

impl Default for NotificationPreferences {
    fn default() -> Self {
        Self {
            sms: true,
            realtime: true,
            urgencies: all_urgencies(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn all_urgencies() -> Vec<Urgency> {
    Urgency::ALL.to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_fields_default_to_opted_in() {
        let prefs: NotificationPreferences = serde_json::from_str("{}").unwrap();
        assert_eq!(prefs, NotificationPreferences::default());
        assert!(prefs.accepts(Urgency::Standard));
    }

    #[test]
    fn test_channels_follow_flags() {
        let prefs = NotificationPreferences {
            sms: false,
            realtime: true,
            urgencies: vec![Urgency::Critical],
        };
        assert_eq!(prefs.enabled_channels(), vec![DeliveryChannel::Realtime]);
        assert!(!prefs.accepts(Urgency::Urgent));
    }
}
