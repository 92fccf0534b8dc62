//! SMS provider selection and simulated delivery.

use std::time::Duration;

use bloodlink_core::config::{Environment, SmsConfig, SmsProviderKind};
use bloodlink_core::error::ErrorKind;
use bloodlink_core::traits::DeliveryMode;
use bloodlink_database::NotificationRepository;
use bloodlink_dispatch::build_sms_provider;
use bloodlink_entity::blood::{BloodType, Urgency};
use bloodlink_entity::notification::{DeliveryChannel, DeliveryOutcome};

use crate::helpers::{TestEngine, request};

#[tokio::test]
async fn test_unconfigured_sms_is_simulated_but_notification_is_stored() {
    let sms = build_sms_provider(
        &SmsConfig::default(),
        Environment::Development,
        Duration::from_secs(1),
    )
    .unwrap();
    let t = TestEngine::with_sms_provider(Some(sms));
    let requester = t.requester().await;
    let donor = t.donor("Ahmed", BloodType::ONeg, 4.0, "+22236000004").await;

    let summary = t
        .engine
        .request_created(request(requester, BloodType::BPos, Urgency::Critical, 1))
        .await
        .unwrap();

    let outcome = summary.donor(donor).unwrap();
    match &outcome.channel(DeliveryChannel::Sms).unwrap().outcome {
        DeliveryOutcome::Simulated { provider_id } => assert!(provider_id.starts_with("dev-")),
        other => panic!("expected a simulated send, got {other:?}"),
    }

    let inbox = t.repos.notifications.list_for_user(donor, 10).await.unwrap();
    assert_eq!(inbox.len(), 1);
    let records = t.repos.notifications.deliveries(inbox[0].id).await.unwrap();
    assert!(records.iter().any(|r| r.outcome.status_str() == "simulated"));
}

#[tokio::test]
async fn test_verification_code_over_simulated_sms_reports_simulated() {
    let sms = build_sms_provider(
        &SmsConfig::default(),
        Environment::Development,
        Duration::from_secs(1),
    )
    .unwrap();
    let t = TestEngine::with_sms_provider(Some(sms));

    let receipt = t.engine.issue_code("+22236000077").await.unwrap();
    assert_eq!(receipt.delivery, DeliveryMode::Simulated);
}

#[test]
fn test_production_refuses_simulated_sms_unless_allowed() {
    let incomplete = SmsConfig {
        provider: SmsProviderKind::Http,
        ..SmsConfig::default()
    };
    let err = build_sms_provider(&incomplete, Environment::Production, Duration::from_secs(1))
        .err()
        .unwrap();
    assert_eq!(err.kind, ErrorKind::Configuration);

    let allowed = SmsConfig {
        allow_development_fallback: true,
        ..incomplete
    };
    let provider =
        build_sms_provider(&allowed, Environment::Production, Duration::from_secs(1)).unwrap();
    assert_eq!(provider.name(), "development");
}
