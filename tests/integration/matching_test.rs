//! Donor selection and alert fan-out.

use bloodlink_core::traits::user_room;
use bloodlink_database::NotificationRepository;
use bloodlink_dispatch::DonorStatus;
use bloodlink_entity::blood::{BloodType, Urgency};
use bloodlink_entity::notification::{DeliveryChannel, DeliveryOutcome, NotificationPayload};

use crate::helpers::{TestEngine, request};

#[tokio::test]
async fn test_critical_ab_positive_reaches_city_wide_donors_nearest_first() {
    let t = TestEngine::new();
    let requester = t.requester().await;
    let far = t.donor("Far", BloodType::ONeg, 40.0, "+22236000040").await;
    let near = t.donor("Near", BloodType::ONeg, 2.0, "+22236000002").await;

    let summary = t
        .engine
        .request_created(request(requester, BloodType::AbPos, Urgency::Critical, 1))
        .await
        .unwrap();

    // The requester is an A+ donor within range but never alerted.
    let order: Vec<_> = summary.donors.iter().map(|d| d.donor_id).collect();
    assert_eq!(order, vec![near, far]);
    assert_eq!(summary.notified(), 2);
    assert!(!summary.timed_out);

    for donor in [near, far] {
        let inbox = t.repos.notifications.list_for_user(donor, 10).await.unwrap();
        assert_eq!(inbox.len(), 1);
        assert!(inbox[0].urgent);
        assert!(matches!(
            inbox[0].payload,
            NotificationPayload::BloodRequest { urgency: Urgency::Critical, .. }
        ));
        assert_eq!(t.channel.events_in(&user_room(donor), "notification:new").len(), 1);
    }

    let near_outcome = summary.donor(near).unwrap();
    assert!((near_outcome.distance_km - 2.0).abs() < 0.05);
    assert!(matches!(
        near_outcome.channel(DeliveryChannel::Sms).unwrap().outcome,
        DeliveryOutcome::Delivered { .. }
    ));
    assert_eq!(t.sms.messages_to("+22236000002").len(), 1);
}

#[tokio::test]
async fn test_dispatching_twice_alerts_each_donor_once() {
    let t = TestEngine::new();
    let requester = t.requester().await;
    let donor = t.donor("Mariem", BloodType::OPos, 3.0, "+22236000003").await;
    let req = request(requester, BloodType::OPos, Urgency::Urgent, 2);

    let first = t.engine.request_created(req.clone()).await.unwrap();
    let second = t.engine.request_created(req).await.unwrap();

    assert_eq!(first.notified(), 1);
    assert_eq!(second.already_notified(), 1);
    assert_eq!(second.donor(donor).unwrap().status, DonorStatus::AlreadyNotified);

    let inbox = t.repos.notifications.list_for_user(donor, 10).await.unwrap();
    assert_eq!(inbox.len(), 1);
    assert_eq!(t.sms.messages_to("+22236000003").len(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_dispatches_alert_each_donor_once() {
    let t = TestEngine::new();
    let requester = t.requester().await;
    let donors = [
        (t.donor("Aicha", BloodType::ONeg, 1.0, "+22236000051").await, "+22236000051"),
        (t.donor("Baba", BloodType::OPos, 2.0, "+22236000052").await, "+22236000052"),
        (t.donor("Coumba", BloodType::ONeg, 3.0, "+22236000053").await, "+22236000053"),
    ];
    let req = request(requester, BloodType::OPos, Urgency::Critical, 3);

    let (first, second) = tokio::join!(
        t.engine.request_created(req.clone()),
        t.engine.request_created(req.clone()),
    );
    let (first, second) = (first.unwrap(), second.unwrap());

    assert_eq!(first.notified() + second.notified(), donors.len());
    for (donor, phone) in donors {
        let statuses = [
            first.donor(donor).unwrap().status,
            second.donor(donor).unwrap().status,
        ];
        assert!(statuses.contains(&DonorStatus::Notified));
        assert!(statuses.contains(&DonorStatus::AlreadyNotified));

        let inbox = t.repos.notifications.list_for_user(donor, 10).await.unwrap();
        assert_eq!(inbox.len(), 1);
        assert_eq!(t.sms.messages_to(phone).len(), 1);
    }
}

#[tokio::test]
async fn test_incompatible_donors_are_not_alerted() {
    let t = TestEngine::new();
    let requester = t.requester().await;
    t.donor("Brahim", BloodType::BPos, 1.0, "+22236000011").await;

    let summary = t
        .engine
        .request_created(request(requester, BloodType::ONeg, Urgency::Critical, 1))
        .await
        .unwrap();

    assert!(summary.donors.is_empty());
    assert!(t.sms.sent.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_permanent_sms_failure_still_delivers_in_app() {
    let t = TestEngine::new();
    let requester = t.requester().await;
    let donor = t.donor("Khadija", BloodType::ONeg, 5.0, "+22236000005").await;
    *t.sms.fail_permanently.lock().unwrap() = true;

    let summary = t
        .engine
        .request_created(request(requester, BloodType::ANeg, Urgency::Urgent, 1))
        .await
        .unwrap();

    let outcome = summary.donor(donor).unwrap();
    assert_eq!(outcome.status, DonorStatus::Notified);
    let sms = outcome.channel(DeliveryChannel::Sms).unwrap();
    assert!(matches!(sms.outcome, DeliveryOutcome::Failed { .. }));
    assert_eq!(sms.attempts, 1);
    assert!(outcome.channel(DeliveryChannel::Realtime).unwrap().outcome.is_success());

    let id = outcome.notification_id.unwrap();
    let records = t.repos.notifications.deliveries(id).await.unwrap();
    assert_eq!(records.len(), 2);
}
