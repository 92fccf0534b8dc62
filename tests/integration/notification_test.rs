//! Notification listing and read-state sync.

use bloodlink_core::error::ErrorKind;
use bloodlink_core::traits::user_room;
use bloodlink_entity::blood::{BloodType, Urgency};

use crate::helpers::{TestEngine, request};

#[tokio::test]
async fn test_marking_read_updates_count_and_other_sessions() {
    let t = TestEngine::new();
    let requester = t.requester().await;
    let donor = t.donor("Vatma", BloodType::ONeg, 2.0, "+22236000022").await;
    t.engine
        .request_created(request(requester, BloodType::OPos, Urgency::Urgent, 1))
        .await
        .unwrap();

    assert_eq!(t.engine.unread_count(donor).await.unwrap(), 1);
    let inbox = t.engine.notifications_for(donor, 20).await.unwrap();
    let id = inbox[0].id;

    let read = t.engine.mark_notification_read(id, donor).await.unwrap();
    assert!(read.read);
    assert_eq!(t.engine.unread_count(donor).await.unwrap(), 0);

    let events = t.channel.events_in(&user_room(donor), "notification:read");
    assert_eq!(events.len(), 1);
    assert_eq!(events[0]["notification_id"], id.to_string());

    // Marking again keeps the first timestamp.
    let again = t.engine.mark_notification_read(id, donor).await.unwrap();
    assert_eq!(again.read_at, read.read_at);
}

#[tokio::test]
async fn test_other_users_cannot_touch_a_notification() {
    let t = TestEngine::new();
    let requester = t.requester().await;
    let donor = t.donor("Cheikh", BloodType::ONeg, 2.0, "+22236000023").await;
    t.engine
        .request_created(request(requester, BloodType::ONeg, Urgency::Critical, 1))
        .await
        .unwrap();
    let id = t.engine.notifications_for(donor, 20).await.unwrap()[0].id;

    let err = t
        .engine
        .mark_notification_read(id, requester)
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::NotFound);

    let err = t
        .engine
        .notification_deliveries(requester, id)
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::NotFound);

    assert_eq!(t.engine.unread_count(donor).await.unwrap(), 1);
    assert_eq!(
        t.engine.notification_deliveries(donor, id).await.unwrap().len(),
        2
    );
}

#[tokio::test]
async fn test_listing_is_newest_first_and_never_empty_page() {
    let t = TestEngine::new();
    let donor = t.donor("Zeinab", BloodType::ONeg, 1.0, "+22236000024").await;
    for _ in 0..3 {
        let requester = t.requester().await;
        t.engine
            .request_created(request(requester, BloodType::ONeg, Urgency::Standard, 1))
            .await
            .unwrap();
        t.clock.advance(chrono::Duration::minutes(1));
    }

    let all = t.engine.notifications_for(donor, 50).await.unwrap();
    assert_eq!(all.len(), 3);
    assert!(all.windows(2).all(|w| w[0].created_at >= w[1].created_at));

    // A zero limit still returns one item.
    let one = t.engine.notifications_for(donor, 0).await.unwrap();
    assert_eq!(one.len(), 1);
    assert_eq!(one[0].id, all[0].id);
}
