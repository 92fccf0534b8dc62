//! Match responses and the donation confirmation lifecycle.

use bloodlink_core::error::ErrorKind;
use bloodlink_core::traits::request_room;
use bloodlink_core::types::UserId;
use bloodlink_database::NotificationRepository;
use bloodlink_entity::blood::{BloodType, Urgency};
use bloodlink_entity::donation::{ConfirmingParty, DonationStatus};
use bloodlink_entity::notification::NotificationPayload;
use bloodlink_entity::request::{MatchStatus, RequestStatus};
use bloodlink_service::MatchResponse;

use crate::helpers::{TestEngine, request};

#[tokio::test]
async fn test_accept_confirm_confirm_fulfills_single_unit_request() {
    let t = TestEngine::new();
    let requester = t.requester().await;
    let donor = t.donor("Moussa", BloodType::ONeg, 3.0, "+22236000003").await;
    let req = request(requester, BloodType::ONeg, Urgency::Critical, 1);
    let request_id = req.id;
    t.engine.request_created(req).await.unwrap();

    let outcome = t
        .engine
        .respond_to_match(
            request_id,
            donor,
            MatchResponse::Accept,
            Some("On my way".into()),
        )
        .await
        .unwrap();
    assert_eq!(outcome.entry.status, MatchStatus::Accepted);
    let donation = outcome.donation.unwrap();
    assert_eq!(donation.status, DonationStatus::Pending);
    assert_eq!(donation.recipient_id, requester);

    // The requester hears about the acceptance.
    let inbox = t.repos.notifications.list_for_user(requester, 10).await.unwrap();
    assert!(inbox.iter().any(|n| matches!(
        n.payload,
        NotificationPayload::DonationUpdate { status: DonationStatus::Pending, .. }
    )));

    let status = t
        .engine
        .confirm_donation(donation.id, ConfirmingParty::Donor)
        .await
        .unwrap();
    assert_eq!(status, DonationStatus::DonorConfirmed);

    let status = t.engine.confirm_donation_as(donation.id, requester).await.unwrap();
    assert_eq!(status, DonationStatus::Completed);

    let stored = t.engine.donation(donation.id).await.unwrap();
    assert!(stored.donation_date.is_some());

    let request = t.engine.request(request_id).await.unwrap();
    assert_eq!(request.fulfilled_units, 1);
    assert_eq!(request.status, RequestStatus::Fulfilled);

    let updates = t
        .channel
        .events_in(&request_room(request_id), "donation:updated");
    assert_eq!(updates.len(), 2);
    assert_eq!(updates[1]["status"], "completed");

    // A fulfilled request takes no more answers.
    let late = t.donor("Late", BloodType::ONeg, 4.0, "+22236000044").await;
    let err = t
        .engine
        .respond_to_match(request_id, late, MatchResponse::Accept, None)
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Conflict);
}

#[tokio::test]
async fn test_recipient_confirming_first_leaves_donation_pending() {
    let t = TestEngine::new();
    let requester = t.requester().await;
    let donor = t.donor("Fatimetou", BloodType::OPos, 2.0, "+22236000012").await;
    let req = request(requester, BloodType::OPos, Urgency::Urgent, 2);
    let request_id = req.id;
    t.engine.request_created(req).await.unwrap();

    let donation = t
        .engine
        .respond_to_match(request_id, donor, MatchResponse::Accept, None)
        .await
        .unwrap()
        .donation
        .unwrap();

    let status = t
        .engine
        .confirm_donation(donation.id, ConfirmingParty::Recipient)
        .await
        .unwrap();
    assert_eq!(status, DonationStatus::Pending);

    // Repeating a confirmation changes nothing.
    let again = t
        .engine
        .confirm_donation(donation.id, ConfirmingParty::Recipient)
        .await
        .unwrap();
    assert_eq!(again, DonationStatus::Pending);

    let status = t
        .engine
        .confirm_donation(donation.id, ConfirmingParty::Donor)
        .await
        .unwrap();
    assert_eq!(status, DonationStatus::Completed);

    let request = t.engine.request(request_id).await.unwrap();
    assert_eq!(request.fulfilled_units, 1);
    assert_eq!(request.status, RequestStatus::Active);
}

#[tokio::test]
async fn test_disputed_donation_is_terminal() {
    let t = TestEngine::new();
    let requester = t.requester().await;
    let donor = t.donor("Sidi", BloodType::ONeg, 6.0, "+22236000066").await;
    let req = request(requester, BloodType::BNeg, Urgency::Standard, 1);
    let request_id = req.id;
    t.engine.request_created(req).await.unwrap();

    let donation = t
        .engine
        .respond_to_match(request_id, donor, MatchResponse::Accept, None)
        .await
        .unwrap()
        .donation
        .unwrap();

    let status = t
        .engine
        .dispute_donation_as(donation.id, requester, Some("Never showed up".into()))
        .await
        .unwrap();
    assert_eq!(status, DonationStatus::Disputed);

    let err = t
        .engine
        .confirm_donation(donation.id, ConfirmingParty::Donor)
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Conflict);

    let request = t.engine.request(request_id).await.unwrap();
    assert_eq!(request.fulfilled_units, 0);
}

#[tokio::test]
async fn test_outsiders_cannot_confirm() {
    let t = TestEngine::new();
    let requester = t.requester().await;
    let donor = t.donor("Aminata", BloodType::ONeg, 1.0, "+22236000021").await;
    let req = request(requester, BloodType::ONeg, Urgency::Critical, 1);
    let request_id = req.id;
    t.engine.request_created(req).await.unwrap();

    let donation = t
        .engine
        .respond_to_match(request_id, donor, MatchResponse::Accept, None)
        .await
        .unwrap()
        .donation
        .unwrap();

    let err = t
        .engine
        .confirm_donation_as(donation.id, UserId::new())
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Authorization);
}

#[tokio::test]
async fn test_requester_cannot_answer_own_request() {
    let t = TestEngine::new();
    let requester = t.requester().await;
    let req = request(requester, BloodType::APos, Urgency::Urgent, 1);
    let request_id = req.id;
    t.engine.request_created(req).await.unwrap();

    let err = t
        .engine
        .respond_to_match(request_id, requester, MatchResponse::Accept, None)
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Validation);
}

#[tokio::test]
async fn test_accepting_twice_keeps_one_donation() {
    let t = TestEngine::new();
    let requester = t.requester().await;
    let donor = t.donor("Oumar", BloodType::ONeg, 2.0, "+22236000031").await;
    let req = request(requester, BloodType::ONeg, Urgency::Critical, 2);
    let request_id = req.id;
    t.engine.request_created(req).await.unwrap();

    let first = t
        .engine
        .respond_to_match(request_id, donor, MatchResponse::Accept, None)
        .await
        .unwrap();
    let second = t
        .engine
        .respond_to_match(request_id, donor, MatchResponse::Accept, Some("Still coming".into()))
        .await
        .unwrap();

    assert_eq!(first.donation.unwrap().id, second.donation.unwrap().id);
    let request = t.engine.request(request_id).await.unwrap();
    assert_eq!(request.matched_donors.len(), 1);
    assert_eq!(request.matched_donors[0].message.as_deref(), Some("Still coming"));

    let err = t
        .engine
        .respond_to_match(request_id, donor, MatchResponse::Decline, None)
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Conflict);
}
