//! Phone verification and session issuance.

use std::time::Duration;

use bloodlink_auth::user_id_for_phone;
use bloodlink_auth::verification::code::hash_code;
use bloodlink_core::traits::Clock;
use bloodlink_core::error::{ErrorKind, INVALID_OR_EXPIRED_CODE};
use bloodlink_database::VerificationCodeRepository;

use crate::helpers::TestEngine;

const PHONE: &str = "+22236001234";

#[tokio::test]
async fn test_code_issue_verify_and_sign_in() {
    let t = TestEngine::new();

    let receipt = t.engine.issue_code("00222 36 00 12 34").await.unwrap();
    assert_eq!(receipt.phone_number, PHONE);

    let code = t.sms.last_code(PHONE);
    assert_eq!(code.len(), 6);

    let (claim, token) = t.engine.sign_in(PHONE, &code).await.unwrap();
    assert_eq!(claim.phone_number, PHONE);

    let session = t.engine.authenticate(&token.token).unwrap();
    assert_eq!(session.user_id(), user_id_for_phone(PHONE));
}

#[tokio::test]
async fn test_code_is_single_use() {
    let t = TestEngine::new();
    t.engine.issue_code(PHONE).await.unwrap();
    let code = t.sms.last_code(PHONE);

    t.engine.verify_phone(PHONE, &code).await.unwrap();
    let err = t.engine.verify_phone(PHONE, &code).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::InvalidOrExpiredCode);
}

#[tokio::test]
async fn test_wrong_and_expired_codes_fail_identically() {
    let t = TestEngine::new();
    t.engine.issue_code(PHONE).await.unwrap();
    let code = t.sms.last_code(PHONE);

    let wrong = t.engine.verify_phone(PHONE, "000000").await.unwrap_err();

    t.clock.advance(chrono::Duration::minutes(11));
    let expired = t.engine.verify_phone(PHONE, &code).await.unwrap_err();

    let unknown = t.engine.verify_phone("+22236009876", "123456").await.unwrap_err();

    for err in [wrong, expired, unknown] {
        assert_eq!(err.kind, ErrorKind::InvalidOrExpiredCode);
        assert_eq!(err.message, INVALID_OR_EXPIRED_CODE);
    }
}

#[tokio::test]
async fn test_fourth_issuance_in_an_hour_is_rate_limited() {
    let t = TestEngine::new();
    for _ in 0..3 {
        t.engine.issue_code(PHONE).await.unwrap();
    }

    let err = t.engine.issue_code(PHONE).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::RateLimited);
    let retry_after = err.retry_after.unwrap();
    assert!(retry_after > Duration::ZERO);
    assert!(retry_after <= Duration::from_secs(3600));

    t.clock.advance(chrono::Duration::minutes(61));
    t.engine.issue_code(PHONE).await.unwrap();
}

#[tokio::test]
async fn test_newest_code_replaces_previous_one() {
    let t = TestEngine::new();
    t.engine.issue_code(PHONE).await.unwrap();
    t.engine.issue_code(PHONE).await.unwrap();
    let second = t.sms.last_code(PHONE);

    // Only the newest code is stored.
    let live = t
        .repos
        .codes
        .find_live(PHONE, t.clock.now())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(live.code_hash, hash_code(PHONE, &second));

    t.engine.verify_phone(PHONE, &second).await.unwrap();
}

#[tokio::test]
async fn test_malformed_phone_is_a_validation_error() {
    let t = TestEngine::new();
    let err = t.engine.issue_code("36001234").await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::Validation);
}
