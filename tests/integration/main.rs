//! End-to-end tests driving the matching engine over in-memory storage.

mod helpers;

mod dispatch_test;
mod donation_test;
mod matching_test;
mod notification_test;
mod verification_test;
