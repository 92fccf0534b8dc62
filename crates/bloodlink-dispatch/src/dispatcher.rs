//! Notification dispatcher.
//!
//! One task per donor runs on a semaphore-bounded pool. A task first stores
//! the donor's notification (keyed on request and donor, so a repeated
//! dispatch finds it and stops), then runs the SMS and realtime sends
//! concurrently and records each channel's outcome. The caller waits at most
//! `dispatch_timeout`; tasks still running after that finish in the
//! background and record their outcomes as they arrive.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use tokio::sync::{Semaphore, mpsc};
use tracing::{debug, error, info, warn};

use bloodlink_core::config::DispatchConfig;
use bloodlink_core::result::AppResult;
use bloodlink_core::traits::{Clock, DeliveryMode, RealtimeChannel, SmsProvider, user_room};
use bloodlink_core::types::UserId;
use bloodlink_database::NotificationRepository;
use bloodlink_entity::blood::Urgency;
use bloodlink_entity::donor::{Candidate, DonorProfile};
use bloodlink_entity::notification::{
    DeliveryChannel, DeliveryOutcome, DeliveryRecord, Notification, NotificationPayload,
};
use bloodlink_entity::request::BloodRequest;

use crate::error::DeliveryError;
use crate::retry::{Attempted, send_with_retry};
use crate::summary::{ChannelReport, DispatchSummary, DonorOutcome, DonorStatus};

/// Realtime event carrying a new notification.
pub const NOTIFICATION_NEW_EVENT: &str = "notification:new";

/// Fans notifications out to donors over SMS and the realtime channel.
#[derive(Clone)]
pub struct NotificationDispatcher {
    inner: Arc<Inner>,
}

struct Inner {
    notifications: Arc<dyn NotificationRepository>,
    sms: Arc<dyn SmsProvider>,
    realtime: Arc<dyn RealtimeChannel>,
    clock: Arc<dyn Clock>,
    config: DispatchConfig,
}

impl std::fmt::Debug for NotificationDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotificationDispatcher")
            .field("sms", &self.inner.sms.name())
            .field("realtime", &self.inner.realtime.name())
            .field("config", &self.inner.config)
            .finish()
    }
}

/// The request fields every donor's alert is built from.
#[derive(Debug, Clone)]
struct Alert {
    request: BloodRequest,
}

impl Alert {
    fn title(&self) -> &'static str {
        match self.request.urgency {
            Urgency::Critical => "Critical blood request",
            Urgency::Urgent => "Urgent blood request",
            Urgency::Standard => "Blood donation request",
        }
    }

    fn message(&self, distance_km: f64) -> String {
        let units = self.request.remaining_units();
        format!(
            "{} blood needed at {} ({:.1} km from you). {} unit{} required.",
            self.request.patient.blood_type,
            self.request.hospital.name,
            distance_km,
            units,
            if units == 1 { "" } else { "s" }
        )
    }

    fn sms_body(&self, distance_km: f64) -> String {
        format!(
            "BloodLink {}: {} Open the app to respond.",
            self.request.urgency,
            self.message(distance_km)
        )
    }

    fn notification(&self, donor: &DonorProfile, distance_km: f64, now: DateTime<Utc>) -> Notification {
        Notification::new(
            donor.user_id,
            self.title(),
            self.message(distance_km),
            NotificationPayload::BloodRequest {
                request_id: self.request.id,
                blood_type: self.request.patient.blood_type,
                urgency: self.request.urgency,
                hospital: self.request.hospital.name.clone(),
                distance_km,
                units_needed: self.request.remaining_units(),
            },
            self.request.urgency.is_urgent(),
            now,
        )
    }
}

impl NotificationDispatcher {
    /// Create a dispatcher.
    pub fn new(
        notifications: Arc<dyn NotificationRepository>,
        sms: Arc<dyn SmsProvider>,
        realtime: Arc<dyn RealtimeChannel>,
        clock: Arc<dyn Clock>,
        config: DispatchConfig,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                notifications,
                sms,
                realtime,
                clock,
                config,
            }),
        }
    }

    /// The realtime channel notifications are emitted on.
    pub fn realtime(&self) -> &Arc<dyn RealtimeChannel> {
        &self.inner.realtime
    }

    /// Alert every candidate about `request`.
    ///
    /// Candidates are started nearest first. The summary lists them in the
    /// same order; donors whose task had not reported back by the dispatch
    /// timeout are marked [`DonorStatus::Pending`].
    pub async fn dispatch(
        &self,
        request: &BloodRequest,
        candidates: Vec<Candidate>,
    ) -> DispatchSummary {
        if candidates.is_empty() {
            return DispatchSummary::empty(request.id);
        }

        let started = Instant::now();
        let order: Vec<(UserId, f64)> = candidates
            .iter()
            .map(|c| (c.donor.user_id, c.distance_km))
            .collect();
        let alert = Arc::new(Alert {
            request: request.clone(),
        });
        let semaphore = Arc::new(Semaphore::new(self.inner.config.concurrency.max(1)));
        let (tx, mut rx) = mpsc::channel::<DonorOutcome>(candidates.len());

        for candidate in candidates {
            let inner = Arc::clone(&self.inner);
            let alert = Arc::clone(&alert);
            let semaphore = Arc::clone(&semaphore);
            let tx = tx.clone();

            tokio::spawn(async move {
                let Ok(_permit) = semaphore.acquire_owned().await else {
                    return;
                };
                let outcome = inner.deliver(&alert, candidate).await;
                // The receiver is gone once the dispatch timed out; the
                // outcome is already recorded.
                let _ = tx.send(outcome).await;
            });
        }
        drop(tx);

        let mut finished: HashMap<UserId, DonorOutcome> = HashMap::with_capacity(order.len());
        let deadline = tokio::time::sleep(self.inner.config.dispatch_timeout());
        tokio::pin!(deadline);

        let timed_out = loop {
            tokio::select! {
                received = rx.recv() => match received {
                    Some(outcome) => {
                        finished.insert(outcome.donor_id, outcome);
                    }
                    None => break false,
                },
                _ = &mut deadline => break true,
            }
        };

        let donors: Vec<DonorOutcome> = order
            .into_iter()
            .map(|(donor_id, distance_km)| {
                finished
                    .remove(&donor_id)
                    .unwrap_or_else(|| DonorOutcome::pending(donor_id, distance_km))
            })
            .collect();

        let summary = DispatchSummary {
            request_id: request.id,
            donors,
            timed_out,
            elapsed_ms: started.elapsed().as_millis() as u64,
        };

        if timed_out {
            warn!(
                request_id = %request.id,
                pending = summary.pending(),
                timeout_ms = self.inner.config.dispatch_timeout_ms,
                "Dispatch timed out; remaining deliveries continue in background"
            );
        }
        info!(
            request_id = %request.id,
            candidates = summary.donors.len(),
            notified = summary.notified(),
            already_notified = summary.already_notified(),
            pending = summary.pending(),
            elapsed_ms = summary.elapsed_ms,
            "Dispatch finished"
        );
        summary
    }

    /// Store `notification` and push it to the owner's room. Used for
    /// donation updates and other notices that never go out by SMS.
    pub async fn notify(&self, notification: &Notification) -> AppResult<()> {
        self.inner.notifications.insert(notification).await?;
        let report = self.inner.send_realtime(notification).await;
        self.inner.record(notification, &report).await;
        Ok(())
    }
}

impl Inner {
    async fn deliver(&self, alert: &Alert, candidate: Candidate) -> DonorOutcome {
        let Candidate { donor, distance_km } = candidate;
        let notification = alert.notification(&donor, distance_km, self.clock.now());

        let (stored, created) = match self.notifications.insert_if_absent(&notification).await {
            Ok(result) => result,
            Err(e) => {
                error!(
                    request_id = %alert.request.id,
                    donor_id = %donor.user_id,
                    error = %e,
                    "Failed to store donor notification"
                );
                return DonorOutcome {
                    donor_id: donor.user_id,
                    distance_km,
                    status: DonorStatus::Failed,
                    notification_id: None,
                    channels: Vec::new(),
                    error: Some(e.to_string()),
                };
            }
        };

        if !created {
            debug!(
                request_id = %alert.request.id,
                donor_id = %donor.user_id,
                "Donor already notified for this request"
            );
            return DonorOutcome {
                donor_id: donor.user_id,
                distance_km,
                status: DonorStatus::AlreadyNotified,
                notification_id: Some(stored.id),
                channels: Vec::new(),
                error: None,
            };
        }

        let channels = donor.preferences.enabled_channels();
        let sms = async {
            if channels.contains(&DeliveryChannel::Sms) {
                Some(self.send_sms(&donor, &alert.sms_body(distance_km)).await)
            } else {
                None
            }
        };
        let realtime = async {
            if channels.contains(&DeliveryChannel::Realtime) {
                Some(self.send_realtime(&stored).await)
            } else {
                None
            }
        };
        let (sms, realtime) = tokio::join!(sms, realtime);

        let reports: Vec<ChannelReport> = sms.into_iter().chain(realtime).collect();
        for report in &reports {
            self.record(&stored, report).await;
        }

        DonorOutcome {
            donor_id: donor.user_id,
            distance_km,
            status: DonorStatus::Notified,
            notification_id: Some(stored.id),
            channels: reports,
            error: None,
        }
    }

    async fn send_sms(&self, donor: &DonorProfile, body: &str) -> ChannelReport {
        let Some(phone) = donor.phone_number.as_deref() else {
            return ChannelReport {
                channel: DeliveryChannel::Sms,
                outcome: DeliveryOutcome::Skipped {
                    reason: "no phone number on file".to_string(),
                },
                attempts: 0,
            };
        };

        let sms = &self.sms;
        let attempted = send_with_retry(
            &self.config.retry,
            self.config.call_timeout(),
            "sms",
            move || async move { sms.send(phone, body).await.map_err(DeliveryError::from) },
        )
        .await;

        let outcome = match attempted.result {
            Ok(receipt) => match receipt.mode {
                DeliveryMode::Delivered => DeliveryOutcome::Delivered {
                    provider_id: Some(receipt.id),
                },
                DeliveryMode::Simulated => DeliveryOutcome::Simulated {
                    provider_id: receipt.id,
                },
            },
            Err(e) => failure_outcome(e),
        };

        ChannelReport {
            channel: DeliveryChannel::Sms,
            outcome,
            attempts: attempted.attempts,
        }
    }

    async fn send_realtime(&self, notification: &Notification) -> ChannelReport {
        let payload = match serde_json::to_value(notification) {
            Ok(value) => value,
            Err(e) => {
                return ChannelReport {
                    channel: DeliveryChannel::Realtime,
                    outcome: DeliveryOutcome::Failed {
                        reason: format!("unserializable notification: {e}"),
                    },
                    attempts: 0,
                };
            }
        };

        let room = user_room(notification.user_id);
        let room = room.as_str();
        let payload = &payload;
        let realtime = &self.realtime;
        let attempted: Attempted<()> = send_with_retry(
            &self.config.retry,
            self.config.call_timeout(),
            "realtime",
            move || async move {
                realtime
                    .emit(room, NOTIFICATION_NEW_EVENT, payload.clone())
                    .await
                    .map_err(DeliveryError::from)
            },
        )
        .await;

        let outcome = match attempted.result {
            Ok(()) => DeliveryOutcome::Delivered { provider_id: None },
            Err(e) => failure_outcome(e),
        };

        ChannelReport {
            channel: DeliveryChannel::Realtime,
            outcome,
            attempts: attempted.attempts,
        }
    }

    async fn record(&self, notification: &Notification, report: &ChannelReport) {
        let record = DeliveryRecord {
            notification_id: notification.id,
            channel: report.channel,
            outcome: report.outcome.clone(),
            attempts: report.attempts,
            recorded_at: self.clock.now(),
        };
        if let Err(e) = self.notifications.record_delivery(&record).await {
            error!(
                notification_id = %notification.id,
                channel = %report.channel,
                error = %e,
                "Failed to record delivery outcome"
            );
        }
    }
}

fn failure_outcome(err: DeliveryError) -> DeliveryOutcome {
    match err {
        DeliveryError::Permanent(reason) => DeliveryOutcome::Failed { reason },
        DeliveryError::Transient(reason) => DeliveryOutcome::Exhausted { reason },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;
    use chrono::TimeZone;

    use bloodlink_core::config::RetryConfig;
    use bloodlink_core::error::AppError;
    use bloodlink_core::traits::{ManualClock, SmsError, SmsReceipt};
    use bloodlink_core::types::RequestId;
    use bloodlink_database::memory::MemoryNotificationRepository;
    use bloodlink_entity::blood::BloodType;
    use bloodlink_entity::donor::NotificationPreferences;
    use bloodlink_entity::request::{Coordinates, Hospital, PatientInfo, RequestStatus};

    /// Replays scripted results, then succeeds.
    #[derive(Default)]
    struct ScriptedSms {
        script: Mutex<VecDeque<Result<SmsReceipt, SmsError>>>,
        delay: Option<Duration>,
        sent: Mutex<Vec<String>>,
        in_flight: AtomicUsize,
        peak: AtomicUsize,
    }

    impl ScriptedSms {
        fn with(script: Vec<Result<SmsReceipt, SmsError>>) -> Self {
            Self {
                script: Mutex::new(script.into()),
                ..Self::default()
            }
        }
    }

    #[async_trait]
    impl SmsProvider for ScriptedSms {
        async fn send(&self, to: &str, _body: &str) -> Result<SmsReceipt, SmsError> {
            let running = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(running, Ordering::SeqCst);
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            self.sent.lock().unwrap().push(to.to_string());
            self.script.lock().unwrap().pop_front().unwrap_or_else(|| {
                Ok(SmsReceipt {
                    id: format!("SM-{to}"),
                    mode: DeliveryMode::Delivered,
                })
            })
        }

        fn name(&self) -> &'static str {
            "scripted"
        }
    }

    #[derive(Default)]
    struct RecordingChannel {
        events: Mutex<Vec<(String, String)>>,
    }

    #[async_trait]
    impl RealtimeChannel for RecordingChannel {
        async fn emit(
            &self,
            room: &str,
            event: &str,
            _payload: serde_json::Value,
        ) -> Result<(), AppError> {
            self.events
                .lock()
                .unwrap()
                .push((room.to_string(), event.to_string()));
            Ok(())
        }

        async fn join_room(&self, _room: &str) -> Result<(), AppError> {
            Ok(())
        }

        fn name(&self) -> &'static str {
            "recording"
        }
    }

    struct Fixture {
        dispatcher: NotificationDispatcher,
        notifications: Arc<MemoryNotificationRepository>,
        sms: Arc<ScriptedSms>,
        realtime: Arc<RecordingChannel>,
    }

    fn fixture(sms: ScriptedSms, config: DispatchConfig) -> Fixture {
        let notifications = Arc::new(MemoryNotificationRepository::new());
        let sms = Arc::new(sms);
        let realtime = Arc::new(RecordingChannel::default());
        let start = Utc.with_ymd_and_hms(2025, 3, 1, 8, 0, 0).unwrap();
        let clock = Arc::new(ManualClock::new(start));
        let dispatcher = NotificationDispatcher::new(
            notifications.clone(),
            sms.clone(),
            realtime.clone(),
            clock,
            config,
        );
        Fixture {
            dispatcher,
            notifications,
            sms,
            realtime,
        }
    }

    fn fast_config() -> DispatchConfig {
        DispatchConfig {
            concurrency: 2,
            dispatch_timeout_ms: 10_000,
            call_timeout_ms: 1_000,
            retry: RetryConfig {
                max_attempts: 3,
                base_backoff_ms: 10,
                max_backoff_ms: 50,
            },
        }
    }

    fn request() -> BloodRequest {
        let now = Utc.with_ymd_and_hms(2025, 3, 1, 8, 0, 0).unwrap();
        BloodRequest {
            id: RequestId::new(),
            requester_id: UserId::new(),
            patient: PatientInfo {
                name: "Patient".into(),
                blood_type: BloodType::AbPos,
            },
            hospital: Hospital {
                name: "Centre Hospitalier National".into(),
                coordinates: Coordinates {
                    lat: 18.0735,
                    lng: -15.9582,
                },
            },
            urgency: Urgency::Critical,
            required_units: 2,
            fulfilled_units: 0,
            deadline: None,
            status: RequestStatus::Active,
            matched_donors: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    fn candidate(phone: Option<&str>, distance_km: f64) -> Candidate {
        Candidate {
            donor: DonorProfile {
                user_id: UserId::new(),
                name: "Donor".into(),
                phone_number: phone.map(str::to_string),
                blood_type: BloodType::ONeg,
                location: Coordinates { lat: 18.08, lng: -15.96 },
                available: true,
                last_donation_at: None,
                preferences: NotificationPreferences::default(),
            },
            distance_km,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_each_donor_gets_one_notification_and_both_channels() {
        let f = fixture(ScriptedSms::default(), fast_config());
        let req = request();
        let near = candidate(Some("+22236000001"), 2.0);
        let far = candidate(Some("+22236000002"), 40.0);
        let (near_id, far_id) = (near.donor.user_id, far.donor.user_id);

        let summary = f.dispatcher.dispatch(&req, vec![near, far]).await;

        assert!(!summary.timed_out);
        assert_eq!(summary.notified(), 2);
        assert_eq!(summary.donors[0].donor_id, near_id);
        assert_eq!(summary.donors[1].donor_id, far_id);

        let near_outcome = summary.donor(near_id).unwrap();
        let sms = near_outcome.channel(DeliveryChannel::Sms).unwrap();
        assert_eq!(
            sms.outcome,
            DeliveryOutcome::Delivered {
                provider_id: Some("SM-+22236000001".into())
            }
        );
        assert!(near_outcome.channel(DeliveryChannel::Realtime).unwrap().outcome.is_success());

        let stored = f.notifications.list_for_user(near_id, 10).await.unwrap();
        assert_eq!(stored.len(), 1);
        assert!(stored[0].urgent);
        let records = f.notifications.deliveries(stored[0].id).await.unwrap();
        assert_eq!(records.len(), 2);

        let events = f.realtime.events.lock().unwrap().clone();
        assert!(events.contains(&(user_room(far_id), NOTIFICATION_NEW_EVENT.to_string())));
    }

    #[tokio::test(start_paused = true)]
    async fn test_repeated_dispatch_does_not_renotify() {
        let f = fixture(ScriptedSms::default(), fast_config());
        let req = request();
        let donor = candidate(Some("+22236000001"), 3.0);
        let donor_id = donor.donor.user_id;

        let first = f.dispatcher.dispatch(&req, vec![donor.clone()]).await;
        let second = f.dispatcher.dispatch(&req, vec![donor]).await;

        assert_eq!(first.notified(), 1);
        assert_eq!(second.already_notified(), 1);
        assert_eq!(
            second.donor(donor_id).unwrap().notification_id,
            first.donor(donor_id).unwrap().notification_id
        );
        assert_eq!(f.notifications.list_for_user(donor_id, 10).await.unwrap().len(), 1);
        assert_eq!(f.sms.sent.lock().unwrap().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_sms_failures_do_not_block_realtime() {
        let sms = ScriptedSms::with(vec![Err(SmsError::Permanent("21211 invalid number".into()))]);
        let f = fixture(sms, fast_config());
        let donor = candidate(Some("+22236000001"), 1.0);
        let donor_id = donor.donor.user_id;

        let summary = f.dispatcher.dispatch(&request(), vec![donor]).await;
        let outcome = summary.donor(donor_id).unwrap();

        let sms = outcome.channel(DeliveryChannel::Sms).unwrap();
        assert_eq!(sms.attempts, 1);
        assert!(matches!(sms.outcome, DeliveryOutcome::Failed { .. }));
        assert!(outcome.channel(DeliveryChannel::Realtime).unwrap().outcome.is_success());
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_sms_failures_are_retried_until_exhausted() {
        let transient = || -> Result<SmsReceipt, SmsError> { Err(SmsError::Transient("503".into())) };
        let sms = ScriptedSms::with(vec![transient(), transient(), transient()]);
        let f = fixture(sms, fast_config());
        let donor = candidate(Some("+22236000001"), 1.0);
        let donor_id = donor.donor.user_id;

        let summary = f.dispatcher.dispatch(&request(), vec![donor]).await;
        let sms = summary.donor(donor_id).unwrap().channel(DeliveryChannel::Sms).unwrap().clone();

        assert_eq!(sms.attempts, 3);
        assert!(matches!(sms.outcome, DeliveryOutcome::Exhausted { .. }));
        assert_eq!(f.sms.sent.lock().unwrap().len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_donor_without_phone_skips_sms() {
        let f = fixture(ScriptedSms::default(), fast_config());
        let donor = candidate(None, 1.0);
        let donor_id = donor.donor.user_id;

        let summary = f.dispatcher.dispatch(&request(), vec![donor]).await;
        let outcome = summary.donor(donor_id).unwrap();

        assert!(matches!(
            outcome.channel(DeliveryChannel::Sms).unwrap().outcome,
            DeliveryOutcome::Skipped { .. }
        ));
        assert!(outcome.channel(DeliveryChannel::Realtime).unwrap().outcome.is_success());
        assert!(f.sms.sent.lock().unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_timed_out_tasks_still_record_outcomes() {
        let sms = ScriptedSms {
            delay: Some(Duration::from_secs(5)),
            ..ScriptedSms::default()
        };
        let config = DispatchConfig {
            dispatch_timeout_ms: 1_000,
            call_timeout_ms: 20_000,
            ..fast_config()
        };
        let f = fixture(sms, config);
        let donor = candidate(Some("+22236000001"), 1.0);
        let donor_id = donor.donor.user_id;

        let summary = f.dispatcher.dispatch(&request(), vec![donor]).await;
        assert!(summary.timed_out);
        assert_eq!(summary.pending(), 1);

        let stored = f.notifications.list_for_user(donor_id, 10).await.unwrap();
        assert_eq!(stored.len(), 1, "notification is stored before sending");

        tokio::time::sleep(Duration::from_secs(10)).await;
        let records = f.notifications.deliveries(stored[0].id).await.unwrap();
        assert!(records.iter().any(|r| r.channel == DeliveryChannel::Sms && r.outcome.is_success()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_sends_never_exceed_concurrency_limit() {
        let sms = ScriptedSms {
            delay: Some(Duration::from_millis(200)),
            ..ScriptedSms::default()
        };
        let f = fixture(sms, fast_config());
        let candidates: Vec<Candidate> = (0..6)
            .map(|i| candidate(Some(&format!("+2223600010{i}")), f64::from(i)))
            .collect();

        let summary = f.dispatcher.dispatch(&request(), candidates).await;

        assert!(!summary.timed_out);
        assert_eq!(summary.notified(), 6);
        assert_eq!(f.sms.sent.lock().unwrap().len(), 6);
        let peak = f.sms.peak.load(Ordering::SeqCst);
        assert!(peak <= 2, "{peak} sends ran at once");
        assert_eq!(peak, 2);
    }

    #[tokio::test]
    async fn test_notify_stores_and_emits() {
        let f = fixture(ScriptedSms::default(), fast_config());
        let user = UserId::new();
        let notice = Notification::new(
            user,
            "Donation update",
            "Your donor confirmed",
            NotificationPayload::General { link: None },
            false,
            Utc::now(),
        );

        f.dispatcher.notify(&notice).await.unwrap();

        assert_eq!(f.notifications.count_unread(user).await.unwrap(), 1);
        assert_eq!(f.realtime.events.lock().unwrap().len(), 1);
        assert!(f.sms.sent.lock().unwrap().is_empty());
    }
}
