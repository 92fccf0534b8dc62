//! Shared test helpers for integration tests.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};

use bloodlink_core::config::AppConfig;
use bloodlink_core::error::AppError;
use bloodlink_core::traits::{
    DeliveryMode, ManualClock, RealtimeChannel, SmsError, SmsProvider, SmsReceipt,
};
use bloodlink_core::types::{RequestId, UserId};
use bloodlink_database::Repositories;
use bloodlink_entity::blood::{BloodType, Urgency};
use bloodlink_entity::donor::{DonorProfile, NotificationPreferences};
use bloodlink_entity::request::{BloodRequest, Coordinates, Hospital, PatientInfo, RequestStatus};
use bloodlink_service::{EngineParts, MatchingEngine};

/// Nouakchott national hospital.
pub const HOSPITAL: Coordinates = Coordinates {
    lat: 18.0735,
    lng: -15.9582,
};

pub fn start_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 1, 8, 0, 0).unwrap()
}

/// A point `km` due north of the hospital.
pub fn north(km: f64) -> Coordinates {
    Coordinates {
        lat: HOSPITAL.lat + km / 111.195,
        lng: HOSPITAL.lng,
    }
}

/// An SMS provider that records every message and fails when told to.
#[derive(Default)]
pub struct ScriptedSms {
    pub sent: Mutex<Vec<(String, String)>>,
    pub fail_permanently: Mutex<bool>,
}

impl ScriptedSms {
    pub fn messages_to(&self, phone: &str) -> Vec<String> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .filter(|(to, _)| to == phone)
            .map(|(_, body)| body.clone())
            .collect()
    }

    /// The digits of the newest verification code sent to `phone`.
    pub fn last_code(&self, phone: &str) -> String {
        let body = self.messages_to(phone).pop().unwrap();
        let (_, rest) = body.split_once("code is ").unwrap();
        rest.chars().take_while(char::is_ascii_digit).collect()
    }
}

#[async_trait]
impl SmsProvider for ScriptedSms {
    async fn send(&self, to: &str, body: &str) -> Result<SmsReceipt, SmsError> {
        if *self.fail_permanently.lock().unwrap() {
            return Err(SmsError::Permanent("number unreachable".into()));
        }
        let mut sent = self.sent.lock().unwrap();
        sent.push((to.to_string(), body.to_string()));
        Ok(SmsReceipt {
            id: format!("SM{}", sent.len()),
            mode: DeliveryMode::Delivered,
        })
    }

    fn name(&self) -> &'static str {
        "scripted"
    }
}

/// A realtime channel that records emits.
#[derive(Default)]
pub struct RecordingChannel {
    pub emits: Mutex<Vec<(String, String, serde_json::Value)>>,
    pub joined: Mutex<Vec<String>>,
}

impl RecordingChannel {
    pub fn events_in(&self, room: &str, event: &str) -> Vec<serde_json::Value> {
        self.emits
            .lock()
            .unwrap()
            .iter()
            .filter(|(r, e, _)| r == room && e == event)
            .map(|(_, _, p)| p.clone())
            .collect()
    }
}

#[async_trait]
impl RealtimeChannel for RecordingChannel {
    async fn emit(
        &self,
        room: &str,
        event: &str,
        payload: serde_json::Value,
    ) -> Result<(), AppError> {
        self.emits
            .lock()
            .unwrap()
            .push((room.to_string(), event.to_string(), payload));
        Ok(())
    }

    async fn join_room(&self, room: &str) -> Result<(), AppError> {
        self.joined.lock().unwrap().push(room.to_string());
        Ok(())
    }

    fn name(&self) -> &'static str {
        "recording"
    }
}

/// Test engine context
pub struct TestEngine {
    pub engine: MatchingEngine,
    pub repos: Repositories,
    pub sms: Arc<ScriptedSms>,
    pub channel: Arc<RecordingChannel>,
    pub clock: Arc<ManualClock>,
}

pub fn test_config() -> AppConfig {
    let mut config = AppConfig::default();
    config.auth.jwt_secret = "integration-test-secret-0123456789abcdef".into();
    config.dispatch.retry.base_backoff_ms = 1;
    config.dispatch.retry.max_backoff_ms = 5;
    config
}

impl TestEngine {
    pub fn new() -> Self {
        Self::with_sms_provider(None)
    }

    /// Build an engine; `sms` replaces the scripted provider when given.
    pub fn with_sms_provider(sms: Option<Arc<dyn SmsProvider>>) -> Self {
        let scripted = Arc::new(ScriptedSms::default());
        let channel = Arc::new(RecordingChannel::default());
        let clock = Arc::new(ManualClock::new(start_time()));
        let repos = Repositories::in_memory();

        let engine = MatchingEngine::new(EngineParts {
            config: test_config(),
            repositories: repos.clone(),
            sms: sms.unwrap_or_else(|| scripted.clone() as Arc<dyn SmsProvider>),
            realtime: channel.clone(),
            clock: clock.clone(),
        });

        Self {
            engine,
            repos,
            sms: scripted,
            channel,
            clock,
        }
    }

    /// Register an available donor `km` north of the hospital.
    pub async fn donor(
        &self,
        name: &str,
        blood_type: BloodType,
        km: f64,
        phone: &str,
    ) -> UserId {
        let profile = DonorProfile {
            user_id: UserId::new(),
            name: name.to_string(),
            phone_number: Some(phone.to_string()),
            blood_type,
            location: north(km),
            available: true,
            last_donation_at: None,
            preferences: NotificationPreferences::default(),
        };
        self.engine.register_donor(profile).await.unwrap().user_id
    }

    /// Register a donor who can also make requests of their own.
    pub async fn requester(&self) -> UserId {
        self.donor("Requester", BloodType::APos, 0.5, "+22236009999").await
    }
}

/// An active request at the hospital.
pub fn request(
    requester_id: UserId,
    blood_type: BloodType,
    urgency: Urgency,
    units: u32,
) -> BloodRequest {
    BloodRequest {
        id: RequestId::new(),
        requester_id,
        patient: PatientInfo {
            name: "Patient".into(),
            blood_type,
        },
        hospital: Hospital {
            name: "Centre Hospitalier National".into(),
            coordinates: HOSPITAL,
        },
        urgency,
        required_units: units,
        fulfilled_units: 0,
        deadline: None,
        status: RequestStatus::Active,
        matched_donors: Vec::new(),
        created_at: start_time(),
        updated_at: start_time(),
    }
}
