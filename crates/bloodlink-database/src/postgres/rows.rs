//! Raw row shapes and their conversion into entities.

use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

use bloodlink_core::error::AppError;
use bloodlink_core::result::AppResult;
use bloodlink_entity::donation::Donation;
use bloodlink_entity::donor::{DonorProfile, NotificationPreferences};
use bloodlink_entity::notification::{DeliveryRecord, Notification};
use bloodlink_entity::request::{BloodRequest, Coordinates, Hospital, MatchedDonor, PatientInfo};
use bloodlink_entity::verification::VerificationCode;

#[derive(Debug, FromRow)]
pub(crate) struct CodeRow {
    pub phone_number: String,
    pub code_hash: String,
    pub expires_at: DateTime<Utc>,
    pub verified: bool,
    pub created_at: DateTime<Utc>,
}

impl From<CodeRow> for VerificationCode {
    fn from(row: CodeRow) -> Self {
        Self {
            phone_number: row.phone_number,
            code_hash: row.code_hash,
            expires_at: row.expires_at,
            verified: row.verified,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, FromRow)]
pub(crate) struct DonorRow {
    pub user_id: Uuid,
    pub name: String,
    pub phone_number: Option<String>,
    pub blood_type: String,
    pub lat: f64,
    pub lng: f64,
    pub available: bool,
    pub last_donation_at: Option<DateTime<Utc>>,
    pub preferences: serde_json::Value,
}

impl TryFrom<DonorRow> for DonorProfile {
    type Error = AppError;

    fn try_from(row: DonorRow) -> AppResult<Self> {
        let preferences: NotificationPreferences = serde_json::from_value(row.preferences)?;
        Ok(Self {
            user_id: row.user_id.into(),
            name: row.name,
            phone_number: row.phone_number,
            blood_type: row.blood_type.parse()?,
            location: Coordinates {
                lat: row.lat,
                lng: row.lng,
            },
            available: row.available,
            last_donation_at: row.last_donation_at,
            preferences,
        })
    }
}

#[derive(Debug, FromRow)]
pub(crate) struct RequestRow {
    pub id: Uuid,
    pub requester_id: Uuid,
    pub patient_name: String,
    pub blood_type: String,
    pub hospital_name: String,
    pub hospital_lat: f64,
    pub hospital_lng: f64,
    pub urgency: String,
    pub required_units: i32,
    pub fulfilled_units: i32,
    pub deadline: Option<DateTime<Utc>>,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, FromRow)]
pub(crate) struct MatchRow {
    pub donor_id: Uuid,
    pub donor_name: String,
    pub donor_blood_type: String,
    pub status: String,
    pub responded_at: Option<DateTime<Utc>>,
    pub message: Option<String>,
}

impl TryFrom<MatchRow> for MatchedDonor {
    type Error = AppError;

    fn try_from(row: MatchRow) -> AppResult<Self> {
        Ok(Self {
            donor_id: row.donor_id.into(),
            donor_name: row.donor_name,
            donor_blood_type: row.donor_blood_type.parse()?,
            status: row.status.parse()?,
            responded_at: row.responded_at,
            message: row.message,
        })
    }
}

impl RequestRow {
    pub fn into_request(self, matches: Vec<MatchRow>) -> AppResult<BloodRequest> {
        Ok(BloodRequest {
            id: self.id.into(),
            requester_id: self.requester_id.into(),
            patient: PatientInfo {
                name: self.patient_name,
                blood_type: self.blood_type.parse()?,
            },
            hospital: Hospital {
                name: self.hospital_name,
                coordinates: Coordinates {
                    lat: self.hospital_lat,
                    lng: self.hospital_lng,
                },
            },
            urgency: self.urgency.parse()?,
            required_units: self.required_units.max(0) as u32,
            fulfilled_units: self.fulfilled_units.max(0) as u32,
            deadline: self.deadline,
            status: self.status.parse()?,
            matched_donors: matches
                .into_iter()
                .map(MatchedDonor::try_from)
                .collect::<AppResult<_>>()?,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(Debug, FromRow)]
pub(crate) struct DonationRow {
    pub id: Uuid,
    pub request_id: Uuid,
    pub donor_id: Uuid,
    pub recipient_id: Uuid,
    pub blood_type: String,
    pub donation_date: Option<DateTime<Utc>>,
    pub donor_confirmed: bool,
    pub donor_confirmed_at: Option<DateTime<Utc>>,
    pub recipient_confirmed: bool,
    pub recipient_confirmed_at: Option<DateTime<Utc>>,
    pub status: String,
    pub volume_ml: Option<i32>,
    pub dispute_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<DonationRow> for Donation {
    type Error = AppError;

    fn try_from(row: DonationRow) -> AppResult<Self> {
        Ok(Self {
            id: row.id.into(),
            request_id: row.request_id.into(),
            donor_id: row.donor_id.into(),
            recipient_id: row.recipient_id.into(),
            blood_type: row.blood_type.parse()?,
            donation_date: row.donation_date,
            donor_confirmed: row.donor_confirmed,
            donor_confirmed_at: row.donor_confirmed_at,
            recipient_confirmed: row.recipient_confirmed,
            recipient_confirmed_at: row.recipient_confirmed_at,
            status: row.status.parse()?,
            volume_ml: row.volume_ml.map(|v| v.max(0) as u32),
            dispute_reason: row.dispute_reason,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, FromRow)]
pub(crate) struct NotificationRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub message: String,
    pub payload: serde_json::Value,
    pub urgent: bool,
    pub read: bool,
    pub read_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<NotificationRow> for Notification {
    type Error = AppError;

    fn try_from(row: NotificationRow) -> AppResult<Self> {
        Ok(Self {
            id: row.id.into(),
            user_id: row.user_id.into(),
            title: row.title,
            message: row.message,
            payload: serde_json::from_value(row.payload)?,
            urgent: row.urgent,
            read: row.read,
            read_at: row.read_at,
            created_at: row.created_at,
        })
    }
}

#[derive(Debug, FromRow)]
pub(crate) struct DeliveryRow {
    pub notification_id: Uuid,
    pub channel: String,
    pub outcome: serde_json::Value,
    pub attempts: i32,
    pub recorded_at: DateTime<Utc>,
}

impl TryFrom<DeliveryRow> for DeliveryRecord {
    type Error = AppError;

    fn try_from(row: DeliveryRow) -> AppResult<Self> {
        Ok(Self {
            notification_id: row.notification_id.into(),
            channel: row.channel.parse()?,
            outcome: serde_json::from_value(row.outcome)?,
            attempts: row.attempts.max(0) as u32,
            recorded_at: row.recorded_at,
        })
    }
}
