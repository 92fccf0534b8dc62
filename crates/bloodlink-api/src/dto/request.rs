//! Request DTOs with validation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use bloodlink_core::error::AppError;
use bloodlink_core::types::{RequestId, UserId};
use bloodlink_entity::blood::{BloodType, Urgency};
use bloodlink_entity::request::{BloodRequest, Coordinates, Hospital, PatientInfo, RequestStatus};
use bloodlink_service::MatchResponse;

/// Run `validator` rules and turn failures into a validation error.
pub fn validated<T: Validate>(body: T) -> Result<T, AppError> {
    body.validate()
        .map_err(|e| AppError::validation(e.to_string()))?;
    Ok(body)
}

/// Ask for a verification code.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct RequestCodeBody {
    /// Phone number with country code.
    #[validate(length(min = 1, max = 32, message = "Phone number is required"))]
    pub phone_number: String,
}

/// Redeem a verification code.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct VerifyCodeBody {
    /// Phone number with country code.
    #[validate(length(min = 1, max = 32, message = "Phone number is required"))]
    pub phone_number: String,
    /// The code received by SMS.
    #[validate(length(min = 1, max = 12, message = "Code is required"))]
    pub code: String,
}

/// Create a blood request.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateRequestBody {
    /// Patient display name.
    #[validate(length(min = 1, max = 200, message = "Patient name is required"))]
    pub patient_name: String,
    /// Patient blood group, e.g. `AB+`.
    pub blood_type: String,
    /// Hospital name.
    #[validate(length(min = 1, max = 200, message = "Hospital name is required"))]
    pub hospital_name: String,
    /// Hospital latitude.
    #[validate(range(min = -90.0, max = 90.0))]
    pub latitude: f64,
    /// Hospital longitude.
    #[validate(range(min = -180.0, max = 180.0))]
    pub longitude: f64,
    /// Urgency level.
    pub urgency: Urgency,
    /// Units needed.
    #[validate(range(min = 1, max = 50))]
    pub required_units: u32,
    /// Latest useful donation time.
    pub deadline: Option<DateTime<Utc>>,
}

impl CreateRequestBody {
    /// Build the request record for `requester_id`.
    pub fn into_request(
        self,
        requester_id: UserId,
        now: DateTime<Utc>,
    ) -> Result<BloodRequest, AppError> {
        let body = validated(self)?;
        let blood_type = BloodType::parse_lenient(&body.blood_type)?;
        let coordinates = Coordinates::new(body.latitude, body.longitude)?;

        Ok(BloodRequest {
            id: RequestId::new(),
            requester_id,
            patient: PatientInfo {
                name: body.patient_name.trim().to_string(),
                blood_type,
            },
            hospital: Hospital {
                name: body.hospital_name.trim().to_string(),
                coordinates,
            },
            urgency: body.urgency,
            required_units: body.required_units,
            fulfilled_units: 0,
            deadline: body.deadline,
            status: RequestStatus::Active,
            matched_donors: Vec::new(),
            created_at: now,
            updated_at: now,
        })
    }
}

/// A donor's answer to a request.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct MatchResponseBody {
    /// Accept or decline.
    pub response: MatchResponse,
    /// Optional note for the requester.
    #[validate(length(max = 500))]
    pub message: Option<String>,
}

/// Report a mismatch on a donation.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct DisputeBody {
    /// What went wrong.
    #[validate(length(max = 500))]
    pub reason: Option<String>,
}

/// Query for the notification list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationQuery {
    /// Page size (default 20, max 100).
    #[serde(default = "default_limit")]
    pub limit: usize,
}

fn default_limit() -> usize {
    20
}
