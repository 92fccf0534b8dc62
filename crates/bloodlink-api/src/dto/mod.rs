//! Request and response bodies.

pub mod request;
pub mod response;

pub use request::{
    CreateRequestBody, DisputeBody, MatchResponseBody, NotificationQuery, RequestCodeBody,
    VerifyCodeBody, validated,
};
pub use response::{
    ApiResponse, DonationStatusResponse, HealthResponse, NotificationListResponse,
    RequestCreatedResponse, SessionResponse,
};
