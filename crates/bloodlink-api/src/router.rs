//! Route definitions for the BloodLink HTTP API.
//!
//! REST routes are mounted under `/api`; the WebSocket upgrade lives at `/ws`.

use std::time::Duration;

use axum::Router;
use axum::http::{HeaderValue, Method, header};
use axum::routing::{get, post};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::state::AppState;

/// Build the complete Axum router.
pub fn build_router(state: AppState) -> Router {
    let api_routes = Router::new()
        .merge(auth_routes())
        .merge(request_routes())
        .merge(donation_routes())
        .merge(notification_routes())
        .route("/health", get(handlers::health::health));

    let cors = build_cors_layer(&state.config.server.cors_allowed_origins);

    Router::new()
        .nest("/api", api_routes)
        .route("/ws", get(handlers::ws::ws_handler))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/phone/code", post(handlers::auth::request_code))
        .route("/auth/phone/verify", post(handlers::auth::verify_code))
}

fn request_routes() -> Router<AppState> {
    Router::new()
        .route("/requests", post(handlers::request::create_request))
        .route("/requests/{id}/responses", post(handlers::request::respond))
}

fn donation_routes() -> Router<AppState> {
    Router::new()
        .route("/donations/{id}/confirm", post(handlers::donation::confirm))
        .route("/donations/{id}/dispute", post(handlers::donation::dispute))
}

fn notification_routes() -> Router<AppState> {
    Router::new()
        .route("/notifications", get(handlers::notification::list_notifications))
        .route("/notifications/{id}/read", post(handlers::notification::mark_read))
}

/// CORS for the configured origins; `*` allows any.
pub fn build_cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .max_age(Duration::from_secs(3600));

    if allowed_origins.iter().any(|o| o == "*") {
        layer.allow_origin(Any)
    } else {
        let origins: Vec<HeaderValue> = allowed_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        layer.allow_origin(origins)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use axum::body::{Body, to_bytes};
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    use bloodlink_core::config::AppConfig;
    use bloodlink_core::traits::{DeliveryMode, SmsError, SmsProvider, SmsReceipt, SystemClock};
    use bloodlink_database::Repositories;
    use bloodlink_realtime::RoomHub;
    use bloodlink_service::{EngineParts, MatchingEngine};

    #[derive(Default)]
    struct Inbox {
        bodies: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl SmsProvider for Inbox {
        async fn send(&self, _to: &str, body: &str) -> Result<SmsReceipt, SmsError> {
            self.bodies.lock().unwrap().push(body.to_string());
            Ok(SmsReceipt {
                id: "SM1".into(),
                mode: DeliveryMode::Delivered,
            })
        }

        fn name(&self) -> &'static str {
            "inbox"
        }
    }

    fn app() -> (Router, Arc<Inbox>) {
        let inbox = Arc::new(Inbox::default());
        let mut config = AppConfig::default();
        config.auth.jwt_secret = "router-test-secret-0123456789abcdef".into();
        let hub = Arc::new(RoomHub::new(config.realtime.clone()));
        let engine = MatchingEngine::new(EngineParts {
            config: config.clone(),
            repositories: Repositories::in_memory(),
            sms: inbox.clone(),
            realtime: hub.clone(),
            clock: Arc::new(SystemClock),
        });
        (build_router(AppState::new(config, engine, Some(hub))), inbox)
    }

    fn post_json(uri: &str, body: serde_json::Value, token: Option<&str>) -> Request<Body> {
        let mut builder = Request::post(uri).header(header::CONTENT_TYPE, "application/json");
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    async fn json(response: axum::response::Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let (app, _) = app();
        let response = app
            .oneshot(Request::get("/api/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = json(response).await;
        assert_eq!(body["data"]["realtime"], "hub");
    }

    #[tokio::test]
    async fn test_phone_sign_in_then_create_request() {
        let (app, inbox) = app();
        let phone = serde_json::json!({ "phone_number": "+22236000001" });

        let response = app
            .clone()
            .oneshot(post_json("/api/auth/phone/code", phone, None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let sms = inbox.bodies.lock().unwrap().last().cloned().unwrap();
        let code: String = sms
            .split_once("code is ")
            .unwrap()
            .1
            .chars()
            .take_while(char::is_ascii_digit)
            .collect();

        let verify = serde_json::json!({ "phone_number": "+22236000001", "code": code });
        let response = app
            .clone()
            .oneshot(post_json("/api/auth/phone/verify", verify, None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let token = json(response).await["data"]["token"]
            .as_str()
            .unwrap()
            .to_string();

        let create = serde_json::json!({
            "patient_name": "Aicha",
            "blood_type": "AB+",
            "hospital_name": "CHN",
            "latitude": 18.0735,
            "longitude": -15.9582,
            "urgency": "critical",
            "required_units": 1
        });
        let response = app
            .oneshot(post_json("/api/requests", create, Some(&token)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let body = json(response).await;
        assert_eq!(body["data"]["request"]["status"], "active");
        assert_eq!(body["data"]["dispatch"]["donors"], serde_json::json!([]));
    }

    #[tokio::test]
    async fn test_wrong_code_is_rejected_generically() {
        let (app, _) = app();
        let phone = serde_json::json!({ "phone_number": "+22236000001" });
        app.clone()
            .oneshot(post_json("/api/auth/phone/code", phone, None))
            .await
            .unwrap();

        let verify = serde_json::json!({ "phone_number": "+22236000001", "code": "abc" });
        let response = app
            .oneshot(post_json("/api/auth/phone/verify", verify, None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json(response).await["error"], "INVALID_OR_EXPIRED_CODE");
    }

    #[tokio::test]
    async fn test_missing_token_is_unauthorized() {
        let (app, _) = app();
        let response = app
            .oneshot(Request::get("/api/notifications").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
