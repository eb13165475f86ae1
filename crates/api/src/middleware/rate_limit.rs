//! Per-account rate limiting.
//!
//! Authenticated requests are limited per account ID using a keyed governor
//! limiter. Service tokens share the nil account ID and are exempt.

use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderValue, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use governor::{
    clock::{Clock, DefaultClock},
    DefaultKeyedRateLimiter, Quota, RateLimiter,
};
use serde_json::json;
use std::num::NonZeroU32;
use uuid::Uuid;

use crate::app::AppState;
use crate::middleware::user_auth::UserAuth;

/// Keyed limiter shared by all request handlers.
pub struct RateLimiterState {
    limiter: DefaultKeyedRateLimiter<Uuid>,
    rate_limit_per_minute: u32,
}

impl RateLimiterState {
    /// Returns None when `rate_limit_per_minute` is zero (limiting disabled).
    pub fn new(rate_limit_per_minute: u32) -> Option<Self> {
        let per_minute = NonZeroU32::new(rate_limit_per_minute)?;
        Some(Self {
            limiter: RateLimiter::keyed(Quota::per_minute(per_minute)),
            rate_limit_per_minute,
        })
    }

    pub fn limit(&self) -> u32 {
        self.rate_limit_per_minute
    }

    /// Ok, or the number of seconds to wait.
    pub fn check(&self, account_id: Uuid) -> Result<(), u64> {
        match self.limiter.check_key(&account_id) {
            Ok(_) => Ok(()),
            Err(not_until) => {
                let wait = not_until.wait_time_from(DefaultClock::default().now());
                Err(wait.as_secs().max(1))
            }
        }
    }
}

impl std::fmt::Debug for RateLimiterState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimiterState")
            .field("rate_limit_per_minute", &self.rate_limit_per_minute)
            .field("tracked_keys", &self.limiter.len())
            .finish()
    }
}

/// Run after `require_user_auth`; unauthenticated requests pass through.
pub async fn rate_limit_middleware(
    State(state): State<AppState>,
    req: Request<Body>,
    next: Next,
) -> Response {
    let Some(limiter) = state.rate_limiter.as_ref() else {
        return next.run(req).await;
    };

    let account_id = match req.extensions().get::<UserAuth>() {
        Some(auth) if !auth.is_service => auth.user_id,
        _ => return next.run(req).await,
    };

    if let Err(retry_after) = limiter.check(account_id) {
        tracing::warn!(account_id = %account_id, retry_after, "Rate limit exceeded");
        return rate_limited_response(limiter.limit(), retry_after);
    }

    next.run(req).await
}

fn rate_limited_response(limit: u32, retry_after: u64) -> Response {
    let body = json!({
        "success": false,
        "error": "rate_limited",
        "message": format!("Rate limit of {} requests/minute exceeded", limit),
        "retryAfter": retry_after
    });

    let mut response = (StatusCode::TOO_MANY_REQUESTS, Json(body)).into_response();
    if let Ok(value) = HeaderValue::from_str(&retry_after.to_string()) {
        response.headers_mut().insert(header::RETRY_AFTER, value);
    }
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_disables_limiter() {
        assert!(RateLimiterState::new(0).is_none());
        assert_eq!(RateLimiterState::new(100).unwrap().limit(), 100);
    }

    #[test]
    fn test_limit_is_per_account() {
        let state = RateLimiterState::new(2).unwrap();
        let first = Uuid::new_v4();
        let second = Uuid::new_v4();

        assert!(state.check(first).is_ok());
        assert!(state.check(first).is_ok());
        let retry_after = state.check(first).unwrap_err();
        assert!(retry_after >= 1);

        assert!(state.check(second).is_ok());
    }

    #[tokio::test]
    async fn test_rate_limited_response() {
        let response = rate_limited_response(60, 5);
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.headers().get(header::RETRY_AFTER).unwrap(), "5");

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["error"], "rate_limited");
        assert_eq!(body["retryAfter"], 5);
    }
}
