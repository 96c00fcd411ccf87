use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;

use crate::config::Config;
use crate::utils::jwt::create_service_jwt;

/// The booking user on whose behalf a service call is made.
#[derive(Debug, Clone)]
pub struct ServiceContext {
    pub user_id: String,
    pub email: String,
    pub name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HoldDetails {
    pub hold_id: String,
    pub user_id: String,
    pub user_name: String,
    pub event_id: String,
    pub event_name: String,
    pub venue: String,
    pub event_date: DateTime<Utc>,
    pub seats: Vec<String>,
    pub total_price: f64,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Error)]
pub enum EventServiceError {
    #[error("hold not found")]
    HoldNotFound,
    #[error("hold is no longer active")]
    HoldExpired,
    #[error("event service error (status {status}): {body}")]
    Upstream { status: u16, body: String },
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("failed to generate service token: {0}")]
    Token(#[from] jsonwebtoken::errors::Error),
}

/// HTTP client for the seat inventory & hold engine. Every call is signed
/// with a short-lived service token carrying the booking user's context.
#[derive(Clone)]
pub struct EventServiceClient {
    base_url: String,
    jwt_secret: String,
    http: reqwest::Client,
}

impl EventServiceClient {
    pub fn new(config: &Config) -> Self {
        let http = reqwest::Client::builder()
            .pool_max_idle_per_host(config.http_max_idle_per_host)
            .pool_idle_timeout(Duration::from_secs(config.http_idle_timeout_seconds))
            .timeout(Duration::from_secs(config.http_request_timeout_seconds))
            .build()
            .expect("Failed to build HTTP client");

        EventServiceClient {
            base_url: config.event_service_url.trim_end_matches('/').to_string(),
            jwt_secret: config.jwt_secret.clone(),
            http,
        }
    }

    fn token(&self, ctx: &ServiceContext) -> Result<String, EventServiceError> {
        Ok(create_service_jwt(
            &ctx.user_id,
            &ctx.email,
            ctx.name.as_deref(),
            &self.jwt_secret,
        )?)
    }

    async fn check(resp: reqwest::Response) -> Result<reqwest::Response, EventServiceError> {
        let status = resp.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(EventServiceError::HoldNotFound);
        }
        if status == reqwest::StatusCode::CONFLICT {
            return Err(EventServiceError::HoldExpired);
        }
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(EventServiceError::Upstream {
                status: status.as_u16(),
                body,
            });
        }
        Ok(resp)
    }

    pub async fn get_hold_details(
        &self,
        hold_id: &str,
        ctx: &ServiceContext,
    ) -> Result<HoldDetails, EventServiceError> {
        let url = format!("{}/api/events/holds/{}", self.base_url, hold_id);
        let resp = self
            .http
            .get(&url)
            .bearer_auth(self.token(ctx)?)
            .send()
            .await?;
        let resp = Self::check(resp).await?;
        Ok(resp.json().await?)
    }

    pub async fn confirm_hold(
        &self,
        hold_id: &str,
        ctx: &ServiceContext,
    ) -> Result<(), EventServiceError> {
        let url = format!("{}/api/events/holds/{}/confirm", self.base_url, hold_id);
        let resp = self
            .http
            .post(&url)
            .bearer_auth(self.token(ctx)?)
            .json(&serde_json::json!({}))
            .send()
            .await?;
        Self::check(resp).await?;
        Ok(())
    }

    pub async fn release_hold(
        &self,
        hold_id: &str,
        ctx: &ServiceContext,
    ) -> Result<(), EventServiceError> {
        let url = format!("{}/api/events/holds/{}", self.base_url, hold_id);
        let resp = self
            .http
            .delete(&url)
            .bearer_auth(self.token(ctx)?)
            .send()
            .await?;
        Self::check(resp).await?;
        Ok(())
    }
}
