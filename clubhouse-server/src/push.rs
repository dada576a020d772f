//! Push delivery over the FCM legacy HTTP API.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::header::AUTHORIZATION;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use clubhouse_core::error::{ClubError, ClubResult};
use clubhouse_core::push::{NotificationDispatcher, PushMessage};
use clubhouse_core::store::ProfileStore;

pub struct FcmDispatcher {
    client: reqwest::Client,
    endpoint: String,
    server_key: String,
    profiles: Arc<dyn ProfileStore>,
}

impl FcmDispatcher {
    pub fn new(endpoint: String, server_key: String, profiles: Arc<dyn ProfileStore>) -> Self {
        FcmDispatcher {
            client: reqwest::Client::new(),
            endpoint,
            server_key,
            profiles,
        }
    }
}

#[async_trait]
impl NotificationDispatcher for FcmDispatcher {
    async fn dispatch(&self, message: &PushMessage) -> ClubResult<usize> {
        let tokens = self.profiles.device_tokens(message.target_user_id).await?;
        if tokens.is_empty() {
            debug!("no registered device tokens, skipping push");
            return Ok(0);
        }

        let request = SendRequest {
            registration_ids: &tokens,
            notification: NotificationBody {
                title: &message.title,
                body: &message.body,
            },
        };

        let response = self
            .client
            .post(format!("{}/fcm/send", self.endpoint))
            .header(AUTHORIZATION, format!("key={}", self.server_key))
            .json(&request)
            .send()
            .await
            .map_err(|e| ClubError::Push(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ClubError::Push(format!("FCM returned {status}: {body}")));
        }

        let outcome: SendResponse = response
            .json()
            .await
            .map_err(|e| ClubError::Push(e.to_string()))?;
        if outcome.failure > 0 {
            info!(
                "push partially delivered: {} ok, {} failed",
                outcome.success, outcome.failure
            );
        }
        Ok(outcome.success)
    }
}

#[derive(Serialize)]
struct SendRequest<'a> {
    registration_ids: &'a [String],
    notification: NotificationBody<'a>,
}

#[derive(Serialize)]
struct NotificationBody<'a> {
    title: &'a str,
    body: &'a str,
}

#[derive(Deserialize)]
struct SendResponse {
    #[serde(default)]
    success: usize,
    #[serde(default)]
    failure: usize,
}
