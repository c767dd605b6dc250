use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, warn};

use super::image::{ImageRef, ImageRegistry};
use super::traits::AdviceService;
use super::types::{
    ContinuityToken, ErrorDetail, GenieReply, HealthReply, TurnReply, UserProfile, Verification,
    WishReply,
};
use crate::app::BackendConfig;
use crate::constants::{
    CONNECT_TIMEOUT_SECS, TURN_SERVER_ERROR_MESSAGE, WISH_SERVER_ERROR_MESSAGE,
};
use crate::utils::GenieError;

/// reqwest-backed client for the Lox Genie API
pub struct HttpAdviceClient {
    client: Client,
    base_url: Url,
    request_timeout: Duration,
    health_timeout: Duration,
    images: ImageRegistry,
}

impl HttpAdviceClient {
    /// Create a client from the backend section of the config
    pub fn new(config: &BackendConfig) -> anyhow::Result<Self> {
        Self::with_registry(config, ImageRegistry::new())
    }

    /// Create a client that issues avatar refs from an existing registry
    pub fn with_registry(config: &BackendConfig, images: ImageRegistry) -> anyhow::Result<Self> {
        let base_url = Url::parse(&config.api_url)
            .map_err(|e| anyhow::anyhow!("Invalid API URL {}: {}", config.api_url, e))?;
        if base_url.cannot_be_a_base() {
            anyhow::bail!("Invalid API URL {}: not a base URL", config.api_url);
        }

        Ok(Self {
            client: Client::builder()
                .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
                .timeout(config.request_timeout())
                .build()?,
            base_url,
            request_timeout: config.request_timeout(),
            health_timeout: config.health_timeout(),
            images,
        })
    }

    /// Registry that tracks the avatar refs this client hands out
    pub fn images(&self) -> &ImageRegistry {
        &self.images
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Join path segments onto the base URL, percent-encoding each one
    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    /// Read a JSON body, classifying read and decode failures
    async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T, GenieError> {
        response
            .json::<T>()
            .await
            .map_err(|e| GenieError::from_transport(&e))
    }

    /// Turn a non-2xx response into an error, preferring the `detail` field
    ///
    /// A bare 500 becomes `ServerFault` carrying `fault_message`, the text shown
    /// for this operation.
    async fn rejection(response: Response, fault_message: &str) -> GenieError {
        let status = response.status();
        match error_detail(response).await {
            Some(detail) => GenieError::RemoteRejected(detail),
            None if status == StatusCode::INTERNAL_SERVER_ERROR => GenieError::ServerFault {
                status: status.as_u16(),
                message: fault_message.to_string(),
            },
            None => GenieError::RemoteRejected(format!("HTTP error! status: {}", status.as_u16())),
        }
    }
}

/// Extract `{"detail": "..."}` from an error body, if there is one
async fn error_detail(response: Response) -> Option<String> {
    let body = response.text().await.ok()?;
    serde_json::from_str::<ErrorDetail>(&body)
        .ok()
        .map(|e| e.detail)
}

fn is_image(response: &Response) -> bool {
    response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|ct| ct.contains("image"))
        .unwrap_or(false)
}

/// Drop one pair of matching quotes the generator sometimes wraps around its question
pub(crate) fn strip_wrapping_quotes(text: &str) -> &str {
    let trimmed = text.trim();
    for quote in ['"', '\''] {
        if trimmed.len() >= 2 && trimmed.starts_with(quote) && trimmed.ends_with(quote) {
            return trimmed[1..trimmed.len() - 1].trim();
        }
    }
    trimmed
}

#[async_trait]
impl AdviceService for HttpAdviceClient {
    async fn send_turn(
        &self,
        message: String,
        continuity: Option<ContinuityToken>,
    ) -> Result<TurnReply, GenieError> {
        let mut params = vec![("message", message.as_str())];
        if let Some(token) = &continuity {
            params.push(("thread_id", token.as_str()));
        }

        debug!(
            thread_id = continuity.as_ref().map(|t| t.as_str()),
            chars = message.len(),
            "sending message to Lox Genie"
        );

        // The per-request timeout aborts the in-flight request rather than orphaning it
        let response = self
            .client
            .post(self.endpoint(&["genie"]))
            .query(&params)
            .timeout(self.request_timeout)
            .send()
            .await
            .map_err(|e| GenieError::from_transport(&e))?;

        debug!(status = response.status().as_u16(), "genie responded");

        if !response.status().is_success() {
            return Err(Self::rejection(response, TURN_SERVER_ERROR_MESSAGE).await);
        }

        let reply: GenieReply = Self::read_json(response).await?;
        Ok(TurnReply {
            response: reply.response,
            continuity: ContinuityToken::new(reply.thread_id),
        })
    }

    async fn verify_identity(&self, handle: String) -> Result<Verification, GenieError> {
        let response = self
            .client
            .get(self.endpoint(&["users", &handle]))
            .send()
            .await
            .map_err(|e| GenieError::from_transport(&e))?;

        if !response.status().is_success() {
            let status = response.status();
            let reason = error_detail(response)
                .await
                .unwrap_or_else(|| format!("Username {} not found on Sleeper", handle));
            debug!(%handle, status = status.as_u16(), %reason, "handle not found");
            return Ok(Verification::NotFound { reason });
        }

        // The lookup answers `null` for unknown users on some paths
        let profile: Option<UserProfile> = Self::read_json(response).await?;
        Ok(match profile {
            Some(profile) => Verification::Verified(profile),
            None => Verification::NotFound {
                reason: format!("Username {} not found on Sleeper", handle),
            },
        })
    }

    async fn fetch_avatar(&self, handle: String) -> Option<ImageRef> {
        let response = match self
            .client
            .get(self.endpoint(&["users", "avatar", &handle]))
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                warn!(%handle, error = %e, "avatar request failed");
                return None;
            }
        };

        if !response.status().is_success() {
            debug!(%handle, status = response.status().as_u16(), "no avatar available");
            return None;
        }

        if !is_image(&response) {
            debug!(%handle, "avatar response is not an image");
            return None;
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("image/jpeg")
            .to_string();

        match response.bytes().await {
            Ok(data) => Some(self.images.create(content_type, data)),
            Err(e) => {
                warn!(%handle, error = %e, "avatar body could not be read");
                None
            }
        }
    }

    async fn generate_suggestion(&self) -> Result<String, GenieError> {
        let response = self
            .client
            .post(self.endpoint(&["wish", "generate"]))
            .timeout(self.request_timeout)
            .send()
            .await
            .map_err(|e| GenieError::from_transport(&e))?;

        if !response.status().is_success() {
            return Err(Self::rejection(response, WISH_SERVER_ERROR_MESSAGE).await);
        }

        let wish: WishReply = Self::read_json(response).await?;
        Ok(strip_wrapping_quotes(&wish.question).to_string())
    }

    async fn check_health(&self) -> bool {
        let response = match self
            .client
            .get(self.endpoint(&["health"]))
            .timeout(self.health_timeout)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                debug!(error = %e, "health check failed");
                return false;
            }
        };

        if !response.status().is_success() {
            return false;
        }

        match response.json::<HealthReply>().await {
            Ok(health) => health.status == "healthy",
            Err(_) => false,
        }
    }
}
