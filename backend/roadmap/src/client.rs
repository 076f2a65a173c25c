use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DEFAULT_UPDATE_ERROR: &str = "Failed to update status";

/// Server-confirmed status of one feedback item.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct UpdatedStatus {
    pub id: String,
    pub status: String,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum UpdateError {
    #[error("Failed to update status")]
    Network(String),

    #[error("{message}")]
    Rejected { message: String, status: u16 },
}

#[async_trait]
pub trait FeedbackApi: Send + Sync {
    async fn update_status(
        &self,
        slug: &str,
        id: &str,
        status: &str,
    ) -> Result<UpdatedStatus, UpdateError>;
}

#[derive(Serialize)]
struct UpdatePayload<'a> {
    status: &'a str,
    title: &'a str,
    description: &'a str,
}

#[derive(Deserialize)]
struct ErrorBody {
    error: Option<String>,
}

pub struct HttpFeedbackApi {
    client: Client,
    base_url: String,
}

impl HttpFeedbackApi {
    pub fn new(base_url: &str) -> Self {
        Self::with_client(Client::new(), base_url)
    }

    pub fn with_client(client: Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn endpoint(&self, slug: &str, id: &str) -> String {
        format!("{}/api/v1/projects/{slug}/feedback/{id}", self.base_url)
    }
}

#[async_trait]
impl FeedbackApi for HttpFeedbackApi {
    async fn update_status(
        &self,
        slug: &str,
        id: &str,
        status: &str,
    ) -> Result<UpdatedStatus, UpdateError> {
        // Empty title and description leave those fields untouched server side.
        let payload = UpdatePayload {
            status,
            title: "",
            description: "",
        };

        let response = self
            .client
            .patch(self.endpoint(slug, id))
            .json(&payload)
            .send()
            .await
            .map_err(|e| UpdateError::Network(e.to_string()))?;

        let code = response.status();
        if !code.is_success() {
            let message = response
                .json::<ErrorBody>()
                .await
                .ok()
                .and_then(|body| body.error)
                .unwrap_or_else(|| DEFAULT_UPDATE_ERROR.to_string());

            return Err(UpdateError::Rejected {
                message,
                status: code.as_u16(),
            });
        }

        response
            .json::<UpdatedStatus>()
            .await
            .map_err(|e| UpdateError::Network(e.to_string()))
    }
}
