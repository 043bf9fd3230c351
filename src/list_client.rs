use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use reqwest::header::AUTHORIZATION;
use reqwest::Client;
use secrecy::{ExposeSecret, Secret};

use crate::domain::Email;

/// Fallback user-facing message when the provider gives us nothing usable.
pub const GENERIC_FAILURE: &str = "Failed to subscribe. Please try again.";

/// Client for the provider's list-member API.
pub struct ListClient {
    http_client: Client,
    base_url: String,
    audience_id: String,
    api_key: Secret<String>,
}

#[derive(serde::Serialize)]
struct AddMemberRequest<'a> {
    email_address: &'a str,
    status: &'a str,
}

#[derive(serde::Deserialize, Debug)]
struct MemberErrorResponse {
    title: Option<String>,
    detail: Option<String>,
}

#[derive(thiserror::Error, Debug)]
pub enum ListClientError {
    #[error("the address is already subscribed")]
    MemberExists,
    #[error("the provider rejected the address as invalid")]
    InvalidResource,
    #[error("{0}")]
    Rejected(String),
    #[error("failed to reach the newsletter provider")]
    Transport(#[from] reqwest::Error),
}

impl ListClient {
    pub fn new(
        base_url: String,
        audience_id: String,
        api_key: Secret<String>,
        timeout: std::time::Duration,
    ) -> ListClient {
        let http_client = Client::builder()
            .timeout(timeout)
            .build()
            .expect("Failed to build the HTTP client");
        ListClient {
            http_client,
            base_url,
            audience_id,
            api_key,
        }
    }

    /// Add `email` to the audience with status `subscribed` (single opt-in).
    /// The provider deduplicates by address, so a repeat submission comes
    /// back as `MemberExists`.
    #[tracing::instrument(name = "Add a member to the audience", skip(self, email), fields(subscriber_email = %email))]
    pub async fn add_member(&self, email: &Email) -> Result<(), ListClientError> {
        let url = format!("{}/3.0/lists/{}/members", self.base_url, self.audience_id);
        // The provider only reads the password slot of Basic auth; the
        // username is a conventional placeholder.
        let credentials = BASE64.encode(format!("anystring:{}", self.api_key.expose_secret()));
        let response = self
            .http_client
            .post(&url)
            .header(AUTHORIZATION, format!("Basic {}", credentials))
            .json(&AddMemberRequest {
                email_address: email.as_ref(),
                status: "subscribed",
            })
            .send()
            .await?;

        if response.status().is_success() {
            return Ok(());
        }

        let status = response.status();
        let payload = response.json::<MemberErrorResponse>().await?;
        match payload.title.as_deref() {
            Some("Member Exists") => Err(ListClientError::MemberExists),
            Some("Invalid Resource") => Err(ListClientError::InvalidResource),
            _ => {
                tracing::error!(
                    http_status = %status,
                    provider_error = ?payload,
                    "The newsletter provider rejected a sign-up"
                );
                let message = payload
                    .detail
                    .or(payload.title)
                    .unwrap_or_else(|| GENERIC_FAILURE.to_string());
                Err(ListClientError::Rejected(message))
            }
        }
    }
}
