use actix_web::{web, HttpResponse};
use serde_json::json;

use crate::domain::Email;
use crate::list_client::{ListClient, ListClientError, GENERIC_FAILURE};

/// Per-application state for the sign-up endpoint. `client` is `None` when
/// the provider settings are incomplete; sign-ups are then rejected with the
/// "not configured" response instead of a panic.
pub struct SubscriptionState {
    pub client: Option<ListClient>,
    pub expose_error_detail: bool,
}

#[derive(thiserror::Error)]
pub enum SubscribeError {
    #[error("Email is required")]
    MissingEmail,
    #[error("Please enter a valid email address")]
    InvalidEmail,
    #[error("Newsletter service is not configured")]
    NotConfigured,
    #[error("You are already subscribed!")]
    AlreadySubscribed,
    #[error("{0}")]
    ProviderRejected(String),
    #[error("Failed to subscribe. Please try again.")]
    Transport(#[source] reqwest::Error),
}

impl std::fmt::Debug for SubscribeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}

impl From<ListClientError> for SubscribeError {
    fn from(error: ListClientError) -> Self {
        match error {
            ListClientError::MemberExists => Self::AlreadySubscribed,
            ListClientError::InvalidResource => Self::InvalidEmail,
            ListClientError::Rejected(message) => Self::ProviderRejected(message),
            ListClientError::Transport(source) => Self::Transport(source),
        }
    }
}

pub fn error_chain_fmt(
    e: &impl std::error::Error,
    f: &mut std::fmt::Formatter<'_>,
) -> std::fmt::Result {
    writeln!(f, "{}\n", e)?;
    let mut current = e.source();
    while let Some(cause) = current {
        writeln!(f, "Caused by:\n\t{}", cause)?;
        current = cause.source();
    }
    Ok(())
}

#[tracing::instrument(name = "Handle a newsletter sign-up", skip_all)]
pub async fn subscribe(
    body: web::Json<serde_json::Value>,
    state: web::Data<SubscriptionState>,
) -> HttpResponse {
    match forward_sign_up(body.into_inner(), &state).await {
        Ok(response) => response,
        Err(error) => error_response(&error, state.expose_error_detail),
    }
}

async fn forward_sign_up(
    body: serde_json::Value,
    state: &SubscriptionState,
) -> Result<HttpResponse, SubscribeError> {
    let raw_email = body
        .get("email")
        .and_then(|value| value.as_str())
        .ok_or(SubscribeError::MissingEmail)?;
    let email =
        Email::parse(raw_email.to_string()).map_err(|_| SubscribeError::InvalidEmail)?;
    let client = state
        .client
        .as_ref()
        .ok_or(SubscribeError::NotConfigured)?;
    client.add_member(&email).await?;
    Ok(HttpResponse::Ok().json(json!({ "message": "Thanks for subscribing!" })))
}

/// Every failure collapses to a well-formed JSON body. Raw error detail is
/// echoed back only when `expose_error_detail` is set; production responses
/// carry the generic message alone.
fn error_response(error: &SubscribeError, expose_error_detail: bool) -> HttpResponse {
    match error {
        SubscribeError::MissingEmail
        | SubscribeError::InvalidEmail
        | SubscribeError::AlreadySubscribed => {
            HttpResponse::BadRequest().json(json!({ "error": error.to_string() }))
        }
        SubscribeError::NotConfigured => {
            tracing::error!("A sign-up arrived but the newsletter provider is not configured");
            HttpResponse::InternalServerError().json(json!({ "error": error.to_string() }))
        }
        SubscribeError::ProviderRejected(_) => {
            HttpResponse::InternalServerError().json(json!({ "error": error.to_string() }))
        }
        SubscribeError::Transport(_) => {
            tracing::error!(error.cause_chain = ?error, "Failed to reach the newsletter provider");
            let mut body = json!({ "error": GENERIC_FAILURE });
            if expose_error_detail {
                body["debug"] = json!(format!("{:?}", error));
            }
            HttpResponse::InternalServerError().json(body)
        }
    }
}

pub async fn method_not_allowed() -> HttpResponse {
    HttpResponse::MethodNotAllowed().json(json!({ "error": "Method not allowed" }))
}
