use secrecy::Secret;
use serde_aux::field_attributes::deserialize_number_from_string;

use crate::list_client::ListClient;

#[derive(serde::Deserialize, Clone)]
pub struct Settings {
    pub application: ApplicationSettings,
    pub newsletter: NewsletterSettings,
}

#[derive(serde::Deserialize, Clone)]
pub struct ApplicationSettings {
    pub host: String,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub port: u16,
    /// Echo raw error detail in 500 responses. Local-only; never enable in
    /// production configuration.
    #[serde(default)]
    pub expose_error_detail: bool,
}

/// Credentials and routing for the upstream list-management provider.
///
/// The three provider values are optional on purpose: a deployment missing
/// them still boots and answers every sign-up with the "not configured"
/// response instead of crashing at startup.
#[derive(serde::Deserialize, Clone)]
pub struct NewsletterSettings {
    pub api_key: Option<Secret<String>>,
    pub audience_id: Option<String>,
    pub server_prefix: Option<String>,
    /// Overrides the derived provider URL. Used by tests to point the client
    /// at a stub server.
    pub base_url_override: Option<String>,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub timeout_milliseconds: u64,
}

impl NewsletterSettings {
    pub fn timeout(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.timeout_milliseconds)
    }

    /// Build the provider client, validating presence of the required values
    /// once at startup. Returns `None` (and logs which values are missing)
    /// when the deployment is not configured.
    pub fn client(&self) -> Option<ListClient> {
        let mut missing = Vec::new();
        if self.api_key.is_none() {
            missing.push("api_key");
        }
        if self.audience_id.is_none() {
            missing.push("audience_id");
        }
        if self.server_prefix.is_none() && self.base_url_override.is_none() {
            missing.push("server_prefix");
        }
        if !missing.is_empty() {
            tracing::warn!(
                missing = %missing.join(", "),
                "Newsletter provider settings are incomplete; sign-ups will be rejected"
            );
            return None;
        }
        let base_url = match &self.base_url_override {
            Some(url) => url.clone(),
            None => format!(
                "https://{}.api.mailchimp.com",
                self.server_prefix.as_ref().unwrap()
            ),
        };
        Some(ListClient::new(
            base_url,
            self.audience_id.clone().unwrap(),
            self.api_key.clone().unwrap(),
            self.timeout(),
        ))
    }
}

pub fn get_configuration() -> Result<Settings, config::ConfigError> {
    let base_path = std::env::current_dir().expect("Failed to determine the current directory");
    let configuration_directory = base_path.join("configuration");

    // Default to `local` outside of a deployed environment.
    let environment: Environment = std::env::var("APP_ENVIRONMENT")
        .unwrap_or_else(|_| "local".into())
        .try_into()
        .expect("Failed to parse APP_ENVIRONMENT.");
    let environment_filename = format!("{}.yaml", environment.as_str());
    let settings = config::Config::builder()
        .add_source(config::File::from(
            configuration_directory.join("base.yaml"),
        ))
        .add_source(config::File::from(
            configuration_directory.join(environment_filename),
        ))
        // `APP_NEWSLETTER__API_KEY=...` overrides `newsletter.api_key`.
        .add_source(
            config::Environment::with_prefix("APP")
                .prefix_separator("_")
                .separator("__"),
        )
        .build()?;

    settings.try_deserialize::<Settings>()
}

pub enum Environment {
    Local,
    Production,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Local => "local",
            Environment::Production => "production",
        }
    }
}

impl TryFrom<String> for Environment {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        match s.to_lowercase().as_str() {
            "local" => Ok(Self::Local),
            "production" => Ok(Self::Production),
            other => Err(format!(
                "{} is not a supported environment. Use either `local` or `production`.",
                other
            )),
        }
    }
}
