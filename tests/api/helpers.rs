use newsletter_gateway::configuration::{get_configuration, Settings};
use newsletter_gateway::startup::Application;
use newsletter_gateway::telemetry::{get_subscriber, init_subscriber};
use once_cell::sync::Lazy;
use secrecy::Secret;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockBuilder, MockServer};

pub const TEST_API_KEY: &str = "test-api-key";
pub const TEST_AUDIENCE_ID: &str = "test-audience";

static TRACING: Lazy<()> = Lazy::new(|| {
    let default_filter_level = "info".to_string();
    let subscriber_name = "test".to_string();

    if std::env::var("TEST_LOG").is_ok() {
        let subscriber = get_subscriber(subscriber_name, default_filter_level, std::io::stdout);
        init_subscriber(subscriber);
    } else {
        let subscriber = get_subscriber(subscriber_name, default_filter_level, std::io::sink);
        init_subscriber(subscriber);
    }
});

pub struct TestApp {
    pub address: String,
    pub provider_server: MockServer,
}

pub async fn spawn_app() -> TestApp {
    spawn_app_with(|_| {}).await
}

/// Boot the application on a random port, with the provider settings pointed
/// at a fresh stub server. `customize` runs last and can unset provider
/// values or flip flags.
pub async fn spawn_app_with<F>(customize: F) -> TestApp
where
    F: FnOnce(&mut Settings),
{
    Lazy::force(&TRACING);

    let provider_server = MockServer::start().await;

    let mut configuration = get_configuration().expect("Failed to read configuration.");
    configuration.application.port = 0;
    configuration.application.expose_error_detail = false;
    configuration.newsletter.api_key = Some(Secret::new(TEST_API_KEY.to_string()));
    configuration.newsletter.audience_id = Some(TEST_AUDIENCE_ID.to_string());
    configuration.newsletter.server_prefix = None;
    configuration.newsletter.base_url_override = Some(provider_server.uri());
    // Keep timeouts short so transport-failure tests finish quickly.
    configuration.newsletter.timeout_milliseconds = 200;
    customize(&mut configuration);

    let application = Application::build(configuration)
        .await
        .expect("Failed to build the application.");
    let address = format!("http://127.0.0.1:{}", application.port());
    let _ = tokio::spawn(application.run_until_stopped());

    TestApp {
        address,
        provider_server,
    }
}

impl TestApp {
    pub async fn post_subscription(&self, body: &serde_json::Value) -> reqwest::Response {
        reqwest::Client::new()
            .post(format!("{}/subscriptions", &self.address))
            .json(body)
            .send()
            .await
            .expect("Failed to execute request.")
    }

    pub async fn get_health_check(&self) -> reqwest::Response {
        reqwest::Client::new()
            .get(format!("{}/health_check", &self.address))
            .send()
            .await
            .expect("Failed to execute request.")
    }
}

pub fn when_adding_a_member() -> MockBuilder {
    Mock::given(method("POST")).and(path(format!(
        "/3.0/lists/{}/members",
        TEST_AUDIENCE_ID
    )))
}
