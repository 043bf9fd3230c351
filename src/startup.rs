use std::net::TcpListener;

use actix_web::dev::Server;
use actix_web::{web, App, HttpResponse, HttpServer};
use tracing_actix_web::TracingLogger;

use crate::configuration::Settings;
use crate::routes::{health_check, method_not_allowed, subscribe, SubscriptionState};

pub struct Application {
    port: u16,
    server: Server,
}

impl Application {
    pub async fn build(configuration: Settings) -> Result<Self, anyhow::Error> {
        let address = format!(
            "{}:{}",
            configuration.application.host, configuration.application.port
        );
        let listener = TcpListener::bind(address)?;
        let port = listener.local_addr()?.port();
        let state = SubscriptionState {
            client: configuration.newsletter.client(),
            expose_error_detail: configuration.application.expose_error_detail,
        };
        let server = run(listener, state)?;
        Ok(Self { port, server })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub async fn run_until_stopped(self) -> Result<(), std::io::Error> {
        self.server.await
    }
}

pub fn run(listener: TcpListener, state: SubscriptionState) -> Result<Server, anyhow::Error> {
    let state = web::Data::new(state);
    // A body that cannot be parsed into JSON carries no usable email; answer
    // with the same corrective message as a missing field.
    let json_config = web::JsonConfig::default().error_handler(|error, _req| {
        actix_web::error::InternalError::from_response(
            error,
            HttpResponse::BadRequest().json(serde_json::json!({ "error": "Email is required" })),
        )
        .into()
    });
    let server = HttpServer::new(move || {
        App::new()
            .wrap(TracingLogger::default())
            .app_data(json_config.clone())
            .app_data(state.clone())
            .route("/health_check", web::get().to(health_check))
            .service(
                web::resource("/subscriptions")
                    .route(web::post().to(subscribe))
                    .route(web::route().to(method_not_allowed)),
            )
    })
    .listen(listener)?
    .run();
    Ok(server)
}
