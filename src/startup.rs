use std::{sync::Arc, time::Duration};

use axum::{
    Router,
    extract::{DefaultBodyLimit, Request},
    response::Response,
    routing::{get, post},
    serve::Serve,
};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{Span, info, info_span};
use uuid::Uuid;

use crate::{
    configuration::Settings,
    dispatcher::Dispatcher,
    extraction::RecipientExtractor,
    routes::{
        cancel_send, health_check, index, send_campaign, session_snapshot, update_message,
        upload_recipients,
    },
};

pub struct AppState {
    pub dispatcher: Dispatcher,
    pub extractor: RecipientExtractor,
}

pub fn run(
    listener: TcpListener,
    dispatcher: Dispatcher,
    extractor: RecipientExtractor,
    max_upload_bytes: usize,
) -> Serve<TcpListener, Router, Router> {
    // One operator session per process, shared by every handler.
    let app_state = Arc::new(AppState {
        dispatcher,
        extractor,
    });
    let app = Router::new()
        .route("/", get(index))
        .route("/health_check", get(health_check))
        .route("/session", get(session_snapshot))
        .route("/message", post(update_message))
        .route("/recipients", post(upload_recipients))
        .route("/send", post(send_campaign))
        .route("/send/cancel", post(cancel_send))
        .with_state(app_state)
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &Request<_>| {
                    let request_id = Uuid::new_v4();
                    info_span!(
                        "http_request",
                        method = ?request.method(),
                        uri = ?request.uri(),
                        version = ?request.version(),
                        request_id = ?request_id,
                        status = tracing::field::Empty,
                    )
                })
                .on_response(|response: &Response, latency: Duration, span: &Span| {
                    let status = response.status();
                    span.record("status", status.as_u16());
                    info!(parent: span, ?status, ?latency, "Response sent");
                }),
        );

    axum::serve(listener, app)
}

pub struct Application {
    port: u16,
    server: Serve<TcpListener, Router, Router>,
}

impl Application {
    pub async fn build(configuration: Settings) -> anyhow::Result<Self> {
        let delivery_client = configuration.delivery_service.client()?;
        let dispatcher = Dispatcher::new(delivery_client);
        let extractor = RecipientExtractor::new(configuration.extraction);

        let listener = TcpListener::bind(format!(
            "{}:{}",
            configuration.application.host, configuration.application.port
        ))
        .await?;
        let port = listener.local_addr()?.port();
        info!(
            port,
            delivery_service = %configuration.delivery_service.base_url,
            transport = ?configuration.delivery_service.transport,
            "Listening"
        );

        let server = run(
            listener,
            dispatcher,
            extractor,
            configuration.application.max_upload_bytes,
        );

        Ok(Self { server, port })
    }

    pub async fn run_until_stopped(self) -> anyhow::Result<()> {
        Ok(self.server.await?)
    }

    pub fn port(&self) -> u16 {
        self.port
    }
}
