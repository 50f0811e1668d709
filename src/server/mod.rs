//! Web front end serving the generated fragments

pub mod handlers;
pub mod state;

use crate::config::Config;
use crate::errors::Result;
use crate::render::Renderer;
use actix_files::Files;
use actix_web::body::MessageBody;
use actix_web::dev::{ServiceRequest, ServiceResponse};
use actix_web::middleware::{DefaultHeaders, Next, from_fn};
use actix_web::{App, HttpServer, web};
use std::sync::Arc;
use tracing::info;

pub use handlers::{normalize_redirect, routes};
pub use state::{AppState, UsageSnapshot, UsageStats};

/// Headers that keep browsers from caching fragments between job runs
pub fn no_cache_headers() -> DefaultHeaders {
    DefaultHeaders::new()
        .add(("Cache-Control", "no-cache, no-store, must-revalidate"))
        .add(("Pragma", "no-cache"))
        .add(("Expires", "0"))
}

pub async fn count_requests(
    req: ServiceRequest,
    next: Next<impl MessageBody>,
) -> std::result::Result<ServiceResponse<impl MessageBody>, actix_web::Error> {
    if let Some(data) = req.app_data::<web::Data<AppState>>() {
        data.usage.record_request();
    }
    next.call(req).await
}

/// Bind and serve until the server is stopped (Ctrl-C)
pub async fn run(config: Arc<Config>, renderer: Arc<Renderer>) -> Result<()> {
    let images = config.images_dir();
    std::fs::create_dir_all(&images)?;

    let state = web::Data::new(AppState::new(config.clone(), renderer));

    info!(
        "Serving dashboard on http://{} with {} workers",
        config.bind_address, config.workers
    );

    HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .wrap(no_cache_headers())
            .wrap(from_fn(count_requests))
            .configure(routes)
            .service(Files::new("/static/Images", images.clone()))
    })
    .workers(config.workers)
    .bind(config.bind_address.as_str())?
    .run()
    .await?;

    info!("Web server stopped");
    Ok(())
}
