use super::state::AppState;
use actix_web::http::header;
use actix_web::{HttpResponse, Responder, get, post, web};
use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use std::path::Path;
use tracing::{error, info, warn};

const HTML: &str = "text/html; charset=utf-8";

fn rendered(page: crate::errors::Result<String>) -> HttpResponse {
    match page {
        Ok(body) => HttpResponse::Ok().content_type(HTML).body(body),
        Err(e) => {
            error!("Failed to render page: {}", e);
            HttpResponse::InternalServerError().body("Failed to render page")
        }
    }
}

/// Serve a generated file as-is, or 404 until its job has run once
async fn serve_file(data: &AppState, path: &Path, content_type: &str) -> HttpResponse {
    match tokio::fs::read(path).await {
        Ok(body) => {
            data.usage.record_file();
            HttpResponse::Ok().content_type(content_type).body(body)
        }
        Err(e) if e.kind() == ErrorKind::NotFound => {
            warn!("{} has not been generated yet", path.display());
            HttpResponse::NotFound().body("Not generated yet")
        }
        Err(e) => {
            error!("Failed to read {}: {}", path.display(), e);
            HttpResponse::InternalServerError().body("Failed to read file")
        }
    }
}

#[get("/")]
async fn dashboard(data: web::Data<AppState>) -> impl Responder {
    rendered(data.renderer.dashboard(&data.config.feeds))
}

#[get("/DownDetector/Down_Detector_Test.html")]
async fn down_detector(data: web::Data<AppState>) -> impl Responder {
    serve_file(&data, &data.config.status_report_path(), HTML).await
}

#[get("/FortinetScraper/Attempt3/Scraper.html")]
async fn fortinet_scraper(data: web::Data<AppState>) -> impl Responder {
    serve_file(&data, &data.config.breakdown_page_path(), HTML).await
}

#[get("/History/History.html")]
async fn history(data: web::Data<AppState>) -> impl Responder {
    serve_file(&data, &data.config.history_page_path(), HTML).await
}

#[get("/NewNews/{file}")]
async fn news(data: web::Data<AppState>, file: web::Path<String>) -> impl Responder {
    let file = file.into_inner();

    if !data.config.feeds.iter().any(|feed| feed.filename == file) {
        return HttpResponse::NotFound().body("Unknown news page");
    }

    serve_file(&data, &data.config.news_page_path(&file), HTML).await
}

#[get("/api/status")]
async fn api_status(data: web::Data<AppState>) -> impl Responder {
    serve_file(&data, &data.config.status_snapshot_path(), "application/json").await
}

#[derive(Debug, Deserialize)]
struct RedirectForm {
    #[serde(default)]
    url: String,
}

#[get("/redirect-tool")]
async fn redirect_form(data: web::Data<AppState>) -> impl Responder {
    rendered(data.renderer.redirect_tool(None))
}

/// Bare host names are sent to their HTTPS site
pub fn normalize_redirect(input: &str) -> Option<String> {
    let target = input.trim();
    if target.is_empty() {
        return None;
    }

    if target.starts_with("http://") || target.starts_with("https://") {
        Some(target.to_string())
    } else {
        Some(format!("https://{}", target))
    }
}

#[post("/redirect-tool")]
async fn redirect(form: web::Form<RedirectForm>) -> impl Responder {
    match normalize_redirect(&form.url) {
        Some(target) => {
            info!("Redirecting to {}", target);
            HttpResponse::Found()
                .insert_header((header::LOCATION, target))
                .finish()
        }
        None => HttpResponse::BadRequest().body("Please enter a URL."),
    }
}

#[get("/usage")]
async fn usage(data: web::Data<AppState>) -> impl Responder {
    HttpResponse::Ok()
        .content_type("text/plain; charset=utf-8")
        .body(data.usage.snapshot().to_string())
}

#[derive(Serialize)]
struct HealthResponse {
    status: String,
}

#[get("/health")]
async fn health_check() -> impl Responder {
    web::Json(HealthResponse {
        status: "OK".into(),
    })
}

pub fn routes(cfg: &mut web::ServiceConfig) {
    cfg.service(dashboard)
        .service(down_detector)
        .service(fortinet_scraper)
        .service(history)
        .service(news)
        .service(api_status)
        .service(redirect_form)
        .service(redirect)
        .service(usage)
        .service(health_check);
}
