use actix_web::{web, HttpRequest, HttpResponse};
use chrono::Utc;

use crate::core::{AppError, Result};
use crate::modules::payments::services::ReconciliationService;

/// Receives signed gateway events. The body must stay raw bytes: the
/// signature covers the exact payload as delivered.
pub async fn gateway_webhook(
    service: web::Data<ReconciliationService>,
    request: HttpRequest,
    body: web::Bytes,
) -> Result<HttpResponse> {
    let signature_header = request
        .headers()
        .get("Stripe-Signature")
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| AppError::signature("Missing signature header"))?;

    service
        .handle_event(&body, signature_header, Utc::now())
        .await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({ "received": true })))
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(web::scope("/webhooks").route("/gateway", web::post().to(gateway_webhook)));
}
