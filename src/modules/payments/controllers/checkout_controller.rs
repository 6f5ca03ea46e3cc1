use actix_web::{web, HttpResponse};
use chrono::Utc;
use serde::Deserialize;

use crate::core::Result;
use crate::modules::payments::services::{CheckoutService, MarkPaidOutcome, ReconciliationService};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutRequest {
    pub reference: String,
}

pub async fn create_checkout_session(
    service: web::Data<CheckoutService>,
    request: web::Json<CheckoutRequest>,
) -> Result<HttpResponse> {
    let session = service.create_session(&request.reference).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({ "url": session.url })))
}

pub async fn mark_invoice_paid(
    service: web::Data<ReconciliationService>,
    path: web::Path<String>,
) -> Result<HttpResponse> {
    let outcome = service
        .mark_paid_manual(&path.into_inner(), Utc::now())
        .await?;

    let message = match outcome {
        MarkPaidOutcome::Marked => "Invoice marked as paid",
        MarkPaidOutcome::AlreadyPaid => "Invoice is already marked as paid",
    };
    Ok(HttpResponse::Ok().json(serde_json::json!({ "message": message })))
}

pub async fn list_invoice_payments(
    service: web::Data<CheckoutService>,
    path: web::Path<String>,
) -> Result<HttpResponse> {
    let payments = service
        .list_settlements(&path.into_inner(), Utc::now())
        .await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({ "payments": payments })))
}

// The invoice-scoped payment routes (`/invoices/{reference}/mark-paid`,
// `/invoices/{reference}/payments`) are registered by the invoices
// controller so that scope owns its whole path prefix.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/payments").route("/checkout", web::post().to(create_checkout_session)),
    );
}
