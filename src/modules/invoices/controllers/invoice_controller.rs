use actix_web::{web, HttpResponse};
use chrono::Utc;
use serde_json::json;

use crate::core::{today_utc, Result};
use crate::modules::invoices::models::InvoiceStatus;
use crate::modules::invoices::services::{
    CreateInvoiceRequest, InvoiceService, UpdateInvoiceRequest,
};
use crate::modules::payments::controllers::checkout_controller::{
    list_invoice_payments, mark_invoice_paid,
};

/// POST /invoices
pub async fn create_invoice(
    service: web::Data<InvoiceService>,
    request: web::Json<CreateInvoiceRequest>,
) -> Result<HttpResponse> {
    let invoice = service.create(request.into_inner(), today_utc()).await?;
    Ok(HttpResponse::Created().json(invoice))
}

/// GET /invoices/{reference}
pub async fn get_invoice(
    service: web::Data<InvoiceService>,
    path: web::Path<String>,
) -> Result<HttpResponse> {
    let invoice = service.get(&path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(invoice))
}

/// GET /invoices/{reference}/status
///
/// Lightweight poll used by the payment page after checkout.
pub async fn get_invoice_status(
    service: web::Data<InvoiceService>,
    path: web::Path<String>,
) -> Result<HttpResponse> {
    let invoice = service.get(&path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(json!({
        "status": invoice.status,
        "isPaid": invoice.status == InvoiceStatus::Paid,
    })))
}

/// PUT /invoices/{reference}
pub async fn update_invoice(
    service: web::Data<InvoiceService>,
    path: web::Path<String>,
    request: web::Json<UpdateInvoiceRequest>,
) -> Result<HttpResponse> {
    let invoice = service
        .update_draft(&path.into_inner(), request.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(invoice))
}

/// POST /invoices/{reference}/send
pub async fn send_invoice(
    service: web::Data<InvoiceService>,
    path: web::Path<String>,
) -> Result<HttpResponse> {
    let invoice = service.send(&path.into_inner(), Utc::now()).await?;
    Ok(HttpResponse::Ok().json(json!({
        "message": "Successfully sent invoice",
        "status": invoice.status,
    })))
}

/// POST /invoices/{reference}/track
pub async fn track_invoice_open(
    service: web::Data<InvoiceService>,
    path: web::Path<String>,
) -> Result<HttpResponse> {
    let report = service.track_open(&path.into_inner(), Utc::now()).await?;
    Ok(HttpResponse::Ok().json(report))
}

/// DELETE /invoices/{reference}
pub async fn delete_invoice(
    service: web::Data<InvoiceService>,
    path: web::Path<String>,
) -> Result<HttpResponse> {
    service.delete(&path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(json!({ "message": "Invoice deleted" })))
}

/// All `/invoices` routes live in this one scope, including the payment
/// actions whose handlers belong to the payments module.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/invoices")
            .route("", web::post().to(create_invoice))
            .route("/{reference}", web::get().to(get_invoice))
            .route("/{reference}", web::put().to(update_invoice))
            .route("/{reference}", web::delete().to(delete_invoice))
            .route("/{reference}/status", web::get().to(get_invoice_status))
            .route("/{reference}/send", web::post().to(send_invoice))
            .route("/{reference}/track", web::post().to(track_invoice_open))
            .route("/{reference}/mark-paid", web::post().to(mark_invoice_paid))
            .route("/{reference}/payments", web::get().to(list_invoice_payments)),
    );
}
