// Trigger endpoints for the daily batch jobs. Each handler runs one sweep to
// completion within the request. Invocations are expected to be serialized by
// the external scheduler; concurrent triggers of the same job are not guarded
// against here.

use actix_web::{web, HttpResponse};
use serde::Serialize;

use crate::core::{today_utc, Result};
use crate::modules::scheduler::services::{
    BillingRunService, OverdueRunService, ReminderRunService,
};

/// Shape returned by every job trigger.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct JobResponse {
    processed_count: u64,
    success: bool,
}

impl JobResponse {
    fn processed(count: u64) -> Self {
        Self {
            processed_count: count,
            success: true,
        }
    }
}

pub async fn run_subscription_billing(
    service: web::Data<BillingRunService>,
) -> Result<HttpResponse> {
    let report = service.run(today_utc()).await?;
    Ok(HttpResponse::Ok().json(JobResponse::processed(report.processed_count() as u64)))
}

pub async fn run_reminder_sweep(service: web::Data<ReminderRunService>) -> Result<HttpResponse> {
    let report = service.run(today_utc()).await?;
    Ok(HttpResponse::Ok().json(JobResponse::processed(report.processed_count() as u64)))
}

pub async fn run_overdue_sweep(service: web::Data<OverdueRunService>) -> Result<HttpResponse> {
    let flipped = service.run(today_utc()).await?;
    Ok(HttpResponse::Ok().json(JobResponse::processed(flipped)))
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/jobs")
            .route(
                "/run-subscription-billing",
                web::post().to(run_subscription_billing),
            )
            .route("/run-reminder-sweep", web::post().to(run_reminder_sweep))
            .route("/run-overdue-sweep", web::post().to(run_overdue_sweep)),
    );
}
