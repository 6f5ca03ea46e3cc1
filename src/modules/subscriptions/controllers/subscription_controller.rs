use actix_web::{web, HttpResponse};

use crate::core::{today_utc, Result};
use crate::modules::subscriptions::services::{
    CreateSubscriptionRequest, SubscriptionService, UpdateSubscriptionStatusRequest,
};

pub async fn create_subscription(
    service: web::Data<SubscriptionService>,
    request: web::Json<CreateSubscriptionRequest>,
) -> Result<HttpResponse> {
    let subscription = service.create(request.into_inner(), today_utc()).await?;
    Ok(HttpResponse::Created().json(subscription))
}

pub async fn get_subscription(
    service: web::Data<SubscriptionService>,
    path: web::Path<String>,
) -> Result<HttpResponse> {
    let subscription = service.get(&path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(subscription))
}

pub async fn update_subscription_status(
    service: web::Data<SubscriptionService>,
    path: web::Path<String>,
    request: web::Json<UpdateSubscriptionStatusRequest>,
) -> Result<HttpResponse> {
    let subscription = service
        .update_status(&path.into_inner(), request.status, today_utc())
        .await?;
    Ok(HttpResponse::Ok().json(subscription))
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/subscriptions")
            .route("", web::post().to(create_subscription))
            .route("/{reference}", web::get().to(get_subscription))
            .route("/{reference}/status", web::put().to(update_subscription_status)),
    );
}
