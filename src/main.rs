use std::sync::Arc;

use actix_web::{web, App, HttpServer};
use tracing_actix_web::TracingLogger;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use billcycle::config::Config;
use billcycle::modules::clients::repositories::{ClientRepository, PgClientRepository};
use billcycle::modules::health::controllers::health_controller;
use billcycle::modules::invoices::controllers::invoice_controller;
use billcycle::modules::invoices::repositories::{InvoiceRepository, PgInvoiceRepository};
use billcycle::modules::invoices::services::InvoiceService;
use billcycle::modules::merchants::repositories::{MerchantRepository, PgMerchantRepository};
use billcycle::modules::notifications::services::{HttpMailer, NotificationGateway};
use billcycle::modules::payments::controllers::{checkout_controller, webhook_controller};
use billcycle::modules::payments::services::{
    CheckoutService, PaymentGateway, ReconciliationService, StripeGateway, WebhookVerifier,
};
use billcycle::modules::scheduler::controllers::jobs_controller;
use billcycle::modules::scheduler::services::{
    BillingRunService, OverdueRunService, ReminderRunService,
};
use billcycle::modules::subscriptions::controllers::subscription_controller;
use billcycle::modules::subscriptions::repositories::{
    PgSubscriptionRepository, SubscriptionRepository,
};
use billcycle::modules::subscriptions::services::SubscriptionService;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "billcycle=debug,actix_web=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::from_env().expect("Failed to load configuration");
    config.validate().expect("Configuration validation failed");

    tracing::info!("Starting BillCycle billing backend");
    tracing::info!("Environment: {}", config.app.env);
    tracing::info!("Server binding to: {}", config.server.bind_address());

    // Create database connection pool
    let db_pool = config
        .database
        .create_pool()
        .await
        .expect("Failed to create database pool");

    tracing::info!(
        "Database pool initialized ({} connections)",
        config.database.pool_size
    );

    sqlx::migrate!("./migrations")
        .run(&db_pool)
        .await
        .expect("Failed to run database migrations");

    // Repositories
    let invoices: Arc<dyn InvoiceRepository> =
        Arc::new(PgInvoiceRepository::new(db_pool.clone()));
    let subscriptions: Arc<dyn SubscriptionRepository> =
        Arc::new(PgSubscriptionRepository::new(db_pool.clone()));
    let clients: Arc<dyn ClientRepository> = Arc::new(PgClientRepository::new(db_pool.clone()));
    let merchants: Arc<dyn MerchantRepository> =
        Arc::new(PgMerchantRepository::new(db_pool.clone()));

    // Outbound adapters
    let mailer: Arc<dyn NotificationGateway> =
        Arc::new(HttpMailer::new(config.mailer.clone()).expect("Failed to build mail client"));
    let gateway: Arc<dyn PaymentGateway> =
        Arc::new(StripeGateway::new(&config.stripe).expect("Failed to build gateway client"));
    let verifier = WebhookVerifier::new(config.stripe.webhook_secret.clone());

    let base_url = config.app.base_url.clone();

    // Services
    let invoice_service = web::Data::new(InvoiceService::new(
        invoices.clone(),
        clients.clone(),
        merchants.clone(),
        mailer.clone(),
        base_url.clone(),
    ));
    let subscription_service = web::Data::new(SubscriptionService::new(
        subscriptions.clone(),
        clients.clone(),
    ));
    let billing_run = web::Data::new(BillingRunService::new(
        subscriptions.clone(),
        invoices.clone(),
        clients.clone(),
        merchants.clone(),
        mailer.clone(),
        base_url.clone(),
    ));
    let reminder_run = web::Data::new(ReminderRunService::new(
        invoices.clone(),
        clients.clone(),
        merchants.clone(),
        mailer.clone(),
        base_url.clone(),
    ));
    let overdue_run = web::Data::new(OverdueRunService::new(invoices.clone()));
    let reconciliation = web::Data::new(ReconciliationService::new(
        invoices.clone(),
        merchants.clone(),
        gateway.clone(),
        verifier,
    ));
    let checkout = web::Data::new(CheckoutService::new(
        invoices.clone(),
        merchants.clone(),
        gateway.clone(),
        base_url,
    ));

    // Start HTTP server
    let bind_address = config.server.bind_address();
    let workers = config.server.workers;
    let server = HttpServer::new(move || {
        App::new()
            .wrap(TracingLogger::default())
            .app_data(web::Data::new(db_pool.clone()))
            .app_data(invoice_service.clone())
            .app_data(subscription_service.clone())
            .app_data(billing_run.clone())
            .app_data(reminder_run.clone())
            .app_data(overdue_run.clone())
            .app_data(reconciliation.clone())
            .app_data(checkout.clone())
            .configure(invoice_controller::configure)
            .configure(subscription_controller::configure)
            .configure(checkout_controller::configure)
            .configure(webhook_controller::configure)
            .configure(jobs_controller::configure)
            .configure(health_controller::configure)
    })
    .workers(workers)
    .bind(&bind_address)?
    .run();

    tracing::info!("Server started at http://{}", bind_address);

    server.await
}
