// Clients module

pub mod models;
pub mod repositories;

pub use models::Client;
pub use repositories::{ClientRepository, PgClientRepository};
