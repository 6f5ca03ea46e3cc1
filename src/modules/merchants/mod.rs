// Merchants module

pub mod models;
pub mod repositories;

pub use models::Merchant;
pub use repositories::{MerchantRepository, PgMerchantRepository};
