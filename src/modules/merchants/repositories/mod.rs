mod merchant_repository;

pub use merchant_repository::{MerchantRepository, PgMerchantRepository};
