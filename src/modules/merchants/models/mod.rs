mod merchant;

pub use merchant::Merchant;
