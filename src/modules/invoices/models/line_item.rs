// A line item is one product or service row on an invoice. Line items are
// persisted as a JSON document on the owning invoice or subscription row,
// so they carry no identity of their own.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::core::{AppError, Result};

fn default_quantity() -> i32 {
    1
}

/// A single product or service row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    /// Description of the product or service
    pub name: String,

    /// Price per unit
    pub amount: Decimal,

    /// Unit count; omitted quantities default to 1
    #[serde(default = "default_quantity")]
    pub quantity: i32,
}

impl LineItem {
    /// Create a new line item with validation
    pub fn new(name: String, amount: Decimal, quantity: i32) -> Result<Self> {
        Self::validate_name(&name)?;
        Self::validate_amount(amount)?;
        Self::validate_quantity(quantity)?;

        Ok(Self {
            name,
            amount,
            quantity,
        })
    }

    /// Extended amount for this row: amount × quantity
    pub fn subtotal(&self) -> Decimal {
        self.amount * Decimal::from(self.quantity)
    }

    fn validate_name(name: &str) -> Result<()> {
        if name.trim().is_empty() {
            return Err(AppError::validation("Line item name cannot be empty"));
        }

        if name.len() > 255 {
            return Err(AppError::validation(
                "Line item name cannot exceed 255 characters",
            ));
        }

        Ok(())
    }

    fn validate_amount(amount: Decimal) -> Result<()> {
        if amount < Decimal::ZERO {
            return Err(AppError::validation("Line item amount cannot be negative"));
        }

        Ok(())
    }

    fn validate_quantity(quantity: i32) -> Result<()> {
        if quantity < 1 {
            return Err(AppError::validation(
                "Line item quantity must be at least 1",
            ));
        }

        Ok(())
    }
}
