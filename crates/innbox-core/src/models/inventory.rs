//! Inventory item model

use serde::{Deserialize, Serialize};

/// A stock-tracked inventory item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryItem {
    /// Unique identifier
    pub id: String,
    /// Units currently on hand
    pub quantity: u32,
    /// Restock threshold
    pub min_quantity: u32,
}

impl InventoryItem {
    /// Deduct units, clamping at zero rather than erroring on over-draw.
    #[must_use]
    pub const fn deduct(mut self, units: u32) -> Self {
        self.quantity = self.quantity.saturating_sub(units);
        self
    }

    /// Check whether stock has fallen to or below the restock threshold
    #[must_use]
    pub const fn needs_restock(&self) -> bool {
        self.quantity <= self.min_quantity
    }
}
