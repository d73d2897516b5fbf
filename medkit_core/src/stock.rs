//! Stock level classification for the inventory view.

use serde::{Deserialize, Serialize};
use std::fmt;

/// How much of a medicine is left
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum StockStatus {
    Empty,
    Low,
    Medium,
    High,
}

impl StockStatus {
    /// Classify a quantity: 0 is empty, up to `low` is low, up to `medium`
    /// is medium, anything above is high
    pub fn classify(quantity: u32, low: u32, medium: u32) -> Self {
        if quantity == 0 {
            StockStatus::Empty
        } else if quantity <= low {
            StockStatus::Low
        } else if quantity <= medium {
            StockStatus::Medium
        } else {
            StockStatus::High
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            StockStatus::High => "In Stock",
            StockStatus::Medium => "Low Stock",
            StockStatus::Low => "Very Low",
            StockStatus::Empty => "Out of Stock",
        }
    }

    /// Whether a refill should be suggested
    pub fn needs_refill(self) -> bool {
        matches!(self, StockStatus::Empty | StockStatus::Low)
    }
}

impl fmt::Display for StockStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
