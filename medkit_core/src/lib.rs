#![forbid(unsafe_code)]

//! Core domain model and business logic for medkit.
//!
//! This crate provides:
//! - Domain types (medicines, slots, daily reminders)
//! - Dosage schedule derivation
//! - The inventory store and its persistence
//! - Pharmacy directory and distance ranking
//! - Typed requests/responses for the image extraction service

pub mod types;
pub mod error;
pub mod config;
pub mod logging;
pub mod schedule;
pub mod repository;
pub mod store;
pub mod proximity;
pub mod directory;
pub mod extraction;
pub mod stock;

// Re-export commonly used types
pub use error::{Error, Result};
pub use types::*;
pub use config::Config;
pub use schedule::{derive_all, derive_reminders};
pub use repository::{InventoryRepository, JsonFileRepository, MemoryRepository};
pub use store::InventoryStore;
pub use proximity::{rank_by_distance, Coordinate, Ranked};
pub use directory::{CsvDirectory, Pharmacy, PharmacyDirectory};
pub use extraction::{
    parse_pill_identification, parse_prescription_analysis, DataUri, PillIdentification,
    PrescriptionAnalysis, PrescriptionItem,
};
pub use stock::StockStatus;
