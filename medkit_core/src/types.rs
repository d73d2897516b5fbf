//! Core domain types for medkit.
//!
//! This module defines the fundamental types used throughout the system:
//! - Medicines held in the inventory
//! - Time-of-day slots and the daily reminders derived from them
//! - The persisted snapshot of inventory state

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

// ============================================================================
// Medicine
// ============================================================================

/// A medicine tracked in the inventory
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Medicine {
    pub id: Uuid,
    /// Display name, unique within the inventory ignoring case
    pub name: String,
    /// Free-text dosage label, e.g. "500mg" or "1-0-1"
    pub dosage: String,
    /// Instruction text the daily schedule is derived from
    pub instructions: String,
    /// Units on hand
    pub quantity: u32,
}

impl Medicine {
    /// Create a medicine with a fresh id and an empty stock
    pub fn new(
        name: impl Into<String>,
        dosage: impl Into<String>,
        instructions: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            dosage: dosage.into(),
            instructions: instructions.into(),
            quantity: 0,
        }
    }

    /// Case-insensitive name comparison used for every inventory lookup
    pub fn matches_name(&self, name: &str) -> bool {
        self.name.to_lowercase() == name.to_lowercase()
    }
}

// ============================================================================
// Slots and Reminders
// ============================================================================

/// Time of day at which a dose may be scheduled
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Slot {
    Morning,
    Afternoon,
    Night,
}

impl Slot {
    /// All slots in day order
    pub const ALL: [Slot; 3] = [Slot::Morning, Slot::Afternoon, Slot::Night];

    /// Stable lower-case key, used in reminder ids
    pub fn key(self) -> &'static str {
        match self {
            Slot::Morning => "morning",
            Slot::Afternoon => "afternoon",
            Slot::Night => "night",
        }
    }

    /// Clock time shown next to a reminder
    pub fn time_label(self) -> &'static str {
        match self {
            Slot::Morning => "8:00 AM",
            Slot::Afternoon => "2:00 PM",
            Slot::Night => "8:00 PM",
        }
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Slot::Morning => "Morning",
            Slot::Afternoon => "Afternoon",
            Slot::Night => "Night",
        };
        f.write_str(name)
    }
}

/// One dose to take today
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct DailyReminder {
    /// `<medicine id>-<slot key>`, stable across regenerations
    pub id: String,
    pub medicine_id: Uuid,
    pub medicine_name: String,
    /// Dose amount as written in the instructions
    pub dose: String,
    pub slot: Slot,
    pub taken: bool,
}

impl DailyReminder {
    /// Build an untaken reminder for `medicine` at `slot`
    pub fn untaken(medicine: &Medicine, slot: Slot, dose: impl Into<String>) -> Self {
        Self {
            id: reminder_id(medicine.id, slot),
            medicine_id: medicine.id,
            medicine_name: medicine.name.clone(),
            dose: dose.into(),
            slot,
            taken: false,
        }
    }
}

/// Deterministic reminder id for a medicine and slot
pub fn reminder_id(medicine_id: Uuid, slot: Slot) -> String {
    format!("{}-{}", medicine_id, slot.key())
}

// ============================================================================
// Persisted State
// ============================================================================

/// Everything the inventory persists, read and written as a unit
#[derive(Clone, Debug, Serialize, Deserialize, Default, PartialEq)]
pub struct Snapshot {
    #[serde(default)]
    pub medicines: Vec<Medicine>,
    /// Absent when no reminder list was ever saved
    #[serde(default)]
    pub reminders: Option<Vec<DailyReminder>>,
    /// Calendar day the reminders were generated for
    #[serde(default)]
    pub last_visit: Option<NaiveDate>,
}
