//! Dosage schedule derivation.
//!
//! Turns a medicine's free-text instructions into today's reminder slots.
//! The first rule that applies wins:
//!
//! 1. A numeric "morning-afternoon-night" triple such as `1-0-1` or
//!    `0.5-0-1` in the instructions.
//! 2. Keywords ("twice a day", "after dinner", ...) in the instructions,
//!    checked in table order.
//! 3. A triple in the dosage label.
//! 4. A single morning dose.

use crate::{DailyReminder, Medicine, Slot};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;

/// Dose used when the schedule comes from keywords or the default
pub const DEFAULT_DOSE: &str = "1";

static DOSE_TRIPLE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^([0-9]+(?:\.[0-9]+)?)\s*-\s*([0-9]+(?:\.[0-9]+)?)\s*-\s*([0-9]+(?:\.[0-9]+)?)$",
    )
    .expect("dose triple pattern is valid")
});

/// Keyword table, checked in this order against the lower-cased instructions
const KEYWORD_SLOTS: &[(&str, &[Slot])] = &[
    ("morning", &[Slot::Morning]),
    ("afternoon", &[Slot::Afternoon]),
    ("evening", &[Slot::Night]),
    ("night", &[Slot::Night]),
    ("once a day", &[Slot::Morning]),
    ("twice a day", &[Slot::Morning, Slot::Night]),
    ("3 times a day", &[Slot::Morning, Slot::Afternoon, Slot::Night]),
    ("4 times a day", &[Slot::Morning, Slot::Afternoon, Slot::Night]),
    ("before breakfast", &[Slot::Morning]),
    ("after breakfast", &[Slot::Morning]),
    ("before lunch", &[Slot::Afternoon]),
    ("after lunch", &[Slot::Afternoon]),
    ("before dinner", &[Slot::Night]),
    ("after dinner", &[Slot::Night]),
];

/// Derive today's reminders for a single medicine
///
/// Never fails: text that matches nothing yields one morning reminder.
/// A triple of all zeros is still a triple and yields no reminders.
pub fn derive_reminders(medicine: &Medicine) -> Vec<DailyReminder> {
    if let Some(doses) = parse_dose_triple(&medicine.instructions) {
        return triple_reminders(medicine, doses);
    }

    let slots = keyword_slots(&medicine.instructions);
    if !slots.is_empty() {
        return slots
            .into_iter()
            .map(|slot| DailyReminder::untaken(medicine, slot, DEFAULT_DOSE))
            .collect();
    }

    if let Some(doses) = parse_dose_triple(&medicine.dosage) {
        return triple_reminders(medicine, doses);
    }

    tracing::debug!(
        "No schedule recognised for {:?} ({:?}), defaulting to morning",
        medicine.name,
        medicine.instructions
    );
    vec![DailyReminder::untaken(medicine, Slot::Morning, DEFAULT_DOSE)]
}

fn triple_reminders(medicine: &Medicine, doses: [String; 3]) -> Vec<DailyReminder> {
    Slot::ALL
        .iter()
        .zip(doses)
        .filter(|(_, dose)| !is_zero(dose))
        .map(|(slot, dose)| DailyReminder::untaken(medicine, *slot, dose))
        .collect()
}

/// Derive reminders for every medicine, ordered by slot
///
/// The sort is stable, so medicines sharing a slot keep inventory order.
pub fn derive_all(medicines: &[Medicine]) -> Vec<DailyReminder> {
    let mut reminders: Vec<_> = medicines.iter().flat_map(derive_reminders).collect();
    reminders.sort_by_key(|r| r.slot);
    reminders
}

/// Whole units a dose consumes; fractional or non-numeric doses consume 0
pub fn parse_dose(dose: &str) -> u32 {
    dose.trim().parse().unwrap_or(0)
}

/// Split `"<m>-<a>-<n>"` into its literal tokens
fn parse_dose_triple(text: &str) -> Option<[String; 3]> {
    let caps = DOSE_TRIPLE.captures(text.trim())?;
    Some([
        caps[1].to_string(),
        caps[2].to_string(),
        caps[3].to_string(),
    ])
}

fn is_zero(token: &str) -> bool {
    token.chars().all(|c| c == '0' || c == '.')
}

/// Slots matched by keywords, in first-match order, without duplicates
fn keyword_slots(instructions: &str) -> Vec<Slot> {
    let text = instructions.to_lowercase();
    let mut seen = HashSet::new();
    let mut slots = Vec::new();

    for (keyword, keyword_slots) in KEYWORD_SLOTS {
        if text.contains(keyword) {
            for slot in keyword_slots.iter() {
                if seen.insert(*slot) {
                    slots.push(*slot);
                }
            }
        }
    }

    slots
}
