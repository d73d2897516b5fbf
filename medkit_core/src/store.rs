//! Inventory store.
//!
//! The store owns the medicine list and today's reminders, and is the only
//! thing that mutates them. Every mutation is written back through the
//! repository together with the calendar day it belongs to.

use crate::extraction::PrescriptionItem;
use crate::repository::InventoryRepository;
use crate::schedule::{derive_all, parse_dose};
use crate::{DailyReminder, Error, Medicine, Result, Snapshot};
use chrono::NaiveDate;

/// Medicine inventory with today's dose reminders
pub struct InventoryStore<R: InventoryRepository> {
    repo: R,
    today: NaiveDate,
    medicines: Vec<Medicine>,
    reminders: Vec<DailyReminder>,
}

impl<R: InventoryRepository> InventoryStore<R> {
    /// Load the inventory for `today`
    ///
    /// Load failures start from an empty inventory. Reminders saved on an
    /// earlier day, or never saved at all, are derived again from the
    /// medicines, so taken flags never carry over. Opening does not write
    /// anything.
    pub fn open(repo: R, today: NaiveDate) -> Self {
        let snapshot = repo.load().unwrap_or_else(|e| {
            tracing::warn!("Failed to load inventory: {}. Starting empty.", e);
            Snapshot::default()
        });

        let medicines = snapshot.medicines;
        let reminders = match snapshot.reminders {
            Some(reminders) if snapshot.last_visit == Some(today) => reminders,
            _ => {
                tracing::info!(
                    "Last visit was {:?}, generating reminders for {}",
                    snapshot.last_visit,
                    today
                );
                derive_all(&medicines)
            }
        };

        Self {
            repo,
            today,
            medicines,
            reminders,
        }
    }

    pub fn medicines(&self) -> &[Medicine] {
        &self.medicines
    }

    pub fn reminders(&self) -> &[DailyReminder] {
        &self.reminders
    }

    pub fn today(&self) -> NaiveDate {
        self.today
    }

    /// Case-insensitive lookup by name
    pub fn get_medicine_by_name(&self, name: &str) -> Option<&Medicine> {
        self.medicines.iter().find(|m| m.matches_name(name))
    }

    /// Whether a medicine with this name is already in the inventory
    pub fn is_known(&self, name: &str) -> bool {
        self.get_medicine_by_name(name).is_some()
    }

    /// Add the medicines of an analysed prescription
    ///
    /// Names already in the inventory (ignoring case) are skipped. Afterwards
    /// the whole reminder list is derived again, which resets today's taken
    /// flags for every medicine. Returns the medicines that were added.
    pub fn add_from_prescription(&mut self, items: &[PrescriptionItem]) -> Result<Vec<Medicine>> {
        let mut medicines = self.medicines.clone();
        let mut added = Vec::new();

        for item in items {
            if medicines.iter().any(|m| m.matches_name(&item.name)) {
                tracing::debug!("{:?} already in inventory, skipping", item.name);
                continue;
            }
            let medicine = Medicine::new(&item.name, &item.dosage, &item.timing);
            tracing::info!("Adding {:?} to inventory", medicine.name);
            medicines.push(medicine.clone());
            added.push(medicine);
        }

        let reminders = derive_all(&medicines);
        self.commit(self.today, medicines, reminders)?;
        Ok(added)
    }

    /// Add `amount` units to the medicine called `name`
    ///
    /// Fails with [`Error::MedicineNotFound`] and changes nothing when no
    /// medicine matches.
    pub fn add_stock(&mut self, name: &str, amount: u32) -> Result<&Medicine> {
        let index = self
            .medicines
            .iter()
            .position(|m| m.matches_name(name))
            .ok_or_else(|| Error::MedicineNotFound(name.to_string()))?;

        let mut medicines = self.medicines.clone();
        let medicine = &mut medicines[index];
        medicine.quantity = medicine.quantity.saturating_add(amount);
        tracing::info!(
            "Adding {} units of {:?}, now {}",
            amount,
            medicine.name,
            medicine.quantity
        );

        let reminders = self.reminders.clone();
        self.commit(self.today, medicines, reminders)?;
        Ok(&self.medicines[index])
    }

    /// Mark a reminder taken and consume its dose from stock
    ///
    /// Returns `false` without writing anything if the reminder is unknown or
    /// already taken. Stock never drops below zero.
    pub fn take_dose(&mut self, reminder_id: &str) -> Result<bool> {
        let Some(index) = self
            .reminders
            .iter()
            .position(|r| r.id == reminder_id && !r.taken)
        else {
            tracing::debug!("Reminder {:?} unknown or already taken", reminder_id);
            return Ok(false);
        };

        let mut reminders = self.reminders.clone();
        let reminder = &mut reminders[index];
        reminder.taken = true;
        let amount = parse_dose(&reminder.dose);
        let medicine_id = reminder.medicine_id;

        let mut medicines = self.medicines.clone();
        if let Some(medicine) = medicines.iter_mut().find(|m| m.id == medicine_id) {
            if amount > medicine.quantity {
                tracing::warn!(
                    "Dose of {} exceeds remaining stock of {:?} ({})",
                    amount,
                    medicine.name,
                    medicine.quantity
                );
            }
            medicine.quantity = medicine.quantity.saturating_sub(amount);
        }

        self.commit(self.today, medicines, reminders)?;
        Ok(true)
    }

    /// Move the store to a new calendar day
    ///
    /// Does nothing if `today` is the current day. Otherwise reminders are
    /// derived again and saved.
    pub fn rollover(&mut self, today: NaiveDate) -> Result<()> {
        if today == self.today {
            return Ok(());
        }
        tracing::info!("Day changed from {} to {}", self.today, today);
        let reminders = derive_all(&self.medicines);
        self.commit(today, self.medicines.clone(), reminders)
    }

    /// Write the current state through the repository
    pub fn persist(&self) -> Result<()> {
        self.repo.save(&Snapshot {
            medicines: self.medicines.clone(),
            reminders: Some(self.reminders.clone()),
            last_visit: Some(self.today),
        })
    }

    /// Save the new state, then adopt it; a failed save leaves the store as
    /// it was
    fn commit(
        &mut self,
        today: NaiveDate,
        medicines: Vec<Medicine>,
        reminders: Vec<DailyReminder>,
    ) -> Result<()> {
        let snapshot = Snapshot {
            medicines,
            reminders: Some(reminders),
            last_visit: Some(today),
        };
        self.repo.save(&snapshot)?;

        self.today = today;
        self.medicines = snapshot.medicines;
        self.reminders = snapshot.reminders.unwrap_or_default();
        Ok(())
    }
}
